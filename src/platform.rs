//! Native platform handle resolution.
//!
//! Display protocols describe the drawable surface differently. X11 gives a numeric window id
//! next to a display connection, while Wayland gives a `wl_surface` pointer next to a
//! `wl_display` pointer. [`resolve`] folds both into one [`PlatformData`] pair of opaque
//! pointer-sized handles, which is what the renderer is initialized from.

use std::{
    ffi::{c_ulong, c_void},
    fmt::{Debug, Formatter},
    ptr::NonNull,
};

use raw_window_handle::{
    HandleError, HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle,
    WaylandDisplayHandle, WaylandWindowHandle, XlibDisplayHandle, XlibWindowHandle,
};
use wgpu::SurfaceTargetUnsafe;

/// Display protocols a [`WindowInfo`] can be resolved for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// Direct display-server connection: `Display*` plus a numeric `Window` id.
    X11,
    /// Compositor surface: `wl_display*` plus `wl_surface*`.
    Wayland,
}

impl Protocol {
    /// Every protocol this crate knows how to resolve.
    pub const ALL: [Protocol; 2] = [Protocol::X11, Protocol::Wayland];

    pub fn name(self) -> &'static str {
        match self {
            Protocol::X11 => "X11",
            Protocol::Wayland => "Wayland",
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Protocol-tagged native references of a live window. Only valid while that window exists.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WindowInfo {
    X11 {
        connection: *mut c_void,
        window: c_ulong,
    },
    Wayland {
        display: *mut c_void,
        surface: *mut c_void,
    },
    /// Handles from a windowing backend that has no resolution rule.
    Unsupported { backend: &'static str },
}

impl WindowInfo {
    /// Query the native handles of `window`. Fails if the windowing system can't hand them out.
    pub fn query<W>(window: &W) -> Result<WindowInfo, PlatformError>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        let window_handle = window
            .window_handle()
            .map_err(PlatformError::HandleQuery)?;
        let display_handle = window
            .display_handle()
            .map_err(PlatformError::HandleQuery)?;
        Ok(Self::from_raw(display_handle.as_raw(), window_handle.as_raw()))
    }

    pub fn from_raw(display: RawDisplayHandle, window: RawWindowHandle) -> WindowInfo {
        match (display, window) {
            (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(window)) => WindowInfo::X11 {
                connection: display
                    .display
                    .map_or(std::ptr::null_mut(), NonNull::as_ptr),
                window: window.window,
            },
            (RawDisplayHandle::Wayland(display), RawWindowHandle::Wayland(window)) => {
                WindowInfo::Wayland {
                    display: display.display.as_ptr(),
                    surface: window.surface.as_ptr(),
                }
            }
            (RawDisplayHandle::Xlib(_), RawWindowHandle::Wayland(_))
            | (RawDisplayHandle::Wayland(_), RawWindowHandle::Xlib(_)) => {
                WindowInfo::Unsupported {
                    backend: "mixed X11/Wayland handles",
                }
            }
            (_, window) => WindowInfo::Unsupported {
                backend: raw_window_backend_name(&window),
            },
        }
    }

    /// The protocol of this descriptor, `None` when unsupported.
    pub fn protocol(&self) -> Option<Protocol> {
        match self {
            WindowInfo::X11 {
                ..
            } => Some(Protocol::X11),
            WindowInfo::Wayland {
                ..
            } => Some(Protocol::Wayland),
            WindowInfo::Unsupported {
                ..
            } => None,
        }
    }
}

fn raw_window_backend_name(handle: &RawWindowHandle) -> &'static str {
    match handle {
        RawWindowHandle::Xlib(_) => "Xlib",
        RawWindowHandle::Xcb(_) => "Xcb",
        RawWindowHandle::Wayland(_) => "Wayland",
        RawWindowHandle::Drm(_) => "Drm",
        RawWindowHandle::Gbm(_) => "Gbm",
        RawWindowHandle::Win32(_) => "Win32",
        RawWindowHandle::WinRt(_) => "WinRt",
        RawWindowHandle::AppKit(_) => "AppKit",
        RawWindowHandle::UiKit(_) => "UiKit",
        RawWindowHandle::AndroidNdk(_) => "AndroidNdk",
        RawWindowHandle::Web(_) => "Web",
        _ => "unknown",
    }
}

/// Opaque pointer-sized native handle. Never dereferenced by this crate.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NativeHandle(*mut c_void);

impl NativeHandle {
    pub const NULL: NativeHandle = NativeHandle(std::ptr::null_mut());

    pub fn from_ptr(ptr: *mut c_void) -> NativeHandle {
        NativeHandle(ptr)
    }

    pub fn as_ptr(self) -> *mut c_void {
        self.0
    }

    pub fn addr(self) -> usize {
        self.0 as usize
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }

    /// Inverse of [`window_id_to_handle`].
    pub fn to_window_id(self) -> c_ulong {
        self.addr() as c_ulong
    }
}

impl Default for NativeHandle {
    fn default() -> Self {
        NativeHandle::NULL
    }
}

impl Debug for NativeHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.addr())
    }
}

/// Carry a numeric X11 window id in a pointer-sized handle slot.
///
/// The result is a number, not an address. It must never be dereferenced; the only way back is
/// [`NativeHandle::to_window_id`].
pub fn window_id_to_handle(window: c_ulong) -> NativeHandle {
    NativeHandle(window as usize as *mut c_void)
}

/// The display/window handle pair the renderer is initialized with.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PlatformData {
    pub display: NativeHandle,
    pub window: NativeHandle,
}

impl PlatformData {
    /// Query `window` and resolve its handles against the `supported` protocols.
    pub fn from_window<W>(window: &W, supported: &[Protocol]) -> Result<PlatformData, PlatformError>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        let info = WindowInfo::query(window)?;
        resolve(&info, supported)
    }

    /// Rebuild raw handles of `protocol` for wgpu surface creation.
    pub fn surface_target(&self, protocol: Protocol) -> Result<SurfaceTargetUnsafe, PlatformError> {
        if self.window.is_null() {
            return Err(PlatformError::NullWindowHandle(protocol));
        }
        let (raw_display_handle, raw_window_handle) = match protocol {
            Protocol::X11 => {
                // Screen is not part of the handle pair, the default screen is assumed.
                let display = XlibDisplayHandle::new(NonNull::new(self.display.as_ptr()), 0);
                let window = XlibWindowHandle::new(self.window.to_window_id());
                (RawDisplayHandle::Xlib(display), RawWindowHandle::Xlib(window))
            }
            Protocol::Wayland => {
                let Some(display) = NonNull::new(self.display.as_ptr()) else {
                    return Err(PlatformError::NullDisplayHandle(protocol));
                };
                let Some(surface) = NonNull::new(self.window.as_ptr()) else {
                    return Err(PlatformError::NullWindowHandle(protocol));
                };
                (
                    RawDisplayHandle::Wayland(WaylandDisplayHandle::new(display)),
                    RawWindowHandle::Wayland(WaylandWindowHandle::new(surface)),
                )
            }
        };
        Ok(SurfaceTargetUnsafe::RawHandle {
            raw_display_handle,
            raw_window_handle,
        })
    }
}

/// Resolve `info` into [`PlatformData`].
///
/// Fails when the protocol is not in `supported` or when the extracted window handle is null.
pub fn resolve(info: &WindowInfo, supported: &[Protocol]) -> Result<PlatformData, PlatformError> {
    resolve_with_protocol(info, supported).map(|(_, data)| data)
}

/// Same as [`resolve`], also returning the protocol the data belongs to.
pub fn resolve_with_protocol(
    info: &WindowInfo,
    supported: &[Protocol],
) -> Result<(Protocol, PlatformData), PlatformError> {
    let (protocol, data) = match *info {
        WindowInfo::X11 {
            connection,
            window,
        } => (Protocol::X11, PlatformData {
            display: NativeHandle::from_ptr(connection),
            window: window_id_to_handle(window),
        }),
        WindowInfo::Wayland {
            display,
            surface,
        } => (Protocol::Wayland, PlatformData {
            display: NativeHandle::from_ptr(display),
            window: NativeHandle::from_ptr(surface),
        }),
        WindowInfo::Unsupported {
            backend,
        } => {
            log::error!("Unsupported windowing backend: {}", backend);
            return Err(PlatformError::UnsupportedProtocol(backend));
        }
    };
    if !supported.contains(&protocol) {
        log::error!("{} handles are not enabled (supported: {:?})", protocol, supported);
        return Err(PlatformError::UnsupportedProtocol(protocol.name()));
    }

    log::info!(
        "{} display={:?} window={:?}",
        protocol,
        data.display,
        data.window
    );
    if data.window.is_null() {
        return Err(PlatformError::NullWindowHandle(protocol));
    }
    Ok((protocol, data))
}

#[derive(Debug)]
pub enum PlatformError {
    /// The windowing system could not provide native handles.
    HandleQuery(HandleError),
    UnsupportedProtocol(&'static str),
    NullWindowHandle(Protocol),
    NullDisplayHandle(Protocol),
}

impl std::fmt::Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformError::HandleQuery(e) => write!(f, "native handle query failed: {}", e),
            PlatformError::UnsupportedProtocol(name) => {
                write!(f, "unsupported windowing protocol: {}", name)
            }
            PlatformError::NullWindowHandle(protocol) => {
                write!(f, "{} window handle is null", protocol)
            }
            PlatformError::NullDisplayHandle(protocol) => {
                write!(f, "{} display handle is null", protocol)
            }
        }
    }
}

impl std::error::Error for PlatformError {}
