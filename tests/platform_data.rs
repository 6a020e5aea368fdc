use std::ffi::c_void;

use pane::platform::{
    resolve, resolve_with_protocol, window_id_to_handle, PlatformData, PlatformError, Protocol,
    WindowInfo,
};

#[test]
fn x11_descriptor_resolves_to_connection_and_id() {
    let info = WindowInfo::X11 {
        connection: 0x1000 as *mut c_void,
        window: 42,
    };
    let data = resolve(&info, &Protocol::ALL).expect("X11 handles resolve");
    assert_eq!(data, PlatformData {
        display: pane::platform::NativeHandle::from_ptr(0x1000 as *mut c_void),
        window: window_id_to_handle(42),
    });
    assert_eq!(data.window.addr(), 42);
}

#[test]
fn wayland_descriptor_with_null_surface_fails() {
    let info = WindowInfo::Wayland {
        display: 0x2000 as *mut c_void,
        surface: std::ptr::null_mut(),
    };
    let result = resolve(&info, &Protocol::ALL);
    assert!(matches!(
        result,
        Err(PlatformError::NullWindowHandle(Protocol::Wayland))
    ));
}

#[test]
fn third_protocol_fails_without_data() {
    let info = WindowInfo::Unsupported {
        backend: "AppKit",
    };
    match resolve_with_protocol(&info, &Protocol::ALL) {
        Err(PlatformError::UnsupportedProtocol(name)) => assert_eq!(name, "AppKit"),
        other => panic!("expected unsupported protocol, got {:?}", other),
    }
}

#[test]
fn protocol_is_reported_with_data() {
    let info = WindowInfo::Wayland {
        display: 0x2000 as *mut c_void,
        surface: 0x3000 as *mut c_void,
    };
    let (protocol, data) = resolve_with_protocol(&info, &Protocol::ALL).unwrap();
    assert_eq!(protocol, Protocol::Wayland);
    assert_eq!(data.display.addr(), 0x2000);
    assert_eq!(data.window.addr(), 0x3000);
}

#[test]
fn x11_only_configuration_rejects_wayland() {
    let info = WindowInfo::Wayland {
        display: 0x2000 as *mut c_void,
        surface: 0x3000 as *mut c_void,
    };
    assert!(resolve(&info, &[Protocol::X11]).is_err());

    let x11 = WindowInfo::X11 {
        connection: 0x1000 as *mut c_void,
        window: 9,
    };
    assert!(resolve(&x11, &[Protocol::X11]).is_ok());
}
