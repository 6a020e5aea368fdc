use wgpu::{
    Adapter, Backends, Device, DeviceDescriptor, Instance, InstanceDescriptor, InstanceFlags,
    Limits, MemoryHints, PowerPreference, Queue, RequestAdapterOptions, Surface,
    SurfaceTargetUnsafe,
};

use crate::PaneError;

#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub power_preference: PowerPreference,
    pub memory_hints: MemoryHints,
    pub features: wgpu::Features,
    pub limits: Limits,
    /// `Backends::all()` lets wgpu pick whatever the platform offers.
    pub backends: Backends,
    pub instance_flags: InstanceFlags,
}

impl DeviceConfig {
    /// Default config with `WGPU_BACKEND` and `WGPU_POWER_PREF` overrides applied.
    pub fn from_env() -> DeviceConfig {
        let default = DeviceConfig::default();
        DeviceConfig {
            backends: Backends::from_env().unwrap_or(default.backends),
            power_preference: PowerPreference::from_env().unwrap_or(default.power_preference),
            instance_flags: default.instance_flags.with_env(),
            ..default
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            power_preference: PowerPreference::default(),
            memory_hints: MemoryHints::Performance,
            features: wgpu::Features::empty(),
            limits: Limits::default(),
            backends: Backends::all(),
            instance_flags: InstanceFlags::from_build_config(),
        }
    }
}

/// Adapter, device and queue created against one window surface. The surface and adapter keep
/// the instance alive.
#[derive(Debug)]
pub struct DeviceContext {
    adapter: Adapter,
    device: Device,
    queue: Queue,
}

impl DeviceContext {
    /// Creates the surface from raw native handles and a device able to present to it.
    ///
    /// # Safety
    ///
    /// The handles in `target` must stay valid for as long as the returned surface lives.
    pub unsafe fn with_surface(
        config: &DeviceConfig,
        target: SurfaceTargetUnsafe,
    ) -> Result<(DeviceContext, Surface<'static>), PaneError> {
        let instance = Instance::new(&InstanceDescriptor {
            backends: config.backends,
            flags: config.instance_flags,
            ..Default::default()
        });
        let surface = match unsafe { instance.create_surface_unsafe(target) } {
            Ok(s) => s,
            Err(e) => return Err(PaneError::SurfaceError(e)),
        };
        let adapter = match pollster::block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: config.power_preference,
            force_fallback_adapter: false,
            compatible_surface: Some(&surface),
        })) {
            Ok(a) => a,
            Err(e) => return Err(PaneError::AdapterError(e)),
        };

        let (device, queue) = match pollster::block_on(adapter.request_device(&DeviceDescriptor {
            label: None,
            required_features: config.features,
            required_limits: config.limits.clone(),
            memory_hints: config.memory_hints.clone(),
            trace: wgpu::Trace::Off,
        })) {
            Ok(dq) => dq,
            Err(e) => return Err(PaneError::DeviceError(e)),
        };

        Ok((
            Self {
                adapter,
                device,
                queue,
            },
            surface,
        ))
    }

    /// Name of the graphics API wgpu settled on, e.g. "Vulkan".
    pub fn backend_name(&self) -> String {
        format!("{:?}", self.adapter.get_info().backend)
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }
}
