use pollster::block_on;

use crate::core::error::SgmError;
use crate::core::params::DeviceOptions;

/// Owns the device and queue every buffer, program and pipeline stage of
/// `StereoSgm` is built against. Created once at construction, released at
/// destruction; `execute` never allocates a new one.
pub struct DeviceContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl DeviceContext {
    pub fn new(options: DeviceOptions) -> Result<Self, SgmError> {
        let instance = wgpu::Instance::default();

        let adapter = block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: options.power_preference.into(),
            ..Default::default()
        }))
        .ok_or(SgmError::AdapterRequestFailed)?;

        log::debug!("requested adapter: {:?}", adapter.get_info());

        let (device, queue) = block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("stereo_sgm device"),
                features: wgpu::Features::empty(),
                limits: wgpu::Limits::default(),
            },
            None,
        ))?;

        Ok(DeviceContext { device, queue })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_context_new() {
        let result = DeviceContext::new(DeviceOptions::default());
        assert!(result.is_ok());
    }
}
