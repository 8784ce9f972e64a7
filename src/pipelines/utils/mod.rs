use candle_core::Device;

/// Picks the best available accelerator: CUDA device 0, then Metal, then CPU.
pub fn load_device() -> anyhow::Result<Device> {
    if candle_core::utils::cuda_is_available() {
        Ok(Device::new_cuda(0)?)
    } else if candle_core::utils::metal_is_available() {
        Ok(Device::new_metal(0)?)
    } else {
        Ok(Device::Cpu)
    }
}

/// Request for a specific device, used by pipeline builders and the training job.
#[derive(Debug, Clone, Default)]
pub enum DeviceRequest {
    /// Use an accelerator if available, otherwise CPU.
    #[default]
    Default,
    /// Force CPU even if an accelerator is available.
    Cpu,
    /// Select a specific CUDA device by index.
    Cuda(usize),
    /// Provide an already constructed device.
    Explicit(Device),
}

impl DeviceRequest {
    /// Resolve the request into an actual [`Device`].
    pub fn resolve(self) -> anyhow::Result<Device> {
        match self {
            DeviceRequest::Default => load_device(),
            DeviceRequest::Cpu => Ok(Device::Cpu),
            DeviceRequest::Cuda(i) => Ok(Device::new_cuda(i)?),
            DeviceRequest::Explicit(d) => Ok(d),
        }
    }
}

/// Human-readable device name for logs.
pub fn describe_device(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}
