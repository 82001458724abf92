use thiserror::Error;

#[derive(Error, Debug)]
pub enum SgmError {
    #[error("disparity size must be 64, 128 or 256, got {0}")]
    InvalidDisparitySize(u32),
    #[error("path type must be SCAN_4PATH or SCAN_8PATH")]
    InvalidPathType,
    #[error("failed to find an appropriate GPU adapter")]
    AdapterRequestFailed,
    #[error("failed to request a GPU device: {0}")]
    DeviceRequestFailed(#[from] wgpu::RequestDeviceError),
    #[error("failed to compile shader: {0}")]
    ShaderCompilation(String),
    #[error("failed to read back device buffer: {0}")]
    BufferReadback(String),
    #[error("input buffer length mismatch: expected {expected}, got {actual}")]
    InvalidInputLength { expected: usize, actual: usize },
}
