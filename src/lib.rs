pub mod core;
pub mod ffi;
pub mod pipeline;

pub use crate::core::device::DeviceContext;
pub use crate::core::error::SgmError;
pub use crate::core::params::{DeviceOptions, DevicePowerPreference, MaxDisparity, Parameters, PathType};
pub use crate::core::sgm::StereoSgm;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stereo_sgm_default_parameters_round_trip() {
        let params = Parameters::default();
        assert_eq!(params.invalid_disparity(), -1);
    }
}
