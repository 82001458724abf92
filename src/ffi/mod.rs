pub mod handle;
pub mod power_preference;

pub use handle::{stereo_sgm_create, stereo_sgm_destroy, stereo_sgm_execute, stereo_sgm_invalid_disparity, CParameters, StereoSgmHandle};
pub use power_preference::CPowerPreference;
