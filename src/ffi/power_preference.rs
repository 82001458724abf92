use crate::core::params::DevicePowerPreference;

#[repr(C)]
pub enum CPowerPreference {
    None = 0,
    LowPower = 1,
    HighPerformance = 2,
}

impl From<DevicePowerPreference> for CPowerPreference {
    fn from(pref: DevicePowerPreference) -> Self {
        match pref {
            DevicePowerPreference::None => CPowerPreference::None,
            DevicePowerPreference::LowPower => CPowerPreference::LowPower,
            DevicePowerPreference::HighPerformance => CPowerPreference::HighPerformance,
        }
    }
}

impl From<CPowerPreference> for DevicePowerPreference {
    fn from(pref: CPowerPreference) -> Self {
        match pref {
            CPowerPreference::None => DevicePowerPreference::None,
            CPowerPreference::LowPower => DevicePowerPreference::LowPower,
            CPowerPreference::HighPerformance => DevicePowerPreference::HighPerformance,
        }
    }
}
