use crate::core::error::SgmError;

/// Number of scanlines used in cost aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathType {
    /// Horizontal and vertical paths.
    Scan4Path,
    /// Horizontal, vertical and oblique paths.
    Scan8Path,
}

impl PathType {
    pub fn num_paths(self) -> u32 {
        match self {
            PathType::Scan4Path => 4,
            PathType::Scan8Path => 8,
        }
    }
}

/// Compile-time disparity cardinality. Controls kernel specialization for
/// every path-aggregation and winner-takes-all shader variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxDisparity {
    D64,
    D128,
    D256,
}

impl MaxDisparity {
    pub fn value(self) -> u32 {
        match self {
            MaxDisparity::D64 => 64,
            MaxDisparity::D128 => 128,
            MaxDisparity::D256 => 256,
        }
    }

    pub fn try_from_u32(d: u32) -> Result<Self, SgmError> {
        match d {
            64 => Ok(MaxDisparity::D64),
            128 => Ok(MaxDisparity::D128),
            256 => Ok(MaxDisparity::D256),
            other => Err(SgmError::InvalidDisparitySize(other)),
        }
    }
}

pub const fn subpixel_shift() -> i32 {
    4
}

pub const fn subpixel_scale() -> i32 {
    1 << subpixel_shift()
}

/// Tunable SGM parameters. Defaults mirror the reference stereo-sgm-ocl
/// implementation this crate's behavior is modeled on.
#[derive(Debug, Clone, Copy)]
pub struct Parameters {
    /// Penalty on the disparity change by plus or minus 1 between neighbor pixels.
    pub p1: u32,
    /// Penalty on the disparity change by more than 1 between neighbor pixels.
    pub p2: u32,
    /// Margin in ratio by which the best cost must beat the second best, outside its immediate neighborhood.
    pub uniqueness: f32,
    /// Enables 4-bit fractional disparity via parabola fit around the minimum.
    pub subpixel: bool,
    pub path_type: PathType,
    /// Minimum searched disparity; output is shifted by this.
    pub min_disp: i32,
    /// Maximum |left[x] - right[x - left[x]]| tolerated by the consistency check. Negative disables the check.
    pub lr_max_diff: i32,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            p1: 10,
            p2: 120,
            uniqueness: 0.95,
            subpixel: false,
            path_type: PathType::Scan8Path,
            min_disp: 0,
            lr_max_diff: 1,
        }
    }
}

impl Parameters {
    pub fn scale(&self) -> i32 {
        if self.subpixel {
            subpixel_scale()
        } else {
            1
        }
    }

    pub fn invalid_disparity(&self) -> i32 {
        (self.min_disp - 1) * self.scale()
    }
}

/// Construction-time knob for which adapter class `StereoSgm` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePowerPreference {
    None,
    LowPower,
    HighPerformance,
}

impl From<DevicePowerPreference> for wgpu::PowerPreference {
    fn from(pref: DevicePowerPreference) -> Self {
        match pref {
            DevicePowerPreference::None => wgpu::PowerPreference::None,
            DevicePowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            DevicePowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeviceOptions {
    pub power_preference: DevicePowerPreference,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        DeviceOptions {
            power_preference: DevicePowerPreference::HighPerformance,
        }
    }
}
