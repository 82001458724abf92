use std::ptr::NonNull;
use std::slice;

use crate::core::params::{DeviceOptions, Parameters, PathType};
use crate::core::sgm::StereoSgm;
use crate::ffi::power_preference::CPowerPreference;

#[repr(C)]
pub struct CParameters {
    pub p1: u32,
    pub p2: u32,
    pub uniqueness: f32,
    pub subpixel: bool,
    pub path_type_8: bool,
    pub min_disp: i32,
    pub lr_max_diff: i32,
}

impl From<CParameters> for Parameters {
    fn from(c: CParameters) -> Self {
        Parameters {
            p1: c.p1,
            p2: c.p2,
            uniqueness: c.uniqueness,
            subpixel: c.subpixel,
            path_type: if c.path_type_8 { PathType::Scan8Path } else { PathType::Scan4Path },
            min_disp: c.min_disp,
            lr_max_diff: c.lr_max_diff,
        }
    }
}

#[repr(C)]
pub struct StereoSgmHandle {
    sgm: NonNull<StereoSgm>,
}

/// Builds a `StereoSgm` pipeline for `width x height` images with up to
/// `max_disparity` disparities. Returns null on construction failure
/// (unsupported `max_disparity`, no adapter, device request failure).
#[no_mangle]
pub extern "C" fn stereo_sgm_create(
    width: u32,
    height: u32,
    max_disparity: u32,
    parameters: CParameters,
    power_preference: CPowerPreference,
) -> *mut StereoSgmHandle {
    let options = DeviceOptions { power_preference: power_preference.into() };
    let sgm = match StereoSgm::new(width, height, max_disparity, parameters.into(), options) {
        Ok(sgm) => Box::new(sgm),
        Err(_) => return std::ptr::null_mut(),
    };

    let handle = Box::new(StereoSgmHandle {
        sgm: NonNull::new(Box::into_raw(sgm)).unwrap(),
    });

    Box::into_raw(handle)
}

/// Runs the pipeline against row-major 8-bit `left`/`right` images and
/// writes `width * height` signed 16-bit disparities into `dst`. Returns
/// `false` if any pointer is null or `execute` itself fails.
#[no_mangle]
pub extern "C" fn stereo_sgm_execute(
    handle: *mut StereoSgmHandle,
    left: *const u8,
    right: *const u8,
    dst: *mut i16,
) -> bool {
    if handle.is_null() || left.is_null() || right.is_null() || dst.is_null() {
        return false;
    }

    let handle = unsafe { &*handle };
    let sgm = unsafe { handle.sgm.as_ref() };
    let pixels = (sgm.width() * sgm.height()) as usize;

    let left = unsafe { slice::from_raw_parts(left, pixels) };
    let right = unsafe { slice::from_raw_parts(right, pixels) };
    let dst = unsafe { slice::from_raw_parts_mut(dst, pixels) };

    sgm.execute(left, right, dst).is_ok()
}

#[no_mangle]
pub extern "C" fn stereo_sgm_invalid_disparity(handle: *mut StereoSgmHandle) -> i32 {
    if handle.is_null() {
        return 0;
    }
    let handle = unsafe { &*handle };
    unsafe { handle.sgm.as_ref() }.invalid_disparity()
}

#[no_mangle]
pub extern "C" fn stereo_sgm_destroy(handle: *mut StereoSgmHandle) {
    if handle.is_null() {
        return;
    }
    let handle = unsafe { Box::from_raw(handle) };
    let _sgm = unsafe { Box::from_raw(handle.sgm.as_ptr()) };
}
