use bytemuck::{Pod, Zeroable};

/// Host-side mirrors of the uniform structs declared in `shaders/inttypes.wgsl`.
/// Field order and width must track the WGSL side exactly.

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub _pad: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct PathParams {
    pub width: u32,
    pub height: u32,
    pub p1: u32,
    pub p2: u32,
    pub min_disp: i32,
    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct WtaParams {
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub uniqueness_num: u32,
    pub uniqueness_den: u32,
    pub min_disp: i32,
    pub compute_right: u32,
    pub num_paths: u32,
    pub invalid_disp_scaled: i32,
    pub _pad2: u32,
    pub _pad3: u32,
    pub _pad4: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ConsistencyParams {
    pub width: u32,
    pub height: u32,
    pub src_pitch: u32,
    pub dst_pitch: u32,
    pub subpixel: u32,
    pub lr_max_diff: i32,
    pub invalid_disp_scaled: i32,
    pub _pad1: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct RangeCorrectionParams {
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub min_disp_scaled: i32,
    pub invalid_disp_scaled: i32,
    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_structs_are_pod() {
        fn assert_pod<T: Pod>() {}
        assert_pod::<Dimensions>();
        assert_pod::<PathParams>();
        assert_pod::<WtaParams>();
        assert_pod::<ConsistencyParams>();
        assert_pod::<RangeCorrectionParams>();
    }
}
