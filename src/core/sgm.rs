use flume::Receiver;

use crate::core::buffer::DeviceBuffer;
use crate::core::device::DeviceContext;
use crate::core::error::SgmError;
use crate::core::params::{DeviceOptions, MaxDisparity, Parameters};
use crate::pipeline::census::{self, CensusStage};
use crate::pipeline::consistency::{self, ConsistencyStage};
use crate::pipeline::median_filter::{self, MedianFilterStage};
use crate::pipeline::path_aggregation::{self, PathAggregationStage};
use crate::pipeline::range_correction::{self, RangeCorrectionStage};
use crate::pipeline::winner_takes_all::{self, WinnerTakesAllStage};

fn packed_bytes_size(elements: u64, elements_per_word: u64) -> u64 {
    ((elements + elements_per_word - 1) / elements_per_word) * 4
}

/// GPU-resident image pair and scratch buffers for one fixed `(width,
/// height)`. Allocated once at construction, reused by every `execute`
/// call; resizing means building a new `StereoSgm`.
struct Buffers {
    left_img: DeviceBuffer,
    right_img: DeviceBuffer,
    feature_left: DeviceBuffer,
    feature_right: DeviceBuffer,
    /// `num_paths` disjoint sub-buffer views over one contiguous parent
    /// allocation (`sub_buffer`); each holds its own `Arc` clone of the
    /// parent's `wgpu::Buffer`, so the parent itself need not be kept here.
    cost_volumes: Vec<DeviceBuffer>,
    left_disp: DeviceBuffer,
    right_disp: DeviceBuffer,
    left_disp_filtered: DeviceBuffer,
    right_disp_filtered: DeviceBuffer,
    staging: DeviceBuffer,

    dims_uniform: DeviceBuffer,
    path_params_uniform: DeviceBuffer,
    wta_params_left: DeviceBuffer,
    wta_params_right: DeviceBuffer,
    consistency_params_uniform: DeviceBuffer,
    range_params_uniform: DeviceBuffer,
}

/// GPU-accelerated Semi-Global Matching stereo disparity pipeline:
/// census transform, multi-directional path cost aggregation,
/// winner-takes-all with uniqueness and subpixel refinement, then median
/// filtering, left-right consistency checking and disparity range
/// correction.
pub struct StereoSgm {
    ctx: DeviceContext,
    params: Parameters,
    max_disparity: MaxDisparity,
    width: u32,
    height: u32,

    census: CensusStage,
    path_aggregation: PathAggregationStage,
    winner_takes_all: WinnerTakesAllStage,
    median_filter: MedianFilterStage,
    consistency: ConsistencyStage,
    range_correction: RangeCorrectionStage,

    buffers: Buffers,
}

impl StereoSgm {
    pub fn new(
        width: u32,
        height: u32,
        max_disparity: u32,
        parameters: Parameters,
        device_options: DeviceOptions,
    ) -> Result<Self, SgmError> {
        let max_disparity = MaxDisparity::try_from_u32(max_disparity)?;
        let ctx = DeviceContext::new(device_options)?;
        log::debug!(
            "StereoSgm: {width}x{height}, max_disparity={}, path_type={:?}",
            max_disparity.value(),
            parameters.path_type
        );

        let census = CensusStage::new(&ctx.device);
        let num_paths = parameters.path_type.num_paths();
        let path_aggregation = PathAggregationStage::new(&ctx.device, max_disparity, num_paths);
        let winner_takes_all = WinnerTakesAllStage::new(&ctx.device, max_disparity, parameters.subpixel);
        let median_filter = MedianFilterStage::new(&ctx.device);
        let consistency = ConsistencyStage::new(&ctx.device);
        let range_correction = RangeCorrectionStage::new(&ctx.device);

        let buffers = Self::allocate_buffers(&ctx, width, height, max_disparity, &parameters, num_paths);

        Ok(StereoSgm {
            ctx,
            params: parameters,
            max_disparity,
            width,
            height,
            census,
            path_aggregation,
            winner_takes_all,
            median_filter,
            consistency,
            range_correction,
            buffers,
        })
    }

    fn allocate_buffers(
        ctx: &DeviceContext,
        width: u32,
        height: u32,
        max_disparity: MaxDisparity,
        params: &Parameters,
        num_paths: u32,
    ) -> Buffers {
        let device = &ctx.device;
        let pixels = (width * height) as u64;
        let d = max_disparity.value() as u64;

        let image_bytes = packed_bytes_size(pixels, 4);
        let feature_bytes = pixels * 4;
        let cost_bytes = packed_bytes_size(pixels * d, 4);
        let disp_bytes = packed_bytes_size(pixels, 2);

        let storage_rw = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC;
        let storage_upload = wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST;

        let left_img = DeviceBuffer::allocate(device, "left_img", image_bytes, storage_upload);
        let right_img = DeviceBuffer::allocate(device, "right_img", image_bytes, storage_upload);
        let feature_left = DeviceBuffer::allocate(device, "feature_left", feature_bytes, storage_rw);
        let feature_right = DeviceBuffer::allocate(device, "feature_right", feature_bytes, storage_rw);

        let cost_volume_parent =
            DeviceBuffer::allocate(device, "cost_volume", cost_bytes * num_paths as u64, storage_rw);
        let cost_volumes = (0..num_paths as u64)
            .map(|i| cost_volume_parent.sub_buffer(i * cost_bytes, cost_bytes))
            .collect();

        let left_disp = DeviceBuffer::allocate(device, "left_disp", disp_bytes, storage_rw);
        let right_disp = DeviceBuffer::allocate(device, "right_disp", disp_bytes, storage_rw);
        let left_disp_filtered = DeviceBuffer::allocate(device, "left_disp_filtered", disp_bytes, storage_rw);
        let right_disp_filtered = DeviceBuffer::allocate(device, "right_disp_filtered", disp_bytes, storage_rw);

        let staging = DeviceBuffer::allocate(
            device,
            "staging_readback",
            disp_bytes,
            wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        );

        let dims_uniform = DeviceBuffer::uniform(device, &ctx.queue, "dims_uniform", &census::dimensions(width, height));
        let path_params_uniform = DeviceBuffer::uniform(
            device,
            &ctx.queue,
            "path_params_uniform",
            &path_aggregation::path_params(width, height, params.p1, params.p2, params.min_disp),
        );
        let invalid_disp_scaled = params.invalid_disparity();
        let wta_params_left = DeviceBuffer::uniform(
            device,
            &ctx.queue,
            "wta_params_left",
            &winner_takes_all::wta_params(width, height, params.uniqueness, params.min_disp, false, num_paths, invalid_disp_scaled),
        );
        let wta_params_right = DeviceBuffer::uniform(
            device,
            &ctx.queue,
            "wta_params_right",
            &winner_takes_all::wta_params(width, height, params.uniqueness, params.min_disp, true, num_paths, invalid_disp_scaled),
        );
        let consistency_params_uniform = DeviceBuffer::uniform(
            device,
            &ctx.queue,
            "consistency_params_uniform",
            &consistency::consistency_params(width, height, params.subpixel, params.lr_max_diff, invalid_disp_scaled),
        );
        let min_disp_scaled = params.min_disp * params.scale();
        let range_params_uniform = DeviceBuffer::uniform(
            device,
            &ctx.queue,
            "range_params_uniform",
            &range_correction::range_params(width, height, min_disp_scaled, invalid_disp_scaled),
        );

        Buffers {
            left_img,
            right_img,
            feature_left,
            feature_right,
            cost_volumes,
            left_disp,
            right_disp,
            left_disp_filtered,
            right_disp_filtered,
            staging,
            dims_uniform,
            path_params_uniform,
            wta_params_left,
            wta_params_right,
            consistency_params_uniform,
            range_params_uniform,
        }
    }

    /// Runs the full pipeline against a stereo pair and writes the
    /// resulting disparity map into `dst`. `left`/`right` are row-major
    /// 8-bit grayscale buffers of `width * height` bytes; `dst` receives
    /// `width * height` signed 16-bit disparities scaled by
    /// [`Parameters::scale`].
    pub fn execute(&self, left: &[u8], right: &[u8], dst: &mut [i16]) -> Result<(), SgmError> {
        let pixels = (self.width * self.height) as usize;
        if left.len() != pixels || right.len() != pixels {
            return Err(SgmError::InvalidInputLength { expected: pixels, actual: left.len().max(right.len()) });
        }
        if dst.len() != pixels {
            return Err(SgmError::InvalidInputLength { expected: pixels, actual: dst.len() });
        }

        log::trace!("execute: {}x{} disparity={}", self.width, self.height, self.max_disparity.value());

        self.ctx.queue.write_buffer(self.buffers.left_img.raw_handle(), 0, left);
        self.ctx.queue.write_buffer(self.buffers.right_img.raw_handle(), 0, right);

        let mut census_encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("census_encoder"),
        });
        self.census.encode(
            &self.ctx.device,
            &mut census_encoder,
            &self.buffers.left_img,
            &self.buffers.feature_left,
            &self.buffers.dims_uniform,
            self.width,
            self.height,
        );
        self.census.encode(
            &self.ctx.device,
            &mut census_encoder,
            &self.buffers.right_img,
            &self.buffers.feature_right,
            &self.buffers.dims_uniform,
            self.width,
            self.height,
        );
        self.ctx.queue.submit(std::iter::once(census_encoder.finish()));
        log::trace!("census transform dispatched for both images");

        let aggregation_commands = self.path_aggregation.encode_all(
            &self.ctx.device,
            &self.buffers.feature_left,
            &self.buffers.feature_right,
            &self.buffers.path_params_uniform,
            &self.buffers.cost_volumes,
            self.width,
            self.height,
        );
        log::trace!("submitting {} concurrent path aggregation command buffers", self.path_aggregation.num_directions());
        self.ctx.queue.submit(aggregation_commands);

        let mut wta_encoder = self.ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("winner_takes_all_encoder"),
        });
        self.winner_takes_all.encode(
            &self.ctx.device,
            &mut wta_encoder,
            &self.buffers.cost_volumes,
            &self.buffers.left_disp,
            &self.buffers.wta_params_left,
            self.width,
            self.height,
        );
        self.winner_takes_all.encode(
            &self.ctx.device,
            &mut wta_encoder,
            &self.buffers.cost_volumes,
            &self.buffers.right_disp,
            &self.buffers.wta_params_right,
            self.width,
            self.height,
        );
        self.median_filter.encode(
            &self.ctx.device,
            &mut wta_encoder,
            &self.buffers.left_disp,
            &self.buffers.left_disp_filtered,
            &self.buffers.dims_uniform,
            self.width,
            self.height,
        );
        self.median_filter.encode(
            &self.ctx.device,
            &mut wta_encoder,
            &self.buffers.right_disp,
            &self.buffers.right_disp_filtered,
            &self.buffers.dims_uniform,
            self.width,
            self.height,
        );
        if self.params.lr_max_diff >= 0 {
            self.consistency.encode(
                &self.ctx.device,
                &mut wta_encoder,
                &self.buffers.left_disp_filtered,
                &self.buffers.right_disp_filtered,
                &self.buffers.consistency_params_uniform,
                self.width,
                self.height,
            );
        }
        if self.params.subpixel || self.params.min_disp != 0 {
            self.range_correction.encode(
                &self.ctx.device,
                &mut wta_encoder,
                &self.buffers.left_disp_filtered,
                &self.buffers.range_params_uniform,
                self.width,
                self.height,
            );
        }

        let disp_bytes = self.buffers.left_disp_filtered.size();
        wta_encoder.copy_buffer_to_buffer(
            self.buffers.left_disp_filtered.raw_handle(),
            0,
            self.buffers.staging.raw_handle(),
            0,
            disp_bytes,
        );
        self.ctx.queue.submit(std::iter::once(wta_encoder.finish()));

        self.read_disparity_map(dst)
    }

    fn read_disparity_map(&self, dst: &mut [i16]) -> Result<(), SgmError> {
        let slice = self.buffers.staging.raw_handle().slice(..);
        let (sender, receiver): (_, Receiver<Result<(), wgpu::BufferAsyncError>>) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        self.ctx.device.poll(wgpu::Maintain::Wait);

        receiver
            .recv()
            .map_err(|e| SgmError::BufferReadback(e.to_string()))?
            .map_err(|e| SgmError::BufferReadback(e.to_string()))?;

        {
            let mapped = slice.get_mapped_range();
            let words: &[u32] = bytemuck::cast_slice(&mapped);
            for (i, value) in dst.iter_mut().enumerate() {
                let word = words[i / 2];
                let lane = (i % 2) * 16;
                let bits = (word >> lane) & 0xFFFF;
                *value = bits as i16;
            }
        }
        self.buffers.staging.raw_handle().unmap();

        Ok(())
    }

    pub fn invalid_disparity(&self) -> i32 {
        self.params.invalid_disparity()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn max_disparity(&self) -> u32 {
        self.max_disparity.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_max_disparity() {
        let result = StereoSgm::new(64, 64, 100, Parameters::default(), DeviceOptions::default());
        assert!(matches!(result, Err(SgmError::InvalidDisparitySize(100))));
    }

    #[test]
    fn test_execute_produces_expected_shape() {
        let width = 16;
        let height = 16;
        let sgm = StereoSgm::new(width, height, 64, Parameters::default(), DeviceOptions::default()).unwrap();

        let left = vec![128u8; (width * height) as usize];
        let right = vec![128u8; (width * height) as usize];
        let mut dst = vec![0i16; (width * height) as usize];

        sgm.execute(&left, &right, &mut dst).unwrap();
        assert_eq!(dst.len(), (width * height) as usize);
    }

    #[test]
    fn test_execute_rejects_mismatched_buffer_length() {
        let sgm = StereoSgm::new(16, 16, 64, Parameters::default(), DeviceOptions::default()).unwrap();
        let left = vec![0u8; 10];
        let right = vec![0u8; 256];
        let mut dst = vec![0i16; 256];
        let result = sgm.execute(&left, &right, &mut dst);
        assert!(matches!(result, Err(SgmError::InvalidInputLength { .. })));
    }

    #[test]
    fn test_execute_is_deterministic() {
        let width = 64;
        let height = 32;
        let sgm = StereoSgm::new(width, height, 64, Parameters::default(), DeviceOptions::default()).unwrap();

        let pixels = (width * height) as usize;
        let left: Vec<u8> = (0..pixels).map(|i| (i * 37 % 256) as u8).collect();
        let right: Vec<u8> = (0..pixels).map(|i| (i * 41 % 256) as u8).collect();

        let mut first = vec![0i16; pixels];
        let mut second = vec![0i16; pixels];
        sgm.execute(&left, &right, &mut first).unwrap();
        sgm.execute(&left, &right, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_disparity_uniform_images() {
        let width = 64;
        let height = 32;
        let params = Parameters::default();
        let invalid = params.invalid_disparity();
        let sgm = StereoSgm::new(width, height, 64, params, DeviceOptions::default()).unwrap();

        let pixels = (width * height) as usize;
        let left = vec![128u8; pixels];
        let right = vec![128u8; pixels];
        let mut dst = vec![0i16; pixels];
        sgm.execute(&left, &right, &mut dst).unwrap();

        for &value in &dst {
            assert!(value == 0 || value as i32 == invalid);
        }
    }

    #[test]
    fn test_horizontal_shift_recovers_disparity() {
        let width: u32 = 64;
        let height: u32 = 32;
        let shift: usize = 5;
        let sgm = StereoSgm::new(width, height, 64, Parameters::default(), DeviceOptions::default()).unwrap();

        let pixels = (width * height) as usize;
        let left: Vec<u8> = (0..pixels).map(|i| (i * 29 % 256) as u8).collect();
        let mut right = vec![0u8; pixels];
        for y in 0..height as usize {
            for x in 0..width as usize {
                if x >= shift {
                    right[y * width as usize + x] = left[y * width as usize + (x - shift)];
                }
            }
        }

        let mut dst = vec![0i16; pixels];
        sgm.execute(&left, &right, &mut dst).unwrap();

        let invalid = sgm.invalid_disparity();
        let window_radius = 6;
        for y in 0..height as usize {
            for x in (shift + window_radius)..width as usize {
                let value = dst[y * width as usize + x];
                assert!(value as i32 == invalid || (value as i32 - shift as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_d256_horizontal_shift_recovers_disparity() {
        // shift=40 lands in the upper half of D=256's 32-wide per-lane
        // disparity block (DP_BLOCK_SIZE=32), exercising path-aggregation
        // lanes that a too-small per-thread scratch array would corrupt.
        let width: u32 = 128;
        let height: u32 = 32;
        let shift: usize = 40;
        let sgm = StereoSgm::new(width, height, 256, Parameters::default(), DeviceOptions::default()).unwrap();

        let pixels = (width * height) as usize;
        let left: Vec<u8> = (0..pixels).map(|i| (i * 29 % 256) as u8).collect();
        let mut right = vec![0u8; pixels];
        for y in 0..height as usize {
            for x in 0..width as usize {
                if x >= shift {
                    right[y * width as usize + x] = left[y * width as usize + (x - shift)];
                }
            }
        }

        let mut dst = vec![0i16; pixels];
        sgm.execute(&left, &right, &mut dst).unwrap();

        let invalid = sgm.invalid_disparity();
        let window_radius = 6;
        for y in 0..height as usize {
            for x in (shift + window_radius)..width as usize {
                let value = dst[y * width as usize + x];
                assert!(value as i32 == invalid || (value as i32 - shift as i32).abs() <= 1);
            }
        }
    }

    #[test]
    fn test_d256_subpixel_output_in_range() {
        let width = 1280;
        let height = 720;
        let params = Parameters { subpixel: true, ..Parameters::default() };
        let invalid = params.invalid_disparity();
        let sgm = StereoSgm::new(width, height, 256, params, DeviceOptions::default()).unwrap();

        let pixels = (width * height) as usize;
        let left: Vec<u8> = (0..pixels).map(|i| ((i * 73) % 256) as u8).collect();
        let right: Vec<u8> = (0..pixels).map(|i| ((i * 97) % 256) as u8).collect();
        let mut dst = vec![0i16; pixels];
        sgm.execute(&left, &right, &mut dst).unwrap();

        for &value in &dst {
            assert!(value as i32 == invalid || (0..256 * 16).contains(&(value as i32)));
        }
    }

    #[test]
    fn test_min_disp_shifts_valid_range() {
        let width = 64;
        let height = 32;
        let params = Parameters { min_disp: 16, ..Parameters::default() };
        let invalid = params.invalid_disparity();
        assert_eq!(invalid, 15);
        let sgm = StereoSgm::new(width, height, 64, params, DeviceOptions::default()).unwrap();

        let pixels = (width * height) as usize;
        let left: Vec<u8> = (0..pixels).map(|i| (i * 53 % 256) as u8).collect();
        let right: Vec<u8> = (0..pixels).map(|i| (i * 59 % 256) as u8).collect();
        let mut dst = vec![0i16; pixels];
        sgm.execute(&left, &right, &mut dst).unwrap();

        for &value in &dst {
            let v = value as i32;
            assert!(v == invalid || (16..=79).contains(&v));
        }
    }

    #[test]
    fn test_negative_lr_max_diff_skips_consistency_check() {
        let width = 64;
        let height = 32;
        let pixels = (width * height) as usize;
        let left: Vec<u8> = (0..pixels).map(|i| (i * 31 % 256) as u8).collect();
        let right: Vec<u8> = (0..pixels).map(|i| (i * 43 % 256) as u8).collect();

        let enabled = StereoSgm::new(
            width,
            height,
            64,
            Parameters { lr_max_diff: 1, ..Parameters::default() },
            DeviceOptions::default(),
        )
        .unwrap();
        let disabled = StereoSgm::new(
            width,
            height,
            64,
            Parameters { lr_max_diff: -1, ..Parameters::default() },
            DeviceOptions::default(),
        )
        .unwrap();

        let mut with_check = vec![0i16; pixels];
        let mut without_check = vec![0i16; pixels];
        enabled.execute(&left, &right, &mut with_check).unwrap();
        disabled.execute(&left, &right, &mut without_check).unwrap();

        // the consistency pass can only invalidate pixels, never change a
        // valid value, so every disagreement must be a with-check-only
        // invalidation.
        let invalid = enabled.invalid_disparity();
        for (a, b) in with_check.iter().zip(without_check.iter()) {
            if a != b {
                assert_eq!(*a as i32, invalid);
            }
        }
    }
}
