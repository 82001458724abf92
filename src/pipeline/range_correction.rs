use crate::core::buffer::DeviceBuffer;
use crate::core::layout::RangeCorrectionParams;
use crate::core::program::DeviceProgram;
use crate::pipeline::{storage_entry, uniform_entry};

/// Rewrites disparities below `min_disp_scaled` to the invalid sentinel.
/// `StereoSgm::execute` skips this stage entirely when `min_disp == 0` and
/// subpixel is off, since in that case every producible value is already
/// in range.
pub struct RangeCorrectionStage {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl RangeCorrectionStage {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("range_correction_bind_group_layout"),
            entries: &[storage_entry(0, false), uniform_entry(1)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("range_correction_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = DeviceProgram::build(
            device,
            "correct_disparity_range",
            &[
                include_str!("../shaders/inttypes.wgsl"),
                include_str!("../shaders/utility.wgsl"),
                include_str!("../shaders/correct_disparity_range.wgsl"),
            ],
            &[],
        );

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("correct_disparity_range_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "correct_disparity_range_kernel",
        });

        RangeCorrectionStage { pipeline, bind_group_layout }
    }

    pub fn encode(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        dest: &DeviceBuffer,
        params: &DeviceBuffer,
        width: u32,
        height: u32,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("range_correction_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: dest.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: params.as_entire_binding() },
            ],
        });

        let grid_x = (width + 15) / 16;
        let grid_y = (height + 15) / 16;

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("range_correction_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(grid_x, grid_y, 1);
    }
}

pub(crate) fn range_params(
    width: u32,
    height: u32,
    min_disp_scaled: i32,
    invalid_disp_scaled: i32,
) -> RangeCorrectionParams {
    RangeCorrectionParams {
        width,
        height,
        pitch: width,
        min_disp_scaled,
        invalid_disp_scaled,
        _pad0: 0,
        _pad1: 0,
        _pad2: 0,
    }
}
