use crate::core::buffer::DeviceBuffer;
use crate::core::layout::Dimensions;
use crate::core::program::DeviceProgram;
use crate::pipeline::{storage_entry, uniform_entry};

const MEDIAN_TILE: u32 = 16;

/// 3x3 median filter over a disparity map. Run once against the left map
/// and once against the right map before the consistency check.
pub struct MedianFilterStage {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl MedianFilterStage {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("median_filter_bind_group_layout"),
            entries: &[storage_entry(0, true), storage_entry(1, false), uniform_entry(2)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("median_filter_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = DeviceProgram::build(
            device,
            "median_filter",
            &[
                include_str!("../shaders/inttypes.wgsl"),
                include_str!("../shaders/utility.wgsl"),
                include_str!("../shaders/median_filter.wgsl"),
            ],
            &[],
        );

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("median_filter_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "median_filter_kernel",
        });

        MedianFilterStage { pipeline, bind_group_layout }
    }

    pub fn encode(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        src: &DeviceBuffer,
        dst: &DeviceBuffer,
        dims: &DeviceBuffer,
        width: u32,
        height: u32,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("median_filter_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: src.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: dst.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: dims.as_entire_binding() },
            ],
        });

        let grid_x = (width + MEDIAN_TILE - 1) / MEDIAN_TILE;
        let grid_y = (height + MEDIAN_TILE - 1) / MEDIAN_TILE;

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("median_filter_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(grid_x, grid_y, 1);
    }
}

pub(crate) fn dimensions(width: u32, height: u32) -> Dimensions {
    Dimensions { width, height, pitch: width, _pad: 0 }
}
