use crate::core::buffer::DeviceBuffer;
use crate::core::layout::ConsistencyParams;
use crate::core::program::{define_u32, DeviceProgram};
use crate::pipeline::{storage_entry, uniform_entry};

/// Left-right consistency check: invalidates left-map disparities whose
/// right-map counterpart disagrees by more than `lr_max_diff`.
pub struct ConsistencyStage {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl ConsistencyStage {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("consistency_bind_group_layout"),
            entries: &[storage_entry(0, false), storage_entry(1, true), uniform_entry(2)],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("consistency_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = DeviceProgram::build(
            device,
            "check_consistency",
            &[
                include_str!("../shaders/inttypes.wgsl"),
                include_str!("../shaders/utility.wgsl"),
                include_str!("../shaders/check_consistency.wgsl"),
            ],
            &[(
                "@SUBPIXEL_SHIFT@",
                define_u32("SUBPIXEL_SHIFT", crate::core::params::subpixel_shift() as u32),
            )],
        );

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("check_consistency_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "check_consistency_kernel",
        });

        ConsistencyStage { pipeline, bind_group_layout }
    }

    pub fn encode(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        left: &DeviceBuffer,
        right: &DeviceBuffer,
        params: &DeviceBuffer,
        width: u32,
        height: u32,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("consistency_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: left.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: right.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: params.as_entire_binding() },
            ],
        });

        let grid_x = (width + 15) / 16;
        let grid_y = (height + 15) / 16;

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("consistency_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(grid_x, grid_y, 1);
    }
}

pub(crate) fn consistency_params(
    width: u32,
    height: u32,
    subpixel: bool,
    lr_max_diff: i32,
    invalid_disp_scaled: i32,
) -> ConsistencyParams {
    ConsistencyParams {
        width,
        height,
        src_pitch: width,
        dst_pitch: width,
        subpixel: subpixel as u32,
        lr_max_diff,
        invalid_disp_scaled,
        _pad1: 0,
    }
}
