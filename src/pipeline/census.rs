use crate::core::buffer::DeviceBuffer;
use crate::core::layout::Dimensions;
use crate::core::program::DeviceProgram;
use crate::pipeline::{storage_entry, uniform_entry};

const WINDOW_WIDTH: u32 = 9;
const CENSUS_BLOCK_SIZE: u32 = 128;
const LINES_PER_BLOCK: u32 = 16;

/// Census-transform stage: one dispatch per input image, run independently
/// for left and right against the same pipeline.
pub struct CensusStage {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl CensusStage {
    pub fn new(device: &wgpu::Device) -> Self {
        let shader = DeviceProgram::build(
            device,
            "census_transform",
            &[
                include_str!("../shaders/inttypes.wgsl"),
                include_str!("../shaders/utility.wgsl"),
                include_str!("../shaders/census.wgsl"),
            ],
            &[],
        );

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("census_bind_group_layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, false),
                uniform_entry(2),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("census_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("census_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "census_transform_kernel",
        });

        CensusStage { pipeline, bind_group_layout }
    }

    pub fn encode(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        src: &DeviceBuffer,
        feature_dst: &DeviceBuffer,
        dims: &DeviceBuffer,
        width: u32,
        height: u32,
    ) {
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("census_bind_group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: src.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 1, resource: feature_dst.as_entire_binding() },
                wgpu::BindGroupEntry { binding: 2, resource: dims.as_entire_binding() },
            ],
        });

        let width_per_block = CENSUS_BLOCK_SIZE - WINDOW_WIDTH + 1;
        let grid_x = (width + width_per_block - 1) / width_per_block;
        let grid_y = (height + LINES_PER_BLOCK - 1) / LINES_PER_BLOCK;

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("census_pass"),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::DeviceContext;
    use crate::core::params::DeviceOptions;

    #[test]
    fn test_constant_image_produces_uniform_interior_descriptor() {
        let ctx = DeviceContext::new(DeviceOptions::default()).unwrap();
        let width: u32 = 32;
        let height: u32 = 32;
        let pixels = (width * height) as usize;

        let stage = CensusStage::new(&ctx.device);
        let dims_uniform = DeviceBuffer::uniform(&ctx.device, &ctx.queue, "dims", &dimensions(width, height));

        let src = DeviceBuffer::allocate(
            &ctx.device,
            "src",
            pixels as u64,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        );
        let dst = DeviceBuffer::allocate(
            &ctx.device,
            "dst",
            (pixels * 4) as u64,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        );
        let staging = DeviceBuffer::allocate(
            &ctx.device,
            "staging",
            (pixels * 4) as u64,
            wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        );

        ctx.queue.write_buffer(src.raw_handle(), 0, &vec![128u8; pixels]);

        let mut encoder = ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        stage.encode(&ctx.device, &mut encoder, &src, &dst, &dims_uniform, width, height);
        encoder.copy_buffer_to_buffer(dst.raw_handle(), 0, staging.raw_handle(), 0, staging.size());
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.raw_handle().slice(..);
        let (sender, receiver) = flume::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        ctx.device.poll(wgpu::Maintain::Wait);
        receiver.recv().unwrap().unwrap();

        let words: Vec<u32> = {
            let mapped = slice.get_mapped_range();
            bytemuck::cast_slice(&mapped).to_vec()
        };
        staging.raw_handle().unmap();

        // every interior pixel compares equal to itself across all 31
        // symmetric pairs, so every descriptor bit is set.
        let cx = (width / 2) as usize;
        let cy = (height / 2) as usize;
        assert_eq!(words[cy * width as usize + cx], 0x7FFF_FFFF);

        // (0, 0) is within the window radius of the image border.
        assert_eq!(words[0], 0);
    }
}
