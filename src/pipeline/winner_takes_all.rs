use crate::core::buffer::DeviceBuffer;
use crate::core::layout::WtaParams;
use crate::core::params::MaxDisparity;
use crate::core::program::{define_bool, define_u32, DeviceProgram};
use crate::pipeline::{storage_entry, uniform_entry};

const BLOCK_SIZE: u32 = 256;
const MAX_PATH_BINDINGS: usize = 8;

/// Sums the (up to 8) per-direction cost volumes and picks the winning
/// disparity per pixel. Dispatched twice by `StereoSgm::execute`: once with
/// `compute_right = false` to build the subpixel-refined left map, once with
/// `compute_right = true` to build the integer-only right map the
/// consistency check needs.
pub struct WinnerTakesAllStage {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

impl WinnerTakesAllStage {
    pub fn new(device: &wgpu::Device, max_disparity: MaxDisparity, subpixel: bool) -> Self {
        let mut entries: Vec<wgpu::BindGroupLayoutEntry> =
            (0..MAX_PATH_BINDINGS as u32).map(|b| storage_entry(b, true)).collect();
        entries.push(storage_entry(MAX_PATH_BINDINGS as u32, false));
        entries.push(uniform_entry(MAX_PATH_BINDINGS as u32 + 1));

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("winner_takes_all_bind_group_layout"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("winner_takes_all_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = DeviceProgram::build(
            device,
            "winner_takes_all",
            &[
                include_str!("../shaders/inttypes.wgsl"),
                include_str!("../shaders/utility.wgsl"),
                include_str!("../shaders/winner_takes_all.wgsl"),
            ],
            &[
                ("@MAX_DISPARITY@", define_u32("MAX_DISPARITY", max_disparity.value())),
                ("@SUBPIXEL_SHIFT@", define_u32("SUBPIXEL_SHIFT", crate::core::params::subpixel_shift() as u32)),
                ("@COMPUTE_SUBPIXEL@", define_bool("COMPUTE_SUBPIXEL", subpixel)),
                ("@BLOCK_SIZE@", define_u32("BLOCK_SIZE", BLOCK_SIZE)),
            ],
        );

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some("winner_takes_all_pipeline"),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: "winner_takes_all_kernel",
        });

        WinnerTakesAllStage { pipeline, bind_group_layout }
    }

    pub fn encode(
        &self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        cost_volumes: &[DeviceBuffer],
        dest: &DeviceBuffer,
        params: &DeviceBuffer,
        width: u32,
        height: u32,
    ) {
        let mut entries = Vec::with_capacity(MAX_PATH_BINDINGS + 2);
        for slot in 0..MAX_PATH_BINDINGS {
            let buffer = &cost_volumes[slot.min(cost_volumes.len() - 1)];
            entries.push(wgpu::BindGroupEntry { binding: slot as u32, resource: buffer.as_entire_binding() });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: MAX_PATH_BINDINGS as u32,
            resource: dest.as_entire_binding(),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: MAX_PATH_BINDINGS as u32 + 1,
            resource: params.as_entire_binding(),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("winner_takes_all_bind_group"),
            layout: &self.bind_group_layout,
            entries: &entries,
        });

        let pixels = width * height;
        let grid = (pixels + BLOCK_SIZE - 1) / BLOCK_SIZE;

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("winner_takes_all_pass"),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        pass.dispatch_workgroups(grid, 1, 1);
    }
}

pub(crate) fn wta_params(
    width: u32,
    height: u32,
    uniqueness: f32,
    min_disp: i32,
    compute_right: bool,
    num_paths: u32,
    invalid_disp_scaled: i32,
) -> WtaParams {
    let (uniqueness_num, uniqueness_den) = uniqueness_ratio(uniqueness);
    WtaParams {
        width,
        height,
        pitch: width,
        uniqueness_num,
        uniqueness_den,
        min_disp,
        compute_right: compute_right as u32,
        num_paths,
        invalid_disp_scaled,
        _pad2: 0,
        _pad3: 0,
        _pad4: 0,
    }
}

/// Converts a float uniqueness ratio into an exact integer fraction so the
/// shader-side comparison avoids floating point, matching `(min2 - min1) *
/// den >= (den - num) * min1`.
fn uniqueness_ratio(uniqueness: f32) -> (u32, u32) {
    const DEN: u32 = 1 << 16;
    let num = (uniqueness.clamp(0.0, 1.0) * DEN as f32).round() as u32;
    (num, DEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniqueness_ratio_round_trips_common_values() {
        let (num, den) = uniqueness_ratio(0.95);
        assert!((num as f32 / den as f32 - 0.95).abs() < 1e-3);
    }
}
