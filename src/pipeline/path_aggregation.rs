use crate::core::buffer::DeviceBuffer;
use crate::core::layout::PathParams;
use crate::core::params::MaxDisparity;
use crate::core::program::{define, define_u32, DeviceProgram};
use crate::pipeline::{storage_entry, uniform_entry};

/// Logical lane-group size used to emulate subgroup-style cooperation via
/// workgroup shared memory; WGSL has no portable subgroup-shuffle, so every
/// direction's kernel reduces through `var<workgroup>` arrays instead.
const SUBGROUP_SIZE: u32 = 8;
const PATHS_PER_BLOCK: u32 = 8;
const BLOCK_SIZE: u32 = SUBGROUP_SIZE * PATHS_PER_BLOCK;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDirection {
    Up2Down,
    Down2Up,
    Left2Right,
    Right2Left,
    UpLeft2DownRight,
    DownRight2UpLeft,
    UpRight2DownLeft,
    DownLeft2UpRight,
}

impl PathDirection {
    pub fn all(num_paths: u32) -> &'static [PathDirection] {
        const FOUR: [PathDirection; 4] = [
            PathDirection::Up2Down,
            PathDirection::Down2Up,
            PathDirection::Left2Right,
            PathDirection::Right2Left,
        ];
        const EIGHT: [PathDirection; 8] = [
            PathDirection::Up2Down,
            PathDirection::Down2Up,
            PathDirection::Left2Right,
            PathDirection::Right2Left,
            PathDirection::UpLeft2DownRight,
            PathDirection::DownRight2UpLeft,
            PathDirection::UpRight2DownLeft,
            PathDirection::DownLeft2UpRight,
        ];
        if num_paths == 4 {
            &FOUR
        } else {
            &EIGHT
        }
    }

    fn axis(self) -> Axis {
        match self {
            PathDirection::Up2Down | PathDirection::Down2Up => Axis::Vertical,
            PathDirection::Left2Right | PathDirection::Right2Left => Axis::Horizontal,
            _ => Axis::Oblique,
        }
    }
}

enum Axis {
    Vertical,
    Horizontal,
    Oblique,
}

struct DirectionPipeline {
    direction: PathDirection,
    pipeline: wgpu::ComputePipeline,
}

/// One scanline-aggregation pipeline per direction, all sharing the same
/// bind group layout (`agg_dest`, `feature_left`, `feature_right`,
/// `path_params`). Every direction writes its own cost-volume sub-buffer;
/// `encode_all` records one `CommandEncoder` per direction so the driver is
/// free to run them concurrently, joined by a single `queue.submit`.
pub struct PathAggregationStage {
    bind_group_layout: wgpu::BindGroupLayout,
    directions: Vec<DirectionPipeline>,
}

impl PathAggregationStage {
    pub fn new(device: &wgpu::Device, max_disparity: MaxDisparity, num_paths: u32) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("path_aggregation_bind_group_layout"),
            entries: &[
                storage_entry(0, false),
                storage_entry(1, true),
                storage_entry(2, true),
                uniform_entry(3),
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("path_aggregation_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let common = include_str!("../shaders/path_aggregation_common.wgsl");
        let utility = include_str!("../shaders/utility.wgsl");
        let inttypes = include_str!("../shaders/inttypes.wgsl");

        let directions = PathDirection::all(num_paths)
            .iter()
            .copied()
            .map(|direction| {
                let (fragment, entry_point, substitutions) = match direction.axis() {
                    Axis::Vertical => (
                        include_str!("../shaders/path_aggregation_vertical.wgsl"),
                        "aggregate_vertical_path_kernel",
                        vec![
                            ("@MAX_DISPARITY@", define_u32("MAX_DISPARITY", max_disparity.value())),
                            ("@DIRECTION@", define("DIRECTION", vertical_direction(direction))),
                            ("@DP_BLOCK_SIZE@", define_u32("DP_BLOCK_SIZE", dp_block_size(max_disparity))),
                            ("@SUBGROUP_SIZE@", define_u32("SUBGROUP_SIZE", SUBGROUP_SIZE)),
                            ("@BLOCK_SIZE@", define_u32("BLOCK_SIZE", BLOCK_SIZE)),
                        ],
                    ),
                    Axis::Horizontal => (
                        include_str!("../shaders/path_aggregation_horizontal.wgsl"),
                        "aggregate_horizontal_path_kernel",
                        vec![
                            ("@MAX_DISPARITY@", define_u32("MAX_DISPARITY", max_disparity.value())),
                            ("@DIRECTION@", define("DIRECTION", horizontal_direction(direction))),
                            ("@DP_BLOCK_SIZE@", define_u32("DP_BLOCK_SIZE", dp_block_size(max_disparity))),
                            ("@DP_BLOCKS_PER_THREAD@", define_u32("DP_BLOCKS_PER_THREAD", 1)),
                            ("@SUBGROUP_SIZE@", define_u32("SUBGROUP_SIZE", SUBGROUP_SIZE)),
                            ("@BLOCK_SIZE@", define_u32("BLOCK_SIZE", BLOCK_SIZE)),
                        ],
                    ),
                    Axis::Oblique => {
                        let (dx, dy) = oblique_direction(direction);
                        (
                            include_str!("../shaders/path_aggregation_oblique.wgsl"),
                            "aggregate_oblique_path_kernel",
                            vec![
                                ("@MAX_DISPARITY@", define_u32("MAX_DISPARITY", max_disparity.value())),
                                ("@X_DIRECTION@", define("X_DIRECTION", dx)),
                                ("@Y_DIRECTION@", define("Y_DIRECTION", dy)),
                                ("@DP_BLOCK_SIZE@", define_u32("DP_BLOCK_SIZE", dp_block_size(max_disparity))),
                                ("@SUBGROUP_SIZE@", define_u32("SUBGROUP_SIZE", SUBGROUP_SIZE)),
                                ("@BLOCK_SIZE@", define_u32("BLOCK_SIZE", BLOCK_SIZE)),
                            ],
                        )
                    }
                };

                let label = format!("path_aggregation_{direction:?}");
                let shader = DeviceProgram::build(
                    device,
                    &label,
                    &[inttypes, utility, common, fragment],
                    &substitutions,
                );

                let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                    label: Some(&label),
                    layout: Some(&pipeline_layout),
                    module: &shader,
                    entry_point,
                });

                DirectionPipeline { direction, pipeline }
            })
            .collect();

        PathAggregationStage { bind_group_layout, directions }
    }

    /// Records one `CommandEncoder` per direction against its own cost
    /// sub-buffer. The caller submits the whole batch with a single
    /// `queue.submit`, which is the only way wgpu exposes cross-direction
    /// overlap given its single logical `Queue`.
    pub fn encode_all(
        &self,
        device: &wgpu::Device,
        feature_left: &DeviceBuffer,
        feature_right: &DeviceBuffer,
        path_params: &DeviceBuffer,
        cost_volumes: &[DeviceBuffer],
        width: u32,
        height: u32,
    ) -> Vec<wgpu::CommandBuffer> {
        assert_eq!(cost_volumes.len(), self.directions.len());

        self.directions
            .iter()
            .zip(cost_volumes)
            .map(|(dir_pipeline, cost_volume)| {
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("path_aggregation_bind_group"),
                    layout: &self.bind_group_layout,
                    entries: &[
                        wgpu::BindGroupEntry { binding: 0, resource: cost_volume.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 1, resource: feature_left.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 2, resource: feature_right.as_entire_binding() },
                        wgpu::BindGroupEntry { binding: 3, resource: path_params.as_entire_binding() },
                    ],
                });

                let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("path_aggregation_encoder"),
                });

                let grid = match dir_pipeline.direction.axis() {
                    Axis::Vertical => (width + PATHS_PER_BLOCK - 1) / PATHS_PER_BLOCK,
                    Axis::Horizontal => (height + PATHS_PER_BLOCK - 1) / PATHS_PER_BLOCK,
                    Axis::Oblique => (width + height - 1 + PATHS_PER_BLOCK - 1) / PATHS_PER_BLOCK,
                };

                {
                    let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                        label: Some("path_aggregation_pass"),
                        timestamp_writes: None,
                    });
                    pass.set_pipeline(&dir_pipeline.pipeline);
                    pass.set_bind_group(0, &bind_group, &[]);
                    pass.dispatch_workgroups(grid, 1, 1);
                }

                encoder.finish()
            })
            .collect()
    }

    pub fn num_directions(&self) -> usize {
        self.directions.len()
    }
}

pub(crate) fn dp_block_size(max_disparity: MaxDisparity) -> u32 {
    max_disparity.value() / SUBGROUP_SIZE
}

fn vertical_direction(direction: PathDirection) -> i32 {
    match direction {
        PathDirection::Up2Down => 1,
        PathDirection::Down2Up => -1,
        _ => unreachable!("not a vertical direction"),
    }
}

fn horizontal_direction(direction: PathDirection) -> i32 {
    match direction {
        PathDirection::Left2Right => 1,
        PathDirection::Right2Left => -1,
        _ => unreachable!("not a horizontal direction"),
    }
}

fn oblique_direction(direction: PathDirection) -> (i32, i32) {
    match direction {
        PathDirection::UpLeft2DownRight => (1, 1),
        PathDirection::DownRight2UpLeft => (-1, -1),
        PathDirection::UpRight2DownLeft => (-1, 1),
        PathDirection::DownLeft2UpRight => (1, -1),
        _ => unreachable!("not an oblique direction"),
    }
}

pub(crate) fn path_params(width: u32, height: u32, p1: u32, p2: u32, min_disp: i32) -> PathParams {
    PathParams { width, height, p1, p2, min_disp, _pad0: 0, _pad1: 0, _pad2: 0 }
}
