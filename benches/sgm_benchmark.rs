use criterion::{criterion_group, criterion_main, Criterion};
use stereo_sgm::{DeviceOptions, Parameters, StereoSgm};

fn execute_benchmark(c: &mut Criterion) {
    let width: u32 = 640;
    let height: u32 = 480;

    let sgm = StereoSgm::new(width, height, 128, Parameters::default(), DeviceOptions::default())
        .expect("failed to create StereoSgm for benchmarking");

    let left = vec![0u8; (width * height) as usize];
    let right = vec![0u8; (width * height) as usize];
    let mut dst = vec![0i16; (width * height) as usize];

    c.bench_function("stereo_sgm_execute_640x480_d128", |b| {
        b.iter(|| {
            sgm.execute(&left, &right, &mut dst).unwrap();
        });
    });
}

criterion_group!(benches, execute_benchmark);
criterion_main!(benches);
