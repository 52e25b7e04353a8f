use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use exemplar_inpaint as ei;
use std::time::{Duration, Instant};

const DIM: u32 = 32;

fn textured_rgb24(dim: u32) -> Vec<u8> {
    let mut pixels = vec![0u8; (dim * dim * 3) as usize];
    for y in 0..dim as usize {
        for x in 0..dim as usize {
            let idx = (y * dim as usize + x) * 3;
            pixels[idx] = ((x * 31 + y * 17) % 256) as u8;
            pixels[idx + 1] = ((x * 7 + y * 3) % 256) as u8;
            pixels[idx + 2] = ((x * 13 + y * 29) % 256) as u8;
        }
    }
    pixels
}

fn centered_hole_mask(dim: u32) -> Vec<u8> {
    let mut mask = vec![0u8; (dim * dim * 3) as usize];
    let (from, to) = ((dim * 3 / 8) as usize, (dim * 5 / 8) as usize);
    for y in from..to {
        for x in from..to {
            let idx = (y * dim as usize + x) * 3;
            mask[idx] = 0xFF;
            mask[idx + 1] = 0xFF;
            mask[idx + 2] = 0xFF;
        }
    }
    mask
}

fn packed_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("packed_fill");
    group.sample_size(10);

    for dim in [DIM, 2 * DIM, 4 * DIM, 8 * DIM].iter() {
        let pixels = textured_rgb24(*dim);
        let mask = centered_hole_mask(*dim);

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |b, &dim| {
            b.iter_custom(|iters| {
                let mut total_elapsed = Duration::new(0, 0);
                for _i in 0..iters {
                    // the fill mutates the buffer, so each run gets a copy
                    let mut buf = pixels.clone();
                    let mut engine =
                        ei::Engine::new(ei::Dims::square(dim), ei::PixelLayout::Rgb24).unwrap();
                    let mut frame =
                        ei::FrameMut::packed(ei::PixelLayout::Rgb24, &mut buf, dim as usize * 3);
                    let mask = ei::MaskRef::packed(&mask, dim as usize * 3);

                    let start = Instant::now();
                    black_box(
                        engine
                            .run(&mut frame, Some(&mask), &ei::RunParams::default())
                            .unwrap(),
                    );
                    total_elapsed += start.elapsed();
                }

                total_elapsed
            });
        });
    }
    group.finish();
}

fn planar_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("planar_fill");
    group.sample_size(10);

    for dim in [DIM, 2 * DIM, 4 * DIM, 8 * DIM].iter() {
        let dim_us = *dim as usize;
        let mut y_plane = vec![0u8; dim_us * dim_us];
        for y in 0..dim_us {
            for x in 0..dim_us {
                y_plane[y * dim_us + x] = ((x * 31 + y * 17) % 256) as u8;
            }
        }
        let u_plane = vec![120u8; dim_us * dim_us / 4];
        let v_plane = vec![130u8; dim_us * dim_us / 4];

        let (from, to) = (dim_us * 3 / 8, dim_us * 5 / 8);
        let mut mask_y = vec![0u8; dim_us * dim_us];
        for y in from..to {
            for x in from..to {
                mask_y[y * dim_us + x] = 235;
            }
        }
        let mask_u = vec![128u8; dim_us * dim_us / 4];
        let mask_v = vec![128u8; dim_us * dim_us / 4];
        let mask_color = 235 << 16 | 128 << 8 | 128;

        group.bench_with_input(BenchmarkId::from_parameter(dim), dim, |b, &dim| {
            b.iter_custom(|iters| {
                let mut total_elapsed = Duration::new(0, 0);
                for _i in 0..iters {
                    let mut y_buf = y_plane.clone();
                    let mut u_buf = u_plane.clone();
                    let mut v_buf = v_plane.clone();
                    let mut engine =
                        ei::Engine::new(ei::Dims::square(dim), ei::PixelLayout::Yuv420).unwrap();
                    let mut frame = ei::FrameMut::planar(
                        &mut y_buf,
                        dim as usize,
                        &mut u_buf,
                        &mut v_buf,
                        dim as usize / 2,
                    );
                    let mask = ei::MaskRef::planar(
                        &mask_y,
                        dim as usize,
                        &mask_u,
                        &mask_v,
                        dim as usize / 2,
                    );
                    let params = ei::RunParams {
                        mask_color,
                        ..ei::RunParams::default()
                    };

                    let start = Instant::now();
                    black_box(engine.run(&mut frame, Some(&mask), &params).unwrap());
                    total_elapsed += start.elapsed();
                }

                total_elapsed
            });
        });
    }
    group.finish();
}

criterion_group!(benches, packed_fill, planar_fill);
criterion_main!(benches);
