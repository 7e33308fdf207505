//! Simulation benchmarks for doomsim_core.
//!
//! Run with: `cargo bench -p doomsim_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use doomsim_core::fixtures::RoomChain;
use doomsim_core::geometry::point_to_angle;
use doomsim_core::map::LevelData;
use doomsim_core::prelude::*;
use doomsim_core::trig::fine_sine;

fn busy_level() -> LevelData {
    let mut chain = RoomChain::new()
        .room(0, 128)
        .player_start(64, 128, 0)
        .light(200)
        .special(1);
    for room in 1..12i16 {
        chain = chain
            .room(0, 128)
            .special([8, 17, 2, 3][room as usize % 4])
            .thing(3004, room * 128 + 64, 128, 0)
            .thing(2011, room * 128 + 32, 64, 0);
    }
    chain.build()
}

/// Runs simulation benchmarks for the doomsim_core crate.
pub fn simulation_benchmark(c: &mut Criterion) {
    let data = busy_level();

    c.bench_function("world_from_data", |b| {
        b.iter(|| World::from_data(black_box(&data), GameConfig::default()));
    });

    c.bench_function("tick_100", |b| {
        b.iter_batched(
            || World::from_data(&data, GameConfig::default()).unwrap(),
            |mut world| {
                for _ in 0..100 {
                    world.tick(black_box(&[TicCmd::forward(25)])).unwrap();
                }
                world
            },
            BatchSize::SmallInput,
        );
    });

    let world = World::from_data(&data, GameConfig::default()).unwrap();
    c.bench_function("state_hash", |b| b.iter(|| black_box(&world).state_hash()));
    c.bench_function("snapshot_encode", |b| {
        b.iter(|| black_box(&world).snapshot().to_bytes().unwrap());
    });
}

/// Lookup paths hit by every moving thing.
pub fn geometry_benchmark(c: &mut Criterion) {
    c.bench_function("fine_sine_sweep", |b| {
        b.iter(|| (0..8192).fold(0i32, |acc, fine| acc.wrapping_add(fine_sine(black_box(fine)).to_bits())));
    });

    c.bench_function("angle_sin_cos", |b| {
        let angle = Angle::from_bits(0x2345_6789);
        b.iter(|| {
            let a = black_box(angle);
            (a.sin(), a.cos())
        });
    });

    c.bench_function("point_to_angle", |b| {
        let (x, y) = (Fixed::from_int(-300), Fixed::from_int(1200));
        b.iter(|| point_to_angle(Fixed::ZERO, Fixed::ZERO, black_box(x), black_box(y)));
    });

    let world = World::from_data(&busy_level(), GameConfig::default()).unwrap();
    c.bench_function("point_in_subsector", |b| {
        let (x, y) = (Fixed::from_int(1000), Fixed::from_int(70));
        b.iter(|| world.level().point_in_subsector(black_box(x), black_box(y)));
    });
}

criterion_group!(benches, simulation_benchmark, geometry_benchmark);
criterion_main!(benches);
