//! Benchmark for the per-packet hot paths of a session.
//!
//! Run with: cargo bench --package tundra_networking --bench packet_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use tundra_core::{Block, Position};
use tundra_networking::protocol::{chat_packets, Packet};
use tundra_networking::session::{EntityView, MovementEncoder, VisibleEntities};

fn benchmark_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let teleport = Packet::Teleport { id: 5, position: Position::new(1000, 2000, 300, 64, 12) };
    let message = Packet::Message { id: 0, text: "&eHello there, this is a fairly ordinary chat message".into() };

    group.throughput(Throughput::Elements(1));
    group.bench_function("encode_teleport", |b| b.iter(|| black_box(teleport.encode())));
    group.bench_function("encode_message", |b| b.iter(|| black_box(message.encode())));

    let encoded = message.encode();
    group.bench_function("decode_message", |b| b.iter(|| black_box(Packet::decode(&encoded).unwrap())));

    let set_block = Packet::SetBlockClient { x: 10, y: 20, z: 30, placing: true, block: Block::STONE }.encode();
    group.bench_function("decode_set_block", |b| b.iter(|| black_box(Packet::decode(&set_block).unwrap())));
    group.finish();
}

fn benchmark_chat_wrap(c: &mut Criterion) {
    let long = "&sThe quick brown fox &wjumps over the lazy dog &fand keeps on running ".repeat(8);
    c.bench_function("chat_wrap_long_message", |b| b.iter(|| black_box(chat_packets("&7> ", &long))));
}

fn benchmark_movement(c: &mut Criterion) {
    c.bench_function("movement_encode_walk", |b| {
        let mut encoder = MovementEncoder::new(Position::default());
        let mut x = 0i16;
        b.iter(|| {
            x = x.wrapping_add(7);
            black_box(encoder.encode(3, Position::new(x, 64, 64, 0, 0)))
        });
    });
}

fn benchmark_visibility(c: &mut Criterion) {
    // 100 players spread over a 256x256 block area
    let others: Vec<EntityView> = (0..100u64)
        .map(|key| EntityView {
            key,
            name: format!("player{key}"),
            position: Position::new((key % 10) as i16 * 800, (key / 10) as i16 * 800, 2048, 0, 0),
        })
        .collect();

    c.bench_function("visibility_update_100_players", |b| {
        let mut table = VisibleEntities::new();
        let mut viewer = Position::new(4000, 4000, 2048, 0, 0);
        b.iter(|| {
            viewer.x = viewer.x.wrapping_add(16) % 8000;
            black_box(table.update(viewer, &others))
        });
    });
}

criterion_group!(benches, benchmark_codec, benchmark_chat_wrap, benchmark_movement, benchmark_visibility);
criterion_main!(benches);
