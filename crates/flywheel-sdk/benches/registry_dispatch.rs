//! 注册表热路径基准测试
//!
//! - 命令解析
//! - 行格式化
//! - 条目查找 + 处理器调用（远程读写）
//! - 控制迭代（采样 → 控制律 → 发布 → 流式输出）

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use flywheel_sdk::prelude::*;
use flywheel_sdk::protocol::{WireConfig, format_line, parse_command};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 每次读取前进 1ms 的时钟
#[derive(Clone, Default)]
struct SteppingClock(Arc<AtomicU64>);

impl Clock for SteppingClock {
    fn micros(&self) -> u64 {
        self.0.fetch_add(1000, Ordering::Relaxed) + 1000
    }
}

fn setup() -> (Arc<Registry>, ChannelPeer, Flywheel) {
    let (transport, peer) = channel_transport();
    let registry = RegistryBuilder::new()
        .transport(transport)
        .clock(SteppingClock::default())
        .build();
    let flywheel = FlywheelBuilder::new()
        .encoder(|| EncoderReading {
            revolutions: 0.0,
            rpm: 2400.0,
        })
        .motor(|_: i8| {})
        .controller(Pid::new(0.5, 0.01, 0.0))
        .build(&registry)
        .unwrap();
    flywheel.portal().enable().unwrap();
    (registry, peer, flywheel)
}

fn bench_parse_command(c: &mut Criterion) {
    let config = WireConfig::default();
    c.bench_function("parse_command", |b| {
        b.iter(|| parse_command(black_box("flywheel.threshold-derivative 100"), &config))
    });
}

fn bench_format_line(c: &mut Criterion) {
    let config = WireConfig::default();
    c.bench_function("format_line", |b| {
        b.iter(|| {
            format_line(
                black_box(123_456),
                "flywheel",
                "target",
                "2400.000000",
                &config,
            )
        })
    });
}

fn bench_dispatch_read(c: &mut Criterion) {
    let (registry, peer, _flywheel) = setup();
    c.bench_function("dispatch_read", |b| {
        b.iter(|| {
            registry.dispatch_line(black_box("flywheel.threshold-error"));
            peer.drain_lines()
        })
    });
}

fn bench_dispatch_write(c: &mut Criterion) {
    let (registry, peer, _flywheel) = setup();
    c.bench_function("dispatch_write", |b| {
        b.iter(|| {
            registry.dispatch_line(black_box("flywheel.gain-p 0.75"));
            peer.drain_lines()
        })
    });
}

fn bench_control_iteration(c: &mut Criterion) {
    let (_registry, peer, flywheel) = setup();
    flywheel.set_target(2000.0);
    c.bench_function("control_iteration", |b| {
        b.iter(|| {
            flywheel.update();
            peer.drain_lines()
        })
    });
}

criterion_group!(
    benches,
    bench_parse_command,
    bench_format_line,
    bench_dispatch_read,
    bench_dispatch_write,
    bench_control_iteration
);
criterion_main!(benches);
