//! 集成测试公共设施：可控时钟、模拟编码器与记录型执行器

#![allow(dead_code)]

use flywheel_sdk::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// 手动推进的时钟
#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
    pub fn starting_at_ms(ms: u64) -> Self {
        let clock = Self::default();
        clock.advance_ms(ms);
        clock
    }

    pub fn advance_ms(&self, ms: u64) {
        self.0.fetch_add(ms * 1000, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn micros(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// 模拟编码器：返回外部设定的转速
#[derive(Clone, Default)]
pub struct SimEncoder {
    pub rpm: SharedValue<f32>,
    pub resets: Arc<AtomicU64>,
}

impl Encoder for SimEncoder {
    fn read(&mut self) -> EncoderReading {
        EncoderReading {
            revolutions: 0.0,
            rpm: self.rpm.get(),
        }
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::Relaxed);
    }
}

/// 记录全部命令的执行器
#[derive(Clone, Default)]
pub struct RecordingMotor {
    pub commands: Arc<Mutex<Vec<i8>>>,
}

impl RecordingMotor {
    pub fn last(&self) -> Option<i8> {
        self.commands.lock().last().copied()
    }

    pub fn count(&self) -> usize {
        self.commands.lock().len()
    }
}

impl Motor for RecordingMotor {
    fn set(&mut self, command: i8) {
        self.commands.lock().push(command);
    }
}

/// 通道传输 + 手动时钟的注册表
pub fn manual_registry() -> (Arc<Registry>, ChannelPeer, ManualClock) {
    let (transport, peer) = channel_transport();
    let clock = ManualClock::starting_at_ms(1);
    let registry = RegistryBuilder::new()
        .transport(transport)
        .clock(clock.clone())
        .build();
    (registry, peer, clock)
}

/// 通道传输 + 单调时钟的注册表
pub fn realtime_registry() -> (Arc<Registry>, ChannelPeer) {
    let (transport, peer) = channel_transport();
    let registry = RegistryBuilder::new().transport(transport).build();
    (registry, peer)
}
