//! 周期控制任务
//!
//! ```text
//! loop {
//!     重复 check_cycle 次 { 应用优先级; update(); pause(帧间隔) }
//!     check_ready()
//! }
//! ```
//!
//! 帧间等待在状态切换时提前结束，新的帧间隔与优先级从下一次迭代起生效。
//! 任务只持有 `Weak` 引用，飞轮句柄全部销毁后自然退出。

use crate::flywheel::FlywheelInner;
use crate::state::{FlywheelState, ReadySignal};
use std::sync::Weak;
use std::time::{Duration, Instant};
use tracing::{info, trace};

/// 帧末尾改用 spin_sleep 精确等待的时长
const SPIN_MARGIN: Duration = Duration::from_millis(2);

pub(crate) fn control_loop(flywheel: Weak<FlywheelInner>) {
    let mut applied_priority = None;
    let Some(signal) = flywheel.upgrade().map(|inner| inner.signal()) else {
        info!("Flywheel control task exiting");
        return;
    };

    'task: loop {
        let cycle = match flywheel.upgrade() {
            Some(inner) => inner.check_cycle(),
            None => break,
        };

        for _ in 0..cycle {
            let Some(inner) = flywheel.upgrade() else {
                break 'task;
            };
            sync_priority(inner.current_priority(), &mut applied_priority);
            inner.update();
            let delay = inner.frame_delay();
            let state = inner.state();
            drop(inner);

            pause(&signal, state, delay);
        }

        match flywheel.upgrade() {
            Some(inner) => inner.check_ready(),
            None => break,
        }
    }

    info!("Flywheel control task exiting");
}

/// 等待一帧；状态离开 `from` 时提前返回
fn pause(signal: &ReadySignal, from: FlywheelState, delay: Duration) {
    let start = Instant::now();
    if signal.wait_change(from, delay.saturating_sub(SPIN_MARGIN)) {
        trace!("Frame pause interrupted by {:?}", signal.get());
        return;
    }
    spin_sleep::sleep(delay.saturating_sub(start.elapsed()));
}

/// 优先级变化时才重新设置
fn sync_priority(desired: u32, applied: &mut Option<u32>) {
    if *applied == Some(desired) {
        return;
    }
    *applied = Some(desired);
    apply_priority(desired);
}

#[cfg(feature = "realtime")]
fn apply_priority(priority: u32) {
    use thread_priority::*;
    use tracing::warn;

    let value = u8::try_from(priority)
        .ok()
        .and_then(|p| ThreadPriorityValue::try_from(p).ok());
    let Some(value) = value else {
        warn!("Thread priority {} out of range, keeping current", priority);
        return;
    };

    match set_current_thread_priority(ThreadPriority::Crossplatform(value)) {
        Ok(_) => {
            trace!("Control thread priority set to {}", priority);
        },
        Err(e) => {
            warn!(
                "Failed to set control thread priority {}: {:?}. \
                 On Linux, try: sudo setcap cap_sys_nice=ep <executable>",
                priority, e
            );
        },
    }
}

#[cfg(not(feature = "realtime"))]
fn apply_priority(priority: u32) {
    trace!(
        "Control thread priority {} recorded (realtime feature disabled)",
        priority
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_sync_priority_only_on_change() {
        let mut applied = None;
        sync_priority(2, &mut applied);
        assert_eq!(applied, Some(2));
        sync_priority(2, &mut applied);
        assert_eq!(applied, Some(2));
        sync_priority(5, &mut applied);
        assert_eq!(applied, Some(5));
    }

    #[test]
    fn test_loop_exits_when_flywheel_dropped() {
        let flywheel: Weak<FlywheelInner> = Weak::new();
        // 立即返回，不阻塞
        control_loop(flywheel);
    }

    #[test]
    #[serial]
    fn test_pause_ends_early_on_transition() {
        let signal = Arc::new(ReadySignal::new(FlywheelState::Ready));
        let setter = {
            let signal = Arc::clone(&signal);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                signal.set(FlywheelState::Active);
            })
        };

        let start = Instant::now();
        pause(&signal, FlywheelState::Ready, Duration::from_secs(2));
        assert!(start.elapsed() < Duration::from_secs(1));
        setter.join().unwrap();
    }

    #[test]
    #[serial]
    fn test_pause_waits_full_frame_without_transition() {
        let signal = ReadySignal::new(FlywheelState::Active);
        let start = Instant::now();
        pause(&signal, FlywheelState::Active, Duration::from_millis(15));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }
}
