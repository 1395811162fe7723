//! 飞轮控制对象
//!
//! # 锁纪律
//!
//! - `core` 锁保护 `ControlSystem`、控制律、编码器与执行器；
//!   一次迭代从采样到执行器输出、再到发布全部在锁内完成
//! - 每次修改后发布一份 `ArcSwap` 快照，注册表的读处理器只读快照，从不取 `core` 锁，
//!   因此锁内发布不会死锁
//! - 就绪判定、目标修改与状态切换在同一把 `core` 锁内完成，判定不会读到旧目标下的误差；
//!   回调与发布在锁外进行

use crate::config::FlywheelConfig;
use crate::error::DriverError;
use crate::filter::filter_step;
use crate::hardware::{Encoder, MotorBank};
use crate::state::{FlywheelState, ReadySignal};
use arc_swap::ArcSwap;
use flywheel_control::{ControlLaw, ControlSystem, is_within};
use flywheel_protocol::WireValue;
use flywheel_registry::{
    Clock, EntrySpec, PortalHandle, RegistryError, SharedValue, accessor_handler,
    read_only_handler,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 状态切换回调
pub type Callback = Box<dyn Fn() + Send + Sync>;

/// 飞轮遥测快照
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Telemetry {
    pub system: ControlSystem,
    /// 乘以传动比之后、滤波之前的转速
    pub raw: f32,
}

/// 可远程调整的参数
pub(crate) struct Tunables {
    pub gearing: SharedValue<f32>,
    pub smoothing: SharedValue<f32>,
    pub priority_ready: SharedValue<u32>,
    pub priority_active: SharedValue<u32>,
    /// 当前帧间隔（毫秒）
    pub delay: SharedValue<u64>,
    pub delay_ready: SharedValue<u64>,
    pub delay_active: SharedValue<u64>,
    pub threshold_error: SharedValue<f32>,
    pub threshold_derivative: SharedValue<f32>,
    pub check_cycle: SharedValue<u32>,
}

impl Tunables {
    pub fn from_config(config: &FlywheelConfig) -> Self {
        Self {
            gearing: SharedValue::new(config.gearing),
            smoothing: SharedValue::new(config.smoothing),
            priority_ready: SharedValue::new(config.priority_ready),
            priority_active: SharedValue::new(config.priority_active),
            delay: SharedValue::new(config.frame_delay_ready_ms),
            delay_ready: SharedValue::new(config.frame_delay_ready_ms),
            delay_active: SharedValue::new(config.frame_delay_active_ms),
            threshold_error: SharedValue::new(config.threshold_error),
            threshold_derivative: SharedValue::new(config.threshold_derivative),
            check_cycle: SharedValue::new(config.check_cycle),
        }
    }
}

/// 锁保护的可变部分
pub(crate) struct Core {
    pub system: ControlSystem,
    pub raw: f32,
    pub controller: Box<dyn ControlLaw>,
    pub encoder: Box<dyn Encoder>,
    pub motors: MotorBank,
}

pub(crate) struct FlywheelInner {
    pub id: String,
    pub portal: PortalHandle,
    pub core: Mutex<Core>,
    snapshot: ArcSwap<Telemetry>,
    pub tunables: Tunables,
    signal: Arc<ReadySignal>,
    on_ready: Option<Callback>,
    on_active: Option<Callback>,
    clock: Arc<dyn Clock>,
    pub started: AtomicBool,
}

impl FlywheelInner {
    pub fn new(
        portal: PortalHandle,
        core: Core,
        tunables: Tunables,
        on_ready: Option<Callback>,
        on_active: Option<Callback>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let snapshot = Telemetry {
            system: core.system,
            raw: core.raw,
        };
        Self {
            id: portal.name(),
            portal,
            core: Mutex::new(core),
            snapshot: ArcSwap::from_pointee(snapshot),
            tunables,
            signal: Arc::new(ReadySignal::new(FlywheelState::Ready)),
            on_ready,
            on_active,
            clock,
            started: AtomicBool::new(false),
        }
    }

    pub fn telemetry(&self) -> Telemetry {
        **self.snapshot.load()
    }

    fn store_snapshot(&self, core: &Core) {
        self.snapshot.store(Arc::new(Telemetry {
            system: core.system,
            raw: core.raw,
        }));
    }

    /// 在锁内修改，随后刷新快照
    pub fn with_core(&self, f: impl FnOnce(&mut Core)) {
        let mut core = self.core.lock();
        f(&mut core);
        self.store_snapshot(&core);
    }

    fn publish(&self, keys: &[&str]) {
        for key in keys {
            // 错误已由注册表上报
            let _ = self.portal.update(key);
        }
    }

    pub fn state(&self) -> FlywheelState {
        self.signal.get()
    }

    pub fn wait_ready(&self, timeout: Option<Duration>) -> bool {
        self.signal.wait_ready(timeout)
    }

    /// 控制任务用于帧间等待
    pub fn signal(&self) -> Arc<ReadySignal> {
        Arc::clone(&self.signal)
    }

    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(self.tunables.delay.get())
    }

    pub fn check_cycle(&self) -> u32 {
        self.tunables.check_cycle.get().max(1)
    }

    /// 当前状态对应的线程优先级
    pub fn current_priority(&self) -> u32 {
        match self.state() {
            FlywheelState::Ready => self.tunables.priority_ready.get(),
            FlywheelState::Active => self.tunables.priority_active.get(),
        }
    }

    /// 一次控制迭代：采样 → 滤波 → 控制律 → 钳位 → 执行器 → 发布
    pub fn update(&self) {
        let mut core = self.core.lock();

        let now = self.clock.micros();
        let dt = now.saturating_sub(core.system.micro_time) as f32 / 1_000_000.0;
        core.system.micro_time = now;
        core.system.dt = dt;
        if dt <= 0.0 {
            warn!(
                "Flywheel '{}': non-positive dt ({}s), skipping iteration",
                self.id, dt
            );
            return;
        }

        let rpm = core.encoder.read().rpm * self.tunables.gearing.get();
        core.raw = rpm;
        filter_step(&mut core.system, rpm, dt, self.tunables.smoothing.get());

        let Core {
            system,
            controller,
            motors,
            ..
        } = &mut *core;
        controller.update(system);
        system.clamp_action();
        let command = system.command();
        for motor in motors.iter_mut() {
            motor.set(command);
        }

        self.store_snapshot(&core);
        self.publish(&["time", "dt", "raw", "measured", "derivative", "error", "action"]);
        let _ = self.portal.flush();

        trace!(
            "Flywheel '{}': dt={:.4} measured={:.2} error={:.2} action={:.2}",
            self.id, core.system.dt, core.system.measured, core.system.error, core.system.action
        );
    }

    /// 周期性就绪检查
    pub fn check_ready(&self) {
        let entered = {
            let core = self.core.lock();
            let ready = is_within(core.system.error, self.tunables.threshold_error.get())
                && is_within(
                    core.system.derivative,
                    self.tunables.threshold_derivative.get(),
                );
            let next = match (ready, self.state().is_ready()) {
                (true, false) => FlywheelState::Ready,
                (false, true) => FlywheelState::Active,
                _ => return,
            };
            self.enter(&core, next);
            next
        };
        self.announce(entered);
    }

    pub fn activate(&self) {
        self.transition(FlywheelState::Active);
    }

    pub fn readify(&self) {
        self.transition(FlywheelState::Ready);
    }

    fn transition(&self, state: FlywheelState) {
        {
            let core = self.core.lock();
            self.enter(&core, state);
        }
        self.announce(state);
    }

    /// 切换状态（调用方持有 `core` 锁）
    ///
    /// 先写帧间隔再切换信号，被唤醒的控制任务读到的是新状态的间隔。
    fn enter(&self, _locked: &Core, state: FlywheelState) {
        let delay = match state {
            FlywheelState::Ready => self.tunables.delay_ready.get(),
            FlywheelState::Active => self.tunables.delay_active.get(),
        };
        self.tunables.delay.set(delay);
        self.signal.set(state);
    }

    /// 锁外：日志、发布与回调
    fn announce(&self, state: FlywheelState) {
        debug!("Flywheel '{}' -> {:?}", self.id, state);
        self.publish(&["ready", "delay"]);
        let callback = match state {
            FlywheelState::Ready => &self.on_ready,
            FlywheelState::Active => &self.on_active,
        };
        if let Some(callback) = callback {
            callback();
        }
    }

    pub fn set_target(&self, rpm: f32) {
        let activated = {
            let mut core = self.core.lock();
            core.system.target = rpm;
            core.system.refresh_error();
            self.store_snapshot(&core);
            let activate = self.state().is_ready();
            if activate {
                self.enter(&core, FlywheelState::Active);
            }
            activate
        };
        self.publish(&["target", "error"]);
        if activated {
            self.announce(FlywheelState::Active);
        }
    }

    /// 以当前时刻作为下一次迭代 dt 的起点
    pub fn restart_clock(&self) {
        let now = self.clock.micros();
        self.with_core(|core| core.system.micro_time = now);
    }

    /// 清零测量、导数、误差与输出，并复位控制律与编码器
    pub fn reset(&self) {
        let mut core = self.core.lock();
        core.system.clear();
        core.controller.reset();
        core.encoder.reset();
        self.store_snapshot(&core);
        self.publish(&["measured", "derivative", "error", "action"]);
    }
}

// ==================== 注册表条目 ====================

/// 只读遥测条目：写入被忽略，总是回应当前值
fn telemetry_entry<T: WireValue + Default>(
    flywheel: &Weak<FlywheelInner>,
    key: &str,
    get: fn(&Telemetry) -> T,
) -> EntrySpec {
    let reader = flywheel.clone();
    EntrySpec::new(key).handler(read_only_handler(move || {
        reader
            .upgrade()
            .map(|f| get(&f.telemetry()))
            .unwrap_or_default()
    }))
}

fn system_entry<T: WireValue + Default>(
    flywheel: &Weak<FlywheelInner>,
    key: &str,
    get: fn(&Telemetry) -> T,
    set: fn(&mut Core, T),
) -> EntrySpec {
    let (reader, writer) = (flywheel.clone(), flywheel.clone());
    EntrySpec::new(key).handler(accessor_handler(
        move || {
            reader
                .upgrade()
                .map(|f| get(&f.telemetry()))
                .unwrap_or_default()
        },
        move |value: T| {
            if let Some(f) = writer.upgrade() {
                f.with_core(|core| set(core, value));
            }
        },
    ))
}

/// 只接受正值的参数条目
fn positive_entry<T>(key: &str, cell: &SharedValue<T>) -> EntrySpec
where
    T: WireValue + PartialOrd + Default,
{
    let (reader, writer) = (cell.clone(), cell.clone());
    let name = key.to_string();
    EntrySpec::new(key).handler(accessor_handler(
        move || reader.get(),
        move |value: T| {
            if value > T::default() {
                writer.set(value);
            } else {
                warn!("Rejected non-positive value for '{}'", name);
            }
        },
    ))
}

fn ready_entry(flywheel: &Weak<FlywheelInner>) -> EntrySpec {
    let flywheel = flywheel.clone();
    EntrySpec::new("ready")
        .handler(Arc::new(move |message: Option<&str>| {
            let f = flywheel.upgrade()?;
            let text = match message {
                None | Some("") => return Some(f.state().render()),
                Some(text) => text,
            };
            match bool::parse_wire(text) {
                Some(true) => f.readify(),
                Some(false) => f.activate(),
                None => warn!("Flywheel '{}': ready expects true/false, got '{}'", f.id, text),
            }
            None
        }))
        .onchange()
}

/// 注册飞轮 portal 的全部条目
pub(crate) fn register_entries(inner: &Arc<FlywheelInner>) -> Result<(), RegistryError> {
    let weak = Arc::downgrade(inner);
    let tune = &inner.tunables;

    inner.portal.add_batch([
        telemetry_entry(&weak, "time", |t| t.system.micro_time),
        telemetry_entry(&weak, "dt", |t| t.system.dt),
        system_entry(&weak, "target", |t| t.system.target, |c, v| {
            c.system.target = v;
            c.system.refresh_error();
        })
        .stream()
        .onchange(),
        system_entry(&weak, "measured", |t| t.system.measured, |c, v| {
            c.system.measured = v
        })
        .stream(),
        system_entry(&weak, "derivative", |t| t.system.derivative, |c, v| {
            c.system.derivative = v
        })
        .stream(),
        system_entry(&weak, "error", |t| t.system.error, |c, v| c.system.error = v),
        system_entry(&weak, "action", |t| t.system.action, |c, v| c.system.action = v)
            .stream(),
        telemetry_entry(&weak, "raw", |t| t.raw),
        EntrySpec::new("gearing").value(tune.gearing.clone()),
        positive_entry("smoothing", &tune.smoothing),
        ready_entry(&weak),
        EntrySpec::new("priority-ready").value(tune.priority_ready.clone()),
        EntrySpec::new("priority-active").value(tune.priority_active.clone()),
        EntrySpec::new("delay").value(tune.delay.clone()).onchange(),
        EntrySpec::new("delay-ready").value(tune.delay_ready.clone()),
        EntrySpec::new("delay-active").value(tune.delay_active.clone()),
        EntrySpec::new("threshold-error").value(tune.threshold_error.clone()),
        EntrySpec::new("threshold-derivative").value(tune.threshold_derivative.clone()),
        positive_entry("check-cycle", &tune.check_cycle),
        EntrySpec::new("keys").handler(inner.portal.stream_keys_handler()),
    ])
}

// ==================== 公共句柄 ====================

/// 飞轮
///
/// 由 [`FlywheelBuilder`](crate::FlywheelBuilder) 创建。句柄可克隆并在线程间共享；
/// 最后一个句柄销毁后控制任务随之退出。
#[derive(Clone)]
pub struct Flywheel {
    pub(crate) inner: Arc<FlywheelInner>,
}

impl Flywheel {
    /// portal id
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn portal(&self) -> &PortalHandle {
        &self.inner.portal
    }

    /// 设置目标转速
    ///
    /// 与控制迭代互斥；处于 READY 时立即切换到 ACTIVE。
    pub fn set_target(&self, rpm: f32) {
        self.inner.set_target(rpm);
    }

    pub fn target(&self) -> f32 {
        self.inner.telemetry().system.target
    }

    /// 启动周期控制任务（幂等）
    ///
    /// 首次启动前执行一次 [`reset`](Self::reset)，并以启动时刻作为计时起点。
    pub fn run(&self) -> Result<(), DriverError> {
        if self.inner.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.reset();
        self.inner.restart_clock();

        let weak = Arc::downgrade(&self.inner);
        let spawned = std::thread::Builder::new()
            .name(format!("flywheel-{}", self.inner.id))
            .spawn(move || crate::task::control_loop(weak));

        match spawned {
            Ok(_) => {
                info!("Flywheel '{}' control task started", self.inner.id);
                Ok(())
            },
            Err(e) => {
                error!("Failed to spawn control task for '{}': {}", self.inner.id, e);
                self.inner.started.store(false, Ordering::Release);
                Err(DriverError::ThreadSpawn(e))
            },
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// 阻塞直到进入 READY
    ///
    /// `timeout` 为 `None` 时无限等待。已处于 READY 时立即返回 `true`；
    /// 超时返回 `false`。
    pub fn wait_until_ready(&self, timeout: Option<Duration>) -> bool {
        self.inner.wait_ready(timeout)
    }

    /// 清零测量状态并复位控制律与编码器
    pub fn reset(&self) {
        self.inner.reset();
    }

    pub fn state(&self) -> FlywheelState {
        self.inner.state()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.state().is_ready()
    }

    /// 最近一次发布的遥测快照（无锁）
    pub fn telemetry(&self) -> Telemetry {
        self.inner.telemetry()
    }

    /// 当前帧间隔
    pub fn frame_delay(&self) -> Duration {
        self.inner.frame_delay()
    }

    /// 当前状态对应的优先级
    pub fn priority(&self) -> u32 {
        self.inner.current_priority()
    }

    /// 执行一次控制迭代
    ///
    /// 控制任务会周期性调用；未启动任务时可用于手动步进。
    pub fn update(&self) {
        self.inner.update();
    }

    /// 执行一次就绪检查
    pub fn check_ready(&self) {
        self.inner.check_ready();
    }
}

impl std::fmt::Debug for Flywheel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flywheel")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .field("telemetry", &self.telemetry())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FlywheelBuilder;
    use crate::hardware::EncoderReading;
    use flywheel_control::{BangBang, Pid};
    use flywheel_registry::{ChannelPeer, Registry, RegistryBuilder, channel_transport};
    use std::sync::atomic::{AtomicU32, AtomicU64};

    #[derive(Clone, Default)]
    struct ManualClock(Arc<AtomicU64>);

    impl ManualClock {
        fn advance_ms(&self, ms: u64) {
            self.0.fetch_add(ms * 1000, Ordering::Relaxed);
        }
    }

    impl Clock for ManualClock {
        fn micros(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    struct Rig {
        registry: Arc<Registry>,
        peer: ChannelPeer,
        clock: ManualClock,
        rpm: SharedValue<f32>,
        commands: Arc<Mutex<Vec<i8>>>,
    }

    fn rig() -> Rig {
        let (transport, peer) = channel_transport();
        let clock = ManualClock::default();
        clock.advance_ms(1);
        let registry = RegistryBuilder::new()
            .transport(transport)
            .clock(clock.clone())
            .build();
        Rig {
            registry,
            peer,
            clock,
            rpm: SharedValue::new(0.0),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn build(rig: &Rig, builder: FlywheelBuilder) -> Flywheel {
        let rpm = rig.rpm.clone();
        let commands = Arc::clone(&rig.commands);
        builder
            .encoder(move || EncoderReading {
                revolutions: 0.0,
                rpm: rpm.get(),
            })
            .motor(move |command: i8| commands.lock().push(command))
            .build(&rig.registry)
            .unwrap()
    }

    fn pid_flywheel(rig: &Rig, kp: f32) -> Flywheel {
        build(rig, FlywheelBuilder::new().controller(Pid::new(kp, 0.0, 0.0)))
    }

    #[test]
    fn test_initial_state_is_ready() {
        let rig = rig();
        let flywheel = pid_flywheel(&rig, 1.0);
        assert!(flywheel.is_ready());
        assert_eq!(flywheel.frame_delay(), Duration::from_millis(200));
        assert_eq!(flywheel.priority(), 2);
        assert!(flywheel.wait_until_ready(Some(Duration::ZERO)));
    }

    #[test]
    fn test_set_target_activates() {
        let rig = rig();
        let activations = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&activations);
        let flywheel = build(
            &rig,
            FlywheelBuilder::new()
                .controller(Pid::new(1.0, 0.0, 0.0))
                .priorities(1, 7)
                .on_active(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }),
        );

        flywheel.set_target(2400.0);
        assert_eq!(flywheel.state(), FlywheelState::Active);
        assert_eq!(flywheel.target(), 2400.0);
        assert_eq!(flywheel.frame_delay(), Duration::from_millis(60));
        assert_eq!(flywheel.priority(), 7);
        assert_eq!(activations.load(Ordering::Relaxed), 1);

        // 已在 ACTIVE 时不重复切换
        flywheel.set_target(2000.0);
        assert_eq!(activations.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_update_filters_and_drives_motors() {
        let rig = rig();
        let flywheel = pid_flywheel(&rig, 0.1);
        flywheel.set_target(100.0);
        rig.rpm.set(50.0);

        rig.clock.advance_ms(50);
        flywheel.update();

        let telemetry = flywheel.telemetry();
        assert!((telemetry.system.dt - 0.05).abs() < 1e-6);
        assert_eq!(telemetry.raw, 50.0);
        // Δm = 50 * 0.25
        assert!((telemetry.system.measured - 12.5).abs() < 1e-4);
        assert!((telemetry.system.error - (-87.5)).abs() < 1e-4);
        assert_eq!(rig.commands.lock().as_slice(), &[telemetry.system.command()]);
    }

    #[test]
    fn test_action_clamped() {
        let rig = rig();
        let flywheel = pid_flywheel(&rig, 100.0);
        flywheel.set_target(-1000.0);
        rig.rpm.set(1000.0);

        rig.clock.advance_ms(60);
        flywheel.update();

        let telemetry = flywheel.telemetry();
        assert_eq!(telemetry.system.action, 127.0);
        assert_eq!(rig.commands.lock().last(), Some(&127));
    }

    #[test]
    fn test_gearing_scales_raw() {
        let rig = rig();
        let flywheel = build(
            &rig,
            FlywheelBuilder::new()
                .gearing(5.0)
                .controller(BangBang::new(127.0, 0.0, 10.0, -10.0)),
        );
        rig.rpm.set(100.0);
        rig.clock.advance_ms(10);
        flywheel.update();
        assert_eq!(flywheel.telemetry().raw, 500.0);
    }

    #[test]
    fn test_zero_dt_skips_iteration() {
        let rig = rig();
        let flywheel = pid_flywheel(&rig, 1.0);
        rig.rpm.set(100.0);
        flywheel.update();
        assert_eq!(flywheel.telemetry().system.measured, 0.0);
        assert!(rig.commands.lock().is_empty());
    }

    #[test]
    fn test_check_ready_transitions() {
        let rig = rig();
        let readies = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&readies);
        let flywheel = build(
            &rig,
            FlywheelBuilder::new()
                .controller(Pid::new(0.0, 0.0, 0.0))
                .on_ready(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }),
        );

        flywheel.set_target(100.0);
        rig.rpm.set(100.0);
        rig.clock.advance_ms(60);
        flywheel.update();
        // 误差仍在带外
        flywheel.check_ready();
        assert_eq!(flywheel.state(), FlywheelState::Active);

        for _ in 0..60 {
            rig.clock.advance_ms(60);
            flywheel.update();
        }
        flywheel.check_ready();
        assert_eq!(flywheel.state(), FlywheelState::Ready);
        assert_eq!(readies.load(Ordering::Relaxed), 1);
        assert_eq!(flywheel.frame_delay(), Duration::from_millis(200));

        // 扰动后回到 ACTIVE
        rig.rpm.set(0.0);
        for _ in 0..5 {
            rig.clock.advance_ms(60);
            flywheel.update();
        }
        flywheel.check_ready();
        assert_eq!(flywheel.state(), FlywheelState::Active);
    }

    #[test]
    fn test_target_change_invalidates_pending_ready() {
        let rig = rig();
        let readies = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&readies);
        let flywheel = build(
            &rig,
            FlywheelBuilder::new()
                .controller(Pid::new(0.0, 0.0, 0.0))
                .on_ready(move || {
                    counter.fetch_add(1, Ordering::Relaxed);
                }),
        );

        flywheel.set_target(100.0);
        rig.rpm.set(100.0);
        for _ in 0..60 {
            rig.clock.advance_ms(60);
            flywheel.update();
        }
        // 已收敛但尚未检查；此时换目标
        flywheel.set_target(2000.0);
        assert_eq!(flywheel.state(), FlywheelState::Active);
        let system = flywheel.telemetry().system;
        assert_eq!(system.error, system.measured - 2000.0);

        flywheel.check_ready();
        assert_eq!(flywheel.state(), FlywheelState::Active);
        assert_eq!(readies.load(Ordering::Relaxed), 0);
        assert!(!flywheel.wait_until_ready(Some(Duration::from_millis(10))));

        flywheel.portal().enable().unwrap();
        rig.registry.dispatch_line("flywheel.target 3000");
        let system = flywheel.telemetry().system;
        assert_eq!(system.error, system.measured - 3000.0);
    }

    #[test]
    fn test_run_restarts_clock() {
        let rig = rig();
        let flywheel = pid_flywheel(&rig, 1.0);
        rig.clock.advance_ms(10_000);

        flywheel.run().unwrap();
        // 构建与启动之间的间隔不计入第一次迭代
        assert_eq!(flywheel.telemetry().system.micro_time, rig.clock.micros());
        assert!(flywheel.is_running());
    }

    #[test]
    fn test_time_entries_are_read_only() {
        let rig = rig();
        let flywheel = pid_flywheel(&rig, 1.0);
        flywheel.portal().enable().unwrap();
        rig.rpm.set(40.0);
        rig.clock.advance_ms(40);
        flywheel.update();
        let before = flywheel.telemetry();

        rig.registry.dispatch_line("flywheel.dt 5");
        rig.registry.dispatch_line("flywheel.time 0");
        rig.registry.dispatch_line("flywheel.raw 99");
        assert_eq!(flywheel.telemetry(), before);
    }

    #[test]
    fn test_reset_clears_measurements() {
        let rig = rig();
        let flywheel = pid_flywheel(&rig, 1.0);
        flywheel.set_target(300.0);
        rig.rpm.set(300.0);
        rig.clock.advance_ms(60);
        flywheel.update();
        assert_ne!(flywheel.telemetry().system.measured, 0.0);

        flywheel.reset();
        let system = flywheel.telemetry().system;
        assert_eq!(system.measured, 0.0);
        assert_eq!(system.derivative, 0.0);
        assert_eq!(system.error, 0.0);
        assert_eq!(system.action, 0.0);
        assert_eq!(system.target, 300.0);
    }

    #[test]
    fn test_remote_entries() {
        let rig = rig();
        let flywheel = pid_flywheel(&rig, 1.0);
        let portal = flywheel.portal();
        portal.enable().unwrap();

        rig.registry.dispatch_line("flywheel.target 1500");
        assert_eq!(flywheel.target(), 1500.0);

        rig.registry.dispatch_line("flywheel.ready false");
        assert_eq!(flywheel.state(), FlywheelState::Active);
        rig.registry.dispatch_line("flywheel.ready true");
        assert_eq!(flywheel.state(), FlywheelState::Ready);
        assert_eq!(portal.text("ready").unwrap().as_deref(), Some("true"));

        rig.registry.dispatch_line("flywheel.smoothing 0");
        assert_eq!(flywheel.inner.tunables.smoothing.get(), 0.2);
        rig.registry.dispatch_line("flywheel.smoothing 0.5");
        assert_eq!(flywheel.inner.tunables.smoothing.get(), 0.5);

        rig.registry.dispatch_line("flywheel.check-cycle 0");
        assert_eq!(flywheel.inner.check_cycle(), 20);

        rig.registry.dispatch_line("flywheel.delay-active 25");
        flywheel.set_target(10.0);
        rig.registry.dispatch_line("flywheel.ready false");
        assert_eq!(flywheel.frame_delay(), Duration::from_millis(25));
    }

    #[test]
    fn test_update_streams_telemetry() {
        let rig = rig();
        let flywheel = build(
            &rig,
            FlywheelBuilder::new().controller(BangBang::new(50.0, -50.0, 10.0, -10.0)),
        );
        flywheel.portal().enable().unwrap();
        rig.peer.drain_lines();

        flywheel.set_target(100.0);
        rig.clock.advance_ms(50);
        flywheel.update();

        let lines = rig.peer.drain_lines();
        let stream = lines
            .iter()
            .find(|line| line.contains("|flywheel ") || line.contains("|flywheel]"))
            .expect("stream line");
        // action derivative measured target
        assert!(
            stream.ends_with("50.000000 0.000000 0.000000 100.000000"),
            "{}",
            stream
        );
    }
}
