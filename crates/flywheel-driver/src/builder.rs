//! Builder 模式实现
//!
//! 提供链式 API 创建 [`Flywheel`]。

use crate::config::FlywheelConfig;
use crate::error::DriverError;
use crate::flywheel::{Callback, Core, Flywheel, FlywheelInner, Tunables, register_entries};
use crate::hardware::{Encoder, MAX_MOTORS, Motor, MotorBank};
use flywheel_control::{ControlLaw, ControlSystem};
use flywheel_registry::Registry;
use std::sync::Arc;
use tracing::info;

/// 飞轮 Builder
///
/// 链式配置编码器、执行器与控制律，`build` 时在注册表中创建 portal，
/// 注册飞轮与控制律的全部条目，并将 portal 标记为就绪。
///
/// # Example
///
/// ```
/// use flywheel_control::Pid;
/// use flywheel_driver::{EncoderReading, FlywheelBuilder};
/// use flywheel_registry::{RegistryBuilder, channel_transport};
///
/// let (transport, _peer) = channel_transport();
/// let registry = RegistryBuilder::new().transport(transport).build();
///
/// let flywheel = FlywheelBuilder::new()
///     .id("shooter")
///     .encoder(|| EncoderReading::default())
///     .motor(|_command: i8| {})
///     .controller(Pid::new(0.5, 0.0, 0.0))
///     .build(&registry)
///     .unwrap();
///
/// assert!(flywheel.is_ready());
/// ```
pub struct FlywheelBuilder {
    config: FlywheelConfig,
    encoder: Option<Box<dyn Encoder>>,
    motors: Vec<Box<dyn Motor>>,
    controller: Option<Box<dyn ControlLaw>>,
    on_ready: Option<Callback>,
    on_active: Option<Callback>,
}

impl FlywheelBuilder {
    pub fn new() -> Self {
        Self {
            config: FlywheelConfig::default(),
            encoder: None,
            motors: Vec::new(),
            controller: None,
            on_ready: None,
            on_active: None,
        }
    }

    /// 整体替换配置
    pub fn config(mut self, config: FlywheelConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置 portal id（默认 "flywheel"）
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.config.id = id.into();
        self
    }

    pub fn gearing(mut self, gearing: f32) -> Self {
        self.config.gearing = gearing;
        self
    }

    /// 低通滤波时间常数（秒，必须为正）
    pub fn smoothing(mut self, smoothing: f32) -> Self {
        self.config.smoothing = smoothing;
        self
    }

    /// 就绪判定的误差带与导数带
    pub fn thresholds(mut self, error: f32, derivative: f32) -> Self {
        self.config.threshold_error = error;
        self.config.threshold_derivative = derivative;
        self
    }

    /// READY / ACTIVE 状态的帧间隔（毫秒）
    pub fn frame_delays(mut self, ready_ms: u64, active_ms: u64) -> Self {
        self.config.frame_delay_ready_ms = ready_ms;
        self.config.frame_delay_active_ms = active_ms;
        self
    }

    /// READY / ACTIVE 状态的线程优先级
    pub fn priorities(mut self, ready: u32, active: u32) -> Self {
        self.config.priority_ready = ready;
        self.config.priority_active = active;
        self
    }

    pub fn check_cycle(mut self, check_cycle: u32) -> Self {
        self.config.check_cycle = check_cycle;
        self
    }

    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Some(Box::new(encoder));
        self
    }

    /// 追加一个执行器（最多 [`MAX_MOTORS`] 个）
    pub fn motor(mut self, motor: impl Motor + 'static) -> Self {
        self.motors.push(Box::new(motor));
        self
    }

    pub fn controller(mut self, controller: impl ControlLaw + 'static) -> Self {
        self.controller = Some(Box::new(controller));
        self
    }

    /// 进入 READY 时调用
    pub fn on_ready(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_ready = Some(Box::new(callback));
        self
    }

    /// 进入 ACTIVE 时调用
    pub fn on_active(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_active = Some(Box::new(callback));
        self
    }

    /// 构建飞轮
    ///
    /// # 错误
    ///
    /// - 配置非法
    /// - 执行器超过 [`MAX_MOTORS`]，或缺少编码器 / 控制律
    /// - portal 创建或条目注册失败（例如注册表已全局就绪，或 id 已被占用）
    pub fn build(self, registry: &Arc<Registry>) -> Result<Flywheel, DriverError> {
        self.config.validate()?;
        if self.motors.len() > MAX_MOTORS {
            return Err(DriverError::TooManyMotors { max: MAX_MOTORS });
        }
        let encoder = self.encoder.ok_or(DriverError::MissingEncoder)?;
        let controller = self.controller.ok_or(DriverError::MissingController)?;

        let portal = registry.create(&self.config.id)?;
        let clock = registry.clock();

        let system = ControlSystem {
            micro_time: clock.micros(),
            ..ControlSystem::default()
        };
        let core = Core {
            system,
            raw: 0.0,
            controller,
            encoder,
            motors: self.motors.into_iter().collect::<MotorBank>(),
        };

        let inner = Arc::new(FlywheelInner::new(
            portal,
            core,
            Tunables::from_config(&self.config),
            self.on_ready,
            self.on_active,
            clock,
        ));

        register_entries(&inner)?;
        let law = {
            let mut core = inner.core.lock();
            core.controller.bind(&inner.portal)?;
            core.controller.name()
        };
        inner.portal.mark_ready()?;

        info!(
            "Flywheel '{}' built ({} control, {} motor(s))",
            inner.id,
            law,
            inner.core.lock().motors.len()
        );
        Ok(Flywheel { inner })
    }
}

impl Default for FlywheelBuilder {
    fn default() -> Self {
        Self::new()
    }
}
