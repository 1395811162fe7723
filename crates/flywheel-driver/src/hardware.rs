//! 硬件能力接口
//!
//! 控制任务只通过这两个窄接口接触硬件：
//!
//! - [`Encoder`]: 读取 `{revolutions, rpm}`，可复位
//! - [`Motor`]: 接受 `[-127, 127]` 的有符号命令
//!
//! 两者都可以直接用闭包实现。

use smallvec::SmallVec;

/// 单个飞轮最多驱动的执行器数量
pub const MAX_MOTORS: usize = 8;

/// 执行器列表（内联存储，无堆分配）
pub type MotorBank = SmallVec<[Box<dyn Motor>; MAX_MOTORS]>;

/// 编码器读数
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EncoderReading {
    /// 累计圈数
    pub revolutions: f32,
    /// 转速（rpm）
    pub rpm: f32,
}

/// 编码器
pub trait Encoder: Send {
    fn read(&mut self) -> EncoderReading;

    /// 清零累计值
    fn reset(&mut self) {}
}

impl<F> Encoder for F
where
    F: FnMut() -> EncoderReading + Send,
{
    fn read(&mut self) -> EncoderReading {
        self()
    }
}

/// 执行器
pub trait Motor: Send {
    fn set(&mut self, command: i8);
}

impl<F> Motor for F
where
    F: FnMut(i8) + Send,
{
    fn set(&mut self, command: i8) {
        self(command)
    }
}
