//! CPU 配置器
//!
//! 提供统一的接口来配置 CPU 的指令集、初始寄存器和环境调用输出。
//!
//! # 示例
//!
//! ```
//! use isasim::cpu::{CpuBuilder, CpuState};
//!
//! let cpu = CpuBuilder::new(0x1000)
//!     .with_stack_pointer(0x8000)
//!     .build()
//!     .expect("配置无冲突");
//! assert_eq!(cpu.pc(), 0x1000);
//! assert_eq!(cpu.read_reg(2), 0x8000);
//! assert_eq!(cpu.state(), CpuState::Running);
//! ```

use std::io::Write;
use std::sync::Arc;

use super::regfile::abi::SP;
use super::CpuCore;
use crate::isa::{ConflictInfo, IsaConfig, IsaConfigError};

/// 默认初始栈指针
pub const DEFAULT_STACK_POINTER: u32 = 0x7FFF_FFFF;

/// CPU 构建器
///
/// 默认启用 RV32IM，栈指针为 [`DEFAULT_STACK_POINTER`]，输出到 stdout。
pub struct CpuBuilder {
    entry_pc: u32,
    isa_config: IsaConfig,
    stack_pointer: u32,
    trace: bool,
    console: Option<Box<dyn Write + Send>>,
}

impl CpuBuilder {
    pub fn new(entry_pc: u32) -> Self {
        Self {
            entry_pc,
            isa_config: IsaConfig::rv32im(),
            stack_pointer: DEFAULT_STACK_POINTER,
            trace: false,
            console: None,
        }
    }

    /// 启用 M 扩展（乘除法）
    pub fn with_m_extension(mut self) -> Self {
        self.isa_config = self.isa_config.with_m_extension();
        self
    }

    /// 替换整个 ISA 配置
    pub fn with_isa_config(mut self, config: IsaConfig) -> Self {
        self.isa_config = config;
        self
    }

    /// x2 的初始值
    pub fn with_stack_pointer(mut self, sp: u32) -> Self {
        self.stack_pointer = sp;
        self
    }

    /// 逐条指令输出 debug 日志
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// 环境调用的输出目标
    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = Some(console);
        self
    }

    /// 检测配置中的指令冲突
    pub fn detect_conflicts(&self) -> Vec<ConflictInfo> {
        self.isa_config.detect_conflicts()
    }

    /// 启用的扩展摘要，如 "RV32IM"
    pub fn extensions_summary(&self) -> String {
        self.isa_config.isa_string()
    }

    /// 构建 CPU 核心
    ///
    /// 返回 `Err` 如果检测到指令冲突
    pub fn build(self) -> Result<CpuCore, IsaConfigError> {
        let decoder = Arc::new(self.isa_config.build()?);

        let mut cpu = CpuCore::new(self.entry_pc, decoder);
        cpu.write_reg(SP, self.stack_pointer);
        cpu.set_trace(self.trace);
        if let Some(console) = self.console {
            drop(cpu.set_console(console));
        }

        Ok(cpu)
    }
}

impl Default for CpuBuilder {
    fn default() -> Self {
        Self::new(0)
    }
}
