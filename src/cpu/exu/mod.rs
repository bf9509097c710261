//! Execution units split by ISA modules
pub mod ecall;
pub mod rv32i;
pub mod rv32m;

/// 一条指令执行后的控制流去向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// 顺序执行，pc + 4
    Next,
    /// 跳转到给定目标
    Jump(u32),
    /// 环境调用请求退出
    Exit,
}
