//! RV32I 基础指令的纯运算部分
//!
//! 这里的函数不接触 CPU 状态，由 `CpuCore::execute` 读取操作数后调用。

use crate::isa::{AluOp, BranchOp, LoadOp, StoreOp};
use crate::memory::{MemResult, Memory};

/// 整数 ALU；立即数形式把 imm 作为 `b` 传入
pub fn alu(op: AluOp, a: u32, b: u32) -> u32 {
    let shamt = b & 0x1F;
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Sll => a << shamt,
        AluOp::Slt => ((a as i32) < (b as i32)) as u32,
        AluOp::Sltu => (a < b) as u32,
        AluOp::Xor => a ^ b,
        AluOp::Srl => a >> shamt,
        AluOp::Sra => ((a as i32) >> shamt) as u32,
        AluOp::Or => a | b,
        AluOp::And => a & b,
    }
}

/// 分支条件是否成立
pub fn branch_taken(op: BranchOp, a: u32, b: u32) -> bool {
    match op {
        BranchOp::Beq => a == b,
        BranchOp::Bne => a != b,
        BranchOp::Blt => (a as i32) < (b as i32),
        BranchOp::Bge => (a as i32) >= (b as i32),
        BranchOp::Bltu => a < b,
        BranchOp::Bgeu => a >= b,
    }
}

/// 按宽度读取并扩展到 32 位
pub fn load(mem: &dyn Memory, op: LoadOp, addr: u32) -> MemResult<u32> {
    let value = match op {
        LoadOp::Lb => mem.read_byte(addr)? as i8 as i32 as u32,
        LoadOp::Lh => mem.read_half(addr)? as i16 as i32 as u32,
        LoadOp::Lw => mem.read_word(addr)?,
        LoadOp::Lbu => mem.read_byte(addr)? as u32,
        LoadOp::Lhu => mem.read_half(addr)? as u32,
    };
    Ok(value)
}

/// 写入 rs2 的低 1/2/4 字节
pub fn store(mem: &mut dyn Memory, op: StoreOp, addr: u32, value: u32) {
    match op {
        StoreOp::Sb => mem.store_byte(addr, value as u8),
        StoreOp::Sh => mem.store_half(addr, value as u16),
        StoreOp::Sw => mem.store_word(addr, value),
    }
}

/// 有效地址 base + offset，按 2^32 回绕
#[inline]
pub fn effective_addr(base: u32, offset: i32) -> u32 {
    base.wrapping_add(offset as u32)
}
