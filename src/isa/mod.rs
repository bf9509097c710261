//! RISC-V ISA 抽象与解码框架
//!
//! 本模块提供可扩展的指令解码系统：
//! - `RvInstr`: 指令的语义表示（按指令组划分）
//! - `InstrDecoder`: 解码器 trait，允许插件式扩展
//! - `DecoderRegistry`: 解码器注册表，按 opcode 分桶
//! - `InstrDef`: 统一的指令定义，同时用于解码和冲突检测
//! - `IsaConfig`: ISA 配置构建器，支持冲突检测

mod config;
mod decoder;
mod fields;
mod instr;
mod instr_def;
mod rv32i;
mod rv32m;

pub use config::{ConflictInfo, IsaConfig, IsaConfigError, IsaExtension};
pub use decoder::{DecoderRegistry, InstrDecoder, RegistryError};
pub use fields::*;
pub use instr::{AluOp, BranchOp, DecodedInstr, InstrGroup, LoadOp, MulDivOp, RvInstr, StoreOp};
pub use instr_def::{InstrDef, TableDrivenDecoder};
pub use rv32i::{RV32I_DECODER, RV32I_INSTRS, RV32I_OPCODES};
pub use rv32m::{RV32M_DECODER, RV32M_INSTRS, RV32M_OPCODES};

/// 便捷函数：按 RV32IM 解码单条指令
///
/// 结果与 `IsaConfig::rv32im()` 构建的注册表一致
pub fn decode(raw: u32) -> DecodedInstr {
    let op = opcode(raw);
    if !RV32I_OPCODES.contains(&op) {
        return DecodedInstr {
            raw,
            instr: RvInstr::Unimplemented { opcode: op as u8, raw },
        };
    }

    RV32I_DECODER
        .decode(raw)
        .or_else(|| RV32M_DECODER.decode(raw))
        .unwrap_or(DecodedInstr {
            raw,
            instr: RvInstr::Illegal { raw },
        })
}

#[cfg(test)]
mod tests;
