//! RV32M 乘除法扩展定义表
//!
//! 与 RV32I 共用 OP opcode，以 funct7 = 0b0000001 区分。

use crate::isa::fields::*;
use crate::isa::instr::{MulDivOp, RvInstr};
use crate::isa::instr_def::{InstrDef, TableDrivenDecoder};

const FUNCT7_MULDIV: u32 = 0b0000001;

fn muldiv(op: MulDivOp, raw: u32) -> RvInstr {
    RvInstr::MulDiv {
        op,
        rd: rd(raw),
        rs1: rs1(raw),
        rs2: rs2(raw),
    }
}

pub static RV32M_INSTRS: &[InstrDef] = &[
    InstrDef::by_funct7("MUL", OP_REG, 0b000, FUNCT7_MULDIV, |raw| muldiv(MulDivOp::Mul, raw)),
    InstrDef::by_funct7("MULH", OP_REG, 0b001, FUNCT7_MULDIV, |raw| muldiv(MulDivOp::Mulh, raw)),
    InstrDef::by_funct7("MULHSU", OP_REG, 0b010, FUNCT7_MULDIV, |raw| muldiv(MulDivOp::Mulhsu, raw)),
    InstrDef::by_funct7("MULHU", OP_REG, 0b011, FUNCT7_MULDIV, |raw| muldiv(MulDivOp::Mulhu, raw)),
    InstrDef::by_funct7("DIV", OP_REG, 0b100, FUNCT7_MULDIV, |raw| muldiv(MulDivOp::Div, raw)),
    InstrDef::by_funct7("DIVU", OP_REG, 0b101, FUNCT7_MULDIV, |raw| muldiv(MulDivOp::Divu, raw)),
    InstrDef::by_funct7("REM", OP_REG, 0b110, FUNCT7_MULDIV, |raw| muldiv(MulDivOp::Rem, raw)),
    InstrDef::by_funct7("REMU", OP_REG, 0b111, FUNCT7_MULDIV, |raw| muldiv(MulDivOp::Remu, raw)),
];

pub static RV32M_OPCODES: [u32; 1] = [OP_REG];

pub static RV32M_DECODER: TableDrivenDecoder =
    TableDrivenDecoder::new("RV32M", RV32M_INSTRS, &RV32M_OPCODES, true);
