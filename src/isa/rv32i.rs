//! RV32I 基础指令集定义表

use crate::isa::fields::*;
use crate::isa::instr::{AluOp, BranchOp, LoadOp, RvInstr, StoreOp};
use crate::isa::instr_def::{InstrDef, TableDrivenDecoder};

// 每个指令组一个字段提取函数，表项只负责选择操作

fn branch(op: BranchOp, raw: u32) -> RvInstr {
    RvInstr::Branch {
        op,
        rs1: rs1(raw),
        rs2: rs2(raw),
        offset: imm_b(raw),
    }
}

fn load(op: LoadOp, raw: u32) -> RvInstr {
    RvInstr::Load {
        op,
        rd: rd(raw),
        rs1: rs1(raw),
        offset: imm_i(raw),
    }
}

fn store(op: StoreOp, raw: u32) -> RvInstr {
    RvInstr::Store {
        op,
        rs1: rs1(raw),
        rs2: rs2(raw),
        offset: imm_s(raw),
    }
}

fn op_imm(op: AluOp, raw: u32) -> RvInstr {
    RvInstr::OpImm {
        op,
        rd: rd(raw),
        rs1: rs1(raw),
        imm: imm_i(raw),
    }
}

/// 移位量只取低 5 位
fn shift_imm(op: AluOp, raw: u32) -> RvInstr {
    RvInstr::OpImm {
        op,
        rd: rd(raw),
        rs1: rs1(raw),
        imm: i32::from(shamt(raw)),
    }
}

fn op_reg(op: AluOp, raw: u32) -> RvInstr {
    RvInstr::Op {
        op,
        rd: rd(raw),
        rs1: rs1(raw),
        rs2: rs2(raw),
    }
}

/// imm[11:8] = fm, imm[7:4] = pred, imm[3:0] = succ
fn fence(raw: u32) -> RvInstr {
    let imm = raw >> 20;
    RvInstr::Fence {
        pred: ((imm >> 4) & 0xF) as u8,
        succ: (imm & 0xF) as u8,
        fm: ((imm >> 8) & 0xF) as u8,
    }
}

const SUB_SRA: u32 = 0b0100000;

/// RV32I 指令定义表
pub static RV32I_INSTRS: &[InstrDef] = &[
    InstrDef::by_opcode("LUI", OP_LUI, |raw| RvInstr::Lui { rd: rd(raw), imm: imm_u(raw) }),
    InstrDef::by_opcode("AUIPC", OP_AUIPC, |raw| RvInstr::Auipc { rd: rd(raw), imm: imm_u(raw) }),
    InstrDef::by_opcode("JAL", OP_JAL, |raw| RvInstr::Jal { rd: rd(raw), offset: imm_j(raw) }),
    InstrDef::by_funct3("JALR", OP_JALR, 0b000, |raw| RvInstr::Jalr {
        rd: rd(raw),
        rs1: rs1(raw),
        offset: imm_i(raw),
    }),
    // 分支
    InstrDef::by_funct3("BEQ", OP_BRANCH, 0b000, |raw| branch(BranchOp::Beq, raw)),
    InstrDef::by_funct3("BNE", OP_BRANCH, 0b001, |raw| branch(BranchOp::Bne, raw)),
    InstrDef::by_funct3("BLT", OP_BRANCH, 0b100, |raw| branch(BranchOp::Blt, raw)),
    InstrDef::by_funct3("BGE", OP_BRANCH, 0b101, |raw| branch(BranchOp::Bge, raw)),
    InstrDef::by_funct3("BLTU", OP_BRANCH, 0b110, |raw| branch(BranchOp::Bltu, raw)),
    InstrDef::by_funct3("BGEU", OP_BRANCH, 0b111, |raw| branch(BranchOp::Bgeu, raw)),
    // 访存
    InstrDef::by_funct3("LB", OP_LOAD, 0b000, |raw| load(LoadOp::Lb, raw)),
    InstrDef::by_funct3("LH", OP_LOAD, 0b001, |raw| load(LoadOp::Lh, raw)),
    InstrDef::by_funct3("LW", OP_LOAD, 0b010, |raw| load(LoadOp::Lw, raw)),
    InstrDef::by_funct3("LBU", OP_LOAD, 0b100, |raw| load(LoadOp::Lbu, raw)),
    InstrDef::by_funct3("LHU", OP_LOAD, 0b101, |raw| load(LoadOp::Lhu, raw)),
    InstrDef::by_funct3("SB", OP_STORE, 0b000, |raw| store(StoreOp::Sb, raw)),
    InstrDef::by_funct3("SH", OP_STORE, 0b001, |raw| store(StoreOp::Sh, raw)),
    InstrDef::by_funct3("SW", OP_STORE, 0b010, |raw| store(StoreOp::Sw, raw)),
    // 立即数运算
    InstrDef::by_funct3("ADDI", OP_IMM, 0b000, |raw| op_imm(AluOp::Add, raw)),
    InstrDef::by_funct3("SLTI", OP_IMM, 0b010, |raw| op_imm(AluOp::Slt, raw)),
    InstrDef::by_funct3("SLTIU", OP_IMM, 0b011, |raw| op_imm(AluOp::Sltu, raw)),
    InstrDef::by_funct3("XORI", OP_IMM, 0b100, |raw| op_imm(AluOp::Xor, raw)),
    InstrDef::by_funct3("ORI", OP_IMM, 0b110, |raw| op_imm(AluOp::Or, raw)),
    InstrDef::by_funct3("ANDI", OP_IMM, 0b111, |raw| op_imm(AluOp::And, raw)),
    InstrDef::by_funct7("SLLI", OP_IMM, 0b001, 0, |raw| shift_imm(AluOp::Sll, raw)),
    InstrDef::by_funct7("SRLI", OP_IMM, 0b101, 0, |raw| shift_imm(AluOp::Srl, raw)),
    InstrDef::by_funct7("SRAI", OP_IMM, 0b101, SUB_SRA, |raw| shift_imm(AluOp::Sra, raw)),
    // 寄存器运算
    InstrDef::by_funct7("ADD", OP_REG, 0b000, 0, |raw| op_reg(AluOp::Add, raw)),
    InstrDef::by_funct7("SUB", OP_REG, 0b000, SUB_SRA, |raw| op_reg(AluOp::Sub, raw)),
    InstrDef::by_funct7("SLL", OP_REG, 0b001, 0, |raw| op_reg(AluOp::Sll, raw)),
    InstrDef::by_funct7("SLT", OP_REG, 0b010, 0, |raw| op_reg(AluOp::Slt, raw)),
    InstrDef::by_funct7("SLTU", OP_REG, 0b011, 0, |raw| op_reg(AluOp::Sltu, raw)),
    InstrDef::by_funct7("XOR", OP_REG, 0b100, 0, |raw| op_reg(AluOp::Xor, raw)),
    InstrDef::by_funct7("SRL", OP_REG, 0b101, 0, |raw| op_reg(AluOp::Srl, raw)),
    InstrDef::by_funct7("SRA", OP_REG, 0b101, SUB_SRA, |raw| op_reg(AluOp::Sra, raw)),
    InstrDef::by_funct7("OR", OP_REG, 0b110, 0, |raw| op_reg(AluOp::Or, raw)),
    InstrDef::by_funct7("AND", OP_REG, 0b111, 0, |raw| op_reg(AluOp::And, raw)),
    // MISC-MEM
    InstrDef::by_funct3("FENCE", OP_MISC_MEM, 0b000, fence),
    InstrDef::by_funct3("FENCE.I", OP_MISC_MEM, 0b001, |_| RvInstr::FenceI),
    // SYSTEM: funct3 = 0 (ECALL/EBREAK) 走环境调用，其余为 CSR，必须排在 ECALL 之后
    InstrDef::by_funct3("ECALL", OP_SYSTEM, 0b000, |_| RvInstr::Ecall),
    InstrDef::by_opcode("CSR", OP_SYSTEM, |raw| RvInstr::Csr { raw }),
];

/// RV32I 处理的 opcode
pub static RV32I_OPCODES: [u32; 11] = [
    OP_LUI, OP_AUIPC, OP_JAL, OP_JALR, OP_BRANCH,
    OP_LOAD, OP_STORE, OP_MISC_MEM, OP_IMM, OP_REG, OP_SYSTEM,
];

pub static RV32I_DECODER: TableDrivenDecoder =
    TableDrivenDecoder::new("RV32I", RV32I_INSTRS, &RV32I_OPCODES, true);
