//! 定义指令的语义表达式，用于解码和执行阶段

use std::fmt;

/// 条件分支的比较方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchOp {
    Beq,
    Bne,
    /// 有符号
    Blt,
    /// 有符号
    Bge,
    /// 无符号
    Bltu,
    /// 无符号
    Bgeu,
}

/// Load 的宽度与扩展方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOp {
    /// 字节，符号扩展
    Lb,
    /// 半字，符号扩展
    Lh,
    Lw,
    /// 字节，零扩展
    Lbu,
    /// 半字，零扩展
    Lhu,
}

/// Store 的宽度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    Sb,
    Sh,
    Sw,
}

/// 整数 ALU 运算
///
/// 立即数与寄存器两种形式共用；立即数形式不会出现 `Sub`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
}

/// M 扩展运算（funct7 = 0b0000001）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MulDivOp {
    /// 低 32 位
    Mul,
    /// 高 32 位，有符号 × 有符号
    Mulh,
    /// 高 32 位，有符号 × 无符号
    Mulhsu,
    /// 高 32 位，无符号 × 无符号
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
}

/// RV32IM 指令的语义化表示
///
/// 按指令组（opcode）划分变体，组内的具体操作由 `*Op` 子枚举给出。
/// 解码阶段一次性完成字段提取与符号扩展，执行阶段对其做穷尽匹配。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RvInstr {
    /// LUI: rd = imm（imm 已位于 [31:12]）
    Lui { rd: u8, imm: i32 },
    /// AUIPC: rd = pc + imm
    Auipc { rd: u8, imm: i32 },
    /// JAL: rd = pc + 4; pc = pc + offset
    Jal { rd: u8, offset: i32 },
    /// JALR: rd = pc + 4; pc = (rs1 + offset) & !1
    Jalr { rd: u8, rs1: u8, offset: i32 },
    /// 条件分支: if cmp(rs1, rs2) pc = pc + offset
    Branch { op: BranchOp, rs1: u8, rs2: u8, offset: i32 },
    /// rd = mem[rs1 + offset]
    Load { op: LoadOp, rd: u8, rs1: u8, offset: i32 },
    /// mem[rs1 + offset] = rs2
    Store { op: StoreOp, rs1: u8, rs2: u8, offset: i32 },
    /// 立即数 ALU；移位指令的 imm 为 shamt
    OpImm { op: AluOp, rd: u8, rs1: u8, imm: i32 },
    /// 寄存器 ALU
    Op { op: AluOp, rd: u8, rs1: u8, rs2: u8 },
    /// 乘除法
    MulDiv { op: MulDivOp, rd: u8, rs1: u8, rs2: u8 },

    /// FENCE: 单核模型中视为立即完成
    Fence { pred: u8, succ: u8, fm: u8 },
    /// FENCE.I
    FenceI,
    /// 环境调用（SYSTEM opcode 且 funct3 = 0，含 EBREAK 编码）
    Ecall,
    /// CSR 访问指令，不建模，视为空操作
    Csr { raw: u32 },

    /// 已知 opcode 下未定义的 funct3/funct7 组合
    Illegal { raw: u32 },
    /// 不支持的 opcode
    Unimplemented { opcode: u8, raw: u32 },
}

/// 指令组，与 opcode 一一对应
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrGroup {
    Lui,
    Auipc,
    Jal,
    Jalr,
    Branch,
    Load,
    Store,
    OpImm,
    Op,
    MiscMem,
    System,
    Unimplemented,
}

impl RvInstr {
    /// 指令所属的组
    pub fn group(&self) -> InstrGroup {
        match self {
            RvInstr::Lui { .. } => InstrGroup::Lui,
            RvInstr::Auipc { .. } => InstrGroup::Auipc,
            RvInstr::Jal { .. } => InstrGroup::Jal,
            RvInstr::Jalr { .. } => InstrGroup::Jalr,
            RvInstr::Branch { .. } => InstrGroup::Branch,
            RvInstr::Load { .. } => InstrGroup::Load,
            RvInstr::Store { .. } => InstrGroup::Store,
            RvInstr::OpImm { .. } => InstrGroup::OpImm,
            RvInstr::Op { .. } | RvInstr::MulDiv { .. } => InstrGroup::Op,
            RvInstr::Fence { .. } | RvInstr::FenceI => InstrGroup::MiscMem,
            RvInstr::Ecall | RvInstr::Csr { .. } => InstrGroup::System,
            RvInstr::Illegal { raw } => group_of_opcode(*raw),
            RvInstr::Unimplemented { .. } => InstrGroup::Unimplemented,
        }
    }
}

fn group_of_opcode(raw: u32) -> InstrGroup {
    use super::fields::*;

    match opcode(raw) {
        OP_LUI => InstrGroup::Lui,
        OP_AUIPC => InstrGroup::Auipc,
        OP_JAL => InstrGroup::Jal,
        OP_JALR => InstrGroup::Jalr,
        OP_BRANCH => InstrGroup::Branch,
        OP_LOAD => InstrGroup::Load,
        OP_STORE => InstrGroup::Store,
        OP_IMM => InstrGroup::OpImm,
        OP_REG => InstrGroup::Op,
        OP_MISC_MEM => InstrGroup::MiscMem,
        OP_SYSTEM => InstrGroup::System,
        _ => InstrGroup::Unimplemented,
    }
}

impl fmt::Display for InstrGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InstrGroup::Lui => "LUI",
            InstrGroup::Auipc => "AUIPC",
            InstrGroup::Jal => "JAL",
            InstrGroup::Jalr => "JALR",
            InstrGroup::Branch => "BRANCH",
            InstrGroup::Load => "LOAD",
            InstrGroup::Store => "STORE",
            InstrGroup::OpImm => "OP-IMM",
            InstrGroup::Op => "OP",
            InstrGroup::MiscMem => "MISC-MEM",
            InstrGroup::System => "SYSTEM",
            InstrGroup::Unimplemented => "UNIMPLEMENTED",
        };
        f.write_str(name)
    }
}

/// 已解码的指令
///
/// 包含原始编码与解码后的语义信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstr {
    /// 原始 32-bit 指令编码
    pub raw: u32,
    /// 解码后的语义表示
    pub instr: RvInstr,
}
