//! 指令定义：mask/match 对 + 解码函数
//!
//! 同一张表既驱动解码，也用于扩展之间的冲突检测。

use std::fmt;

use super::decoder::InstrDecoder;
use super::instr::{DecodedInstr, RvInstr};

/// 只比较 opcode
const OPCODE_BITS: u32 = 0x0000_007F;
/// opcode + funct3
const FUNCT3_BITS: u32 = 0x0000_707F;
/// opcode + funct3 + funct7
const FUNCT7_BITS: u32 = 0xFE00_707F;

/// 指令定义
///
/// `(raw & mask) == match_val` 时由 `decode` 构造 [`RvInstr`]。
#[derive(Clone)]
pub struct InstrDef {
    /// 助记符，用于日志和冲突报告
    pub name: &'static str,
    pub mask: u32,
    pub match_val: u32,
    pub decode: fn(u32) -> RvInstr,
}

impl InstrDef {
    pub const fn new(
        name: &'static str,
        mask: u32,
        match_val: u32,
        decode: fn(u32) -> RvInstr,
    ) -> Self {
        Self {
            name,
            mask,
            match_val,
            decode,
        }
    }

    /// 仅由 opcode 确定（U/J 型，或同一 opcode 下的兜底项）
    pub const fn by_opcode(name: &'static str, opcode: u32, decode: fn(u32) -> RvInstr) -> Self {
        Self::new(name, OPCODE_BITS, opcode, decode)
    }

    /// 由 opcode + funct3 确定（I/S/B 型）
    pub const fn by_funct3(
        name: &'static str,
        opcode: u32,
        funct3: u32,
        decode: fn(u32) -> RvInstr,
    ) -> Self {
        Self::new(name, FUNCT3_BITS, (funct3 << 12) | opcode, decode)
    }

    /// 由 opcode + funct3 + funct7 确定（R 型与移位立即数）
    pub const fn by_funct7(
        name: &'static str,
        opcode: u32,
        funct3: u32,
        funct7: u32,
        decode: fn(u32) -> RvInstr,
    ) -> Self {
        Self::new(
            name,
            FUNCT7_BITS,
            (funct7 << 25) | (funct3 << 12) | opcode,
            decode,
        )
    }

    #[inline]
    pub fn matches(&self, raw: u32) -> bool {
        (raw & self.mask) == self.match_val
    }

    #[inline]
    pub fn decode_instr(&self, raw: u32) -> DecodedInstr {
        DecodedInstr {
            raw,
            instr: (self.decode)(raw),
        }
    }

    /// 是否存在同时匹配两者的指令字
    pub fn conflicts_with(&self, other: &InstrDef) -> bool {
        let common = self.mask & other.mask;
        (self.match_val ^ other.match_val) & common == 0
    }

    /// 参与比较的位数，越大越具体
    pub const fn specificity(&self) -> u32 {
        self.mask.count_ones()
    }
}

impl fmt::Debug for InstrDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InstrDef({} mask=0x{:08X} match=0x{:08X})",
            self.name, self.mask, self.match_val
        )
    }
}

/// 表驱动解码器：按顺序匹配定义表，第一条命中的生效
#[derive(Clone, Copy)]
pub struct TableDrivenDecoder {
    name: &'static str,
    table: &'static [InstrDef],
    opcodes: &'static [u32],
    /// 是否与其他解码器共用 opcode（如 RV32I/RV32M 共用 OP）
    shares_opcodes: bool,
}

impl TableDrivenDecoder {
    pub const fn new(
        name: &'static str,
        table: &'static [InstrDef],
        opcodes: &'static [u32],
        shares_opcodes: bool,
    ) -> Self {
        Self {
            name,
            table,
            opcodes,
            shares_opcodes,
        }
    }
}

impl InstrDecoder for TableDrivenDecoder {
    fn name(&self) -> &str {
        self.name
    }

    fn decode(&self, raw: u32) -> Option<DecodedInstr> {
        self.table
            .iter()
            .find(|def| def.matches(raw))
            .map(|def| def.decode_instr(raw))
    }

    fn handled_opcodes(&self) -> &[u32] {
        self.opcodes
    }

    fn allow_opcode_overlap(&self) -> bool {
        self.shares_opcodes
    }
}
