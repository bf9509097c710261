//! 指令字段提取辅助函数
//!
//! 提供从 32-bit 指令字中提取各字段的工具函数。
//! 所有格式的立即数都经由同一个 `sign_extend` 完成符号扩展。

/// 以第 `bit` 位为符号位，将 `value` 的低 `bit + 1` 位符号扩展为 32 位
///
/// ```
/// use isasim::isa::sign_extend;
///
/// assert_eq!(sign_extend(0xFFF, 11), -1);
/// assert_eq!(sign_extend(0x7FF, 11), 2047);
/// assert_eq!(sign_extend(0x1000, 12), -4096);
/// ```
#[inline]
pub const fn sign_extend(value: u32, bit: u32) -> i32 {
    let shift = 31 - bit;
    ((value << shift) as i32) >> shift
}

/// 取 `raw[hi:lo]`，右对齐
#[inline]
pub const fn bits(raw: u32, hi: u32, lo: u32) -> u32 {
    let width_mask = ((1u32 << (hi - lo)) << 1).wrapping_sub(1);
    (raw >> lo) & width_mask
}

#[inline]
pub const fn opcode(raw: u32) -> u32 {
    bits(raw, 6, 0)
}

#[inline]
pub const fn rd(raw: u32) -> u8 {
    bits(raw, 11, 7) as u8
}

#[inline]
pub const fn funct3(raw: u32) -> u32 {
    bits(raw, 14, 12)
}

#[inline]
pub const fn rs1(raw: u32) -> u8 {
    bits(raw, 19, 15) as u8
}

#[inline]
pub const fn rs2(raw: u32) -> u8 {
    bits(raw, 24, 20) as u8
}

#[inline]
pub const fn funct7(raw: u32) -> u32 {
    bits(raw, 31, 25)
}

/// 移位量只用低 5 位
#[inline]
pub const fn shamt(raw: u32) -> u8 {
    bits(raw, 24, 20) as u8
}

// ========== 立即数 ==========

/// I 型：imm[11:0] = raw[31:20]
#[inline]
pub const fn imm_i(raw: u32) -> i32 {
    sign_extend(bits(raw, 31, 20), 11)
}

/// S 型：imm[11:5] = raw[31:25]，imm[4:0] = raw[11:7]
#[inline]
pub const fn imm_s(raw: u32) -> i32 {
    sign_extend((bits(raw, 31, 25) << 5) | bits(raw, 11, 7), 11)
}

/// B 型：imm[12|10:5] = raw[31|30:25]，imm[4:1|11] = raw[11:8|7]
#[inline]
pub const fn imm_b(raw: u32) -> i32 {
    let imm = (bits(raw, 31, 31) << 12)
        | (bits(raw, 7, 7) << 11)
        | (bits(raw, 30, 25) << 5)
        | (bits(raw, 11, 8) << 1);
    sign_extend(imm, 12)
}

/// U 型：高 20 位原位保留，低 12 位清零
#[inline]
pub const fn imm_u(raw: u32) -> i32 {
    (raw & !0xFFF) as i32
}

/// J 型：imm[20|10:1|11|19:12] = raw[31|30:21|20|19:12]
#[inline]
pub const fn imm_j(raw: u32) -> i32 {
    let imm = (bits(raw, 31, 31) << 20)
        | (bits(raw, 19, 12) << 12)
        | (bits(raw, 20, 20) << 11)
        | (bits(raw, 30, 21) << 1);
    sign_extend(imm, 20)
}

// ========== Opcode 常量 ==========
pub const OP_LUI: u32 = 0b0110111;
pub const OP_AUIPC: u32 = 0b0010111;
pub const OP_JAL: u32 = 0b1101111;
pub const OP_JALR: u32 = 0b1100111;
pub const OP_BRANCH: u32 = 0b1100011;
pub const OP_LOAD: u32 = 0b0000011;
pub const OP_STORE: u32 = 0b0100011;
pub const OP_MISC_MEM: u32 = 0b0001111;
pub const OP_IMM: u32 = 0b0010011;
pub const OP_REG: u32 = 0b0110011;
pub const OP_SYSTEM: u32 = 0b1110011;
