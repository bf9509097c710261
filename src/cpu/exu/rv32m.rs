use crate::isa::MulDivOp;

/// Execute an RV32M (mul/div) operation on raw register values.
///
/// 除零与有符号溢出有确定结果，不产生异常。
pub fn muldiv(op: MulDivOp, a: u32, b: u32) -> u32 {
    match op {
        MulDivOp::Mul => a.wrapping_mul(b),
        MulDivOp::Mulh => {
            let a = a as i32 as i64;
            let b = b as i32 as i64;
            ((a * b) >> 32) as u32
        }
        MulDivOp::Mulhsu => {
            let a = a as i32 as i64;
            let b = b as u64 as i64;
            ((a.wrapping_mul(b)) >> 32) as u32
        }
        MulDivOp::Mulhu => {
            let a = a as u64;
            let b = b as u64;
            ((a * b) >> 32) as u32
        }
        MulDivOp::Div => {
            let (a, b) = (a as i32, b as i32);
            if b == 0 {
                u32::MAX
            } else {
                // i32::MIN / -1 回绕为 i32::MIN
                a.wrapping_div(b) as u32
            }
        }
        MulDivOp::Divu => {
            if b == 0 {
                u32::MAX
            } else {
                a / b
            }
        }
        MulDivOp::Rem => {
            let (a, b) = (a as i32, b as i32);
            if b == 0 {
                a as u32
            } else {
                a.wrapping_rem(b) as u32
            }
        }
        MulDivOp::Remu => {
            if b == 0 {
                a
            } else {
                a % b
            }
        }
    }
}
