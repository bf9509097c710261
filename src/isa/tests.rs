//! ISA 模块测试

use std::sync::Arc;

use super::*;

#[test]
fn test_decode_addi() {
    let raw = 0x02A00093; // addi x1, x0, 42
    let decoded = decode(raw);
    assert_eq!(decoded.raw, raw);
    assert_eq!(
        decoded.instr,
        RvInstr::OpImm {
            op: AluOp::Add,
            rd: 1,
            rs1: 0,
            imm: 42
        }
    );
}

#[test]
fn test_decode_addi_negative() {
    let raw = 0xFFF00113; // addi x2, x0, -1
    assert_eq!(
        decode(raw).instr,
        RvInstr::OpImm {
            op: AluOp::Add,
            rd: 2,
            rs1: 0,
            imm: -1
        }
    );
}

#[test]
fn test_decode_sltiu_keeps_signed_imm() {
    let raw = 0xFFF13093; // sltiu x1, x2, -1
    assert_eq!(
        decode(raw).instr,
        RvInstr::OpImm {
            op: AluOp::Sltu,
            rd: 1,
            rs1: 2,
            imm: -1
        }
    );
}

#[test]
fn test_decode_srai() {
    let raw = 0x40335293; // srai x5, x6, 3
    assert_eq!(
        decode(raw).instr,
        RvInstr::OpImm {
            op: AluOp::Sra,
            rd: 5,
            rs1: 6,
            imm: 3
        }
    );
}

#[test]
fn test_decode_add_sub() {
    assert_eq!(
        decode(0x002081B3).instr, // add x3, x1, x2
        RvInstr::Op {
            op: AluOp::Add,
            rd: 3,
            rs1: 1,
            rs2: 2
        }
    );
    assert_eq!(
        decode(0x402081B3).instr, // sub x3, x1, x2
        RvInstr::Op {
            op: AluOp::Sub,
            rd: 3,
            rs1: 1,
            rs2: 2
        }
    );
}

#[test]
fn test_decode_loads_and_stores() {
    assert_eq!(
        decode(0x00412083).instr, // lw x1, 4(x2)
        RvInstr::Load {
            op: LoadOp::Lw,
            rd: 1,
            rs1: 2,
            offset: 4
        }
    );
    assert_eq!(
        decode(0xFFF44383).instr, // lbu x7, -1(x8)
        RvInstr::Load {
            op: LoadOp::Lbu,
            rd: 7,
            rs1: 8,
            offset: -1
        }
    );
    assert_eq!(
        decode(0x00112423).instr, // sw x1, 8(x2)
        RvInstr::Store {
            op: StoreOp::Sw,
            rs1: 2,
            rs2: 1,
            offset: 8
        }
    );
    assert_eq!(
        decode(0x00321123).instr, // sh x3, 2(x4)
        RvInstr::Store {
            op: StoreOp::Sh,
            rs1: 4,
            rs2: 3,
            offset: 2
        }
    );
}

#[test]
fn test_decode_branches() {
    assert_eq!(
        decode(0x00208463).instr, // beq x1, x2, 8
        RvInstr::Branch {
            op: BranchOp::Beq,
            rs1: 1,
            rs2: 2,
            offset: 8
        }
    );
    assert_eq!(
        decode(0xFE20FEE3).instr, // bgeu x1, x2, -4
        RvInstr::Branch {
            op: BranchOp::Bgeu,
            rs1: 1,
            rs2: 2,
            offset: -4
        }
    );
}

#[test]
fn test_decode_jumps() {
    assert_eq!(decode(0x000000EF).instr, RvInstr::Jal { rd: 1, offset: 0 });
    assert_eq!(decode(0xFF9FF0EF).instr, RvInstr::Jal { rd: 1, offset: -8 });
    assert_eq!(
        decode(0x004280E7).instr, // jalr x1, 4(x5)
        RvInstr::Jalr {
            rd: 1,
            rs1: 5,
            offset: 4
        }
    );
}

#[test]
fn test_decode_upper_immediates() {
    assert_eq!(
        decode(0x123450B7).instr, // lui x1, 0x12345
        RvInstr::Lui {
            rd: 1,
            imm: 0x12345000
        }
    );
    assert_eq!(
        decode(0x00001117).instr, // auipc x2, 1
        RvInstr::Auipc { rd: 2, imm: 0x1000 }
    );
}

#[test]
fn test_decode_m_extension() {
    assert_eq!(
        decode(0x022081B3).instr, // mul x3, x1, x2
        RvInstr::MulDiv {
            op: MulDivOp::Mul,
            rd: 3,
            rs1: 1,
            rs2: 2
        }
    );
    assert_eq!(
        decode(0x0262D233).instr, // divu x4, x5, x6
        RvInstr::MulDiv {
            op: MulDivOp::Divu,
            rd: 4,
            rs1: 5,
            rs2: 6
        }
    );
    assert_eq!(
        decode(0x023170B3).instr, // remu x1, x2, x3
        RvInstr::MulDiv {
            op: MulDivOp::Remu,
            rd: 1,
            rs1: 2,
            rs2: 3
        }
    );
}

#[test]
fn test_decode_system() {
    assert_eq!(decode(0x00000073).instr, RvInstr::Ecall);
    // EBREAK 同样走环境调用路径
    assert_eq!(decode(0x00100073).instr, RvInstr::Ecall);
    // csrrs x1, cycle, x0
    assert_eq!(decode(0xC00020F3).instr, RvInstr::Csr { raw: 0xC00020F3 });
}

#[test]
fn test_decode_fence() {
    assert_eq!(
        decode(0x0FF0000F).instr,
        RvInstr::Fence {
            pred: 0xF,
            succ: 0xF,
            fm: 0
        }
    );
}

#[test]
fn test_decode_unimplemented_opcode() {
    let decoded = decode(0x00000000);
    assert_eq!(decoded.instr, RvInstr::Unimplemented { opcode: 0, raw: 0 });
    assert_eq!(decoded.instr.group(), InstrGroup::Unimplemented);

    // custom-0
    let decoded = decode(0x0000000B);
    assert!(matches!(decoded.instr, RvInstr::Unimplemented { opcode: 0x0B, .. }));
}

#[test]
fn test_decode_illegal_within_known_opcode() {
    // OP 组下 funct7 = 0b0010000 未定义
    let decoded = decode(0x202081B3);
    assert_eq!(decoded.instr, RvInstr::Illegal { raw: 0x202081B3 });
    assert_eq!(decoded.instr.group(), InstrGroup::Op);

    // LOAD 组 funct3 = 3 (ld) 在 RV32 下不存在
    let decoded = decode(0x0000B103);
    assert_eq!(decoded.instr.group(), InstrGroup::Load);
    assert!(matches!(decoded.instr, RvInstr::Illegal { .. }));
}

#[test]
fn test_registry_matches_convenience_decode() {
    let registry = IsaConfig::rv32im().build().unwrap();
    for raw in [
        0x02A00093, 0x40335293, 0x022081B3, 0x0262D233, 0x00000073, 0xC00020F3, 0x202081B3,
        0x0000000B, 0xFE20FEE3,
    ] {
        assert_eq!(registry.decode(raw), decode(raw), "raw = 0x{raw:08X}");
    }
}

#[test]
fn test_rv32i_only_rejects_m_encodings() {
    let registry = IsaConfig::new().build().unwrap();
    let decoded = registry.decode(0x022081B3); // mul x3, x1, x2
    assert!(matches!(decoded.instr, RvInstr::Illegal { .. }));
}

#[test]
fn test_decoder_registry_custom_decoder() {
    // 自定义解码器认领 custom-0 opcode，把它当作 FENCE.I 处理
    struct CustomDecoder;

    impl InstrDecoder for CustomDecoder {
        fn name(&self) -> &str {
            "Custom"
        }

        fn decode(&self, raw: u32) -> Option<DecodedInstr> {
            (opcode(raw) == 0b0001011).then_some(DecodedInstr {
                raw,
                instr: RvInstr::FenceI,
            })
        }

        fn handled_opcodes(&self) -> &[u32] {
            &[0b0001011]
        }
    }

    let mut registry = IsaConfig::rv32im().build().unwrap();
    registry
        .register(Arc::new(CustomDecoder))
        .expect("custom decoder should register");
    // 再次注册相同 opcode 应该失败
    assert!(registry.register(Arc::new(CustomDecoder)).is_err());
    assert_eq!(registry.decoder_count(), 3);

    assert_eq!(registry.decode(0x0000000B).instr, RvInstr::FenceI);
    assert!(matches!(
        registry.decode(0x02A00093).instr,
        RvInstr::OpImm { op: AluOp::Add, .. }
    ));
}

#[test]
fn test_group_display() {
    assert_eq!(decode(0x02A00093).instr.group().to_string(), "OP-IMM");
    assert_eq!(decode(0x0FF0000F).instr.group().to_string(), "MISC-MEM");
}
