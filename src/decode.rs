//! Decoding a 32-bit word into a typed [`Instruction`] (`spec.md` §4.1).
//!
//! Partitions on the 7-bit opcode field, then funct3/funct7 where the
//! opcode alone doesn't determine the instruction. Illegal cases: unknown
//! opcode, a shift-immediate whose upper funct7 bits are nonzero except for
//! `SRAI`'s bit 30, and an R-type funct7 that isn't `0000000` (or, for
//! `SUB`/`SRA`, `0100000`).

use crate::error::DecodeError;
use crate::fields;
use crate::instruction::Instruction;

const OP_LUI: u32 = 0b0110111;
const OP_AUIPC: u32 = 0b0010111;
const OP_JAL: u32 = 0b1101111;
const OP_JALR: u32 = 0b1100111;
const OP_BRANCH: u32 = 0b1100011;
const OP_LOAD: u32 = 0b0000011;
const OP_STORE: u32 = 0b0100011;
const OP_IMM: u32 = 0b0010011;
const OP_REG: u32 = 0b0110011;

const FUNCT7_ZERO: u32 = 0b0000000;
const FUNCT7_ALT: u32 = 0b0100000;

/// Decode `word`, fetched from address `pc`, into a typed instruction.
/// `pc` is only used to annotate [`DecodeError`] for diagnostics.
pub fn decode(word: u32, pc: u32) -> Result<Instruction, DecodeError> {
    let opcode = fields::opcode(word);
    match opcode {
        OP_LUI => Ok(Instruction::Lui {
            rd: fields::rd(word),
            imm: fields::imm_u(word),
        }),
        OP_AUIPC => Ok(Instruction::Auipc {
            rd: fields::rd(word),
            imm: fields::imm_u(word),
        }),
        OP_JAL => Ok(Instruction::Jal {
            rd: fields::rd(word),
            imm: fields::imm_j(word),
        }),
        OP_JALR => Ok(Instruction::Jalr {
            rd: fields::rd(word),
            rs1: fields::rs1(word),
            imm: fields::imm_i(word),
        }),
        OP_BRANCH => decode_branch(word, pc),
        OP_LOAD => decode_load(word, pc),
        OP_STORE => decode_store(word, pc),
        OP_IMM => decode_imm(word, pc),
        OP_REG => decode_reg(word, pc),
        _ => Err(DecodeError::IllegalOpcode { word, pc, opcode }),
    }
}

fn decode_branch(word: u32, pc: u32) -> Result<Instruction, DecodeError> {
    let rs1 = fields::rs1(word);
    let rs2 = fields::rs2(word);
    let imm = fields::imm_b(word);
    Ok(match fields::funct3(word) {
        0b000 => Instruction::Beq { rs1, rs2, imm },
        0b001 => Instruction::Bne { rs1, rs2, imm },
        0b100 => Instruction::Blt { rs1, rs2, imm },
        0b101 => Instruction::Bge { rs1, rs2, imm },
        0b110 => Instruction::Bltu { rs1, rs2, imm },
        0b111 => Instruction::Bgeu { rs1, rs2, imm },
        _ => return Err(DecodeError::IllegalOpcode { word, pc, opcode: OP_BRANCH }),
    })
}

fn decode_load(word: u32, pc: u32) -> Result<Instruction, DecodeError> {
    let rd = fields::rd(word);
    let rs1 = fields::rs1(word);
    let imm = fields::imm_i(word);
    Ok(match fields::funct3(word) {
        0b000 => Instruction::Lb { rd, rs1, imm },
        0b001 => Instruction::Lh { rd, rs1, imm },
        0b010 => Instruction::Lw { rd, rs1, imm },
        0b100 => Instruction::Lbu { rd, rs1, imm },
        0b101 => Instruction::Lhu { rd, rs1, imm },
        _ => return Err(DecodeError::IllegalOpcode { word, pc, opcode: OP_LOAD }),
    })
}

fn decode_store(word: u32, pc: u32) -> Result<Instruction, DecodeError> {
    let rs1 = fields::rs1(word);
    let rs2 = fields::rs2(word);
    let imm = fields::imm_s(word);
    Ok(match fields::funct3(word) {
        0b000 => Instruction::Sb { rs1, rs2, imm },
        0b001 => Instruction::Sh { rs1, rs2, imm },
        0b010 => Instruction::Sw { rs1, rs2, imm },
        _ => return Err(DecodeError::IllegalOpcode { word, pc, opcode: OP_STORE }),
    })
}

fn decode_imm(word: u32, pc: u32) -> Result<Instruction, DecodeError> {
    let rd = fields::rd(word);
    let rs1 = fields::rs1(word);
    let imm = fields::imm_i(word);
    Ok(match fields::funct3(word) {
        0b000 => Instruction::Addi { rd, rs1, imm },
        0b010 => Instruction::Slti { rd, rs1, imm },
        0b011 => Instruction::Sltiu { rd, rs1, imm },
        0b100 => Instruction::Xori { rd, rs1, imm },
        0b110 => Instruction::Ori { rd, rs1, imm },
        0b111 => Instruction::Andi { rd, rs1, imm },
        0b001 => {
            let shamt = fields::shamt(word);
            if fields::funct7(word) != FUNCT7_ZERO {
                return Err(DecodeError::IllegalShift { word, pc });
            }
            Instruction::Slli { rd, rs1, shamt }
        }
        0b101 => {
            let shamt = fields::shamt(word);
            match fields::funct7(word) {
                FUNCT7_ZERO => Instruction::Srli { rd, rs1, shamt },
                FUNCT7_ALT => Instruction::Srai { rd, rs1, shamt },
                _ => return Err(DecodeError::IllegalShift { word, pc }),
            }
        }
        _ => return Err(DecodeError::IllegalOpcode { word, pc, opcode: OP_IMM }),
    })
}

fn decode_reg(word: u32, pc: u32) -> Result<Instruction, DecodeError> {
    let rd = fields::rd(word);
    let rs1 = fields::rs1(word);
    let rs2 = fields::rs2(word);
    let funct7 = fields::funct7(word);
    Ok(match fields::funct3(word) {
        0b000 => match funct7 {
            FUNCT7_ZERO => Instruction::Add { rd, rs1, rs2 },
            FUNCT7_ALT => Instruction::Sub { rd, rs1, rs2 },
            _ => return Err(DecodeError::IllegalFunct7 { word, pc }),
        },
        0b001 if funct7 == FUNCT7_ZERO => Instruction::Sll { rd, rs1, rs2 },
        0b010 if funct7 == FUNCT7_ZERO => Instruction::Slt { rd, rs1, rs2 },
        0b011 if funct7 == FUNCT7_ZERO => Instruction::Sltu { rd, rs1, rs2 },
        0b100 if funct7 == FUNCT7_ZERO => Instruction::Xor { rd, rs1, rs2 },
        0b101 => match funct7 {
            FUNCT7_ZERO => Instruction::Srl { rd, rs1, rs2 },
            FUNCT7_ALT => Instruction::Sra { rd, rs1, rs2 },
            _ => return Err(DecodeError::IllegalFunct7 { word, pc }),
        },
        0b110 if funct7 == FUNCT7_ZERO => Instruction::Or { rd, rs1, rs2 },
        0b111 if funct7 == FUNCT7_ZERO => Instruction::And { rd, rs1, rs2 },
        0b001 | 0b010 | 0b011 | 0b100 | 0b110 | 0b111 => {
            return Err(DecodeError::IllegalFunct7 { word, pc })
        }
        _ => return Err(DecodeError::IllegalOpcode { word, pc, opcode: OP_REG }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_lui() {
        let instr = decode(0xDEADB2B7, 0).unwrap();
        assert_eq!(
            instr,
            Instruction::Lui {
                rd: 5,
                imm: 0xDEADB000
            }
        );
    }

    #[test]
    fn decodes_addi_negative() {
        let instr = decode(0xFFF00093, 0).unwrap();
        assert_eq!(
            instr,
            Instruction::Addi {
                rd: 1,
                rs1: 0,
                imm: 0xFFFF_FFFF
            }
        );
    }

    #[test]
    fn decodes_srai() {
        // SRAI x17, x18, 3
        let instr = decode(0x40395913, 0).unwrap();
        assert_eq!(
            instr,
            Instruction::Srai {
                rd: 17,
                rs1: 18,
                shamt: 3
            }
        );
    }

    #[test]
    fn decodes_sw() {
        // SW x5, 12(x6)
        let instr = decode(0x00532623, 0).unwrap();
        assert_eq!(
            instr,
            Instruction::Sw {
                rs1: 6,
                rs2: 5,
                imm: 12
            }
        );
    }

    #[test]
    fn rejects_unknown_opcode() {
        let err = decode(0b1111111, 0x100).unwrap_err();
        assert!(matches!(err, DecodeError::IllegalOpcode { pc: 0x100, .. }));
    }

    #[test]
    fn rejects_bad_shift_funct7() {
        // SLLI with funct7 bits set (should be all zero)
        let word = (0b0100000 << 25) | (1 << 15) | (0b001 << 12) | 0b0010011;
        let err = decode(word, 0).unwrap_err();
        assert!(matches!(err, DecodeError::IllegalShift { .. }));
    }

    #[test]
    fn rejects_bad_rtype_funct7() {
        // ADD/SUB opcode/funct3 but a funct7 that is neither 0 nor 0x20
        let word = (0b0000001 << 25) | (0b000 << 12) | 0b0110011;
        let err = decode(word, 0).unwrap_err();
        assert!(matches!(err, DecodeError::IllegalFunct7 { .. }));
    }

    #[test]
    fn immediate_round_trips_through_fields() {
        // ADDI x2, x3, -100: re-encoding the decoded immediate back into
        // the instruction's I-type field must reproduce the original word.
        let imm: i32 = -100;
        let word = (((imm as u32) & 0xfff) << 20) | (3 << 15) | (0b000 << 12) | (2 << 7) | OP_IMM;
        let instr = decode(word, 0).unwrap();
        match instr {
            Instruction::Addi { imm: decoded, .. } => {
                assert_eq!((decoded & 0xfff) << 20, (word & (0xfff << 20)));
            }
            other => panic!("unexpected decode: {other:?}"),
        }
    }
}
