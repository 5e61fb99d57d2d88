//! Executing a decoded instruction (`spec.md` §4.2).
//!
//! Applies the instruction's semantics to the register file and program
//! counter, routing loads and stores through the bus. All arithmetic wraps
//! modulo 2^32; writes to `x0` are no-ops (enforced by [`RegisterFile`]
//! itself). A taken branch/jump to a misaligned target is *not* a fault
//! here — per `spec.md` §4.2 and §9, that only becomes a
//! [`HartFault::MisalignedFetch`] the next time the hart tries to fetch
//! from it.

use crate::bus::SystemBus;
use crate::error::HartFault;
use crate::instruction::Instruction;
use crate::registers::RegisterFile;
use crate::word::as_signed;

/// Execute `instr`, updating `regs` and `*pc` in place and routing any
/// memory access through `bus`.
pub fn execute(
    instr: Instruction,
    regs: &mut RegisterFile,
    pc: &mut u32,
    bus: &mut SystemBus,
) -> Result<(), HartFault> {
    let mut next_pc = pc.wrapping_add(4);

    match instr {
        Instruction::Lui { rd, imm } => {
            regs.write(rd, imm);
        }
        Instruction::Auipc { rd, imm } => {
            regs.write(rd, pc.wrapping_add(imm));
        }
        Instruction::Jal { rd, imm } => {
            regs.write(rd, next_pc);
            next_pc = pc.wrapping_add(imm);
        }
        Instruction::Jalr { rd, rs1, imm } => {
            // Compute the target from the *old* rs1 before writing rd, so
            // `rd == rs1` is handled correctly.
            let target = regs.read(rs1).wrapping_add(imm) & !1;
            regs.write(rd, next_pc);
            next_pc = target;
        }
        Instruction::Beq { rs1, rs2, imm } => {
            next_pc = branch(pc, imm, next_pc, regs.read(rs1) == regs.read(rs2));
        }
        Instruction::Bne { rs1, rs2, imm } => {
            next_pc = branch(pc, imm, next_pc, regs.read(rs1) != regs.read(rs2));
        }
        Instruction::Blt { rs1, rs2, imm } => {
            next_pc = branch(
                pc,
                imm,
                next_pc,
                as_signed(regs.read(rs1)) < as_signed(regs.read(rs2)),
            );
        }
        Instruction::Bge { rs1, rs2, imm } => {
            next_pc = branch(
                pc,
                imm,
                next_pc,
                as_signed(regs.read(rs1)) >= as_signed(regs.read(rs2)),
            );
        }
        Instruction::Bltu { rs1, rs2, imm } => {
            next_pc = branch(pc, imm, next_pc, regs.read(rs1) < regs.read(rs2));
        }
        Instruction::Bgeu { rs1, rs2, imm } => {
            next_pc = branch(pc, imm, next_pc, regs.read(rs1) >= regs.read(rs2));
        }
        Instruction::Lb { rd, rs1, imm } => {
            let ea = regs.read(rs1).wrapping_add(imm);
            let value = bus.read(ea, 1)?;
            regs.write(rd, crate::word::sign_extend(value, 8));
        }
        Instruction::Lh { rd, rs1, imm } => {
            let ea = regs.read(rs1).wrapping_add(imm);
            let value = bus.read(ea, 2)?;
            regs.write(rd, crate::word::sign_extend(value, 16));
        }
        Instruction::Lw { rd, rs1, imm } => {
            let ea = regs.read(rs1).wrapping_add(imm);
            let value = bus.read(ea, 4)?;
            regs.write(rd, value);
        }
        Instruction::Lbu { rd, rs1, imm } => {
            let ea = regs.read(rs1).wrapping_add(imm);
            let value = bus.read(ea, 1)?;
            regs.write(rd, value);
        }
        Instruction::Lhu { rd, rs1, imm } => {
            let ea = regs.read(rs1).wrapping_add(imm);
            let value = bus.read(ea, 2)?;
            regs.write(rd, value);
        }
        Instruction::Sb { rs1, rs2, imm } => {
            let ea = regs.read(rs1).wrapping_add(imm);
            bus.write(ea, 1, regs.read(rs2))?;
        }
        Instruction::Sh { rs1, rs2, imm } => {
            let ea = regs.read(rs1).wrapping_add(imm);
            bus.write(ea, 2, regs.read(rs2))?;
        }
        Instruction::Sw { rs1, rs2, imm } => {
            let ea = regs.read(rs1).wrapping_add(imm);
            bus.write(ea, 4, regs.read(rs2))?;
        }
        Instruction::Addi { rd, rs1, imm } => {
            regs.write(rd, regs.read(rs1).wrapping_add(imm));
        }
        Instruction::Slti { rd, rs1, imm } => {
            regs.write(rd, (as_signed(regs.read(rs1)) < as_signed(imm)) as u32);
        }
        Instruction::Sltiu { rd, rs1, imm } => {
            regs.write(rd, (regs.read(rs1) < imm) as u32);
        }
        Instruction::Xori { rd, rs1, imm } => {
            regs.write(rd, regs.read(rs1) ^ imm);
        }
        Instruction::Ori { rd, rs1, imm } => {
            regs.write(rd, regs.read(rs1) | imm);
        }
        Instruction::Andi { rd, rs1, imm } => {
            regs.write(rd, regs.read(rs1) & imm);
        }
        Instruction::Slli { rd, rs1, shamt } => {
            regs.write(rd, regs.read(rs1) << shamt);
        }
        Instruction::Srli { rd, rs1, shamt } => {
            regs.write(rd, regs.read(rs1) >> shamt);
        }
        Instruction::Srai { rd, rs1, shamt } => {
            regs.write(rd, crate::word::as_unsigned(as_signed(regs.read(rs1)) >> shamt));
        }
        Instruction::Add { rd, rs1, rs2 } => {
            regs.write(rd, regs.read(rs1).wrapping_add(regs.read(rs2)));
        }
        Instruction::Sub { rd, rs1, rs2 } => {
            regs.write(rd, regs.read(rs1).wrapping_sub(regs.read(rs2)));
        }
        Instruction::Sll { rd, rs1, rs2 } => {
            regs.write(rd, regs.read(rs1) << (regs.read(rs2) & 0x1f));
        }
        Instruction::Slt { rd, rs1, rs2 } => {
            regs.write(rd, (as_signed(regs.read(rs1)) < as_signed(regs.read(rs2))) as u32);
        }
        Instruction::Sltu { rd, rs1, rs2 } => {
            regs.write(rd, (regs.read(rs1) < regs.read(rs2)) as u32);
        }
        Instruction::Xor { rd, rs1, rs2 } => {
            regs.write(rd, regs.read(rs1) ^ regs.read(rs2));
        }
        Instruction::Srl { rd, rs1, rs2 } => {
            regs.write(rd, regs.read(rs1) >> (regs.read(rs2) & 0x1f));
        }
        Instruction::Sra { rd, rs1, rs2 } => {
            let shamt = regs.read(rs2) & 0x1f;
            regs.write(rd, crate::word::as_unsigned(as_signed(regs.read(rs1)) >> shamt));
        }
        Instruction::Or { rd, rs1, rs2 } => {
            regs.write(rd, regs.read(rs1) | regs.read(rs2));
        }
        Instruction::And { rd, rs1, rs2 } => {
            regs.write(rd, regs.read(rs1) & regs.read(rs2));
        }
    }

    *pc = next_pc;
    Ok(())
}

/// Shared branch-target arithmetic: `PC + imm` if taken, else the default
/// `PC + 4` the caller already computed.
fn branch(pc: &u32, imm: u32, not_taken_pc: u32, taken: bool) -> u32 {
    if taken {
        pc.wrapping_add(imm)
    } else {
        not_taken_pc
    }
}
