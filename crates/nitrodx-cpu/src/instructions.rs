//! Per-family instruction execution.
//!
//! Each method consumes any immediate it needs, applies the documented
//! flag effects, and returns the fixed cycle cost of the instruction.
//! Costs: register-to-register operations are 1 cycle, immediates add 1,
//! memory operands add 1 more, taken branches add 1, CALL/RET cost 3.

use crate::bus::Bus;
use crate::cpu::{Cpu, SP_RESET};
use crate::decode::{family, Decoded};
use crate::flags::Flags;
use crate::{CpuError, Result};

/// The guest I/O page starts here in bank 0; registers behind it are 8 bits
/// wide, so 16-bit data accesses are narrowed.
const IO_BASE: u16 = 0x8000;

impl Cpu {
    /// SYS family: NOP, PUSHF, POPF.
    pub(crate) fn exec_sys(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        match d.mode {
            0 => Ok(1),
            1 => {
                self.push16(bus, u16::from(self.flags.bits()))?;
                Ok(2)
            }
            2 => {
                let word = self.pop16(bus)?;
                self.flags = Flags::from_bits_truncate(word as u8);
                Ok(2)
            }
            _ => Err(CpuError::invalid(d)),
        }
    }

    /// MOV family: register moves, loads, stores, push, pop.
    ///
    /// 16-bit loads and stores targeting the bank-0 I/O page are narrowed
    /// to a single byte (zero-extended on load, low byte on store) because
    /// device registers are 8 bits wide. Modes 6 and 7 force byte access
    /// regardless of the target.
    pub(crate) fn exec_mov(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        match d.mode {
            // MOV Rd, Rs
            0 => {
                self.r[d.reg1] = self.r[d.reg2];
                Ok(1)
            }
            // MOV Rd, #imm
            1 => {
                self.r[d.reg1] = self.fetch_imm(bus);
                Ok(2)
            }
            // MOV Rd, [Rs]
            2 => {
                let addr = self.r[d.reg2];
                self.r[d.reg1] = if self.dbr == 0 && addr >= IO_BASE {
                    u16::from(bus.read8(self.dbr, addr))
                } else {
                    bus.read16(self.dbr, addr)
                };
                Ok(3)
            }
            // MOV [Rd], Rs
            3 => {
                let addr = self.r[d.reg1];
                let value = self.r[d.reg2];
                if self.dbr == 0 && addr >= IO_BASE {
                    bus.write8(self.dbr, addr, value as u8);
                } else {
                    bus.write16(self.dbr, addr, value);
                }
                Ok(3)
            }
            // PUSH Rs
            4 => {
                self.push16(bus, self.r[d.reg1])?;
                Ok(2)
            }
            // POP Rd
            5 => {
                self.r[d.reg1] = self.pop16(bus)?;
                Ok(2)
            }
            // MOV.b Rd, [Rs]
            6 => {
                let addr = self.r[d.reg2];
                self.r[d.reg1] = u16::from(bus.read8(self.dbr, addr));
                Ok(3)
            }
            // MOV.b [Rd], Rs
            7 => {
                let addr = self.r[d.reg1];
                bus.write8(self.dbr, addr, self.r[d.reg2] as u8);
                Ok(3)
            }
            _ => Err(CpuError::invalid(d)),
        }
    }

    /// ADD/SUB/MUL/DIV. Mode 0 takes the operand from reg2, mode 1 from an
    /// immediate word.
    pub(crate) fn exec_arith(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        let (operand, base_cost) = self.alu_operand(bus, d)?;
        let lhs = self.r[d.reg1];

        let result = match d.family {
            family::ADD => {
                let (result, carry) = lhs.overflowing_add(operand);
                let overflow = (lhs ^ result) & (operand ^ result) & 0x8000 != 0;
                self.flags.set_zn(result);
                self.flags.set_flag(Flags::C, carry);
                self.flags.set_flag(Flags::V, overflow);
                result
            }
            family::SUB => {
                let (result, borrow) = lhs.overflowing_sub(operand);
                let overflow = (lhs ^ operand) & (lhs ^ result) & 0x8000 != 0;
                self.flags.set_zn(result);
                self.flags.set_flag(Flags::C, borrow);
                self.flags.set_flag(Flags::V, overflow);
                result
            }
            family::MUL => {
                let result = (u32::from(lhs) * u32::from(operand)) as u16;
                self.flags.set_zn(result);
                result
            }
            family::DIV => {
                if operand == 0 {
                    self.flags.set_zn(0xFFFF);
                    self.flags.insert(Flags::D);
                    0xFFFF
                } else {
                    let result = lhs / operand;
                    self.flags.set_zn(result);
                    result
                }
            }
            _ => unreachable!(),
        };

        self.r[d.reg1] = result;

        // MUL and DIV carry extra cost over the single-cycle ALU ops.
        let extra = match d.family {
            family::MUL => 2,
            family::DIV => 3,
            _ => 0,
        };
        Ok(base_cost + extra)
    }

    /// AND/OR/XOR.
    pub(crate) fn exec_logic(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        let (operand, cost) = self.alu_operand(bus, d)?;
        let lhs = self.r[d.reg1];
        let result = match d.family {
            family::AND => lhs & operand,
            family::OR => lhs | operand,
            family::XOR => lhs ^ operand,
            _ => unreachable!(),
        };
        self.flags.set_zn(result);
        self.r[d.reg1] = result;
        Ok(cost)
    }

    /// NOT (unary, mode 0 only).
    pub(crate) fn exec_not(&mut self, d: Decoded) -> Result<u64> {
        if d.mode != 0 {
            return Err(CpuError::invalid(d));
        }
        let result = !self.r[d.reg1];
        self.flags.set_zn(result);
        self.r[d.reg1] = result;
        Ok(1)
    }

    /// SHL/SHR. The shift count is masked to 0..15; C holds the last bit
    /// shifted out, or is cleared for a count of zero.
    pub(crate) fn exec_shift(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        let (operand, cost) = self.alu_operand(bus, d)?;
        let count = u32::from(operand & 0xF);
        let value = self.r[d.reg1];

        let (result, carry) = if count == 0 {
            (value, false)
        } else if d.family == family::SHL {
            let carry = (value >> (16 - count)) & 1 != 0;
            (value << count, carry)
        } else {
            let carry = (value >> (count - 1)) & 1 != 0;
            (value >> count, carry)
        };

        self.flags.set_zn(result);
        self.flags.set_flag(Flags::C, carry);
        self.r[d.reg1] = result;
        Ok(cost)
    }

    /// CMP (modes 0-1) and the conditional branches (modes 2-7).
    ///
    /// The branch offset is a signed word relative to the PC after the
    /// instruction and its immediate have been consumed.
    pub(crate) fn exec_cmp_branch(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        match d.mode {
            0 | 1 => {
                let (operand, cost) = self.alu_operand(bus, d)?;
                let lhs = self.r[d.reg1];
                let (result, borrow) = lhs.overflowing_sub(operand);
                let overflow = (lhs ^ operand) & (lhs ^ result) & 0x8000 != 0;
                self.flags.set_zn(result);
                self.flags.set_flag(Flags::C, borrow);
                self.flags.set_flag(Flags::V, overflow);
                Ok(cost)
            }
            2..=7 => {
                let offset = self.fetch_imm(bus) as i16;
                let z = self.flags.contains(Flags::Z);
                let n = self.flags.contains(Flags::N);
                let v = self.flags.contains(Flags::V);
                let taken = match d.mode {
                    2 => z,              // BEQ
                    3 => !z,             // BNE
                    4 => !z && n == v,   // BGT (signed)
                    5 => n != v,         // BLT
                    6 => n == v,         // BGE
                    7 => z || n != v,    // BLE
                    _ => unreachable!(),
                };
                if taken {
                    self.pc_offset = self.pc_offset.wrapping_add(offset as u16);
                    Ok(3)
                } else {
                    Ok(2)
                }
            }
            _ => Err(CpuError::invalid(d)),
        }
    }

    /// JMP: mode 0 immediate offset, mode 1 register offset, mode 2 far
    /// (bank from the low byte of reg1, offset from reg2).
    pub(crate) fn exec_jmp(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        match d.mode {
            0 => {
                self.pc_offset = self.fetch_imm(bus);
                Ok(2)
            }
            1 => {
                self.pc_offset = self.r[d.reg1];
                Ok(2)
            }
            2 => {
                let bank = self.r[d.reg1] as u8;
                self.pbr = bank;
                self.pc_bank = bank;
                self.pc_offset = self.r[d.reg2];
                Ok(3)
            }
            _ => Err(CpuError::invalid(d)),
        }
    }

    /// CALL: pushes PBR, then the return offset, then transfers control.
    /// Target resolution matches JMP's modes.
    pub(crate) fn exec_call(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        let (bank, offset) = match d.mode {
            0 => (self.pbr, self.fetch_imm(bus)),
            1 => (self.pbr, self.r[d.reg1]),
            2 => (self.r[d.reg1] as u8, self.r[d.reg2]),
            _ => return Err(CpuError::invalid(d)),
        };

        self.push16(bus, u16::from(self.pbr))?;
        self.push16(bus, self.pc_offset)?;
        self.pbr = bank;
        self.pc_bank = bank;
        self.pc_offset = offset;
        Ok(3)
    }

    /// RET: pops the return offset, then PBR.
    ///
    /// Executed with the stack at its reset level there is no frame to pop:
    /// the program has returned from its entry point, and the CPU halts
    /// while the rest of the machine keeps running the frame.
    pub(crate) fn exec_ret(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        if d.mode != 0 {
            return Err(CpuError::invalid(d));
        }
        if self.sp == SP_RESET {
            self.halt();
            return Ok(1);
        }
        self.pc_offset = self.pop16(bus)?;
        let bank = self.pop16(bus)? as u8;
        self.pbr = bank;
        self.pc_bank = bank;
        Ok(3)
    }

    /// Resolve the ALU operand for a two-mode (register/immediate) family.
    /// Returns the operand and the base cycle cost.
    fn alu_operand(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<(u16, u64)> {
        match d.mode {
            0 => Ok((self.r[d.reg2], 1)),
            1 => Ok((self.fetch_imm(bus), 2)),
            _ => Err(CpuError::invalid(d)),
        }
    }
}
