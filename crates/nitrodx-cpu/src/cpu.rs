//! CPU core implementation.
//!
//! This module contains the register file, the fetch/decode/execute loop,
//! interrupt servicing, and the stack helpers. The per-family execution
//! methods live in `instructions.rs`.

use crate::bus::Bus;
use crate::decode::{family, Decoded};
use crate::flags::Flags;
use crate::{CpuError, Result};

/// Stack pointer value after reset. The stack is empty at this level;
/// well-formed execution keeps SP within `0x0100..=0x1FFF`.
pub const SP_RESET: u16 = 0x1FFF;

/// Lowest address the stack may grow down to.
pub const SP_FLOOR: u16 = 0x0100;

/// Cycle cost of servicing an interrupt (three pushes plus the vector fetch).
const INTERRUPT_ENTRY_CYCLES: u64 = 6;

/// Interrupt sources, in priority order (NMI wins over Timer wins over
/// VBlank when more than one is pending).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// Non-maskable in name only: the guest masks all sources with the I
    /// flag. Serviced through the NMI vector.
    Nmi,
    /// Timer interrupt. No internal device drives this; the host may.
    Timer,
    /// Raised by the PPU on entry to the vertical blanking interval.
    VBlank,
}

impl Interrupt {
    /// Bit position of this source in the pending mask.
    #[inline]
    #[must_use]
    pub fn bit(self) -> u8 {
        match self {
            Self::Nmi => 1 << 0,
            Self::Timer => 1 << 1,
            Self::VBlank => 1 << 2,
        }
    }
}

/// Interrupt vector locations in the bank-0 I/O page.
///
/// Each vector is four bytes: offset low, offset high, bank, reserved.
pub mod vectors {
    /// IRQ vector base (shared by Timer and VBlank).
    pub const IRQ: u16 = 0xFFE0;
    /// NMI vector base.
    pub const NMI: u16 = 0xFFE4;
}

/// Nitro-Core-DX CPU.
///
/// Eight 16-bit general registers, a 24-bit banked program counter, and a
/// bank-0 stack. Every instruction advances the cycle counter by a fixed
/// documented cost so that the two scheduler modes stay deterministic.
#[derive(Debug, Clone)]
pub struct Cpu {
    /// General registers R0..R7.
    pub r: [u16; 8],
    /// Program counter bank. Equal to `pbr` except during the atomic
    /// transition inside CALL/RET/interrupt entry.
    pub pc_bank: u8,
    /// Program counter offset within the current bank.
    pub pc_offset: u16,
    /// Program bank register.
    pub pbr: u8,
    /// Data bank register. Bank 0 data accesses at offsets >= 0x8000 hit
    /// the I/O page and are narrowed to 8 bits.
    pub dbr: u8,
    /// Stack pointer (bank 0).
    pub sp: u16,
    /// Flags byte.
    pub flags: Flags,
    /// Total cycles executed.
    pub cycles: u64,
    /// Pending interrupt mask (one bit per source).
    pending: u8,
    /// Set once the program has exited via a top-level RET or a fatal
    /// error was reported. A halted CPU consumes cycles without executing.
    halted: bool,
}

impl Cpu {
    /// Create a CPU in the reset state with execution starting at bank 0,
    /// offset 0. Callers normally follow up with [`Cpu::reset`] using the
    /// ROM entry point.
    #[must_use]
    pub fn new() -> Self {
        Self {
            r: [0; 8],
            pc_bank: 0,
            pc_offset: 0,
            pbr: 0,
            dbr: 0,
            sp: SP_RESET,
            flags: Flags::RESET,
            cycles: 0,
            pending: 0,
            halted: false,
        }
    }

    /// Reset the CPU and begin execution at `bank:offset`.
    ///
    /// Interrupts come up masked; guests install vectors and then POPF a
    /// zero flags word to enable them.
    pub fn reset(&mut self, bank: u8, offset: u16) {
        self.r = [0; 8];
        self.pbr = bank;
        self.pc_bank = bank;
        self.pc_offset = offset;
        self.dbr = 0;
        self.sp = SP_RESET;
        self.flags = Flags::RESET;
        self.cycles = 0;
        self.pending = 0;
        self.halted = false;
    }

    /// Request an interrupt. The request stays pending until serviced.
    pub fn request_interrupt(&mut self, source: Interrupt) {
        self.pending |= source.bit();
    }

    /// True once the guest program has exited.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Pending interrupt mask, for inspection.
    #[must_use]
    pub fn pending_interrupts(&self) -> u8 {
        self.pending
    }

    /// Run instructions until the cycle counter reaches `target`.
    ///
    /// The last instruction may overshoot the target; the overshoot
    /// carries into the next call. A halted CPU jumps straight to the
    /// target so the scheduler's bookkeeping stays uniform.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal decode or stack error. The CPU is left
    /// halted; the caller decides whether to reset.
    pub fn run_until(&mut self, bus: &mut impl Bus, target: u64) -> Result<()> {
        while self.cycles < target {
            if self.halted {
                self.cycles = target;
                break;
            }
            if let Err(err) = self.step(bus) {
                self.halted = true;
                log::error!("CPU fault: {err}");
                return Err(err);
            }
        }
        Ok(())
    }

    /// Service interrupts, then execute one instruction.
    ///
    /// Returns the number of cycles consumed.
    ///
    /// # Errors
    ///
    /// Returns a fatal error on unknown opcodes or stack corruption.
    pub fn step(&mut self, bus: &mut impl Bus) -> Result<u64> {
        if self.halted {
            self.cycles += 1;
            return Ok(1);
        }

        if self.pending != 0 && !self.flags.contains(Flags::I) {
            return self.service_interrupt(bus);
        }

        let instr_bank = self.pc_bank;
        let instr_offset = self.pc_offset;

        let word = bus.read16(self.pc_bank, self.pc_offset);
        self.pc_offset = self.pc_offset.wrapping_add(2);

        let decoded = Decoded::split(word);
        let spent = self.execute(bus, decoded).map_err(|err| {
            if let CpuError::InvalidOpcode { .. } = err {
                CpuError::InvalidOpcode {
                    word,
                    bank: instr_bank,
                    offset: instr_offset,
                }
            } else {
                err
            }
        })?;

        self.cycles += spent;
        Ok(spent)
    }

    /// Dispatch one decoded instruction. Returns the cycle cost.
    fn execute(&mut self, bus: &mut impl Bus, d: Decoded) -> Result<u64> {
        match d.family {
            family::SYS => self.exec_sys(bus, d),
            family::MOV => self.exec_mov(bus, d),
            family::ADD | family::SUB | family::MUL | family::DIV => self.exec_arith(bus, d),
            family::AND | family::OR | family::XOR => self.exec_logic(bus, d),
            family::NOT => self.exec_not(d),
            family::SHL | family::SHR => self.exec_shift(bus, d),
            family::CMP => self.exec_cmp_branch(bus, d),
            family::JMP => self.exec_jmp(bus, d),
            family::CALL => self.exec_call(bus, d),
            family::RET => self.exec_ret(bus, d),
            _ => Err(CpuError::invalid(d)),
        }
    }

    /// Take the highest-priority pending interrupt.
    ///
    /// Pushes PBR, the return offset, and the flags byte (flags on top),
    /// masks further interrupts, and loads the PC from the vector table.
    /// The handler unwinds with `POPF` followed by `RET`.
    fn service_interrupt(&mut self, bus: &mut impl Bus) -> Result<u64> {
        let bit = self.pending.trailing_zeros() as u8;
        self.pending &= !(1 << bit);

        let vector = if bit == 0 { vectors::NMI } else { vectors::IRQ };

        self.push16(bus, u16::from(self.pbr))?;
        self.push16(bus, self.pc_offset)?;
        self.push16(bus, u16::from(self.flags.bits()))?;
        self.flags.insert(Flags::I);

        let offset = bus.read16(0, vector);
        let bank = bus.read8(0, vector.wrapping_add(2));
        self.pbr = bank;
        self.pc_bank = bank;
        self.pc_offset = offset;

        self.cycles += INTERRUPT_ENTRY_CYCLES;
        Ok(INTERRUPT_ENTRY_CYCLES)
    }

    /// Fetch the immediate word following the instruction word.
    pub(crate) fn fetch_imm(&mut self, bus: &mut impl Bus) -> u16 {
        let imm = bus.read16(self.pc_bank, self.pc_offset);
        self.pc_offset = self.pc_offset.wrapping_add(2);
        imm
    }

    /// Push a word onto the bank-0 stack.
    pub(crate) fn push16(&mut self, bus: &mut impl Bus, value: u16) -> Result<()> {
        let new_sp = self.sp.wrapping_sub(2);
        if new_sp < SP_FLOOR || new_sp >= self.sp {
            return Err(CpuError::StackOverflow { sp: self.sp });
        }
        bus.write16(0, new_sp, value);
        self.sp = new_sp;
        Ok(())
    }

    /// Pop a word from the bank-0 stack.
    pub(crate) fn pop16(&mut self, bus: &mut impl Bus) -> Result<u16> {
        if self.sp >= SP_RESET || self.sp < SP_FLOOR {
            return Err(CpuError::StackUnderflow { sp: self.sp });
        }
        let value = bus.read16(0, self.sp);
        self.sp = self.sp.wrapping_add(2);
        Ok(value)
    }

    /// Halt the CPU (clean program exit).
    pub(crate) fn halt(&mut self) {
        self.halted = true;
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
