//! CPU flags byte.
//!
//! The flags register is a single byte:
//!
//! ```text
//! 7  6  5  4  3  2  1  0
//! -  -  D  I  V  C  N  Z
//! │  │  │  │  │  │  │  └─ Zero
//! │  │  │  │  │  │  └──── Negative (bit 15 of the result)
//! │  │  │  │  │  └─────── Carry (unsigned carry/borrow)
//! │  │  │  │  └────────── Overflow (signed)
//! │  │  │  └───────────── Interrupt mask
//! │  │  └──────────────── Divide-by-zero
//! └──┴─────────────────── Unused (read as 0)
//! ```
//!
//! D is sticky only until the next flag-updating instruction: any
//! instruction that updates Z/N clears D, except DIV itself when the
//! divisor is zero.

use bitflags::bitflags;

bitflags! {
    /// CPU flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// Zero flag - set when the result of the last operation was zero.
        const Z = 1 << 0;

        /// Negative flag - set when bit 15 of the result is set.
        const N = 1 << 1;

        /// Carry flag - unsigned carry out of ADD, borrow into SUB/CMP,
        /// or the last bit shifted out of SHL/SHR.
        const C = 1 << 2;

        /// Overflow flag - set when the last ADD/SUB/CMP overflowed as a
        /// signed 16-bit operation.
        const V = 1 << 3;

        /// Interrupt mask - while set, pending interrupts are not serviced.
        const I = 1 << 4;

        /// Divide-by-zero flag - set by DIV with a zero divisor.
        const D = 1 << 5;
    }
}

impl Flags {
    /// Flags state after reset: interrupts masked, everything else clear.
    pub const RESET: Self = Self::I;

    /// Update Z and N from a 16-bit result. Clears D (the result came from
    /// a flag-updating instruction that was not a divide by zero).
    #[inline]
    pub fn set_zn(&mut self, value: u16) {
        self.set_flag(Self::Z, value == 0);
        self.set_flag(Self::N, value & 0x8000 != 0);
        self.remove(Self::D);
    }

    /// Set or clear a flag.
    #[inline]
    pub fn set_flag(&mut self, flag: Self, value: bool) {
        if value {
            *self |= flag;
        } else {
            *self &= !flag;
        }
    }
}
