//! Property tests for ALU flag semantics.

use nitrodx_cpu::{Bus, Cpu, Flags};
use proptest::prelude::*;

struct FlatBus {
    memory: Vec<u8>,
}

impl FlatBus {
    fn new() -> Self {
        Self {
            memory: vec![0; 0x10000],
        }
    }

    fn load_words(&mut self, addr: u16, words: &[u16]) {
        for (i, &word) in words.iter().enumerate() {
            let at = addr as usize + i * 2;
            self.memory[at] = word as u8;
            self.memory[at + 1] = (word >> 8) as u8;
        }
    }
}

impl Bus for FlatBus {
    fn read8(&mut self, _bank: u8, offset: u16) -> u8 {
        self.memory[offset as usize]
    }

    fn write8(&mut self, _bank: u8, offset: u16, value: u8) {
        self.memory[offset as usize] = value;
    }
}

fn op(family: u8, mode: u8, reg1: u8, reg2: u8) -> u16 {
    (u16::from(family) << 12) | (u16::from(mode) << 8) | (u16::from(reg1) << 4) | u16::from(reg2)
}

/// Run `FAMILY R0, #b` with R0 preloaded to `a`; return the CPU afterwards.
fn run_binop(family: u8, a: u16, b: u16) -> Cpu {
    let mut bus = FlatBus::new();
    bus.load_words(0x0400, &[op(0x1, 1, 0, 0), a, op(family, 1, 0, 0), b]);
    let mut cpu = Cpu::new();
    cpu.reset(0, 0x0400);
    cpu.step(&mut bus).unwrap();
    cpu.step(&mut bus).unwrap();
    cpu
}

proptest! {
    #[test]
    fn prop_add_matches_wide_arithmetic(a: u16, b: u16) {
        let cpu = run_binop(0x2, a, b);
        let wide = u32::from(a) + u32::from(b);
        prop_assert_eq!(cpu.r[0], wide as u16);
        prop_assert_eq!(cpu.flags.contains(Flags::C), wide > 0xFFFF);
        prop_assert_eq!(cpu.flags.contains(Flags::Z), wide as u16 == 0);
        prop_assert_eq!(cpu.flags.contains(Flags::N), wide as u16 & 0x8000 != 0);
        let signed = i32::from(a as i16) + i32::from(b as i16);
        prop_assert_eq!(
            cpu.flags.contains(Flags::V),
            signed > i32::from(i16::MAX) || signed < i32::from(i16::MIN)
        );
    }

    #[test]
    fn prop_sub_matches_wide_arithmetic(a: u16, b: u16) {
        let cpu = run_binop(0x3, a, b);
        prop_assert_eq!(cpu.r[0], a.wrapping_sub(b));
        prop_assert_eq!(cpu.flags.contains(Flags::C), a < b);
        let signed = i32::from(a as i16) - i32::from(b as i16);
        prop_assert_eq!(
            cpu.flags.contains(Flags::V),
            signed > i32::from(i16::MAX) || signed < i32::from(i16::MIN)
        );
    }

    #[test]
    fn prop_mul_keeps_low_word(a: u16, b: u16) {
        let cpu = run_binop(0x4, a, b);
        prop_assert_eq!(cpu.r[0], a.wrapping_mul(b));
        prop_assert!(!cpu.flags.contains(Flags::D));
    }

    #[test]
    fn prop_div_never_faults(a: u16, b: u16) {
        let cpu = run_binop(0x5, a, b);
        if b == 0 {
            prop_assert_eq!(cpu.r[0], 0xFFFF);
            prop_assert!(cpu.flags.contains(Flags::D));
        } else {
            prop_assert_eq!(cpu.r[0], a / b);
            prop_assert!(!cpu.flags.contains(Flags::D));
        }
    }

    #[test]
    fn prop_cmp_is_sub_without_store(a: u16, b: u16) {
        let sub = run_binop(0x3, a, b);
        let cmp = run_binop(0xC, a, b);
        prop_assert_eq!(cmp.r[0], a, "CMP must not write the register");
        prop_assert_eq!(cmp.flags, sub.flags);
    }

    #[test]
    fn prop_push_pop_round_trip(value: u16) {
        let mut bus = FlatBus::new();
        bus.load_words(
            0x0400,
            &[op(0x1, 1, 0, 0), value, op(0x1, 4, 0, 0), op(0x1, 5, 1, 0)],
        );
        let mut cpu = Cpu::new();
        cpu.reset(0, 0x0400);
        for _ in 0..3 {
            cpu.step(&mut bus).unwrap();
        }
        prop_assert_eq!(cpu.r[1], value);
        prop_assert_eq!(cpu.sp, 0x1FFF);
    }

    #[test]
    fn prop_logic_ops_update_zn(a: u16, b: u16, sel in 0u8..3) {
        let family = [0x6, 0x7, 0x8][sel as usize];
        let expected = match family {
            0x6 => a & b,
            0x7 => a | b,
            _ => a ^ b,
        };
        let cpu = run_binop(family, a, b);
        prop_assert_eq!(cpu.r[0], expected);
        prop_assert_eq!(cpu.flags.contains(Flags::Z), expected == 0);
        prop_assert_eq!(cpu.flags.contains(Flags::N), expected & 0x8000 != 0);
    }
}
