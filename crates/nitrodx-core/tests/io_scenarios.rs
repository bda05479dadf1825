//! End-to-end guest scenarios: small ROMs staged in-test that exercise
//! the register surface the way real guest programs do.

mod common;

use common::{family, Asm};
use nitrodx_core::{Console, StepMode};

#[test]
fn test_ppu_register_write_and_vblank_one_shot() {
    // MOV R0,#0xAA; MOV R1,#0x8008; MOV [R1],R0; RET
    let mut asm = Asm::new();
    asm.mov_imm(0, 0x00AA).mov_imm(1, 0x8008).store(1, 0).ret();
    let mut console = Console::new(&asm.build_rom()).unwrap();

    console.run_frame().unwrap();

    assert_eq!(console.read_io(0x8008), 0xAA, "BG0 control latched the write");
    assert_eq!(console.read_io(0x803E), 1, "VBlank flag set after the frame");
    assert_eq!(console.read_io(0x803E), 0, "and cleared by the first read");
}

#[test]
fn test_sixteen_bit_store_to_io_is_narrowed() {
    // The high byte of R0 must never reach the 8-bit register.
    let mut asm = Asm::new();
    asm.mov_imm(0, 0x11AA).mov_imm(1, 0x8008).store(1, 0).ret();
    let mut console = Console::new(&asm.build_rom()).unwrap();

    console.run_frame().unwrap();

    assert_eq!(console.read_io(0x8008), 0xAA);
    assert_eq!(console.read_io(0x8009), 0, "neighboring register untouched");
}

#[test]
fn test_cgram_latch_pairing() {
    // Write one color (blue), rewind the address, read it back in two
    // accesses through the same latch.
    let mut asm = Asm::new();
    asm.write_reg(0x8017, 0)
        .write_reg(0x8018, 0x1F)
        .write_reg(0x8018, 0x00)
        .write_reg(0x8017, 0)
        .mov_imm(1, 0x8018)
        .load(2, 1)
        .load(3, 1)
        .ret();
    let mut console = Console::new(&asm.build_rom()).unwrap();

    console.run_frame().unwrap();

    assert_eq!(console.cpu().r[2], 0x1F);
    assert_eq!(console.cpu().r[3], 0x00);
}

#[test]
fn test_channel_duration_expiry_sets_completion_once() {
    // Channel 0: 440 Hz square, volume 128, 60 frames, stop mode.
    let mut asm = Asm::new();
    asm.write_reg(0x9000, 0xB8)
        .write_reg(0x9001, 0x01)
        .write_reg(0x9002, 128)
        .write_reg(0x9004, 60)
        .write_reg(0x9005, 0)
        .write_reg(0x9006, 0)
        .write_reg(0x9003, 0x03)
        .ret();
    let mut console = Console::new(&asm.build_rom()).unwrap();

    for frame in 0..60 {
        console.run_frame().unwrap();
        if frame < 59 {
            assert_eq!(
                console.read_io(0x9021),
                0,
                "no completion before frame 60"
            );
        }
    }

    assert_eq!(console.read_io(0x9021), 0x01, "completion bit after expiry");
    assert_eq!(console.read_io(0x9021), 0x00, "completion byte is one-shot");
    assert_eq!(console.read_io(0x9003) & 0x01, 0, "channel self-disabled");
}

#[test]
fn test_divide_by_zero_flag_lifecycle() {
    // DIV R0,R1 with R1 == 0, capturing the flags byte before and after
    // the next flag-setting instruction.
    let mut asm = Asm::new();
    asm.mov_imm(0, 0x1234).mov_imm(1, 0);
    asm.op(family::DIV, 0, 0, 1);
    asm.pushf().pop(3);
    asm.op(family::ADD, 1, 2, 0).word(1);
    asm.pushf().pop(4);
    asm.ret();
    let mut console = Console::new(&asm.build_rom()).unwrap();

    console.run_frame().unwrap();

    assert_eq!(console.cpu().r[0], 0xFFFF);
    assert_ne!(console.cpu().r[3] & 0x20, 0, "D set right after DIV");
    assert_eq!(console.cpu().r[4] & 0x20, 0, "D cleared by the next ADD");
}

#[test]
fn test_stack_round_trip_restores_registers() {
    let mut asm = Asm::new();
    for i in 0..8 {
        asm.mov_imm(i, 0x1100 + u16::from(i));
    }
    for i in 0..8 {
        asm.push(i);
    }
    for i in 0..8 {
        asm.mov_imm(i, 0);
    }
    for i in (0..8).rev() {
        asm.pop(i);
    }
    asm.ret();
    let mut console = Console::new(&asm.build_rom()).unwrap();

    console.run_frame().unwrap();

    for i in 0..8u16 {
        assert_eq!(console.cpu().r[i as usize], 0x1100 + i);
    }
    assert_eq!(console.cpu().sp, 0x1FFF, "stack back at its reset level");
}

#[test]
fn test_controller_latch_protocol() {
    let mut asm = Asm::new();
    asm.ret();
    let mut console = Console::new(&asm.build_rom()).unwrap();

    console.set_buttons(0, 0x0005); // Up + Left
    console.write_io(0xA001, 1);
    assert_eq!(console.read_io(0xA000), 0x05);
    assert_eq!(console.read_io(0xA001), 0x00);

    console.write_io(0xA001, 0);
    console.set_buttons(0, 0x0008); // Right
    assert_eq!(console.read_io(0xA000), 0x08);
}

#[test]
fn test_latched_snapshot_ignores_button_changes() {
    let mut asm = Asm::new();
    asm.ret();
    let mut console = Console::new(&asm.build_rom()).unwrap();

    console.set_buttons(1, 0x0C00); // Start + Select
    console.write_io(0xA003, 1);
    console.set_buttons(1, 0x0000);
    assert_eq!(console.read_io(0xA002), 0x00);
    assert_eq!(console.read_io(0xA003), 0x0C);
}

#[test]
fn test_oam_byte_index_protocol() {
    let mut asm = Asm::new();
    asm.ret();
    let mut console = Console::new(&asm.build_rom()).unwrap();

    // Park the PPU inside the vertical blank so OAM writes stick.
    console.bus_mut().step_ppu(200 * 581 + 10);

    console.write_io(0x8019, 2);
    for v in 1..=6u8 {
        console.write_io(0x801A, v);
    }
    console.write_io(0x801A, 0x77); // seventh write: sprite 3, byte 0

    console.write_io(0x8019, 2);
    for expected in 1..=6u8 {
        assert_eq!(console.read_io(0x801A), expected);
    }
    assert_eq!(console.read_io(0x801A), 0x77);
}

#[test]
fn test_vblank_interrupt_reaches_guest_handler() {
    for mode in [StepMode::CycleAccurate, StepMode::Chunked] {
        // Two-pass assembly: the vector block needs the handler's offset.
        let assemble = |handler: u16, spin: u16| {
            let mut asm = Asm::new();
            // Install the IRQ vector: offset lo/hi, bank.
            asm.write_reg(0xFFE0, handler as u8)
                .write_reg(0xFFE1, (handler >> 8) as u8)
                .write_reg(0xFFE2, 1);
            // Unmask interrupts: POPF a zero flags word. R7 is the
            // handler's counter; clear the value write_reg left in it.
            asm.mov_imm(0, 0).push(0).popf().mov_imm(7, 0);
            let spin_at = asm.here();
            asm.jmp(spin);
            let handler_at = asm.here();
            // Handler: count the interrupt, restore flags, return.
            asm.op(family::ADD, 1, 7, 0).word(1);
            asm.popf().ret();
            (asm, spin_at, handler_at)
        };

        let (_, spin_at, handler_at) = assemble(0, 0);
        let (asm, spin_check, handler_check) = assemble(handler_at, spin_at);
        assert_eq!((spin_check, handler_check), (spin_at, handler_at));

        let mut console = Console::new(&asm.build_rom()).unwrap();
        console.set_step_mode(mode);
        for _ in 0..3 {
            console.run_frame().unwrap();
        }
        assert_eq!(
            console.cpu().r[7],
            3,
            "one serviced VBlank IRQ per frame in {mode:?}"
        );
    }
}
