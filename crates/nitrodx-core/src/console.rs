//! Console: the master-clock scheduler and the host-facing API.
//!
//! The console owns the CPU and the system bus and advances them on one
//! cycle timeline. Each scheduler step runs the CPU first (whole
//! instructions, until it catches up with the master counter), then the
//! PPU for the same number of dots, then the APU; a CPU write at cycle
//! `c` is therefore always visible to the PPU at `c + 1`. A frame is
//! exactly 127,820 master cycles in both scheduler modes.

use nitrodx_cpu::{Cpu, CpuError, Interrupt};
use nitrodx_ppu::{FRAME_HEIGHT, FRAME_WIDTH};
use nitrodx_rom::{Rom, RomError};
use ringbuf::{traits::Consumer, HeapCons};

use crate::bus::CoreBus;

/// Emulation timing constants.
pub mod timing {
    /// CPU clock frequency in Hz.
    pub const CPU_HZ: u32 = 7_669_200;
    /// Master cycles per frame (220 scanlines x 581 dots).
    pub const CYCLES_PER_FRAME: u64 = 127_820;
    /// Target frame rate.
    pub const FRAME_RATE: u32 = 60;
    /// Step size of the optimized scheduler mode.
    pub const CHUNK_CYCLES: u64 = 1000;
}

/// Console error type.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// ROM loading failed.
    #[error("ROM error: {0}")]
    Rom(#[from] RomError),

    /// The CPU hit a fatal condition; the frame was stopped.
    #[error("CPU fault: {0}")]
    Cpu(#[from] CpuError),

    /// The console previously faulted and needs a reset.
    #[error("console is halted after a fault; reset to continue")]
    Halted,
}

/// Scheduler granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepMode {
    /// One cycle per step: every cross-component interaction is exact.
    CycleAccurate,
    /// 1000-cycle chunks: the production mode.
    #[default]
    Chunked,
}

/// The Nitro-Core-DX console core.
pub struct Console {
    cpu: Cpu,
    bus: CoreBus,
    audio: HeapCons<i16>,
    mode: StepMode,
    master_cycles: u64,
    frames: u64,
    faulted: bool,
}

impl Console {
    /// Create a console from a ROM image and reset it.
    ///
    /// # Errors
    ///
    /// Returns an error if the ROM image fails validation.
    pub fn new(rom_bytes: &[u8]) -> Result<Self, CoreError> {
        let rom = Rom::load(rom_bytes)?;
        let (bus, audio) = CoreBus::new(rom);
        let mut console = Self {
            cpu: Cpu::new(),
            bus,
            audio,
            mode: StepMode::default(),
            master_cycles: 0,
            frames: 0,
            faulted: false,
        };
        console.reset();
        Ok(console)
    }

    /// Reset to the power-on state. The loaded ROM stays in place.
    pub fn reset(&mut self) {
        let entry_bank = self.bus.rom.header.entry_bank as u8;
        let entry_offset = self.bus.rom.header.entry_offset;
        self.bus.reset();
        self.cpu.reset(entry_bank, entry_offset);
        self.master_cycles = 0;
        self.frames = 0;
        self.faulted = false;
    }

    /// Run exactly one frame (127,820 master cycles).
    ///
    /// # Errors
    ///
    /// A fatal CPU condition (bad opcode, stack corruption) stops the
    /// frame and is returned; afterwards every call reports
    /// [`CoreError::Halted`] until [`Console::reset`].
    pub fn run_frame(&mut self) -> Result<(), CoreError> {
        if self.faulted {
            return Err(CoreError::Halted);
        }

        let frame_end = self.master_cycles + timing::CYCLES_PER_FRAME;
        while self.master_cycles < frame_end {
            let step = match self.mode {
                StepMode::CycleAccurate => 1,
                StepMode::Chunked => timing::CHUNK_CYCLES.min(frame_end - self.master_cycles),
            };
            self.step_cycles(step)?;
        }

        self.frames += 1;
        Ok(())
    }

    /// Advance every component by `cycles`: CPU, then PPU, then APU.
    fn step_cycles(&mut self, cycles: u64) -> Result<(), CoreError> {
        let target = self.master_cycles + cycles;

        if let Err(err) = self.cpu.run_until(&mut self.bus, target) {
            self.faulted = true;
            log::warn!("frame stopped: {err}");
            return Err(err.into());
        }

        self.bus.step_ppu(cycles);
        if self.bus.ppu.take_irq() {
            self.cpu.request_interrupt(Interrupt::VBlank);
        }
        self.bus.apu.advance(cycles);

        self.master_cycles = target;
        Ok(())
    }

    /// Select the scheduler granularity.
    pub fn set_step_mode(&mut self, mode: StepMode) {
        self.mode = mode;
    }

    /// Current scheduler granularity.
    #[must_use]
    pub fn step_mode(&self) -> StepMode {
        self.mode
    }

    /// Replace the raw button state of a controller (0 or 1).
    pub fn set_buttons(&mut self, controller: usize, buttons: u16) {
        self.bus.controllers[controller].set_buttons(buttons);
    }

    /// Raise an interrupt from the host side (debug / timer injection).
    pub fn raise_interrupt(&mut self, source: Interrupt) {
        self.cpu.request_interrupt(source);
    }

    /// Copy the completed frame as packed RGB888, row-major.
    #[must_use]
    pub fn copy_framebuffer(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FRAME_WIDTH * FRAME_HEIGHT * 3);
        for &pixel in self.bus.ppu.framebuffer() {
            let blue = (pixel & 0x1F) as u8;
            let green = ((pixel >> 5) & 0x1F) as u8;
            let red = ((pixel >> 10) & 0x1F) as u8;
            out.push(expand5(red));
            out.push(expand5(green));
            out.push(expand5(blue));
        }
        out
    }

    /// The completed frame in its native RGB555 form.
    #[must_use]
    pub fn framebuffer_rgb555(&self) -> &[u16] {
        self.bus.ppu.framebuffer()
    }

    /// Drain up to `max_samples` PCM samples (stereo interleaved) from
    /// the audio ring.
    pub fn drain_audio(&mut self, max_samples: usize) -> Vec<i16> {
        self.audio.pop_iter().take(max_samples).collect()
    }

    /// Perform a guest-visible I/O read (side effects included), for
    /// hosts and tests that poke the register surface directly.
    pub fn read_io(&mut self, offset: u16) -> u8 {
        nitrodx_cpu::Bus::read8(&mut self.bus, 0, offset)
    }

    /// Perform a guest-visible I/O write.
    pub fn write_io(&mut self, offset: u16, value: u8) {
        nitrodx_cpu::Bus::write8(&mut self.bus, 0, offset, value);
    }

    /// Inspect memory without side effects.
    #[must_use]
    pub fn peek(&self, bank: u8, offset: u16) -> u8 {
        self.bus.peek(bank, offset)
    }

    /// Total master cycles advanced.
    #[must_use]
    pub fn cycles(&self) -> u64 {
        self.master_cycles
    }

    /// Frames completed since reset.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// True when the guest program has exited or the console faulted.
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.faulted || self.cpu.is_halted()
    }

    /// CPU state, for inspection.
    #[must_use]
    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// The system bus, for inspection.
    #[must_use]
    pub fn bus(&self) -> &CoreBus {
        &self.bus
    }

    /// Mutable bus access, for harnesses that stage memory directly.
    pub fn bus_mut(&mut self) -> &mut CoreBus {
        &mut self.bus
    }
}

/// Expand a 5-bit channel to 8 bits.
#[inline]
fn expand5(channel: u8) -> u8 {
    (channel << 3) | (channel >> 2)
}
