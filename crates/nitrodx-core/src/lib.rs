//! Nitro-Core-DX emulation core.
//!
//! This crate integrates the CPU, PPU, APU, ROM container, and input into
//! a complete console behind one host-facing API.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Console                              │
//! │   master clock: 127,820 cycles/frame, CPU -> PPU -> APU     │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                      CoreBus                        │    │
//! │  │  ┌──────┐ ┌─────────┐ ┌─────┐ ┌─────┐ ┌─────────┐  │    │
//! │  │  │ WRAM │ │ext-WRAM │ │ PPU │ │ APU │ │  Input  │  │    │
//! │  │  │ 32KB │ │  128KB  │ │     │ │     │ │ 2 pads  │  │    │
//! │  │  └──────┘ └─────────┘ └─────┘ └─────┘ └─────────┘  │    │
//! │  │  ┌─────────────────┐ ┌─────────────┐               │    │
//! │  │  │ ROM (banks 1-125)│ │ IRQ vectors │               │    │
//! │  │  └─────────────────┘ └─────────────┘               │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                          ▲                                  │
//! │                     ┌────┴────┐                             │
//! │                     │   CPU   │                             │
//! │                     └─────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use nitrodx_core::Console;
//!
//! let rom = std::fs::read("game.ndx").expect("Failed to read ROM");
//! let mut console = Console::new(&rom).expect("Failed to create console");
//!
//! loop {
//!     console.set_buttons(0, 0x0011); // Up + A
//!     console.run_frame().expect("guest fault");
//!
//!     let _frame = console.copy_framebuffer(); // 320x200 RGB888
//!     let _audio = console.drain_audio(2048); // stereo i16 PCM
//! }
//! ```

#![warn(missing_docs)]

mod bus;
mod console;
pub mod input;

pub use bus::{CoreBus, EXT_WRAM_SIZE, VECTOR_BASE, WRAM_SIZE};
pub use console::{timing, Console, CoreError, StepMode};
pub use input::{Buttons, Controller};

// Re-export commonly used types from the component crates.
pub use nitrodx_apu::Apu;
pub use nitrodx_cpu::{Cpu, CpuError, Flags, Interrupt};
pub use nitrodx_ppu::Ppu;
pub use nitrodx_rom::{Rom, RomError, RomHeader};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Screen dimensions.
pub mod screen {
    /// Width in pixels.
    pub const WIDTH: u32 = 320;
    /// Height in pixels.
    pub const HEIGHT: u32 = 200;
    /// Pixels per frame.
    pub const PIXELS: u32 = WIDTH * HEIGHT;
    /// Bytes per RGB888 frame.
    pub const FRAMEBUFFER_SIZE: usize = (PIXELS * 3) as usize;
}
