//! Nitro-Core-DX PPU (Picture Processing Unit) emulation.
//!
//! The PPU produces one 320x200 frame per 127,820 CPU cycles from four
//! scrollable tile layers, a 2x2 affine "matrix mode" per layer, two
//! clipping windows, 128 blendable sprites, and per-scanline HDMA scroll
//! updates. It owns:
//!
//! - **VRAM** (64 KB): tile bitmaps and 64x64 tilemaps
//! - **CGRAM** (512 B): 256 RGB555 palette entries behind a two-access latch
//! - **OAM** (768 B): 128 six-byte sprite records behind an auto-advancing
//!   byte window
//!
//! # Timing
//!
//! One dot per CPU cycle, 581 dots per scanline, 220 scanlines per frame
//! (200 visible + 20 blanking). Entering scanline 200 raises the one-shot
//! VBlank flag and an IRQ request. All mid-step events are derived from
//! the PPU's own counters so that 1-cycle and chunked scheduling stay
//! equivalent.
//!
//! # Usage
//!
//! ```
//! use nitrodx_ppu::{Ppu, registers::offsets, CYCLES_PER_FRAME};
//!
//! let mut ppu = Ppu::new();
//! let wram = vec![0u8; 0x8000];
//!
//! ppu.write_register(offsets::DISPLAY_CTRL, 1);
//! ppu.advance(CYCLES_PER_FRAME, wram.as_slice());
//!
//! assert!(ppu.take_irq());
//! let frame = ppu.framebuffer(); // 320x200 RGB555
//! assert_eq!(frame.len(), 320 * 200);
//! ```

#![warn(missing_docs)]

mod background;
mod cgram;
mod hdma;
mod matrix;
mod oam;
mod ppu;
pub mod registers;
mod sprites;
mod timing;

pub use cgram::{Cgram, CGRAM_COLORS};
pub use hdma::TableRam;
pub use oam::{BlendMode, Oam, Sprite, SpriteAttributes, SpriteControl, OAM_SIZE, OAM_SPRITES};
pub use ppu::{Ppu, FRAME_HEIGHT, FRAME_SIZE, FRAME_WIDTH, VRAM_SIZE};
pub use registers::{BgControl, Hdma, Layer, Matrix, WindowCombine, WindowRect, Windows};
pub use timing::{
    Timing, CYCLES_PER_FRAME, DOTS_PER_SCANLINE, SCANLINES_PER_FRAME, VBLANK_START,
    VISIBLE_SCANLINES,
};
