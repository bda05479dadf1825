//! RMCF ROM container support for Nitro-Core-DX.
//!
//! This crate parses the console's ROM file format and exposes the payload
//! through the LoROM bank mapping: banks 1..=125 each present 32 KB of ROM
//! at guest offsets 0x8000..=0xFFFF. Writes never reach ROM; reads outside
//! the payload return 0, matching the open-bus rule of the memory map.
//!
//! # Example
//!
//! ```no_run
//! use nitrodx_rom::Rom;
//!
//! let image = std::fs::read("game.ndx").expect("Failed to read ROM");
//! let rom = Rom::load(&image).expect("Failed to parse ROM");
//!
//! let entry = (rom.header.entry_bank as u8, rom.header.entry_offset);
//! let first_word = rom.read16(entry.0, entry.1);
//! ```

#![warn(missing_docs)]

mod rom;

pub use rom::{Rom, RomError, RomHeader};
