//! Controller input handling.
//!
//! Two 12-button controllers with latch-then-read semantics:
//!
//! 1. The host injects raw button state out of band (`set_buttons`); the
//!    guest never sees the injection happen.
//! 2. The guest writes 1 to a controller's latch register to snapshot the
//!    state, reads the data register for the low byte and the latch
//!    register for the high byte, then writes 0 to release the latch.
//! 3. While the latch is released, reads return the live state.
//!
//! # Registers (bank 0)
//!
//! - **0xA000**: controller 1 data (low byte)
//! - **0xA001**: controller 1 latch (write) / high byte (read)
//! - **0xA002**: controller 2 data (low byte)
//! - **0xA003**: controller 2 latch (write) / high byte (read)

mod controller;

pub use controller::{Buttons, Controller};
