//! Nitro-Core-DX APU (Audio Processing Unit) emulation.
//!
//! Four waveform channels (sine, square, saw, and LFSR noise on channel
//! 3) mixed into 44.1 kHz stereo PCM. Each channel carries a frequency,
//! volume, waveform selector, and a frame-granular duration counter with
//! stop and loop modes; a one-shot completion byte reports stop-mode
//! expiries to the guest.
//!
//! # Sample cadence
//!
//! The CPU clock is not an integer multiple of the sample rate, so the
//! APU keeps a fractional accumulator: every cycle adds the sample rate,
//! and a sample is emitted each time the accumulator passes the CPU
//! clock. 127,820 cycles therefore always emit exactly 735 sample pairs,
//! with zero drift over arbitrarily long runs.
//!
//! # Output
//!
//! Samples go into a single-producer single-consumer ring; [`Apu::new`]
//! returns the consumer half for the host's audio thread.
//!
//! # Example
//!
//! ```
//! use nitrodx_apu::{Apu, CYCLES_PER_FRAME};
//! use ringbuf::traits::Consumer;
//!
//! let (mut apu, mut audio) = Apu::new();
//!
//! // Channel 0: 440 Hz square, half volume, enabled.
//! apu.write_register(0, 0xB8);
//! apu.write_register(1, 0x01);
//! apu.write_register(2, 128);
//! apu.write_register(3, 0x03);
//!
//! apu.advance(CYCLES_PER_FRAME);
//! let frame: Vec<i16> = audio.pop_iter().collect();
//! assert_eq!(frame.len(), 735 * 2);
//! ```

#![warn(missing_docs)]

mod apu;
mod channel;
mod noise;
mod waveform;

pub use apu::{Apu, RING_CAPACITY};
pub use channel::Channel;
pub use noise::Lfsr;
pub use waveform::{Waveform, PHASE_PERIOD, SINE_TABLE};

/// CPU clock in Hz (127,820 cycles x 60 frames).
pub const CPU_HZ: u32 = 7_669_200;

/// Output sample rate in Hz.
pub const SAMPLE_RATE: u32 = 44_100;

/// CPU cycles per frame.
pub const CYCLES_PER_FRAME: u64 = 127_820;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_constants_agree() {
        assert_eq!(u64::from(CPU_HZ), CYCLES_PER_FRAME * 60);
        assert_eq!(SAMPLE_RATE % 60, 0, "whole samples per frame");
    }
}
