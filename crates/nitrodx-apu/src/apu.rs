//! APU top level: register dispatch, sample cadence, mixing, ring output.

use ringbuf::{
    traits::{Producer, Split},
    HeapCons, HeapProd, HeapRb,
};

use crate::channel::Channel;
use crate::{CPU_HZ, CYCLES_PER_FRAME, SAMPLE_RATE};

/// Default ring capacity in samples (stereo interleaved): about 0.19 s.
pub const RING_CAPACITY: usize = 16 * 1024;

/// Audio processing unit.
///
/// Owns the four channels and the producing half of the SPSC sample ring;
/// the consuming half is returned from [`Apu::new`] for the host's audio
/// thread. Sample cadence uses a fractional accumulator compared against
/// the CPU clock, so no drift accumulates over long runs, and per-frame
/// duration bookkeeping is derived from the APU's own cycle counter.
pub struct Apu {
    channels: [Channel; 4],
    master_volume: u8,
    completion: u8,
    /// Fractional sample accumulator: (cycles * SAMPLE_RATE) mod CPU_HZ.
    sample_acc: u32,
    /// Cycles into the current frame, for duration ticks.
    frame_acc: u64,
    producer: HeapProd<i16>,
    dropped: u64,
}

impl Apu {
    /// Create an APU and the consumer side of its sample ring.
    #[must_use]
    pub fn new() -> (Self, HeapCons<i16>) {
        Self::with_capacity(RING_CAPACITY)
    }

    /// Create an APU with a specific ring capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> (Self, HeapCons<i16>) {
        let (producer, consumer) = HeapRb::<i16>::new(capacity).split();
        let apu = Self {
            channels: [
                Channel::new(0),
                Channel::new(1),
                Channel::new(2),
                Channel::new(3),
            ],
            master_volume: 255,
            completion: 0,
            sample_acc: 0,
            frame_acc: 0,
            producer,
            dropped: 0,
        };
        (apu, consumer)
    }

    /// Reset all channel and cadence state. The ring keeps whatever the
    /// host has not yet drained.
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
        self.master_volume = 255;
        self.completion = 0;
        self.sample_acc = 0;
        self.frame_acc = 0;
        self.dropped = 0;
    }

    /// Read an APU register (bank 0, offsets 0x9000-0x91FF, passed
    /// relative to 0x9000). The completion byte is one-shot: reading it
    /// clears every bit.
    pub fn read_register(&mut self, offset: u16) -> u8 {
        match offset {
            0x0000..=0x001F => self.channels[usize::from(offset / 8)].read_register(offset % 8),
            0x0020 => self.master_volume,
            0x0021 => std::mem::take(&mut self.completion),
            _ => 0,
        }
    }

    /// Write an APU register (offset relative to 0x9000).
    pub fn write_register(&mut self, offset: u16, value: u8) {
        match offset {
            0x0000..=0x001F => {
                self.channels[usize::from(offset / 8)].write_register(offset % 8, value);
            }
            0x0020 => self.master_volume = value,
            0x0021 => {}
            _ => {}
        }
    }

    /// Advance the APU by `cycles` CPU cycles, emitting every sample that
    /// falls due and ticking durations at each frame boundary the span
    /// crosses, in cycle order.
    pub fn advance(&mut self, cycles: u64) {
        let mut remaining = cycles;
        while remaining > 0 {
            let to_frame = CYCLES_PER_FRAME - self.frame_acc;
            let step = remaining.min(to_frame);

            self.emit_due_samples(step);

            self.frame_acc += step;
            remaining -= step;
            if self.frame_acc == CYCLES_PER_FRAME {
                self.frame_acc = 0;
                self.tick_durations();
            }
        }
    }

    /// Advance the sample accumulator by `cycles` and emit due samples.
    fn emit_due_samples(&mut self, cycles: u64) {
        let mut acc = u64::from(self.sample_acc) + cycles * u64::from(SAMPLE_RATE);
        while acc >= u64::from(CPU_HZ) {
            acc -= u64::from(CPU_HZ);
            let sample = self.mix();
            // Stereo: same signal on both sides.
            for _ in 0..2 {
                if self.producer.try_push(sample).is_err() {
                    if self.dropped == 0 {
                        log::warn!("audio ring full, dropping samples");
                    }
                    self.dropped += 1;
                }
            }
        }
        self.sample_acc = acc as u32;
    }

    /// Mix one output sample across the enabled channels.
    fn mix(&mut self) -> i16 {
        let master = i32::from(self.master_volume);
        let mut sum = 0i32;
        for channel in &mut self.channels {
            // channel.sample() carries the channel volume; scale by the
            // master volume and normalize both factors.
            sum += channel.sample() * master / (255 * 255);
        }
        sum.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
    }

    /// Once-per-frame duration countdown.
    fn tick_durations(&mut self) {
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if channel.tick_frame() {
                self.completion |= 1 << index;
            }
        }
    }

    /// Completion byte without the read-clear side effect.
    #[must_use]
    pub fn peek_completion(&self) -> u8 {
        self.completion
    }

    /// Samples dropped because the ring was full.
    #[must_use]
    pub fn dropped_samples(&self) -> u64 {
        self.dropped
    }
}
