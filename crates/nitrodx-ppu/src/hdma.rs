//! HDMA: per-scanline scroll updates driven by a WRAM table.
//!
//! The table lives in work RAM at the offset programmed through
//! HDMA_TABLE. Each visible scanline owns 16 bytes, 4 per layer:
//!
//! ```text
//! base + y*16 + layer*4:  scroll X lo, scroll X hi, scroll Y lo, scroll Y hi
//! ```
//!
//! Before a scanline is composited the PPU replaces the scroll of every
//! HDMA-enabled layer with that line's table entry. The PPU reaches WRAM
//! through [`TableRam`] so it never owns the memory itself; the system bus
//! hands it a view for the duration of the step.

/// Read access to the WRAM that holds the HDMA table.
pub trait TableRam {
    /// Read one byte at a WRAM offset.
    fn read8(&self, offset: u16) -> u8;
}

impl TableRam for [u8] {
    fn read8(&self, offset: u16) -> u8 {
        self.get(usize::from(offset)).copied().unwrap_or(0)
    }
}

/// Fetch the (scroll X, scroll Y) entry for a layer on a scanline.
pub(crate) fn entry(table: &(impl TableRam + ?Sized), base: u16, scanline: u16, layer: usize) -> (u16, u16) {
    let at = base
        .wrapping_add(scanline.wrapping_mul(16))
        .wrapping_add(layer as u16 * 4);
    let read16 = |offset: u16| {
        u16::from(table.read8(offset)) | (u16::from(table.read8(offset.wrapping_add(1))) << 8)
    };
    (read16(at), read16(at.wrapping_add(2)))
}
