//! PPU register surface: offsets and latched register state.
//!
//! All PPU registers live in the bank-0 I/O page at 0x8000-0x8FFF and are
//! 8 bits wide. 16-bit quantities (scroll positions, matrix terms, the
//! VRAM address) are split into low/high byte pairs.

use bitflags::bitflags;

/// Register offsets within bank 0.
pub mod offsets {
    /// BGk scroll X low byte at `BG_SCROLLX + k*2`.
    pub const BG_SCROLLX: u16 = 0x8000;
    /// BGk control byte at `BG_CONTROL + k`.
    pub const BG_CONTROL: u16 = 0x8008;
    /// BGk scroll Y low byte at `BG_SCROLLY + k*2`.
    pub const BG_SCROLLY: u16 = 0x800C;
    /// VRAM address, low byte.
    pub const VRAM_ADDR_L: u16 = 0x8014;
    /// VRAM address, high byte.
    pub const VRAM_ADDR_H: u16 = 0x8015;
    /// VRAM data window (auto-increment).
    pub const VRAM_DATA: u16 = 0x8016;
    /// CGRAM address.
    pub const CGRAM_ADDR: u16 = 0x8017;
    /// CGRAM data latch.
    pub const CGRAM_DATA: u16 = 0x8018;
    /// OAM sprite address.
    pub const OAM_ADDR: u16 = 0x8019;
    /// OAM data window.
    pub const OAM_DATA: u16 = 0x801A;
    /// Display control (bit 0 enables output).
    pub const DISPLAY_CTRL: u16 = 0x801B;
    /// Display mode latch.
    pub const DISPLAY_MODE: u16 = 0x801C;
    /// Matrix control.
    pub const MATRIX_CTRL: u16 = 0x8020;
    /// Matrix A term, low byte (B, C, D follow as byte pairs).
    pub const MATRIX_A_L: u16 = 0x8021;
    /// Matrix center X, low byte.
    pub const MATRIX_CX_L: u16 = 0x8029;
    /// Matrix center Y, low byte.
    pub const MATRIX_CY_L: u16 = 0x802B;
    /// Window 0 rectangle: left, right, top, bottom.
    pub const WIN0_LEFT: u16 = 0x8030;
    /// Window 1 rectangle: left, right, top, bottom.
    pub const WIN1_LEFT: u16 = 0x8034;
    /// Window combine logic.
    pub const WIN_CTRL: u16 = 0x8038;
    /// Per-layer window enable masks.
    pub const WIN_MAIN: u16 = 0x8039;
    /// HDMA per-layer enable bits.
    pub const HDMA_CTRL: u16 = 0x803A;
    /// HDMA table base (WRAM offset), low byte.
    pub const HDMA_TABLE_L: u16 = 0x803B;
    /// HDMA table base, high byte.
    pub const HDMA_TABLE_H: u16 = 0x803C;
    /// VBlank flag (one-shot: reading clears it).
    pub const VBLANK: u16 = 0x803E;
    /// Frame counter, low byte.
    pub const FRAME_L: u16 = 0x803F;
    /// Frame counter, high byte.
    pub const FRAME_H: u16 = 0x8040;
    /// Per-layer effective scroll snapshots, 4 bytes per layer.
    pub const SCROLL_SNAPSHOT: u16 = 0x8041;
}

bitflags! {
    /// Background layer control byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct BgControl: u8 {
        /// Layer participates in rendering.
        const ENABLE = 1 << 0;
        /// 16x16 tiles instead of 8x8.
        const TILE_16 = 1 << 1;
        /// Character data base, bits 2-3 (x 0x4000).
        const CHAR_BASE = 0b0000_1100;
        /// Tilemap base, bits 4-6 (x 0x0800).
        const MAP_BASE = 0b0111_0000;
        /// Latched but currently unassigned.
        const RESERVED = 0b1000_0000;
    }
}

impl BgControl {
    /// Tile edge length in pixels.
    #[inline]
    #[must_use]
    pub fn tile_size(self) -> u16 {
        if self.contains(Self::TILE_16) {
            16
        } else {
            8
        }
    }

    /// VRAM offset of the layer's character data.
    #[inline]
    #[must_use]
    pub fn char_base(self) -> usize {
        usize::from((self.bits() >> 2) & 0x3) * 0x4000
    }

    /// VRAM offset of the layer's tilemap.
    #[inline]
    #[must_use]
    pub fn map_base(self) -> usize {
        usize::from((self.bits() >> 4) & 0x7) * 0x0800
    }
}

/// Per-layer latched state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Layer {
    /// Scroll X (16-bit, written as a byte pair).
    pub scroll_x: u16,
    /// Scroll Y.
    pub scroll_y: u16,
    /// Control byte.
    pub control: BgControl,
}

/// Matrix (affine) registers. Terms are signed 8.8 fixed point.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matrix {
    /// Control: bits 0-3 per-layer enable, bit 4 mirror H, bit 5 mirror V.
    pub control: u8,
    /// Matrix term A.
    pub a: i16,
    /// Matrix term B.
    pub b: i16,
    /// Matrix term C.
    pub c: i16,
    /// Matrix term D.
    pub d: i16,
    /// Transform center X.
    pub center_x: i16,
    /// Transform center Y.
    pub center_y: i16,
}

impl Matrix {
    /// True when `layer` uses the matrix path.
    #[inline]
    #[must_use]
    pub fn enabled_for(&self, layer: usize) -> bool {
        self.control & (1 << layer) != 0
    }

    /// Mirrored repeat on the X axis.
    #[inline]
    #[must_use]
    pub fn mirror_h(&self) -> bool {
        self.control & (1 << 4) != 0
    }

    /// Mirrored repeat on the Y axis.
    #[inline]
    #[must_use]
    pub fn mirror_v(&self) -> bool {
        self.control & (1 << 5) != 0
    }
}

/// One window rectangle (inclusive edges).
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowRect {
    /// Left edge.
    pub left: u8,
    /// Right edge.
    pub right: u8,
    /// Top edge.
    pub top: u8,
    /// Bottom edge.
    pub bottom: u8,
}

impl WindowRect {
    /// True when the pixel lies inside the rectangle.
    ///
    /// The edges are 8-bit registers, so windows can only reach the first
    /// 256 columns of the 320-pixel line.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= u16::from(self.left)
            && x <= u16::from(self.right)
            && y >= u16::from(self.top)
            && y <= u16::from(self.bottom)
    }
}

/// Window combine logic (WIN_CTRL bits 0-1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowCombine {
    /// Inside either window.
    #[default]
    Or,
    /// Inside both windows.
    And,
    /// Inside exactly one window.
    Xor,
    /// Inside both or neither.
    Xnor,
}

impl WindowCombine {
    /// Decode from the control byte.
    #[must_use]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Or,
            1 => Self::And,
            2 => Self::Xor,
            _ => Self::Xnor,
        }
    }

    /// Combine the two window membership tests.
    #[inline]
    #[must_use]
    pub fn apply(self, w0: bool, w1: bool) -> bool {
        match self {
            Self::Or => w0 || w1,
            Self::And => w0 && w1,
            Self::Xor => w0 != w1,
            Self::Xnor => w0 == w1,
        }
    }
}

/// Latched window state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Windows {
    /// Window 0 rectangle.
    pub rect0: WindowRect,
    /// Window 1 rectangle.
    pub rect1: WindowRect,
    /// Raw WIN_CTRL byte.
    pub control: u8,
    /// WIN_MAIN byte: bits 0-3 layer in window 0, bits 4-7 in window 1.
    pub main: u8,
}

impl Windows {
    /// Combine logic currently selected.
    #[inline]
    #[must_use]
    pub fn combine(&self) -> WindowCombine {
        WindowCombine::from_bits(self.control)
    }

    /// Window selection for a layer: (uses window 0, uses window 1).
    #[inline]
    #[must_use]
    pub fn selection(&self, layer: usize) -> (bool, bool) {
        (
            self.main & (1 << layer) != 0,
            self.main & (1 << (layer + 4)) != 0,
        )
    }
}

/// Latched HDMA state.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hdma {
    /// Per-layer enable bits (0-3).
    pub control: u8,
    /// WRAM offset of the per-scanline table.
    pub table_base: u16,
}

impl Hdma {
    /// True when `layer` takes scroll values from the table.
    #[inline]
    #[must_use]
    pub fn enabled_for(&self, layer: usize) -> bool {
        self.control & (1 << layer) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bg_control_fields() {
        let ctrl = BgControl::from_bits_truncate(0b0101_0110);
        assert!(!ctrl.contains(BgControl::ENABLE));
        assert_eq!(ctrl.tile_size(), 16);
        assert_eq!(ctrl.char_base(), 0x4000);
        assert_eq!(ctrl.map_base(), 5 * 0x0800);
    }

    #[test]
    fn test_window_combine_logic() {
        assert!(WindowCombine::Or.apply(true, false));
        assert!(!WindowCombine::And.apply(true, false));
        assert!(WindowCombine::Xor.apply(true, false));
        assert!(WindowCombine::Xnor.apply(false, false));
    }

    #[test]
    fn test_window_rect_membership() {
        let rect = WindowRect {
            left: 10,
            right: 20,
            top: 5,
            bottom: 15,
        };
        assert!(rect.contains(10, 5));
        assert!(rect.contains(20, 15));
        assert!(!rect.contains(21, 10));
        assert!(!rect.contains(15, 16));
    }

    #[test]
    fn test_matrix_layer_bits() {
        let matrix = Matrix {
            control: 0b0001_0101,
            ..Matrix::default()
        };
        assert!(matrix.enabled_for(0));
        assert!(!matrix.enabled_for(1));
        assert!(matrix.enabled_for(2));
        assert!(matrix.mirror_h());
        assert!(!matrix.mirror_v());
    }
}
