//! Main PPU implementation.
//!
//! The PPU owns VRAM, CGRAM, OAM, the full register surface, and a double
//! framebuffer of RGB555 pixels. It advances one dot per CPU cycle; a
//! scanline is composited when its last dot completes, so every register
//! write a guest makes during a line is visible in that line. Entering
//! scanline 200 sets the one-shot VBlank flag and latches an IRQ request
//! for the scheduler to collect.

use crate::background;
use crate::background::LINE_PIXELS;
use crate::cgram::Cgram;
use crate::hdma::{self, TableRam};
use crate::matrix;
use crate::oam::Oam;
use crate::registers::{offsets, BgControl, Hdma, Layer, Matrix, Windows};
use crate::sprites;
use crate::timing::{Timing, DOTS_PER_SCANLINE, SCANLINES_PER_FRAME, VBLANK_START, VISIBLE_SCANLINES};

/// Framebuffer width in pixels.
pub const FRAME_WIDTH: usize = 320;

/// Framebuffer height in pixels.
pub const FRAME_HEIGHT: usize = 200;

/// Pixels per framebuffer.
pub const FRAME_SIZE: usize = FRAME_WIDTH * FRAME_HEIGHT;

/// VRAM size in bytes.
pub const VRAM_SIZE: usize = 0x10000;

/// Picture processing unit.
pub struct Ppu {
    // Memory
    vram: Vec<u8>,
    cgram: Cgram,
    oam: Oam,

    // Latched registers
    layers: [Layer; 4],
    matrix: Matrix,
    windows: Windows,
    hdma: Hdma,
    vram_addr: u16,
    display_ctrl: u8,
    display_mode: u8,

    // Timing and status
    timing: Timing,
    frame_counter: u16,
    vblank_flag: bool,
    irq_pending: bool,
    frame_complete: bool,

    // Effective per-layer scroll for the line being drawn (HDMA applied).
    eff_scroll: [(u16, u16); 4],

    // Double framebuffer: the host reads `front` while `back` is drawn.
    front: Vec<u16>,
    back: Vec<u16>,
}

impl Ppu {
    /// Create a PPU in the power-on state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vram: vec![0; VRAM_SIZE],
            cgram: Cgram::new(),
            oam: Oam::new(),
            layers: [Layer::default(); 4],
            matrix: Matrix::default(),
            windows: Windows::default(),
            hdma: Hdma::default(),
            vram_addr: 0,
            display_ctrl: 0,
            display_mode: 0,
            timing: Timing::new(),
            frame_counter: 0,
            vblank_flag: false,
            irq_pending: false,
            frame_complete: false,
            eff_scroll: [(0, 0); 4],
            front: vec![0; FRAME_SIZE],
            back: vec![0; FRAME_SIZE],
        }
    }

    /// Reset to the power-on state, keeping the allocated buffers.
    pub fn reset(&mut self) {
        self.vram.fill(0);
        self.cgram.reset();
        self.oam.reset();
        self.layers = [Layer::default(); 4];
        self.matrix = Matrix::default();
        self.windows = Windows::default();
        self.hdma = Hdma::default();
        self.vram_addr = 0;
        self.display_ctrl = 0;
        self.display_mode = 0;
        self.timing = Timing::new();
        self.frame_counter = 0;
        self.vblank_flag = false;
        self.irq_pending = false;
        self.frame_complete = false;
        self.eff_scroll = [(0, 0); 4];
        self.front.fill(0);
        self.back.fill(0);
    }

    /// Read a PPU register (bank 0, offsets 0x8000-0x8FFF).
    ///
    /// Reads of the VBlank flag clear it; data-window reads advance their
    /// latches. Unmapped offsets read 0.
    pub fn read_register(&mut self, offset: u16) -> u8 {
        match offset {
            o if (offsets::BG_SCROLLX..offsets::BG_SCROLLX + 8).contains(&o) => {
                let k = usize::from((o - offsets::BG_SCROLLX) / 2);
                byte_of(self.layers[k].scroll_x, (o - offsets::BG_SCROLLX) & 1)
            }
            o if (offsets::BG_CONTROL..offsets::BG_CONTROL + 4).contains(&o) => {
                self.layers[usize::from(o - offsets::BG_CONTROL)].control.bits()
            }
            o if (offsets::BG_SCROLLY..offsets::BG_SCROLLY + 8).contains(&o) => {
                let k = usize::from((o - offsets::BG_SCROLLY) / 2);
                byte_of(self.layers[k].scroll_y, (o - offsets::BG_SCROLLY) & 1)
            }
            offsets::VRAM_ADDR_L => self.vram_addr as u8,
            offsets::VRAM_ADDR_H => (self.vram_addr >> 8) as u8,
            offsets::VRAM_DATA => {
                let value = self.vram[usize::from(self.vram_addr)];
                self.vram_addr = self.vram_addr.wrapping_add(1);
                value
            }
            offsets::CGRAM_ADDR => self.cgram.addr(),
            offsets::CGRAM_DATA => self.cgram.read_data(),
            offsets::OAM_ADDR => self.oam.addr(),
            offsets::OAM_DATA => self.oam.read_data(),
            offsets::DISPLAY_CTRL => self.display_ctrl,
            offsets::DISPLAY_MODE => self.display_mode,
            offsets::MATRIX_CTRL => self.matrix.control,
            o if (offsets::MATRIX_A_L..offsets::MATRIX_A_L + 8).contains(&o) => {
                let index = usize::from((o - offsets::MATRIX_A_L) / 2);
                let term = [self.matrix.a, self.matrix.b, self.matrix.c, self.matrix.d][index];
                byte_of(term as u16, (o - offsets::MATRIX_A_L) & 1)
            }
            o if (offsets::MATRIX_CX_L..offsets::MATRIX_CX_L + 2).contains(&o) => {
                byte_of(self.matrix.center_x as u16, (o - offsets::MATRIX_CX_L) & 1)
            }
            o if (offsets::MATRIX_CY_L..offsets::MATRIX_CY_L + 2).contains(&o) => {
                byte_of(self.matrix.center_y as u16, (o - offsets::MATRIX_CY_L) & 1)
            }
            o if (offsets::WIN0_LEFT..offsets::WIN0_LEFT + 4).contains(&o) => {
                let r = &self.windows.rect0;
                [r.left, r.right, r.top, r.bottom][usize::from(o - offsets::WIN0_LEFT)]
            }
            o if (offsets::WIN1_LEFT..offsets::WIN1_LEFT + 4).contains(&o) => {
                let r = &self.windows.rect1;
                [r.left, r.right, r.top, r.bottom][usize::from(o - offsets::WIN1_LEFT)]
            }
            offsets::WIN_CTRL => self.windows.control,
            offsets::WIN_MAIN => self.windows.main,
            offsets::HDMA_CTRL => self.hdma.control,
            offsets::HDMA_TABLE_L => self.hdma.table_base as u8,
            offsets::HDMA_TABLE_H => (self.hdma.table_base >> 8) as u8,
            offsets::VBLANK => {
                let value = u8::from(self.vblank_flag);
                self.vblank_flag = false;
                value
            }
            offsets::FRAME_L => self.frame_counter as u8,
            offsets::FRAME_H => (self.frame_counter >> 8) as u8,
            o if (offsets::SCROLL_SNAPSHOT..offsets::SCROLL_SNAPSHOT + 16).contains(&o) => {
                let rel = o - offsets::SCROLL_SNAPSHOT;
                let (sx, sy) = self.eff_scroll[usize::from(rel / 4)];
                match rel & 3 {
                    0 => sx as u8,
                    1 => (sx >> 8) as u8,
                    2 => sy as u8,
                    _ => (sy >> 8) as u8,
                }
            }
            _ => 0,
        }
    }

    /// Write a PPU register. Unmapped offsets are dropped silently.
    pub fn write_register(&mut self, offset: u16, value: u8) {
        match offset {
            o if (offsets::BG_SCROLLX..offsets::BG_SCROLLX + 8).contains(&o) => {
                let k = usize::from((o - offsets::BG_SCROLLX) / 2);
                let s = &mut self.layers[k].scroll_x;
                *s = merge_byte(*s, (o - offsets::BG_SCROLLX) & 1, value);
            }
            o if (offsets::BG_CONTROL..offsets::BG_CONTROL + 4).contains(&o) => {
                self.layers[usize::from(o - offsets::BG_CONTROL)].control =
                    BgControl::from_bits_truncate(value);
            }
            o if (offsets::BG_SCROLLY..offsets::BG_SCROLLY + 8).contains(&o) => {
                let k = usize::from((o - offsets::BG_SCROLLY) / 2);
                let s = &mut self.layers[k].scroll_y;
                *s = merge_byte(*s, (o - offsets::BG_SCROLLY) & 1, value);
            }
            offsets::VRAM_ADDR_L => {
                self.vram_addr = (self.vram_addr & 0xFF00) | u16::from(value);
            }
            offsets::VRAM_ADDR_H => {
                self.vram_addr = (self.vram_addr & 0x00FF) | (u16::from(value) << 8);
            }
            offsets::VRAM_DATA => {
                self.vram[usize::from(self.vram_addr)] = value;
                self.vram_addr = self.vram_addr.wrapping_add(1);
            }
            offsets::CGRAM_ADDR => self.cgram.set_addr(value),
            offsets::CGRAM_DATA => self.cgram.write_data(value),
            offsets::OAM_ADDR => self.oam.set_addr(value),
            offsets::OAM_DATA => {
                // OAM is only writable during the vertical blank.
                if self.timing.in_vblank() {
                    self.oam.write_data(value);
                } else {
                    log::trace!(
                        "OAM write 0x{value:02X} dropped at scanline {}",
                        self.timing.scanline
                    );
                }
            }
            offsets::DISPLAY_CTRL => self.display_ctrl = value,
            offsets::DISPLAY_MODE => self.display_mode = value,
            offsets::MATRIX_CTRL => self.matrix.control = value,
            o if (offsets::MATRIX_A_L..offsets::MATRIX_A_L + 8).contains(&o) => {
                let index = usize::from((o - offsets::MATRIX_A_L) / 2);
                let term = [
                    &mut self.matrix.a,
                    &mut self.matrix.b,
                    &mut self.matrix.c,
                    &mut self.matrix.d,
                ];
                let merged = merge_byte(*term[index] as u16, (o - offsets::MATRIX_A_L) & 1, value);
                *term[index] = merged as i16;
            }
            o if (offsets::MATRIX_CX_L..offsets::MATRIX_CX_L + 2).contains(&o) => {
                self.matrix.center_x =
                    merge_byte(self.matrix.center_x as u16, (o - offsets::MATRIX_CX_L) & 1, value)
                        as i16;
            }
            o if (offsets::MATRIX_CY_L..offsets::MATRIX_CY_L + 2).contains(&o) => {
                self.matrix.center_y =
                    merge_byte(self.matrix.center_y as u16, (o - offsets::MATRIX_CY_L) & 1, value)
                        as i16;
            }
            o if (offsets::WIN0_LEFT..offsets::WIN0_LEFT + 4).contains(&o) => {
                let r = &mut self.windows.rect0;
                *[&mut r.left, &mut r.right, &mut r.top, &mut r.bottom]
                    [usize::from(o - offsets::WIN0_LEFT)] = value;
            }
            o if (offsets::WIN1_LEFT..offsets::WIN1_LEFT + 4).contains(&o) => {
                let r = &mut self.windows.rect1;
                *[&mut r.left, &mut r.right, &mut r.top, &mut r.bottom]
                    [usize::from(o - offsets::WIN1_LEFT)] = value;
            }
            offsets::WIN_CTRL => self.windows.control = value,
            offsets::WIN_MAIN => self.windows.main = value,
            offsets::HDMA_CTRL => self.hdma.control = value & 0x0F,
            offsets::HDMA_TABLE_L => {
                self.hdma.table_base = (self.hdma.table_base & 0xFF00) | u16::from(value);
            }
            offsets::HDMA_TABLE_H => {
                self.hdma.table_base = (self.hdma.table_base & 0x00FF) | (u16::from(value) << 8);
            }
            _ => {}
        }
    }

    /// Advance the PPU by `dots` cycles.
    ///
    /// `wram` is the work-RAM view used for HDMA table fetches. Mid-step
    /// events (scanline completion, VBlank entry, frame wrap) are detected
    /// here from the dot counter, never by the caller, so the step size
    /// does not influence behavior.
    pub fn advance(&mut self, dots: u64, wram: &(impl TableRam + ?Sized)) {
        let mut remaining = dots;
        while remaining > 0 {
            let left_in_line = u64::from(DOTS_PER_SCANLINE - self.timing.dot);
            let step = remaining.min(left_in_line);
            self.timing.dot += step as u16;
            remaining -= step;

            if self.timing.dot < DOTS_PER_SCANLINE {
                continue;
            }

            // A scanline just completed.
            let line = self.timing.scanline;
            if line < VISIBLE_SCANLINES {
                self.render_scanline(line, wram);
            }

            self.timing.dot = 0;
            self.timing.scanline += 1;

            if self.timing.scanline == VBLANK_START {
                self.vblank_flag = true;
                self.irq_pending = true;
            }

            if self.timing.scanline == SCANLINES_PER_FRAME {
                self.timing.scanline = 0;
                self.frame_counter = self.frame_counter.wrapping_add(1);
                self.frame_complete = true;
                std::mem::swap(&mut self.front, &mut self.back);
            }
        }
    }

    /// Compose one scanline into the back buffer.
    fn render_scanline(&mut self, y: u16, wram: &(impl TableRam + ?Sized)) {
        // Latch this line's effective scrolls (HDMA overrides base scroll).
        for k in 0..4 {
            self.eff_scroll[k] = if self.hdma.enabled_for(k) {
                hdma::entry(wram, self.hdma.table_base, y, k)
            } else {
                (self.layers[k].scroll_x, self.layers[k].scroll_y)
            };
        }

        let display_on = self.display_ctrl & 0x01 != 0;
        let mut line = [0u8; LINE_PIXELS];

        if display_on {
            // Back to front: BG3 under BG2 under BG1 under BG0.
            for k in (0..4).rev() {
                if !self.layers[k].control.contains(BgControl::ENABLE) {
                    continue;
                }
                let mask = self.window_mask(k, y);
                if self.matrix.enabled_for(k) {
                    matrix::render_line(
                        &self.vram,
                        &self.layers[k],
                        &self.matrix,
                        y,
                        mask.as_ref(),
                        &mut line,
                    );
                } else {
                    background::render_line(
                        &self.vram,
                        &self.layers[k],
                        self.eff_scroll[k],
                        y,
                        mask.as_ref(),
                        &mut line,
                    );
                }
            }
        }

        // Resolve palette indices to RGB555.
        let row = &mut self.back[usize::from(y) * FRAME_WIDTH..(usize::from(y) + 1) * FRAME_WIDTH];
        for (out, &index) in row.iter_mut().zip(line.iter()) {
            *out = self.cgram.color(index);
        }

        if display_on {
            let sprite_base = usize::from(self.display_mode & 0x03) * 0x4000;
            sprites::render_line(&self.oam, &self.vram, &self.cgram, row, y, sprite_base);
        }
    }

    /// Per-pixel window mask for a layer line, or `None` when the layer is
    /// not windowed. `true` means the pixel is masked out.
    fn window_mask(&self, layer: usize, y: u16) -> Option<[bool; LINE_PIXELS]> {
        let (use0, use1) = self.windows.selection(layer);
        if !use0 && !use1 {
            return None;
        }

        let combine = self.windows.combine();
        let mut mask = [false; LINE_PIXELS];
        for (x, slot) in mask.iter_mut().enumerate() {
            let w0 = use0 && self.windows.rect0.contains(x as u16, y);
            let w1 = use1 && self.windows.rect1.contains(x as u16, y);
            *slot = if use0 && use1 {
                combine.apply(w0, w1)
            } else {
                w0 || w1
            };
        }
        Some(mask)
    }

    /// Take the pending IRQ request, if any (one-shot).
    pub fn take_irq(&mut self) -> bool {
        std::mem::take(&mut self.irq_pending)
    }

    /// Take the frame-complete signal, if any (one-shot).
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }

    /// The completed frame, RGB555 (BGR channel order, blue in the low bits).
    #[must_use]
    pub fn framebuffer(&self) -> &[u16] {
        &self.front
    }

    /// Current frame counter value.
    #[must_use]
    pub fn frame_counter(&self) -> u16 {
        self.frame_counter
    }

    /// Current beam position.
    #[must_use]
    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// Direct VRAM access for debug inspection.
    #[must_use]
    pub fn vram(&self) -> &[u8] {
        &self.vram
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

/// Select the low (0) or high (1) byte of a word.
#[inline]
fn byte_of(word: u16, half: u16) -> u8 {
    if half == 0 {
        word as u8
    } else {
        (word >> 8) as u8
    }
}

/// Replace the low (0) or high (1) byte of a word.
#[inline]
fn merge_byte(word: u16, half: u16, value: u8) -> u16 {
    if half == 0 {
        (word & 0xFF00) | u16::from(value)
    } else {
        (word & 0x00FF) | (u16::from(value) << 8)
    }
}
