//! Sprite evaluation and compositing.
//!
//! Sprites composite after the background layers have been resolved to
//! RGB555, back to front: priority 0 first, priority 3 last, and within a
//! priority level higher indices first so the lowest index wins. Pixels
//! with color index 0 are transparent; the rest apply the sprite's blend
//! mode against the line that is already in the framebuffer row.

use crate::background::{tile_pixel, LINE_PIXELS};
use crate::cgram::Cgram;
use crate::oam::{BlendMode, Oam, Sprite, SpriteAttributes, OAM_SPRITES};

/// Blend one RGB555 source pixel over a destination pixel.
///
/// The channel layout is BGR555: blue in bits 0-4, green in 5-9, red in
/// 10-14. `alpha` is the sprite's 4-bit alpha value.
#[inline]
pub(crate) fn blend(dst: u16, src: u16, mode: BlendMode, alpha: u8) -> u16 {
    if matches!(mode, BlendMode::Normal) {
        return src;
    }

    let alpha = i32::from(alpha & 0x0F);
    let mut out = 0u16;
    for shift in [0u16, 5, 10] {
        let d = i32::from((dst >> shift) & 0x1F);
        let s = i32::from((src >> shift) & 0x1F);
        let channel = match mode {
            BlendMode::Alpha => (s * alpha + d * (15 - alpha)) / 15,
            BlendMode::Additive => (d + s * alpha / 15).min(31),
            BlendMode::Subtractive => (d - s * alpha / 15).max(0),
            BlendMode::Normal => unreachable!(),
        };
        out |= (channel as u16) << shift;
    }
    out
}

/// Composite all sprites intersecting `y` into a resolved framebuffer row.
pub(crate) fn render_line(
    oam: &Oam,
    vram: &[u8],
    cgram: &Cgram,
    row: &mut [u16],
    y: u16,
    char_base: usize,
) {
    // Gather and order the candidates for this line.
    let mut candidates: Vec<(usize, Sprite)> = (0..OAM_SPRITES)
        .filter(|&i| oam.is_enabled(i))
        .map(|i| (i, oam.sprite(i)))
        .filter(|(_, s)| s.on_scanline(y))
        .collect();
    candidates.sort_by(|a, b| a.1.priority.cmp(&b.1.priority).then(b.0.cmp(&a.0)));

    for (_, sprite) in candidates {
        let py = y - u16::from(sprite.y);
        let flip_x = sprite.attr.contains(SpriteAttributes::FLIP_X);
        let flip_y = sprite.attr.contains(SpriteAttributes::FLIP_Y);

        for px in 0..sprite.size {
            let x = sprite.x + i32::from(px);
            if !(0..LINE_PIXELS as i32).contains(&x) {
                continue;
            }

            let color = tile_pixel(
                vram,
                char_base,
                sprite.tile,
                sprite.size,
                px,
                py,
                flip_x,
                flip_y,
            );
            if color == 0 {
                continue;
            }

            let src = cgram.color((sprite.palette() << 4) | color);
            let at = x as usize;
            row[at] = blend(row[at], src, sprite.blend, sprite.alpha);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oam_with_sprite(index: usize, bytes: [u8; 6]) -> Oam {
        let mut oam = Oam::new();
        oam.set_addr(index as u8);
        for b in bytes {
            oam.write_data(b);
        }
        oam
    }

    fn test_vram() -> Vec<u8> {
        let mut vram = vec![0u8; 0x10000];
        // Tile 1: all pixels of row 0 set to color 1.
        for i in 0..4 {
            vram[32 + i] = 0x11;
        }
        vram
    }

    fn test_cgram() -> Cgram {
        let mut cgram = Cgram::new();
        // Palette 0 color 1 = full blue; palette 1 color 1 = full red.
        cgram.set_addr(1);
        cgram.write_data(0x1F);
        cgram.write_data(0x00);
        cgram.set_addr(17);
        cgram.write_data(0x00);
        cgram.write_data(0x7C);
        cgram
    }

    #[test]
    fn test_opaque_sprite_pixel() {
        let oam = oam_with_sprite(0, [4, 0, 1, 0, 0, 0x01]);
        let mut row = [0u16; LINE_PIXELS];
        render_line(&oam, &test_vram(), &test_cgram(), &mut row, 0, 0);
        assert_eq!(row[4], 0x001F);
        assert_eq!(row[3], 0);
        assert_eq!(row[12], 0, "8x8 sprite ends after 8 pixels");
    }

    #[test]
    fn test_transparent_color_skipped() {
        // Tile 0 is all zeroes: nothing lands in the row.
        let oam = oam_with_sprite(0, [4, 0, 0, 0, 0, 0x01]);
        let mut row = [0xFFFFu16; LINE_PIXELS];
        render_line(&oam, &test_vram(), &test_cgram(), &mut row, 0, 0);
        assert_eq!(row[4], 0xFFFF);
    }

    #[test]
    fn test_priority_ordering() {
        let mut oam = Oam::new();
        // Sprite 0: priority 0 (back), palette 0 -> blue.
        oam.set_addr(0);
        for b in [0, 0, 1, 0x00, 0, 0x01] {
            oam.write_data(b);
        }
        // Sprite 1: priority 3 (front), palette 1 -> red.
        oam.set_addr(1);
        for b in [0, 0, 1, 0xC1, 0, 0x01] {
            oam.write_data(b);
        }
        let mut row = [0u16; LINE_PIXELS];
        render_line(&oam, &test_vram(), &test_cgram(), &mut row, 0, 0);
        assert_eq!(row[0], 0x7C00, "priority 3 draws over priority 0");
    }

    #[test]
    fn test_lower_index_wins_within_priority() {
        let mut oam = Oam::new();
        // Both priority 0; sprite 0 palette 0 (blue), sprite 1 palette 1 (red).
        oam.set_addr(0);
        for b in [0, 0, 1, 0x00, 0, 0x01] {
            oam.write_data(b);
        }
        oam.set_addr(1);
        for b in [0, 0, 1, 0x01, 0, 0x01] {
            oam.write_data(b);
        }
        let mut row = [0u16; LINE_PIXELS];
        render_line(&oam, &test_vram(), &test_cgram(), &mut row, 0, 0);
        assert_eq!(row[0], 0x001F, "sprite 0 draws over sprite 1");
    }

    #[test]
    fn test_alpha_blend_math() {
        // Full alpha behaves like opaque; zero alpha keeps the backdrop.
        assert_eq!(blend(0x7C00, 0x001F, BlendMode::Alpha, 15), 0x001F);
        assert_eq!(blend(0x7C00, 0x001F, BlendMode::Alpha, 0), 0x7C00);
        // Half alpha mixes channels independently.
        let half = blend(0x0000, 0x001F, BlendMode::Alpha, 8);
        assert_eq!(half & 0x1F, (31 * 8) / 15);
    }

    #[test]
    fn test_additive_blend_saturates() {
        assert_eq!(blend(0x001F, 0x001F, BlendMode::Additive, 15), 0x001F);
        assert_eq!(blend(0x000F, 0x0008, BlendMode::Additive, 15), 0x0017);
    }

    #[test]
    fn test_subtractive_blend_floors() {
        assert_eq!(blend(0x0008, 0x001F, BlendMode::Subtractive, 15), 0x0000);
        assert_eq!(blend(0x0017, 0x0008, BlendMode::Subtractive, 15), 0x000F);
    }

    #[test]
    fn test_negative_x_clips() {
        let oam = oam_with_sprite(0, [0xFC, 0, 1, 0, 0, 0x03]);
        let mut row = [0u16; LINE_PIXELS];
        render_line(&oam, &test_vram(), &test_cgram(), &mut row, 0, 0);
        // Sprite at x = 508-512 = -4: only pixels 4..8 are on screen.
        assert_eq!(row[0], 0x001F);
        assert_eq!(row[3], 0x001F);
        assert_eq!(row[4], 0);
    }
}
