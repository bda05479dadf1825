//! Matrix (affine) layer rendering.
//!
//! When a layer's matrix bit is set, screen coordinates map to tilemap
//! ("world") coordinates through a 2x2 matrix in signed 8.8 fixed point,
//! anchored at the transform center:
//!
//! ```text
//! world_x = (A*(x - cx) + B*(y - cy)) >> 8 + cx
//! world_y = (C*(x - cx) + D*(y - cy)) >> 8 + cy
//! ```
//!
//! Coordinates outside the 64-tile map repeat; the mirror H/V control bits
//! reflect every other repetition.

use crate::background::{map_entry, palette_color, tile_pixel, LINE_PIXELS, MAP_TILES};
use crate::registers::{Layer, Matrix};

/// Fold a world coordinate into `0..period`, reflecting alternate
/// repetitions when `mirror` is set.
#[inline]
fn fold(coord: i32, period: i32, mirror: bool) -> i32 {
    if mirror {
        let doubled = period * 2;
        let m = coord.rem_euclid(doubled);
        if m < period {
            m
        } else {
            doubled - 1 - m
        }
    } else {
        coord.rem_euclid(period)
    }
}

/// Render one matrix-transformed layer line into the index buffer.
pub(crate) fn render_line(
    vram: &[u8],
    layer: &Layer,
    matrix: &Matrix,
    y: u16,
    mask: Option<&[bool; LINE_PIXELS]>,
    line: &mut [u8; LINE_PIXELS],
) {
    let size = layer.control.tile_size();
    let char_base = layer.control.char_base();
    let map_base = layer.control.map_base();
    let period = i32::from(size) * MAP_TILES as i32;

    let cx = i32::from(matrix.center_x);
    let cy = i32::from(matrix.center_y);
    let dy = i32::from(y) - cy;

    // Row-constant terms of the transform.
    let row_x = i32::from(matrix.b) * dy;
    let row_y = i32::from(matrix.d) * dy;

    for (x, out) in line.iter_mut().enumerate() {
        if mask.is_some_and(|m| m[x]) {
            continue;
        }

        let dx = x as i32 - cx;
        let world_x = ((i32::from(matrix.a) * dx + row_x) >> 8) + cx;
        let world_y = ((i32::from(matrix.c) * dx + row_y) >> 8) + cy;

        let fx = fold(world_x, period, matrix.mirror_h());
        let fy = fold(world_y, period, matrix.mirror_v());

        let tx = (fx / i32::from(size)) as usize;
        let ty = (fy / i32::from(size)) as usize;
        let px = (fx % i32::from(size)) as u16;
        let py = (fy % i32::from(size)) as u16;

        let (tile, attr) = map_entry(vram, map_base, tx, ty);
        let color = tile_pixel(
            vram,
            char_base,
            tile,
            size,
            px,
            py,
            attr & (1 << 6) != 0,
            attr & (1 << 7) != 0,
        );
        if color != 0 {
            *out = palette_color(attr, color);
        }
    }
}
