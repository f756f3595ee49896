// ============================================================================
// LAYER TRANSFORM - offscreen sizing and centred rotate/flip draw
// ============================================================================

use image::{RgbaImage, imageops};
use rayon::prelude::*;

use crate::canvas::{BlendMode, blend_pixel};

/// Placement of a layer box on the canvas, already reduced to what the
/// draw needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Centre of the unrotated box in canvas space.
    pub center: (f32, f32),
    /// Rotation in degrees about the centre.
    pub rotation: f32,
    /// Flip factors, each -1.0 or 1.0.
    pub scale: (f32, f32),
    pub opacity: f32,
    pub blend: BlendMode,
}

/// Longest side an offscreen layer buffer may have.
pub const MAX_OFFSCREEN_SIDE: f32 = 16_384.0;
/// Pixel budget of one offscreen layer buffer (256 MiB of RGBA).
pub const MAX_OFFSCREEN_PIXELS: f64 = (1u64 << 26) as f64;

/// Integer size of the offscreen buffer for a `(width, height)` box.
/// `None` for boxes under one pixel or too large to allocate; such layers are
/// not drawn.
pub fn offscreen_size(width: f32, height: f32) -> Option<(u32, u32)> {
    if !(width >= 1.0 && height >= 1.0) {
        return None;
    }
    if width > MAX_OFFSCREEN_SIDE
        || height > MAX_OFFSCREEN_SIDE
        || width.floor() as f64 * height.floor() as f64 > MAX_OFFSCREEN_PIXELS
    {
        return None;
    }
    Some((width.floor() as u32, height.floor() as u32))
}

/// Stretch `src` to the layer's displayed box.  A same-size request returns a
/// plain copy so unscaled layers stay bit-exact.
pub fn stretch_to(src: &RgbaImage, w: u32, h: u32) -> RgbaImage {
    if src.width() == w && src.height() == h {
        return src.clone();
    }
    imageops::resize(src, w, h, imageops::FilterType::Triangle)
}

/// Draw `layer` onto `dst` centred at `placement.center`, rotated, flipped and
/// blended.  Sampling is inverse-mapped at pixel centres, bilinear, against a
/// transparent outside, so an unrotated layer at an integer position copies
/// exactly.
pub fn draw_transformed(dst: &mut RgbaImage, layer: &RgbaImage, placement: &Placement) {
    let lw = layer.width() as f32;
    let lh = layer.height() as f32;
    if lw == 0.0 || lh == 0.0 || placement.opacity <= 0.0 {
        return;
    }
    let dw = dst.width();
    let dh = dst.height();
    let (cx, cy) = placement.center;
    let (sin, cos) = placement.rotation.to_radians().sin_cos();
    let (sx, sy) = placement.scale;

    // Canvas-space bounding box of the rotated layer, clipped to dst.
    let hw = lw * 0.5;
    let hh = lh * 0.5;
    let ex = hw * cos.abs() + hh * sin.abs();
    let ey = hw * sin.abs() + hh * cos.abs();
    let x0 = ((cx - ex).floor().max(0.0)) as u32;
    let y0 = ((cy - ey).floor().max(0.0)) as u32;
    let x1 = ((cx + ex).ceil().max(0.0) as u32).min(dw);
    let y1 = ((cy + ey).ceil().max(0.0) as u32).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let src_w = layer.width() as i32;
    let src_h = layer.height() as i32;
    let src_stride = src_w as usize * 4;
    let src_raw = layer.as_raw();
    let row_bytes = dw as usize * 4;
    let opacity = placement.opacity.clamp(0.0, 1.0);
    let blend = placement.blend;

    dst.as_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .skip(y0 as usize)
        .take((y1 - y0) as usize)
        .for_each(|(py, row)| {
            let vy = py as f32 + 0.5 - cy;
            for px in x0..x1 {
                let vx = px as f32 + 0.5 - cx;
                // Undo rotation, then flip.
                let lx = (vx * cos + vy * sin) * sx;
                let ly = (-vx * sin + vy * cos) * sy;
                let src_x = lx + hw - 0.5;
                let src_y = ly + hh - 0.5;

                let x0s = src_x.floor() as i32;
                let y0s = src_y.floor() as i32;
                if x0s < -1 || y0s < -1 || x0s >= src_w || y0s >= src_h {
                    continue;
                }
                let fx = src_x - x0s as f32;
                let fy = src_y - y0s as f32;

                let sample = |qx: i32, qy: i32| -> [f32; 4] {
                    if qx < 0 || qy < 0 || qx >= src_w || qy >= src_h {
                        [0.0; 4]
                    } else {
                        let idx = qy as usize * src_stride + qx as usize * 4;
                        [
                            src_raw[idx] as f32,
                            src_raw[idx + 1] as f32,
                            src_raw[idx + 2] as f32,
                            src_raw[idx + 3] as f32,
                        ]
                    }
                };

                let tl = sample(x0s, y0s);
                let tr = sample(x0s + 1, y0s);
                let bl = sample(x0s, y0s + 1);
                let br = sample(x0s + 1, y0s + 1);

                let mut top = [0u8; 4];
                for c in 0..4 {
                    let t = tl[c] + (tr[c] - tl[c]) * fx;
                    let b = bl[c] + (br[c] - bl[c]) * fx;
                    top[c] = (t + (b - t) * fy).round().clamp(0.0, 255.0) as u8;
                }
                let off = px as usize * 4;
                let base = image::Rgba([row[off], row[off + 1], row[off + 2], row[off + 3]]);
                let out = blend_pixel(base, image::Rgba(top), blend, opacity);
                row[off..off + 4].copy_from_slice(&out.0);
            }
        });
}
