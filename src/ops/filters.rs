// ============================================================================
// LIVE FILTERS - brightness/contrast, gamma, sharpen for the active layer
// ============================================================================
//
// All passes operate in place on the offscreen buffer of the active layer,
// before it is composited.  RGB only; alpha is never touched.
// Each pass is skipped entirely at its identity value so the output stays
// bit-exact with the input.
// ============================================================================

use image::RgbaImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum value of the sharpness slider.
pub const SHARPNESS_MAX: f32 = 100.0;

/// Live-adjustment slider values for the active layer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Adjustments {
    /// Percent, 100 = unchanged.
    pub brightness: f32,
    /// Percent, 100 = unchanged.
    pub contrast: f32,
    /// Gamma exponent denominator, 1.0 = unchanged.
    pub gamma: f32,
    /// 0..=100, 0 = unchanged.
    pub sharpness: f32,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: 100.0,
            contrast: 100.0,
            gamma: 1.0,
            sharpness: 0.0,
        }
    }
}

impl Adjustments {
    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

/// Run the whole filter chain: brightness/contrast during the "draw", then
/// the manual gamma/sharpen pass.
pub fn apply_adjustments(img: &mut RgbaImage, adj: &Adjustments) {
    if adj.is_identity() {
        return;
    }
    brightness_contrast(img, adj.brightness, adj.contrast);
    gamma_sharpen(img, adj.gamma, adj.sharpness);
}

// ---------------------------------------------------------------------------
//  Brightness / contrast (percentage filter semantics)
// ---------------------------------------------------------------------------

/// `brightness(b%) contrast(c%)`: brightness scales each channel by `b/100`,
/// then contrast scales the distance from mid-grey by `c/100`.
pub fn brightness_contrast(img: &mut RgbaImage, brightness: f32, contrast: f32) {
    if brightness == 100.0 && contrast == 100.0 {
        return;
    }
    let b = (brightness / 100.0).max(0.0);
    let c = (contrast / 100.0).max(0.0);
    let lut = build_lut(|v| {
        let lit = (v * b).min(255.0);
        (lit - 127.5) * c + 127.5
    });
    apply_rgb_lut(img, &lut);
}

// ---------------------------------------------------------------------------
//  Gamma + sharpen
// ---------------------------------------------------------------------------

/// Gamma correction followed by the 5-tap cross sharpen.
///
/// Gamma is applied in place first; sharpening then reads from a frozen copy
/// of the gamma-corrected pixels and writes into `img`.
pub fn gamma_sharpen(img: &mut RgbaImage, gamma: f32, sharpness: f32) {
    if gamma != 1.0 {
        apply_gamma(img, gamma);
    }
    if sharpness > 0.0 {
        sharpen(img, sharpness);
    }
}

/// `out = 255 * (in / 255)^(1 / gamma)` on R, G and B.
pub fn apply_gamma(img: &mut RgbaImage, gamma: f32) {
    if gamma == 1.0 || gamma <= 0.0 {
        return;
    }
    let inv = 1.0 / gamma;
    let lut = build_lut(|v| 255.0 * (v / 255.0).powf(inv));
    apply_rgb_lut(img, &lut);
}

/// Cross-kernel unsharp pass: centre weight 5, the four direct neighbours -1,
/// blended with the original by `sharpness / 100`.  The outermost ring of
/// pixels is left as is.
pub fn sharpen(img: &mut RgbaImage, sharpness: f32) {
    if sharpness <= 0.0 {
        return;
    }
    let w = img.width() as usize;
    let h = img.height() as usize;
    if w < 3 || h < 3 {
        return;
    }
    let mix = (sharpness / SHARPNESS_MAX).clamp(0.0, 1.0);
    let frozen = img.as_raw().clone();
    let stride = w * 4;

    img.as_mut()
        .par_chunks_mut(stride)
        .enumerate()
        .skip(1)
        .take(h - 2)
        .for_each(|(y, row_out)| {
            let up = (y - 1) * stride;
            let mid = y * stride;
            let down = (y + 1) * stride;
            for x in 1..w - 1 {
                let px = x * 4;
                for c in 0..3 {
                    let centre = frozen[mid + px + c] as f32;
                    let k = 5.0 * centre
                        - frozen[up + px + c] as f32
                        - frozen[down + px + c] as f32
                        - frozen[mid + px - 4 + c] as f32
                        - frozen[mid + px + 4 + c] as f32;
                    let v = k * mix + centre * (1.0 - mix);
                    row_out[px + c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
        });
}

// ---------------------------------------------------------------------------
//  Helpers
// ---------------------------------------------------------------------------

fn build_lut<F: Fn(f32) -> f32>(f: F) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (i, slot) in lut.iter_mut().enumerate() {
        *slot = f(i as f32).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

fn apply_rgb_lut(img: &mut RgbaImage, lut: &[u8; 256]) {
    let stride = img.width() as usize * 4;
    if stride == 0 {
        return;
    }
    img.as_mut().par_chunks_mut(stride).for_each(|row| {
        for px in row.chunks_exact_mut(4) {
            px[0] = lut[px[0] as usize];
            px[1] = lut[px[1] as usize];
            px[2] = lut[px[2] as usize];
        }
    });
}
