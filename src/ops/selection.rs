// ============================================================================
// MAGIC WAND - flood-fill selection over the composite, plus its overlay
// ============================================================================

use image::{GrayImage, Luma, Rgba, RgbaImage};

use crate::canvas::{BlendMode, blend_pixel};

/// Tint drawn over selected pixels.
pub const MASK_OVERLAY_COLOR: Rgba<u8> = Rgba([100, 149, 237, 100]);

/// Upper bound of the wand tolerance slider.
pub const MAX_TOLERANCE: u8 = 100;

/// Canvas-sized selection: 255 = selected, 0 = not.
#[derive(Clone, Debug, PartialEq)]
pub struct SelectionMask(GrayImage);

impl SelectionMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self(GrayImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x < self.0.width() && y < self.0.height() && self.0.get_pixel(x, y)[0] != 0
    }

    pub fn select(&mut self, x: u32, y: u32) {
        if x < self.0.width() && y < self.0.height() {
            self.0.put_pixel(x, y, Luma([255]));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.as_raw().iter().all(|&v| v == 0)
    }

    pub fn count(&self) -> usize {
        self.0.as_raw().iter().filter(|&&v| v != 0).count()
    }
}

#[inline(always)]
fn within(p: [u8; 4], target: [u8; 4], tol: u8) -> bool {
    p.iter().zip(target.iter()).all(|(&a, &b)| a.abs_diff(b) <= tol)
}

/// 4-connected flood fill from `seed` over `img`.
///
/// A pixel joins the region when each of its RGBA channels differs from the
/// seed pixel's by at most `tolerance`.  Returns `None` when the seed lies
/// outside the image.
pub fn flood_fill_mask(img: &RgbaImage, seed: (u32, u32), tolerance: u8) -> Option<SelectionMask> {
    let (w, h) = img.dimensions();
    let (sx, sy) = seed;
    if sx >= w || sy >= h {
        return None;
    }
    let wu = w as usize;
    let flat = img.as_raw();
    let pix = |idx: usize| -> [u8; 4] {
        let o = idx * 4;
        [flat[o], flat[o + 1], flat[o + 2], flat[o + 3]]
    };

    let seed_idx = sy as usize * wu + sx as usize;
    let target = pix(seed_idx);
    let tol = tolerance.min(MAX_TOLERANCE);

    // Mask doubles as the visited set.
    let mut mask = vec![0u8; wu * h as usize];
    let mut stack: Vec<u32> = Vec::with_capacity(4096);
    mask[seed_idx] = 255;
    stack.push(seed_idx as u32);

    while let Some(idx) = stack.pop() {
        let idx = idx as usize;
        let x = idx % wu;
        let y = idx / wu;

        let mut visit = |n: usize| {
            if mask[n] == 0 && within(pix(n), target, tol) {
                mask[n] = 255;
                stack.push(n as u32);
            }
        };
        if x > 0 {
            visit(idx - 1);
        }
        if x + 1 < wu {
            visit(idx + 1);
        }
        if y > 0 {
            visit(idx - wu);
        }
        if y + 1 < h as usize {
            visit(idx + wu);
        }
    }

    GrayImage::from_raw(w, h, mask).map(SelectionMask)
}

/// Tint every selected pixel of `out` with [`MASK_OVERLAY_COLOR`].
pub fn draw_mask_overlay(out: &mut RgbaImage, mask: &SelectionMask) {
    let w = out.width().min(mask.width());
    let h = out.height().min(mask.height());
    for y in 0..h {
        for x in 0..w {
            if mask.contains(x, y) {
                let base = *out.get_pixel(x, y);
                let tinted = blend_pixel(base, MASK_OVERLAY_COLOR, BlendMode::SourceOver, 1.0);
                out.put_pixel(x, y, tinted);
            }
        }
    }
}
