// ============================================================================
// LIQUIFY - destructive push-warp brush on a single flat canvas
// ============================================================================
//
// Unlike the layer compositor, the warp canvas keeps one mutable buffer and
// every stroke sample compounds on top of the previous ones.  Only `reset`
// goes back to the pristine source.
// ============================================================================

use std::sync::Arc;

use image::{RgbaImage, imageops};

/// Sources wider than this are downscaled on load.
pub const MAX_WARP_WIDTH: u32 = 800;

pub const MIN_RADIUS: f32 = 10.0;
pub const MAX_RADIUS: f32 = 200.0;
pub const MIN_STRENGTH: f32 = 0.1;
pub const MAX_STRENGTH: f32 = 1.0;

pub const DEFAULT_RADIUS: f32 = 50.0;
pub const DEFAULT_STRENGTH: f32 = 0.5;

#[derive(Clone, Debug)]
pub struct WarpCanvas {
    original: Arc<RgbaImage>,
    buffer: RgbaImage,
    radius: f32,
    strength: f32,
    last_pos: Option<(f32, f32)>,
}

/// Size a `w × h` source is shown at: width capped to [`MAX_WARP_WIDTH`],
/// aspect preserved.
pub fn capped_size(w: u32, h: u32) -> (u32, u32) {
    if w <= MAX_WARP_WIDTH {
        return (w, h);
    }
    let scale = MAX_WARP_WIDTH as f32 / w as f32;
    (MAX_WARP_WIDTH, ((h as f32 * scale).floor() as u32).max(1))
}

fn fit(original: &RgbaImage) -> RgbaImage {
    let (w, h) = capped_size(original.width(), original.height());
    if (w, h) == original.dimensions() {
        original.clone()
    } else {
        imageops::resize(original, w, h, imageops::FilterType::Triangle)
    }
}

impl WarpCanvas {
    pub fn new(source: RgbaImage) -> Self {
        let original = Arc::new(source);
        let buffer = fit(&original);
        crate::log_info!(
            "liquify: loaded {}×{} source, working at {}×{}",
            original.width(),
            original.height(),
            buffer.width(),
            buffer.height()
        );
        Self {
            original,
            buffer,
            radius: DEFAULT_RADIUS,
            strength: DEFAULT_STRENGTH,
            last_pos: None,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.buffer
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    /// Affects later samples only.
    pub fn set_radius(&mut self, radius: f32) {
        self.radius = radius.clamp(MIN_RADIUS, MAX_RADIUS);
    }

    pub fn set_strength(&mut self, strength: f32) {
        self.strength = strength.clamp(MIN_STRENGTH, MAX_STRENGTH);
    }

    pub fn is_stroking(&self) -> bool {
        self.last_pos.is_some()
    }

    pub fn begin_stroke(&mut self, pos: (f32, f32)) {
        self.last_pos = Some(pos);
    }

    pub fn end_stroke(&mut self) {
        self.last_pos = None;
    }

    /// Feed one pointer-move sample.  Returns `true` when pixels changed.
    /// Outside a stroke, or with zero movement since the previous sample,
    /// nothing happens.
    pub fn stroke_to(&mut self, pos: (f32, f32)) -> bool {
        let Some(last) = self.last_pos else {
            return false;
        };
        let dx = pos.0 - last.0;
        let dy = pos.1 - last.1;
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        self.push(pos, (dx, dy));
        self.last_pos = Some(pos);
        true
    }

    /// Discard every stroke and go back to the source at the capped size.
    pub fn reset(&mut self) {
        self.buffer = fit(&self.original);
        self.last_pos = None;
        crate::log_info!("liquify: reset to original");
    }

    pub fn export_png(&self) -> crate::error::Result<Vec<u8>> {
        crate::io::encode_png(&self.buffer)
    }

    fn push(&mut self, center: (f32, f32), delta: (f32, f32)) {
        let w = self.buffer.width() as i64;
        let h = self.buffer.height() as i64;
        let r = self.radius;

        let x0 = ((center.0 - r).floor() as i64).clamp(0, w);
        let y0 = ((center.1 - r).floor() as i64).clamp(0, h);
        let x1 = ((center.0 + r).ceil() as i64).clamp(0, w);
        let y1 = ((center.1 + r).ceil() as i64).clamp(0, h);
        if x0 >= x1 || y0 >= y1 {
            return;
        }
        let (x0, y0) = (x0 as u32, y0 as u32);
        let (bw, bh) = ((x1 - x0 as i64) as u32, (y1 - y0 as i64) as u32);

        let snapshot = imageops::crop_imm(&self.buffer, x0, y0, bw, bh).to_image();
        let mut dest = snapshot.clone();

        let cx = center.0 - x0 as f32;
        let cy = center.1 - y0 as f32;
        let r_sq = r * r;
        let max_x = (bw - 1) as f32;
        let max_y = (bh - 1) as f32;

        for ly in 0..bh {
            for lx in 0..bw {
                let ddx = lx as f32 - cx;
                let ddy = ly as f32 - cy;
                let dist_sq = ddx * ddx + ddy * ddy;
                if dist_sq >= r_sq {
                    continue;
                }
                let falloff = 1.0 - dist_sq / r_sq;
                let power = falloff * falloff * self.strength;
                let sx = (lx as f32 - delta.0 * power * 0.5).clamp(0.0, max_x).floor() as u32;
                let sy = (ly as f32 - delta.1 * power * 0.5).clamp(0.0, max_y).floor() as u32;
                dest.put_pixel(lx, ly, *snapshot.get_pixel(sx, sy));
            }
        }

        imageops::replace(&mut self.buffer, &dest, x0 as i64, y0 as i64);
    }
}
