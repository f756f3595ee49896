use std::sync::Arc;

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::components::tools::Tool;
use crate::ops::clipboard::ClipboardItem;
use crate::ops::filters::{self, Adjustments};
use crate::ops::selection::{self, SelectionMask};
use crate::ops::transform::{self, Placement};

/// Logical canvas size.  All layer coordinates live in this space.
pub const CANVAS_WIDTH: u32 = 800;
pub const CANVAS_HEIGHT: u32 = 600;

/// Top-left of a freshly loaded layer.
pub const DEFAULT_POSITION: (f32, f32) = (50.0, 50.0);
/// Freshly loaded layers wider than this are scaled down to it.
pub const MAX_DEFAULT_WIDTH: f32 = 600.0;
/// Floor applied to both axes by the resize tool.
pub const MIN_LAYER_SIZE: f32 = 10.0;

/// Side length of the square resize handles.
pub const HANDLE_SIZE: u32 = 10;
const HANDLE_COLOR: Rgba<u8> = Rgba([0, 123, 255, 255]);

// ============================================================================
// BLEND MODES
// ============================================================================

/// Composite operation used for the top layer.  The bottom layer is always
/// drawn with `SourceOver`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendMode {
    #[default]
    SourceOver,
    Multiply,
    Screen,
    Overlay,
}

impl BlendMode {
    pub fn all() -> &'static [BlendMode] {
        &[
            BlendMode::SourceOver,
            BlendMode::Multiply,
            BlendMode::Screen,
            BlendMode::Overlay,
        ]
    }

    /// Key into the label catalog.
    pub fn label_key(&self) -> &'static str {
        match self {
            BlendMode::SourceOver => "blend.source_over",
            BlendMode::Multiply => "blend.multiply",
            BlendMode::Screen => "blend.screen",
            BlendMode::Overlay => "blend.overlay",
        }
    }

    fn mix_channel(&self, base: f32, top: f32) -> f32 {
        match self {
            BlendMode::SourceOver => top,
            BlendMode::Multiply => base * top,
            BlendMode::Screen => 1.0 - (1.0 - base) * (1.0 - top),
            BlendMode::Overlay => {
                if base < 0.5 {
                    2.0 * base * top
                } else {
                    1.0 - 2.0 * (1.0 - base) * (1.0 - top)
                }
            }
        }
    }
}

/// Blend `top` over `base` with a separable blend mode and a global alpha.
///
/// Where the backdrop is transparent the source colour shows through
/// unmodified; the blended colour is weighted by the backdrop alpha.
pub fn blend_pixel(base: Rgba<u8>, top: Rgba<u8>, mode: BlendMode, opacity: f32) -> Rgba<u8> {
    if top[3] == 0 || opacity <= 0.0 {
        return base;
    }
    if mode == BlendMode::SourceOver && opacity >= 1.0 && top[3] == 255 {
        return top;
    }

    let opacity = opacity.clamp(0.0, 1.0);
    let base_a = base[3] as f32 / 255.0;
    let top_a = (top[3] as f32 / 255.0) * opacity;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let cb = base[c] as f32 / 255.0;
        let cs = top[c] as f32 / 255.0;
        let mixed = (1.0 - base_a) * cs + base_a * mode.mix_channel(cb, cs);
        let v = (mixed * top_a + cb * base_a * (1.0 - top_a)) / out_a;
        out[c] = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgba(out)
}

// ============================================================================
// LAYERS
// ============================================================================

/// One of the two fixed layer slots.  Slot 1 is drawn first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LayerSlot {
    #[default]
    One,
    Two,
}

impl LayerSlot {
    pub fn id(self) -> u8 {
        match self {
            LayerSlot::One => 1,
            LayerSlot::Two => 2,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(LayerSlot::One),
            2 => Some(LayerSlot::Two),
            _ => None,
        }
    }

    fn index(self) -> usize {
        self.id() as usize - 1
    }
}

/// Geometry and appearance of one layer plus its immutable source raster.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Decoded source pixels; replaced wholesale, never edited in place.
    pub image: Option<Arc<RgbaImage>>,
    /// Encoded bytes the image was decoded from (sent to background removal).
    pub original: Option<Arc<Vec<u8>>>,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Degrees about the box centre.  Not normalized.
    pub rotation: f32,
    pub flip_h: bool,
    pub flip_v: bool,
    pub opacity: f32,
}

impl Default for Layer {
    fn default() -> Self {
        Self {
            image: None,
            original: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            rotation: 0.0,
            flip_h: false,
            flip_v: false,
            opacity: 1.0,
        }
    }
}

impl Layer {
    /// A layer with default placement for `image`: top-left at (50, 50),
    /// native size capped to 600 px wide with the aspect ratio preserved.
    pub fn from_image(image: Arc<RgbaImage>, original: Option<Arc<Vec<u8>>>) -> Self {
        let (w, h) = default_size(image.width(), image.height());
        Self {
            image: Some(image),
            original,
            x: DEFAULT_POSITION.0,
            y: DEFAULT_POSITION.1,
            width: w,
            height: h,
            ..Self::default()
        }
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Flip flags as drawing scale factors.
    pub fn scale(&self) -> (f32, f32) {
        (
            if self.flip_h { -1.0 } else { 1.0 },
            if self.flip_v { -1.0 } else { 1.0 },
        )
    }

    pub fn apply(&mut self, patch: &LayerPatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(w) = patch.width {
            self.width = w.max(1.0);
        }
        if let Some(h) = patch.height {
            self.height = h.max(1.0);
        }
        if let Some(r) = patch.rotation {
            self.rotation = r;
        }
        if let Some(f) = patch.flip_h {
            self.flip_h = f;
        }
        if let Some(f) = patch.flip_v {
            self.flip_v = f;
        }
        if let Some(o) = patch.opacity {
            self.opacity = o.clamp(0.0, 1.0);
        }
    }

    fn placement(&self, blend: BlendMode) -> Placement {
        Placement {
            center: self.center(),
            rotation: self.rotation,
            scale: self.scale(),
            opacity: self.opacity,
            blend,
        }
    }
}

/// Default displayed size for a source of `w × h` pixels.
pub fn default_size(w: u32, h: u32) -> (f32, f32) {
    let (w, h) = (w as f32, h as f32);
    if w > MAX_DEFAULT_WIDTH {
        (MAX_DEFAULT_WIDTH, MAX_DEFAULT_WIDTH * h / w)
    } else {
        (w, h)
    }
}

/// Partial update merged into a layer by [`CanvasState::update_layer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub rotation: Option<f32>,
    pub flip_h: Option<bool>,
    pub flip_v: Option<bool>,
    pub opacity: Option<f32>,
}

impl LayerPatch {
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn size(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    pub fn rotation(degrees: f32) -> Self {
        Self {
            rotation: Some(degrees),
            ..Self::default()
        }
    }

    pub fn opacity(opacity: f32) -> Self {
        Self {
            opacity: Some(opacity),
            ..Self::default()
        }
    }
}

// ============================================================================
// CANVAS STATE
// ============================================================================

/// The compositing canvas: two layers, the top layer's blend mode, live
/// adjustments for the active layer, the selection mask and the clipboard.
///
/// Rendering is a pure function of this state; nothing is cached between
/// renders.
#[derive(Clone, Debug)]
pub struct CanvasState {
    pub width: u32,
    pub height: u32,
    layers: [Layer; 2],
    pub active: LayerSlot,
    pub blend_mode: BlendMode,
    pub adjustments: Adjustments,
    pub selection: Option<SelectionMask>,
    pub clipboard: Option<ClipboardItem>,
}

impl Default for CanvasState {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasState {
    pub fn new() -> Self {
        Self::with_size(CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            layers: [Layer::default(), Layer::default()],
            active: LayerSlot::One,
            blend_mode: BlendMode::SourceOver,
            adjustments: Adjustments::default(),
            selection: None,
            clipboard: None,
        }
    }

    pub fn layer(&self, slot: LayerSlot) -> &Layer {
        &self.layers[slot.index()]
    }

    pub(crate) fn layer_mut(&mut self, slot: LayerSlot) -> &mut Layer {
        &mut self.layers[slot.index()]
    }

    pub fn active_layer(&self) -> &Layer {
        self.layer(self.active)
    }

    pub(crate) fn active_layer_mut(&mut self) -> &mut Layer {
        let slot = self.active;
        self.layer_mut(slot)
    }

    /// Install `image` in `slot` with default placement, discarding whatever
    /// the slot held before.
    pub fn load_layer(&mut self, slot: LayerSlot, image: RgbaImage, original: Option<Vec<u8>>) {
        crate::log_info!(
            "layer {}: loaded {}×{} source",
            slot.id(),
            image.width(),
            image.height()
        );
        self.layers[slot.index()] = Layer::from_image(Arc::new(image), original.map(Arc::new));
    }

    pub fn update_layer(&mut self, slot: LayerSlot, patch: &LayerPatch) {
        self.layer_mut(slot).apply(patch);
    }

    /// Exchange the full state of both layers.  Slot identities stay fixed.
    pub fn swap_layers(&mut self) {
        self.layers.swap(0, 1);
    }

    pub fn set_active(&mut self, slot: LayerSlot) {
        self.active = slot;
    }

    /// Composite operation for the top layer.
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }

    /// Live filter values; they apply to whichever layer is active.
    pub fn set_adjustments(&mut self, adjustments: Adjustments) {
        self.adjustments = adjustments;
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn clear_selection(&mut self) {
        self.selection = None;
    }

    /// Offscreen buffer for one layer: the source stretched to the layer box,
    /// with the live filters applied when the layer is the active one.
    pub fn layer_buffer(&self, slot: LayerSlot) -> Option<RgbaImage> {
        let layer = self.layer(slot);
        let image = layer.image.as_ref()?;
        let Some((w, h)) = transform::offscreen_size(layer.width, layer.height) else {
            crate::log_warn!(
                "layer {}: {}×{} box cannot be drawn, skipped",
                slot.id(),
                layer.width,
                layer.height
            );
            return None;
        };
        let mut buf = transform::stretch_to(image, w, h);
        if slot == self.active {
            filters::apply_adjustments(&mut buf, &self.adjustments);
        }
        Some(buf)
    }

    /// Draw both layers (slot 1 with `source-over`, slot 2 with the selected
    /// blend mode) onto a cleared canvas.  No tool overlays.
    pub fn composite(&self) -> RgbaImage {
        let mut out = RgbaImage::new(self.width, self.height);
        for slot in [LayerSlot::One, LayerSlot::Two] {
            let Some(buf) = self.layer_buffer(slot) else { continue };
            let blend = match slot {
                LayerSlot::One => BlendMode::SourceOver,
                LayerSlot::Two => self.blend_mode,
            };
            let placement = self.layer(slot).placement(blend);
            transform::draw_transformed(&mut out, &buf, &placement);
        }
        out
    }

    /// What the user sees: the composite plus the selection overlay and, for
    /// the resize tool, the corner handles of an unrotated active layer.
    pub fn render(&self, tool: Tool) -> RgbaImage {
        let mut out = self.composite();
        if let Some(mask) = &self.selection {
            selection::draw_mask_overlay(&mut out, mask);
        }
        if tool == Tool::Resize {
            self.draw_resize_handles(&mut out);
        }
        out
    }

    /// Corner positions of the active layer's box, in the order top-left,
    /// top-right, bottom-left, bottom-right.
    pub fn handle_positions(&self) -> [(f32, f32); 4] {
        let l = self.active_layer();
        [
            (l.x, l.y),
            (l.x + l.width, l.y),
            (l.x, l.y + l.height),
            (l.x + l.width, l.y + l.height),
        ]
    }

    // Rotated layers get no handles.
    fn draw_resize_handles(&self, out: &mut RgbaImage) {
        let layer = self.active_layer();
        if !layer.has_image() || layer.rotation != 0.0 {
            return;
        }
        let half = HANDLE_SIZE as f32 * 0.5;
        for (hx, hy) in self.handle_positions() {
            let x0 = (hx - half).round() as i64;
            let y0 = (hy - half).round() as i64;
            for y in y0..y0 + HANDLE_SIZE as i64 {
                for x in x0..x0 + HANDLE_SIZE as i64 {
                    if x >= 0 && y >= 0 && (x as u32) < out.width() && (y as u32) < out.height() {
                        out.put_pixel(x as u32, y as u32, HANDLE_COLOR);
                    }
                }
            }
        }
    }

    /// PNG bytes of the composite (tool overlays excluded).
    pub fn export_png(&self) -> crate::error::Result<Vec<u8>> {
        crate::io::encode_png(&self.composite())
    }
}
