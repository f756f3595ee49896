use serde::{Deserialize, Serialize};

use crate::canvas::{CanvasState, LayerPatch, MIN_LAYER_SIZE};
use crate::ops::selection;

/// Pointer distance (per axis) within which a corner handle is grabbed.
pub const HANDLE_HIT_TOLERANCE: f32 = 15.0;

/// Default wand tolerance on the 0..=100 slider.
pub const DEFAULT_WAND_TOLERANCE: u8 = 30;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    Move,
    Resize,
    Rotate,
    Wand,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[Tool::Move, Tool::Resize, Tool::Rotate, Tool::Wand]
    }

    /// Key into the label catalog.
    pub fn label_key(&self) -> &'static str {
        match self {
            Tool::Move => "tool.move",
            Tool::Resize => "tool.resize",
            Tool::Rotate => "tool.rotate",
            Tool::Wand => "tool.wand",
        }
    }
}

/// Corner of the active layer's box, in hit-test order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];
}

/// Layer box captured when a resize drag starts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    /// Pointer minus layer top-left at pointer-down.
    Moving { offset: (f32, f32) },
    /// Pointer angle minus layer rotation at pointer-down, degrees.
    Rotating { angle_offset: f32 },
    Resizing { corner: Corner, initial: LayerBox },
}

/// Converts display-space pointer positions into canvas pixels.
///
/// One factor, `canvas width / displayed width`, scales both axes.  The
/// display is assumed to keep the canvas aspect ratio.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMapping {
    /// Top-left of the displayed canvas in display space.
    pub origin: (f32, f32),
    /// Size the canvas is displayed at.
    pub displayed: (f32, f32),
    /// Logical canvas size.
    pub canvas: (u32, u32),
}

impl ViewportMapping {
    pub fn new(displayed: (f32, f32), canvas: (u32, u32)) -> Self {
        Self {
            origin: (0.0, 0.0),
            displayed,
            canvas,
        }
    }

    /// `canvas / displayed` width ratio.  A collapsed display maps 1:1.
    pub fn scale(&self) -> f32 {
        if self.displayed.0 > 0.0 {
            self.canvas.0 as f32 / self.displayed.0
        } else {
            1.0
        }
    }

    pub fn to_canvas(&self, pos: (f32, f32)) -> (f32, f32) {
        let s = self.scale();
        ((pos.0 - self.origin.0) * s, (pos.1 - self.origin.1) * s)
    }

    /// Integer canvas pixel under `pos`, clamped into the canvas.
    pub fn to_canvas_clamped(&self, pos: (f32, f32)) -> (u32, u32) {
        let (x, y) = self.to_canvas(pos);
        let max_x = self.canvas.0.saturating_sub(1) as f32;
        let max_y = self.canvas.1.saturating_sub(1) as f32;
        (x.floor().clamp(0.0, max_x) as u32, y.floor().clamp(0.0, max_y) as u32)
    }
}

/// Selected tool, drag state and wand settings.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolsState {
    pub tool: Tool,
    pub drag: DragState,
    pub wand_tolerance: u8,
}

impl Default for ToolsState {
    fn default() -> Self {
        Self {
            tool: Tool::Move,
            drag: DragState::Idle,
            wand_tolerance: DEFAULT_WAND_TOLERANCE,
        }
    }
}

fn angle_deg(center: (f32, f32), pos: (f32, f32)) -> f32 {
    (pos.1 - center.1).atan2(pos.0 - center.0).to_degrees()
}

impl ToolsState {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            ..Self::default()
        }
    }

    /// Switch tools.  Any drag in progress is abandoned.
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
        self.drag = DragState::Idle;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag != DragState::Idle
    }

    /// Corner handle of the active layer under `pos`, if any.  Rotated layers
    /// have no handles.
    pub fn hit_corner(canvas: &CanvasState, pos: (f32, f32)) -> Option<Corner> {
        if canvas.active_layer().rotation != 0.0 {
            return None;
        }
        Corner::ALL
            .into_iter()
            .zip(canvas.handle_positions())
            .find(|(_, (hx, hy))| {
                (pos.0 - hx).abs() <= HANDLE_HIT_TOLERANCE
                    && (pos.1 - hy).abs() <= HANDLE_HIT_TOLERANCE
            })
            .map(|(corner, _)| corner)
    }

    /// Pointer pressed at canvas position `pos`.  Returns `true` when the
    /// canvas state changed (wand selection) or a drag started.
    pub fn pointer_down(&mut self, canvas: &mut CanvasState, pos: (f32, f32)) -> bool {
        let layer = canvas.active_layer();
        match self.tool {
            Tool::Move => {
                self.drag = DragState::Moving {
                    offset: (pos.0 - layer.x, pos.1 - layer.y),
                };
                true
            }
            Tool::Rotate => {
                let start = angle_deg(layer.center(), pos);
                self.drag = DragState::Rotating {
                    angle_offset: start - layer.rotation,
                };
                true
            }
            Tool::Resize => match Self::hit_corner(canvas, pos) {
                Some(corner) => {
                    self.drag = DragState::Resizing {
                        corner,
                        initial: LayerBox {
                            x: layer.x,
                            y: layer.y,
                            width: layer.width,
                            height: layer.height,
                        },
                    };
                    true
                }
                None => false,
            },
            Tool::Wand => self.wand_click(canvas, pos),
        }
    }

    /// Pointer moved to canvas position `pos`.  Returns `true` when the
    /// active layer was updated.
    pub fn pointer_move(&mut self, canvas: &mut CanvasState, pos: (f32, f32)) -> bool {
        let slot = canvas.active;
        match self.drag {
            DragState::Idle => false,
            DragState::Moving { offset } => {
                let (x, y) = (pos.0 - offset.0, pos.1 - offset.1);
                canvas.update_layer(slot, &LayerPatch::position(x, y));
                true
            }
            DragState::Rotating { angle_offset } => {
                let angle = angle_deg(canvas.active_layer().center(), pos);
                canvas.update_layer(slot, &LayerPatch::rotation(angle - angle_offset));
                true
            }
            DragState::Resizing { corner: Corner::BottomRight, initial } => {
                let w = (pos.0 - initial.x).max(MIN_LAYER_SIZE);
                let h = (pos.1 - initial.y).max(MIN_LAYER_SIZE);
                canvas.update_layer(slot, &LayerPatch::size(w, h));
                true
            }
            // Only the bottom-right handle resizes.
            DragState::Resizing { .. } => false,
        }
    }

    pub fn pointer_up(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn pointer_leave(&mut self) {
        self.drag = DragState::Idle;
    }

    fn wand_click(&self, canvas: &mut CanvasState, pos: (f32, f32)) -> bool {
        if pos.0 < 0.0 || pos.1 < 0.0 {
            return false;
        }
        let seed = (pos.0.floor() as u32, pos.1.floor() as u32);
        match selection::flood_fill_mask(&canvas.composite(), seed, self.wand_tolerance) {
            Some(mask) => {
                crate::log_info!(
                    "wand: {} pixels selected from ({}, {}) at tolerance {}",
                    mask.count(),
                    seed.0,
                    seed.1,
                    self.wand_tolerance
                );
                canvas.selection = Some(mask);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::LayerSlot;
    use image::{Rgba, RgbaImage};

    fn canvas_with_layer(w: u32, h: u32) -> CanvasState {
        let mut canvas = CanvasState::new();
        let image = RgbaImage::from_pixel(w, h, Rgba([80, 80, 80, 255]));
        canvas.load_layer(LayerSlot::One, image, None);
        canvas
    }

    #[test]
    fn move_drag_keeps_grab_offset() {
        let mut canvas = canvas_with_layer(100, 100);
        let mut tools = ToolsState::new(Tool::Move);
        assert!(tools.pointer_down(&mut canvas, (70.0, 60.0)));
        tools.pointer_move(&mut canvas, (170.0, 10.0));
        let l = canvas.layer(LayerSlot::One);
        assert_eq!((l.x, l.y), (150.0, 0.0));
        tools.pointer_up();
        assert!(!tools.is_dragging());
        assert!(!tools.pointer_move(&mut canvas, (0.0, 0.0)));
        assert_eq!(canvas.layer(LayerSlot::One).x, 150.0);
    }

    #[test]
    fn rotate_drag_is_relative_to_grab_angle() {
        let mut canvas = canvas_with_layer(100, 100);
        canvas.update_layer(LayerSlot::One, &LayerPatch::rotation(10.0));
        let mut tools = ToolsState::new(Tool::Rotate);
        // centre is (100, 100); grab due east, drag due south
        tools.pointer_down(&mut canvas, (150.0, 100.0));
        tools.pointer_move(&mut canvas, (100.0, 150.0));
        assert!((canvas.layer(LayerSlot::One).rotation - 100.0).abs() < 1e-3);
    }

    #[test]
    fn resize_misses_ignore_the_click() {
        let mut canvas = canvas_with_layer(100, 100);
        let mut tools = ToolsState::new(Tool::Resize);
        assert!(!tools.pointer_down(&mut canvas, (100.0, 100.0)));
        assert_eq!(tools.drag, DragState::Idle);
    }

    #[test]
    fn bottom_right_resize_is_floored() {
        let mut canvas = canvas_with_layer(100, 100);
        let mut tools = ToolsState::new(Tool::Resize);
        assert!(tools.pointer_down(&mut canvas, (160.0, 140.0)));
        tools.pointer_move(&mut canvas, (250.0, 130.0));
        let l = canvas.layer(LayerSlot::One);
        assert_eq!((l.width, l.height), (200.0, 80.0));
        tools.pointer_move(&mut canvas, (-500.0, 20.0));
        let l = canvas.layer(LayerSlot::One);
        assert_eq!((l.width, l.height), (MIN_LAYER_SIZE, MIN_LAYER_SIZE));
    }

    #[test]
    fn other_corners_are_grabbed_but_inert() {
        let mut canvas = canvas_with_layer(100, 100);
        let mut tools = ToolsState::new(Tool::Resize);
        assert!(tools.pointer_down(&mut canvas, (45.0, 55.0)));
        assert!(matches!(tools.drag, DragState::Resizing { corner: Corner::TopLeft, .. }));
        assert!(!tools.pointer_move(&mut canvas, (0.0, 0.0)));
        let l = canvas.layer(LayerSlot::One);
        assert_eq!((l.x, l.y, l.width, l.height), (50.0, 50.0, 100.0, 100.0));
    }

    #[test]
    fn rotated_layers_have_no_handles() {
        let mut canvas = canvas_with_layer(100, 100);
        canvas.update_layer(LayerSlot::One, &LayerPatch::rotation(0.5));
        assert_eq!(ToolsState::hit_corner(&canvas, (150.0, 150.0)), None);
    }

    #[test]
    fn pointer_leave_ends_any_drag() {
        let mut canvas = canvas_with_layer(10, 10);
        let mut tools = ToolsState::new(Tool::Rotate);
        tools.pointer_down(&mut canvas, (0.0, 0.0));
        assert!(tools.is_dragging());
        tools.pointer_leave();
        assert_eq!(tools.drag, DragState::Idle);
    }

    #[test]
    fn tools_on_empty_layer_do_not_panic() {
        let mut canvas = CanvasState::new();
        for tool in Tool::all() {
            let mut tools = ToolsState::new(*tool);
            tools.pointer_down(&mut canvas, (5.0, 5.0));
            tools.pointer_move(&mut canvas, (25.0, 15.0));
            tools.pointer_up();
        }
        assert!(canvas.composite().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn wand_click_selects_region_of_composite() {
        let mut canvas = canvas_with_layer(100, 100);
        let mut tools = ToolsState::new(Tool::Wand);
        tools.wand_tolerance = 0;
        assert!(tools.pointer_down(&mut canvas, (60.5, 60.5)));
        let mask = canvas.selection.as_ref().unwrap();
        assert_eq!(mask.count(), 100 * 100);
        assert!(mask.contains(50, 50));
        assert!(!mask.contains(49, 50));
        assert!(!tools.is_dragging());
    }

    #[test]
    fn wand_click_outside_canvas_is_ignored() {
        let mut canvas = canvas_with_layer(10, 10);
        let mut tools = ToolsState::new(Tool::Wand);
        assert!(!tools.pointer_down(&mut canvas, (900.0, 10.0)));
        assert!(!tools.pointer_down(&mut canvas, (-1.0, 10.0)));
        assert!(canvas.selection.is_none());
    }

    #[test]
    fn viewport_scales_by_width_ratio() {
        let vp = ViewportMapping::new((400.0, 300.0), (800, 600));
        assert_eq!(vp.scale(), 2.0);
        assert_eq!(vp.to_canvas((100.0, 100.0)), (200.0, 200.0));
        assert_eq!(vp.to_canvas_clamped((1000.0, -3.0)), (799, 0));
        let shifted = ViewportMapping {
            origin: (10.0, 20.0),
            ..vp
        };
        assert_eq!(shifted.to_canvas((10.0, 20.0)), (0.0, 0.0));
    }

    #[test]
    fn viewport_height_does_not_change_the_factor() {
        let squashed = ViewportMapping::new((400.0, 100.0), (800, 600));
        assert_eq!(squashed.to_canvas((50.0, 50.0)), (100.0, 100.0));
        let collapsed = ViewportMapping::new((0.0, 0.0), (800, 600));
        assert_eq!(collapsed.to_canvas((7.0, 9.0)), (7.0, 9.0));
    }

    #[test]
    fn hit_tolerance_is_inclusive_at_15px() {
        // Layer box 50..150, so the bottom-right handle sits at (150, 150).
        let mut canvas = canvas_with_layer(100, 100);
        let mut tools = ToolsState::new(Tool::Resize);
        assert!(tools.pointer_down(&mut canvas, (165.0, 165.0)));
        assert!(matches!(
            tools.drag,
            DragState::Resizing { corner: Corner::BottomRight, .. }
        ));
        tools.pointer_up();
        assert!(!tools.pointer_down(&mut canvas, (165.5, 150.0)));
        assert!(!tools.pointer_down(&mut canvas, (150.0, 165.5)));
        assert_eq!(tools.drag, DragState::Idle);
    }
}
