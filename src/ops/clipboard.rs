// ============================================================================
// CLIPBOARD OPERATIONS - copy, cut, paste built on the selection mask
// ============================================================================

use std::sync::Arc;

use image::{Rgba, RgbaImage};

use crate::canvas::CanvasState;

/// Pixels captured from the composite under the selection mask.  Always the
/// full canvas size; unselected pixels are transparent.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipboardItem {
    pub image: RgbaImage,
}

impl ClipboardItem {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Copy the selected pixels of the current composite into the clipboard.
/// Returns `false` (and leaves the clipboard alone) when there is no mask or
/// the mask selects nothing.  The mask is kept.
pub fn copy_selection(state: &mut CanvasState) -> bool {
    let Some(mask) = state.selection.as_ref() else {
        return false;
    };
    if mask.is_empty() {
        return false;
    }

    let composite = state.composite();
    let (w, h) = composite.dimensions();
    let clipped = RgbaImage::from_fn(w, h, |x, y| {
        if mask.contains(x, y) {
            *composite.get_pixel(x, y)
        } else {
            Rgba([0, 0, 0, 0])
        }
    });

    crate::log_info!("clipboard: copied {} selected pixels", mask.count());
    state.clipboard = Some(ClipboardItem { image: clipped });
    true
}

/// Copy, then drop the selection.  Layer pixels are not erased.
pub fn cut_selection(state: &mut CanvasState) -> bool {
    if !copy_selection(state) {
        return false;
    }
    state.clear_selection();
    true
}

/// Replace the active layer's image with the clipboard contents and reset the
/// layer's size to the clipboard's.  Position, rotation, flips and opacity are
/// kept.  Returns `false` when the clipboard is empty.
pub fn paste_clipboard(state: &mut CanvasState) -> bool {
    let Some(item) = state.clipboard.clone() else {
        return false;
    };
    let (w, h) = (item.width() as f32, item.height() as f32);
    let layer = state.active_layer_mut();
    layer.image = Some(Arc::new(item.image));
    layer.original = None;
    layer.width = w;
    layer.height = h;
    crate::log_info!("clipboard: pasted {}×{} into active layer", w, h);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{LayerPatch, LayerSlot};
    use crate::ops::selection::flood_fill_mask;

    fn state_with_square() -> CanvasState {
        let mut state = CanvasState::with_size(40, 30);
        let mut img = RgbaImage::from_pixel(40, 30, Rgba([10, 10, 10, 255]));
        for y in 5..9 {
            for x in 5..9 {
                img.put_pixel(x, y, Rgba([220, 30, 40, 255]));
            }
        }
        state.load_layer(LayerSlot::One, img, None);
        state.update_layer(LayerSlot::One, &LayerPatch::position(0.0, 0.0));
        state
    }

    fn select_square(state: &mut CanvasState) {
        let mask = flood_fill_mask(&state.composite(), (6, 6), 0);
        state.selection = mask;
    }

    #[test]
    fn copy_without_mask_is_a_no_op() {
        let mut state = state_with_square();
        assert!(!copy_selection(&mut state));
        assert!(state.clipboard.is_none());
    }

    #[test]
    fn copy_with_empty_mask_is_a_no_op() {
        let mut state = state_with_square();
        state.selection = Some(crate::ops::selection::SelectionMask::new(40, 30));
        assert!(!copy_selection(&mut state));
        assert!(state.clipboard.is_none());
    }

    #[test]
    fn copy_captures_only_masked_pixels() {
        let mut state = state_with_square();
        select_square(&mut state);
        assert!(copy_selection(&mut state));
        assert!(state.has_selection());

        let clip = &state.clipboard.as_ref().unwrap().image;
        assert_eq!(clip.dimensions(), (40, 30));
        assert_eq!(*clip.get_pixel(5, 5), Rgba([220, 30, 40, 255]));
        assert_eq!(*clip.get_pixel(8, 8), Rgba([220, 30, 40, 255]));
        assert_eq!(clip.get_pixel(4, 5)[3], 0);
        assert_eq!(clip.get_pixel(20, 20)[3], 0);
    }

    #[test]
    fn cut_clears_mask_but_keeps_layer_pixels() {
        let mut state = state_with_square();
        select_square(&mut state);
        let before = state.composite();
        assert!(cut_selection(&mut state));
        assert!(!state.has_selection());
        assert!(state.clipboard.is_some());
        assert_eq!(state.composite(), before);
    }

    #[test]
    fn paste_replaces_active_image_and_resets_size() {
        let mut state = state_with_square();
        select_square(&mut state);
        copy_selection(&mut state);

        state.set_active(LayerSlot::Two);
        state.update_layer(LayerSlot::Two, &LayerPatch::position(3.0, 4.0));
        assert!(paste_clipboard(&mut state));

        let l = state.layer(LayerSlot::Two);
        assert_eq!((l.width, l.height), (40.0, 30.0));
        assert_eq!((l.x, l.y), (3.0, 4.0));
        let img = l.image.as_ref().unwrap();
        assert_eq!(*img.get_pixel(6, 6), Rgba([220, 30, 40, 255]));
        assert_eq!(img.get_pixel(0, 0)[3], 0);
    }

    #[test]
    fn paste_with_empty_clipboard_is_a_no_op() {
        let mut state = state_with_square();
        let before = state.layer(LayerSlot::One).clone();
        assert!(!paste_clipboard(&mut state));
        assert_eq!(state.layer(LayerSlot::One), &before);
    }
}
