// ============================================================================
// AI OPERATIONS - background removal through an external service
// ============================================================================
//
// The editor never runs inference itself.  A `BackgroundRemover` receives the
// active layer's original encoded bytes and answers with an encoded image;
// the decoded result replaces the layer's source, geometry untouched.
// ============================================================================

use std::sync::Arc;

use crate::canvas::CanvasState;
use crate::error::{EditorError, Result};

/// An external collaborator able to strip the background from an image.
pub trait BackgroundRemover {
    /// `original` is the encoded file the layer was loaded from.  The answer
    /// is an encoded image (PNG, JPEG, ...).
    fn remove_background(&self, original: &[u8]) -> Result<Vec<u8>>;
}

impl<F> BackgroundRemover for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>>,
{
    fn remove_background(&self, original: &[u8]) -> Result<Vec<u8>> {
        self(original)
    }
}

/// Run `remover` on the active layer.  Any failure is logged and leaves the
/// layer exactly as it was.  Returns `true` when the image was replaced.
pub fn remove_background_active(state: &mut CanvasState, remover: &dyn BackgroundRemover) -> bool {
    let slot = state.active;
    let Some(original) = state.active_layer().original.clone() else {
        crate::log_warn!("remove background: layer {} has no source file", slot.id());
        return false;
    };

    let decoded = remover
        .remove_background(&original)
        .and_then(|bytes| crate::io::decode_image(&bytes).map(|img| (img, bytes)));

    match decoded {
        Ok((image, bytes)) => {
            crate::log_info!(
                "remove background: layer {} replaced with {}×{} result",
                slot.id(),
                image.width(),
                image.height()
            );
            let layer = state.active_layer_mut();
            layer.image = Some(Arc::new(image));
            layer.original = Some(Arc::new(bytes));
            true
        }
        Err(e) => {
            let e = match e {
                EditorError::BackgroundRemoval(_) => e,
                other => EditorError::BackgroundRemoval(other.to_string()),
            };
            crate::log_err!("layer {}: {}", slot.id(), e);
            false
        }
    }
}
