//! Visionary raster core: a two-layer compositor with move/resize/rotate and
//! magic-wand tools, live brightness/contrast/gamma/sharpen filters,
//! selection copy/cut/paste, and a destructive liquify brush.

#[macro_use]
pub mod logger;
pub mod canvas;
pub mod cli;
pub mod components;
pub mod error;
pub mod i18n;
pub mod io;
pub mod ops;
pub mod session;

pub use canvas::{BlendMode, CanvasState, Layer, LayerPatch, LayerSlot};
pub use components::tools::{Tool, ToolsState, ViewportMapping};
pub use error::{EditorError, Result};
pub use ops::liquify::WarpCanvas;
