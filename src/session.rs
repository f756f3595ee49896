//! Session scripts: a TOML description of the starting canvas plus an ordered
//! list of editing steps, replayed against the core headlessly.
//!
//! ```toml
//! blend_mode = "multiply"
//! active = 2
//!
//! [viewport]
//! size = [400.0, 300.0]
//!
//! [adjustments]
//! gamma = 1.4
//!
//! [[layers]]
//! slot = 1
//! image = "background.png"
//!
//! [[layers]]
//! slot = 2
//! image = "subject.jpg"
//! rotation = 45.0
//! opacity = 0.5
//!
//! [[steps]]
//! action = "drag"
//! tool = "move"
//! path = [[100.0, 100.0], [140.0, 90.0]]
//!
//! [[steps]]
//! action = "wand"
//! at = [10.0, 10.0]
//! tolerance = 20
//! ```
//!
//! Relative image paths resolve against the session file's directory.
//! Pointer positions are canvas pixels unless a `[viewport]` is given, in
//! which case they are display coordinates of a canvas shown at `size`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::canvas::{BlendMode, CanvasState, LayerPatch, LayerSlot};
use crate::components::tools::{Tool, ToolsState, ViewportMapping};
use crate::error::{EditorError, Result};
use crate::i18n::Catalog;
use crate::ops::clipboard;
use crate::ops::filters::Adjustments;
use crate::tr;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Session {
    pub blend_mode: BlendMode,
    /// Active layer id (1 or 2).
    pub active: Option<u8>,
    pub viewport: Option<Viewport>,
    pub adjustments: Adjustments,
    pub layers: Vec<LayerSpec>,
    pub steps: Vec<Step>,
}

/// Where the canvas is displayed, for scripts recorded in display space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Viewport {
    pub size: [f32; 2],
    #[serde(default)]
    pub origin: [f32; 2],
}

/// A layer to load before the steps run, with optional placement overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub slot: u8,
    pub image: PathBuf,
    #[serde(flatten)]
    pub patch: LayerPatch,
}

/// One scripted action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Press at the first point, move through the rest, release.
    Drag { tool: Tool, path: Vec<[f32; 2]> },
    Wand {
        at: [f32; 2],
        #[serde(default)]
        tolerance: Option<u8>,
    },
    Copy,
    Cut,
    Paste,
    ClearSelection,
    Swap,
    SetActive { slot: u8 },
    SetBlend { mode: BlendMode },
    Adjust {
        #[serde(default)]
        brightness: Option<f32>,
        #[serde(default)]
        contrast: Option<f32>,
        #[serde(default)]
        gamma: Option<f32>,
        #[serde(default)]
        sharpness: Option<f32>,
    },
    Update {
        slot: u8,
        #[serde(flatten)]
        patch: LayerPatch,
    },
    Load { slot: u8, image: PathBuf },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::Drag { .. } => "drag",
            Step::Wand { .. } => "wand",
            Step::Copy => "copy",
            Step::Cut => "cut",
            Step::Paste => "paste",
            Step::ClearSelection => "clear_selection",
            Step::Swap => "swap",
            Step::SetActive { .. } => "set_active",
            Step::SetBlend { .. } => "set_blend",
            Step::Adjust { .. } => "adjust",
            Step::Update { .. } => "update",
            Step::Load { .. } => "load",
        }
    }

    /// Localized description, using the tool and blend-mode labels.
    pub fn label(&self, catalog: &Catalog) -> String {
        match self {
            Step::Drag { tool, .. } => {
                tr!(catalog, "action.drag", tool = catalog.get(tool.label_key()))
            }
            Step::Wand { .. } => catalog.get(Tool::Wand.label_key()),
            Step::SetBlend { mode } => {
                tr!(catalog, "action.set_blend", mode = catalog.get(mode.label_key()))
            }
            Step::SetActive { slot } => tr!(catalog, "action.set_active", slot = slot),
            Step::Update { slot, .. } => tr!(catalog, "action.update", slot = slot),
            Step::Load { slot, .. } => tr!(catalog, "action.load", slot = slot),
            other => catalog.get(&format!("action.{}", other.name())),
        }
    }
}

/// Something worth reporting while a session runs.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Loaded { slot: LayerSlot, path: PathBuf },
    Step { index: usize, step: Step },
    Selected { count: usize },
    NothingSelected,
    ClipboardEmpty,
    OutsideCanvas,
}

impl Event {
    pub fn describe(&self, catalog: &Catalog) -> String {
        match self {
            Event::Loaded { slot, path } => {
                tr!(catalog, "status.loaded", path = path.display(), slot = slot.id())
            }
            Event::Step { index, step } => {
                tr!(catalog, "status.step", index = index, action = step.label(catalog))
            }
            Event::Selected { count } => tr!(catalog, "status.selection", count = count),
            Event::NothingSelected => tr!(catalog, "status.nothing_selected"),
            Event::ClipboardEmpty => tr!(catalog, "status.clipboard_empty"),
            Event::OutsideCanvas => tr!(catalog, "status.outside_canvas"),
        }
    }
}

fn slot(id: u8) -> Result<LayerSlot> {
    LayerSlot::from_id(id)
        .ok_or_else(|| EditorError::Session(format!("no layer {} (expected 1 or 2)", id)))
}

fn resolve(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) }
}

impl Session {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Set up the starting canvas: load layers, apply their overrides, then
    /// the canvas-wide settings.  No steps run yet.
    pub fn build(&self, base_dir: &Path) -> Result<Replay> {
        let mut replay = Replay::new(CanvasState::new(), base_dir);
        if let Some(vp) = self.viewport {
            replay.viewport = Some(ViewportMapping {
                origin: (vp.origin[0], vp.origin[1]),
                displayed: (vp.size[0], vp.size[1]),
                canvas: (replay.canvas.width, replay.canvas.height),
            });
        }
        for layer in &self.layers {
            let target = slot(layer.slot)?;
            replay.load(target, &layer.image)?;
            replay.canvas.update_layer(target, &layer.patch);
        }
        replay.canvas.set_blend_mode(self.blend_mode);
        replay.canvas.set_adjustments(self.adjustments);
        if let Some(id) = self.active {
            replay.canvas.set_active(slot(id)?);
        }
        Ok(replay)
    }

    /// Build the canvas and replay every step.
    pub fn run(&self, base_dir: &Path) -> Result<Replay> {
        let mut replay = self.build(base_dir)?;
        for (i, step) in self.steps.iter().enumerate() {
            replay.apply(i + 1, step)?;
        }
        Ok(replay)
    }
}

/// A canvas and tool state being driven by scripted steps.
#[derive(Clone, Debug)]
pub struct Replay {
    base_dir: PathBuf,
    viewport: Option<ViewportMapping>,
    pub canvas: CanvasState,
    pub tools: ToolsState,
    /// Everything reported so far, in order.
    pub events: Vec<Event>,
}

impl Replay {
    pub fn new(canvas: CanvasState, base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            viewport: None,
            canvas,
            tools: ToolsState::default(),
            events: Vec::new(),
        }
    }

    fn point(&self, p: [f32; 2]) -> (f32, f32) {
        match &self.viewport {
            Some(vp) => vp.to_canvas((p[0], p[1])),
            None => (p[0], p[1]),
        }
    }

    fn load(&mut self, target: LayerSlot, image: &Path) -> Result<()> {
        let (decoded, bytes) = crate::io::load_image_file(&resolve(&self.base_dir, image))?;
        self.canvas.load_layer(target, decoded, Some(bytes));
        self.events.push(Event::Loaded {
            slot: target,
            path: image.to_path_buf(),
        });
        Ok(())
    }

    /// Apply step number `index` (1-based, for reporting).
    pub fn apply(&mut self, index: usize, step: &Step) -> Result<()> {
        crate::log_info!("session: step {} ({})", index, step.name());
        self.events.push(Event::Step {
            index,
            step: step.clone(),
        });

        match step {
            Step::Drag { tool, path } => {
                let Some((first, rest)) = path.split_first() else {
                    return Err(EditorError::Session("drag needs at least one point".into()));
                };
                self.tools.set_tool(*tool);
                let start = self.point(*first);
                self.tools.pointer_down(&mut self.canvas, start);
                for p in rest {
                    let pos = self.point(*p);
                    self.tools.pointer_move(&mut self.canvas, pos);
                }
                self.tools.pointer_up();
            }
            Step::Wand { at, tolerance } => {
                self.tools.set_tool(Tool::Wand);
                if let Some(t) = tolerance {
                    self.tools.wand_tolerance = *t;
                }
                let pos = self.point(*at);
                if self.tools.pointer_down(&mut self.canvas, pos) {
                    let count = self.canvas.selection.as_ref().map_or(0, |m| m.count());
                    self.events.push(Event::Selected { count });
                } else {
                    crate::log_warn!(
                        "session: wand at ({}, {}) is outside the canvas",
                        pos.0,
                        pos.1
                    );
                    self.events.push(Event::OutsideCanvas);
                }
            }
            Step::Copy => {
                if !clipboard::copy_selection(&mut self.canvas) {
                    self.events.push(Event::NothingSelected);
                }
            }
            Step::Cut => {
                if !clipboard::cut_selection(&mut self.canvas) {
                    self.events.push(Event::NothingSelected);
                }
            }
            Step::Paste => {
                if !clipboard::paste_clipboard(&mut self.canvas) {
                    self.events.push(Event::ClipboardEmpty);
                }
            }
            Step::ClearSelection => self.canvas.clear_selection(),
            Step::Swap => self.canvas.swap_layers(),
            Step::SetActive { slot: id } => self.canvas.set_active(slot(*id)?),
            Step::SetBlend { mode } => self.canvas.set_blend_mode(*mode),
            Step::Adjust { brightness, contrast, gamma, sharpness } => {
                let mut adj = self.canvas.adjustments;
                if let Some(v) = brightness {
                    adj.brightness = *v;
                }
                if let Some(v) = contrast {
                    adj.contrast = *v;
                }
                if let Some(v) = gamma {
                    adj.gamma = *v;
                }
                if let Some(v) = sharpness {
                    adj.sharpness = *v;
                }
                self.canvas.set_adjustments(adj);
            }
            Step::Update { slot: id, patch } => self.canvas.update_layer(slot(*id)?, patch),
            Step::Load { slot: id, image } => self.load(slot(*id)?, image)?,
        }
        Ok(())
    }
}
