pub mod ai;
pub mod clipboard;
pub mod filters;
pub mod liquify;
pub mod selection;
pub mod transform;
