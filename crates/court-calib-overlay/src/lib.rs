//! Overlay drawn on top of the playing video: the projected court grid, the
//! net line, stored annotations with their zone labels, and the box being
//! dragged.
//!
//! The renderer is stateless per call. It produces a [`Scene`] of
//! display-space primitives that a UI can paint directly, or export with
//! [`Scene::to_svg`].

mod config;
mod renderer;
mod scene;

pub use config::{OverlayConfig, OverlayConfigError};
pub use renderer::{OverlayInput, OverlayRenderer, RenderTrigger};
pub use scene::{DrawItem, Layer, Primitive, Scene, Style};
