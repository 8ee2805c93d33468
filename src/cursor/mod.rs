//! Cursor state and presentation
//!
//! Visual cursor position is decoupled from packet arrival: the pipeline
//! writes a target, the render loop interpolates toward it every display
//! frame, and the result is handed to a renderer as plain data.
//!
//! # Architecture
//!
//! ```text
//! MotionPipeline ──target──┐
//!                          ▼
//! Render tick ──> CursorVisual::advance ──> magnet ──> CursorFrame ──> CursorRenderer
//! ```

mod presentation;
mod smoothing;

pub use presentation::{CursorFrame, CursorRenderer, CursorVisibility, NullRenderer};
pub use smoothing::CursorVisual;

#[cfg(test)]
pub use presentation::MockCursorRenderer;

/// Default display frame rate driving the render loop
pub const DEFAULT_RENDER_FPS: u32 = 60;
