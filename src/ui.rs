//! Presentation of batch runs.
//!
//! The renderer is a pure function of a [`RunState`](crate::batch::RunState)
//! snapshot. The terminal dashboard and the plain reporter only decide when
//! to draw.

pub mod plain;
pub mod render;
pub mod terminal;
pub mod theme;

pub use plain::PlainReporter;
pub use render::Renderer;
pub use terminal::{run_dashboard, DashboardExit};
pub use theme::{Role, Theme};
