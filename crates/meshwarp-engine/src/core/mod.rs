//! Core engine-facing contracts.
//!
//! This module defines the interface between the runtime (platform loop) and
//! the host application that owns layers. It keeps runtime internals out of
//! host code and provides a consistent per-frame context.

mod app;
mod compose;
mod ctx;

pub use app::{App, AppControl};
pub use compose::CopyRegion;
pub use ctx::{FrameCtx, WindowCtx};
