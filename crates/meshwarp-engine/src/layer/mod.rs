//! A reprojected raster layer attached to a host map.
//!
//! [`LayerBuilder`] validates the configuration; the resulting
//! [`RenderLoopController`] implements [`ViewportAware`], the interface the
//! host calls on lifecycle and viewport notifications.

mod controller;
mod events;
mod load;
mod options;

pub use controller::{LayerError, LayerState, RenderLoopController, ViewportAware};
pub use events::LayerEvent;
pub use load::LoadTicket;
pub use options::{ConfigError, LayerBuilder, LayerOptions};
