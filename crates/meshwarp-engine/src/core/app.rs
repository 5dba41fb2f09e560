use winit::event::WindowEvent;

use crate::device::Gpu;

use super::ctx::{FrameCtx, WindowCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by hosts.
pub trait App {
    /// Called once the window and its GPU context exist; the place to create
    /// layer backends from [`Gpu::handle`] and attach them.
    fn on_start(&mut self, window: &WindowCtx<'_>, gpu: &Gpu<'_>) -> AppControl {
        let _ = (window, gpu);
        AppControl::Continue
    }

    /// Called for window events, before the runtime's own handling.
    fn on_window_event(&mut self, window: &WindowCtx<'_>, event: &WindowEvent) -> AppControl {
        let _ = (window, event);
        AppControl::Continue
    }

    /// Called once per rendered frame.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
