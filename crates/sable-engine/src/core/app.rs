use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::FrameCtx;
use crate::device::Gpu;
use crate::render::Renderer;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract driven by [`crate::window::Runtime`].
pub trait App {
    /// Called once after a window and its renderer exist. Create textures,
    /// shaders and render targets here; handles are per renderer.
    fn on_window_created(
        &mut self,
        window_id: WindowId,
        renderer: &mut Renderer<Gpu<'_>>,
    ) -> anyhow::Result<()> {
        let _ = (window_id, renderer);
        Ok(())
    }

    fn on_window_event(&mut self, window_id: WindowId, event: &WindowEvent) -> AppControl {
        let _ = (window_id, event);
        AppControl::Continue
    }

    /// Called when a window is about to close, before its renderer is dropped.
    fn on_window_closed(&mut self, window_id: WindowId) {
        let _ = window_id;
    }

    /// Called once per redraw per window.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
