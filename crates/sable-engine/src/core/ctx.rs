use winit::window::{Window, WindowId};

use crate::device::{Gpu, RendererError};
use crate::render::{FrameStats, Renderer};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

/// Per-window handles and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Physical size in pixels, the coordinate space of draw calls.
    pub fn size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub renderer: &'a mut Renderer<Gpu<'w>>,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'w> FrameCtx<'_, 'w> {
    /// Runs `draw` between `begin` and `end` of one frame.
    ///
    /// Presentation failures that cannot be recovered end the app; anything
    /// else is logged and the next frame is attempted normally.
    pub fn draw<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&mut Renderer<Gpu<'w>>) -> Result<(), RendererError>,
    {
        match self.try_draw(draw) {
            Ok(stats) => {
                log::trace!(
                    "[{}] frame {}: {} draw calls",
                    self.renderer.label(),
                    self.time.frame_index,
                    stats.draw_calls
                );
                AppControl::Continue
            }
            Err(err @ RendererError::Presentation(_)) => {
                log::error!("[{}] {err}", self.renderer.label());
                AppControl::Exit
            }
            Err(err) => {
                log::error!("[{}] frame {} failed: {err}", self.renderer.label(), self.time.frame_index);
                AppControl::Continue
            }
        }
    }

    fn try_draw<F>(&mut self, draw: F) -> Result<FrameStats, RendererError>
    where
        F: FnOnce(&mut Renderer<Gpu<'w>>) -> Result<(), RendererError>,
    {
        self.renderer.begin()?;
        let drawn = draw(&mut *self.renderer);
        // The frame is closed even when drawing failed so the next begin works.
        let ended = self.renderer.end();
        drawn?;
        ended
    }
}
