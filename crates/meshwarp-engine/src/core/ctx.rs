use std::time::Instant;

use winit::window::{Window, WindowId};

use crate::coords::{PixelBounds, Point2};
use crate::device::{Gpu, SurfaceErrorAction};

use super::app::AppControl;
use super::compose::CopyRegion;

/// Window handle and immutable window metadata.
pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Drawable size in physical pixels; layer pixel bounds use the same unit.
    pub fn physical_size(&self) -> Point2 {
        let size = self.window.inner_size();
        Point2::new(size.width as f64, size.height as f64)
    }

    pub fn request_redraw(&self) {
        self.window.request_redraw();
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub now: Instant,
    pub frame_index: u64,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Clears the surface, copies each layer canvas in at its bounds' offset
    /// (later layers on top), then presents.
    ///
    /// Canvases must be in the surface format, which is what layers allocate
    /// through [`GpuHandle`](crate::device::GpuHandle).
    pub fn composite(&mut self, clear: wgpu::Color, layers: &[(&wgpu::Texture, PixelBounds)]) -> AppControl {
        let mut frame = match self.gpu.begin_frame() {
            Ok(f) => f,
            Err(err) => {
                let action = self.gpu.handle_surface_error(err);
                if action == SurfaceErrorAction::Fatal {
                    log::error!("surface lost beyond recovery");
                    return AppControl::Exit;
                }
                log::debug!("frame skipped after surface error ({action:?})");
                return AppControl::Continue;
            }
        };

        let target = &frame.surface_texture.texture;
        let view = target.create_view(&wgpu::TextureViewDescriptor::default());

        // Clear pass, dropped before the copies are recorded.
        {
            let _rpass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("meshwarp clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
        }

        if self.gpu.can_composite() {
            let surface = (target.width(), target.height());
            for (canvas, bounds) in layers {
                let Some(region) = CopyRegion::clip(*bounds, (canvas.width(), canvas.height()), surface)
                else {
                    continue;
                };
                frame.encoder.copy_texture_to_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: canvas,
                        mip_level: 0,
                        origin: wgpu::Origin3d { x: region.src.0, y: region.src.1, z: 0 },
                        aspect: wgpu::TextureAspect::All,
                    },
                    wgpu::TexelCopyTextureInfo {
                        texture: target,
                        mip_level: 0,
                        origin: wgpu::Origin3d { x: region.dst.0, y: region.dst.1, z: 0 },
                        aspect: wgpu::TextureAspect::All,
                    },
                    wgpu::Extent3d {
                        width: region.size.0,
                        height: region.size.1,
                        depth_or_array_layers: 1,
                    },
                );
            }
        }

        self.window.window.pre_present_notify();
        self.gpu.submit(frame);
        AppControl::Continue
    }
}
