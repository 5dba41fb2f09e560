use std::time::Instant;

use meshwarp_engine::core::{App, AppControl, FrameCtx, WindowCtx};
use meshwarp_engine::coords::Point2;
use meshwarp_engine::device::Gpu;
use meshwarp_engine::layer::{LayerBuilder, LayerState, RenderLoopController, ViewportAware};
use meshwarp_engine::render::{MeshRenderer, RasterImage};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::loader::Loader;
use crate::map::{MapView, ZoomAnimation};

const BACKGROUND: wgpu::Color = wgpu::Color {
    r: 0.08,
    g: 0.09,
    b: 0.11,
    a: 1.0,
};

/// Pixel-scroll distance that counts as one zoom level.
const PIXELS_PER_ZOOM: f64 = 240.0;

/// Plays the host map: owns the view, forwards notifications to the layer
/// and composites its canvas.
pub struct MapHost {
    /// Consumed in `on_start`, once a GPU exists.
    builder: Option<LayerBuilder>,
    layer: Option<RenderLoopController<MeshRenderer>>,
    /// Bound after every attach when there is no image to load.
    fallback: Option<RasterImage>,

    map: MapView,
    size: Point2,
    animation: Option<ZoomAnimation>,

    drag_from: Option<(f64, f64)>,
    cursor: (f64, f64),

    loader: Loader,
}

impl MapHost {
    pub fn new(builder: LayerBuilder, fallback: Option<RasterImage>, map: MapView) -> Self {
        Self {
            builder: Some(builder),
            layer: None,
            fallback,
            map,
            size: Point2::zero(),
            animation: None,
            drag_from: None,
            cursor: (0.0, 0.0),
            loader: Loader::new(),
        }
    }

    fn attach(&mut self) {
        let view = self.map.host_view(self.size);
        let Some(layer) = self.layer.as_mut() else {
            return;
        };

        if let Err(e) = layer.on_attach(view) {
            log::error!("layer attach failed: {e}");
            if let Some(source) = std::error::Error::source(&e) {
                log::error!("  caused by: {source}");
            }
            return;
        }

        if let Some(ticket) = layer.take_load_request() {
            log::info!("loading {}", ticket.uri());
            self.loader.spawn(ticket);
        } else if let Some(raster) = self.fallback.as_ref() {
            if let Err(e) = layer.set_raster(raster) {
                log::warn!("could not bind fallback raster: {e}");
            }
        }
    }

    fn toggle_attached(&mut self) {
        let attached = self
            .layer
            .as_ref()
            .is_some_and(|l| l.state() != LayerState::Detached);
        if attached {
            self.animation = None;
            if let Some(layer) = self.layer.as_mut() {
                layer.on_detach();
            }
            log::info!("layer detached");
        } else {
            self.attach();
        }
    }

    fn viewport_changed(&mut self) {
        let view = self.map.host_view(self.size);
        if let Some(layer) = self.layer.as_mut() {
            layer.on_viewport_changed(view);
        }
    }

    fn start_zoom(&mut self, levels: f64, now: Instant) {
        let (from, to) = match self.animation {
            Some(anim) => (anim.sample(now).unwrap_or(anim.target()), anim.target() + levels),
            None => (self.map.zoom, self.map.zoom + levels),
        };
        self.animation = Some(ZoomAnimation::new(from, to, now));
    }

    /// Advances the zoom animation; the settled view is reported as a
    /// viewport change after the animation ends.
    fn step_animation(&mut self, now: Instant) {
        let Some(anim) = self.animation else {
            return;
        };
        let center = self.map.center;

        match anim.sample(now) {
            Some(zoom) => {
                self.map.zoom = zoom;
                if let Some(layer) = self.layer.as_mut() {
                    layer.on_zoom_animation_tick(center, zoom);
                }
            }
            None => {
                self.animation = None;
                self.map.zoom = anim.target();
                if let Some(layer) = self.layer.as_mut() {
                    layer.on_zoom_animation_end();
                }
                self.viewport_changed();
            }
        }
    }

    fn finish_loads(&mut self) {
        let Some(layer) = self.layer.as_mut() else {
            return;
        };
        for (ticket, result) in self.loader.poll() {
            layer.finish_load(ticket, result);
        }
    }
}

impl App for MapHost {
    fn on_start(&mut self, window: &WindowCtx<'_>, gpu: &Gpu<'_>) -> AppControl {
        self.size = window.physical_size();

        let Some(builder) = self.builder.take() else {
            return AppControl::Continue;
        };
        if !gpu.can_composite() {
            log::warn!("this surface cannot receive layer canvases; the map will stay empty");
        }

        match builder.build(MeshRenderer::new(gpu.handle())) {
            Ok(layer) => self.layer = Some(layer),
            Err(e) => {
                log::error!("invalid layer configuration: {e}");
                return AppControl::Exit;
            }
        }

        self.attach();
        AppControl::Continue
    }

    fn on_window_event(&mut self, window: &WindowCtx<'_>, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::Resized(_) => {
                self.size = window.physical_size();
                self.viewport_changed();
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = (position.x, position.y);
                if let Some((x, y)) = self.drag_from {
                    self.map.pan_by_pixels(position.x - x, position.y - y);
                    self.drag_from = Some(self.cursor);
                    if self.animation.is_none() {
                        self.viewport_changed();
                    }
                }
            }

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => match state {
                ElementState::Pressed => self.drag_from = Some(self.cursor),
                ElementState::Released => self.drag_from = None,
            },

            WindowEvent::MouseWheel { delta, .. } => {
                let levels = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y as f64,
                    MouseScrollDelta::PixelDelta(p) => p.y / PIXELS_PER_ZOOM,
                };
                if levels != 0.0 {
                    self.start_zoom(levels, Instant::now());
                }
            }

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                match event.physical_key {
                    PhysicalKey::Code(KeyCode::KeyD) => self.toggle_attached(),
                    PhysicalKey::Code(KeyCode::Escape) => return AppControl::Exit,
                    _ => {}
                }
            }

            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        self.finish_loads();
        self.step_animation(ctx.now);

        let canvas = self.layer.as_ref().and_then(|l| l.backend().canvas());
        match canvas {
            Some(layer) => ctx.composite(BACKGROUND, &[layer]),
            None => ctx.composite(BACKGROUND, &[]),
        }
    }
}
