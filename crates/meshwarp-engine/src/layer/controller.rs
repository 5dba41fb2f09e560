use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use meshwarp_mesh::{ControlQuad, MeshError, MeshStats, Projector, SEED_TRIANGLES};
use thiserror::Error;

use crate::coords::{HostView, Point2, ViewportState};
use crate::render::{GraphicsError, RasterBackend, RasterImage, ResourceLoadError};

use super::events::{LayerEvent, Listener};
use super::load::{self, LoadTicket};
use super::options::{ConfigError, LayerOptions};

/// Failure that aborts attach (or construction). Nothing stays allocated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to build reprojection mesh")]
    Mesh(#[from] MeshError),

    #[error("failed to set up GPU resources")]
    Graphics(#[from] GraphicsError),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LayerState {
    Detached,
    Idle,
    Animating,
}

/// Host map → layer notifications.
///
/// Hosts call these from their UI thread; every call is handled
/// synchronously.
pub trait ViewportAware {
    /// The layer was added to the map, currently showing `view`.
    fn on_attach(&mut self, view: HostView) -> Result<(), LayerError>;

    /// The layer was removed. Safe at any time.
    fn on_detach(&mut self);

    /// Center, zoom or map size settled on new values.
    fn on_viewport_changed(&mut self, view: HostView);

    /// One frame of an in-progress zoom animation.
    fn on_zoom_animation_tick(&mut self, center: Point2, zoom: f64);

    fn on_zoom_animation_end(&mut self);
}

/// Drives a [`RasterBackend`] from host notifications.
///
/// The mesh is built once per attach and never rebuilt on pan or zoom.
pub struct RenderLoopController<B: RasterBackend> {
    backend: B,
    quad: ControlQuad,
    projector: Box<dyn Projector>,
    image: Option<String>,
    options: LayerOptions,
    listener: Option<Listener>,

    state: LayerState,
    viewport: Option<ViewportState>,
    mesh_stats: Option<MeshStats>,

    /// Ticket not yet collected by the host.
    pending_load: Option<LoadTicket>,
    /// Liveness token of the newest issued ticket.
    current_load: Option<Arc<AtomicBool>>,
    /// Bound raster whose `Load` waits for the first successful draw.
    unannounced_load: Option<String>,
}

impl<B: RasterBackend> RenderLoopController<B> {
    pub(crate) fn new(
        backend: B,
        quad: ControlQuad,
        projector: Box<dyn Projector>,
        image: Option<String>,
        options: LayerOptions,
        listener: Option<Listener>,
    ) -> Self {
        Self {
            backend,
            quad,
            projector,
            image,
            options,
            listener,
            state: LayerState::Detached,
            viewport: None,
            mesh_stats: None,
            pending_load: None,
            current_load: None,
            unannounced_load: None,
        }
    }

    #[inline]
    pub fn state(&self) -> LayerState {
        self.state
    }

    /// Viewport of the last draw attempt; `None` while detached.
    #[inline]
    pub fn viewport(&self) -> Option<ViewportState> {
        self.viewport
    }

    /// Statistics of the current attach's mesh.
    #[inline]
    pub fn mesh_stats(&self) -> Option<MeshStats> {
        self.mesh_stats
    }

    #[inline]
    pub fn options(&self) -> &LayerOptions {
        &self.options
    }

    #[inline]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Hands out the image load started by the last attach, once.
    pub fn take_load_request(&mut self) -> Option<LoadTicket> {
        self.pending_load.take()
    }

    /// Completes a load. Stale tickets (detached layer, superseded load) are
    /// ignored without touching the GPU.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<RasterImage, ResourceLoadError>) {
        let current = self
            .current_load
            .as_ref()
            .is_some_and(|token| ticket.same_load(token));
        if !current || !ticket.is_live() || self.state == LayerState::Detached {
            log::debug!("ignoring stale load of {}", ticket.uri());
            return;
        }
        if let Some(token) = self.current_load.take() {
            load::revoke(&token);
        }

        let uri = ticket.uri().to_string();
        let bound = result.and_then(|raster| {
            self.backend
                .replace_raster(&raster)
                .map_err(ResourceLoadError::Upload)
        });

        match bound {
            Ok(()) => {
                log::debug!("raster {uri} bound");
                self.unannounced_load = Some(uri);
                self.redraw();
            }
            Err(error) => {
                log::warn!("failed to load raster {uri}: {error}");
                self.emit(&LayerEvent::LoadFailed { uri, error });
            }
        }
    }

    /// Binds an in-memory raster directly (e.g. a generated one) and redraws.
    pub fn set_raster(&mut self, raster: &RasterImage) -> Result<(), GraphicsError> {
        if self.state == LayerState::Detached {
            return Err(GraphicsError::NotConfigured);
        }
        self.backend.replace_raster(raster)?;
        self.redraw();
        Ok(())
    }

    // ── internals ──────────────────────────────────────────────────────────

    fn set_state(&mut self, next: LayerState) {
        if self.state != next {
            log::debug!("layer {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn emit(&mut self, event: &LayerEvent) {
        if let Some(listener) = self.listener.as_mut() {
            listener(event);
        }
    }

    /// Uniforms then one draw, or a skipped frame. A pending `Load` is
    /// announced after the first draw that succeeds.
    fn redraw(&mut self) {
        let Some(viewport) = self.viewport else {
            log::debug!("no viewport yet; frame skipped");
            return;
        };

        let uniforms = match self.options.projection.uniforms(&viewport) {
            Ok(u) => u,
            Err(e) => {
                log::warn!("frame skipped: {e}");
                return;
            }
        };

        self.backend.set_viewport_uniforms(uniforms);
        if let Err(e) = self.backend.draw() {
            log::warn!("draw failed: {e}");
            return;
        }

        if let Some(uri) = self.unannounced_load.take() {
            self.emit(&LayerEvent::Load { uri });
        }
    }

    fn apply_view(&mut self, view: HostView) {
        let next = ViewportState::from_host(view, self.options.padding);
        let resized = self.viewport.is_none_or(|prev| prev.bounds != next.bounds);
        self.viewport = Some(next);
        if resized {
            self.backend.resize(next.bounds);
        }
    }

    fn start_load(&mut self) {
        if let Some(old) = self.current_load.take() {
            load::revoke(&old);
        }
        self.pending_load = None;

        if let Some(uri) = self.image.as_deref() {
            let (ticket, token) = LoadTicket::issue(uri);
            self.current_load = Some(token);
            self.pending_load = Some(ticket);
        }
    }
}

impl<B: RasterBackend> ViewportAware for RenderLoopController<B> {
    fn on_attach(&mut self, view: HostView) -> Result<(), LayerError> {
        if self.state != LayerState::Detached {
            log::debug!("attach ignored; layer already attached");
            return Ok(());
        }

        let mesh = meshwarp_mesh::build_with_max_depth(
            &self.quad,
            &self.options.source_uv,
            &SEED_TRIANGLES,
            self.projector.as_ref(),
            self.options.error_tolerance,
            self.options.max_depth,
        )?;

        self.backend.configure(
            &mesh,
            &self.options.fragment_shader,
            &RasterImage::transparent(),
        )?;

        log::info!(
            "layer attached: {} vertices, {} triangles",
            mesh.stats.vertices,
            mesh.stats.triangles
        );
        self.mesh_stats = Some(mesh.stats);
        self.set_state(LayerState::Idle);
        self.emit(&LayerEvent::MeshReady(mesh.stats));

        self.start_load();
        self.apply_view(view);
        self.redraw();
        Ok(())
    }

    fn on_detach(&mut self) {
        if let Some(token) = self.current_load.take() {
            load::revoke(&token);
        }
        self.pending_load = None;
        self.unannounced_load = None;

        if self.state == LayerState::Detached {
            return;
        }
        self.backend.teardown();
        self.viewport = None;
        self.mesh_stats = None;
        self.set_state(LayerState::Detached);
    }

    fn on_viewport_changed(&mut self, view: HostView) {
        match self.state {
            LayerState::Detached => {}
            LayerState::Animating => {
                // The host reports the settled view after the animation ends.
                log::debug!("viewport change during zoom animation dropped");
            }
            LayerState::Idle => {
                self.apply_view(view);
                self.redraw();
            }
        }
    }

    fn on_zoom_animation_tick(&mut self, center: Point2, zoom: f64) {
        if self.state == LayerState::Detached {
            return;
        }
        let Some(viewport) = self.viewport.as_mut() else {
            log::debug!("zoom tick without pixel bounds dropped");
            return;
        };
        viewport.center = center;
        viewport.zoom = zoom;

        self.set_state(LayerState::Animating);
        self.redraw();
    }

    fn on_zoom_animation_end(&mut self) {
        if self.state == LayerState::Animating {
            self.set_state(LayerState::Idle);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use meshwarp_mesh::{MeshOutput, Point};

    use super::*;
    use crate::coords::PixelBounds;
    use crate::layer::LayerBuilder;
    use crate::render::shader;
    use crate::view::UniformPair;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum Call {
        Configure { vertices: usize, triangles: usize, raster: (u32, u32) },
        ReplaceRaster((u32, u32)),
        Resize(PixelBounds),
        Uniforms(UniformPair),
        Draw,
        Teardown,
    }

    /// Backend that records every call instead of touching a GPU.
    #[derive(Default)]
    pub(crate) struct RecordingBackend {
        pub calls: Vec<Call>,
        pub fail_configure: Option<GraphicsError>,
        pub fail_draw: Option<GraphicsError>,
        configured: bool,
    }

    impl RasterBackend for RecordingBackend {
        fn configure(
            &mut self,
            mesh: &MeshOutput,
            fragment_shader: &str,
            raster: &RasterImage,
        ) -> Result<(), GraphicsError> {
            if let Some(e) = self.fail_configure.clone() {
                return Err(e);
            }
            shader::compose(fragment_shader)?;
            self.configured = true;
            self.calls.push(Call::Configure {
                vertices: mesh.vertex_count(),
                triangles: mesh.triangle_count(),
                raster: (raster.width(), raster.height()),
            });
            Ok(())
        }

        fn replace_raster(&mut self, raster: &RasterImage) -> Result<(), GraphicsError> {
            if !self.configured {
                return Err(GraphicsError::NotConfigured);
            }
            self.calls.push(Call::ReplaceRaster((raster.width(), raster.height())));
            Ok(())
        }

        fn resize(&mut self, bounds: PixelBounds) {
            self.calls.push(Call::Resize(bounds));
        }

        fn set_viewport_uniforms(&mut self, uniforms: UniformPair) {
            self.calls.push(Call::Uniforms(uniforms));
        }

        fn draw(&mut self) -> Result<(), GraphicsError> {
            if !self.configured {
                return Err(GraphicsError::NotConfigured);
            }
            if let Some(e) = self.fail_draw.clone() {
                return Err(e);
            }
            self.calls.push(Call::Draw);
            Ok(())
        }

        fn teardown(&mut self) {
            self.configured = false;
            self.calls.push(Call::Teardown);
        }
    }

    const UNIT: [Point; 4] = [[0.0, 1.0], [0.0, 0.0], [1.0, 1.0], [1.0, 0.0]];

    type Events = Rc<RefCell<Vec<String>>>;

    fn layer_with(
        configure: impl FnOnce(LayerBuilder) -> LayerBuilder,
    ) -> (RenderLoopController<RecordingBackend>, Events) {
        let events: Events = Rc::default();
        let sink = Rc::clone(&events);
        let builder = LayerBuilder::new()
            .control_points(UNIT)
            .projector(|p: Point| p)
            .on_event(move |e| {
                sink.borrow_mut().push(match e {
                    LayerEvent::MeshReady(stats) => format!("mesh-ready {}", stats.triangles),
                    LayerEvent::Load { uri } => format!("load {uri}"),
                    LayerEvent::LoadFailed { uri, .. } => format!("load-failed {uri}"),
                });
            });
        let layer = configure(builder).build(RecordingBackend::default()).unwrap();
        (layer, events)
    }

    fn layer() -> (RenderLoopController<RecordingBackend>, Events) {
        layer_with(|b| b)
    }

    fn view(w: f64, h: f64) -> HostView {
        HostView::new(Point2::new(0.0, 0.0), 2.0, Point2::new(w, h))
    }

    fn drain(layer: &mut RenderLoopController<RecordingBackend>) -> Vec<Call> {
        std::mem::take(&mut layer.backend.calls)
    }

    fn raster(w: u32, h: u32) -> RasterImage {
        RasterImage::from_rgba8(w, h, vec![255; (w * h * 4) as usize]).unwrap()
    }

    fn assert_uniforms_then_draw(calls: &[Call]) {
        assert_eq!(calls.len(), 2, "{calls:?}");
        assert!(matches!(calls[0], Call::Uniforms(_)));
        assert_eq!(calls[1], Call::Draw);
    }

    #[test]
    fn attach_builds_configures_and_draws() {
        let (mut layer, events) = layer();
        layer.on_attach(view(800.0, 600.0)).unwrap();

        assert_eq!(layer.state(), LayerState::Idle);
        let calls = drain(&mut layer);
        assert_eq!(
            calls[0],
            Call::Configure { vertices: 4, triangles: 2, raster: (1, 1) }
        );
        assert_eq!(
            calls[1],
            Call::Resize(PixelBounds::padded(Point2::new(800.0, 600.0), 0.1))
        );
        assert_uniforms_then_draw(&calls[2..]);
        assert_eq!(*events.borrow(), vec!["mesh-ready 2".to_string()]);
        assert_eq!(layer.mesh_stats().map(|s| s.vertices), Some(4));
    }

    #[test]
    fn uniforms_track_the_viewport() {
        let (mut layer, _) = layer();
        layer.on_attach(view(800.0, 600.0)).unwrap();
        let calls = drain(&mut layer);
        let Call::Uniforms(u) = calls[2] else {
            panic!("expected uniforms, got {calls:?}");
        };
        let expected = layer
            .options()
            .projection
            .uniforms(&layer.viewport().unwrap())
            .unwrap();
        assert_eq!(u, expected);
        assert_eq!(u.center, [0.0, 0.0]);
    }

    #[test]
    fn viewport_change_while_idle_redraws() {
        let (mut layer, _) = layer();
        layer.on_attach(view(800.0, 600.0)).unwrap();
        drain(&mut layer);

        // Pan only: same bounds, no resize.
        layer.on_viewport_changed(HostView::new(Point2::new(1000.0, 0.0), 2.0, Point2::new(800.0, 600.0)));
        assert_uniforms_then_draw(&drain(&mut layer));

        layer.on_viewport_changed(view(1024.0, 768.0));
        let calls = drain(&mut layer);
        assert!(matches!(calls[0], Call::Resize(_)));
        assert_uniforms_then_draw(&calls[1..]);
        assert_eq!(layer.state(), LayerState::Idle);
    }

    #[test]
    fn animation_ticks_reuse_established_bounds() {
        let (mut layer, _) = layer();
        layer.on_attach(view(800.0, 600.0)).unwrap();
        let bounds = layer.viewport().unwrap().bounds;
        drain(&mut layer);

        layer.on_zoom_animation_tick(Point2::new(5.0, 5.0), 2.5);
        assert_eq!(layer.state(), LayerState::Animating);
        assert_uniforms_then_draw(&drain(&mut layer));

        let vp = layer.viewport().unwrap();
        assert_eq!(vp.bounds, bounds);
        assert_eq!(vp.center, Point2::new(5.0, 5.0));
        assert_eq!(vp.zoom, 2.5);
    }

    #[test]
    fn viewport_change_during_animation_is_dropped() {
        let (mut layer, _) = layer();
        layer.on_attach(view(800.0, 600.0)).unwrap();
        layer.on_zoom_animation_tick(Point2::new(0.0, 0.0), 2.2);
        drain(&mut layer);

        layer.on_viewport_changed(view(1024.0, 768.0));
        assert!(drain(&mut layer).is_empty());
        assert_eq!(layer.state(), LayerState::Animating);

        layer.on_zoom_animation_end();
        assert_eq!(layer.state(), LayerState::Idle);
        assert!(drain(&mut layer).is_empty());

        layer.on_viewport_changed(view(1024.0, 768.0));
        let calls = drain(&mut layer);
        assert!(matches!(calls[0], Call::Resize(_)));
        assert_uniforms_then_draw(&calls[1..]);
    }

    #[test]
    fn notifications_while_detached_are_ignored() {
        let (mut layer, _) = layer();
        layer.on_viewport_changed(view(800.0, 600.0));
        layer.on_zoom_animation_tick(Point2::new(1.0, 1.0), 3.0);
        layer.on_zoom_animation_end();
        layer.on_detach();

        assert_eq!(layer.state(), LayerState::Detached);
        assert!(layer.backend().calls.is_empty());
    }

    #[test]
    fn zero_area_viewport_skips_the_draw() {
        let (mut layer, _) = layer();
        layer.on_attach(view(0.0, 0.0)).unwrap();

        let calls = drain(&mut layer);
        assert_eq!(calls.len(), 2, "{calls:?}");
        assert!(matches!(calls[0], Call::Configure { .. }));
        assert!(matches!(calls[1], Call::Resize(b) if b.is_empty()));
        assert_eq!(layer.state(), LayerState::Idle);

        // Ticks against empty bounds are skipped too.
        layer.on_zoom_animation_tick(Point2::new(0.0, 0.0), 3.0);
        assert!(drain(&mut layer).is_empty());
        layer.on_zoom_animation_end();

        layer.on_viewport_changed(view(640.0, 480.0));
        let calls = drain(&mut layer);
        assert!(matches!(calls[0], Call::Resize(_)));
        assert_uniforms_then_draw(&calls[1..]);
    }

    #[test]
    fn detach_releases_resources_even_mid_animation() {
        let (mut layer, _) = layer();
        layer.on_attach(view(800.0, 600.0)).unwrap();
        layer.on_zoom_animation_tick(Point2::new(0.0, 0.0), 2.4);
        drain(&mut layer);

        layer.on_detach();
        assert_eq!(drain(&mut layer), vec![Call::Teardown]);
        assert_eq!(layer.state(), LayerState::Detached);
        assert_eq!(layer.viewport(), None);

        layer.on_zoom_animation_tick(Point2::new(0.0, 0.0), 2.6);
        layer.on_detach();
        assert!(drain(&mut layer).is_empty());
    }

    #[test]
    fn load_completion_binds_and_redraws() {
        let (mut layer, events) = layer_with(|b| b.image("world.png"));
        layer.on_attach(view(800.0, 600.0)).unwrap();
        drain(&mut layer);

        let ticket = layer.take_load_request().unwrap();
        assert_eq!(ticket.uri(), "world.png");
        assert!(layer.take_load_request().is_none());

        layer.finish_load(ticket, Ok(raster(4, 2)));
        let calls = drain(&mut layer);
        assert_eq!(calls[0], Call::ReplaceRaster((4, 2)));
        assert_uniforms_then_draw(&calls[1..]);
        assert_eq!(events.borrow().last().map(String::as_str), Some("load world.png"));
    }

    #[test]
    fn load_is_announced_only_once_the_raster_is_drawn() {
        let (mut layer, events) = layer_with(|b| b.image("world.png"));
        layer.on_attach(view(0.0, 0.0)).unwrap();
        let ticket = layer.take_load_request().unwrap();
        drain(&mut layer);

        // Zero-area bounds: bound but not drawn.
        layer.finish_load(ticket, Ok(raster(4, 2)));
        assert_eq!(drain(&mut layer), vec![Call::ReplaceRaster((4, 2))]);
        assert_eq!(*events.borrow(), vec!["mesh-ready 2".to_string()]);

        // Draw failure: still not shown.
        layer.backend.fail_draw = Some(GraphicsError::NoTarget);
        layer.on_viewport_changed(view(800.0, 600.0));
        assert_eq!(events.borrow().len(), 1);

        layer.backend.fail_draw = None;
        layer.on_viewport_changed(HostView::new(Point2::new(10.0, 0.0), 2.0, Point2::new(800.0, 600.0)));
        assert_eq!(events.borrow().last().map(String::as_str), Some("load world.png"));

        layer.on_viewport_changed(view(800.0, 600.0));
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn detach_forgets_an_unannounced_load() {
        let (mut layer, events) = layer_with(|b| b.image("world.png"));
        layer.on_attach(view(0.0, 0.0)).unwrap();
        let ticket = layer.take_load_request().unwrap();
        layer.finish_load(ticket, Ok(raster(2, 2)));

        layer.on_detach();
        layer.on_attach(view(800.0, 600.0)).unwrap();
        assert!(!events.borrow().iter().any(|e| e.starts_with("load ")));
    }

    #[test]
    fn detach_during_in_flight_load_makes_completion_a_no_op() {
        let (mut layer, events) = layer_with(|b| b.image("world.png"));
        layer.on_attach(view(800.0, 600.0)).unwrap();
        let ticket = layer.take_load_request().unwrap();

        layer.on_detach();
        assert!(!ticket.is_live());
        assert_eq!(layer.backend().calls.last(), Some(&Call::Teardown));
        drain(&mut layer);

        layer.finish_load(ticket, Ok(raster(2, 2)));
        assert!(drain(&mut layer).is_empty());
        assert_eq!(*events.borrow(), vec!["mesh-ready 2".to_string()]);
    }

    #[test]
    fn reattach_supersedes_the_previous_load() {
        let (mut layer, events) = layer_with(|b| b.image("world.png"));
        layer.on_attach(view(800.0, 600.0)).unwrap();
        let first = layer.take_load_request().unwrap();
        layer.on_detach();
        layer.on_attach(view(800.0, 600.0)).unwrap();
        let second = layer.take_load_request().unwrap();
        drain(&mut layer);

        layer.finish_load(first, Ok(raster(2, 2)));
        assert!(drain(&mut layer).is_empty());

        layer.finish_load(second, Ok(raster(2, 2)));
        assert_eq!(drain(&mut layer)[0], Call::ReplaceRaster((2, 2)));
        assert_eq!(events.borrow().last().map(String::as_str), Some("load world.png"));
    }

    #[test]
    fn load_failure_is_reported_and_layer_stays_attached() {
        let (mut layer, events) = layer_with(|b| b.image("broken.png"));
        layer.on_attach(view(800.0, 600.0)).unwrap();
        let ticket = layer.take_load_request().unwrap();
        drain(&mut layer);

        let error = ResourceLoadError::Size { width: 1, height: 1, len: 0 };
        layer.finish_load(ticket, Err(error));

        assert!(drain(&mut layer).is_empty());
        assert_eq!(layer.state(), LayerState::Idle);
        assert_eq!(events.borrow().last().map(String::as_str), Some("load-failed broken.png"));

        layer.on_viewport_changed(view(800.0, 600.0));
        assert_uniforms_then_draw(&drain(&mut layer));
    }

    #[test]
    fn without_an_image_no_load_is_requested() {
        let (mut layer, _) = layer();
        layer.on_attach(view(800.0, 600.0)).unwrap();
        assert!(layer.take_load_request().is_none());

        drain(&mut layer);
        layer.set_raster(&raster(8, 8)).unwrap();
        let calls = drain(&mut layer);
        assert_eq!(calls[0], Call::ReplaceRaster((8, 8)));
        assert_uniforms_then_draw(&calls[1..]);
    }

    #[test]
    fn set_raster_requires_attach() {
        let (mut layer, _) = layer();
        assert_eq!(layer.set_raster(&raster(1, 1)), Err(GraphicsError::NotConfigured));
    }

    #[test]
    fn graphics_error_aborts_attach() {
        let (mut layer, events) = layer_with(|b| b.image("world.png"));
        layer.backend.fail_configure = Some(GraphicsError::Compile("boom".into()));

        let err = layer.on_attach(view(800.0, 600.0)).unwrap_err();
        assert_eq!(err, LayerError::Graphics(GraphicsError::Compile("boom".into())));
        assert_eq!(layer.state(), LayerState::Detached);
        assert!(layer.backend().calls.is_empty());
        assert!(layer.take_load_request().is_none());
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn fragment_shader_without_raster_aborts_attach() {
        let flat = r#"
            @fragment
            fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
                return vec4<f32>(in.uv, 0.0, 1.0);
            }
        "#;
        let (mut layer, _) = layer_with(|b| b.fragment_shader(flat));
        assert_eq!(
            layer.on_attach(view(800.0, 600.0)),
            Err(LayerError::Graphics(GraphicsError::MissingIdentifier("raster")))
        );
        assert_eq!(layer.state(), LayerState::Detached);
    }

    #[test]
    fn projection_error_aborts_attach_before_any_gpu_call() {
        let (mut layer, _) = layer_with(|b| {
            b.projector(|p: Point| if p[0] > 0.5 { [f64::NAN, p[1]] } else { p })
        });

        let err = layer.on_attach(view(800.0, 600.0)).unwrap_err();
        assert!(matches!(err, LayerError::Mesh(MeshError::Projection { .. })));
        assert_eq!(layer.state(), LayerState::Detached);
        assert!(layer.backend().calls.is_empty());
    }

    #[test]
    fn second_attach_is_ignored() {
        let (mut layer, events) = layer();
        layer.on_attach(view(800.0, 600.0)).unwrap();
        drain(&mut layer);

        layer.on_attach(view(800.0, 600.0)).unwrap();
        assert!(drain(&mut layer).is_empty());
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn curved_projection_builds_a_finer_mesh() {
        let (mut layer, events) = layer_with(|b| {
            b.control_points([[-20.0, 70.0], [-20.0, 0.0], [20.0, 70.0], [20.0, 0.0]])
                .projector(|p: Point| {
                    let r = 6_378_137.0;
                    let lat = p[1].to_radians();
                    [r * p[0].to_radians(), r * (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln()]
                })
                .error_tolerance(1.0e8)
        });
        layer.on_attach(view(800.0, 600.0)).unwrap();

        let stats = layer.mesh_stats().unwrap();
        assert!(stats.triangles > 2);
        assert!(!stats.depth_limited);
        assert_eq!(events.borrow()[0], format!("mesh-ready {}", stats.triangles));
    }
}
