use meshwarp_mesh::{ControlQuad, MeshError, Point, Projector, SourceUv, DEFAULT_MAX_DEPTH};
use thiserror::Error;

use crate::render::shader::DEFAULT_FRAGMENT_SHADER;
use crate::render::RasterBackend;
use crate::view::MapProjection;

use super::events::{LayerEvent, Listener};
use super::RenderLoopController;

/// Invalid layer configuration, reported by [`LayerBuilder::build`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("control points are required")]
    MissingControlPoints,

    #[error("invalid control points")]
    ControlPoints(#[source] MeshError),

    #[error("a projector is required")]
    MissingProjector,

    #[error("padding must be a non-negative finite number, got {0}")]
    Padding(f64),

    #[error("error tolerance must be a positive finite number, got {0}")]
    Tolerance(f64),
}

/// Tunables with defaults; the required inputs live on [`LayerBuilder`].
#[derive(Debug, Clone)]
pub struct LayerOptions {
    /// Fraction of the map size added on every side of the drawing surface,
    /// so panning reveals already-rendered pixels.
    pub padding: f64,

    /// Largest allowed squared distance, in projected units, between a true
    /// edge midpoint and its linear approximation.
    pub error_tolerance: f64,

    /// WGSL fragment stage; see [`crate::render::shader`] for its bindings.
    pub fragment_shader: String,

    /// Subdivision depth safeguard.
    pub max_depth: u32,

    /// Texture coordinates of the four control points.
    pub source_uv: SourceUv,

    /// The host map's display projection (zoom → pixels).
    pub projection: MapProjection,
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            padding: 0.1,
            error_tolerance: 1_000_000.0,
            fragment_shader: DEFAULT_FRAGMENT_SHADER.to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
            source_uv: SourceUv::default(),
            projection: MapProjection::WEB_MERCATOR,
        }
    }
}

impl LayerOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.padding.is_finite() && self.padding >= 0.0) {
            return Err(ConfigError::Padding(self.padding));
        }
        if !(self.error_tolerance.is_finite() && self.error_tolerance > 0.0) {
            return Err(ConfigError::Tolerance(self.error_tolerance));
        }
        Ok(())
    }
}

/// Fluent construction of a [`RenderLoopController`].
///
/// ```rust,ignore
/// let layer = LayerBuilder::new()
///     .control_points([[-180.0, 85.0], [-180.0, -85.0], [180.0, 85.0], [180.0, -85.0]])
///     .projector(lon_lat_to_mercator)
///     .image("world.png")
///     .error_tolerance(250_000.0)
///     .on_event(|e| log::info!("{e:?}"))
///     .build(MeshRenderer::new(gpu.handle()))?;
/// ```
pub struct LayerBuilder {
    control_points: Option<Vec<Point>>,
    projector: Option<Box<dyn Projector>>,
    image: Option<String>,
    options: LayerOptions,
    listener: Option<Listener>,
}

impl Default for LayerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerBuilder {
    pub fn new() -> Self {
        Self {
            control_points: None,
            projector: None,
            image: None,
            options: LayerOptions::default(),
            listener: None,
        }
    }

    /// The raster's corners in its source CRS; exactly four are required.
    pub fn control_points(mut self, points: impl Into<Vec<Point>>) -> Self {
        self.control_points = Some(points.into());
        self
    }

    /// Forward mapping from the raster's CRS to the display CRS.
    pub fn projector(mut self, projector: impl Projector + 'static) -> Self {
        self.projector = Some(Box::new(projector));
        self
    }

    /// Image to load after attach (handed out as a [`LoadTicket`](super::LoadTicket)).
    pub fn image(mut self, uri: impl Into<String>) -> Self {
        self.image = Some(uri.into());
        self
    }

    pub fn options(mut self, options: LayerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn padding(mut self, padding: f64) -> Self {
        self.options.padding = padding;
        self
    }

    pub fn error_tolerance(mut self, tolerance: f64) -> Self {
        self.options.error_tolerance = tolerance;
        self
    }

    pub fn fragment_shader(mut self, source: impl Into<String>) -> Self {
        self.options.fragment_shader = source.into();
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.options.max_depth = depth;
        self
    }

    pub fn source_uv(mut self, uv: SourceUv) -> Self {
        self.options.source_uv = uv;
        self
    }

    pub fn projection(mut self, projection: MapProjection) -> Self {
        self.options.projection = projection;
        self
    }

    /// Register the layer's event listener (replaces any previous one).
    pub fn on_event(mut self, f: impl FnMut(&LayerEvent) + 'static) -> Self {
        self.listener = Some(Box::new(f));
        self
    }

    /// Validates everything that can be checked without projecting and
    /// returns a detached controller.
    pub fn build<B: RasterBackend>(self, backend: B) -> Result<RenderLoopController<B>, ConfigError> {
        let points = self.control_points.ok_or(ConfigError::MissingControlPoints)?;
        let quad = ControlQuad::from_slice(&points).map_err(ConfigError::ControlPoints)?;
        let projector = self.projector.ok_or(ConfigError::MissingProjector)?;
        self.options.validate()?;

        Ok(RenderLoopController::new(
            backend,
            quad,
            projector,
            self.image,
            self.options,
            self.listener,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerState;
    use crate::layer::controller::tests::RecordingBackend;

    const UNIT: [Point; 4] = [[0.0, 1.0], [0.0, 0.0], [1.0, 1.0], [1.0, 0.0]];

    fn identity(p: Point) -> Point {
        p
    }

    fn err(builder: LayerBuilder) -> ConfigError {
        match builder.build(RecordingBackend::default()) {
            Ok(_) => panic!("expected a configuration error"),
            Err(e) => e,
        }
    }

    #[test]
    fn defaults() {
        let o = LayerOptions::default();
        assert_eq!(o.padding, 0.1);
        assert_eq!(o.error_tolerance, 1_000_000.0);
        assert_eq!(o.max_depth, 20);
        assert!(o.fragment_shader.contains("fs_main"));
        assert_eq!(o.projection, MapProjection::WEB_MERCATOR);
    }

    #[test]
    fn minimal_configuration_builds_detached() {
        let layer = LayerBuilder::new()
            .control_points(UNIT)
            .projector(identity)
            .build(RecordingBackend::default())
            .unwrap();
        assert_eq!(layer.state(), LayerState::Detached);
        assert!(layer.backend().calls.is_empty());
    }

    #[test]
    fn control_points_are_required() {
        assert_eq!(
            err(LayerBuilder::new().projector(identity)),
            ConfigError::MissingControlPoints
        );
    }

    #[test]
    fn exactly_four_control_points() {
        let three = LayerBuilder::new()
            .control_points(&UNIT[..3])
            .projector(identity);
        assert!(matches!(err(three), ConfigError::ControlPoints(_)));

        let nan = LayerBuilder::new()
            .control_points([[0.0, f64::NAN], [0.0, 0.0], [1.0, 1.0], [1.0, 0.0]])
            .projector(identity);
        assert!(matches!(err(nan), ConfigError::ControlPoints(_)));
    }

    #[test]
    fn projector_is_required() {
        assert_eq!(
            err(LayerBuilder::new().control_points(UNIT)),
            ConfigError::MissingProjector
        );
    }

    #[test]
    fn padding_and_tolerance_are_checked() {
        let base = || LayerBuilder::new().control_points(UNIT).projector(identity);
        assert_eq!(err(base().padding(-0.5)), ConfigError::Padding(-0.5));
        assert!(matches!(err(base().padding(f64::INFINITY)), ConfigError::Padding(_)));
        assert_eq!(err(base().error_tolerance(0.0)), ConfigError::Tolerance(0.0));
        assert_eq!(err(base().error_tolerance(-3.0)), ConfigError::Tolerance(-3.0));
        assert!(matches!(err(base().error_tolerance(f64::NAN)), ConfigError::Tolerance(_)));
    }

    #[test]
    fn zero_padding_is_allowed() {
        assert!(LayerBuilder::new()
            .control_points(UNIT)
            .projector(identity)
            .padding(0.0)
            .build(RecordingBackend::default())
            .is_ok());
    }
}
