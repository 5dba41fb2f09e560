//! Demo host: an equirectangular world raster reprojected onto a Web
//! Mercator slippy map.
//!
//! Usage: `meshwarp-viewer [IMAGE]`. Drag to pan, scroll to zoom, `D` to
//! detach/re-attach the layer, `Esc` to quit. Without an image a generated
//! checkerboard is shown.

mod host;
mod loader;
mod map;
mod world;

use anyhow::{Context, Result};
use meshwarp_engine::coords::Point2;
use meshwarp_engine::device::GpuInit;
use meshwarp_engine::layer::{LayerBuilder, LayerEvent};
use meshwarp_engine::logging::{init_logging, LoggingConfig};
use meshwarp_engine::window::{Runtime, RuntimeConfig};
use winit::dpi::LogicalSize;

use host::MapHost;
use map::MapView;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let image = std::env::args().nth(1);

    let mut builder = LayerBuilder::new()
        .control_points(world::CONTROL_POINTS)
        .projector(world::lon_lat_to_mercator)
        .source_uv(world::cropped_uv().context("invalid raster crop")?)
        .on_event(|event| match event {
            LayerEvent::MeshReady(stats) => log::info!(
                "mesh ready: {} vertices, {} triangles, max error {:.1}{}",
                stats.vertices,
                stats.triangles,
                stats.max_error,
                if stats.depth_limited { " (depth limited)" } else { "" }
            ),
            LayerEvent::Load { uri } => log::info!("raster {uri} loaded"),
            LayerEvent::LoadFailed { uri, error } => {
                log::error!("raster {uri} failed to load: {error}");
                if let Some(cause) = std::error::Error::source(error) {
                    log::error!("  caused by: {cause}");
                }
            }
        });

    let fallback = match image {
        Some(path) => {
            builder = builder.image(path);
            None
        }
        None => {
            log::info!("no image given; showing a checkerboard");
            Some(world::checkerboard(1440, 720))
        }
    };

    let host = MapHost::new(builder, fallback, MapView::new(Point2::zero(), 1.0));

    Runtime::run(
        RuntimeConfig {
            title: "meshwarp viewer".to_string(),
            initial_size: LogicalSize::new(1024.0, 768.0),
        },
        GpuInit::default(),
        host,
    )
}
