//! Decodes rasters off the UI thread.

use std::sync::mpsc::{self, Receiver, Sender};

use meshwarp_engine::layer::LoadTicket;
use meshwarp_engine::render::{load_raster, RasterImage, ResourceLoadError};

pub type Completed = (LoadTicket, Result<RasterImage, ResourceLoadError>);

/// One helper thread per load; results come back over a channel and are
/// handed to the layer on the UI thread.
pub struct Loader {
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn spawn(&self, ticket: LoadTicket) {
        let tx = self.tx.clone();
        let spawned = std::thread::Builder::new()
            .name("raster-loader".into())
            .spawn(move || {
                if !ticket.is_live() {
                    return;
                }
                let result = load_raster(ticket.uri());
                // The receiver only goes away at shutdown.
                let _ = tx.send((ticket, result));
            });
        if let Err(e) = spawned {
            log::error!("failed to spawn raster loader: {e}");
        }
    }

    /// Completed loads, without blocking.
    pub fn poll(&self) -> Vec<Completed> {
        self.rx.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::{Duration, Instant};

    use meshwarp_engine::coords::{HostView, PixelBounds, Point2};
    use meshwarp_engine::layer::{LayerBuilder, LayerEvent, ViewportAware};
    use meshwarp_engine::render::{GraphicsError, RasterBackend};
    use meshwarp_engine::view::UniformPair;
    use meshwarp_mesh::MeshOutput;

    use super::*;

    #[derive(Default)]
    struct NullBackend;

    impl RasterBackend for NullBackend {
        fn configure(&mut self, _: &MeshOutput, _: &str, _: &RasterImage) -> Result<(), GraphicsError> {
            Ok(())
        }
        fn replace_raster(&mut self, _: &RasterImage) -> Result<(), GraphicsError> {
            Ok(())
        }
        fn resize(&mut self, _: PixelBounds) {}
        fn set_viewport_uniforms(&mut self, _: UniformPair) {}
        fn draw(&mut self) -> Result<(), GraphicsError> {
            Ok(())
        }
        fn teardown(&mut self) {}
    }

    fn wait_for(loader: &Loader) -> Vec<Completed> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            let done = loader.poll();
            if !done.is_empty() || Instant::now() > deadline {
                return done;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn failed_load_round_trips_to_the_layer() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        let mut layer = LayerBuilder::new()
            .control_points(crate::world::CONTROL_POINTS)
            .projector(crate::world::lon_lat_to_mercator)
            .image("/nonexistent/meshwarp-viewer/world.png")
            .on_event(move |e| {
                if let LayerEvent::LoadFailed { uri, error } = e {
                    sink.borrow_mut().push(format!("{uri}: {}", matches!(error, ResourceLoadError::Io { .. })));
                }
            })
            .build(NullBackend)
            .unwrap();
        layer
            .on_attach(HostView::new(Point2::zero(), 1.0, Point2::new(512.0, 512.0)))
            .unwrap();

        let loader = Loader::new();
        loader.spawn(layer.take_load_request().unwrap());
        let done = wait_for(&loader);
        assert_eq!(done.len(), 1);

        for (ticket, result) in done {
            layer.finish_load(ticket, result);
        }
        assert_eq!(
            *events.borrow(),
            vec!["/nonexistent/meshwarp-viewer/world.png: true".to_string()]
        );
    }
}
