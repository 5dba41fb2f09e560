use meshwarp_mesh::MeshStats;

use crate::render::ResourceLoadError;

/// Notifications a layer emits to its listener.
#[derive(Debug)]
pub enum LayerEvent {
    /// The mesh was built and uploaded during attach.
    MeshReady(MeshStats),

    /// The raster from `uri` is bound and has been drawn. Emitted after the
    /// first successful draw, which may be a later redraw when the frame
    /// that bound it was skipped.
    Load { uri: String },

    /// The raster from `uri` could not be produced; the layer stays attached
    /// and keeps drawing the transparent placeholder.
    LoadFailed { uri: String, error: ResourceLoadError },
}

pub(crate) type Listener = Box<dyn FnMut(&LayerEvent)>;
