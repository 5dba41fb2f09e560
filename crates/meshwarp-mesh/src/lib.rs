//! Adaptive triangle meshes for **raster reprojection**.
//!
//! A raster living in one coordinate system is drawn in another by warping a
//! triangle mesh instead of resampling every pixel. This crate builds that
//! mesh: the raster's control quad is subdivided wherever linear interpolation
//! of the projected triangle deviates from the true projection by more than a
//! tolerance.
//!
//! The crate has no GPU dependencies so it can be used by tooling that only
//! needs the geometry.
//!
//! # Structure
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`projector`] | `Projector` trait, `ProjectorAdapter` (finiteness checks) |
//! | [`quad`] | `ControlQuad`, `SourceUv`, seed triangulation |
//! | [`builder`] | `Subdivider`, `build` entry point |
//! | [`output`] | `MeshOutput`, `MeshStats` |
//! | [`error`] | `MeshError` |
//!
//! # Quick start
//!
//! ```rust
//! use meshwarp_mesh::{build, ControlQuad, SourceUv, SEED_TRIANGLES};
//!
//! let quad = ControlQuad::new([[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]]).unwrap();
//! let identity = |p: [f64; 2]| p;
//!
//! let mesh = build(&quad, &SourceUv::default(), &SEED_TRIANGLES, &identity, 1_000_000.0).unwrap();
//! assert_eq!(mesh.flat_indices(), vec![0, 1, 3, 0, 3, 2]);
//! ```

pub mod builder;
pub mod error;
pub mod output;
pub mod projector;
pub mod quad;

pub use builder::{build, build_with_max_depth, Subdivider, DEFAULT_MAX_DEPTH};
pub use error::MeshError;
pub use output::{MeshOutput, MeshStats};
pub use projector::{Projector, ProjectorAdapter};
pub use quad::{ControlQuad, Point, SourceUv, SEED_TRIANGLES};
