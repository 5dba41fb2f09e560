//! Viewport transform: map view → vertex-shader uniforms.

mod transform;

pub use transform::{
    compute_uniforms, compute_uniforms_with_span, MapProjection, UniformPair, ViewportError,
};
