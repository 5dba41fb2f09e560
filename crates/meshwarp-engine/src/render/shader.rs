//! WGSL assembly and validation.
//!
//! The vertex stage is fixed; callers supply only the fragment stage, which
//! sees these bindings:
//!
//! | name | type |
//! |------|------|
//! | `raster` | `texture_2d<f32>` |
//! | `raster_sampler` | `sampler` |
//! | `in.uv` | `vec2<f32>` varying (field of `VertexOutput`) |
//!
//! and must define `@fragment fn fs_main(in: VertexOutput) -> @location(0) vec4<f32>`.

use super::GraphicsError;

pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

/// Samples the raster as-is.
pub const DEFAULT_FRAGMENT_SHADER: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(raster, raster_sampler, in.uv);
}
"#;

const VERTEX_STAGE: &str = r#"
struct Viewport {
    center: vec2<f32>,
    scale: vec2<f32>,
};

@group(0) @binding(0) var<uniform> viewport: Viewport;
@group(0) @binding(1) var raster: texture_2d<f32>;
@group(0) @binding(2) var raster_sampler: sampler;

struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = vec4<f32>((in.position - viewport.center) / viewport.scale, 0.0, 1.0);
    out.uv = in.uv;
    return out;
}
"#;

/// Joins the fixed vertex stage with `fragment` and validates the result.
///
/// Errors are reported here, before any GPU object exists.
pub fn compose(fragment: &str) -> Result<String, GraphicsError> {
    for required in ["raster", "uv", FRAGMENT_ENTRY] {
        if !references(fragment, required) {
            return Err(GraphicsError::MissingIdentifier(required));
        }
    }

    let source = format!("{VERTEX_STAGE}\n{fragment}");
    validate(&source)?;
    Ok(source)
}

fn validate(source: &str) -> Result<(), GraphicsError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| GraphicsError::Compile(e.emit_to_string(source)))?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::empty(),
    )
    .validate(&module)
    .map_err(|e| GraphicsError::Compile(e.emit_to_string(source)))?;

    let has_fragment = module
        .entry_points
        .iter()
        .any(|ep| ep.name == FRAGMENT_ENTRY && ep.stage == naga::ShaderStage::Fragment);
    if !has_fragment {
        return Err(GraphicsError::Compile(format!(
            "`{FRAGMENT_ENTRY}` is not a @fragment entry point"
        )));
    }
    Ok(())
}

/// Whether `ident` appears as a whole identifier outside `//` comments.
fn references(source: &str, ident: &str) -> bool {
    source
        .lines()
        .map(|line| line.split("//").next().unwrap_or(""))
        .flat_map(|code| code.split(|c: char| !(c.is_alphanumeric() || c == '_')))
        .any(|token| token == ident)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shader_composes() {
        let src = compose(DEFAULT_FRAGMENT_SHADER).unwrap();
        assert!(src.contains("fn vs_main"));
        assert!(src.contains("fn fs_main"));
    }

    #[test]
    fn tinted_shader_composes() {
        let tinted = r#"
            @fragment
            fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
                let c = textureSample(raster, raster_sampler, in.uv);
                return vec4<f32>(c.rgb * vec3<f32>(1.0, 0.8, 0.8), c.a * 0.5);
            }
        "#;
        assert!(compose(tinted).is_ok());
    }

    #[test]
    fn shader_without_raster_is_rejected() {
        let flat = r#"
            @fragment
            fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
                return vec4<f32>(in.uv, 0.0, 1.0);
            }
        "#;
        assert_eq!(compose(flat), Err(GraphicsError::MissingIdentifier("raster")));
    }

    #[test]
    fn names_inside_comments_do_not_count() {
        let sneaky = r#"
            // raster is ignored here
            @fragment
            fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
                return vec4<f32>(in.uv, 0.0, 1.0);
            }
        "#;
        assert_eq!(compose(sneaky), Err(GraphicsError::MissingIdentifier("raster")));
    }

    #[test]
    fn longer_identifiers_do_not_match() {
        assert!(!references("let rasterized = uvw;", "raster"));
        assert!(!references("let rasterized = uvw;", "uv"));
        assert!(references("textureSample(raster, s, in.uv)", "uv"));
    }

    #[test]
    fn syntax_error_is_a_compile_error() {
        let broken = r#"
            @fragment
            fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
                return textureSample(raster, raster_sampler, in.uv)
            "#;
        assert!(matches!(compose(broken), Err(GraphicsError::Compile(_))));
    }

    #[test]
    fn type_error_is_a_compile_error() {
        let mistyped = r#"
            @fragment
            fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
                return textureSample(raster, raster_sampler, in.uv).rg;
            }
        "#;
        assert!(matches!(compose(mistyped), Err(GraphicsError::Compile(_))));
    }

    #[test]
    fn fs_main_must_be_a_fragment_entry_point() {
        let helper_only = r#"
            fn fs_main(uv: vec2<f32>) -> vec4<f32> {
                return textureSampleLevel(raster, raster_sampler, uv, 0.0);
            }
        "#;
        assert!(matches!(compose(helper_only), Err(GraphicsError::Compile(_))));
    }
}
