use bytemuck::{Pod, Zeroable};
use meshwarp_mesh::MeshOutput;
use wgpu::util::DeviceExt;

use crate::coords::PixelBounds;
use crate::device::GpuHandle;
use crate::view::UniformPair;

use super::shader::{self, FRAGMENT_ENTRY, VERTEX_ENTRY};
use super::{GraphicsError, RasterBackend, RasterImage};

const RASTER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

// ── GPU types ─────────────────────────────────────────────────────────────

/// Vertex layout (16 bytes):
///
///  offset 0  position  [f32; 2]   loc 0   projected units, relative to the mesh origin
///  offset 8  uv        [f32; 2]   loc 1
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct MeshVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

impl MeshVertex {
    const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2, // position
        1 => Float32x2  // uv
    ];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
struct ViewportUniform {
    center: [f32; 2],
    scale: [f32; 2],
}

fn viewport_ubo_min_binding_size() -> std::num::NonZeroU64 {
    std::num::NonZeroU64::new(std::mem::size_of::<ViewportUniform>() as u64)
        .expect("ViewportUniform has non-zero size by construction")
}

/// Projected coordinates of a whole-world mesh are ~2e7, beyond what `f32`
/// resolves at street zoom. Vertices are therefore stored relative to the
/// middle of the mesh's bounds and the uniform center is shifted to match
/// in `f64` before narrowing.
fn mesh_origin(mesh: &MeshOutput) -> [f64; 2] {
    mesh.projected_bounds()
        .map(|(min, max)| [(min[0] + max[0]) * 0.5, (min[1] + max[1]) * 0.5])
        .unwrap_or([0.0, 0.0])
}

fn mesh_vertices(mesh: &MeshOutput, origin: [f64; 2]) -> Vec<MeshVertex> {
    mesh.projected
        .iter()
        .zip(&mesh.uv)
        .map(|(p, uv)| MeshVertex {
            position: [(p[0] - origin[0]) as f32, (p[1] - origin[1]) as f32],
            uv: [uv[0] as f32, uv[1] as f32],
        })
        .collect()
}

fn viewport_uniform(pair: UniformPair, origin: [f64; 2]) -> ViewportUniform {
    ViewportUniform {
        center: [
            (pair.center[0] - origin[0]) as f32,
            (pair.center[1] - origin[1]) as f32,
        ],
        scale: [pair.scale[0] as f32, pair.scale[1] as f32],
    }
}

/// Canvas size for `bounds`, `None` for empty bounds.
///
/// A clamped canvas would hold a squashed image copied unscaled at the
/// bounds' offset, so oversized bounds are an error instead.
fn canvas_size(bounds: PixelBounds, limit: u32) -> Result<Option<(u32, u32)>, GraphicsError> {
    let Some((width, height)) = bounds.pixel_size() else {
        return Ok(None);
    };
    if width > limit || height > limit {
        return Err(GraphicsError::CanvasTooLarge { width, height, limit });
    }
    Ok(Some((width, height)))
}

// ── resources ─────────────────────────────────────────────────────────────

/// Everything `configure` allocates; dropped (and destroyed) as a unit.
struct Resources {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    viewport_ubo: wgpu::Buffer,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    raster: wgpu::Texture,
    origin: [f64; 2],
}

impl Resources {
    fn destroy(self) {
        self.vertex_buffer.destroy();
        self.index_buffer.destroy();
        self.viewport_ubo.destroy();
        self.raster.destroy();
    }
}

/// The layer's drawing surface, sized to its padded pixel bounds.
struct Canvas {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    bounds: PixelBounds,
}

// ── renderer ──────────────────────────────────────────────────────────────

/// wgpu implementation of [`RasterBackend`].
///
/// Draws into a layer-owned canvas texture in the surface format; the host
/// copies [`canvas`](Self::canvas) into its frame at the bounds' offset.
pub struct MeshRenderer {
    gpu: GpuHandle,
    resources: Option<Resources>,
    canvas: Option<Canvas>,
    /// Why the last resize left no canvas, if it was not empty bounds.
    canvas_error: Option<GraphicsError>,
    uniforms: Option<UniformPair>,
}

impl MeshRenderer {
    pub fn new(gpu: GpuHandle) -> Self {
        Self {
            gpu,
            resources: None,
            canvas: None,
            canvas_error: None,
            uniforms: None,
        }
    }

    /// The texture the last draw rendered into, with the bounds it covers.
    pub fn canvas(&self) -> Option<(&wgpu::Texture, PixelBounds)> {
        self.canvas.as_ref().map(|c| (&c.texture, c.bounds))
    }

    pub fn is_configured(&self) -> bool {
        self.resources.is_some()
    }

    fn max_texture_side(&self) -> u32 {
        self.gpu.device().limits().max_texture_dimension_2d
    }

    fn check_raster(&self, raster: &RasterImage) -> Result<(), GraphicsError> {
        let limit = self.max_texture_side();
        if raster.width() > limit || raster.height() > limit {
            return Err(GraphicsError::RasterTooLarge {
                width: raster.width(),
                height: raster.height(),
                limit,
            });
        }
        Ok(())
    }

    // ── creation helpers ───────────────────────────────────────────────────

    fn create_raster_texture(&self, raster: &RasterImage) -> wgpu::Texture {
        let size = wgpu::Extent3d {
            width: raster.width(),
            height: raster.height(),
            depth_or_array_layers: 1,
        };
        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("meshwarp raster"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RASTER_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        self.gpu.queue().write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            raster.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * raster.width()),
                rows_per_image: Some(raster.height()),
            },
            size,
        );
        texture
    }

    fn create_bind_group(
        &self,
        layout: &wgpu::BindGroupLayout,
        viewport_ubo: &wgpu::Buffer,
        raster: &wgpu::Texture,
        sampler: &wgpu::Sampler,
    ) -> wgpu::BindGroup {
        let raster_view = raster.create_view(&wgpu::TextureViewDescriptor::default());
        self.gpu.device().create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("meshwarp bind group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: viewport_ubo.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&raster_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        })
    }

    fn create_bind_group_layout(&self) -> wgpu::BindGroupLayout {
        self.gpu
            .device()
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("meshwarp bgl"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: Some(viewport_ubo_min_binding_size()),
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            })
    }

    /// Shader module and pipeline under a validation error scope; catches
    /// mismatches against the pipeline layout that naga cannot see.
    fn create_pipeline(
        &self,
        source: String,
        bgl: &wgpu::BindGroupLayout,
    ) -> Result<wgpu::RenderPipeline, GraphicsError> {
        let device = self.gpu.device();
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("meshwarp shader"),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("meshwarp pipeline layout"),
            bind_group_layouts: &[bgl],
            immediate_size: 0,
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("meshwarp pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some(VERTEX_ENTRY),
                compilation_options: Default::default(),
                buffers: &[MeshVertex::layout()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some(FRAGMENT_ENTRY),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.gpu.target_format(),
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Reprojection may mirror triangles.
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        match pollster::block_on(scope.pop()) {
            Some(e) => Err(GraphicsError::Compile(e.to_string())),
            None => Ok(pipeline),
        }
    }

    fn create_sampler(&self) -> wgpu::Sampler {
        self.gpu.device().create_sampler(&wgpu::SamplerDescriptor {
            label: Some("meshwarp raster sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        })
    }

    fn drop_canvas(&mut self) {
        if let Some(old) = self.canvas.take() {
            old.texture.destroy();
        }
    }

    fn write_uniforms(&self) {
        let (Some(res), Some(pair)) = (self.resources.as_ref(), self.uniforms) else {
            return;
        };
        self.gpu.queue().write_buffer(
            &res.viewport_ubo,
            0,
            bytemuck::bytes_of(&viewport_uniform(pair, res.origin)),
        );
    }
}

impl RasterBackend for MeshRenderer {
    fn configure(
        &mut self,
        mesh: &MeshOutput,
        fragment_shader: &str,
        raster: &RasterImage,
    ) -> Result<(), GraphicsError> {
        // Everything fallible runs before the first buffer or texture.
        if mesh.triangles.is_empty() {
            return Err(GraphicsError::EmptyMesh);
        }
        let source = shader::compose(fragment_shader)?;
        self.check_raster(raster)?;

        let bind_group_layout = self.create_bind_group_layout();
        let pipeline = self.create_pipeline(source, &bind_group_layout)?;

        let device = self.gpu.device();
        let origin = mesh_origin(mesh);
        let vertices = mesh_vertices(mesh, origin);
        let indices = mesh.flat_indices();

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("meshwarp vbo"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("meshwarp ibo"),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("meshwarp viewport ubo"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = self.create_sampler();
        let raster_texture = self.create_raster_texture(raster);
        let bind_group =
            self.create_bind_group(&bind_group_layout, &viewport_ubo, &raster_texture, &sampler);

        log::debug!(
            "configured mesh renderer: {} vertices, {} triangles, raster {}x{}",
            vertices.len(),
            mesh.triangle_count(),
            raster.width(),
            raster.height()
        );

        let previous = self.resources.replace(Resources {
            pipeline,
            bind_group_layout,
            bind_group,
            sampler,
            viewport_ubo,
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
            raster: raster_texture,
            origin,
        });
        if let Some(old) = previous {
            old.destroy();
        }
        self.write_uniforms();
        Ok(())
    }

    fn replace_raster(&mut self, raster: &RasterImage) -> Result<(), GraphicsError> {
        if self.resources.is_none() {
            return Err(GraphicsError::NotConfigured);
        }
        self.check_raster(raster)?;

        let texture = self.create_raster_texture(raster);
        let Some(res) = self.resources.as_ref() else {
            return Err(GraphicsError::NotConfigured);
        };
        let bind_group = self.create_bind_group(
            &res.bind_group_layout,
            &res.viewport_ubo,
            &texture,
            &res.sampler,
        );

        let Some(res) = self.resources.as_mut() else {
            return Err(GraphicsError::NotConfigured);
        };
        let old = std::mem::replace(&mut res.raster, texture);
        res.bind_group = bind_group;
        old.destroy();
        Ok(())
    }

    fn resize(&mut self, bounds: PixelBounds) {
        let (width, height) = match canvas_size(bounds, self.max_texture_side()) {
            Ok(Some(size)) => {
                self.canvas_error = None;
                size
            }
            Ok(None) => {
                self.drop_canvas();
                self.canvas_error = None;
                return;
            }
            Err(e) => {
                log::warn!("{e}; layer not drawn until the map shrinks");
                self.drop_canvas();
                self.canvas_error = Some(e);
                return;
            }
        };

        if let Some(canvas) = self.canvas.as_mut() {
            let current = canvas.texture.size();
            if current.width == width && current.height == height {
                canvas.bounds = bounds;
                return;
            }
        }

        let texture = self.gpu.device().create_texture(&wgpu::TextureDescriptor {
            label: Some("meshwarp canvas"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.gpu.target_format(),
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        if let Some(old) = self.canvas.replace(Canvas { texture, view, bounds }) {
            old.texture.destroy();
        }
    }

    fn set_viewport_uniforms(&mut self, uniforms: UniformPair) {
        self.uniforms = Some(uniforms);
        self.write_uniforms();
    }

    fn draw(&mut self) -> Result<(), GraphicsError> {
        let Some(res) = self.resources.as_ref() else {
            return Err(GraphicsError::NotConfigured);
        };
        let Some(canvas) = self.canvas.as_ref() else {
            return Err(self.canvas_error.clone().unwrap_or(GraphicsError::NoTarget));
        };
        if self.uniforms.is_none() {
            return Err(GraphicsError::NoTarget);
        }

        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("meshwarp layer encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("meshwarp layer pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &canvas.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            rpass.set_pipeline(&res.pipeline);
            rpass.set_bind_group(0, &res.bind_group, &[]);
            rpass.set_vertex_buffer(0, res.vertex_buffer.slice(..));
            rpass.set_index_buffer(res.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..res.index_count, 0, 0..1);
        }

        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(res) = self.resources.take() {
            res.destroy();
            log::debug!("mesh renderer resources released");
        }
        self.drop_canvas();
        self.canvas_error = None;
        self.uniforms = None;
    }
}

impl Drop for MeshRenderer {
    fn drop(&mut self) {
        self.teardown();
    }
}
