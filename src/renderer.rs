// --- File: renderer.rs ---
use crate::constants::BACKGROUND_COLOR;
use crate::universe::Universe;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use std::path::Path;
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::{dpi::PhysicalSize, window::Window};

const GROUND_COLOR: [f32; 4] = [0.16, 0.20, 0.16, 1.0];
const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

// --- GPU Data Structures ---

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct CameraUniform {
    view_proj: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct MeshVertex {
    position: [f32; 3],
    normal: [f32; 3],
}

impl MeshVertex {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        const ATTRIBS: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBS,
        }
    }
}

/// Per-body instance: the shader scales a unit cube by the half-extents,
/// spins it by the heading and places it in the world.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct BodyInstance {
    position: [f32; 3],
    yaw: f32,
    half_size: [f32; 3],
    color: [f32; 4],
}

impl BodyInstance {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        const ATTRIBS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
            2 => Float32x3, 3 => Float32, 4 => Float32x3, 5 => Float32x4
        ];
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<BodyInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &ATTRIBS,
        }
    }
}

/// Event flash line endpoint.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
struct FlashVertex {
    position: [f32; 3],
    color: [f32; 3],
}

impl FlashVertex {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        const ATTRIBS: [wgpu::VertexAttribute; 2] =
            wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<FlashVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRIBS,
        }
    }
}

// Unit cube (half-extent 1) with face normals.
const CUBE_VERTICES: &[MeshVertex] = &[
    // +z
    MeshVertex { position: [-1.0, -1.0, 1.0], normal: [0.0, 0.0, 1.0] },
    MeshVertex { position: [1.0, -1.0, 1.0], normal: [0.0, 0.0, 1.0] },
    MeshVertex { position: [1.0, 1.0, 1.0], normal: [0.0, 0.0, 1.0] },
    MeshVertex { position: [-1.0, 1.0, 1.0], normal: [0.0, 0.0, 1.0] },
    // -z
    MeshVertex { position: [1.0, -1.0, -1.0], normal: [0.0, 0.0, -1.0] },
    MeshVertex { position: [-1.0, -1.0, -1.0], normal: [0.0, 0.0, -1.0] },
    MeshVertex { position: [-1.0, 1.0, -1.0], normal: [0.0, 0.0, -1.0] },
    MeshVertex { position: [1.0, 1.0, -1.0], normal: [0.0, 0.0, -1.0] },
    // +x
    MeshVertex { position: [1.0, -1.0, 1.0], normal: [1.0, 0.0, 0.0] },
    MeshVertex { position: [1.0, -1.0, -1.0], normal: [1.0, 0.0, 0.0] },
    MeshVertex { position: [1.0, 1.0, -1.0], normal: [1.0, 0.0, 0.0] },
    MeshVertex { position: [1.0, 1.0, 1.0], normal: [1.0, 0.0, 0.0] },
    // -x
    MeshVertex { position: [-1.0, -1.0, -1.0], normal: [-1.0, 0.0, 0.0] },
    MeshVertex { position: [-1.0, -1.0, 1.0], normal: [-1.0, 0.0, 0.0] },
    MeshVertex { position: [-1.0, 1.0, 1.0], normal: [-1.0, 0.0, 0.0] },
    MeshVertex { position: [-1.0, 1.0, -1.0], normal: [-1.0, 0.0, 0.0] },
    // +y
    MeshVertex { position: [-1.0, 1.0, 1.0], normal: [0.0, 1.0, 0.0] },
    MeshVertex { position: [1.0, 1.0, 1.0], normal: [0.0, 1.0, 0.0] },
    MeshVertex { position: [1.0, 1.0, -1.0], normal: [0.0, 1.0, 0.0] },
    MeshVertex { position: [-1.0, 1.0, -1.0], normal: [0.0, 1.0, 0.0] },
    // -y
    MeshVertex { position: [-1.0, -1.0, -1.0], normal: [0.0, -1.0, 0.0] },
    MeshVertex { position: [1.0, -1.0, -1.0], normal: [0.0, -1.0, 0.0] },
    MeshVertex { position: [1.0, -1.0, 1.0], normal: [0.0, -1.0, 0.0] },
    MeshVertex { position: [-1.0, -1.0, 1.0], normal: [0.0, -1.0, 0.0] },
];

const CUBE_INDICES: &[u16] = &[
    0, 1, 2, 0, 2, 3, // +z
    4, 5, 6, 4, 6, 7, // -z
    8, 9, 10, 8, 10, 11, // +x
    12, 13, 14, 12, 14, 15, // -x
    16, 17, 18, 16, 18, 19, // +y
    20, 21, 22, 20, 22, 23, // -y
];

// --- Renderer ---
pub struct Renderer<'a> {
    surface: wgpu::Surface<'a>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    body_pipeline: wgpu::RenderPipeline,
    flash_pipeline: wgpu::RenderPipeline,
    cube_vertex_buffer: wgpu::Buffer,
    cube_index_buffer: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    instance_data: Vec<BodyInstance>,
    max_instances: usize,
    flash_vertex_buffer: wgpu::Buffer,
    flash_data: Vec<FlashVertex>,
    max_flash_vertices: usize,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    window: Arc<Window>,
}

impl<'a> Renderer<'a> {
    pub async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();
        let size = PhysicalSize::new(size.width.max(1), size.height.max(1));

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .expect("Failed to find an appropriate adapter");

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .expect("Failed to create device");

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            // COPY_SRC lets the screenshot path read the frame back.
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let shader_source = include_str!("shader.wgsl");
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shader Module"),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        // --- Camera Uniform ---
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Uniform Buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform {
                view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Camera Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(
                            std::mem::size_of::<CameraUniform>() as _,
                        ),
                    },
                    count: None,
                }],
            });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        // --- Mesh Buffers ---
        let cube_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cube Vertex Buffer"),
            contents: bytemuck::cast_slice(CUBE_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let cube_index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Cube Index Buffer"),
            contents: bytemuck::cast_slice(CUBE_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let max_instances = 1024;
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Instance Buffer"),
            size: (max_instances * std::mem::size_of::<BodyInstance>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let max_flash_vertices = 256;
        let flash_vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Flash Vertex Buffer"),
            size: (max_flash_vertices * std::mem::size_of::<FlashVertex>()) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // --- Pipelines ---
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[&camera_bind_group_layout],
            push_constant_ranges: &[],
        });

        let body_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Body Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_body"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[MeshVertex::desc(), BodyInstance::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_body"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let flash_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Flash Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_flash"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                buffers: &[FlashVertex::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_flash"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                // Flashes draw over bodies; the depth test still clips
                // them against the ground.
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let depth_view = Self::create_depth_view(&device, &config);

        Self {
            surface,
            device,
            queue,
            config,
            size,
            body_pipeline,
            flash_pipeline,
            cube_vertex_buffer,
            cube_index_buffer,
            instance_buffer,
            instance_data: Vec::with_capacity(max_instances),
            max_instances,
            flash_vertex_buffer,
            flash_data: Vec::with_capacity(max_flash_vertices),
            max_flash_vertices,
            camera_buffer,
            camera_bind_group,
            depth_view,
            window,
        }
    }

    fn create_depth_view(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> wgpu::TextureView {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d {
                width: config.width,
                height: config.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        let new_size = PhysicalSize::new(new_size.width.max(1), new_size.height.max(1));
        if new_size != self.size {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = Self::create_depth_view(&self.device, &self.config);
            log::debug!("Renderer resized to {}x{}", new_size.width, new_size.height);
        }
    }

    // Perspective transform derived from the world's free-camera pose.
    fn view_proj(&self, universe: &Universe) -> Mat4 {
        let eye = universe.world.camera_pos;
        let forward = -crate::utils::heading_vector(universe.world.camera_yaw);
        let aspect = self.config.width as f32 / self.config.height.max(1) as f32;
        let view = Mat4::look_to_rh(eye, forward, Vec3::Y);
        let proj = Mat4::perspective_rh(60.0_f32.to_radians(), aspect, 0.1, 500.0);
        proj * view
    }

    /// Draw one frame: clear, camera, ground, organisms, event flashes,
    /// present. With `capture` set, the finished frame is also read back
    /// and written out as a PNG (best effort).
    pub fn render(
        &mut self,
        universe: &Universe,
        capture: Option<&Path>,
    ) -> Result<(), wgpu::SurfaceError> {
        let output_texture = self.surface.get_current_texture()?;
        let view = output_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // Camera first, so everything below shares the same transform.
        let view_proj = self.view_proj(universe);
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[CameraUniform {
                view_proj: view_proj.to_cols_array_2d(),
            }]),
        );

        // The ground is just one flat instance; bodies sit on top of it.
        self.instance_data.clear();
        let half = universe.world.half_extent();
        self.instance_data.push(BodyInstance {
            position: [0.0, -0.05, 0.0],
            yaw: 0.0,
            half_size: [half.x, 0.05, half.z],
            color: GROUND_COLOR,
        });
        for o in universe.registry.iter() {
            self.instance_data.push(BodyInstance {
                position: [o.position.x, o.position.y + o.size.y, o.position.z],
                yaw: o.heading,
                half_size: o.size.to_array(),
                color: [o.color[0], o.color[1], o.color[2], 1.0],
            });
        }

        self.flash_data.clear();
        for flash in &universe.flashes {
            self.flash_data.push(FlashVertex {
                position: flash.a.to_array(),
                color: flash.color,
            });
            self.flash_data.push(FlashVertex {
                position: flash.b.to_array(),
                color: flash.color,
            });
        }

        // Grow GPU buffers when the population outruns them.
        let instance_count = self.instance_data.len();
        if instance_count > self.max_instances {
            let new_max = (instance_count * 2).next_power_of_two();
            log::debug!(
                "Resizing instance buffer from {} to {} instances",
                self.max_instances,
                new_max
            );
            self.instance_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Instance Buffer (Resized)"),
                size: (new_max * std::mem::size_of::<BodyInstance>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.max_instances = new_max;
        }
        let flash_vertex_count = self.flash_data.len();
        if flash_vertex_count > self.max_flash_vertices {
            let new_max = (flash_vertex_count * 2).next_power_of_two();
            self.flash_vertex_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Flash Vertex Buffer (Resized)"),
                size: (new_max * std::mem::size_of::<FlashVertex>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.max_flash_vertices = new_max;
        }

        if instance_count > 0 {
            self.queue.write_buffer(
                &self.instance_buffer,
                0,
                bytemuck::cast_slice(&self.instance_data),
            );
        }
        if flash_vertex_count > 0 {
            self.queue.write_buffer(
                &self.flash_vertex_buffer,
                0,
                bytemuck::cast_slice(&self.flash_data),
            );
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.body_pipeline);
            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.cube_vertex_buffer.slice(..));
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            render_pass.set_index_buffer(self.cube_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.draw_indexed(0..CUBE_INDICES.len() as u32, 0, 0..instance_count as u32);

            if flash_vertex_count > 0 {
                render_pass.set_pipeline(&self.flash_pipeline);
                render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
                render_pass.set_vertex_buffer(0, self.flash_vertex_buffer.slice(..));
                render_pass.draw(0..flash_vertex_count as u32, 0..1);
            }
        }

        // Optional frame readback, encoded before submission so the copy
        // sees the finished frame.
        let capture_state = capture.map(|path| {
            let (buffer, padded_bytes_per_row) =
                self.encode_capture(&mut encoder, &output_texture.texture);
            (path, buffer, padded_bytes_per_row)
        });

        self.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        output_texture.present();

        if let Some((path, buffer, padded_bytes_per_row)) = capture_state {
            self.finish_capture(path, buffer, padded_bytes_per_row);
        }

        Ok(())
    }

    // Queue a texture->buffer copy of the frame; rows padded to the wgpu
    // 256-byte alignment requirement.
    fn encode_capture(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        texture: &wgpu::Texture,
    ) -> (wgpu::Buffer, u32) {
        let bytes_per_row = self.config.width * 4;
        let padded_bytes_per_row =
            bytes_per_row.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT) * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Capture Buffer"),
            size: (padded_bytes_per_row * self.config.height) as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width: self.config.width,
                height: self.config.height,
                depth_or_array_layers: 1,
            },
        );
        (buffer, padded_bytes_per_row)
    }

    fn finish_capture(&self, path: &Path, buffer: wgpu::Buffer, padded_bytes_per_row: u32) {
        let slice = buffer.slice(..);
        slice.map_async(wgpu::MapMode::Read, |_| {});
        let _ = self.device.poll(wgpu::Maintain::Wait);

        let width = self.config.width;
        let height = self.config.height;
        let swap_bgra = matches!(
            self.config.format,
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb
        );

        let mut pixels = Vec::with_capacity((width * height * 4) as usize);
        {
            let data = slice.get_mapped_range();
            for row in 0..height {
                let start = (row * padded_bytes_per_row) as usize;
                let end = start + (width * 4) as usize;
                for chunk in data[start..end].chunks_exact(4) {
                    if swap_bgra {
                        pixels.extend_from_slice(&[chunk[2], chunk[1], chunk[0], 255]);
                    } else {
                        pixels.extend_from_slice(&[chunk[0], chunk[1], chunk[2], 255]);
                    }
                }
            }
        }
        buffer.unmap();

        match write_png(path, width, height, &pixels) {
            Ok(()) => log::info!("Screenshot written to {}", path.display()),
            Err(err) => log::warn!("Screenshot failed: {}", err),
        }
    }
}

fn write_png(
    path: &Path,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    let file = std::fs::File::create(path)?;
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(pixels)?;
    Ok(())
}
