// Exploded-view assembly viewer
// One instanced draw per distinct part mesh; the composer decides where
// every part is each frame, this file only gets it onto the screen.

mod controller;
mod obj;
mod picking;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Vec2, Vec3};
use wgpu::util::DeviceExt;
use winit::{
    event::{Event as WinitEvent, WindowEvent},
    event_loop::EventLoop,
    window::Window,
};

use explode_view::assembly::blend::FrameTime;
use explode_view::assembly::composer::{Composer, DrawRecord, PartGeometry};
use explode_view::assembly::registry::{Registry, Variant};
use explode_view::assembly::wear::{WearStatus, health_color, system_health};
use explode_view::engine::camera::OrbitCamera;
use explode_view::engine::components::Color;
use explode_view::engine::input::{Click, InputState};
use explode_view::engine::mesh::{Aabb, GpuVertex, RenderMesh};
use explode_view::engine::overlay::{FrameStats, SelectedCard, StatusOverlay, StatusPanel};

use controller::{Controller, ShellAction};
use picking::PickTarget;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[derive(Parser, Debug)]
#[command(version, about = "Interactive exploded-view viewer for mechanical assemblies")]
struct Args {
    /// Built-in assembly to show
    #[arg(long, value_enum, default_value_t = Variant::Car)]
    assembly: Variant,

    /// Start in the exploded layout
    #[arg(long)]
    exploded: bool,

    /// Directory that asset parts (OBJ meshes) are loaded from
    #[arg(long, default_value = "assets/models")]
    asset_dir: PathBuf,

    /// Start with camera auto-rotation off
    #[arg(long)]
    no_auto_rotate: bool,
}

// ============================================================================
// INSTANCE DATA (per-part)
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct InstanceData {
    model: [[f32; 4]; 4],
    color: [f32; 4],
    /// rgb + intensity
    emissive: [f32; 4],
}

impl InstanceData {
    const ATTRIBUTES: [wgpu::VertexAttribute; 6] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
    ];

    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<InstanceData>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }

    fn from_record(record: &DrawRecord) -> Self {
        let [r, g, b] = record.color.to_linear();
        let [er, eg, eb] = record.emissive.to_linear();
        Self {
            model: record.transform.matrix().to_cols_array_2d(),
            color: [r, g, b, 1.0],
            emissive: [er, eg, eb, record.emissive_intensity],
        }
    }
}

// ============================================================================
// UNIFORM DATA
// ============================================================================

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    light_dir: [f32; 4],
}

// ============================================================================
// GPU MESHES
// ============================================================================

/// Identity of an uploaded mesh. Solids are shared by handle, assets by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum MeshKey {
    Solid(usize),
    Asset(String),
}

impl MeshKey {
    fn of(geometry: &PartGeometry) -> Self {
        match geometry {
            PartGeometry::Solid(handle) => MeshKey::Solid(Arc::as_ptr(handle) as usize),
            PartGeometry::Asset(path) => MeshKey::Asset(path.clone()),
        }
    }
}

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    bounds: Aabb,
}

impl GpuMesh {
    fn upload(device: &wgpu::Device, label: &str, mesh: &RenderMesh, bounds: Aabb) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vertices")),
            contents: mesh.vertex_bytes(),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} indices")),
            contents: mesh.index_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self { vertex_buffer, index_buffer, index_count: mesh.index_count() as u32, bounds }
    }
}

/// Upload every distinct mesh the composer references. Assets that fail to
/// load are logged and their parts are simply not drawn.
fn upload_meshes(device: &wgpu::Device, composer: &Composer, asset_dir: &Path) -> HashMap<MeshKey, GpuMesh> {
    let mut meshes = HashMap::new();
    for spec in composer.registry().iter() {
        let Some(geometry) = composer.geometry(&spec.id) else { continue };
        let key = MeshKey::of(geometry);
        if meshes.contains_key(&key) {
            continue;
        }
        let mesh = match geometry {
            PartGeometry::Solid(solid) => GpuMesh::upload(device, &spec.id, &solid.mesh, solid.bounds),
            PartGeometry::Asset(path) => match obj::load_asset(&asset_dir.join(path)) {
                Ok((mesh, bounds)) => GpuMesh::upload(device, &spec.id, &mesh, bounds),
                Err(e) => {
                    log::error!("part `{}` will not be drawn: {:#}", spec.id, e);
                    continue;
                }
            },
        };
        meshes.insert(key, mesh);
    }
    log::info!("uploaded {} meshes", meshes.len());
    meshes
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity * std::mem::size_of::<InstanceData>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("Depth Texture"),
            size: wgpu::Extent3d { width: config.width.max(1), height: config.height.max(1), depth_or_array_layers: 1 },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default())
}

fn to_egui(color: Color) -> egui::Color32 {
    let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    egui::Color32::from_rgb(byte(color.r), byte(color.g), byte(color.b))
}

// ============================================================================
// APPLICATION STATE
// ============================================================================

struct State {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,
    depth_view: wgpu::TextureView,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    meshes: HashMap<MeshKey, GpuMesh>,

    composer: Composer,
    controller: Controller,
    camera: OrbitCamera,
    input: InputState,
    overlay: StatusOverlay,

    start: Instant,
    last_update: Instant,
    last_dt: f32,

    // Frame statistics, summarized once per second
    frame_times_ms: Vec<f32>,
    last_stats_update: Instant,
    stats: FrameStats,
}

impl State {
    async fn new(window: Arc<Window>, args: &Args) -> Result<Self> {
        let registry = Registry::builtin(args.assembly)
            .with_context(|| format!("Failed to load the {:?} assembly", args.assembly))?;
        let composer = Composer::new(registry);
        let controller = Controller::new(composer.registry(), args.exploded);

        let size = window.inner_size();

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No compatible GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .context("Failed to open GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("Surface reports no formats")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Part Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader_parts.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Uniform Buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("uniform_bind_group_layout"),
            });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("uniform_bind_group"),
        });

        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&uniform_bind_group_layout],
                push_constant_ranges: &[],
            });

        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GpuVertex::desc(), InstanceData::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                // Imported assets are not guaranteed to be consistently wound
                cull_mode: None,
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
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let depth_view = create_depth_view(&device, &config);
        let instance_capacity = composer.registry().len().max(1);
        let instance_buffer = create_instance_buffer(&device, instance_capacity);
        let meshes = upload_meshes(&device, &composer, &args.asset_dir);

        let mut camera = OrbitCamera::new();
        camera.auto_rotate = !args.no_auto_rotate;

        let overlay = StatusOverlay::new(&window, &device, surface_format);

        let now = Instant::now();
        Ok(Self {
            window,
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            depth_view,
            instance_buffer,
            instance_capacity,
            uniform_buffer,
            uniform_bind_group,
            meshes,
            composer,
            controller,
            camera,
            input: InputState::new(),
            overlay,
            start: now,
            last_update: now,
            last_dt: 0.0,
            frame_times_ms: Vec::new(),
            last_stats_update: now,
            stats: FrameStats {
                fps: 0,
                frame_time_avg_ms: 0.0,
                frame_time_min_ms: 0.0,
                frame_time_max_ms: 0.0,
                draw_calls: 0,
                triangles: 0,
                resolution: (size.width, size.height),
                camera_distance: 0.0,
            },
        })
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config);
        }
    }

    fn viewport(&self) -> Vec2 {
        Vec2::new(self.size.width.max(1) as f32, self.size.height.max(1) as f32)
    }

    /// Advance one frame. Returns false when the viewer should quit.
    fn update(&mut self) -> bool {
        let now = Instant::now();
        let dt = (now - self.last_update).as_secs_f32();
        self.last_update = now;
        self.last_dt = dt;
        let elapsed = (now - self.start).as_secs_f32();

        let clicks = self.input.take_clicks();
        if !self.overlay.wants_pointer() {
            for click in clicks {
                self.handle_click(click);
            }
        }

        for action in self.controller.update(&self.input, self.composer.registry(), dt) {
            match action {
                ShellAction::Quit => return false,
                ShellAction::ToggleStats => self.overlay.toggle_stats(),
                ShellAction::ToggleAutoRotate => self.camera.auto_rotate = !self.camera.auto_rotate,
            }
        }

        self.camera.update(&self.input, dt);
        self.composer.tick(&self.controller.view, FrameTime::new(dt, elapsed));
        true
    }

    fn handle_click(&mut self, click: Click) {
        let (x, y, double) = match click {
            Click::Single { x, y } => (x, y, false),
            Click::Double { x, y } => (x, y, true),
        };
        let (origin, dir) = self.camera.screen_ray(Vec2::new(x, y), self.viewport());

        let view = &self.controller.view;
        let records = self.composer.draw_records(view);
        let targets: Vec<PickTarget> = records
            .iter()
            .filter_map(|r| {
                let mesh = self.meshes.get(&MeshKey::of(&r.geometry))?;
                Some(PickTarget { id: &r.id, transform: r.transform, bounds: mesh.bounds })
            })
            .collect();

        let Some(id) = picking::pick(origin, dir, &targets) else { return };
        let change = if double {
            self.composer.on_double_click(view, id)
        } else {
            self.composer.on_select(view, id)
        };
        if let Some(change) = change {
            log::debug!("{} `{}`", if double { "double-click" } else { "click" }, id);
            self.controller.apply_selection(change);
        }
    }

    fn ensure_instance_capacity(&mut self, needed: usize) {
        if needed > self.instance_capacity {
            self.instance_capacity = needed.next_power_of_two();
            self.instance_buffer = create_instance_buffer(&self.device, self.instance_capacity);
        }
    }

    fn status_panel(&self, parts_visible: usize) -> StatusPanel {
        let registry = self.composer.registry();
        let view = &self.controller.view;

        let health = registry.iter().any(|p| p.kind().has_wear()).then(|| {
            let health = system_health(registry, view);
            (health, to_egui(health_color(health)))
        });

        let selected = view.selected.as_deref().and_then(|id| registry.get(id)).map(|spec| {
            let kind = spec.kind();
            SelectedCard {
                name: spec.display_name.clone(),
                description: spec.description.clone(),
                kind: kind.name(),
                moving: view.is_moving(&spec.id),
                open: kind.is_hinged().then(|| view.is_open(&spec.id)),
                wear: kind.has_wear().then(|| {
                    let wear = view.wear(&spec.id);
                    let status = WearStatus::from_wear(wear);
                    (wear, status.label(), to_egui(status.color()))
                }),
            }
        });

        StatusPanel {
            title: registry.name().to_string(),
            exploded: view.exploded,
            auto_rotate: self.camera.auto_rotate,
            parts_visible,
            parts_total: registry.len(),
            health,
            selected,
            failures: self
                .composer
                .geometry_failures()
                .iter()
                .map(|f| format!("{}: {}", f.id, f.error))
                .collect(),
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        // Group instances by mesh so each distinct mesh is one draw call
        let records = self.composer.draw_records(&self.controller.view);
        let mut batches: Vec<(MeshKey, Vec<InstanceData>)> = Vec::new();
        for record in &records {
            let key = MeshKey::of(&record.geometry);
            if !self.meshes.contains_key(&key) {
                continue;
            }
            let instance = InstanceData::from_record(record);
            match batches.iter_mut().find(|(k, _)| *k == key) {
                Some((_, list)) => list.push(instance),
                None => batches.push((key, vec![instance])),
            }
        }
        let instance_data: Vec<InstanceData> = batches.iter().flat_map(|(_, list)| list.iter().copied()).collect();

        self.ensure_instance_capacity(instance_data.len());
        if !instance_data.is_empty() {
            self.queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instance_data));
        }

        let aspect = self.config.width as f32 / self.config.height as f32;
        let eye = self.camera.camera_position();
        let uniforms = Uniforms {
            view_proj: self.camera.view_projection(aspect).to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
            light_dir: Vec3::new(-0.4, -1.0, -0.3).normalize().extend(0.0).to_array(),
        };
        self.queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let mut draw_calls = 0;
        let mut triangles = 0;
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.02,
                            g: 0.03,
                            b: 0.06,
                            a: 1.0,
                        }),
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
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            let mut first = 0u32;
            for (key, list) in &batches {
                let Some(mesh) = self.meshes.get(key) else { continue };
                let count = list.len() as u32;
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, first..first + count);
                first += count;
                draw_calls += 1;
                triangles += (mesh.index_count / 3) as usize * list.len();
            }
        }
        self.stats.draw_calls = draw_calls;
        self.stats.triangles = triangles;
        self.stats.resolution = (self.size.width, self.size.height);
        self.stats.camera_distance = self.camera.distance();

        let panel = self.status_panel(records.len());
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: self.window.scale_factor() as f32,
        };
        self.overlay.render(
            &self.device,
            &self.queue,
            &mut encoder,
            &self.window,
            &view,
            &screen_descriptor,
            &panel,
            &self.stats,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    /// Fold the last frame into the once-per-second statistics.
    fn record_frame(&mut self) {
        self.frame_times_ms.push(self.last_dt * 1000.0);
        let now = Instant::now();
        if (now - self.last_stats_update).as_secs_f32() < 1.0 {
            return;
        }
        let times = std::mem::take(&mut self.frame_times_ms);
        self.stats.fps = times.len() as u32;
        self.stats.frame_time_avg_ms = times.iter().sum::<f32>() / times.len().max(1) as f32;
        self.stats.frame_time_min_ms = times.iter().copied().fold(f32::INFINITY, f32::min);
        self.stats.frame_time_max_ms = times.iter().copied().fold(0.0, f32::max);
        self.last_stats_update = now;
        log::debug!(
            "FPS: {} | Draw calls: {} | Triangles: {}",
            self.stats.fps,
            self.stats.draw_calls,
            self.stats.triangles
        );
    }
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let event_loop = EventLoop::new().context("Failed to create event loop")?;

    let window_attributes = Window::default_attributes()
        .with_title(format!("Exploded View - {:?}", args.assembly))
        .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));

    let window = Arc::new(event_loop.create_window(window_attributes).context("Failed to create window")?);

    let mut state = pollster::block_on(State::new(window.clone(), &args))?;

    event_loop.run(move |event, control_flow| {
        match event {
            WinitEvent::WindowEvent {
                ref event,
                window_id,
            } if window_id == window.id() => {
                let response = state.overlay.handle_window_event(&window, event);
                match event {
                    WindowEvent::CloseRequested => control_flow.exit(),
                    WindowEvent::Resized(physical_size) => {
                        state.resize(*physical_size);
                        state.input.process_event(event);
                    }
                    WindowEvent::RedrawRequested => {
                        if !state.update() {
                            control_flow.exit();
                            return;
                        }
                        match state.render() {
                            Ok(_) => {}
                            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => state.resize(state.size),
                            Err(wgpu::SurfaceError::OutOfMemory) => {
                                log::error!("GPU out of memory");
                                control_flow.exit();
                            }
                            Err(e) => log::warn!("surface error: {:?}", e),
                        }
                        state.input.end_frame();
                        state.record_frame();
                    }
                    _ if !response.consumed => {
                        state.input.set_time(state.start.elapsed().as_secs_f32());
                        state.input.process_event(event);
                    }
                    _ => {}
                }
            }
            WinitEvent::AboutToWait => {
                window.request_redraw();
            }
            _ => {}
        }
    })
    .context("Event loop failed")?;

    Ok(())
}
