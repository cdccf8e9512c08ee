use std::iter;
use std::time::Instant;

use eframe::egui::{self, ClippedPrimitive, DragValue, TextureId, Ui};
use log::{info, warn};
use nalgebra::{Vector2, Vector3};
use wgpu::{
    Backends, Color, CommandEncoder, CommandEncoderDescriptor, CompositeAlphaMode, Device,
    DeviceDescriptor, Dx12Compiler, Features, FilterMode, Instance, InstanceDescriptor, Limits,
    LoadOp, Operations, PowerPreference, PresentMode, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RequestAdapterOptions, Surface, SurfaceConfiguration, SurfaceError,
    TextureUsages, TextureViewDescriptor,
};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyboardInput, MouseButton, VirtualKeyCode, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::{CursorGrabMode, Window};

use crate::camera::{Camera, Movement, RaySource};
use crate::error::ViewerError;
use crate::renderer::scene::Scene;
use crate::renderer::{PassOutcome, Renderer, Settings, Shading};
use crate::texture::Image;

pub struct Application {
    surface: Surface,
    device: Device,
    queue: Queue,
    config: SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    // 무조건 winit의 Window를 쓸 것!
    pub window: Window,
    egui_state: egui_winit::State,
    egui_context: egui::Context,
    egui_renderer: egui_wgpu::Renderer,
    egui_screen: egui_wgpu::renderer::ScreenDescriptor,

    renderer: Renderer,
    camera: Camera,
    scene: Scene,
    output: Image,
    output_id: TextureId,

    // egui 중앙 패널이 차지하는 크기 (물리 픽셀)
    viewport: (u32, u32),
    viewport_hovered: bool,
    reset_requested: bool,
    scene_invalid: bool,

    movement: Movement,
    mouse_look: bool,
    pending_rotation: Vector2<f32>,
    last_update: Instant,
}

/// UI 한 프레임이 남기는 결과
#[derive(Default)]
struct UiResponse {
    reset: bool,
    viewport: (u32, u32),
    viewport_hovered: bool,
}

impl Application {
    pub async fn new(
        window: Window,
        event_loop: &EventLoop<()>,
        settings: Settings,
    ) -> Result<Self, ViewerError> {
        let size = window.inner_size();

        // instance는 Adapter와 Surface를 만들어주며 이들에 필요한 정보를 제공함.
        let instance = Instance::new(InstanceDescriptor {
            backends: Backends::all(),
            dx12_shader_compiler: Dx12Compiler::default(),
        });

        // 전달하는 &window가 생성하는 surface보다 오래 유지되어야 함. Application이 둘 다 가지고 있으니 괜찮음
        let surface = unsafe { instance.create_surface(&window) }?;

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::default(),
                force_fallback_adapter: false,
                compatible_surface: Some(&surface),
            })
            .await
            .ok_or(ViewerError::Adapter)?;
        info!("Using adapter {:?}", adapter.get_info());

        // device: GPU 장치
        // queue: GPU에 보낼 명령어들을 저장하는 큐
        let (device, queue) = adapter
            .request_device(
                &DeviceDescriptor {
                    features: Features::empty(),
                    limits: Limits::default(),
                    label: Some("Ember GPU"),
                },
                None,
            )
            .await?;

        let capabilities = surface.get_capabilities(&adapter);

        // 색 포맷으로 sRGB 사용. 없으면 처음 것
        let surface_format = capabilities
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .copied()
            .unwrap_or(capabilities.formats[0]);
        let config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: PresentMode::AutoVsync,
            alpha_mode: CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let mut egui_state = egui_winit::State::new(event_loop);
        egui_state.set_pixels_per_point(window.scale_factor() as f32);
        let egui_context = egui::Context::default();

        let mut egui_renderer = egui_wgpu::Renderer::new(
            &device,
            surface_format,
            None, // 깊이 안씀
            1,    // 멀티 샘플링 1번만 할꺼임
        );
        let egui_screen = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [config.width, config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        let output = Image::new(&device, 1, 1, "Ember Output");
        let output_id = egui_renderer.register_native_texture(&device, &output.view, FilterMode::Linear);

        let mut renderer = Renderer::new(0, 0);
        renderer.settings = settings;

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            window,
            egui_state,
            egui_context,
            egui_renderer,
            egui_screen,
            renderer,
            camera: Camera::new(45.0, 0.1, 100.0),
            scene: Scene::demo(),
            output,
            output_id,
            viewport: (0, 0),
            viewport_hovered: false,
            reset_requested: false,
            scene_invalid: false,
            movement: Movement::default(),
            mouse_look: false,
            pending_rotation: Vector2::zeros(),
            last_update: Instant::now(),
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }

        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);

        self.egui_screen.pixels_per_point = self.window.scale_factor() as f32;
        self.egui_screen.size_in_pixels = [self.config.width, self.config.height];
    }

    // true: 앱에서 입력 처리를 했으니 따로 관리할 필요 없음
    // false: 아래 event loop에서 처리 해야 함.
    pub fn input(&mut self, event: &WindowEvent) -> bool {
        // 뷰포트 위에서 누른 오른쪽 버튼은 egui보다 카메라가 먼저
        if let WindowEvent::MouseInput {
            state,
            button: MouseButton::Right,
            ..
        } = event
        {
            let pressed = matches!(state, ElementState::Pressed);
            if pressed && self.viewport_hovered {
                self.set_mouse_look(true);
                return true;
            }
            if !pressed && self.mouse_look {
                self.set_mouse_look(false);
                return true;
            }
        }

        let egui_response = self.egui_state.on_event(&self.egui_context, event);
        if egui_response.consumed {
            return true;
        }

        match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(key),
                        ..
                    },
                ..
            } => {
                let is_press = matches!(state, ElementState::Pressed);
                match key {
                    VirtualKeyCode::W => self.movement.forward = is_press,
                    VirtualKeyCode::A => self.movement.left = is_press,
                    VirtualKeyCode::S => self.movement.backward = is_press,
                    VirtualKeyCode::D => self.movement.right = is_press,
                    VirtualKeyCode::Space => self.movement.up = is_press,
                    VirtualKeyCode::LShift => self.movement.down = is_press,
                    _ => return false,
                }
                true
            }
            _ => false,
        }
    }

    pub fn mouse_motion(&mut self, delta: (f64, f64)) {
        if self.mouse_look {
            self.pending_rotation += Vector2::new(delta.0 as f32, delta.1 as f32);
        }
    }

    fn set_mouse_look(&mut self, enabled: bool) {
        self.mouse_look = enabled;

        let grab = if enabled {
            self.window
                .set_cursor_grab(CursorGrabMode::Locked)
                .or_else(|_| self.window.set_cursor_grab(CursorGrabMode::Confined))
        } else {
            self.window.set_cursor_grab(CursorGrabMode::None)
        };
        if let Err(error) = grab {
            warn!("Cursor grab failed: {error}");
        }
        self.window.set_cursor_visible(!enabled);
    }

    /// 카메라를 움직이고 한 프레임 경로 추적 후 결과를 텍스쳐로 올림
    pub fn update(&mut self) {
        let now = Instant::now();
        let time_step = now.duration_since(self.last_update).as_secs_f32().min(1.0 / 30.0);
        self.last_update = now;

        let mut moved = false;
        if self.mouse_look {
            moved |= self.camera.update(&self.movement, time_step);
            moved |= self.camera.rotate(self.pending_rotation);
        }
        self.pending_rotation = Vector2::zeros();

        if moved || self.reset_requested {
            self.renderer.reset_frame_index();
            self.reset_requested = false;
        }

        match self.scene.validate() {
            Ok(()) => self.scene_invalid = false,
            Err(error) => {
                if !self.scene_invalid {
                    warn!("Scene skipped: {error}");
                }
                self.scene_invalid = true;
                return;
            }
        }

        let (width, height) = self.viewport;
        self.renderer.resize(width, height);
        self.camera.resize(width, height);

        if self.renderer.render(&self.scene, &self.camera) != PassOutcome::Completed {
            return;
        }

        let (width, height) = (self.renderer.width(), self.renderer.height());
        if self.output.resize(&self.device, width, height) {
            self.egui_renderer.update_egui_texture_from_wgpu_texture(
                &self.device,
                &self.output.view,
                FilterMode::Linear,
                self.output_id,
            );
        }
        self.output.load_image(&self.queue, self.renderer.output_bytes());
    }

    pub fn render(&mut self) -> Result<(), SurfaceError> {
        let output = self.surface.get_current_texture()?; // 렌더링 결과를 출력할 곳

        let view = output.texture.create_view(&TextureViewDescriptor::default());
        // encoder는 GPU에 보내는 명령들을 임시적으로 저장하는 것
        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("Encoder"),
        });

        let (primitives, callbacks) = self.update_egui(&mut encoder);

        // render_pass가 encoder를 빌려오기 때문에 아래처럼 따로 빼지 않으면 앞으로 계속 쓸 수 없음
        {
            let mut render_pass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            self.egui_renderer
                .render(&mut render_pass, &primitives, &self.egui_screen);
        }

        self.queue
            .submit(callbacks.into_iter().chain(iter::once(encoder.finish())));
        output.present();

        Ok(())
    }

    fn update_egui(
        &mut self,
        encoder: &mut CommandEncoder,
    ) -> (Vec<ClippedPrimitive>, Vec<wgpu::CommandBuffer>) {
        let egui_input = self.egui_state.take_egui_input(&self.window);
        let context = self.egui_context.clone();
        let pixels_per_point = self.egui_screen.pixels_per_point;

        let mut response = UiResponse::default();
        let egui_output = context.run(egui_input, |ctx| {
            response = draw_ui(
                ctx,
                &mut self.renderer,
                &mut self.scene,
                &self.camera,
                self.output_id,
                pixels_per_point,
            );
        });

        self.viewport = response.viewport;
        self.viewport_hovered = response.viewport_hovered;
        self.reset_requested |= response.reset;

        self.egui_state.handle_platform_output(
            &self.window,
            &self.egui_context,
            egui_output.platform_output,
        );
        let primitives = self.egui_context.tessellate(egui_output.shapes);
        for (id, delta) in &egui_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        for id in &egui_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        let callbacks = self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &primitives,
            &self.egui_screen,
        );

        (primitives, callbacks)
    }
}

fn draw_ui(
    ctx: &egui::Context,
    renderer: &mut Renderer,
    scene: &mut Scene,
    camera: &Camera,
    output_id: TextureId,
    pixels_per_point: f32,
) -> UiResponse {
    let mut response = UiResponse::default();

    egui::SidePanel::right("Side Menu")
        .resizable(true)
        .width_range(160.0..=512.0)
        .default_width(280.0)
        .show(ctx, |ui| {
            ui.heading("Settings");
            ui.label(format!(
                "Last render: {:.3}ms",
                renderer.last_frame_time().as_secs_f64() * 1000.0
            ));
            ui.label(format!("Frame: {}", renderer.frame_index()));

            let (width, height) = camera.viewport();
            let (position, forward) = (camera.position(), camera.forward());
            ui.label(format!("Viewport: {width}x{height}"));
            ui.label(format!(
                "Camera: ({:.2}, {:.2}, {:.2}) -> ({:.2}, {:.2}, {:.2})",
                position.x, position.y, position.z, forward.x, forward.y, forward.z
            ));

            ui.checkbox(&mut renderer.settings.accumulate, "Accumulate");
            response.reset |= ui
                .checkbox(&mut renderer.settings.sky_light, "Sky light")
                .changed();
            response.reset |= ui
                .add(egui::Slider::new(&mut renderer.settings.bounces, 1..=16).text("Bounces"))
                .changed();

            let shading = renderer.settings.shading;
            egui::ComboBox::from_label("Shading")
                .selected_text(shading.as_str())
                .show_ui(ui, |ui| {
                    for option in [Shading::PathTraced, Shading::DirectLight] {
                        ui.selectable_value(&mut renderer.settings.shading, option, option.as_str());
                    }
                });
            response.reset |= renderer.settings.shading != shading;

            if ui.button("Reset").clicked() {
                response.reset = true;
            }

            ui.separator();
            ui.heading("Scene");
            egui::ScrollArea::vertical().show(ui, |ui| {
                response.reset |= scene_editor(ui, scene);
            });
        });

    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(ctx, |ui| {
            let size = ui.available_size();
            response.viewport = (
                (size.x * pixels_per_point) as u32,
                (size.y * pixels_per_point) as u32,
            );

            // 렌더러의 첫 줄이 화면 아래쪽이라 위아래를 뒤집어서 그림
            let image = ui.add(egui::Image::new(output_id, size).uv(egui::Rect::from_min_max(
                egui::pos2(0.0, 1.0),
                egui::pos2(1.0, 0.0),
            )));
            response.viewport_hovered = image.hovered();
        });

    response
}

/// 값이 하나라도 바뀌었으면 true
fn scene_editor(ui: &mut Ui, scene: &mut Scene) -> bool {
    let mut changed = false;
    let last_material = scene.materials.len().saturating_sub(1);

    for (index, sphere) in scene.spheres.iter_mut().enumerate() {
        ui.push_id(("sphere", index), |ui| {
            ui.label(format!("Sphere {index}"));
            changed |= drag_vector(ui, "Position", &mut sphere.position);
            changed |= ui
                .add(
                    DragValue::new(&mut sphere.radius)
                        .speed(0.1)
                        .clamp_range(0.01..=f32::MAX)
                        .prefix("Radius "),
                )
                .changed();
            changed |= ui
                .add(
                    DragValue::new(&mut sphere.material_index)
                        .speed(1.0)
                        .clamp_range(0..=last_material)
                        .prefix("Material "),
                )
                .changed();
            ui.separator();
        });
    }

    for (index, material) in scene.materials.iter_mut().enumerate() {
        ui.push_id(("material", index), |ui| {
            ui.label(format!("Material {index}"));
            changed |= color_edit(ui, "Albedo", &mut material.albedo);
            changed |= ui
                .add(
                    DragValue::new(&mut material.roughness)
                        .speed(0.05)
                        .clamp_range(0.0..=1.0)
                        .prefix("Roughness "),
                )
                .changed();
            changed |= ui
                .add(
                    DragValue::new(&mut material.metallic)
                        .speed(0.05)
                        .clamp_range(0.0..=1.0)
                        .prefix("Metallic "),
                )
                .changed();
            changed |= color_edit(ui, "Emission Color", &mut material.emission_color);
            changed |= ui
                .add(
                    DragValue::new(&mut material.emission_power)
                        .speed(0.05)
                        .clamp_range(0.0..=f32::MAX)
                        .prefix("Emission Power "),
                )
                .changed();
            ui.separator();
        });
    }

    changed
}

fn drag_vector(ui: &mut Ui, label: &str, value: &mut Vector3<f32>) -> bool {
    ui.horizontal(|ui| {
        let mut changed = false;
        for axis in 0..3 {
            changed |= ui.add(DragValue::new(&mut value[axis]).speed(0.1)).changed();
        }
        ui.label(label);
        changed
    })
    .inner
}

fn color_edit(ui: &mut Ui, label: &str, color: &mut Vector3<f32>) -> bool {
    let mut rgb = [color.x, color.y, color.z];
    let changed = ui
        .horizontal(|ui| {
            let changed = ui.color_edit_button_rgb(&mut rgb).changed();
            ui.label(label);
            changed
        })
        .inner;

    if changed {
        *color = Vector3::from(rgb);
    }
    changed
}
