pub mod camera;
pub mod renderer;
pub mod util;

#[cfg(feature = "viewer")]
mod app;
#[cfg(feature = "viewer")]
mod error;
#[cfg(feature = "viewer")]
mod texture;

pub use camera::{Camera, Movement, RaySource};
pub use renderer::scene::{Material, Scene, SceneError, Sphere};
pub use renderer::{PassOutcome, Renderer, Settings, Shading};

#[cfg(feature = "viewer")]
pub use error::ViewerError;

/// 창을 띄우고 이벤트 루프를 돌림. 초기화에 실패했을 때만 돌아옴
#[cfg(feature = "viewer")]
pub fn run() -> Result<(), ViewerError> {
    use log::{error, info, warn};
    use wgpu::SurfaceError;
    use winit::dpi::LogicalSize;
    use winit::event::{DeviceEvent, ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
    use winit::event_loop::{ControlFlow, EventLoop};
    use winit::window::WindowBuilder;

    use crate::app::Application;

    // RUST_LOG로 로그 수준 조절
    env_logger::init();

    let settings = Settings::from_env();
    info!("Starting with {settings:?}");

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("Ember: Path Tracer")
        .with_inner_size(LogicalSize::new(1280.0, 720.0))
        .build(&event_loop)?;

    let mut app = pollster::block_on(Application::new(window, &event_loop, settings))?;

    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == app.window.id() => {
            if app.input(event) {
                return;
            }

            match event {
                // 만약 앱을 운영체제에서 닫으려고 하거나 ESC가 눌러졌다면
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            state: ElementState::Pressed,
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            ..
                        },
                    ..
                } => *control_flow = ControlFlow::ExitWithCode(0), // 나가기
                WindowEvent::Resized(size) => app.resize(*size),
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => app.resize(**new_inner_size),
                _ => {}
            }
        }
        Event::DeviceEvent {
            event: DeviceEvent::MouseMotion { delta },
            ..
        } => app.mouse_motion(delta),
        Event::RedrawRequested(window_id) if window_id == app.window.id() => {
            app.update();
            match app.render() {
                Ok(()) => {}
                // surface를 다시 설정
                Err(SurfaceError::Lost | SurfaceError::Outdated) => app.resize(app.size),
                Err(SurfaceError::OutOfMemory) => {
                    error!("GPU is out of memory");
                    *control_flow = ControlFlow::ExitWithCode(1);
                }
                Err(other) => warn!("Frame dropped: {other:?}"),
            }
        }
        Event::MainEventsCleared => app.window.request_redraw(),
        _ => {}
    });
}
