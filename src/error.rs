use thiserror::Error;

/// 뷰어를 띄우는 동안 생길 수 있는 오류. 렌더링 자체는 실패하지 않음
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),

    #[error("no GPU adapter is compatible with the window surface")]
    Adapter,

    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}
