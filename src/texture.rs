use wgpu::{
    Device, Extent3d, ImageCopyTexture, ImageDataLayout, Origin3d, Queue, Texture, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};

/// 렌더러 출력 버퍼를 GPU로 올릴 때 쓰는 텍스쳐
pub struct Image {
    pub gpu_texture: Texture,
    pub view: TextureView,
    pub name: String,
}

impl Image {
    pub fn new(device: &Device, width: u32, height: u32, label: &str) -> Image {
        // wgpu는 크기가 0인 텍스쳐를 못 만듦
        let width = width.max(1);
        let height = height.max(1);

        let gpu_texture = device.create_texture(&TextureDescriptor {
            label: Some(label),
            size: Extent3d {
                width,
                height,
                depth_or_array_layers: 1, // 이미지의 레이어 갯수. 단순한 2차원 이미지니 1개로
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            // 렌더러가 감마 보정 없이 0~255로 잘라서 넘겨주니 sRGB 변환 없이 그대로 씀
            format: TextureFormat::Rgba8Unorm,

            // Texture Binding: 쉐이더에서 쓸 예정
            // Copy destination: CPU에서 GPU로 데이터가 복사될 예정
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });

        let view = gpu_texture.create_view(&TextureViewDescriptor {
            label: Some(&format!("{} view", label)),
            ..Default::default() // label 빼고 나머진 기본값 그대로
        });

        Self {
            gpu_texture,
            view,
            name: label.to_string(),
        }
    }

    pub fn load_image(&mut self, queue: &Queue, rgba: &[u8]) {
        let pixel_count = {
            let size = self.gpu_texture.size();
            size.width * size.height
        } as usize;
        assert_eq!(
            pixel_count,
            rgba.len() / 4,
            "{}: pixel data does not match the texture size",
            self.name
        );

        queue.write_texture(
            ImageCopyTexture {
                texture: &self.gpu_texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            rgba,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.gpu_texture.width()),
                rows_per_image: Some(self.gpu_texture.height()),
            },
            self.gpu_texture.size(),
        )
    }

    /// 새로 만들었으면 true. egui에 등록된 view도 갈아 끼워야 함
    pub fn resize(&mut self, device: &Device, width: u32, height: u32) -> bool {
        if self.size() == (width.max(1), height.max(1)) {
            return false;
        }

        let new = Self::new(device, width, height, &self.name);
        self.view = new.view;
        self.gpu_texture = new.gpu_texture;
        true
    }

    pub fn size(&self) -> (u32, u32) {
        (self.gpu_texture.width(), self.gpu_texture.height())
    }
}
