use nalgebra::Vector4;
use rayon::prelude::*;

use crate::util::vec4_to_rgba;

/// 누적 합 버퍼와 출력 버퍼. 둘 다 현재 뷰포트 크기를 따름
pub struct FrameBuffers {
    width: u32,
    height: u32,
    accumulation: Vec<Vector4<f32>>,
    image: Vec<u32>,
}

impl FrameBuffers {
    pub fn new(width: u32, height: u32) -> Self {
        let mut buffers = Self {
            width: 0,
            height: 0,
            accumulation: vec![],
            image: vec![],
        };
        buffers.resize(width, height);
        buffers
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 크기가 바뀌었으면 true. 같거나 0이면 기존 내용 그대로
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if (self.width, self.height) == (width, height) || width == 0 || height == 0 {
            return false;
        }

        let pixels = width as usize * height as usize;
        self.width = width;
        self.height = height;
        self.accumulation = vec![Vector4::zeros(); pixels];
        self.image = vec![0; pixels];

        true
    }

    pub fn clear_accumulation(&mut self) {
        self.accumulation
            .par_iter_mut()
            .for_each(|sum| *sum = Vector4::zeros());
    }

    pub fn accumulation(&self) -> &[Vector4<f32>] {
        &self.accumulation
    }

    pub fn image(&self) -> &[u32] {
        &self.image
    }

    /// 한 줄씩 (y, (누적 합, 출력)) 로 나눠줌. 줄끼리 겹치는 칸이 없으니 락이 필요 없음
    pub fn rows_mut(
        &mut self,
    ) -> impl IndexedParallelIterator<Item = (usize, (&mut [Vector4<f32>], &mut [u32]))> + '_ {
        // 빈 버퍼면 chunk 크기가 0이 되지 않게 1로 둠 (어차피 도는 줄이 없음)
        let width = (self.width as usize).max(1);

        self.accumulation
            .par_chunks_mut(width)
            .zip(self.image.par_chunks_mut(width))
            .enumerate()
    }
}

/// 누적 합을 프레임 수로 나누고 [0, 1]로 자른 뒤 RGBA로 묶음. 감마 보정 없음
pub fn resolve(sum: &Vector4<f32>, frame_index: u32) -> u32 {
    let average = sum / frame_index.max(1) as f32;
    let clamped = average.map(|channel| channel.clamp(0.0, 1.0));

    vec4_to_rgba(&clamped)
}
