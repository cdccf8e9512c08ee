use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytemuck::cast_slice;
use log::{debug, trace, warn};
use nalgebra::Vector4;
use rayon::prelude::*;

use crate::camera::RaySource;
use crate::renderer::accumulation::{resolve, FrameBuffers};
use crate::renderer::integrator::{pixel_rng, PathIntegrator};
use crate::renderer::sampling::{BounceSampler, UnitSphereSampler};
use crate::renderer::scene::Scene;

pub mod accumulation;
pub mod integrator;
pub mod ray;
pub mod sampling;
pub mod scene;
pub mod settings;
pub mod trace;

pub use settings::{Settings, Shading};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    Completed,
    /// 중간에 멈춤. 다음 프레임은 누적을 처음부터 다시 시작함
    Cancelled,
    /// 뷰포트 크기가 0이라 아무것도 안함
    Skipped,
}

pub struct Renderer<S: BounceSampler = UnitSphereSampler> {
    buffers: FrameBuffers,
    frame_index: u32,
    // 누적 여부와 상관없이 끝난 프레임마다 1씩 늘어남. 난수 시드에 섞음
    passes: u64,
    sampler: S,
    last_frame_time: Duration,
    pub settings: Settings,
}

impl Renderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_sampler(width, height, UnitSphereSampler)
    }
}

impl<S: BounceSampler> Renderer<S> {
    pub fn with_sampler(width: u32, height: u32, sampler: S) -> Self {
        Self {
            buffers: FrameBuffers::new(width, height),
            frame_index: 1,
            passes: 0,
            sampler,
            last_frame_time: Duration::ZERO,
            settings: Default::default(),
        }
    }

    pub fn width(&self) -> u32 {
        self.buffers.width()
    }

    pub fn height(&self) -> u32 {
        self.buffers.height()
    }

    /// 패킹된 RGBA (R이 가장 낮은 바이트)
    pub fn output(&self) -> &[u32] {
        self.buffers.image()
    }

    pub fn output_bytes(&self) -> &[u8] {
        cast_slice(self.buffers.image())
    }

    pub fn accumulation(&self) -> &[Vector4<f32>] {
        self.buffers.accumulation()
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn last_frame_time(&self) -> Duration {
        self.last_frame_time
    }

    /// 버퍼만 새로 만듦. 프레임 번호 초기화는 호출하는 쪽이 reset_frame_index로 따로 해야 함
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.buffers.resize(width, height) {
            debug!("Renderer buffers resized to {width}x{height}");
        }
    }

    pub fn reset_frame_index(&mut self) {
        if self.frame_index != 1 {
            debug!("Accumulation reset after {} frames", self.frame_index - 1);
        }
        self.frame_index = 1;
    }

    pub fn render<C>(&mut self, scene: &Scene, camera: &C) -> PassOutcome
    where
        C: RaySource + Sync + ?Sized,
    {
        self.render_pass(scene, camera, None)
    }

    /// 줄마다 cancel을 확인함. 멈췄으면 누적 버퍼가 반쯤 더해진 상태라 프레임 번호를 1로 되돌림
    pub fn render_cancellable<C>(&mut self, scene: &Scene, camera: &C, cancel: &AtomicBool) -> PassOutcome
    where
        C: RaySource + Sync + ?Sized,
    {
        self.render_pass(scene, camera, Some(cancel))
    }

    fn render_pass<C>(&mut self, scene: &Scene, camera: &C, cancel: Option<&AtomicBool>) -> PassOutcome
    where
        C: RaySource + Sync + ?Sized,
    {
        if self.buffers.is_empty() {
            return PassOutcome::Skipped;
        }

        assert_eq!(
            camera.ray_directions().len(),
            self.buffers.len(),
            "camera ray directions must match the {}x{} viewport",
            self.width(),
            self.height()
        );

        let started = Instant::now();

        if self.frame_index == 1 {
            self.buffers.clear_accumulation();
        }

        let width = self.buffers.width() as usize;
        let frame_index = self.frame_index;
        let seed = self.settings.seed;
        let pass = self.passes;
        let integrator = PathIntegrator::new(scene, camera, &self.sampler, &self.settings);
        let interrupted = AtomicBool::new(false);

        self.buffers.rows_mut().for_each(|(y, (sums, pixels))| {
            if cancel.map_or(false, |flag| flag.load(Ordering::Relaxed)) {
                interrupted.store(true, Ordering::Relaxed);
                return;
            }

            sums.par_iter_mut()
                .zip(pixels.par_iter_mut())
                .enumerate()
                .for_each(|(x, (sum, pixel))| {
                    let index = y * width + x;
                    let mut rng = pixel_rng(seed, pass, index);

                    *sum += integrator.per_pixel(index, &mut rng);
                    *pixel = resolve(sum, frame_index);
                });
        });

        if interrupted.into_inner() {
            warn!("Render pass cancelled at frame {frame_index}, accumulation restarts");
            self.frame_index = 1;
            return PassOutcome::Cancelled;
        }

        self.passes = self.passes.wrapping_add(1);
        self.last_frame_time = started.elapsed();
        trace!(
            "Frame {frame_index} ({}x{}) took {:.3}ms",
            self.width(),
            self.height(),
            self.last_frame_time.as_secs_f64() * 1000.0
        );

        if self.settings.accumulate {
            self.frame_index = self.frame_index.saturating_add(1);
        } else {
            self.frame_index = 1;
        }

        PassOutcome::Completed
    }
}
