//! Two-window showcase.
//!
//! The first window draws a scene into an offscreen target and shows it
//! through a wave shader. The second one draws a particle ring on its own
//! renderer. `SABLE_API` picks the graphics API (vulkan, metal, dx12, gl).

use std::collections::HashMap;
use std::f32::consts::TAU;

use anyhow::Context;
use sable_engine::RendererError;
use sable_engine::coords::{Anchor, Rect, Vec2};
use sable_engine::core::{App, AppControl, FrameCtx};
use sable_engine::device::{Gpu, GpuInit, GraphicsApi};
use sable_engine::logging::{LoggingConfig, init_logging};
use sable_engine::paint::Color;
use sable_engine::render::{
    RenderTargetDesc, RenderTargetId, Renderer, SampleCount, ShaderDesc, ShaderId, TextureDesc,
    TextureId, UniformDesc, UniformStage, UniformType,
};
use sable_engine::window::{Runtime, RuntimeConfig};
use winit::window::WindowId;

const SCENE_SIZE: (u32, u32) = (1280, 720);
const CHECKER_SIZE: u32 = 64;

/// Resources of the window showing the offscreen scene.
struct Showcase {
    target: RenderTargetId,
    checker: TextureId,
    wave: ShaderId,
}

enum WindowKind {
    Showcase(Showcase),
    Particles,
}

#[derive(Default)]
struct Demo {
    windows: HashMap<WindowId, WindowKind>,
    second_window_requested: bool,
}

impl App for Demo {
    fn on_window_created(
        &mut self,
        window_id: WindowId,
        renderer: &mut Renderer<Gpu<'_>>,
    ) -> anyhow::Result<()> {
        let kind = if self.windows.is_empty() {
            WindowKind::Showcase(create_showcase(renderer)?)
        } else {
            WindowKind::Particles
        };
        self.windows.insert(window_id, kind);
        Ok(())
    }

    fn on_window_closed(&mut self, window_id: WindowId) {
        self.windows.remove(&window_id);
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if !self.second_window_requested {
            self.second_window_requested = true;
            ctx.runtime.create_window(
                RuntimeConfig::default()
                    .with_title("sable: particles")
                    .with_size(500.0, 500.0),
            );
        }

        let t = ctx.time.elapsed;
        let size = ctx.window.size();
        match self.windows.get(&ctx.window.id) {
            Some(WindowKind::Showcase(showcase)) => {
                ctx.draw(|r| draw_showcase(r, showcase, size, t))
            }
            Some(WindowKind::Particles) => ctx.draw(|r| draw_particles(r, size, t)),
            None => AppControl::Continue,
        }
    }
}

fn create_showcase(renderer: &mut Renderer<Gpu<'_>>) -> anyhow::Result<Showcase> {
    let (w, h) = SCENE_SIZE;
    let target = renderer
        .create_render_target(&RenderTargetDesc::new("scene", w, h).with_sample_count(SampleCount::X4))
        .or_else(|err| {
            log::warn!("multisampled scene unavailable ({err}); using a single sample");
            renderer.create_render_target(&RenderTargetDesc::new("scene", w, h))
        })
        .context("scene target")?;

    let pixels = checker_pixels(CHECKER_SIZE, 8);
    let checker = renderer
        .create_texture(
            &TextureDesc::rgba8("checker", CHECKER_SIZE, CHECKER_SIZE, &pixels).with_full_mip_chain(),
        )
        .context("checker texture")?;

    let wave = renderer
        .create_shader(
            &ShaderDesc::new("wave")
                .with_fragment(include_str!("../shaders/wave.frag.wgsl"))
                .with_uniform(UniformDesc::new(
                    "resolution",
                    UniformType::Vec2,
                    UniformStage::Fragment,
                ))
                .with_uniform(UniformDesc::new("time", UniformType::Float, UniformStage::Fragment)),
        )
        .context("wave shader")?;
    renderer.set_uniform(wave, "resolution", Vec2::new(w as f32, h as f32))?;

    Ok(Showcase {
        target,
        checker,
        wave,
    })
}

fn checker_pixels(size: u32, cell: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let light = ((x / cell) + (y / cell)) % 2 == 0;
            let v = if light { 235 } else { 60 };
            pixels.extend_from_slice(&[v, v, v, 255]);
        }
    }
    pixels
}

fn draw_showcase(
    r: &mut Renderer<Gpu<'_>>,
    showcase: &Showcase,
    (width, height): (u32, u32),
    t: f32,
) -> Result<(), RendererError> {
    let rot = t * 1.5;

    r.set_render_target(showcase.target)?;
    r.clear_color(Color::WHITE)?;

    r.draw_rectangle_rotated(
        Vec2::new(150.0, 150.0),
        Vec2::splat(200.0),
        rot,
        Anchor::Center,
        Color::RED,
    );
    r.draw_rectangle(Vec2::new(50.0, 350.0), Vec2::splat(200.0), Color::BLACK);
    r.draw_circle(Vec2::new(800.0, 360.0), 200.0, Color::TEAL);

    r.apply_texture(Some(showcase.checker))?;
    r.draw_rectangle(Vec2::new(350.0, 350.0), Vec2::splat(200.0), Color::WHITE);
    r.draw_circle_segments(Vec2::new(450.0, 650.0), 60.0, 32, Color::GREEN);
    r.draw_rectangle_uv(
        Vec2::new(350.0, 100.0),
        Vec2::splat(120.0),
        Rect::new(0.0, 0.0, 16.0, 16.0),
        -rot,
        Anchor::Top,
        Color::ORANGE,
    );

    r.apply_texture(None)?;
    r.draw_line(Vec2::new(1000.0, 80.0), Vec2::new(1200.0, 260.0 + rot.sin() * 60.0), 6.0, Color::BLUE);
    r.draw_polygon(
        Vec2::new(1050.0, 450.0),
        &[Vec2::ZERO, Vec2::new(150.0, 40.0), Vec2::new(40.0, 180.0)],
        &[0, 1, 2],
        Color::LAVENDER,
    );

    r.set_uniform(showcase.wave, "time", t)?;
    r.set_render_target_to_screen();
    r.clear_color(Color::CORNFLOWER_BLUE)?;
    r.apply_shader(Some(showcase.wave))?;
    let target_texture = r
        .render_target_texture(showcase.target)
        .ok_or(RendererError::FrameState("scene target vanished"))?;
    r.apply_texture(Some(target_texture))?;
    r.draw_rectangle(Vec2::ZERO, Vec2::new(width as f32, height as f32), Color::WHITE);
    Ok(())
}

fn draw_particles(r: &mut Renderer<Gpu<'_>>, (width, height): (u32, u32), t: f32) -> Result<(), RendererError> {
    r.clear_color(Color::BLUE)?;
    r.draw_rectangle(Vec2::splat(50.0), Vec2::splat(400.0), Color::ORANGE);

    let center = Vec2::new(width as f32, height as f32) * 0.5;
    let count = 2000u32;
    for i in 0..count {
        let phase = i as f32 / count as f32 * TAU;
        let radius = 80.0 + (phase * 7.0 + t * 2.0).sin() * 40.0 + (i % 50) as f32 * 2.0;
        let pos = center + Vec2::new(phase.cos(), phase.sin()) * radius;
        let color = Color::rgb(
            (i * 325 % 255) as u8,
            (i * 412 % 255) as u8,
            (i * 176 % 255) as u8,
        );
        r.draw_rectangle_rotated(pos, Vec2::splat(6.0), phase + t, Anchor::Center, color);
    }
    Ok(())
}

fn graphics_api() -> GraphicsApi {
    match std::env::var("SABLE_API") {
        Ok(value) => value.parse().unwrap_or_else(|err| {
            log::warn!("{err}; using the platform default");
            GraphicsApi::Default
        }),
        Err(_) => GraphicsApi::Default,
    }
}

fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default());

    let api = graphics_api();
    log::info!("starting sable demo on {api}");

    Runtime::run(
        RuntimeConfig::default().with_title("sable: showcase"),
        GpuInit::default().with_api(api),
        Demo::default(),
    )
}
