mod common;

use sable_engine::RendererError;
use sable_engine::coords::Vec2;
use sable_engine::device::{
    GpuCall, RecordingBackend, ResourceKind, ShaderStage, UniformStage, UvOrigin, ViewportRect,
};
use sable_engine::paint::Color;
use sable_engine::render::{
    RenderTargetDesc, SampleCount, ShaderDesc, TextureDesc, UniformDesc, UniformType,
};

use common::*;

const TINT_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

struct Params {
    tint: vec4<f32>,
    strength: f32,
};

@group(0) @binding(0) var t_color: texture_2d<f32>;
@group(0) @binding(1) var s_color: sampler;
@group(0) @binding(2) var<uniform> params: Params;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let base = textureSample(t_color, s_color, in.uv) * in.color;
    return mix(base, params.tint, params.strength);
}
"#;

fn tint_shader_desc() -> ShaderDesc {
    ShaderDesc::new("tint")
        .with_fragment(TINT_SHADER)
        .with_uniform(UniformDesc::new("tint", UniformType::Vec4, UniformStage::Fragment))
        .with_uniform(UniformDesc::new("strength", UniformType::Float, UniformStage::Fragment))
}

#[test]
fn uniforms_upload_once_before_the_draw() {
    let mut r = renderer();
    let shader = r.create_shader(&tint_shader_desc()).unwrap();
    assert_eq!(r.shader(shader).unwrap().uniforms().size(), 32);

    r.set_uniform(shader, "tint", Color::RED).unwrap();
    r.set_uniform(shader, "strength", 0.5f32).unwrap();

    r.backend_mut().clear_calls();
    r.begin().unwrap();
    r.apply_shader(Some(shader)).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.end().unwrap();

    let calls = r.backend().calls();
    let upload = calls
        .iter()
        .position(|c| matches!(c, GpuCall::UpdateBuffer { len: 32, .. }))
        .expect("uniform upload");
    let draw = calls
        .iter()
        .position(|c| matches!(c, GpuCall::DrawIndexed { .. }))
        .expect("draw");
    assert!(upload < draw);

    // Unchanged uniforms are not uploaded again.
    r.backend_mut().clear_calls();
    r.begin().unwrap();
    r.apply_shader(Some(shader)).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.end().unwrap();
    assert_eq!(
        r.backend().count(|c| matches!(c, GpuCall::UpdateBuffer { len: 32, .. })),
        0
    );
}

#[test]
fn uniform_names_and_types_are_checked() {
    let mut r = renderer();
    let shader = r.create_shader(&tint_shader_desc()).unwrap();

    let err = r.set_uniform(shader, "missing", 1.0f32).unwrap_err();
    assert!(matches!(err, RendererError::UnknownUniform { ref name, .. } if name == "missing"));

    let err = r.set_uniform(shader, "strength", Vec2::ONE).unwrap_err();
    assert!(matches!(
        err,
        RendererError::UniformTypeMismatch {
            expected: UniformType::Float,
            found: UniformType::Vec2,
            ..
        }
    ));
}

#[test]
fn invalid_shader_source_is_rejected_with_its_stage() {
    let mut r = renderer();
    let desc = ShaderDesc::new("broken").with_fragment("fn fs_main( {");

    let err = r.create_shader(&desc).unwrap_err();
    assert!(matches!(
        err,
        RendererError::ShaderCompilation {
            stage: ShaderStage::Fragment,
            ..
        }
    ));
}

#[test]
fn multisampled_target_resolves_after_drawing() {
    let mut r = renderer();
    let target = r
        .create_render_target(&RenderTargetDesc::new("msaa", 50, 50).with_sample_count(SampleCount::X4))
        .unwrap();
    let framebuffer = r.render_target(target).unwrap().framebuffer();
    assert!(r.render_target(target).unwrap().is_multisampled());

    r.begin().unwrap();
    r.set_render_target(target).unwrap();
    r.draw_rectangle(Vec2::new(25.0, 25.0), Vec2::splat(10.0), Color::WHITE);
    r.set_render_target_to_screen();
    r.end().unwrap();

    let calls = r.backend().calls();
    let draw = calls
        .iter()
        .position(|c| matches!(c, GpuCall::DrawIndexed { .. }))
        .unwrap();
    let resolve = position_of(&GpuCall::Resolve(framebuffer), calls);
    assert!(draw < resolve);
    assert!(calls.contains(&GpuCall::SetViewport(ViewportRect {
        x: 0.0,
        y: 0.0,
        width: 50.0,
        height: 50.0,
    })));

    // Positions are projected against the target, not the window.
    let v = uploaded_vertices(r.backend(), 1);
    assert_eq!(v[0].position, [0.0, 0.0]);
}

#[test]
fn single_sample_target_is_never_resolved() {
    let mut r = renderer();
    let target = r
        .create_render_target(&RenderTargetDesc::new("plain", 50, 50).with_sample_count(SampleCount::X1))
        .unwrap();
    assert!(!r.render_target(target).unwrap().is_multisampled());

    r.begin().unwrap();
    r.set_render_target(target).unwrap();
    r.draw_rectangle(Vec2::new(25.0, 25.0), Vec2::splat(10.0), Color::WHITE);
    r.end().unwrap();

    let backend = r.backend();
    assert_eq!(backend.draws().len(), 1);
    assert_eq!(backend.count(|c| matches!(c, GpuCall::Resolve(_))), 0);
}

#[test]
fn unsupported_sample_count_is_an_error() {
    let backend = RecordingBackend::new(WIDTH, HEIGHT).with_max_sample_count(1);
    let mut r = renderer_on(backend, 64, 96);
    let images = r.backend().live_images();

    let err = r
        .create_render_target(&RenderTargetDesc::new("msaa", 32, 32).with_sample_count(SampleCount::X8))
        .unwrap_err();
    assert!(matches!(err, RendererError::UnsupportedFeature(_)));
    assert_eq!(r.backend().live_images(), images);
}

#[test]
fn render_target_texture_is_flipped_on_bottom_left_backends() {
    for (origin, top_v) in [(UvOrigin::TopLeft, 0.0), (UvOrigin::BottomLeft, 1.0)] {
        let backend = RecordingBackend::new(WIDTH, HEIGHT).with_uv_origin(origin);
        let mut r = renderer_on(backend, 64, 96);
        let target = r.create_render_target(&RenderTargetDesc::new("rt", 32, 32)).unwrap();
        let texture = r.render_target_texture(target).unwrap();

        r.begin().unwrap();
        r.apply_texture(Some(texture)).unwrap();
        r.draw_rectangle(Vec2::ZERO, Vec2::splat(32.0), Color::WHITE);
        r.end().unwrap();

        let v = uploaded_vertices(r.backend(), 4);
        assert_eq!(v[0].uv, [0.0, top_v], "{origin:?}");
    }
}

#[test]
fn sampling_the_target_being_drawn_is_skipped() {
    let mut r = renderer();
    let target = r.create_render_target(&RenderTargetDesc::new("rt", 32, 32)).unwrap();
    let texture = r.render_target_texture(target).unwrap();

    r.begin().unwrap();
    r.set_render_target(target).unwrap();
    r.apply_texture(Some(texture)).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    let stats = r.end().unwrap();

    assert!(r.backend().draws().is_empty());
    assert_eq!(stats.batches, 1);
    assert_eq!(stats.draw_calls, 0);
    assert_eq!(stats.vertices, 0);
    assert_eq!(stats.indices, 0);
}

#[test]
fn clearing_a_render_target_binds_it_first() {
    let mut r = renderer();
    let target = r.create_render_target(&RenderTargetDesc::new("rt", 32, 32)).unwrap();
    let framebuffer = r.render_target(target).unwrap().framebuffer();

    r.begin().unwrap();
    r.set_render_target(target).unwrap();
    r.clear_color(Color::TEAL).unwrap();
    r.end().unwrap();

    let calls = r.backend().calls();
    let bind = position_of(
        &GpuCall::SetFramebuffer(sable_engine::device::FramebufferTarget::Offscreen(framebuffer)),
        calls,
    );
    let clear = position_of(&GpuCall::Clear(Color::TEAL), calls);
    assert_eq!(bind + 1, clear);
}

#[test]
fn mip_chain_is_generated_once_per_upload() {
    let mut r = renderer();
    let pixels = [200u8; 4 * 4 * 4];
    let texture = r
        .create_texture(&TextureDesc::rgba8("mipped", 4, 4, &pixels).with_full_mip_chain())
        .unwrap();
    assert_eq!(r.texture(texture).unwrap().mip_levels(), 3);

    for _ in 0..2 {
        r.begin().unwrap();
        r.apply_texture(Some(texture)).unwrap();
        r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
        r.end().unwrap();
    }

    let image = r.texture(texture).unwrap().image();
    assert_eq!(r.backend().count(|c| *c == GpuCall::GenerateMipmaps(image)), 1);
}

#[test]
fn texture_descriptors_are_validated() {
    let mut r = renderer();

    let err = r.create_texture(&TextureDesc::rgba8("empty", 0, 4, &[])).unwrap_err();
    assert!(matches!(err, RendererError::InvalidDescriptor(_)));

    let err = r.create_texture(&TextureDesc::rgba8("short", 2, 2, &[0; 4])).unwrap_err();
    assert!(matches!(err, RendererError::InvalidDescriptor(_)));

    let err = r
        .create_texture(&TextureDesc::rgba8("deep", 2, 2, &[0; 16]).with_mip_levels(5))
        .unwrap_err();
    assert!(matches!(err, RendererError::InvalidDescriptor(_)));
}

#[test]
fn destroyed_handles_become_stale() {
    let mut r = renderer();
    let texture = solid_texture(&mut r, "gone");
    let shader = r.create_shader(&tint_shader_desc()).unwrap();
    let target = r.create_render_target(&RenderTargetDesc::new("rt", 8, 8)).unwrap();

    r.destroy_texture(texture).unwrap();
    r.destroy_shader(shader).unwrap();
    r.destroy_render_target(target).unwrap();

    let stale = |kind| RendererError::StaleResource { kind };
    assert!(matches!(r.destroy_texture(texture), Err(RendererError::StaleResource { kind: ResourceKind::Texture })));
    assert!(r.texture(texture).is_none());
    assert!(r.render_target_texture(target).is_none());

    r.begin().unwrap();
    assert_eq!(
        r.apply_texture(Some(texture)).unwrap_err().to_string(),
        stale(ResourceKind::Texture).to_string()
    );
    assert_eq!(
        r.apply_shader(Some(shader)).unwrap_err().to_string(),
        stale(ResourceKind::Shader).to_string()
    );
    assert_eq!(
        r.set_render_target(target).unwrap_err().to_string(),
        stale(ResourceKind::RenderTarget).to_string()
    );
    assert!(r.set_uniform(shader, "strength", 1.0f32).is_err());
    r.end().unwrap();
}

#[test]
fn default_resources_cannot_be_destroyed() {
    let mut r = renderer();
    let texture = r.default_texture();
    let shader = r.default_shader();

    assert!(matches!(
        r.destroy_texture(texture),
        Err(RendererError::ResourceInUse { kind: ResourceKind::Texture })
    ));
    assert!(matches!(
        r.destroy_shader(shader),
        Err(RendererError::ResourceInUse { kind: ResourceKind::Shader })
    ));
}

#[test]
fn resources_used_by_the_open_frame_cannot_be_destroyed() {
    let mut r = renderer();
    let texture = solid_texture(&mut r, "busy");
    let other = solid_texture(&mut r, "other");

    r.begin().unwrap();
    r.apply_texture(Some(texture)).unwrap();
    assert!(r.destroy_texture(texture).is_err());

    // Still referenced by a recorded batch after switching away.
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.apply_texture(Some(other)).unwrap();
    assert!(r.destroy_texture(texture).is_err());
    r.end().unwrap();

    r.destroy_texture(texture).unwrap();
}

#[test]
fn render_target_textures_go_with_their_target() {
    let mut r = renderer();
    let images = r.backend().live_images();
    let target = r
        .create_render_target(&RenderTargetDesc::new("rt", 16, 16).with_sample_count(SampleCount::X4))
        .unwrap();
    let texture = r.render_target_texture(target).unwrap();
    assert_eq!(r.backend().live_images(), images + 2);

    assert!(matches!(
        r.destroy_texture(texture),
        Err(RendererError::InvalidDescriptor(_))
    ));

    r.destroy_render_target(target).unwrap();
    assert_eq!(r.backend().live_images(), images);
    assert!(r.texture(texture).is_none());
}

#[test]
fn destroying_a_texture_releases_its_resource_sets() {
    let mut r = renderer();
    let texture = solid_texture(&mut r, "sampled");

    r.begin().unwrap();
    r.apply_texture(Some(texture)).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.end().unwrap();

    let sets = r.backend().live_resource_sets();
    r.destroy_texture(texture).unwrap();
    assert_eq!(r.backend().live_resource_sets(), sets - 1);
}

#[test]
fn resize_changes_the_projection() {
    let mut r = renderer();
    r.resize(200, 100);
    assert!(r.backend().calls().contains(&GpuCall::Resize {
        width: 200,
        height: 100
    }));
    // Minimized: the last usable projection stays.
    r.resize(0, 0);

    r.begin().unwrap();
    r.draw_rectangle(Vec2::new(100.0, 50.0), Vec2::splat(10.0), Color::WHITE);
    r.end().unwrap();

    let v = uploaded_vertices(r.backend(), 1);
    assert_eq!(v[0].position, [0.0, 0.0]);
}
