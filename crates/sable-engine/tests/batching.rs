mod common;

use std::f32::consts::FRAC_PI_2;

use approx::assert_abs_diff_eq;
use sable_engine::RendererError;
use sable_engine::coords::{Anchor, Vec2};
use sable_engine::device::{GpuCall, RecordingBackend};
use sable_engine::paint::Color;
use sable_engine::render::RenderTargetDesc;

use common::*;

fn assert_position(actual: [f32; 2], expected: [f32; 2]) {
    assert_abs_diff_eq!(actual[0], expected[0], epsilon = 1e-5);
    assert_abs_diff_eq!(actual[1], expected[1], epsilon = 1e-5);
}

#[test]
fn two_textures_give_two_draws_over_contiguous_ranges() {
    let mut r = renderer();
    let a = solid_texture(&mut r, "a");
    let b = solid_texture(&mut r, "b");

    r.begin().unwrap();
    r.apply_texture(Some(a)).unwrap();
    r.draw_rectangle(Vec2::new(10.0, 10.0), Vec2::new(20.0, 20.0), Color::WHITE);
    r.apply_texture(Some(b)).unwrap();
    r.draw_rectangle(Vec2::new(50.0, 50.0), Vec2::new(20.0, 20.0), Color::RED);
    r.apply_texture(None).unwrap();

    let spans: Vec<(u32, u32)> = r.batches().iter().map(|b| (b.vertex_start, b.vertex_end())).collect();
    assert_eq!(spans, vec![(0, 4), (4, 8)]);

    let stats = r.end().unwrap();
    assert_eq!(stats.batches, 2);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.vertices, 8);
    assert_eq!(stats.indices, 12);

    let backend = r.backend();
    assert_eq!(backend.draws(), vec![(6, 0, 0), (6, 6, 0)]);
    assert_eq!(
        uploaded_indices(backend, 12),
        vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]
    );

    let vertices = uploaded_vertices(backend, 8);
    assert_position(vertices[0].position, [-0.8, 0.8]);
    assert_eq!(vertices[0].color, Color::WHITE.packed());
    assert_position(vertices[4].position, [0.0, 0.0]);
    assert_eq!(vertices[4].color, Color::RED.packed());
}

#[test]
fn draws_keep_submission_order() {
    let mut r = renderer();
    let a = solid_texture(&mut r, "a");
    let b = solid_texture(&mut r, "b");

    r.begin().unwrap();
    for texture in [a, b, a] {
        r.apply_texture(Some(texture)).unwrap();
        r.draw_rectangle(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), Color::WHITE);
    }
    r.end().unwrap();

    let backend = r.backend();
    let sampled: Vec<_> = backend
        .calls()
        .iter()
        .filter_map(|c| match c {
            GpuCall::SetResourceSet(set) => backend.resource_set_image(*set),
            _ => None,
        })
        .collect();
    let image = |id| r.texture(id).unwrap().image();
    assert_eq!(sampled, vec![image(a), image(b), image(a)]);
    assert_eq!(backend.draws(), vec![(6, 0, 0), (6, 6, 0), (6, 12, 0)]);
}

#[test]
fn switching_away_and_back_without_drawing_keeps_one_batch() {
    let mut r = renderer();
    let a = solid_texture(&mut r, "a");
    let b = solid_texture(&mut r, "b");

    r.begin().unwrap();
    r.apply_texture(Some(a)).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.apply_texture(Some(b)).unwrap();
    r.apply_texture(Some(a)).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.apply_texture(Some(b)).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.apply_texture(Some(a)).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    let stats = r.end().unwrap();

    assert_eq!(stats.draw_calls, 3);
    assert_eq!(r.backend().draws(), vec![(12, 0, 0), (6, 12, 0), (6, 18, 0)]);
}

#[test]
fn setting_the_current_state_again_does_not_cut_a_batch() {
    let mut r = renderer();
    let a = solid_texture(&mut r, "a");

    r.begin().unwrap();
    r.apply_texture(Some(a)).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.apply_texture(Some(a)).unwrap();
    r.apply_shader(None).unwrap();
    r.set_render_target_to_screen();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    assert!(r.batches().is_empty());

    let stats = r.end().unwrap();
    assert_eq!(stats.batches, 1);
    assert_eq!(r.backend().draws(), vec![(12, 0, 0)]);
}

#[test]
fn full_staging_buffers_submit_mid_frame() {
    // Room for exactly two quads.
    let mut r = renderer_with_capacity(8, 12);

    r.begin().unwrap();
    for i in 0..3 {
        r.draw_rectangle(Vec2::new(i as f32 * 20.0, 0.0), Vec2::splat(10.0), Color::WHITE);
    }
    let stats = r.end().unwrap();

    assert_eq!(stats.capacity_flushes, 1);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.vertices, 12);
    assert_eq!(stats.indices, 18);

    let backend = r.backend();
    assert_eq!(backend.draws(), vec![(12, 0, 0), (6, 0, 0)]);
    assert_eq!(backend.count(|c| *c == GpuCall::Submit), 2);
    assert_eq!(backend.count(|c| *c == GpuCall::BeginCommands), 2);
    assert_eq!(backend.count(|c| *c == GpuCall::Present), 1);
}

#[test]
fn first_failed_submission_is_the_one_reported() {
    let backend = RecordingBackend::new(WIDTH, HEIGHT).with_failing_submits(2);
    let mut r = renderer_on(backend, 8, 12);

    r.begin().unwrap();
    for i in 0..3 {
        r.draw_rectangle(Vec2::new(i as f32 * 20.0, 0.0), Vec2::splat(10.0), Color::WHITE);
    }
    let err = r.end().unwrap_err();

    match err {
        RendererError::Presentation(message) => assert_eq!(message, "submission 1 rejected"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(!r.is_in_frame());
    assert_eq!(r.backend().count(|c| *c == GpuCall::Submit), 2);
}

#[test]
fn shape_larger_than_staging_is_dropped() {
    let mut r = renderer_with_capacity(8, 12);

    r.begin().unwrap();
    r.draw_circle_segments(Vec2::splat(50.0), 10.0, 100, Color::WHITE);
    assert_eq!(r.staged_vertices(), 0);
    let stats = r.end().unwrap();

    assert_eq!(stats.capacity_flushes, 0);
    assert_eq!(stats.draw_calls, 0);
}

#[test]
fn offscreen_shapes_are_culled() {
    let mut r = renderer();

    r.begin().unwrap();
    r.draw_rectangle(Vec2::new(150.0, 150.0), Vec2::splat(20.0), Color::WHITE);
    r.draw_rectangle(Vec2::new(-40.0, 10.0), Vec2::splat(20.0), Color::WHITE);
    r.draw_circle(Vec2::new(-50.0, -50.0), 10.0, Color::WHITE);
    r.draw_line(Vec2::new(200.0, 0.0), Vec2::new(200.0, 100.0), 2.0, Color::WHITE);
    assert_eq!(r.staged_vertices(), 0);

    // Partially visible shapes are kept whole.
    r.draw_rectangle(Vec2::new(90.0, 90.0), Vec2::splat(20.0), Color::WHITE);
    assert_eq!(r.staged_vertices(), 4);

    let stats = r.end().unwrap();
    assert_eq!(stats.draw_calls, 1);
}

#[test]
fn culling_uses_the_bound_render_target_size() {
    let mut r = renderer();
    let target = r.create_render_target(&RenderTargetDesc::new("small", 50, 50)).unwrap();

    r.begin().unwrap();
    r.set_render_target(target).unwrap();
    r.draw_rectangle(Vec2::splat(60.0), Vec2::splat(10.0), Color::WHITE);
    assert_eq!(r.staged_vertices(), 0);
    assert!(r.batches().is_empty());

    // The same rectangle is inside the 100x100 window.
    r.set_render_target_to_screen();
    r.draw_rectangle(Vec2::splat(60.0), Vec2::splat(10.0), Color::WHITE);
    assert_eq!(r.staged_vertices(), 4);

    let stats = r.end().unwrap();
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(r.backend().draws(), vec![(6, 0, 0)]);
}

#[test]
fn rotation_turns_about_the_anchor() {
    let mut r = renderer();

    r.begin().unwrap();
    r.draw_rectangle_rotated(
        Vec2::new(50.0, 50.0),
        Vec2::new(20.0, 10.0),
        FRAC_PI_2,
        Anchor::TopLeft,
        Color::WHITE,
    );
    r.end().unwrap();

    let v = uploaded_vertices(r.backend(), 4);
    // Top-left, bottom-left, bottom-right, top-right of the unrotated rect.
    assert_position(v[0].position, [0.0, 0.0]);
    assert_position(v[1].position, [-0.2, 0.0]);
    assert_position(v[2].position, [-0.2, -0.4]);
    assert_position(v[3].position, [0.0, -0.4]);
}

#[test]
fn center_anchor_keeps_the_center_fixed() {
    let mut r = renderer();

    r.begin().unwrap();
    r.draw_rectangle_rotated(
        Vec2::new(40.0, 40.0),
        Vec2::new(20.0, 20.0),
        FRAC_PI_2,
        Anchor::Center,
        Color::WHITE,
    );
    r.end().unwrap();

    let v = uploaded_vertices(r.backend(), 4);
    let cx = v.iter().map(|v| v.position[0]).sum::<f32>() / 4.0;
    let cy = v.iter().map(|v| v.position[1]).sum::<f32>() / 4.0;
    assert_abs_diff_eq!(cx, 0.0, epsilon = 1e-5);
    assert_abs_diff_eq!(cy, 0.0, epsilon = 1e-5);
    // The top-left corner moved to the top-right.
    assert_position(v[0].position, [0.2, 0.2]);
}

#[test]
fn vertical_line_is_an_unrotated_rectangle() {
    let mut r = renderer();

    r.begin().unwrap();
    r.draw_line(Vec2::new(10.0, 10.0), Vec2::new(10.0, 50.0), 4.0, Color::WHITE);
    r.draw_line(Vec2::new(30.0, 30.0), Vec2::new(30.0, 30.0), 4.0, Color::WHITE);
    r.end().unwrap();

    let v = uploaded_vertices(r.backend(), 4);
    assert_position(v[0].position, [-0.84, 0.8]);
    assert_position(v[2].position, [-0.76, 0.0]);
    assert_eq!(r.backend().draws(), vec![(6, 0, 0)]);
}

#[test]
fn circle_is_a_fan_over_its_rim() {
    let mut r = renderer();

    r.begin().unwrap();
    r.draw_circle_segments(Vec2::splat(50.0), 10.0, 8, Color::BLUE);
    r.end().unwrap();

    let backend = r.backend();
    let indices = uploaded_indices(backend, 24);
    assert_eq!(&indices[..3], &[0, 0, 1]);
    assert_eq!(&indices[21..], &[0, 7, 0]);

    let v = uploaded_vertices(backend, 8);
    assert_position(v[0].position, [0.2, 0.0]);
    assert_eq!(v[0].uv, [1.0, 0.5]);
}

#[test]
fn polygon_indices_are_offset_and_validated() {
    let mut r = renderer();
    let triangle = [Vec2::ZERO, Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)];

    r.begin().unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(5.0), Color::WHITE);
    r.draw_polygon(Vec2::splat(10.0), &triangle, &[0, 1, 2], Color::WHITE);
    r.draw_polygon(Vec2::splat(10.0), &triangle, &[0, 1, 3], Color::WHITE);
    assert_eq!(r.staged_vertices(), 7);
    r.end().unwrap();

    assert_eq!(&uploaded_indices(r.backend(), 9)[6..], &[4, 5, 6]);
}

#[test]
fn polygon_with_a_partial_triangle_is_dropped() {
    let mut r = renderer();
    let quad = [
        Vec2::ZERO,
        Vec2::new(10.0, 0.0),
        Vec2::new(10.0, 10.0),
        Vec2::new(0.0, 10.0),
    ];

    r.begin().unwrap();
    r.draw_polygon(Vec2::splat(10.0), &quad, &[0, 1, 2, 0], Color::WHITE);
    assert_eq!(r.staged_vertices(), 0);
    assert_eq!(r.staged_indices(), 0);

    r.draw_rectangle(Vec2::ZERO, Vec2::splat(5.0), Color::WHITE);
    r.end().unwrap();

    assert_eq!(r.backend().draws(), vec![(6, 0, 0)]);
    assert_eq!(uploaded_indices(r.backend(), 6), vec![0, 1, 2, 2, 3, 0]);
}

#[test]
fn clear_is_ordered_after_earlier_geometry() {
    let mut r = renderer();

    r.begin().unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.clear_color(Color::RED).unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    r.end().unwrap();

    let calls = r.backend().calls();
    let first = position_of(
        &GpuCall::DrawIndexed {
            index_count: 6,
            index_start: 0,
            base_vertex: 0,
        },
        calls,
    );
    let clear = position_of(&GpuCall::Clear(Color::RED), calls);
    let second = position_of(
        &GpuCall::DrawIndexed {
            index_count: 6,
            index_start: 6,
            base_vertex: 0,
        },
        calls,
    );
    assert!(first < clear && clear < second);

    // The second upload only carries the new quad.
    let vertex_uploads: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            GpuCall::UpdateBuffer { offset, len, .. } if *len == 80 => Some(*offset),
            _ => None,
        })
        .collect();
    assert_eq!(vertex_uploads, vec![0, 80]);
}

#[test]
fn draws_outside_a_frame_are_ignored() {
    let mut r = renderer();

    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
    assert_eq!(r.staged_vertices(), 0);

    r.begin().unwrap();
    let stats = r.end().unwrap();
    assert_eq!(stats.draw_calls, 0);
}

#[test]
fn frame_calls_must_pair_up() {
    let mut r = renderer();

    assert!(r.end().is_err());
    assert!(r.clear_color(Color::BLACK).is_err());
    r.begin().unwrap();
    assert!(r.begin().is_err());
    r.end().unwrap();
    assert!(!r.is_in_frame());
}

#[test]
fn every_frame_starts_from_the_buffer_start() {
    let mut r = renderer();

    for _ in 0..2 {
        r.begin().unwrap();
        r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE);
        r.end().unwrap();
    }
    assert_eq!(r.backend().draws(), vec![(6, 0, 0), (6, 0, 0)]);
}

#[test]
fn begin_restores_default_state() {
    let mut r = renderer();
    let a = solid_texture(&mut r, "a");

    r.begin().unwrap();
    r.apply_texture(Some(a)).unwrap();
    r.end().unwrap();

    r.begin().unwrap();
    assert_eq!(r.state().texture, r.default_texture());
    assert_eq!(r.state().shader, r.default_shader());
    assert_eq!(r.state().target, None);
    r.end().unwrap();
}

#[test]
fn default_batch_then_textured_batch() {
    let mut r = renderer();
    let t = solid_texture(&mut r, "t");

    r.begin().unwrap();
    r.draw_rectangle(Vec2::ZERO, Vec2::splat(10.0), Color::RED);
    r.apply_texture(Some(t)).unwrap();
    r.draw_rectangle(Vec2::splat(20.0), Vec2::splat(10.0), Color::RED);
    r.apply_texture(None).unwrap();

    let batches = r.batches().to_vec();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].state.texture, r.default_texture());
    assert_eq!(batches[1].state.texture, t);
    assert_eq!((batches[0].vertex_start, batches[0].vertex_end()), (0, 4));
    assert_eq!((batches[1].vertex_start, batches[1].vertex_end()), (4, 8));

    let stats = r.end().unwrap();
    assert_eq!((stats.vertices, stats.indices), (8, 12));
}

#[test]
fn rotation_matches_rotating_corners_then_projecting() {
    let mut r = renderer();

    r.begin().unwrap();
    r.draw_rectangle_rotated(Vec2::ZERO, Vec2::splat(10.0), FRAC_PI_2, Anchor::Center, Color::WHITE);
    r.end().unwrap();

    let viewport = r.viewport();
    let pivot = Vec2::splat(5.0);
    let corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new(0.0, 10.0),
        Vec2::new(10.0, 10.0),
        Vec2::new(10.0, 0.0),
    ];
    let v = uploaded_vertices(r.backend(), 4);
    for (vertex, corner) in v.iter().zip(corners) {
        let expected = viewport.project(pivot + (corner - pivot).rotated(FRAC_PI_2));
        assert_position(vertex.position, expected);
    }
}
