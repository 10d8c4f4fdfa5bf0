use slotmap::SlotMap;

use super::batch::{Batch, BatchList, DrawState};
use super::geometry::{self, QUAD_INDICES};
use super::render_target::{RenderTarget, RenderTargetDesc, RenderTargetId};
use super::shader::{Shader, ShaderDesc, ShaderId};
use super::staging::StagingBuffers;
use super::texture::{Texture, TextureDesc, TextureId, TextureOrigin};
use super::uniform::UniformValue;
use super::vertex::{INDEX_SIZE, Vertex};
use crate::coords::{Anchor, Rect, Vec2, Viewport};
use crate::device::{
    BufferDesc, BufferId, BufferUsage, FramebufferTarget, GpuBackend, RendererError,
    ResourceKind, ScissorRect, UvOrigin, ViewportRect,
};
use crate::paint::Color;

#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Prefix for this renderer's log lines.
    pub label: String,
    pub vertex_buffer_bytes: u64,
    pub index_buffer_bytes: u64,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            label: "renderer".to_string(),
            vertex_buffer_bytes: 32 << 20,
            index_buffer_bytes: 48 << 20,
        }
    }
}

impl RendererConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_capacity(mut self, vertex_buffer_bytes: u64, index_buffer_bytes: u64) -> Self {
        self.vertex_buffer_bytes = vertex_buffer_bytes;
        self.index_buffer_bytes = index_buffer_bytes;
        self
    }
}

/// Counters for one `begin`/`end` cycle.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    /// Batches cut by state changes, before merging.
    pub batches: u32,
    /// Indexed draws issued after merging.
    pub draw_calls: u32,
    pub vertices: u32,
    pub indices: u32,
    /// Mid-frame submissions forced by full staging buffers.
    pub capacity_flushes: u32,
    pub uploads: u32,
}

/// Batched immediate-mode 2D renderer.
///
/// Draw calls append geometry to fixed-size staging buffers. Changing the
/// texture, shader or render target closes the running batch; `end` merges
/// neighbouring batches with equal state, uploads the staged data and issues
/// one indexed draw per merged batch.
///
/// Positions are pixels with a top-left origin. Rotations are radians.
pub struct Renderer<B: GpuBackend> {
    backend: B,
    label: String,

    staging: StagingBuffers,
    batches: BatchList,
    vertex_buffer: BufferId,
    index_buffer: BufferId,
    /// Staged prefix already copied to the GPU buffers.
    uploaded_vertices: usize,
    uploaded_indices: usize,

    textures: SlotMap<TextureId, Texture>,
    shaders: SlotMap<ShaderId, Shader>,
    render_targets: SlotMap<RenderTargetId, RenderTarget>,
    default_texture: TextureId,
    default_shader: ShaderId,

    state: DrawState,
    viewport: Viewport,
    in_frame: bool,
    warned_outside_frame: bool,
    stats: FrameStats,
    /// First failure hit inside an infallible draw call, reported by `end`.
    deferred_error: Option<RendererError>,
}

// ── construction ──────────────────────────────────────────────────────────

impl<B: GpuBackend> Renderer<B> {
    pub fn new(mut backend: B, config: RendererConfig) -> Result<Self, RendererError> {
        let staging =
            StagingBuffers::with_byte_capacity(config.vertex_buffer_bytes, config.index_buffer_bytes)?;

        let vertex_buffer = backend.create_buffer(&BufferDesc {
            label: "sable vertices",
            size: staging.vertex_capacity() as u64 * Vertex::SIZE,
            usage: BufferUsage::Vertex,
        })?;
        let index_buffer = backend.create_buffer(&BufferDesc {
            label: "sable indices",
            size: staging.index_capacity() as u64 * INDEX_SIZE,
            usage: BufferUsage::Index,
        })?;

        let mut textures = SlotMap::with_key();
        let default_texture = textures.insert(Texture::upload(
            &mut backend,
            &TextureDesc::rgba8("sable default texture", 1, 1, &[255; 4]),
        )?);

        let mut shaders = SlotMap::with_key();
        let default_shader =
            shaders.insert(Shader::create(&mut backend, &ShaderDesc::new("sable default shader"))?);

        let (width, height) = backend.swapchain_size();
        log::info!(
            "[{}] renderer ready on {} ({}x{}, {} vertices / {} indices of staging)",
            config.label,
            backend.backend_name(),
            width,
            height,
            staging.vertex_capacity(),
            staging.index_capacity()
        );

        Ok(Self {
            backend,
            label: config.label,
            staging,
            batches: BatchList::new(),
            vertex_buffer,
            index_buffer,
            uploaded_vertices: 0,
            uploaded_indices: 0,
            textures,
            shaders,
            render_targets: SlotMap::with_key(),
            default_texture,
            default_shader,
            state: DrawState {
                texture: default_texture,
                shader: default_shader,
                target: None,
            },
            viewport: Viewport::from_pixels(width, height),
            in_frame: false,
            warned_outside_frame: false,
            stats: FrameStats::default(),
            deferred_error: None,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    /// Batches recorded so far in the current frame, before merging.
    pub fn batches(&self) -> &[Batch] {
        self.batches.batches()
    }

    pub fn staged_vertices(&self) -> usize {
        self.staging.vertex_count()
    }

    pub fn staged_indices(&self) -> usize {
        self.staging.index_count()
    }

    pub fn is_in_frame(&self) -> bool {
        self.in_frame
    }

    /// Window size changed: new projection basis and swapchain size.
    ///
    /// A zero size (minimized window) keeps the previous projection.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.backend.resize(width, height);
        let viewport = Viewport::from_pixels(width, height);
        if !viewport.is_valid() {
            return;
        }
        self.viewport = viewport;
        log::debug!("[{}] resized to {}x{}", self.label, width, height);
    }
}

// ── frame lifecycle ───────────────────────────────────────────────────────

impl<B: GpuBackend> Renderer<B> {
    /// Opens a frame and resets texture, shader and target to their defaults.
    pub fn begin(&mut self) -> Result<(), RendererError> {
        if self.in_frame {
            return Err(RendererError::FrameState("begin called while a frame is open"));
        }
        self.backend.begin_commands()?;
        self.state = DrawState {
            texture: self.default_texture,
            shader: self.default_shader,
            target: None,
        };
        self.in_frame = true;
        self.warned_outside_frame = false;
        self.stats = FrameStats::default();
        Ok(())
    }

    /// Clears the active target.
    ///
    /// Geometry recorded before the clear is submitted first so the clear
    /// cannot overtake it.
    pub fn clear_color(&mut self, color: Color) -> Result<(), RendererError> {
        if !self.in_frame {
            return Err(RendererError::FrameState("clear_color called outside begin/end"));
        }
        self.submit_batches()?;

        let target = self.current_framebuffer()?;
        self.backend.set_framebuffer(target);
        self.backend.clear(color);

        if let Some(rt) = self.state.target.and_then(|id| self.render_targets.get(id)) {
            rt.resolve(&mut self.backend);
            if let Some(texture) = self.textures.get_mut(rt.texture()) {
                texture.mark_written();
            }
        }
        Ok(())
    }

    /// Submits everything recorded in this frame and presents it.
    pub fn end(&mut self) -> Result<FrameStats, RendererError> {
        if !self.in_frame {
            return Err(RendererError::FrameState("end called without begin"));
        }

        let drained = self.submit_batches();
        self.backend.end_commands();
        let submitted = self.backend.submit();
        let presented = self.backend.present();

        self.rewind();
        self.in_frame = false;
        let deferred = self.deferred_error.take();

        if let Some(err) = deferred {
            return Err(err);
        }
        drained.and(submitted).and(presented)?;

        let stats = self.stats;
        log::debug!(
            "[{}] frame: {} batches -> {} draws, {} vertices, {} indices, {} capacity flushes",
            self.label,
            stats.batches,
            stats.draw_calls,
            stats.vertices,
            stats.indices,
            stats.capacity_flushes
        );
        Ok(stats)
    }

    fn rewind(&mut self) {
        self.staging.reset();
        self.batches.reset();
        self.uploaded_vertices = 0;
        self.uploaded_indices = 0;
    }

    fn defer_error(&mut self, err: RendererError) {
        log::error!("[{}] {err}", self.label);
        if self.deferred_error.is_none() {
            self.deferred_error = Some(err);
        }
    }
}

// ── state tracking ────────────────────────────────────────────────────────

impl<B: GpuBackend> Renderer<B> {
    /// Selects the texture for following draws; `None` selects the white default.
    pub fn apply_texture(&mut self, texture: Option<TextureId>) -> Result<(), RendererError> {
        let texture = texture.unwrap_or(self.default_texture);
        if !self.textures.contains_key(texture) {
            return Err(RendererError::StaleResource {
                kind: ResourceKind::Texture,
            });
        }
        if texture != self.state.texture {
            self.flush();
            self.state.texture = texture;
        }
        Ok(())
    }

    /// Selects the shader for following draws; `None` selects the default.
    pub fn apply_shader(&mut self, shader: Option<ShaderId>) -> Result<(), RendererError> {
        let shader = shader.unwrap_or(self.default_shader);
        if !self.shaders.contains_key(shader) {
            return Err(RendererError::StaleResource {
                kind: ResourceKind::Shader,
            });
        }
        if shader != self.state.shader {
            self.flush();
            self.state.shader = shader;
        }
        Ok(())
    }

    /// Redirects following draws into `target`.
    pub fn set_render_target(&mut self, target: RenderTargetId) -> Result<(), RendererError> {
        if !self.render_targets.contains_key(target) {
            return Err(RendererError::StaleResource {
                kind: ResourceKind::RenderTarget,
            });
        }
        self.switch_target(Some(target));
        Ok(())
    }

    pub fn set_render_target_to_screen(&mut self) {
        self.switch_target(None);
    }

    fn switch_target(&mut self, target: Option<RenderTargetId>) {
        if target != self.state.target {
            self.flush();
            self.state.target = target;
        }
    }

    /// Closes geometry staged since the last boundary into a batch under the
    /// current state.
    fn flush(&mut self) {
        let recorded = self.batches.flush(
            self.staging.vertex_count() as u32,
            self.staging.index_count() as u32,
            self.state,
        );
        if recorded {
            self.stats.batches += 1;
        }
    }

    fn current_framebuffer(&self) -> Result<FramebufferTarget, RendererError> {
        match self.state.target {
            Some(id) => self
                .render_targets
                .get(id)
                .map(|rt| FramebufferTarget::Offscreen(rt.framebuffer()))
                .ok_or(RendererError::StaleResource {
                    kind: ResourceKind::RenderTarget,
                }),
            None => Ok(FramebufferTarget::Swapchain),
        }
    }

    /// Pixel extent of whatever is currently drawn into.
    fn projection(&self) -> Viewport {
        match self.state.target.and_then(|id| self.render_targets.get(id)) {
            Some(rt) => Viewport::from_pixels(rt.width(), rt.height()),
            None => self.viewport,
        }
    }
}

// ── submission ────────────────────────────────────────────────────────────

impl<B: GpuBackend> Renderer<B> {
    /// Merges recorded batches, uploads newly staged data and records one
    /// draw per merged batch. Staging cursors keep their positions.
    fn submit_batches(&mut self) -> Result<(), RendererError> {
        self.flush();
        if self.batches.is_empty() {
            return Ok(());
        }

        self.upload_staged();

        let merged = self.batches.take_merged();
        let mut result = Ok(());
        for batch in &merged {
            match self.draw_batch(batch) {
                Ok(true) => {
                    self.stats.draw_calls += 1;
                    self.stats.vertices += batch.vertex_count;
                    self.stats.indices += batch.index_count;
                }
                Ok(false) => {}
                Err(err) => {
                    result = Err(err);
                    break;
                }
            }
        }
        log::trace!(
            "[{}] {} batches merged into {} draws",
            self.label,
            self.batches.len(),
            merged.len()
        );
        self.batches.recycle(merged);
        self.batches.clear();
        result
    }

    fn upload_staged(&mut self) {
        let vertex_end = self.staging.vertex_count();
        if vertex_end > self.uploaded_vertices {
            let bytes = bytemuck::cast_slice(self.staging.vertices(self.uploaded_vertices..vertex_end));
            self.backend.update_buffer(
                self.vertex_buffer,
                self.uploaded_vertices as u64 * Vertex::SIZE,
                bytes,
            );
            self.uploaded_vertices = vertex_end;
            self.stats.uploads += 1;
        }

        let index_end = self.staging.index_count();
        if index_end > self.uploaded_indices {
            let bytes = bytemuck::cast_slice(self.staging.indices(self.uploaded_indices..index_end));
            self.backend.update_buffer(
                self.index_buffer,
                self.uploaded_indices as u64 * INDEX_SIZE,
                bytes,
            );
            self.uploaded_indices = index_end;
            self.stats.uploads += 1;
        }
    }

    /// Records the draw for one merged batch. Returns whether a draw was issued.
    fn draw_batch(&mut self, batch: &Batch) -> Result<bool, RendererError> {
        let state = batch.state;

        if let Some(rt) = state.target.and_then(|id| self.render_targets.get(id)) {
            if rt.texture() == state.texture {
                log::warn!(
                    "[{}] skipped a batch sampling the render target it draws into",
                    self.label
                );
                return Ok(false);
            }
        }

        let texture = self.textures.get_mut(state.texture).ok_or(RendererError::StaleResource {
            kind: ResourceKind::Texture,
        })?;
        if texture.take_mips_dirty() {
            self.backend.generate_mipmaps(texture.image());
        }

        let shader = self.shaders.get_mut(state.shader).ok_or(RendererError::StaleResource {
            kind: ResourceKind::Shader,
        })?;
        let resource_set = shader.resource_set_for(&mut self.backend, state.texture, texture)?;
        shader.flush_uniforms(&mut self.backend);
        let pipeline = shader.pipeline();

        let (target, width, height) = match state.target {
            Some(id) => {
                let rt = self.render_targets.get(id).ok_or(RendererError::StaleResource {
                    kind: ResourceKind::RenderTarget,
                })?;
                (FramebufferTarget::Offscreen(rt.framebuffer()), rt.width(), rt.height())
            }
            None => {
                let (w, h) = self.backend.swapchain_size();
                (FramebufferTarget::Swapchain, w, h)
            }
        };

        self.backend.set_framebuffer(target);
        self.backend.set_viewport(ViewportRect {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
        });
        self.backend.set_scissor(ScissorRect {
            x: 0,
            y: 0,
            width,
            height,
        });
        self.backend.set_vertex_buffer(self.vertex_buffer);
        self.backend.set_index_buffer(self.index_buffer);
        self.backend.set_pipeline(pipeline);
        self.backend.set_resource_set(resource_set);
        // Indices are absolute positions in the vertex buffer.
        self.backend.draw_indexed(batch.index_count, batch.index_start, 0);

        if let Some(rt) = state.target.and_then(|id| self.render_targets.get(id)) {
            rt.resolve(&mut self.backend);
            if let Some(texture) = self.textures.get_mut(rt.texture()) {
                texture.mark_written();
            }
        }
        Ok(true)
    }

    /// Makes room for a shape, submitting mid-frame when the staging buffers
    /// are full. Returns `false` if the shape can never fit.
    fn ensure_space_for(&mut self, vertices: usize, indices: usize) -> bool {
        if self.staging.has_room(vertices, indices) {
            return true;
        }
        if !self.staging.can_ever_hold(vertices, indices) {
            log::warn!(
                "[{}] shape with {vertices} vertices / {indices} indices exceeds staging capacity; dropped",
                self.label
            );
            return false;
        }

        log::debug!("[{}] staging buffers full; submitting mid-frame", self.label);
        self.stats.capacity_flushes += 1;

        let drained = self.submit_batches();
        self.backend.end_commands();
        let submitted = self.backend.submit();
        let reopened = self.backend.begin_commands();
        self.rewind();
        if let Err(err) = drained.and(submitted).and(reopened) {
            self.defer_error(err);
        }
        true
    }
}

// ── draw calls ────────────────────────────────────────────────────────────

impl<B: GpuBackend> Renderer<B> {
    pub fn draw_rectangle(&mut self, pos: Vec2, size: Vec2, color: Color) {
        self.draw_rectangle_rotated(pos, size, 0.0, Anchor::TopLeft, color);
    }

    /// Rectangle rotated by `rotation` radians about `anchor`.
    pub fn draw_rectangle_rotated(
        &mut self,
        pos: Vec2,
        size: Vec2,
        rotation: f32,
        anchor: Anchor,
        color: Color,
    ) {
        self.emit_rectangle(pos, size, None, rotation, anchor, color);
    }

    /// Rectangle showing the `source` texel rectangle of the active texture.
    pub fn draw_rectangle_uv(
        &mut self,
        pos: Vec2,
        size: Vec2,
        source: Rect,
        rotation: f32,
        anchor: Anchor,
        color: Color,
    ) {
        self.emit_rectangle(pos, size, Some(source), rotation, anchor, color);
    }

    /// Circle with a segment count derived from its radius.
    pub fn draw_circle(&mut self, pos: Vec2, radius: f32, color: Color) {
        self.draw_circle_segments(pos, radius, geometry::circle_segments_for_radius(radius), color);
    }

    pub fn draw_circle_segments(&mut self, pos: Vec2, radius: f32, segments: u32, color: Color) {
        if !self.accepting_draws() || segments < 3 {
            return;
        }
        let bounds = Rect::from_origin_size(pos - Vec2::splat(radius), Vec2::splat(radius * 2.0));
        if !geometry::is_visible(bounds, self.projection().size()) {
            return;
        }
        let n = segments as usize;
        if !self.ensure_space_for(n, n * 3) {
            return;
        }

        let projection = self.projection();
        let base = self.staging.vertex_count() as u32;
        let color = color.packed();
        for i in 0..segments {
            let dir = geometry::circle_direction(i, segments);
            let uv = Vec2::splat(0.5) + dir * 0.5;
            self.staging.push_vertex(Vertex {
                position: projection.project(pos + dir * radius),
                uv: uv.to_array(),
                color,
            });
        }
        for i in 0..segments {
            self.staging.push_index(base);
            self.staging.push_index(base + i);
            self.staging.push_index(base + (i + 1) % segments);
        }
    }

    /// Arbitrary triangles. `indices` refer to `vertices`, which are offsets from `pos`.
    pub fn draw_polygon(&mut self, pos: Vec2, vertices: &[Vec2], indices: &[u32], color: Color) {
        if !self.accepting_draws() || vertices.is_empty() || indices.is_empty() {
            return;
        }
        if indices.len() % 3 != 0 {
            log::warn!(
                "[{}] polygon has {} indices, not whole triangles; dropped",
                self.label,
                indices.len()
            );
            return;
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            log::warn!(
                "[{}] polygon index {bad} out of range for {} vertices; dropped",
                self.label,
                vertices.len()
            );
            return;
        }

        let points: Vec<Vec2> = vertices.iter().map(|&v| pos + v).collect();
        let Some(bounds) = Rect::bounding(&points) else {
            return;
        };
        if !geometry::is_visible(bounds, self.projection().size()) {
            return;
        }
        if !self.ensure_space_for(points.len(), indices.len()) {
            return;
        }

        let projection = self.projection();
        let base = self.staging.vertex_count() as u32;
        let color = color.packed();
        for p in points {
            self.staging.push_vertex(Vertex {
                position: projection.project(p),
                uv: [0.0, 0.0],
                color,
            });
        }
        for &i in indices {
            self.staging.push_index(base + i);
        }
    }

    pub fn draw_line(&mut self, a: Vec2, b: Vec2, thickness: f32, color: Color) {
        if a == b {
            return;
        }
        let (pos, size, rotation) = geometry::line_rect(a, b, thickness);
        self.emit_rectangle(pos, size, None, rotation, Anchor::Top, color);
    }

    fn accepting_draws(&mut self) -> bool {
        if self.in_frame {
            return true;
        }
        if !self.warned_outside_frame {
            log::warn!("[{}] draw calls outside begin/end are ignored", self.label);
            self.warned_outside_frame = true;
        }
        false
    }

    fn emit_rectangle(
        &mut self,
        pos: Vec2,
        size: Vec2,
        source: Option<Rect>,
        rotation: f32,
        anchor: Anchor,
        color: Color,
    ) {
        if !self.accepting_draws() {
            return;
        }
        let corners = geometry::rect_corners(pos, size, rotation, anchor);
        let Some(bounds) = Rect::bounding(&corners) else {
            return;
        };
        if !geometry::is_visible(bounds, self.projection().size()) {
            return;
        }
        if !self.ensure_space_for(4, 6) {
            return;
        }

        let (texture_size, flip_v) = match self.textures.get(self.state.texture) {
            Some(t) => (
                t.size(),
                t.origin() == TextureOrigin::RenderTarget
                    && self.backend.uv_origin() == UvOrigin::BottomLeft,
            ),
            None => (Vec2::ONE, false),
        };
        let source = source.unwrap_or(Rect::from_origin_size(Vec2::ZERO, texture_size));
        let uvs = geometry::quad_uvs(source, texture_size, flip_v);

        let projection = self.projection();
        let base = self.staging.vertex_count() as u32;
        let color = color.packed();
        for (corner, uv) in corners.into_iter().zip(uvs) {
            self.staging.push_vertex(Vertex {
                position: projection.project(corner),
                uv,
                color,
            });
        }
        for i in QUAD_INDICES {
            self.staging.push_index(base + i);
        }
    }
}

// ── resources ─────────────────────────────────────────────────────────────

impl<B: GpuBackend> Renderer<B> {
    pub fn default_texture(&self) -> TextureId {
        self.default_texture
    }

    pub fn default_shader(&self) -> ShaderId {
        self.default_shader
    }

    pub fn create_texture(&mut self, desc: &TextureDesc<'_>) -> Result<TextureId, RendererError> {
        let texture = Texture::upload(&mut self.backend, desc)?;
        log::info!(
            "[{}] texture `{}` created ({}x{}, {} mip levels)",
            self.label,
            desc.label,
            desc.width,
            desc.height,
            desc.mip_levels
        );
        Ok(self.textures.insert(texture))
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id)
    }

    /// Fails for the default texture, for textures owned by a render target,
    /// and for textures referenced by the current frame.
    pub fn destroy_texture(&mut self, id: TextureId) -> Result<(), RendererError> {
        let texture = self.textures.get(id).ok_or(RendererError::StaleResource {
            kind: ResourceKind::Texture,
        })?;
        if texture.origin() == TextureOrigin::RenderTarget {
            return Err(RendererError::InvalidDescriptor(
                "render target textures are released with their render target".into(),
            ));
        }
        if id == self.default_texture || self.texture_in_use(id) {
            return Err(RendererError::ResourceInUse {
                kind: ResourceKind::Texture,
            });
        }
        self.release_texture(id);
        Ok(())
    }

    fn texture_in_use(&self, id: TextureId) -> bool {
        self.state.texture == id || self.batches.references(|s| s.texture == id)
    }

    fn release_texture(&mut self, id: TextureId) {
        for shader in self.shaders.values_mut() {
            shader.forget_texture(&mut self.backend, id);
        }
        if let Some(texture) = self.textures.remove(id) {
            texture.destroy(&mut self.backend);
        }
    }

    pub fn create_shader(&mut self, desc: &ShaderDesc) -> Result<ShaderId, RendererError> {
        let shader = Shader::create(&mut self.backend, desc)?;
        log::info!(
            "[{}] shader `{}` created ({} uniform bytes)",
            self.label,
            desc.label,
            shader.uniforms().size()
        );
        Ok(self.shaders.insert(shader))
    }

    pub fn shader(&self, id: ShaderId) -> Option<&Shader> {
        self.shaders.get(id)
    }

    pub fn destroy_shader(&mut self, id: ShaderId) -> Result<(), RendererError> {
        if !self.shaders.contains_key(id) {
            return Err(RendererError::StaleResource {
                kind: ResourceKind::Shader,
            });
        }
        if id == self.default_shader
            || self.state.shader == id
            || self.batches.references(|s| s.shader == id)
        {
            return Err(RendererError::ResourceInUse {
                kind: ResourceKind::Shader,
            });
        }
        if let Some(shader) = self.shaders.remove(id) {
            shader.destroy(&mut self.backend);
        }
        Ok(())
    }

    /// Writes one uniform; the block is uploaded before the shader's next batch.
    pub fn set_uniform(
        &mut self,
        shader: ShaderId,
        name: &str,
        value: impl Into<UniformValue>,
    ) -> Result<(), RendererError> {
        let shader = self.shaders.get_mut(shader).ok_or(RendererError::StaleResource {
            kind: ResourceKind::Shader,
        })?;
        shader.set_uniform(name, value.into())
    }

    pub fn create_render_target(
        &mut self,
        desc: &RenderTargetDesc<'_>,
    ) -> Result<RenderTargetId, RendererError> {
        let textures = &mut self.textures;
        let target =
            RenderTarget::create(&mut self.backend, desc, |texture| textures.insert(texture))?;
        log::info!(
            "[{}] render target `{}` created ({}x{}, {}x samples, {} mip levels)",
            self.label,
            desc.label,
            desc.width,
            desc.height,
            desc.sample_count.count(),
            desc.mip_levels
        );
        Ok(self.render_targets.insert(target))
    }

    pub fn render_target(&self, id: RenderTargetId) -> Option<&RenderTarget> {
        self.render_targets.get(id)
    }

    /// Sampleable texture holding the target's (resolved) output.
    pub fn render_target_texture(&self, id: RenderTargetId) -> Option<TextureId> {
        self.render_targets.get(id).map(RenderTarget::texture)
    }

    pub fn destroy_render_target(&mut self, id: RenderTargetId) -> Result<(), RendererError> {
        let target = self.render_targets.get(id).ok_or(RendererError::StaleResource {
            kind: ResourceKind::RenderTarget,
        })?;
        let texture = target.texture();
        if self.state.target == Some(id)
            || self.batches.references(|s| s.target == Some(id))
            || self.texture_in_use(texture)
        {
            return Err(RendererError::ResourceInUse {
                kind: ResourceKind::RenderTarget,
            });
        }
        if let Some(target) = self.render_targets.remove(id) {
            target.destroy(&mut self.backend);
        }
        self.release_texture(texture);
        Ok(())
    }
}

impl<B: GpuBackend> Drop for Renderer<B> {
    fn drop(&mut self) {
        for (_, target) in self.render_targets.drain() {
            target.destroy(&mut self.backend);
        }
        for (_, shader) in self.shaders.drain() {
            shader.destroy(&mut self.backend);
        }
        for (_, texture) in self.textures.drain() {
            texture.destroy(&mut self.backend);
        }
        self.backend.destroy_buffer(self.vertex_buffer);
        self.backend.destroy_buffer(self.index_buffer);
        log::debug!("[{}] renderer released", self.label);
    }
}
