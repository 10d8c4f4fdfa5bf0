//! Batch bookkeeping: cutting the staged geometry into draw ranges and
//! coalescing neighbours that share state.

use super::{RenderTargetId, ShaderId, TextureId};

/// Everything that must be rebound between two draw calls.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DrawState {
    pub texture: TextureId,
    pub shader: ShaderId,
    /// `None` draws to the window.
    pub target: Option<RenderTargetId>,
}

/// A contiguous range of staged vertices and indices drawn under one state.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Batch {
    pub vertex_start: u32,
    pub vertex_count: u32,
    pub index_start: u32,
    pub index_count: u32,
    pub state: DrawState,
}

impl Batch {
    pub fn vertex_end(&self) -> u32 {
        self.vertex_start + self.vertex_count
    }

    pub fn index_end(&self) -> u32 {
        self.index_start + self.index_count
    }
}

/// Recorded batches of the current frame, in submission order.
#[derive(Debug, Default)]
pub struct BatchList {
    batches: Vec<Batch>,
    vertex_mark: u32,
    index_mark: u32,
    scratch: Vec<Batch>,
}

impl BatchList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether geometry was staged after the last recorded batch.
    pub fn has_pending(&self, vertex_cursor: u32, index_cursor: u32) -> bool {
        vertex_cursor > self.vertex_mark || index_cursor > self.index_mark
    }

    /// Closes the geometry staged since the previous flush into a batch.
    ///
    /// Returns `false` when nothing was pending.
    pub fn flush(&mut self, vertex_cursor: u32, index_cursor: u32, state: DrawState) -> bool {
        if !self.has_pending(vertex_cursor, index_cursor) {
            return false;
        }
        self.batches.push(Batch {
            vertex_start: self.vertex_mark,
            vertex_count: vertex_cursor - self.vertex_mark,
            index_start: self.index_mark,
            index_count: index_cursor - self.index_mark,
            state,
        });
        self.vertex_mark = vertex_cursor;
        self.index_mark = index_cursor;
        true
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Whether any recorded batch matches `predicate`.
    pub fn references(&self, predicate: impl Fn(&DrawState) -> bool) -> bool {
        self.batches.iter().any(|b| predicate(&b.state))
    }

    /// Coalesced copy of the recorded batches; hand it back through [`Self::recycle`].
    pub fn take_merged(&mut self) -> Vec<Batch> {
        let mut out = std::mem::take(&mut self.scratch);
        merge_adjacent(&self.batches, &mut out);
        out
    }

    pub fn recycle(&mut self, mut merged: Vec<Batch>) {
        merged.clear();
        self.scratch = merged;
    }

    /// Drops recorded batches; staging cursors keep advancing from the marks.
    pub fn clear(&mut self) {
        self.batches.clear();
    }

    /// Drops recorded batches and rewinds the marks to the buffer start.
    pub fn reset(&mut self) {
        self.batches.clear();
        self.vertex_mark = 0;
        self.index_mark = 0;
    }
}

/// Merges runs of consecutive batches with identical state.
///
/// Only neighbours merge: `[A(t1), B(t1), C(t2), D(t1)]` becomes three batches.
/// Neighbouring batches are contiguous, so merging extends both ranges.
pub fn merge_adjacent(batches: &[Batch], out: &mut Vec<Batch>) {
    out.clear();
    for batch in batches {
        match out.last_mut() {
            Some(last) if last.state == batch.state => {
                debug_assert_eq!(last.vertex_end(), batch.vertex_start);
                debug_assert_eq!(last.index_end(), batch.index_start);
                last.vertex_count += batch.vertex_count;
                last.index_count += batch.index_count;
            }
            _ => out.push(*batch),
        }
    }
}
