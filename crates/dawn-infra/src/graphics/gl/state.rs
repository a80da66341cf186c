// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


//! Adjacency-based binding diffing for the GL draw loop.
//!
//! Items are drawn in submission order and consecutive items usually share most of their
//! bindings. [`BindingCache`] remembers what the previous item bound and reports only the
//! bindings that differ, so the device issues the minimum number of bind calls.

use dawn_core::renderer::{
    IndexBufferHandle, ProgramHandle, RenderItem, RenderStates, ScissorRect, TextureHandle,
    VertexBufferHandle, VertexDecl, MAX_TEXTURE_SAMPLERS,
};

/// Counters for a single rendered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Draw calls issued.
    pub draw_calls: u32,
    /// Triangles submitted.
    pub triangles: u64,
    /// Vertex buffer / attribute layout binds.
    pub vertex_binds: u32,
    /// Index buffer binds.
    pub index_binds: u32,
    /// Program binds.
    pub program_binds: u32,
    /// Texture unit binds.
    pub texture_binds: u32,
    /// Fixed-function state applications.
    pub state_changes: u32,
}

/// The bindings that must be reissued before drawing an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindingChanges {
    /// Vertex buffer, offset or layout changed.
    pub vertex_buffer: bool,
    /// Index buffer changed, or the vertex array changed underneath it.
    pub index_buffer: bool,
    /// Program changed.
    pub program: bool,
    /// Per texture unit.
    pub textures: [bool; MAX_TEXTURE_SAMPLERS],
    /// Fixed-function state changed.
    pub states: bool,
    /// Scissor rectangle changed.
    pub scissor: bool,
}

impl BindingChanges {
    /// Returns `true` if nothing needs rebinding.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct VertexBinding {
    vb: VertexBufferHandle,
    offset: u32,
    decl_override: Option<VertexDecl>,
}

/// Remembers the previous item's bindings.
#[derive(Debug, Default)]
pub struct BindingCache {
    vertex: Option<VertexBinding>,
    index: Option<IndexBufferHandle>,
    program: Option<ProgramHandle>,
    textures: [Option<TextureHandle>; MAX_TEXTURE_SAMPLERS],
    states: Option<RenderStates>,
    scissor: Option<Option<ScissorRect>>,
    stats: FrameStats,
}

impl BindingCache {
    /// Creates an empty cache. The first item rebinds everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets all bindings and counters. Called at the start of every frame, since
    /// command processing binds objects behind the cache's back.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Forgets the fixed-function state and scissor, after a clear changed masks and
    /// scissor behind the cache's back.
    pub fn invalidate_fixed_function(&mut self) {
        self.states = None;
        self.scissor = None;
    }

    /// Compares `item` against the previous item and records it as the new previous.
    pub fn diff(&mut self, item: &RenderItem) -> BindingChanges {
        let mut changes = BindingChanges::default();

        let vertex_unchanged = self.vertex.as_ref().is_some_and(|v| {
            v.vb == item.vb
                && v.offset == item.vb_offset
                && v.decl_override == item.vertex_decl_override
        });
        if !vertex_unchanged {
            self.vertex = Some(VertexBinding {
                vb: item.vb,
                offset: item.vb_offset,
                decl_override: item.vertex_decl_override.clone(),
            });
            changes.vertex_buffer = true;
            self.stats.vertex_binds += 1;
        }

        // The element array binding lives in the vertex array object.
        if self.index != Some(item.ib) || changes.vertex_buffer {
            self.index = Some(item.ib);
            changes.index_buffer = item.ib.is_valid();
            if changes.index_buffer {
                self.stats.index_binds += 1;
            }
        }

        if self.program != Some(item.program) {
            self.program = Some(item.program);
            changes.program = true;
            self.stats.program_binds += 1;
        }

        for (unit, texture) in item.textures.iter().enumerate() {
            if self.textures[unit] != Some(*texture) {
                self.textures[unit] = Some(*texture);
                changes.textures[unit] = true;
                self.stats.texture_binds += 1;
            }
        }

        if self.states != Some(item.states) {
            self.states = Some(item.states);
            changes.states = true;
            self.stats.state_changes += 1;
        }

        if self.scissor != Some(item.scissor) {
            self.scissor = Some(item.scissor);
            changes.scissor = true;
        }

        changes
    }

    /// Counts a draw call of `triangles` triangles.
    pub fn record_draw(&mut self, triangles: u32) {
        self.stats.draw_calls += 1;
        self.stats.triangles += triangles as u64;
    }

    /// Counters accumulated since the last reset.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(vb: u16, ib: u16, program: u16) -> RenderItem {
        RenderItem {
            vb: VertexBufferHandle::from_raw(vb),
            ib: IndexBufferHandle::from_raw(ib),
            program: ProgramHandle::from_raw(program),
            primitive_count: 2,
            ..RenderItem::default()
        }
    }

    #[test]
    fn first_item_binds_everything() {
        let mut cache = BindingCache::new();
        let changes = cache.diff(&item(1, 1, 1));
        assert!(changes.vertex_buffer);
        assert!(changes.index_buffer);
        assert!(changes.program);
        assert!(changes.states);
        assert!(changes.textures.iter().all(|&t| t));
    }

    #[test]
    fn identical_consecutive_items_are_not_rebound() {
        let mut cache = BindingCache::new();
        cache.diff(&item(1, 2, 3));
        for _ in 0..10 {
            assert!(cache.diff(&item(1, 2, 3)).is_empty());
        }
        let stats = cache.stats();
        assert_eq!(stats.vertex_binds, 1);
        assert_eq!(stats.index_binds, 1);
        assert_eq!(stats.program_binds, 1);
        assert_eq!(stats.texture_binds, MAX_TEXTURE_SAMPLERS as u32);
    }

    #[test]
    fn only_changed_bindings_are_reported() {
        let mut cache = BindingCache::new();
        cache.diff(&item(1, 2, 3));

        let mut next = item(1, 2, 4);
        next.textures[2] = TextureHandle::from_raw(9);
        let changes = cache.diff(&next);

        assert!(!changes.vertex_buffer);
        assert!(!changes.index_buffer);
        assert!(changes.program);
        assert!(!changes.states);
        assert_eq!(
            changes.textures.iter().filter(|&&t| t).count(),
            1,
            "only unit 2 changed"
        );
        assert!(changes.textures[2]);
    }

    #[test]
    fn vertex_array_change_rebinds_index_buffer() {
        let mut cache = BindingCache::new();
        cache.diff(&item(1, 2, 3));
        let changes = cache.diff(&item(5, 2, 3));
        assert!(changes.vertex_buffer);
        assert!(changes.index_buffer);
    }

    #[test]
    fn offset_change_rebinds_vertex_layout() {
        let mut cache = BindingCache::new();
        cache.diff(&item(1, 2, 3));
        let mut next = item(1, 2, 3);
        next.vb_offset = 48;
        assert!(cache.diff(&next).vertex_buffer);
    }

    #[test]
    fn invalidated_states_are_reapplied() {
        let mut cache = BindingCache::new();
        cache.diff(&item(1, 2, 3));
        cache.invalidate_fixed_function();
        let changes = cache.diff(&item(1, 2, 3));
        assert!(changes.states);
        assert!(changes.scissor);
        assert!(!changes.program);
    }

    #[test]
    fn reset_forgets_bindings() {
        let mut cache = BindingCache::new();
        cache.diff(&item(1, 2, 3));
        cache.record_draw(2);
        cache.reset();
        assert_eq!(cache.stats(), FrameStats::default());
        assert!(cache.diff(&item(1, 2, 3)).program);
    }
}
