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


//! The per-frame data handed from the submission side to a backend.
//!
//! A [`Frame`] holds everything one render needs: the commands to run before and after
//! the draw pass, the [`View`]s with their captured [`RenderItem`]s, the item currently
//! under construction, and the two transient arenas. The renderer owns exactly two frames
//! and alternates them between the submission and the render side.

use std::collections::HashMap;
#[cfg(debug_assertions)]
use std::collections::HashSet;

use crate::renderer::command::RenderCommand;
use crate::renderer::handle::{
    FrameBufferHandle, Handle, HandleGenerator, HandleKind, IndexBuffer, IndexBufferHandle,
    ProgramHandle, TextureHandle, TransientIndexBuffer, TransientVertexBuffer, VertexBuffer,
    VertexBufferHandle,
};
use crate::renderer::types::{BlendEquation, BlendFunc, CullFrontFace, PolygonMode, UniformValue};
use crate::renderer::vertex_decl::VertexDecl;

/// Number of texture units a single draw can bind.
pub const MAX_TEXTURE_SAMPLERS: usize = 8;

/// Default capacity of each transient arena.
pub const DEFAULT_TRANSIENT_BUFFER_SIZE: usize = 1 << 20;

/// Fixed-function state for a draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct RenderStates {
    pub depth_test: bool,
    pub depth_write: bool,
    pub colour_write: bool,
    pub cull_face: bool,
    pub cull_front_face: CullFrontFace,
    pub polygon_mode: PolygonMode,
    pub blending: bool,
    pub blend_equation_rgb: BlendEquation,
    pub blend_src_rgb: BlendFunc,
    pub blend_dest_rgb: BlendFunc,
    pub blend_equation_alpha: BlendEquation,
    pub blend_src_alpha: BlendFunc,
    pub blend_dest_alpha: BlendFunc,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            depth_test: true,
            depth_write: true,
            colour_write: true,
            cull_face: true,
            cull_front_face: CullFrontFace::Ccw,
            polygon_mode: PolygonMode::Fill,
            blending: false,
            blend_equation_rgb: BlendEquation::Add,
            blend_src_rgb: BlendFunc::One,
            blend_dest_rgb: BlendFunc::Zero,
            blend_equation_alpha: BlendEquation::Add,
            blend_src_alpha: BlendFunc::One,
            blend_dest_alpha: BlendFunc::Zero,
        }
    }
}

/// A clip rectangle in target pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct ScissorRect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

/// The complete state of a single draw call.
///
/// Built up by the renderer's setters and captured into a [`View`] on submit. The
/// [`Default`] value is the cleared state every draw starts from.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderItem {
    /// Vertex buffer to draw from.
    pub vb: VertexBufferHandle,
    /// Byte offset of the first vertex.
    pub vb_offset: u32,
    /// Layout override, set when drawing from the transient vertex arena.
    pub vertex_decl_override: Option<VertexDecl>,
    /// Index buffer, or invalid for non-indexed draws.
    pub ib: IndexBufferHandle,
    /// Byte offset of the first index.
    pub ib_offset: u32,
    /// Number of triangles.
    pub primitive_count: u32,
    /// Program to draw with.
    pub program: ProgramHandle,
    /// Uniform values by name.
    pub uniforms: HashMap<String, UniformValue>,
    /// Texture bound to each unit, invalid for unused units.
    pub textures: [TextureHandle; MAX_TEXTURE_SAMPLERS],
    /// Scissor rectangle, `None` disables the scissor test.
    pub scissor: Option<ScissorRect>,
    /// Fixed-function state.
    pub states: RenderStates,
}

impl Default for RenderItem {
    fn default() -> Self {
        Self {
            vb: VertexBufferHandle::INVALID,
            vb_offset: 0,
            vertex_decl_override: None,
            ib: IndexBufferHandle::INVALID,
            ib_offset: 0,
            primitive_count: 0,
            program: ProgramHandle::INVALID,
            uniforms: HashMap::new(),
            textures: [TextureHandle::INVALID; MAX_TEXTURE_SAMPLERS],
            scissor: None,
            states: RenderStates::default(),
        }
    }
}

impl RenderItem {
    /// Resets the item to the default draw state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A render pass: an optional clear, a target frame buffer and an ordered list of draws.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    /// Colour the target is cleared to before drawing, along with depth.
    pub clear_colour: Option<[f32; 4]>,
    /// Target, [`FrameBufferHandle::BACKBUFFER`] by default.
    pub frame_buffer: FrameBufferHandle,
    /// Captured draws in submission order.
    pub render_items: Vec<RenderItem>,
}

impl Default for View {
    fn default() -> Self {
        Self {
            clear_colour: None,
            frame_buffer: FrameBufferHandle::BACKBUFFER,
            render_items: Vec::new(),
        }
    }
}

/// One allocation made from a transient arena.
#[derive(Debug, Clone, PartialEq)]
pub struct TransientAllocation {
    /// Byte offset from the start of the arena.
    pub offset: u32,
    /// Length in bytes.
    pub size: u32,
    /// Layout of the vertices, empty for index allocations.
    pub decl: VertexDecl,
}

/// A fixed-size, bump-allocated byte arena backed by one persistent GPU buffer.
///
/// `B` is the kind of the backing buffer and `T` the kind of the per-frame handles.
#[derive(Debug)]
pub struct TransientStorage<B: HandleKind, T: HandleKind> {
    /// The persistent buffer the arena is uploaded into. Shared by both frames.
    pub handle: Handle<B>,
    data: Vec<u8>,
    size: usize,
    allocations: HashMap<Handle<T>, TransientAllocation>,
    generator: HandleGenerator<T>,
}

/// The transient vertex arena.
pub type TransientVertexStorage = TransientStorage<VertexBuffer, TransientVertexBuffer>;
/// The transient index arena.
pub type TransientIndexStorage = TransientStorage<IndexBuffer, TransientIndexBuffer>;

impl<B: HandleKind, T: HandleKind> TransientStorage<B, T> {
    /// Creates an empty arena of `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            handle: Handle::INVALID,
            data: vec![0; capacity],
            size: 0,
            allocations: HashMap::new(),
            generator: HandleGenerator::new(),
        }
    }

    /// Total size of the arena in bytes.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Bytes allocated this frame.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes still available this frame.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.size
    }

    /// Reserves `bytes` bytes. Returns [`Handle::INVALID`] without touching the arena if
    /// they do not fit or this frame has used up its handles.
    pub fn allocate(&mut self, bytes: usize, decl: VertexDecl) -> Handle<T> {
        if bytes > self.remaining() {
            return Handle::INVALID;
        }
        let Some(handle) = self.generator.try_next() else {
            return Handle::INVALID;
        };
        self.allocations.insert(
            handle,
            TransientAllocation {
                offset: self.size as u32,
                size: bytes as u32,
                decl,
            },
        );
        self.size += bytes;
        handle
    }

    /// Looks up an allocation made this frame.
    pub fn allocation(&self, handle: Handle<T>) -> Option<&TransientAllocation> {
        self.allocations.get(&handle)
    }

    /// The bytes of an allocation, for the caller to fill.
    pub fn data_mut(&mut self, handle: Handle<T>) -> Option<&mut [u8]> {
        let allocation = self.allocations.get(&handle)?;
        let start = allocation.offset as usize;
        let end = start + allocation.size as usize;
        self.data.get_mut(start..end)
    }

    /// Everything allocated this frame, from the start of the arena.
    pub fn used_data(&self) -> &[u8] {
        &self.data[..self.size]
    }

    /// Number of allocations made this frame.
    pub fn allocation_count(&self) -> usize {
        self.allocations.len()
    }

    /// Frees every allocation. Handles issued this frame become meaningless.
    pub fn reset(&mut self) {
        self.size = 0;
        self.allocations.clear();
        self.generator.reset();
    }
}

/// Everything a backend needs to render one frame.
#[derive(Debug)]
pub struct Frame {
    /// Draw state under construction.
    pub current_item: RenderItem,
    /// Views by index. View 0 always exists.
    pub views: Vec<View>,
    /// Commands run before any view is drawn.
    pub commands_pre: Vec<RenderCommand>,
    /// Commands run after every view has been drawn.
    pub commands_post: Vec<RenderCommand>,
    /// Transient vertex arena.
    pub transient_vb_storage: TransientVertexStorage,
    /// Transient index arena.
    pub transient_ib_storage: TransientIndexStorage,
    /// Persistent vertex buffers updated this frame.
    #[cfg(debug_assertions)]
    pub updated_vertex_buffers: HashSet<VertexBufferHandle>,
    /// Persistent index buffers updated this frame.
    #[cfg(debug_assertions)]
    pub updated_index_buffers: HashSet<IndexBufferHandle>,
}

impl Frame {
    /// Creates a frame with arenas of the given sizes in bytes.
    pub fn new(transient_vb_size: usize, transient_ib_size: usize) -> Self {
        Self {
            current_item: RenderItem::default(),
            views: vec![Self::default_view()],
            commands_pre: Vec::new(),
            commands_post: Vec::new(),
            transient_vb_storage: TransientStorage::new(transient_vb_size),
            transient_ib_storage: TransientStorage::new(transient_ib_size),
            #[cfg(debug_assertions)]
            updated_vertex_buffers: HashSet::new(),
            #[cfg(debug_assertions)]
            updated_index_buffers: HashSet::new(),
        }
    }

    fn default_view() -> View {
        View {
            clear_colour: Some([0.0, 0.0, 0.0, 1.0]),
            ..View::default()
        }
    }

    /// Returns the view at `index`, growing the view list if needed.
    pub fn view_mut(&mut self, index: u16) -> &mut View {
        let index = index as usize;
        if index >= self.views.len() {
            self.views.resize_with(index + 1, View::default);
        }
        &mut self.views[index]
    }

    /// Moves the item under construction to the end of `view` and starts a fresh one.
    pub fn submit_current_item(&mut self, view: u16) {
        let item = std::mem::take(&mut self.current_item);
        self.view_mut(view).render_items.push(item);
    }

    /// Total number of captured draws across all views.
    pub fn render_item_count(&self) -> usize {
        self.views.iter().map(|v| v.render_items.len()).sum()
    }

    /// Clears all per-frame state so the frame can be filled again.
    pub fn reset(&mut self) {
        self.current_item.clear();
        for view in &mut self.views {
            view.render_items.clear();
        }
        self.views[0].frame_buffer = FrameBufferHandle::BACKBUFFER;
        self.commands_pre.clear();
        self.commands_post.clear();
        self.transient_vb_storage.reset();
        self.transient_ib_storage.reset();
        #[cfg(debug_assertions)]
        {
            self.updated_vertex_buffers.clear();
            self.updated_index_buffers.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::vertex_decl::{AttributeType, VertexAttribute};

    fn position_decl() -> VertexDecl {
        VertexDecl::begin()
            .add(VertexAttribute::Position, 3, AttributeType::Float)
            .end()
    }

    #[test]
    fn default_render_item_states() {
        let item = RenderItem::default();
        assert!(item.states.cull_face);
        assert_eq!(item.states.cull_front_face, CullFrontFace::Ccw);
        assert!(item.states.depth_test);
        assert!(!item.states.blending);
        assert_eq!(item.states.polygon_mode, PolygonMode::Fill);
        assert!(item.states.colour_write && item.states.depth_write);
        assert!(item.textures.iter().all(|t| !t.is_valid()));
    }

    #[test]
    fn views_grow_on_demand() {
        let mut frame = Frame::new(64, 64);
        assert_eq!(frame.views.len(), 1);
        frame.view_mut(3).clear_colour = Some([1.0; 4]);
        assert_eq!(frame.views.len(), 4);
        assert_eq!(frame.views[2], View::default());
    }

    #[test]
    fn arena_boundary_is_inclusive() {
        let decl = position_decl();
        let mut storage = TransientVertexStorage::new(decl.stride() as usize * 4);

        let first = storage.allocate(decl.stride() as usize * 3, decl.clone());
        assert!(first.is_valid());
        assert_eq!(storage.remaining(), decl.stride() as usize);

        let overflow = storage.allocate(decl.stride() as usize + 1, decl.clone());
        assert!(!overflow.is_valid());
        assert_eq!(storage.size(), decl.stride() as usize * 3);
        assert_eq!(storage.allocation_count(), 1);

        let exact = storage.allocate(decl.stride() as usize, decl);
        assert!(exact.is_valid());
        assert_eq!(storage.remaining(), 0);
        assert_eq!(storage.allocation(exact).map(|a| a.offset), Some(36));
    }

    #[test]
    fn arena_runs_out_of_handles_before_bytes() {
        let mut storage = TransientIndexStorage::new(1 << 20);
        let issued = (0..70_000)
            .map(|_| storage.allocate(2, VertexDecl::default()))
            .take_while(|handle| handle.is_valid())
            .count();
        assert_eq!(issued, u16::MAX as usize - 1);

        let size = storage.size();
        assert!(!storage.allocate(2, VertexDecl::default()).is_valid());
        assert_eq!(storage.size(), size);
        assert_eq!(storage.allocation_count(), issued);

        storage.reset();
        assert_eq!(storage.allocate(2, VertexDecl::default()).raw(), 1);
    }

    #[test]
    fn arena_data_is_writable_per_allocation() {
        let mut storage = TransientIndexStorage::new(16);
        let a = storage.allocate(4, VertexDecl::default());
        let b = storage.allocate(4, VertexDecl::default());
        storage.data_mut(b).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        storage.data_mut(a).unwrap().fill(9);
        assert_eq!(storage.used_data(), &[9, 9, 9, 9, 1, 2, 3, 4]);
    }

    #[test]
    fn reset_restores_fresh_state() {
        let mut frame = Frame::new(128, 128);
        frame.transient_vb_storage.allocate(32, position_decl());
        frame.transient_ib_storage.allocate(6, VertexDecl::default());
        frame.commands_pre.push(RenderCommand::CreateProgram {
            handle: ProgramHandle::from_raw(1),
        });
        frame.commands_post.push(RenderCommand::DeleteProgram {
            handle: ProgramHandle::from_raw(1),
        });
        frame
            .current_item
            .uniforms
            .insert("marker".into(), UniformValue::Int(7));
        frame.submit_current_item(2);
        frame.view_mut(0).frame_buffer = FrameBufferHandle::from_raw(5);
        frame.current_item.textures[0] = TextureHandle::from_raw(3);

        frame.reset();

        assert_eq!(frame.transient_vb_storage.size(), 0);
        assert_eq!(frame.transient_ib_storage.size(), 0);
        assert_eq!(frame.transient_vb_storage.allocation_count(), 0);
        assert!(frame.commands_pre.is_empty());
        assert!(frame.commands_post.is_empty());
        assert_eq!(frame.render_item_count(), 0);
        assert_eq!(frame.views[0].frame_buffer, FrameBufferHandle::BACKBUFFER);
        assert_eq!(frame.current_item, RenderItem::default());

        // Transient handles restart with the new frame.
        let handle = frame.transient_vb_storage.allocate(12, position_decl());
        assert_eq!(handle.raw(), 1);
    }

    #[test]
    fn submitted_item_leaves_a_cleared_one_behind() {
        let mut frame = Frame::new(0, 0);
        frame.current_item.textures[1] = TextureHandle::from_raw(2);
        frame.submit_current_item(0);
        frame.submit_current_item(0);

        let items = &frame.views[0].render_items;
        assert_eq!(items.len(), 2);
        assert!(items[0].textures[1].is_valid());
        assert_eq!(items[1], RenderItem::default());
    }
}
