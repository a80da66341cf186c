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


//! Submission-side bookkeeping for live resources.
//!
//! The registry hands out handles and remembers what the renderer needs to know about
//! each resource without asking the backend: vertex layouts, index widths, texture
//! sizes and frame buffer attachments. Only the submission thread touches it.

use dawn_core::renderer::handle::{FrameBuffer, IndexBuffer, Program, Shader, Texture, VertexBuffer};
use dawn_core::renderer::{
    FrameBufferHandle, HandleGenerator, IndexBufferHandle, IndexBufferType, ProgramHandle,
    ShaderHandle, TextureFormat, TextureHandle, VertexBufferHandle, VertexDecl,
};
use std::collections::HashMap;

/// What the renderer knows about a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    /// Width in texels.
    pub width: u16,
    /// Height in texels.
    pub height: u16,
    /// Pixel format.
    pub format: TextureFormat,
}

/// What the renderer knows about a frame buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBufferInfo {
    /// Width in pixels.
    pub width: u16,
    /// Height in pixels.
    pub height: u16,
    /// Attachments in order.
    pub textures: Vec<TextureHandle>,
    /// The attachments were created along with the frame buffer and die with it.
    pub owned_textures: bool,
}

/// Handle generators and per-handle metadata for every resource kind.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    vertex_buffers: HashMap<VertexBufferHandle, VertexDecl>,
    index_buffers: HashMap<IndexBufferHandle, IndexBufferType>,
    textures: HashMap<TextureHandle, TextureInfo>,
    frame_buffers: HashMap<FrameBufferHandle, FrameBufferInfo>,
    vertex_buffer_handles: HandleGenerator<VertexBuffer>,
    index_buffer_handles: HandleGenerator<IndexBuffer>,
    shader_handles: HandleGenerator<Shader>,
    program_handles: HandleGenerator<Program>,
    texture_handles: HandleGenerator<Texture>,
    frame_buffer_handles: HandleGenerator<FrameBuffer>,
}

impl ResourceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vertex buffer with layout `decl`.
    pub fn add_vertex_buffer(&mut self, decl: VertexDecl) -> VertexBufferHandle {
        let handle = self.vertex_buffer_handles.next();
        self.vertex_buffers.insert(handle, decl);
        handle
    }

    /// Layout of a live vertex buffer.
    pub fn vertex_decl(&self, handle: VertexBufferHandle) -> Option<&VertexDecl> {
        self.vertex_buffers.get(&handle)
    }

    /// Forgets a vertex buffer, returning its layout if it was live.
    pub fn remove_vertex_buffer(&mut self, handle: VertexBufferHandle) -> Option<VertexDecl> {
        self.vertex_buffers.remove(&handle)
    }

    /// Registers an index buffer of `index_type` indices.
    pub fn add_index_buffer(&mut self, index_type: IndexBufferType) -> IndexBufferHandle {
        let handle = self.index_buffer_handles.next();
        self.index_buffers.insert(handle, index_type);
        handle
    }

    /// Index width of a live index buffer.
    pub fn index_type(&self, handle: IndexBufferHandle) -> Option<IndexBufferType> {
        self.index_buffers.get(&handle).copied()
    }

    /// Forgets an index buffer.
    pub fn remove_index_buffer(&mut self, handle: IndexBufferHandle) -> Option<IndexBufferType> {
        self.index_buffers.remove(&handle)
    }

    /// Issues a shader handle.
    pub fn next_shader(&mut self) -> ShaderHandle {
        self.shader_handles.next()
    }

    /// Issues a program handle.
    pub fn next_program(&mut self) -> ProgramHandle {
        self.program_handles.next()
    }

    /// Registers a texture.
    pub fn add_texture(&mut self, info: TextureInfo) -> TextureHandle {
        let handle = self.texture_handles.next();
        self.textures.insert(handle, info);
        handle
    }

    /// Size and format of a live texture.
    pub fn texture_info(&self, handle: TextureHandle) -> Option<TextureInfo> {
        self.textures.get(&handle).copied()
    }

    /// Forgets a texture.
    pub fn remove_texture(&mut self, handle: TextureHandle) -> Option<TextureInfo> {
        self.textures.remove(&handle)
    }

    /// Registers a frame buffer.
    pub fn add_frame_buffer(&mut self, info: FrameBufferInfo) -> FrameBufferHandle {
        let handle = self.frame_buffer_handles.next();
        self.frame_buffers.insert(handle, info);
        handle
    }

    /// Attachments and size of a live frame buffer.
    pub fn frame_buffer_info(&self, handle: FrameBufferHandle) -> Option<&FrameBufferInfo> {
        self.frame_buffers.get(&handle)
    }

    /// Forgets a frame buffer.
    pub fn remove_frame_buffer(&mut self, handle: FrameBufferHandle) -> Option<FrameBufferInfo> {
        self.frame_buffers.remove(&handle)
    }

    /// Number of live vertex buffers, index buffers, textures and frame buffers.
    pub fn live_count(&self) -> usize {
        self.vertex_buffers.len()
            + self.index_buffers.len()
            + self.textures.len()
            + self.frame_buffers.len()
    }
}
