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


//! Resource lifecycle commands.
//!
//! Commands are recorded on the submission side and executed by the backend, possibly on
//! another thread and a frame later. Every payload is owned, so a command stays valid no
//! matter what the caller does with its buffers after recording it.

use crate::renderer::handle::{
    FrameBufferHandle, IndexBufferHandle, ProgramHandle, ShaderHandle, TextureHandle,
    VertexBufferHandle,
};
use crate::renderer::types::{BufferUsage, IndexBufferType, ShaderStage, TextureFormat};
use crate::renderer::vertex_decl::VertexDecl;

/// A resource command executed by [`RenderDevice::process_command_list`].
///
/// [`RenderDevice::process_command_list`]: crate::renderer::RenderDevice::process_command_list
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum RenderCommand {
    CreateVertexBuffer {
        handle: VertexBufferHandle,
        data: Vec<u8>,
        decl: VertexDecl,
        usage: BufferUsage,
    },
    UpdateVertexBuffer {
        handle: VertexBufferHandle,
        offset: u32,
        data: Vec<u8>,
    },
    DeleteVertexBuffer {
        handle: VertexBufferHandle,
    },
    CreateIndexBuffer {
        handle: IndexBufferHandle,
        data: Vec<u8>,
        index_type: IndexBufferType,
        usage: BufferUsage,
    },
    UpdateIndexBuffer {
        handle: IndexBufferHandle,
        offset: u32,
        data: Vec<u8>,
    },
    DeleteIndexBuffer {
        handle: IndexBufferHandle,
    },
    CreateShader {
        handle: ShaderHandle,
        stage: ShaderStage,
        source: String,
    },
    DeleteShader {
        handle: ShaderHandle,
    },
    CreateProgram {
        handle: ProgramHandle,
    },
    AttachShader {
        program: ProgramHandle,
        shader: ShaderHandle,
    },
    LinkProgram {
        handle: ProgramHandle,
    },
    DeleteProgram {
        handle: ProgramHandle,
    },
    CreateTexture2D {
        handle: TextureHandle,
        width: u16,
        height: u16,
        format: TextureFormat,
        /// Tightly packed pixels, or empty to leave the texture uninitialised.
        data: Vec<u8>,
    },
    DeleteTexture {
        handle: TextureHandle,
    },
    CreateFrameBuffer {
        handle: FrameBufferHandle,
        width: u16,
        height: u16,
        textures: Vec<TextureHandle>,
    },
    DeleteFrameBuffer {
        handle: FrameBufferHandle,
    },
}

impl RenderCommand {
    /// A short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            RenderCommand::CreateVertexBuffer { .. } => "CreateVertexBuffer",
            RenderCommand::UpdateVertexBuffer { .. } => "UpdateVertexBuffer",
            RenderCommand::DeleteVertexBuffer { .. } => "DeleteVertexBuffer",
            RenderCommand::CreateIndexBuffer { .. } => "CreateIndexBuffer",
            RenderCommand::UpdateIndexBuffer { .. } => "UpdateIndexBuffer",
            RenderCommand::DeleteIndexBuffer { .. } => "DeleteIndexBuffer",
            RenderCommand::CreateShader { .. } => "CreateShader",
            RenderCommand::DeleteShader { .. } => "DeleteShader",
            RenderCommand::CreateProgram { .. } => "CreateProgram",
            RenderCommand::AttachShader { .. } => "AttachShader",
            RenderCommand::LinkProgram { .. } => "LinkProgram",
            RenderCommand::DeleteProgram { .. } => "DeleteProgram",
            RenderCommand::CreateTexture2D { .. } => "CreateTexture2D",
            RenderCommand::DeleteTexture { .. } => "DeleteTexture",
            RenderCommand::CreateFrameBuffer { .. } => "CreateFrameBuffer",
            RenderCommand::DeleteFrameBuffer { .. } => "DeleteFrameBuffer",
        }
    }

    /// Returns `true` for the commands that release a resource.
    pub fn is_delete(&self) -> bool {
        matches!(
            self,
            RenderCommand::DeleteVertexBuffer { .. }
                | RenderCommand::DeleteIndexBuffer { .. }
                | RenderCommand::DeleteShader { .. }
                | RenderCommand::DeleteProgram { .. }
                | RenderCommand::DeleteTexture { .. }
                | RenderCommand::DeleteFrameBuffer { .. }
        )
    }
}
