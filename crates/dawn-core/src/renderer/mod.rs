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


//! The backend-agnostic render hardware interface.
//!
//! This module is the common language between the code that records rendering work and
//! the backends that execute it: typed handles, vertex layouts, resource commands, the
//! [`Frame`] data model and the [`RenderContext`]/[`RenderDevice`] contract. The
//! orchestration lives in `dawn-renderer` and the concrete backends in `dawn-infra`.

pub mod command;
pub mod context;
pub mod error;
pub mod frame;
pub mod handle;
pub mod types;
pub mod vertex_decl;

pub use self::command::RenderCommand;
pub use self::context::{RenderContext, RenderDevice};
pub use self::error::{RenderError, ShaderError};
pub use self::frame::{
    Frame, RenderItem, RenderStates, ScissorRect, TransientAllocation, TransientIndexStorage,
    TransientStorage, TransientVertexStorage, View, DEFAULT_TRANSIENT_BUFFER_SIZE,
    MAX_TEXTURE_SAMPLERS,
};
pub use self::handle::{
    FrameBufferHandle, Handle, HandleGenerator, HandleKind, IndexBufferHandle, ProgramHandle,
    ShaderHandle, TextureHandle, TransientIndexBufferHandle, TransientVertexBufferHandle,
    VertexBufferHandle,
};
pub use self::types::{
    BlendEquation, BlendFunc, BufferUsage, CullFrontFace, IndexBufferType, PolygonMode,
    RenderState, RendererType, ShaderStage, TextureFormat, UniformValue,
};
pub use self::vertex_decl::{
    decode_attribute, encode_attribute, AttributeType, VertexAttribute, VertexAttributeDesc,
    VertexDecl, VertexDeclBuilder,
};
