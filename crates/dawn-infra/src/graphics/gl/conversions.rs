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


//! Conversions from engine enums to OpenGL enumerants.

use dawn_core::renderer::{
    AttributeType, BlendEquation, BlendFunc, BufferUsage, CullFrontFace, IndexBufferType,
    PolygonMode, ShaderStage, TextureFormat,
};

/// A local extension trait to convert the engine's types into GL enumerants.
/// This avoids Rust's orphan rules while keeping an idiomatic `.into_gl()` syntax.
pub trait IntoGl<T> {
    /// Consumes self and converts it into a GL-compatible value.
    fn into_gl(self) -> T;
}

/// The three values `glTexImage2D` needs to describe a pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlTextureFormat {
    /// Sized internal format.
    pub internal_format: u32,
    /// Client pixel format.
    pub format: u32,
    /// Client component type.
    pub ty: u32,
}

const fn tf(internal_format: u32, format: u32, ty: u32) -> GlTextureFormat {
    GlTextureFormat {
        internal_format,
        format,
        ty,
    }
}

/// Indexed by [`TextureFormat::index`].
pub const TEXTURE_FORMAT_TABLE: [GlTextureFormat; 18] = [
    tf(glow::R8, glow::RED, glow::UNSIGNED_BYTE),
    tf(glow::RG8, glow::RG, glow::UNSIGNED_BYTE),
    tf(glow::RGB8, glow::RGB, glow::UNSIGNED_BYTE),
    tf(glow::RGBA8, glow::RGBA, glow::UNSIGNED_BYTE),
    tf(glow::R16F, glow::RED, glow::HALF_FLOAT),
    tf(glow::RG16F, glow::RG, glow::HALF_FLOAT),
    tf(glow::RGB16F, glow::RGB, glow::HALF_FLOAT),
    tf(glow::RGBA16F, glow::RGBA, glow::HALF_FLOAT),
    tf(glow::R32F, glow::RED, glow::FLOAT),
    tf(glow::RG32F, glow::RG, glow::FLOAT),
    tf(glow::RGB32F, glow::RGB, glow::FLOAT),
    tf(glow::RGBA32F, glow::RGBA, glow::FLOAT),
    tf(glow::R11F_G11F_B10F, glow::RGB, glow::UNSIGNED_INT_10F_11F_11F_REV),
    tf(glow::RGB10_A2, glow::RGBA, glow::UNSIGNED_INT_2_10_10_10_REV),
    tf(glow::DEPTH_COMPONENT16, glow::DEPTH_COMPONENT, glow::UNSIGNED_SHORT),
    tf(glow::DEPTH_COMPONENT24, glow::DEPTH_COMPONENT, glow::UNSIGNED_INT),
    tf(glow::DEPTH24_STENCIL8, glow::DEPTH_STENCIL, glow::UNSIGNED_INT_24_8),
    tf(glow::DEPTH_COMPONENT32F, glow::DEPTH_COMPONENT, glow::FLOAT),
];

impl IntoGl<GlTextureFormat> for TextureFormat {
    fn into_gl(self) -> GlTextureFormat {
        TEXTURE_FORMAT_TABLE[self.index()]
    }
}

impl IntoGl<u32> for ShaderStage {
    fn into_gl(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        }
    }
}

impl IntoGl<u32> for BufferUsage {
    fn into_gl(self) -> u32 {
        match self {
            BufferUsage::Static => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
            BufferUsage::Stream => glow::STREAM_DRAW,
        }
    }
}

impl IntoGl<u32> for IndexBufferType {
    fn into_gl(self) -> u32 {
        match self {
            IndexBufferType::U16 => glow::UNSIGNED_SHORT,
            IndexBufferType::U32 => glow::UNSIGNED_INT,
        }
    }
}

impl IntoGl<u32> for AttributeType {
    fn into_gl(self) -> u32 {
        match self {
            AttributeType::Float => glow::FLOAT,
            AttributeType::Uint8 => glow::UNSIGNED_BYTE,
            AttributeType::Int8 => glow::BYTE,
            AttributeType::Uint16 => glow::UNSIGNED_SHORT,
            AttributeType::Int16 => glow::SHORT,
            AttributeType::Uint32 => glow::UNSIGNED_INT,
            AttributeType::Int32 => glow::INT,
        }
    }
}

impl IntoGl<u32> for CullFrontFace {
    fn into_gl(self) -> u32 {
        match self {
            CullFrontFace::Ccw => glow::CCW,
            CullFrontFace::Cw => glow::CW,
        }
    }
}

impl IntoGl<u32> for PolygonMode {
    fn into_gl(self) -> u32 {
        match self {
            PolygonMode::Fill => glow::FILL,
            PolygonMode::Wireframe => glow::LINE,
        }
    }
}

impl IntoGl<u32> for BlendEquation {
    fn into_gl(self) -> u32 {
        match self {
            BlendEquation::Add => glow::FUNC_ADD,
            BlendEquation::Subtract => glow::FUNC_SUBTRACT,
            BlendEquation::ReverseSubtract => glow::FUNC_REVERSE_SUBTRACT,
            BlendEquation::Min => glow::MIN,
            BlendEquation::Max => glow::MAX,
        }
    }
}

impl IntoGl<u32> for BlendFunc {
    fn into_gl(self) -> u32 {
        match self {
            BlendFunc::Zero => glow::ZERO,
            BlendFunc::One => glow::ONE,
            BlendFunc::SrcColor => glow::SRC_COLOR,
            BlendFunc::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
            BlendFunc::DstColor => glow::DST_COLOR,
            BlendFunc::OneMinusDstColor => glow::ONE_MINUS_DST_COLOR,
            BlendFunc::SrcAlpha => glow::SRC_ALPHA,
            BlendFunc::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
            BlendFunc::DstAlpha => glow::DST_ALPHA,
            BlendFunc::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
            BlendFunc::ConstantColor => glow::CONSTANT_COLOR,
            BlendFunc::OneMinusConstantColor => glow::ONE_MINUS_CONSTANT_COLOR,
            BlendFunc::ConstantAlpha => glow::CONSTANT_ALPHA,
            BlendFunc::OneMinusConstantAlpha => glow::ONE_MINUS_CONSTANT_ALPHA,
            BlendFunc::SrcAlphaSaturate => glow::SRC_ALPHA_SATURATE,
        }
    }
}

/// The frame buffer attachment point for a texture of `format`, where `colour_index`
/// counts the colour attachments seen so far.
pub fn attachment_point(format: TextureFormat, colour_index: u32) -> u32 {
    if format.has_stencil() {
        glow::DEPTH_STENCIL_ATTACHMENT
    } else if format.is_depth() {
        glow::DEPTH_ATTACHMENT
    } else {
        glow::COLOR_ATTACHMENT0 + colour_index
    }
}
