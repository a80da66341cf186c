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


//! Backend-agnostic enums forming the stable surface of the RHI.

use serde::{Deserialize, Serialize};

/// The graphics API a renderer is backed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RendererType {
    /// Headless backend that accepts every command and draws nothing.
    Null,
    /// OpenGL 3.3 core.
    #[default]
    OpenGL,
    /// Direct3D 12. Not implemented, falls back to OpenGL.
    D3D12,
    /// Vulkan. Not implemented, falls back to OpenGL.
    Vulkan,
}

/// Pixel formats for textures and frame buffer attachments.
///
/// The suffix gives the bit depth of each channel, `F` marks floating point channels
/// and the `D` formats are depth (and stencil) formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TextureFormat {
    R8,
    Rg8,
    Rgb8,
    Rgba8,
    R16F,
    Rg16F,
    Rgb16F,
    Rgba16F,
    R32F,
    Rg32F,
    Rgb32F,
    Rgba32F,
    Rg11B10F,
    Rgb10A2,
    D16,
    D24,
    D24S8,
    D32F,
}

impl TextureFormat {
    /// Every format, in declaration order. Backends index lookup tables with
    /// [`TextureFormat::index`].
    pub const ALL: [TextureFormat; 18] = [
        TextureFormat::R8,
        TextureFormat::Rg8,
        TextureFormat::Rgb8,
        TextureFormat::Rgba8,
        TextureFormat::R16F,
        TextureFormat::Rg16F,
        TextureFormat::Rgb16F,
        TextureFormat::Rgba16F,
        TextureFormat::R32F,
        TextureFormat::Rg32F,
        TextureFormat::Rgb32F,
        TextureFormat::Rgba32F,
        TextureFormat::Rg11B10F,
        TextureFormat::Rgb10A2,
        TextureFormat::D16,
        TextureFormat::D24,
        TextureFormat::D24S8,
        TextureFormat::D32F,
    ];

    /// Position of this format in [`TextureFormat::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for depth and depth-stencil formats.
    pub const fn is_depth(self) -> bool {
        matches!(
            self,
            TextureFormat::D16 | TextureFormat::D24 | TextureFormat::D24S8 | TextureFormat::D32F
        )
    }

    /// Returns `true` if the format carries a stencil channel.
    pub const fn has_stencil(self) -> bool {
        matches!(self, TextureFormat::D24S8)
    }

    /// Size of one texel as uploaded from client memory.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::R8 => 1,
            TextureFormat::Rg8 | TextureFormat::R16F | TextureFormat::D16 => 2,
            TextureFormat::Rgb8 => 3,
            TextureFormat::Rgba8
            | TextureFormat::Rg16F
            | TextureFormat::R32F
            | TextureFormat::Rg11B10F
            | TextureFormat::Rgb10A2
            | TextureFormat::D24
            | TextureFormat::D24S8
            | TextureFormat::D32F => 4,
            TextureFormat::Rgb16F => 6,
            TextureFormat::Rgba16F | TextureFormat::Rg32F => 8,
            TextureFormat::Rgb32F => 12,
            TextureFormat::Rgba32F => 16,
        }
    }
}

/// A programmable pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader.
    Vertex,
    /// Geometry shader.
    Geometry,
    /// Fragment shader.
    Fragment,
}

/// The integer width of the indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexBufferType {
    /// 16-bit unsigned indices.
    U16,
    /// 32-bit unsigned indices.
    U32,
}

impl IndexBufferType {
    /// Size of a single index in bytes.
    pub const fn size(self) -> usize {
        match self {
            IndexBufferType::U16 => 2,
            IndexBufferType::U32 => 4,
        }
    }
}

/// How often the contents of a buffer are expected to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Written once, drawn many times.
    Static,
    /// Rewritten occasionally.
    Dynamic,
    /// Rewritten every frame.
    Stream,
}

/// Toggleable pipeline states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderState {
    /// Back face culling.
    CullFace,
    /// Depth testing.
    Depth,
    /// Colour blending.
    Blending,
}

/// Winding order considered front facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFrontFace {
    /// Counter-clockwise.
    #[default]
    Ccw,
    /// Clockwise.
    Cw,
}

/// Rasterisation mode for polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PolygonMode {
    /// Filled triangles.
    #[default]
    Fill,
    /// Triangle edges only.
    Wireframe,
}

/// Blend factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BlendFunc {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    ConstantAlpha,
    OneMinusConstantAlpha,
    SrcAlphaSaturate,
}

/// How source and destination terms are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendEquation {
    /// `src + dst`
    #[default]
    Add,
    /// `src - dst`
    Subtract,
    /// `dst - src`
    ReverseSubtract,
    /// `min(src, dst)`
    Min,
    /// `max(src, dst)`
    Max,
}

/// A value bound to a named shader uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major 3x3 matrix.
    Mat3([f32; 9]),
    /// Column-major 4x4 matrix.
    Mat4([f32; 16]),
}

impl From<i32> for UniformValue {
    fn from(value: i32) -> Self {
        UniformValue::Int(value)
    }
}

impl From<f32> for UniformValue {
    fn from(value: f32) -> Self {
        UniformValue::Float(value)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(value: [f32; 2]) -> Self {
        UniformValue::Vec2(value)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(value: [f32; 3]) -> Self {
        UniformValue::Vec3(value)
    }
}

impl From<[f32; 4]> for UniformValue {
    fn from(value: [f32; 4]) -> Self {
        UniformValue::Vec4(value)
    }
}

impl From<[f32; 9]> for UniformValue {
    fn from(value: [f32; 9]) -> Self {
        UniformValue::Mat3(value)
    }
}

impl From<[f32; 16]> for UniformValue {
    fn from(value: [f32; 16]) -> Self {
        UniformValue::Mat4(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texture_format_index_matches_table() {
        for (i, format) in TextureFormat::ALL.iter().enumerate() {
            assert_eq!(format.index(), i);
        }
    }

    #[test]
    fn depth_formats() {
        assert!(TextureFormat::D24S8.is_depth());
        assert!(TextureFormat::D24S8.has_stencil());
        assert!(!TextureFormat::Rg11B10F.is_depth());
    }

    #[test]
    fn texel_sizes() {
        assert_eq!(TextureFormat::Rgb8.bytes_per_pixel(), 3);
        assert_eq!(TextureFormat::Rgba16F.bytes_per_pixel(), 8);
        assert_eq!(TextureFormat::D24S8.bytes_per_pixel(), 4);
    }

    #[test]
    fn index_sizes() {
        assert_eq!(IndexBufferType::U16.size(), 2);
        assert_eq!(IndexBufferType::U32.size(), 4);
    }

    #[test]
    fn renderer_type_round_trips_through_json() {
        let json = serde_json::to_string(&RendererType::Null).unwrap();
        assert_eq!(json, "\"Null\"");
        let back: RendererType = serde_json::from_str("\"Vulkan\"").unwrap();
        assert_eq!(back, RendererType::Vulkan);
    }
}
