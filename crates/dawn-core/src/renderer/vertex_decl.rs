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


//! Compact vertex layout descriptions.
//!
//! Each attribute is packed into a single 16-bit word:
//!
//! ```text
//!  15        9 8    6 5       1   0
//! [ attribute ][count][  type  ][norm]
//! ```
//!
//! A [`VertexDecl`] stores the packed words next to their byte offsets, which keeps it
//! small enough to be copied into every command and transient allocation that needs it.

use std::fmt;

/// The semantic of a vertex attribute. Backends use the discriminant as the shader
/// attribute location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum VertexAttribute {
    Position = 0,
    Normal = 1,
    Colour = 2,
    TexCoord0 = 3,
    TexCoord1 = 4,
    TexCoord2 = 5,
    TexCoord3 = 6,
    Tangent = 7,
    Bitangent = 8,
}

impl VertexAttribute {
    /// Every attribute in location order.
    pub const ALL: [VertexAttribute; 9] = [
        VertexAttribute::Position,
        VertexAttribute::Normal,
        VertexAttribute::Colour,
        VertexAttribute::TexCoord0,
        VertexAttribute::TexCoord1,
        VertexAttribute::TexCoord2,
        VertexAttribute::TexCoord3,
        VertexAttribute::Tangent,
        VertexAttribute::Bitangent,
    ];

    /// The shader attribute location.
    pub const fn location(self) -> u32 {
        self as u32
    }

    fn from_bits(bits: u16) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }
}

/// The scalar type of each component of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum AttributeType {
    Float = 0,
    Uint8 = 1,
    Int8 = 2,
    Uint16 = 3,
    Int16 = 4,
    Uint32 = 5,
    Int32 = 6,
}

impl AttributeType {
    /// Every type in encoding order.
    pub const ALL: [AttributeType; 7] = [
        AttributeType::Float,
        AttributeType::Uint8,
        AttributeType::Int8,
        AttributeType::Uint16,
        AttributeType::Int16,
        AttributeType::Uint32,
        AttributeType::Int32,
    ];

    /// Size of one component in bytes.
    pub const fn size(self) -> u16 {
        match self {
            AttributeType::Uint8 | AttributeType::Int8 => 1,
            AttributeType::Uint16 | AttributeType::Int16 => 2,
            AttributeType::Float | AttributeType::Uint32 | AttributeType::Int32 => 4,
        }
    }

    fn from_bits(bits: u16) -> Option<Self> {
        Self::ALL.get(bits as usize).copied()
    }
}

/// Largest component count that fits the 3-bit count field.
pub const MAX_ATTRIBUTE_COUNT: u8 = 7;

const ATTRIBUTE_SHIFT: u16 = 9;
const COUNT_SHIFT: u16 = 6;
const TYPE_SHIFT: u16 = 1;
const COUNT_MASK: u16 = 0b111;
const TYPE_MASK: u16 = 0b1_1111;

/// Packs an attribute description into its 16-bit form.
pub fn encode_attribute(
    attribute: VertexAttribute,
    count: u8,
    ty: AttributeType,
    normalised: bool,
) -> u16 {
    debug_assert!(
        (1..=MAX_ATTRIBUTE_COUNT).contains(&count),
        "attribute count {count} out of range"
    );
    ((attribute as u16) << ATTRIBUTE_SHIFT)
        | ((count as u16 & COUNT_MASK) << COUNT_SHIFT)
        | ((ty as u16 & TYPE_MASK) << TYPE_SHIFT)
        | normalised as u16
}

/// Unpacks a word produced by [`encode_attribute`]. Returns `None` for words that no
/// valid description encodes to.
pub fn decode_attribute(word: u16) -> Option<(VertexAttribute, u8, AttributeType, bool)> {
    let attribute = VertexAttribute::from_bits(word >> ATTRIBUTE_SHIFT)?;
    let count = ((word >> COUNT_SHIFT) & COUNT_MASK) as u8;
    if count == 0 {
        return None;
    }
    let ty = AttributeType::from_bits((word >> TYPE_SHIFT) & TYPE_MASK)?;
    Some((attribute, count, ty, word & 1 == 1))
}

/// A decoded attribute together with its position inside a vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeDesc {
    /// What the attribute means.
    pub attribute: VertexAttribute,
    /// Number of components, `1..=7`.
    pub count: u8,
    /// Component type.
    pub ty: AttributeType,
    /// Whether integer components are normalised to `[0, 1]` / `[-1, 1]`.
    pub normalised: bool,
    /// Byte offset from the start of the vertex.
    pub offset: u16,
}

impl VertexAttributeDesc {
    /// Size of the attribute in bytes.
    pub fn size(&self) -> u16 {
        self.count as u16 * self.ty.size()
    }
}

/// An immutable vertex layout.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct VertexDecl {
    attributes: Vec<(u16, u16)>,
    stride: u16,
}

impl VertexDecl {
    /// Starts building a declaration.
    pub fn begin() -> VertexDeclBuilder {
        VertexDeclBuilder {
            decl: VertexDecl::default(),
        }
    }

    /// Size of one vertex in bytes.
    pub fn stride(&self) -> u16 {
        self.stride
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Returns `true` if the declaration has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// The packed attribute words with their offsets, in declaration order.
    pub fn encoded(&self) -> &[(u16, u16)] {
        &self.attributes
    }

    /// Iterates over the decoded attributes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = VertexAttributeDesc> + '_ {
        self.attributes.iter().filter_map(|&(word, offset)| {
            decode_attribute(word).map(|(attribute, count, ty, normalised)| VertexAttributeDesc {
                attribute,
                count,
                ty,
                normalised,
                offset,
            })
        })
    }
}

impl fmt::Debug for VertexDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VertexDecl")
            .field("attributes", &self.iter().collect::<Vec<_>>())
            .field("stride", &self.stride)
            .finish()
    }
}

/// Fluent builder returned by [`VertexDecl::begin`].
#[derive(Debug)]
pub struct VertexDeclBuilder {
    decl: VertexDecl,
}

impl VertexDeclBuilder {
    /// Appends an attribute.
    pub fn add(self, attribute: VertexAttribute, count: u8, ty: AttributeType) -> Self {
        self.push(attribute, count, ty, false)
    }

    /// Appends an attribute whose integer components are normalised.
    pub fn add_normalised(self, attribute: VertexAttribute, count: u8, ty: AttributeType) -> Self {
        self.push(attribute, count, ty, true)
    }

    fn push(mut self, attribute: VertexAttribute, count: u8, ty: AttributeType, norm: bool) -> Self {
        let offset = self.decl.stride;
        self.decl
            .attributes
            .push((encode_attribute(attribute, count, ty, norm), offset));
        self.decl.stride += count as u16 * ty.size();
        self
    }

    /// Finishes the declaration.
    pub fn end(self) -> VertexDecl {
        self.decl
    }
}
