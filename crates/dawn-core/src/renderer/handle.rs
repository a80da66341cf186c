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


//! Typed resource handles.
//!
//! Every resource kind the renderer manages gets its own zero-sized marker type, so the
//! type system keeps a [`TextureHandle`] from being passed where a [`FrameBufferHandle`]
//! is expected. A handle is only a 16-bit number: the renderer keeps the metadata and the
//! backend keeps the actual GPU object.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A marker trait implemented by the zero-sized resource kinds.
pub trait HandleKind: 'static {
    /// A short name used when formatting handles.
    const NAME: &'static str;
}

macro_rules! handle_kinds {
    ($($(#[$meta:meta])* $kind:ident => $alias:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum $kind {}

            impl HandleKind for $kind {
                const NAME: &'static str = stringify!($kind);
            }

            #[doc = concat!("A handle to a `", stringify!($kind), "` resource.")]
            pub type $alias = Handle<$kind>;
        )*
    };
}

handle_kinds! {
    /// A persistent vertex buffer.
    VertexBuffer => VertexBufferHandle,
    /// A persistent index buffer.
    IndexBuffer => IndexBufferHandle,
    /// A single shader stage.
    Shader => ShaderHandle,
    /// A linked shader program.
    Program => ProgramHandle,
    /// A 2D texture.
    Texture => TextureHandle,
    /// A frame buffer (render target).
    FrameBuffer => FrameBufferHandle,
    /// A region of the per-frame transient vertex arena.
    TransientVertexBuffer => TransientVertexBufferHandle,
    /// A region of the per-frame transient index arena.
    TransientIndexBuffer => TransientIndexBufferHandle,
}

/// A typed 16-bit resource identifier.
pub struct Handle<K: HandleKind> {
    raw: u16,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> Handle<K> {
    /// The sentinel meaning "no resource".
    pub const INVALID: Self = Self::from_raw(u16::MAX);

    /// Wraps a raw value.
    pub const fn from_raw(raw: u16) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    /// The underlying integer.
    pub const fn raw(self) -> u16 {
        self.raw
    }

    /// Returns `false` for [`Handle::INVALID`].
    pub const fn is_valid(self) -> bool {
        self.raw != u16::MAX
    }
}

impl FrameBufferHandle {
    /// The default backbuffer. Never issued by a generator.
    pub const BACKBUFFER: Self = Self::from_raw(0);
}

// Manual impls: derives would put bounds on `K`.
impl<K: HandleKind> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K: HandleKind> Copy for Handle<K> {}

impl<K: HandleKind> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K: HandleKind> Eq for Handle<K> {}

impl<K: HandleKind> PartialOrd for Handle<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: HandleKind> Ord for Handle<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<K: HandleKind> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K: HandleKind> Default for Handle<K> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}({})", K::NAME, self.raw)
        } else {
            write!(f, "{}(invalid)", K::NAME)
        }
    }
}

/// Issues strictly increasing handles of a single kind, starting at 1.
#[derive(Debug)]
pub struct HandleGenerator<K: HandleKind> {
    next: u16,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind> HandleGenerator<K> {
    /// Creates a generator whose first handle is 1.
    pub const fn new() -> Self {
        Self {
            next: 1,
            _kind: PhantomData,
        }
    }

    /// Returns the next handle.
    ///
    /// ## Panics
    /// Panics once the 16-bit space is exhausted instead of handing out the sentinel.
    pub fn next(&mut self) -> Handle<K> {
        match self.try_next() {
            Some(handle) => handle,
            None => panic!("{} handle space exhausted", K::NAME),
        }
    }

    /// Returns the next handle, or `None` once the 16-bit space is exhausted.
    pub fn try_next(&mut self) -> Option<Handle<K>> {
        if self.next == u16::MAX {
            return None;
        }
        let handle = Handle::from_raw(self.next);
        self.next += 1;
        Some(handle)
    }

    /// Restarts the sequence at 1. Only used for per-frame transient handles.
    pub fn reset(&mut self) {
        self.next = 1;
    }
}

impl<K: HandleKind> Default for HandleGenerator<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_starts_at_one_and_increases() {
        let mut generator = HandleGenerator::<Texture>::new();
        let mut previous = generator.next();
        assert_eq!(previous.raw(), 1);
        for _ in 0..10_000 {
            let handle = generator.next();
            assert!(handle > previous);
            assert!(handle.is_valid());
            assert_ne!(handle, TextureHandle::INVALID);
            previous = handle;
        }
    }

    #[test]
    fn generator_never_issues_backbuffer() {
        let mut generator = HandleGenerator::<FrameBuffer>::new();
        assert_ne!(generator.next(), FrameBufferHandle::BACKBUFFER);
    }

    #[test]
    fn reset_restarts_sequence() {
        let mut generator = HandleGenerator::<TransientVertexBuffer>::new();
        generator.next();
        generator.next();
        generator.reset();
        assert_eq!(generator.next().raw(), 1);
    }

    #[test]
    fn default_handle_is_invalid() {
        assert!(!ProgramHandle::default().is_valid());
        assert_eq!(format!("{:?}", ShaderHandle::INVALID), "Shader(invalid)");
        assert_eq!(format!("{:?}", ShaderHandle::from_raw(3)), "Shader(3)");
    }

    #[test]
    fn try_next_reports_exhaustion() {
        let mut generator = HandleGenerator::<TransientIndexBuffer> {
            next: u16::MAX - 1,
            _kind: PhantomData,
        };
        assert_eq!(generator.try_next().map(Handle::raw), Some(u16::MAX - 1));
        assert_eq!(generator.try_next(), None);
        assert_eq!(generator.try_next(), None);
    }

    #[test]
    #[should_panic(expected = "handle space exhausted")]
    fn exhausted_generator_panics() {
        let mut generator = HandleGenerator::<Shader> {
            next: u16::MAX - 1,
            _kind: PhantomData,
        };
        generator.next();
        generator.next();
    }
}
