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


//! OpenGL 3.3 core backend built on `glow`, with `glutin` managing the context.

mod context;
mod conversions;
mod device;
mod state;

pub use self::context::GlRenderContext;
pub use self::device::GlRenderDevice;
pub use self::state::{BindingCache, BindingChanges, FrameStats};
