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


//! Frame submission for the Dawn engine.
//!
//! [`Renderer`] owns two frames. Callers fill one through the renderer's API while the
//! other is drawn, either inline by [`Renderer::frame`] or on a dedicated render thread.

#![warn(missing_docs)]

pub mod backend;
pub mod config;
mod render_thread;
pub mod renderer;
pub mod resources;

pub use config::RendererConfig;
pub use renderer::{Renderer, RendererState, ThreadingMode};
pub use resources::{FrameBufferInfo, TextureInfo};

pub use dawn_core::event::{EngineEvent, EventBus, EventSink, ExitReason};
pub use dawn_core::renderer::*;
