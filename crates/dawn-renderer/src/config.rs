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


//! Renderer configuration.

use dawn_core::renderer::{RendererType, DEFAULT_TRANSIENT_BUFFER_SIZE};
use serde::{Deserialize, Serialize};

/// Configuration for [`crate::Renderer::init`].
///
/// Every field has a default, so a partial JSON document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Backend to create. D3D12 and Vulkan fall back to OpenGL.
    pub backend: RendererType,
    /// Render on a dedicated thread. Ignored by headless backends.
    pub use_render_thread: bool,
    /// Initial window width in logical pixels.
    pub width: u16,
    /// Initial window height in logical pixels.
    pub height: u16,
    /// Window title.
    pub title: String,
    /// Capacity of each frame's transient vertex arena, in bytes.
    pub transient_vb_size: usize,
    /// Capacity of each frame's transient index arena, in bytes.
    pub transient_ib_size: usize,
    /// Panic on shader compile or link errors instead of logging them.
    pub panic_on_shader_error: bool,
    /// Synchronise presentation with the display refresh.
    pub vsync: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            backend: RendererType::OpenGL,
            use_render_thread: true,
            width: 1280,
            height: 720,
            title: "Dawn".to_string(),
            transient_vb_size: DEFAULT_TRANSIENT_BUFFER_SIZE,
            transient_ib_size: DEFAULT_TRANSIENT_BUFFER_SIZE,
            panic_on_shader_error: false,
            vsync: true,
        }
    }
}

impl RendererConfig {
    /// A config for the headless backend, rendering on the caller's thread.
    pub fn headless() -> Self {
        Self {
            backend: RendererType::Null,
            use_render_thread: false,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: RendererConfig =
            serde_json::from_str(r#"{ "backend": "Null", "width": 640 }"#).unwrap();
        assert_eq!(config.backend, RendererType::Null);
        assert_eq!(config.width, 640);
        assert_eq!(config.height, 720);
        assert_eq!(config.transient_vb_size, 1 << 20);
        assert!(config.use_render_thread);
    }

    #[test]
    fn headless_config_disables_render_thread() {
        let config = RendererConfig::headless();
        assert_eq!(config.backend, RendererType::Null);
        assert!(!config.use_render_thread);
    }
}
