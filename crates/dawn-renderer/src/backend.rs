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


//! Maps a requested [`RendererType`] to a concrete [`RenderContext`].

use crate::config::RendererConfig;
use dawn_core::renderer::{RenderContext, RendererType};
use dawn_infra::{GlRenderContext, NullRenderContext};

/// The backend that will actually be created for `requested`.
pub fn resolve_backend(requested: RendererType) -> RendererType {
    match requested {
        RendererType::D3D12 | RendererType::Vulkan => {
            log::warn!("{requested:?} renderer is not implemented, falling back to OpenGL.");
            RendererType::OpenGL
        }
        other => other,
    }
}

/// Creates the context for `config.backend`.
pub fn create_context(config: &RendererConfig) -> Box<dyn RenderContext> {
    match resolve_backend(config.backend) {
        RendererType::Null => {
            log::info!("Using the Null renderer.");
            Box::new(NullRenderContext::new())
        }
        _ => {
            log::info!("Using the OpenGL renderer.");
            Box::new(
                GlRenderContext::new()
                    .with_panic_on_shader_error(config.panic_on_shader_error)
                    .with_vsync(config.vsync),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unimplemented_backends_fall_back_to_opengl() {
        assert_eq!(resolve_backend(RendererType::D3D12), RendererType::OpenGL);
        assert_eq!(resolve_backend(RendererType::Vulkan), RendererType::OpenGL);
        assert_eq!(resolve_backend(RendererType::OpenGL), RendererType::OpenGL);
    }

    #[test]
    fn null_backend_is_headless() {
        let context = create_context(&RendererConfig::headless());
        assert!(context.is_headless());
    }
}
