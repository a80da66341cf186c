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


//! Defines the error types of the rendering subsystem.
//!
//! Only startup can fail with an error value. Everything that goes wrong while frames
//! are flowing is logged (shader errors), signalled through a sentinel handle (arena
//! exhaustion), or turned into an exit event (device loss, closed window).

use crate::renderer::handle::{ProgramHandle, ShaderHandle};
use std::fmt;

/// An error reported by the backend while building a shader or program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    /// A shader stage failed to compile.
    CompilationError {
        /// The shader that failed.
        shader: ShaderHandle,
        /// The driver's info log.
        details: String,
    },
    /// A program failed to link.
    LinkError {
        /// The program that failed.
        program: ProgramHandle,
        /// The driver's info log.
        details: String,
    },
    /// The backend could not allocate the shader or program object.
    ObjectCreationFailed(String),
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::CompilationError { shader, details } => {
                write!(f, "Shader compilation failed for {shader:?}: {details}")
            }
            ShaderError::LinkError { program, details } => {
                write!(f, "Program link failed for {program:?}: {details}")
            }
            ShaderError::ObjectCreationFailed(msg) => {
                write!(f, "Failed to create shader object: {msg}")
            }
        }
    }
}

impl std::error::Error for ShaderError {}

/// A fatal error raised while bringing the renderer up.
#[derive(Debug)]
pub enum RenderError {
    /// `init` was called on a renderer that is already running.
    AlreadyInitialized,
    /// An operation needed a running renderer.
    NotInitialized,
    /// The OS window or its graphics context could not be created.
    WindowCreationFailed(String),
    /// A failure occurred during the initialization of the graphics backend.
    InitializationFailed(String),
    /// A shader error escalated by the configured policy.
    Shader(ShaderError),
    /// The render thread could not be spawned.
    ThreadSpawnFailed(std::io::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::AlreadyInitialized => {
                write!(f, "The renderer is already initialized.")
            }
            RenderError::NotInitialized => write!(f, "The renderer is not initialized."),
            RenderError::WindowCreationFailed(msg) => {
                write!(f, "Failed to create window: {msg}")
            }
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize graphics backend: {msg}")
            }
            RenderError::Shader(err) => write!(f, "Shader error: {err}"),
            RenderError::ThreadSpawnFailed(err) => {
                write!(f, "Failed to spawn render thread: {err}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Shader(err) => Some(err),
            RenderError::ThreadSpawnFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShaderError> for RenderError {
    fn from(err: ShaderError) -> Self {
        RenderError::Shader(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn shader_error_display() {
        let err = ShaderError::CompilationError {
            shader: ShaderHandle::from_raw(4),
            details: "0:12: syntax error".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Shader compilation failed for Shader(4): 0:12: syntax error"
        );

        let err = ShaderError::LinkError {
            program: ProgramHandle::from_raw(2),
            details: "missing main".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Program link failed for Program(2): missing main"
        );
    }

    #[test]
    fn render_error_wraps_shader_error() {
        let shader_err = ShaderError::ObjectCreationFailed("out of memory".to_string());
        let render_err: RenderError = shader_err.into();
        assert_eq!(
            format!("{render_err}"),
            "Shader error: Failed to create shader object: out of memory"
        );
        assert!(render_err.source().is_some());
    }

    #[test]
    fn window_error_has_no_source() {
        let err = RenderError::WindowCreationFailed("no display".to_string());
        assert_eq!(format!("{err}"), "Failed to create window: no display");
        assert!(err.source().is_none());
    }
}
