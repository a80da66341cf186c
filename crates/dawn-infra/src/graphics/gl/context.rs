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


//! Window and OpenGL context creation on the main thread.

use super::device::GlRenderDevice;
use crate::platform::window::{pump_events, WinitWindow, WinitWindowBuilder};
use dawn_core::renderer::{RenderContext, RenderDevice, RenderError};
use glutin::config::{Config, ConfigTemplateBuilder};
use glutin::context::{ContextApi, ContextAttributesBuilder, GlProfile, Version};
use glutin::display::GetGlDisplay;
use glow::HasContext as _;
use glutin::prelude::*;
use glutin::surface::{SurfaceAttributesBuilder, SwapInterval, WindowSurface};
use glutin_winit::{DisplayBuilder, GlWindow};
use raw_window_handle::HasWindowHandle;
use std::num::NonZeroU32;
use winit::event_loop::EventLoop;

/// Owns the `winit` event loop and the window. Must stay on the thread that created it.
pub struct GlRenderContext {
    event_loop: Option<EventLoop<()>>,
    window: Option<WinitWindow>,
    panic_on_shader_error: bool,
    vsync: bool,
}

impl GlRenderContext {
    /// Creates a context. No window exists until [`RenderContext::create_window`].
    pub fn new() -> Self {
        Self {
            event_loop: None,
            window: None,
            panic_on_shader_error: false,
            vsync: true,
        }
    }

    /// Panic on shader compile or link errors instead of logging them.
    pub fn with_panic_on_shader_error(mut self, panic: bool) -> Self {
        self.panic_on_shader_error = panic;
        self
    }

    /// Synchronise presentation with the display refresh.
    pub fn with_vsync(mut self, vsync: bool) -> Self {
        self.vsync = vsync;
        self
    }

    fn event_loop(&mut self) -> Result<&mut EventLoop<()>, RenderError> {
        // winit allows a single event loop per process, so it outlives destroyed windows.
        if self.event_loop.is_none() {
            let event_loop =
                EventLoop::new().map_err(|e| RenderError::WindowCreationFailed(e.to_string()))?;
            self.event_loop = Some(event_loop);
        }
        self.event_loop
            .as_mut()
            .ok_or_else(|| RenderError::WindowCreationFailed("no event loop".to_string()))
    }
}

impl Default for GlRenderContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Prefers the config with the most samples.
fn pick_config(configs: Box<dyn Iterator<Item = Config> + '_>) -> Config {
    configs
        .reduce(|best, config| {
            if config.num_samples() > best.num_samples() {
                config
            } else {
                best
            }
        })
        // glutin reports an error instead of calling the picker when nothing matches.
        .expect("glutin offered no framebuffer config")
}

fn window_error(e: impl std::fmt::Display) -> RenderError {
    RenderError::WindowCreationFailed(e.to_string())
}

impl RenderContext for GlRenderContext {
    fn create_window(
        &mut self,
        width: u16,
        height: u16,
        title: &str,
    ) -> Result<Box<dyn RenderDevice>, RenderError> {
        if self.window.is_some() {
            return Err(RenderError::AlreadyInitialized);
        }
        let vsync = self.vsync;
        let panic_on_shader_error = self.panic_on_shader_error;

        let builder = WinitWindowBuilder::new()
            .with_title(title)
            .with_dimensions(width as u32, height as u32);
        let template = ConfigTemplateBuilder::new()
            .with_alpha_size(8)
            .with_depth_size(24)
            .with_stencil_size(8);
        let event_loop = self.event_loop()?;
        let (window, config) = DisplayBuilder::new()
            .with_window_attributes(Some(builder.attributes()))
            .build(&*event_loop, template, pick_config)
            .map_err(window_error)?;
        let window = window
            .map(WinitWindow::from_window)
            .ok_or_else(|| window_error("the display builder returned no window"))?;

        let raw_handle = window.window_handle().map_err(window_error)?.as_raw();
        let context_attributes = ContextAttributesBuilder::new()
            .with_context_api(ContextApi::OpenGl(Some(Version::new(3, 3))))
            .with_profile(GlProfile::Core)
            .build(Some(raw_handle));
        let display = config.display();
        let not_current = unsafe { display.create_context(&config, &context_attributes) }
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;

        let surface_attributes = window
            .window()
            .build_surface_attributes(SurfaceAttributesBuilder::<WindowSurface>::new())
            .map_err(window_error)?;
        let surface = unsafe { display.create_window_surface(&config, &surface_attributes) }
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;

        let current = not_current
            .make_current(&surface)
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;
        if vsync {
            if let Err(e) =
                surface.set_swap_interval(&current, SwapInterval::Wait(NonZeroU32::MIN))
            {
                log::warn!("Failed to enable vsync: {e}");
            }
        }
        let gl = unsafe {
            glow::Context::from_loader_function_cstr(|symbol| display.get_proc_address(symbol))
        };
        log::info!(
            "OpenGL context created: {:?}, samples: {}",
            gl.version(),
            config.num_samples()
        );
        // The render loop attaches the context to whichever thread renders.
        let detached = current
            .make_not_current()
            .map_err(|e| RenderError::InitializationFailed(e.to_string()))?;

        self.window = Some(window.clone());
        Ok(Box::new(GlRenderDevice::new(
            gl,
            detached,
            surface,
            window,
            panic_on_shader_error,
        )))
    }

    fn destroy_window(&mut self) {
        if self.window.take().is_some() {
            log::info!("Window destroyed.");
        }
    }

    fn process_events(&mut self) {
        if let Some(event_loop) = self.event_loop.as_mut() {
            if !pump_events(event_loop, self.window.as_ref()) {
                log::debug!("Event loop is no longer running.");
            }
        }
    }

    fn is_window_closed(&self) -> bool {
        self.window.as_ref().is_some_and(|w| w.state().is_closed())
    }

    fn window_size(&self) -> (u32, u32) {
        self.window
            .as_ref()
            .map(|w| w.state().logical_size())
            .unwrap_or((0, 0))
    }

    fn window_scale(&self) -> (f32, f32) {
        let scale = self
            .window
            .as_ref()
            .map(|w| w.state().scale_factor())
            .unwrap_or(1.0);
        (scale, scale)
    }

    fn backbuffer_size(&self) -> (u32, u32) {
        self.window
            .as_ref()
            .map(|w| w.state().physical_size())
            .unwrap_or((0, 0))
    }
}
