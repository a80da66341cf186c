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


//! A `winit`-based window with an event pump and a thread-safe state snapshot.

use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window, WindowAttributes, WindowId},
};

/// Window properties shared between the main thread, which pumps events, and the render
/// thread, which resizes the backbuffer.
#[derive(Debug)]
pub struct WindowState {
    width: AtomicU32,
    height: AtomicU32,
    scale_bits: AtomicU32,
    closed: AtomicBool,
}

impl WindowState {
    /// Creates a state for a window with the given physical size and scale factor.
    pub fn new(width: u32, height: u32, scale: f32) -> Self {
        Self {
            width: AtomicU32::new(width),
            height: AtomicU32::new(height),
            scale_bits: AtomicU32::new(scale.to_bits()),
            closed: AtomicBool::new(false),
        }
    }

    /// Physical size of the client area.
    pub fn physical_size(&self) -> (u32, u32) {
        (
            self.width.load(Ordering::Acquire),
            self.height.load(Ordering::Acquire),
        )
    }

    /// Logical size of the client area.
    pub fn logical_size(&self) -> (u32, u32) {
        let (width, height) = self.physical_size();
        let scale = self.scale_factor();
        (
            (width as f32 / scale).round() as u32,
            (height as f32 / scale).round() as u32,
        )
    }

    /// Physical pixels per logical pixel.
    pub fn scale_factor(&self) -> f32 {
        f32::from_bits(self.scale_bits.load(Ordering::Acquire))
    }

    /// Returns `true` once a close was requested.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Applies a window event to the snapshot.
    pub fn apply(&self, event: &WindowEvent) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                log::info!("Window close requested.");
                self.closed.store(true, Ordering::Release);
            }
            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}.", size.width, size.height);
                self.width.store(size.width, Ordering::Release);
                self.height.store(size.height, Ordering::Release);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_bits
                    .store((*scale_factor as f32).to_bits(), Ordering::Release);
            }
            _ => {}
        }
    }
}

/// A wrapper around a `winit::window::Window` and its shared [`WindowState`].
#[derive(Debug, Clone)]
pub struct WinitWindow {
    inner: Arc<Window>,
    state: Arc<WindowState>,
}

impl WinitWindow {
    /// Wraps an already created window.
    pub fn from_window(window: Window) -> Self {
        let size = window.inner_size();
        let state = WindowState::new(size.width, size.height, window.scale_factor() as f32);
        log::info!("Winit window created successfully (id: {:?}).", window.id());
        Self {
            inner: Arc::new(window),
            state: Arc::new(state),
        }
    }

    /// The underlying `winit` window.
    pub fn window(&self) -> &Window {
        &self.inner
    }

    /// A handle to the shared state snapshot.
    pub fn state(&self) -> Arc<WindowState> {
        self.state.clone()
    }
}

/// A builder for the attributes of a [`WinitWindow`].
pub struct WinitWindowBuilder {
    title: String,
    width: u32,
    height: u32,
}

impl WinitWindowBuilder {
    /// Creates a new `WinitWindowBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            title: "Dawn".to_string(),
            width: 1280,
            height: 720,
        }
    }

    /// Sets the title of the window to be built.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the initial inner dimensions of the window to be built.
    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// The `winit` attributes for the window. Used by context creators that need to pick
    /// a pixel format before the window exists.
    pub fn attributes(&self) -> WindowAttributes {
        log::info!(
            "Building window with title: '{}' and size: {}x{}",
            self.title,
            self.width,
            self.height
        );
        Window::default_attributes()
            .with_title(self.title.clone())
            .with_inner_size(LogicalSize::new(self.width, self.height))
            .with_visible(true)
    }
}

impl Default for WinitWindowBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HasWindowHandle for WinitWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.inner.window_handle()
    }
}

impl HasDisplayHandle for WinitWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.inner.display_handle()
    }
}

/// Routes events from a pumped `winit` loop into a window's [`WindowState`].
struct EventPump<'a> {
    window: Option<&'a WinitWindow>,
}

impl ApplicationHandler for EventPump<'_> {
    fn resumed(&mut self, _event_loop: &ActiveEventLoop) {}

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        if let Some(window) = self.window {
            if window.inner.id() == id {
                window.state.apply(&event);
            }
        }
    }
}

/// Processes every pending event without blocking. Returns `false` once the loop has
/// exited.
pub fn pump_events(event_loop: &mut EventLoop<()>, window: Option<&WinitWindow>) -> bool {
    let mut pump = EventPump { window };
    match event_loop.pump_app_events(Some(Duration::ZERO), &mut pump) {
        PumpStatus::Continue => true,
        PumpStatus::Exit(code) => {
            log::info!("Event loop exited with code {code}.");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalSize;

    #[test]
    fn resize_and_close_update_the_snapshot() {
        let state = WindowState::new(800, 600, 1.0);
        state.apply(&WindowEvent::Resized(PhysicalSize::new(1024, 768)));
        assert_eq!(state.physical_size(), (1024, 768));
        assert!(!state.is_closed());
        state.apply(&WindowEvent::CloseRequested);
        assert!(state.is_closed());
    }

    #[test]
    fn logical_size_divides_by_scale() {
        let state = WindowState::new(2560, 1440, 2.0);
        assert_eq!(state.logical_size(), (1280, 720));
        assert_eq!(state.scale_factor(), 2.0);
    }
}
