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


//! A headless backend. Every call succeeds and nothing is drawn.

use dawn_core::renderer::{Frame, RenderCommand, RenderContext, RenderDevice, RenderError};

/// A context without a display. The window never closes.
#[derive(Debug, Default)]
pub struct NullRenderContext {
    size: Option<(u32, u32)>,
}

impl NullRenderContext {
    /// Creates a headless context.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderContext for NullRenderContext {
    fn create_window(
        &mut self,
        width: u16,
        height: u16,
        title: &str,
    ) -> Result<Box<dyn RenderDevice>, RenderError> {
        log::info!("Null backend: pretending to open '{title}' ({width}x{height}).");
        self.size = Some((width as u32, height as u32));
        Ok(Box::new(NullRenderDevice::default()))
    }

    fn destroy_window(&mut self) {
        self.size = None;
    }

    fn process_events(&mut self) {}

    fn is_window_closed(&self) -> bool {
        false
    }

    fn window_size(&self) -> (u32, u32) {
        self.size.unwrap_or((0, 0))
    }

    fn window_scale(&self) -> (f32, f32) {
        (1.0, 1.0)
    }

    fn backbuffer_size(&self) -> (u32, u32) {
        self.window_size()
    }

    fn is_headless(&self) -> bool {
        true
    }
}

/// The device half of [`NullRenderContext`]. Counts what it is given.
#[derive(Debug, Default)]
pub struct NullRenderDevice {
    commands: u64,
    frames: u64,
}

impl NullRenderDevice {
    /// Commands received so far.
    pub fn command_count(&self) -> u64 {
        self.commands
    }

    /// Frames received so far.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

impl RenderDevice for NullRenderDevice {
    fn start_rendering(&mut self) {}

    fn stop_rendering(&mut self) {}

    fn process_command_list(&mut self, commands: &[RenderCommand]) {
        self.commands += commands.len() as u64;
    }

    fn frame(&mut self, _frame: &Frame) -> bool {
        self.frames += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dawn_core::renderer::VertexBufferHandle;

    #[test]
    fn null_context_is_headless_and_never_closes() {
        let mut context = NullRenderContext::new();
        assert!(context.is_headless());
        let _device = context.create_window(320, 240, "test").unwrap();
        context.process_events();
        assert!(!context.is_window_closed());
        assert_eq!(context.window_size(), (320, 240));
        assert_eq!(context.backbuffer_size(), (320, 240));
        context.destroy_window();
        assert_eq!(context.window_size(), (0, 0));
    }

    #[test]
    fn null_device_accepts_everything() {
        let mut device = NullRenderDevice::default();
        device.start_rendering();
        device.process_command_list(&[RenderCommand::DeleteVertexBuffer {
            handle: VertexBufferHandle::from_raw(1),
        }]);
        assert!(device.frame(&Frame::new(16, 16)));
        device.stop_rendering();
        assert_eq!(device.command_count(), 1);
        assert_eq!(device.frame_count(), 1);
    }
}
