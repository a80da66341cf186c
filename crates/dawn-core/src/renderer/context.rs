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


//! The backend contract.
//!
//! A backend comes in two halves. The [`RenderContext`] owns the OS window and its event
//! pump and stays on the thread that created it. Creating the window yields a
//! [`RenderDevice`], which owns the graphics context and is moved to whichever thread
//! issues draw calls: the caller's thread in single-threaded mode, or the dedicated
//! render thread.

use crate::renderer::command::RenderCommand;
use crate::renderer::error::RenderError;
use crate::renderer::frame::Frame;

/// The window side of a backend. Only ever used from the main thread.
pub trait RenderContext {
    /// Opens the window and creates the graphics context for it.
    ///
    /// ## Errors
    /// * `RenderError::WindowCreationFailed` - If the window or context cannot be created.
    fn create_window(
        &mut self,
        width: u16,
        height: u16,
        title: &str,
    ) -> Result<Box<dyn RenderDevice>, RenderError>;

    /// Closes the window. The device must have been dropped or stopped beforehand.
    fn destroy_window(&mut self);

    /// Pumps pending OS events without blocking.
    fn process_events(&mut self);

    /// Returns `true` once the user asked the window to close.
    fn is_window_closed(&self) -> bool;

    /// Window size in logical pixels.
    fn window_size(&self) -> (u32, u32);

    /// Ratio of backbuffer pixels to logical window pixels.
    fn window_scale(&self) -> (f32, f32);

    /// Backbuffer size in physical pixels.
    fn backbuffer_size(&self) -> (u32, u32);

    /// Returns `true` for backends without a display. Headless backends always render on
    /// the caller's thread.
    fn is_headless(&self) -> bool {
        false
    }
}

/// The drawing side of a backend.
///
/// Every method is called from the thread that currently owns the device, bracketed by
/// [`RenderDevice::start_rendering`] and [`RenderDevice::stop_rendering`].
pub trait RenderDevice: Send {
    /// Makes the graphics context current on the calling thread.
    fn start_rendering(&mut self);

    /// Detaches the graphics context from the calling thread.
    fn stop_rendering(&mut self);

    /// Executes `commands` in order.
    fn process_command_list(&mut self, commands: &[RenderCommand]);

    /// Draws every view of `frame` and presents. Returns `false` on an unrecoverable
    /// backend failure.
    fn frame(&mut self, frame: &Frame) -> bool;
}
