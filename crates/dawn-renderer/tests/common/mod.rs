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


//! A recording backend for driving the renderer without a display.

#![allow(dead_code)]

use dawn_renderer::{Frame, RenderCommand, RenderContext, RenderDevice, RenderError, UniformValue};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the mock device observed, shared with the test body.
#[derive(Default)]
pub struct Observed {
    /// Frames drawn.
    pub frames: AtomicUsize,
    /// Commands executed.
    pub commands: AtomicUsize,
    /// Markers of every drawn frame, in draw order.
    pub markers: Mutex<Vec<i32>>,
    /// Protocol violations seen by the device.
    pub errors: Mutex<Vec<String>>,
    /// Ordered trace of pre/frame/post calls.
    pub trace: Mutex<Vec<&'static str>>,
    pub started: AtomicBool,
    pub stopped: AtomicBool,
    /// Thread the device rendered on.
    pub render_thread: Mutex<Option<String>>,
}

impl Observed {
    pub fn error(&self, message: String) {
        self.errors.lock().unwrap().push(message);
    }
}

pub struct MockDevice {
    observed: Arc<Observed>,
    fail_at_frame: Option<usize>,
    in_frame: bool,
}

impl RenderDevice for MockDevice {
    fn start_rendering(&mut self) {
        self.observed.started.store(true, Ordering::SeqCst);
        *self.observed.render_thread.lock().unwrap() =
            std::thread::current().name().map(str::to_string);
    }

    fn stop_rendering(&mut self) {
        self.observed.stopped.store(true, Ordering::SeqCst);
    }

    fn process_command_list(&mut self, commands: &[RenderCommand]) {
        let phase = if self.in_frame { "post" } else { "pre" };
        self.in_frame = false;
        if !commands.is_empty() {
            self.observed.trace.lock().unwrap().push(phase);
        }
        self.observed
            .commands
            .fetch_add(commands.len(), Ordering::SeqCst);
    }

    fn frame(&mut self, frame: &Frame) -> bool {
        self.in_frame = true;
        self.observed.trace.lock().unwrap().push("frame");
        let n = self.observed.frames.fetch_add(1, Ordering::SeqCst) + 1;

        // Every item of a frame must carry the same marker.
        let mut marker = None;
        for item in frame.views.iter().flat_map(|view| &view.render_items) {
            let value = match item.uniforms.get("marker") {
                Some(UniformValue::Int(value)) => *value,
                other => {
                    self.observed.error(format!("item without marker: {other:?}"));
                    continue;
                }
            };
            match marker {
                None => marker = Some(value),
                Some(previous) if previous != value => self
                    .observed
                    .error(format!("frame mixes markers {previous} and {value}")),
                _ => {}
            }
        }
        if let Some(marker) = marker {
            self.observed.markers.lock().unwrap().push(marker);
        }

        self.fail_at_frame.map_or(true, |limit| n < limit)
    }
}

/// A windowed (non-headless) context whose window can be closed from the test.
pub struct MockContext {
    observed: Arc<Observed>,
    closed: Arc<AtomicBool>,
    fail_at_frame: Option<usize>,
    pub fail_window_creation: bool,
}

impl MockContext {
    pub fn new(observed: Arc<Observed>) -> Self {
        Self {
            observed,
            closed: Arc::new(AtomicBool::new(false)),
            fail_at_frame: None,
            fail_window_creation: false,
        }
    }

    /// The device reports a backend failure when drawing frame `n` (1-based).
    pub fn failing_at(mut self, n: usize) -> Self {
        self.fail_at_frame = Some(n);
        self
    }

    pub fn close_switch(&self) -> Arc<AtomicBool> {
        self.closed.clone()
    }
}

impl RenderContext for MockContext {
    fn create_window(
        &mut self,
        _width: u16,
        _height: u16,
        _title: &str,
    ) -> Result<Box<dyn RenderDevice>, RenderError> {
        if self.fail_window_creation {
            return Err(RenderError::WindowCreationFailed("mock".to_string()));
        }
        Ok(Box::new(MockDevice {
            observed: self.observed.clone(),
            fail_at_frame: self.fail_at_frame,
            in_frame: false,
        }))
    }

    fn destroy_window(&mut self) {}

    fn process_events(&mut self) {}

    fn is_window_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn window_size(&self) -> (u32, u32) {
        (640, 480)
    }

    fn window_scale(&self) -> (f32, f32) {
        (1.0, 1.0)
    }

    fn backbuffer_size(&self) -> (u32, u32) {
        (640, 480)
    }
}

/// Runs `f` on a helper thread and panics if it does not finish within `seconds`.
pub fn within_timeout(seconds: u64, f: impl FnOnce() + Send + 'static) {
    let (tx, rx) = flume::bounded(1);
    std::thread::spawn(move || {
        f();
        let _ = tx.send(());
    });
    match rx.recv_timeout(std::time::Duration::from_secs(seconds)) {
        Ok(()) => {}
        Err(flume::RecvTimeoutError::Timeout) => panic!("timed out, likely a deadlock"),
        Err(flume::RecvTimeoutError::Disconnected) => panic!("test body panicked"),
    }
}
