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


//! The dedicated render thread and its frame exchange with the submission thread.
//!
//! Two frames exist. Each tick the submission thread deposits the frame it filled and
//! meets the render thread at a two-party barrier. The render thread then swaps the
//! deposited frame with the one it just rendered and signals the condition variable.
//! The submission thread takes the rendered (and reset) frame back and fills it next.
//! Ownership of the boxed frames moves through the exchange slot, so neither side can
//! observe the other's frame.

use dawn_core::event::ExitReason;
use dawn_core::renderer::{Frame, RenderDevice};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Barrier, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

/// Runs one frame on `device`: pre-frame commands, views, post-frame commands, then
/// resets `frame` for reuse. Returns `false` on backend failure.
pub(crate) fn render_frame(device: &mut dyn RenderDevice, frame: &mut Frame) -> bool {
    device.process_command_list(&frame.commands_pre);
    let ok = device.frame(frame);
    device.process_command_list(&frame.commands_post);
    frame.reset();
    ok
}

#[derive(Default)]
struct SwapState {
    /// Frame handed across. Holds the submitted frame until the swap, then the rendered one.
    slot: Option<Box<Frame>>,
    /// Set by the render thread after each swap, cleared by the submission thread.
    swapped: bool,
    /// Set when the submission thread wants the render thread to stop.
    exit_requested: bool,
    /// Set by the render thread right before it leaves its loop.
    finished: bool,
    /// The render thread stopped because the backend failed.
    backend_failed: bool,
}

struct FrameExchange {
    barrier: Barrier,
    state: Mutex<SwapState>,
    swapped: Condvar,
}

impl FrameExchange {
    fn lock(&self) -> MutexGuard<'_, SwapState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Result of handing a frame to the render thread.
pub(crate) struct Exchange {
    /// The frame to fill next.
    pub frame: Box<Frame>,
    /// Set once the render thread has stopped.
    pub finished: Option<ExitReason>,
}

/// Handle to the running render thread.
pub(crate) struct RenderThread {
    exchange: Arc<FrameExchange>,
    handle: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Spawns the render thread. It takes ownership of `device` and of the idle frame
    /// `render`, and attaches the device to itself before the first frame.
    pub fn spawn(device: Box<dyn RenderDevice>, render: Box<Frame>) -> std::io::Result<Self> {
        let exchange = Arc::new(FrameExchange {
            barrier: Barrier::new(2),
            state: Mutex::new(SwapState::default()),
            swapped: Condvar::new(),
        });
        let thread_exchange = exchange.clone();
        let handle = thread::Builder::new()
            .name("dawn-render".to_string())
            .spawn(move || render_loop(device, render, &thread_exchange))?;
        log::info!("Render thread started.");
        Ok(Self {
            exchange,
            handle: Some(handle),
        })
    }

    /// Hands `submit` to the render thread and returns the frame to fill next. Blocks
    /// until the render thread has finished the previous frame.
    ///
    /// Once the render thread has stopped, `submit` is reset and returned without
    /// blocking.
    pub fn exchange(&self, mut submit: Box<Frame>) -> Exchange {
        {
            let mut state = self.exchange.lock();
            if state.finished {
                let reason = exit_reason(&state);
                drop(state);
                submit.reset();
                return Exchange {
                    frame: submit,
                    finished: Some(reason),
                };
            }
            state.slot = Some(submit);
        }

        self.exchange.barrier.wait();

        let mut state = self.exchange.lock();
        while !state.swapped {
            state = self
                .exchange
                .swapped
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.swapped = false;
        let finished = state.finished.then(|| exit_reason(&state));
        match state.slot.take() {
            Some(frame) => Exchange { frame, finished },
            None => {
                // The render thread always leaves a frame behind after a swap.
                log::error!("Render thread returned no frame, allocating a replacement.");
                Exchange {
                    frame: Box::new(Frame::new(0, 0)),
                    finished,
                }
            }
        }
    }

    /// Returns `true` once the render thread has left its loop.
    pub fn is_finished(&self) -> bool {
        self.exchange.lock().finished
    }

    /// Stops the render thread and waits for it. Safe to call more than once.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let finished = {
            let mut state = self.exchange.lock();
            state.exit_requested = true;
            state.finished
        };
        // The exit flag is only read after the barrier, so release it once more.
        if !finished {
            self.exchange.barrier.wait();
        }
        if handle.join().is_err() {
            log::error!("Render thread panicked.");
        }
        log::info!("Render thread stopped.");
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn exit_reason(state: &SwapState) -> ExitReason {
    if state.backend_failed {
        ExitReason::BackendFailure
    } else {
        ExitReason::RenderThreadFinished
    }
}

fn render_loop(mut device: Box<dyn RenderDevice>, mut render: Box<Frame>, exchange: &FrameExchange) {
    device.start_rendering();
    let mut first = true;
    let mut failed = false;

    loop {
        // The first iteration has nothing to draw yet.
        if !first && !failed {
            let rendered = panic::catch_unwind(AssertUnwindSafe(|| {
                render_frame(device.as_mut(), &mut render)
            }));
            failed = match rendered {
                Ok(ok) => !ok,
                Err(_) => {
                    log::error!("Render thread panicked while rendering a frame.");
                    render.reset();
                    true
                }
            };
            if failed {
                log::error!("Backend failure, the render thread will stop.");
            }
        }
        first = false;

        exchange.barrier.wait();

        let mut state = exchange.lock();
        if state.exit_requested {
            state.finished = true;
            break;
        }
        match state.slot.take() {
            Some(submitted) => {
                state.slot = Some(std::mem::replace(&mut render, submitted));
            }
            None => log::warn!("Frame exchange without a submitted frame."),
        }
        state.swapped = true;
        if failed {
            state.backend_failed = true;
            state.finished = true;
        }
        let finished = state.finished;
        drop(state);
        exchange.swapped.notify_one();
        if finished {
            break;
        }
    }

    device.stop_rendering();
    log::debug!("Render loop exited.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dawn_core::renderer::{ProgramHandle, RenderCommand, UniformValue};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingDevice {
        frames: Arc<AtomicUsize>,
        fail_after: Option<usize>,
    }

    impl RenderDevice for CountingDevice {
        fn start_rendering(&mut self) {}
        fn stop_rendering(&mut self) {}
        fn process_command_list(&mut self, _commands: &[RenderCommand]) {}
        fn frame(&mut self, _frame: &Frame) -> bool {
            let n = self.frames.fetch_add(1, Ordering::SeqCst) + 1;
            self.fail_after.map_or(true, |limit| n < limit)
        }
    }

    struct PanickingDevice;

    impl RenderDevice for PanickingDevice {
        fn start_rendering(&mut self) {}
        fn stop_rendering(&mut self) {}
        fn process_command_list(&mut self, _commands: &[RenderCommand]) {}
        fn frame(&mut self, _frame: &Frame) -> bool {
            panic!("driver crashed");
        }
    }

    fn spawn(fail_after: Option<usize>) -> (RenderThread, Box<Frame>, Arc<AtomicUsize>) {
        let frames = Arc::new(AtomicUsize::new(0));
        let device = CountingDevice {
            frames: frames.clone(),
            fail_after,
        };
        let thread = RenderThread::spawn(Box::new(device), Box::new(Frame::new(64, 64))).unwrap();
        (thread, Box::new(Frame::new(64, 64)), frames)
    }

    /// Runs `f` on a helper thread and fails the test if it does not finish in time.
    fn within_timeout(f: impl FnOnce() + Send + 'static) {
        let (tx, rx) = flume::bounded(1);
        thread::spawn(move || {
            f();
            let _ = tx.send(());
        });
        match rx.recv_timeout(Duration::from_secs(10)) {
            Ok(()) => {}
            Err(flume::RecvTimeoutError::Timeout) => panic!("frame exchange deadlocked"),
            Err(flume::RecvTimeoutError::Disconnected) => panic!("test body panicked"),
        }
    }

    #[test]
    fn exchange_returns_the_other_frame() {
        within_timeout(|| {
            let (thread, mut submit, frames) = spawn(None);
            submit.current_item.program = ProgramHandle::from_raw(7);
            submit
                .current_item
                .uniforms
                .insert("marker".into(), UniformValue::Int(1));
            submit.submit_current_item(0);
            let first: *const Frame = &*submit;

            let exchange = thread.exchange(submit);
            assert!(exchange.finished.is_none());
            assert_ne!(&*exchange.frame as *const Frame, first);
            assert_eq!(exchange.frame.render_item_count(), 0);

            let exchange = thread.exchange(exchange.frame);
            assert_eq!(&*exchange.frame as *const Frame, first);
            assert_eq!(exchange.frame.render_item_count(), 0, "returned frames are reset");
            drop(thread);
            assert!(frames.load(Ordering::SeqCst) >= 1);
        });
    }

    #[test]
    fn shutdown_without_any_frame_does_not_deadlock() {
        within_timeout(|| {
            let (mut thread, _submit, frames) = spawn(None);
            thread.shutdown();
            thread.shutdown();
            assert_eq!(frames.load(Ordering::SeqCst), 0);
        });
    }

    #[test]
    fn backend_failure_finishes_the_thread() {
        within_timeout(|| {
            let (thread, mut submit, _frames) = spawn(Some(1));
            let mut reason = None;
            for _ in 0..4 {
                let exchange = thread.exchange(submit);
                submit = exchange.frame;
                if exchange.finished.is_some() {
                    reason = exchange.finished;
                    break;
                }
            }
            assert_eq!(reason, Some(ExitReason::BackendFailure));
            assert!(thread.is_finished());

            // Later exchanges return immediately.
            let exchange = thread.exchange(submit);
            assert_eq!(exchange.finished, Some(ExitReason::BackendFailure));
            drop(thread);
        });
    }

    #[test]
    fn panicking_backend_hands_back_a_reset_frame() {
        within_timeout(|| {
            let thread =
                RenderThread::spawn(Box::new(PanickingDevice), Box::new(Frame::new(64, 64)))
                    .unwrap();
            let mut submit = Box::new(Frame::new(64, 64));
            submit.commands_pre.push(RenderCommand::CreateProgram {
                handle: ProgramHandle::from_raw(1),
            });
            submit.current_item.program = ProgramHandle::from_raw(1);
            submit.submit_current_item(0);
            let submitted: *const Frame = &*submit;

            let exchange = thread.exchange(submit);
            assert!(exchange.finished.is_none());

            let exchange = thread.exchange(exchange.frame);
            assert_eq!(exchange.finished, Some(ExitReason::BackendFailure));
            assert_eq!(&*exchange.frame as *const Frame, submitted);
            assert_eq!(exchange.frame.render_item_count(), 0);
            assert!(exchange.frame.commands_pre.is_empty());
            drop(thread);
        });
    }
}
