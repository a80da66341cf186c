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


//! Event channels between engine subsystems.
//!
//! The renderer may run on a thread other than the application loop, so it never reports
//! runtime failures synchronously. Instead it publishes an [`EngineEvent`] that the
//! application drains once per tick.

mod bus;

pub use self::bus::EventBus;

/// Why a subsystem asked the application to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitReason {
    /// The user closed the window.
    WindowClosed,
    /// The graphics backend reported an unrecoverable failure.
    BackendFailure,
    /// The render thread stopped on its own.
    RenderThreadFinished,
}

/// Application-wide events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// The application should shut down.
    ExitRequested(ExitReason),
}

/// The sending end handed to subsystems that publish [`EngineEvent`]s.
pub type EventSink = flume::Sender<EngineEvent>;
