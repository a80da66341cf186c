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


use std::fmt;

/// A multi-producer, single-consumer event channel.
///
/// The bus owns the receiving end; producers get cloned senders from
/// [`EventBus::sender`] and may live on any thread.
pub struct EventBus<T: Send + 'static> {
    sender: flume::Sender<T>,
    receiver: flume::Receiver<T>,
}

impl<T: Send + 'static> EventBus<T> {
    /// Creates a bus backed by an unbounded channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        log::debug!("EventBus initialized.");
        Self { sender, receiver }
    }

    /// Publishes an event from the owning side.
    pub fn publish(&self, event: T) {
        // The bus holds a receiver, so the channel cannot be disconnected here.
        if let Err(e) = self.sender.send(event) {
            log::error!("Failed to publish event: {e}.");
        }
    }

    /// Returns a new sender for a producer.
    pub fn sender(&self) -> flume::Sender<T> {
        self.sender.clone()
    }

    /// Returns the receiving end.
    pub fn receiver(&self) -> &flume::Receiver<T> {
        &self.receiver
    }

    /// Takes every pending event without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

impl<T: Send + 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EngineEvent, ExitReason};
    use flume::TryRecvError;
    use std::{thread, time::Duration};

    #[test]
    fn empty_bus_has_nothing_pending() {
        let bus = EventBus::<EngineEvent>::new();
        assert!(bus.drain().is_empty());
        assert_eq!(bus.receiver().try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn drain_returns_events_in_order() {
        let bus = EventBus::<EngineEvent>::new();
        let sender = bus.sender();
        sender
            .send(EngineEvent::ExitRequested(ExitReason::WindowClosed))
            .expect("Send should succeed");
        bus.publish(EngineEvent::ExitRequested(ExitReason::BackendFailure));

        assert_eq!(
            bus.drain(),
            vec![
                EngineEvent::ExitRequested(ExitReason::WindowClosed),
                EngineEvent::ExitRequested(ExitReason::BackendFailure),
            ]
        );
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn exit_event_crosses_threads() {
        let bus = EventBus::<EngineEvent>::new();
        let sender = bus.sender();

        let handle = thread::spawn(move || {
            sender
                .send(EngineEvent::ExitRequested(ExitReason::RenderThreadFinished))
                .expect("Send from thread failed");
        });

        let event = bus
            .receiver()
            .recv_timeout(Duration::from_secs(1))
            .expect("Event should arrive");
        assert_eq!(
            event,
            EngineEvent::ExitRequested(ExitReason::RenderThreadFinished)
        );
        handle.join().expect("Thread join failed");
    }

    #[test]
    fn sending_after_bus_drop_fails() {
        let bus = EventBus::<EngineEvent>::new();
        let sender = bus.sender();
        drop(bus);
        assert!(sender
            .send(EngineEvent::ExitRequested(ExitReason::WindowClosed))
            .is_err());
    }
}
