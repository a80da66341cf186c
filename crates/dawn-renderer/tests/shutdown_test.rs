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


mod common;

use common::{within_timeout, MockContext, Observed};
use dawn_renderer::{
    EngineEvent, EventBus, ExitReason, RenderError, Renderer, RendererConfig, RendererState,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn init(context: MockContext) -> (Renderer, EventBus<EngineEvent>) {
    let bus = EventBus::new();
    let mut renderer = Renderer::new(bus.sender());
    let config = RendererConfig {
        use_render_thread: true,
        ..RendererConfig::default()
    };
    renderer.init_with_context(config, Box::new(context)).unwrap();
    (renderer, bus)
}

#[test]
fn test_shutdown_before_first_frame() {
    within_timeout(10, || {
        let (mut renderer, _bus) = init(MockContext::new(Arc::new(Observed::default())));
        renderer.shutdown();
        assert_eq!(renderer.state(), RendererState::Terminated);
    });
}

#[test]
fn test_shutdown_after_frames_and_twice() {
    within_timeout(10, || {
        let (mut renderer, _bus) = init(MockContext::new(Arc::new(Observed::default())));
        for _ in 0..50 {
            renderer.frame();
        }
        renderer.shutdown();
        renderer.shutdown();
        renderer.frame();
        assert_eq!(renderer.state(), RendererState::Terminated);
    });
}

#[test]
fn test_drop_shuts_down_the_render_thread() {
    let observed = Arc::new(Observed::default());
    let shared = observed.clone();
    within_timeout(10, move || {
        let (mut renderer, _bus) = init(MockContext::new(shared));
        renderer.frame();
        drop(renderer);
    });
    assert!(observed.stopped.load(Ordering::SeqCst));
}

#[test]
fn test_backend_failure_requests_exit_once() {
    within_timeout(10, || {
        let context = MockContext::new(Arc::new(Observed::default())).failing_at(3);
        let (mut renderer, bus) = init(context);
        for _ in 0..10 {
            renderer.frame();
        }
        assert_eq!(
            bus.drain(),
            vec![EngineEvent::ExitRequested(ExitReason::BackendFailure)]
        );
        renderer.shutdown();
    });
}

#[test]
fn test_window_close_requests_exit() {
    within_timeout(10, || {
        let context = MockContext::new(Arc::new(Observed::default()));
        let close = context.close_switch();
        let (mut renderer, bus) = init(context);
        renderer.frame();
        assert!(bus.drain().is_empty());

        close.store(true, Ordering::SeqCst);
        renderer.frame();
        renderer.frame();
        assert_eq!(
            bus.drain(),
            vec![EngineEvent::ExitRequested(ExitReason::WindowClosed)]
        );
    });
}

#[test]
fn test_window_creation_failure_is_fatal() {
    let mut context = MockContext::new(Arc::new(Observed::default()));
    context.fail_window_creation = true;
    let bus = EventBus::new();
    let mut renderer = Renderer::new(bus.sender());
    let err = renderer
        .init_with_context(RendererConfig::default(), Box::new(context))
        .unwrap_err();
    assert!(matches!(err, RenderError::WindowCreationFailed(_)));
    assert_eq!(renderer.state(), RendererState::Uninitialized);
}
