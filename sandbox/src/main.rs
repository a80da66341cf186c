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


// Dawn Sandbox
// Draws a spinning triangle with a transient overlay on top.

use anyhow::{Context, Result};
use dawn_renderer::{
    AttributeType, BlendEquation, BlendFunc, BufferUsage, EngineEvent, EventBus, ProgramHandle,
    RenderState, Renderer, RendererConfig, ShaderStage, VertexAttribute, VertexDecl,
};
use serde::Deserialize;
use std::path::Path;
use std::time::Instant;

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 3],
    colour: [u8; 4],
}

impl Vertex {
    fn decl() -> VertexDecl {
        VertexDecl::begin()
            .add(VertexAttribute::Position, 3, AttributeType::Float)
            .add_normalised(VertexAttribute::Colour, 4, AttributeType::Uint8)
            .end()
    }
}

const TRIANGLE: [Vertex; 3] = [
    Vertex {
        position: [0.0, 0.6, 0.0],
        colour: [255, 64, 64, 255],
    },
    Vertex {
        position: [-0.6, -0.5, 0.0],
        colour: [64, 255, 64, 255],
    },
    Vertex {
        position: [0.6, -0.5, 0.0],
        colour: [64, 64, 255, 255],
    },
];

const VERTEX_SHADER: &str = r#"#version 330 core
layout(location = 0) in vec3 a_position;
layout(location = 2) in vec4 a_colour;
uniform mat4 u_transform;
out vec4 v_colour;
void main() {
    v_colour = a_colour;
    gl_Position = u_transform * vec4(a_position, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"#version 330 core
in vec4 v_colour;
uniform float u_alpha;
out vec4 o_colour;
void main() {
    o_colour = vec4(v_colour.rgb, v_colour.a * u_alpha);
}
"#;

/// Sandbox settings, read from the JSON file given as the first argument.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SandboxConfig {
    renderer: RendererConfig,
    /// Exit after this many frames.
    max_frames: Option<u64>,
}

impl SandboxConfig {
    fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}

fn rotation_z(angle: f32) -> [f32; 16] {
    let (s, c) = angle.sin_cos();
    [
        c, s, 0.0, 0.0, //
        -s, c, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

fn create_program(renderer: &mut Renderer) -> ProgramHandle {
    let vs = renderer.create_shader(ShaderStage::Vertex, VERTEX_SHADER);
    let fs = renderer.create_shader(ShaderStage::Fragment, FRAGMENT_SHADER);
    let program = renderer.create_program();
    renderer.attach_shader(program, vs);
    renderer.attach_shader(program, fs);
    renderer.link_program(program);
    renderer.delete_shader(vs);
    renderer.delete_shader(fs);
    program
}

/// Draws a translucent quad from the transient arenas into view 1.
fn draw_overlay(renderer: &mut Renderer, program: ProgramHandle) {
    let quad = [
        Vertex {
            position: [-0.9, 0.9, 0.0],
            colour: [255, 255, 255, 255],
        },
        Vertex {
            position: [-0.9, 0.7, 0.0],
            colour: [255, 255, 255, 255],
        },
        Vertex {
            position: [-0.5, 0.7, 0.0],
            colour: [255, 255, 255, 255],
        },
        Vertex {
            position: [-0.5, 0.9, 0.0],
            colour: [255, 255, 255, 255],
        },
    ];
    let tvb = renderer.alloc_transient_vertex_buffer(quad.len() as u32, Vertex::decl());
    let tib = renderer.alloc_transient_index_buffer(6);
    if !tvb.is_valid() || !tib.is_valid() {
        log::warn!("Transient arenas exhausted, skipping overlay");
        return;
    }
    renderer.write_transient_vertices(tvb, &quad);
    renderer.write_transient_indices(tib, &[0, 1, 2, 0, 2, 3]);

    renderer.set_transient_vertex_buffer(tvb);
    renderer.set_transient_index_buffer(tib);
    renderer.set_uniform("u_transform", rotation_z(0.0));
    renderer.set_uniform("u_alpha", 0.5f32);
    renderer.set_state_disable(RenderState::Depth);
    renderer.set_state_disable(RenderState::CullFace);
    renderer.set_state_enable(RenderState::Blending);
    renderer.set_state_blend_equation(
        BlendEquation::Add,
        BlendFunc::SrcAlpha,
        BlendFunc::OneMinusSrcAlpha,
    );
    renderer.submit(1, program, 6, 0);
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = match std::env::args().nth(1) {
        Some(path) => SandboxConfig::load(Path::new(&path))?,
        None => SandboxConfig::default(),
    };

    let events = EventBus::<EngineEvent>::new();
    let mut renderer = Renderer::new(events.sender());
    renderer
        .init(config.renderer)
        .context("failed to initialize the renderer")?;

    let program = create_program(&mut renderer);
    let vb = renderer.create_vertex_buffer_from(&TRIANGLE, Vertex::decl(), BufferUsage::Static);
    let ib = renderer.create_index_buffer_u16(&[0, 1, 2], BufferUsage::Static);
    renderer.set_view_clear(0, [0.1, 0.1, 0.15, 1.0]);

    let start = Instant::now();
    let mut frames = 0u64;
    'main: loop {
        for event in events.drain() {
            match event {
                EngineEvent::ExitRequested(reason) => {
                    log::info!("Exiting: {reason:?}");
                    break 'main;
                }
            }
        }
        if config.max_frames.is_some_and(|max| frames >= max) {
            break;
        }

        renderer.set_vertex_buffer(vb);
        renderer.set_index_buffer(ib);
        renderer.set_uniform("u_transform", rotation_z(start.elapsed().as_secs_f32()));
        renderer.set_uniform("u_alpha", 1.0f32);
        renderer.set_state_disable(RenderState::CullFace);
        renderer.submit(0, program, 3, 0);

        draw_overlay(&mut renderer, program);

        renderer.frame();
        frames += 1;
    }

    let elapsed = start.elapsed().as_secs_f64();
    log::info!(
        "Rendered {frames} frames in {elapsed:.2}s ({:.1} fps)",
        frames as f64 / elapsed.max(f64::EPSILON)
    );
    renderer.delete_vertex_buffer(vb);
    renderer.delete_index_buffer(ib);
    renderer.delete_program(program);
    renderer.shutdown();
    Ok(())
}
