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


//! The OpenGL implementation of [`RenderDevice`].

use super::conversions::{attachment_point, IntoGl};
use super::state::{BindingCache, FrameStats};
use crate::platform::window::{WindowState, WinitWindow};
use dawn_core::renderer::{
    BufferUsage, FrameBufferHandle, Frame, IndexBufferHandle, IndexBufferType, ProgramHandle,
    RenderCommand, RenderDevice, RenderItem, RenderStates, ShaderError, ShaderHandle,
    ShaderStage, TextureFormat, TextureHandle, UniformValue, VertexBufferHandle, VertexDecl,
    MAX_TEXTURE_SAMPLERS,
};
use glow::{HasContext, PixelUnpackData};
use glutin::context::{NotCurrentContext, PossiblyCurrentContext};
use glutin::prelude::*;
use glutin::surface::{Surface, WindowSurface};
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::Arc;

struct GlVertexBuffer {
    buffer: glow::NativeBuffer,
    vao: glow::NativeVertexArray,
    decl: VertexDecl,
    size: u32,
    usage: u32,
    /// Attribute locations currently enabled on the VAO.
    enabled_locations: u16,
}

struct GlIndexBuffer {
    buffer: glow::NativeBuffer,
    index_type: IndexBufferType,
    size: u32,
    usage: u32,
}

struct GlProgram {
    program: glow::NativeProgram,
    /// Resolved uniform locations. `None` records a name the program does not have, so it
    /// is only reported once.
    uniforms: HashMap<String, Option<glow::NativeUniformLocation>>,
}

struct GlTexture {
    texture: glow::NativeTexture,
    format: TextureFormat,
}

struct GlFrameBuffer {
    framebuffer: glow::NativeFramebuffer,
    width: u32,
    height: u32,
}

/// Every GL object owned by the device, by engine handle.
#[derive(Default)]
struct GlResources {
    vertex_buffers: HashMap<VertexBufferHandle, GlVertexBuffer>,
    index_buffers: HashMap<IndexBufferHandle, GlIndexBuffer>,
    shaders: HashMap<ShaderHandle, glow::NativeShader>,
    programs: HashMap<ProgramHandle, GlProgram>,
    textures: HashMap<TextureHandle, GlTexture>,
    frame_buffers: HashMap<FrameBufferHandle, GlFrameBuffer>,
}

impl GlResources {
    fn object_count(&self) -> usize {
        self.vertex_buffers.len()
            + self.index_buffers.len()
            + self.shaders.len()
            + self.programs.len()
            + self.textures.len()
            + self.frame_buffers.len()
    }
}

enum ContextState {
    Current(PossiblyCurrentContext),
    NotCurrent(NotCurrentContext),
    Lost,
}

/// Renders frames into a window surface through `glow`.
///
/// The device is created detached. The render loop attaches it to its own thread with
/// [`RenderDevice::start_rendering`] and detaches it with [`RenderDevice::stop_rendering`].
pub struct GlRenderDevice {
    gl: glow::Context,
    context: ContextState,
    surface: Surface<WindowSurface>,
    window_state: Arc<WindowState>,
    surface_size: (u32, u32),
    panic_on_shader_error: bool,
    failed: bool,
    resources: GlResources,
    cache: BindingCache,
    last_stats: FrameStats,
    frame_count: u64,
    // Declared last: the surface must be destroyed before the window it presents to.
    _window: WinitWindow,
}

// SAFETY: the GL context is current on at most one thread at a time. It is only made
// current by `start_rendering` and released by `stop_rendering` on the same thread, and
// the device moves between threads only while detached.
unsafe impl Send for GlRenderDevice {}

impl GlRenderDevice {
    pub(crate) fn new(
        gl: glow::Context,
        context: NotCurrentContext,
        surface: Surface<WindowSurface>,
        window: WinitWindow,
        panic_on_shader_error: bool,
    ) -> Self {
        let window_state = window.state();
        let surface_size = window_state.physical_size();
        Self {
            gl,
            context: ContextState::NotCurrent(context),
            surface,
            window_state,
            surface_size,
            panic_on_shader_error,
            failed: false,
            resources: GlResources::default(),
            cache: BindingCache::new(),
            last_stats: FrameStats::default(),
            frame_count: 0,
            _window: window,
        }
    }

    /// Counters of the most recently rendered frame.
    pub fn last_frame_stats(&self) -> FrameStats {
        self.last_stats
    }

    fn report_shader_error(&self, error: ShaderError) {
        if self.panic_on_shader_error {
            panic!("{error}");
        }
        log::error!("{error}");
    }

    fn execute(&mut self, command: &RenderCommand) {
        log::trace!("Executing {}", command.name());
        match command {
            RenderCommand::CreateVertexBuffer {
                handle,
                data,
                decl,
                usage,
            } => self.create_vertex_buffer(*handle, data, decl, *usage),
            RenderCommand::UpdateVertexBuffer {
                handle,
                offset,
                data,
            } => self.update_vertex_buffer(*handle, *offset, data),
            RenderCommand::DeleteVertexBuffer { handle } => {
                if let Some(vb) = self.resources.vertex_buffers.remove(handle) {
                    unsafe {
                        self.gl.delete_vertex_array(vb.vao);
                        self.gl.delete_buffer(vb.buffer);
                    }
                } else {
                    log::warn!("DeleteVertexBuffer: unknown handle {handle:?}");
                }
            }
            RenderCommand::CreateIndexBuffer {
                handle,
                data,
                index_type,
                usage,
            } => self.create_index_buffer(*handle, data, *index_type, *usage),
            RenderCommand::UpdateIndexBuffer {
                handle,
                offset,
                data,
            } => self.update_index_buffer(*handle, *offset, data),
            RenderCommand::DeleteIndexBuffer { handle } => {
                if let Some(ib) = self.resources.index_buffers.remove(handle) {
                    unsafe { self.gl.delete_buffer(ib.buffer) };
                } else {
                    log::warn!("DeleteIndexBuffer: unknown handle {handle:?}");
                }
            }
            RenderCommand::CreateShader {
                handle,
                stage,
                source,
            } => self.create_shader(*handle, *stage, source),
            RenderCommand::DeleteShader { handle } => {
                if let Some(shader) = self.resources.shaders.remove(handle) {
                    unsafe { self.gl.delete_shader(shader) };
                } else {
                    log::warn!("DeleteShader: unknown handle {handle:?}");
                }
            }
            RenderCommand::CreateProgram { handle } => match unsafe { self.gl.create_program() } {
                Ok(program) => {
                    self.resources.programs.insert(
                        *handle,
                        GlProgram {
                            program,
                            uniforms: HashMap::new(),
                        },
                    );
                }
                Err(e) => self.report_shader_error(ShaderError::ObjectCreationFailed(e)),
            },
            RenderCommand::AttachShader { program, shader } => {
                match (
                    self.resources.programs.get(program),
                    self.resources.shaders.get(shader),
                ) {
                    (Some(p), Some(s)) => unsafe { self.gl.attach_shader(p.program, *s) },
                    _ => log::warn!("AttachShader: unknown program {program:?} or shader {shader:?}"),
                }
            }
            RenderCommand::LinkProgram { handle } => self.link_program(*handle),
            RenderCommand::DeleteProgram { handle } => {
                if let Some(program) = self.resources.programs.remove(handle) {
                    unsafe { self.gl.delete_program(program.program) };
                } else {
                    log::warn!("DeleteProgram: unknown handle {handle:?}");
                }
            }
            RenderCommand::CreateTexture2D {
                handle,
                width,
                height,
                format,
                data,
            } => self.create_texture_2d(*handle, *width, *height, *format, data),
            RenderCommand::DeleteTexture { handle } => {
                if let Some(texture) = self.resources.textures.remove(handle) {
                    unsafe { self.gl.delete_texture(texture.texture) };
                } else {
                    log::warn!("DeleteTexture: unknown handle {handle:?}");
                }
            }
            RenderCommand::CreateFrameBuffer {
                handle,
                width,
                height,
                textures,
            } => self.create_frame_buffer(*handle, *width, *height, textures),
            RenderCommand::DeleteFrameBuffer { handle } => {
                if let Some(fb) = self.resources.frame_buffers.remove(handle) {
                    unsafe { self.gl.delete_framebuffer(fb.framebuffer) };
                } else {
                    log::warn!("DeleteFrameBuffer: unknown handle {handle:?}");
                }
            }
        }
    }

    fn create_vertex_buffer(
        &mut self,
        handle: VertexBufferHandle,
        data: &[u8],
        decl: &VertexDecl,
        usage: BufferUsage,
    ) {
        let gl = &self.gl;
        let usage = usage.into_gl();
        let created = unsafe {
            gl.create_vertex_array().and_then(|vao| {
                gl.create_buffer().map(|buffer| (vao, buffer))
            })
        };
        let (vao, buffer) = match created {
            Ok(objects) => objects,
            Err(e) => {
                log::error!("Failed to create vertex buffer {handle:?}: {e}");
                return;
            }
        };
        unsafe {
            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
            gl.buffer_data_u8_slice(glow::ARRAY_BUFFER, data, usage);
            gl.bind_vertex_array(None);
        }
        self.resources.vertex_buffers.insert(
            handle,
            GlVertexBuffer {
                buffer,
                vao,
                decl: decl.clone(),
                size: data.len() as u32,
                usage,
                enabled_locations: 0,
            },
        );
    }

    fn update_vertex_buffer(&mut self, handle: VertexBufferHandle, offset: u32, data: &[u8]) {
        let Some(vb) = self.resources.vertex_buffers.get_mut(&handle) else {
            log::warn!("UpdateVertexBuffer: unknown handle {handle:?}");
            return;
        };
        unsafe {
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vb.buffer));
        }
        vb.size = upload_range(&self.gl, glow::ARRAY_BUFFER, vb.size, vb.usage, offset, data);
    }

    fn create_index_buffer(
        &mut self,
        handle: IndexBufferHandle,
        data: &[u8],
        index_type: IndexBufferType,
        usage: BufferUsage,
    ) {
        let buffer = match unsafe { self.gl.create_buffer() } {
            Ok(buffer) => buffer,
            Err(e) => {
                log::error!("Failed to create index buffer {handle:?}: {e}");
                return;
            }
        };
        let usage = usage.into_gl();
        unsafe {
            // Unbind the VAO so the element binding doesn't land in some vertex buffer's state.
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
            self.gl
                .buffer_data_u8_slice(glow::ELEMENT_ARRAY_BUFFER, data, usage);
        }
        self.resources.index_buffers.insert(
            handle,
            GlIndexBuffer {
                buffer,
                index_type,
                size: data.len() as u32,
                usage,
            },
        );
    }

    fn update_index_buffer(&mut self, handle: IndexBufferHandle, offset: u32, data: &[u8]) {
        let Some(ib) = self.resources.index_buffers.get_mut(&handle) else {
            log::warn!("UpdateIndexBuffer: unknown handle {handle:?}");
            return;
        };
        unsafe {
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ib.buffer));
        }
        ib.size = upload_range(
            &self.gl,
            glow::ELEMENT_ARRAY_BUFFER,
            ib.size,
            ib.usage,
            offset,
            data,
        );
    }

    fn create_shader(&mut self, handle: ShaderHandle, stage: ShaderStage, source: &str) {
        let shader = match unsafe { self.gl.create_shader(stage.into_gl()) } {
            Ok(shader) => shader,
            Err(e) => {
                self.report_shader_error(ShaderError::ObjectCreationFailed(e));
                return;
            }
        };
        let compiled = unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            self.gl.get_shader_compile_status(shader)
        };
        if !compiled {
            let details = unsafe { self.gl.get_shader_info_log(shader) };
            self.report_shader_error(ShaderError::CompilationError {
                shader: handle,
                details,
            });
        } else {
            log::debug!("Compiled {stage:?} shader {handle:?}");
        }
        // A failed shader is kept so attach and delete still find it.
        self.resources.shaders.insert(handle, shader);
    }

    fn link_program(&mut self, handle: ProgramHandle) {
        let Some(program) = self.resources.programs.get_mut(&handle) else {
            log::warn!("LinkProgram: unknown handle {handle:?}");
            return;
        };
        program.uniforms.clear();
        let linked = unsafe {
            self.gl.link_program(program.program);
            self.gl.get_program_link_status(program.program)
        };
        if !linked {
            let details = unsafe { self.gl.get_program_info_log(program.program) };
            self.report_shader_error(ShaderError::LinkError {
                program: handle,
                details,
            });
        } else {
            log::debug!("Linked program {handle:?}");
        }
    }

    fn create_texture_2d(
        &mut self,
        handle: TextureHandle,
        width: u16,
        height: u16,
        format: TextureFormat,
        data: &[u8],
    ) {
        let texture = match unsafe { self.gl.create_texture() } {
            Ok(texture) => texture,
            Err(e) => {
                log::error!("Failed to create texture {handle:?}: {e}");
                return;
            }
        };
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        let pixels = if data.is_empty() {
            None
        } else if data.len() < expected {
            log::warn!(
                "Texture {handle:?}: {} bytes of data for a {width}x{height} {format:?} texture \
                 ({expected} needed), leaving it uninitialised",
                data.len()
            );
            None
        } else {
            Some(&data[..expected])
        };
        let gl_format = format.into_gl();
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                gl_format.internal_format as i32,
                width as i32,
                height as i32,
                0,
                gl_format.format,
                gl_format.ty,
                PixelUnpackData::Slice(pixels),
            );
            let filter = glow::LINEAR as i32;
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, filter);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, filter);
            let wrap = glow::CLAMP_TO_EDGE as i32;
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
        self.resources
            .textures
            .insert(handle, GlTexture { texture, format });
    }

    fn create_frame_buffer(
        &mut self,
        handle: FrameBufferHandle,
        width: u16,
        height: u16,
        textures: &[TextureHandle],
    ) {
        let framebuffer = match unsafe { self.gl.create_framebuffer() } {
            Ok(fb) => fb,
            Err(e) => {
                log::error!("Failed to create frame buffer {handle:?}: {e}");
                return;
            }
        };
        let mut draw_buffers = Vec::new();
        unsafe {
            self.gl
                .bind_framebuffer(glow::FRAMEBUFFER, Some(framebuffer));
            for texture_handle in textures {
                let Some(texture) = self.resources.textures.get(texture_handle) else {
                    log::warn!("CreateFrameBuffer {handle:?}: unknown texture {texture_handle:?}");
                    continue;
                };
                let attachment = attachment_point(texture.format, draw_buffers.len() as u32);
                if !texture.format.is_depth() {
                    draw_buffers.push(attachment);
                }
                self.gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    attachment,
                    glow::TEXTURE_2D,
                    Some(texture.texture),
                    0,
                );
            }
            if draw_buffers.is_empty() {
                self.gl.draw_buffer(glow::NONE);
            } else {
                self.gl.draw_buffers(&draw_buffers);
            }
            let status = self.gl.check_framebuffer_status(glow::FRAMEBUFFER);
            if status != glow::FRAMEBUFFER_COMPLETE {
                log::error!("Frame buffer {handle:?} is incomplete (status 0x{status:04X})");
            }
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }
        self.resources.frame_buffers.insert(
            handle,
            GlFrameBuffer {
                framebuffer,
                width: width as u32,
                height: height as u32,
            },
        );
    }

    fn resize_surface_if_needed(&mut self) {
        let size = self.window_state.physical_size();
        if size == self.surface_size {
            return;
        }
        let ContextState::Current(context) = &self.context else {
            return;
        };
        if let (Some(width), Some(height)) = (NonZeroU32::new(size.0), NonZeroU32::new(size.1)) {
            self.surface.resize(context, width, height);
            log::debug!("Resized GL surface to {}x{}", size.0, size.1);
        }
        self.surface_size = size;
    }

    /// Binds the target of a view. Returns its height, or `None` for an unknown frame
    /// buffer.
    fn bind_target(&self, frame_buffer: FrameBufferHandle) -> Option<u32> {
        let (fbo, width, height) = if frame_buffer == FrameBufferHandle::BACKBUFFER {
            (None, self.surface_size.0, self.surface_size.1)
        } else {
            let fb = self.resources.frame_buffers.get(&frame_buffer)?;
            (Some(fb.framebuffer), fb.width, fb.height)
        };
        unsafe {
            self.gl.bind_framebuffer(glow::FRAMEBUFFER, fbo);
            self.gl.viewport(0, 0, width as i32, height as i32);
        }
        Some(height)
    }

    fn clear(&mut self, colour: [f32; 4]) {
        unsafe {
            self.gl.disable(glow::SCISSOR_TEST);
            self.gl.color_mask(true, true, true, true);
            self.gl.depth_mask(true);
            self.gl.clear_color(colour[0], colour[1], colour[2], colour[3]);
            self.gl.clear_depth_f32(1.0);
            self.gl
                .clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT);
        }
        self.cache.invalidate_fixed_function();
    }

    fn apply_states(&self, states: &RenderStates) {
        let gl = &self.gl;
        unsafe {
            set_capability(gl, glow::DEPTH_TEST, states.depth_test);
            gl.depth_mask(states.depth_write);
            let c = states.colour_write;
            gl.color_mask(c, c, c, c);

            set_capability(gl, glow::CULL_FACE, states.cull_face);
            gl.cull_face(glow::BACK);
            gl.front_face(states.cull_front_face.into_gl());
            gl.polygon_mode(glow::FRONT_AND_BACK, states.polygon_mode.into_gl());

            set_capability(gl, glow::BLEND, states.blending);
            gl.blend_equation_separate(
                states.blend_equation_rgb.into_gl(),
                states.blend_equation_alpha.into_gl(),
            );
            gl.blend_func_separate(
                states.blend_src_rgb.into_gl(),
                states.blend_dest_rgb.into_gl(),
                states.blend_src_alpha.into_gl(),
                states.blend_dest_alpha.into_gl(),
            );
        }
    }

    fn bind_vertex_layout(&mut self, item: &RenderItem) {
        let Some(vb) = self.resources.vertex_buffers.get_mut(&item.vb) else {
            return;
        };
        let decl = item.vertex_decl_override.as_ref().unwrap_or(&vb.decl);
        let stride = decl.stride() as i32;
        let mut enabled = 0u16;
        unsafe {
            self.gl.bind_vertex_array(Some(vb.vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vb.buffer));
            for attribute in decl.iter() {
                let location = attribute.attribute.location();
                enabled |= 1 << location;
                self.gl.enable_vertex_attrib_array(location);
                self.gl.vertex_attrib_pointer_f32(
                    location,
                    attribute.count as i32,
                    attribute.ty.into_gl(),
                    attribute.normalised,
                    stride,
                    (item.vb_offset + attribute.offset as u32) as i32,
                );
            }
            let stale = vb.enabled_locations & !enabled;
            for location in 0..16u32 {
                if stale & (1 << location) != 0 {
                    self.gl.disable_vertex_attrib_array(location);
                }
            }
        }
        vb.enabled_locations = enabled;
    }

    fn set_uniforms(&mut self, item: &RenderItem) {
        let Some(program) = self.resources.programs.get_mut(&item.program) else {
            return;
        };
        for (name, value) in &item.uniforms {
            let gl = &self.gl;
            let location = program.uniforms.entry(name.clone()).or_insert_with(|| {
                let location = unsafe { gl.get_uniform_location(program.program, name) };
                if location.is_none() {
                    log::warn!("Program {:?} has no active uniform '{name}'", item.program);
                }
                location
            });
            let Some(location) = location.as_ref() else {
                continue;
            };
            unsafe {
                match value {
                    UniformValue::Int(v) => gl.uniform_1_i32(Some(location), *v),
                    UniformValue::Float(v) => gl.uniform_1_f32(Some(location), *v),
                    UniformValue::Vec2(v) => gl.uniform_2_f32(Some(location), v[0], v[1]),
                    UniformValue::Vec3(v) => gl.uniform_3_f32(Some(location), v[0], v[1], v[2]),
                    UniformValue::Vec4(v) => {
                        gl.uniform_4_f32(Some(location), v[0], v[1], v[2], v[3])
                    }
                    UniformValue::Mat3(m) => gl.uniform_matrix_3_f32_slice(Some(location), false, m),
                    UniformValue::Mat4(m) => gl.uniform_matrix_4_f32_slice(Some(location), false, m),
                }
            }
        }
    }

    fn draw_item(&mut self, item: &RenderItem, target_height: u32) {
        if item.primitive_count == 0 {
            return;
        }
        if !self.resources.vertex_buffers.contains_key(&item.vb) {
            log::warn!("Skipping draw with unknown vertex buffer {:?}", item.vb);
            return;
        }
        let Some(program) = self.resources.programs.get(&item.program).map(|p| p.program) else {
            log::warn!("Skipping draw with unknown program {:?}", item.program);
            return;
        };
        let index_type = if item.ib.is_valid() {
            match self.resources.index_buffers.get(&item.ib) {
                Some(ib) => Some((ib.buffer, ib.index_type)),
                None => {
                    log::warn!("Skipping draw with unknown index buffer {:?}", item.ib);
                    return;
                }
            }
        } else {
            None
        };

        let changes = self.cache.diff(item);
        if changes.states {
            self.apply_states(&item.states);
        }
        if changes.scissor {
            unsafe {
                match item.scissor {
                    Some(rect) => {
                        self.gl.enable(glow::SCISSOR_TEST);
                        let y = target_height as i32 - rect.y as i32 - rect.height as i32;
                        self.gl
                            .scissor(rect.x as i32, y, rect.width as i32, rect.height as i32);
                    }
                    None => self.gl.disable(glow::SCISSOR_TEST),
                }
            }
        }
        if changes.program {
            unsafe { self.gl.use_program(Some(program)) };
        }
        self.set_uniforms(item);
        if changes.vertex_buffer {
            self.bind_vertex_layout(item);
        }
        if let (true, Some((buffer, _))) = (changes.index_buffer, index_type) {
            unsafe { self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer)) };
        }
        for unit in 0..MAX_TEXTURE_SAMPLERS {
            if !changes.textures[unit] {
                continue;
            }
            let texture = self
                .resources
                .textures
                .get(&item.textures[unit])
                .map(|t| t.texture);
            unsafe {
                self.gl.active_texture(glow::TEXTURE0 + unit as u32);
                self.gl.bind_texture(glow::TEXTURE_2D, texture);
            }
        }

        let count = (item.primitive_count * 3) as i32;
        unsafe {
            match index_type {
                Some((_, ty)) => self.gl.draw_elements(
                    glow::TRIANGLES,
                    count,
                    ty.into_gl(),
                    item.ib_offset as i32,
                ),
                None => self.gl.draw_arrays(glow::TRIANGLES, 0, count),
            }
        }
        self.cache.record_draw(item.primitive_count);
    }

    fn release_all(&mut self) {
        let resources = std::mem::take(&mut self.resources);
        log::debug!("Releasing {} GL objects", resources.object_count());
        unsafe {
            for (_, vb) in resources.vertex_buffers {
                self.gl.delete_vertex_array(vb.vao);
                self.gl.delete_buffer(vb.buffer);
            }
            for (_, ib) in resources.index_buffers {
                self.gl.delete_buffer(ib.buffer);
            }
            for (_, shader) in resources.shaders {
                self.gl.delete_shader(shader);
            }
            for (_, program) in resources.programs {
                self.gl.delete_program(program.program);
            }
            for (_, texture) in resources.textures {
                self.gl.delete_texture(texture.texture);
            }
            for (_, fb) in resources.frame_buffers {
                self.gl.delete_framebuffer(fb.framebuffer);
            }
        }
    }
}

/// Writes `data` at `offset` into the buffer bound to `target`, reallocating it when the
/// range does not fit. Returns the new buffer size.
fn upload_range(
    gl: &glow::Context,
    target: u32,
    size: u32,
    usage: u32,
    offset: u32,
    data: &[u8],
) -> u32 {
    let end = offset + data.len() as u32;
    unsafe {
        if offset == 0 && end > size {
            gl.buffer_data_u8_slice(target, data, usage);
            return end;
        }
        let mut new_size = size;
        if end > size {
            log::warn!("Buffer update past the end ({end} > {size}), reallocating and dropping old contents");
            new_size = end.max(size * 2);
            gl.buffer_data_size(target, new_size as i32, usage);
        }
        gl.buffer_sub_data_u8_slice(target, offset as i32, data);
        new_size
    }
}

unsafe fn set_capability(gl: &glow::Context, capability: u32, enabled: bool) {
    if enabled {
        gl.enable(capability);
    } else {
        gl.disable(capability);
    }
}

impl RenderDevice for GlRenderDevice {
    fn start_rendering(&mut self) {
        match std::mem::replace(&mut self.context, ContextState::Lost) {
            ContextState::NotCurrent(context) => match context.make_current(&self.surface) {
                Ok(current) => {
                    log::info!(
                        "OpenGL context attached to thread '{}'",
                        std::thread::current().name().unwrap_or("<unnamed>")
                    );
                    self.context = ContextState::Current(current);
                }
                Err(e) => {
                    log::error!("Failed to make the OpenGL context current: {e}");
                    self.failed = true;
                }
            },
            other => self.context = other,
        }
    }

    fn stop_rendering(&mut self) {
        match std::mem::replace(&mut self.context, ContextState::Lost) {
            ContextState::Current(context) => match context.make_not_current() {
                Ok(detached) => {
                    log::info!("OpenGL context detached.");
                    self.context = ContextState::NotCurrent(detached);
                }
                Err(e) => log::error!("Failed to detach the OpenGL context: {e}"),
            },
            other => self.context = other,
        }
    }

    fn process_command_list(&mut self, commands: &[RenderCommand]) {
        if !matches!(self.context, ContextState::Current(_)) {
            if !commands.is_empty() {
                log::warn!(
                    "Dropping {} render commands: no current OpenGL context",
                    commands.len()
                );
            }
            return;
        }
        for command in commands {
            self.execute(command);
        }
    }

    fn frame(&mut self, frame: &Frame) -> bool {
        if self.failed || !matches!(self.context, ContextState::Current(_)) {
            return false;
        }
        self.resize_surface_if_needed();
        self.cache.reset();

        for (index, view) in frame.views.iter().enumerate() {
            if view.render_items.is_empty() && view.clear_colour.is_none() {
                continue;
            }
            let Some(target_height) = self.bind_target(view.frame_buffer) else {
                log::warn!(
                    "View {index} targets unknown frame buffer {:?}, skipping",
                    view.frame_buffer
                );
                continue;
            };
            if let Some(colour) = view.clear_colour {
                self.clear(colour);
            }
            for item in &view.render_items {
                self.draw_item(item, target_height);
            }
        }

        unsafe {
            self.gl.bind_vertex_array(None);
            let error = self.gl.get_error();
            if error != glow::NO_ERROR {
                log::warn!("OpenGL error 0x{error:04X} during frame {}", self.frame_count);
            }
        }

        let ContextState::Current(context) = &self.context else {
            return false;
        };
        if let Err(e) = self.surface.swap_buffers(context) {
            log::error!("Failed to present frame {}: {e}", self.frame_count);
            self.failed = true;
            return false;
        }

        self.last_stats = self.cache.stats();
        self.frame_count += 1;
        log::trace!("Frame {} stats: {:?}", self.frame_count, self.last_stats);
        true
    }
}

impl Drop for GlRenderDevice {
    fn drop(&mut self) {
        // GL objects can only be deleted with the context current.
        self.start_rendering();
        if matches!(self.context, ContextState::Current(_)) {
            self.release_all();
        }
        self.stop_rendering();
    }
}
