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


//! The renderer: resource creation, per-draw state and frame submission.

use crate::backend;
use crate::config::RendererConfig;
use crate::render_thread::{render_frame, RenderThread};
use crate::resources::{FrameBufferInfo, ResourceRegistry, TextureInfo};
use dawn_core::event::{EngineEvent, EventSink, ExitReason};
use dawn_core::renderer::{
    BlendEquation, BlendFunc, BufferUsage, CullFrontFace, Frame, FrameBufferHandle,
    IndexBufferHandle, IndexBufferType, PolygonMode, ProgramHandle, RenderCommand,
    RenderContext, RenderDevice, RenderError, RenderState, ScissorRect, ShaderHandle,
    ShaderStage, TextureFormat, TextureHandle, TransientIndexBufferHandle,
    TransientVertexBufferHandle, UniformValue, VertexBufferHandle, VertexDecl,
    MAX_TEXTURE_SAMPLERS,
};

/// Where frames are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadingMode {
    /// `frame()` renders on the calling thread.
    SingleThreaded,
    /// A dedicated render thread draws the previous frame while the next is filled.
    MultiThreaded,
}

/// Lifecycle of a [`Renderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererState {
    /// `init` has not been called.
    Uninitialized,
    /// Accepting frames.
    Initialized(ThreadingMode),
    /// `shutdown` is in progress.
    ShuttingDown,
    /// Shut down. The renderer cannot be restarted.
    Terminated,
}

/// Size in bytes of one transient index.
const TRANSIENT_INDEX_SIZE: usize = IndexBufferType::U16.size();

/// Records rendering work into the submission frame and hands finished frames to the
/// backend.
///
/// Resource calls return handles immediately and enqueue the backend work: creations and
/// updates run before the frame is drawn, deletions after it. Draws are described by
/// setting state on the current item and calling [`Renderer::submit`].
pub struct Renderer {
    state: RendererState,
    config: RendererConfig,
    context: Option<Box<dyn RenderContext>>,
    /// Rendering device, held here only in single-threaded mode.
    device: Option<Box<dyn RenderDevice>>,
    submit: Option<Box<Frame>>,
    /// The second frame, idle in single-threaded mode.
    render: Option<Box<Frame>>,
    render_thread: Option<RenderThread>,
    resources: ResourceRegistry,
    /// Clear colour per view, applied to every frame before it is rendered.
    view_clears: Vec<Option<[f32; 4]>>,
    events: EventSink,
    exit_requested: bool,
}

impl Renderer {
    /// Creates an uninitialised renderer that reports exit requests to `events`.
    pub fn new(events: EventSink) -> Self {
        Self {
            state: RendererState::Uninitialized,
            config: RendererConfig::default(),
            context: None,
            device: None,
            submit: None,
            render: None,
            render_thread: None,
            resources: ResourceRegistry::new(),
            view_clears: vec![Some([0.0, 0.0, 0.0, 1.0])],
            events,
            exit_requested: false,
        }
    }

    /// Creates the backend selected by `config.backend`, opens the window and starts
    /// rendering.
    ///
    /// ## Errors
    /// * `RenderError::AlreadyInitialized` - If `init` already succeeded.
    /// * `RenderError::WindowCreationFailed` - If the window cannot be opened.
    /// * `RenderError::ThreadSpawnFailed` - If the render thread cannot be started.
    pub fn init(&mut self, config: RendererConfig) -> Result<(), RenderError> {
        if self.state != RendererState::Uninitialized {
            return Err(RenderError::AlreadyInitialized);
        }
        let context = backend::create_context(&config);
        self.init_with_context(config, context)
    }

    /// Like [`Renderer::init`], with a caller-provided context.
    pub fn init_with_context(
        &mut self,
        config: RendererConfig,
        mut context: Box<dyn RenderContext>,
    ) -> Result<(), RenderError> {
        if self.state != RendererState::Uninitialized {
            return Err(RenderError::AlreadyInitialized);
        }
        log::info!(
            "Initializing renderer: {:?}, {}x{} '{}'",
            config.backend,
            config.width,
            config.height,
            config.title
        );
        let mut device = context.create_window(config.width, config.height, &config.title)?;

        if self.submit.is_some() {
            log::warn!("Discarding work recorded before the renderer was initialized.");
        }
        self.submit = Some(Box::new(Frame::new(
            config.transient_vb_size,
            config.transient_ib_size,
        )));
        let mut render = Box::new(Frame::new(
            config.transient_vb_size,
            config.transient_ib_size,
        ));
        self.config = config;

        // Both frames upload their transient arenas into the same pair of buffers.
        let transient_vb =
            self.create_vertex_buffer(&[], VertexDecl::default(), BufferUsage::Stream);
        let transient_ib = self.create_index_buffer(&[], IndexBufferType::U16, BufferUsage::Stream);
        for frame in [self.frame_mut(), &mut *render] {
            frame.transient_vb_storage.handle = transient_vb;
            frame.transient_ib_storage.handle = transient_ib;
        }

        let mode = if self.config.use_render_thread && !context.is_headless() {
            match RenderThread::spawn(device, render) {
                Ok(thread) => self.render_thread = Some(thread),
                Err(e) => {
                    context.destroy_window();
                    self.submit = None;
                    return Err(RenderError::ThreadSpawnFailed(e));
                }
            }
            ThreadingMode::MultiThreaded
        } else {
            if self.config.use_render_thread {
                log::info!("Headless backend, rendering on the calling thread.");
            }
            device.start_rendering();
            self.device = Some(device);
            self.render = Some(render);
            ThreadingMode::SingleThreaded
        };

        self.context = Some(context);
        self.state = RendererState::Initialized(mode);
        log::info!("Renderer initialized ({mode:?}).");
        Ok(())
    }

    /// Finishes the current frame. Call once per tick.
    ///
    /// Single-threaded, the frame is drawn before this returns. Multi-threaded, the
    /// frame is handed to the render thread and this blocks until the previous frame
    /// has been drawn. A closed window or a failed backend is reported once as
    /// [`EngineEvent::ExitRequested`].
    pub fn frame(&mut self) {
        let RendererState::Initialized(mode) = self.state else {
            log::warn!("frame() called on a renderer in state {:?}", self.state);
            return;
        };
        self.enqueue_transient_uploads();
        self.apply_view_clears();

        match mode {
            ThreadingMode::SingleThreaded => {
                let rendered = match (self.device.as_deref_mut(), self.submit.as_deref_mut()) {
                    (Some(device), Some(frame)) => render_frame(device, frame),
                    _ => true,
                };
                if !rendered {
                    self.request_exit(ExitReason::BackendFailure);
                }
            }
            ThreadingMode::MultiThreaded => {
                let finished = match (self.render_thread.as_ref(), self.submit.take()) {
                    (Some(thread), Some(submit)) => {
                        let exchange = thread.exchange(submit);
                        self.submit = Some(exchange.frame);
                        exchange.finished
                    }
                    _ => None,
                };
                if let Some(reason) = finished {
                    self.request_exit(reason);
                }
            }
        }

        let closed = self.context.as_deref_mut().is_some_and(|context| {
            context.process_events();
            context.is_window_closed()
        });
        if closed {
            self.request_exit(ExitReason::WindowClosed);
        }
    }

    /// Stops the render thread, detaches the device and closes the window. Called by
    /// `Drop` if not called explicitly.
    pub fn shutdown(&mut self) {
        if !matches!(self.state, RendererState::Initialized(_)) {
            return;
        }
        log::info!("Shutting down renderer.");
        self.state = RendererState::ShuttingDown;
        if let Some(mut thread) = self.render_thread.take() {
            thread.shutdown();
        }
        if let Some(mut device) = self.device.take() {
            device.stop_rendering();
        }
        if let Some(context) = self.context.as_deref_mut() {
            context.destroy_window();
        }
        self.state = RendererState::Terminated;
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RendererState {
        self.state
    }

    /// The configuration the renderer was initialised with.
    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Window size in logical pixels.
    pub fn window_size(&self) -> (u32, u32) {
        self.context
            .as_deref()
            .map_or((0, 0), |context| context.window_size())
    }

    /// Backbuffer pixels per logical window pixel.
    pub fn window_scale(&self) -> (f32, f32) {
        self.context
            .as_deref()
            .map_or((1.0, 1.0), |context| context.window_scale())
    }

    /// Backbuffer size in physical pixels.
    pub fn backbuffer_size(&self) -> (u32, u32) {
        self.context
            .as_deref()
            .map_or((0, 0), |context| context.backbuffer_size())
    }

    fn request_exit(&mut self, reason: ExitReason) {
        if self.exit_requested {
            return;
        }
        self.exit_requested = true;
        log::info!("Requesting exit: {reason:?}");
        if self.events.send(EngineEvent::ExitRequested(reason)).is_err() {
            log::warn!("No one is listening for engine events.");
        }
    }

    /// The frame being filled.
    fn frame_mut(&mut self) -> &mut Frame {
        let (vb_size, ib_size) = (self.config.transient_vb_size, self.config.transient_ib_size);
        self.submit
            .get_or_insert_with(|| Box::new(Frame::new(vb_size, ib_size)))
    }

    fn apply_view_clears(&mut self) {
        let clears = std::mem::take(&mut self.view_clears);
        let frame = self.frame_mut();
        for (view, clear) in clears.iter().enumerate() {
            frame.view_mut(view as u16).clear_colour = *clear;
        }
        self.view_clears = clears;
    }

    fn enqueue_transient_uploads(&mut self) {
        let frame = self.frame_mut();
        let vb = &frame.transient_vb_storage;
        let ib = &frame.transient_ib_storage;
        let mut uploads = Vec::with_capacity(2);
        if vb.size() > 0 && vb.handle.is_valid() {
            uploads.push(RenderCommand::UpdateVertexBuffer {
                handle: vb.handle,
                offset: 0,
                data: vb.used_data().to_vec(),
            });
        }
        if ib.size() > 0 && ib.handle.is_valid() {
            uploads.push(RenderCommand::UpdateIndexBuffer {
                handle: ib.handle,
                offset: 0,
                data: ib.used_data().to_vec(),
            });
        }
        frame.commands_pre.extend(uploads);
    }

    // --- Vertex and index buffers ---

    /// Creates a vertex buffer holding `data`, laid out as `decl`.
    pub fn create_vertex_buffer(
        &mut self,
        data: &[u8],
        decl: VertexDecl,
        usage: BufferUsage,
    ) -> VertexBufferHandle {
        let handle = self.resources.add_vertex_buffer(decl.clone());
        self.frame_mut()
            .commands_pre
            .push(RenderCommand::CreateVertexBuffer {
                handle,
                data: data.to_vec(),
                decl,
                usage,
            });
        handle
    }

    /// Creates a vertex buffer from typed vertices.
    pub fn create_vertex_buffer_from<T: bytemuck::Pod>(
        &mut self,
        vertices: &[T],
        decl: VertexDecl,
        usage: BufferUsage,
    ) -> VertexBufferHandle {
        self.create_vertex_buffer(bytemuck::cast_slice(vertices), decl, usage)
    }

    /// Overwrites part of a vertex buffer before the current frame is drawn.
    pub fn update_vertex_buffer(&mut self, handle: VertexBufferHandle, offset: u32, data: &[u8]) {
        if self.resources.vertex_decl(handle).is_none() {
            log::warn!("update_vertex_buffer: unknown handle {handle:?}");
            return;
        }
        let frame = self.frame_mut();
        #[cfg(debug_assertions)]
        if !frame.updated_vertex_buffers.insert(handle) {
            log::warn!("Vertex buffer {handle:?} updated more than once in the same frame");
        }
        frame.commands_pre.push(RenderCommand::UpdateVertexBuffer {
            handle,
            offset,
            data: data.to_vec(),
        });
    }

    /// Deletes a vertex buffer once the current frame has been drawn.
    pub fn delete_vertex_buffer(&mut self, handle: VertexBufferHandle) {
        if self.resources.remove_vertex_buffer(handle).is_none() {
            log::warn!("delete_vertex_buffer: unknown handle {handle:?}");
            return;
        }
        self.frame_mut()
            .commands_post
            .push(RenderCommand::DeleteVertexBuffer { handle });
    }

    /// Creates an index buffer holding `data`.
    pub fn create_index_buffer(
        &mut self,
        data: &[u8],
        index_type: IndexBufferType,
        usage: BufferUsage,
    ) -> IndexBufferHandle {
        let handle = self.resources.add_index_buffer(index_type);
        self.frame_mut()
            .commands_pre
            .push(RenderCommand::CreateIndexBuffer {
                handle,
                data: data.to_vec(),
                index_type,
                usage,
            });
        handle
    }

    /// Creates a 16-bit index buffer.
    pub fn create_index_buffer_u16(&mut self, indices: &[u16], usage: BufferUsage) -> IndexBufferHandle {
        self.create_index_buffer(bytemuck::cast_slice(indices), IndexBufferType::U16, usage)
    }

    /// Creates a 32-bit index buffer.
    pub fn create_index_buffer_u32(&mut self, indices: &[u32], usage: BufferUsage) -> IndexBufferHandle {
        self.create_index_buffer(bytemuck::cast_slice(indices), IndexBufferType::U32, usage)
    }

    /// Overwrites part of an index buffer before the current frame is drawn.
    pub fn update_index_buffer(&mut self, handle: IndexBufferHandle, offset: u32, data: &[u8]) {
        if self.resources.index_type(handle).is_none() {
            log::warn!("update_index_buffer: unknown handle {handle:?}");
            return;
        }
        let frame = self.frame_mut();
        #[cfg(debug_assertions)]
        if !frame.updated_index_buffers.insert(handle) {
            log::warn!("Index buffer {handle:?} updated more than once in the same frame");
        }
        frame.commands_pre.push(RenderCommand::UpdateIndexBuffer {
            handle,
            offset,
            data: data.to_vec(),
        });
    }

    /// Deletes an index buffer once the current frame has been drawn.
    pub fn delete_index_buffer(&mut self, handle: IndexBufferHandle) {
        if self.resources.remove_index_buffer(handle).is_none() {
            log::warn!("delete_index_buffer: unknown handle {handle:?}");
            return;
        }
        self.frame_mut()
            .commands_post
            .push(RenderCommand::DeleteIndexBuffer { handle });
    }

    /// Layout of a vertex buffer.
    pub fn vertex_decl(&self, handle: VertexBufferHandle) -> Option<&VertexDecl> {
        self.resources.vertex_decl(handle)
    }

    // --- Shaders and programs ---

    /// Compiles a shader stage. Compile errors are reported by the backend.
    pub fn create_shader(&mut self, stage: ShaderStage, source: &str) -> ShaderHandle {
        let handle = self.resources.next_shader();
        self.frame_mut()
            .commands_pre
            .push(RenderCommand::CreateShader {
                handle,
                stage,
                source: source.to_string(),
            });
        handle
    }

    /// Deletes a shader once the current frame has been drawn.
    pub fn delete_shader(&mut self, handle: ShaderHandle) {
        self.frame_mut()
            .commands_post
            .push(RenderCommand::DeleteShader { handle });
    }

    /// Creates an empty program.
    pub fn create_program(&mut self) -> ProgramHandle {
        let handle = self.resources.next_program();
        self.frame_mut()
            .commands_pre
            .push(RenderCommand::CreateProgram { handle });
        handle
    }

    /// Attaches a shader stage to a program.
    pub fn attach_shader(&mut self, program: ProgramHandle, shader: ShaderHandle) {
        self.frame_mut()
            .commands_pre
            .push(RenderCommand::AttachShader { program, shader });
    }

    /// Links a program. Link errors are reported by the backend.
    pub fn link_program(&mut self, program: ProgramHandle) {
        self.frame_mut()
            .commands_pre
            .push(RenderCommand::LinkProgram { handle: program });
    }

    /// Deletes a program once the current frame has been drawn.
    pub fn delete_program(&mut self, handle: ProgramHandle) {
        self.frame_mut()
            .commands_post
            .push(RenderCommand::DeleteProgram { handle });
    }

    // --- Textures and frame buffers ---

    /// Creates a 2D texture. Empty `data` leaves the contents undefined.
    pub fn create_texture_2d(
        &mut self,
        width: u16,
        height: u16,
        format: TextureFormat,
        data: &[u8],
    ) -> TextureHandle {
        let handle = self.resources.add_texture(TextureInfo {
            width,
            height,
            format,
        });
        self.frame_mut()
            .commands_pre
            .push(RenderCommand::CreateTexture2D {
                handle,
                width,
                height,
                format,
                data: data.to_vec(),
            });
        handle
    }

    /// Deletes a texture once the current frame has been drawn.
    pub fn delete_texture(&mut self, handle: TextureHandle) {
        if self.resources.remove_texture(handle).is_none() {
            log::warn!("delete_texture: unknown handle {handle:?}");
            return;
        }
        self.frame_mut()
            .commands_post
            .push(RenderCommand::DeleteTexture { handle });
    }

    /// Size and format of a texture.
    pub fn texture_info(&self, handle: TextureHandle) -> Option<TextureInfo> {
        self.resources.texture_info(handle)
    }

    /// Creates a frame buffer with a single attachment of `format`. The attachment is
    /// deleted along with the frame buffer.
    pub fn create_frame_buffer(
        &mut self,
        width: u16,
        height: u16,
        format: TextureFormat,
    ) -> FrameBufferHandle {
        let texture = self.create_texture_2d(width, height, format, &[]);
        self.add_frame_buffer(width, height, vec![texture], true)
    }

    /// Creates a frame buffer rendering into `textures`, in attachment order. Mismatched
    /// attachment sizes are logged and the first attachment's size is used.
    pub fn create_frame_buffer_from_textures(
        &mut self,
        textures: &[TextureHandle],
    ) -> FrameBufferHandle {
        let mut size = None;
        for &texture in textures {
            match (self.resources.texture_info(texture), size) {
                (None, _) => log::error!("Frame buffer attachment {texture:?} does not exist"),
                (Some(info), None) => size = Some((info.width, info.height)),
                (Some(info), Some((width, height))) => {
                    if (info.width, info.height) != (width, height) {
                        log::error!(
                            "Frame buffer attachment {texture:?} is {}x{}, expected {width}x{height}",
                            info.width,
                            info.height
                        );
                    }
                }
            }
        }
        let (width, height) = size.unwrap_or((0, 0));
        self.add_frame_buffer(width, height, textures.to_vec(), false)
    }

    fn add_frame_buffer(
        &mut self,
        width: u16,
        height: u16,
        textures: Vec<TextureHandle>,
        owned_textures: bool,
    ) -> FrameBufferHandle {
        let handle = self.resources.add_frame_buffer(FrameBufferInfo {
            width,
            height,
            textures: textures.clone(),
            owned_textures,
        });
        self.frame_mut()
            .commands_pre
            .push(RenderCommand::CreateFrameBuffer {
                handle,
                width,
                height,
                textures,
            });
        handle
    }

    /// Attachment `index` of a frame buffer, or an invalid handle.
    pub fn frame_buffer_texture(&self, handle: FrameBufferHandle, index: usize) -> TextureHandle {
        self.resources
            .frame_buffer_info(handle)
            .and_then(|info| info.textures.get(index).copied())
            .unwrap_or(TextureHandle::INVALID)
    }

    /// Deletes a frame buffer once the current frame has been drawn, along with the
    /// attachments created by [`Renderer::create_frame_buffer`].
    pub fn delete_frame_buffer(&mut self, handle: FrameBufferHandle) {
        let Some(info) = self.resources.remove_frame_buffer(handle) else {
            log::warn!("delete_frame_buffer: unknown handle {handle:?}");
            return;
        };
        self.frame_mut()
            .commands_post
            .push(RenderCommand::DeleteFrameBuffer { handle });
        if info.owned_textures {
            for texture in info.textures {
                self.delete_texture(texture);
            }
        }
    }

    // --- Transient buffers ---

    /// Reserves room for `vertex_count` vertices of layout `decl` in this frame's
    /// transient arena. Returns an invalid handle if the arena is full.
    pub fn alloc_transient_vertex_buffer(
        &mut self,
        vertex_count: u32,
        decl: VertexDecl,
    ) -> TransientVertexBufferHandle {
        let bytes = vertex_count as usize * decl.stride() as usize;
        let handle = self.frame_mut().transient_vb_storage.allocate(bytes, decl);
        if !handle.is_valid() {
            log::debug!("Transient vertex arena exhausted ({bytes} bytes requested)");
        }
        handle
    }

    /// Reserves room for `index_count` 16-bit indices in this frame's transient arena.
    /// Returns an invalid handle if the arena is full.
    pub fn alloc_transient_index_buffer(&mut self, index_count: u32) -> TransientIndexBufferHandle {
        let bytes = index_count as usize * TRANSIENT_INDEX_SIZE;
        let handle = self
            .frame_mut()
            .transient_ib_storage
            .allocate(bytes, VertexDecl::default());
        if !handle.is_valid() {
            log::debug!("Transient index arena exhausted ({bytes} bytes requested)");
        }
        handle
    }

    /// The bytes of a transient vertex allocation made this frame.
    pub fn transient_vertex_buffer_data(
        &mut self,
        handle: TransientVertexBufferHandle,
    ) -> Option<&mut [u8]> {
        self.frame_mut().transient_vb_storage.data_mut(handle)
    }

    /// The bytes of a transient index allocation made this frame.
    pub fn transient_index_buffer_data(
        &mut self,
        handle: TransientIndexBufferHandle,
    ) -> Option<&mut [u8]> {
        self.frame_mut().transient_ib_storage.data_mut(handle)
    }

    /// Copies `vertices` into a transient vertex allocation. Returns `false` if the
    /// handle is unknown or the sizes differ.
    pub fn write_transient_vertices<T: bytemuck::Pod>(
        &mut self,
        handle: TransientVertexBufferHandle,
        vertices: &[T],
    ) -> bool {
        copy_exact(self.transient_vertex_buffer_data(handle), bytemuck::cast_slice(vertices))
    }

    /// Copies `indices` into a transient index allocation. Returns `false` if the handle
    /// is unknown or the sizes differ.
    pub fn write_transient_indices(
        &mut self,
        handle: TransientIndexBufferHandle,
        indices: &[u16],
    ) -> bool {
        copy_exact(self.transient_index_buffer_data(handle), bytemuck::cast_slice(indices))
    }

    // --- Per-draw state ---

    /// Draws from a persistent vertex buffer.
    pub fn set_vertex_buffer(&mut self, handle: VertexBufferHandle) {
        let item = &mut self.frame_mut().current_item;
        item.vb = handle;
        item.vb_offset = 0;
        item.vertex_decl_override = None;
    }

    /// Draws from a transient vertex allocation.
    pub fn set_transient_vertex_buffer(&mut self, handle: TransientVertexBufferHandle) {
        let frame = self.frame_mut();
        let Some(allocation) = frame.transient_vb_storage.allocation(handle) else {
            log::warn!("set_transient_vertex_buffer: unknown handle {handle:?}");
            return;
        };
        let (offset, decl) = (allocation.offset, allocation.decl.clone());
        let buffer = frame.transient_vb_storage.handle;
        let item = &mut frame.current_item;
        item.vb = buffer;
        item.vb_offset = offset;
        item.vertex_decl_override = Some(decl);
    }

    /// Draws with a persistent index buffer.
    pub fn set_index_buffer(&mut self, handle: IndexBufferHandle) {
        let item = &mut self.frame_mut().current_item;
        item.ib = handle;
        item.ib_offset = 0;
    }

    /// Draws with a transient index allocation.
    pub fn set_transient_index_buffer(&mut self, handle: TransientIndexBufferHandle) {
        let frame = self.frame_mut();
        let Some(offset) = frame
            .transient_ib_storage
            .allocation(handle)
            .map(|allocation| allocation.offset)
        else {
            log::warn!("set_transient_index_buffer: unknown handle {handle:?}");
            return;
        };
        frame.current_item.ib = frame.transient_ib_storage.handle;
        frame.current_item.ib_offset = offset;
    }

    /// Sets a uniform for the next draw.
    pub fn set_uniform(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.frame_mut()
            .current_item
            .uniforms
            .insert(name.to_string(), value.into());
    }

    /// Binds `texture` to sampler `unit` for the next draw.
    pub fn set_texture(&mut self, texture: TextureHandle, unit: usize) {
        if unit >= MAX_TEXTURE_SAMPLERS {
            log::warn!("Texture unit {unit} out of range (max {MAX_TEXTURE_SAMPLERS})");
            return;
        }
        self.frame_mut().current_item.textures[unit] = texture;
    }

    /// Clips the next draw to a rectangle, origin top-left.
    pub fn set_scissor(&mut self, x: u16, y: u16, width: u16, height: u16) {
        self.frame_mut().current_item.scissor = Some(ScissorRect {
            x,
            y,
            width,
            height,
        });
    }

    /// Enables a fixed-function state for the next draw.
    pub fn set_state_enable(&mut self, state: RenderState) {
        self.set_state(state, true);
    }

    /// Disables a fixed-function state for the next draw.
    pub fn set_state_disable(&mut self, state: RenderState) {
        self.set_state(state, false);
    }

    fn set_state(&mut self, state: RenderState, enabled: bool) {
        let states = &mut self.frame_mut().current_item.states;
        match state {
            RenderState::CullFace => states.cull_face = enabled,
            RenderState::Depth => states.depth_test = enabled,
            RenderState::Blending => states.blending = enabled,
        }
    }

    /// Winding of front faces for the next draw.
    pub fn set_state_cull_front_face(&mut self, front_face: CullFrontFace) {
        self.frame_mut().current_item.states.cull_front_face = front_face;
    }

    /// Polygon rasterisation mode for the next draw.
    pub fn set_state_polygon_mode(&mut self, mode: PolygonMode) {
        self.frame_mut().current_item.states.polygon_mode = mode;
    }

    /// Blend equation and factors for both colour and alpha.
    pub fn set_state_blend_equation(
        &mut self,
        equation: BlendEquation,
        src: BlendFunc,
        dest: BlendFunc,
    ) {
        self.set_state_blend_equation_separate(equation, src, dest, equation, src, dest);
    }

    /// Blend equation and factors, set separately for colour and alpha.
    pub fn set_state_blend_equation_separate(
        &mut self,
        equation_rgb: BlendEquation,
        src_rgb: BlendFunc,
        dest_rgb: BlendFunc,
        equation_alpha: BlendEquation,
        src_alpha: BlendFunc,
        dest_alpha: BlendFunc,
    ) {
        let states = &mut self.frame_mut().current_item.states;
        states.blend_equation_rgb = equation_rgb;
        states.blend_src_rgb = src_rgb;
        states.blend_dest_rgb = dest_rgb;
        states.blend_equation_alpha = equation_alpha;
        states.blend_src_alpha = src_alpha;
        states.blend_dest_alpha = dest_alpha;
    }

    /// Colour writes for the next draw.
    pub fn set_colour_write(&mut self, enabled: bool) {
        self.frame_mut().current_item.states.colour_write = enabled;
    }

    /// Depth writes for the next draw.
    pub fn set_depth_write(&mut self, enabled: bool) {
        self.frame_mut().current_item.states.depth_write = enabled;
    }

    /// Clears `view` to `colour` (and depth) before drawing it. Persists across frames.
    pub fn set_view_clear(&mut self, view: u16, colour: [f32; 4]) {
        let index = view as usize;
        if index >= self.view_clears.len() {
            self.view_clears.resize(index + 1, None);
        }
        self.view_clears[index] = Some(colour);
    }

    /// Stops clearing `view`.
    pub fn disable_view_clear(&mut self, view: u16) {
        if let Some(clear) = self.view_clears.get_mut(view as usize) {
            *clear = None;
        }
    }

    /// Renders `view` into `frame_buffer` instead of the backbuffer, for this frame.
    pub fn set_view_frame_buffer(&mut self, view: u16, frame_buffer: FrameBufferHandle) {
        self.frame_mut().view_mut(view).frame_buffer = frame_buffer;
    }

    /// Captures the current item into `view` as a draw of `vertex_count / 3` triangles
    /// with `program`, starting `offset` indices (or vertices, when no index buffer is
    /// set) into the bound buffers. The current item is then reset.
    pub fn submit(&mut self, view: u16, program: ProgramHandle, vertex_count: u32, offset: u32) {
        let (vb, ib, decl_stride) = {
            let item = &self.frame_mut().current_item;
            (
                item.vb,
                item.ib,
                item.vertex_decl_override.as_ref().map(VertexDecl::stride),
            )
        };
        let ib_scale = self.resources.index_type(ib).map(IndexBufferType::size);
        let vb_scale = decl_stride
            .or_else(|| self.resources.vertex_decl(vb).map(VertexDecl::stride))
            .unwrap_or(0) as u32;

        if vertex_count % 3 != 0 {
            log::warn!("submit: {vertex_count} vertices do not form whole triangles");
        }
        let frame = self.frame_mut();
        let item = &mut frame.current_item;
        item.program = program;
        item.primitive_count = vertex_count / 3;
        if ib.is_valid() {
            item.ib_offset += offset * ib_scale.unwrap_or(TRANSIENT_INDEX_SIZE) as u32;
        } else {
            item.vb_offset += offset * vb_scale;
        }
        frame.submit_current_item(view);
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn copy_exact(target: Option<&mut [u8]>, source: &[u8]) -> bool {
    match target {
        Some(target) if target.len() == source.len() => {
            target.copy_from_slice(source);
            true
        }
        Some(target) => {
            log::warn!(
                "Transient write of {} bytes into a {} byte allocation",
                source.len(),
                target.len()
            );
            false
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dawn_core::event::EventBus;
    use dawn_core::renderer::{AttributeType, RendererType, VertexAttribute};
    use dawn_infra::NullRenderContext;

    fn headless() -> (Renderer, EventBus<EngineEvent>) {
        let bus = EventBus::new();
        let mut renderer = Renderer::new(bus.sender());
        renderer
            .init_with_context(RendererConfig::headless(), Box::new(NullRenderContext::new()))
            .unwrap();
        (renderer, bus)
    }

    fn submit_frame(renderer: &Renderer) -> &Frame {
        renderer.submit.as_deref().unwrap()
    }

    fn position_decl() -> VertexDecl {
        VertexDecl::begin()
            .add(VertexAttribute::Position, 3, AttributeType::Float)
            .end()
    }

    #[test]
    fn null_backend_runs_single_threaded() {
        let (mut renderer, bus) = headless();
        assert_eq!(
            renderer.state(),
            RendererState::Initialized(ThreadingMode::SingleThreaded)
        );
        renderer.frame();
        renderer.shutdown();
        assert_eq!(renderer.state(), RendererState::Terminated);
        assert!(bus.drain().is_empty());
    }

    #[test]
    fn both_frames_share_the_transient_buffers() {
        let (renderer, _bus) = headless();
        let first = submit_frame(&renderer).transient_vb_storage.handle;
        let first_ib = submit_frame(&renderer).transient_ib_storage.handle;
        assert_eq!(first.raw(), 1);
        assert_eq!(first_ib.raw(), 1);
        assert_eq!(renderer.vertex_decl(first), Some(&VertexDecl::default()));

        let second = renderer.render.as_deref().unwrap();
        assert_eq!(second.transient_vb_storage.handle, first);
        assert_eq!(second.transient_ib_storage.handle, first_ib);
    }

    #[test]
    fn headless_context_ignores_the_render_thread_request() {
        let bus = EventBus::new();
        let mut renderer = Renderer::new(bus.sender());
        let config = RendererConfig {
            backend: RendererType::Null,
            use_render_thread: true,
            ..RendererConfig::default()
        };
        renderer
            .init_with_context(config, Box::new(NullRenderContext::new()))
            .unwrap();
        assert_eq!(
            renderer.state(),
            RendererState::Initialized(ThreadingMode::SingleThreaded)
        );
        assert!(renderer.render_thread.is_none());
        renderer.frame();
        renderer.shutdown();
        assert!(bus.drain().is_empty());
    }

    #[cfg(debug_assertions)]
    #[test]
    fn double_update_is_tracked_once_per_frame() {
        let (mut renderer, _bus) = headless();
        let vb = renderer.create_vertex_buffer(&[0; 36], position_decl(), BufferUsage::Dynamic);
        renderer.frame();

        renderer.update_vertex_buffer(vb, 0, &[1; 12]);
        renderer.update_vertex_buffer(vb, 12, &[2; 12]);
        let frame = submit_frame(&renderer);
        assert_eq!(frame.updated_vertex_buffers.len(), 1);
        let updates = frame
            .commands_pre
            .iter()
            .filter(|command| {
                matches!(command, RenderCommand::UpdateVertexBuffer { handle, .. } if *handle == vb)
            })
            .count();
        assert_eq!(updates, 2);

        renderer.frame();
        assert!(submit_frame(&renderer).updated_vertex_buffers.is_empty());
    }

    #[test]
    fn second_init_is_rejected() {
        let (mut renderer, _bus) = headless();
        let err = renderer
            .init_with_context(RendererConfig::headless(), Box::new(NullRenderContext::new()))
            .unwrap_err();
        assert!(matches!(err, RenderError::AlreadyInitialized));
    }

    #[test]
    fn submit_clears_the_working_item() {
        let (mut renderer, _bus) = headless();
        let program = renderer.create_program();
        let texture = renderer.create_texture_2d(4, 4, TextureFormat::Rgba8, &[]);
        renderer.set_texture(texture, 0);
        renderer.set_uniform("tint", [1.0f32, 0.0, 0.0, 1.0]);
        renderer.submit(0, program, 3, 0);
        renderer.submit(0, program, 3, 0);

        let items = &submit_frame(&renderer).views[0].render_items;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].textures[0], texture);
        assert!(items[0].uniforms.contains_key("tint"));
        assert!(!items[1].textures[0].is_valid());
        assert!(items[1].uniforms.is_empty());
        assert_eq!(items[1].primitive_count, 1);
    }

    #[test]
    fn deletes_are_post_frame_and_drop_metadata() {
        let (mut renderer, _bus) = headless();
        renderer.frame();
        let vb = renderer.create_vertex_buffer(&[0; 24], position_decl(), BufferUsage::Static);
        assert!(renderer.vertex_decl(vb).is_some());
        renderer.delete_vertex_buffer(vb);

        assert!(renderer.vertex_decl(vb).is_none());
        let frame = submit_frame(&renderer);
        assert!(matches!(
            frame.commands_pre.last(),
            Some(RenderCommand::CreateVertexBuffer { .. })
        ));
        assert_eq!(
            frame.commands_post,
            vec![RenderCommand::DeleteVertexBuffer { handle: vb }]
        );
    }

    #[test]
    fn frame_buffer_overload_owns_one_matching_texture() {
        let (mut renderer, _bus) = headless();
        let fb = renderer.create_frame_buffer(256, 128, TextureFormat::Rgba16F);
        let texture = renderer.frame_buffer_texture(fb, 0);
        assert!(texture.is_valid());
        assert!(!renderer.frame_buffer_texture(fb, 1).is_valid());
        let info = renderer.texture_info(texture).unwrap();
        assert_eq!((info.width, info.height, info.format), (256, 128, TextureFormat::Rgba16F));

        renderer.delete_frame_buffer(fb);
        assert!(renderer.texture_info(texture).is_none());
        assert_eq!(submit_frame(&renderer).commands_post.len(), 2);
    }

    #[test]
    fn mismatched_attachments_still_create_a_frame_buffer() {
        let (mut renderer, _bus) = headless();
        let colour = renderer.create_texture_2d(64, 64, TextureFormat::Rgba8, &[]);
        let depth = renderer.create_texture_2d(32, 32, TextureFormat::D24S8, &[]);
        let fb = renderer.create_frame_buffer_from_textures(&[colour, depth]);
        assert!(fb.is_valid());
        assert_eq!(renderer.frame_buffer_texture(fb, 1), depth);

        renderer.delete_frame_buffer(fb);
        assert!(renderer.texture_info(colour).is_some(), "caller-owned textures survive");
    }

    #[test]
    fn transient_arena_is_exhausted_without_side_effects() {
        let bus = EventBus::new();
        let mut renderer = Renderer::new(bus.sender());
        let config = RendererConfig {
            transient_vb_size: 36 * 2,
            ..RendererConfig::headless()
        };
        renderer
            .init_with_context(config, Box::new(NullRenderContext::new()))
            .unwrap();

        let first = renderer.alloc_transient_vertex_buffer(3, position_decl());
        let exact = renderer.alloc_transient_vertex_buffer(3, position_decl());
        let overflow = renderer.alloc_transient_vertex_buffer(1, position_decl());
        assert!(first.is_valid() && exact.is_valid());
        assert!(!overflow.is_valid());
        assert_eq!(submit_frame(&renderer).transient_vb_storage.size(), 72);
    }

    #[test]
    fn transient_data_is_uploaded_before_drawing() {
        let (mut renderer, _bus) = headless();
        renderer.frame();

        let tvb = renderer.alloc_transient_vertex_buffer(3, position_decl());
        let vertices = [[0.0f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        assert!(renderer.write_transient_vertices(tvb, &vertices));
        let tib = renderer.alloc_transient_index_buffer(3);
        assert!(renderer.write_transient_indices(tib, &[0, 1, 2]));
        assert!(!renderer.write_transient_indices(tib, &[0, 1]));

        renderer.set_transient_vertex_buffer(tvb);
        renderer.set_transient_index_buffer(tib);
        let program = renderer.create_program();
        renderer.submit(0, program, 3, 0);
        renderer.enqueue_transient_uploads();

        let frame = submit_frame(&renderer);
        let item = &frame.views[0].render_items[0];
        assert_eq!(item.vb, frame.transient_vb_storage.handle);
        assert_eq!(item.vertex_decl_override, Some(position_decl()));
        let uploads: Vec<_> = frame
            .commands_pre
            .iter()
            .filter_map(|command| match command {
                RenderCommand::UpdateVertexBuffer { data, .. } => Some(data.len()),
                RenderCommand::UpdateIndexBuffer { data, .. } => Some(data.len()),
                _ => None,
            })
            .collect();
        assert_eq!(uploads, vec![36, 6]);
    }

    #[test]
    fn submit_offset_is_scaled_by_element_size() {
        let (mut renderer, _bus) = headless();
        let program = renderer.create_program();
        let vb = renderer.create_vertex_buffer(&[0; 120], position_decl(), BufferUsage::Static);
        let ib = renderer.create_index_buffer_u32(&[0, 1, 2, 2, 1, 0], BufferUsage::Static);

        renderer.set_vertex_buffer(vb);
        renderer.submit(0, program, 3, 2);
        renderer.set_vertex_buffer(vb);
        renderer.set_index_buffer(ib);
        renderer.submit(0, program, 3, 3);

        let items = &submit_frame(&renderer).views[0].render_items;
        assert_eq!(items[0].vb_offset, 2 * 12);
        assert_eq!(items[1].vb_offset, 0);
        assert_eq!(items[1].ib_offset, 3 * 4);
    }

    #[test]
    fn view_clear_persists_across_frames() {
        let (mut renderer, _bus) = headless();
        renderer.set_view_clear(1, [0.2, 0.3, 0.4, 1.0]);
        for _ in 0..3 {
            renderer.apply_view_clears();
            let frame = submit_frame(&renderer);
            assert_eq!(frame.views[1].clear_colour, Some([0.2, 0.3, 0.4, 1.0]));
            assert_eq!(frame.views[0].clear_colour, Some([0.0, 0.0, 0.0, 1.0]));
            renderer.frame();
        }
        renderer.disable_view_clear(1);
        renderer.apply_view_clears();
        assert_eq!(submit_frame(&renderer).views[1].clear_colour, None);
    }

    #[test]
    fn frame_resets_view_zero_target() {
        let (mut renderer, _bus) = headless();
        let fb = renderer.create_frame_buffer(8, 8, TextureFormat::Rgba8);
        renderer.set_view_frame_buffer(0, fb);
        renderer.frame();
        assert_eq!(
            submit_frame(&renderer).views[0].frame_buffer,
            FrameBufferHandle::BACKBUFFER
        );
    }
}
