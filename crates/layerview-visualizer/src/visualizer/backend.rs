//! GPU buffer API used by the 3D path
//!
//! The renderer talks to the graphics API only through `GpuBackend`. All calls
//! must happen on the thread that owns the rendering context; other threads
//! hand buffer handles back through a `ReleaseQueue`.

use layerview_core::{thread_safe_vec, RenderError, ThreadSafeVec};
use std::collections::HashMap;
use std::num::NonZeroU32;
use tracing::trace;

/// Backend-issued buffer id. Zero is never a valid handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(NonZeroU32);

impl BufferHandle {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

/// What a buffer holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Interleaved `ColorVertex` data
    Vertex,
    /// `u32` triangle indices
    Index,
}

/// Buffer and indexed-draw operations of a rendering context
pub trait GpuBackend {
    /// Whether the context has native buffer objects
    fn supports_buffer_objects(&self) -> bool;

    fn create_buffer(&mut self, kind: BufferKind) -> Result<BufferHandle, RenderError>;

    /// Replace the full contents of a buffer
    fn upload(&mut self, handle: BufferHandle, data: &[u8]) -> Result<(), RenderError>;

    /// Draw `count` indices starting at index `offset` as triangles
    fn draw_indexed_range(
        &mut self,
        vertices: BufferHandle,
        indices: BufferHandle,
        offset: usize,
        count: usize,
    ) -> Result<(), RenderError>;

    fn delete_buffer(&mut self, handle: BufferHandle);
}

/// Handles waiting to be deleted on the rendering thread.
///
/// Clones share the same queue.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue {
    pending: ThreadSafeVec<BufferHandle>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self {
            pending: thread_safe_vec(),
        }
    }

    /// Queue a handle for deletion; safe from any thread
    pub fn push(&self, handle: BufferHandle) {
        self.pending.lock().push(handle);
    }

    /// Delete every queued handle. Returns how many were released.
    pub fn drain(&self, backend: &mut dyn GpuBackend) -> usize {
        let handles: Vec<BufferHandle> = std::mem::take(&mut *self.pending.lock());
        for handle in &handles {
            backend.delete_buffer(*handle);
        }
        if !handles.is_empty() {
            trace!("Released {} deferred buffers", handles.len());
        }
        handles.len()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

/// One recorded draw call of the headless backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    pub vertices: BufferHandle,
    pub indices: BufferHandle,
    pub offset: usize,
    pub count: usize,
}

#[derive(Debug)]
struct HeadlessBuffer {
    kind: BufferKind,
    data: Vec<u8>,
}

/// CPU-side backend that keeps uploaded data and records draw calls
#[derive(Debug)]
pub struct HeadlessBackend {
    supports_buffer_objects: bool,
    next_id: u32,
    buffers: HashMap<BufferHandle, HeadlessBuffer>,
    draw_calls: Vec<DrawCall>,
    deleted: usize,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            supports_buffer_objects: true,
            next_id: 0,
            buffers: HashMap::new(),
            draw_calls: Vec::new(),
            deleted: 0,
        }
    }

    /// Backend reporting no native buffer object support
    pub fn without_buffer_objects() -> Self {
        Self {
            supports_buffer_objects: false,
            ..Self::new()
        }
    }

    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    /// Recorded draw calls, clearing the record
    pub fn take_draw_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draw_calls)
    }

    /// Number of buffers currently alive
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of buffers deleted so far
    pub fn deleted_buffers(&self) -> usize {
        self.deleted
    }

    /// Bytes stored in a buffer
    pub fn buffer_data(&self, handle: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&handle).map(|b| b.data.as_slice())
    }

    fn buffer(&self, handle: BufferHandle) -> Result<&HeadlessBuffer, RenderError> {
        self.buffers
            .get(&handle)
            .ok_or(RenderError::UnknownHandle(handle.get()))
    }
}

impl GpuBackend for HeadlessBackend {
    fn supports_buffer_objects(&self) -> bool {
        self.supports_buffer_objects
    }

    fn create_buffer(&mut self, kind: BufferKind) -> Result<BufferHandle, RenderError> {
        self.next_id = self
            .next_id
            .checked_add(1)
            .ok_or_else(|| RenderError::BufferCreation("handle space exhausted".into()))?;
        let handle = BufferHandle::new(self.next_id)
            .ok_or_else(|| RenderError::BufferCreation("invalid handle".into()))?;
        self.buffers.insert(
            handle,
            HeadlessBuffer {
                kind,
                data: Vec::new(),
            },
        );
        Ok(handle)
    }

    fn upload(&mut self, handle: BufferHandle, data: &[u8]) -> Result<(), RenderError> {
        let buffer = self
            .buffers
            .get_mut(&handle)
            .ok_or(RenderError::UnknownHandle(handle.get()))?;
        buffer.data.clear();
        buffer.data.extend_from_slice(data);
        Ok(())
    }

    fn draw_indexed_range(
        &mut self,
        vertices: BufferHandle,
        indices: BufferHandle,
        offset: usize,
        count: usize,
    ) -> Result<(), RenderError> {
        let vertex_buffer = self.buffer(vertices)?;
        let index_buffer = self.buffer(indices)?;
        if vertex_buffer.kind != BufferKind::Vertex || index_buffer.kind != BufferKind::Index {
            return Err(RenderError::Backend("buffer kinds do not match draw".into()));
        }

        let available = index_buffer.data.len() / std::mem::size_of::<u32>();
        if offset + count > available {
            return Err(RenderError::Backend(format!(
                "index range {}..{} exceeds {} indices",
                offset,
                offset + count,
                available
            )));
        }

        self.draw_calls.push(DrawCall {
            vertices,
            indices,
            offset,
            count,
        });
        Ok(())
    }

    fn delete_buffer(&mut self, handle: BufferHandle) {
        if self.buffers.remove(&handle).is_some() {
            self.deleted += 1;
        } else {
            trace!("Ignoring delete of unknown buffer {}", handle.get());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_not_a_handle() {
        assert!(BufferHandle::new(0).is_none());
        assert_eq!(BufferHandle::new(7).map(BufferHandle::get), Some(7));
    }

    #[test]
    fn test_headless_draw_validates_range() {
        let mut backend = HeadlessBackend::new();
        let vertices = backend.create_buffer(BufferKind::Vertex).unwrap();
        let indices = backend.create_buffer(BufferKind::Index).unwrap();
        backend
            .upload(indices, bytemuck::cast_slice(&[0u32, 1, 2, 2, 1, 3]))
            .unwrap();

        assert!(backend.draw_indexed_range(vertices, indices, 3, 3).is_ok());
        assert!(backend.draw_indexed_range(vertices, indices, 3, 4).is_err());
        assert!(backend.draw_indexed_range(indices, vertices, 0, 0).is_err());
        assert_eq!(backend.draw_calls().len(), 1);
    }

    #[test]
    fn test_unknown_handle() {
        let mut backend = HeadlessBackend::new();
        let bogus = BufferHandle::new(42).unwrap();
        assert_eq!(
            backend.upload(bogus, &[1, 2]),
            Err(RenderError::UnknownHandle(42))
        );
    }

    #[test]
    fn test_release_queue_drains_on_backend() {
        let mut backend = HeadlessBackend::new();
        let handle = backend.create_buffer(BufferKind::Vertex).unwrap();

        let queue = ReleaseQueue::new();
        let from_other_thread = queue.clone();
        std::thread::spawn(move || from_other_thread.push(handle))
            .join()
            .unwrap();

        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain(&mut backend), 1);
        assert!(queue.is_empty());
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(backend.deleted_buffers(), 1);
    }
}
