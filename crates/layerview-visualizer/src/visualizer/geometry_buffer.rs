//! Vertex/index buffer pair holding one layer's geometry

use super::backend::{BufferHandle, BufferKind, GpuBackend, ReleaseQueue};
use super::mesh::LayerMesh;
use layerview_core::RenderError;
use tracing::trace;

/// Owns one vertex buffer and one index buffer on the GPU.
///
/// `release` frees both handles exactly once. A buffer dropped without being
/// released queues its handles on the `ReleaseQueue` so the rendering thread
/// can delete them later.
#[derive(Debug)]
pub struct GeometryBuffer {
    vertices: Option<BufferHandle>,
    indices: Option<BufferHandle>,
    index_count: usize,
    release_queue: ReleaseQueue,
}

impl GeometryBuffer {
    pub fn new(backend: &mut dyn GpuBackend, release_queue: ReleaseQueue) -> Result<Self, RenderError> {
        let vertices = backend.create_buffer(BufferKind::Vertex)?;
        let indices = match backend.create_buffer(BufferKind::Index) {
            Ok(handle) => handle,
            Err(e) => {
                backend.delete_buffer(vertices);
                return Err(e);
            }
        };

        Ok(Self {
            vertices: Some(vertices),
            indices: Some(indices),
            index_count: 0,
            release_queue,
        })
    }

    /// Create a buffer pair and upload `mesh` into it
    pub fn from_mesh(
        backend: &mut dyn GpuBackend,
        release_queue: ReleaseQueue,
        mesh: &LayerMesh,
    ) -> Result<Self, RenderError> {
        let mut buffer = Self::new(backend, release_queue)?;
        if let Err(e) = buffer.upload_mesh(backend, mesh) {
            buffer.release(backend);
            return Err(e);
        }
        Ok(buffer)
    }

    fn upload_mesh(&mut self, backend: &mut dyn GpuBackend, mesh: &LayerMesh) -> Result<(), RenderError> {
        self.set_vertex_data(backend, mesh.vertex_bytes())?;
        self.set_index_data(backend, mesh.indices())
    }

    /// Replace the vertex data
    pub fn set_vertex_data(&mut self, backend: &mut dyn GpuBackend, data: &[u8]) -> Result<(), RenderError> {
        let handle = self.vertices.ok_or_else(released)?;
        backend.upload(handle, data)
    }

    /// Replace the index data
    pub fn set_index_data(&mut self, backend: &mut dyn GpuBackend, indices: &[u32]) -> Result<(), RenderError> {
        let handle = self.indices.ok_or_else(released)?;
        backend.upload(handle, bytemuck::cast_slice(indices))?;
        self.index_count = indices.len();
        Ok(())
    }

    /// Draw indices `[offset, offset + count)`, clamped to the uploaded data
    pub fn render_range(
        &self,
        backend: &mut dyn GpuBackend,
        offset: usize,
        count: usize,
    ) -> Result<(), RenderError> {
        let (Some(vertices), Some(indices)) = (self.vertices, self.indices) else {
            return Err(released());
        };

        let offset = offset.min(self.index_count);
        let count = count.min(self.index_count - offset);
        if count == 0 {
            return Ok(());
        }

        trace!("Drawing indices {}..{}", offset, offset + count);
        backend.draw_indexed_range(vertices, indices, offset, count)
    }

    pub fn index_count(&self) -> usize {
        self.index_count
    }

    pub fn is_released(&self) -> bool {
        self.vertices.is_none() && self.indices.is_none()
    }

    /// Delete both GPU buffers. Calling it again does nothing.
    pub fn release(&mut self, backend: &mut dyn GpuBackend) {
        if let Some(handle) = self.vertices.take() {
            backend.delete_buffer(handle);
        }
        if let Some(handle) = self.indices.take() {
            backend.delete_buffer(handle);
        }
        self.index_count = 0;
    }
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        for handle in [self.vertices.take(), self.indices.take()].into_iter().flatten() {
            self.release_queue.push(handle);
        }
    }
}

fn released() -> RenderError {
    RenderError::Backend("geometry buffer already released".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualizer::backend::HeadlessBackend;
    use glam::DVec3;
    use layerview_core::Rgba;

    fn sample_mesh() -> LayerMesh {
        let mut mesh = LayerMesh::new();
        mesh.add_cylinder(DVec3::ZERO, DVec3::X, 0.2, 0.2, 6, Rgba::ORANGE);
        mesh
    }

    #[test]
    fn test_upload_and_render_range() {
        let mut backend = HeadlessBackend::new();
        let buffer = GeometryBuffer::from_mesh(&mut backend, ReleaseQueue::new(), &sample_mesh()).unwrap();

        assert_eq!(buffer.index_count(), 144);
        buffer.render_range(&mut backend, 12, 24).unwrap();
        buffer.render_range(&mut backend, 140, 100).unwrap();
        buffer.render_range(&mut backend, 500, 10).unwrap();

        let calls = backend.draw_calls();
        assert_eq!(calls.len(), 2);
        assert_eq!((calls[0].offset, calls[0].count), (12, 24));
        assert_eq!((calls[1].offset, calls[1].count), (140, 4));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut backend = HeadlessBackend::new();
        let queue = ReleaseQueue::new();
        let mut buffer = GeometryBuffer::new(&mut backend, queue.clone()).unwrap();

        buffer.release(&mut backend);
        buffer.release(&mut backend);
        drop(buffer);

        assert_eq!(backend.deleted_buffers(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_render_after_release_fails() {
        let mut backend = HeadlessBackend::new();
        let mut buffer = GeometryBuffer::new(&mut backend, ReleaseQueue::new()).unwrap();
        buffer.release(&mut backend);
        assert!(buffer.is_released());
        assert!(buffer.render_range(&mut backend, 0, 3).is_err());
    }

    #[test]
    fn test_drop_defers_release() {
        let mut backend = HeadlessBackend::new();
        let queue = ReleaseQueue::new();
        let buffer = GeometryBuffer::new(&mut backend, queue.clone()).unwrap();
        drop(buffer);

        assert_eq!(queue.len(), 2);
        assert_eq!(backend.live_buffers(), 2);
        queue.drain(&mut backend);
        assert_eq!(backend.live_buffers(), 0);
    }
}
