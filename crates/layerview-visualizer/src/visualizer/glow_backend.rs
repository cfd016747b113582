//! # OpenGL Backend
//!
//! `GpuBackend` over an OpenGL 3.3 core context through `glow`. Layer buffers
//! hold interleaved `ColorVertex` data and are drawn with a small
//! vertex-color shader lit by one directional light.
//!
//! This is the backend a windowed host hands to `GCodeRenderer::render_3d`
//! once it owns a current GL context; tests and the CLI use `HeadlessBackend`.

use super::backend::{BufferHandle, BufferKind, GpuBackend};
use super::mesh::ColorVertex;
use glam::{Mat4, Vec3};
use glow::HasContext;
use layerview_core::RenderError;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, warn};

pub const LAYER_VERTEX_SHADER: &str = r#"
#version 330 core

layout (location = 0) in vec3 position;
layout (location = 1) in vec3 normal;
layout (location = 2) in vec4 color;

uniform mat4 view_projection;

out vec3 frag_normal;
out vec4 frag_color;

void main() {
    gl_Position = view_projection * vec4(position, 1.0);
    frag_normal = normal;
    frag_color = color;
}
"#;

pub const LAYER_FRAGMENT_SHADER: &str = r#"
#version 330 core

in vec3 frag_normal;
in vec4 frag_color;

uniform vec3 light_direction;
uniform float ambient;

out vec4 FragColor;

void main() {
    float diffuse = max(dot(normalize(frag_normal), normalize(-light_direction)), 0.0);
    float shade = ambient + (1.0 - ambient) * diffuse;
    FragColor = vec4(frag_color.rgb * shade, frag_color.a);
}
"#;

/// Byte offsets of the `ColorVertex` attributes bound at locations 0..=2
const POSITION_OFFSET: i32 = 0;
const NORMAL_OFFSET: i32 = 12;
const COLOR_OFFSET: i32 = 24;

#[derive(Debug)]
struct GlBuffer {
    buffer: glow::Buffer,
    kind: BufferKind,
}

/// OpenGL implementation of `GpuBackend`
pub struct GlowBackend {
    gl: Rc<glow::Context>,
    program: glow::Program,
    vao: glow::VertexArray,
    buffers: HashMap<BufferHandle, GlBuffer>,
    next_id: u32,
    view_projection: Mat4,
    light_direction: Vec3,
    ambient: f32,
}

impl GlowBackend {
    /// Compile the layer shader and set up vertex state
    pub fn new(gl: Rc<glow::Context>) -> Result<Self, RenderError> {
        let program = create_shader_program(&gl, LAYER_VERTEX_SHADER, LAYER_FRAGMENT_SHADER)?;
        let vao = unsafe {
            match gl.create_vertex_array() {
                Ok(vao) => vao,
                Err(e) => {
                    gl.delete_program(program);
                    return Err(RenderError::BufferCreation(e));
                }
            }
        };
        debug!("OpenGL layer backend ready");

        Ok(Self {
            gl,
            program,
            vao,
            buffers: HashMap::new(),
            next_id: 0,
            view_projection: Mat4::IDENTITY,
            light_direction: Vec3::new(-0.3, -0.5, -1.0).normalize(),
            ambient: 0.35,
        })
    }

    /// Camera transform applied to every draw
    pub fn set_view_projection(&mut self, view_projection: Mat4) {
        self.view_projection = view_projection;
    }

    pub fn set_lighting(&mut self, light_direction: Vec3, ambient: f32) {
        self.light_direction = light_direction.normalize_or_zero();
        self.ambient = ambient.clamp(0.0, 1.0);
    }

    fn gl_buffer(&self, handle: BufferHandle, kind: BufferKind) -> Result<glow::Buffer, RenderError> {
        match self.buffers.get(&handle) {
            Some(b) if b.kind == kind => Ok(b.buffer),
            Some(_) => Err(RenderError::Backend(format!(
                "buffer {} is not a {:?} buffer",
                handle.get(),
                kind
            ))),
            None => Err(RenderError::UnknownHandle(handle.get())),
        }
    }

    fn apply_uniforms(&self) {
        unsafe {
            if let Some(loc) = self.gl.get_uniform_location(self.program, "view_projection") {
                self.gl
                    .uniform_matrix_4_f32_slice(Some(&loc), false, &self.view_projection.to_cols_array());
            }
            if let Some(loc) = self.gl.get_uniform_location(self.program, "light_direction") {
                let d = self.light_direction;
                self.gl.uniform_3_f32(Some(&loc), d.x, d.y, d.z);
            }
            if let Some(loc) = self.gl.get_uniform_location(self.program, "ambient") {
                self.gl.uniform_1_f32(Some(&loc), self.ambient);
            }
        }
    }
}

impl GpuBackend for GlowBackend {
    fn supports_buffer_objects(&self) -> bool {
        true
    }

    fn create_buffer(&mut self, kind: BufferKind) -> Result<BufferHandle, RenderError> {
        let buffer = unsafe { self.gl.create_buffer() }.map_err(RenderError::BufferCreation)?;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        let handle = BufferHandle::new(self.next_id)
            .ok_or_else(|| RenderError::BufferCreation("invalid handle".into()))?;
        self.buffers.insert(handle, GlBuffer { buffer, kind });
        Ok(handle)
    }

    fn upload(&mut self, handle: BufferHandle, data: &[u8]) -> Result<(), RenderError> {
        let entry = self
            .buffers
            .get(&handle)
            .ok_or(RenderError::UnknownHandle(handle.get()))?;
        let target = match entry.kind {
            BufferKind::Vertex => glow::ARRAY_BUFFER,
            BufferKind::Index => glow::ELEMENT_ARRAY_BUFFER,
        };

        unsafe {
            // element buffers bind to the vertex array, keep ours current
            self.gl.bind_vertex_array(Some(self.vao));
            self.gl.bind_buffer(target, Some(entry.buffer));
            self.gl.buffer_data_u8_slice(target, data, glow::STATIC_DRAW);
            self.gl.bind_buffer(target, None);
            self.gl.bind_vertex_array(None);
        }
        Ok(())
    }

    fn draw_indexed_range(
        &mut self,
        vertices: BufferHandle,
        indices: BufferHandle,
        offset: usize,
        count: usize,
    ) -> Result<(), RenderError> {
        let vbo = self.gl_buffer(vertices, BufferKind::Vertex)?;
        let ebo = self.gl_buffer(indices, BufferKind::Index)?;
        let count = i32::try_from(count)
            .map_err(|_| RenderError::Backend(format!("index count {} too large", count)))?;
        let byte_offset = i32::try_from(offset * std::mem::size_of::<u32>())
            .map_err(|_| RenderError::Backend(format!("index offset {} too large", offset)))?;

        unsafe {
            self.gl.use_program(Some(self.program));
            self.apply_uniforms();

            self.gl.bind_vertex_array(Some(self.vao));
            self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));

            let stride = ColorVertex::STRIDE;
            // Position (location 0)
            self.gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, POSITION_OFFSET);
            self.gl.enable_vertex_attrib_array(0);
            // Normal (location 1)
            self.gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, NORMAL_OFFSET);
            self.gl.enable_vertex_attrib_array(1);
            // Color (location 2)
            self.gl.vertex_attrib_pointer_f32(2, 4, glow::FLOAT, false, stride, COLOR_OFFSET);
            self.gl.enable_vertex_attrib_array(2);

            self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));

            self.gl.enable(glow::DEPTH_TEST);
            self.gl.enable(glow::BLEND);
            self.gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            self.gl
                .draw_elements(glow::TRIANGLES, count, glow::UNSIGNED_INT, byte_offset);

            self.gl.disable(glow::BLEND);
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
            self.gl.use_program(None);
        }
        Ok(())
    }

    fn delete_buffer(&mut self, handle: BufferHandle) {
        match self.buffers.remove(&handle) {
            Some(entry) => unsafe { self.gl.delete_buffer(entry.buffer) },
            None => warn!("Delete of unknown GL buffer {}", handle.get()),
        }
    }
}

impl Drop for GlowBackend {
    fn drop(&mut self) {
        unsafe {
            for (_, entry) in self.buffers.drain() {
                self.gl.delete_buffer(entry.buffer);
            }
            self.gl.delete_vertex_array(self.vao);
            self.gl.delete_program(self.program);
        }
    }
}

fn create_shader_program(
    gl: &glow::Context,
    vs_source: &str,
    fs_source: &str,
) -> Result<glow::Program, RenderError> {
    unsafe {
        let vs = gl
            .create_shader(glow::VERTEX_SHADER)
            .map_err(RenderError::Shader)?;
        gl.shader_source(vs, vs_source);
        gl.compile_shader(vs);

        if !gl.get_shader_compile_status(vs) {
            let info = gl.get_shader_info_log(vs);
            gl.delete_shader(vs);
            return Err(RenderError::Shader(format!("Vertex shader: {}", info)));
        }

        let fs = match gl.create_shader(glow::FRAGMENT_SHADER) {
            Ok(fs) => fs,
            Err(e) => {
                gl.delete_shader(vs);
                return Err(RenderError::Shader(e));
            }
        };
        gl.shader_source(fs, fs_source);
        gl.compile_shader(fs);

        if !gl.get_shader_compile_status(fs) {
            let info = gl.get_shader_info_log(fs);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            return Err(RenderError::Shader(format!("Fragment shader: {}", info)));
        }

        let program = match gl.create_program() {
            Ok(program) => program,
            Err(e) => {
                gl.delete_shader(vs);
                gl.delete_shader(fs);
                return Err(RenderError::Shader(e));
            }
        };
        gl.attach_shader(program, vs);
        gl.attach_shader(program, fs);
        gl.link_program(program);

        if !gl.get_program_link_status(program) {
            let info = gl.get_program_info_log(program);
            gl.delete_shader(vs);
            gl.delete_shader(fs);
            gl.delete_program(program);
            return Err(RenderError::Shader(format!("Program linking: {}", info)));
        }

        gl.delete_shader(vs);
        gl.delete_shader(fs);

        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_attribute_offsets_match_vertex_layout() {
        assert_eq!(POSITION_OFFSET as usize, offset_of!(ColorVertex, position));
        assert_eq!(NORMAL_OFFSET as usize, offset_of!(ColorVertex, normal));
        assert_eq!(COLOR_OFFSET as usize, offset_of!(ColorVertex, color));
        assert_eq!(ColorVertex::STRIDE as usize, size_of::<ColorVertex>());
    }

    #[test]
    fn test_shaders_declare_vertex_attributes() {
        for (location, attribute) in ["position", "normal", "color"].iter().enumerate() {
            let declaration = format!("layout (location = {}) in", location);
            let line = LAYER_VERTEX_SHADER
                .lines()
                .find(|l| l.starts_with(&declaration))
                .unwrap();
            assert!(line.ends_with(&format!("{};", attribute)));
        }
        for uniform in ["view_projection", "light_direction", "ambient"] {
            assert!(
                LAYER_VERTEX_SHADER.contains(uniform) || LAYER_FRAGMENT_SHADER.contains(uniform)
            );
        }
    }
}
