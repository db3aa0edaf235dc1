//! Counting [`GraphicsBackend`] used by unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use winit::dpi::PhysicalSize;

use crate::error::EffectError;

use super::backend::{
    BufferHandle, DrawOutcome, GraphicsBackend, ProgramHandle, ShaderHandle, ShaderStage,
    UniformSlot, UniformValue,
};
use super::uniforms::UNIFORM_NAMES;

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub support_checks: usize,
    pub shaders_created: usize,
    pub shaders_deleted: usize,
    pub programs_created: usize,
    pub programs_deleted: usize,
    pub buffers_created: usize,
    pub buffers_deleted: usize,
    pub unknown_deletes: usize,
    pub uniform_writes: usize,
    pub draws: usize,
    pub uploaded_vertices: Vec<[f32; 2]>,
    pub backing_sizes: Vec<PhysicalSize<u32>>,
    pub viewports: Vec<PhysicalSize<u32>>,
    uniforms: HashMap<&'static str, UniformValue>,
}

impl Counters {
    pub fn is_balanced(&self) -> bool {
        self.shaders_created == self.shaders_deleted
            && self.programs_created == self.programs_deleted
            && self.buffers_created == self.buffers_deleted
    }

    pub fn live_objects(&self) -> usize {
        (self.shaders_created - self.shaders_deleted)
            + (self.programs_created - self.programs_deleted)
            + (self.buffers_created - self.buffers_deleted)
    }

    pub fn last_uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }
}

pub(crate) struct RecordingBackend {
    counters: Rc<RefCell<Counters>>,
    fail_compile: Option<ShaderStage>,
    fail_link: bool,
    unsupported: bool,
    missing_uniforms: Vec<&'static str>,
    next_id: u32,
    live_shaders: HashSet<u32>,
    live_programs: HashSet<u32>,
    live_buffers: HashSet<u32>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            counters: Rc::new(RefCell::new(Counters::default())),
            fail_compile: None,
            fail_link: false,
            unsupported: false,
            missing_uniforms: Vec::new(),
            next_id: 1,
            live_shaders: HashSet::new(),
            live_programs: HashSet::new(),
            live_buffers: HashSet::new(),
        }
    }

    pub fn counters(&self) -> Rc<RefCell<Counters>> {
        Rc::clone(&self.counters)
    }

    pub fn fail_compile(mut self, stage: ShaderStage) -> Self {
        self.fail_compile = Some(stage);
        self
    }

    pub fn fail_link(mut self) -> Self {
        self.fail_link = true;
        self
    }

    pub fn unsupported(mut self) -> Self {
        self.unsupported = true;
        self
    }

    pub fn without_uniform(mut self, name: &'static str) -> Self {
        self.missing_uniforms.push(name);
        self
    }

    fn allocate(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsBackend for RecordingBackend {
    fn check_support(&self) -> Result<(), EffectError> {
        self.counters.borrow_mut().support_checks += 1;
        if self.unsupported {
            Err(EffectError::UnsupportedBackend("recording backend disabled".into()))
        } else {
            Ok(())
        }
    }

    fn compile_shader(&mut self, stage: ShaderStage, _source: &str) -> Result<ShaderHandle, String> {
        if self.fail_compile == Some(stage) {
            return Err(format!("ERROR: 0:1: {stage} stage rejected by recording backend"));
        }
        let id = self.allocate();
        self.live_shaders.insert(id);
        self.counters.borrow_mut().shaders_created += 1;
        Ok(ShaderHandle(id))
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        let mut counters = self.counters.borrow_mut();
        if self.live_shaders.remove(&shader.0) {
            counters.shaders_deleted += 1;
        } else {
            counters.unknown_deletes += 1;
        }
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String> {
        if self.fail_link {
            return Err("link error: varyings do not match".into());
        }
        if !self.live_shaders.contains(&vertex.0) || !self.live_shaders.contains(&fragment.0) {
            return Err("link error: unknown shader handle".into());
        }
        let id = self.allocate();
        self.live_programs.insert(id);
        self.counters.borrow_mut().programs_created += 1;
        Ok(ProgramHandle(id))
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        let mut counters = self.counters.borrow_mut();
        if self.live_programs.remove(&program.0) {
            counters.programs_deleted += 1;
        } else {
            counters.unknown_deletes += 1;
        }
    }

    fn create_vertex_buffer(&mut self, vertices: &[[f32; 2]]) -> BufferHandle {
        let id = self.allocate();
        self.live_buffers.insert(id);
        let mut counters = self.counters.borrow_mut();
        counters.buffers_created += 1;
        counters.uploaded_vertices = vertices.to_vec();
        BufferHandle(id)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        let mut counters = self.counters.borrow_mut();
        if self.live_buffers.remove(&buffer.0) {
            counters.buffers_deleted += 1;
        } else {
            counters.unknown_deletes += 1;
        }
    }

    fn uniform_slot(&mut self, program: ProgramHandle, name: &str) -> UniformSlot {
        if !self.live_programs.contains(&program.0) || self.missing_uniforms.contains(&name) {
            return UniformSlot::Unbound;
        }
        UNIFORM_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .map(|index| UniformSlot::Bound(index as u32))
            .unwrap_or(UniformSlot::Unbound)
    }

    fn write_uniform(&mut self, _program: ProgramHandle, slot: u32, value: UniformValue) {
        let mut counters = self.counters.borrow_mut();
        counters.uniform_writes += 1;
        if let Some(name) = UNIFORM_NAMES.get(slot as usize) {
            counters.uniforms.insert(name, value);
        }
    }

    fn configure_backing(&mut self, size: PhysicalSize<u32>) {
        self.counters.borrow_mut().backing_sizes.push(size);
    }

    fn draw(
        &mut self,
        program: ProgramHandle,
        buffer: BufferHandle,
        viewport: PhysicalSize<u32>,
        _vertex_count: u32,
    ) -> DrawOutcome {
        if !self.live_programs.contains(&program.0) || !self.live_buffers.contains(&buffer.0) {
            return DrawOutcome::Skipped;
        }
        let mut counters = self.counters.borrow_mut();
        counters.draws += 1;
        counters.viewports.push(viewport);
        DrawOutcome::Presented
    }
}
