//! Green threads and their frame stacks

use crate::error::RuntimeError;
use crate::gc::GcPass;
use crate::runtime::Runtime;
use crate::value::Value;
use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};

/// One step of compiled code. An instruction runs to completion, updates its
/// frame's continuation via [`Thread::set_next`] (or pops the frame), and
/// returns to the scheduler.
pub type Instruction = fn(&mut Runtime, ThreadId) -> Result<(), RuntimeError>;

/// Per-frame root scanner invoked during collection.
///
/// Must relocate every local that may hold an object reference and write the
/// repaired value back. The default scans every local.
pub type StackMap = fn(&mut [Value], &mut GcPass<'_>);

/// Data-transfer half of a channel rendezvous: runs with both parties'
/// threads exclusively borrowed, sender first.
///
/// Supplied at each send/receive call; only the hook passed by the side that
/// completes the rendezvous runs. A parking thread's hook is discarded.
pub type Communicate = fn(&mut Thread, &mut Thread);

/// Per-thread frame stack budget, in local slots
pub const STACK_WORD_BUDGET: usize = 8 * 1024;

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

/// Unique thread id, never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ThreadId(u64);

impl ThreadId {
    fn next() -> Self {
        ThreadId(NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Numeric id
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// One activation record: a continuation plus its local slots
pub struct Frame {
    /// Next instruction to run when the frame is on top
    pub pc: Instruction,
    /// Root scanner for this frame's locals
    pub stack_map: StackMap,
    /// Local slots, all initially null
    pub locals: Vec<Value>,
}

impl Frame {
    /// Create a frame with `locals` null-initialized slots and the
    /// scan-everything default stack map
    pub fn new(pc: Instruction, locals: usize) -> Self {
        Self {
            pc,
            stack_map: crate::gc::scan_all_locals,
            locals: vec![Value::NULL; locals],
        }
    }

    /// Create a frame with a precise stack map
    pub fn with_stack_map(pc: Instruction, locals: usize, stack_map: StackMap) -> Self {
        Self {
            pc,
            stack_map,
            locals: vec![Value::NULL; locals],
        }
    }
}

/// A green thread: a bounded stack of frames
pub struct Thread {
    id: ThreadId,
    frames: Vec<Frame>,
    stack_words: usize,
}

impl Thread {
    /// Create an empty thread with a fresh id
    pub fn new() -> Self {
        Self {
            id: ThreadId::next(),
            frames: Vec::new(),
            stack_words: 0,
        }
    }

    /// This thread's id
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Push an activation, charging its locals against the stack budget
    pub fn push_frame(&mut self, frame: Frame) -> Result<(), RuntimeError> {
        let requested = self.stack_words + frame.locals.len();
        if requested > STACK_WORD_BUDGET {
            return Err(RuntimeError::StackOverflow {
                requested,
                limit: STACK_WORD_BUDGET,
            });
        }
        self.stack_words = requested;
        self.frames.push(frame);
        Ok(())
    }

    /// Pop the newest activation
    pub fn pop_frame(&mut self) -> Option<Frame> {
        let frame = self.frames.pop()?;
        self.stack_words -= frame.locals.len();
        Some(frame)
    }

    /// Newest frame
    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Newest frame, mutably
    pub fn current_frame_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// Set the newest frame's continuation
    pub fn set_next(&mut self, pc: Instruction) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pc = pc;
        }
    }

    /// True once every frame has returned
    pub fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }

    /// Local slots held across all frames
    pub fn stack_words(&self) -> usize {
        self.stack_words
    }

    /// All frames, oldest first (callers reverse for newest-first scans)
    pub fn frames_mut(&mut self) -> slice::IterMut<'_, Frame> {
        self.frames.iter_mut()
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}
