//! The runtime facade: heap, class table, and scheduler behind one handle
//!
//! Compiled instructions receive `&mut Runtime` and drive everything through
//! it: allocation (with implicit collection), field access, dispatch, thread
//! and channel operations. [`Runtime::run`] is the top-level interpreter
//! loop.

use crate::class::{ClassId, ClassSpec, ClassTable, NameId, SlotImpl};
use crate::error::{fatal, RuntimeError};
use crate::gc::{run_collection, Arena, GcStats, DEFAULT_SPACE_WORDS, MIN_OBJECT_WORDS};
use crate::scheduler::{ChannelId, Communicate, Frame, Scheduler, ThreadId};
use crate::value::Value;

/// Everything a running program touches
pub struct Runtime {
    /// The collected heap
    pub arena: Arena,
    /// Class descriptors, shapes, and slot names
    pub classes: ClassTable,
    /// Threads and channels
    pub sched: Scheduler,
    gc_stats: GcStats,
}

impl Runtime {
    /// Create a runtime with the default semispace size
    pub fn new() -> Self {
        Self::with_space_words(DEFAULT_SPACE_WORDS)
    }

    /// Create a runtime with `words` per semispace
    pub fn with_space_words(words: usize) -> Self {
        Self {
            arena: Arena::new(words),
            classes: ClassTable::new(),
            sched: Scheduler::new(),
            gc_stats: GcStats::default(),
        }
    }

    // ========================================================================
    // Allocation
    // ========================================================================

    /// Allocate an instance of a class-like value.
    ///
    /// Collects if the request does not fit, and fails with `OutOfMemory`
    /// only when it still does not fit afterwards. All fields start null.
    pub fn allocate(&mut self, class_like: Value) -> Result<Value, RuntimeError> {
        // Resolve the header first: a class proxy lives in the arena and its
        // address would go stale across the collection below, but the header
        // it denotes is an immediate.
        let header = self
            .classes
            .as_class_header(class_like, &self.arena)
            .ok_or(RuntimeError::InvalidType(class_like))?;
        let size = self
            .classes
            .object_size(header)
            .ok_or(RuntimeError::InvalidType(class_like))?;
        self.allocate_raw(header, size)
    }

    /// Allocate a vector of `len` null slots
    pub fn allocate_vector(&mut self, len: usize) -> Result<Value, RuntimeError> {
        self.allocate_raw(Value::vector_header(len as u64), 1 + len)
    }

    /// Allocate a buffer of `bytes` zeroed bytes
    pub fn allocate_buffer(&mut self, bytes: usize) -> Result<Value, RuntimeError> {
        self.allocate_raw(Value::buffer_header(bytes as u64), 1 + bytes.div_ceil(8))
    }

    fn allocate_raw(&mut self, header: Value, size: usize) -> Result<Value, RuntimeError> {
        let physical = size.max(MIN_OBJECT_WORDS);
        if self.arena.needs_collection(physical) {
            self.collect();
        }
        let base = self
            .arena
            .bump_allocate(physical)
            .ok_or(RuntimeError::OutOfMemory {
                requested: physical,
                capacity: self.arena.space_words(),
            })?;

        self.arena.set_word(base, header);
        for i in 1..physical {
            self.arena.set_word(base + i, Value::NULL);
        }
        Ok(Value::object(base as u64))
    }

    /// Run a collection now
    pub fn collect(&mut self) {
        run_collection(
            &mut self.arena,
            &self.classes,
            &mut self.sched,
            &mut self.gc_stats,
        );
    }

    /// Collection counters
    pub fn gc_stats(&self) -> &GcStats {
        &self.gc_stats
    }

    // ========================================================================
    // Field access
    // ========================================================================

    /// Total size in slots of the object `obj` refers to
    pub fn object_size_of(&self, obj: Value) -> Result<usize, RuntimeError> {
        let base = obj.object_addr().ok_or(RuntimeError::InvalidType(obj))? as usize;
        self.classes
            .object_size(self.arena.word(base))
            .ok_or(RuntimeError::InvalidType(obj))
    }

    /// Read slot `index` of an object (index 0 is the header)
    pub fn object_field(&self, obj: Value, index: usize) -> Result<Value, RuntimeError> {
        let base = obj.object_addr().ok_or(RuntimeError::InvalidType(obj))? as usize;
        let size = self
            .classes
            .object_size(self.arena.word(base))
            .ok_or(RuntimeError::InvalidType(obj))?;
        if index >= size {
            return Err(RuntimeError::FieldOutOfBounds { index, size });
        }
        Ok(self.arena.word(base + index))
    }

    /// Write slot `index` of an object. The header slot is not writable.
    pub fn set_object_field(
        &mut self,
        obj: Value,
        index: usize,
        value: Value,
    ) -> Result<(), RuntimeError> {
        let base = obj.object_addr().ok_or(RuntimeError::InvalidType(obj))? as usize;
        let size = self
            .classes
            .object_size(self.arena.word(base))
            .ok_or(RuntimeError::InvalidType(obj))?;
        if index == 0 || index >= size {
            return Err(RuntimeError::FieldOutOfBounds { index, size });
        }
        self.arena.set_word(base + index, value);
        Ok(())
    }

    // ========================================================================
    // Classes and dispatch
    // ========================================================================

    /// Register a compilation unit's classes
    pub fn register_unit(&mut self, file: &str, specs: Vec<ClassSpec>) -> Vec<ClassId> {
        self.classes.register_unit(file, specs)
    }

    /// Intern a slot name
    pub fn intern(&mut self, text: &str) -> NameId {
        self.classes.intern(text)
    }

    /// Effective class of a value
    pub fn class_of(&self, v: Value) -> ClassId {
        self.classes.class_of(v, &self.arena)
    }

    /// Subtype test
    pub fn is_a(&self, v: Value, class: ClassId) -> bool {
        self.classes.is_a(v, class, &self.arena)
    }

    /// Resolve a named slot for a receiver
    pub fn dispatch(&self, receiver: Value, name: NameId) -> Result<SlotImpl, RuntimeError> {
        self.classes.dispatch(receiver, name, &self.arena)
    }

    // ========================================================================
    // Threads and channels
    // ========================================================================

    /// Spawn a thread with one initial frame
    pub fn spawn(&mut self, frame: Frame) -> Result<ThreadId, RuntimeError> {
        self.sched.spawn(frame)
    }

    /// Create a channel
    pub fn open_channel(&mut self) -> ChannelId {
        self.sched.open_channel()
    }

    /// Send on a channel from the current thread
    pub fn send(&mut self, channel: ChannelId, communicate: Communicate) -> Result<(), RuntimeError> {
        self.sched.send(channel, communicate)
    }

    /// Receive on a channel into the current thread
    pub fn receive(
        &mut self,
        channel: ChannelId,
        communicate: Communicate,
    ) -> Result<(), RuntimeError> {
        self.sched.receive(channel, communicate)
    }

    // ========================================================================
    // Interpreter loop
    // ========================================================================

    /// Run until no thread is runnable.
    ///
    /// Each scheduled thread executes instructions until it blocks on a
    /// channel, yields, or returns from its last frame. Threads still parked
    /// on channels when the queue drains are a deadlocked remainder, visible
    /// through [`Scheduler::thread_count`](crate::scheduler::Scheduler::thread_count).
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while let Some(tid) = self.sched.schedule() {
            while self.sched.current() == Some(tid) {
                let pc = self.sched.thread(tid)?.current_frame().map(|f| f.pc);
                match pc {
                    Some(pc) => pc(self, tid)?,
                    None => {
                        self.sched.finish_current()?;
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Run, treating any runtime error as fatal
    pub fn run_or_abort(&mut self) {
        if let Err(err) = self.run() {
            fatal(&err);
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}
