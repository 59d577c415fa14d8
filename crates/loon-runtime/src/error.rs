//! Runtime error taxonomy and the fatal-error path
//!
//! Every recoverable contract violation surfaces as a [`RuntimeError`] and is
//! propagated with `Result`. Allocation-class failures (`InvalidType`,
//! `OutOfMemory`) cannot be resumed from and are expected to reach [`fatal`];
//! a malformed header met during collection is an assertion failure (panic),
//! not an error value, because it means the generated stack maps or lifecycle
//! visitors are wrong.

use crate::scheduler::{ChannelId, ThreadId};
use crate::value::Value;

/// Errors raised by the runtime core
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    /// Allocation requested against a value that is not class-like
    #[error("invalid type: {0:?} is not class-like")]
    InvalidType(Value),

    /// Allocation still does not fit after a full collection
    #[error("out of memory: {requested} words requested, a space holds {capacity}")]
    OutOfMemory {
        /// Words the failing allocation needed
        requested: usize,
        /// Words per semispace
        capacity: usize,
    },

    /// Frame push would exceed the thread's stack budget
    #[error("thread stack overflow: {requested} words requested, budget is {limit}")]
    StackOverflow {
        /// Words the thread would hold after the push
        requested: usize,
        /// Per-thread budget in words
        limit: usize,
    },

    /// A blocking operation was attempted with no current thread
    #[error("no thread is current")]
    NoCurrentThread,

    /// Thread id not held by the scheduler
    #[error("unknown thread {0:?}")]
    UnknownThread(ThreadId),

    /// Channel id not held by the scheduler
    #[error("unknown channel {0:?}")]
    UnknownChannel(ChannelId),

    /// Named-slot dispatch found no slot for the receiver's class
    #[error("no slot named `{name}` reachable from class {class}")]
    UnknownSlot {
        /// Receiver's class id
        class: u32,
        /// Slot name text
        name: String,
    },

    /// Object field access outside the object's size
    #[error("field index {index} out of bounds for object of {size} slots")]
    FieldOutOfBounds {
        /// Requested slot index
        index: usize,
        /// Object size in slots, header included
        size: usize,
    },
}

/// Print a diagnostic and halt the whole process.
///
/// There is no partial failure: a fatal allocation or GC fault in one thread
/// aborts the runtime, since heap corruption cannot be contained to a single
/// thread's view of shared memory.
pub fn fatal(err: &RuntimeError) -> ! {
    eprintln!("fatal runtime error: {err}");
    std::process::exit(1);
}
