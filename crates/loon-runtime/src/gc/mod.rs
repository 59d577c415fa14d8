//! Semispace copying collector over an index-addressed arena
//!
//! The arena is a single word vector split into two halves. Allocation bumps
//! a cursor through the active half; collection copies the live graph into
//! the other half (roots first, then a Cheney finger scan) and flips which
//! half is active. Object references are word indices into the vector, never
//! raw pointers, so copied objects are repaired by rewriting indices.

mod arena;
mod collector;

pub use arena::Arena;
pub use collector::{run_collection, scan_all_locals, visit_all_fields, GcPass, GcStats, ObjectRef};

/// Smallest physical footprint of any heap object, in slots.
///
/// A relocated object is overwritten with a two-slot forwarding stub (header
/// plus forward index), so even a header-only object reserves two slots.
pub const MIN_OBJECT_WORDS: usize = 2;

/// Default words per semispace (1 MiB of payload per half)
pub const DEFAULT_SPACE_WORDS: usize = 128 * 1024;
