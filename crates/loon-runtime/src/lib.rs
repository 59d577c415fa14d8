//! # Loon Runtime
//!
//! Execution substrate for the Loon language: a NaN-boxed value
//! representation, a class/shape model with constant-time subtype tests and
//! named-slot dispatch, a semispace copying collector over an
//! index-addressed arena, and a cooperative scheduler with synchronous
//! rendezvous channels.
//!
//! ## Architecture
//!
//! - [`value`] — 64-bit tagged values; every double is a value, everything
//!   else hides in the quiet-NaN space
//! - [`class`] — class descriptors, shapes, and dispatch tables, registered
//!   per compilation unit and never collected
//! - [`gc`] — the two-space arena and the copying collector
//! - [`scheduler`] — green threads, the run queue, and channels
//! - [`runtime`] — the facade compiled instructions program against
//! - [`error`] — the error taxonomy and the fatal path

pub mod class;
pub mod error;
pub mod gc;
pub mod runtime;
pub mod scheduler;
pub mod value;

pub use class::{ClassId, ClassSpec, ClassTable, Lifecycle, NameId, SlotImpl, SlotSpec};
pub use error::{fatal, RuntimeError};
pub use gc::{Arena, GcPass, GcStats, ObjectRef};
pub use runtime::Runtime;
pub use scheduler::{ChannelId, Frame, Instruction, Scheduler, Thread, ThreadId};
pub use value::{Tag, Value};
