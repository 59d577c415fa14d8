//! Class model: descriptors, shapes, named-slot dispatch
//!
//! Class descriptors are long-lived records in the [`ClassTable`] — they are
//! registered once when a compilation unit loads and never collected. A class
//! reference is a `Class`-tagged [`Value`](crate::value::Value) carrying the
//! class id, so descriptors stay uniformly addressable from object headers
//! and slots without living inside the collected arena.

mod registry;
mod shape;

pub use registry::{Builtins, ClassTable, UnitId};
pub use shape::{Shape, ShapeId, SlotOffset};

use crate::error::RuntimeError;
use crate::gc::{GcPass, ObjectRef};
use crate::runtime::Runtime;
use crate::scheduler::ThreadId;
use crate::value::Value;

/// Index of a class in the [`ClassTable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    /// Numeric id
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// The class reference value for this class
    pub fn to_value(self) -> Value {
        Value::class_ref(self.0)
    }

    /// Recover a class id from a class reference value
    pub fn from_value(v: Value) -> Option<ClassId> {
        v.class_id().map(ClassId)
    }
}

/// Interned slot name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameId(pub(crate) u32);

/// A compiled slot implementation, emitted by the code generator.
///
/// Shares the instruction calling convention: the implementation runs inside
/// the given thread's current frame.
pub type SlotImpl = fn(&mut Runtime, ThreadId) -> Result<(), RuntimeError>;

/// Per-class visitor invoked during the collector's scan phase.
///
/// Must relocate every reference-bearing field of the object (via
/// [`GcPass::relocate_field`]) and leave all other fields untouched. Buffer
/// objects are skipped by the core and never reach a visitor.
pub type Visit = fn(ObjectRef, &mut GcPass<'_>);

/// Lifecycle hooks supplied per class by the code generator
#[derive(Debug, Clone, Copy)]
pub struct Lifecycle {
    /// Scan-phase field visitor
    pub visit: Visit,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self {
            visit: crate::gc::visit_all_fields,
        }
    }
}

/// A named slot as supplied by the loader
#[derive(Clone, Copy)]
pub struct SlotSpec {
    /// Interned slot name
    pub name: NameId,
    /// Implementation entry point
    pub body: SlotImpl,
}

/// A resolved slot entry in a class's dispatch table
#[derive(Clone, Copy)]
pub struct Slot {
    /// Interned slot name
    pub name: NameId,
    /// Implementation entry point
    pub body: SlotImpl,
    /// Class that supplied this implementation (differs from the holder for
    /// inherited slots)
    pub defined_in: ClassId,
}

/// Class descriptor as supplied by the loader, one per class per unit
pub struct ClassSpec {
    /// Debug name
    pub name: String,
    /// Ancestor class, `None` for a hierarchy root
    pub ancestor: Option<ClassId>,
    /// Lifecycle hooks; `None` selects the scan-every-field default
    pub lifecycle: Option<Lifecycle>,
    /// Number of fields this class adds (excluding the header slot and
    /// inherited fields)
    pub field_count: usize,
    /// Slots this class defines or overrides
    pub slots: Vec<SlotSpec>,
}

/// A registered class descriptor
pub struct ClassDef {
    /// This class's id
    pub id: ClassId,
    /// Debug name
    pub name: String,
    /// Defining unit
    pub unit: UnitId,
    /// Ancestor class, `None` for a hierarchy root
    pub ancestor: Option<ClassId>,
    /// Precomputed ancestry/offset summary
    pub shape: ShapeId,
    /// Lifecycle hooks
    pub lifecycle: Lifecycle,
    /// Slot index of the first field this class added
    pub field_start: usize,
    /// Total instance size in slots, header included
    pub field_count: usize,
    /// Dispatch table: inherited entries first, own entries overriding or
    /// appended
    pub slots: Vec<Slot>,
}
