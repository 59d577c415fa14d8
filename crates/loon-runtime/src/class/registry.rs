//! Class table: unit registration, builtins, interning, and dispatch

use super::shape::{Shape, ShapeId, SlotOffset};
use super::{ClassDef, ClassId, ClassSpec, Lifecycle, NameId, Slot, SlotImpl};
use crate::error::RuntimeError;
use crate::gc::Arena;
use crate::value::{Tag, Value};
use rustc_hash::FxHashMap;

/// Index of a compilation unit in the class table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitId(pub(crate) u32);

/// A loaded compilation unit: the permanent root table for its classes
pub struct Unit {
    /// Source file the unit was compiled from
    pub file: String,
    /// Classes the unit registered
    pub classes: Vec<ClassId>,
}

/// Builtin classes installed at table construction
#[derive(Debug, Clone, Copy)]
pub struct Builtins {
    /// Root of the hierarchy
    pub object: ClassId,
    /// Metaclass: the class of every class-like value
    pub class: ClassId,
    /// Forwarding sentinel written over relocated objects
    pub forwarded: ClassId,
    /// Class of the null literal
    pub null: ClassId,
    /// Class of the boolean literals
    pub boolean: ClassId,
    /// Class of floats and the NaN literal
    pub number: ClassId,
    /// Class of vector objects
    pub vector: ClassId,
    /// Class of buffer objects
    pub buffer: ClassId,
}

struct NameRecord {
    text: String,
    offsets: Vec<SlotOffset>,
}

/// Registry of every class, shape, slot name, and unit in the runtime.
///
/// Descriptors are allocated once when a unit loads and never freed.
pub struct ClassTable {
    classes: Vec<ClassDef>,
    shapes: Vec<Shape>,
    names: Vec<NameRecord>,
    name_ids: FxHashMap<String, NameId>,
    units: Vec<Unit>,
    builtins: Builtins,
}

impl ClassTable {
    /// Create a table with the builtin classes installed
    pub fn new() -> Self {
        let mut table = Self {
            classes: Vec::new(),
            shapes: Vec::new(),
            names: Vec::new(),
            name_ids: FxHashMap::default(),
            units: vec![Unit {
                file: "<core>".to_string(),
                classes: Vec::new(),
            }],
            // Placeholder ids, rewritten below once the classes exist.
            builtins: Builtins {
                object: ClassId(0),
                class: ClassId(0),
                forwarded: ClassId(0),
                null: ClassId(0),
                boolean: ClassId(0),
                number: ClassId(0),
                vector: ClassId(0),
                buffer: ClassId(0),
            },
        };

        let core = UnitId(0);
        let object = table.add_class(core, builtin_spec("Object", None, 0));
        // Class instances proxy a class: slot 1 holds the proxied reference.
        let class = table.add_class(core, builtin_spec("Class", Some(object), 1));
        // Forwarded stubs hold the new location in slot 1.
        let forwarded = table.add_class(core, builtin_spec("Forwarded", Some(object), 1));
        let null = table.add_class(core, builtin_spec("Null", Some(object), 0));
        let boolean = table.add_class(core, builtin_spec("Boolean", Some(object), 0));
        let number = table.add_class(core, builtin_spec("Number", Some(object), 0));
        let vector = table.add_class(core, builtin_spec("Vector", Some(object), 0));
        let buffer = table.add_class(core, builtin_spec("Buffer", Some(object), 0));

        table.builtins = Builtins {
            object,
            class,
            forwarded,
            null,
            boolean,
            number,
            vector,
            buffer,
        };
        table
    }

    /// Builtin class ids
    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Look up a class definition
    pub fn get(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.0 as usize]
    }

    /// Look up a shape
    pub fn shape(&self, id: ShapeId) -> &Shape {
        &self.shapes[id.0 as usize]
    }

    /// Number of registered classes
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Registered units
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// Intern a slot name
    pub fn intern(&mut self, text: &str) -> NameId {
        if let Some(&id) = self.name_ids.get(text) {
            return id;
        }
        let id = NameId(self.names.len() as u32);
        self.names.push(NameRecord {
            text: text.to_string(),
            offsets: Vec::new(),
        });
        self.name_ids.insert(text.to_string(), id);
        id
    }

    /// Text of an interned name
    pub fn name_text(&self, id: NameId) -> &str {
        &self.names[id.0 as usize].text
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a compilation unit's classes.
    ///
    /// Ancestor ids must refer to already-registered classes; a bad id is a
    /// loader defect and panics.
    pub fn register_unit(&mut self, file: &str, specs: Vec<ClassSpec>) -> Vec<ClassId> {
        let unit = UnitId(self.units.len() as u32);
        self.units.push(Unit {
            file: file.to_string(),
            classes: Vec::new(),
        });
        let ids: Vec<ClassId> = specs
            .into_iter()
            .map(|spec| self.add_class(unit, spec))
            .collect();
        self.units[unit.0 as usize].classes = ids.clone();
        ids
    }

    fn add_class(&mut self, unit: UnitId, spec: ClassSpec) -> ClassId {
        let id = ClassId(self.classes.len() as u32);

        let (field_start, mut slots, parent_shape) = match spec.ancestor {
            Some(a) => {
                let parent = &self.classes[a.0 as usize];
                (
                    parent.field_count,
                    parent.slots.clone(),
                    Some(parent.shape),
                )
            }
            // Slot 0 is the header, so a root's own fields start at 1.
            None => (1, Vec::new(), None),
        };

        let shape_id = ShapeId(self.shapes.len() as u32);
        let shape = Shape::derive(id, parent_shape.map(|s| &self.shapes[s.0 as usize]));
        self.shapes.push(shape);

        // Own definitions override an inherited slot of the same name in
        // place, keeping the inherited offset; new names append.
        for s in spec.slots {
            let slot = Slot {
                name: s.name,
                body: s.body,
                defined_in: id,
            };
            match slots.iter().position(|e| e.name == s.name) {
                Some(i) => slots[i] = slot,
                None => slots.push(slot),
            }
        }

        // Publish this shape's offset for every reachable name.
        for (offset, slot) in slots.iter().enumerate() {
            self.names[slot.name.0 as usize].offsets.push(SlotOffset {
                shape: shape_id,
                offset,
            });
        }

        self.classes.push(ClassDef {
            id,
            name: spec.name,
            unit,
            ancestor: spec.ancestor,
            shape: shape_id,
            lifecycle: spec.lifecycle.unwrap_or_default(),
            field_start,
            field_count: field_start + spec.field_count,
            slots,
        });
        id
    }

    // ========================================================================
    // Sizing and classification
    // ========================================================================

    /// Total object size in slots (header included) for a class-like header,
    /// `None` if the header is not a recognized class-like value
    pub fn object_size(&self, header: Value) -> Option<usize> {
        match header.tag()? {
            Tag::Class => {
                let id = header.class_id()? as usize;
                self.classes.get(id).map(|c| c.field_count)
            }
            Tag::Vector => Some(1 + header.payload()? as usize),
            Tag::Buffer => Some(1 + (header.payload()? as usize).div_ceil(8)),
            _ => None,
        }
    }

    /// Resolve a class-like value to the header it denotes: class references
    /// and vector/buffer length headers pass through; a class proxy object
    /// (instance of the `Class` metaclass) yields the reference in its
    /// slot 1.
    pub fn as_class_header(&self, v: Value, arena: &Arena) -> Option<Value> {
        match v.tag()? {
            Tag::Class | Tag::Vector | Tag::Buffer => Some(v),
            Tag::ObjectLo | Tag::ObjectHi => {
                let addr = v.object_addr()? as usize;
                if arena.word(addr).class_id() != Some(self.builtins.class.0) {
                    return None;
                }
                let proxied = arena.word(addr + 1);
                match proxied.tag()? {
                    Tag::Class | Tag::Vector | Tag::Buffer => Some(proxied),
                    _ => None,
                }
            }
            Tag::Literal => None,
        }
    }

    /// True if `v` can stand for a type in an allocation request
    pub fn is_class_like(&self, v: Value, arena: &Arena) -> bool {
        self.as_class_header(v, arena).is_some()
    }

    /// Effective class of a value for dispatch
    pub fn class_of(&self, v: Value, arena: &Arena) -> ClassId {
        if v.is_number() {
            return self.builtins.number;
        }
        if self.is_class_like(v, arena) {
            return self.builtins.class;
        }
        if v.is_null() {
            return self.builtins.null;
        }
        if v.is_boolean() {
            return self.builtins.boolean;
        }
        if let Some(addr) = v.object_addr() {
            let header = arena.word(addr as usize);
            return match header.tag() {
                Some(Tag::Vector) => self.builtins.vector,
                Some(Tag::Buffer) => self.builtins.buffer,
                Some(Tag::Class) => {
                    let id = header.class_id().unwrap_or(u32::MAX) as usize;
                    if id >= self.classes.len() {
                        panic!("malformed object header {:?} at {:#x}", header, addr);
                    }
                    ClassId(id as u32)
                }
                _ => panic!("malformed object header {:?} at {:#x}", header, addr),
            };
        }
        self.builtins.object
    }

    /// Subtype test via the shape's ancestor list
    pub fn is_a(&self, v: Value, class: ClassId, arena: &Arena) -> bool {
        let shape = self.get(self.class_of(v, arena)).shape;
        self.shape(shape).has_ancestor(class)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Resolve a named slot on a class through the shape offset tables
    pub fn resolve_slot(&self, class: ClassId, name: NameId) -> Option<&Slot> {
        let shape = self.get(class).shape;
        let rec = self.names.get(name.0 as usize)?;
        let off = rec.offsets.iter().find(|o| o.shape == shape)?;
        self.get(class).slots.get(off.offset)
    }

    /// Resolve a named slot for a receiver value
    pub fn dispatch(
        &self,
        receiver: Value,
        name: NameId,
        arena: &Arena,
    ) -> Result<SlotImpl, RuntimeError> {
        let class = self.class_of(receiver, arena);
        self.resolve_slot(class, name)
            .map(|s| s.body)
            .ok_or_else(|| RuntimeError::UnknownSlot {
                class: class.0,
                name: self.name_text(name).to_string(),
            })
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self::new()
    }
}

fn builtin_spec(name: &str, ancestor: Option<ClassId>, field_count: usize) -> ClassSpec {
    ClassSpec {
        name: name.to_string(),
        ancestor,
        lifecycle: Some(Lifecycle::default()),
        field_count,
        slots: Vec::new(),
    }
}
