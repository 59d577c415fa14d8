//! Copy phase: root relocation, forwarding, and the finger scan

use super::arena::Arena;
use super::MIN_OBJECT_WORDS;
use crate::class::{ClassId, ClassTable};
use crate::scheduler::Scheduler;
use crate::value::{Tag, Value};

/// A live object under scan, addressed in the destination half
#[derive(Debug, Clone, Copy)]
pub struct ObjectRef {
    /// Word index of the header slot
    pub base: usize,
    /// Logical size in slots, header included
    pub len: usize,
}

/// One collection in flight.
///
/// Lifecycle visitors and stack maps receive this handle and call
/// [`relocate`](GcPass::relocate) / [`relocate_field`](GcPass::relocate_field)
/// for every reference-bearing slot they own. Non-reference values pass
/// through unchanged, so a visitor may relocate unconditionally.
pub struct GcPass<'a> {
    arena: &'a mut Arena,
    classes: &'a ClassTable,
    dest_base: usize,
    forwarded: ClassId,
    objects_copied: usize,
    words_copied: usize,
}

impl<'a> GcPass<'a> {
    fn new(arena: &'a mut Arena, classes: &'a ClassTable) -> Self {
        let dest_base = arena.inactive_base();
        Self {
            arena,
            classes,
            dest_base,
            forwarded: classes.builtins().forwarded,
            objects_copied: 0,
            words_copied: 0,
        }
    }

    fn in_destination(&self, base: usize) -> bool {
        base >= self.dest_base && base < self.dest_base + self.arena.space_words()
    }

    /// Ensure the object `v` refers to lives in the destination half and
    /// return the repaired reference. Non-reference values come back as-is.
    pub fn relocate(&mut self, v: Value) -> Value {
        let Some(addr) = v.object_addr() else {
            return v;
        };
        let base = addr as usize;
        // Aliased roots: a second reference to an already-relocated object
        // may have been repaired before us.
        if self.in_destination(base) {
            return v;
        }

        let header = self.arena.word(base);
        if header.class_id() == Some(self.forwarded.as_u32()) {
            return self.arena.word(base + 1);
        }

        let size = match self.classes.object_size(header) {
            Some(size) => size,
            None => panic!("malformed object header {:?} at {:#x}", header, base),
        };
        let physical = size.max(MIN_OBJECT_WORDS);
        let new_base = match self.arena.bump_allocate(physical) {
            Some(new_base) => new_base,
            None => panic!("collector overran the destination space"),
        };

        self.arena.copy_words(base, new_base, size);
        if physical > size {
            self.arena.set_word(new_base + size, Value::NULL);
        }

        let moved = Value::object(new_base as u64);
        self.arena.set_word(base, self.forwarded.to_value());
        self.arena.set_word(base + 1, moved);

        self.objects_copied += 1;
        self.words_copied += physical;
        moved
    }

    /// Relocate one slot of an object in place
    pub fn relocate_field(&mut self, obj: ObjectRef, index: usize) {
        debug_assert!(index < obj.len);
        let v = self.arena.word(obj.base + index);
        let moved = self.relocate(v);
        self.arena.set_word(obj.base + index, moved);
    }
}

/// Default lifecycle visitor: every slot after the header may hold a
/// reference
pub fn visit_all_fields(obj: ObjectRef, gc: &mut GcPass<'_>) {
    for i in 1..obj.len {
        gc.relocate_field(obj, i);
    }
}

/// Default stack map: every local in the frame may hold a reference
pub fn scan_all_locals(locals: &mut [Value], gc: &mut GcPass<'_>) {
    for slot in locals.iter_mut() {
        *slot = gc.relocate(*slot);
    }
}

/// Collection counters, updated after every completed pass
#[derive(Debug, Clone, Copy, Default)]
pub struct GcStats {
    /// Completed collections
    pub collections: u64,
    /// Objects copied by the most recent pass
    pub last_objects_copied: usize,
    /// Words copied by the most recent pass (physical footprints)
    pub last_words_copied: usize,
    /// Words copied across all passes
    pub total_words_copied: u64,
    /// Words live in the active half after the most recent pass
    pub live_words: usize,
}

impl GcStats {
    fn record(&mut self, objects: usize, words: usize, live: usize) {
        self.collections += 1;
        self.last_objects_copied = objects;
        self.last_words_copied = words;
        self.total_words_copied += words as u64;
        self.live_words = live;
    }
}

/// Run one full collection: copy every object reachable from the scheduler's
/// thread frames into the inactive half, scan the copies, then flip.
pub fn run_collection(
    arena: &mut Arena,
    classes: &ClassTable,
    sched: &mut Scheduler,
    stats: &mut GcStats,
) {
    arena.reset_cursor();
    let dest_base = arena.inactive_base();

    let (objects, words) = {
        let mut gc = GcPass::new(arena, classes);

        // Root phase: every frame of every held thread, newest frame first.
        for thread in sched.threads_mut() {
            for frame in thread.frames_mut().rev() {
                let map = frame.stack_map;
                map(&mut frame.locals, &mut gc);
            }
        }

        // Finger scan: copied objects queue up behind the cursor; scanning
        // one may copy more, and the pass ends when the finger catches up.
        let mut finger = dest_base;
        while finger < gc.arena.cursor() {
            let header = gc.arena.word(finger);
            let size = match gc.classes.object_size(header) {
                Some(size) => size,
                None => panic!("malformed object header {:?} at {:#x}", header, finger),
            };
            let obj = ObjectRef {
                base: finger,
                len: size,
            };
            match header.tag() {
                // Buffers hold packed bytes, never references.
                Some(Tag::Buffer) => {}
                Some(Tag::Vector) => visit_all_fields(obj, &mut gc),
                Some(Tag::Class) => {
                    let class = ClassId(header.class_id().unwrap_or(u32::MAX));
                    let visit = gc.classes.get(class).lifecycle.visit;
                    visit(obj, &mut gc);
                }
                _ => panic!("malformed object header {:?} at {:#x}", header, finger),
            }
            finger += size.max(MIN_OBJECT_WORDS);
        }

        (gc.objects_copied, gc.words_copied)
    };

    arena.flip();
    stats.record(objects, words, arena.used_words());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arena, ClassTable) {
        (Arena::new(64), ClassTable::new())
    }

    fn alloc_object(arena: &mut Arena, class: ClassId, size: usize) -> usize {
        let base = arena.bump_allocate(size.max(MIN_OBJECT_WORDS)).unwrap();
        arena.set_word(base, class.to_value());
        for i in 1..size {
            arena.set_word(base + i, Value::NULL);
        }
        base
    }

    #[test]
    fn test_relocate_passes_non_references_through() {
        let (mut arena, classes) = setup();
        let mut gc = GcPass::new(&mut arena, &classes);
        assert!(gc.relocate(Value::number(2.5)).equals(Value::number(2.5)));
        assert!(gc.relocate(Value::NULL).equals(Value::NULL));
        assert!(gc.relocate(Value::class_ref(3)).equals(Value::class_ref(3)));
        assert_eq!(gc.objects_copied, 0);
    }

    #[test]
    fn test_relocate_writes_forwarding_stub() {
        let (mut arena, classes) = setup();
        let object = classes.builtins().object;
        let base = alloc_object(&mut arena, object, 1);

        arena.reset_cursor();
        let mut gc = GcPass::new(&mut arena, &classes);
        let moved = gc.relocate(Value::object(base as u64));

        let new_base = moved.object_addr().unwrap() as usize;
        assert_ne!(new_base, base);
        assert_eq!(gc.objects_copied, 1);
        // Header-only object still pays the two-slot stub footprint.
        assert_eq!(gc.words_copied, MIN_OBJECT_WORDS);

        // Old location is now a stub pointing at the copy.
        assert_eq!(
            arena.word(base).class_id(),
            Some(classes.builtins().forwarded.as_u32())
        );
        assert!(arena.word(base + 1).equals(moved));
        assert!(arena.word(new_base).equals(object.to_value()));
    }

    #[test]
    fn test_relocate_is_idempotent() {
        let (mut arena, classes) = setup();
        let object = classes.builtins().object;
        let base = alloc_object(&mut arena, object, 1);

        arena.reset_cursor();
        let mut gc = GcPass::new(&mut arena, &classes);
        let first = gc.relocate(Value::object(base as u64));
        // Same stale reference again follows the stub.
        let second = gc.relocate(Value::object(base as u64));
        // An already-repaired reference comes back untouched.
        let third = gc.relocate(first);

        assert!(first.equals(second));
        assert!(first.equals(third));
        assert_eq!(gc.objects_copied, 1);
    }

    #[test]
    fn test_visit_all_fields_repairs_interior_references() {
        let (mut arena, classes) = setup();
        let object = classes.builtins().object;
        let inner = alloc_object(&mut arena, object, 1);
        let outer = arena.bump_allocate(3).unwrap();
        arena.set_word(outer, Value::vector_header(2));
        arena.set_word(outer + 1, Value::object(inner as u64));
        arena.set_word(outer + 2, Value::number(7.0));

        arena.reset_cursor();
        let mut gc = GcPass::new(&mut arena, &classes);
        let moved_outer = gc.relocate(Value::object(outer as u64));
        let new_outer = moved_outer.object_addr().unwrap() as usize;
        visit_all_fields(
            ObjectRef {
                base: new_outer,
                len: 3,
            },
            &mut gc,
        );

        let moved_inner = gc.arena.word(new_outer + 1);
        let new_inner = moved_inner.object_addr().unwrap() as usize;
        assert_ne!(new_inner, inner);
        assert!(gc.arena.word(new_inner).equals(object.to_value()));
        assert!(gc.arena.word(new_outer + 2).equals(Value::number(7.0)));
    }
}
