//! Class registration, subtype tests, and named dispatch on live instances

use loon_runtime::scheduler::Frame;
use loon_runtime::{ClassId, ClassSpec, NameId, Runtime, RuntimeError, SlotSpec, ThreadId, Value};

fn nop(_: &mut Runtime, _: ThreadId) -> Result<(), RuntimeError> {
    Ok(())
}

fn mark_one(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    rt.sched.thread_mut(tid)?.current_frame_mut().unwrap().locals[0] = Value::number(1.0);
    Ok(())
}

fn mark_three(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    rt.sched.thread_mut(tid)?.current_frame_mut().unwrap().locals[0] = Value::number(3.0);
    Ok(())
}

struct Hierarchy {
    a: ClassId,
    b: ClassId,
    c: ClassId,
    greet: NameId,
}

/// A defines `greet`, B inherits it, C overrides it.
fn build(rt: &mut Runtime) -> Hierarchy {
    let object = rt.classes.builtins().object;
    let greet = rt.intern("greet");

    let a = rt.register_unit(
        "a.ln",
        vec![ClassSpec {
            name: "A".to_string(),
            ancestor: Some(object),
            lifecycle: None,
            field_count: 1,
            slots: vec![SlotSpec { name: greet, body: mark_one }],
        }],
    )[0];
    let b = rt.register_unit(
        "b.ln",
        vec![ClassSpec {
            name: "B".to_string(),
            ancestor: Some(a),
            lifecycle: None,
            field_count: 1,
            slots: vec![],
        }],
    )[0];
    let c = rt.register_unit(
        "c.ln",
        vec![ClassSpec {
            name: "C".to_string(),
            ancestor: Some(b),
            lifecycle: None,
            field_count: 0,
            slots: vec![SlotSpec { name: greet, body: mark_three }],
        }],
    )[0];

    Hierarchy { a, b, c, greet }
}

#[test]
fn test_is_a_across_three_levels() {
    let mut rt = Runtime::with_space_words(64);
    let h = build(&mut rt);

    let inst_a = rt.allocate(h.a.to_value()).unwrap();
    let inst_c = rt.allocate(h.c.to_value()).unwrap();

    assert!(rt.is_a(inst_c, h.c));
    assert!(rt.is_a(inst_c, h.b));
    assert!(rt.is_a(inst_c, h.a));
    assert!(rt.is_a(inst_c, rt.classes.builtins().object));

    assert!(rt.is_a(inst_a, h.a));
    assert!(!rt.is_a(inst_a, h.b));
    assert!(!rt.is_a(inst_a, h.c));

    // Immediates classify through the builtin hierarchy.
    assert!(rt.is_a(Value::number(2.0), rt.classes.builtins().number));
    assert!(!rt.is_a(Value::NULL, h.a));
}

#[test]
fn test_dispatch_runs_the_overriding_definition() {
    let mut rt = Runtime::with_space_words(64);
    let h = build(&mut rt);
    let tid = rt.spawn(Frame::new(nop, 1)).unwrap();

    let inst_b = rt.allocate(h.b.to_value()).unwrap();
    let inst_c = rt.allocate(h.c.to_value()).unwrap();

    // B never defined greet, so A's body runs.
    let slot = rt.dispatch(inst_b, h.greet).unwrap();
    slot(&mut rt, tid).unwrap();
    let marker = rt.sched.thread(tid).unwrap().current_frame().unwrap().locals[0];
    assert!(marker.equals(Value::number(1.0)));

    // C overrides it.
    let slot = rt.dispatch(inst_c, h.greet).unwrap();
    slot(&mut rt, tid).unwrap();
    let marker = rt.sched.thread(tid).unwrap().current_frame().unwrap().locals[0];
    assert!(marker.equals(Value::number(3.0)));
}

#[test]
fn test_dispatch_unknown_slot_names_the_receiver_class() {
    let mut rt = Runtime::with_space_words(64);
    let h = build(&mut rt);
    let absent = rt.intern("absent");
    let inst = rt.allocate(h.a.to_value()).unwrap();

    match rt.dispatch(inst, absent) {
        Err(RuntimeError::UnknownSlot { class, name }) => {
            assert_eq!(class, h.a.as_u32());
            assert_eq!(name, "absent");
        }
        other => panic!("expected UnknownSlot, got {other:?}"),
    }
}

#[test]
fn test_class_proxy_objects_allocate_their_class() {
    let mut rt = Runtime::with_space_words(64);
    let h = build(&mut rt);
    let class_builtin = rt.classes.builtins().class;

    // An instance of the Class metaclass carrying A in its payload slot is
    // class-like and allocates an A.
    let proxy = rt.allocate(class_builtin.to_value()).unwrap();
    rt.set_object_field(proxy, 1, h.a.to_value()).unwrap();

    assert_eq!(rt.class_of(proxy), class_builtin);
    let inst = rt.allocate(proxy).unwrap();
    assert_eq!(rt.class_of(inst), h.a);

    // A proxy with a non-class payload is just an ordinary object.
    let bogus = rt.allocate(class_builtin.to_value()).unwrap();
    rt.set_object_field(bogus, 1, Value::number(1.0)).unwrap();
    assert!(matches!(
        rt.allocate(bogus),
        Err(RuntimeError::InvalidType(_))
    ));
}
