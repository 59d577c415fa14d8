//! End-to-end thread and channel behavior through the interpreter loop

use loon_runtime::scheduler::{ChannelId, Frame, Thread};
use loon_runtime::{Runtime, RuntimeError, ThreadId, Value};
use std::sync::{Mutex, OnceLock};

fn transfer_local_zero(sender: &mut Thread, receiver: &mut Thread) {
    let v = sender.current_frame().unwrap().locals[0];
    receiver.current_frame_mut().unwrap().locals[0] = v;
}

fn finish(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    rt.sched.thread_mut(tid)?.pop_frame();
    Ok(())
}

fn set_local_zero(rt: &mut Runtime, tid: ThreadId, v: Value) {
    rt.sched
        .thread_mut(tid)
        .unwrap()
        .current_frame_mut()
        .unwrap()
        .locals[0] = v;
}

// ============================================================================
// Producer/consumer ordering
// ============================================================================

static ORDER_CHAN: OnceLock<ChannelId> = OnceLock::new();
static ORDER_RECEIVED: Mutex<Vec<f64>> = Mutex::new(Vec::new());

fn order_produce(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    rt.sched.thread_mut(tid)?.set_next(finish);
    rt.send(*ORDER_CHAN.get().unwrap(), transfer_local_zero)
}

fn order_consume(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    rt.sched.thread_mut(tid)?.set_next(order_record);
    rt.receive(*ORDER_CHAN.get().unwrap(), transfer_local_zero)
}

fn order_record(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    let v = rt.sched.thread(tid)?.current_frame().unwrap().locals[0];
    ORDER_RECEIVED.lock().unwrap().push(v.as_number().unwrap());
    finish(rt, tid)
}

#[test]
fn test_parked_senders_are_served_in_arrival_order() {
    let mut rt = Runtime::with_space_words(64);
    ORDER_CHAN.set(rt.open_channel()).unwrap();

    let p1 = rt.spawn(Frame::new(order_produce, 1)).unwrap();
    let p2 = rt.spawn(Frame::new(order_produce, 1)).unwrap();
    rt.spawn(Frame::new(order_consume, 1)).unwrap();
    rt.spawn(Frame::new(order_consume, 1)).unwrap();
    set_local_zero(&mut rt, p1, Value::number(1.0));
    set_local_zero(&mut rt, p2, Value::number(2.0));

    rt.run().unwrap();

    assert_eq!(*ORDER_RECEIVED.lock().unwrap(), vec![1.0, 2.0]);
    assert_eq!(rt.sched.thread_count(), 0);
    assert!(rt.sched.is_idle());
}

// ============================================================================
// Deadlock remainder
// ============================================================================

static STUCK_CHAN: OnceLock<ChannelId> = OnceLock::new();

fn stuck_send(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    rt.sched.thread_mut(tid)?.set_next(finish);
    rt.send(*STUCK_CHAN.get().unwrap(), transfer_local_zero)
}

#[test]
fn test_sender_without_partner_is_left_parked() {
    let mut rt = Runtime::with_space_words(64);
    STUCK_CHAN.set(rt.open_channel()).unwrap();
    rt.spawn(Frame::new(stuck_send, 1)).unwrap();

    rt.run().unwrap();

    // The run queue drained but the sender never completed: a deadlock the
    // embedder can observe.
    assert!(rt.sched.is_idle());
    assert_eq!(rt.sched.thread_count(), 1);
    assert_eq!(rt.sched.channel(*STUCK_CHAN.get().unwrap()).unwrap().waiting(), 1);
}

// ============================================================================
// References across a rendezvous and a collection
// ============================================================================

static XFER_CHAN: OnceLock<ChannelId> = OnceLock::new();
static XFER_PAYLOAD: Mutex<Option<f64>> = Mutex::new(None);

fn xfer_send(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    rt.sched.thread_mut(tid)?.set_next(finish);
    rt.send(*XFER_CHAN.get().unwrap(), transfer_local_zero)
}

fn xfer_receive(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    rt.sched.thread_mut(tid)?.set_next(xfer_read);
    rt.receive(*XFER_CHAN.get().unwrap(), transfer_local_zero)
}

fn xfer_read(rt: &mut Runtime, tid: ThreadId) -> Result<(), RuntimeError> {
    let obj = rt.sched.thread(tid)?.current_frame().unwrap().locals[0];
    let payload = rt.object_field(obj, 1)?;
    *XFER_PAYLOAD.lock().unwrap() = payload.as_number();
    finish(rt, tid)
}

#[test]
fn test_object_sent_from_parked_thread_survives_collection() {
    let mut rt = Runtime::with_space_words(64);
    XFER_CHAN.set(rt.open_channel()).unwrap();

    // The sender parks holding the only reference to the object.
    let sender = rt.spawn(Frame::new(xfer_send, 1)).unwrap();
    let obj = rt.allocate_vector(1).unwrap();
    rt.set_object_field(obj, 1, Value::number(7.0)).unwrap();
    set_local_zero(&mut rt, sender, obj);
    rt.run().unwrap();
    assert_eq!(rt.sched.thread_count(), 1);

    // Collect while the sender is parked: its frame is still a root.
    rt.collect();
    assert_eq!(rt.gc_stats().last_objects_copied, 1);

    // A receiver shows up and reads the repaired reference.
    rt.spawn(Frame::new(xfer_receive, 1)).unwrap();
    rt.run().unwrap();

    assert_eq!(*XFER_PAYLOAD.lock().unwrap(), Some(7.0));
    assert_eq!(rt.sched.thread_count(), 0);
}
