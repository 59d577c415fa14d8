//! Run queue, thread registry, and the rendezvous protocol

use super::channel::{Channel, ChannelId, ChannelState};
use super::thread::{Communicate, Frame, Thread, ThreadId};
use crate::error::RuntimeError;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Owns every live thread and channel.
///
/// A thread is in exactly one place at a time: the run queue, the `current`
/// slot, or a channel's wait queue. Blocked threads stay in the registry (the
/// collector scans every registered thread's frames) but are absent from the
/// run queue until their rendezvous completes.
pub struct Scheduler {
    threads: FxHashMap<ThreadId, Thread>,
    run_queue: VecDeque<ThreadId>,
    current: Option<ThreadId>,
    channels: Vec<Channel>,
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self {
            threads: FxHashMap::default(),
            run_queue: VecDeque::new(),
            current: None,
            channels: Vec::new(),
        }
    }

    /// Register a thread with one initial frame and enqueue it
    pub fn spawn(&mut self, frame: Frame) -> Result<ThreadId, RuntimeError> {
        let mut thread = Thread::new();
        thread.push_frame(frame)?;
        let id = thread.id();
        self.threads.insert(id, thread);
        self.run_queue.push_back(id);
        Ok(id)
    }

    /// Re-enqueue the current thread (if any) at the tail, then dequeue the
    /// head as the new current thread. With a single live thread this hands
    /// control straight back to it.
    pub fn schedule(&mut self) -> Option<ThreadId> {
        if let Some(id) = self.current.take() {
            self.run_queue.push_back(id);
        }
        self.current = self.run_queue.pop_front();
        self.current
    }

    /// The thread currently holding the interpreter, if any
    pub fn current(&self) -> Option<ThreadId> {
        self.current
    }

    /// Re-enqueue the current thread at the back of the run queue
    pub fn yield_current(&mut self) -> Result<(), RuntimeError> {
        let id = self.current.take().ok_or(RuntimeError::NoCurrentThread)?;
        self.run_queue.push_back(id);
        Ok(())
    }

    /// Drop the current thread from the registry entirely
    pub fn finish_current(&mut self) -> Result<(), RuntimeError> {
        let id = self.current.take().ok_or(RuntimeError::NoCurrentThread)?;
        self.threads.remove(&id);
        Ok(())
    }

    /// True when no thread is runnable or current. Registered threads may
    /// still be parked on channels; an idle scheduler with parked threads is
    /// a deadlocked program.
    pub fn is_idle(&self) -> bool {
        self.current.is_none() && self.run_queue.is_empty()
    }

    /// Registered threads (runnable, current, or parked)
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Look up a thread
    pub fn thread(&self, id: ThreadId) -> Result<&Thread, RuntimeError> {
        self.threads.get(&id).ok_or(RuntimeError::UnknownThread(id))
    }

    /// Look up a thread mutably
    pub fn thread_mut(&mut self, id: ThreadId) -> Result<&mut Thread, RuntimeError> {
        self.threads
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownThread(id))
    }

    /// Every registered thread, for the collector's root phase
    pub fn threads_mut(&mut self) -> impl Iterator<Item = &mut Thread> {
        self.threads.values_mut()
    }

    // ========================================================================
    // Channels
    // ========================================================================

    /// Create a channel
    pub fn open_channel(&mut self) -> ChannelId {
        let id = ChannelId(self.channels.len() as u32);
        self.channels.push(Channel::new());
        id
    }

    /// Look up a channel
    pub fn channel(&self, id: ChannelId) -> Result<&Channel, RuntimeError> {
        self.channels
            .get(id.0 as usize)
            .ok_or(RuntimeError::UnknownChannel(id))
    }

    /// Send on a channel from the current thread.
    ///
    /// If a receiver is parked, the rendezvous completes now with the given
    /// transfer hook; otherwise the current thread parks, its hook is
    /// dropped, and the eventual partner's hook performs the transfer.
    /// Either way the current slot is vacated and the caller returns to the
    /// scheduler loop.
    pub fn send(&mut self, channel: ChannelId, communicate: Communicate) -> Result<(), RuntimeError> {
        if channel.0 as usize >= self.channels.len() {
            return Err(RuntimeError::UnknownChannel(channel));
        }
        let sender = self.current.take().ok_or(RuntimeError::NoCurrentThread)?;
        let chan = &mut self.channels[channel.0 as usize];

        if chan.state() == ChannelState::Receiving {
            let receiver = match chan.take_waiter() {
                Some(receiver) => receiver,
                None => panic!("channel in receiving state with an empty wait queue"),
            };
            self.rendezvous(sender, receiver, communicate)
        } else {
            chan.park_sender(sender);
            Ok(())
        }
    }

    /// Receive on a channel into the current thread. Mirrors [`send`](Self::send).
    pub fn receive(
        &mut self,
        channel: ChannelId,
        communicate: Communicate,
    ) -> Result<(), RuntimeError> {
        if channel.0 as usize >= self.channels.len() {
            return Err(RuntimeError::UnknownChannel(channel));
        }
        let receiver = self.current.take().ok_or(RuntimeError::NoCurrentThread)?;
        let chan = &mut self.channels[channel.0 as usize];

        if chan.state() == ChannelState::Sending {
            let sender = match chan.take_waiter() {
                Some(sender) => sender,
                None => panic!("channel in sending state with an empty wait queue"),
            };
            self.rendezvous(sender, receiver, communicate)
        } else {
            chan.park_receiver(receiver);
            Ok(())
        }
    }

    /// Complete a rendezvous: run the arriving side's transfer hook with both
    /// threads borrowed, then requeue the pair, sender ahead of receiver.
    fn rendezvous(
        &mut self,
        sender: ThreadId,
        receiver: ThreadId,
        communicate: Communicate,
    ) -> Result<(), RuntimeError> {
        let mut s = self
            .threads
            .remove(&sender)
            .ok_or(RuntimeError::UnknownThread(sender))?;
        let mut r = match self.threads.remove(&receiver) {
            Some(r) => r,
            None => {
                self.threads.insert(sender, s);
                return Err(RuntimeError::UnknownThread(receiver));
            }
        };

        communicate(&mut s, &mut r);

        self.threads.insert(sender, s);
        self.threads.insert(receiver, r);
        self.run_queue.push_back(sender);
        self.run_queue.push_back(receiver);
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
