//! Synchronous channels: state plus a FIFO wait queue

use super::thread::ThreadId;
use std::collections::VecDeque;

/// Index of a channel in the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub(crate) u32);

/// What the wait queue currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No thread is parked
    Empty,
    /// One or more senders are parked awaiting receivers
    Sending,
    /// One or more receivers are parked awaiting senders
    Receiving,
}

/// A rendezvous point. The wait queue only ever holds threads blocked in the
/// same direction: an arrival from the opposite direction completes a
/// rendezvous immediately instead of parking.
pub struct Channel {
    state: ChannelState,
    wait: VecDeque<ThreadId>,
}

impl Channel {
    pub(crate) fn new() -> Self {
        Self {
            state: ChannelState::Empty,
            wait: VecDeque::new(),
        }
    }

    /// Current queue direction
    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Parked threads
    pub fn waiting(&self) -> usize {
        self.wait.len()
    }

    pub(crate) fn park_sender(&mut self, thread: ThreadId) {
        debug_assert_ne!(self.state, ChannelState::Receiving);
        self.state = ChannelState::Sending;
        self.wait.push_back(thread);
    }

    pub(crate) fn park_receiver(&mut self, thread: ThreadId) {
        debug_assert_ne!(self.state, ChannelState::Sending);
        self.state = ChannelState::Receiving;
        self.wait.push_back(thread);
    }

    /// Dequeue the longest-parked thread, resetting the state once the queue
    /// drains
    pub(crate) fn take_waiter(&mut self) -> Option<ThreadId> {
        let thread = self.wait.pop_front();
        if self.wait.is_empty() {
            self.state = ChannelState::Empty;
        }
        thread
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::thread::Thread;

    #[test]
    fn test_waiters_wake_in_fifo_order() {
        let (a, b) = (Thread::new().id(), Thread::new().id());
        let mut chan = Channel::new();
        chan.park_sender(a);
        chan.park_sender(b);
        assert_eq!(chan.state(), ChannelState::Sending);
        assert_eq!(chan.waiting(), 2);

        assert_eq!(chan.take_waiter(), Some(a));
        assert_eq!(chan.state(), ChannelState::Sending);
        assert_eq!(chan.take_waiter(), Some(b));
        assert_eq!(chan.state(), ChannelState::Empty);
        assert_eq!(chan.take_waiter(), None);
    }

    #[test]
    fn test_drained_channel_accepts_other_direction() {
        let t = Thread::new().id();
        let mut chan = Channel::new();
        chan.park_receiver(t);
        chan.take_waiter();
        chan.park_sender(t);
        assert_eq!(chan.state(), ChannelState::Sending);
    }
}
