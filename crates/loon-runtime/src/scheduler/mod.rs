//! Cooperative scheduler: green threads, run queue, rendezvous channels
//!
//! Threads are units of the interpreter's own making, not OS threads. They
//! run one instruction at a time under a FIFO run queue and block only at
//! channel operations, where a sender and a receiver meet in a synchronous
//! rendezvous and exchange data frame-to-frame.

mod channel;
mod scheduler;
mod thread;

pub use channel::{Channel, ChannelId, ChannelState};
pub use scheduler::Scheduler;
pub use thread::{
    Communicate, Frame, Instruction, StackMap, Thread, ThreadId, STACK_WORD_BUDGET,
};
