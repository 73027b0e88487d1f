//! The `protocol` module defines the wire format spoken between brokers and
//! peers: the fixed-width length-prefixed framing and the instructions that
//! travel inside the frames.

pub mod frame;
pub mod instruction;

pub use frame::{HEADER_WIDTH, read_ack, read_frame, write_ack, write_frame};
pub use instruction::{Instruction, no_messages_notice, result_frame, split_result};

#[cfg(test)]
mod tests;
