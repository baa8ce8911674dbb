//! # EVM Core
//!
//! Single-frame bytecode interpreter and its building blocks.

pub mod gas;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod stack;
pub mod transient;

pub use interpreter::{FrameOutcome, FrameResult, Interpreter};
pub use memory::Memory;
pub use stack::Stack;
pub use transient::TransientStorage;
