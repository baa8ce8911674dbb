//! # Ports
//!
//! - `inbound`: what the engine offers (`ExecutionEngine`)
//! - `outbound`: what the engine needs (`StateView`, `AccessList`)

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
