//! # Adapters Layer (Outer Hexagon)
//!
//! - `world_state`: owned in-memory world state hosts keep between calls
//! - `pending`: per-transaction journaled overlay the interpreter writes to
//! - `access_list`: EIP-2929 warm/cold tracking

pub mod access_list;
pub mod pending;
pub mod world_state;

pub use access_list::*;
pub use pending::*;
pub use world_state::*;
