//! # Domain Layer
//!
//! Value objects, entities and pure services. Nothing in here touches state.

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use services::*;
pub use value_objects::*;
