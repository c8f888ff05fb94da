//! Entity management.

mod id;
mod model;

pub use id::{EntityId, Identity};
pub use model::{Entity, FieldMap};
