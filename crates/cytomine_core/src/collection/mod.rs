//! Paginated collections of entities.

mod cursor;
mod paged;

pub use cursor::Cursor;
pub use paged::Collection;
