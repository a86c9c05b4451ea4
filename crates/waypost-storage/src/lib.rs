pub mod mem;
pub mod traits;

pub use mem::InMemoryStore;
pub use traits::*;
