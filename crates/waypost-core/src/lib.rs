pub mod errors;
pub mod geo;
pub mod model;
pub mod query;

pub use errors::*;
pub use geo::*;
pub use model::*;
pub use query::*;
