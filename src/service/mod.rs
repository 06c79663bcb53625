//! CrudService: generic CRUD using safe SQL builder. Stats: betting aggregates.

mod crud;
pub mod stats;
mod validation;
pub(crate) use crud::row_to_json;
pub use crud::{CrudService, DEFAULT_LIMIT, MAX_LIMIT};
pub use validation::RequestValidator;
