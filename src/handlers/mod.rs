//! HTTP handlers: the API dispatcher and operational endpoints.

pub mod dispatch;
pub use dispatch::{dispatch, API_PREFIX, MAX_BODY_BYTES};
