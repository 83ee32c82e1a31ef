//! Request extractors that reject with the API's JSON error shape.
//!
//! - [`PathId`] / [`PathIds`]: typed UUID path parameters (`INVALID_ID`)
//! - [`ApiJson`] / [`ValidatedJson`]: request bodies (`INVALID_BODY`, then
//!   `VALIDATION_FAILED`)
//! - [`QueryPairs`]: decoded query pairs (`VALIDATION_FAILED` on `query`)
//! - [`ListParams`]: list query strings (`VALIDATION_FAILED`)

mod json;
mod list_params;
mod path_id;
mod query_pairs;

pub use json::{ApiJson, ValidatedJson};
pub use list_params::ListParams;
pub use path_id::{PathId, PathIds};
pub use query_pairs::QueryPairs;
