pub mod error;
pub mod source;

pub use error::{HttpSourceError, Result};
pub use source::{HttpSource, QUERY_TOKEN, request_url};
