//! Parameterized queries executed page by page.

mod cursor;
mod request;
mod validate;

pub use cursor::{CursorState, QueryCursor};
pub use request::{ContinuationToken, QueryPage, QueryParameter, QueryRequest};
