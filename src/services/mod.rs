pub mod scoped_query;

pub use scoped_query::{ScopedQueryError, ScopedQueryService};
