//! Query building shared by every store: predicates and pagination.

pub mod filters;
pub mod pagination;
pub mod predicate;

pub use pagination::{Page, Pagination, DEFAULT_PAGE_SIZE, SELECTIVE_LIMIT};
pub use predicate::{ClauseRole, Op, Predicate, Rendered, Scope, Separator, SqlValue};
