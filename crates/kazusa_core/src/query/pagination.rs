//! crates/kazusa_core/src/query/pagination.rs
//!
//! Normalizes a caller's offset/limit into an effective page.

use crate::ports::{PortError, PortResult};
use crate::query::predicate::Scope;

/// Rows returned when a parent-scoped listing omits its limit.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Rows returned when an identity lookup omits its limit.
pub const SELECTIVE_LIMIT: u32 = 1;

/// Pagination as requested by the caller. A limit of zero counts as unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub offset: u32,
    pub limit: Option<u32>,
}

impl Pagination {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self {
            offset,
            limit: Some(limit),
        }
    }

    pub fn limit(limit: u32) -> Self {
        Self::new(0, limit)
    }

    fn explicit_limit(&self) -> Option<u32> {
        self.limit.filter(|limit| *limit > 0)
    }
}

/// An effective page. The limit is always greater than zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    offset: u32,
    limit: u32,
}

impl Page {
    /// Returns `None` for a zero limit.
    pub fn new(offset: u32, limit: u32) -> Option<Self> {
        (limit > 0).then_some(Self { offset, limit })
    }

    /// The first row only.
    pub fn single() -> Self {
        Self {
            offset: 0,
            limit: SELECTIVE_LIMIT,
        }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Resolves the requested pagination against how bounded the query is.
    ///
    /// An explicit limit is always honored. Without one, an identity lookup
    /// reads a single row, a parent-scoped listing reads one default page,
    /// and anything else is refused.
    pub fn resolve(requested: Pagination, scope: Scope) -> PortResult<Self> {
        let limit = match (requested.explicit_limit(), scope) {
            (Some(limit), _) => limit,
            (None, Scope::Selective) => SELECTIVE_LIMIT,
            (None, Scope::Scoped) => DEFAULT_PAGE_SIZE,
            (None, Scope::Unbounded) => {
                return Err(PortError::MissingPagination(
                    "limit is required when no identifying or scoping filter is set".to_string(),
                ))
            }
        };
        Ok(Self {
            offset: requested.offset,
            limit,
        })
    }
}
