//! crates/kazusa_core/src/pipeline/mod.rs
//!
//! Read pipelines that compose one entity's store read with lookups into the
//! other stores. Every cross-entity step is a separate, non-transactional
//! read; a failure in any step aborts the whole read.

pub mod course;
pub mod module;

pub use course::CourseReader;
pub use module::ModuleReader;

use crate::ports::PortError;

/// Wraps a lookup failure made while composing a read. Errors that already
/// come from a nested composition step are passed through unchanged.
fn enrichment(step: &'static str) -> impl FnOnce(PortError) -> PortError {
    move |err| match err {
        PortError::Enrichment(_) => err,
        other => PortError::Enrichment(format!("{step}: {other}")),
    }
}
