//! crates/kazusa_core/src/pipeline/module.rs
//!
//! Reads modules and marks which of them the caller has completed.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Activity, ActivityFilters, Caller, Module, ModuleFilters};
use crate::pipeline::enrichment;
use crate::ports::{ActivityStore, ModuleStore, PortResult};
use crate::query::{Page, Pagination};

#[derive(Clone)]
pub struct ModuleReader {
    modules: Arc<dyn ModuleStore>,
    activities: Arc<dyn ActivityStore>,
}

impl ModuleReader {
    pub fn new(modules: Arc<dyn ModuleStore>, activities: Arc<dyn ActivityStore>) -> Self {
        Self {
            modules,
            activities,
        }
    }

    /// Reads modules by filter and pagination.
    ///
    /// When the read is scoped to a course and a caller is present, each
    /// module's `is_completed` reflects the caller's progress events for that
    /// course. Otherwise every module is returned with `is_completed == false`.
    pub async fn read(
        &self,
        filters: &ModuleFilters,
        pagination: Pagination,
        caller: Option<Caller>,
    ) -> PortResult<Vec<Module>> {
        let page = Page::resolve(pagination, filters.predicate().scope())?;
        let mut modules = self.modules.read(filters, page).await?;

        let (Some(course_id), Some(caller)) = (filters.course_id, caller) else {
            debug!("module read without course scope or caller; completion not computed");
            return Ok(modules);
        };

        let activities = self
            .activities
            .read(&ActivityFilters {
                user_id: Some(caller.user_id),
                course_id: Some(course_id),
                module_id: None,
            })
            .await
            .map_err(enrichment("reading course activity"))?;

        debug!(
            course_id = %course_id,
            modules = modules.len(),
            activities = activities.len(),
            "marking completed modules"
        );
        mark_completed(&mut modules, &activities);
        Ok(modules)
    }
}

fn mark_completed(modules: &mut [Module], activities: &[Activity]) {
    for module in modules.iter_mut() {
        module.is_completed = activities.iter().any(|activity| {
            activity.module_id == module.id && activity.course_id == module.course_id
        });
    }
}
