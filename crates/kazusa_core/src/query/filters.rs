//! crates/kazusa_core/src/query/filters.rs
//!
//! Translates each entity's sparse filter into a predicate over its table.
//! Pipelines use these to decide pagination; stores use them to build SQL,
//! so both always agree on how selective a read is. Partial update bodies
//! are translated the same way into `SET` assignment lists.

use crate::domain::{
    ActivityFilters, CourseFilters, CourseUpdate, ModuleFilters, ModuleUpdate, PaymentFilters,
    UserFilters, UserUpdate,
};
use crate::ports::{PortError, PortResult};
use crate::query::predicate::Predicate;

impl CourseFilters {
    pub fn predicate(&self) -> Predicate {
        Predicate::new().identity("id", self.id)
    }
}

impl ModuleFilters {
    pub fn predicate(&self) -> Predicate {
        Predicate::new()
            .identity("id", self.id)
            .parent("course_id", self.course_id)
    }
}

impl UserFilters {
    pub fn predicate(&self) -> Predicate {
        Predicate::new()
            .identity("id", self.id)
            .attribute("email", self.email.clone())
    }
}

impl ActivityFilters {
    /// At least one of the three identities must be set.
    pub fn predicate(&self) -> PortResult<Predicate> {
        let predicate = Predicate::new()
            .parent("user_id", self.user_id)
            .parent("course_id", self.course_id)
            .parent("module_id", self.module_id);
        predicate.require_any("user_id, course_id or module_id")?;
        Ok(predicate)
    }
}

impl PaymentFilters {
    /// Matches only confirmed payments. Both user and course are required.
    pub fn predicate(&self) -> PortResult<Predicate> {
        let predicate = Predicate::new()
            .parent("user_id", self.user_id)
            .parent("course_id", self.course_id);
        predicate.require_all(&["user_id", "course_id"])?;
        Ok(predicate.eq("confirmed", true))
    }
}

//=========================================================================================
// Update Bodies
//=========================================================================================

fn non_empty(assignments: Predicate) -> PortResult<Predicate> {
    if assignments.is_empty() {
        return Err(PortError::InvalidFilter("update body is empty".to_string()));
    }
    Ok(assignments)
}

impl CourseUpdate {
    pub fn assignments(&self) -> PortResult<Predicate> {
        non_empty(
            Predicate::assignments()
                .attribute("title", self.title.clone())
                .attribute("description", self.description.clone())
                .attribute("price", self.price),
        )
    }
}

impl ModuleUpdate {
    pub fn assignments(&self) -> PortResult<Predicate> {
        non_empty(
            Predicate::assignments()
                .attribute("name", self.name.clone())
                .attribute("content", self.content.clone())
                .attribute("duration_minutes", self.duration_minutes),
        )
    }
}

impl UserUpdate {
    pub fn assignments(&self) -> PortResult<Predicate> {
        non_empty(
            Predicate::assignments()
                .attribute("name", self.name.clone())
                .attribute("email", self.email.clone())
                .attribute("phone", self.phone.clone())
                .attribute("role", self.role.map(|role| role.as_str()))
                .attribute("password_hash", self.password_hash.clone()),
        )
    }
}
