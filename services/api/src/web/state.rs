//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::auth::TokenIssuer;
use kazusa_core::activity::ActivityRecorder;
use kazusa_core::pipeline::{CourseReader, ModuleReader};
use kazusa_core::ports::{
    ActivityStore, CourseStore, FileStorage, ModuleStore, NotificationService, PaymentStore,
    UserStore,
};
use std::sync::Arc;

/// The store adapters the application is wired with.
#[derive(Clone)]
pub struct Stores {
    pub courses: Arc<dyn CourseStore>,
    pub modules: Arc<dyn ModuleStore>,
    pub users: Arc<dyn UserStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub activities: Arc<dyn ActivityStore>,
}

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub courses: Arc<dyn CourseStore>,
    pub modules: Arc<dyn ModuleStore>,
    pub users: Arc<dyn UserStore>,
    pub payments: Arc<dyn PaymentStore>,
    pub files: Arc<dyn FileStorage>,
    pub course_reader: CourseReader,
    pub module_reader: ModuleReader,
    pub recorder: ActivityRecorder,
    pub tokens: TokenIssuer,
}

impl AppState {
    /// Wires the read pipelines and the activity recorder over the stores.
    pub fn new(
        config: Arc<Config>,
        stores: Stores,
        notifier: Arc<dyn NotificationService>,
        files: Arc<dyn FileStorage>,
    ) -> Self {
        let module_reader = ModuleReader::new(stores.modules.clone(), stores.activities.clone());
        let course_reader = CourseReader::new(
            stores.courses.clone(),
            module_reader.clone(),
            stores.payments.clone(),
        );
        let recorder = ActivityRecorder::new(
            stores.activities,
            stores.users.clone(),
            stores.courses.clone(),
            notifier,
            config.owner_email.clone(),
        );
        let tokens = TokenIssuer::new(&config.jwt_secret, config.token_ttl_hours);

        Self {
            config,
            courses: stores.courses,
            modules: stores.modules,
            users: stores.users,
            payments: stores.payments,
            files,
            course_reader,
            module_reader,
            recorder,
            tokens,
        }
    }
}
