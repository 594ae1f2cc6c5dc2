pub mod activity;
pub mod domain;
pub mod pipeline;
pub mod ports;
pub mod query;

pub use activity::ActivityRecorder;
pub use domain::{
    Activity, ActivityFilters, Caller, Course, CourseFilters, CourseUpdate, Module, ModuleFilters,
    ModuleUpdate, NewActivity, NewCourse, NewModule, NewPayment, NewUser, Notification, Payment,
    PaymentFilters, Role, User, UserFilters, UserUpdate,
};
pub use pipeline::{CourseReader, ModuleReader};
pub use ports::{
    ActivityStore, CourseStore, ModuleStore, NotificationService, PaymentStore, PortError,
    PortResult, UserStore,
};
pub use query::{Page, Pagination, Predicate, Scope, SqlValue};
