//! services/api/src/adapters/db.rs
//!
//! The PostgreSQL adapter. `DbAdapter` implements every store port from the
//! core crate using `sqlx`. Statements are assembled at runtime from the
//! filter predicates, so the SQL text is built by small pure functions that
//! can be tested without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kazusa_core::domain::{
    Activity, ActivityFilters, Course, CourseFilters, CourseUpdate, Module, ModuleFilters,
    ModuleUpdate, NewActivity, NewCourse, NewModule, NewPayment, NewUser, Payment,
    PaymentFilters, Role, User, UserFilters, UserUpdate,
};
use kazusa_core::ports::{
    ActivityStore, CourseStore, ModuleStore, PaymentStore, PortError, PortResult, UserStore,
};
use kazusa_core::query::{Page, Predicate, Rendered, SqlValue};
use sqlx::postgres::{PgArguments, PgDatabaseError, PgRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, PgPool, Postgres};
use tracing::debug;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn fetch<R>(&self, rendered: Rendered, context: &'static str) -> PortResult<Vec<R>>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        debug!(sql = %rendered.sql, args = rendered.args.len(), "{}", context);
        let query = bind_as(sqlx::query_as::<Postgres, R>(&rendered.sql), rendered.args);
        query.fetch_all(&self.pool).await.map_err(storage(context))
    }

    async fn execute(&self, rendered: Rendered, context: &'static str) -> PortResult<u64> {
        debug!(sql = %rendered.sql, args = rendered.args.len(), "{}", context);
        let query = bind(sqlx::query::<Postgres>(&rendered.sql), rendered.args);
        let result = query.execute(&self.pool).await.map_err(storage(context))?;
        Ok(result.rows_affected())
    }
}

/// A reference to a missing row is the caller's mistake and becomes
/// `InvalidFilter`, naming the key Postgres reports. Everything else is `Storage`.
fn storage(context: &'static str) -> impl FnOnce(sqlx::Error) -> PortError {
    move |e| match &e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            let detail = db
                .try_downcast_ref::<PgDatabaseError>()
                .and_then(|pg| pg.detail())
                .map(str::to_string)
                .or_else(|| db.constraint().map(|c| format!("violates {c}")))
                .unwrap_or_else(|| db.message().to_string());
            PortError::InvalidFilter(format!("{context}: {detail}"))
        }
        _ => PortError::Storage(format!("{context}: {e}")),
    }
}

//=========================================================================================
// Statement Builders
//=========================================================================================

const COURSE_COLUMNS: &str =
    "id, title, description, price, cover_url, attachment_urls, created_at, updated_at";
const MODULE_COLUMNS: &str =
    "id, course_id, name, content, duration_minutes, created_at, updated_at";
const USER_COLUMNS: &str = "id, name, email, phone, role, password_hash, created_at, updated_at";
const ACTIVITY_COLUMNS: &str = "id, user_id, course_id, module_id, is_last";
const PAYMENT_COLUMNS: &str = "id, user_id, course_id, order_id, confirmed";

/// `SELECT` in a stable order, bounded by the page.
fn select_page(table: &str, columns: &str, predicate: &Predicate, page: Page) -> Rendered {
    let Rendered { sql: filter, mut args } = predicate.render_where(1);
    let limit = args.len() + 1;
    let mut sql = format!("SELECT {columns} FROM {table}");
    if !filter.is_empty() {
        sql.push(' ');
        sql.push_str(&filter);
    }
    sql.push_str(&format!(
        " ORDER BY created_at, id LIMIT ${} OFFSET ${}",
        limit,
        limit + 1
    ));
    args.push(SqlValue::Int(i64::from(page.limit())));
    args.push(SqlValue::Int(i64::from(page.offset())));
    Rendered { sql, args }
}

/// `SELECT` of every matching row. Only used with predicates that have
/// already been checked to be non-empty.
fn select_all(table: &str, columns: &str, predicate: &Predicate) -> Rendered {
    let Rendered { sql: filter, args } = predicate.render_where(1);
    Rendered {
        sql: format!("SELECT {columns} FROM {table} {filter} ORDER BY created_at, id"),
        args,
    }
}

/// `UPDATE ... SET` of the given assignments for one row id.
fn update_by_id(table: &str, id: Uuid, assignments: &Predicate) -> Rendered {
    let Rendered { sql: set, mut args } = assignments.render(1);
    let sql = format!(
        "UPDATE {table} SET {set}, updated_at = now() WHERE id = ${}",
        args.len() + 1
    );
    args.push(SqlValue::Uuid(id));
    Rendered { sql, args }
}

fn delete_by_id(table: &str, id: Uuid) -> Rendered {
    Rendered {
        sql: format!("DELETE FROM {table} WHERE id = $1"),
        args: vec![SqlValue::Uuid(id)],
    }
}

fn bind(
    mut query: Query<'_, Postgres, PgArguments>,
    args: Vec<SqlValue>,
) -> Query<'_, Postgres, PgArguments> {
    for arg in args {
        query = match arg {
            SqlValue::Uuid(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
        };
    }
    query
}

fn bind_as<R>(
    mut query: QueryAs<'_, Postgres, R, PgArguments>,
    args: Vec<SqlValue>,
) -> QueryAs<'_, Postgres, R, PgArguments> {
    for arg in args {
        query = match arg {
            SqlValue::Uuid(v) => query.bind(v),
            SqlValue::Text(v) => query.bind(v),
            SqlValue::Int(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
        };
    }
    query
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CourseRecord {
    id: Uuid,
    title: String,
    description: String,
    price: i64,
    cover_url: String,
    attachment_urls: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl CourseRecord {
    fn to_domain(self) -> Course {
        Course {
            id: self.id,
            title: self.title,
            description: self.description,
            price: self.price,
            cover_url: self.cover_url,
            attachment_urls: self.attachment_urls,
            created_at: self.created_at,
            updated_at: self.updated_at,
            modules: None,
            is_paid: None,
        }
    }
}

#[derive(FromRow)]
struct ModuleRecord {
    id: Uuid,
    course_id: Uuid,
    name: String,
    content: String,
    duration_minutes: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl ModuleRecord {
    fn to_domain(self) -> Module {
        Module {
            id: self.id,
            course_id: self.course_id,
            name: self.name,
            content: self.content,
            duration_minutes: self.duration_minutes,
            created_at: self.created_at,
            updated_at: self.updated_at,
            is_completed: false,
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    role: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        let role = Role::parse(&self.role).ok_or_else(|| {
            PortError::Storage(format!("user {} has unknown role '{}'", self.id, self.role))
        })?;
        Ok(User {
            id: self.id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            role,
            password_hash: self.password_hash,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(FromRow)]
struct ActivityRecord {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    module_id: Uuid,
    is_last: bool,
}
impl ActivityRecord {
    fn to_domain(self) -> Activity {
        Activity {
            id: self.id,
            user_id: self.user_id,
            course_id: self.course_id,
            module_id: self.module_id,
            is_last: self.is_last,
        }
    }
}

#[derive(FromRow)]
struct PaymentRecord {
    id: Uuid,
    user_id: Uuid,
    course_id: Uuid,
    order_id: Uuid,
    confirmed: bool,
}
impl PaymentRecord {
    fn to_domain(self) -> Payment {
        Payment {
            id: self.id,
            user_id: self.user_id,
            course_id: self.course_id,
            order_id: self.order_id,
            confirmed: self.confirmed,
        }
    }
}

//=========================================================================================
// Store Trait Implementations
//=========================================================================================

#[async_trait]
impl CourseStore for DbAdapter {
    async fn create(&self, course: NewCourse) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO courses (id, title, description, price, cover_url, attachment_urls) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(course.title)
        .bind(course.description)
        .bind(course.price)
        .bind(course.cover_url)
        .bind(course.attachment_urls)
        .execute(&self.pool)
        .await
        .map_err(storage("course store create"))?;
        Ok(id)
    }

    async fn read(&self, filters: &CourseFilters, page: Page) -> PortResult<Vec<Course>> {
        let rendered = select_page("courses", COURSE_COLUMNS, &filters.predicate(), page);
        let records: Vec<CourseRecord> = self.fetch(rendered, "course store read").await?;
        Ok(records.into_iter().map(CourseRecord::to_domain).collect())
    }

    async fn update(&self, update: CourseUpdate) -> PortResult<bool> {
        let rendered = update_by_id("courses", update.id, &update.assignments()?);
        Ok(self.execute(rendered, "course store update").await? > 0)
    }

    async fn delete(&self, id: Uuid) -> PortResult<bool> {
        let rendered = delete_by_id("courses", id);
        Ok(self.execute(rendered, "course store delete").await? > 0)
    }
}

#[async_trait]
impl ModuleStore for DbAdapter {
    async fn create(&self, module: NewModule) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO modules (id, course_id, name, content, duration_minutes) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(module.course_id)
        .bind(module.name)
        .bind(module.content)
        .bind(module.duration_minutes)
        .execute(&self.pool)
        .await
        .map_err(storage("module store create"))?;
        Ok(id)
    }

    async fn read(&self, filters: &ModuleFilters, page: Page) -> PortResult<Vec<Module>> {
        let rendered = select_page("modules", MODULE_COLUMNS, &filters.predicate(), page);
        let records: Vec<ModuleRecord> = self.fetch(rendered, "module store read").await?;
        Ok(records.into_iter().map(ModuleRecord::to_domain).collect())
    }

    async fn update(&self, update: ModuleUpdate) -> PortResult<bool> {
        let rendered = update_by_id("modules", update.id, &update.assignments()?);
        Ok(self.execute(rendered, "module store update").await? > 0)
    }

    async fn delete(&self, id: Uuid) -> PortResult<bool> {
        let rendered = delete_by_id("modules", id);
        Ok(self.execute(rendered, "module store delete").await? > 0)
    }
}

#[async_trait]
impl UserStore for DbAdapter {
    async fn create(&self, user: NewUser) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, name, email, phone, role, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(user.name)
        .bind(user.email)
        .bind(user.phone)
        .bind(user.role.as_str())
        .bind(user.password_hash)
        .execute(&self.pool)
        .await
        .map_err(storage("user store create"))?;
        Ok(id)
    }

    async fn read(&self, filters: &UserFilters, page: Page) -> PortResult<Vec<User>> {
        let rendered = select_page("users", USER_COLUMNS, &filters.predicate(), page);
        let records: Vec<UserRecord> = self.fetch(rendered, "user store read").await?;
        records.into_iter().map(UserRecord::to_domain).collect()
    }

    async fn update(&self, update: UserUpdate) -> PortResult<bool> {
        let rendered = update_by_id("users", update.id, &update.assignments()?);
        Ok(self.execute(rendered, "user store update").await? > 0)
    }

    async fn delete(&self, id: Uuid) -> PortResult<bool> {
        let rendered = delete_by_id("users", id);
        Ok(self.execute(rendered, "user store delete").await? > 0)
    }
}

#[async_trait]
impl PaymentStore for DbAdapter {
    async fn create(&self, payment: NewPayment) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO course_payments (id, user_id, course_id, order_id) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(payment.user_id)
        .bind(payment.course_id)
        .bind(payment.order_id)
        .execute(&self.pool)
        .await
        .map_err(storage("payment store create"))?;
        Ok(id)
    }

    async fn confirm(&self, order_id: Uuid) -> PortResult<bool> {
        let rendered = Rendered {
            sql: "UPDATE course_payments SET confirmed = TRUE WHERE order_id = $1".to_string(),
            args: vec![SqlValue::Uuid(order_id)],
        };
        Ok(self.execute(rendered, "payment store confirm").await? > 0)
    }

    async fn read(&self, filters: &PaymentFilters) -> PortResult<Option<Payment>> {
        let rendered = select_page(
            "course_payments",
            PAYMENT_COLUMNS,
            &filters.predicate()?,
            Page::single(),
        );
        let records: Vec<PaymentRecord> = self.fetch(rendered, "payment store read").await?;
        Ok(records.into_iter().next().map(PaymentRecord::to_domain))
    }
}

#[async_trait]
impl ActivityStore for DbAdapter {
    async fn create(&self, activity: NewActivity) -> PortResult<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO user_activity (id, user_id, course_id, module_id, is_last) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(id)
        .bind(activity.user_id)
        .bind(activity.course_id)
        .bind(activity.module_id)
        .bind(activity.is_last)
        .execute(&self.pool)
        .await
        .map_err(storage("activity store create"))?;
        Ok(id)
    }

    async fn read(&self, filters: &ActivityFilters) -> PortResult<Vec<Activity>> {
        let rendered = select_all("user_activity", ACTIVITY_COLUMNS, &filters.predicate()?);
        let records: Vec<ActivityRecord> = self.fetch(rendered, "activity store read").await?;
        Ok(records.into_iter().map(ActivityRecord::to_domain).collect())
    }
}
