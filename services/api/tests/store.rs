//! PostgreSQL-backed tests for `DbAdapter`. Each test gets a fresh database
//! with the migrations applied, so `DATABASE_URL` must point at a server the
//! test user can create databases on.

use std::sync::Arc;

use api_lib::adapters::DbAdapter;
use kazusa_core::domain::{
    ActivityFilters, Caller, CourseFilters, CourseUpdate, ModuleFilters, ModuleUpdate,
    NewActivity, NewCourse, NewModule, NewPayment, NewUser, PaymentFilters, Role, UserFilters,
    UserUpdate,
};
use kazusa_core::pipeline::{CourseReader, ModuleReader};
use kazusa_core::ports::{
    ActivityStore, CourseStore, ModuleStore, PaymentStore, PortError, UserStore,
};
use kazusa_core::query::{Page, Pagination};
use sqlx::PgPool;
use testresult::TestResult;
use uuid::Uuid;

fn page(offset: u32, limit: u32) -> Page {
    Page::new(offset, limit).expect("non-zero limit")
}

fn new_course(title: &str, attachments: &[&str]) -> NewCourse {
    NewCourse {
        title: title.to_string(),
        description: String::new(),
        price: 4900,
        cover_url: format!("http://files.test/{title}.png"),
        attachment_urls: attachments.iter().map(|a| a.to_string()).collect(),
    }
}

async fn seed_user(db: &DbAdapter, email: &str) -> Result<Uuid, PortError> {
    UserStore::create(
        db,
        NewUser {
            name: "Ada".to_string(),
            email: email.to_string(),
            phone: String::new(),
            role: Role::User,
            password_hash: "$argon2id$hash".to_string(),
        },
    )
    .await
}

async fn seed_module(db: &DbAdapter, course_id: Uuid, name: &str) -> Result<Uuid, PortError> {
    ModuleStore::create(
        db,
        NewModule {
            course_id,
            name: name.to_string(),
            content: String::new(),
            duration_minutes: 10,
        },
    )
    .await
}

#[sqlx::test(migrations = "./migrations")]
async fn course_pages_respect_offset_and_limit(pool: PgPool) -> TestResult {
    let db = DbAdapter::new(pool);
    for n in 0..5 {
        CourseStore::create(&db, new_course(&format!("course-{n}"), &[])).await?;
    }

    let all = CourseStore::read(&db, &CourseFilters::default(), page(0, 50)).await?;
    let middle = CourseStore::read(&db, &CourseFilters::default(), page(1, 2)).await?;

    assert_eq!(all.len(), 5);
    assert_eq!(middle.len(), 2);
    assert_eq!(middle[0].id, all[1].id);
    assert_eq!(middle[1].id, all[2].id);

    let capped = CourseStore::read(&db, &CourseFilters::default(), page(0, 3)).await?;
    assert_eq!(capped.len(), 3);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn listings_are_ordered_by_creation_time_then_id(pool: PgPool) -> TestResult {
    let db = DbAdapter::new(pool);
    let course = CourseStore::create(&db, new_course("ordered", &[])).await?;
    for name in ["one", "two", "three", "four"] {
        seed_module(&db, course, name).await?;
    }

    let modules = ModuleStore::read(&db, &ModuleFilters::for_course(course), page(0, 10)).await?;

    assert_eq!(modules.len(), 4);
    assert!(modules
        .windows(2)
        .all(|w| (w[0].created_at, w[0].id) <= (w[1].created_at, w[1].id)));

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn attachment_urls_survive_the_text_array_column(pool: PgPool) -> TestResult {
    let db = DbAdapter::new(pool);
    let with_files = CourseStore::create(
        &db,
        new_course("with-files", &["http://files.test/a.pdf", "http://files.test/b, c.pdf"]),
    )
    .await?;
    let without_files = CourseStore::create(&db, new_course("without-files", &[])).await?;

    let read = |id: Uuid| {
        let db = db.clone();
        async move { CourseStore::read(&db, &CourseFilters::by_id(id), Page::single()).await }
    };
    let with_files = read(with_files).await?;
    let without_files = read(without_files).await?;

    assert_eq!(
        with_files[0].attachment_urls,
        vec![
            "http://files.test/a.pdf".to_string(),
            "http://files.test/b, c.pdf".to_string(),
        ]
    );
    assert_eq!(with_files[0].cover_url, "http://files.test/with-files.png");
    assert!(without_files[0].attachment_urls.is_empty());

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn confirmed_payment_marks_the_course_paid(pool: PgPool) -> TestResult {
    let db = Arc::new(DbAdapter::new(pool));
    let user = seed_user(&db, "buyer@example.com").await?;
    let course = CourseStore::create(db.as_ref(), new_course("paid", &[])).await?;
    let order = Uuid::new_v4();
    PaymentStore::create(
        db.as_ref(),
        NewPayment {
            user_id: user,
            course_id: course,
            order_id: order,
        },
    )
    .await?;

    let reader = CourseReader::new(
        db.clone(),
        ModuleReader::new(db.clone(), db.clone()),
        db.clone(),
    );
    let filters = CourseFilters::by_id(course);
    let read_paid = || reader.read(&filters, Pagination::default(), Some(Caller::new(user)));

    let before = read_paid().await?;
    assert_eq!(before[0].is_paid, Some(false));

    assert!(db.confirm(order).await?);

    let after = read_paid().await?;
    assert_eq!(after[0].is_paid, Some(true));
    let payment = PaymentStore::read(
        db.as_ref(),
        &PaymentFilters {
            user_id: Some(user),
            course_id: Some(course),
        },
    )
    .await?
    .expect("confirmed payment");
    assert_eq!(payment.order_id, order);

    assert!(!db.confirm(Uuid::new_v4()).await?);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn repeated_activity_is_kept(pool: PgPool) -> TestResult {
    let db = DbAdapter::new(pool);
    let user = seed_user(&db, "learner@example.com").await?;
    let course = CourseStore::create(&db, new_course("progress", &[])).await?;
    let module = seed_module(&db, course, "intro").await?;
    let event = NewActivity {
        user_id: user,
        course_id: course,
        module_id: module,
        is_last: false,
    };

    let first = ActivityStore::create(&db, event).await?;
    let second = ActivityStore::create(&db, event).await?;

    let rows = ActivityStore::read(
        &db,
        &ActivityFilters {
            user_id: Some(user),
            course_id: Some(course),
            module_id: None,
        },
    )
    .await?;

    assert_ne!(first, second);
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.module_id == module));

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn writes_to_missing_rows_report_false(pool: PgPool) -> TestResult {
    let db = DbAdapter::new(pool);
    let ghost = Uuid::new_v4();

    let course_updated = CourseStore::update(
        &db,
        CourseUpdate {
            id: ghost,
            title: Some("nothing".to_string()),
            ..Default::default()
        },
    )
    .await?;
    let module_updated = ModuleStore::update(
        &db,
        ModuleUpdate {
            id: ghost,
            name: Some("nothing".to_string()),
            ..Default::default()
        },
    )
    .await?;
    let user_updated = UserStore::update(
        &db,
        UserUpdate {
            id: ghost,
            phone: Some("555".to_string()),
            ..Default::default()
        },
    )
    .await?;

    assert!(!course_updated);
    assert!(!module_updated);
    assert!(!user_updated);
    assert!(!CourseStore::delete(&db, ghost).await?);
    assert!(!ModuleStore::delete(&db, ghost).await?);
    assert!(!UserStore::delete(&db, ghost).await?);

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn writes_to_existing_rows_report_true(pool: PgPool) -> TestResult {
    let db = DbAdapter::new(pool);
    let course = CourseStore::create(&db, new_course("before", &[])).await?;

    let updated = CourseStore::update(
        &db,
        CourseUpdate {
            id: course,
            title: Some("after".to_string()),
            ..Default::default()
        },
    )
    .await?;
    let read = CourseStore::read(&db, &CourseFilters::by_id(course), Page::single()).await?;

    assert!(updated);
    assert_eq!(read[0].title, "after");
    assert!(CourseStore::delete(&db, course).await?);
    assert!(CourseStore::read(&db, &CourseFilters::by_id(course), Page::single())
        .await?
        .is_empty());

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn activity_for_an_unknown_module_names_the_module(pool: PgPool) -> TestResult {
    let db = DbAdapter::new(pool);
    let user = seed_user(&db, "lost@example.com").await?;
    let course = CourseStore::create(&db, new_course("lost", &[])).await?;
    let unknown = Uuid::new_v4();

    let result = ActivityStore::create(
        &db,
        NewActivity {
            user_id: user,
            course_id: course,
            module_id: unknown,
            is_last: false,
        },
    )
    .await;

    match result {
        Err(PortError::InvalidFilter(msg)) => assert!(msg.contains(&unknown.to_string()), "{msg}"),
        other => panic!("expected InvalidFilter, got {other:?}"),
    }

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn payment_for_an_unknown_course_names_the_course(pool: PgPool) -> TestResult {
    let db = DbAdapter::new(pool);
    let user = seed_user(&db, "shopper@example.com").await?;
    let unknown = Uuid::new_v4();

    let result = PaymentStore::create(
        &db,
        NewPayment {
            user_id: user,
            course_id: unknown,
            order_id: Uuid::new_v4(),
        },
    )
    .await;

    match result {
        Err(PortError::InvalidFilter(msg)) => assert!(msg.contains(&unknown.to_string()), "{msg}"),
        other => panic!("expected InvalidFilter, got {other:?}"),
    }

    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
async fn duplicate_email_stays_a_storage_error(pool: PgPool) -> TestResult {
    let db = DbAdapter::new(pool);
    seed_user(&db, "twice@example.com").await?;

    let result = seed_user(&db, "twice@example.com").await;
    let found = UserStore::read(
        &db,
        &UserFilters {
            id: None,
            email: Some("twice@example.com".to_string()),
        },
        Page::single(),
    )
    .await?;

    assert!(matches!(result, Err(PortError::Storage(_))));
    assert_eq!(found.len(), 1);

    Ok(())
}
