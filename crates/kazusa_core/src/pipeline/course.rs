//! crates/kazusa_core/src/pipeline/course.rs
//!
//! Reads courses and enriches the selected one with its modules and the
//! caller's payment status.

use std::sync::Arc;

use tracing::debug;

use crate::domain::{Caller, Course, CourseFilters, ModuleFilters, PaymentFilters};
use crate::pipeline::{enrichment, ModuleReader};
use crate::ports::{CourseStore, PaymentStore, PortResult};
use crate::query::{Page, Pagination};

#[derive(Clone)]
pub struct CourseReader {
    courses: Arc<dyn CourseStore>,
    modules: ModuleReader,
    payments: Arc<dyn PaymentStore>,
}

impl CourseReader {
    pub fn new(
        courses: Arc<dyn CourseStore>,
        modules: ModuleReader,
        payments: Arc<dyn PaymentStore>,
    ) -> Self {
        Self {
            courses,
            modules,
            payments,
        }
    }

    /// Reads courses by filter and pagination.
    ///
    /// A course is selected when the filter names an exact identity or the
    /// read matched exactly one row. Only the selected course is enriched:
    /// its modules are attached (read through [`ModuleReader`] with the
    /// module listing's own default page), and with a caller present
    /// `is_paid` is set from the caller's confirmed payment. Multi-row
    /// listings come back as stored.
    pub async fn read(
        &self,
        filters: &CourseFilters,
        pagination: Pagination,
        caller: Option<Caller>,
    ) -> PortResult<Vec<Course>> {
        let page = Page::resolve(pagination, filters.predicate().scope())?;
        let mut courses = self.courses.read(filters, page).await?;

        if filters.id.is_none() && courses.len() != 1 {
            debug!(courses = courses.len(), "course listing returned without enrichment");
            return Ok(courses);
        }

        // An identity filter can still match nothing.
        let Some(selected) = courses.first_mut() else {
            debug!("no course matched the identity filter");
            return Ok(courses);
        };

        self.enrich(selected, caller).await?;
        Ok(courses)
    }

    async fn enrich(&self, course: &mut Course, caller: Option<Caller>) -> PortResult<()> {
        let modules = self
            .modules
            .read(
                &ModuleFilters::for_course(course.id),
                Pagination::default(),
                caller,
            )
            .await
            .map_err(enrichment("reading course modules"))?;
        course.modules = Some(modules);

        let Some(caller) = caller else {
            return Ok(());
        };

        let payment = self
            .payments
            .read(&PaymentFilters {
                user_id: Some(caller.user_id),
                course_id: Some(course.id),
            })
            .await
            .map_err(enrichment("reading course payment"))?;
        course.is_paid = Some(payment.is_some_and(|p| p.confirmed));

        debug!(course_id = %course.id, is_paid = ?course.is_paid, "course enriched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use testresult::TestResult;
    use uuid::Uuid;

    use super::*;
    use crate::domain::{Module, NewPayment, Payment};
    use crate::pipeline::fixtures::{make_course, make_module};
    use crate::ports::{MockActivityStore, MockCourseStore, MockModuleStore, MockPaymentStore, PortError};

    /// Payments kept in memory so that confirmation can happen between reads.
    #[derive(Default)]
    struct MemoryPayments {
        rows: Mutex<Vec<Payment>>,
    }

    #[async_trait]
    impl PaymentStore for MemoryPayments {
        async fn create(&self, payment: NewPayment) -> PortResult<Uuid> {
            let id = Uuid::new_v4();
            self.rows.lock().unwrap().push(Payment {
                id,
                user_id: payment.user_id,
                course_id: payment.course_id,
                order_id: payment.order_id,
                confirmed: false,
            });
            Ok(id)
        }

        async fn confirm(&self, order_id: Uuid) -> PortResult<bool> {
            let mut rows = self.rows.lock().unwrap();
            let mut affected = false;
            for row in rows.iter_mut().filter(|row| row.order_id == order_id) {
                row.confirmed = true;
                affected = true;
            }
            Ok(affected)
        }

        async fn read(&self, filters: &PaymentFilters) -> PortResult<Option<Payment>> {
            filters.predicate()?;
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .find(|row| {
                    Some(row.user_id) == filters.user_id
                        && Some(row.course_id) == filters.course_id
                        && row.confirmed
                })
                .cloned())
        }
    }

    fn course_store(course: Course) -> MockCourseStore {
        let mut courses = MockCourseStore::new();
        let id = course.id;
        courses
            .expect_read()
            .withf(move |f, page| f.id == Some(id) && page.limit() == 1)
            .returning(move |_, _| Ok(vec![course.clone()]));
        courses
    }

    fn module_store(modules: Vec<Module>) -> MockModuleStore {
        let mut store = MockModuleStore::new();
        let course_id = modules.first().map(|m| m.course_id);
        store
            .expect_read()
            .withf(move |f, page| f.course_id == course_id && f.id.is_none() && page.limit() == 20)
            .returning(move |_, _| Ok(modules.clone()));
        store
    }

    fn no_activity() -> MockActivityStore {
        let mut activities = MockActivityStore::new();
        activities.expect_read().returning(|_| Ok(Vec::new()));
        activities
    }

    fn reader(
        courses: MockCourseStore,
        modules: MockModuleStore,
        activities: MockActivityStore,
        payments: Arc<dyn PaymentStore>,
    ) -> CourseReader {
        CourseReader::new(
            Arc::new(courses),
            ModuleReader::new(Arc::new(modules), Arc::new(activities)),
            payments,
        )
    }

    #[tokio::test]
    async fn identity_read_attaches_all_course_modules() -> TestResult {
        let course = make_course("rust");
        let modules = vec![make_module(course.id, "M1"), make_module(course.id, "M2")];
        let expected: Vec<Uuid> = modules.iter().map(|m| m.id).collect();

        let mut payments = MockPaymentStore::new();
        payments.expect_read().never();
        let mut activities = MockActivityStore::new();
        activities.expect_read().never();

        let result = reader(
            course_store(course.clone()),
            module_store(modules),
            activities,
            Arc::new(payments),
        )
        .read(&CourseFilters::by_id(course.id), Pagination::default(), None)
        .await?;

        assert_eq!(result.len(), 1);
        let attached: Vec<Uuid> = result[0]
            .modules
            .as_ref()
            .ok_or("modules were not attached")?
            .iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(attached, expected);
        assert_eq!(result[0].is_paid, None);

        Ok(())
    }

    #[tokio::test]
    async fn payment_gates_is_paid_until_confirmed() -> TestResult {
        let course = make_course("rust");
        let user = Uuid::new_v4();
        let order = Uuid::new_v4();
        let payments = Arc::new(MemoryPayments::default());
        payments
            .create(NewPayment {
                user_id: user,
                course_id: course.id,
                order_id: order,
            })
            .await?;

        let reader = reader(
            course_store(course.clone()),
            module_store(vec![make_module(course.id, "M1")]),
            no_activity(),
            payments.clone(),
        );
        let filters = CourseFilters::by_id(course.id);
        let caller = Some(Caller::new(user));

        let before = reader.read(&filters, Pagination::default(), caller).await?;
        assert_eq!(before[0].is_paid, Some(false));

        assert!(payments.confirm(order).await?);

        let after = reader.read(&filters, Pagination::default(), caller).await?;
        assert_eq!(after[0].is_paid, Some(true));

        let stranger = reader
            .read(&filters, Pagination::default(), Some(Caller::new(Uuid::new_v4())))
            .await?;
        assert_eq!(stranger[0].is_paid, Some(false));

        Ok(())
    }

    #[tokio::test]
    async fn attached_modules_carry_caller_completion() -> TestResult {
        let course = make_course("rust");
        let user = Uuid::new_v4();
        let m1 = make_module(course.id, "M1");
        let m2 = make_module(course.id, "M2");
        let done = crate::domain::Activity {
            id: Uuid::new_v4(),
            user_id: user,
            course_id: course.id,
            module_id: m2.id,
            is_last: true,
        };

        let mut activities = MockActivityStore::new();
        activities
            .expect_read()
            .once()
            .returning(move |_| Ok(vec![done.clone()]));
        let mut payments = MockPaymentStore::new();
        payments.expect_read().once().returning(|_| Ok(None));

        let result = reader(
            course_store(course.clone()),
            module_store(vec![m1, m2]),
            activities,
            Arc::new(payments),
        )
        .read(
            &CourseFilters::by_id(course.id),
            Pagination::default(),
            Some(Caller::new(user)),
        )
        .await?;

        let modules = result[0].modules.as_ref().ok_or("modules were not attached")?;
        assert!(!modules[0].is_completed);
        assert!(modules[1].is_completed);
        assert_eq!(result[0].is_paid, Some(false));

        Ok(())
    }

    #[tokio::test]
    async fn multi_row_listing_is_not_enriched() -> TestResult {
        let listed = vec![make_course("a"), make_course("b"), make_course("c")];

        let mut courses = MockCourseStore::new();
        courses
            .expect_read()
            .once()
            .withf(|f, page| f.id.is_none() && page.offset() == 0 && page.limit() == 3)
            .returning(move |_, _| Ok(listed.clone()));
        let mut modules = MockModuleStore::new();
        modules.expect_read().never();
        let mut payments = MockPaymentStore::new();
        payments.expect_read().never();

        let result = reader(courses, modules, MockActivityStore::new(), Arc::new(payments))
            .read(
                &CourseFilters::default(),
                Pagination::new(0, 3),
                Some(Caller::new(Uuid::new_v4())),
            )
            .await?;

        assert_eq!(result.len(), 3);
        assert!(result.iter().all(|c| c.modules.is_none() && c.is_paid.is_none()));

        Ok(())
    }

    #[tokio::test]
    async fn single_row_listing_is_enriched() -> TestResult {
        let course = make_course("only");
        let listed = vec![course.clone()];

        let mut courses = MockCourseStore::new();
        courses
            .expect_read()
            .once()
            .returning(move |_, _| Ok(listed.clone()));
        let mut payments = MockPaymentStore::new();
        payments.expect_read().never();

        let result = reader(
            courses,
            module_store(vec![make_module(course.id, "M1")]),
            MockActivityStore::new(),
            Arc::new(payments),
        )
        .read(&CourseFilters::default(), Pagination::new(0, 10), None)
        .await?;

        assert_eq!(result[0].modules.as_ref().map(Vec::len), Some(1));

        Ok(())
    }

    #[tokio::test]
    async fn identity_read_with_no_match_returns_empty() -> TestResult {
        let mut courses = MockCourseStore::new();
        courses.expect_read().once().returning(|_, _| Ok(Vec::new()));
        let mut modules = MockModuleStore::new();
        modules.expect_read().never();
        let mut payments = MockPaymentStore::new();
        payments.expect_read().never();

        let result = reader(courses, modules, MockActivityStore::new(), Arc::new(payments))
            .read(
                &CourseFilters::by_id(Uuid::new_v4()),
                Pagination::default(),
                Some(Caller::new(Uuid::new_v4())),
            )
            .await?;

        assert!(result.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn unbounded_listing_without_limit_is_refused() {
        let mut courses = MockCourseStore::new();
        courses.expect_read().never();

        let result = reader(
            courses,
            MockModuleStore::new(),
            MockActivityStore::new(),
            Arc::new(MockPaymentStore::new()),
        )
        .read(&CourseFilters::default(), Pagination::default(), None)
        .await;

        assert!(matches!(result, Err(PortError::MissingPagination(_))));
    }

    #[tokio::test]
    async fn module_failure_aborts_the_read() {
        let course = make_course("rust");

        let mut modules = MockModuleStore::new();
        modules
            .expect_read()
            .once()
            .returning(|_, _| Err(PortError::Storage("module store read: refused".to_string())));
        let mut payments = MockPaymentStore::new();
        payments.expect_read().never();

        let result = reader(
            course_store(course.clone()),
            modules,
            MockActivityStore::new(),
            Arc::new(payments),
        )
        .read(&CourseFilters::by_id(course.id), Pagination::default(), None)
        .await;

        assert!(matches!(result, Err(PortError::Enrichment(_))));
    }

    #[tokio::test]
    async fn payment_failure_aborts_the_read() {
        let course = make_course("rust");

        let mut payments = MockPaymentStore::new();
        payments
            .expect_read()
            .once()
            .returning(|_| Err(PortError::Storage("payment store read: refused".to_string())));

        let result = reader(
            course_store(course.clone()),
            module_store(vec![make_module(course.id, "M1")]),
            no_activity(),
            Arc::new(payments),
        )
        .read(
            &CourseFilters::by_id(course.id),
            Pagination::default(),
            Some(Caller::new(Uuid::new_v4())),
        )
        .await;

        match result {
            Err(PortError::Enrichment(msg)) => assert!(msg.starts_with("reading course payment")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() -> TestResult {
        let course = make_course("rust");
        let reader = reader(
            course_store(course.clone()),
            module_store(vec![make_module(course.id, "M1"), make_module(course.id, "M2")]),
            no_activity(),
            Arc::new(MemoryPayments::default()),
        );
        let filters = CourseFilters::by_id(course.id);
        let caller = Some(Caller::new(Uuid::new_v4()));

        let first = reader.read(&filters, Pagination::default(), caller).await?;
        let second = reader.read(&filters, Pagination::default(), caller).await?;

        assert_eq!(first, second);

        Ok(())
    }
}
