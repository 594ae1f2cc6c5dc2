//! crates/kazusa_core/src/activity.rs
//!
//! Records progress events and announces course completion.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{CourseFilters, NewActivity, Notification, UserFilters};
use crate::ports::{
    ActivityStore, CourseStore, NotificationService, PortError, PortResult, UserStore,
};
use crate::query::Page;

pub const COMPLETION_SUBJECT: &str = "Course completion";

#[derive(Clone)]
pub struct ActivityRecorder {
    activities: Arc<dyn ActivityStore>,
    users: Arc<dyn UserStore>,
    courses: Arc<dyn CourseStore>,
    notifier: Arc<dyn NotificationService>,
    recipient: String,
}

impl ActivityRecorder {
    pub fn new(
        activities: Arc<dyn ActivityStore>,
        users: Arc<dyn UserStore>,
        courses: Arc<dyn CourseStore>,
        notifier: Arc<dyn NotificationService>,
        recipient: String,
    ) -> Self {
        Self {
            activities,
            users,
            courses,
            notifier,
            recipient,
        }
    }

    /// Appends one progress event and returns its id.
    ///
    /// When the event is flagged as the course's last module, a completion
    /// notice is sent from a detached task. Its outcome is only logged.
    pub async fn record(&self, activity: NewActivity) -> PortResult<Uuid> {
        let id = self.activities.create(activity).await?;
        info!(
            activity_id = %id,
            user_id = %activity.user_id,
            course_id = %activity.course_id,
            module_id = %activity.module_id,
            "progress recorded"
        );

        if activity.is_last {
            self.spawn_completion_notice(activity);
        }

        Ok(id)
    }

    fn spawn_completion_notice(&self, activity: NewActivity) {
        let recorder = self.clone();
        tokio::spawn(async move {
            let sent = async {
                let notification = recorder.completion_notice(&activity).await?;
                recorder.notifier.send(notification).await
            }
            .await;

            match sent {
                Ok(()) => info!(
                    user_id = %activity.user_id,
                    course_id = %activity.course_id,
                    "completion notice sent"
                ),
                Err(e) => warn!(
                    user_id = %activity.user_id,
                    course_id = %activity.course_id,
                    "completion notice failed: {}",
                    e
                ),
            }
        });
    }

    async fn completion_notice(&self, activity: &NewActivity) -> PortResult<Notification> {
        let user = self
            .users
            .read(
                &UserFilters {
                    id: Some(activity.user_id),
                    email: None,
                },
                Page::single(),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PortError::NotFound(format!("User {} not found", activity.user_id)))?;

        let course = self
            .courses
            .read(&CourseFilters::by_id(activity.course_id), Page::single())
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                PortError::NotFound(format!("Course {} not found", activity.course_id))
            })?;

        Ok(Notification {
            recipient: self.recipient.clone(),
            subject: COMPLETION_SUBJECT.to_string(),
            body: format!("{} ({}) completed {}!", user.email, user.name, course.title),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use testresult::TestResult;
    use tokio::sync::mpsc;

    use super::*;
    use crate::domain::{Role, User};
    use crate::pipeline::fixtures::make_course;
    use crate::ports::{MockActivityStore, MockCourseStore, MockNotificationService, MockUserStore};

    const OWNER: &str = "owner@example.com";

    fn make_user() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+100000000".to_string(),
            role: Role::User,
            password_hash: "$argon2id$stub".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn new_activity(user_id: Uuid, course_id: Uuid, is_last: bool) -> NewActivity {
        NewActivity {
            user_id,
            course_id,
            module_id: Uuid::new_v4(),
            is_last,
        }
    }

    fn recorder(
        activities: MockActivityStore,
        users: MockUserStore,
        courses: MockCourseStore,
        notifier: MockNotificationService,
    ) -> ActivityRecorder {
        ActivityRecorder::new(
            Arc::new(activities),
            Arc::new(users),
            Arc::new(courses),
            Arc::new(notifier),
            OWNER.to_string(),
        )
    }

    fn lookups(user: User, course: crate::domain::Course) -> (MockUserStore, MockCourseStore) {
        let mut users = MockUserStore::new();
        let user_id = user.id;
        users
            .expect_read()
            .withf(move |f, page| f.id == Some(user_id) && page.limit() == 1)
            .returning(move |_, _| Ok(vec![user.clone()]));
        let mut courses = MockCourseStore::new();
        let course_id = course.id;
        courses
            .expect_read()
            .withf(move |f, _| f.id == Some(course_id))
            .returning(move |_, _| Ok(vec![course.clone()]));
        (users, courses)
    }

    #[tokio::test]
    async fn intermediate_progress_sends_nothing() -> TestResult {
        let activity = new_activity(Uuid::new_v4(), Uuid::new_v4(), false);
        let stored = Uuid::new_v4();

        let mut activities = MockActivityStore::new();
        activities
            .expect_create()
            .once()
            .withf(move |a| *a == activity)
            .returning(move |_| Ok(stored));
        let mut users = MockUserStore::new();
        users.expect_read().never();
        let mut notifier = MockNotificationService::new();
        notifier.expect_send().never();

        let id = recorder(activities, users, MockCourseStore::new(), notifier)
            .record(activity)
            .await?;

        assert_eq!(id, stored);

        Ok(())
    }

    #[tokio::test]
    async fn last_module_sends_completion_notice() -> TestResult {
        let user = make_user();
        let course = make_course("Rust Basics");
        let activity = new_activity(user.id, course.id, true);
        let (users, courses) = lookups(user, course);

        let mut activities = MockActivityStore::new();
        activities.expect_create().once().returning(|_| Ok(Uuid::new_v4()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut notifier = MockNotificationService::new();
        notifier.expect_send().once().returning(move |n| {
            let _ = tx.send(n);
            Ok(())
        });

        recorder(activities, users, courses, notifier)
            .record(activity)
            .await?;

        let sent = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await?
            .ok_or("notifier was never called")?;
        assert_eq!(sent.recipient, OWNER);
        assert_eq!(sent.subject, COMPLETION_SUBJECT);
        assert_eq!(sent.body, "ada@example.com (Ada Lovelace) completed Rust Basics!");

        Ok(())
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_the_record() -> TestResult {
        let user = make_user();
        let course = make_course("Rust Basics");
        let activity = new_activity(user.id, course.id, true);
        let (users, courses) = lookups(user, course);

        let mut activities = MockActivityStore::new();
        activities.expect_create().once().returning(|_| Ok(Uuid::new_v4()));

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut notifier = MockNotificationService::new();
        notifier.expect_send().once().returning(move |_| {
            let _ = tx.send(());
            Err(PortError::Unexpected("smtp unavailable".to_string()))
        });

        let result = recorder(activities, users, courses, notifier)
            .record(activity)
            .await;

        assert!(result.is_ok());
        tokio::time::timeout(Duration::from_secs(2), rx.recv()).await?;

        Ok(())
    }

    #[tokio::test]
    async fn repeated_progress_is_appended() -> TestResult {
        let activity = new_activity(Uuid::new_v4(), Uuid::new_v4(), false);

        let mut activities = MockActivityStore::new();
        activities
            .expect_create()
            .times(2)
            .withf(move |a| *a == activity)
            .returning(|_| Ok(Uuid::new_v4()));

        let recorder = recorder(
            activities,
            MockUserStore::new(),
            MockCourseStore::new(),
            MockNotificationService::new(),
        );
        let first = recorder.record(activity).await?;
        let second = recorder.record(activity).await?;

        assert_ne!(first, second);

        Ok(())
    }

    #[tokio::test]
    async fn store_failure_is_surfaced_and_nothing_is_sent() {
        let mut activities = MockActivityStore::new();
        activities
            .expect_create()
            .once()
            .returning(|_| Err(PortError::Storage("activity store create: refused".to_string())));
        let mut notifier = MockNotificationService::new();
        notifier.expect_send().never();

        let result = recorder(
            activities,
            MockUserStore::new(),
            MockCourseStore::new(),
            notifier,
        )
        .record(new_activity(Uuid::new_v4(), Uuid::new_v4(), true))
        .await;

        assert!(matches!(result, Err(PortError::Storage(_))));
    }
}
