mod common;

use common::{make_classifier, make_store, FailingGateway, HangingGateway, RecordingGateway};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use vlesync_sync::{
    DispatchError, DispatchOutcome, DispatchStats, GatewayConfig, HttpGateway, SyncDispatcher,
};
use vlesync_types::{ContextLevel, DomainEvent, OperationName, SyncOperation};

fn enrol(course_id: i64, user_id: i64) -> DomainEvent {
    DomainEvent::UserEnrolmentCreated {
        course_id,
        related_user_id: user_id,
    }
}

// ── Single dispatch ──────────────────────────────────────────────

#[tokio::test]
async fn dispatch_delivers_classified_operation() {
    let store = make_store();
    let course = store.insert_course("id001", "Course 001").unwrap();
    let user = store.insert_user("alice").unwrap();
    let gateway = Arc::new(RecordingGateway::default());
    let dispatcher = SyncDispatcher::new(make_classifier(&store), gateway.clone(), Duration::from_secs(5));

    let outcome = dispatcher.dispatch(&enrol(course, user)).await;

    assert_eq!(outcome, DispatchOutcome::Delivered(OperationName::AddCourseMembers));
    assert_eq!(
        gateway.sent(),
        vec![SyncOperation::AddCourseMembers {
            vle_course_id: "id001".into(),
            usernames: vec!["alice".into()],
        }]
    );
}

#[tokio::test]
async fn dispatch_ignored_event_sends_nothing() {
    let store = make_store();
    let gateway = Arc::new(RecordingGateway::default());
    let dispatcher = SyncDispatcher::new(make_classifier(&store), gateway.clone(), Duration::from_secs(5));

    let outcome = dispatcher
        .dispatch(&DomainEvent::RoleAssigned {
            course_id: 2,
            context_level: ContextLevel::System,
            role_id: 1,
            related_user_id: 1,
        })
        .await;

    assert_eq!(outcome, DispatchOutcome::Ignored);
    assert!(gateway.sent().is_empty());
}

#[tokio::test]
async fn dispatch_unresolved_event_is_dropped() {
    let store = make_store();
    let gateway = Arc::new(RecordingGateway::default());
    let dispatcher = SyncDispatcher::new(make_classifier(&store), gateway.clone(), Duration::from_secs(5));

    let outcome = dispatcher.dispatch(&enrol(404, 1)).await;

    assert!(matches!(outcome, DispatchOutcome::Dropped(reason) if reason.contains("course 404")));
    assert!(gateway.sent().is_empty());
}

#[tokio::test]
async fn dispatch_transport_failure_is_contained() {
    let store = make_store();
    let course = store.insert_course("id001", "Course 001").unwrap();
    let user = store.insert_user("alice").unwrap();
    let dispatcher = SyncDispatcher::new(
        make_classifier(&store),
        Arc::new(FailingGateway { status: 503 }),
        Duration::from_secs(5),
    );

    let outcome = dispatcher.dispatch(&enrol(course, user)).await;
    match outcome {
        DispatchOutcome::Failed(name, reason) => {
            assert_eq!(name, OperationName::AddCourseMembers);
            assert!(reason.contains("503"));
        }
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[tokio::test]
async fn dispatch_times_out_hanging_gateway() {
    let store = make_store();
    let course = store.insert_course("id001", "Course 001").unwrap();
    let user = store.insert_user("alice").unwrap();
    let dispatcher = SyncDispatcher::new(
        make_classifier(&store),
        Arc::new(HangingGateway),
        Duration::from_millis(50),
    );

    let outcome = dispatcher.dispatch(&enrol(course, user)).await;
    assert!(matches!(outcome, DispatchOutcome::Failed(_, reason) if reason.contains("timed out")));
}

#[tokio::test]
async fn dispatch_with_unconfigured_gateway_is_skipped() {
    let store = make_store();
    let course = store.insert_course("id001", "Course 001").unwrap();
    let gateway = HttpGateway::new(GatewayConfig::default()).unwrap();
    let dispatcher = SyncDispatcher::new(make_classifier(&store), Arc::new(gateway), Duration::from_secs(5));

    let outcome = dispatcher
        .dispatch(&DomainEvent::CourseCreated {
            course_id: course,
            fullname: "Course 001".into(),
        })
        .await;
    assert_eq!(outcome, DispatchOutcome::Skipped(OperationName::CreateCourse));
}

// ── Spawned loop ─────────────────────────────────────────────────

#[tokio::test]
async fn spawned_dispatcher_continues_after_bad_events() {
    let store = make_store();
    let course = store.insert_course("id001", "Course 001").unwrap();
    let alice = store.insert_user("alice").unwrap();
    let bob = store.insert_user("bob").unwrap();
    let gateway = Arc::new(RecordingGateway::default());
    let dispatcher = SyncDispatcher::new(make_classifier(&store), gateway.clone(), Duration::from_secs(5));

    let (handle, task) = dispatcher.spawn(8);
    handle.submit(enrol(course, alice)).await.unwrap();
    handle.submit(enrol(404, alice)).await.unwrap();
    handle
        .submit(DomainEvent::RoleUnassigned {
            course_id: course,
            context_level: ContextLevel::User,
            role_id: 3,
            related_user_id: bob,
        })
        .await
        .unwrap();
    handle.submit(enrol(course, bob)).await.unwrap();
    drop(handle);

    let stats = task.await.unwrap();
    assert_eq!(
        stats,
        DispatchStats {
            delivered: 2,
            skipped: 0,
            ignored: 1,
            dropped: 1,
            failed: 0,
        }
    );
    assert_eq!(stats.total(), 4);

    let usernames: Vec<Vec<String>> = gateway
        .sent()
        .into_iter()
        .map(|op| match op {
            SyncOperation::AddCourseMembers { usernames, .. } => usernames,
            other => panic!("unexpected operation {other:?}"),
        })
        .collect();
    assert_eq!(usernames, vec![vec!["alice".to_string()], vec!["bob".to_string()]]);
}

#[tokio::test]
async fn try_submit_reports_full_queue() {
    let store = make_store();
    let course = store.insert_course("id001", "Course 001").unwrap();
    let alice = store.insert_user("alice").unwrap();
    let gateway = Arc::new(RecordingGateway::default());
    let dispatcher = SyncDispatcher::new(make_classifier(&store), gateway.clone(), Duration::from_secs(5));

    // The single-threaded test runtime does not poll the loop until we yield,
    // so the first event still occupies the only slot.
    let (handle, task) = dispatcher.spawn(1);
    handle.try_submit(enrol(course, alice)).unwrap();
    let err = handle.try_submit(enrol(course, alice)).unwrap_err();
    assert!(matches!(err, DispatchError::QueueFull));

    drop(handle);
    let stats = task.await.unwrap();
    assert_eq!(stats.delivered, 1);
    assert_eq!(gateway.sent().len(), 1);
}

#[tokio::test]
async fn submit_after_loop_stops_reports_closed_channel() {
    let store = make_store();
    let dispatcher = SyncDispatcher::new(
        make_classifier(&store),
        Arc::new(RecordingGateway::default()),
        Duration::from_secs(5),
    );

    let (handle, task) = dispatcher.spawn(4);
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    let err = handle.try_submit(enrol(1, 1)).unwrap_err();
    assert!(matches!(err, DispatchError::ChannelClosed));
    let err = handle.submit(enrol(1, 1)).await.unwrap_err();
    assert!(matches!(err, DispatchError::ChannelClosed));
}

#[tokio::test]
async fn stats_record_every_outcome_kind() {
    let mut stats = DispatchStats::default();
    stats.record(&DispatchOutcome::Delivered(OperationName::AddTutor));
    stats.record(&DispatchOutcome::Skipped(OperationName::AddTutor));
    stats.record(&DispatchOutcome::Ignored);
    stats.record(&DispatchOutcome::Dropped("x".into()));
    stats.record(&DispatchOutcome::Failed(OperationName::AddTutor, "y".into()));
    assert_eq!(stats.total(), 5);
    assert_eq!(stats.failed, 1);
}
