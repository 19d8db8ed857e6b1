//! Dispatch engine scenarios against in-memory ports

use super::*;
use crate::domain::{DomainError, PriorityClass, QueueKey, WorkflowGraph};
use crate::port::graph_source::mocks::StaticGraphSource;
use crate::port::id_provider::mocks::SequentialIdProvider;
use crate::port::queue_store::mocks::InMemoryQueueStore;
use crate::port::time_provider::mocks::FixedTimeProvider;
use crate::port::tracking_service::mocks::MockTrackingService;

const STEP_A: &str = "ns:pl:stepA";
const STEP_B: &str = "ns:pl:stepB";

struct Harness {
    engine: DispatchEngine,
    tracking: Arc<MockTrackingService>,
    store: Arc<InMemoryQueueStore>,
}

fn qualified(name: &str) -> QualifiedStep {
    name.parse().unwrap()
}

fn key(step: &str, class: PriorityClass) -> QueueKey {
    QueueKey::new(qualified(step), class)
}

fn harness(steps: Vec<StepDefinition>) -> Harness {
    harness_with_graph(WorkflowGraph::new("ns", "pl", steps))
}

fn harness_with_graph(graph: WorkflowGraph) -> Harness {
    let tracking = Arc::new(MockTrackingService::new());
    let store = Arc::new(InMemoryQueueStore::new());
    let graphs = Arc::new(StaticGraphSource::with_graph(graph));

    let engine = DispatchEngine::new(
        graphs,
        tracking.clone(),
        QueueGateway::new(store.clone()),
        Arc::new(FixedTimeProvider::new(1_000)),
        Arc::new(SequentialIdProvider::default()),
        DispatchConfig::default(),
    );

    Harness {
        engine,
        tracking,
        store,
    }
}

/// `ns:pl:stepA` depending on `ns:pl:stepB`
fn step_a() -> StepDefinition {
    StepDefinition::new(qualified(STEP_A), vec![qualified(STEP_B)])
}

fn pending(jobs: &[(&str, i64)]) -> Vec<EligibleJob> {
    jobs.iter().map(|(id, p)| EligibleJob::new(*id, *p)).collect()
}

#[tokio::test]
async fn test_empty_high_queue_triggers_dispatch() {
    let h = harness(vec![step_a()]);
    h.tracking
        .set_pending(STEP_A, pending(&[("obj1", 5), ("obj2", 50)]));
    h.store
        .seed(&key(STEP_A, PriorityClass::Default), &["older"]);

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert_eq!(report.enqueued_for(STEP_A), 2);
    assert!(report.is_success());
    assert_eq!(
        h.store.items(&key(STEP_A, PriorityClass::Default)),
        vec!["older", "obj1"]
    );
    assert_eq!(h.store.items(&key(STEP_A, PriorityClass::High)), vec!["obj2"]);
    assert_eq!(
        h.tracking.marks(),
        vec![
            (STEP_A.to_string(), "obj1".to_string()),
            (STEP_A.to_string(), "obj2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_supplied_queues_are_left_alone() {
    let h = harness(vec![step_a()]);
    h.tracking
        .set_pending(STEP_A, pending(&[("obj1", 5), ("obj2", 7)]));
    h.store
        .seed(&key(STEP_A, PriorityClass::Default), &["older"]);
    h.store.seed(&key(STEP_A, PriorityClass::High), &["urgent"]);

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert_eq!(report.enqueued_for(STEP_A), 0);
    assert!(matches!(
        report.outcome_for(STEP_A),
        Some(StepOutcome::Skipped {
            reason: SkipReason::QueuesSupplied
        })
    ));
    assert!(h.store.pushes().is_empty());
    assert!(h.tracking.marks().is_empty());
}

#[tokio::test]
async fn test_priority_items_bypass_full_queues() {
    let h = harness(vec![step_a()]);
    h.tracking
        .set_pending(STEP_A, pending(&[("obj1", 5), ("obj2", 150)]));
    h.store
        .seed(&key(STEP_A, PriorityClass::Default), &["older"]);
    h.store
        .seed(&key(STEP_A, PriorityClass::Critical), &["urgent"]);

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert_eq!(report.enqueued_for(STEP_A), 2);
    assert_eq!(
        h.store.items(&key(STEP_A, PriorityClass::Critical)),
        vec!["urgent", "obj2"]
    );
}

#[tokio::test]
async fn test_empty_result_makes_no_queue_calls() {
    let h = harness(vec![step_a()]);

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert_eq!(report.enqueued_for(STEP_A), 0);
    assert!(matches!(
        report.outcome_for(STEP_A),
        Some(StepOutcome::Skipped {
            reason: SkipReason::NoPendingObjects
        })
    ));
    assert_eq!(h.tracking.queries().len(), 1);
    assert!(h.store.empty_checks().is_empty());
    assert!(h.store.pushes().is_empty());
    assert!(h.tracking.marks().is_empty());
}

#[tokio::test]
async fn test_mark_failure_aborts_rest_of_batch() {
    let h = harness(vec![step_a()]);
    h.tracking
        .set_pending(STEP_A, pending(&[("obj1", 5), ("obj2", 50)]));
    h.tracking.fail_mark_for("obj1");

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert!(!report.is_success());
    match report.outcome_for(STEP_A) {
        Some(StepOutcome::Failed {
            enqueued,
            error: AppError::Dispatch {
                step,
                object_id,
                source,
            },
        }) => {
            assert_eq!(*enqueued, 0);
            assert_eq!(step, STEP_A);
            assert_eq!(object_id, "obj1");
            assert!(matches!(**source, AppError::TrackingUnavailable(_)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    // obj1 made it into the queue before the mark failed; obj2 was never touched
    assert_eq!(
        h.store.items(&key(STEP_A, PriorityClass::Default)),
        vec!["obj1"]
    );
    assert!(h.store.items(&key(STEP_A, PriorityClass::High)).is_empty());
    assert!(h.tracking.marks().is_empty());
}

#[tokio::test]
async fn test_unmarked_object_is_enqueued_again_next_pass() {
    let h = harness(vec![step_a()]);
    h.tracking.set_pending(STEP_A, pending(&[("obj1", 50)]));
    h.tracking.fail_mark_for("obj1");

    let first = h.engine.run("ns", "pl").await.unwrap();
    assert!(!first.is_success());

    h.tracking.clear_failures();
    let second = h.engine.run("ns", "pl").await.unwrap();
    assert_eq!(second.enqueued_for(STEP_A), 1);

    // At-least-once: the object now sits in the queue twice
    assert_eq!(
        h.store.items(&key(STEP_A, PriorityClass::High)),
        vec!["obj1", "obj1"]
    );
    assert!(h.tracking.pending(STEP_A).is_empty());
}

#[tokio::test]
async fn test_enqueue_failure_is_dispatch_error() {
    let h = harness(vec![step_a()]);
    h.tracking
        .set_pending(STEP_A, pending(&[("obj1", 5), ("obj2", 6), ("obj3", 7)]));
    h.store.fail_push_for("obj2");

    let report = h.engine.run("ns", "pl").await.unwrap();

    match report.outcome_for(STEP_A) {
        Some(StepOutcome::Failed {
            enqueued,
            error: AppError::Dispatch {
                object_id, source, ..
            },
        }) => {
            assert_eq!(*enqueued, 1);
            assert_eq!(object_id, "obj2");
            assert!(matches!(**source, AppError::QueueUnavailable(_)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(
        h.tracking.marks(),
        vec![(STEP_A.to_string(), "obj1".to_string())]
    );
}

#[tokio::test]
async fn test_step_without_prerequisites_is_never_queried() {
    let lonely = StepDefinition::new(qualified("ns:pl:start"), vec![]);
    let h = harness(vec![lonely]);
    h.tracking.set_pending("ns:pl:start", pending(&[("obj1", 500)]));

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert_eq!(report.enqueued_for("ns:pl:start"), 0);
    assert!(matches!(
        report.outcome_for("ns:pl:start"),
        Some(StepOutcome::Skipped {
            reason: SkipReason::NoPrerequisites
        })
    ));
    assert!(h.tracking.queries().is_empty());
}

#[tokio::test]
async fn test_skipped_step_is_never_queried() {
    let h = harness(vec![step_a().skipped()]);
    h.tracking.set_pending(STEP_A, pending(&[("obj1", 500)]));

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert!(matches!(
        report.outcome_for(STEP_A),
        Some(StepOutcome::Skipped {
            reason: SkipReason::Disabled
        })
    ));
    assert!(h.tracking.queries().is_empty());
    assert!(h.store.pushes().is_empty());
}

#[tokio::test]
async fn test_failing_step_does_not_stop_later_steps() {
    let step_c = StepDefinition::new(qualified("ns:pl:stepC"), vec![qualified(STEP_A)]);
    let h = harness(vec![step_a(), step_c]);
    h.tracking.fail_query_for(STEP_A);
    h.tracking.set_pending("ns:pl:stepC", pending(&[("obj9", 1)]));

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert!(!report.is_success());
    assert!(matches!(
        report.outcome_for(STEP_A),
        Some(StepOutcome::Failed {
            enqueued: 0,
            error: AppError::TrackingUnavailable(_)
        })
    ));
    assert_eq!(report.enqueued_for("ns:pl:stepC"), 1);
    assert_eq!(report.total_enqueued(), 1);
}

#[tokio::test]
async fn test_unavailable_queue_store_fails_step() {
    let h = harness(vec![step_a()]);
    h.tracking.set_pending(STEP_A, pending(&[("obj1", 5)]));
    h.store.set_unavailable(true);

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert!(matches!(
        report.outcome_for(STEP_A),
        Some(StepOutcome::Failed {
            enqueued: 0,
            error: AppError::QueueUnavailable(_)
        })
    ));
    assert!(h.tracking.marks().is_empty());
}

#[tokio::test]
async fn test_query_uses_step_limit_and_prerequisites() {
    let h = harness(vec![step_a().with_limit(1)]);
    h.tracking
        .set_pending(STEP_A, pending(&[("obj1", 5), ("obj2", 6)]));

    let report = h.engine.run("ns", "pl").await.unwrap();

    let queries = h.tracking.queries();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].step.as_str(), STEP_A);
    assert_eq!(queries[0].prerequisites, vec![qualified(STEP_B)]);
    assert_eq!(queries[0].limit, 1);
    assert!(queries[0].with_priority);
    assert_eq!(report.enqueued_for(STEP_A), 1);
}

#[tokio::test]
async fn test_query_defaults_to_configured_limit() {
    let h = harness(vec![step_a()]);

    h.engine.run("ns", "pl").await.unwrap();

    assert_eq!(h.tracking.queries()[0].limit, DEFAULT_PENDING_LIMIT);
}

#[tokio::test]
async fn test_every_present_class_is_checked() {
    let h = harness(vec![step_a()]);
    h.tracking
        .set_pending(STEP_A, pending(&[("obj1", -5), ("obj2", 5), ("obj3", 45)]));

    h.engine.run("ns", "pl").await.unwrap();

    let checked: Vec<PriorityClass> = h.store.empty_checks().iter().map(|k| k.class).collect();
    assert_eq!(
        checked,
        vec![
            PriorityClass::Low,
            PriorityClass::Default,
            PriorityClass::High
        ]
    );
}

#[tokio::test]
async fn test_missing_graph_aborts_run() {
    let h = harness(vec![step_a()]);

    let err = h.engine.run("ns", "otherWF").await.unwrap_err();

    assert!(matches!(err, AppError::GraphLoad { .. }));
    assert!(h.tracking.queries().is_empty());
}

#[tokio::test]
async fn test_report_metadata() {
    let h = harness(vec![step_a()]);

    let first = h.engine.run("ns", "pl").await.unwrap();
    let second = h.engine.run("ns", "pl").await.unwrap();

    assert_eq!(first.run_id, "run-1");
    assert_eq!(second.run_id, "run-2");
    assert_eq!(first.namespace, "ns");
    assert_eq!(first.pipeline, "pl");
    assert_eq!(first.started_at, 1_000);
    assert_eq!(first.finished_at, Some(1_000));
    assert_eq!(first.steps.len(), 1);
}

#[tokio::test]
async fn test_mark_enqueued_requires_qualified_step() {
    let h = harness(vec![]);

    let err = h.engine.mark_enqueued("jp2-create", "obj1").await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Domain(DomainError::InvalidStepName(_))
    ));

    let status = h.engine.mark_enqueued(STEP_A, "obj1").await.unwrap();
    assert_eq!(status, StepStatus::Queued);
    assert_eq!(
        h.tracking.marks(),
        vec![(STEP_A.to_string(), "obj1".to_string())]
    );
}

#[tokio::test]
async fn test_repeated_object_is_dispatched_once() {
    let h = harness(vec![step_a()]);
    h.tracking.set_pending(
        STEP_A,
        pending(&[("obj1", 5), ("obj2", 0), ("obj1", 50)]),
    );

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert_eq!(report.enqueued_for(STEP_A), 2);
    // First position, last priority
    assert_eq!(h.store.items(&key(STEP_A, PriorityClass::High)), vec!["obj1"]);
    assert_eq!(h.store.items(&key(STEP_A, PriorityClass::Default)), vec!["obj2"]);
    assert_eq!(
        h.tracking.marks(),
        vec![
            (STEP_A.to_string(), "obj1".to_string()),
            (STEP_A.to_string(), "obj2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_unqualified_node_fails_only_its_step() {
    let graph = WorkflowGraph::parse(
        "ns",
        "pl",
        r#"
processes:
  - name: bad step
    prereq: [stepB]
  - name: stepA
    prereq: [stepB]
"#,
    )
    .unwrap();
    let h = harness_with_graph(graph);
    h.tracking.set_pending(STEP_A, pending(&[("obj1", 0)]));

    let report = h.engine.run("ns", "pl").await.unwrap();

    assert!(!report.is_success());
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[0].step, "ns:pl:bad step");
    assert!(matches!(
        report.outcome_for("ns:pl:bad step"),
        Some(StepOutcome::Failed {
            enqueued: 0,
            error: AppError::Domain(DomainError::InvalidStepName(_))
        })
    ));
    assert_eq!(report.enqueued_for(STEP_A), 1);
    assert_eq!(h.tracking.queries().len(), 1);
}
