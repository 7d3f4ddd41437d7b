mod common;

use std::time::Duration;

use chrono::Utc;
use clinic_sync::application::ports::{LocalStore, MutationQueue, RemoteError, SyncStatusStore};
use clinic_sync::application::services::{OfflineServiceTrait, SyncEvent, SyncOutcome, SyncState};
use clinic_sync::domain::entities::QueueEntryDraft;
use clinic_sync::domain::value_objects::{
    Collection, MutationType, RecordPayload, SyncOutcomeStatus,
};
use common::sync_support::{backdate_entry, drain_completed, next_report, setup_sync};
use serde_json::json;

fn draft(
    mutation_type: MutationType,
    entity: Collection,
    data: serde_json::Value,
) -> QueueEntryDraft {
    QueueEntryDraft::new(mutation_type, entity, RecordPayload::new(data).unwrap())
}

#[tokio::test]
async fn drain_replays_entries_in_enqueue_order_across_entities() {
    let ctx = setup_sync(true).await;
    let mut expected = Vec::new();
    for (entity, id) in [
        (Collection::Visits, 3),
        (Collection::Patients, 1),
        (Collection::LabResults, 9),
        (Collection::Patients, 2),
        (Collection::Prescriptions, 4),
    ] {
        let entry_id = ctx
            .queue
            .enqueue(draft(MutationType::Update, entity, json!({"id": id})))
            .await
            .unwrap();
        expected.push(entry_id);
    }

    let pending: Vec<_> = ctx
        .queue
        .list_pending()
        .await
        .unwrap()
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    assert_eq!(pending, expected);

    ctx.manager.drain_queue().await.unwrap();

    let submitted: Vec<_> = ctx.remote.submitted().into_iter().map(|e| e.id).collect();
    assert_eq!(submitted, expected);
    assert!(ctx.queue.is_empty().await.unwrap());
}

#[tokio::test]
async fn failing_entry_is_retried_every_pass_until_it_ages_out() {
    let ctx = setup_sync(true).await;
    ctx.remote
        .fail_all_submits(RemoteError::Retryable("connection refused".into()));
    let entry_id = ctx
        .queue
        .enqueue(draft(MutationType::Update, Collection::Patients, json!({"id": 1})))
        .await
        .unwrap();

    for attempt in 1..=3 {
        ctx.manager.sync_now().await.unwrap();
        let pending = ctx.queue.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1, "entry must survive failed pass {attempt}");
        assert_eq!(pending[0].attempts, attempt);
    }
    assert_eq!(ctx.remote.submit_count(), 3);

    backdate_entry(
        &ctx.pool,
        entry_id.as_str(),
        Utc::now() - chrono::Duration::days(8),
    )
    .await;
    let mut events = ctx.manager.subscribe();

    ctx.manager.sync_now().await.unwrap();

    assert!(ctx.queue.is_empty().await.unwrap());
    assert_eq!(ctx.remote.submit_count(), 3, "aged-out entry must not be sent");
    let discarded = loop {
        match events.recv().await.unwrap() {
            SyncEvent::EntriesDiscarded(ids) => break ids,
            _ => continue,
        }
    };
    assert_eq!(discarded, vec![entry_id]);
}

#[tokio::test]
async fn draining_empty_queue_is_a_no_op() {
    let ctx = setup_sync(true).await;

    let report = ctx.manager.drain_queue().await.unwrap();

    assert_eq!(report.attempted(), 0);
    assert_eq!(ctx.remote.call_count(), 0);
    assert!(ctx.statuses.list_statuses().await.unwrap().is_empty());
}

#[tokio::test]
async fn sync_pass_over_empty_queue_is_a_no_op() {
    let ctx = setup_sync(true).await;
    ctx.remote
        .set_pull(Collection::Patients, vec![json!({"id": 1, "firstName": "Ada"})]);
    let mut events = ctx.manager.subscribe();

    let outcome = ctx.manager.sync_now().await.unwrap();

    assert_eq!(outcome, SyncOutcome::NothingToSync);
    assert_eq!(ctx.remote.call_count(), 0);
    assert!(ctx.statuses.list_statuses().await.unwrap().is_empty());
    assert_eq!(ctx.store.count(Collection::Patients).await.unwrap(), 0);
    assert_eq!(ctx.manager.state().await, SyncState::Idle);
    assert!(events.try_recv().is_err());
}

#[tokio::test]
async fn overlapping_triggers_submit_each_entry_once() {
    let ctx = setup_sync(true).await;
    ctx.remote.set_submit_delay(Duration::from_millis(50));
    for id in 1..=3 {
        ctx.queue
            .enqueue(draft(MutationType::Update, Collection::Patients, json!({"id": id})))
            .await
            .unwrap();
    }

    let handles = (0..5).map(|_| {
        let manager = ctx.manager.clone();
        tokio::spawn(async move { manager.sync_now().await })
    });
    let outcomes = futures::future::join_all(handles).await;

    let mut completed = 0;
    let mut skipped = 0;
    let mut nothing_left = 0;
    for outcome in outcomes {
        match outcome.unwrap().unwrap() {
            SyncOutcome::Completed(_) => completed += 1,
            SyncOutcome::Skipped => skipped += 1,
            SyncOutcome::NothingToSync => nothing_left += 1,
            SyncOutcome::Offline => panic!("manager is online"),
        }
    }

    assert_eq!(completed, 1);
    assert_eq!(completed + skipped + nothing_left, 5);
    assert_eq!(ctx.remote.submit_count(), 3);
    assert!(ctx.queue.is_empty().await.unwrap());
}

#[tokio::test]
async fn going_online_triggers_exactly_one_pass() {
    let ctx = setup_sync(false).await;
    ctx.manager.start().await;
    let mut events = ctx.manager.subscribe();
    ctx.service
        .update(Collection::Patients, 12, json!({"firstName": "Ada"}))
        .await
        .unwrap();
    assert_eq!(ctx.manager.state().await, SyncState::Offline);

    ctx.connectivity.set_online(true);

    let report = next_report(&mut events).await;
    assert_eq!(report.drain.synced.len(), 1);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(drain_completed(&mut events), 0);
    assert_eq!(ctx.remote.submit_count(), 1);
    assert_eq!(ctx.manager.state().await, SyncState::Idle);

    ctx.manager.stop().await;
}

#[tokio::test]
async fn going_offline_moves_to_offline_state() {
    let ctx = setup_sync(true).await;
    ctx.manager.start().await;
    let mut events = ctx.manager.subscribe();

    ctx.connectivity.set_online(false);

    let state = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(SyncEvent::StateChanged(state)) = events.recv().await {
                return state;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(state, SyncState::Offline);
    assert_eq!(
        ctx.manager.sync_now().await.unwrap(),
        SyncOutcome::Offline
    );
    assert_eq!(ctx.remote.call_count(), 0);

    ctx.manager.stop().await;
}

#[tokio::test]
async fn offline_create_is_confirmed_and_replaced_by_pulled_copy() {
    let ctx = setup_sync(false).await;
    ctx.manager.start().await;
    let mut events = ctx.manager.subscribe();

    let saved = ctx
        .service
        .create(Collection::Patients, json!({"firstName": "John", "lastName": "Doe"}))
        .await
        .unwrap();
    assert!(saved.is_provisional());
    ctx.remote.set_pull(
        Collection::Patients,
        vec![json!({"id": 101, "firstName": "John", "lastName": "Doe"})],
    );

    ctx.connectivity.set_online(true);
    let report = next_report(&mut events).await;

    assert_eq!(report.drain.synced.len(), 1);
    assert!(ctx.queue.is_empty().await.unwrap());
    let patients = ctx.store.get_all(Collection::Patients).await.unwrap();
    assert_eq!(patients.len(), 1);
    assert_eq!(patients[0].id, 101);
    assert!(
        ctx.store
            .get(Collection::Patients, saved.record_id)
            .await
            .unwrap()
            .is_none()
    );

    let sent = &ctx.remote.submitted()[0];
    assert_eq!(sent.mutation_type, MutationType::Create);
    assert_eq!(sent.data.as_json(), &json!({"firstName": "John", "lastName": "Doe"}));

    ctx.manager.stop().await;
}

#[tokio::test]
async fn two_updates_to_same_record_are_both_sent_in_order() {
    let ctx = setup_sync(true).await;
    ctx.service
        .update(Collection::Patients, 5, json!({"firstName": "Jane"}))
        .await
        .unwrap();
    ctx.service
        .update(Collection::Patients, 5, json!({"firstName": "Janet"}))
        .await
        .unwrap();

    ctx.manager.sync_now().await.unwrap();

    let names: Vec<_> = ctx
        .remote
        .submitted()
        .iter()
        .map(|entry| entry.data.as_json()["firstName"].clone())
        .collect();
    assert_eq!(names, vec![json!("Jane"), json!("Janet")]);
}

#[tokio::test]
async fn purge_removes_week_old_entry_without_network() {
    let ctx = setup_sync(true).await;
    let stale = ctx
        .queue
        .enqueue(
            draft(MutationType::Create, Collection::Visits, json!({"reason": "flu"}))
                .at(Utc::now() - chrono::Duration::days(8)),
        )
        .await
        .unwrap();

    let report = ctx.queue.purge_stale(7).await.unwrap();

    assert_eq!(report.stale_discarded, vec![stale]);
    assert!(ctx.queue.is_empty().await.unwrap());
    assert_eq!(ctx.remote.call_count(), 0);
}

#[tokio::test]
async fn client_error_rejects_entry_on_first_attempt() {
    let ctx = setup_sync(true).await;
    ctx.remote.push_submit_result(Err(RemoteError::Permanent {
        status: Some(422),
        message: "firstName is required".into(),
    }));
    let entry_id = ctx
        .queue
        .enqueue(draft(MutationType::Create, Collection::Patients, json!({"lastName": "Doe"})))
        .await
        .unwrap();
    let mut events = ctx.manager.subscribe();

    let report = ctx.manager.drain_queue().await.unwrap();

    assert_eq!(report.rejected.len(), 1);
    assert_eq!(report.rejected[0].status, Some(422));
    assert!(ctx.queue.list_pending().await.unwrap().is_empty());
    let rejected = ctx.queue.list_rejected().await.unwrap();
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].id, entry_id);
    assert_eq!(rejected[0].last_error.as_deref(), Some("firstName is required"));

    match events.recv().await.unwrap() {
        SyncEvent::EntryRejected(rejection) => assert_eq!(rejection.entry_id, entry_id),
        other => panic!("unexpected event: {other:?}"),
    }

    ctx.manager.drain_queue().await.unwrap();
    assert_eq!(ctx.remote.submit_count(), 1, "rejected entries are not retried");
}

#[tokio::test]
async fn failed_pull_marks_error_and_keeps_cursor() {
    let ctx = setup_sync(true).await;
    ctx.remote
        .set_pull(Collection::Patients, vec![json!({"id": 1, "firstName": "Ada"})]);

    ctx.manager.refresh().await;
    let first = ctx
        .statuses
        .get_status(Collection::Patients)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.status, SyncOutcomeStatus::Success);
    let cursor = first.last_sync.expect("cursor after successful pull");

    ctx.remote.fail_pull(
        Collection::Patients,
        RemoteError::Retryable("HTTP 502: bad gateway".into()),
    );
    let refreshed = ctx.manager.refresh().await;

    let patients = refreshed
        .iter()
        .find(|refresh| refresh.collection == Collection::Patients)
        .unwrap();
    assert!(patients.error.is_some());
    let after = ctx
        .statuses
        .get_status(Collection::Patients)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.status, SyncOutcomeStatus::Error);
    assert_eq!(after.last_sync, Some(cursor));
    assert!(after.last_error.unwrap().contains("bad gateway"));

    let since = ctx.remote.fetches_for(Collection::Patients);
    assert_eq!(since, vec![None, Some(cursor)]);

    let visits = ctx
        .statuses
        .get_status(Collection::Visits)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(visits.status, SyncOutcomeStatus::Success);
}
