use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use super::common::*;
use crate::applications::{
    ApplicationPatch, ApplicationStatus, ApplicationSubmission, ApplicationUpdate, QueueError,
};
use crate::error::DomainError;
use crate::store::ApplicationStore;

#[tokio::test]
async fn departures_compact_the_queue_in_join_order() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let a = individual(&store, "ama@example.org").await;
    let b = individual(&store, "bola@example.org").await;
    let c = individual(&store, "chidi@example.org").await;

    for applicant in [&a, &b, &c] {
        queued(&service, &owner, applicant, &opportunity).await;
    }
    assert_eq!(
        positions(&service, &owner, &opportunity).await,
        vec![(a.user_id, 1), (b.user_id, 2), (c.user_id, 3)]
    );

    service
        .leave_queue(&b, opportunity.id)
        .await
        .expect("b leaves");

    let view = service
        .interview_queue(&owner, opportunity.id)
        .await
        .expect("owner views queue");
    assert_eq!(view.total, 2);
    assert_eq!(
        positions(&service, &owner, &opportunity).await,
        vec![(a.user_id, 1), (c.user_id, 2)]
    );
}

#[tokio::test]
async fn unqualified_applicants_cannot_join() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let applicant = individual(&store, "ama@example.org").await;
    let application = applied(&service, &applicant, &opportunity).await;

    match service
        .update(&applicant, application.id, ApplicationUpdate::JoinQueue)
        .await
    {
        Err(DomainError::Queue(QueueError::NotQualified)) => {}
        other => panic!("expected not qualified, got {other:?}"),
    }
}

#[tokio::test]
async fn leaving_twice_reports_not_queued_without_moving_anyone() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let a = individual(&store, "ama@example.org").await;
    let b = individual(&store, "bola@example.org").await;
    queued(&service, &owner, &a, &opportunity).await;
    queued(&service, &owner, &b, &opportunity).await;

    service.leave_queue(&a, opportunity.id).await.expect("first leave");
    let before = positions(&service, &owner, &opportunity).await;

    match service.leave_queue(&a, opportunity.id).await {
        Err(DomainError::Queue(QueueError::NotQueued)) => {}
        other => panic!("expected not queued, got {other:?}"),
    }
    assert_eq!(positions(&service, &owner, &opportunity).await, before);
    assert_eq!(before, vec![(b.user_id, 1)]);
}

#[tokio::test]
async fn joining_twice_reports_already_queued() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let applicant = individual(&store, "ama@example.org").await;
    queued(&service, &owner, &applicant, &opportunity).await;

    match service.join_queue(&applicant, opportunity.id).await {
        Err(DomainError::Queue(QueueError::AlreadyQueued)) => {}
        other => panic!("expected already queued, got {other:?}"),
    }
}

#[tokio::test]
async fn disqualifying_removes_from_queue_and_renumbers() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let a = individual(&store, "ama@example.org").await;
    let b = individual(&store, "bola@example.org").await;
    let c = individual(&store, "chidi@example.org").await;
    for applicant in [&a, &b, &c] {
        queued(&service, &owner, applicant, &opportunity).await;
    }

    let disqualified = service
        .disqualify(&owner, opportunity.id, a.user_id)
        .await
        .expect("owner disqualifies");

    assert!(!disqualified.is_qualified);
    assert!(disqualified.qualification_date.is_none());
    assert!(!disqualified.in_interview_queue);
    assert_eq!(disqualified.queue_position, None);
    assert_eq!(
        positions(&service, &owner, &opportunity).await,
        vec![(b.user_id, 1), (c.user_id, 2)]
    );
}

#[tokio::test]
async fn withdrawing_a_queued_application_compacts_the_queue() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let a = individual(&store, "ama@example.org").await;
    let b = individual(&store, "bola@example.org").await;
    let first = queued(&service, &owner, &a, &opportunity).await;
    queued(&service, &owner, &b, &opportunity).await;

    service.withdraw(&a, first.id).await.expect("withdraws");

    assert!(store
        .fetch_application(first.id)
        .await
        .expect("fetch succeeds")
        .is_none());
    assert_eq!(
        positions(&service, &owner, &opportunity).await,
        vec![(b.user_id, 1)]
    );
}

#[tokio::test]
async fn duplicate_applications_conflict() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let applicant = individual(&store, "ama@example.org").await;
    applied(&service, &applicant, &opportunity).await;

    match service
        .apply(&applicant, opportunity.id, ApplicationSubmission::default())
        .await
    {
        Err(DomainError::Conflict(_)) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn past_deadline_and_organizations_are_rejected() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let expired = closed(&store, &owner).await;
    let open = published(&store, &owner).await;
    let applicant = individual(&store, "ama@example.org").await;

    match service
        .apply(&applicant, expired.id, ApplicationSubmission::default())
        .await
    {
        Err(DomainError::Validation(err)) => assert_eq!(err.field, "opportunity_id"),
        other => panic!("expected validation error, got {other:?}"),
    }

    match service
        .apply(&owner, open.id, ApplicationSubmission::default())
        .await
    {
        Err(DomainError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn answers_are_checked_against_custom_fields() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let applicant = individual(&store, "ama@example.org").await;

    let mut answers = BTreeMap::new();
    answers.insert("portfolio".to_string(), "not a link".to_string());
    let submission = ApplicationSubmission {
        answers,
        ..ApplicationSubmission::default()
    };

    match service.apply(&applicant, opportunity.id, submission).await {
        Err(DomainError::Validation(err)) => assert_eq!(err.field, "answers.portfolio"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn actions_are_restricted_to_their_party() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let applicant = individual(&store, "ama@example.org").await;
    let stranger = individual(&store, "eve@example.org").await;
    let application = applied(&service, &applicant, &opportunity).await;

    for (principal, update) in [
        (&applicant, ApplicationUpdate::Qualify),
        (&owner, ApplicationUpdate::JoinQueue),
        (&stranger, ApplicationUpdate::LeaveQueue),
    ] {
        match service.update(principal, application.id, update).await {
            Err(DomainError::Forbidden(_)) => {}
            other => panic!("expected forbidden, got {other:?}"),
        }
    }

    match service.get(&stranger, application.id).await {
        Err(DomainError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[tokio::test]
async fn owner_updates_keep_the_first_qualification_date() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let applicant = individual(&store, "ama@example.org").await;
    let application = applied(&service, &applicant, &opportunity).await;

    let first = service
        .update(&owner, application.id, ApplicationUpdate::Qualify)
        .await
        .expect("qualifies");
    let again = service
        .update(&owner, application.id, ApplicationUpdate::Qualify)
        .await
        .expect("qualifies again");
    assert_eq!(first.qualification_date, again.qualification_date);

    let reviewed = service
        .update(
            &owner,
            application.id,
            ApplicationUpdate::SetStatus {
                status: ApplicationStatus::Reviewing,
            },
        )
        .await
        .expect("status set");
    assert_eq!(reviewed.status, ApplicationStatus::Reviewing);
    assert!(reviewed.is_qualified);
}

#[tokio::test]
async fn applicants_see_only_their_own_queue_entry() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let a = individual(&store, "ama@example.org").await;
    let b = individual(&store, "bola@example.org").await;
    let stranger = individual(&store, "eve@example.org").await;
    queued(&service, &owner, &a, &opportunity).await;
    queued(&service, &owner, &b, &opportunity).await;

    let view = service
        .interview_queue(&b, opportunity.id)
        .await
        .expect("applicant views queue");
    assert_eq!(view.total, 2);
    assert_eq!(view.entries.len(), 1);
    assert_eq!(view.entries[0].applicant_id, b.user_id);
    assert_eq!(view.entries[0].position, 2);

    match service.interview_queue(&stranger, opportunity.id).await {
        Err(DomainError::Forbidden(_)) => {}
        other => panic!("expected forbidden, got {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_joins_and_leaves_keep_positions_contiguous() {
    let (service, store) = build_service();
    let service = Arc::new(service);
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;

    let mut applicants = Vec::new();
    for index in 0..24 {
        let applicant = individual(&store, &format!("applicant{index}@example.org")).await;
        let application = applied(&service, &applicant, &opportunity).await;
        service
            .update(&owner, application.id, ApplicationUpdate::Qualify)
            .await
            .expect("qualifies");
        applicants.push(applicant);
    }

    let mut tasks = Vec::new();
    for (index, applicant) in applicants.into_iter().enumerate() {
        let service = service.clone();
        let opportunity_id = opportunity.id;
        tasks.push(tokio::spawn(async move {
            service
                .join_queue(&applicant, opportunity_id)
                .await
                .expect("joins");
            if index % 3 == 0 {
                service
                    .leave_queue(&applicant, opportunity_id)
                    .await
                    .expect("leaves");
            }
        }));
    }
    for task in tasks {
        task.await.expect("task completes");
    }

    let mut observed: Vec<u32> = positions(&service, &owner, &opportunity)
        .await
        .into_iter()
        .map(|(_, position)| position)
        .collect();
    observed.sort_unstable();
    assert_eq!(observed, (1..=16).collect::<Vec<u32>>());
}

#[tokio::test]
async fn listing_is_scoped_to_caller() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let a = individual(&store, "ama@example.org").await;
    let b = individual(&store, "bola@example.org").await;
    applied(&service, &a, &opportunity).await;
    applied(&service, &b, &opportunity).await;

    assert_eq!(service.list_mine(&a).await.expect("lists").len(), 1);
    assert_eq!(
        service
            .list_for_opportunity(&owner, opportunity.id)
            .await
            .expect("owner lists")
            .len(),
        2
    );
    assert!(matches!(
        service.list_for_opportunity(&a, opportunity.id).await,
        Err(DomainError::Forbidden(_))
    ));
}

#[tokio::test]
async fn applicant_edits_after_a_disqualification_do_not_requalify() {
    let (service, store) = build_service();
    let owner = organization(&store, "hiring@northwind.org").await;
    let opportunity = published(&store, &owner).await;
    let applicant = individual(&store, "ama@example.org").await;
    let application = applied(&service, &applicant, &opportunity).await;
    service
        .update(&owner, application.id, ApplicationUpdate::Qualify)
        .await
        .expect("owner qualifies");

    let stale = service
        .get(&applicant, application.id)
        .await
        .expect("applicant reads");
    assert!(stale.is_qualified);

    service
        .update(&owner, application.id, ApplicationUpdate::Disqualify)
        .await
        .expect("owner disqualifies");

    store
        .patch_application(
            stale.id,
            ApplicationPatch::Notes("written from an old copy".to_string()),
            Utc::now(),
        )
        .await
        .expect("notes patched");
    let edited = service
        .update(
            &applicant,
            application.id,
            ApplicationUpdate::UpdateDocuments { documents: Vec::new() },
        )
        .await
        .expect("documents updated");

    assert_eq!(edited.notes, "written from an old copy");
    assert!(!edited.is_qualified);
    assert!(edited.qualification_date.is_none());

    match service
        .update(&applicant, application.id, ApplicationUpdate::JoinQueue)
        .await
    {
        Err(DomainError::Queue(QueueError::NotQualified)) => {}
        other => panic!("expected not qualified, got {other:?}"),
    }
}

#[tokio::test]
async fn owners_cannot_apply_to_their_own_opportunity() {
    let (service, store) = build_service();
    let owner = individual(&store, "founder@example.org").await;
    let opportunity = published(&store, &owner).await;

    match service
        .apply(&owner, opportunity.id, ApplicationSubmission::default())
        .await
    {
        Err(DomainError::Forbidden(message)) => assert!(message.contains("own opportunity")),
        other => panic!("expected forbidden, got {other:?}"),
    }
    assert!(service.list_mine(&owner).await.expect("lists").is_empty());
}
