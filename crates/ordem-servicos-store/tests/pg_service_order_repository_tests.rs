//! Integration tests for `PgServiceOrderRepository`.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use ordem_servicos_core::clock::Clock;
use ordem_servicos_core::error::DomainError;
use ordem_servicos_os::domain::aggregates::{DetailsUpdate, ServiceOrder, ServiceOrderParts, Sla};
use ordem_servicos_os::domain::events::{EventMetadata, MetadataValue, ServiceOrderEvent};
use ordem_servicos_os::domain::repository::ServiceOrderRepository;
use ordem_servicos_os::domain::status::ServiceOrderStatus;
use ordem_servicos_store::pg_service_order_repository::PgServiceOrderRepository;
use ordem_servicos_test_support::{FixedClock, SteppingClock};
use sqlx::PgPool;
use uuid::Uuid;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap()
}

fn stepping_clock() -> SteppingClock {
    SteppingClock::new(start(), Duration::seconds(1))
}

async fn seed(
    repo: &PgServiceOrderRepository,
    clock: &dyn Clock,
    authority_id: Uuid,
    title: &str,
    priority: i32,
) -> ServiceOrder {
    let order = ServiceOrder::new(
        title,
        "descricao",
        "Rua A, 100",
        authority_id,
        Uuid::new_v4(),
        priority,
        clock,
    );
    repo.create(&order).await.unwrap();
    order
}

fn titles(orders: &[ServiceOrder]) -> Vec<&str> {
    orders.iter().map(ServiceOrder::title).collect()
}

// --- create + get_by_id round-trip ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_by_id_returns_not_found_for_unknown_id(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool);
    let id = Uuid::new_v4();

    let result = repo.get_by_id(id).await;

    match result {
        Err(DomainError::NotFound(missing)) => assert_eq!(missing, id),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_and_get_by_id_round_trips_every_field(pool: PgPool) {
    // Arrange
    let repo = PgServiceOrderRepository::new(pool);
    let clock = stepping_clock();
    let user_id = Uuid::new_v4();
    let mut order = ServiceOrder::new(
        "Buraco na via",
        "Cratera em frente ao numero 100",
        "Rua A, 100",
        Uuid::new_v4(),
        Uuid::new_v4(),
        4,
        &clock,
    );
    order.assign_responsible(Uuid::new_v4(), user_id, &clock);
    order.change_status(ServiceOrderStatus::InProgress, user_id, "equipe a caminho", &clock);
    order.attach_sla(
        Sla {
            id: Uuid::new_v4(),
            deadline: start() + Duration::hours(48),
            warning: start() + Duration::hours(24),
            priority: 4,
            description: "asfalto".to_owned(),
        },
        user_id,
        &clock,
    );
    order.add_tag("urgente", &clock);
    order.add_tag("asfalto", &clock);

    // Act
    repo.create(&order).await.unwrap();
    let loaded = repo.get_by_id(order.id()).await.unwrap();

    // Assert
    assert_eq!(loaded, order);
    assert_eq!(loaded.history().len(), 3);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_create_rejects_duplicate_id(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool);
    let clock = FixedClock(start());
    let order = seed(&repo, &clock, Uuid::new_v4(), "t", 3).await;

    let result = repo.create(&order).await;

    assert!(matches!(result, Err(DomainError::Infrastructure(_))));
}

// --- list queries ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_by_authority_is_newest_first_and_paginated(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool);
    let clock = stepping_clock();
    let authority_id = Uuid::new_v4();
    for title in ["first", "second", "third"] {
        seed(&repo, &clock, authority_id, title, 3).await;
    }
    seed(&repo, &clock, Uuid::new_v4(), "other authority", 3).await;

    let first_page = repo.get_by_authority(authority_id, 2, 0).await.unwrap();
    let second_page = repo.get_by_authority(authority_id, 2, 2).await.unwrap();

    assert_eq!(titles(&first_page), ["third", "second"]);
    assert_eq!(titles(&second_page), ["first"]);
    assert!(first_page.iter().all(|o| o.history().is_empty()));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_by_status_orders_by_priority_then_newest(pool: PgPool) {
    // Arrange
    let repo = PgServiceOrderRepository::new(pool);
    let clock = stepping_clock();
    let authority_id = Uuid::new_v4();
    seed(&repo, &clock, authority_id, "p2", 2).await;
    seed(&repo, &clock, authority_id, "p5 older", 5).await;
    seed(&repo, &clock, authority_id, "p5 newer", 5).await;
    seed(&repo, &clock, authority_id, "p1", 1).await;
    let mut closed = ServiceOrder::new("closed", "", "", authority_id, Uuid::new_v4(), 5, &clock);
    closed.change_status(ServiceOrderStatus::Cancelled, Uuid::new_v4(), "dup", &clock);
    repo.create(&closed).await.unwrap();

    // Act
    let open = repo
        .get_by_status(ServiceOrderStatus::Open, authority_id)
        .await
        .unwrap();

    // Assert
    assert_eq!(titles(&open), ["p5 newer", "p5 older", "p2", "p1"]);
    let priorities: Vec<_> = open.iter().map(ServiceOrder::priority).collect();
    assert_eq!(priorities, [5, 5, 2, 1]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_by_responsible_spans_authorities(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool);
    let clock = stepping_clock();
    let assignee_id = Uuid::new_v4();
    for (title, priority) in [("low", 1), ("high", 4)] {
        let mut order =
            ServiceOrder::new(title, "", "", Uuid::new_v4(), Uuid::new_v4(), priority, &clock);
        order.assign_responsible(assignee_id, Uuid::new_v4(), &clock);
        repo.create(&order).await.unwrap();
    }
    seed(&repo, &clock, Uuid::new_v4(), "unassigned", 5).await;

    let orders = repo.get_by_responsible(assignee_id).await.unwrap();

    assert_eq!(titles(&orders), ["high", "low"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_by_priority_filters_priority_and_authority(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool);
    let clock = stepping_clock();
    let authority_id = Uuid::new_v4();
    seed(&repo, &clock, authority_id, "match older", 4).await;
    seed(&repo, &clock, authority_id, "other priority", 2).await;
    seed(&repo, &clock, authority_id, "match newer", 4).await;
    seed(&repo, &clock, Uuid::new_v4(), "other authority", 4).await;

    let orders = repo.get_by_priority(4, authority_id).await.unwrap();

    assert_eq!(titles(&orders), ["match newer", "match older"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_count_by_status_groups_one_authority(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool);
    let clock = stepping_clock();
    let authority_id = Uuid::new_v4();
    seed(&repo, &clock, authority_id, "open 1", 3).await;
    seed(&repo, &clock, authority_id, "open 2", 3).await;
    let mut done = ServiceOrder::new("done", "", "", authority_id, Uuid::new_v4(), 3, &clock);
    done.change_status(ServiceOrderStatus::Completed, Uuid::new_v4(), "ok", &clock);
    repo.create(&done).await.unwrap();
    seed(&repo, &clock, Uuid::new_v4(), "elsewhere", 3).await;

    let counts = repo.count_by_status(authority_id).await.unwrap();

    let counts: BTreeMap<_, _> = counts.iter().map(|c| (c.status, c.count)).collect();
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[&ServiceOrderStatus::Open], 2);
    assert_eq!(counts[&ServiceOrderStatus::Completed], 1);
}

// --- update ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_persists_mutable_fields_only(pool: PgPool) {
    // Arrange
    let repo = PgServiceOrderRepository::new(pool);
    let clock = stepping_clock();
    let original = seed(&repo, &clock, Uuid::new_v4(), "antes", 2).await;

    let mut edited = original.clone();
    edited.update_details(
        DetailsUpdate {
            title: Some("depois".to_owned()),
            priority: Some(5),
            ..DetailsUpdate::default()
        },
        Uuid::new_v4(),
        &clock,
    );
    edited.change_status(ServiceOrderStatus::Completed, Uuid::new_v4(), "ok", &clock);
    edited.add_tag("feito", &clock);
    // A row carrying different values for the columns fixed at creation.
    let parts = ServiceOrderParts {
        id: edited.id(),
        title: edited.title().to_owned(),
        description: edited.description().to_owned(),
        status: edited.status(),
        priority: edited.priority(),
        location: edited.location().to_owned(),
        assignee_id: edited.assignee_id(),
        authority_id: Uuid::new_v4(),
        requester_id: Uuid::new_v4(),
        created_at: start() - Duration::days(30),
        updated_at: edited.updated_at(),
        completed_at: edited.completed_at(),
        sla: edited.sla().cloned(),
        tags: edited.tags().to_vec(),
    };
    let edited = ServiceOrder::from_parts(parts, Vec::new());

    // Act
    repo.update(&edited).await.unwrap();
    let loaded = repo.get_by_id(original.id()).await.unwrap();

    // Assert
    assert_eq!(loaded.title(), "depois");
    assert_eq!(loaded.priority(), 5);
    assert_eq!(loaded.status(), ServiceOrderStatus::Completed);
    assert_eq!(loaded.completed_at(), edited.completed_at());
    assert_eq!(loaded.tags(), ["feito".to_owned()]);
    assert_eq!(loaded.updated_at(), edited.updated_at());
    assert_eq!(loaded.created_at(), original.created_at());
    assert_eq!(loaded.authority_id(), original.authority_id());
    assert_eq!(loaded.requester_id(), original.requester_id());
    // Update writes the row only, history goes through add_event.
    assert!(loaded.history().is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_update_returns_not_found_for_unknown_order(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool);
    let clock = FixedClock(start());
    let order = ServiceOrder::new("t", "", "", Uuid::new_v4(), Uuid::new_v4(), 3, &clock);

    let result = repo.update(&order).await;

    assert!(matches!(result, Err(DomainError::NotFound(id)) if id == order.id()));
}

// --- delete ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_removes_order_and_history(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool.clone());
    let clock = stepping_clock();
    let mut order = ServiceOrder::new("t", "", "", Uuid::new_v4(), Uuid::new_v4(), 3, &clock);
    order.change_status(ServiceOrderStatus::InProgress, Uuid::new_v4(), "start", &clock);
    order.assign_responsible(Uuid::new_v4(), Uuid::new_v4(), &clock);
    repo.create(&order).await.unwrap();

    repo.delete(order.id()).await.unwrap();

    assert!(matches!(
        repo.get_by_id(order.id()).await,
        Err(DomainError::NotFound(_))
    ));
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM eventos_os WHERE os_id = $1")
        .bind(order.id())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_delete_returns_not_found_and_keeps_orphan_events(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool.clone());
    let id = Uuid::new_v4();
    repo.add_event(&ServiceOrderEvent {
        id: Uuid::new_v4(),
        service_order_id: id,
        event_type: "status_changed".to_owned(),
        description: "orphan".to_owned(),
        user_id: Uuid::new_v4(),
        occurred_at: start(),
        metadata: None,
    })
    .await
    .unwrap();

    let result = repo.delete(id).await;

    assert!(matches!(result, Err(DomainError::NotFound(missing)) if missing == id));
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM eventos_os WHERE os_id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

// --- history ---

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_history_returns_empty_vec_for_order_without_events(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool);
    let order = seed(&repo, &FixedClock(start()), Uuid::new_v4(), "t", 3).await;

    let history = repo.get_history(order.id()).await.unwrap();

    assert!(history.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_get_history_keeps_insertion_order_for_equal_timestamps(pool: PgPool) {
    // Arrange
    let repo = PgServiceOrderRepository::new(pool);
    let clock = FixedClock(start());
    let user_id = Uuid::new_v4();
    let mut order = ServiceOrder::new("t", "", "", Uuid::new_v4(), Uuid::new_v4(), 3, &clock);
    order.change_status(ServiceOrderStatus::InProgress, user_id, "1", &clock);
    order.change_status(ServiceOrderStatus::UnderReview, user_id, "2", &clock);
    order.change_status(ServiceOrderStatus::Completed, user_id, "3", &clock);

    // Act
    repo.create(&order).await.unwrap();
    let history = repo.get_history(order.id()).await.unwrap();

    // Assert
    let ids: Vec<_> = history.iter().map(|e| e.id).collect();
    let expected: Vec<_> = order.history().iter().map(|e| e.id).collect();
    assert_eq!(ids, expected);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_add_event_appends_to_history_oldest_first(pool: PgPool) {
    let repo = PgServiceOrderRepository::new(pool);
    let order = seed(&repo, &FixedClock(start()), Uuid::new_v4(), "t", 3).await;
    let event_at = |minutes: i64, description: &str| ServiceOrderEvent {
        id: Uuid::new_v4(),
        service_order_id: order.id(),
        event_type: "details_updated".to_owned(),
        description: description.to_owned(),
        user_id: Uuid::new_v4(),
        occurred_at: start() + Duration::minutes(minutes),
        metadata: None,
    };

    repo.add_event(&event_at(10, "later")).await.unwrap();
    repo.add_event(&event_at(5, "earlier")).await.unwrap();

    let history = repo.get_history(order.id()).await.unwrap();
    let descriptions: Vec<_> = history.iter().map(|e| e.description.as_str()).collect();
    assert_eq!(descriptions, ["earlier", "later"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_event_metadata_round_trips_nested_values(pool: PgPool) {
    // Arrange
    let repo = PgServiceOrderRepository::new(pool);
    let order = seed(&repo, &FixedClock(start()), Uuid::new_v4(), "t", 3).await;
    let mut nested = BTreeMap::new();
    nested.insert("lat".to_owned(), MetadataValue::from(-23_i32));
    nested.insert("confirmado".to_owned(), MetadataValue::from(true));
    let mut metadata = EventMetadata::new();
    metadata.insert("origem".to_owned(), MetadataValue::from("app"));
    metadata.insert("tentativas".to_owned(), MetadataValue::from(3_i64));
    metadata.insert("geo".to_owned(), MetadataValue::from(nested));
    let event = ServiceOrderEvent {
        id: Uuid::new_v4(),
        service_order_id: order.id(),
        event_type: "details_updated".to_owned(),
        description: "vistoria".to_owned(),
        user_id: Uuid::new_v4(),
        occurred_at: start(),
        metadata: Some(metadata),
    };

    // Act
    repo.add_event(&event).await.unwrap();
    let history = repo.get_history(order.id()).await.unwrap();

    // Assert
    assert_eq!(history, vec![event.clone()]);
    let stored = serde_json::to_value(&history[0].metadata).unwrap();
    assert_eq!(
        stored,
        serde_json::json!({
            "geo": {"confirmado": true, "lat": -23},
            "origem": "app",
            "tentativas": 3,
        })
    );
}
