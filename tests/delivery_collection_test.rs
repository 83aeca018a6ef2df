use courier_sim::delivery_actor::{self, DeliveryError, DeliveryStore, StoreEvent, TransitionViolation};
use courier_sim::model::{Delivery, DeliveryCreate, DeliveryState};
use uuid::Uuid;

fn params(sender: Uuid, insured_value: Option<i64>) -> DeliveryCreate {
    DeliveryCreate {
        sender,
        destination: "Via Giardini 200, Modena".to_string(),
        weight: 2.0,
        insured_value,
    }
}

/// Adding through the actor and reading back by code returns the same delivery.
#[tokio::test]
async fn test_add_then_get_by_id() {
    let (actor, client) = delivery_actor::new(8, DeliveryStore::new());
    let handle = tokio::spawn(actor.run());

    let created = client
        .create(params(Uuid::new_v4(), None))
        .await
        .expect("Failed to create delivery");
    let fetched = client
        .get(created.code())
        .await
        .expect("Failed to get delivery")
        .expect("Delivery not found");
    assert_eq!(fetched, created);
    assert_eq!(fetched.state(), DeliveryState::InPreparation);

    let duplicate = client.add(created.clone()).await;
    assert_eq!(duplicate, Err(DeliveryError::DuplicateIdentity(created.code())));
    assert_eq!(client.list().await.unwrap().len(), 1);

    drop(client);
    let store = handle.await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_invalid_creation_is_rejected() {
    let (actor, client) = delivery_actor::new(8, DeliveryStore::new());
    tokio::spawn(actor.run());

    let mut bad_weight = params(Uuid::new_v4(), None);
    bad_weight.weight = -1.0;
    assert!(matches!(
        client.create(bad_weight).await,
        Err(DeliveryError::ValidationError(_))
    ));
    assert!(matches!(
        client.create(params(Uuid::new_v4(), Some(-5))).await,
        Err(DeliveryError::ValidationError(_))
    ));
    assert!(client.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_remove_rules() {
    let (actor, client) = delivery_actor::new(8, DeliveryStore::new());
    tokio::spawn(actor.run());
    let sender = Uuid::new_v4();

    let d = client.create(params(sender, None)).await.unwrap();
    let other = client.create(params(sender, None)).await.unwrap();

    let err = client.remove(d.code()).await.unwrap_err();
    assert_eq!(
        err,
        DeliveryError::NotTerminal {
            code: d.code(),
            state: DeliveryState::InPreparation
        }
    );
    assert_eq!(client.list().await.unwrap().len(), 2);

    client.set_state(d.code(), DeliveryState::Failed).await.unwrap();
    let removed = client.remove(d.code()).await.unwrap();
    assert_eq!(removed.map(|r| r.code()), Some(d.code()));

    assert_eq!(client.list().await.unwrap(), vec![other.clone()]);
    assert!(client.get(d.code()).await.unwrap().is_none());
    assert_eq!(client.by_sender(sender).await.unwrap(), vec![other]);

    // Already gone: not an error.
    assert_eq!(client.remove(d.code()).await, Ok(None));
}

#[tokio::test]
async fn test_sender_view_is_live() {
    let (actor, client) = delivery_actor::new(8, DeliveryStore::new());
    tokio::spawn(actor.run());
    let sender = Uuid::new_v4();
    let view = client.sender_view(sender);

    assert!(view.current().await.unwrap().is_empty());

    let first = client.create(params(sender, None)).await.unwrap();
    client.create(params(Uuid::new_v4(), None)).await.unwrap();
    let second = client.create(params(sender, Some(40))).await.unwrap();
    assert_eq!(view.current().await.unwrap(), vec![first.clone(), second.clone()]);

    client.set_state(first.code(), DeliveryState::Received).await.unwrap();
    client.remove(first.code()).await.unwrap();
    assert_eq!(view.current().await.unwrap(), vec![second]);
    assert_eq!(view.sender(), sender);
}

#[tokio::test]
async fn test_manual_override_follows_delivery_rules() {
    let (actor, client) = delivery_actor::new(8, DeliveryStore::new());
    tokio::spawn(actor.run());

    let plain = client.create(params(Uuid::new_v4(), None)).await.unwrap();
    let err = client
        .set_state(plain.code(), DeliveryState::RefundRequired)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeliveryError::IllegalStateTransition {
            reason: TransitionViolation::InsuranceRequired,
            ..
        }
    ));

    client.set_state(plain.code(), DeliveryState::Received).await.unwrap();
    let err = client
        .set_state(plain.code(), DeliveryState::InTransit)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DeliveryError::IllegalStateTransition {
            reason: TransitionViolation::Terminal,
            ..
        }
    ));
    let missing = Uuid::new_v4();
    assert_eq!(
        client.set_state(missing, DeliveryState::InTransit).await,
        Err(DeliveryError::NotFound(missing))
    );
}

/// Full refund flow of an insured delivery, observed on the event stream.
#[tokio::test]
async fn test_refund_flow_emits_events() {
    let (actor, client) = delivery_actor::new(8, DeliveryStore::new());
    tokio::spawn(actor.run());
    let mut events = client.events().await.unwrap();

    let d = client.create(params(Uuid::new_v4(), Some(500))).await.unwrap();
    assert!(matches!(
        client.request_refund(d.code()).await,
        Err(DeliveryError::RefundNotAllowed { .. })
    ));

    client.set_state(d.code(), DeliveryState::Failed).await.unwrap();
    let change = client.request_refund(d.code()).await.unwrap();
    assert_eq!(change.new, DeliveryState::RefundRequired);
    client.set_state(d.code(), DeliveryState::RefundPaid).await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    let code = d.code();
    assert_eq!(
        seen,
        vec![
            StoreEvent::Added(d.clone()),
            StoreEvent::StateChanged {
                code,
                old: DeliveryState::InPreparation,
                new: DeliveryState::Failed
            },
            StoreEvent::StateChanged {
                code,
                old: DeliveryState::Failed,
                new: DeliveryState::RefundRequired
            },
            StoreEvent::StateChanged {
                code,
                old: DeliveryState::RefundRequired,
                new: DeliveryState::RefundPaid
            },
            StoreEvent::BecameTerminal {
                code,
                state: DeliveryState::RefundPaid
            },
        ]
    );

    let stored: Delivery = client.get(code).await.unwrap().unwrap();
    assert!(stored.is_terminal());
}

#[tokio::test]
async fn test_closed_actor_is_reported() {
    let (actor, client) = delivery_actor::new(8, DeliveryStore::new());
    drop(actor);

    let err = client.list().await.unwrap_err();
    assert!(matches!(err, DeliveryError::ActorCommunicationError(_)));
}
