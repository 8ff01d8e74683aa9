//! Integration tests for the wizard flow.
//!
//! Each test wires a real engine (standard registry, in-memory store,
//! finalizer) and drives it through the public event API, exactly the
//! way the channels do.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::time::timeout;

use estate_intake::error::LookupError;
use estate_intake::flow::{
    Command, Directive, EventPayload, FlowEngine, FlowEvent, PromptNote, SessionStore,
};
use estate_intake::lead::{
    LeadFinalizer, ListingMatch, ListingsLookup, ListingsQuery, StubListings,
};
use estate_intake::registry::{AnswerRegistry, StepId};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Lookup stub returning one fixed match (no real HTTP).
struct FixedListings;

#[async_trait]
impl ListingsLookup for FixedListings {
    fn source(&self) -> &str {
        "fixed"
    }

    async fn lookup(&self, _query: &ListingsQuery) -> Result<Vec<ListingMatch>, LookupError> {
        Ok(vec![ListingMatch::new(
            "2-к квартира, центр",
            "15 000 грн/мес",
            "https://listings.example/2k-center",
        )])
    }
}

/// Wire a full engine around the given lookup.
fn wire(lookup: Arc<dyn ListingsLookup>) -> (Arc<FlowEngine>, Arc<SessionStore>) {
    let registry = Arc::new(AnswerRegistry::standard());
    let store = SessionStore::new();
    let finalizer = LeadFinalizer::new(Arc::clone(&registry), lookup, Duration::from_secs(1));
    let engine = Arc::new(FlowEngine::new(registry, Arc::clone(&store), finalizer));
    (engine, store)
}

/// The full seven-step walk for one user, as the payload sequence a
/// channel would produce.
fn full_walk() -> Vec<EventPayload> {
    vec![
        EventPayload::Command(Command::Start),
        EventPayload::Choice("rent_apartment".into()),
        EventPayload::Choice("2_rooms".into()),
        EventPayload::Choice("central_district".into()),
        EventPayload::Choice("cosmetic_renovation".into()),
        EventPayload::Choice("budget_10k_20k".into()),
        EventPayload::Choice("payment_cash".into()),
        EventPayload::Text("+380501234567".into()),
    ]
}

/// Feed payloads to the engine in order, returning the last directive.
async fn drive(engine: &FlowEngine, user: &str, payloads: Vec<EventPayload>) -> Directive {
    let mut last = None;
    for payload in payloads {
        last = Some(
            engine
                .handle_event(FlowEvent::new(user, payload))
                .await
                .unwrap(),
        );
    }
    last.expect("at least one payload")
}

// ── End-to-End ───────────────────────────────────────────────────────

#[tokio::test]
async fn full_walk_produces_lead_with_matches() {
    timeout(TEST_TIMEOUT, async {
        let (engine, store) = wire(Arc::new(FixedListings));

        let directive = drive(&engine, "42", full_walk()).await;

        match directive {
            Directive::Summary { lead } => {
                assert_eq!(lead.category, "Аренда квартиры");
                assert_eq!(lead.rooms, "2 комнаты");
                assert_eq!(lead.district, "Центральный район");
                assert_eq!(lead.renovation, "Косметический ремонт");
                assert_eq!(lead.budget, "10 000 - 20 000");
                assert_eq!(lead.payment, "Наличные");
                assert_eq!(lead.contact, "+380501234567");
                assert_eq!(lead.matches.len(), 1);
                assert_eq!(lead.matches[0].title, "2-к квартира, центр");
            }
            other => panic!("expected summary, got {:?}", other),
        }
        // The lead is a snapshot; nothing lingers in the store.
        assert!(store.is_empty().await);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn stub_walk_yields_empty_matches_and_clears_store() {
    timeout(TEST_TIMEOUT, async {
        let (engine, store) = wire(Arc::new(StubListings));

        let directive = drive(&engine, "42", full_walk()).await;

        match directive {
            Directive::Summary { lead } => assert!(lead.matches.is_empty()),
            other => panic!("expected summary, got {:?}", other),
        }
        assert!(store.is_empty().await);
    })
    .await
    .expect("test timed out");
}

// ── Ordering and Concurrency ─────────────────────────────────────────

#[tokio::test]
async fn same_user_event_waits_for_guard() {
    timeout(TEST_TIMEOUT, async {
        let (engine, store) = wire(Arc::new(StubListings));
        drive(&engine, "42", vec![EventPayload::Command(Command::Start)]).await;

        // Hold the user's guard the way an in-flight event pass would.
        let held = store.lock_user("42").await;

        let engine2 = Arc::clone(&engine);
        let pending = tokio::spawn(async move {
            engine2
                .handle_event(FlowEvent::choice("42", "rent_apartment"))
                .await
                .unwrap()
        });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!pending.is_finished(), "event must wait for the user guard");

        drop(held);
        let directive = pending.await.unwrap();
        assert!(matches!(
            directive,
            Directive::Prompt {
                step_id: StepId::Rooms,
                ..
            }
        ));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn distinct_users_walk_in_parallel() {
    timeout(TEST_TIMEOUT, async {
        let (engine, store) = wire(Arc::new(StubListings));

        let walks = ["a", "b", "c", "d"].into_iter().map(|user| {
            let engine = Arc::clone(&engine);
            async move { drive(&engine, user, full_walk()).await }
        });

        for directive in join_all(walks).await {
            assert!(matches!(directive, Directive::Summary { .. }));
        }
        assert!(store.is_empty().await);
    })
    .await
    .expect("test timed out");
}

// ── Sweep Interplay ──────────────────────────────────────────────────

#[tokio::test]
async fn sweep_blocks_on_in_flight_event_then_keeps_touched_session() {
    timeout(TEST_TIMEOUT, async {
        let (engine, store) = wire(Arc::new(StubListings));
        drive(&engine, "42", vec![EventPayload::Command(Command::Start)]).await;

        // Make the session look long idle, then hold its guard as an
        // in-flight event would.
        let mut session = store.get("42").await.unwrap();
        session.last_activity_at = Utc::now() - chrono::Duration::seconds(7200);
        store.save(session).await;
        let held = store.lock_user("42").await;

        let store2 = Arc::clone(&store);
        let sweep =
            tokio::spawn(async move { store2.sweep_expired(Duration::from_secs(1800)).await });

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(!sweep.is_finished(), "sweep must wait for the user guard");

        // The in-flight event saves fresh activity before releasing.
        let mut touched = store.get("42").await.unwrap();
        touched.touch();
        store.save(touched).await;
        drop(held);

        assert_eq!(sweep.await.unwrap(), 0);
        assert!(store.get("42").await.is_some());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn swept_user_gets_fresh_session_on_next_event() {
    timeout(TEST_TIMEOUT, async {
        let (engine, store) = wire(Arc::new(StubListings));
        drive(
            &engine,
            "42",
            vec![
                EventPayload::Command(Command::Start),
                EventPayload::Choice("rent_apartment".into()),
                EventPayload::Choice("2_rooms".into()),
            ],
        )
        .await;

        let mut session = store.get("42").await.unwrap();
        session.last_activity_at = Utc::now() - chrono::Duration::seconds(7200);
        store.save(session).await;

        assert_eq!(store.sweep_expired(Duration::from_secs(1800)).await, 1);
        assert!(store.is_empty().await);

        // The stale button press lands after eviction: it starts a fresh
        // session instead of being applied as an answer.
        let directive = engine
            .handle_event(FlowEvent::choice("42", "central_district"))
            .await
            .unwrap();

        assert!(matches!(
            directive,
            Directive::Prompt {
                step_id: StepId::Category,
                note: PromptNote::Greeting,
                ..
            }
        ));
        assert!(store.get("42").await.unwrap().answers().is_empty());
    })
    .await
    .expect("test timed out");
}
