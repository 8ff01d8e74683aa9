//! Lead finalizer — turns a completed session into a presentable record.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::flow::session::Session;
use crate::lead::listings::{ListingsLookup, ListingsQuery};
use crate::lead::model::{LeadRecord, ListingMatch};
use crate::registry::{AnswerRegistry, StepId};

/// Builds the final [`LeadRecord`] for a session that answered every step.
///
/// Finalization never fails: answers that cannot be resolved become the
/// placeholder label, and any listings-lookup trouble (errors and timeouts
/// both) degrades to an empty match list.
pub struct LeadFinalizer {
    registry: Arc<AnswerRegistry>,
    lookup: Arc<dyn ListingsLookup>,
    lookup_timeout: Duration,
}

impl LeadFinalizer {
    pub fn new(
        registry: Arc<AnswerRegistry>,
        lookup: Arc<dyn ListingsLookup>,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            lookup,
            lookup_timeout,
        }
    }

    /// Resolve the session's answers to labels and enrich with listings.
    pub async fn finalize(&self, session: &Session) -> LeadRecord {
        let resolve =
            |id: StepId| self.registry.label_for(id, session.answer(id).unwrap_or(""));

        let matches = self.find_matches(session).await;
        let lead = LeadRecord {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            category: resolve(StepId::Category),
            rooms: resolve(StepId::Rooms),
            district: resolve(StepId::District),
            renovation: resolve(StepId::Renovation),
            budget: resolve(StepId::Budget),
            payment: resolve(StepId::Payment),
            contact: resolve(StepId::Contact),
            matches,
        };

        info!(
            lead_id = %lead.id,
            user_id = %session.user_id,
            category = %lead.category,
            matches = lead.matches.len(),
            "Lead finalized"
        );
        lead
    }

    /// Run the listings lookup under the configured hard timeout.
    async fn find_matches(&self, session: &Session) -> Vec<ListingMatch> {
        let query = ListingsQuery::from_tokens(
            session.answer(StepId::Category),
            session.answer(StepId::Rooms),
            session.answer(StepId::District),
            session.answer(StepId::Budget),
        );
        let Some(query) = query else {
            debug!(user_id = %session.user_id, "No usable category; skipping listings lookup");
            return Vec::new();
        };

        match tokio::time::timeout(self.lookup_timeout, self.lookup.lookup(&query)).await {
            Ok(Ok(matches)) => {
                debug!(
                    source = self.lookup.source(),
                    count = matches.len(),
                    "Listings lookup completed"
                );
                matches
            }
            Ok(Err(e)) => {
                warn!(source = self.lookup.source(), error = %e, "Listings lookup failed");
                Vec::new()
            }
            Err(_) => {
                warn!(
                    source = self.lookup.source(),
                    timeout = ?self.lookup_timeout,
                    "Listings lookup timed out"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::lead::listings::StubListings;
    use async_trait::async_trait;

    /// Lookup returning a fixed match list.
    struct FixedListings(Vec<ListingMatch>);

    #[async_trait]
    impl ListingsLookup for FixedListings {
        fn source(&self) -> &str {
            "fixed"
        }

        async fn lookup(&self, _query: &ListingsQuery) -> Result<Vec<ListingMatch>, LookupError> {
            Ok(self.0.clone())
        }
    }

    /// Lookup that never answers within any sane timeout.
    struct SlowListings;

    #[async_trait]
    impl ListingsLookup for SlowListings {
        fn source(&self) -> &str {
            "slow"
        }

        async fn lookup(&self, _query: &ListingsQuery) -> Result<Vec<ListingMatch>, LookupError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![ListingMatch::new("too late", "0", "https://example.com")])
        }
    }

    /// Lookup that always errors.
    struct FailingListings;

    #[async_trait]
    impl ListingsLookup for FailingListings {
        fn source(&self) -> &str {
            "failing"
        }

        async fn lookup(&self, _query: &ListingsQuery) -> Result<Vec<ListingMatch>, LookupError> {
            Err(LookupError::RequestFailed {
                source: "failing".to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    fn completed_session() -> Session {
        let mut session = Session::new("42", StepId::Category);
        session
            .accept_answer("rent_apartment", Some(StepId::Rooms))
            .unwrap();
        session.accept_answer("2_rooms", Some(StepId::District)).unwrap();
        session
            .accept_answer("central_district", Some(StepId::Renovation))
            .unwrap();
        session
            .accept_answer("cosmetic_renovation", Some(StepId::Budget))
            .unwrap();
        session
            .accept_answer("budget_10k_20k", Some(StepId::Payment))
            .unwrap();
        session
            .accept_answer("payment_cash", Some(StepId::Contact))
            .unwrap();
        session.accept_answer("+380501234567", None).unwrap();
        session
    }

    fn finalizer(lookup: Arc<dyn ListingsLookup>, timeout: Duration) -> LeadFinalizer {
        LeadFinalizer::new(Arc::new(AnswerRegistry::standard()), lookup, timeout)
    }

    #[tokio::test]
    async fn finalize_resolves_labels() {
        let finalizer = finalizer(Arc::new(StubListings), Duration::from_secs(1));
        let lead = finalizer.finalize(&completed_session()).await;

        assert_eq!(lead.category, "Аренда квартиры");
        assert_eq!(lead.rooms, "2 комнаты");
        assert_eq!(lead.district, "Центральный район");
        assert_eq!(lead.renovation, "Косметический ремонт");
        assert_eq!(lead.budget, "10 000 - 20 000");
        assert_eq!(lead.payment, "Наличные");
        assert_eq!(lead.contact, "+380501234567");
        assert!(lead.matches.is_empty());
    }

    #[tokio::test]
    async fn finalize_includes_matches() {
        let found = vec![ListingMatch::new(
            "2к на Соборной",
            "15 000",
            "https://example.com/1",
        )];
        let finalizer = finalizer(Arc::new(FixedListings(found.clone())), Duration::from_secs(1));

        let lead = finalizer.finalize(&completed_session()).await;
        assert_eq!(lead.matches, found);
    }

    #[tokio::test]
    async fn finalize_missing_answers_become_placeholder() {
        let finalizer = finalizer(Arc::new(StubListings), Duration::from_secs(1));
        // A session that only answered the first step. Finalizing such a
        // session cannot happen through the engine, but the record must
        // still come out well-formed.
        let mut session = Session::new("42", StepId::Category);
        session.accept_answer("buy_house", None).unwrap();

        let lead = finalizer.finalize(&session).await;
        assert_eq!(lead.category, "Покупка дома");
        assert_eq!(lead.rooms, "не указано");
        assert_eq!(lead.contact, "не указано");
    }

    #[tokio::test]
    async fn lookup_timeout_degrades_to_empty() {
        let finalizer = finalizer(Arc::new(SlowListings), Duration::from_millis(50));

        let started = std::time::Instant::now();
        let lead = finalizer.finalize(&completed_session()).await;

        assert!(lead.matches.is_empty());
        // Must return promptly, not after the slow lookup's 30s.
        assert!(started.elapsed() < Duration::from_secs(5));
        // The rest of the record is intact.
        assert_eq!(lead.contact, "+380501234567");
    }

    #[tokio::test]
    async fn lookup_error_degrades_to_empty() {
        let finalizer = finalizer(Arc::new(FailingListings), Duration::from_secs(1));
        let lead = finalizer.finalize(&completed_session()).await;

        assert!(lead.matches.is_empty());
        assert_eq!(lead.category, "Аренда квартиры");
    }
}
