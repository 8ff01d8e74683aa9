//! Lead models — the finalized intake record and listing matches.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One external listing matched against a lead's filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingMatch {
    pub title: String,
    pub price: String,
    pub link: String,
}

impl ListingMatch {
    pub fn new(
        title: impl Into<String>,
        price: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            price: price.into(),
            link: link.into(),
        }
    }
}

/// A finalized lead: every answer resolved to its display label, plus
/// whatever the listings lookup found.
///
/// This is the record the agency works from, so all fields are labels in
/// the user's language rather than raw tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub category: String,
    pub rooms: String,
    pub district: String,
    pub renovation: String,
    pub budget: String,
    pub payment: String,
    pub contact: String,
    pub matches: Vec<ListingMatch>,
}

impl LeadRecord {
    /// Summary lines in presentation order, titled in the user's language.
    /// Every transport renders this same field list.
    pub fn summary_fields(&self) -> [(&'static str, &str); 7] {
        [
            ("Категория", self.category.as_str()),
            ("Комнаты", self.rooms.as_str()),
            ("Район", self.district.as_str()),
            ("Ремонт", self.renovation.as_str()),
            ("Бюджет", self.budget.as_str()),
            ("Оплата", self.payment.as_str()),
            ("Контакт", self.contact.as_str()),
        ]
    }
}
