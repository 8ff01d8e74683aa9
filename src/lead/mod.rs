//! Lead finalization — label resolution and listings enrichment.

pub mod finalizer;
pub mod listings;
pub mod model;

pub use finalizer::LeadFinalizer;
pub use listings::{ListingsLookup, ListingsQuery, PropertyKind, StubListings, Transaction};
pub use model::{LeadRecord, ListingMatch};
