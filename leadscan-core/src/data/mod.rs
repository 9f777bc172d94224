//! Data contract: universe listings and the provider trait.

pub mod provider;
pub mod universe;

pub use provider::{price_listings, DataError, DataProvider, DataSource, InMemoryProvider};
pub use universe::{Listing, Universe, UniverseFilter};
