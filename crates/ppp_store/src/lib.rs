//! PPP data store: memoized, single-flight population of World Bank PPP
//! conversion factors plus the read API consumers use.

pub mod cache;
pub mod clock;
pub mod compare;
pub mod coordinator;
pub mod currency;
pub mod query;

pub use cache::{CacheStatus, SharedSnapshot, Snapshot};
pub use clock::{Clock, SystemClock};
pub use coordinator::{FetchCoordinator, PopulateResult};
pub use currency::{CurrencyLookup, NoCurrencyLookup, StaticCurrencyTable};
pub use query::{PppStore, StoreBuilder};
