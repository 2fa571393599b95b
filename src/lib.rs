//! Lot-partitioned procurement tenders.
//!
//! A tender owns its lots, bids, qualifications, awards, contracts and
//! cancellations as one aggregate. Clients mutate it through
//! [`service::TenderService`]; time-driven transitions come from
//! [`chronograph::tick`]. Derived tender amounts and the parent status are
//! recomputed by a single reconciliation pass after every mutation.

pub mod chronograph;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod ops;
pub mod rollup;
pub mod service;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Settings;
pub use error::{TenderError, TenderResult};
pub use service::TenderService;
pub use store::{InMemoryStore, TenderStore};
