//! The sync engine: fetches the version catalog, plans what to download,
//! streams and validates records, and applies them to the [`store::Store`].
//! [`coordinator::Coordinator`] is the top-level entry point the binary
//! drives; [`retry::RetrySupervisor`] wraps it with offline-awareness and
//! exponential backoff.

pub mod applier;
pub mod cancel;
pub mod catalog;
pub mod coordinator;
pub mod derive;
pub mod fetch;
pub mod line_reader;
pub mod planner;
pub mod producer;
pub mod retry;

pub use cancel::CancelToken;
pub use catalog::VersionCatalogClient;
pub use coordinator::{Coordinator, CoordinatorEvent};
pub use fetch::{Fetcher, ReqwestFetcher};
pub use planner::Plan;
pub use retry::RetrySupervisor;
