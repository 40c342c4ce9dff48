//! sensor hub: ingests temperature/humidity readings pushed by sensor nodes,
//! keeps a bounded recent history on disk, and serves query endpoints plus a
//! polling dashboard.

pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod node;
pub mod server;
pub mod snapshot;
pub mod store;

pub use domain::{Reading, ReadingCandidate, Stats};
pub use error::{HubError, ValidationError};
pub use server::Hub;
pub use store::ReadingStore;
