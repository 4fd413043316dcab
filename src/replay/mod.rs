//! One-time code replay prevention.
//!
//! Each farm member keeps its own record of consumed codes
//! ([`ReplayCoordinator`]) and tells the other members about every code it
//! accepts ([`ReplayService`]). There is no shared datastore and no leader:
//! the local decision is authoritative, replication is best effort and one
//! hop deep, and state lives in process memory only.

pub mod cleanup;
pub mod coordinator;
pub mod directory;
pub mod error;
pub mod events;
pub mod peers;
pub mod protocol;
pub mod record;
pub mod store;

pub use coordinator::ReplayCoordinator;
pub use directory::{NodeDirectory, StaticNodeDirectory};
pub use error::ReplayError;
pub use events::EventCategory;
pub use peers::{HttpPeerClient, PeerClient, PeerError, ReplayService};
pub use protocol::{CheckRequest, CheckResponse, ResetRequest};
pub use record::{ReplayRecord, Strictness};
pub use store::ReplayStore;
