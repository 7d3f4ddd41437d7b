pub mod http_client;
pub mod reachability;

pub use http_client::{HttpRemoteApi, IDEMPOTENCY_HEADER};
pub use reachability::ReachabilityMonitor;
