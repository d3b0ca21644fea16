mod handler;
pub mod rpc;

pub use handler::{ApiError, NOT_FOUND_CODE, RECONCILE_CODE, REJECTED_CODE, UNAVAILABLE_CODE};
pub use rpc::{ApiClient, ApiServer, CommandOutcome, NeighborChange, NeighborSummary};
