//! Client side of the procedure boundary.

mod caller;
mod coalesce;
mod state;
mod transport;

pub use caller::{ProcedureCaller, TrackedMutation, TrackedQuery};
pub use state::CallState;
pub use transport::{LocalTransport, Transport};
