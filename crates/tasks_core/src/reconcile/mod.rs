//! Client-side list state: optimistic completions layered over the last
//! server snapshot, reconciled by refetching after each mutation.

mod session;
mod view;

pub use session::{COMPLETED_NOTICE, CREATED_NOTICE, TaskSession};
pub use view::{FetchTicket, ListPhase, TaskListView};
