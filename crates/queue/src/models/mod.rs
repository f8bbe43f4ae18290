mod item;
mod state;

pub(crate) use self::item::WorkItemRow;
pub use self::item::{Outcome, Tally, WorkItem};
pub use self::state::State;
