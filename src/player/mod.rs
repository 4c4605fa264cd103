pub mod driver;
pub mod queue;
pub mod session;
pub mod state;

pub use driver::{DriverCtx, run_driver};
pub use queue::{EnqueueOutcome, PlaybackQueue, QueueError};
pub use session::Session;
pub use state::*;
