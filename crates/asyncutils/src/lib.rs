//! Counting joins for staged asynchronous work.
//!
//! A [`Gate`] tracks how many operations a stage expects and how many have
//! settled. Anything that depends on the stage awaits [`Gate::settled`]
//! instead of re-checking the counters on a timer. Failed operations are
//! removed from the expected count via [`Gate::abandon`], so the gate always
//! opens eventually, even under partial failure.
//!
//! ```
//! use std::sync::Arc;
//! use zimview_asyncutils::Gate;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gate = Arc::new(Gate::new("css"));
//! gate.expect(2);
//! let ok = gate.track(async { Ok::<_, ()>(()) });
//! let failed = gate.track(async { Err::<(), _>("missing") });
//! let _ = futures::join!(ok, failed);
//! gate.settled().await;
//! assert_eq!(gate.counts(), (1, 1));
//! # }
//! ```

mod gate;
mod tracked;

pub use crate::gate::{Gate, Settled};
pub use crate::tracked::Tracked;
