//! OS process plumbing: liveness probing, signal delivery, detached launch.
//!
//! Each concern sits behind a trait so the supervisor can be driven by fakes
//! in tests.

mod launcher;
mod probe;
mod signal;

pub use launcher::{DetachedLauncher, OutputTarget, ProcessLauncher, SpawnRequest};
pub use probe::{ProcessProbe, SystemProbe};
pub use signal::{ProcessSignaller, StopSignal, SystemSignaller};
