//! camsnap-node — livestream and snapshot capture on a single camera.
//!
//! One camera, two modes:
//!
//! | Mode       | Trigger                       | Output                                      |
//! |------------|-------------------------------|---------------------------------------------|
//! | Livestream | `…/livestream/state` true/false | low-res frame every period on `…/livestream` |
//! | Snapshot   | `…/snapshot/trigger` true      | high-res JPEG on disk + image on `…/snapshot` |
//!
//! Both modes share the device; [`controller::CaptureController`] switches its
//! output resolution around every snapshot and [`dispatch::run`] serialises all
//! work on one task.

pub mod controller;
pub mod delivery;
pub mod dispatch;
pub mod periodic;
pub mod retention;

#[cfg(test)]
mod testing;

pub use controller::{CaptureController, LivestreamTransition, ModeResolutions, SnapshotOutcome, TickOutcome};
pub use delivery::FrameDelivery;
pub use dispatch::{Route, TriggerRoutes};
pub use periodic::PeriodicTask;
pub use retention::RetentionWindow;
