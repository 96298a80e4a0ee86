//! Single-task event loop: triggers and livestream ticks are handled strictly
//! one at a time, so a snapshot never interleaves with a livestream read.

use std::future::Future;

use camsnap_bus::{Publisher, Trigger};
use camsnap_capture::CaptureDevice;
use camsnap_core::Topics;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::controller::CaptureController;

/// Where an incoming trigger should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    LivestreamState(bool),
    SnapshotTrigger(bool),
    Unknown,
}

/// Topic names the node subscribes to.
#[derive(Debug, Clone)]
pub struct TriggerRoutes {
    pub livestream_state: String,
    pub snapshot_trigger: String,
}

impl From<&Topics> for TriggerRoutes {
    fn from(topics: &Topics) -> Self {
        Self {
            livestream_state: topics.livestream_state.clone(),
            snapshot_trigger: topics.snapshot_trigger.clone(),
        }
    }
}

impl TriggerRoutes {
    pub fn route(&self, trigger: &Trigger) -> Route {
        if trigger.topic == self.livestream_state {
            Route::LivestreamState(trigger.data)
        } else if trigger.topic == self.snapshot_trigger {
            Route::SnapshotTrigger(trigger.data)
        } else {
            Route::Unknown
        }
    }
}

/// Drive `controller` until `shutdown` resolves or every trigger sender is gone.
pub async fn run<D, P>(
    controller: &mut CaptureController<D, P>,
    routes: &TriggerRoutes,
    mut triggers: mpsc::Receiver<Trigger>,
    shutdown: impl Future<Output = ()>,
) where
    D: CaptureDevice,
    P: Publisher,
{
    tokio::pin!(shutdown);
    info!(
        "Listening for triggers on {} and {}",
        routes.livestream_state, routes.snapshot_trigger
    );

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }

            maybe = triggers.recv() => {
                let Some(trigger) = maybe else {
                    debug!("Trigger channel closed");
                    break;
                };
                match routes.route(&trigger) {
                    Route::LivestreamState(start) => {
                        controller.on_livestream_state(start);
                    }
                    Route::SnapshotTrigger(capture) => {
                        controller.on_snapshot_trigger(capture);
                    }
                    Route::Unknown => warn!("Ignoring trigger on unknown topic {}", trigger.topic),
                }
            }

            _ = controller.next_tick() => {
                controller.on_tick();
            }
        }
    }

    // Leave no timer behind once the loop is gone.
    controller.on_livestream_state(false);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use camsnap_core::{LivestreamState, Settings};
    use tokio::time::sleep;

    use crate::testing::{Fixture, LIVESTREAM_TOPIC, SNAPSHOT_TOPIC};

    const STATE: &str = "/camera0/livestream/state";
    const TRIGGER: &str = "/camera0/snapshot/trigger";

    fn routes() -> TriggerRoutes {
        TriggerRoutes::from(&Settings::default().topics())
    }

    fn topics_of(fx: &mut Fixture) -> Vec<String> {
        fx.published().into_iter().map(|p| p.topic).collect()
    }

    #[test]
    fn routes_by_exact_topic() {
        let routes = routes();
        assert_eq!(routes.route(&Trigger::new(STATE, true)), Route::LivestreamState(true));
        assert_eq!(routes.route(&Trigger::new(TRIGGER, false)), Route::SnapshotTrigger(false));
        assert_eq!(routes.route(&Trigger::new("/camera0/livestream", true)), Route::Unknown);
    }

    #[tokio::test(start_paused = true)]
    async fn livestream_publishes_once_per_period_until_stopped() {
        let mut fx = Fixture::new();
        let routes = routes();
        let (tx, rx) = mpsc::channel(8);

        let script = async move {
            tx.send(Trigger::new(STATE, true)).await.unwrap();
            // Ticks land at 30, 60 and 90 ms.
            sleep(Duration::from_millis(95)).await;
            tx.send(Trigger::new(STATE, false)).await.unwrap();
            sleep(Duration::from_millis(200)).await;
        };
        tokio::join!(run(&mut fx.controller, &routes, rx, std::future::pending()), script);

        assert_eq!(topics_of(&mut fx), [LIVESTREAM_TOPIC; 3]);
        assert_eq!(fx.controller.livestream_state(), LivestreamState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_does_not_double_the_rate() {
        let mut fx = Fixture::new();
        let routes = routes();
        let (tx, rx) = mpsc::channel(8);

        let script = async move {
            tx.send(Trigger::new(STATE, true)).await.unwrap();
            sleep(Duration::from_millis(10)).await;
            tx.send(Trigger::new(STATE, true)).await.unwrap();
            sleep(Duration::from_millis(85)).await;
            tx.send(Trigger::new(STATE, false)).await.unwrap();
            sleep(Duration::from_millis(200)).await;
        };
        tokio::join!(run(&mut fx.controller, &routes, rx, std::future::pending()), script);

        assert_eq!(topics_of(&mut fx).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn snapshot_between_livestream_ticks() {
        let mut fx = Fixture::new();
        let routes = routes();
        let (tx, rx) = mpsc::channel(8);

        let script = async move {
            tx.send(Trigger::new(STATE, true)).await.unwrap();
            sleep(Duration::from_millis(45)).await;
            tx.send(Trigger::new(TRIGGER, true)).await.unwrap();
            sleep(Duration::from_millis(20)).await;
            tx.send(Trigger::new(STATE, false)).await.unwrap();
        };
        tokio::join!(run(&mut fx.controller, &routes, rx, std::future::pending()), script);

        assert_eq!(topics_of(&mut fx), [LIVESTREAM_TOPIC, SNAPSHOT_TOPIC, LIVESTREAM_TOPIC]);
        assert_eq!(fx.controller.snapshot_counter(), 1);
        assert_eq!(fx.files_on_disk(), vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_topics_are_ignored() {
        let mut fx = Fixture::new();
        let routes = routes();
        let (tx, rx) = mpsc::channel(8);

        let script = async move {
            tx.send(Trigger::new("/somewhere/else", true)).await.unwrap();
            tx.send(Trigger::new(TRIGGER, false)).await.unwrap();
            sleep(Duration::from_millis(100)).await;
        };
        tokio::join!(run(&mut fx.controller, &routes, rx, std::future::pending()), script);

        assert!(fx.published().is_empty());
        assert_eq!(fx.controller.livestream_state(), LivestreamState::Stopped);
        assert_eq!(fx.camera.state().reads, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_running_livestream() {
        let mut fx = Fixture::new();
        let routes = routes();
        let (tx, rx) = mpsc::channel(8);
        tx.send(Trigger::new(STATE, true)).await.unwrap();

        let shutdown = sleep(Duration::from_millis(70));
        run(&mut fx.controller, &routes, rx, shutdown).await;

        assert_eq!(topics_of(&mut fx).len(), 2);
        assert_eq!(fx.controller.livestream_state(), LivestreamState::Stopped);
        drop(tx);
    }
}
