//! camsnap-trigger — send one boolean trigger to a running node.
//!
//! ```text
//! camsnap-trigger 127.0.0.1:7879 /camera0/livestream/state true
//! camsnap-trigger 127.0.0.1:7879 /camera0/snapshot/trigger true
//! ```

use anyhow::{bail, Context, Result};
use camsnap_bus::{send_trigger, Trigger};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: camsnap-trigger <addr> <topic> <true|false>";

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Some(true),
        "false" | "0" | "off" => Some(false),
        _ => None,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [addr, topic, value] = args.as_slice() else {
        bail!(USAGE);
    };
    let Some(data) = parse_bool(value) else {
        bail!("invalid value {value:?}\n{USAGE}");
    };

    let trigger = Trigger::new(topic.as_str(), data);
    send_trigger(addr, &trigger)
        .await
        .with_context(|| format!("sending to {addr}"))?;
    info!("Sent {} = {} to {}", trigger.topic, trigger.data, addr);
    Ok(())
}
