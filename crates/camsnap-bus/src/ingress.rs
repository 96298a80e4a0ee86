//! TCP trigger ingress.
//!
//! # Framing
//!
//! ```text
//! [0..4]  length  u32 BE  size of the JSON body (≤ 64 KiB)
//! [4..]   body    JSON    {"topic": "/camera0/snapshot/trigger", "data": true}
//! ```
//!
//! A connection may carry any number of messages. Triggers from one
//! connection are forwarded in the order they were received.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::message::Trigger;
use crate::BusError;

const MAX_MESSAGE_BYTES: usize = 64 * 1024;

// ── Length-prefixed framing ───────────────────────────────────────────────────

async fn write_trigger(
    stream: &mut (impl AsyncWriteExt + Unpin),
    trigger: &Trigger,
) -> Result<(), BusError> {
    let json = serde_json::to_vec(trigger)?;
    let len = json.len() as u32;
    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(&json).await?;
    stream.flush().await?;
    debug!("Sent trigger {} = {} ({} bytes)", trigger.topic, trigger.data, json.len());
    Ok(())
}

/// Read one framed trigger. `Ok(None)` on a clean end of stream.
async fn read_trigger(
    stream: &mut (impl AsyncReadExt + Unpin),
) -> Result<Option<Trigger>, BusError> {
    let mut len_buf = [0u8; 4];
    match stream.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_BYTES {
        return Err(BusError::MessageTooLarge { len });
    }
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    Ok(Some(serde_json::from_slice(&body)?))
}

// ── TriggerListener ───────────────────────────────────────────────────────────

/// Accepts trigger connections and forwards decoded [`Trigger`]s to a channel.
pub struct TriggerListener {
    listener: TcpListener,
}

impl TriggerListener {
    pub async fn bind(addr: &str) -> Result<Self, BusError> {
        let listener = TcpListener::bind(addr).await?;
        info!("Trigger listener on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, BusError> {
        Ok(self.listener.local_addr()?)
    }

    /// Run the accept loop on a background task.
    pub fn spawn(self, tx: mpsc::Sender<Trigger>) -> JoinHandle<()> {
        tokio::spawn(self.run(tx))
    }

    /// Accept connections until the trigger receiver is dropped.
    pub async fn run(self, tx: mpsc::Sender<Trigger>) {
        loop {
            tokio::select! {
                _ = tx.closed() => {
                    debug!("Trigger receiver closed — listener exiting");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!("Trigger connection from {}", peer);
                        tokio::spawn(serve_connection(stream, peer, tx.clone()));
                    }
                    Err(e) => warn!("Trigger accept failed: {}", e),
                },
            }
        }
    }
}

async fn serve_connection(mut stream: TcpStream, peer: SocketAddr, tx: mpsc::Sender<Trigger>) {
    loop {
        match read_trigger(&mut stream).await {
            Ok(Some(trigger)) => {
                if tx.send(trigger).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("Trigger connection {} closed", peer);
                break;
            }
            // The length prefix keeps the stream aligned, so a bad body only costs one message.
            Err(BusError::Decode(e)) => warn!("Malformed trigger from {}: {}", peer, e),
            Err(e) => {
                warn!("Trigger connection {} dropped: {}", peer, e);
                break;
            }
        }
    }
}

// ── Client ────────────────────────────────────────────────────────────────────

/// Connect to a trigger listener and send a single trigger.
pub async fn send_trigger(addr: &str, trigger: &Trigger) -> Result<(), BusError> {
    let mut stream = TcpStream::connect(addr).await?;
    write_trigger(&mut stream, trigger).await?;
    stream.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn listener() -> (String, mpsc::Receiver<Trigger>) {
        let listener = TriggerListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let (tx, rx) = mpsc::channel(8);
        listener.spawn(tx);
        (addr, rx)
    }

    #[tokio::test]
    async fn forwards_triggers_from_client() {
        let (addr, mut rx) = listener().await;

        send_trigger(&addr, &Trigger::new("/camera0/livestream/state", true)).await.unwrap();
        let got = rx.recv().await.unwrap();
        assert_eq!(got, Trigger::new("/camera0/livestream/state", true));
    }

    #[tokio::test]
    async fn keeps_order_within_a_connection() {
        let (addr, mut rx) = listener().await;

        let mut stream = TcpStream::connect(&addr).await.unwrap();
        write_trigger(&mut stream, &Trigger::new("/a", true)).await.unwrap();
        write_trigger(&mut stream, &Trigger::new("/b", false)).await.unwrap();
        write_trigger(&mut stream, &Trigger::new("/c", true)).await.unwrap();

        let topics: Vec<String> = vec![
            rx.recv().await.unwrap().topic,
            rx.recv().await.unwrap().topic,
            rx.recv().await.unwrap().topic,
        ];
        assert_eq!(topics, ["/a", "/b", "/c"]);
    }

    #[tokio::test]
    async fn skips_malformed_body() {
        let (addr, mut rx) = listener().await;

        let mut stream = TcpStream::connect(&addr).await.unwrap();
        let junk = b"{not json";
        stream.write_all(&(junk.len() as u32).to_be_bytes()).await.unwrap();
        stream.write_all(junk).await.unwrap();
        write_trigger(&mut stream, &Trigger::new("/ok", true)).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().topic, "/ok");
    }

    #[tokio::test]
    async fn rejects_oversized_length() {
        let mut data: &[u8] = &((MAX_MESSAGE_BYTES as u32 + 1).to_be_bytes());
        let err = read_trigger(&mut data).await.unwrap_err();
        assert!(matches!(err, BusError::MessageTooLarge { .. }));
    }

    #[tokio::test]
    async fn clean_eof_yields_none() {
        let mut data: &[u8] = &[];
        assert!(read_trigger(&mut data).await.unwrap().is_none());
    }
}
