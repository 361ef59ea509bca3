//! Non-blocking control protocol publisher.
//!
//! Caller → lock-free queue → publisher thread → UDP.
//!
//! `publish` never blocks and never does I/O on the calling thread, so the
//! relay and supervisors can publish freely; when the queue is full the
//! message is dropped.

use crate::error::Result;
use crate::protocol::{ControlEndpoint, ControlMessage, ControlPacket};
use crate::transport::{self, ControlSocket};
use crossbeam::queue::ArrayQueue;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PUBLISH_QUEUE_SIZE: usize = 512;

const IDLE_SLEEP: Duration = Duration::from_micros(500);

pub trait ControlPublisher: Send + Sync {
    /// Queue `message` for `endpoint`. Returns false if it was dropped.
    fn publish(&self, endpoint: &ControlEndpoint, message: ControlMessage) -> bool;
}

#[derive(Debug)]
struct Outgoing {
    addr: SocketAddr,
    packet: ControlPacket,
}

/// UDP publisher backed by a dedicated `control-publisher` thread.
///
/// Dropping it flushes what is still queued and joins the thread.
pub struct UdpPublisher {
    queue: Arc<ArrayQueue<Outgoing>>,
    running: Arc<AtomicBool>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl UdpPublisher {
    pub fn new() -> Result<Self> {
        let socket = transport::bind_std(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))?;
        let queue = Arc::new(ArrayQueue::new(PUBLISH_QUEUE_SIZE));
        let running = Arc::new(AtomicBool::new(true));

        let thread_handle = {
            let queue = Arc::clone(&queue);
            let running = Arc::clone(&running);
            thread::Builder::new()
                .name("control-publisher".to_string())
                .spawn(move || Self::publisher_thread_main(socket, queue, running))?
        };

        Ok(Self {
            queue,
            running,
            thread_handle: Some(thread_handle),
        })
    }

    fn publisher_thread_main(
        socket: std::net::UdpSocket,
        queue: Arc<ArrayQueue<Outgoing>>,
        running: Arc<AtomicBool>,
    ) {
        let runtime = match transport::socket_runtime() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("Control publisher runtime failed: {}", e);
                return;
            }
        };

        runtime.block_on(async {
            let socket = match ControlSocket::from_std(socket) {
                Ok(socket) => socket,
                Err(e) => {
                    tracing::error!("Control publisher socket failed: {}", e);
                    return;
                }
            };

            while running.load(Ordering::Acquire) {
                if let Some(outgoing) = queue.pop() {
                    Self::send(&socket, outgoing).await;
                } else {
                    tokio::time::sleep(IDLE_SLEEP).await;
                }
            }

            while let Some(outgoing) = queue.pop() {
                Self::send(&socket, outgoing).await;
            }
        });
    }

    async fn send(socket: &ControlSocket, outgoing: Outgoing) {
        if let Err(e) = socket.send_packet(outgoing.addr, &outgoing.packet).await {
            tracing::debug!(
                "Failed to publish {} to {}: {}",
                outgoing.packet.path,
                outgoing.addr,
                e
            );
        }
    }

    pub fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl ControlPublisher for UdpPublisher {
    fn publish(&self, endpoint: &ControlEndpoint, message: ControlMessage) -> bool {
        let outgoing = Outgoing {
            addr: endpoint.addr(),
            packet: ControlPacket::new(endpoint.path(), message),
        };

        match self.queue.push(outgoing) {
            Ok(()) => true,
            Err(dropped) => {
                tracing::trace!("Publish queue full, dropping {}", dropped.packet.path);
                false
            }
        }
    }
}

impl Drop for UdpPublisher {
    fn drop(&mut self) {
        self.shutdown();
    }
}
