//! # Network Module
//!
//! Networking abstractions over ZMQ. The controller only publishes (visualisation markers), so the
//! socket here is a bound publisher which keeps track of how many subscribers are attached to it.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, warn};
use serde::Deserialize;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    thread,
};
use zmq::{Context, Socket, SocketEvent, SocketType};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| MonitoredSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Used to give each monitor a unique inproc endpoint
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network endpoint parameters, loaded from `net.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct NetParams {
    /// Endpoint the marker publisher binds to, for example `"tcp://*:5030"`
    pub marker_endpoint: String,
}

/// A bound zmq socket whose peers are counted by a background monitor thread.
pub struct MonitoredSocket {
    socket: Socket,

    endpoint: String,

    shutdown: Arc<AtomicBool>,

    num_peers: Arc<AtomicUsize>,
}

/// Options set on a monitored socket, see
/// [`zmq_setsockopt`](http://api.zeromq.org/4-2:zmq-setsockopt).
#[derive(Debug, Clone)]
pub struct SocketOptions {
    /// `ZMQ_LINGER`: how long pending messages are kept after the socket is closed, ms
    pub linger: i32,

    /// `ZMQ_SNDTIMEO`: maximum time before a send returns with `EAGAIN`, ms
    pub send_timeout: i32,

    /// `ZMQ_SNDHWM`: number of messages queued per peer before new ones are dropped
    pub send_hwm: i32,

    /// `ZMQ_HEARTBEAT_IVL`: interval between ZMTP heartbeats, ms
    pub heartbeat_ivl: i32,

    /// `ZMQ_HEARTBEAT_TIMEOUT`: time without traffic after which a peer is dropped, ms
    pub heartbeat_timeout: i32,

    /// `ZMQ_HEARTBEAT_TTL`: time the remote peer waits for traffic before dropping us, ms
    pub heartbeat_ttl: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Error creating the socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Error enabling monitoring for the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not bind the socket to {0}: {1}")]
    BindError(String, zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a socket of the given type and bind it to `endpoint`.
    ///
    /// Binding does not wait for any peer to connect.
    pub fn bind(
        ctx: &Context,
        socket_type: SocketType,
        socket_options: &SocketOptions,
        endpoint: &str,
    ) -> Result<Self, MonitoredSocketError> {
        let socket = ctx
            .socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        // The monitor must be connected before the socket is bound or early events are lost
        let monitor_endpoint = format!(
            "inproc://monitor_{}",
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );
        let events = SocketEvent::ACCEPTED as i32 | SocketEvent::DISCONNECTED as i32;
        socket
            .monitor(&monitor_endpoint, events)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor = ctx
            .socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor
            .connect(&monitor_endpoint)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;

        socket_options.set(&socket)?;

        socket
            .bind(endpoint)
            .map_err(|e| MonitoredSocketError::BindError(endpoint.into(), e))?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let num_peers = Arc::new(AtomicUsize::new(0));

        {
            let shutdown = shutdown.clone();
            let num_peers = num_peers.clone();
            let endpoint = String::from(endpoint);
            thread::spawn(move || monitor_socket(monitor, endpoint, shutdown, num_peers));
        }

        Ok(Self {
            socket,
            endpoint: String::from(endpoint),
            shutdown,
            num_peers,
        })
    }

    /// Number of peers currently connected to the socket.
    pub fn num_peers(&self) -> usize {
        self.num_peers.load(Ordering::Relaxed)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        // The monitor thread is blocked on its next event so it is left to exit on its own
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl SocketOptions {
    /// Set these options on the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), MonitoredSocketError> {
        set_sockopts!(
            socket,
            (set_linger, self.linger),
            (set_sndtimeo, self.send_timeout),
            (set_sndhwm, self.send_hwm),
            (set_heartbeat_ivl, self.heartbeat_ivl),
            (set_heartbeat_timeout, self.heartbeat_timeout),
            (set_heartbeat_ttl, self.heartbeat_ttl)
        );

        Ok(())
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        // zmq's own defaults
        Self {
            linger: 30_000,
            send_timeout: -1,
            send_hwm: 1000,
            heartbeat_ivl: 0,
            heartbeat_timeout: 0,
            heartbeat_ttl: 0,
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read an event from a monitor socket.
fn read_event(monitor: &Socket) -> Result<SocketEvent, zmq::Error> {
    let msg = monitor.recv_msg(0)?;
    let event = u16::from_ne_bytes([msg[0], msg[1]]);

    // Second frame is the peer address
    if monitor.get_rcvmore()? {
        monitor.recv_msg(0)?;
    }

    Ok(SocketEvent::from_raw(event))
}

fn monitor_socket(
    monitor: Socket,
    endpoint: String,
    shutdown: Arc<AtomicBool>,
    num_peers: Arc<AtomicUsize>,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let event = match read_event(&monitor) {
            Ok(e) => e,
            Err(e) => {
                warn!("Stopped monitoring {}: {}", endpoint, e);
                return;
            }
        };

        match event {
            SocketEvent::ACCEPTED => {
                let n = num_peers.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Peer connected to {} ({} connected)", endpoint, n);
            }
            SocketEvent::DISCONNECTED => {
                // Never wraps below zero
                let _ = num_peers.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                    n.checked_sub(1)
                });
                debug!("Peer disconnected from {}", endpoint);
            }
            _ => (),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bind_publisher() {
        let ctx = zmq::Context::new();
        let options = SocketOptions {
            linger: 0,
            ..Default::default()
        };

        let socket =
            MonitoredSocket::bind(&ctx, zmq::PUB, &options, "inproc://test_bind_publisher")
                .unwrap();

        assert_eq!(socket.endpoint(), "inproc://test_bind_publisher");
        assert_eq!(socket.num_peers(), 0);

        // Publishing with nobody listening silently drops the message
        socket.send("hello", 0).unwrap();

        // Binding the same endpoint twice fails
        match MonitoredSocket::bind(&ctx, zmq::PUB, &options, "inproc://test_bind_publisher") {
            Err(MonitoredSocketError::BindError(_, _)) => (),
            Err(e) => panic!("Expected a BindError, got {}", e),
            Ok(_) => panic!("Expected a BindError"),
        }
    }
}
