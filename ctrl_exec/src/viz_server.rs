//! # Marker Server
//!
//! Publishes visualisation markers over a zmq PUB socket. Each marker array is sent as a single
//! JSON message.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{info, warn};

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    viz::MarkerArray,
};

use crate::mpc_prep::viz::MarkerSink;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of marker arrays queued per subscriber before new ones are dropped.
const MARKER_QUEUE_LEN: i32 = 10;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Marker server
pub struct MarkerServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MarkerServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send markers: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the markers: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MarkerServer {
    /// Create a new instance of the marker server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, MarkerServerError> {
        let socket_options = SocketOptions {
            linger: 1,
            send_timeout: 10,
            // Markers are only useful while they're fresh
            send_hwm: MARKER_QUEUE_LEN,
            heartbeat_ivl: 500,
            heartbeat_timeout: 1000,
            heartbeat_ttl: 1000,
        };

        let socket = MonitoredSocket::bind(ctx, zmq::PUB, &socket_options, &params.marker_endpoint)
            .map_err(MarkerServerError::SocketError)?;

        info!("Publishing markers on {}", socket.endpoint());

        Ok(Self { socket })
    }

    /// Send the markers to any subscribers.
    ///
    /// If nobody is subscribed the markers are dropped without being serialized.
    pub fn send(&mut self, markers: &MarkerArray) -> Result<(), MarkerServerError> {
        if self.socket.num_peers() == 0 {
            return Ok(());
        }

        let msg = serde_json::to_string(markers).map_err(MarkerServerError::SerializationError)?;

        self.socket
            .send(msg.as_str(), 0)
            .map_err(MarkerServerError::SendError)
    }
}

impl MarkerSink for MarkerServer {
    fn publish(&mut self, markers: MarkerArray) {
        if let Err(e) = self.send(&markers) {
            warn!("MarkerServer error: {}", e);
        }
    }
}
