use std::net::SocketAddr;

use crate::wire::MalformedState;

/// Errors that can occur during bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum SimulatorError {
    /// The local receive port could not be bound. Nothing can run without it.
    #[error("Failed to bind FDM socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Timeout waiting for {0}")]
    Timeout(&'static str),

    #[error("Malformed FDM state: {0}")]
    MalformedState(#[from] MalformedState),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
