//! Bridge configuration.
//!
//! A [`BridgeConfig`] is built once (defaults, optional JSON file, CLI
//! overrides) and handed to the bridge by value. Nothing reads it afterwards.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::bridge::RetryPolicy;
use crate::error::SimulatorError;
use crate::types::VehicleId;

/// Geographic position of the NED origin.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct GeoPosition {
    pub lat_deg: f64,
    pub lon_deg: f64,
    /// Altitude in meters above sea level.
    pub alt_m: f64,
}

impl Default for GeoPosition {
    fn default() -> Self {
        Self {
            lat_deg: -35.363261,
            lon_deg: 149.165230,
            alt_m: 584.0,
        }
    }
}

/// Connection and decode settings for one bridge instance.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Local address to bind for FDM packets (default: all interfaces).
    pub bind_addr: IpAddr,
    /// Local UDP port for FDM packets (default: 9003).
    pub local_port: u16,
    /// Address of the Gazebo plugin.
    pub peer_addr: IpAddr,
    /// UDP port the Gazebo plugin listens on for servo packets (default: 9002).
    pub peer_port: u16,
    /// Bounded wait per receive attempt, in milliseconds.
    pub recv_timeout_ms: u64,
    /// Resend limit per tick. `None` retries forever.
    pub max_resends: Option<u32>,
    /// Reject NaN fields and non-unit quaternions instead of decoding them.
    /// Off by default: the physics engine is trusted.
    pub validate_state: bool,
    /// Allowed deviation of the quaternion norm from 1.
    pub quaternion_tolerance: f64,
    /// Vehicle tagged on derived sensor data.
    pub vehicle_id: VehicleId,
    /// Origin of the NED position reported by Gazebo.
    pub home: GeoPosition,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            local_port: 9003,
            peer_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            peer_port: 9002,
            recv_timeout_ms: 100,
            max_resends: None,
            validate_state: false,
            quaternion_tolerance: 1e-3,
            vehicle_id: VehicleId(1),
            home: GeoPosition::default(),
        }
    }
}

impl BridgeConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, SimulatorError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| SimulatorError::Config(format!("JSON parse error: {e}")))?;
        config.check()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, SimulatorError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            SimulatorError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&json)
    }

    /// Reject values the bridge cannot run with.
    pub fn check(&self) -> Result<(), SimulatorError> {
        if self.recv_timeout_ms == 0 {
            return Err(SimulatorError::Config(
                "recv_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.peer_port == 0 {
            return Err(SimulatorError::Config("peer_port must be set".to_string()));
        }
        if !(self.quaternion_tolerance.is_finite() && self.quaternion_tolerance >= 0.0) {
            return Err(SimulatorError::Config(
                "quaternion_tolerance must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    pub fn local_endpoint(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.local_port)
    }

    pub fn peer_endpoint(&self) -> SocketAddr {
        SocketAddr::new(self.peer_addr, self.peer_port)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            recv_timeout: Duration::from_millis(self.recv_timeout_ms),
            max_resends: self.max_resends,
        }
    }
}
