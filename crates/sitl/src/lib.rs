//! Lockstep UDP bridge between an autopilot SITL build and the Gazebo
//! physics engine.
//!
//! Every tick the bridge sends 16 normalized servo values, waits (re-sending
//! as needed) for one FDM state packet, decodes it into a
//! [`KinematicState`], adapts the frame rate to the simulator clock and
//! drops any stale packets still queued.

pub mod bridge;
pub mod channel;
pub mod config;
pub mod error;
pub mod servo;
pub mod state;
pub mod trace;
pub mod types;
pub mod wire;

pub use bridge::{BridgeStats, FrameUpdate, GazeboBridge, RetryPolicy, StepReport};
pub use channel::{DatagramChannel, UdpEndpoint};
pub use config::{BridgeConfig, GeoPosition};
pub use error::SimulatorError;
pub use state::KinematicState;
pub use types::{ActuatorCommands, SensorData, VehicleId};
pub use wire::{FdmPacket, MalformedState, ServoPacket};
