pub mod drain;
pub mod sync;
pub mod time;

pub use drain::drain_backlog;
pub use sync::{Exchange, FdmSynchronizer, RetryPolicy};
pub use time::{adapt_frame_rate, FrameUpdate, SimClock};

use tokio::time::Instant;

use crate::channel::{DatagramChannel, UdpEndpoint};
use crate::config::BridgeConfig;
use crate::error::SimulatorError;
use crate::servo::encode_servos;
use crate::state::KinematicState;
use crate::types::{ActuatorCommands, SensorData};

/// Running totals since the bridge was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Ticks that decoded a fresh state.
    pub ticks: u64,
    /// Servo packets re-sent while waiting for state.
    pub resends: u64,
    /// Stale datagrams discarded after the tick's packet.
    pub drained: u64,
    /// Simulator clock resets seen.
    pub resets: u64,
    /// Packets rejected as malformed.
    pub rejected: u64,
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub frame: FrameUpdate,
    pub resends: u32,
    pub drained: usize,
    /// Accumulated simulated time after the tick, in microseconds.
    pub sim_time_us: u64,
}

impl StepReport {
    /// Frame rate for the pacing loop, when this tick's step qualified.
    pub fn frame_rate_hz(&self) -> Option<f64> {
        self.frame.rate_hz()
    }
}

/// Lockstep bridge to the Gazebo physics engine.
///
/// Owns the channel and the kinematic state exclusively. Each
/// [`step`](GazeboBridge::step) sends the servo outputs, waits for the
/// matching FDM packet, decodes it and throws away anything else queued.
pub struct GazeboBridge<C = UdpEndpoint> {
    channel: C,
    config: BridgeConfig,
    synchronizer: FdmSynchronizer,
    state: KinematicState,
    stats: BridgeStats,
}

impl GazeboBridge<UdpEndpoint> {
    /// Bind the FDM port described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::BindFailed`] if the local port cannot be
    /// bound, or [`SimulatorError::Config`] for unusable settings.
    pub fn connect(config: BridgeConfig) -> Result<Self, SimulatorError> {
        config.check()?;
        let endpoint = UdpEndpoint::configure(config.local_endpoint(), config.peer_endpoint())?;
        Ok(Self::with_channel(endpoint, config))
    }
}

impl<C: DatagramChannel> GazeboBridge<C> {
    /// Run the bridge over an already prepared channel.
    pub fn with_channel(channel: C, config: BridgeConfig) -> Self {
        let synchronizer = FdmSynchronizer::new(config.retry_policy());
        Self {
            channel,
            config,
            synchronizer,
            state: KinematicState::default(),
            stats: BridgeStats::default(),
        }
    }

    pub fn state(&self) -> &KinematicState {
        &self.state
    }

    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Current state as sensor readings for the configured vehicle.
    pub fn sensor_data(&self) -> SensorData {
        self.state
            .to_sensor_data(self.config.vehicle_id, &self.config.home)
    }

    /// Advance the simulation by one tick, waiting as long as it takes.
    ///
    /// With the default retry policy this only returns once fresh state has
    /// been decoded.
    pub async fn step(
        &mut self,
        commands: &ActuatorCommands,
    ) -> Result<StepReport, SimulatorError> {
        self.step_until(commands, None).await
    }

    /// Advance the simulation by one tick, giving up at `deadline`.
    ///
    /// # Errors
    ///
    /// [`SimulatorError::Timeout`] when the deadline or resend limit is hit,
    /// [`SimulatorError::MalformedState`] when validation rejects the packet.
    /// In both cases the kinematic state is left as it was.
    pub async fn step_until(
        &mut self,
        commands: &ActuatorCommands,
        deadline: Option<Instant>,
    ) -> Result<StepReport, SimulatorError> {
        let servo = encode_servos(commands).to_bytes();
        if let Err(e) = self.channel.send(&servo).await {
            tracing::warn!(error = %e, "servo send failed");
        }

        let exchange = self
            .synchronizer
            .exchange(&mut self.channel, &servo, deadline)
            .await?;
        self.stats.resends += u64::from(exchange.resends);
        if exchange.resends > 0 {
            tracing::debug!(resends = exchange.resends, "FDM packet arrived after resends");
        }

        if self.config.validate_state {
            if let Err(reason) = exchange.packet.validate(self.config.quaternion_tolerance) {
                let drained = drain_backlog(&mut self.channel);
                self.stats.drained += drained as u64;
                self.stats.rejected += 1;
                tracing::warn!(%reason, "rejected FDM packet, keeping previous state");
                return Err(reason.into());
            }
        }

        self.state.decode(&exchange.packet);
        let frame = adapt_frame_rate(&mut self.state.clock, exchange.packet.timestamp);
        if let FrameUpdate::Reset { delta_s } = frame {
            self.stats.resets += 1;
            tracing::info!(delta_s, "simulator clock went backwards, holding simulated time");
        }

        let drained = drain_backlog(&mut self.channel);
        self.stats.drained += drained as u64;
        self.stats.ticks += 1;

        Ok(StepReport {
            frame,
            resends: exchange.resends,
            drained,
            sim_time_us: self.state.time_now_us(),
        })
    }
}

impl<C> std::fmt::Debug for GazeboBridge<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GazeboBridge")
            .field("peer", &self.config.peer_endpoint())
            .field("stats", &self.stats)
            .field("sim_time_us", &self.state.time_now_us())
            .finish()
    }
}
