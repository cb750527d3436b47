/// Steps shorter than this (in seconds) drive frame-rate adaptation.
pub const MAX_ADAPT_STEP_S: f64 = 0.01;

/// Simulated time derived from FDM packet timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimClock {
    last_timestamp: f64,
    time_now_us: u64,
}

impl SimClock {
    /// Clock that has already seen `timestamp`.
    pub fn starting_at(timestamp: f64, time_now_us: u64) -> Self {
        Self {
            last_timestamp: timestamp,
            time_now_us,
        }
    }

    /// Simulator timestamp of the last packet, in seconds.
    pub fn last_timestamp(&self) -> f64 {
        self.last_timestamp
    }

    /// Accumulated simulated time in microseconds. Never decreases.
    pub fn time_now_us(&self) -> u64 {
        self.time_now_us
    }
}

/// Outcome of feeding one packet timestamp to [`adapt_frame_rate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameUpdate {
    /// Regular step; the simulation loop should run at `rate_hz`.
    Adjust { rate_hz: f64 },
    /// Step of zero or at least [`MAX_ADAPT_STEP_S`]. Time advanced, rate
    /// left alone.
    Stalled { delta_s: f64 },
    /// Timestamp went backwards or is not finite. Time held.
    Reset { delta_s: f64 },
}

impl FrameUpdate {
    /// Frame rate to report to the pacing loop, if any.
    pub fn rate_hz(&self) -> Option<f64> {
        match self {
            Self::Adjust { rate_hz } => Some(*rate_hz),
            Self::Stalled { .. } | Self::Reset { .. } => None,
        }
    }
}

/// Advance `clock` to a new simulator `timestamp`.
///
/// Every non-negative step is added to the accumulated time, including
/// stalls, so bookkeeping stays continuous. A backwards step (simulator
/// restart) holds accumulated time where it is. The new timestamp is
/// always recorded unless it is not finite.
pub fn adapt_frame_rate(clock: &mut SimClock, timestamp: f64) -> FrameUpdate {
    let delta = timestamp - clock.last_timestamp;
    if !timestamp.is_finite() {
        return FrameUpdate::Reset { delta_s: delta };
    }
    clock.last_timestamp = timestamp;

    if delta < 0.0 {
        return FrameUpdate::Reset { delta_s: delta };
    }

    let step_us = (delta * 1.0e6).round() as u64;
    clock.time_now_us = clock.time_now_us.saturating_add(step_us);

    if delta > 0.0 && delta < MAX_ADAPT_STEP_S {
        FrameUpdate::Adjust {
            rate_hz: 1.0 / delta,
        }
    } else {
        FrameUpdate::Stalled { delta_s: delta }
    }
}
