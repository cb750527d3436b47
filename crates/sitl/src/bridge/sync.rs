use std::time::Duration;

use tokio::time::Instant;

use crate::channel::DatagramChannel;
use crate::error::SimulatorError;
use crate::wire::{FdmPacket, FDM_PACKET_LEN};

/// Receive buffer size. Larger than an FDM packet so oversized datagrams
/// show up with their real length instead of being silently truncated.
const RECV_BUF_LEN: usize = 2048;

/// Retry behaviour of the servo/FDM exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Bounded wait for each receive attempt.
    pub recv_timeout: Duration,
    /// Resends allowed before giving up. `None` retries forever.
    pub max_resends: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            recv_timeout: Duration::from_millis(100),
            max_resends: None,
        }
    }
}

/// A state packet accepted by the synchronizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exchange {
    pub packet: FdmPacket,
    /// Servo packets re-sent before `packet` arrived.
    pub resends: u32,
}

/// Drives the lockstep exchange with the physics engine: wait for a state
/// packet and keep re-sending the servo packet until one arrives.
///
/// Lost datagrams in either direction are the normal case, not an error.
#[derive(Debug, Clone, Default)]
pub struct FdmSynchronizer {
    policy: RetryPolicy,
}

impl FdmSynchronizer {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Wait for one full-size FDM packet, re-sending `servo` after every
    /// receive attempt that times out or yields anything else.
    ///
    /// The bounded receive is the only await point, so dropping the
    /// returned future cancels the exchange cleanly.
    ///
    /// # Errors
    ///
    /// Returns [`SimulatorError::Timeout`] once `deadline` passes or the
    /// policy's resend limit is used up. Never fails otherwise.
    pub async fn exchange<C>(
        &self,
        channel: &mut C,
        servo: &[u8],
        deadline: Option<Instant>,
    ) -> Result<Exchange, SimulatorError>
    where
        C: DatagramChannel + ?Sized,
    {
        let mut buf = [0u8; RECV_BUF_LEN];
        let mut resends = 0u32;

        loop {
            let wait = match deadline {
                Some(deadline) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Err(SimulatorError::Timeout("FDM packet before deadline"));
                    }
                    left.min(self.policy.recv_timeout)
                }
                None => self.policy.recv_timeout,
            };

            let attempt = Instant::now();
            match channel.recv_timeout(&mut buf, wait).await {
                Ok(Some(len)) => match FdmPacket::from_bytes(&buf[..len]) {
                    Some(packet) => return Ok(Exchange { packet, resends }),
                    None => tracing::debug!(len, expected = FDM_PACKET_LEN, "ignoring FDM datagram"),
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::debug!(error = %e, "FDM receive failed");
                    // Errors return at once; keep resends paced by the wait.
                    tokio::time::sleep_until(attempt + wait).await;
                }
            }

            if self.policy.max_resends.is_some_and(|max| resends >= max) {
                return Err(SimulatorError::Timeout("FDM packet within resend limit"));
            }

            if let Err(e) = channel.send(servo).await {
                tracing::warn!(error = %e, "servo resend failed");
            }
            resends += 1;
            tracing::trace!(resends, "re-sent servo packet");
        }
    }
}
