use crate::channel::DatagramChannel;

const DRAIN_BUF_LEN: usize = 1024;

/// Discard every datagram already queued on `channel`.
///
/// Stops at the first "nothing queued". Any receive error is logged and ends
/// the drain for this tick. Returns the number of datagrams discarded.
pub fn drain_backlog<C>(channel: &mut C) -> usize
where
    C: DatagramChannel + ?Sized,
{
    let mut buf = [0u8; DRAIN_BUF_LEN];
    let mut drained = 0;
    loop {
        match channel.try_recv(&mut buf) {
            Ok(Some(len)) => {
                drained += 1;
                tracing::trace!(len, "discarded stale datagram");
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "error draining FDM socket");
                break;
            }
        }
    }
    drained
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    /// Channel whose queue is drained with `try_recv`; an optional error is
    /// returned once the queue is empty.
    struct QueuedChannel {
        queue: VecDeque<Vec<u8>>,
        error_after: Option<io::ErrorKind>,
    }

    #[async_trait]
    impl DatagramChannel for QueuedChannel {
        async fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        async fn recv_timeout(
            &mut self,
            _buf: &mut [u8],
            _timeout: Duration,
        ) -> io::Result<Option<usize>> {
            Ok(None)
        }

        fn try_recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
            match self.queue.pop_front() {
                Some(datagram) => {
                    let len = datagram.len().min(buf.len());
                    buf[..len].copy_from_slice(&datagram[..len]);
                    Ok(Some(len))
                }
                None => match self.error_after.take() {
                    Some(kind) => Err(io::Error::from(kind)),
                    None => Ok(None),
                },
            }
        }
    }

    #[test]
    fn test_drains_all_queued_packets() {
        let mut channel = QueuedChannel {
            queue: vec![vec![1u8; 136], vec![2u8; 136]].into(),
            error_after: None,
        };
        assert_eq!(drain_backlog(&mut channel), 2);
        assert!(channel.queue.is_empty());
    }

    #[test]
    fn test_empty_channel_drains_nothing() {
        let mut channel = QueuedChannel {
            queue: VecDeque::new(),
            error_after: None,
        };
        assert_eq!(drain_backlog(&mut channel), 0);
    }

    #[test]
    fn test_error_abandons_drain() {
        let mut channel = QueuedChannel {
            queue: vec![vec![0u8; 8]].into(),
            error_after: Some(io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(drain_backlog(&mut channel), 1);
        // Error consumed; the next drain starts clean.
        assert_eq!(drain_backlog(&mut channel), 0);
    }
}
