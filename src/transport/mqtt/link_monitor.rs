//! Broker link supervision for the network loop
//!
//! Pure bookkeeping: the client reports what the event loop saw and gets back
//! whether to surface a disconnect and how long to wait before the next
//! connection attempt.

use super::connection::ReconnectConfig;

/// How the network loop continues after a poll error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectionDecision {
    /// Sleep for `delay_ms`, then let the next poll reconnect
    Retry { attempt: u32, delay_ms: u64 },
    /// Shutdown was requested while the link was down
    Shutdown,
    /// The configured attempt limit is used up
    GiveUp { attempts: u32 },
}

/// Connection attempt and outage tracking for one broker link
#[derive(Debug, Clone, Default)]
pub struct LinkMonitor {
    config: ReconnectConfig,
    attempts: u32,
    loss_reported: bool,
}

impl LinkMonitor {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
            loss_reported: false,
        }
    }

    /// Attempts made since the last CONNACK
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// CONNACK received; the attempt counter starts over
    pub fn connected(&mut self) {
        self.attempts = 0;
        self.loss_reported = false;
    }

    /// The link went down. Returns true the first time for the current
    /// attempt, so a broker DISCONNECT followed by a poll error is reported
    /// once.
    pub fn link_lost(&mut self) -> bool {
        !std::mem::replace(&mut self.loss_reported, true)
    }

    /// Decide what follows a poll error
    pub fn next_attempt(&mut self, shutdown_requested: bool) -> ReconnectionDecision {
        if shutdown_requested {
            return ReconnectionDecision::Shutdown;
        }

        if matches!(self.config.max_attempts, Some(max) if self.attempts >= max) {
            return ReconnectionDecision::GiveUp {
                attempts: self.attempts,
            };
        }

        self.attempts += 1;
        ReconnectionDecision::Retry {
            attempt: self.attempts,
            delay_ms: self.config.calculate_backoff_delay(self.attempts),
        }
    }

    /// A new connection attempt starts; its failure is reported again
    pub fn retrying(&mut self) {
        self.loss_reported = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limited(max_attempts: u32) -> LinkMonitor {
        LinkMonitor::new(ReconnectConfig {
            max_attempts: Some(max_attempts),
            backoff_pattern: vec![100, 200],
            sustained_delay: 400,
        })
    }

    #[test]
    fn test_backoff_follows_attempts() {
        let mut monitor = limited(3);

        assert_eq!(
            monitor.next_attempt(false),
            ReconnectionDecision::Retry {
                attempt: 1,
                delay_ms: 100
            }
        );
        assert_eq!(
            monitor.next_attempt(false),
            ReconnectionDecision::Retry {
                attempt: 2,
                delay_ms: 200
            }
        );
        assert_eq!(
            monitor.next_attempt(false),
            ReconnectionDecision::Retry {
                attempt: 3,
                delay_ms: 400
            }
        );
        assert_eq!(
            monitor.next_attempt(false),
            ReconnectionDecision::GiveUp { attempts: 3 }
        );
    }

    #[test]
    fn test_connack_resets_attempts() {
        let mut monitor = limited(1);
        monitor.next_attempt(false);
        assert_eq!(monitor.attempts(), 1);

        monitor.connected();
        assert_eq!(monitor.attempts(), 0);
        assert!(matches!(
            monitor.next_attempt(false),
            ReconnectionDecision::Retry { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_shutdown_wins_over_retry() {
        let mut monitor = LinkMonitor::default();
        assert_eq!(monitor.next_attempt(true), ReconnectionDecision::Shutdown);
        assert_eq!(monitor.attempts(), 0);
    }

    #[test]
    fn test_unlimited_attempts_never_give_up() {
        let mut monitor = LinkMonitor::default();
        for _ in 0..1_000 {
            assert!(matches!(
                monitor.next_attempt(false),
                ReconnectionDecision::Retry { .. }
            ));
        }
        assert_eq!(
            monitor.next_attempt(false),
            ReconnectionDecision::Retry {
                attempt: 1_001,
                delay_ms: 10_000
            }
        );
    }

    #[test]
    fn test_loss_reported_once_per_attempt() {
        let mut monitor = LinkMonitor::default();

        assert!(monitor.link_lost());
        assert!(!monitor.link_lost());

        monitor.retrying();
        assert!(monitor.link_lost());

        monitor.connected();
        assert!(monitor.link_lost());
    }
}
