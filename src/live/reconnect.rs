//! Connection state machine with bounded fixed-delay reconnection.
//!
//! Disconnected → Connecting → Connected, with Backoff(n) between failed
//! attempts. After `max_attempts` consecutive failures the machine returns
//! to Disconnected and stays there until asked to connect again.

use std::time::Duration;

use serde::Serialize;

use crate::config::ReconnectPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "attempt", rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting before retry attempt `n` (1-based).
    Backoff(u32),
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Backoff(n) => write!(f, "backoff({n})"),
        }
    }
}

/// Inputs to the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Owner asked to connect.
    Connect,
    /// Socket handshake succeeded.
    Opened,
    /// Handshake failed.
    Failed,
    /// An open socket closed without being asked to.
    Dropped,
    /// Backoff delay elapsed.
    RetryElapsed,
    /// Owner asked to close.
    CloseRequested,
}

/// What the driver should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Nothing to do.
    Idle,
    /// Open a socket now.
    Open,
    /// Sleep, then feed `RetryElapsed`.
    Wait(Duration),
    /// Retries exhausted.
    GiveUp,
    /// Close any open socket.
    Close,
}

/// The reconnect state machine.
#[derive(Debug, Clone)]
pub struct Reconnector {
    policy: ReconnectPolicy,
    state: ConnectionState,
    attempts: u32,
}

impl Reconnector {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            state: ConnectionState::Disconnected,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Consecutive failed attempts since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Apply an event and return what the driver must do next.
    pub fn handle(&mut self, event: ConnectionEvent) -> Directive {
        use ConnectionEvent::*;
        use ConnectionState::*;

        match (self.state, event) {
            (_, CloseRequested) => {
                self.state = Disconnected;
                self.attempts = 0;
                Directive::Close
            }
            (Disconnected, Connect) => {
                self.state = Connecting;
                self.attempts = 0;
                Directive::Open
            }
            (Connecting, Opened) => {
                self.state = Connected;
                self.attempts = 0;
                Directive::Idle
            }
            (Connecting, Failed) | (Connected, Dropped) => self.schedule_retry(),
            (Backoff(_), RetryElapsed) => {
                self.state = Connecting;
                Directive::Open
            }
            _ => Directive::Idle,
        }
    }

    fn schedule_retry(&mut self) -> Directive {
        if self.attempts >= self.policy.max_attempts {
            self.state = ConnectionState::Disconnected;
            return Directive::GiveUp;
        }
        self.attempts += 1;
        self.state = ConnectionState::Backoff(self.attempts);
        Directive::Wait(self.policy.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ConnectionEvent::*;

    fn machine(max_attempts: u32) -> Reconnector {
        Reconnector::new(ReconnectPolicy {
            max_attempts,
            delay: Duration::from_millis(10),
        })
    }

    #[test]
    fn connect_then_open() {
        let mut m = machine(5);
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(m.handle(Connect), Directive::Open);
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert_eq!(m.handle(Opened), Directive::Idle);
        assert!(m.state().is_connected());
    }

    #[test]
    fn drop_schedules_backoff() {
        let mut m = machine(5);
        m.handle(Connect);
        m.handle(Opened);
        assert_eq!(m.handle(Dropped), Directive::Wait(Duration::from_millis(10)));
        assert_eq!(m.state(), ConnectionState::Backoff(1));
        assert_eq!(m.handle(RetryElapsed), Directive::Open);
        assert_eq!(m.state(), ConnectionState::Connecting);
    }

    #[test]
    fn gives_up_after_max_attempts() {
        let mut m = machine(3);
        m.handle(Connect);
        for n in 1..=3 {
            assert!(matches!(m.handle(Failed), Directive::Wait(_)));
            assert_eq!(m.state(), ConnectionState::Backoff(n));
            assert_eq!(m.handle(RetryElapsed), Directive::Open);
        }
        assert_eq!(m.handle(Failed), Directive::GiveUp);
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(m.attempts(), 3);
    }

    #[test]
    fn successful_open_resets_attempts() {
        let mut m = machine(2);
        m.handle(Connect);
        m.handle(Failed);
        m.handle(RetryElapsed);
        m.handle(Failed);
        m.handle(RetryElapsed);
        assert_eq!(m.attempts(), 2);
        m.handle(Opened);
        assert_eq!(m.attempts(), 0);
        // A fresh budget after reconnecting.
        assert!(matches!(m.handle(Dropped), Directive::Wait(_)));
        assert_eq!(m.state(), ConnectionState::Backoff(1));
    }

    #[test]
    fn explicit_close_never_retries() {
        let mut m = machine(5);
        m.handle(Connect);
        m.handle(Opened);
        assert_eq!(m.handle(CloseRequested), Directive::Close);
        assert_eq!(m.state(), ConnectionState::Disconnected);
        assert_eq!(m.handle(Dropped), Directive::Idle);
        assert_eq!(m.handle(RetryElapsed), Directive::Idle);
    }

    #[test]
    fn close_during_backoff_cancels_retry() {
        let mut m = machine(5);
        m.handle(Connect);
        m.handle(Failed);
        m.handle(CloseRequested);
        assert_eq!(m.handle(RetryElapsed), Directive::Idle);
        assert_eq!(m.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn zero_attempts_gives_up_immediately() {
        let mut m = machine(0);
        m.handle(Connect);
        assert_eq!(m.handle(Failed), Directive::GiveUp);
    }

    #[test]
    fn stray_events_are_ignored() {
        let mut m = machine(5);
        assert_eq!(m.handle(Opened), Directive::Idle);
        assert_eq!(m.handle(Failed), Directive::Idle);
        assert_eq!(m.state(), ConnectionState::Disconnected);
        m.handle(Connect);
        assert_eq!(m.handle(Connect), Directive::Idle);
    }

    #[test]
    fn display() {
        assert_eq!(ConnectionState::Backoff(2).to_string(), "backoff(2)");
        assert_eq!(ConnectionState::Connected.to_string(), "connected");
    }
}
