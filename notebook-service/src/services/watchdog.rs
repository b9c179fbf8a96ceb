//! Advisory session countdown.
//!
//! Mirrors the sign-in page countdown: a cooperative 1-second tick that warns
//! once shortly before the session lapses and forces a single sign-out at
//! expiry. The server-side guard stays the sole authority; this component
//! carries no security weight.

use std::time::Duration;

/// Warn when no more than this much lifetime remains.
pub const WARNING_WINDOW_MS: i64 = 30_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Active,
    WarningIssued,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogEvent {
    /// One-time warning that the session is about to expire.
    Warning,
    /// Forced sign-out; navigate to the sign-in view.
    SignOut { sign_in_url: String },
}

/// Countdown state machine: `Active -> WarningIssued -> Expired`.
///
/// The warning fires at most once per instance and the sign-out exactly once;
/// after expiry `tick` is inert.
#[derive(Debug)]
pub struct SessionWatchdog {
    expires_at_ms: i64,
    return_to: String,
    state: WatchdogState,
}

impl SessionWatchdog {
    pub fn new(expires_at_ms: i64, return_to: impl Into<String>) -> Self {
        Self {
            expires_at_ms,
            return_to: return_to.into(),
            state: WatchdogState::Active,
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == WatchdogState::Expired
    }

    /// Advance the countdown to `now_ms`.
    pub fn tick(&mut self, now_ms: i64) -> Option<WatchdogEvent> {
        if self.state == WatchdogState::Expired {
            return None;
        }

        let time_left = self.expires_at_ms - now_ms;

        if time_left <= 0 {
            self.state = WatchdogState::Expired;
            let sign_in_url = format!(
                "/login?expired=1&returnTo={}",
                urlencoding::encode(&self.return_to)
            );
            return Some(WatchdogEvent::SignOut { sign_in_url });
        }

        if time_left <= WARNING_WINDOW_MS && self.state == WatchdogState::Active {
            self.state = WatchdogState::WarningIssued;
            return Some(WatchdogEvent::Warning);
        }

        None
    }
}

/// Handle for a running watchdog task. Dropping it tears the tick loop down;
/// no tick fires after teardown.
pub struct WatchdogHandle {
    task: tokio::task::JoinHandle<()>,
}

impl WatchdogHandle {
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Run a watchdog on a 1-second tick, delivering events to `on_event`.
///
/// The loop stops by itself once the sign-out has been delivered.
pub fn spawn_watchdog<F>(
    expires_at_ms: i64,
    return_to: impl Into<String>,
    mut on_event: F,
) -> WatchdogHandle
where
    F: FnMut(WatchdogEvent) + Send + 'static,
{
    let mut watchdog = SessionWatchdog::new(expires_at_ms, return_to);

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        loop {
            interval.tick().await;
            let now_ms = chrono::Utc::now().timestamp_millis();
            if let Some(event) = watchdog.tick(now_ms) {
                on_event(event);
            }
            if watchdog.is_finished() {
                break;
            }
        }
    });

    WatchdogHandle { task }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warns_once_then_signs_out_once() {
        let mut watchdog = SessionWatchdog::new(31_000, "/notes");

        // Outside the warning window: nothing happens
        assert_eq!(watchdog.tick(0), None);
        assert_eq!(watchdog.state(), WatchdogState::Active);

        // Inside the window: exactly one warning
        assert_eq!(watchdog.tick(2_000), Some(WatchdogEvent::Warning));
        assert_eq!(watchdog.state(), WatchdogState::WarningIssued);
        assert_eq!(watchdog.tick(3_000), None);
        assert_eq!(watchdog.tick(30_000), None);

        // At expiry: exactly one sign-out carrying the expired flag
        match watchdog.tick(31_000) {
            Some(WatchdogEvent::SignOut { sign_in_url }) => {
                assert_eq!(sign_in_url, "/login?expired=1&returnTo=%2Fnotes");
            }
            other => panic!("expected sign-out, got {:?}", other),
        }
        assert!(watchdog.is_finished());

        // Inert afterwards
        assert_eq!(watchdog.tick(32_000), None);
        assert_eq!(watchdog.tick(100_000), None);
    }

    #[test]
    fn expiry_without_warning_window_skips_straight_to_sign_out() {
        let mut watchdog = SessionWatchdog::new(1_000, "/notes");

        // First tick already past expiry
        assert!(matches!(
            watchdog.tick(5_000),
            Some(WatchdogEvent::SignOut { .. })
        ));
        assert!(watchdog.is_finished());
    }

    #[test]
    fn boundary_instant_counts_as_expired() {
        let mut watchdog = SessionWatchdog::new(10_000, "/");

        assert!(matches!(
            watchdog.tick(10_000),
            Some(WatchdogEvent::SignOut { .. })
        ));
    }

    #[tokio::test]
    async fn runner_delivers_warning_and_sign_out_then_stops() {
        let (tx, rx) = std::sync::mpsc::channel();
        let expires_at_ms = chrono::Utc::now().timestamp_millis() + 1_500;

        let _handle = spawn_watchdog(expires_at_ms, "/notes", move |event| {
            let _ = tx.send(event);
        });

        tokio::time::sleep(Duration::from_millis(3_500)).await;

        let events: Vec<WatchdogEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], WatchdogEvent::Warning);
        assert!(matches!(events[1], WatchdogEvent::SignOut { .. }));
    }

    #[tokio::test]
    async fn teardown_stops_ticks() {
        let (tx, rx) = std::sync::mpsc::channel();
        let expires_at_ms = chrono::Utc::now().timestamp_millis() + 60_000;

        let handle = spawn_watchdog(expires_at_ms, "/notes", move |event| {
            let _ = tx.send(event);
        });
        handle.stop();

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert!(rx.try_iter().next().is_none());
    }
}
