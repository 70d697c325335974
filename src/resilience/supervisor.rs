//! Restart supervision for long-running tasks.
//!
//! # Responsibilities
//! - Restart a task each time it fails
//! - Count restarts in a sliding window and give up past the limit
//!
//! # State Transitions
//! ```text
//! Running → Err: record restart
//!     → within limit: wait `delay`, Running
//!     → over limit: RestartLimit, stop for good
//! Running → Ok / shutdown: stop
//! ```

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Default sliding window for counting restarts.
pub const DEFAULT_RESTART_WINDOW: Duration = Duration::from_secs(600);

/// Default restarts allowed inside one window.
pub const DEFAULT_MAX_RESTARTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub window: Duration,
    pub max_restarts: usize,
    /// Pause before each restart. Zero restarts immediately.
    pub delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_RESTART_WINDOW,
            max_restarts: DEFAULT_MAX_RESTARTS,
            delay: Duration::ZERO,
        }
    }
}

/// Restart timestamps inside the policy window.
#[derive(Debug)]
pub struct RestartWindow {
    policy: RestartPolicy,
    restarts: VecDeque<Instant>,
}

impl RestartWindow {
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            restarts: VecDeque::with_capacity(policy.max_restarts + 1),
        }
    }

    /// Record a failure at `now`. Returns whether another restart is allowed.
    pub fn record(&mut self, now: Instant) -> bool {
        while let Some(oldest) = self.restarts.front() {
            if now.saturating_duration_since(*oldest) > self.policy.window {
                self.restarts.pop_front();
            } else {
                break;
            }
        }
        self.restarts.push_back(now);
        self.restarts.len() <= self.policy.max_restarts
    }

    /// Restarts currently counted against the limit.
    pub fn len(&self) -> usize {
        self.restarts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.restarts.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("{task} failed {restarts} times within {window_secs}s, giving up: {last_error}")]
    RestartLimit {
        task: String,
        restarts: usize,
        window_secs: u64,
        last_error: String,
    },
}

/// Run `task` until it returns `Ok`, shutdown fires, or it fails too often.
pub async fn supervise<F, Fut, E>(
    name: &str,
    policy: RestartPolicy,
    mut shutdown: broadcast::Receiver<()>,
    mut task: F,
) -> Result<(), SupervisorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut window = RestartWindow::new(policy);

    loop {
        let result = tokio::select! {
            result = task() => result,
            _ = shutdown.recv() => {
                tracing::debug!(task = name, "Supervisor received shutdown signal");
                return Ok(());
            }
        };

        let error = match result {
            Ok(()) => {
                tracing::info!(task = name, "Supervised task finished");
                return Ok(());
            }
            Err(e) => e,
        };

        if !window.record(Instant::now()) {
            tracing::error!(
                task = name,
                restarts = window.len(),
                error = %error,
                "Restart limit reached, not restarting"
            );
            return Err(SupervisorError::RestartLimit {
                task: name.to_string(),
                restarts: window.len(),
                window_secs: policy.window.as_secs(),
                last_error: error.to_string(),
            });
        }

        tracing::warn!(task = name, restarts = window.len(), error = %error, "Supervised task failed, restarting");

        tokio::select! {
            _ = tokio::time::sleep(policy.delay) => {}
            _ = shutdown.recv() => return Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn policy() -> RestartPolicy {
        RestartPolicy {
            window: Duration::from_secs(600),
            max_restarts: 5,
            delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_default_policy_restarts_immediately() {
        let policy = RestartPolicy::default();
        assert_eq!(policy.delay, Duration::ZERO);
        assert_eq!(policy.window, Duration::from_secs(600));
        assert_eq!(policy.max_restarts, 5);
    }

    #[test]
    fn test_window_allows_up_to_limit() {
        let mut window = RestartWindow::new(policy());
        let now = Instant::now();
        for _ in 0..5 {
            assert!(window.record(now));
        }
        assert!(!window.record(now));
    }

    #[test]
    fn test_window_forgets_old_restarts() {
        let mut window = RestartWindow::new(policy());
        let start = Instant::now();
        for _ in 0..5 {
            assert!(window.record(start));
        }

        let later = start + Duration::from_secs(601);
        assert!(window.record(later));
        assert_eq!(window.len(), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_limit() {
        let (_tx, rx) = broadcast::channel(1);
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = attempts.clone();
        let result = supervise("metrics", policy(), rx, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("address in use")
            }
        })
        .await;

        // One initial run plus five restarts.
        assert_eq!(attempts.load(Ordering::SeqCst), 6);
        match result {
            Err(SupervisorError::RestartLimit { restarts, last_error, .. }) => {
                assert_eq!(restarts, 6);
                assert_eq!(last_error, "address in use");
            }
            other => panic!("expected restart limit, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let (_tx, rx) = broadcast::channel(1);
        let attempts = Arc::new(AtomicUsize::new(0));

        let counter = attempts.clone();
        let result = supervise("metrics", policy(), rx, move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("bind failed")
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_shutdown_stops_running_task() {
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(supervise("metrics", policy(), rx, || async {
            std::future::pending::<Result<(), String>>().await
        }));

        tx.send(()).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
