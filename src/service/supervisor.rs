//! The supervising loop around a command handler.
//!
//! The handler's `start` runs on a worker task while the caller waits on
//! the service's exit channel. Once an exit code arrives the handler is
//! stopped on its own task and raced against the kill-timeout; if the
//! timer wins, `kill` runs while the stop may still be in flight.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::oneshot;

use crate::lifecycle::{Component, Context};
use crate::service::{ServiceHandle, EXIT_HANDLER_START_FAILED, EXIT_SERVICE_FAILURE};

/// How the handler's teardown ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// `stop` returned within the kill-timeout.
    Stopped,
    /// The kill-timeout elapsed first and `kill` was invoked.
    Killed,
}

/// Run `handler` as the main loop until an exit code is posted, then tear
/// it down. Returns the exit code.
pub async fn run_handler(
    service: &ServiceHandle,
    ctx: Context,
    handler: Arc<dyn Component>,
    kill_timeout: Duration,
) -> i32 {
    tracing::info!(action = "command_handler", status = "start");

    let worker = handler.clone();
    let worker_service = service.clone();
    tokio::spawn(async move {
        let err = match AssertUnwindSafe(worker.start(ctx)).catch_unwind().await {
            Ok(Ok(())) => return,
            Ok(Err(err)) => err.to_string(),
            Err(_) => "handler panicked during start".to_string(),
        };
        tracing::error!(
            action = "command_handler",
            status = "start_error",
            error = %err,
            "Error starting command handler"
        );
        worker_service.exit(EXIT_HANDLER_START_FAILED).await;
    });

    let code = service.wait_for_exit().await.unwrap_or(EXIT_SERVICE_FAILURE);
    tracing::info!(action = "command_handler", status = "done", exit_code = code);

    stop_with_timeout(handler, kill_timeout).await;
    code
}

/// Stop `handler`, escalating to `kill` if stop has not finished after
/// `kill_timeout`. Kill is invoked at most once.
pub async fn stop_with_timeout(handler: Arc<dyn Component>, kill_timeout: Duration) -> StopOutcome {
    let (done_tx, done_rx) = oneshot::channel::<()>();

    let stopper = handler.clone();
    tokio::spawn(async move {
        if let Err(err) = stopper.stop().await {
            tracing::error!(
                action = "command_handler",
                status = "stop_error",
                error = %err,
                "Error stopping command handler"
            );
        }
        // Completion is signalled by dropping or sending; either wakes the waiter.
        let _ = done_tx.send(());
    });

    tokio::select! {
        _ = done_rx => StopOutcome::Stopped,
        _ = tokio::time::sleep(kill_timeout) => {
            tracing::warn!(
                action = "command_handler",
                status = "stop_timeout",
                timeout_secs = kill_timeout.as_secs_f64(),
                "Ordered stop timed out, killing"
            );
            if let Err(err) = handler.kill().await {
                tracing::error!(
                    action = "command_handler",
                    status = "kill_error",
                    error = %err,
                    "Error killing command handler"
                );
            }
            StopOutcome::Killed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ComponentError;
    use crate::lifecycle::SimpleComponent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    fn counting(stop_delay: Option<Duration>, kills: Arc<AtomicUsize>) -> Arc<dyn Component> {
        Arc::new(
            SimpleComponent::new()
                .on_stop(move || async move {
                    match stop_delay {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => std::future::pending::<()>().await,
                    }
                    Ok(())
                })
                .on_kill(move || {
                    let kills = kills.clone();
                    async move {
                        kills.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                }),
        )
    }

    #[tokio::test]
    async fn test_prompt_stop_never_kills() {
        let kills = Arc::new(AtomicUsize::new(0));
        let handler = counting(Some(Duration::from_millis(10)), kills.clone());

        let outcome = stop_with_timeout(handler, Duration::from_secs(5)).await;
        assert_eq!(outcome, StopOutcome::Stopped);
        assert_eq!(kills.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_hung_stop_kills_once_after_timeout() {
        let kills = Arc::new(AtomicUsize::new(0));
        let handler = counting(None, kills.clone());
        let timeout = Duration::from_millis(150);

        let started = Instant::now();
        let outcome = stop_with_timeout(handler, timeout).await;
        assert_eq!(outcome, StopOutcome::Killed);
        assert!(started.elapsed() >= timeout);
        assert_eq!(kills.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stop_error_is_not_escalated() {
        let kills = Arc::new(AtomicUsize::new(0));
        let k = kills.clone();
        let handler: Arc<dyn Component> = Arc::new(
            SimpleComponent::new()
                .on_stop(|| async { Err(ComponentError::msg("stop failed")) })
                .on_kill(move || {
                    let k = k.clone();
                    async move {
                        k.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                })
        );

        let outcome = stop_with_timeout(handler, Duration::from_secs(5)).await;
        assert_eq!(outcome, StopOutcome::Stopped);
        assert_eq!(kills.load(Ordering::SeqCst), 0);
    }
}
