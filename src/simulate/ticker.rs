use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::GenerationRun;

/// How a driven run ended.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Reached 100% and waited out the settle delay.
    Completed(GenerationRun),
    /// Torn down before completion; holds the last published snapshot.
    Cancelled(GenerationRun),
}

impl Outcome {
    pub fn run(&self) -> &GenerationRun {
        match self {
            Outcome::Completed(r) | Outcome::Cancelled(r) => r,
        }
    }
}

/// Owner of a running simulation. Dropping it cancels the timer.
pub struct TickerHandle {
    token: CancellationToken,
    rx: watch::Receiver<GenerationRun>,
    join: Option<JoinHandle<Outcome>>,
}

impl TickerHandle {
    pub fn subscribe(&self) -> watch::Receiver<GenerationRun> {
        self.rx.clone()
    }

    pub fn snapshot(&self) -> GenerationRun {
        self.rx.borrow().clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the driver task to stop, either way.
    pub async fn finished(mut self) -> Outcome {
        let last = self.snapshot();
        match self.join.take() {
            Some(join) => join.await.unwrap_or(Outcome::Cancelled(last)),
            None => Outcome::Cancelled(last),
        }
    }
}

impl Drop for TickerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Start `run` and advance it every `period` on a tokio task. Once it
/// completes, the task lingers for `settle` before reporting completion.
pub fn spawn(mut run: GenerationRun, change_request: Option<String>, period: Duration, settle: Duration) -> TickerHandle {
    run.start(change_request);
    let (tx, rx) = watch::channel(run.clone());
    let token = CancellationToken::new();
    let task_token = token.clone();

    let join = tokio::spawn(async move {
        tracing::info!(run_id = run.run_id, ?period, "generation started");
        // first tick lands one period after start, like a browser interval
        let mut clock = interval_at(Instant::now() + period, period);
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = task_token.cancelled() => {
                    tracing::info!(run_id = run.run_id, progress = run.progress(), "generation cancelled");
                    return Outcome::Cancelled(run);
                }
                _ = clock.tick() => {
                    run.tick();
                    tracing::debug!(
                        run_id = run.run_id,
                        progress = run.progress(),
                        step = run.step_index,
                        lines = run.log.len(),
                        "tick"
                    );
                    tx.send_replace(run.clone());
                    if run.is_completed() {
                        break;
                    }
                }
            }
        }

        tokio::select! {
            biased;
            _ = task_token.cancelled() => Outcome::Cancelled(run),
            _ = tokio::time::sleep(settle) => {
                tracing::info!(run_id = run.run_id, ticks = run.ticks, "generation completed");
                Outcome::Completed(run)
            }
        }
    });

    TickerHandle { token, rx, join: Some(join) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::{Pace, RunState, INITIAL_LINE, SCRIPT};

    const PERIOD: Duration = Duration::from_millis(800);
    const SETTLE: Duration = Duration::from_millis(1000);

    #[tokio::test(start_paused = true)]
    async fn drives_run_to_completion() {
        let started = Instant::now();
        let handle = spawn(GenerationRun::new(5, Pace::Standard), None, PERIOD, SETTLE);
        assert_eq!(handle.snapshot().log, vec![INITIAL_LINE]);

        let outcome = handle.finished().await;
        let run = match outcome {
            Outcome::Completed(r) => r,
            Outcome::Cancelled(_) => panic!("run was cancelled"),
        };
        assert_eq!(run.state, RunState::Completed);
        assert_eq!(run.progress(), 100);
        assert_eq!(run.step_index, 3);
        assert_eq!(run.log.len(), 1 + SCRIPT.len());
        assert_eq!(run.ticks, 24);
        assert!(started.elapsed() >= PERIOD * 24 + SETTLE);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_all_mutation() {
        let handle = spawn(GenerationRun::new(5, Pace::Standard), None, PERIOD, SETTLE);
        let rx = handle.subscribe();

        tokio::time::sleep(PERIOD * 3 + Duration::from_millis(100)).await;
        handle.cancel();
        let frozen = handle.snapshot();
        assert_eq!(frozen.ticks, 3);
        assert!(frozen.progress() < 100);

        tokio::time::sleep(PERIOD * 40).await;
        assert_eq!(handle.snapshot(), frozen);
        assert_eq!(*rx.borrow(), frozen);

        let outcome = handle.finished().await;
        assert!(matches!(outcome, Outcome::Cancelled(_)));
        assert_eq!(outcome.run(), &frozen);
        assert_eq!(*rx.borrow(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels() {
        let handle = spawn(GenerationRun::new(5, Pace::Fast), None, PERIOD, SETTLE);
        let mut rx = handle.subscribe();
        tokio::time::sleep(PERIOD * 2 + Duration::from_millis(10)).await;
        let seen = rx.borrow_and_update().clone();
        drop(handle);

        tokio::time::sleep(PERIOD * 20).await;
        assert_eq!(*rx.borrow(), seen);
        assert!(rx.changed().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_settle_is_still_cancelled() {
        let handle = spawn(GenerationRun::new(5, Pace::Fast), None, PERIOD, SETTLE);
        // 14 ticks to completion, then cut the settle delay short
        tokio::time::sleep(PERIOD * 14 + Duration::from_millis(200)).await;
        assert!(handle.snapshot().is_completed());
        handle.cancel();
        assert!(matches!(handle.finished().await, Outcome::Cancelled(_)));
    }
}
