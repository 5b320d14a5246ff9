use std::time::Duration;

use sqlx::postgres::PgListener;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const POLL_INTERVAL_SECS: u64 = ytrag_core::DEFAULT_POLL_INTERVAL_SECS;

/// Wakes the worker loop on `pg_notify('task_queue', ...)`, falling back
/// to a fixed poll interval if the `LISTEN` connection drops or a notify
/// is simply missed (network blip, restart race).
///
/// Holds a dedicated connection outside the pool, bridged into an
/// in-process channel the worker loop can `select!` against alongside
/// its own shutdown signal.
pub struct TaskNotifier {
    rx: mpsc::Receiver<()>,
}

impl TaskNotifier {
    /// Spawns the background listener task and returns a handle whose
    /// `wait` resolves whenever a new task may be available — either a
    /// genuine notification or a poll tick.
    pub fn spawn(database_url: String) -> Self {
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            loop {
                match PgListener::connect(&database_url).await {
                    Ok(mut listener) => {
                        if let Err(e) = listener.listen("task_queue").await {
                            warn!(error = %e, "failed to LISTEN on task_queue, falling back to poll");
                        } else {
                            debug!("listening on task_queue channel");
                            loop {
                                tokio::select! {
                                    notification = listener.recv() => {
                                        match notification {
                                            Ok(_) => {
                                                if tx.send(()).await.is_err() {
                                                    return;
                                                }
                                            }
                                            Err(e) => {
                                                warn!(error = %e, "task_queue listener connection lost, reconnecting");
                                                break;
                                            }
                                        }
                                    }
                                    _ = tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)) => {
                                        if tx.send(()).await.is_err() {
                                            return;
                                        }
                                    }
                                }
                            }
                            continue;
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "could not connect listener, polling instead");
                    }
                }

                if tx.send(()).await.is_err() {
                    return;
                }
                tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;
            }
        });

        Self { rx }
    }

    pub async fn wait(&mut self) {
        self.rx.recv().await;
    }
}
