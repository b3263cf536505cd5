//! Progress display for plugin runs
//!
//! Consumes the engine's progress side channel and renders an indicatif bar
//! per download batch. Display is automatically suppressed when stderr is
//! not a terminal, so piped or scheduled runs stay clean.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::engine::{ProgressEvent, ProgressReceiver};

/// Whether a progress bar should be rendered at all
pub fn progress_enabled(disable_flag: bool) -> bool {
    !disable_flag && atty::is(atty::Stream::Stderr)
}

/// Background consumer of engine progress events
pub struct ProgressDisplay {
    handle: JoinHandle<()>,
}

impl ProgressDisplay {
    /// Spawn the display over a progress receiver
    ///
    /// With `enabled` false the events are still drained (the channel must
    /// not back up) but nothing is rendered.
    pub fn spawn(mut receiver: ProgressReceiver, enabled: bool) -> Self {
        let handle = tokio::spawn(async move {
            let mut bar: Option<ProgressBar> = None;

            while let Some(event) = receiver.recv().await {
                match event {
                    ProgressEvent::Started {
                        total,
                        description,
                        unit,
                    } => {
                        let next = if enabled {
                            let next = ProgressBar::new(total as u64);
                            next.set_style(bar_style(&unit));
                            next.set_message(description);
                            next
                        } else {
                            ProgressBar::hidden()
                        };
                        if let Some(old) = bar.replace(next) {
                            old.finish_and_clear();
                        }
                    }
                    ProgressEvent::ItemFinished {
                        name,
                        completed,
                        total,
                        succeeded,
                    } => {
                        debug!(
                            "{}/{} finished: {} ({})",
                            completed,
                            total,
                            name,
                            if succeeded { "ok" } else { "failed" }
                        );
                        if let Some(bar) = &bar {
                            bar.set_position(completed as u64);
                        }
                    }
                    ProgressEvent::Finished { succeeded, failed } => {
                        if let Some(bar) = bar.take() {
                            bar.finish_with_message(format!(
                                "{succeeded} succeeded, {failed} failed"
                            ));
                        }
                    }
                }
            }

            if let Some(bar) = bar.take() {
                bar.finish_and_clear();
            }
        });

        Self { handle }
    }

    /// Wait for the sender side to close and the display to drain
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

fn bar_style(unit: &str) -> ProgressStyle {
    ProgressStyle::with_template(&format!(
        "{{msg}} [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {unit} ({{elapsed}} elapsed, eta {{eta}})"
    ))
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("##-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::engine::progress_channel;

    #[tokio::test]
    async fn test_display_drains_without_rendering() {
        let (tx, rx) = progress_channel();
        let display = ProgressDisplay::spawn(rx, false);

        tx.send(ProgressEvent::Started {
            total: 2,
            description: "downloading".to_string(),
            unit: "item".to_string(),
        })
        .await
        .unwrap();
        tx.send(ProgressEvent::ItemFinished {
            name: "One".to_string(),
            completed: 1,
            total: 2,
            succeeded: true,
        })
        .await
        .unwrap();
        tx.send(ProgressEvent::Finished {
            succeeded: 1,
            failed: 1,
        })
        .await
        .unwrap();
        drop(tx);

        display.join().await;
    }

    #[test]
    fn test_progress_enabled_respects_flag() {
        assert!(!progress_enabled(true));
    }
}
