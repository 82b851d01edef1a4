use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::DateTime;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

/// Format an ISO-8601 / RFC 3339 timestamp as `DD/MM/YYYY HH:MM`.
///
/// Returns `None` for anything that does not parse.
pub fn format_date(iso: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(iso).ok()?;
    Some(parsed.format("%d/%m/%Y %H:%M").to_string())
}

/// Collapses bursts of calls into a single delivery.
///
/// Each [`call`](Debouncer::call) aborts the previously scheduled delivery
/// and schedules a new one `wait` later, so only the last value inside a
/// quiet window reaches the channel. Nothing is returned to the caller.
pub struct Debouncer<T> {
    wait: Duration,
    tx: UnboundedSender<T>,
    scheduled: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn new(wait: Duration, tx: UnboundedSender<T>) -> Self {
        Self {
            wait,
            tx,
            scheduled: None,
        }
    }

    pub fn call(&mut self, value: T) {
        if let Some(handle) = self.scheduled.take() {
            handle.abort();
        }
        let tx = self.tx.clone();
        let wait = self.wait;
        self.scheduled = Some(tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            let _ = tx.send(value);
        }));
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.scheduled.take() {
            handle.abort();
        }
    }
}

/// Write `text` to the system clipboard through the platform helper.
///
/// Tries `pbcopy` (macOS), then `wl-copy` and `xclip` (Linux).
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let candidates: &[(&str, &[&str])] = &[
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];

    for (cmd, args) in candidates {
        let child = Command::new(cmd)
            .args(*args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        if let Ok(mut child) = child {
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(text.as_bytes())?;
            }
            let status = child.wait()?;
            if status.success() {
                return Ok(());
            }
        }
    }

    Err(anyhow!("no clipboard helper available"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn format_date_renders_display_format() {
        assert_eq!(
            format_date("2025-03-09T14:30:00Z").as_deref(),
            Some("09/03/2025 14:30")
        );
    }

    #[test]
    fn format_date_rejects_garbage() {
        assert_eq!(format_date("not a date"), None);
        assert_eq!(format_date(""), None);
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_delivers_only_last_call() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(100), tx);

        debouncer.call(1);
        tokio::time::advance(Duration::from_millis(50)).await;
        debouncer.call(2);
        tokio::time::advance(Duration::from_millis(50)).await;
        debouncer.call(3);
        tokio::time::advance(Duration::from_millis(150)).await;

        assert_eq!(rx.recv().await, Some(3));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn debounce_fires_again_after_quiet_window() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut debouncer = Debouncer::new(Duration::from_millis(100), tx);

        debouncer.call("first");
        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(rx.recv().await, Some("first"));

        debouncer.call("second");
        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(rx.recv().await, Some("second"));
    }
}
