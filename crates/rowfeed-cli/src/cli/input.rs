//! Configuration edits read from stdin.
//!
//! Stdin is read on a plain OS thread: a blocking read cannot be cancelled,
//! and a detached thread does not keep the process alive at exit.

use rowfeed::{ConfigEdit, DisplayController};
use std::io::BufRead;
use tokio::sync::mpsc;

/// Parses one input line.
///
/// Blank lines and lines starting with `#` yield `None`.
pub fn parse_line(line: &str) -> Option<rowfeed::Result<ConfigEdit>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(line.parse())
}

/// Spawns the stdin reader thread and returns the receiving end of its
/// lines. The channel closes at EOF.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Applies every edit received on `lines` until the channel closes.
pub async fn apply_edits(mut lines: mpsc::Receiver<String>, controller: DisplayController) {
    while let Some(line) = lines.recv().await {
        match parse_line(&line) {
            Some(Ok(edit)) => {
                tracing::debug!("Applying edit: {edit:?}");
                controller.apply_edit(edit);
            }
            Some(Err(e)) => tracing::warn!("Ignoring input {line:?}: {e}"),
            None => {}
        }
    }
    tracing::debug!("Stdin closed, no more edits");
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowfeed::DisplayConfig;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
        assert!(parse_line("# size=5").is_none());
    }

    #[test]
    fn edits_and_errors_are_reported() {
        assert_eq!(
            parse_line(" size=5 ").unwrap().unwrap(),
            ConfigEdit::ArraySize(5)
        );
        assert!(parse_line("size=five").unwrap().is_err());
    }

    #[tokio::test]
    async fn applies_edits_until_channel_closes() {
        let controller = DisplayController::start(DisplayConfig::default());
        let (tx, rx) = mpsc::channel(4);
        for line in ["interval=20", "bogus", "", "ids=4,5"] {
            tx.send(line.to_string()).await.unwrap();
        }
        drop(tx);

        apply_edits(rx, controller.clone()).await;
        let config = controller.config();
        assert_eq!(config.interval, 20);
        assert_eq!(config.additional_ids, "4,5");
        controller.shutdown().await;
    }
}
