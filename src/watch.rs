use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use anyhow::Result;
use notify::{EventKind, RecursiveMode, Watcher};

use crate::dashboard;
use crate::manager::CostOptimizationManager;

/// Re-render the dashboard whenever a usage record file changes, with a
/// debounce so bursts of writes collapse into a single refresh.
pub fn run(
    manager: &CostOptimizationManager,
    records_dir: &Path,
    agent: Option<&str>,
    interval_secs: u64,
) -> Result<()> {
    let interval = Duration::from_secs(interval_secs);

    render(manager, agent)?;

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            match event.kind {
                EventKind::Create(_) | EventKind::Modify(_) => {
                    let _ = tx.send(());
                }
                _ => {}
            }
        }
    })?;

    if !records_dir.is_dir() {
        anyhow::bail!(
            "No usage records directory at {} to watch.",
            records_dir.display()
        );
    }
    watcher.watch(records_dir, RecursiveMode::NonRecursive)?;

    while let Ok(()) = rx.recv() {
        // Debounce: drain any additional events within the interval
        let deadline = Instant::now() + interval;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match rx.recv_timeout(remaining) {
                Ok(()) => continue,
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => return Ok(()),
            }
        }

        render(manager, agent)?;
    }

    Ok(())
}

fn render(manager: &CostOptimizationManager, agent: Option<&str>) -> Result<()> {
    // Clear screen and move cursor to top-left
    print!("\x1b[2J\x1b[H");
    std::io::stdout().flush()?;

    let metrics = manager.usage_dashboard(agent)?;
    print!("{}", dashboard::format_report(&metrics));
    std::io::stdout().flush()?;
    Ok(())
}
