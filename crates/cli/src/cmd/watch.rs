//! Watch command
//!
//! Runs one watch session and prints what it reports until Ctrl-C, the
//! timeout, or the session stopping on its own.

use anyhow::{Context, Result};
use dirwatch::{
    EventTranslator, KindSet, LogicalKind, PathSource, Reconciler, SessionState, StopReason, WatchEvent,
    WatchHandle, WatchRequest, Watcher,
};
use dirwatch_cli::Config;
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{debug, info, warn};

/// Flags for `dw watch`
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub dir: String,
    pub events: Option<String>,
    pub json: bool,
    pub rescan: bool,
    pub timeout: Option<Duration>,
}

/// One line of output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Line {
    Event { path: PathBuf, kind: LogicalKind },
    Overflow { path: PathBuf, token: Option<String> },
    Reconciled { path: PathBuf, kind: LogicalKind },
}

/// `file:` arguments are URIs, anything else is path text
fn path_source(arg: &str) -> PathSource {
    let is_uri = arg
        .split_once(':')
        .map(|(scheme, _)| scheme.eq_ignore_ascii_case("file"))
        .unwrap_or(false);
    if is_uri {
        PathSource::Uri(arg.to_string())
    } else {
        PathSource::Text(arg.to_string())
    }
}

pub async fn run(options: WatchOptions, config: &Config) -> Result<()> {
    let kinds = match &options.events {
        Some(list) => list.parse::<KindSet>().context("Invalid --events")?,
        None => config.kinds(),
    };
    let rescan = options.rescan && config.watch.rescan_on_overflow;

    let watcher = Watcher::system();
    let dir = watcher
        .context()
        .resolve_dir(&path_source(&options.dir))
        .map_err(dirwatch::WatchError::from)?;

    // Snapshot before registering so nothing falls between the two
    let reconciler = if rescan {
        Some(Arc::new(Mutex::new(Reconciler::new(&dir)?)))
    } else {
        None
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Line>();
    let request = build_request(&dir, kinds, config.watch.daemon, tx, reconciler);
    let handle = watcher.start(request)?;
    let _cancel = CancelOnDrop(handle.clone());

    info!("Watching {} for {} via {}", dir.display(), kinds, watcher.backend_name());
    if !options.json {
        eprintln!(
            "{} {} {}",
            "Watching".green().bold(),
            dir.display(),
            format!("({})", kinds).dimmed()
        );
    }

    let printer = Printer {
        dir: dir.clone(),
        json: options.json,
    };

    let timeout = async {
        match options.timeout {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(timeout);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let waiter = handle.clone();
    let stopped = tokio::task::spawn_blocking(move || waiter.wait());
    tokio::pin!(stopped);

    loop {
        tokio::select! {
            Some(line) = rx.recv() => printer.print(&line)?,
            res = &mut ctrl_c => {
                res.context("Failed to listen for Ctrl-C")?;
                debug!("Interrupted");
                break;
            }
            _ = &mut timeout => {
                debug!("Timeout reached");
                break;
            }
            _ = &mut stopped => break,
        }
    }

    handle.cancel();
    while let Ok(line) = rx.try_recv() {
        printer.print(&line)?;
    }

    match handle.state() {
        SessionState::Stopped(StopReason::Failed(message)) => {
            anyhow::bail!("Watch on {} failed: {}", dir.display(), message)
        }
        SessionState::Stopped(StopReason::DirectoryRemoved) => {
            warn!("Watched directory {} was removed", dir.display());
            if !options.json {
                eprintln!("{} {}", "Directory removed:".yellow(), dir.display());
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Wire the callbacks to the output channel and the optional reconciler
fn build_request(
    dir: &Path,
    kinds: KindSet,
    daemon: bool,
    tx: UnboundedSender<Line>,
    reconciler: Option<Arc<Mutex<Reconciler>>>,
) -> WatchRequest {
    let event_tx = tx.clone();
    let event_reconciler = reconciler.clone();

    // Keeps the snapshot current for kinds that were not requested
    let all_kinds = EventTranslator::new(KindSet::all());

    WatchRequest::new(dir, kinds, move |path, kind| {
        if let Some(reconciler) = &event_reconciler {
            reconciler.lock().observe(path, kind);
        }
        let _ = event_tx.send(Line::Event {
            path: path.to_path_buf(),
            kind,
        });
    })
    .on_overflow(move |path, token| {
        let _ = tx.send(Line::Overflow {
            path: path.to_path_buf(),
            token: token.map(|t| t.to_string()),
        });

        let Some(reconciler) = &reconciler else {
            return;
        };
        let mut reconciler = reconciler.lock();
        match token {
            None => match reconciler.reconcile() {
                Ok(events) => {
                    for WatchEvent { path, kind } in events {
                        if kinds.contains(kind) {
                            let _ = tx.send(Line::Reconciled { path, kind });
                        }
                    }
                }
                Err(e) => warn!("Rescan after overflow failed: {}", e),
            },
            Some(token) => {
                if let Some(kind) = all_kinds.to_logical(token) {
                    reconciler.observe(path, kind);
                }
            }
        }
    })
    .on_error(|err| warn!("Watch stopped: {}", err))
    .daemon(daemon)
}

/// Cancels the session on every exit path, so the blocking waiter ends
struct CancelOnDrop(WatchHandle);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

struct Printer {
    dir: PathBuf,
    json: bool,
}

impl Printer {
    fn print(&self, line: &Line) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(line)?);
            return Ok(());
        }

        match line {
            Line::Event { path, kind } => println!("{} {}", colored_kind(*kind), self.relative(path)),
            Line::Overflow { path, token } => match token {
                Some(token) => println!(
                    "{} {} {}",
                    "ignored".dimmed(),
                    self.relative(path),
                    format!("({})", token).dimmed()
                ),
                None => println!("{} {}", "overflow".magenta().bold(), "events were lost".dimmed()),
            },
            Line::Reconciled { path, kind } => println!(
                "{} {} {}",
                colored_kind(*kind),
                self.relative(path),
                "(rescan)".dimmed()
            ),
        }
        Ok(())
    }

    fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.dir).unwrap_or(path).display().to_string()
    }
}

fn colored_kind(kind: LogicalKind) -> String {
    let label = format!("{:<6}", kind.as_str());
    match kind {
        LogicalKind::Create => label.green().to_string(),
        LogicalKind::Modify => label.yellow().to_string(),
        LogicalKind::Delete => label.red().to_string(),
    }
}
