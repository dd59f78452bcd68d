//! Config file watcher for hot reload.
//!
//! The parent directory is watched, not the file, so a save that replaces the
//! file by rename still reloads. Each burst of events from one save produces a
//! single reload once it goes quiet.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::time;

use crate::config::loader::load_config;
use crate::config::schema::GatekeeperConfig;

/// Quiet period before a burst of file events triggers a reload.
pub const RELOAD_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatekeeperConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver that gets every successfully reloaded config.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatekeeperConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. Must be called inside a Tokio runtime; the returned
    /// handle must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self.path.file_name().map(OsString::from);
        let dir = watch_dir(&self.path);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches_file(&event, file_name.as_deref()) => {
                    let _ = event_tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default(),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tokio::spawn(reload_after_quiet(
            self.path.clone(),
            event_rx,
            self.update_tx,
            RELOAD_DEBOUNCE,
        ));

        tracing::info!(path = ?self.path, dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Whether `event` writes or recreates the watched file.
fn touches_file(event: &Event, file_name: Option<&OsStr>) -> bool {
    if !(event.kind.is_modify() || event.kind.is_create()) {
        return false;
    }
    event
        .paths
        .iter()
        .any(|p| p.file_name().is_some() && p.file_name() == file_name)
}

/// Reload once per burst of events, after `quiet` passes with no new event.
///
/// Exits when the event sender (the notify watcher) is dropped or nobody is
/// listening for updates any more.
async fn reload_after_quiet(
    path: PathBuf,
    mut events: mpsc::UnboundedReceiver<()>,
    updates: mpsc::UnboundedSender<GatekeeperConfig>,
    quiet: Duration,
) {
    while events.recv().await.is_some() {
        loop {
            match time::timeout(quiet, events.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        tracing::info!(path = ?path, "Config file changed, reloading");
        match load_config(&path) {
            Ok(config) => {
                if updates.send(config).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
            }
        }
    }
}
