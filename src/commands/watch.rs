//! Implementation of the `conduit watch` command.
//!
//! `watch` generates once, then watches the instructions tree, the IDE
//! templates and the config file. The config file is watched through its
//! directory so editors that save by renaming a new file over the old one
//! keep triggering. Bursts of file events are debounced into a single full
//! regeneration. The context is reloaded before every run so config edits
//! take effect without a restart.

use super::generate::print_report;
use crate::catalog::CatalogBuilder;
use crate::cli::WatchArgs;
use crate::context::ProjectContext;
use crate::error::{ConduitError, Result};
use crate::exit_codes;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, channel};
use std::time::Duration;
use tracing::{error, info, warn};

/// File extensions whose changes trigger regeneration.
const WATCHED_EXTENSIONS: &[&str] = &["md", "yml", "yaml"];

pub fn cmd_watch(config: Option<&Path>, args: WatchArgs) -> Result<i32> {
    let ctx = ProjectContext::resolve(config, None)?;
    let config_path = ctx.config_path.clone();
    let debounce = Duration::from_millis(args.debounce_ms);

    regenerate(&config_path);

    let (tx, rx) = channel();
    let mut watcher = RecommendedWatcher::new(tx, Config::default()).map_err(|e| {
        ConduitError::UserError(format!("failed to start file watcher: {}", e))
    })?;

    let filter = WatchFilter::new(&ctx);
    for (path, mode) in watch_targets(&ctx) {
        watcher.watch(&path, mode).map_err(|e| {
            ConduitError::UserError(format!("failed to watch '{}': {}", path.display(), e))
        })?;
        info!(path = %path.display(), "watching");
    }

    eprintln!("conduit watch started");
    eprintln!("  project:  {}", ctx.project_root.display());
    eprintln!("  config:   {}", config_path.display());
    eprintln!("  debounce: {}ms", args.debounce_ms);
    eprintln!();

    while wait_for_change(&rx, &filter, debounce) {
        regenerate(&config_path);
    }

    Ok(exit_codes::SUCCESS)
}

/// Paths to watch: instructions and templates recursively, the config
/// file's directory non-recursively.
fn watch_targets(ctx: &ProjectContext) -> Vec<(PathBuf, RecursiveMode)> {
    let mut targets = vec![(ctx.instructions_dir(), RecursiveMode::Recursive)];

    let templates = ctx.templates_dir();
    if templates.is_dir() {
        targets.push((templates, RecursiveMode::Recursive));
    }

    targets.push((ctx.config_dir.clone(), RecursiveMode::NonRecursive));
    targets
}

/// Reload the context and regenerate every command. Failures are logged, never fatal.
fn regenerate(config_path: &Path) {
    let ctx = match ProjectContext::load(config_path, None) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = %e, "failed to reload project context");
            return;
        }
    };

    match CatalogBuilder::new(&ctx).generate_all() {
        Ok(report) => print_report(&ctx, &report),
        Err(e) => error!(error = %e, "generation failed"),
    }
}

/// Decides which file events should trigger regeneration.
struct WatchFilter {
    config_dir: PathBuf,
    config_file: OsString,
    ledger: PathBuf,
}

impl WatchFilter {
    fn new(ctx: &ProjectContext) -> Self {
        Self::from_paths(&ctx.config_path, ctx.ledger_path())
    }

    fn from_paths(config_path: &Path, ledger_path: &Path) -> Self {
        let config_dir = config_path.parent().map(canonical).unwrap_or_default();
        let ledger = match (ledger_path.parent(), ledger_path.file_name()) {
            (Some(dir), Some(name)) => canonical(dir).join(name),
            _ => ledger_path.to_path_buf(),
        };
        Self {
            config_dir,
            config_file: config_path.file_name().map(OsString::from).unwrap_or_default(),
            ledger,
        }
    }

    /// Whether `event` is a content change to a file we generate from.
    fn is_relevant(&self, event: &Event) -> bool {
        let kind_matches = matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        );
        kind_matches && event.paths.iter().any(|path| self.is_relevant_path(path))
    }

    fn is_relevant_path(&self, path: &Path) -> bool {
        let in_config_dir = path.parent().is_some_and(|dir| canonical(dir) == self.config_dir);
        if in_config_dir {
            // Only the config file matters among the config directory's own entries.
            return path.file_name() == Some(self.config_file.as_os_str());
        }
        if path == self.ledger {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| WATCHED_EXTENSIONS.contains(&e))
    }
}

/// Canonical form of `path`, or `path` itself when it cannot be resolved.
fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Block until a relevant change arrives, then absorb the rest of the burst.
///
/// The burst ends once no relevant event arrives for `debounce`. Returns
/// `false` when the watcher has shut down.
fn wait_for_change(
    rx: &Receiver<notify::Result<Event>>,
    filter: &WatchFilter,
    debounce: Duration,
) -> bool {
    loop {
        match rx.recv() {
            Ok(Ok(event)) if filter.is_relevant(&event) => break,
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "watch error"),
            Err(_) => return false,
        }
    }

    loop {
        match rx.recv_timeout(debounce) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "watch error"),
            Err(RecvTimeoutError::Timeout) => return true,
            Err(RecvTimeoutError::Disconnected) => return true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind, RenameMode};
    use tempfile::TempDir;

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    fn modified(path: &Path) -> Event {
        event(EventKind::Modify(ModifyKind::Any), path)
    }

    /// Filter over `<tmp>/.conduit/config.yml` with the ledger beside it.
    fn filter() -> (TempDir, PathBuf, WatchFilter) {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(".conduit");
        fs::create_dir_all(config_dir.join("instructions/core")).unwrap();
        let config_dir = fs::canonicalize(config_dir).unwrap();
        let filter = WatchFilter::from_paths(
            &config_dir.join("config.yml"),
            &config_dir.join("MASTER_TRACKING.md"),
        );
        (temp, config_dir, filter)
    }

    #[test]
    fn test_relevant_events() {
        let (_temp, dir, filter) = filter();
        let plan = dir.join("instructions/core/plan.md");

        assert!(filter.is_relevant(&modified(&plan)));
        assert!(filter.is_relevant(&event(
            EventKind::Create(CreateKind::File),
            &dir.join("config.yml")
        )));
        assert!(!filter.is_relevant(&event(EventKind::Access(AccessKind::Any), &plan)));
        assert!(!filter.is_relevant(&modified(&dir.join("instructions/core/plan.md.swp"))));
    }

    #[test]
    fn test_config_replaced_by_rename_is_relevant() {
        let (_temp, dir, filter) = filter();

        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(dir.join(".config.yml.tmp"))
            .add_path(dir.join("config.yml"));
        assert!(filter.is_relevant(&rename));
    }

    #[test]
    fn test_other_config_dir_entries_are_ignored() {
        let (_temp, dir, filter) = filter();

        assert!(!filter.is_relevant(&modified(&dir.join("MASTER_TRACKING.md"))));
        assert!(!filter.is_relevant(&modified(&dir.join("notes.md"))));
        assert!(!filter.is_relevant(&modified(&dir.join(".config.yml.tmp"))));
    }

    #[test]
    fn test_ledger_outside_config_dir_is_ignored() {
        let temp = TempDir::new().unwrap();
        let root = fs::canonicalize(temp.path()).unwrap();
        let filter = WatchFilter::from_paths(
            &root.join(".conduit/config.yml"),
            &root.join("docs/TRACKING.md"),
        );

        assert!(!filter.is_relevant(&modified(&root.join("docs/TRACKING.md"))));
        assert!(filter.is_relevant(&modified(&root.join("docs/guide.md"))));
    }

    #[test]
    fn test_burst_collapses_into_one_change() {
        let (_temp, dir, filter) = filter();
        let (tx, rx) = channel();
        for name in ["a.md", "b.md", "c.md"] {
            tx.send(Ok(modified(&dir.join("instructions/core").join(name))))
                .unwrap();
        }

        assert!(wait_for_change(&rx, &filter, Duration::from_millis(20)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_irrelevant_events_are_skipped() {
        let (_temp, dir, filter) = filter();
        let (tx, rx) = channel();
        tx.send(Ok(event(
            EventKind::Access(AccessKind::Any),
            &dir.join("instructions/core/a.md"),
        )))
        .unwrap();
        tx.send(Ok(modified(&dir.join("MASTER_TRACKING.md")))).unwrap();
        drop(tx);

        assert!(!wait_for_change(&rx, &filter, Duration::from_millis(20)));
    }

    #[test]
    fn test_shutdown_after_change_still_regenerates() {
        let (_temp, dir, filter) = filter();
        let (tx, rx) = channel();
        tx.send(Ok(event(
            EventKind::Remove(RemoveKind::File),
            &dir.join("instructions/core/a.md"),
        )))
        .unwrap();
        drop(tx);

        assert!(wait_for_change(&rx, &filter, Duration::from_millis(20)));
        assert!(!wait_for_change(&rx, &filter, Duration::from_millis(20)));
    }
}
