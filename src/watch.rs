//! Live preview of a conversation document.
//!
//! Every saved edit re-renders the preview PNG with the typing bubble
//! showing; once the document has been quiet for the typing period the
//! preview is rendered once more without it. A document that reads its
//! script from `script_file` is reloaded when either file changes.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;

use crate::config::{load_conversation, Overrides};
use crate::export::{capture_png, CaptureSummary, OutputTarget};
use crate::raster::Rasterizer;
use crate::session::Studio;

pub struct LivePreview {
    document: PathBuf,
    script_path: Option<PathBuf>,
    overrides: Overrides,
    output: PathBuf,
    studio: Studio,
    raster: Rasterizer,
}

impl LivePreview {
    /// Loads the document and writes the first preview.
    pub fn open(
        document: &Path,
        overrides: Overrides,
        output: &Path,
        raster: Rasterizer,
    ) -> Result<Self> {
        let conversation = load_conversation(Some(document), &overrides)?;
        let script_path = conversation.script_path.clone();
        let studio = conversation.into_studio();
        let mut preview = Self {
            document: document.to_path_buf(),
            script_path,
            overrides,
            output: output.to_path_buf(),
            studio,
            raster,
        };
        preview.render()?;
        Ok(preview)
    }

    pub fn document(&self) -> &Path {
        &self.document
    }

    /// Script file the document currently reads from, if any.
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }

    /// Every file whose change should trigger a reload.
    pub fn watched_files(&self) -> Vec<&Path> {
        std::iter::once(self.document.as_path())
            .chain(self.script_path())
            .collect()
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn studio(&self) -> &Studio {
        &self.studio
    }

    /// Re-reads the document. A changed script counts as an edit. On error
    /// the previous state and preview stay in place.
    pub fn reload(&mut self, now: Instant) -> Result<bool> {
        let conversation = load_conversation(Some(&self.document), &self.overrides)?;
        let edited = conversation.script != self.studio.script();
        self.script_path = conversation.script_path;

        self.studio.set_sender(conversation.sender);
        self.studio.set_receiver(conversation.receiver);
        self.studio.set_platform(conversation.platform);
        self.studio.set_status(conversation.status);
        if edited {
            self.studio.set_script(conversation.script, now);
        }
        self.render()?;
        Ok(edited)
    }

    /// Fires the typing flip when due and re-renders if it changed.
    pub fn tick(&mut self, now: Instant) -> Result<bool> {
        if !self.studio.tick(now) {
            return Ok(false);
        }
        self.render()?;
        Ok(true)
    }

    fn render(&mut self) -> Result<CaptureSummary> {
        let summary = capture_png(
            &mut self.raster,
            &self.studio.surface(),
            &OutputTarget::File(self.output.clone()),
        )?;
        tracing::debug!(
            path = %summary.path.display(),
            typing = self.studio.is_typing(),
            messages = self.studio.messages().len(),
            "preview updated"
        );
        Ok(summary)
    }
}

#[cfg(feature = "watch")]
pub use watcher::run_watch;

#[cfg(feature = "watch")]
mod watcher {
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::{self, RecvTimeoutError};
    use std::time::{Duration, Instant};

    use anyhow::{Context, Result};
    use notify::{Event, EventKind, RecursiveMode, Watcher};

    use super::LivePreview;

    const IDLE_WAIT: Duration = Duration::from_secs(3600);

    /// Canonical files that trigger a reload and the directories watched
    /// for them.
    #[derive(Default)]
    struct WatchTargets {
        files: Vec<PathBuf>,
        dirs: Vec<PathBuf>,
    }

    impl WatchTargets {
        /// Follows the preview's current files, watching any new directory.
        fn refresh<W: Watcher>(&mut self, watcher: &mut W, preview: &LivePreview) -> Result<()> {
            self.files = preview
                .watched_files()
                .into_iter()
                .map(canonical_path)
                .collect();
            for file in &self.files {
                let dir = file
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                if self.dirs.contains(&dir) {
                    continue;
                }
                watcher
                    .watch(&dir, RecursiveMode::NonRecursive)
                    .with_context(|| format!("failed to watch {}", dir.display()))?;
                tracing::debug!(dir = %dir.display(), "watching directory");
                self.dirs.push(dir);
            }
            Ok(())
        }

        fn matches(&self, paths: &[PathBuf]) -> bool {
            if paths.is_empty() {
                return true;
            }
            paths.iter().any(|path| {
                self.files.iter().any(|file| {
                    path == file
                        || std::fs::canonicalize(path)
                            .map(|resolved| &resolved == file)
                            .unwrap_or(false)
                })
            })
        }
    }

    /// Blocks, re-rendering `preview` whenever its document or script file
    /// changes.
    pub fn run_watch(mut preview: LivePreview) -> Result<()> {
        let (watch_tx, watch_rx) = mpsc::channel::<Vec<PathBuf>>();
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<Event>| match result {
                Ok(event) => {
                    if should_reload(&event) {
                        let _ = watch_tx.send(event.paths);
                    }
                }
                Err(error) => tracing::warn!("file watcher error: {error}"),
            })
            .context("failed to create file watcher")?;
        let mut targets = WatchTargets::default();
        targets.refresh(&mut watcher, &preview)?;

        tracing::info!(
            document = %preview.document().display(),
            script_file = ?preview.script_path(),
            preview = %preview.output().display(),
            "watching for edits"
        );

        loop {
            let wait = preview
                .studio()
                .typing_deadline()
                .map(|deadline| deadline.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_WAIT);
            match watch_rx.recv_timeout(wait) {
                Ok(paths) => {
                    let mut relevant = targets.matches(&paths);
                    while let Ok(more) = watch_rx.try_recv() {
                        relevant |= targets.matches(&more);
                    }
                    if !relevant {
                        continue;
                    }
                    match preview.reload(Instant::now()) {
                        Ok(edited) => tracing::info!(edited, "reloaded document"),
                        Err(error) => tracing::warn!("reload failed: {error:#}"),
                    }
                    if let Err(error) = targets.refresh(&mut watcher, &preview) {
                        tracing::warn!("{error:#}");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    preview.tick(Instant::now())?;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        Ok(())
    }

    fn should_reload(event: &Event) -> bool {
        matches!(
            event.kind,
            EventKind::Modify(_) | EventKind::Create(_) | EventKind::Any
        )
    }

    fn canonical_path(path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }
}
