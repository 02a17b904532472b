//! Data directory watching.
//!
//! [`DataChangeWatcher`] observes one directory, non-recursively, and turns
//! file events into [`DataKind`] signals for an [`InvalidationSink`]. Files
//! are classified purely by name suffix; anything else is ignored.
//!
//! Events arrive from `notify` on its own thread and are forwarded over a
//! channel to a dispatch thread owned by the watcher, so a slow sink never
//! stalls the platform event loop.

use crate::errors::RendererError;
use crossbeam_channel::{select, unbounded, Receiver, Sender};
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, trace, warn};

/// Kind of on-disk data a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKind {
    MapData,
    BookmarkData,
}

/// A classified file event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: DataKind,
}

/// Receiver of data-change signals.
pub trait InvalidationSink: Send + Sync {
    fn data_changed(&self, kind: DataKind);
}

/// Maps file names to [`DataKind`] by suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileClassifier {
    map_extension: String,
    bookmark_extension: String,
}

impl Default for FileClassifier {
    /// `.mwm` map files and `.kml` bookmark files.
    fn default() -> Self {
        Self::new(".mwm", ".kml")
    }
}

impl FileClassifier {
    pub fn new(map_extension: &str, bookmark_extension: &str) -> Self {
        Self {
            map_extension: map_extension.to_owned(),
            bookmark_extension: bookmark_extension.to_owned(),
        }
    }

    /// Classify a path by its file name suffix. Case sensitive.
    pub fn classify(&self, path: &Path) -> Option<DataKind> {
        let name = path.file_name()?.to_str()?;
        if name.ends_with(&self.map_extension) {
            Some(DataKind::MapData)
        } else if name.ends_with(&self.bookmark_extension) {
            Some(DataKind::BookmarkData)
        } else {
            None
        }
    }

    /// Classified paths of a create, modify, delete or rename event.
    ///
    /// Metadata-only changes and access events yield nothing. A rename that
    /// reports both paths yields at most one event per kind.
    pub fn classify_event(&self, event: &Event) -> Vec<FileEvent> {
        let relevant = match event.kind {
            EventKind::Create(_) | EventKind::Remove(_) => true,
            EventKind::Modify(ModifyKind::Metadata(_)) => false,
            EventKind::Modify(_) => true,
            _ => false,
        };
        if !relevant {
            return Vec::new();
        }

        let mut classified: Vec<FileEvent> = Vec::new();
        for path in &event.paths {
            if let Some(kind) = self.classify(path) {
                if !classified.iter().any(|e| e.kind == kind) {
                    classified.push(FileEvent {
                        path: path.clone(),
                        kind,
                    });
                }
            }
        }
        classified
    }
}

/// Watches a directory for map and bookmark changes until dropped.
pub struct DataChangeWatcher {
    dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl DataChangeWatcher {
    /// Start watching `dir`, delivering classified events to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be watched or the dispatch
    /// thread cannot be spawned.
    pub fn start<S>(dir: impl Into<PathBuf>, classifier: FileClassifier, sink: Arc<S>) -> Result<Self, RendererError>
    where
        S: InvalidationSink + ?Sized + 'static,
    {
        let dir = dir.into();
        let (event_tx, event_rx) = unbounded();
        let (stop_tx, stop_rx) = unbounded();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            // The receiver is gone only while the watcher is shutting down.
            let _ = event_tx.send(result);
        })?;

        let thread = thread::Builder::new()
            .name("data-change-watcher".to_string())
            .spawn(move || dispatch_loop(&event_rx, &stop_rx, &classifier, sink.as_ref()))?;

        let mut this = Self {
            dir,
            watcher: None,
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        };

        // On failure `this` is dropped, which stops the dispatch thread.
        watcher.watch(&this.dir, RecursiveMode::NonRecursive)?;
        this.watcher = Some(watcher);
        info!(dir = %this.dir.display(), "watching data directory");
        Ok(this)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Drop for DataChangeWatcher {
    fn drop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.dir) {
                debug!(error = %e, "unwatch failed");
            }
        }
        // Disconnecting the stop channel ends the dispatch loop.
        self.stop_tx.take();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("data change dispatch thread panicked");
            }
        }
        debug!(dir = %self.dir.display(), "stopped watching data directory");
    }
}

fn dispatch_loop<S>(
    events: &Receiver<notify::Result<Event>>,
    stop: &Receiver<()>,
    classifier: &FileClassifier,
    sink: &S,
) where
    S: InvalidationSink + ?Sized,
{
    loop {
        select! {
            recv(events) -> message => match message {
                Ok(Ok(event)) => {
                    trace!(?event, "file event");
                    for classified in classifier.classify_event(&event) {
                        debug!(path = %classified.path.display(), kind = ?classified.kind, "data changed");
                        sink.data_changed(classified.kind);
                    }
                }
                Ok(Err(e)) => warn!(error = %e, "file watch error"),
                Err(_) => break,
            },
            recv(stop) -> _ => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind, RenameMode};
    use pretty_assertions::assert_eq;

    fn event(kind: EventKind, paths: &[&str]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(PathBuf::from(path)))
    }

    #[test]
    fn test_classify_by_suffix() {
        let classifier = FileClassifier::default();
        assert_eq!(classifier.classify(Path::new("/maps/World.mwm")), Some(DataKind::MapData));
        assert_eq!(
            classifier.classify(Path::new("/maps/bookmarks/trip.kml")),
            Some(DataKind::BookmarkData)
        );
        assert_eq!(classifier.classify(Path::new("/maps/World.mwm.tmp")), None);
        assert_eq!(classifier.classify(Path::new("/maps/settings.ini")), None);
        assert_eq!(classifier.classify(Path::new("/maps/WORLD.MWM")), None);
        assert_eq!(classifier.classify(Path::new("/")), None);
    }

    #[test]
    fn test_classify_custom_extensions() {
        let classifier = FileClassifier::new(".map", ".gpx");
        assert_eq!(classifier.classify(Path::new("a.map")), Some(DataKind::MapData));
        assert_eq!(classifier.classify(Path::new("a.gpx")), Some(DataKind::BookmarkData));
        assert_eq!(classifier.classify(Path::new("a.mwm")), None);
    }

    #[test]
    fn test_classify_event_kinds() {
        let classifier = FileClassifier::default();
        let map = vec![FileEvent {
            path: PathBuf::from("/maps/a.mwm"),
            kind: DataKind::MapData,
        }];

        let created = event(EventKind::Create(CreateKind::File), &["/maps/a.mwm"]);
        assert_eq!(classifier.classify_event(&created), map);

        let written = event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &["/maps/a.mwm"]);
        assert_eq!(classifier.classify_event(&written), map);

        let removed = event(EventKind::Remove(RemoveKind::File), &["/maps/a.mwm"]);
        assert_eq!(classifier.classify_event(&removed), map);

        let chmod = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &["/maps/a.mwm"],
        );
        assert!(classifier.classify_event(&chmod).is_empty());

        let ignored = event(EventKind::Create(CreateKind::File), &["/maps/notes.txt"]);
        assert!(classifier.classify_event(&ignored).is_empty());
    }

    #[test]
    fn test_classify_rename() {
        let classifier = FileClassifier::default();

        let download = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/maps/a.mwm.download", "/maps/a.mwm"],
        );
        let kinds: Vec<_> = classifier.classify_event(&download).iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![DataKind::MapData]);

        let same_kind = event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["/maps/old.kml", "/maps/new.kml"],
        );
        assert_eq!(classifier.classify_event(&same_kind).len(), 1);
    }
}
