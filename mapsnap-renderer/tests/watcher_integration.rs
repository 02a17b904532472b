//! Watcher tests on a real temporary directory.
//!
//! Filesystem notifications are asynchronous, so these tests poll with a
//! deadline instead of asserting immediately.

use mapsnap_renderer::{DataChangeWatcher, DataKind, FileClassifier, InvalidationSink};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const DEADLINE: Duration = Duration::from_secs(10);

#[derive(Default)]
struct RecordingSink {
    kinds: Mutex<Vec<DataKind>>,
}

impl RecordingSink {
    fn snapshot(&self) -> Vec<DataKind> {
        self.kinds.lock().clone()
    }

    fn wait_for(&self, kind: DataKind) -> Vec<DataKind> {
        let start = Instant::now();
        loop {
            let kinds = self.snapshot();
            if kinds.contains(&kind) {
                return kinds;
            }
            assert!(start.elapsed() < DEADLINE, "no {kind:?} event within {DEADLINE:?}, got {kinds:?}");
            thread::sleep(Duration::from_millis(20));
        }
    }
}

impl InvalidationSink for RecordingSink {
    fn data_changed(&self, kind: DataKind) {
        self.kinds.lock().push(kind);
    }
}

#[test]
fn test_watcher_classifies_directory_events() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let _watcher = DataChangeWatcher::start(dir.path(), FileClassifier::default(), Arc::clone(&sink)).unwrap();

    std::fs::write(dir.path().join("World.mwm"), b"map").unwrap();
    let kinds = sink.wait_for(DataKind::MapData);
    assert!(kinds.iter().all(|k| *k == DataKind::MapData));

    // Events are delivered in order, so once the bookmark shows up the
    // unrelated file has been seen and ignored.
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
    std::fs::write(dir.path().join("trip.kml"), b"<kml/>").unwrap();
    let kinds = sink.wait_for(DataKind::BookmarkData);
    let first_bookmark = kinds.iter().position(|k| *k == DataKind::BookmarkData).unwrap();
    assert!(kinds[..first_bookmark].iter().all(|k| *k == DataKind::MapData));

    std::fs::remove_file(dir.path().join("World.mwm")).unwrap();
    let start = Instant::now();
    while sink.snapshot()[first_bookmark..].iter().all(|k| *k == DataKind::BookmarkData) {
        assert!(start.elapsed() < DEADLINE, "removal not reported");
        thread::sleep(Duration::from_millis(20));
    }
}

#[test]
fn test_dropped_watcher_stops_delivering() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(RecordingSink::default());
    let watcher = DataChangeWatcher::start(dir.path(), FileClassifier::default(), Arc::clone(&sink)).unwrap();
    assert_eq!(watcher.dir(), dir.path());

    std::fs::write(dir.path().join("a.kml"), b"<kml/>").unwrap();
    sink.wait_for(DataKind::BookmarkData);

    drop(watcher);
    let seen = sink.snapshot().len();
    std::fs::write(dir.path().join("b.mwm"), b"map").unwrap();
    thread::sleep(Duration::from_millis(300));
    assert_eq!(sink.snapshot().len(), seen);
}

#[test]
fn test_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing");
    let sink = Arc::new(RecordingSink::default());
    assert!(DataChangeWatcher::start(missing, FileClassifier::default(), sink).is_err());
}
