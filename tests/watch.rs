extern crate kiln;
extern crate tempfile;

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use kiln::watch::{WatchEvent, Watcher, WatcherParams};

type Events = Arc<Mutex<Vec<(PathBuf, WatchEvent)>>>;

fn recording_scope(watcher: &Watcher) -> (kiln::watch::WatchScope, Events) {
    let events: Events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let scope = watcher.scope(move |path, event| {
        sink.lock().unwrap().push((path.to_owned(), event));
    });
    (scope, events)
}

fn write(path: &Path, contents: &[u8]) {
    File::create(path).unwrap().write_all(contents).unwrap();
}

// Modification timestamps need to move strictly forward between writes for a
// scan to notice anything; on coarse-grained filesystems back-to-back writes
// can share one.
fn touch(path: &Path, contents: &[u8]) {
    thread::sleep(Duration::from_millis(20));
    write(path, contents);
}

#[test]
fn first_scan_only_records_the_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    write(&file, b"created well before the watch");

    let watcher = Watcher::new(WatcherParams::default());
    let (scope, events) = recording_scope(&watcher);
    scope.watch(&file);

    // The file's timestamp differs from the stored zero baseline, but the
    // first scan must stay silent.
    watcher.poll();
    assert!(events.lock().unwrap().is_empty());

    watcher.poll();
    assert!(events.lock().unwrap().is_empty());

    touch(&file, b"edited");
    watcher.poll();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], (file, WatchEvent::Changed));
}

#[test]
fn unchanged_files_stay_silent() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    write(&file, b"stable");

    let watcher = Watcher::new(WatcherParams::default());
    let (scope, events) = recording_scope(&watcher);
    scope.watch(&file);

    for _ in 0..5 {
        watcher.poll();
    }

    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn rewatching_keeps_the_baseline() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    write(&file, b"v1");

    let watcher = Watcher::new(WatcherParams::default());
    let (scope, events) = recording_scope(&watcher);

    scope.watch(&file);
    watcher.poll();

    // Re-registering must not reset the observed timestamp, so the next
    // edit still fires.
    scope.watch(&file);
    touch(&file, b"v2");
    watcher.poll();

    assert_eq!(events.lock().unwrap().len(), 1);
}

#[test]
fn deletion_fires_removed_once() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    write(&file, b"doomed");

    let watcher = Watcher::new(WatcherParams::default());
    let (scope, events) = recording_scope(&watcher);
    scope.watch(&file);
    watcher.poll();

    ::std::fs::remove_file(&file).unwrap();
    watcher.poll();
    watcher.poll();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0], (file, WatchEvent::Removed));
    assert!(scope.is_empty());
}

#[test]
fn forgotten_files_fire_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    write(&file, b"v1");

    let watcher = Watcher::new(WatcherParams::default());
    let (scope, events) = recording_scope(&watcher);

    scope.watch(&file);
    watcher.poll();
    scope.forget(&file);

    touch(&file, b"v2");
    watcher.poll();

    assert!(events.lock().unwrap().is_empty());
    assert!(scope.is_empty());

    // Forgetting an unknown path is a no-op.
    scope.forget(dir.path().join("never-watched.txt"));
}

#[test]
fn scopes_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    write(&a, b"v1");
    write(&b, b"v1");

    let watcher = Watcher::new(WatcherParams::default());
    let (scope_a, events_a) = recording_scope(&watcher);
    let (scope_b, events_b) = recording_scope(&watcher);
    scope_a.watch(&a);
    scope_b.watch(&b);
    watcher.poll();

    touch(&a, b"v2");
    watcher.poll();

    assert_eq!(events_a.lock().unwrap().len(), 1);
    assert!(events_b.lock().unwrap().is_empty());
}

#[test]
fn dropped_scopes_stop_firing() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    write(&file, b"v1");

    let watcher = Watcher::new(WatcherParams::default());
    let (scope, events) = recording_scope(&watcher);
    scope.watch(&file);
    watcher.poll();

    drop(scope);
    touch(&file, b"v2");
    watcher.poll();

    assert!(events.lock().unwrap().is_empty());
}

#[test]
fn background_thread_delivers_changes() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("a.txt");
    write(&file, b"v1");

    let mut watcher = Watcher::new(WatcherParams {
        interval: Duration::from_millis(25),
    });
    let (scope, events) = recording_scope(&watcher);
    scope.watch(&file);

    watcher.start().unwrap();
    assert!(watcher.is_running());
    assert!(watcher.start().is_err());

    // Give the poller a tick to capture the baseline, then edit.
    thread::sleep(Duration::from_millis(100));
    write(&file, b"v2");

    let deadline = ::std::time::Instant::now() + Duration::from_secs(5);
    loop {
        if !events.lock().unwrap().is_empty() {
            break;
        }
        assert!(::std::time::Instant::now() < deadline, "no change delivered");
        thread::sleep(Duration::from_millis(10));
    }

    watcher.stop();
    assert!(!watcher.is_running());

    // Stopped pollers deliver nothing further.
    let seen = events.lock().unwrap().len();
    write(&file, b"v3");
    thread::sleep(Duration::from_millis(100));
    assert_eq!(events.lock().unwrap().len(), seen);

    // And a stopped watcher may be started again.
    watcher.start().unwrap();
    watcher.stop();
}
