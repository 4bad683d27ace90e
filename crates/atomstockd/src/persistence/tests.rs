use std::fs::{self, File};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use nix::fcntl::{Flock, FlockArg};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::inventory::{Element, MAX_UNITS, Molecule};

struct Scratch {
    _dir: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn scratch() -> Scratch {
    let dir = TempDir::new().expect("temporary directory");
    let path = Utf8PathBuf::from_path_buf(dir.path().join("stock.bin")).expect("utf-8 path");
    Scratch { _dir: dir, path }
}

fn seed(carbon: u64, hydrogen: u64, oxygen: u64) -> Inventory {
    Inventory::seeded(carbon, hydrogen, oxygen).expect("seed in range")
}

fn snapshot(store: &StockStore) -> [u64; 3] {
    store.read(Inventory::counts).expect("read succeeds")
}

const WRITERS: u64 = 4;
const ADDS_PER_WRITER: u64 = 500;
const SETTLE: Duration = Duration::from_millis(150);
const RELEASE: Duration = Duration::from_secs(5);

/// Locks the backing file through a descriptor the store does not own.
fn hold(path: &Utf8Path, mode: FlockArg) -> Flock<File> {
    let file = File::open(path).expect("open second descriptor");
    Flock::lock(file, mode)
        .map_err(|(_, errno)| errno)
        .expect("lock second descriptor")
}

/// Adds one carbon on a worker thread while `holder` keeps its lock, checks
/// the write is still waiting, then releases the lock and returns the store.
fn add_while_held(mut store: StockStore, holder: Flock<File>) -> StockStore {
    let (done, finished) = mpsc::channel();
    let worker = thread::spawn(move || {
        let added = store
            .write(|inventory| inventory.add_units(Element::Carbon, 1))
            .expect("write");
        done.send(added).expect("report write");
        store
    });

    assert!(
        finished.recv_timeout(SETTLE).is_err(),
        "write completed while another descriptor held the lock"
    );
    drop(holder);
    let outcome = finished.recv_timeout(RELEASE).expect("write after release");
    assert!(outcome.is_ok(), "addition failed: {outcome:?}");
    worker.join().expect("writer thread")
}

#[rstest]
fn fresh_file_is_seeded(scratch: Scratch) {
    let (store, outcome) = StockStore::open(&scratch.path, seed(4, 5, 6)).expect("open");
    assert_eq!(outcome, OpenOutcome::Initialised);
    assert_eq!(snapshot(&store), [4, 5, 6]);
    assert_eq!(store.path(), Some(scratch.path.as_path()));
    store.close().expect("close");
    assert_eq!(
        fs::metadata(&scratch.path).expect("metadata").len(),
        RECORD_FILE_LEN
    );
}

#[rstest]
fn existing_record_wins_over_seeds(scratch: Scratch) {
    let (mut first, _) = StockStore::open(&scratch.path, seed(10, 0, 0)).expect("open");
    first
        .write(|inventory| inventory.add_units(Element::Oxygen, 7))
        .expect("write")
        .expect("add");
    first.close().expect("close");

    let (second, outcome) = StockStore::open(&scratch.path, seed(99, 99, 99)).expect("reopen");
    assert_eq!(outcome, OpenOutcome::Loaded);
    assert_eq!(snapshot(&second), [10, 0, 7]);
}

#[rstest]
fn stores_on_one_file_share_updates(scratch: Scratch) {
    let (mut left, _) = StockStore::open(&scratch.path, seed(0, 0, 0)).expect("open left");
    let (mut right, outcome) = StockStore::open(&scratch.path, seed(5, 5, 5)).expect("open right");
    assert_eq!(outcome, OpenOutcome::Loaded);

    left.write(|inventory| inventory.add_units(Element::Hydrogen, 10))
        .expect("write")
        .expect("add");
    assert_eq!(snapshot(&right), [0, 10, 0]);

    right
        .write(|inventory| inventory.add_units(Element::Oxygen, 5))
        .expect("write")
        .expect("add");
    left.write(|inventory| inventory.consume_for_molecule(Molecule::Water, 5))
        .expect("write")
        .expect("deliver");
    assert_eq!(snapshot(&right), [0, 0, 0]);
}

#[rstest]
fn failed_mutation_leaves_record_unchanged(scratch: Scratch) {
    let (mut store, _) = StockStore::open(&scratch.path, seed(MAX_UNITS, 0, 0)).expect("open");
    let outcome = store
        .write(|inventory| inventory.add_units(Element::Carbon, 1))
        .expect("write");
    assert!(outcome.is_err());
    assert_eq!(snapshot(&store), [MAX_UNITS, 0, 0]);
}

#[rstest]
fn short_file_is_rejected(scratch: Scratch) {
    fs::write(&scratch.path, [0_u8; 5]).expect("write fixture");
    let error = StockStore::open(&scratch.path, Inventory::empty()).expect_err("must reject");
    assert!(matches!(
        error,
        PersistenceError::Truncated { len: 5, .. }
    ));
}

#[rstest]
fn out_of_range_record_is_rejected(scratch: Scratch) {
    let mut bytes = [0_u8; RECORD_LEN];
    encode(&Inventory::from_counts(0, MAX_UNITS + 1, 0), &mut bytes);
    fs::write(&scratch.path, bytes).expect("write fixture");
    let error = StockStore::open(&scratch.path, Inventory::empty()).expect_err("must reject");
    assert!(matches!(
        error,
        PersistenceError::Corrupt {
            element: Element::Hydrogen,
            ..
        }
    ));
}

#[rstest]
fn closed_record_is_on_disk(scratch: Scratch) {
    let (mut store, _) = StockStore::open(&scratch.path, seed(1, 2, 3)).expect("open");
    store
        .write(|inventory| inventory.add_units(Element::Carbon, 1))
        .expect("write")
        .expect("add");
    store.close().expect("close");
    let bytes = fs::read(&scratch.path).expect("read back");
    assert_eq!(decode(&bytes), Some(Inventory::from_counts(2, 2, 3)));
}

#[rstest]
fn in_memory_store_has_no_path() {
    let mut store = StockStore::in_memory(seed(1, 1, 1));
    store
        .write(|inventory| inventory.add_units(Element::Carbon, 2))
        .expect("write")
        .expect("add");
    assert_eq!(store.path(), None);
    assert_eq!(snapshot(&store), [3, 1, 1]);
    store.close().expect("close");
}

#[rstest]
fn concurrent_writers_never_lose_an_update(scratch: Scratch) {
    let (observer, _) = StockStore::open(&scratch.path, Inventory::empty()).expect("open");
    let workers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let (mut store, outcome) =
                StockStore::open(&scratch.path, seed(9, 9, 9)).expect("open writer");
            assert_eq!(outcome, OpenOutcome::Loaded);
            thread::spawn(move || {
                for _ in 0..ADDS_PER_WRITER {
                    store
                        .write(|inventory| inventory.add_units(Element::Carbon, 1))
                        .expect("write")
                        .expect("add");
                }
                store.close().expect("close writer");
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("writer thread");
    }
    assert_eq!(snapshot(&observer), [WRITERS * ADDS_PER_WRITER, 0, 0]);
}

#[rstest]
fn writes_wait_for_an_exclusive_holder(scratch: Scratch) {
    let (store, _) = StockStore::open(&scratch.path, seed(0, 3, 0)).expect("open");
    let holder = hold(&scratch.path, FlockArg::LockExclusive);

    let released = add_while_held(store, holder);
    assert_eq!(snapshot(&released), [1, 3, 0]);
}

#[rstest]
fn reads_wait_for_an_exclusive_holder(scratch: Scratch) {
    let (store, _) = StockStore::open(&scratch.path, seed(6, 0, 0)).expect("open");
    let holder = hold(&scratch.path, FlockArg::LockExclusive);
    let (done, finished) = mpsc::channel();
    let worker = thread::spawn(move || {
        done.send(snapshot(&store)).expect("report read");
    });

    assert!(
        finished.recv_timeout(SETTLE).is_err(),
        "read completed under an exclusive lock"
    );
    drop(holder);
    assert_eq!(finished.recv_timeout(RELEASE).expect("read after release"), [6, 0, 0]);
    worker.join().expect("reader thread");
}

#[rstest]
fn readers_share_the_lock_but_writers_wait(scratch: Scratch) {
    let (store, _) = StockStore::open(&scratch.path, seed(2, 0, 0)).expect("open");
    let reader = hold(&scratch.path, FlockArg::LockShared);
    assert_eq!(snapshot(&store), [2, 0, 0]);

    let released = add_while_held(store, reader);
    assert_eq!(snapshot(&released), [3, 0, 0]);
}
