//! End-to-end flows over a file-backed store.
//!
//! Covers:
//!  1. Register → puzzle → solve → photo → feed/leaderboard
//!  2. Day lock and streak across days
//!  3. Account deletion cascade (likes stay orphaned)
//!  4. Records surviving a reopen of the store

use chrono::NaiveDate;
use tempfile::tempdir;
use zodiac_core::clock::FixedClock;
use zodiac_core::feed::{self, FeedOrder};
use zodiac_core::leaderboard;
use zodiac_core::likes::entry_id;
use zodiac_core::puzzle::{PuzzleDesk, PuzzleGenerator, TropicalZodiac, ZodiacSign};
use zodiac_core::settings::{GameSettings, KdfSettings};
use zodiac_core::{
    cipher, AccountStore, DeedLedger, FileStore, LedgerRules, LikesRegistry, ZodiacError,
};

fn settings() -> GameSettings {
    GameSettings {
        kdf: KdfSettings {
            memory_kib: 64,
            time_cost: 1,
            parallelism: 1,
        },
        ..GameSettings::default()
    }
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 7, d).unwrap()
}

fn birthday() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1992, 4, 25)
}

struct Fixed;

impl PuzzleGenerator for Fixed {
    fn generate_deed_sentence(&self, _sign: ZodiacSign) -> anyhow::Result<String> {
        Ok("Carry groceries for a neighbour".to_string())
    }
}

// ─── Test 1: full day ───────────────────────────────────────────────────────

#[test]
fn solve_and_share_a_deed() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path().join("store.json")).unwrap();
    let accounts = AccountStore::new(&store, settings());
    let ledger = DeedLedger::new(&store, FixedClock(day(10)), LedgerRules::default());
    let desk = PuzzleDesk::new(&store, FixedClock(day(10)), settings().sentences);
    let likes = LikesRegistry::new(&store);

    let ann = accounts.register("ann@x.com", "pass", birthday()).unwrap();
    let puzzle = desk.issue(&ann, &Fixed, &TropicalZodiac).unwrap();
    assert_eq!(puzzle.sign, ZodiacSign::Taurus);

    let answer = cipher::decode(&puzzle.encoded, puzzle.hint);
    assert!(desk.check(&ann.email, &answer).unwrap());
    let solved = ledger.record_solve(&ann.email, &puzzle.sentence).unwrap();
    assert_eq!((solved.points, solved.streak), (6, 1));

    assert!(matches!(
        ledger.record_solve(&ann.email, &puzzle.sentence),
        Err(ZodiacError::AlreadyCompleted)
    ));
    assert_eq!(ledger.ledger(&ann.email).unwrap(), solved);

    ledger
        .attach_photo(&ann.email, day(10), "data:image/png;base64,AAAA")
        .unwrap();
    let replaced = ledger
        .replace_photo(&ann.email, day(10), "data:image/png;base64,BBBB")
        .unwrap();
    assert_eq!(replaced.points, 12);

    let bob = accounts.register("bob@x.com", "pass", birthday()).unwrap();
    let id = entry_id(&ann.email, day(10));
    likes.toggle(&id, &bob.email).unwrap();
    likes.toggle(&id, &ann.email).unwrap();

    let mut entries = feed::from_store(&store).unwrap();
    feed::sort_feed(&mut entries, FeedOrder::MostLiked, &likes.snapshot().unwrap());
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entry_id, id);
    assert_eq!(entries[0].image, "data:image/png;base64,BBBB");
    assert_eq!(entries[0].likes, 2);
    assert_eq!(likes.count(&id).unwrap(), 2);

    let board = leaderboard::from_store(&store).unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board.entries()[0].display_name, "ann");
    assert_eq!(board.entries()[0].points, 12);
}

// ─── Test 2: streaks ────────────────────────────────────────────────────────

#[test]
fn streak_grows_on_consecutive_days_and_resets_after_a_gap() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path().join("store.json")).unwrap();
    let accounts = AccountStore::new(&store, settings());
    accounts.register("cara@x.com", "pass", birthday()).unwrap();

    let mut points = Vec::new();
    for d in [1, 2, 3, 5] {
        let ledger = DeedLedger::new(&store, FixedClock(day(d)), LedgerRules::default());
        let next = ledger.record_solve("cara@x.com", "Smile at everyone").unwrap();
        points.push((next.streak, next.points));
    }
    assert_eq!(points, vec![(1, 6), (2, 13), (3, 21), (1, 27)]);
}

#[test]
fn ledger_writes_need_an_account() {
    let store = zodiac_core::MemoryStore::new();
    let ledger = DeedLedger::new(&store, FixedClock(day(1)), LedgerRules::default());
    assert!(matches!(
        ledger.record_solve("ghost@x.com", "Smile at everyone"),
        Err(ZodiacError::NotFound(_))
    ));
}

// ─── Test 3: deletion ───────────────────────────────────────────────────────

#[test]
fn deleting_an_account_hides_it_everywhere_but_keeps_likes() {
    let dir = tempdir().unwrap();
    let store = FileStore::open(dir.path().join("store.json")).unwrap();
    let accounts = AccountStore::new(&store, settings());
    let ledger = DeedLedger::new(&store, FixedClock(day(10)), LedgerRules::default());
    let likes = LikesRegistry::new(&store);

    accounts.register("dan@x.com", "pass", birthday()).unwrap();
    ledger.record_solve("dan@x.com", "Share your umbrella").unwrap();
    ledger.attach_photo("dan@x.com", day(10), "img").unwrap();
    let id = entry_id("dan@x.com", day(10));
    likes.toggle(&id, "eve@x.com").unwrap();

    accounts.delete_account("dan@x.com").unwrap();
    accounts.delete_account("dan@x.com").unwrap();

    assert!(feed::from_store(&store).unwrap().is_empty());
    assert!(leaderboard::from_store(&store).unwrap().is_empty());
    assert_eq!(ledger.ledger("dan@x.com").unwrap().points, 0);
    assert_eq!(likes.count(&id).unwrap(), 1);
    assert!(accounts.current_profile().unwrap().is_none());
}

// ─── Test 4: persistence ────────────────────────────────────────────────────

#[test]
fn state_survives_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("store.json");
    {
        let store = FileStore::open(&path).unwrap();
        let accounts = AccountStore::new(&store, settings());
        accounts.register("fay@x.com", "secret", birthday()).unwrap();
        let ledger = DeedLedger::new(&store, FixedClock(day(4)), LedgerRules::default());
        ledger.record_solve("fay@x.com", "Thank a bus driver").unwrap();
    }

    let store = FileStore::open(&path).unwrap();
    let accounts = AccountStore::new(&store, settings());
    assert_eq!(accounts.current_session().unwrap().unwrap().email, "fay@x.com");
    accounts.sign_out().unwrap();
    let profile = accounts.sign_in("FAY", "secret").unwrap();
    assert_eq!(profile.email, "fay@x.com");

    let ledger = DeedLedger::new(&store, FixedClock(day(4)), LedgerRules::default());
    assert!(ledger.has_completed_today("fay@x.com").unwrap());
    let tomorrow = DeedLedger::new(&store, FixedClock(day(5)), LedgerRules::default());
    assert!(!tomorrow.has_completed_today("fay@x.com").unwrap());
}
