//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use recall_core::{
  ProgressRecord, Quality, Version, grade,
  catalog::{CardPatch, DeckPatch, NewCard, NewDeck},
  classify::MasteryCounts,
  queue::next_batch,
  session::{SessionAggregator, SessionTally, commit_review, load, review_card},
  store::{CatalogStore, ProgressRepository, WriteOutcome},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn at(day: u32, hour: u32) -> DateTime<Utc> {
  Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
}

fn q(value: i64) -> Quality { Quality::new(value).unwrap() }

/// A deck owned by a fresh user, with `n` cards.
async fn deck_with_cards(s: &SqliteStore, n: usize) -> (Uuid, Uuid, Vec<Uuid>) {
  let owner = Uuid::new_v4();
  let deck = s.create_deck(NewDeck::new(owner, "Hiragana")).await.unwrap();
  let mut cards = Vec::with_capacity(n);
  for i in 0..n {
    let card = s
      .create_card(NewCard::new(deck.deck_id, format!("front {i}"), format!("back {i}")))
      .await
      .unwrap();
    cards.push(card.card_id);
  }
  (owner, deck.deck_id, cards)
}

// ─── Decks and cards ─────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_deck() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let input = NewDeck {
    description: "Basic vocabulary".into(),
    is_public: true,
    ..NewDeck::new(owner, "Japanese N5")
  };

  let deck = s.create_deck(input).await.unwrap();
  let fetched = s.get_deck(deck.deck_id).await.unwrap().unwrap();
  assert_eq!(fetched, deck);
  assert!(fetched.is_public);
}

#[tokio::test]
async fn get_deck_missing_returns_none() {
  let s = store().await;
  assert!(s.get_deck(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_decks_newest_first_and_scoped_to_owner() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let first = s.create_deck(NewDeck::new(owner, "one")).await.unwrap();
  let second = s.create_deck(NewDeck::new(owner, "two")).await.unwrap();
  s.create_deck(NewDeck::new(Uuid::new_v4(), "someone else's"))
    .await
    .unwrap();

  let decks = s.list_decks(owner).await.unwrap();
  let ids: Vec<Uuid> = decks.iter().map(|d| d.deck_id).collect();
  assert_eq!(ids, vec![second.deck_id, first.deck_id]);
}

#[tokio::test]
async fn public_listing_respects_visibility_and_limit() {
  let s = store().await;
  for i in 0..3 {
    s.create_deck(NewDeck { is_public: true, ..NewDeck::new(Uuid::new_v4(), format!("p{i}")) })
      .await
      .unwrap();
  }
  s.create_deck(NewDeck::new(Uuid::new_v4(), "private")).await.unwrap();

  assert_eq!(s.list_public_decks(50).await.unwrap().len(), 3);
  let limited = s.list_public_decks(2).await.unwrap();
  assert_eq!(limited.len(), 2);
  assert_eq!(limited[0].name, "p2");
}

#[tokio::test]
async fn cards_listed_oldest_first() {
  let s = store().await;
  let (_, deck, cards) = deck_with_cards(&s, 3).await;

  let listed = s.list_cards(deck).await.unwrap();
  let ids: Vec<Uuid> = listed.iter().map(|c| c.card_id).collect();
  assert_eq!(ids, cards);
  assert_eq!(listed[0].front, "front 0");
}

#[tokio::test]
async fn deck_patch_changes_only_given_fields() {
  let s = store().await;
  let owner = Uuid::new_v4();
  let deck = s
    .create_deck(NewDeck {
      description: "Basic vocabulary".into(),
      ..NewDeck::new(owner, "Japanese N5")
    })
    .await
    .unwrap();

  let patch = DeckPatch { is_public: Some(true), ..DeckPatch::default() };
  let updated = s.update_deck(deck.deck_id, patch).await.unwrap().unwrap();
  assert!(updated.is_public);
  assert_eq!(updated.name, "Japanese N5");
  assert_eq!(updated.description, "Basic vocabulary");
  assert_eq!(updated.created_at, deck.created_at);

  let patch = DeckPatch { name: Some("Japanese N4".into()), ..DeckPatch::default() };
  let updated = s.update_deck(deck.deck_id, patch).await.unwrap().unwrap();
  assert_eq!(updated.name, "Japanese N4");
  assert!(updated.is_public);

  assert!(s.update_deck(Uuid::new_v4(), DeckPatch::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn card_patch_keeps_progress() {
  let s = store().await;
  let (user, _, cards) = deck_with_cards(&s, 1).await;
  review_card(&s, user, cards[0], q(5), at(1, 9), 3).await.unwrap();

  let patch = CardPatch {
    pronunciation: Some("hi-ra-ga-na".into()),
    ..CardPatch::default()
  };
  let updated = s.update_card(cards[0], patch).await.unwrap().unwrap();
  assert_eq!(updated.front, "front 0");
  assert_eq!(updated.pronunciation, "hi-ra-ga-na");

  let (record, version) = s.get_progress(user, cards[0]).await.unwrap();
  assert!(record.is_some());
  assert_eq!(version, Version::ABSENT.next());

  assert!(s.update_card(Uuid::new_v4(), CardPatch::default()).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_card_removes_its_progress() {
  let s = store().await;
  let (owner, _, cards) = deck_with_cards(&s, 1).await;
  review_card(&s, owner, cards[0], q(4), at(1, 9), 3).await.unwrap();

  assert!(s.delete_card(cards[0]).await.unwrap());
  assert!(!s.delete_card(cards[0]).await.unwrap());
  assert!(s.get_card(cards[0]).await.unwrap().is_none());

  let (record, version) = s.get_progress(owner, cards[0]).await.unwrap();
  assert!(record.is_none());
  assert!(version.is_absent());
}

#[tokio::test]
async fn delete_deck_cascades() {
  let s = store().await;
  let (owner, deck, cards) = deck_with_cards(&s, 2).await;
  review_card(&s, owner, cards[0], q(5), at(1, 9), 3).await.unwrap();
  let session = s.create_session(owner, deck).await.unwrap();

  assert!(s.delete_deck(deck).await.unwrap());

  assert!(s.get_card(cards[1]).await.unwrap().is_none());
  assert!(s.get_session(session.session_id).await.unwrap().is_none());
  let (record, _) = s.get_progress(owner, cards[0]).await.unwrap();
  assert!(record.is_none());
}

// ─── Progress ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn progress_round_trips_with_version() {
  let s = store().await;
  let (user, _, cards) = deck_with_cards(&s, 1).await;
  let record = grade(None, user, cards[0], q(4), at(3, 10));

  let outcome = s.put_progress(&record, Version::ABSENT).await.unwrap();
  assert_eq!(outcome, WriteOutcome::Committed(Version::ABSENT.next()));

  let (stored, version) = s.get_progress(user, cards[0]).await.unwrap();
  assert_eq!(stored.unwrap(), record);
  assert_eq!(version, Version::ABSENT.next());
}

#[tokio::test]
async fn insert_conflicts_when_record_exists() {
  let s = store().await;
  let (user, _, cards) = deck_with_cards(&s, 1).await;
  let record = grade(None, user, cards[0], q(4), at(3, 10));

  s.put_progress(&record, Version::ABSENT).await.unwrap();
  let outcome = s.put_progress(&record, Version::ABSENT).await.unwrap();
  assert_eq!(outcome, WriteOutcome::Conflict { current: Version::ABSENT.next() });
}

#[tokio::test]
async fn stale_update_is_rejected_and_leaves_row_untouched() {
  let s = store().await;
  let (user, _, cards) = deck_with_cards(&s, 1).await;
  let first = grade(None, user, cards[0], q(4), at(3, 10));
  let v1 = Version::ABSENT.next();
  s.put_progress(&first, Version::ABSENT).await.unwrap();

  let second = grade(Some(&first), user, cards[0], q(5), at(4, 10));
  assert_eq!(
    s.put_progress(&second, v1).await.unwrap(),
    WriteOutcome::Committed(v1.next())
  );

  let stale = grade(Some(&first), user, cards[0], q(0), at(4, 11));
  assert_eq!(
    s.put_progress(&stale, v1).await.unwrap(),
    WriteOutcome::Conflict { current: v1.next() }
  );

  let (stored, _) = s.get_progress(user, cards[0]).await.unwrap();
  assert_eq!(stored.unwrap(), second);
}

#[tokio::test]
async fn concurrent_reviewers_both_land() {
  let s = store().await;
  let (user, _, cards) = deck_with_cards(&s, 1).await;
  let card = cards[0];

  let a = load(&s, user, card).await.unwrap();
  let b = load(&s, user, card).await.unwrap();
  commit_review(&s, &a, user, card, q(4), at(5, 8)).await.unwrap();
  assert!(commit_review(&s, &b, user, card, q(4), at(5, 8)).await.is_err());

  let fresh = load(&s, user, card).await.unwrap();
  let (record, _) = commit_review(&s, &fresh, user, card, q(4), at(5, 8))
    .await
    .unwrap();
  assert_eq!(record.repetitions, 2);
}

#[tokio::test]
async fn due_and_fresh_listing() {
  let s = store().await;
  let (user, deck, cards) = deck_with_cards(&s, 4).await;

  // cards[0]: lapsed on day 1, due day 2.
  s.put_progress(&grade(None, user, cards[0], q(1), at(1, 9)), Version::ABSENT)
    .await
    .unwrap();
  // cards[1]: reviewed day 1 morning, due day 2 morning, earlier than cards[0].
  s.put_progress(&grade(None, user, cards[1], q(4), at(1, 7)), Version::ABSENT)
    .await
    .unwrap();
  // cards[2]: reviewed on day 2, not due until day 3.
  s.put_progress(&grade(None, user, cards[2], q(4), at(2, 9)), Version::ABSENT)
    .await
    .unwrap();

  let due: Vec<Uuid> = s
    .list_due(user, deck, at(2, 12))
    .await
    .unwrap()
    .iter()
    .map(|r| r.card_id)
    .collect();
  assert_eq!(due, vec![cards[1], cards[0]]);

  assert_eq!(s.list_fresh(user, deck).await.unwrap(), vec![cards[3]]);
  assert_eq!(s.list_progress(user, deck).await.unwrap().len(), 3);

  // Another learner has only fresh cards.
  let other = Uuid::new_v4();
  assert!(s.list_due(other, deck, at(2, 12)).await.unwrap().is_empty());
  assert_eq!(s.list_fresh(other, deck).await.unwrap(), cards);
}

#[tokio::test]
async fn next_batch_over_sqlite() {
  let s = store().await;
  let (user, deck, cards) = deck_with_cards(&s, 5).await;
  for card in &cards[..2] {
    s.put_progress(&grade(None, user, *card, q(2), at(1, 9)), Version::ABSENT)
      .await
      .unwrap();
  }

  let batch: Vec<Uuid> = next_batch(&s, user, deck, at(3, 9), 4, 0.5)
    .await
    .unwrap()
    .collect();
  assert_eq!(batch.len(), 4);
  assert_eq!(batch[2], cards[2]);
  assert!(batch[..2].contains(&cards[0]));
  assert!(batch[..2].contains(&cards[1]));
}

#[tokio::test]
async fn mastery_counts_from_stored_progress() {
  let s = store().await;
  let (user, deck, cards) = deck_with_cards(&s, 3).await;
  review_card(&s, user, cards[0], q(5), at(1, 9), 3).await.unwrap();
  review_card(&s, user, cards[1], q(1), at(1, 9), 3).await.unwrap();

  let progress = s.list_progress(user, deck).await.unwrap();
  let counts = MasteryCounts::tally(&cards, &progress);
  assert_eq!(counts.total, 3);
  assert_eq!(counts.mastered, 1);
  assert_eq!(counts.learning, 1);
  assert_eq!(counts.new, 1);
}

// ─── Study sessions ──────────────────────────────────────────────────────────

#[tokio::test]
async fn session_reviews_increment_tally() {
  let s = store().await;
  let (user, deck, cards) = deck_with_cards(&s, 2).await;
  let session = s.create_session(user, deck).await.unwrap();
  assert!(session.is_open());
  assert_eq!(session.tally, SessionTally::default());

  let mut agg = SessionAggregator::resume(&s, user, session.tally);
  agg.submit(cards[0], q(4), at(2, 9)).await.unwrap();
  let tally = s.record_session_review(session.session_id, q(4)).await.unwrap();
  assert_eq!(tally, Some(agg.tally()));

  agg.submit(cards[1], q(0), at(2, 9)).await.unwrap();
  s.record_session_review(session.session_id, q(0)).await.unwrap();

  let stored = s.get_session(session.session_id).await.unwrap().unwrap();
  assert_eq!(
    stored.tally,
    SessionTally { cards_studied: 2, cards_correct: 1, cards_lapsed: 1 }
  );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_session_reviews_all_count() {
  let s = store().await;
  let (user, deck, _) = deck_with_cards(&s, 0).await;
  let session_id = s.create_session(user, deck).await.unwrap().session_id;

  let tasks: Vec<_> = (0..8)
    .map(|i| {
      let s = s.clone();
      let quality = if i % 2 == 0 { q(5) } else { q(1) };
      tokio::spawn(async move { s.record_session_review(session_id, quality).await })
    })
    .collect();
  for task in tasks {
    assert!(task.await.unwrap().unwrap().is_some());
  }

  let stored = s.get_session(session_id).await.unwrap().unwrap();
  assert_eq!(
    stored.tally,
    SessionTally { cards_studied: 8, cards_correct: 4, cards_lapsed: 4 }
  );
}

#[tokio::test]
async fn finished_or_missing_session_counts_nothing() {
  let s = store().await;
  let (user, deck, _) = deck_with_cards(&s, 0).await;
  let session = s.create_session(user, deck).await.unwrap();
  s.finish_session(session.session_id, at(2, 10)).await.unwrap();

  assert!(s.record_session_review(session.session_id, q(4)).await.unwrap().is_none());
  assert!(s.record_session_review(Uuid::new_v4(), q(4)).await.unwrap().is_none());

  let stored = s.get_session(session.session_id).await.unwrap().unwrap();
  assert_eq!(stored.tally, SessionTally::default());
}

#[tokio::test]
async fn finishing_twice_keeps_first_end() {
  let s = store().await;
  let (user, deck, _) = deck_with_cards(&s, 0).await;
  let session = s.create_session(user, deck).await.unwrap();

  let done = s.finish_session(session.session_id, at(2, 10)).await.unwrap().unwrap();
  assert_eq!(done.ended_at, Some(at(2, 10)));

  let again = s.finish_session(session.session_id, at(2, 11)).await.unwrap().unwrap();
  assert_eq!(again.ended_at, Some(at(2, 10)));

  assert!(s.finish_session(Uuid::new_v4(), at(2, 11)).await.unwrap().is_none());
}

#[tokio::test]
async fn sessions_listed_newest_first_and_counted() {
  let s = store().await;
  let (user, deck, _) = deck_with_cards(&s, 0).await;
  let first = s.create_session(user, deck).await.unwrap();
  let second = s.create_session(user, deck).await.unwrap();

  let listed = s.list_sessions(user, 50).await.unwrap();
  let ids: Vec<Uuid> = listed.iter().map(|x| x.session_id).collect();
  assert_eq!(ids, vec![second.session_id, first.session_id]);
  assert_eq!(s.list_sessions(user, 1).await.unwrap().len(), 1);
  assert_eq!(s.count_sessions(user).await.unwrap(), 2);
  assert_eq!(s.count_sessions(Uuid::new_v4()).await.unwrap(), 0);
}

#[tokio::test]
async fn overdue_record_from_epoch_is_due() {
  let s = store().await;
  let (user, deck, cards) = deck_with_cards(&s, 1).await;
  let record = ProgressRecord { lapses: 2, ..ProgressRecord::fresh(user, cards[0]) };
  s.put_progress(&record, Version::ABSENT).await.unwrap();

  let due = s.list_due(user, deck, at(1, 0) - TimeDelta::days(365 * 50)).await.unwrap();
  assert_eq!(due, vec![record]);
}
