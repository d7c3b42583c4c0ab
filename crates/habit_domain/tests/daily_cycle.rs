use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use habit_domain::habit::HabitCategory;
use habit_domain::intention::{IntentionDuration, IntentionResolution, IntentionStatus};
use habit_domain::service::{HabitDetails, DEFAULT_BASE_AWARD};
use habit_domain::store::InMemoryStore;
use habit_domain::HabitService;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn details(name: &str, category: HabitCategory) -> HabitDetails {
    HabitDetails {
        name: name.to_string(),
        category,
        notes: String::new(),
        color: None,
        icon: None,
    }
}

/// Walks a user through three calendar days against one shared store:
/// create, complete, roll over, miss a day, restart, and settle an
/// intention, verifying streak and ledger state at every boundary.
#[test]
fn multi_day_session_round_trip() {
    let user_id = Uuid::new_v4();
    let store = Arc::new(InMemoryStore::new());
    let day_one = date(2025, 10, 20);

    // Day one: create two habits and complete both.
    let service = HabitService::builder()
        .with_store(Box::new(store.clone()))
        .for_user(user_id)
        .build(day_one)
        .expect("build day-one session");

    let walk = service
        .create_habit(details("Walk", HabitCategory::Fitness), None)
        .expect("create walk");
    let journal = service
        .create_habit(
            details("Journal", HabitCategory::Mindfulness),
            Some((IntentionDuration::Week, day_one)),
        )
        .expect("create journal");

    for id in [walk.id, journal.id] {
        let outcome = service.toggle_completion(id, day_one).expect("complete");
        assert_eq!(outcome.habit.streak, 1);
        assert_eq!(outcome.coin_delta, i64::from(DEFAULT_BASE_AWARD));
    }
    assert_eq!(service.session_coin_balance(), 2 * i64::from(DEFAULT_BASE_AWARD));
    assert_eq!(store.completions().len(), 2);
    let guard = service.coin_guard_snapshot();

    // Day two: a fresh load rolls the day over; yesterday's completions
    // keep their streaks and the completion flags clear.
    let day_two = date(2025, 10, 21);
    let service = HabitService::builder()
        .with_store(Box::new(store.clone()))
        .for_user(user_id)
        .with_coin_guard(guard)
        .build(day_two)
        .expect("build day-two session");

    for habit in service.active_habits() {
        assert_eq!(habit.streak, 1);
        assert!(!habit.completed_today);
        assert_eq!(habit.last_reset_date, Some(day_two));
    }
    // The restored guard only held day-one entries, all pruned on load.
    assert!(service.coin_guard_snapshot().is_empty());

    let outcome = service.toggle_completion(walk.id, day_two).expect("complete walk");
    assert_eq!(outcome.habit.streak, 2);

    // Day four. Day three was missed entirely, so both streaks break.
    let day_four = date(2025, 10, 23);
    let service = HabitService::builder()
        .with_store(Box::new(store.clone()))
        .for_user(user_id)
        .build(day_four)
        .expect("build day-four session");

    for habit in service.active_habits() {
        assert_eq!(habit.streak, 0, "a missed day breaks every streak");
        assert!(!habit.completed_today);
    }

    // Completing after the gap starts a fresh chain at one.
    let outcome = service.toggle_completion(walk.id, day_four).expect("complete");
    assert_eq!(outcome.habit.streak, 1);

    // Running the rollover again on the same day changes nothing.
    assert_eq!(service.run_daily_reset(day_four).unwrap(), 0);
    assert_eq!(service.habit(walk.id).unwrap().streak, 1);
}

#[test]
fn week_intention_lifecycle_across_sessions() {
    let user_id = Uuid::new_v4();
    let store = Arc::new(InMemoryStore::new());
    let start = date(2025, 10, 10);

    let service = HabitService::builder()
        .with_store(Box::new(store.clone()))
        .for_user(user_id)
        .build(start)
        .expect("build");
    let habit = service
        .create_habit(
            details("Stretch", HabitCategory::Health),
            Some((IntentionDuration::Week, start)),
        )
        .expect("create");

    // Mid-window the intention is simply active.
    assert_eq!(
        service.intention_status(habit.id, date(2025, 10, 14)).unwrap(),
        IntentionStatus::Active { days_remaining: 3 }
    );

    // Eight days later a new session flags it for acknowledgment.
    let later = date(2025, 10, 18);
    let service = HabitService::builder()
        .with_store(Box::new(store.clone()))
        .for_user(user_id)
        .build(later)
        .expect("build later session");
    let flagged = service.habits_needing_acknowledgment(later);
    assert_eq!(flagged.len(), 1);
    assert_eq!(flagged[0].id, habit.id);

    // Archiving resolves it and removes it from active views while the
    // backend record survives.
    service
        .resolve_intention(habit.id, IntentionResolution::Archive)
        .expect("archive");
    assert!(service.active_habits().is_empty());
    assert!(store.habit(habit.id).expect("record retained").archived);

    // A further session does not re-flag the acknowledged intention.
    let service = HabitService::builder()
        .with_store(Box::new(store))
        .for_user(user_id)
        .build(date(2025, 10, 25))
        .expect("build final session");
    assert!(service.habits_needing_acknowledgment(date(2025, 10, 25)).is_empty());
}
