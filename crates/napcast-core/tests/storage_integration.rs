//! Integration tests for persistence feeding the planner.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use napcast_core::storage::Config;
use napcast_core::{
    build_notification_plan, compute_coach_insights, daily_totals, BabyProfile, Database, Learner,
    Scheduler, SessionSource, SleepSession,
};

fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 7, d, h, m, 0).unwrap()
}

fn log(db: &Database, start: DateTime<Utc>, end: DateTime<Utc>) -> SleepSession {
    let s = SleepSession::new(start, end, SessionSource::Manual, end).unwrap();
    db.insert_session(&s).unwrap();
    s
}

#[test]
fn stored_history_drives_the_whole_pipeline() {
    let db = Database::open_memory().unwrap();
    let birth = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    db.upsert_profile(&BabyProfile::new("Ada", birth, at(1, 8, 0)))
        .unwrap();

    log(&db, at(1, 9, 0), at(1, 10, 0));
    log(&db, at(1, 12, 0), at(1, 13, 30));
    log(&db, at(1, 16, 0), at(1, 17, 0));
    log(&db, at(1, 21, 0), at(2, 6, 30));
    let mistake = log(&db, at(2, 7, 0), at(2, 7, 5));
    db.soft_delete_session(&mistake.id, at(2, 7, 10)).unwrap();

    let now = at(2, 8, 0).with_timezone(&FixedOffset::east_opt(0).unwrap());
    let profile = db.active_profile().unwrap().unwrap();
    let sessions = db.all_sessions().unwrap();
    assert_eq!(sessions.len(), 4);

    let state = Learner::new().compute(profile.birth_date, &sessions, now);
    db.save_learner_state(&state).unwrap();
    let cached = db.load_learner_state().unwrap().unwrap();
    assert_eq!(cached, state);

    let blocks = Scheduler::new().generate_schedule(&cached, &sessions, now);
    // anchored on the end of the night
    let first_nap = blocks
        .iter()
        .find(|b| b.kind == napcast_core::BlockKind::Nap)
        .unwrap();
    assert_eq!(
        first_nap.start,
        at(2, 6, 30) + napcast_core::time::minutes(state.ewma_wake_window_min)
    );

    let plan = build_notification_plan(&blocks, now.with_timezone(&Utc), 36);
    assert!(!plan.is_empty());
    assert!(plan.iter().all(|p| p.fire_at > now.with_timezone(&Utc)));

    let insights = compute_coach_insights(&sessions, Some(&cached), now);
    assert!(!insights.is_empty());

    let totals = daily_totals(&sessions, now.date_naive(), 2, *now.offset());
    assert_eq!(totals[0].total_minutes, 60 + 90 + 60 + 180);
    assert_eq!(totals[1].total_minutes, 390);
}

#[test]
fn reopening_a_file_keeps_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("napcast.db");
    let id = {
        let db = Database::open_at(&path).unwrap();
        log(&db, at(2, 9, 0), at(2, 10, 0)).id
    };

    let db = Database::open_at(&path).unwrap();
    let s = db.get_session(&id).unwrap().unwrap();
    assert_eq!(s.end - s.start, Duration::hours(1));
}

#[test]
fn config_file_feeds_scheduler() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[schedule]\nhorizon_days = 1\n\n[timezone]\nutc_offset_minutes = 60\n")
        .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.utc_offset(), FixedOffset::east_opt(3600).unwrap());

    let now = at(2, 8, 0).with_timezone(&config.utc_offset());
    let state = Learner::with_config(config.learner.clone()).compute(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        &[],
        now,
    );
    let blocks = Scheduler::with_config(config.schedule.clone()).generate_schedule(&state, &[], now);
    let local_midnight = FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 7, 3, 0, 0, 0)
        .unwrap();
    assert!(blocks.iter().all(|b| b.end <= local_midnight));
}
