use railsync::config::GameConfig;
use railsync::core::audio::{AudioClock, ManualClock};
use railsync::core::input::InputEdge;
use railsync::core::pool::Pool;
use railsync::game::chart::{Chart, ChartEvent};
use railsync::game::difficulty::{DifficultyModel, DifficultyTier};
use railsync::game::gameplay::{FrameReport, Phase, Session, SessionOutcome};
use railsync::game::hold::HoldMiss;
use railsync::game::judgment::{JudgeEvent, JudgeGrade, JudgmentWindows, Zone};
use railsync::game::lane::{Spawn, SpawnKind};
use railsync::game::scores::{ScoreEngine, ScoringRules, SessionSummary};

type TestSession = Session<ManualClock, Vec<SessionSummary>>;

fn no_preroll() -> GameConfig {
    let mut config = GameConfig::default();
    config.timing.note_spawn_delay = 0.0;
    config
}

/// 120 BPM, so one beat is half a second.
fn start(config: &GameConfig, events: &[ChartEvent], lanes: usize) -> (TestSession, FrameReport) {
    let chart = Chart::from_events(120.0, Some(lanes), events).unwrap();
    let mut session = Session::new(config, chart, ManualClock::new(0.0), Vec::new(), 42).unwrap();
    let report = session.update(true);
    assert_eq!(report.phase, Phase::Playing);
    (session, report)
}

fn step_to(session: &mut TestSession, time: f64) -> FrameReport {
    session.clock_mut().advance_to(time);
    session.update(true)
}

/// Frames every 0.1s up to (not including) `until`, collecting what happened.
fn run_frames(session: &mut TestSession, from: f64, until: f64) -> Vec<FrameReport> {
    let mut reports = Vec::new();
    let mut frame = 1;
    loop {
        let t = from + f64::from(frame) * 0.1;
        if t >= until - 1e-9 {
            break;
        }
        reports.push(step_to(session, t));
        frame += 1;
    }
    reports
}

fn events(reports: &[FrameReport]) -> Vec<JudgeEvent> {
    reports.iter().flat_map(|r| r.events.iter().copied()).collect()
}

#[test]
fn note_spawns_inside_lookahead_and_perfect_strike_records_offbeat() {
    let (mut session, _) = start(&no_preroll(), &[ChartEvent::note(0, 10.0)], 1);

    let early = run_frames(&mut session, 0.0, 3.0);
    assert!(early.iter().all(|r| r.spawned.is_empty()));

    let report = step_to(&mut session, 3.01);
    assert_eq!(report.spawned.len(), 1);
    assert_eq!(report.spawned[0].beat, 10.0);

    step_to(&mut session, 5.0);
    let target = session.closest_target().unwrap();
    assert_eq!(target.beat, 10.0);

    session.queue_input(InputEdge::strike(target.id, 5.01));
    let report = step_to(&mut session, 5.01);
    let hit = report
        .events
        .iter()
        .find_map(|e| match e {
            JudgeEvent::Hit(j) => Some(*j),
            _ => None,
        })
        .unwrap();
    assert_eq!(hit.grade, JudgeGrade::Perfect);
    assert!((hit.offbeat - 0.02).abs() < 1e-6);
    assert_eq!(session.score().count(JudgeGrade::Perfect), 1);
    assert!(session.closest_target().is_none());
}

#[test]
fn input_lag_shifts_offbeat() {
    let mut config = no_preroll();
    config.timing.input_lag_ms = 10.0;
    let (mut session, _) = start(&config, &[ChartEvent::note(0, 2.0)], 1);
    step_to(&mut session, 0.9);
    let target = session.closest_target().unwrap();

    session.queue_input(InputEdge::strike(target.id, 1.01));
    let report = step_to(&mut session, 1.01);
    let hit = report
        .events
        .iter()
        .find_map(|e| match e {
            JudgeEvent::Hit(j) => Some(*j),
            _ => None,
        })
        .unwrap();
    // 10ms of lag is 0.02 beats at 120 BPM.
    assert!(hit.offbeat.abs() < 1e-6);
    assert_eq!(hit.grade, JudgeGrade::Perfect);
}

#[test]
fn hold_released_at_full_length_completes_as_perfect() {
    let (mut session, _) = start(&no_preroll(), &[ChartEvent::hold(0, 5.0, 7.0)], 1);
    run_frames(&mut session, 0.0, 2.5);

    session.queue_input(InputEdge::press(0, 2.5));
    let mut reports = vec![step_to(&mut session, 2.5)];
    reports.extend(run_frames(&mut session, 2.5, 3.5));

    session.queue_input(InputEdge::release(0, 3.5));
    reports.push(step_to(&mut session, 3.5));

    let all = events(&reports);
    let completed: Vec<_> = all
        .iter()
        .filter_map(|e| match e {
            JudgeEvent::HoldCompleted(j) => Some(*j),
            _ => None,
        })
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].grade, JudgeGrade::Perfect);
    assert_eq!(completed[0].feedback, Zone::Perfect);
    assert_eq!(all.iter().filter(|e| matches!(e, JudgeEvent::HoldTick { .. })).count(), 8);
    assert_eq!(session.score().misses(), 0);
    assert_eq!(session.score().combo().current, 1);
    assert_eq!(session.hold_pool().in_use(), 0);
}

#[test]
fn hold_released_inside_grace_completes_late() {
    let (mut session, _) = start(&no_preroll(), &[ChartEvent::hold(0, 5.0, 7.0)], 1);
    run_frames(&mut session, 0.0, 2.5);

    session.queue_input(InputEdge::press(0, 2.5));
    let mut reports = vec![step_to(&mut session, 2.5)];
    reports.extend(run_frames(&mut session, 2.5, 4.0));

    session.queue_input(InputEdge::release(0, 4.0));
    reports.push(step_to(&mut session, 4.0));

    let all = events(&reports);
    let completed: Vec<_> = all
        .iter()
        .filter_map(|e| match e {
            JudgeEvent::HoldCompleted(j) => Some(*j),
            _ => None,
        })
        .collect();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].grade, JudgeGrade::Perfect);
    assert!((completed[0].offbeat - 1.0).abs() < 1e-6);
    assert!(!all.iter().any(|e| matches!(e, JudgeEvent::HoldMissed { .. })));
    assert_eq!(session.score().misses(), 0);
    assert_eq!(session.hold_pool().in_use(), 0);
}

#[test]
fn hold_kept_down_past_grace_times_out() {
    let (mut session, _) = start(&no_preroll(), &[ChartEvent::hold(0, 5.0, 7.0)], 1);
    run_frames(&mut session, 0.0, 2.5);

    session.queue_input(InputEdge::press(0, 2.5));
    let mut reports = vec![step_to(&mut session, 2.5)];
    reports.extend(run_frames(&mut session, 2.5, 4.5));

    session.queue_input(InputEdge::release(0, 4.5));
    reports.push(step_to(&mut session, 4.5));

    let all = events(&reports);
    assert!(all.iter().any(|e| matches!(
        e,
        JudgeEvent::HoldMissed { reason: HoldMiss::ReleaseTimeout, .. }
    )));
    assert!(!all.iter().any(|e| matches!(e, JudgeEvent::HoldCompleted(_))));
    assert_eq!(session.score().misses(), 1);
}

#[test]
fn hold_pressed_before_zone_entry_cannot_start() {
    let (mut session, _) = start(&no_preroll(), &[ChartEvent::hold(0, 5.0, 7.0)], 1);
    session.queue_input(InputEdge::press(0, 1.0));
    step_to(&mut session, 1.0);
    run_frames(&mut session, 1.0, 2.5);

    // The key is still down from before the hold arrived: nothing starts.
    session.queue_input(InputEdge::press(0, 2.5));
    step_to(&mut session, 2.5);
    let reports = run_frames(&mut session, 2.5, 5.0);
    assert!(events(&reports).iter().any(|e| matches!(
        e,
        JudgeEvent::HoldMissed { reason: HoldMiss::ExitedZone, .. }
    )));
}

#[test]
fn catch_up_ramp_after_a_miss() {
    let mut params = DifficultyTier::Normal.params();
    params.catch_up_duration = 4;
    let model = DifficultyModel::with_params(DifficultyTier::Normal, params);
    let mut score = ScoreEngine::new(ScoringRules::default());

    score.hit(JudgeGrade::Perfect, 0.0);
    score.hit(JudgeGrade::Perfect, 0.0);
    score.miss();
    score.hit(JudgeGrade::Perfect, 0.0);
    score.hit(JudgeGrade::Perfect, 0.0);
    assert_eq!(model.effective_combo(score.combo()), 1);

    score.hit(JudgeGrade::Perfect, 0.0);
    score.hit(JudgeGrade::Perfect, 0.0);
    let highest = score.combo().highest;
    assert!(model.effective_combo(score.combo()).abs_diff(highest) <= 1);
}

#[test]
fn beat_is_continuous_across_pause() {
    let (mut session, _) = start(&no_preroll(), &[ChartEvent::note(0, 40.0)], 1);
    step_to(&mut session, 2.0);
    let before = session.beat();
    assert!((before - 4.0).abs() < 1e-9);

    session.pause();
    let paused = step_to(&mut session, 12.0);
    assert_eq!(paused.phase, Phase::Paused);
    assert_eq!(paused.beat, before);

    session.resume();
    let resumed = session.update(true);
    assert!((resumed.beat - before).abs() < 1e-9);
    assert!((step_to(&mut session, 12.5).beat - 5.0).abs() < 1e-9);
}

#[test]
fn double_release_leaves_pool_size_unchanged() {
    let mut pool: Pool<u32> = Pool::new("test", 2).unwrap();
    let handle = pool.acquire().unwrap();
    assert!(pool.release(handle).is_ok());
    assert!(pool.release(handle).is_err());
    assert_eq!(pool.available(), 2);

    let again = pool.acquire().unwrap();
    assert!(pool.release(handle).is_err());
    assert_eq!(pool.in_use(), 1);
    assert!(pool.release(again).is_ok());
}

#[test]
fn every_timestamp_spawns_once_in_order() {
    let chart_events = vec![
        ChartEvent::note(0, 8.0),
        ChartEvent::note(0, 2.0),
        ChartEvent::note(0, 2.00001),
        ChartEvent::note(1, 3.5),
        ChartEvent::note(1, 3.5),
        ChartEvent::note(2, 1.0),
        ChartEvent::note(2, 6.0),
        ChartEvent::note(2, 4.0),
        ChartEvent::hold(1, 5.0, 6.0),
    ];
    let chart = Chart::from_events(120.0, Some(3), &chart_events).unwrap();
    let expected = chart.lanes.clone();
    let (mut session, first) = start(&no_preroll(), &chart_events, 3);

    let mut reports = vec![first];
    reports.extend(run_frames(&mut session, 0.0, 8.0));
    let spawned: Vec<Spawn> = reports.iter().flat_map(|r| r.spawned.iter().copied()).collect();

    for (lane, lane_chart) in expected.iter().enumerate() {
        let beats: Vec<f64> = spawned
            .iter()
            .filter(|s| s.lane == lane && s.kind == SpawnKind::Note)
            .map(|s| s.beat)
            .collect();
        assert_eq!(beats, lane_chart.notes);
    }
    assert_eq!(spawned.len(), 6 + 1);
    assert!(session.lanes().iter().all(|l| l.is_finished()));
}

#[test]
fn zone_boundaries_belong_to_the_inner_zone() {
    let windows = JudgmentWindows::default();
    assert_eq!(windows.zone_for(0.05), Zone::Perfect);
    assert_eq!(windows.zone_for(-0.05), Zone::Perfect);
    assert_eq!(windows.zone_for(-0.35), Zone::Early);
    assert_eq!(windows.zone_for(0.35), Zone::Late);
    assert_eq!(windows.zone_for(0.36), Zone::None);
}

#[test]
fn strike_on_a_non_closest_note_is_ignored() {
    let chart_events = [ChartEvent::note(0, 10.0), ChartEvent::note(1, 10.25)];
    let (mut session, _) = start(&no_preroll(), &chart_events, 2);
    let reports = run_frames(&mut session, 0.0, 5.1);
    let later = reports
        .iter()
        .flat_map(|r| r.spawned.iter())
        .find(|s| s.beat == 10.25)
        .copied()
        .unwrap();

    session.queue_input(InputEdge::strike(later.id, 5.1));
    let report = step_to(&mut session, 5.1);
    assert!(!report.events.iter().any(|e| matches!(e, JudgeEvent::Hit(_))));
    let closest = session.closest_target().unwrap();
    assert_eq!(closest.beat, 10.0);

    session.queue_input(InputEdge::strike(closest.id, 5.12));
    let report = step_to(&mut session, 5.12);
    assert!(report.events.iter().any(|e| matches!(e, JudgeEvent::Hit(j) if j.grade == JudgeGrade::Late)));
    assert_eq!(session.closest_target().map(|t| t.id), Some(later.id));
}

#[test]
fn failing_delivers_summary_once() {
    let mut config = no_preroll();
    config.health.max_health = 1000;
    config.health.damage_per_miss = 500;
    let notes: Vec<_> = [2.0, 3.0, 4.0, 5.0].iter().map(|&b| ChartEvent::note(0, b)).collect();
    let (mut session, _) = start(&config, &notes, 1);

    let reports = run_frames(&mut session, 0.0, 3.0);
    assert_eq!(reports.last().and_then(|r| r.outcome), Some(SessionOutcome::Failed));
    assert_eq!(session.phase(), Phase::Finished);
    assert!(session.health().is_depleted());
    assert!(!session.clock().is_playing());

    step_to(&mut session, 4.0);
    assert_eq!(session.sink().len(), 1);
    let summary = &session.sink()[0];
    assert_eq!(summary.outcome, SessionOutcome::Failed);
    assert_eq!(summary.misses, 2);
    assert_eq!(summary.tier, DifficultyTier::Normal);
}
