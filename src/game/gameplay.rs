use log::{debug, info, warn};
use serde::Serialize;

use crate::config::GameConfig;
use crate::core::audio::AudioClock;
use crate::core::input::{InputAction, InputEdge, InputQueue, KeyState};
use crate::core::pool::Pool;
use crate::error::ConfigError;
use crate::game::chart::Chart;
use crate::game::difficulty::DifficultyModel;
use crate::game::hold::{HoldJudge, HoldRules};
use crate::game::judgment::{JudgeEvent, JudgeGrade, JudgmentWindows};
use crate::game::lane::{Lane, Spawn, SpawnContext};
use crate::game::life::Health;
use crate::game::note::{HoldNote, Note};
use crate::game::pattern::MovementPatternGenerator;
use crate::game::scores::{ScoreEngine, SessionSummary};
use crate::game::scroll::TrackScroll;
use crate::game::targets::{Target, TargetSet};
use crate::game::timing::BeatClock;

pub const FEEDBACK_SHOW_SECONDS: f64 = 0.2;
pub const FEEDBACK_FADE_SECONDS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionOutcome {
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the music start timer.
    PreRoll,
    Playing,
    Paused,
    Finished,
}

/// Receives the end-of-session aggregate. Called exactly once per session.
pub trait StatsSink {
    fn record(&mut self, summary: &SessionSummary);
}

impl StatsSink for Vec<SessionSummary> {
    fn record(&mut self, summary: &SessionSummary) {
        self.push(summary.clone());
    }
}

/// Last judgment shown to the player: fully visible for a while, then fading.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Feedback {
    grade: Option<JudgeGrade>,
    show_timer: f64,
    fade_timer: f64,
}

impl Feedback {
    pub fn show(&mut self, grade: JudgeGrade) {
        self.grade = Some(grade);
        self.show_timer = FEEDBACK_SHOW_SECONDS;
        self.fade_timer = FEEDBACK_FADE_SECONDS;
    }

    pub fn tick(&mut self, dt: f64) {
        if self.grade.is_none() {
            return;
        }
        let mut left = dt.max(0.0);
        let shown = left.min(self.show_timer);
        self.show_timer -= shown;
        left -= shown;
        self.fade_timer = (self.fade_timer - left).max(0.0);
        if self.show_timer <= 0.0 && self.fade_timer <= 0.0 {
            self.grade = None;
        }
    }

    /// Grade on display and its opacity in 0..=1.
    pub fn current(&self) -> Option<(JudgeGrade, f64)> {
        let grade = self.grade?;
        if self.show_timer > 0.0 {
            return Some((grade, 1.0));
        }
        Some((grade, (self.fade_timer / FEEDBACK_FADE_SECONDS).clamp(0.0, 1.0)))
    }
}

/// What one call to [`Session::update`] did.
#[derive(Debug, Clone)]
pub struct FrameReport {
    pub phase: Phase,
    pub beat: f64,
    pub spawned: Vec<Spawn>,
    pub events: Vec<JudgeEvent>,
    pub outcome: Option<SessionOutcome>,
}

/// One play-through of a chart. Owns every rhythm component and drives them
/// in a fixed order once per frame.
pub struct Session<C: AudioClock, S: StatsSink> {
    config: GameConfig,
    clock: C,
    sink: S,
    phase: Phase,

    // --- Timing ---
    beat_clock: BeatClock,
    scroll: TrackScroll,
    input_lag_beats: f64,
    music_start_at: f64,
    preroll_remaining: Option<f64>,
    last_dsp_time: f64,

    // --- Entities ---
    lanes: Vec<Lane>,
    notes: Pool<Note>,
    holds: Pool<HoldNote>,
    targets: TargetSet,
    next_id: u64,

    // --- Player state ---
    generator: MovementPatternGenerator,
    difficulty: DifficultyModel,
    score: ScoreEngine,
    health: Health,
    keys: KeyState,
    pending_edges: InputQueue,
    feedback: Feedback,

    outcome: Option<SessionOutcome>,
    summary: Option<SessionSummary>,
    log_timer: f64,
}

impl<C: AudioClock, S: StatsSink> Session<C, S> {
    pub fn new(config: &GameConfig, chart: Chart, clock: C, sink: S, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        let timing = &config.timing;
        let beat_clock = BeatClock::new(chart.bpm, timing.first_beat_offset)?;
        let scroll = TrackScroll::new(
            timing.distance_between_notes,
            chart.bpm,
            timing.note_spawn_adjuster,
            timing.note_spawn_delay,
        )?;
        let notes = Pool::new("notes", config.pool.note_pool_size)?;
        let holds = Pool::new("holds", config.pool.hold_pool_size)?;

        info!(
            "Initializing session: {} lanes, {} notes, {} holds at {:.2} BPM, tier {}.",
            chart.lanes.len(),
            chart.note_count(),
            chart.hold_count(),
            chart.bpm,
            config.tier
        );

        let lanes: Vec<Lane> = chart.lanes.into_iter().enumerate().map(|(id, lane)| Lane::new(id, lane)).collect();
        let input_lag_beats = beat_clock.seconds_to_beats(timing.input_lag_ms / 1000.0);
        let now = clock.dsp_time();
        let music_start_at = now + timing.note_spawn_delay;
        info!("Starting music with a preroll delay of {:.2}s", timing.note_spawn_delay);

        Ok(Self {
            config: *config,
            phase: Phase::PreRoll,
            beat_clock,
            scroll,
            input_lag_beats,
            music_start_at,
            preroll_remaining: None,
            last_dsp_time: now,
            keys: KeyState::new(lanes.len()),
            lanes,
            notes,
            holds,
            targets: TargetSet::default(),
            next_id: 0,
            generator: MovementPatternGenerator::new(seed),
            difficulty: DifficultyModel::new(config.tier),
            score: ScoreEngine::new(config.scoring),
            health: Health::new(config.health.max_health, config.health.damage_per_miss),
            pending_edges: InputQueue::default(),
            feedback: Feedback::default(),
            outcome: None,
            summary: None,
            log_timer: 0.0,
            clock,
            sink,
        })
    }

    /// Queues a raw input edge for the next frame.
    pub fn queue_input(&mut self, edge: InputEdge) {
        self.pending_edges.push(edge);
    }

    /// Runs one frame: clock, scheduling, judgment, input, scoring.
    /// `input_enabled` is false while the surrounding application has a menu
    /// open; queued input is discarded then.
    pub fn update(&mut self, input_enabled: bool) -> FrameReport {
        let now = self.clock.dsp_time();
        let delta_time = (now - self.last_dsp_time).max(0.0);
        self.last_dsp_time = now;

        let mut report = FrameReport {
            phase: self.phase,
            beat: self.beat_clock.current_beat(),
            spawned: Vec::new(),
            events: Vec::new(),
            outcome: self.outcome,
        };

        match self.phase {
            Phase::Finished => return report,
            Phase::Paused => {
                self.drop_pending_input("paused");
                return report;
            }
            Phase::PreRoll => {
                if now < self.music_start_at {
                    self.drop_pending_input("pre-roll");
                    return report;
                }
                self.clock.play();
                self.beat_clock.start(now);
                self.phase = Phase::Playing;
            }
            Phase::Playing => {}
        }

        // --- Clock ---
        let previous_beat = self.beat_clock.current_beat();
        let beat = self.beat_clock.advance(now);
        let motion_dt = (beat - previous_beat).max(0.0) * self.beat_clock.sec_per_beat();

        let windows: JudgmentWindows = self.config.judgment.windows;
        let rules: HoldRules = self.config.judgment.hold;
        let judge = HoldJudge { windows: &windows, rules: &rules, input_lag_beats: self.input_lag_beats };

        // --- Scheduling ---
        for lane in &mut self.lanes {
            let mut ctx = SpawnContext {
                notes: &mut self.notes,
                holds: &mut self.holds,
                targets: &mut self.targets,
                generator: &mut self.generator,
                difficulty: &self.difficulty,
                combo: self.score.combo(),
                scroll: &self.scroll,
                lookahead: self.config.timing.beats_shown_in_advance,
                next_id: &mut self.next_id,
            };
            lane.schedule(beat, &mut ctx, &mut report.spawned);
        }

        // --- Zones ---
        let events = &mut report.events;
        for lane in &self.lanes {
            lane.update_notes(beat, motion_dt, &windows, &mut self.notes, &mut self.targets, events);
            lane.update_hold_zones(beat, &judge, &mut self.holds, self.keys.is_down(lane.id()));
        }

        // --- Input ---
        if input_enabled {
            while let Some(edge) = self.pending_edges.pop() {
                let event_beat = self.beat_clock.beat_at(edge.timestamp).min(beat);
                self.process_input_edge(edge, event_beat, &judge, events);
            }
        } else {
            self.drop_pending_input("input disabled");
        }

        // --- Holds ---
        for lane in &self.lanes {
            lane.update_holds(beat, &judge, &mut self.holds, events);
        }

        for lane in &mut self.lanes {
            lane.sweep(&mut self.notes, &mut self.holds);
        }

        // --- Scoring ---
        let mut failed = false;
        for event in events.iter() {
            match *event {
                JudgeEvent::Hit(judgment) => {
                    self.score.hit(judgment.grade, judgment.offbeat);
                    self.feedback.show(judgment.grade);
                }
                JudgeEvent::HoldCompleted(judgment) => {
                    self.score.hold_completed(judgment.offbeat);
                    self.feedback.show(JudgeGrade::Perfect);
                }
                JudgeEvent::HoldTick { .. } => self.score.add_hold_tick(),
                JudgeEvent::Miss { .. } | JudgeEvent::HoldMissed { .. } => {
                    self.score.miss();
                    self.feedback.show(JudgeGrade::Miss);
                    if self.health.apply_miss() {
                        failed = true;
                        break;
                    }
                }
                JudgeEvent::BeatFlash { .. } => {}
            }
        }

        self.feedback.tick(delta_time);

        self.log_timer += delta_time;
        if self.log_timer >= 1.0 {
            let active: usize = self.lanes.iter().map(Lane::active_count).sum();
            info!(
                "Beat: {:.2}, Time: {:.2}, Combo: {}, Misses: {}, Active Notes: {}",
                beat,
                now - self.music_start_at,
                self.score.combo().current,
                self.score.misses(),
                active
            );
            self.log_timer -= 1.0;
        }

        if failed {
            self.clock.stop();
            self.finish(SessionOutcome::Failed);
        } else if !self.clock.is_playing() {
            info!("Music stopped. Session complete.");
            self.finish(SessionOutcome::Completed);
        }

        report.phase = self.phase;
        report.beat = beat;
        report.outcome = self.outcome;
        report
    }

    fn process_input_edge(
        &mut self,
        edge: InputEdge,
        event_beat: f64,
        judge: &HoldJudge<'_>,
        events: &mut Vec<JudgeEvent>,
    ) {
        match edge.action {
            InputAction::Strike { target } => {
                let Some(closest) = self.targets.closest() else {
                    debug!("Strike at beat {:.3} with no candidate.", event_beat);
                    return;
                };
                if closest.id != target {
                    debug!("Strike for {:?} ignored; closest is {:?}.", target, closest.id);
                    return;
                }
                let Some(note) = self.notes.get_mut(closest.handle) else { return; };
                if let Some(judgment) = note.strike(event_beat, self.input_lag_beats, judge.windows) {
                    self.targets.remove(closest.id, closest.beat);
                    events.push(JudgeEvent::Hit(judgment));
                }
            }
            InputAction::Press { lane } => {
                let Some(l) = self.lanes.get(lane) else {
                    warn!("Press on unknown lane {}.", lane);
                    return;
                };
                let was_down = self.keys.is_down(lane);
                self.keys.set(lane, true);
                if !was_down {
                    l.press(event_beat, judge, &mut self.holds);
                }
            }
            InputAction::Release { lane } => {
                let Some(l) = self.lanes.get(lane) else {
                    warn!("Release on unknown lane {}.", lane);
                    return;
                };
                self.keys.set(lane, false);
                l.release(event_beat, judge, &mut self.holds, events);
            }
        }
    }

    fn drop_pending_input(&mut self, reason: &str) {
        let dropped = self.pending_edges.clear();
        if dropped > 0 {
            debug!("Dropped {} input edge(s): {}.", dropped, reason);
        }
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        if self.outcome.is_some() {
            return;
        }
        self.phase = Phase::Finished;
        self.outcome = Some(outcome);
        let summary = self.score.summary(self.difficulty.tier(), outcome);
        info!(
            "Session {:?}: score {:.1}, highest combo {}, {} hits, {} misses.",
            outcome, summary.score, summary.highest_combo, summary.hits, summary.misses
        );
        self.sink.record(&summary);
        self.summary = Some(summary);
    }

    /// Freezes the beat. During pre-roll the music start timer is suspended.
    pub fn pause(&mut self) {
        let now = self.clock.dsp_time();
        match self.phase {
            Phase::Playing => {
                self.clock.pause();
                self.beat_clock.pause(now);
                self.phase = Phase::Paused;
            }
            Phase::PreRoll => {
                self.preroll_remaining = Some((self.music_start_at - now).max(0.0));
                self.phase = Phase::Paused;
                info!("Paused during pre-roll.");
            }
            Phase::Paused | Phase::Finished => {}
        }
    }

    pub fn resume(&mut self) {
        if self.phase != Phase::Paused {
            return;
        }
        let now = self.clock.dsp_time();
        if let Some(remaining) = self.preroll_remaining.take() {
            self.music_start_at = now + remaining;
            self.phase = Phase::PreRoll;
            info!("Pre-roll resumed; music in {:.2}s.", remaining);
            return;
        }
        self.clock.unpause();
        self.beat_clock.resume(now);
        self.phase = Phase::Playing;
    }

    /// The single note a strike may resolve against right now.
    pub fn closest_target(&self) -> Option<Target> {
        self.targets.closest()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn beat(&self) -> f64 {
        self.beat_clock.current_beat()
    }

    pub fn beat_clock(&self) -> &BeatClock {
        &self.beat_clock
    }

    pub fn music_start_at(&self) -> f64 {
        self.music_start_at
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn note_pool(&self) -> &Pool<Note> {
        &self.notes
    }

    pub fn hold_pool(&self) -> &Pool<HoldNote> {
        &self.holds
    }

    pub fn score(&self) -> &ScoreEngine {
        &self.score
    }

    pub fn health(&self) -> &Health {
        &self.health
    }

    pub fn difficulty(&self) -> &DifficultyModel {
        &self.difficulty
    }

    pub fn feedback(&self) -> &Feedback {
        &self.feedback
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::audio::ManualClock;
    use crate::game::chart::ChartEvent;

    fn config(delay: f64) -> GameConfig {
        let mut config = GameConfig::default();
        config.timing.note_spawn_delay = delay;
        config
    }

    fn session(delay: f64, events: &[ChartEvent], clock: ManualClock) -> Session<ManualClock, Vec<SessionSummary>> {
        let chart = Chart::from_events(120.0, Some(2), events).unwrap();
        Session::new(&config(delay), chart, clock, Vec::new(), 3).unwrap()
    }

    #[test]
    fn nothing_spawns_during_pre_roll() {
        let mut s = session(5.0, &[ChartEvent::note(0, 1.0)], ManualClock::new(0.0));
        s.clock_mut().advance_to(4.9);
        let report = s.update(true);
        assert_eq!(report.phase, Phase::PreRoll);
        assert!(report.spawned.is_empty());
        assert!(!s.beat_clock().is_started());

        s.clock_mut().advance_to(5.0);
        let report = s.update(true);
        assert_eq!(report.phase, Phase::Playing);
        assert_eq!(report.spawned.len(), 1);
        assert!(s.clock().is_playing());
    }

    #[test]
    fn pause_during_pre_roll_delays_music() {
        let mut s = session(5.0, &[], ManualClock::new(0.0));
        s.clock_mut().advance_to(2.0);
        s.pause();
        assert_eq!(s.phase(), Phase::Paused);
        s.clock_mut().advance_to(10.0);
        s.resume();
        assert_eq!(s.phase(), Phase::PreRoll);
        assert!((s.music_start_at() - 13.0).abs() < 1e-9);

        s.clock_mut().advance_to(12.9);
        assert_eq!(s.update(true).phase, Phase::PreRoll);
        s.clock_mut().advance_to(13.0);
        assert_eq!(s.update(true).phase, Phase::Playing);
    }

    #[test]
    fn disabled_input_is_discarded() {
        let mut s = session(0.0, &[ChartEvent::note(0, 2.0)], ManualClock::new(0.0));
        s.update(true);
        s.clock_mut().advance_to(1.0);
        s.update(true);
        let target = s.closest_target().unwrap();

        s.queue_input(InputEdge::strike(target.id, 1.0));
        let report = s.update(false);
        assert!(report.events.iter().all(|e| !matches!(e, JudgeEvent::Hit(_))));
        assert_eq!(s.closest_target().map(|t| t.id), Some(target.id));
    }

    #[test]
    fn song_end_completes_once() {
        let mut s = session(0.0, &[], ManualClock::new(0.0).with_song_length(3.0));
        s.update(true);
        s.clock_mut().advance(3.0);
        let report = s.update(true);
        assert_eq!(report.outcome, Some(SessionOutcome::Completed));
        assert_eq!(s.phase(), Phase::Finished);
        s.update(true);
        assert_eq!(s.sink().len(), 1);
        assert_eq!(s.sink()[0].outcome, SessionOutcome::Completed);
    }

    #[test]
    fn feedback_shows_then_fades() {
        let mut feedback = Feedback::default();
        assert_eq!(feedback.current(), None);
        feedback.show(JudgeGrade::Late);
        feedback.tick(0.1);
        assert_eq!(feedback.current(), Some((JudgeGrade::Late, 1.0)));
        feedback.tick(0.15);
        let (grade, alpha) = feedback.current().unwrap();
        assert_eq!(grade, JudgeGrade::Late);
        assert!((alpha - 0.5).abs() < 1e-9);
        feedback.tick(0.06);
        assert_eq!(feedback.current(), None);
    }
}
