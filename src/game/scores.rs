use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;

use crate::game::difficulty::DifficultyTier;
use crate::game::gameplay::SessionOutcome;
use crate::game::judgment::JudgeGrade;

pub const SCORE_PER_NOTE: f64 = 10.0;
pub const SCORE_PER_HOLD_TICK: f64 = 10.0;
pub const COMBO_MULTIPLIER: f64 = 1.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComboState {
    pub current: u32,
    /// Never decreases within a session.
    pub highest: u32,
    pub notes_since_miss: u32,
    pub has_missed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringRules {
    pub score_per_note: f64,
    pub score_per_hold_tick: f64,
    pub combo_multiplier: f64,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            score_per_note: SCORE_PER_NOTE,
            score_per_hold_tick: SCORE_PER_HOLD_TICK,
            combo_multiplier: COMBO_MULTIPLIER,
        }
    }
}

/// What a miss cost. Handed to the health collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissPenalty {
    pub combo_lost: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    rules: ScoringRules,
    combo: ComboState,
    score: f64,
    early_hits: u32,
    perfect_hits: u32,
    late_hits: u32,
    misses: u32,
    hold_ticks: u32,
    holds_completed: u32,
    offbeats: Vec<f64>,
}

impl ScoreEngine {
    pub fn new(rules: ScoringRules) -> Self {
        Self { rules, ..Self::default() }
    }

    /// Credits a judged hit and returns the points it was worth.
    pub fn hit(&mut self, grade: JudgeGrade, offbeat: f64) -> f64 {
        debug_assert!(grade != JudgeGrade::Miss, "misses go through ScoreEngine::miss");
        match grade {
            JudgeGrade::Early => self.early_hits = self.early_hits.saturating_add(1),
            JudgeGrade::Perfect => self.perfect_hits = self.perfect_hits.saturating_add(1),
            JudgeGrade::Late => self.late_hits = self.late_hits.saturating_add(1),
            JudgeGrade::Miss => {
                self.miss();
                return 0.0;
            }
        }
        self.combo.current = self.combo.current.saturating_add(1);
        self.combo.notes_since_miss = self.combo.notes_since_miss.saturating_add(1);
        self.combo.highest = self.combo.highest.max(self.combo.current);
        self.offbeats.push(offbeat);

        let gained = (self.rules.score_per_note * f64::from(self.combo.current) * self.rules.combo_multiplier).max(0.0);
        self.score += gained;
        debug!("{:?} hit, combo {}, +{:.1} (score {:.1}).", grade, self.combo.current, gained, self.score);
        gained
    }

    /// A finished hold counts exactly once, as a Perfect hit.
    pub fn hold_completed(&mut self, offbeat: f64) -> f64 {
        self.holds_completed = self.holds_completed.saturating_add(1);
        self.hit(JudgeGrade::Perfect, offbeat)
    }

    pub fn miss(&mut self) -> MissPenalty {
        let combo_lost = self.combo.current;
        self.misses = self.misses.saturating_add(1);
        self.combo.current = 0;
        self.combo.notes_since_miss = 0;
        self.combo.has_missed = true;
        info!("Miss! Combo {} lost ({} misses).", combo_lost, self.misses);
        MissPenalty { combo_lost }
    }

    pub fn add_hold_tick(&mut self) {
        self.hold_ticks = self.hold_ticks.saturating_add(1);
        self.score += self.rules.score_per_hold_tick.max(0.0);
    }

    pub fn combo(&self) -> &ComboState {
        &self.combo
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn hits(&self) -> u32 {
        self.early_hits + self.perfect_hits + self.late_hits
    }

    pub fn count(&self, grade: JudgeGrade) -> u32 {
        match grade {
            JudgeGrade::Early => self.early_hits,
            JudgeGrade::Perfect => self.perfect_hits,
            JudgeGrade::Late => self.late_hits,
            JudgeGrade::Miss => self.misses,
        }
    }

    pub fn offbeats(&self) -> &[f64] {
        &self.offbeats
    }

    pub fn total_judged(&self) -> u32 {
        self.hits() + self.misses
    }

    /// Share of all judged notes, 0..=100.
    pub fn percentage(&self, count: u32) -> f64 {
        let total = self.total_judged();
        if total == 0 {
            return 0.0;
        }
        f64::from(count) / f64::from(total) * 100.0
    }

    /// Share of successful hits, 0..=100. Misses are not counted.
    pub fn hit_share(&self, count: u32) -> f64 {
        let hits = self.hits();
        if hits == 0 {
            return 0.0;
        }
        f64::from(count) / f64::from(hits) * 100.0
    }

    pub fn average_offbeat(&self) -> Option<f64> {
        if self.offbeats.is_empty() {
            return None;
        }
        Some(self.offbeats.iter().sum::<f64>() / self.offbeats.len() as f64)
    }

    pub fn summary(&self, tier: DifficultyTier, outcome: SessionOutcome) -> SessionSummary {
        SessionSummary {
            outcome,
            tier,
            score: self.score,
            highest_combo: self.combo.highest,
            total_notes: self.total_judged(),
            hits: self.hits(),
            misses: self.misses,
            early_hits: self.early_hits,
            perfect_hits: self.perfect_hits,
            late_hits: self.late_hits,
            holds_completed: self.holds_completed,
            hold_ticks: self.hold_ticks,
            hit_percentage: self.percentage(self.hits()),
            miss_percentage: self.percentage(self.misses),
            early_percentage: self.hit_share(self.early_hits),
            perfect_percentage: self.hit_share(self.perfect_hits),
            late_percentage: self.hit_share(self.late_hits),
            average_offbeat: self.average_offbeat(),
            recorded_at: Utc::now(),
        }
    }
}

/// End-of-session aggregate handed to the stats sink.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub outcome: SessionOutcome,
    pub tier: DifficultyTier,
    pub score: f64,
    pub highest_combo: u32,
    pub total_notes: u32,
    pub hits: u32,
    pub misses: u32,
    pub early_hits: u32,
    pub perfect_hits: u32,
    pub late_hits: u32,
    pub holds_completed: u32,
    pub hold_ticks: u32,
    pub hit_percentage: f64,
    pub miss_percentage: f64,
    pub early_percentage: f64,
    pub perfect_percentage: f64,
    pub late_percentage: f64,
    pub average_offbeat: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hits_build_combo_and_score() {
        let mut engine = ScoreEngine::new(ScoringRules::default());
        engine.hit(JudgeGrade::Perfect, 0.01);
        engine.hit(JudgeGrade::Early, -0.2);
        assert_eq!(engine.combo().current, 2);
        // 10 * 1 * 1.2 + 10 * 2 * 1.2
        assert!((engine.score() - 36.0).abs() < 1e-9);
        assert_eq!(engine.count(JudgeGrade::Early), 1);
        assert_eq!(engine.offbeats(), &[0.01, -0.2]);
    }

    #[test]
    fn miss_resets_combo_but_not_highest() {
        let mut engine = ScoreEngine::new(ScoringRules::default());
        engine.hit(JudgeGrade::Perfect, 0.0);
        engine.hit(JudgeGrade::Perfect, 0.0);
        let penalty = engine.miss();
        assert_eq!(penalty.combo_lost, 2);
        let combo = engine.combo();
        assert_eq!((combo.current, combo.highest, combo.notes_since_miss), (0, 2, 0));
        assert!(combo.has_missed);

        engine.hit(JudgeGrade::Late, 0.3);
        assert_eq!(engine.combo().highest, 2);
        assert_eq!(engine.combo().current, 1);
    }

    #[test]
    fn hold_completion_counts_once() {
        let mut engine = ScoreEngine::new(ScoringRules::default());
        engine.add_hold_tick();
        engine.add_hold_tick();
        engine.hold_completed(0.1);
        assert_eq!(engine.combo().current, 1);
        assert_eq!(engine.count(JudgeGrade::Perfect), 1);
        assert!((engine.score() - 32.0).abs() < 1e-9);
    }

    #[test]
    fn summary_percentages() {
        let mut engine = ScoreEngine::new(ScoringRules::default());
        engine.hit(JudgeGrade::Perfect, 0.02);
        engine.hit(JudgeGrade::Late, 0.2);
        engine.hit(JudgeGrade::Early, -0.1);
        engine.miss();
        let summary = engine.summary(DifficultyTier::Hard, SessionOutcome::Completed);
        assert_eq!(summary.total_notes, 4);
        assert!((summary.hit_percentage - 75.0).abs() < 1e-9);
        assert!((summary.miss_percentage - 25.0).abs() < 1e-9);
        assert!((summary.average_offbeat.unwrap() - 0.04).abs() < 1e-9);
        for share in [summary.early_percentage, summary.perfect_percentage, summary.late_percentage] {
            assert!((share - 100.0 / 3.0).abs() < 1e-9);
        }

        let json = summary.to_json().unwrap();
        assert!(json.contains("\"tier\": \"Hard\""));
        assert!(json.contains("\"highest_combo\": 3"));
    }

    #[test]
    fn empty_session_has_no_average() {
        let engine = ScoreEngine::new(ScoringRules::default());
        assert_eq!(engine.average_offbeat(), None);
        assert_eq!(engine.percentage(0), 0.0);
        assert_eq!(engine.hit_share(0), 0.0);
    }
}
