use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::input::LaneId;
use crate::error::{ChartError, ConfigError};

/// Timestamps closer than this many beats are treated as the same note.
pub const DUPLICATE_EPSILON: f64 = 1e-4;
/// Upper bound on lanes a chart may declare or reference.
pub const MAX_LANES: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChartEvent {
    pub beat: f64,
    pub lane: LaneId,
    #[serde(default)]
    pub hold: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_beat: Option<f64>,
}

impl ChartEvent {
    pub fn note(lane: LaneId, beat: f64) -> Self {
        Self { beat, lane, hold: false, end_beat: None }
    }

    pub fn hold(lane: LaneId, start: f64, end: f64) -> Self {
        Self { beat: start, lane, hold: true, end_beat: Some(end) }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChartFile {
    pub bpm: f64,
    #[serde(default)]
    pub lanes: Option<usize>,
    pub events: Vec<ChartEvent>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HoldSpan {
    pub start: f64,
    pub end: f64,
}

impl HoldSpan {
    pub fn duration_beats(&self) -> f64 {
        self.end - self.start
    }

    pub fn center(&self) -> f64 {
        (self.start + self.end) * 0.5
    }
}

/// Sorted, de-duplicated timestamps for one lane. Never mutated after load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LaneChart {
    pub notes: Vec<f64>,
    pub holds: Vec<HoldSpan>,
}

#[derive(Clone, Debug)]
pub struct Chart {
    pub bpm: f64,
    pub lanes: Vec<LaneChart>,
}

impl Chart {
    pub fn load(path: &Path) -> Result<Self, ChartError> {
        let text = fs::read_to_string(path)?;
        let chart = Self::from_json_str(&text)?;
        info!(
            "Loaded chart '{}' ({} lanes, {} notes, {} holds).",
            path.display(),
            chart.lanes.len(),
            chart.note_count(),
            chart.hold_count()
        );
        Ok(chart)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ChartError> {
        let file: ChartFile = serde_json::from_str(text)?;
        Ok(Self::from_events(file.bpm, file.lanes, &file.events)?)
    }

    /// Splits events into per-lane lists. Duplicates and bad hold ranges are
    /// logged and dropped; only a bad BPM is fatal.
    pub fn from_events(
        bpm: f64,
        lane_count: Option<usize>,
        events: &[ChartEvent],
    ) -> Result<Self, ConfigError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(ConfigError::NonPositiveBpm(bpm));
        }
        let declared = match lane_count {
            Some(n) if n > MAX_LANES => {
                warn!("Chart declares {} lanes; capping at {}.", n, MAX_LANES);
                Some(MAX_LANES)
            }
            other => other,
        };
        let needed = events
            .iter()
            .filter(|e| e.lane < MAX_LANES)
            .map(|e| e.lane + 1)
            .max()
            .unwrap_or(0);
        let count = declared.unwrap_or(needed).max(needed);
        let mut lanes = vec![LaneChart::default(); count];

        for event in events {
            if event.lane >= MAX_LANES {
                warn!(
                    "Skipping event at beat {:.3}: lane {} is beyond the {} lane limit.",
                    event.beat, event.lane, MAX_LANES
                );
                continue;
            }
            if !event.beat.is_finite() {
                warn!("Skipping event with non-finite beat in lane {}.", event.lane);
                continue;
            }
            let lane = &mut lanes[event.lane];
            if event.hold {
                match event.end_beat {
                    Some(end) if end.is_finite() && end > event.beat => {
                        lane.holds.push(HoldSpan { start: event.beat, end });
                    }
                    other => warn!(
                        "Skipping hold in lane {} at beat {:.3}: end beat {:?} does not follow start.",
                        event.lane, event.beat, other
                    ),
                }
            } else {
                lane.notes.push(event.beat);
            }
        }

        for (idx, lane) in lanes.iter_mut().enumerate() {
            lane.notes.sort_by(f64::total_cmp);
            lane.notes.dedup_by(|later, kept| {
                let dup = (*later - *kept).abs() < DUPLICATE_EPSILON;
                if dup {
                    info!("Dropping duplicate note at beat {:.4} in lane {}.", later, idx);
                }
                dup
            });

            // Stable sort, so the first hold listed at a start beat is the one kept.
            lane.holds.sort_by(|a, b| a.start.total_cmp(&b.start));
            lane.holds.dedup_by(|later, kept| {
                let dup = (later.start - kept.start).abs() < DUPLICATE_EPSILON;
                if dup {
                    info!(
                        "Dropping duplicate hold {:.4}..{:.4} in lane {}.",
                        later.start, later.end, idx
                    );
                }
                dup
            });
        }

        Ok(Self { bpm, lanes })
    }

    pub fn note_count(&self) -> usize {
        self.lanes.iter().map(|l| l.notes.len()).sum()
    }

    pub fn hold_count(&self) -> usize {
        self.lanes.iter().map(|l| l.holds.len()).sum()
    }

    /// Beat of the last thing in the chart, hold ends included.
    pub fn last_beat(&self) -> f64 {
        self.lanes
            .iter()
            .flat_map(|l| l.notes.iter().copied().chain(l.holds.iter().map(|h| h.end)))
            .fold(0.0, f64::max)
    }
}
