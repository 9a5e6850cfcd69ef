use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::game::scores::ComboState;

pub const MIN_MOVEMENT_DISTANCE: f64 = 0.1;
pub const MAX_MOVEMENT_DISTANCE: f64 = 5.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum DifficultyTier {
    Easy,
    #[default]
    Normal,
    Hard,
    Expert,
}

impl fmt::Display for DifficultyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DifficultyTier::Easy => "Easy",
            DifficultyTier::Normal => "Normal",
            DifficultyTier::Hard => "Hard",
            DifficultyTier::Expert => "Expert",
        };
        f.write_str(name)
    }
}

impl FromStr for DifficultyTier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(DifficultyTier::Easy),
            "normal" => Ok(DifficultyTier::Normal),
            "hard" => Ok(DifficultyTier::Hard),
            "expert" => Ok(DifficultyTier::Expert),
            _ => Err(ConfigError::UnknownTier(s.trim().to_string())),
        }
    }
}

/// Motion coefficients fixed per tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierParams {
    pub speed_increment_per_hit: f64,
    pub max_speed_multiplier: f64,
    pub max_movement_multiplier: f64,
    pub movement_increment_per_hit: f64,
    pub default_movement_speed: f64,
    pub default_movement_distance: f64,
    /// Notes hit after a miss before difficulty is fully restored.
    pub catch_up_duration: u32,
}

impl DifficultyTier {
    pub fn params(self) -> TierParams {
        let (inc, max_speed, max_move, move_inc, speed, distance, catch_up) = match self {
            DifficultyTier::Easy => (0.01, 2.5, 1.5, 0.01, 0.1, 1.0, 20),
            DifficultyTier::Normal => (0.01, 3.1, 2.7, 0.1, 0.1, 1.0, 15),
            DifficultyTier::Hard => (0.1, 4.4, 3.1, 0.1, 0.3, 1.2, 8),
            DifficultyTier::Expert => (0.2, 4.9, 7.0, 0.15, 0.5, 1.6, 6),
        };
        TierParams {
            speed_increment_per_hit: inc,
            max_speed_multiplier: max_speed,
            max_movement_multiplier: max_move,
            movement_increment_per_hit: move_inc,
            default_movement_speed: speed,
            default_movement_distance: distance,
            catch_up_duration: catch_up,
        }
    }
}

/// Maps combo to note motion. Chosen once per session.
#[derive(Debug, Clone, Copy)]
pub struct DifficultyModel {
    tier: DifficultyTier,
    params: TierParams,
}

impl DifficultyModel {
    pub fn new(tier: DifficultyTier) -> Self {
        Self { tier, params: tier.params() }
    }

    pub fn with_params(tier: DifficultyTier, params: TierParams) -> Self {
        Self { tier, params }
    }

    pub fn tier(&self) -> DifficultyTier {
        self.tier
    }

    pub fn params(&self) -> &TierParams {
        &self.params
    }

    /// Current combo, except right after a miss: then it ramps linearly from
    /// 0 back up to the highest combo over `catch_up_duration` notes. With no
    /// combo ever built there is nothing to ramp towards.
    pub fn effective_combo(&self, combo: &ComboState) -> u32 {
        if !combo.has_missed || combo.highest == 0 {
            return combo.current;
        }
        let window = self.params.catch_up_duration;
        if window > 0 && combo.notes_since_miss < window {
            let progress = (f64::from(combo.notes_since_miss) / f64::from(window)).clamp(0.0, 1.0);
            return (f64::from(combo.highest) * progress).round() as u32;
        }
        combo.current.max(combo.highest)
    }

    pub fn speed_multiplier(&self, combo: &ComboState) -> f64 {
        let eff = f64::from(self.effective_combo(combo));
        (1.0 + self.params.speed_increment_per_hit * eff).min(self.params.max_speed_multiplier)
    }

    pub fn distance_multiplier(&self, combo: &ComboState) -> f64 {
        let eff = f64::from(self.effective_combo(combo));
        (1.0 + self.params.movement_increment_per_hit * eff).min(self.params.max_movement_multiplier)
    }

    pub fn movement_speed(&self, combo: &ComboState) -> f64 {
        self.params.default_movement_speed * self.speed_multiplier(combo)
    }

    pub fn movement_distance(&self, combo: &ComboState) -> f64 {
        (self.params.default_movement_distance * self.distance_multiplier(combo))
            .clamp(MIN_MOVEMENT_DISTANCE, MAX_MOVEMENT_DISTANCE)
    }
}
