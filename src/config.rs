use configparser::ini::Ini;
use log::{info, warn};
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::game::difficulty::DifficultyTier;
use crate::game::hold::{HoldRules, MIN_HOLD_TICK_FRACTION};
use crate::game::judgment::JudgmentWindows;
use crate::game::life::{DAMAGE_PER_MISS, MAX_HEALTH};
use crate::game::scores::ScoringRules;

pub const DEFAULT_CONFIG_PATH: &str = "railsync.ini";

pub const NOTE_POOL_SIZE: usize = 1100;
pub const HOLD_POOL_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingConfig {
    /// Seconds between the start of the audio and the first beat.
    pub first_beat_offset: f64,
    pub beats_shown_in_advance: f64,
    /// Track units per beat.
    pub distance_between_notes: f64,
    pub note_spawn_adjuster: f64,
    /// Seconds of pre-roll before music starts.
    pub note_spawn_delay: f64,
    pub input_lag_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            first_beat_offset: 0.0,
            beats_shown_in_advance: 4.0,
            distance_between_notes: 2.0,
            note_spawn_adjuster: 0.0,
            note_spawn_delay: 5.0,
            input_lag_ms: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JudgmentConfig {
    pub windows: JudgmentWindows,
    pub hold: HoldRules,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthConfig {
    pub max_health: i32,
    pub damage_per_miss: i32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { max_health: MAX_HEALTH, damage_per_miss: DAMAGE_PER_MISS }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub note_pool_size: usize,
    pub hold_pool_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { note_pool_size: NOTE_POOL_SIZE, hold_pool_size: HOLD_POOL_SIZE }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub judgment: JudgmentConfig,
    pub scoring: ScoringRules,
    pub health: HealthConfig,
    pub tier: DifficultyTier,
    pub pool: PoolConfig,
}

impl GameConfig {
    /// Loads the INI at `path`. A missing file is created with defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("Config '{}' not found, creating defaults.", path.display());
            let defaults = Self::default();
            if let Err(e) = defaults.save(path) {
                warn!("Failed to write default config '{}': {}", path.display(), e);
            }
            return Ok(defaults);
        }

        let mut ini = Ini::new();
        ini.load(path).map_err(ConfigError::Ini)?;
        let config = Self::from_ini(&ini)?;
        info!("Loaded config '{}' (tier {}).", path.display(), config.tier);
        Ok(config)
    }

    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let mut ini = Ini::new();
        ini.read(text.to_string()).map_err(ConfigError::Ini)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let d = Self::default();

        let timing = TimingConfig {
            first_beat_offset: read(ini, "Timing", "FirstBeatOffset", d.timing.first_beat_offset)?,
            beats_shown_in_advance: read(ini, "Timing", "BeatsShownInAdvance", d.timing.beats_shown_in_advance)?,
            distance_between_notes: read(ini, "Timing", "DistanceBetweenNotes", d.timing.distance_between_notes)?,
            note_spawn_adjuster: read(ini, "Timing", "NoteSpawnAdjuster", d.timing.note_spawn_adjuster)?,
            note_spawn_delay: read(ini, "Timing", "NoteSpawnDelay", d.timing.note_spawn_delay)?,
            input_lag_ms: read(ini, "Timing", "InputLagMs", d.timing.input_lag_ms)?,
        };

        let w = d.judgment.windows;
        let windows = JudgmentWindows {
            hit_zone_lead: read(ini, "Judgment", "HitZoneLeadBeats", w.hit_zone_lead)?,
            hit_zone_trail: read(ini, "Judgment", "HitZoneTrailBeats", w.hit_zone_trail)?,
            early: read(ini, "Judgment", "EarlyWindowBeats", w.early)?,
            perfect: read(ini, "Judgment", "PerfectWindowBeats", w.perfect)?,
            late: read(ini, "Judgment", "LateWindowBeats", w.late)?,
        };
        let hold = HoldRules {
            tick_fraction: read(ini, "Judgment", "HoldTickFraction", d.judgment.hold.tick_fraction)?,
            release_grace: read(ini, "Judgment", "HoldReleaseGraceBeats", d.judgment.hold.release_grace)?,
        };

        let scoring = ScoringRules {
            score_per_note: read(ini, "Scoring", "ScorePerNote", d.scoring.score_per_note)?,
            score_per_hold_tick: read(ini, "Scoring", "ScorePerHoldTick", d.scoring.score_per_hold_tick)?,
            combo_multiplier: read(ini, "Scoring", "ComboMultiplier", d.scoring.combo_multiplier)?,
        };

        let health = HealthConfig {
            max_health: read(ini, "Health", "MaxHealth", d.health.max_health)?,
            damage_per_miss: read(ini, "Health", "DamagePerMiss", d.health.damage_per_miss)?,
        };

        let tier = match ini.get("Difficulty", "Tier") {
            Some(raw) => raw.parse::<DifficultyTier>()?,
            None => {
                warn!("[Difficulty] Tier missing, using {}.", d.tier);
                d.tier
            }
        };

        let pool = PoolConfig {
            note_pool_size: read(ini, "Pool", "NotePoolSize", d.pool.note_pool_size)?,
            hold_pool_size: read(ini, "Pool", "HoldPoolSize", d.pool.hold_pool_size)?,
        };

        let config = Self {
            timing,
            judgment: JudgmentConfig { windows, hold },
            scoring,
            health,
            tier,
            pool,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        let mut put = |section: &str, key: &str, value: String| {
            ini.set(section, key, Some(value));
        };
        put("Timing", "FirstBeatOffset", self.timing.first_beat_offset.to_string());
        put("Timing", "BeatsShownInAdvance", self.timing.beats_shown_in_advance.to_string());
        put("Timing", "DistanceBetweenNotes", self.timing.distance_between_notes.to_string());
        put("Timing", "NoteSpawnAdjuster", self.timing.note_spawn_adjuster.to_string());
        put("Timing", "NoteSpawnDelay", self.timing.note_spawn_delay.to_string());
        put("Timing", "InputLagMs", self.timing.input_lag_ms.to_string());

        let w = &self.judgment.windows;
        put("Judgment", "HitZoneLeadBeats", w.hit_zone_lead.to_string());
        put("Judgment", "HitZoneTrailBeats", w.hit_zone_trail.to_string());
        put("Judgment", "EarlyWindowBeats", w.early.to_string());
        put("Judgment", "PerfectWindowBeats", w.perfect.to_string());
        put("Judgment", "LateWindowBeats", w.late.to_string());
        put("Judgment", "HoldTickFraction", self.judgment.hold.tick_fraction.to_string());
        put("Judgment", "HoldReleaseGraceBeats", self.judgment.hold.release_grace.to_string());

        put("Scoring", "ScorePerNote", self.scoring.score_per_note.to_string());
        put("Scoring", "ScorePerHoldTick", self.scoring.score_per_hold_tick.to_string());
        put("Scoring", "ComboMultiplier", self.scoring.combo_multiplier.to_string());

        put("Health", "MaxHealth", self.health.max_health.to_string());
        put("Health", "DamagePerMiss", self.health.damage_per_miss.to_string());

        put("Difficulty", "Tier", self.tier.to_string());

        put("Pool", "NotePoolSize", self.pool.note_pool_size.to_string());
        put("Pool", "HoldPoolSize", self.pool.hold_pool_size.to_string());
        ini
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        self.to_ini().write(path)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.timing;
        for (key, value) in [
            ("FirstBeatOffset", t.first_beat_offset),
            ("NoteSpawnAdjuster", t.note_spawn_adjuster),
            ("InputLagMs", t.input_lag_ms),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite { key, value });
            }
        }
        if !t.distance_between_notes.is_finite() || t.distance_between_notes <= 0.0 {
            return Err(ConfigError::NonPositiveDistancePerBeat(t.distance_between_notes));
        }
        if !t.beats_shown_in_advance.is_finite() || t.beats_shown_in_advance <= 0.0 {
            return Err(ConfigError::OutOfRange { key: "BeatsShownInAdvance", value: t.beats_shown_in_advance });
        }
        let tick = self.judgment.hold.tick_fraction;
        if !tick.is_finite() || tick < MIN_HOLD_TICK_FRACTION {
            return Err(ConfigError::BadValue {
                section: "Judgment",
                key: "HoldTickFraction",
                value: tick.to_string(),
            });
        }
        for (key, value) in [
            ("NoteSpawnDelay", t.note_spawn_delay),
            ("HoldReleaseGraceBeats", self.judgment.hold.release_grace),
            ("ScorePerNote", self.scoring.score_per_note),
            ("ScorePerHoldTick", self.scoring.score_per_hold_tick),
            ("ComboMultiplier", self.scoring.combo_multiplier),
            ("DamagePerMiss", f64::from(self.health.damage_per_miss)),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::OutOfRange { key, value });
            }
        }
        if self.health.max_health <= 0 {
            return Err(ConfigError::OutOfRange { key: "MaxHealth", value: f64::from(self.health.max_health) });
        }
        self.judgment.windows.validate()?;
        if self.pool.note_pool_size == 0 {
            return Err(ConfigError::EmptyPool("notes"));
        }
        if self.pool.hold_pool_size == 0 {
            return Err(ConfigError::EmptyPool("holds"));
        }
        Ok(())
    }
}

fn read<T>(ini: &Ini, section: &'static str, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
{
    match ini.get(section, key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::BadValue { section, key, value: raw }),
        None => {
            warn!("[{}] {} missing, using default {}.", section, key, default);
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ini_yields_defaults() {
        let config = GameConfig::from_ini_str("").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.pool.note_pool_size, 1100);
        assert_eq!(config.tier, DifficultyTier::Normal);
    }

    #[test]
    fn reads_overrides() {
        let text = "[Timing]\nBeatsShownInAdvance = 6\nInputLagMs=25\n\n[Difficulty]\nTier = Expert\n\n[Pool]\nHoldPoolSize = 8\n";
        let config = GameConfig::from_ini_str(text).unwrap();
        assert_eq!(config.timing.beats_shown_in_advance, 6.0);
        assert_eq!(config.timing.input_lag_ms, 25.0);
        assert_eq!(config.tier, DifficultyTier::Expert);
        assert_eq!(config.pool.hold_pool_size, 8);
        assert_eq!(config.pool.note_pool_size, NOTE_POOL_SIZE);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            GameConfig::from_ini_str("[Timing]\nDistanceBetweenNotes = fast\n"),
            Err(ConfigError::BadValue { key: "DistanceBetweenNotes", .. })
        ));
        assert!(matches!(
            GameConfig::from_ini_str("[Timing]\nDistanceBetweenNotes = 0\n"),
            Err(ConfigError::NonPositiveDistancePerBeat(_))
        ));
        assert!(matches!(
            GameConfig::from_ini_str("[Difficulty]\nTier = Nightmare\n"),
            Err(ConfigError::UnknownTier(_))
        ));
        assert!(matches!(
            GameConfig::from_ini_str("[Pool]\nNotePoolSize = 0\n"),
            Err(ConfigError::EmptyPool("notes"))
        ));
        assert!(matches!(
            GameConfig::from_ini_str("[Judgment]\nPerfectWindowBeats = 0.5\n"),
            Err(ConfigError::InvalidWindows(_))
        ));
    }

    #[test]
    fn hold_tick_fraction_has_a_floor() {
        for raw in ["1e-300", "0.005", "0", "-0.25", "inf"] {
            let text = format!("[Judgment]\nHoldTickFraction = {raw}\n");
            assert!(matches!(
                GameConfig::from_ini_str(&text),
                Err(ConfigError::BadValue { section: "Judgment", key: "HoldTickFraction", .. })
            ));
        }
        let config = GameConfig::from_ini_str("[Judgment]\nHoldTickFraction = 0.01\n").unwrap();
        assert_eq!(config.judgment.hold.tick_fraction, 0.01);
    }

    #[test]
    fn written_ini_reads_back() {
        let mut config = GameConfig::default();
        config.tier = DifficultyTier::Hard;
        config.timing.input_lag_ms = 12.5;
        let text = config.to_ini().writes();
        assert_eq!(GameConfig::from_ini_str(&text).unwrap(), config);
    }

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = std::env::temp_dir().join(format!("railsync-config-{}", std::process::id()));
        let path = dir.join("railsync.ini");
        let _ = fs::remove_file(&path);

        let config = GameConfig::load(&path).unwrap();
        assert_eq!(config, GameConfig::default());
        assert!(path.exists());
        assert_eq!(GameConfig::load(&path).unwrap(), config);

        let _ = fs::remove_dir_all(&dir);
    }
}
