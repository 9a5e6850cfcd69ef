use log::info;

pub const MAX_HEALTH: i32 = 1000;
pub const DAMAGE_PER_MISS: i32 = 50;

/// Player health. Only misses touch it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Health {
    max: i32,
    current: i32,
    damage_per_miss: i32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(MAX_HEALTH, DAMAGE_PER_MISS)
    }
}

impl Health {
    pub fn new(max: i32, damage_per_miss: i32) -> Self {
        let max = max.max(1);
        Self { max, current: max, damage_per_miss: damage_per_miss.max(0) }
    }

    /// Applies one miss worth of damage. Returns true on the miss that
    /// empties the bar.
    pub fn apply_miss(&mut self) -> bool {
        if self.is_depleted() {
            return false;
        }
        self.current = self.current.saturating_sub(self.damage_per_miss).clamp(0, self.max);
        if self.is_depleted() {
            info!("Player has failed!");
            return true;
        }
        false
    }

    #[inline(always)]
    pub fn is_depleted(&self) -> bool {
        self.current <= 0
    }

    pub fn current(&self) -> i32 {
        self.current
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn fraction(&self) -> f64 {
        f64::from(self.current) / f64::from(self.max)
    }
}
