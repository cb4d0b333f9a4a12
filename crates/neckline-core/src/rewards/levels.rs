//! Level threshold table.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One entry of the level table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Level {
    pub number: u32,
    /// Total XP needed to reach this level
    pub xp_required: u64,
    /// Coins paid once when the level is reached
    pub coins_reward: u64,
    pub title: String,
    pub description: String,
}

/// Immutable, validated level table.
///
/// Level 1 requires 0 XP and thresholds strictly increase with the level
/// number, so the level-up loop in the ledger always terminates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelCatalog {
    levels: Vec<Level>,
}

const TITLES: [(&str, &str); 20] = [
    ("Neck Rookie", "Just getting started"),
    ("Posture Learner", "Finding your rhythm"),
    ("Stance Scout", "Tracking your habits"),
    ("Alignment Apprentice", "Noticing the gains"),
    ("Strain Slayer", "Tension is easing"),
    ("Habit Builder", "Consistency is coming"),
    ("Alignment Advocate", "Your posture inspires"),
    ("Neck Defender", "Daily moves on lock"),
    ("Posture Protector", "You catch the slouch"),
    ("Routine Hero", "No days skipped"),
    ("Balance Keeper", "Strong and centered"),
    ("Form Guardian", "Precision with every rep"),
    ("Mobility Mentor", "Sharing what works"),
    ("Core Champion", "Neck and core synced"),
    ("Focus Veteran", "Locked into progress"),
    ("Resilience Expert", "Bounce back instantly"),
    ("Discipline Master", "Habits are automatic"),
    ("Mindful Pro", "Every lift is intentional"),
    ("Posture Sage", "You teach through example"),
    ("Neck Legend", "Posture perfected"),
];

fn increment_for(number: u32) -> u64 {
    match number {
        0..=1 => 0,
        2..=5 => 100,
        6..=10 => 150,
        11..=15 => 200,
        _ => 250,
    }
}

/// The seeded 20-level table.
pub fn default_levels() -> Vec<Level> {
    let mut xp_required = 0;
    TITLES
        .iter()
        .zip(1u32..)
        .map(|((title, description), number)| {
            xp_required += increment_for(number);
            Level {
                number,
                xp_required,
                coins_reward: if number == 1 { 0 } else { 10 * u64::from(number) },
                title: (*title).to_string(),
                description: (*description).to_string(),
            }
        })
        .collect()
}

impl Default for LevelCatalog {
    fn default() -> Self {
        Self {
            levels: default_levels(),
        }
    }
}

impl LevelCatalog {
    /// Validate and wrap a level table.
    ///
    /// # Errors
    /// Returns an error if the table is empty, numbers are not `1..=n` in
    /// order, level 1 needs XP, or thresholds do not strictly increase.
    pub fn new(mut levels: Vec<Level>) -> Result<Self, ValidationError> {
        let invalid = |message: String| ValidationError::InvalidValue {
            field: "levels".to_string(),
            message,
        };

        levels.sort_by_key(|l| l.number);
        let first = levels
            .first()
            .ok_or_else(|| invalid("level table is empty".to_string()))?;
        if first.number != 1 || first.xp_required != 0 {
            return Err(invalid("level 1 must exist and require 0 XP".to_string()));
        }
        for pair in levels.windows(2) {
            if pair[1].number != pair[0].number + 1 {
                return Err(invalid(format!("level {} is missing", pair[0].number + 1)));
            }
            if pair[1].xp_required <= pair[0].xp_required {
                return Err(invalid(format!(
                    "level {} must require more XP than level {}",
                    pair[1].number, pair[0].number
                )));
            }
        }
        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn get(&self, number: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.number == number)
    }

    /// The level after `number`, if any.
    pub fn next(&self, number: u32) -> Option<&Level> {
        self.get(number + 1)
    }

    pub fn max_level(&self) -> u32 {
        self.levels.last().map_or(1, |l| l.number)
    }

    /// Largest level whose threshold is within `xp`.
    pub fn level_for_xp(&self, xp: u64) -> u32 {
        self.levels
            .iter()
            .take_while(|l| l.xp_required <= xp)
            .last()
            .map_or(1, |l| l.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_thresholds() {
        let catalog = LevelCatalog::default();
        let xp: Vec<u64> = catalog.levels().iter().map(|l| l.xp_required).collect();

        assert_eq!(xp.len(), 20);
        assert_eq!(&xp[..6], &[0, 100, 200, 300, 400, 550]);
        assert_eq!(xp[10], 1350);
        assert_eq!(xp[19], 3400);
        assert_eq!(catalog.get(1).unwrap().coins_reward, 0);
        assert_eq!(catalog.get(4).unwrap().coins_reward, 40);
        assert_eq!(catalog.get(20).unwrap().title, "Neck Legend");
    }

    #[test]
    fn level_for_xp_uses_largest_reached_threshold() {
        let catalog = LevelCatalog::default();
        assert_eq!(catalog.level_for_xp(0), 1);
        assert_eq!(catalog.level_for_xp(99), 1);
        assert_eq!(catalog.level_for_xp(100), 2);
        assert_eq!(catalog.level_for_xp(1_000_000), 20);
    }

    #[test]
    fn rejects_non_increasing_thresholds() {
        let mut levels = default_levels();
        levels[3].xp_required = levels[2].xp_required;
        assert!(LevelCatalog::new(levels).is_err());
    }

    #[test]
    fn rejects_level_one_with_xp() {
        let mut levels = default_levels();
        levels[0].xp_required = 5;
        assert!(LevelCatalog::new(levels).is_err());
        assert!(LevelCatalog::new(Vec::new()).is_err());
    }
}
