//! Engine configuration with documented defaults
//!
//! Values mirror what a player-facing config file exposes. The struct
//! deserializes from TOML with every field optional, falling back to the
//! defaults below.

use std::path::Path;

use ahash::AHashMap;
use serde::Deserialize;

/// Configuration for the shadow-actor engine
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Age in days at which a minor is promoted to a proxy actor
    ///
    /// The default of 83 covers the host's full infant progression
    /// (14 newborn / 14 baby / 28 crawler / 28 toddler) before the swap.
    pub promotion_age_days: u32,

    /// HHMM-coded time of day at which proxies head home for the night
    ///
    /// Default 2100 (9 pm), one hour before the host puts adult household
    /// members to bed.
    pub curfew_time: u16,

    /// When true, proxies start the day at their assigned bed slot.
    /// Otherwise they are placed at a random open point in the home.
    pub start_in_bed: bool,

    /// Explicit minor -> guardian name pairs
    ///
    /// Takes precedence over the owning player's current partner, so a
    /// minor can keep a guardian the player has since separated from.
    pub guardian_pairs: AHashMap<String, String>,

    /// Guardian name used when no pair is configured and the owning
    /// player has no current partner
    pub fallback_guardian: String,

    /// Whether proxies wander the home location between schedule stops
    pub wandering_enabled: bool,

    /// Whether the curfew return is enforced at all
    pub curfew_enabled: bool,

    /// Whether the administrative text-command surface is exposed
    pub admin_commands: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            promotion_age_days: 83,
            curfew_time: 2100,
            start_in_bed: true,
            guardian_pairs: AHashMap::new(),
            fallback_guardian: "Caretaker".to_string(),
            wandering_enabled: true,
            curfew_enabled: true,
            admin_commands: false,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        let config: EngineConfig = toml::from_str(&content)
            .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.promotion_age_days == 0 {
            return Err("promotion_age_days must be positive".into());
        }

        // The host clock runs 0600..2600 on hundred-per-hour encoding
        if !(600..=2600).contains(&self.curfew_time) || self.curfew_time % 100 >= 60 {
            return Err(format!(
                "curfew_time ({}) must be an HHMM value between 0600 and 2600",
                self.curfew_time
            ));
        }

        if self.fallback_guardian.trim().is_empty() {
            return Err("fallback_guardian must not be empty".into());
        }

        Ok(())
    }
}
