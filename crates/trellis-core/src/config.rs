//! Session tuning knobs.

use crate::error::CoordError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_REPUTATION_ALPHA: f64 = 0.2;
pub const DEFAULT_INITIAL_REPUTATION: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoordinationConfig {
    /// How long a proposed operation stays in flight for conflict checks.
    /// `None` keeps it in flight until it is committed or aborted.
    #[serde(with = "window_secs", skip_serializing_if = "Option::is_none")]
    pub conflict_window: Option<Duration>,
    /// EMA smoothing constant for reputation updates.
    pub reputation_alpha: f64,
    /// Reputation assigned to a newly registered agent.
    pub initial_reputation: f64,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            conflict_window: None,
            reputation_alpha: DEFAULT_REPUTATION_ALPHA,
            initial_reputation: DEFAULT_INITIAL_REPUTATION,
        }
    }
}

impl CoordinationConfig {
    pub fn with_conflict_window(mut self, window: Duration) -> Self {
        self.conflict_window = Some(window);
        self
    }

    pub fn validate(&self) -> Result<(), CoordError> {
        if !(self.reputation_alpha > 0.0 && self.reputation_alpha <= 1.0) {
            return Err(CoordError::InvalidConfig(format!(
                "reputationAlpha must be in (0, 1], got {}",
                self.reputation_alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.initial_reputation) {
            return Err(CoordError::InvalidConfig(format!(
                "initialReputation must be in [0, 1], got {}",
                self.initial_reputation
            )));
        }
        Ok(())
    }
}

mod window_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_secs))
    }
}
