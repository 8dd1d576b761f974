use serde::{Deserialize, Serialize};

use crate::zone::{validate_zone_set, RiskZone, ZoneError};

/// An uploaded picture together with its annotated risk zones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameImage {
    pub id: String,
    pub name: String,
    /// Base64 payload or URL. Opaque to the game logic.
    #[serde(default)]
    pub image_data: String,
    /// Authoring order is hit-test precedence.
    #[serde(default)]
    pub risk_zones: Vec<RiskZone>,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

impl GameImage {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        image_data: impl Into<String>,
        now: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_data: image_data.into(),
            risk_zones: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the whole zone set after checking id uniqueness.
    pub fn set_risk_zones(&mut self, zones: Vec<RiskZone>, now: u64) -> Result<(), ZoneError> {
        validate_zone_set(&zones)?;
        self.risk_zones = zones;
        self.updated_at = now;
        Ok(())
    }

    /// Copy under a new id. Zones get fresh ids so the copy never shares
    /// found-risk credit with the original.
    pub fn duplicate(&self, id: impl Into<String>, now: u64) -> Self {
        Self {
            id: id.into(),
            name: format!("{} (Copy)", self.name),
            image_data: self.image_data.clone(),
            risk_zones: self.risk_zones.iter().map(RiskZone::with_new_id).collect(),
            created_at: now,
            updated_at: now,
        }
    }
}
