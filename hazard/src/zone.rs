//! Risk zones and the hit-tester.
//!
//! Zones are stored as loosely typed documents (`type` tag plus a flat
//! `coordinates` list). Deserialization goes through [`ZoneDocument`] so a
//! [`RiskZone`] in memory always carries a validated [`Shape`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Shape, ShapeError, ShapeKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// An annotated hazard on an image. Immutable once attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ZoneDocument", into = "ZoneDocument")]
pub struct RiskZone {
    pub id: String,
    pub shape: Shape,
    pub description: String,
    pub difficulty: Difficulty,
    /// Awarded once per zone per session.
    pub points: u32,
    pub explanation: String,
}

impl RiskZone {
    pub fn contains(&self, point: Point) -> bool {
        self.shape.contains(point)
    }

    /// Same zone under a fresh id, used when an image is duplicated.
    pub fn with_new_id(&self) -> Self {
        Self {
            id: new_zone_id(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ZoneError {
    #[error("zone {id}: {source}")]
    Shape {
        id: String,
        #[source]
        source: ShapeError,
    },
    #[error("zone id must not be empty")]
    EmptyId,
    #[error("duplicate zone id: {0}")]
    DuplicateId(String),
}

/// Document form of a zone, as persisted and sent over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ZoneDocument {
    #[serde(default = "new_zone_id")]
    id: String,
    #[serde(rename = "type")]
    kind: ShapeKind,
    coordinates: Vec<f64>,
    description: String,
    difficulty: Difficulty,
    #[serde(default = "default_points")]
    points: u32,
    #[serde(default)]
    explanation: String,
}

fn new_zone_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_points() -> u32 {
    1
}

impl TryFrom<ZoneDocument> for RiskZone {
    type Error = ZoneError;

    fn try_from(doc: ZoneDocument) -> Result<Self, Self::Error> {
        if doc.id.trim().is_empty() {
            return Err(ZoneError::EmptyId);
        }
        let shape = Shape::from_coordinates(doc.kind, &doc.coordinates).map_err(|source| {
            ZoneError::Shape {
                id: doc.id.clone(),
                source,
            }
        })?;
        Ok(Self {
            id: doc.id,
            shape,
            description: doc.description,
            difficulty: doc.difficulty,
            points: doc.points,
            explanation: doc.explanation,
        })
    }
}

impl From<RiskZone> for ZoneDocument {
    fn from(zone: RiskZone) -> Self {
        Self {
            kind: zone.shape.kind(),
            coordinates: zone.shape.to_coordinates(),
            id: zone.id,
            description: zone.description,
            difficulty: zone.difficulty,
            points: zone.points,
            explanation: zone.explanation,
        }
    }
}

/// Return the first zone, in authoring order, whose shape contains `point`.
///
/// Overlapping zones are resolved purely by position in `zones`; the earlier
/// zone always wins.
pub fn hit_test(point: Point, zones: &[RiskZone]) -> Option<&RiskZone> {
    zones.iter().find(|zone| zone.contains(point))
}

/// Check the per-image invariant that zone ids are unique.
pub fn validate_zone_set(zones: &[RiskZone]) -> Result<(), ZoneError> {
    let mut seen = HashSet::with_capacity(zones.len());
    for zone in zones {
        if !seen.insert(zone.id.as_str()) {
            return Err(ZoneError::DuplicateId(zone.id.clone()));
        }
    }
    Ok(())
}
