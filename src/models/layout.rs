use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::garden::SunlightCondition;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacedPlant {
    pub plant_id: String,
    #[serde(rename = "type")]
    pub plant_type: String,
    /// Footprint charged against the zone when the plant was placed.
    pub footprint: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ZonePlacement {
    pub zone_id: String,
    pub area: f64,
    pub sunlight_condition: SunlightCondition,
    /// Plants in placement order.
    pub plants: Vec<PlacedPlant>,
    /// Capacity charged against the zone. Below `required_area` when a
    /// relaxed pass shrank some footprints.
    pub used_area: f64,
    /// Sum of the placed plants' full footprints at their growth stage.
    pub required_area: f64,
    pub companion_score: i32,
}

impl ZonePlacement {
    pub fn contains(&self, plant_id: &str) -> bool {
        self.plants.iter().any(|p| p.plant_id == plant_id)
    }
}

/// Zone → plants mapping, zones listed in garden order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub zones: Vec<ZonePlacement>,
}

impl Assignment {
    pub fn zone(&self, zone_id: &str) -> Option<&ZonePlacement> {
        self.zones.iter().find(|z| z.zone_id == zone_id)
    }

    /// Id of the zone holding `plant_id`, if it was placed.
    pub fn zone_of(&self, plant_id: &str) -> Option<&str> {
        self.zones
            .iter()
            .find(|z| z.contains(plant_id))
            .map(|z| z.zone_id.as_str())
    }

    pub fn placed_count(&self) -> usize {
        self.zones.iter().map(|z| z.plants.len()).sum()
    }

    pub fn used_area(&self) -> f64 {
        self.zones.iter().map(|z| z.used_area).sum()
    }

    /// Area the placed plants need at full spacing. Utilization is measured on this.
    pub fn required_area(&self) -> f64 {
        self.zones.iter().map(|z| z.required_area).sum()
    }

    pub fn companion_score(&self) -> i32 {
        self.zones.iter().map(|z| z.companion_score).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum UnplacedReason {
    /// No zone took part in the assignment.
    NoZoneAvailable,
    /// Every zone is darker than the plant needs.
    NoSunlightMatch,
    /// The footprint is larger than every zone with suitable light.
    ExceedsZoneArea,
    /// Suitable zones were full or held an incompatible plant.
    NoCompatibleCapacity,
    /// The run stopped before every zone had considered the plant.
    DeadlineExceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnplacedPlant {
    pub plant_id: String,
    #[serde(rename = "type")]
    pub plant_type: String,
    pub footprint: f64,
    pub reason: UnplacedReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum ExclusionReason {
    BelowMinimumSize,
    OverZoneLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedZone {
    pub zone_id: String,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayoutStatus {
    /// Every plant was placed.
    Succeeded,
    /// Some plants were left out or the deadline cut the run short.
    Partial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LayoutWarning {
    #[serde(rename_all = "camelCase")]
    UnplacedPlants { count: usize },
    #[serde(rename_all = "camelCase")]
    Timeout {
        deadline_ms: u64,
        incomplete_zones: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub garden_id: String,
    pub status: LayoutStatus,
    pub assignment: Assignment,
    pub unplaced: Vec<UnplacedPlant>,
    pub excluded_zones: Vec<ExcludedZone>,
    /// Percent of the garden's total area covered by placed footprints, 0-100.
    pub space_utilization: f64,
    pub target_utilization: f64,
    pub meets_target: bool,
    pub companion_score: i32,
    /// Number of assignment passes run (1, or 2 after a relaxed retry).
    pub passes: u8,
    pub warnings: Vec<LayoutWarning>,
    pub generated_at: DateTime<Utc>,
}

impl Layout {
    pub fn is_partial(&self) -> bool {
        self.status == LayoutStatus::Partial
    }

    pub fn timed_out(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, LayoutWarning::Timeout { .. }))
    }
}
