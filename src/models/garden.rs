use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::models::{Dimensions, Position};

/// Smallest and largest garden area accepted by the optimizer, in area units.
pub const MIN_GARDEN_AREA: f64 = 1.0;
pub const MAX_GARDEN_AREA: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SunlightCondition {
    FullSun,
    PartialShade,
    FullShade,
}

impl SunlightCondition {
    /// Relative amount of direct light; brighter conditions rank higher.
    pub fn light_level(self) -> u8 {
        match self {
            SunlightCondition::FullSun => 2,
            SunlightCondition::PartialShade => 1,
            SunlightCondition::FullShade => 0,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub area: f64,
    pub sunlight_condition: SunlightCondition,
    pub position: Option<Position>,
    pub dimensions: Option<Dimensions>,
}

impl Zone {
    pub fn new(id: impl Into<String>, area: f64, sunlight_condition: SunlightCondition) -> Self {
        Self {
            id: id.into(),
            area,
            sunlight_condition,
            position: None,
            dimensions: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Garden {
    pub id: String,
    pub total_area: f64,
    /// Zones in declaration order; the order is significant for claim priority.
    pub zones: Vec<Zone>,
}

impl Garden {
    pub fn new(id: impl Into<String>, total_area: f64, zones: Vec<Zone>) -> Self {
        Self {
            id: id.into(),
            total_area,
            zones,
        }
    }

    /// Sum of all declared zone areas.
    pub fn zoned_area(&self) -> f64 {
        self.zones.iter().map(|z| z.area).sum()
    }
}
