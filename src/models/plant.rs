use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::models::garden::SunlightCondition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Spring,
    Summer,
    #[serde(alias = "fall")]
    Autumn,
    Winter,
}

impl Season {
    /// Meteorological season for a calendar month (1-12), northern hemisphere.
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            9..=11 => Season::Autumn,
            _ => Season::Winter,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GrowthStage {
    Seedling,
    #[serde(alias = "vegetative")]
    Growing,
    Flowering,
    #[default]
    #[serde(alias = "fruiting")]
    Mature,
    Harvesting,
    /// Any stage label the optimizer does not know about.
    #[serde(other)]
    Unknown,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    pub id: String,
    #[serde(rename = "type")]
    pub plant_type: String,
    /// Footprint in area units before growth adjustment. Falls back to the
    /// `defaultSpacing` parameter when absent.
    pub spacing_requirement: Option<f64>,
    pub sunlight_needs: SunlightCondition,
    #[serde(default)]
    pub growth_stage: GrowthStage,
    #[serde(default)]
    pub companion_plants: BTreeSet<String>,
    #[serde(default)]
    pub incompatible_plants: BTreeSet<String>,
}

impl Plant {
    pub fn new(
        id: impl Into<String>,
        plant_type: impl Into<String>,
        spacing_requirement: f64,
        sunlight_needs: SunlightCondition,
    ) -> Self {
        Self {
            id: id.into(),
            plant_type: plant_type.into(),
            spacing_requirement: Some(spacing_requirement),
            sunlight_needs,
            growth_stage: GrowthStage::default(),
            companion_plants: BTreeSet::new(),
            incompatible_plants: BTreeSet::new(),
        }
    }

    pub fn with_stage(mut self, stage: GrowthStage) -> Self {
        self.growth_stage = stage;
        self
    }

    pub fn with_companion(mut self, plant_type: impl Into<String>) -> Self {
        self.companion_plants.insert(plant_type.into());
        self
    }

    pub fn with_incompatible(mut self, plant_type: impl Into<String>) -> Self {
        self.incompatible_plants.insert(plant_type.into());
        self
    }
}
