use crate::error::{OptimizationError, Result};
use crate::models::{
    params::OptimizationParams,
    plant::{GrowthStage, Plant, Season},
};

/// Share of its full spacing a plant occupies at each growth stage.
pub const GROWTH_STAGE_MULTIPLIERS: [(GrowthStage, f64); 6] = [
    (GrowthStage::Seedling, 0.3),
    (GrowthStage::Growing, 0.6),
    (GrowthStage::Flowering, 0.8),
    (GrowthStage::Mature, 1.0),
    (GrowthStage::Harvesting, 1.0),
    (GrowthStage::Unknown, 0.5),
];

/// Growth expected over the season for plants that are not yet full size.
pub const SEASONAL_FACTORS: [(Season, f64); 4] = [
    (Season::Spring, 1.25),
    (Season::Summer, 1.10),
    (Season::Autumn, 1.0),
    (Season::Winter, 0.9),
];

const UNKNOWN_STAGE_MULTIPLIER: f64 = 0.5;

pub fn stage_multiplier(stage: GrowthStage) -> f64 {
    GROWTH_STAGE_MULTIPLIERS
        .iter()
        .find(|(s, _)| *s == stage)
        .map(|(_, m)| *m)
        .unwrap_or(UNKNOWN_STAGE_MULTIPLIER)
}

pub fn seasonal_factor(season: Season) -> f64 {
    SEASONAL_FACTORS
        .iter()
        .find(|(s, _)| *s == season)
        .map(|(_, f)| *f)
        .unwrap_or(1.0)
}

/// Computes the exclusive area a plant needs inside a zone.
///
/// footprint = spacing × stage multiplier (season-adjusted when a season is
/// set) + access buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpacingCalculator {
    access_buffer: f64,
    default_spacing: f64,
    season: Option<Season>,
}

impl SpacingCalculator {
    pub fn new(access_buffer: f64, default_spacing: f64) -> Self {
        Self {
            access_buffer,
            default_spacing,
            season: None,
        }
    }

    /// Builds a calculator from call parameters. The season is only applied
    /// when seasonal adjustments are enabled and a season has been resolved.
    pub fn from_params(params: &OptimizationParams) -> Self {
        let calculator = Self::new(params.access_buffer, params.default_spacing);
        match (params.seasonal_adjustments, params.season) {
            (true, Some(season)) => calculator.with_season(season),
            _ => calculator,
        }
    }

    pub fn with_season(mut self, season: Season) -> Self {
        self.season = Some(season);
        self
    }

    pub fn access_buffer(&self) -> f64 {
        self.access_buffer
    }

    /// Explicit spacing, or the default when the plant carries none.
    pub fn base_spacing(&self, plant: &Plant) -> Result<f64> {
        let spacing = plant.spacing_requirement.unwrap_or(self.default_spacing);
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(OptimizationError::InvalidParameter(format!(
                "plant '{}' has a non-positive spacing requirement ({spacing})",
                plant.id
            )));
        }
        Ok(spacing)
    }

    pub fn multiplier(&self, stage: GrowthStage) -> f64 {
        let base = stage_multiplier(stage);
        match self.season {
            Some(season) if base < 1.0 => (base * seasonal_factor(season)).min(1.0),
            _ => base,
        }
    }

    pub fn required_footprint(&self, plant: &Plant) -> Result<f64> {
        self.footprint_at(plant, plant.growth_stage)
    }

    /// Footprint of `plant` as if it were at `stage`. Pass `GrowthStage::Mature`
    /// for worst-case capacity planning.
    pub fn footprint_at(&self, plant: &Plant, stage: GrowthStage) -> Result<f64> {
        let spacing = self.base_spacing(plant)?;
        Ok(spacing * self.multiplier(stage) + self.access_buffer)
    }
}

impl Default for SpacingCalculator {
    fn default() -> Self {
        Self::from_params(&OptimizationParams::default())
    }
}
