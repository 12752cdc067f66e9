use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;

use crate::models::plant::Season;

pub const DEFAULT_TARGET_UTILIZATION: f64 = 92.0;
pub const DEFAULT_MIN_ZONE_SIZE: f64 = 4.0;
pub const DEFAULT_SPACING: f64 = 1.0;
pub const DEFAULT_SPACING_SLACK: f64 = 0.15;
pub const DEFAULT_ACCESS_BUFFER: f64 = 0.25;
pub const DEFAULT_DEADLINE_MS: u64 = 3000;
/// Largest fraction of a footprint the relaxed pass may shave off.
pub const MAX_SPACING_SLACK: f64 = 0.5;

/// How zones are ranked when several of them could take the same plant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ZoneBalancing {
    /// Zones in declaration order, each capped at its fair share of the demand.
    Equal,
    /// Largest zones first.
    #[default]
    Optimal,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationParams {
    /// Minimum desired utilization, in percent.
    pub target_utilization: f64,
    /// Zones smaller than this are left out of the assignment.
    pub min_zone_size: f64,
    /// Spacing used for plants that carry no explicit requirement.
    pub default_spacing: f64,
    /// Cap on the number of zones considered, in garden order.
    pub max_zone_count: Option<usize>,
    pub companion_planting_enabled: bool,
    pub zone_balancing: ZoneBalancing,
    pub seasonal_adjustments: bool,
    /// Season for seasonal adjustments; the current UTC season when absent.
    pub season: Option<Season>,
    pub allow_second_pass: bool,
    /// Fraction of the footprint released by the relaxed second pass.
    pub spacing_slack: f64,
    /// Maintenance-access area added to every plant footprint.
    pub access_buffer: f64,
    pub deadline_ms: u64,
    /// Overrides the engine's cache time-to-live for this call.
    pub cache_ttl_secs: Option<u64>,
}

impl Default for OptimizationParams {
    fn default() -> Self {
        Self {
            target_utilization: DEFAULT_TARGET_UTILIZATION,
            min_zone_size: DEFAULT_MIN_ZONE_SIZE,
            default_spacing: DEFAULT_SPACING,
            max_zone_count: None,
            companion_planting_enabled: true,
            zone_balancing: ZoneBalancing::default(),
            seasonal_adjustments: false,
            season: None,
            allow_second_pass: false,
            spacing_slack: DEFAULT_SPACING_SLACK,
            access_buffer: DEFAULT_ACCESS_BUFFER,
            deadline_ms: DEFAULT_DEADLINE_MS,
            cache_ttl_secs: None,
        }
    }
}

impl OptimizationParams {
    pub fn with_target_utilization(mut self, percent: f64) -> Self {
        self.target_utilization = percent;
        self
    }

    pub fn with_min_zone_size(mut self, size: f64) -> Self {
        self.min_zone_size = size;
        self
    }

    pub fn with_max_zone_count(mut self, count: usize) -> Self {
        self.max_zone_count = Some(count);
        self
    }

    pub fn with_zone_balancing(mut self, balancing: ZoneBalancing) -> Self {
        self.zone_balancing = balancing;
        self
    }

    pub fn with_season(mut self, season: Season) -> Self {
        self.seasonal_adjustments = true;
        self.season = Some(season);
        self
    }

    pub fn with_second_pass(mut self, slack: f64) -> Self {
        self.allow_second_pass = true;
        self.spacing_slack = slack;
        self
    }

    pub fn with_access_buffer(mut self, buffer: f64) -> Self {
        self.access_buffer = buffer;
        self
    }

    pub fn with_deadline_ms(mut self, ms: u64) -> Self {
        self.deadline_ms = ms;
        self
    }

    /// Hashes every field that can change the computed layout.
    /// `deadline_ms` and `cache_ttl_secs` are excluded: they bound the run, not its result.
    pub fn hash_result_inputs<H: Hasher>(&self, state: &mut H) {
        self.target_utilization.to_bits().hash(state);
        self.min_zone_size.to_bits().hash(state);
        self.default_spacing.to_bits().hash(state);
        self.max_zone_count.hash(state);
        self.companion_planting_enabled.hash(state);
        self.zone_balancing.hash(state);
        self.seasonal_adjustments.hash(state);
        self.season.hash(state);
        self.allow_second_pass.hash(state);
        self.spacing_slack.to_bits().hash(state);
        self.access_buffer.to_bits().hash(state);
    }
}
