use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Datelike, Utc};
use log::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{OptimizationError, Result};
use crate::logic::{
    assigner::{
        select_zones, size_and_sort, AssignmentOutcome, Relaxation, ZoneAssigner, ZoneWorkerPool,
    },
    cache::{LayoutCache, LayoutKey},
    spacing::SpacingCalculator,
    utilization::{evaluate, improves_on, should_retry, UtilizationReport},
};
use crate::models::{
    garden::{Garden, MAX_GARDEN_AREA, MIN_GARDEN_AREA},
    layout::{
        Assignment, ExcludedZone, Layout, LayoutStatus, LayoutWarning, UnplacedPlant,
        UnplacedReason, ZonePlacement,
    },
    params::{OptimizationParams, MAX_SPACING_SLACK},
    plant::{Plant, Season},
};

/// Slack allowed when comparing summed zone areas with the garden area.
const AREA_TOLERANCE: f64 = 1e-9;

/// How long a caller waits past its deadline for a run that stops at that
/// deadline to hand back its partial placements.
const JOIN_GRACE: Duration = Duration::from_millis(25);

/// Lifecycle of one optimization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Computing { pass: u8 },
    Retrying,
    Succeeded,
    Partial,
    Failed,
}

impl RunState {
    fn advance(self, garden_id: &str, next: RunState) -> RunState {
        debug!("layout run for garden '{garden_id}': {self:?} -> {next:?}");
        next
    }
}

/// Why a run produced nothing worth caching.
#[derive(Debug)]
enum RunFailure {
    Failed(Arc<OptimizationError>),
    /// The deadline cut the run short; the partial layout goes back to the
    /// caller but is not memoized.
    TimedOut(Layout),
}

impl From<OptimizationError> for RunFailure {
    fn from(err: OptimizationError) -> Self {
        RunFailure::Failed(Arc::new(err))
    }
}

fn check(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(OptimizationError::InvalidInput(message()))
    }
}

/// Rejects garden, plant and parameter values the engine cannot work with.
pub fn validate_input(garden: &Garden, plants: &[Plant], params: &OptimizationParams) -> Result<()> {
    check(!garden.id.trim().is_empty(), || "garden id must not be empty".into())?;
    check(
        garden.total_area.is_finite()
            && (MIN_GARDEN_AREA..=MAX_GARDEN_AREA).contains(&garden.total_area),
        || {
            format!(
                "garden area {} is outside [{MIN_GARDEN_AREA}, {MAX_GARDEN_AREA}]",
                garden.total_area
            )
        },
    )?;
    check(!garden.zones.is_empty(), || {
        format!("garden '{}' has no zones", garden.id)
    })?;

    let mut zone_ids = HashSet::new();
    for zone in &garden.zones {
        check(zone.area.is_finite() && zone.area > 0.0, || {
            format!("zone '{}' has a non-positive area ({})", zone.id, zone.area)
        })?;
        check(zone_ids.insert(zone.id.as_str()), || {
            format!("zone id '{}' appears more than once", zone.id)
        })?;
    }
    let zoned = garden.zoned_area();
    check(zoned <= garden.total_area + AREA_TOLERANCE, || {
        format!(
            "zones cover {zoned} area units but the garden only has {}",
            garden.total_area
        )
    })?;

    let mut plant_ids = HashSet::new();
    for plant in plants {
        check(plant_ids.insert(plant.id.as_str()), || {
            format!("plant id '{}' appears more than once", plant.id)
        })?;
        if let Some(spacing) = plant.spacing_requirement {
            check(spacing.is_finite() && spacing > 0.0, || {
                format!("plant '{}' has a non-positive spacing ({spacing})", plant.id)
            })?;
        }
    }

    check(
        params.target_utilization.is_finite()
            && params.target_utilization > 0.0
            && params.target_utilization <= 100.0,
        || {
            format!(
                "targetUtilization {} must be within (0, 100]",
                params.target_utilization
            )
        },
    )?;
    check(
        params.min_zone_size.is_finite() && params.min_zone_size >= 0.0,
        || format!("minZoneSize {} must be >= 0", params.min_zone_size),
    )?;
    check(
        params.default_spacing.is_finite() && params.default_spacing > 0.0,
        || format!("defaultSpacing {} must be > 0", params.default_spacing),
    )?;
    check(params.max_zone_count != Some(0), || {
        "maxZoneCount must be at least 1".into()
    })?;
    check(
        (0.0..=MAX_SPACING_SLACK).contains(&params.spacing_slack),
        || {
            format!(
                "spacingSlack {} must be within [0, {MAX_SPACING_SLACK}]",
                params.spacing_slack
            )
        },
    )?;
    check(
        params.access_buffer.is_finite() && params.access_buffer >= 0.0,
        || format!("accessBuffer {} must be >= 0", params.access_buffer),
    )?;
    Ok(())
}

/// Fills in values the caller left to the engine. Seasonal adjustments
/// without an explicit season use the season of `now`.
pub fn resolve_params(params: &OptimizationParams, now: DateTime<Utc>) -> OptimizationParams {
    let mut resolved = params.clone();
    if resolved.seasonal_adjustments && resolved.season.is_none() {
        resolved.season = Some(Season::from_month(now.month()));
    }
    resolved
}

fn build_layout(
    garden: &Garden,
    outcome: AssignmentOutcome,
    excluded_zones: Vec<ExcludedZone>,
    report: UtilizationReport,
    passes: u8,
    params: &OptimizationParams,
) -> Layout {
    let mut warnings = Vec::new();
    if outcome.timed_out {
        warnings.push(LayoutWarning::Timeout {
            deadline_ms: params.deadline_ms,
            incomplete_zones: outcome.incomplete_zones,
        });
    }
    if !outcome.unplaced.is_empty() {
        warnings.push(LayoutWarning::UnplacedPlants {
            count: outcome.unplaced.len(),
        });
    }
    let status = if warnings.is_empty() {
        LayoutStatus::Succeeded
    } else {
        LayoutStatus::Partial
    };
    Layout {
        garden_id: garden.id.clone(),
        status,
        companion_score: outcome.assignment.companion_score(),
        assignment: outcome.assignment,
        unplaced: outcome.unplaced,
        excluded_zones,
        space_utilization: report.percent,
        target_utilization: report.target,
        meets_target: report.meets_target(),
        passes,
        warnings,
        generated_at: Utc::now(),
    }
}

/// Layout for a caller whose deadline passed before any run finished for it:
/// nothing placed and every plant `DeadlineExceeded`.
fn deadline_layout(garden: &Garden, plants: &[Plant], params: &OptimizationParams) -> Result<Layout> {
    let spacing = SpacingCalculator::from_params(params);
    let (zones, excluded) = select_zones(&garden.zones, params);
    let unplaced = size_and_sort(plants, &spacing, Relaxation::None)?
        .into_iter()
        .map(|sized| UnplacedPlant {
            plant_id: sized.plant.id,
            plant_type: sized.plant.plant_type,
            footprint: sized.footprint,
            reason: UnplacedReason::DeadlineExceeded,
        })
        .collect();
    let assignment = Assignment {
        zones: zones
            .iter()
            .map(|zone| ZonePlacement {
                zone_id: zone.id.clone(),
                area: zone.area,
                sunlight_condition: zone.sunlight_condition,
                plants: vec![],
                used_area: 0.0,
                required_area: 0.0,
                companion_score: 0,
            })
            .collect(),
    };
    let report = evaluate(&assignment, garden.total_area, params.target_utilization);
    let outcome = AssignmentOutcome {
        assignment,
        unplaced,
        timed_out: true,
        incomplete_zones: zones.len(),
    };
    Ok(build_layout(garden, outcome, excluded, report, 0, params))
}

/// Entry point of the optimizer: validates input, consults the layout cache
/// and runs the zone assignment when needed.
#[derive(Clone, Default)]
pub struct LayoutEngine {
    assigner: ZoneAssigner,
    cache: LayoutCache,
}

impl LayoutEngine {
    pub fn new(cache: LayoutCache, pool: ZoneWorkerPool) -> Self {
        Self {
            assigner: ZoneAssigner::new(pool),
            cache,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(
            LayoutCache::new(config.cache_capacity, config.cache_ttl),
            ZoneWorkerPool::new(config.worker_pool_size),
        )
    }

    pub fn cache(&self) -> &LayoutCache {
        &self.cache
    }

    pub fn pool_size(&self) -> usize {
        self.assigner.pool_size()
    }

    /// Drops every cached layout of a garden, e.g. after its zones changed.
    pub fn invalidate_garden(&self, garden_id: &str) {
        self.cache.invalidate_garden(garden_id);
    }

    /// Computes (or reuses) the layout for `garden` and `plants`.
    ///
    /// `deadlineMs` bounds the whole call, including time spent waiting on a
    /// computation another caller started for the same inputs. A run cut
    /// short by the deadline still returns `Ok`: the layout is `Partial` and
    /// carries a `Timeout` warning. Such layouts are not cached, and a caller
    /// with time left computes again rather than take another caller's
    /// timed-out layout.
    pub async fn compute_layout(
        &self,
        garden: &Garden,
        plants: &[Plant],
        params: &OptimizationParams,
    ) -> Result<Layout> {
        validate_input(garden, plants, params)?;
        let params = resolve_params(params, Utc::now());
        let key = LayoutKey::new(garden, plants, &params);
        let ttl = params.cache_ttl_secs.map(Duration::from_secs);
        let deadline = Instant::now() + Duration::from_millis(params.deadline_ms);
        let give_up_at = tokio::time::Instant::from_std(deadline + JOIN_GRACE);

        loop {
            let lookup = self.cache.get_or_compute(
                key.clone(),
                ttl,
                self.run(garden, plants, &params, deadline),
            );
            let computed = match tokio::time::timeout_at(give_up_at, lookup).await {
                Ok(computed) => computed,
                Err(_) => {
                    warn!(
                        "layout for garden '{}' not ready within its {} ms deadline",
                        garden.id, params.deadline_ms
                    );
                    return deadline_layout(garden, plants, &params);
                }
            };
            match computed {
                Ok(layout) => return Ok(Layout::clone(&layout)),
                Err(failure) => match failure.as_ref() {
                    // A shorter deadline cut the shared run short; this caller has time left.
                    RunFailure::TimedOut(_) if Instant::now() < deadline => {
                        debug!(
                            "shared run for garden '{}' timed out early, computing again",
                            garden.id
                        );
                    }
                    RunFailure::TimedOut(layout) => return Ok(layout.clone()),
                    RunFailure::Failed(err) => {
                        return Err(OptimizationError::CacheComputation(Arc::clone(err)))
                    }
                },
            }
        }
    }

    /// Same as [`compute_layout`](Self::compute_layout) without touching the cache.
    pub async fn compute_layout_uncached(
        &self,
        garden: &Garden,
        plants: &[Plant],
        params: &OptimizationParams,
    ) -> Result<Layout> {
        validate_input(garden, plants, params)?;
        let params = resolve_params(params, Utc::now());
        let deadline = Instant::now() + Duration::from_millis(params.deadline_ms);
        match self.run(garden, plants, &params, deadline).await {
            Ok(layout) | Err(RunFailure::TimedOut(layout)) => Ok(layout),
            Err(RunFailure::Failed(err)) => Err(Arc::try_unwrap(err)
                .unwrap_or_else(OptimizationError::CacheComputation)),
        }
    }

    async fn run(
        &self,
        garden: &Garden,
        plants: &[Plant],
        params: &OptimizationParams,
        deadline: Instant,
    ) -> std::result::Result<Layout, RunFailure> {
        let started = Instant::now();
        let mut state = RunState::Pending.advance(&garden.id, RunState::Computing { pass: 1 });

        let spacing = SpacingCalculator::from_params(params);
        let (zones, excluded) = select_zones(&garden.zones, params);
        if !excluded.is_empty() {
            debug!(
                "garden '{}': {} zone(s) left out of the assignment",
                garden.id,
                excluded.len()
            );
        }

        let first = match self
            .assigner
            .assign(
                &zones,
                plants,
                &spacing,
                params.zone_balancing,
                Relaxation::None,
                deadline,
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                state.advance(&garden.id, RunState::Failed);
                return Err(err.into());
            }
        };
        let mut report = evaluate(&first.assignment, garden.total_area, params.target_utilization);
        let mut best = first;
        let mut passes = 1;

        if should_retry(&report, &best, params, passes) && Instant::now() < deadline {
            state = state
                .advance(&garden.id, RunState::Retrying)
                .advance(&garden.id, RunState::Computing { pass: 2 });
            let relaxed = match self
                .assigner
                .assign(
                    &zones,
                    plants,
                    &spacing,
                    params.zone_balancing,
                    Relaxation::for_retry(params),
                    deadline,
                )
                .await
            {
                Ok(outcome) => outcome,
                Err(err) => {
                    state.advance(&garden.id, RunState::Failed);
                    return Err(err.into());
                }
            };
            passes = 2;
            let relaxed_report =
                evaluate(&relaxed.assignment, garden.total_area, params.target_utilization);
            if improves_on((&relaxed, &relaxed_report), (&best, &report)) {
                best = relaxed;
                report = relaxed_report;
            }
        }

        let timed_out = best.timed_out;
        let layout = build_layout(garden, best, excluded, report, passes, params);
        let terminal = if layout.is_partial() {
            RunState::Partial
        } else {
            RunState::Succeeded
        };
        state.advance(&garden.id, terminal);

        info!(
            "layout for garden '{}': {} placed, {} unplaced, {:.1}% utilization, {} pass(es), {} ms",
            garden.id,
            layout.assignment.placed_count(),
            layout.unplaced.len(),
            layout.space_utilization,
            passes,
            started.elapsed().as_millis()
        );
        if timed_out {
            warn!(
                "layout for garden '{}' exceeded its {} ms deadline",
                garden.id, params.deadline_ms
            );
            return Err(RunFailure::TimedOut(layout));
        }
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::garden::{SunlightCondition::FullSun, Zone};
    use chrono::TimeZone;

    fn garden() -> Garden {
        Garden::new("g", 100.0, vec![Zone::new("z", 100.0, FullSun)])
    }

    fn tomato() -> Plant {
        Plant::new("tomato", "tomato", 4.0, FullSun)
    }

    fn rejects(garden: &Garden, plants: &[Plant], params: &OptimizationParams) -> bool {
        matches!(
            validate_input(garden, plants, params),
            Err(OptimizationError::InvalidInput(_))
        )
    }

    #[test]
    fn test_valid_input_passes() {
        assert!(validate_input(&garden(), &[tomato()], &OptimizationParams::default()).is_ok());
    }

    #[test]
    fn test_garden_area_bounds() {
        let params = OptimizationParams::default();
        for area in [0.5, 1000.5, f64::NAN] {
            let mut g = garden();
            g.total_area = area;
            g.zones[0].area = 0.5;
            assert!(rejects(&g, &[], &params), "area {area} must be rejected");
        }
        let mut edge = garden();
        edge.total_area = 1000.0;
        assert!(!rejects(&edge, &[], &params));
    }

    #[test]
    fn test_garden_without_zones_is_rejected() {
        let g = Garden::new("g", 10.0, vec![]);
        assert!(rejects(&g, &[], &OptimizationParams::default()));
    }

    #[test]
    fn test_zones_larger_than_garden_are_rejected() {
        let g = Garden::new(
            "g",
            10.0,
            vec![Zone::new("a", 6.0, FullSun), Zone::new("b", 6.0, FullSun)],
        );
        assert!(rejects(&g, &[], &OptimizationParams::default()));
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let g = Garden::new(
            "g",
            20.0,
            vec![Zone::new("a", 6.0, FullSun), Zone::new("a", 6.0, FullSun)],
        );
        assert!(rejects(&g, &[], &OptimizationParams::default()));
        assert!(rejects(&garden(), &[tomato(), tomato()], &OptimizationParams::default()));
    }

    #[test]
    fn test_non_positive_spacing_is_rejected() {
        let mut p = tomato();
        p.spacing_requirement = Some(0.0);
        assert!(rejects(&garden(), &[p], &OptimizationParams::default()));
    }

    #[test]
    fn test_out_of_range_params_are_rejected() {
        let g = garden();
        let base = OptimizationParams::default();
        assert!(rejects(&g, &[], &base.clone().with_target_utilization(0.0)));
        assert!(rejects(&g, &[], &base.clone().with_target_utilization(120.0)));
        assert!(rejects(&g, &[], &base.clone().with_max_zone_count(0)));
        assert!(rejects(&g, &[], &base.clone().with_second_pass(0.9)));
        assert!(rejects(&g, &[], &base.clone().with_access_buffer(-1.0)));
        assert!(rejects(
            &g,
            &[],
            &OptimizationParams {
                default_spacing: 0.0,
                ..base
            }
        ));
    }

    #[test]
    fn test_resolve_params_fills_season_from_date() {
        let july = Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).unwrap();
        let params = OptimizationParams {
            seasonal_adjustments: true,
            ..OptimizationParams::default()
        };
        assert_eq!(resolve_params(&params, july).season, Some(Season::Summer));

        let explicit = OptimizationParams::default().with_season(Season::Winter);
        assert_eq!(resolve_params(&explicit, july).season, Some(Season::Winter));

        let off = OptimizationParams::default();
        assert_eq!(resolve_params(&off, july).season, None);
    }

    #[test]
    fn test_deadline_layout_defers_every_plant() {
        let plants = vec![tomato(), Plant::new("pea", "pea", 1.0, FullSun)];
        let params = OptimizationParams::default().with_deadline_ms(5);
        let layout = deadline_layout(&garden(), &plants, &params).unwrap();
        assert_eq!(layout.status, LayoutStatus::Partial);
        assert!(layout.timed_out());
        assert_eq!(layout.passes, 0);
        assert_eq!(layout.assignment.placed_count(), 0);
        assert_eq!(layout.assignment.zones.len(), 1);
        let ids: Vec<&str> = layout.unplaced.iter().map(|u| u.plant_id.as_str()).collect();
        assert_eq!(ids, vec!["tomato", "pea"]);
        assert!(layout
            .unplaced
            .iter()
            .all(|u| u.reason == UnplacedReason::DeadlineExceeded));
        assert!(layout.warnings.contains(&LayoutWarning::UnplacedPlants { count: 2 }));
    }

    #[tokio::test]
    async fn test_compute_layout_fails_fast_on_invalid_input() {
        let engine = LayoutEngine::default();
        let err = engine
            .compute_layout(&Garden::new("g", 0.0, vec![]), &[], &OptimizationParams::default())
            .await
            .unwrap_err();
        assert!(err.is_input_error());
        assert_eq!(engine.cache().entry_count(), 0);
    }
}
