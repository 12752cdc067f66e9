use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_utils::Backoff;
use log::{debug, warn};
use tokio::sync::Semaphore;

use crate::error::{OptimizationError, Result};
use crate::logic::compatibility::{
    are_companions, plants_compatible, zone_accepts, zone_companion_score,
};
use crate::logic::spacing::SpacingCalculator;
use crate::models::{
    garden::Zone,
    layout::{
        Assignment, ExcludedZone, ExclusionReason, PlacedPlant, UnplacedPlant, UnplacedReason,
        ZonePlacement,
    },
    params::{OptimizationParams, ZoneBalancing},
    plant::Plant,
};

/// How an assignment pass charges footprints against zone capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Relaxation {
    /// Full footprints.
    None,
    /// Every footprint shrinks by `slack`.
    All { slack: f64 },
    /// Only a plant joining a zone that already holds one of its companions
    /// shrinks by `slack`.
    CompanionsOnly { slack: f64 },
}

impl Relaxation {
    /// Relaxation used by the second pass for the given parameters.
    pub fn for_retry(params: &OptimizationParams) -> Self {
        if params.companion_planting_enabled {
            Relaxation::CompanionsOnly {
                slack: params.spacing_slack,
            }
        } else {
            Relaxation::All {
                slack: params.spacing_slack,
            }
        }
    }

    fn slack(self) -> f64 {
        match self {
            Relaxation::None => 0.0,
            Relaxation::All { slack } | Relaxation::CompanionsOnly { slack } => slack,
        }
    }
}

/// A plant with its footprints resolved for one pass.
#[derive(Debug, Clone)]
pub struct SizedPlant {
    pub plant: Plant,
    pub footprint: f64,
    /// Footprint when the pass relaxes spacing for this plant.
    pub relaxed_footprint: f64,
}

/// Resolves footprints and sorts plants largest first, ties by id.
pub fn size_and_sort(
    plants: &[Plant],
    spacing: &SpacingCalculator,
    relaxation: Relaxation,
) -> Result<Vec<SizedPlant>> {
    let keep = 1.0 - relaxation.slack();
    let mut sized = plants
        .iter()
        .map(|plant| {
            let footprint = spacing.required_footprint(plant)?;
            Ok(SizedPlant {
                plant: plant.clone(),
                footprint,
                relaxed_footprint: footprint * keep,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    sized.sort_by(|a, b| {
        b.footprint
            .total_cmp(&a.footprint)
            .then_with(|| a.plant.id.cmp(&b.plant.id))
    });
    Ok(sized)
}

/// Splits zones into those taking part in the assignment and those left out
/// by `minZoneSize` or `maxZoneCount`. Garden order is preserved.
pub fn select_zones(zones: &[Zone], params: &OptimizationParams) -> (Vec<Zone>, Vec<ExcludedZone>) {
    let mut selected = Vec::new();
    let mut excluded = Vec::new();
    for zone in zones {
        let reason = if zone.area < params.min_zone_size {
            Some(ExclusionReason::BelowMinimumSize)
        } else if params
            .max_zone_count
            .is_some_and(|max| selected.len() >= max)
        {
            Some(ExclusionReason::OverZoneLimit)
        } else {
            None
        };
        match reason {
            Some(reason) => excluded.push(ExcludedZone {
                zone_id: zone.id.clone(),
                reason,
            }),
            None => selected.push(zone.clone()),
        }
    }
    (selected, excluded)
}

/// Zone indices ranked by claim priority: the zone at rank 0 sees every plant
/// first, rank 1 sees whatever rank 0 passed on, and so on.
pub fn claim_priority(zones: &[Zone], balancing: ZoneBalancing) -> Vec<usize> {
    let mut order: Vec<usize> = (0..zones.len()).collect();
    if balancing == ZoneBalancing::Optimal {
        order.sort_by(|&a, &b| zones[b].area.total_cmp(&zones[a].area).then(a.cmp(&b)));
    }
    order
}

/// Fair-share capacity caps for `ZoneBalancing::Equal`, indexed by zone.
/// The last-ranked zone stays uncapped. Plants no zone took under the caps
/// are offered again without them, see [`place_uncapped`].
fn fair_share_caps(
    zones: &[Zone],
    plants: &[SizedPlant],
    ranking: &[usize],
    balancing: ZoneBalancing,
) -> Vec<Option<f64>> {
    let mut caps = vec![None; zones.len()];
    if balancing != ZoneBalancing::Equal || ranking.len() < 2 {
        return caps;
    }
    let demand: f64 = plants.iter().map(|p| p.footprint).sum();
    let supply: f64 = zones.iter().map(|z| z.area).sum();
    if supply <= 0.0 {
        return caps;
    }
    let share = (demand / supply).min(1.0);
    for &zone_index in &ranking[..ranking.len() - 1] {
        caps[zone_index] = Some(zones[zone_index].area * share);
    }
    caps
}

const UNCLAIMED: usize = usize::MAX;

/// Poll interval for a zone still waiting on its predecessor once spinning gave up.
const PARKED_POLL: Duration = Duration::from_micros(50);

/// Plant index → owning zone index. A plant is claimed at most once.
#[derive(Debug)]
pub struct ClaimTable {
    owners: Vec<AtomicUsize>,
}

impl ClaimTable {
    pub fn new(plants: usize) -> Self {
        Self {
            owners: (0..plants).map(|_| AtomicUsize::new(UNCLAIMED)).collect(),
        }
    }

    /// Claims `plant` for `zone`. Returns false if another zone got there first.
    pub fn try_claim(&self, plant: usize, zone: usize) -> bool {
        self.owners[plant]
            .compare_exchange(UNCLAIMED, zone, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn owner(&self, plant: usize) -> Option<usize> {
        match self.owners[plant].load(Ordering::Acquire) {
            UNCLAIMED => None,
            zone => Some(zone),
        }
    }

    pub fn is_claimed(&self, plant: usize) -> bool {
        self.owner(plant).is_some()
    }
}

/// Bounded pool of zone workers. Zone tasks run on tokio's blocking threads;
/// the semaphore caps how many run at once.
#[derive(Debug, Clone)]
pub struct ZoneWorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl ZoneWorkerPool {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Twice the available cores.
    pub fn default_size() -> usize {
        std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1)
            * 2
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Default for ZoneWorkerPool {
    fn default() -> Self {
        Self::new(Self::default_size())
    }
}

/// State shared by the zone tasks of one pass.
struct AssignmentRun {
    plants: Vec<SizedPlant>,
    claims: ClaimTable,
    /// Per rank: how many plants (in sorted order) that zone has decided.
    progress: Vec<AtomicUsize>,
    relaxation: Relaxation,
    deadline: Instant,
}

impl AssignmentRun {
    fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Waits until the zone ranked just ahead of `rank` has decided plant
    /// `index`. Returns false if the deadline passes first.
    fn wait_for_predecessor(&self, rank: usize, index: usize) -> bool {
        if rank == 0 {
            return true;
        }
        let ahead = &self.progress[rank - 1];
        let backoff = Backoff::new();
        while ahead.load(Ordering::Acquire) <= index {
            if self.expired() {
                return false;
            }
            if backoff.is_completed() {
                std::thread::sleep(PARKED_POLL);
            } else {
                backoff.snooze();
            }
        }
        true
    }
}

struct ZoneTask {
    zone_index: usize,
    rank: usize,
    zone: Zone,
    cap: Option<f64>,
}

struct ZoneFill {
    zone_index: usize,
    /// (plant index, charged footprint) in placement order.
    placed: Vec<(usize, f64)>,
    used_area: f64,
    interrupted: bool,
}

/// Footprint to charge if `candidate` can join the zone, given what is already there.
fn admissible_footprint(
    run: &AssignmentRun,
    zone: &Zone,
    cap: Option<f64>,
    placed: &[(usize, f64)],
    candidate: &SizedPlant,
    remaining: f64,
    used: f64,
) -> Option<f64> {
    if !zone_accepts(zone, &candidate.plant) {
        return None;
    }
    let footprint = match run.relaxation {
        Relaxation::None => candidate.footprint,
        Relaxation::All { .. } => candidate.relaxed_footprint,
        Relaxation::CompanionsOnly { .. } => {
            let beside_companion = placed
                .iter()
                .any(|(i, _)| are_companions(&run.plants[*i].plant, &candidate.plant));
            if beside_companion {
                candidate.relaxed_footprint
            } else {
                candidate.footprint
            }
        }
    };
    if footprint > remaining {
        return None;
    }
    if cap.is_some_and(|cap| used + footprint > cap) {
        return None;
    }
    if placed
        .iter()
        .any(|(i, _)| !plants_compatible(&run.plants[*i].plant, &candidate.plant))
    {
        return None;
    }
    Some(footprint)
}

/// Greedy fill of one zone over the globally sorted plant list.
fn fill_zone(run: &AssignmentRun, task: &ZoneTask) -> ZoneFill {
    let mut remaining = task.zone.area;
    let mut used = 0.0;
    let mut placed: Vec<(usize, f64)> = Vec::new();
    let mut interrupted = false;

    for (index, candidate) in run.plants.iter().enumerate() {
        if run.expired() || !run.wait_for_predecessor(task.rank, index) {
            interrupted = true;
            break;
        }
        if !run.claims.is_claimed(index) {
            if let Some(footprint) =
                admissible_footprint(run, &task.zone, task.cap, &placed, candidate, remaining, used)
            {
                if run.claims.try_claim(index, task.zone_index) {
                    placed.push((index, footprint));
                    remaining -= footprint;
                    used += footprint;
                }
            }
        }
        run.progress[task.rank].store(index + 1, Ordering::Release);
    }

    ZoneFill {
        zone_index: task.zone_index,
        placed,
        used_area: used,
        interrupted,
    }
}

/// Offers every plant still unclaimed after a capped pass to the zones again,
/// in rank order and without fair-share caps. Returns how many zones the
/// deadline kept from finishing.
fn place_uncapped(run: &AssignmentRun, zones: &[Zone], fills: &mut [ZoneFill]) -> usize {
    let total = fills.len();
    for (done, fill) in fills.iter_mut().enumerate() {
        let zone = &zones[fill.zone_index];
        for (index, candidate) in run.plants.iter().enumerate() {
            if run.expired() {
                return total - done;
            }
            if run.claims.is_claimed(index) {
                continue;
            }
            let remaining = zone.area - fill.used_area;
            if let Some(footprint) =
                admissible_footprint(run, zone, None, &fill.placed, candidate, remaining, fill.used_area)
            {
                if run.claims.try_claim(index, fill.zone_index) {
                    fill.placed.push((index, footprint));
                    fill.used_area += footprint;
                }
            }
        }
    }
    0
}

fn unplaced_reason(zones: &[Zone], plant: &SizedPlant, cut_short: bool) -> UnplacedReason {
    if cut_short {
        return UnplacedReason::DeadlineExceeded;
    }
    if zones.is_empty() {
        return UnplacedReason::NoZoneAvailable;
    }
    let lit: Vec<&Zone> = zones
        .iter()
        .filter(|z| zone_accepts(z, &plant.plant))
        .collect();
    if lit.is_empty() {
        return UnplacedReason::NoSunlightMatch;
    }
    let smallest = plant.footprint.min(plant.relaxed_footprint);
    if lit.iter().all(|z| smallest > z.area) {
        return UnplacedReason::ExceedsZoneArea;
    }
    UnplacedReason::NoCompatibleCapacity
}

/// Result of one assignment pass.
#[derive(Debug, Clone)]
pub struct AssignmentOutcome {
    pub assignment: Assignment,
    pub unplaced: Vec<UnplacedPlant>,
    pub timed_out: bool,
    /// Zones whose task stopped before deciding every plant.
    pub incomplete_zones: usize,
}

/// Greedy zone assignment, one task per zone on a bounded worker pool.
#[derive(Debug, Clone, Default)]
pub struct ZoneAssigner {
    pool: ZoneWorkerPool,
}

impl ZoneAssigner {
    pub fn new(pool: ZoneWorkerPool) -> Self {
        Self { pool }
    }

    pub fn pool_size(&self) -> usize {
        self.pool.size()
    }

    /// Assigns `plants` to `zones`. `zones` should already be filtered by
    /// [`select_zones`]. Zone tasks stop cooperatively at `deadline`; whatever
    /// they placed before stopping is kept.
    pub async fn assign(
        &self,
        zones: &[Zone],
        plants: &[Plant],
        spacing: &SpacingCalculator,
        balancing: ZoneBalancing,
        relaxation: Relaxation,
        deadline: Instant,
    ) -> Result<AssignmentOutcome> {
        let sized = size_and_sort(plants, spacing, relaxation)?;
        let ranking = claim_priority(zones, balancing);
        let caps = fair_share_caps(zones, &sized, &ranking, balancing);
        debug!(
            "assigning {} plants across {} zones ({:?}, {} workers)",
            sized.len(),
            zones.len(),
            relaxation,
            self.pool.size()
        );

        let run = Arc::new(AssignmentRun {
            claims: ClaimTable::new(sized.len()),
            progress: (0..zones.len()).map(|_| AtomicUsize::new(0)).collect(),
            plants: sized,
            relaxation,
            deadline,
        });

        // Permits are taken in rank order: a running zone only ever waits on
        // zones that already hold a permit.
        let mut handles = Vec::with_capacity(zones.len());
        for (rank, &zone_index) in ranking.iter().enumerate() {
            let permit = Arc::clone(&self.pool.permits)
                .acquire_owned()
                .await
                .map_err(|e| OptimizationError::Worker(e.to_string()))?;
            let task = ZoneTask {
                zone_index,
                rank,
                zone: zones[zone_index].clone(),
                cap: caps[zone_index],
            };
            let run = Arc::clone(&run);
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                fill_zone(&run, &task)
            }));
        }

        let mut fills = Vec::with_capacity(handles.len());
        for handle in handles {
            fills.push(
                handle
                    .await
                    .map_err(|e| OptimizationError::Worker(e.to_string()))?,
            );
        }
        let mut incomplete_zones = fills.iter().filter(|f| f.interrupted).count();
        // Plants at or past this index were not seen by every zone.
        let decided_by_all = run
            .progress
            .iter()
            .map(|p| p.load(Ordering::Acquire))
            .min()
            .unwrap_or(run.plants.len());

        // `fills` is still in rank order here.
        let mut sweep_cut_short = false;
        if incomplete_zones == 0 && caps.iter().any(Option::is_some) {
            let unfinished = place_uncapped(&run, zones, &mut fills);
            sweep_cut_short = unfinished > 0;
            incomplete_zones += unfinished;
        }
        let timed_out = incomplete_zones > 0;
        fills.sort_by_key(|f| f.zone_index);

        let assignment = Assignment {
            zones: fills
                .iter()
                .map(|fill| {
                    let zone = &zones[fill.zone_index];
                    let members: Vec<&Plant> =
                        fill.placed.iter().map(|(i, _)| &run.plants[*i].plant).collect();
                    ZonePlacement {
                        zone_id: zone.id.clone(),
                        area: zone.area,
                        sunlight_condition: zone.sunlight_condition,
                        plants: fill
                            .placed
                            .iter()
                            .map(|(i, footprint)| PlacedPlant {
                                plant_id: run.plants[*i].plant.id.clone(),
                                plant_type: run.plants[*i].plant.plant_type.clone(),
                                footprint: *footprint,
                            })
                            .collect(),
                        used_area: fill.used_area,
                        required_area: fill
                            .placed
                            .iter()
                            .map(|(i, _)| run.plants[*i].footprint)
                            .sum(),
                        companion_score: zone_companion_score(&members),
                    }
                })
                .collect(),
        };

        let unplaced: Vec<UnplacedPlant> = run
            .plants
            .iter()
            .enumerate()
            .filter(|(i, _)| !run.claims.is_claimed(*i))
            .map(|(i, sized)| UnplacedPlant {
                plant_id: sized.plant.id.clone(),
                plant_type: sized.plant.plant_type.clone(),
                footprint: sized.footprint,
                reason: unplaced_reason(
                    zones,
                    sized,
                    sweep_cut_short || (timed_out && i >= decided_by_all),
                ),
            })
            .collect();

        if timed_out {
            warn!(
                "zone assignment hit its deadline: {incomplete_zones} of {} zones incomplete",
                zones.len()
            );
        }

        Ok(AssignmentOutcome {
            assignment,
            unplaced,
            timed_out,
            incomplete_zones,
        })
    }
}
