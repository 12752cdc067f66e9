use std::collections::BTreeSet;

use crate::models::{garden::Zone, plant::Plant, request::PlantPair};

pub const GOOD_COMPANION_SCORE: i32 = 2;

fn lists_type(types: &BTreeSet<String>, plant_type: &str) -> bool {
    types.iter().any(|t| t.eq_ignore_ascii_case(plant_type))
}

/// Returns true if the two plants may share a zone.
/// One side listing the other's type as incompatible is enough to exclude the
/// pair in both directions. Companion lists never block a pair.
pub fn plants_compatible(a: &Plant, b: &Plant) -> bool {
    !lists_type(&a.incompatible_plants, &b.plant_type)
        && !lists_type(&b.incompatible_plants, &a.plant_type)
}

/// Returns true if either plant lists the other's type as a companion.
pub fn are_companions(a: &Plant, b: &Plant) -> bool {
    lists_type(&a.companion_plants, &b.plant_type) || lists_type(&b.companion_plants, &a.plant_type)
}

/// A zone accepts a plant when it offers at least as much light as the plant needs.
pub fn zone_accepts(zone: &Zone, plant: &Plant) -> bool {
    zone.sunlight_condition.light_level() >= plant.sunlight_needs.light_level()
}

/// Companion score of a whole zone: +2 per companion pair, each pair counted once.
pub fn zone_companion_score(plants: &[&Plant]) -> i32 {
    let mut score = 0;
    for (i, a) in plants.iter().enumerate() {
        for b in &plants[i + 1..] {
            if are_companions(a, b) {
                score += GOOD_COMPANION_SCORE;
            }
        }
    }
    score
}

/// Every unordered pair among `plants` that satisfies `predicate`, in input order.
fn pairs_where(plants: &[Plant], predicate: impl Fn(&Plant, &Plant) -> bool) -> Vec<PlantPair> {
    let mut pairs = Vec::new();
    for (i, a) in plants.iter().enumerate() {
        for b in &plants[i + 1..] {
            if predicate(a, b) {
                pairs.push(PlantPair {
                    first: a.id.clone(),
                    second: b.id.clone(),
                });
            }
        }
    }
    pairs
}

pub fn companion_pairs(plants: &[Plant]) -> Vec<PlantPair> {
    pairs_where(plants, are_companions)
}

pub fn incompatible_pairs(plants: &[Plant]) -> Vec<PlantPair> {
    pairs_where(plants, |a, b| !plants_compatible(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::garden::SunlightCondition::{self, FullShade, FullSun, PartialShade};

    fn plant(id: &str, kind: &str, sun: SunlightCondition) -> Plant {
        Plant::new(id, kind, 1.0, sun)
    }

    fn zone(sun: SunlightCondition) -> Zone {
        Zone::new("z", 10.0, sun)
    }

    #[test]
    fn test_is_compatible_neutral_pair() {
        let lettuce = plant("l", "lettuce", PartialShade);
        let thyme = plant("t", "thyme", FullSun);
        assert!(plants_compatible(&lettuce, &thyme));
    }

    #[test]
    fn test_is_compatible_bad_pair() {
        let tomato = plant("t", "tomato", FullSun).with_incompatible("fennel");
        let fennel = plant("f", "fennel", FullSun);
        assert!(!plants_compatible(&tomato, &fennel));
    }

    #[test]
    fn test_is_compatible_symmetric_with_one_sided_data() {
        // Only tomato declares the conflict; the pair must still be excluded both ways.
        let tomato = plant("t", "tomato", FullSun).with_incompatible("potato");
        let potato = plant("p", "potato", FullSun);
        assert!(!plants_compatible(&tomato, &potato));
        assert!(!plants_compatible(&potato, &tomato));
    }

    #[test]
    fn test_type_matching_ignores_case() {
        let tomato = plant("t", "tomato", FullSun).with_incompatible("Fennel");
        let fennel = plant("f", "fennel", FullSun);
        assert!(!plants_compatible(&tomato, &fennel));
    }

    #[test]
    fn test_companion_does_not_override_incompatibility() {
        let tomato = plant("t", "tomato", FullSun)
            .with_companion("fennel")
            .with_incompatible("fennel");
        let fennel = plant("f", "fennel", FullSun);
        assert!(are_companions(&tomato, &fennel));
        assert!(!plants_compatible(&tomato, &fennel));
    }

    #[test]
    fn test_zone_accepts_same_light() {
        for sun in [FullSun, PartialShade, FullShade] {
            assert!(zone_accepts(&zone(sun), &plant("p", "x", sun)));
        }
    }

    #[test]
    fn test_brighter_zone_accepts_shade_tolerant_plant() {
        assert!(zone_accepts(&zone(FullSun), &plant("p", "lettuce", PartialShade)));
        assert!(zone_accepts(&zone(PartialShade), &plant("p", "fern", FullShade)));
        assert!(zone_accepts(&zone(FullSun), &plant("p", "fern", FullShade)));
    }

    #[test]
    fn test_darker_zone_rejects_sun_loving_plant() {
        assert!(!zone_accepts(&zone(PartialShade), &plant("p", "tomato", FullSun)));
        assert!(!zone_accepts(&zone(FullShade), &plant("p", "tomato", FullSun)));
        assert!(!zone_accepts(&zone(FullShade), &plant("p", "lettuce", PartialShade)));
    }

    #[test]
    fn test_good_companion_positive_score() {
        let tomato = plant("t", "tomato", FullSun).with_companion("basil");
        let basil = plant("b", "basil", FullSun);
        assert_eq!(zone_companion_score(&[&tomato, &basil]), GOOD_COMPANION_SCORE);
    }

    #[test]
    fn test_lone_plant_scores_zero() {
        let tomato = plant("t", "tomato", FullSun).with_companion("basil");
        assert_eq!(zone_companion_score(&[&tomato]), 0);
    }

    #[test]
    fn test_zone_score_counts_each_pair_once() {
        let tomato = plant("t", "tomato", FullSun).with_companion("basil");
        let basil = plant("b", "basil", FullSun).with_companion("tomato");
        let carrot = plant("c", "carrot", FullSun).with_companion("tomato");
        assert_eq!(
            zone_companion_score(&[&tomato, &basil, &carrot]),
            2 * GOOD_COMPANION_SCORE
        );
    }

    #[test]
    fn test_pairs_lists() {
        let tomato = plant("t", "tomato", FullSun)
            .with_companion("basil")
            .with_incompatible("potato");
        let basil = plant("b", "basil", FullSun);
        let potato = plant("p", "potato", FullSun);
        let plants = vec![tomato, basil, potato];
        assert_eq!(
            companion_pairs(&plants),
            vec![PlantPair { first: "t".into(), second: "b".into() }]
        );
        assert_eq!(
            incompatible_pairs(&plants),
            vec![PlantPair { first: "t".into(), second: "p".into() }]
        );
    }
}
