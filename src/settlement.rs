//! Settlement tiers, the dominance shadow, growth and its overflow,
//! placement scoring for new settlements, founding and paid upgrades.

use std::collections::BTreeMap;

use rand::Rng;
use serde::Serialize;
use tracing::{debug, info};

use crate::{
    hex::Coord,
    rng::Rando,
    rules::{self, FOUNDING_COST, MAX_TIER},
    society::SocietyParam,
    world::{EntityId, Settlement, World},
};

const ATTRACTION_SIGMA: f64 = 4.0;
const REPULSION_SIGMA: f64 = 1.1;
const REPULSION_WEIGHT: f64 = 5.0;
const RESOURCE_BONUS: f64 = 1.5;
const BASE_SPAWN_CHANCE: f64 = 0.10;

fn gaussian_falloff(distance: f64, sigma: f64) -> f64 {
    (-(distance * distance) / (2.0 * sigma * sigma)).exp()
}

/// Summed influence of every settlement whose radius reaches `coord`.
pub fn influence_at(world: &World, coord: Coord) -> f64 {
    world
        .settlements()
        .filter_map(|s| {
            let def = rules::tier(s.tier);
            let distance = coord.distance(s.coord);
            (distance <= def.influence_radius).then(|| {
                let sigma = f64::from(def.influence_radius) / 2.0;
                def.influence_strength * gaussian_falloff(f64::from(distance), sigma)
            })
        })
        .sum()
}

/// Highest tier a settlement at `coord` may reach: one below the smallest of
/// the larger settlements whose influence radius covers it.
pub fn max_tier_at(world: &World, coord: Coord) -> u8 {
    let own_tier = world.settlement_at(coord).map(|s| s.tier);
    world
        .settlements()
        .filter(|s| s.coord != coord)
        .filter(|s| own_tier.map_or(true, |own| s.tier > own))
        .filter(|s| coord.distance(s.coord) <= rules::tier(s.tier).influence_radius)
        .map(|s| s.tier.saturating_sub(1))
        .fold(MAX_TIER, u8::min)
}

pub fn can_auto_advance(world: &World, settlement: &Settlement) -> bool {
    settlement.tier < MAX_TIER
        && !rules::is_gated(settlement.tier)
        && settlement.tier < max_tier_at(world, settlement.coord)
}

fn is_capped(world: &World, settlement: &Settlement) -> bool {
    settlement.tier >= MAX_TIER
        || rules::is_gated(settlement.tier)
        || settlement.tier >= max_tier_at(world, settlement.coord)
}

/// One turn of growth for a settlement of `tier`. Decadence swells
/// settlements by up to a quarter.
pub fn growth_roll(tier: u8, decadence: f64, rng: &mut impl Rng) -> u32 {
    let base = f64::from(rules::base_growth(tier));
    let luck = rng.normal(1.0, 0.33).max(0.1);
    let swell = 1.0 + decadence / 100.0 * 0.25;
    (base * luck * swell).floor() as u32
}

/// Grow every settlement, auto-advance through ungated tiers, then push
/// growth banked past a cap to the nearest settlement with room.
pub fn grow_settlements(world: &mut World, rng: &mut impl Rng) {
    let decadence = world.society.decadence();
    for id in world.settlement_ids() {
        let Some(tier) = world.settlement(id).map(|s| s.tier) else {
            continue;
        };
        let growth = growth_roll(tier, decadence, rng);
        if let Some(s) = world.settlement_mut(id) {
            s.growth_points += growth;
        }
        advance_while_possible(world, id);
    }

    for id in world.settlement_ids() {
        let Some(settlement) = world.settlement(id).cloned() else {
            continue;
        };
        if !is_capped(world, &settlement) {
            continue;
        }
        let half = rules::tier(settlement.tier).threshold / 2;
        if settlement.growth_points <= half {
            continue;
        }
        let overflow = settlement.growth_points - half;
        if let Some(s) = world.settlement_mut(id) {
            s.growth_points = half;
        }
        let recipient = world
            .settlements()
            .filter(|other| other.id != id)
            .filter(|other| {
                can_auto_advance(world, other)
                    || other.growth_points < rules::tier(other.tier).threshold
            })
            .min_by_key(|other| other.coord.distance(settlement.coord))
            .map(|other| other.id);
        if let Some(recipient) = recipient {
            if let Some(s) = world.settlement_mut(recipient) {
                s.growth_points += overflow;
                debug!(from = %settlement.coord, to = %s.coord, overflow, "growth overflow");
            }
        }
    }
}

fn advance_while_possible(world: &mut World, id: EntityId) {
    loop {
        let Some(settlement) = world.settlement(id) else {
            return;
        };
        let threshold = rules::tier(settlement.tier).threshold;
        if settlement.growth_points < threshold || !can_auto_advance(world, settlement) {
            return;
        }
        if let Some(s) = world.settlement_mut(id) {
            s.tier += 1;
            s.growth_points -= threshold;
            debug!(coord = %s.coord, tier = s.tier, "settlement advanced");
        }
        world.refresh_territory();
    }
}

fn is_spawn_candidate(world: &World, coord: Coord) -> bool {
    let Some(hex) = world.hex(coord) else {
        return false;
    };
    hex.terrain.is_open()
        && hex.resource.is_none()
        && hex.danger_point.is_none()
        && hex.installation.is_none()
        && world.settlement_at(coord).is_none()
        && world.enemy_at(coord).is_none()
}

/// Desirability of `coord` for a new settlement. Attraction to existing
/// settlements minus a tighter, stronger repulsion, decayed by distance to
/// the nearest settlement over the era's reach and boosted per adjacent
/// resource. Zero when no settlement exists or the hex is unusable.
pub fn spawn_score(world: &World, coord: Coord) -> f64 {
    if !is_spawn_candidate(world, coord) {
        return 0.0;
    }
    let Some(nearest) = world.settlements().map(|s| s.coord.distance(coord)).min() else {
        return 0.0;
    };

    let pull: f64 = world
        .settlements()
        .map(|s| {
            let d = f64::from(s.coord.distance(coord));
            let weight = f64::from(s.tier) + 1.0;
            weight * gaussian_falloff(d, ATTRACTION_SIGMA)
                - REPULSION_WEIGHT * weight * gaussian_falloff(d, REPULSION_SIGMA)
        })
        .sum();
    if pull <= 0.0 {
        return 0.0;
    }

    let reach = rules::era_reach(world.era);
    let decay = (-f64::from(nearest) / reach).exp();
    let resources = coord
        .neighbors()
        .iter()
        .filter(|n| world.hex(**n).is_some_and(|h| h.resource.is_some()))
        .count();
    pull * decay * RESOURCE_BONUS.powi(resources as i32)
}

/// Normalised spawn likelihood per hex, for population-density overlays.
pub fn spawn_probability_map(world: &World) -> BTreeMap<Coord, f64> {
    let scores: Vec<(Coord, f64)> = world
        .map
        .hexes()
        .map(|h| (h.coord, spawn_score(world, h.coord)))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    let total: f64 = scores.iter().map(|(_, s)| s).sum();
    if total <= 0.0 {
        return BTreeMap::new();
    }
    scores
        .into_iter()
        .map(|(coord, score)| (coord, score / total))
        .collect()
}

pub fn autonomous_spawn_chance(world: &World) -> f64 {
    BASE_SPAWN_CHANCE + world.society.unrest() / 200.0
}

/// The realm may sprout a new camp on its own. Restless people leave to
/// settle elsewhere, which calms unrest but stretches the realm.
pub fn try_spawn_settlement(world: &mut World, rng: &mut impl Rng) -> Option<Coord> {
    if !rng.chance(autonomous_spawn_chance(world)) {
        return None;
    }
    let candidates: Vec<(Coord, f64)> = world
        .map
        .hexes()
        .map(|h| (h.coord, spawn_score(world, h.coord)))
        .filter(|(_, score)| *score > 0.0)
        .collect();
    let coord = rng.weighted(&candidates)?;
    create_settlement(world, coord, 0)?;
    world.society.scale(SocietyParam::Unrest, 0.5);
    world.society.scale(SocietyParam::Overextension, 1.25);
    info!(coord = %coord, "settlement sprang up");
    Some(coord)
}

pub fn create_settlement(world: &mut World, coord: Coord, tier: u8) -> Option<EntityId> {
    if !world.map.contains(coord) || world.settlement_at(coord).is_some() {
        return None;
    }
    let id = world.insert_settlement(coord, tier.min(MAX_TIER));
    world.refresh_territory();
    Some(id)
}

pub fn destroy_settlement(world: &mut World, id: EntityId) -> Option<Settlement> {
    let settlement = world.remove_settlement(id)?;
    world.refresh_territory();
    Some(settlement)
}

/// Which settlement gives up population when a new one is founded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PopCost {
    pub settlement: EntityId,
    pub tier: u8,
    pub will_destroy: bool,
    pub name: &'static str,
}

/// The largest settlement pays, chosen at random among equals.
pub fn settlement_pop_cost(world: &World, rng: &mut impl Rng) -> Option<PopCost> {
    let largest = world.largest_settlements();
    let id = *rng.choice(&largest)?;
    let settlement = world.settlement(id)?;
    Some(PopCost {
        settlement: id,
        tier: settlement.tier,
        will_destroy: settlement.tier == 0,
        name: settlement.name(),
    })
}

pub fn can_found_settlement(world: &World, coord: Coord) -> bool {
    let Some(hex) = world.hex(coord) else {
        return false;
    };
    hex.terrain.is_open()
        && hex.controlled
        && hex.resource.is_none()
        && hex.danger_point.is_none()
        && world.settlement_at(coord).is_none()
        && world.has_units_at(coord)
        && world.settlement_count() > 0
        && influence_at(world, coord) >= 1.0
        && world.can_afford(FOUNDING_COST)
}

pub fn founding_needs_confirmation(world: &World, coord: Coord, rng: &mut impl Rng) -> bool {
    can_found_settlement(world, coord)
        && settlement_pop_cost(world, rng).is_some_and(|cost| cost.will_destroy)
}

/// Found a camp where a unit stands. The paying settlement drops a tier,
/// keeping half of the new tier's threshold as growth, or disappears if it
/// was a camp. `victim` pins the payer chosen during confirmation.
pub fn found_settlement(
    world: &mut World,
    coord: Coord,
    victim: Option<EntityId>,
    rng: &mut impl Rng,
) -> Option<EntityId> {
    if !can_found_settlement(world, coord) {
        return None;
    }
    let payer = match victim {
        Some(id) => world.settlement(id).map(|s| s.id)?,
        None => settlement_pop_cost(world, rng)?.settlement,
    };

    world.spend(FOUNDING_COST);
    let payer_tier = world.settlement(payer).map(|s| s.tier)?;
    if payer_tier > 0 {
        if let Some(s) = world.settlement_mut(payer) {
            s.tier -= 1;
            s.growth_points = rules::tier(s.tier).threshold / 2;
        }
    } else {
        destroy_settlement(world, payer);
    }

    let id = create_settlement(world, coord, 0)?;
    world.events.founded.push(coord);
    info!(coord = %coord, "settlement founded");
    Some(id)
}

pub fn can_upgrade(world: &World, id: EntityId) -> bool {
    let Some(settlement) = world.settlement(id) else {
        return false;
    };
    let Some(cost) = rules::tier(settlement.tier).gate_cost else {
        return false;
    };
    settlement.tier < MAX_TIER
        && world.can_afford(cost)
        && settlement.tier < max_tier_at(world, settlement.coord)
}

/// Pay to push a settlement through a gated tier.
pub fn upgrade(world: &mut World, id: EntityId) -> bool {
    if !can_upgrade(world, id) {
        return false;
    }
    let Some(cost) = world
        .settlement(id)
        .and_then(|s| rules::tier(s.tier).gate_cost)
    else {
        return false;
    };
    world.spend(cost);
    if let Some(s) = world.settlement_mut(id) {
        s.tier += 1;
        s.growth_points = 0;
        info!(coord = %s.coord, tier = s.tier, "settlement upgraded");
    }
    world.refresh_territory();
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use crate::world::{Goods, HexMap, ResourceKind, Terrain, UnitKind};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn plains(radius: i32) -> World {
        World::new(HexMap::uniform(radius, Terrain::Plains), Difficulty::Normal)
    }

    #[test]
    fn influence_falls_off_and_stops_at_radius() {
        let mut world = plains(8);
        create_settlement(&mut world, Coord::ORIGIN, 2).unwrap();
        assert!((influence_at(&world, Coord::ORIGIN) - 3.0).abs() < 1e-9);
        let one = influence_at(&world, Coord::new(1, 0));
        assert!((one - 3.0 * (-0.5f64).exp()).abs() < 1e-9);
        assert_eq!(influence_at(&world, Coord::new(3, 0)), 0.0);
    }

    #[test]
    fn larger_neighbour_casts_a_dominance_shadow() {
        let mut world = plains(8);
        create_settlement(&mut world, Coord::ORIGIN, 5).unwrap();
        create_settlement(&mut world, Coord::new(2, 0), 1).unwrap();
        assert_eq!(max_tier_at(&world, Coord::new(2, 0)), 4);
        assert_eq!(max_tier_at(&world, Coord::ORIGIN), MAX_TIER);
        assert_eq!(max_tier_at(&world, Coord::new(4, 0)), MAX_TIER);
        assert_eq!(max_tier_at(&world, Coord::new(-1, 0)), 4, "empty hex in the shadow");
    }

    #[test]
    fn gated_tiers_stop_auto_advance() {
        let mut world = plains(8);
        let id = create_settlement(&mut world, Coord::ORIGIN, 5).unwrap();
        world.settlement_mut(id).unwrap().growth_points = 10_000;
        advance_while_possible(&mut world, id);
        assert_eq!(world.settlement(id).unwrap().tier, 5);
    }

    #[test]
    fn growth_advances_through_open_tiers() {
        let mut world = plains(8);
        let id = create_settlement(&mut world, Coord::ORIGIN, 0).unwrap();
        world.settlement_mut(id).unwrap().growth_points = 50 + 105 + 3;
        advance_while_possible(&mut world, id);
        let s = world.settlement(id).unwrap();
        assert_eq!(s.tier, 2);
        assert_eq!(s.growth_points, 3);
    }

    #[test]
    fn capped_growth_overflows_to_nearest_with_room() {
        let mut world = plains(10);
        let big = create_settlement(&mut world, Coord::ORIGIN, 5).unwrap();
        let near = create_settlement(&mut world, Coord::new(5, 0), 0).unwrap();
        let far = create_settlement(&mut world, Coord::new(-8, 0), 0).unwrap();
        world.settlement_mut(big).unwrap().growth_points = 3_000;
        let mut rng = ChaCha8Rng::seed_from_u64(12);
        grow_settlements(&mut world, &mut rng);

        let half = rules::tier(5).threshold / 2;
        assert_eq!(world.settlement(big).unwrap().growth_points, half);
        assert_eq!(world.settlement(big).unwrap().tier, 5);
        let near_growth = world.settlement(near).unwrap().growth_points;
        let far_growth = world.settlement(far).unwrap().growth_points;
        assert!(near_growth > far_growth + 1_000 || world.settlement(near).unwrap().tier > 0);
    }

    #[test]
    fn growth_roll_is_floored_at_a_tenth() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..2_000 {
            let g = growth_roll(0, 0.0, &mut rng);
            assert!(g >= 1, "10 * 0.1 floors to 1");
        }
        let swollen: u32 = (0..2_000).map(|_| growth_roll(3, 100.0, &mut rng)).sum();
        let plain: u32 = (0..2_000).map(|_| growth_roll(3, 0.0, &mut rng)).sum();
        assert!(swollen > plain);
    }

    #[test]
    fn spawn_score_has_a_dead_zone_and_likes_resources() {
        let mut world = plains(10);
        create_settlement(&mut world, Coord::ORIGIN, 0).unwrap();
        assert_eq!(spawn_score(&world, Coord::new(1, 0)), 0.0);
        assert_eq!(spawn_score(&world, Coord::new(2, 0)), 0.0);
        let plain = spawn_score(&world, Coord::new(3, 0));
        assert!(plain > 0.0);
        world.hex_mut(Coord::new(4, 0)).unwrap().resource = Some(ResourceKind::Forest);
        let rich = spawn_score(&world, Coord::new(3, 0));
        assert!((rich - plain * 1.5).abs() < 1e-9);
        assert_eq!(spawn_score(&world, Coord::new(4, 0)), 0.0, "resource hexes are never settled");
    }

    #[test]
    fn probability_map_sums_to_one() {
        let mut world = plains(10);
        create_settlement(&mut world, Coord::ORIGIN, 3).unwrap();
        let map = spawn_probability_map(&world);
        assert!(!map.is_empty());
        let total: f64 = map.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn autonomous_spawn_calms_and_stretches() {
        let mut world = plains(10);
        create_settlement(&mut world, Coord::ORIGIN, 2).unwrap();
        world.society.set(SocietyParam::Unrest, 200.0);
        world.society.set(SocietyParam::Overextension, 40.0);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut spawned = None;
        for _ in 0..100 {
            spawned = try_spawn_settlement(&mut world, &mut rng);
            if spawned.is_some() {
                break;
            }
        }
        let coord = spawned.expect("0.6 chance per try");
        assert!(coord.distance(Coord::ORIGIN) >= 3);
        assert_eq!(world.settlement_count(), 2);
        assert!((world.society.unrest() - 50.0).abs() < 1e-9);
        assert!((world.society.overextension() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn autonomous_spawn_leaves_zero_overextension_alone() {
        let mut world = plains(10);
        create_settlement(&mut world, Coord::ORIGIN, 2).unwrap();
        world.society.set(SocietyParam::Unrest, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut spawned = None;
        for _ in 0..100 {
            spawned = try_spawn_settlement(&mut world, &mut rng);
            if spawned.is_some() {
                break;
            }
        }
        assert!(spawned.is_some());
        assert_eq!(world.society.overextension(), 0.0);
    }

    #[test]
    fn founding_costs_the_largest_settlement_a_tier() {
        let mut world = plains(10);
        let home = create_settlement(&mut world, Coord::ORIGIN, 3).unwrap();
        let site = Coord::new(1, 0);
        assert!(!can_found_settlement(&world, site), "needs a unit on site");
        world.insert_unit(UnitKind::Infantry, site);
        world.refresh_territory();
        assert!(can_found_settlement(&world, site));

        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(!founding_needs_confirmation(&world, site, &mut rng));
        let before = world.treasury;
        let new_id = found_settlement(&mut world, site, None, &mut rng).unwrap();
        assert_eq!(world.treasury, before - FOUNDING_COST);
        let home = world.settlement(home).unwrap();
        assert_eq!(home.tier, 2);
        assert_eq!(home.growth_points, rules::tier(2).threshold / 2);
        assert_eq!(world.settlement(new_id).unwrap().tier, 0);
        assert_eq!(world.events.founded, vec![site]);
    }

    #[test]
    fn confirmed_camp_pays_with_its_existence() {
        let mut world = plains(10);
        let village = create_settlement(&mut world, Coord::ORIGIN, 2).unwrap();
        let camp = create_settlement(&mut world, Coord::new(6, 0), 0).unwrap();
        let site = Coord::new(1, 0);
        world.insert_unit(UnitKind::Worker, site);
        world.refresh_territory();
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        assert!(!founding_needs_confirmation(&world, site, &mut rng));

        found_settlement(&mut world, site, Some(camp), &mut rng).unwrap();
        assert!(world.settlement(camp).is_none());
        assert_eq!(world.settlement(village).unwrap().tier, 2);
        assert_eq!(world.settlement_count(), 2);
        assert!(world.settlement_at(site).is_some());
    }

    #[test]
    fn camps_alone_cannot_gather_enough_influence() {
        let mut world = plains(10);
        create_settlement(&mut world, Coord::ORIGIN, 0).unwrap();
        let site = Coord::new(1, 0);
        world.insert_unit(UnitKind::Worker, site);
        world.refresh_territory();
        assert!(influence_at(&world, site) < 1.0);
        assert!(!can_found_settlement(&world, site));
    }

    #[test]
    fn upgrades_only_at_gates_and_within_the_shadow() {
        let mut world = plains(10);
        let small = create_settlement(&mut world, Coord::ORIGIN, 4).unwrap();
        assert!(!can_upgrade(&world, small), "tier 4 is not a gate");

        world.settlement_mut(small).unwrap().tier = 5;
        world.treasury = Goods::new(99, 500);
        assert!(!can_upgrade(&world, small), "cannot afford");
        world.treasury = Goods::new(500, 500);
        assert!(upgrade(&mut world, small));
        assert_eq!(world.settlement(small).unwrap().tier, 6);
        assert_eq!(world.treasury, Goods::new(400, 350));
        assert!(!upgrade(&mut world, small));

        let shadowed = create_settlement(&mut world, Coord::new(3, 0), 5).unwrap();
        world.treasury = Goods::new(500, 500);
        assert_eq!(max_tier_at(&world, Coord::new(3, 0)), 5);
        assert!(!can_upgrade(&world, shadowed));
    }
}
