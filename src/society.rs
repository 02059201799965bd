//! The four stability parameters, their per-turn drift, revolts, era
//! progression and civilisational collapse.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    hex::Coord,
    rng::Rando,
    rules::{
        self, COLLAPSE_HAZARD_BUDGET, MAX_DANGER_STRENGTH, SETTLEMENTS_PER_SUSTAINABLE_HEXES,
        STARTING_TREASURY,
    },
    world::{DangerPoint, EntityId, Era, World},
};

pub const PARAM_MAX: f64 = 100.0;
pub const REVOLT_UNREST: f64 = 75.0;
pub const REVOLT_CHANCE: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocietyParam {
    Corruption,
    Unrest,
    Decadence,
    Overextension,
}

impl SocietyParam {
    pub const ALL: [SocietyParam; 4] = [
        SocietyParam::Corruption,
        SocietyParam::Unrest,
        SocietyParam::Decadence,
        SocietyParam::Overextension,
    ];
}

/// Every field stays inside `[0, 100]`; all writes go through `set`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Society {
    corruption: f64,
    unrest: f64,
    decadence: f64,
    overextension: f64,
}

impl Society {
    pub fn get(&self, param: SocietyParam) -> f64 {
        match param {
            SocietyParam::Corruption => self.corruption,
            SocietyParam::Unrest => self.unrest,
            SocietyParam::Decadence => self.decadence,
            SocietyParam::Overextension => self.overextension,
        }
    }

    pub fn set(&mut self, param: SocietyParam, value: f64) {
        let value = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, PARAM_MAX)
        };
        match param {
            SocietyParam::Corruption => self.corruption = value,
            SocietyParam::Unrest => self.unrest = value,
            SocietyParam::Decadence => self.decadence = value,
            SocietyParam::Overextension => self.overextension = value,
        }
    }

    pub fn adjust(&mut self, param: SocietyParam, delta: f64) {
        self.set(param, self.get(param) + delta);
    }

    pub fn scale(&mut self, param: SocietyParam, factor: f64) {
        self.set(param, self.get(param) * factor);
    }

    pub fn corruption(&self) -> f64 {
        self.corruption
    }

    pub fn unrest(&self) -> f64 {
        self.unrest
    }

    pub fn decadence(&self) -> f64 {
        self.decadence
    }

    pub fn overextension(&self) -> f64 {
        self.overextension
    }

    pub fn count_at_least(&self, level: f64) -> usize {
        SocietyParam::ALL
            .iter()
            .filter(|p| self.get(**p) >= level)
            .count()
    }

    pub fn should_collapse(&self) -> bool {
        self.count_at_least(PARAM_MAX) >= 2
    }

    pub fn outlook(&self) -> Outlook {
        let critical = self.count_at_least(75.0);
        let high = self.count_at_least(50.0);
        let highest = SocietyParam::ALL
            .iter()
            .map(|p| self.get(*p))
            .fold(0.0, f64::max);
        match (critical, high) {
            (c, _) if c >= 2 => Outlook::Brink,
            (1, _) => Outlook::Darkening,
            (_, h) if h >= 2 => Outlook::Troubled,
            (_, 1) => Outlook::Watchful,
            _ if highest >= 25.0 => Outlook::Prospering,
            _ => Outlook::Flourishing,
        }
    }
}

/// Coarse reading of the realm's stability for status displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outlook {
    Flourishing,
    Prospering,
    Watchful,
    Troubled,
    Darkening,
    Brink,
}

impl Outlook {
    pub fn describe(self) -> &'static str {
        match self {
            Outlook::Flourishing => "The realm flourishes and its borders are well managed.",
            Outlook::Prospering => "The realm prospers with only minor concerns.",
            Outlook::Watchful => "Mostly stable, though one problem bears watching.",
            Outlook::Troubled => "Several problems trouble the council.",
            Outlook::Darkening => "One problem has reached dangerous levels.",
            Outlook::Brink => "The realm teeters on the brink of collapse.",
        }
    }
}

/// Per-turn drift of all four parameters.
pub fn update_society(world: &mut World, rng: &mut impl Rng) {
    let pressure = rules::era_pressure(world.era);
    let settlement_gold: i64 = world
        .settlements()
        .map(|s| rules::tier(s.tier).production.gold)
        .sum();
    let settlements = world.settlement_count();
    let population = f64::from(world.population());
    let influenced = world.influenced_land_hexes();

    let society = &mut world.society;
    society.adjust(
        SocietyParam::Corruption,
        settlement_gold as f64 * 0.01 + settlements as f64 * 0.1,
    );
    society.adjust(
        SocietyParam::Unrest,
        (rng.float(-1.5, 1.0) + population * 0.01) * pressure,
    );
    society.adjust(SocietyParam::Decadence, 0.5 * pressure);

    let sustainable = settlements * SETTLEMENTS_PER_SUSTAINABLE_HEXES;
    if influenced > sustainable {
        society.adjust(
            SocietyParam::Overextension,
            (influenced - sustainable) as f64 * 0.1,
        );
    } else {
        society.adjust(SocietyParam::Overextension, -1.0);
    }
}

/// Above the unrest threshold each settlement may revolt and vanish, but
/// the last one always stands. Returns the coordinates that revolted.
pub fn process_revolts(world: &mut World, rng: &mut impl Rng) -> Vec<Coord> {
    let mut revolted = Vec::new();
    if world.society.unrest() <= REVOLT_UNREST {
        return revolted;
    }
    for id in world.settlement_ids() {
        if !rng.chance(REVOLT_CHANCE) || world.settlement_count() <= 1 {
            continue;
        }
        if let Some(settlement) = world.remove_settlement(id) {
            info!(coord = %settlement.coord, tier = settlement.tier, "settlement revolted");
            revolted.push(settlement.coord);
        }
    }
    if !revolted.is_empty() {
        world.refresh_territory();
    }
    revolted
}

/// Advance at most one era when the settlement count allows it.
pub fn check_era_transition(world: &mut World) -> Option<Era> {
    let next = world.era.next()?;
    if world.settlement_count() < rules::era_threshold(next) {
        return None;
    }
    world.era = next;
    info!(era = %next, turn = world.turn, "era advanced");
    Some(next)
}

/// Tear the realm down to a single camp. Every other settlement becomes a
/// candidate danger point and a fixed hazard budget is dealt out
/// among them; candidates that receive nothing are cleared.
pub fn collapse(world: &mut World, rng: &mut impl Rng) {
    warn!(turn = world.turn, settlements = world.settlement_count(), "civilisation collapsed");
    world.era = Era::Barbarian;
    world.society = Society::default();

    if let Some(keeper) = pick_keeper(world, rng) {
        let mut ruins = Vec::new();
        for id in world.settlement_ids() {
            if id == keeper {
                continue;
            }
            if let Some(settlement) = world.remove_settlement(id) {
                ruins.push(settlement.coord);
            }
        }
        distribute_ruin_hazards(world, &ruins, COLLAPSE_HAZARD_BUDGET, rng);

        if let Some(settlement) = world.settlement_mut(keeper) {
            settlement.tier = 0;
            settlement.growth_points = 0;
        }
    }

    world.units.clear();
    world.selection.unit = None;
    world.treasury = STARTING_TREASURY;
    world.refresh_territory();
    world.events.collapsed = true;
}

fn pick_keeper(world: &World, rng: &mut impl Rng) -> Option<EntityId> {
    let min_tier = world.settlements().map(|s| s.tier).min()?;
    let smallest: Vec<EntityId> = world
        .settlements()
        .filter(|s| s.tier == min_tier)
        .map(|s| s.id)
        .collect();
    rng.choice(&smallest).copied()
}

fn distribute_ruin_hazards(world: &mut World, ruins: &[Coord], budget: u32, rng: &mut impl Rng) {
    let mut strengths = vec![0u8; ruins.len()];
    for _ in 0..budget {
        let open: Vec<usize> = (0..ruins.len())
            .filter(|i| strengths[*i] < MAX_DANGER_STRENGTH)
            .collect();
        let Some(&index) = rng.choice(&open) else {
            break;
        };
        strengths[index] += 1;
    }

    for (coord, strength) in ruins.iter().zip(strengths) {
        let Some(hex) = world.map.get_mut(*coord) else {
            continue;
        };
        hex.danger_point = if strength == 0 {
            None
        } else {
            let countdown = rng.int(1, rules::spawn_rate(strength));
            Some(DangerPoint {
                strength,
                turns_until_spawn: f64::from(countdown),
            })
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use crate::world::{HexMap, Terrain, UnitKind};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn world_with_settlements(tiers: &[(Coord, u8)]) -> World {
        let mut world = World::new(HexMap::uniform(10, Terrain::Plains), Difficulty::Normal);
        for (coord, tier) in tiers {
            world.insert_settlement(*coord, *tier);
        }
        world.refresh_territory();
        world
    }

    #[test]
    fn collapse_keeps_one_camp_and_hands_out_the_budget() {
        let mut world = world_with_settlements(&[
            (Coord::new(0, 0), 3),
            (Coord::new(3, 0), 1),
            (Coord::new(-3, 0), 5),
            (Coord::new(0, 3), 2),
            (Coord::new(0, -3), 4),
        ]);
        world.insert_unit(UnitKind::Infantry, Coord::new(1, 1));
        world.treasury = crate::world::Goods::new(999, 999);
        world.society.set(SocietyParam::Corruption, 100.0);
        world.society.set(SocietyParam::Unrest, 100.0);
        assert!(world.society.should_collapse());

        let mut rng = ChaCha8Rng::seed_from_u64(4);
        collapse(&mut world, &mut rng);

        assert_eq!(world.era, Era::Barbarian);
        assert_eq!(world.settlement_count(), 1);
        let keeper = world.settlements().next().unwrap();
        assert_eq!(keeper.coord, Coord::new(3, 0), "lowest tier survives");
        assert_eq!(keeper.tier, 0);
        assert!(world.units().is_empty());
        assert_eq!(world.treasury, STARTING_TREASURY);
        assert_eq!(world.society, Society::default());

        let total: u32 = world
            .map
            .hexes()
            .filter_map(|h| h.danger_point)
            .map(|d| u32::from(d.strength))
            .sum();
        assert_eq!(total, 15);
        assert!(world
            .map
            .hexes()
            .filter_map(|h| h.danger_point)
            .all(|d| (1..=6).contains(&d.strength) && d.turns_until_spawn >= 1.0));
    }

    #[test]
    fn collapse_budget_ignores_difficulty() {
        for difficulty in [Difficulty::Easy, Difficulty::Hard] {
            let coords: Vec<(Coord, u8)> = (0..10)
                .map(|i| (Coord::new(i * 2 - 9, 0), 2))
                .collect();
            let mut world = world_with_settlements(&coords);
            world.difficulty = difficulty;
            let mut rng = ChaCha8Rng::seed_from_u64(17);
            collapse(&mut world, &mut rng);

            let total: u32 = world
                .map
                .hexes()
                .filter_map(|h| h.danger_point)
                .map(|d| u32::from(d.strength))
                .sum();
            assert_eq!(total, COLLAPSE_HAZARD_BUDGET, "{difficulty}");
        }
    }

    #[test]
    fn collapse_with_few_ruins_caps_each_hazard() {
        let mut world = world_with_settlements(&[(Coord::new(0, 0), 0), (Coord::new(4, 0), 2)]);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        collapse(&mut world, &mut rng);
        let dp = world.hex(Coord::new(4, 0)).and_then(|h| h.danger_point).unwrap();
        assert_eq!(dp.strength, 6);
    }

    #[test]
    fn revolts_never_take_the_last_settlement() {
        let mut world = world_with_settlements(&[(Coord::new(0, 0), 0), (Coord::new(4, 0), 0)]);
        world.society.set(SocietyParam::Unrest, 90.0);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for _ in 0..500 {
            process_revolts(&mut world, &mut rng);
        }
        assert_eq!(world.settlement_count(), 1);
    }

    #[test]
    fn no_revolts_at_threshold() {
        let mut world = world_with_settlements(&[(Coord::new(0, 0), 0), (Coord::new(4, 0), 0)]);
        world.society.set(SocietyParam::Unrest, 75.0);
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for _ in 0..200 {
            assert!(process_revolts(&mut world, &mut rng).is_empty());
        }
    }

    #[test]
    fn era_advances_one_step_per_check() {
        let coords: Vec<(Coord, u8)> = (0..7).map(|i| (Coord::new(i * 2 - 6, 0), 0)).collect();
        let mut world = world_with_settlements(&coords);
        assert_eq!(check_era_transition(&mut world), Some(Era::Kingdom));
        assert_eq!(check_era_transition(&mut world), Some(Era::Empire));
        assert_eq!(check_era_transition(&mut world), None);
    }

    #[test]
    fn decadence_drifts_with_era_pressure() {
        let mut world = world_with_settlements(&[(Coord::ORIGIN, 0)]);
        world.era = Era::Empire;
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        update_society(&mut world, &mut rng);
        assert!((world.society.decadence() - 2.0).abs() < 1e-9);
        assert!((world.society.corruption() - 0.11).abs() < 1e-9);
    }

    #[test]
    fn outlook_tracks_the_worst_parameters() {
        let mut society = Society::default();
        assert_eq!(society.outlook(), Outlook::Flourishing);
        society.set(SocietyParam::Unrest, 30.0);
        assert_eq!(society.outlook(), Outlook::Prospering);
        society.set(SocietyParam::Decadence, 60.0);
        assert_eq!(society.outlook(), Outlook::Watchful);
        society.set(SocietyParam::Unrest, 80.0);
        assert_eq!(society.outlook(), Outlook::Darkening);
        society.set(SocietyParam::Decadence, 90.0);
        assert_eq!(society.outlook(), Outlook::Brink);
    }

    proptest! {
        #[test]
        fn parameters_stay_clamped(
            deltas in prop::collection::vec((0usize..4, -500.0f64..500.0, 0.0f64..5.0), 1..60)
        ) {
            let mut society = Society::default();
            for (index, delta, factor) in deltas {
                let param = SocietyParam::ALL[index];
                society.adjust(param, delta);
                society.scale(param, factor);
                for p in SocietyParam::ALL {
                    let v = society.get(p);
                    prop_assert!((0.0..=100.0).contains(&v), "{:?} = {}", p, v);
                }
            }
        }
    }
}
