use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    config::Difficulty,
    hex::Coord,
    options::SocietyOption,
    rules::{self, MAX_UNITS_PER_HEX, STARTING_TREASURY},
    society::Society,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Terrain {
    Water,
    Plains,
    Hills,
    Mountain,
}

impl Terrain {
    pub fn is_land(self) -> bool {
        self != Terrain::Water
    }

    /// Plains and hills can hold settlements and be walked by enemies.
    pub fn is_open(self) -> bool {
        matches!(self, Terrain::Plains | Terrain::Hills)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Forest,
    Quarry,
    GoldDeposit,
}

/// Gold and materials, used for the treasury, costs and income alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goods {
    pub gold: i64,
    pub materials: i64,
}

impl Goods {
    pub const ZERO: Goods = Goods::new(0, 0);

    pub const fn new(gold: i64, materials: i64) -> Self {
        Self { gold, materials }
    }

    /// Whether this stock pays for `cost`. Negative cost components are
    /// gains and never block a purchase.
    pub fn covers(&self, cost: Goods) -> bool {
        self.gold >= cost.gold.max(0) && self.materials >= cost.materials.max(0)
    }

    pub fn half(self) -> Goods {
        Goods::new(self.gold / 2, self.materials / 2)
    }

    pub fn scaled(self, factor: i64) -> Goods {
        Goods::new(self.gold * factor, self.materials * factor)
    }
}

impl std::ops::Add for Goods {
    type Output = Goods;

    fn add(self, rhs: Goods) -> Goods {
        Goods::new(self.gold + rhs.gold, self.materials + rhs.materials)
    }
}

impl std::ops::AddAssign for Goods {
    fn add_assign(&mut self, rhs: Goods) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Goods {
    type Output = Goods;

    fn sub(self, rhs: Goods) -> Goods {
        Goods::new(self.gold - rhs.gold, self.materials - rhs.materials)
    }
}

impl std::ops::SubAssign for Goods {
    fn sub_assign(&mut self, rhs: Goods) {
        *self = *self - rhs;
    }
}

impl fmt::Display for Goods {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}g {}m", self.gold, self.materials)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DangerPoint {
    pub strength: u8,
    pub turns_until_spawn: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationKind {
    Outpost,
    Fort,
    Garrison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hex {
    pub coord: Coord,
    pub terrain: Terrain,
    pub elevation: f64,
    pub resource: Option<ResourceKind>,
    pub danger_point: Option<DangerPoint>,
    pub installation: Option<InstallationKind>,
    pub controlled: bool,
    pub is_edge: bool,
}

impl Hex {
    pub fn new(coord: Coord, terrain: Terrain, elevation: f64) -> Self {
        Self {
            coord,
            terrain,
            elevation,
            resource: None,
            danger_point: None,
            installation: None,
            controlled: false,
            is_edge: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HexMap {
    radius: i32,
    hexes: BTreeMap<Coord, Hex>,
}

impl HexMap {
    pub fn new(radius: i32) -> Self {
        Self {
            radius,
            hexes: BTreeMap::new(),
        }
    }

    /// A map of the given radius filled with plains, for tests and tooling.
    pub fn uniform(radius: i32, terrain: Terrain) -> Self {
        let mut map = Self::new(radius);
        for coord in Coord::ORIGIN.within(radius) {
            let mut hex = Hex::new(coord, terrain, 50.0);
            hex.is_edge = coord.distance(Coord::ORIGIN) >= radius - 1;
            map.insert(hex);
        }
        map
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn insert(&mut self, hex: Hex) {
        self.hexes.insert(hex.coord, hex);
    }

    pub fn get(&self, coord: Coord) -> Option<&Hex> {
        self.hexes.get(&coord)
    }

    pub fn get_mut(&mut self, coord: Coord) -> Option<&mut Hex> {
        self.hexes.get_mut(&coord)
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.hexes.contains_key(&coord)
    }

    pub fn len(&self) -> usize {
        self.hexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hexes.is_empty()
    }

    pub fn hexes(&self) -> impl Iterator<Item = &Hex> {
        self.hexes.values()
    }

    pub fn hexes_mut(&mut self) -> impl Iterator<Item = &mut Hex> {
        self.hexes.values_mut()
    }

    pub fn coords(&self) -> Vec<Coord> {
        self.hexes.keys().copied().collect()
    }

    pub fn terrain(&self, coord: Coord) -> Option<Terrain> {
        self.get(coord).map(|h| h.terrain)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settlement {
    pub id: EntityId,
    pub coord: Coord,
    pub tier: u8,
    pub growth_points: u32,
}

impl Settlement {
    pub fn name(&self) -> &'static str {
        rules::tier(self.tier).name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Worker,
    Infantry,
    HeavyInfantry,
    Cavalry,
}

impl UnitKind {
    pub const ALL: [UnitKind; 4] = [
        UnitKind::Worker,
        UnitKind::Infantry,
        UnitKind::HeavyInfantry,
        UnitKind::Cavalry,
    ];

    /// Position in a sorted stack; lower leads.
    pub fn stack_priority(self) -> u8 {
        match self {
            UnitKind::Cavalry => 0,
            UnitKind::HeavyInfantry => 1,
            UnitKind::Infantry => 2,
            UnitKind::Worker => 3,
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnitKind::Worker => "Worker",
            UnitKind::Infantry => "Infantry",
            UnitKind::HeavyInfantry => "Heavy Infantry",
            UnitKind::Cavalry => "Cavalry",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Unit {
    pub id: EntityId,
    pub kind: UnitKind,
    pub coord: Coord,
    pub health: i32,
    pub max_health: i32,
    pub moves_left: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    Small,
    Medium,
    Large,
    Monster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyPurpose {
    Random,
    SeekResource,
    SeekSettlement,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: EntityId,
    pub kind: EnemyKind,
    pub coord: Coord,
    pub attack: i32,
    pub defense: i32,
    pub health: i32,
    pub max_health: i32,
    pub purpose: EnemyPurpose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Era {
    #[default]
    Barbarian,
    Kingdom,
    Empire,
}

impl Era {
    pub fn next(self) -> Option<Era> {
        match self {
            Era::Barbarian => Some(Era::Kingdom),
            Era::Kingdom => Some(Era::Empire),
            Era::Empire => None,
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Era::Barbarian => "Barbarian",
            Era::Kingdom => "Kingdom",
            Era::Empire => "Empire",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CombatEvent {
    /// A danger point struck the unit occupying it.
    HazardStrike { unit_killed: bool },
    /// A roaming enemy struck a unit.
    EnemyStrike { unit_killed: bool },
    /// A danger point spawn ran into a unit standing next to it.
    SpawnAmbush { unit_killed: bool },
    SettlementRaid { destroyed: bool },
    InstallationOverrun,
}

/// One entry of the per-turn combat log handed to renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatReport {
    pub coord: Coord,
    #[serde(flatten)]
    pub event: CombatEvent,
}

/// What happened during the most recent `end_turn`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnEvents {
    pub income: Goods,
    pub loot: Goods,
    pub founded: Vec<Coord>,
    pub revolts: Vec<Coord>,
    pub lost: Vec<Coord>,
    pub danger_points_cleared: Vec<Coord>,
    pub enemies_spawned: u32,
    pub era_advanced: Option<Era>,
    pub collapsed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub hex: Option<Coord>,
    pub unit: Option<EntityId>,
}

pub struct World {
    pub map: HexMap,
    pub turn: u32,
    pub era: Era,
    pub treasury: Goods,
    pub society: Society,
    pub difficulty: Difficulty,
    pub selection: Selection,
    pub combat_report: Vec<CombatReport>,
    pub events: TurnEvents,
    pub(crate) society_options: Vec<&'static SocietyOption>,
    pub(crate) settlements: BTreeMap<EntityId, Settlement>,
    pub(crate) units: Vec<Unit>,
    pub(crate) enemies: BTreeMap<EntityId, Enemy>,
    next_id: u64,
}

impl World {
    pub fn new(map: HexMap, difficulty: Difficulty) -> Self {
        Self {
            map,
            turn: 1,
            era: Era::Barbarian,
            treasury: STARTING_TREASURY,
            society: Society::default(),
            difficulty,
            selection: Selection::default(),
            combat_report: Vec::new(),
            events: TurnEvents::default(),
            society_options: Vec::new(),
            settlements: BTreeMap::new(),
            units: Vec::new(),
            enemies: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn hex(&self, coord: Coord) -> Option<&Hex> {
        self.map.get(coord)
    }

    pub fn hex_mut(&mut self, coord: Coord) -> Option<&mut Hex> {
        self.map.get_mut(coord)
    }

    pub fn can_afford(&self, cost: Goods) -> bool {
        self.treasury.covers(cost)
    }

    pub fn spend(&mut self, cost: Goods) {
        self.treasury -= cost;
    }

    // settlements

    pub fn settlements(&self) -> impl Iterator<Item = &Settlement> {
        self.settlements.values()
    }

    pub fn settlement_count(&self) -> usize {
        self.settlements.len()
    }

    pub fn settlement(&self, id: EntityId) -> Option<&Settlement> {
        self.settlements.get(&id)
    }

    pub fn settlement_mut(&mut self, id: EntityId) -> Option<&mut Settlement> {
        self.settlements.get_mut(&id)
    }

    pub fn settlement_at(&self, coord: Coord) -> Option<&Settlement> {
        self.settlements.values().find(|s| s.coord == coord)
    }

    pub fn settlement_ids(&self) -> Vec<EntityId> {
        self.settlements.keys().copied().collect()
    }

    pub(crate) fn insert_settlement(&mut self, coord: Coord, tier: u8) -> EntityId {
        let id = self.allocate();
        self.settlements.insert(
            id,
            Settlement {
                id,
                coord,
                tier,
                growth_points: 0,
            },
        );
        id
    }

    pub(crate) fn remove_settlement(&mut self, id: EntityId) -> Option<Settlement> {
        self.settlements.remove(&id)
    }

    /// Ids of every settlement sharing the highest tier.
    pub fn largest_settlements(&self) -> Vec<EntityId> {
        let Some(max_tier) = self.settlements.values().map(|s| s.tier).max() else {
            return Vec::new();
        };
        self.settlements
            .values()
            .filter(|s| s.tier == max_tier)
            .map(|s| s.id)
            .collect()
    }

    // units

    /// All units in stack order.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: EntityId) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut Unit> {
        self.units.iter_mut().find(|u| u.id == id)
    }

    pub fn units_at(&self, coord: Coord) -> Vec<&Unit> {
        self.units.iter().filter(|u| u.coord == coord).collect()
    }

    pub fn has_units_at(&self, coord: Coord) -> bool {
        self.units.iter().any(|u| u.coord == coord)
    }

    pub fn can_stack(&self, coord: Coord) -> bool {
        self.units.iter().filter(|u| u.coord == coord).count() < MAX_UNITS_PER_HEX
    }

    pub(crate) fn insert_unit(&mut self, kind: UnitKind, coord: Coord) -> EntityId {
        let id = self.allocate();
        let stats = rules::unit_stats(kind);
        self.units.push(Unit {
            id,
            kind,
            coord,
            health: stats.health,
            max_health: stats.health,
            moves_left: stats.speed,
        });
        id
    }

    pub(crate) fn remove_unit(&mut self, id: EntityId) -> Option<Unit> {
        let index = self.units.iter().position(|u| u.id == id)?;
        if self.selection.unit == Some(id) {
            self.selection.unit = None;
        }
        Some(self.units.remove(index))
    }

    // enemies

    pub fn enemies(&self) -> impl Iterator<Item = &Enemy> {
        self.enemies.values()
    }

    pub fn enemy(&self, id: EntityId) -> Option<&Enemy> {
        self.enemies.get(&id)
    }

    pub fn enemy_at(&self, coord: Coord) -> Option<&Enemy> {
        self.enemies.values().find(|e| e.coord == coord)
    }

    pub fn enemy_ids(&self) -> Vec<EntityId> {
        self.enemies.keys().copied().collect()
    }

    pub(crate) fn enemy_mut(&mut self, id: EntityId) -> Option<&mut Enemy> {
        self.enemies.get_mut(&id)
    }

    pub(crate) fn insert_enemy(
        &mut self,
        kind: EnemyKind,
        coord: Coord,
        purpose: EnemyPurpose,
    ) -> EntityId {
        let id = self.allocate();
        let stats = rules::enemy_stats(kind);
        self.enemies.insert(
            id,
            Enemy {
                id,
                kind,
                coord,
                attack: stats.attack,
                defense: stats.defense,
                health: stats.health,
                max_health: stats.health,
                purpose,
            },
        );
        id
    }

    pub(crate) fn remove_enemy(&mut self, id: EntityId) -> Option<Enemy> {
        self.enemies.remove(&id)
    }

    // territory

    /// Recompute the `controlled` flag on every hex: land within each
    /// settlement's influence radius, plus every unit's hex and its land
    /// neighbours.
    pub fn refresh_territory(&mut self) {
        for hex in self.map.hexes_mut() {
            hex.controlled = false;
        }

        let settlement_reach: Vec<(Coord, i32)> = self
            .settlements
            .values()
            .map(|s| (s.coord, rules::tier(s.tier).influence_radius))
            .collect();
        for (centre, radius) in settlement_reach {
            for coord in centre.within(radius) {
                if let Some(hex) = self.map.get_mut(coord) {
                    if hex.terrain.is_land() {
                        hex.controlled = true;
                    }
                }
            }
        }

        let unit_coords: Vec<Coord> = self.units.iter().map(|u| u.coord).collect();
        for coord in unit_coords {
            if let Some(hex) = self.map.get_mut(coord) {
                hex.controlled = true;
            }
            for n in coord.neighbors() {
                if let Some(hex) = self.map.get_mut(n) {
                    if hex.terrain.is_land() {
                        hex.controlled = true;
                    }
                }
            }
        }
    }

    pub fn controlled_hex_count(&self) -> usize {
        self.map.hexes().filter(|h| h.controlled).count()
    }

    /// Land hexes inside at least one settlement's influence radius.
    pub fn influenced_land_hexes(&self) -> usize {
        self.map
            .hexes()
            .filter(|h| h.terrain.is_land())
            .filter(|h| {
                self.settlements.values().any(|s| {
                    h.coord.distance(s.coord) <= rules::tier(s.tier).influence_radius
                })
            })
            .count()
    }

    pub fn population(&self) -> u32 {
        self.settlements
            .values()
            .map(|s| rules::tier(s.tier).population)
            .sum()
    }

    /// Closest hex (by hex distance) matching `predicate`; ties resolve to
    /// the first in map order.
    pub fn find_nearest<P>(&self, from: Coord, predicate: P) -> Option<Coord>
    where
        P: Fn(&Hex) -> bool,
    {
        self.map
            .hexes()
            .filter(|h| predicate(h))
            .min_by_key(|h| h.coord.distance(from))
            .map(|h| h.coord)
    }

    pub fn nearest_settlement(&self, from: Coord) -> Option<Coord> {
        self.settlements
            .values()
            .min_by_key(|s| s.coord.distance(from))
            .map(|s| s.coord)
    }

    /// Settlement defense plus installation defense at `coord`.
    pub fn structural_defense(&self, coord: Coord) -> i32 {
        let settlement = self
            .settlement_at(coord)
            .map(|s| crate::combat::settlement_defense(s.tier))
            .unwrap_or(0);
        let installation = self
            .hex(coord)
            .and_then(|h| h.installation)
            .map(rules::installation_defense)
            .unwrap_or(0);
        settlement + installation
    }

    pub fn record_combat(&mut self, coord: Coord, event: CombatEvent) {
        self.combat_report.push(CombatReport { coord, event });
    }

    pub fn society_options(&self) -> &[&'static SocietyOption] {
        &self.society_options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plains_world() -> World {
        World::new(HexMap::uniform(6, Terrain::Plains), Difficulty::Normal)
    }

    #[test]
    fn goods_cover_ignores_gains() {
        let stock = Goods::new(10, 0);
        assert!(stock.covers(Goods::new(10, 0)));
        assert!(stock.covers(Goods::new(-20, 0)));
        assert!(!stock.covers(Goods::new(0, 1)));
        assert_eq!(Goods::new(15, 21).half(), Goods::new(7, 10));
    }

    #[test]
    fn territory_covers_settlement_radius_and_unit_neighbourhood() {
        let mut world = plains_world();
        world.insert_settlement(Coord::ORIGIN, 2);
        world.insert_unit(UnitKind::Infantry, Coord::new(4, -1));
        world.refresh_territory();

        assert!(world.hex(Coord::new(2, 0)).unwrap().controlled);
        assert!(!world.hex(Coord::new(-3, 0)).unwrap().controlled);
        assert!(world.hex(Coord::new(4, -1)).unwrap().controlled);
        assert!(world.hex(Coord::new(5, -1)).unwrap().controlled);
        assert_eq!(world.controlled_hex_count(), 19 + 7);
    }

    #[test]
    fn water_is_never_controlled_by_settlements() {
        let mut world = plains_world();
        world.hex_mut(Coord::new(1, 0)).unwrap().terrain = Terrain::Water;
        world.insert_settlement(Coord::ORIGIN, 0);
        world.refresh_territory();
        assert!(!world.hex(Coord::new(1, 0)).unwrap().controlled);
        assert_eq!(world.controlled_hex_count(), 6);
    }

    #[test]
    fn stacking_limit_is_two() {
        let mut world = plains_world();
        let c = Coord::new(1, 1);
        assert!(world.can_stack(c));
        world.insert_unit(UnitKind::Worker, c);
        world.insert_unit(UnitKind::Cavalry, c);
        assert!(!world.can_stack(c));
        assert_eq!(world.units_at(c).len(), 2);
    }

    #[test]
    fn removing_selected_unit_clears_selection() {
        let mut world = plains_world();
        let id = world.insert_unit(UnitKind::Infantry, Coord::ORIGIN);
        world.selection.unit = Some(id);
        assert!(world.remove_unit(id).is_some());
        assert_eq!(world.selection.unit, None);
        assert!(world.remove_unit(id).is_none());
    }

    #[test]
    fn structural_defense_stacks_settlement_and_installation() {
        let mut world = plains_world();
        world.insert_settlement(Coord::ORIGIN, 9);
        world.hex_mut(Coord::ORIGIN).unwrap().installation = Some(InstallationKind::Fort);
        assert_eq!(world.structural_defense(Coord::ORIGIN), 4 + 2);
        assert_eq!(world.structural_defense(Coord::new(2, 2)), 0);
    }
}
