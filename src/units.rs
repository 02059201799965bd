//! Player-side unit orders: recruitment, movement, installations on danger
//! points, selection, and the start-of-turn refresh.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::{
    hex::{self, Coord},
    rules,
    world::{EntityId, Goods, InstallationKind, UnitKind, World},
};

pub fn can_recruit(world: &World, settlement_id: EntityId, kind: UnitKind) -> bool {
    let Some(settlement) = world.settlement(settlement_id) else {
        return false;
    };
    world.can_afford(rules::unit_stats(kind).cost) && world.can_stack(settlement.coord)
}

pub fn recruit(world: &mut World, settlement_id: EntityId, kind: UnitKind) -> Option<EntityId> {
    if !can_recruit(world, settlement_id, kind) {
        return None;
    }
    let coord = world.settlement(settlement_id)?.coord;
    world.spend(rules::unit_stats(kind).cost);
    let id = world.insert_unit(kind, coord);
    world.refresh_territory();
    Some(id)
}

/// Price of stepping onto `coord`, or `None` when terrain, an enemy or a
/// full stack blocks it.
pub fn step_cost(world: &World, coord: Coord) -> Option<u32> {
    let terrain = world.map.terrain(coord)?;
    let cost = rules::movement_cost(terrain)?;
    if world.enemy_at(coord).is_some() || !world.can_stack(coord) {
        return None;
    }
    Some(cost)
}

/// Every hex the unit can still reach this turn with the movement it would
/// spend getting there.
pub fn valid_moves(world: &World, unit_id: EntityId) -> BTreeMap<Coord, u32> {
    let Some(unit) = world.unit(unit_id) else {
        return BTreeMap::new();
    };
    if unit.moves_left == 0 {
        return BTreeMap::new();
    }
    hex::reachable(unit.coord, unit.moves_left, |c| step_cost(world, c))
}

pub fn can_move(world: &World, unit_id: EntityId, to: Coord) -> bool {
    valid_moves(world, unit_id).contains_key(&to)
}

pub fn move_unit(world: &mut World, unit_id: EntityId, to: Coord) -> bool {
    let Some(&cost) = valid_moves(world, unit_id).get(&to) else {
        return false;
    };
    let Some(unit) = world.unit_mut(unit_id) else {
        return false;
    };
    unit.coord = to;
    unit.moves_left = unit.moves_left.saturating_sub(cost);
    let exhausted = unit.moves_left == 0;
    if exhausted && world.selection.unit == Some(unit_id) {
        world.selection.unit = None;
    }
    world.refresh_territory();
    true
}

/// Cheapest route for a forecast overlay, ignoring this turn's budget.
pub fn plan_route(world: &World, unit_id: EntityId, goal: Coord) -> Option<Vec<Coord>> {
    let unit = world.unit(unit_id)?;
    hex::find_path(
        unit.coord,
        goal,
        |c| step_cost(world, c).is_some(),
        |c| step_cost(world, c).unwrap_or(1),
        None,
    )
}

pub fn can_build_installation(world: &World, coord: Coord, kind: InstallationKind) -> bool {
    let Some(hex) = world.hex(coord) else {
        return false;
    };
    hex.danger_point.is_some()
        && hex.installation.is_none()
        && world.can_afford(rules::installation_cost(kind))
        && world.has_units_at(coord)
        && world.enemy_at(coord).is_none()
}

/// Build on an occupied danger point, neutralising it.
pub fn build_installation(world: &mut World, coord: Coord, kind: InstallationKind) -> bool {
    if !can_build_installation(world, coord, kind) {
        return false;
    }
    world.spend(rules::installation_cost(kind));
    if let Some(hex) = world.hex_mut(coord) {
        hex.installation = Some(kind);
        hex.danger_point = None;
    }
    world.refresh_territory();
    true
}

/// Dismantle an installation for half its cost back.
pub fn teardown_installation(world: &mut World, coord: Coord) -> Option<Goods> {
    let kind = world.hex_mut(coord)?.installation.take()?;
    let refund = rules::installation_cost(kind).half();
    world.treasury += refund;
    world.refresh_territory();
    Some(refund)
}

/// Select a hex, picking up the first ready Cavalry, then Infantry, then
/// Heavy Infantry standing on it.
pub fn select_hex(world: &mut World, coord: Coord) {
    world.selection.hex = world.map.contains(coord).then_some(coord);
    world.selection.unit = None;
    let ready: Vec<(EntityId, UnitKind)> = world
        .units_at(coord)
        .iter()
        .filter(|u| u.moves_left > 0)
        .map(|u| (u.id, u.kind))
        .collect();
    for kind in [UnitKind::Cavalry, UnitKind::Infantry, UnitKind::HeavyInfantry] {
        if let Some((id, _)) = ready.iter().find(|(_, k)| *k == kind) {
            world.selection.unit = Some(*id);
            return;
        }
    }
}

pub fn select_unit(world: &mut World, unit_id: EntityId) -> bool {
    match world.unit(unit_id) {
        Some(unit) if unit.moves_left > 0 => {
            world.selection.unit = Some(unit_id);
            true
        }
        _ => false,
    }
}

pub fn clear_selection(world: &mut World) {
    world.selection.hex = None;
    world.selection.unit = None;
}

/// Units that kept some movement heal 20% (30% inside a settlement or
/// installation), rounded up. Everyone gets full movement back.
pub fn refresh_units(world: &mut World) {
    let sheltered: Vec<bool> = world
        .units
        .iter()
        .map(|u| {
            world.settlement_at(u.coord).is_some()
                || world.hex(u.coord).is_some_and(|h| h.installation.is_some())
        })
        .collect();
    for (unit, sheltered) in world.units.iter_mut().zip(sheltered) {
        if unit.moves_left > 0 {
            let percent = if sheltered { 30 } else { 20 };
            let heal = (unit.max_health * percent + 99) / 100;
            unit.health = (unit.health + heal).min(unit.max_health);
        }
        unit.moves_left = rules::unit_stats(unit.kind).speed;
    }
}

/// Order every stack front to back: Cavalry, Heavy Infantry, Infantry,
/// Worker, healthiest first within a kind.
pub fn sort_stacks(world: &mut World) {
    world
        .units
        .sort_by_key(|u| (u.kind.stack_priority(), Reverse(u.health)));
}
