//! Hostile side of the turn: danger points wearing down their occupiers and
//! spawning raiders, roaming enemies picking fights or wandering toward
//! their purpose, and the occasional wild arrival out of the fog.

use rand::Rng;
use tracing::{debug, info};

use crate::{
    combat::calculate_damage,
    hex::Coord,
    rng::Rando,
    rules,
    society::SocietyParam,
    world::{CombatEvent, DangerPoint, EnemyKind, EnemyPurpose, EntityId, Goods, UnitKind, World},
};

pub const UNREST_UNIT_LOST_DEFENDING: f64 = 3.0;
pub const UNREST_SETTLEMENT_RAIDED: f64 = 5.0;
pub const UNREST_SETTLEMENT_DESTROYED: f64 = 10.0;
pub const UNREST_INSTALLATION_OVERRUN: f64 = 5.0;
pub const RAID_SUCCESS_CHANCE: f64 = 0.3;
pub const CLEARING_BONUS: i64 = 10;
pub const WILD_SPAWN_MIN_DISTANCE: i32 = 3;

const PURPOSES: [EnemyPurpose; 3] = [
    EnemyPurpose::Random,
    EnemyPurpose::SeekResource,
    EnemyPurpose::SeekSettlement,
];

/// Order in which an enemy picks among adjacent units.
const TARGET_PRIORITY: [UnitKind; 4] = [
    UnitKind::HeavyInfantry,
    UnitKind::Infantry,
    UnitKind::Cavalry,
    UnitKind::Worker,
];

/// Walkable land with nothing standing on it. `mover` is ignored when
/// checking for other enemies so an enemy never blocks itself.
pub fn is_valid_enemy_hex(world: &World, coord: Coord, mover: Option<EntityId>) -> bool {
    let Some(hex) = world.hex(coord) else {
        return false;
    };
    if rules::movement_cost(hex.terrain).is_none() || hex.installation.is_some() {
        return false;
    }
    let blocked_by_enemy = world
        .enemy_at(coord)
        .is_some_and(|e| Some(e.id) != mover);
    !blocked_by_enemy && !world.has_units_at(coord) && world.settlement_at(coord).is_none()
}

fn danger_coords(world: &World) -> Vec<Coord> {
    world
        .map
        .hexes()
        .filter(|h| h.danger_point.is_some())
        .map(|h| h.coord)
        .collect()
}

/// Strike the front unit of a stack. Returns whether it died.
fn strike_front_unit(
    world: &mut World,
    coord: Coord,
    attack: i32,
    rng: &mut impl Rng,
) -> Option<(UnitKind, bool)> {
    let (unit_id, kind) = world.units_at(coord).first().map(|u| (u.id, u.kind))?;
    Some((kind, strike_unit(world, unit_id, attack, rng)))
}

fn strike_unit(world: &mut World, unit_id: EntityId, attack: i32, rng: &mut impl Rng) -> bool {
    let Some((kind, coord)) = world.unit(unit_id).map(|u| (u.kind, u.coord)) else {
        return false;
    };
    let defense = rules::unit_stats(kind).defense + world.structural_defense(coord);
    let damage = calculate_damage(attack, defense, rng);
    let Some(unit) = world.unit_mut(unit_id) else {
        return false;
    };
    unit.health -= damage;
    if unit.health > 0 {
        return false;
    }
    world.remove_unit(unit_id);
    world
        .society
        .adjust(SocietyParam::Unrest, UNREST_UNIT_LOST_DEFENDING);
    true
}

/// Every danger point with units on it attacks the front unit. If anyone is
/// left standing, a d6 above the point's strength wears it down by one and
/// pays out loot; wearing it to nothing clears the hex for a tenfold bonus.
pub fn process_danger_occupation(world: &mut World, rng: &mut impl Rng) {
    for coord in danger_coords(world) {
        if !world.has_units_at(coord) {
            continue;
        }
        let danger = world.hex(coord).and_then(|h| h.danger_point);
        let Some(strength) = danger.map(|d| d.strength) else {
            continue;
        };
        let attack = rules::enemy_stats(rules::enemy_kind_for_strength(strength)).attack;
        if let Some((_, unit_killed)) = strike_front_unit(world, coord, attack, rng) {
            world.record_combat(coord, CombatEvent::HazardStrike { unit_killed });
        }

        if !world.has_units_at(coord) || rng.d6() <= strength {
            continue;
        }
        let loot = Goods::new(2 * i64::from(strength), 2 * i64::from(strength));
        world.treasury += loot;
        world.events.loot += loot;

        let remaining = strength - 1;
        if remaining == 0 {
            if let Some(hex) = world.hex_mut(coord) {
                hex.danger_point = None;
            }
            let bonus = loot.scaled(CLEARING_BONUS);
            world.treasury += bonus;
            world.events.loot += bonus;
            world.events.danger_points_cleared.push(coord);
            info!(coord = %coord, "danger point cleared");
        } else if let Some(danger) = world.hex_mut(coord).and_then(|h| h.danger_point.as_mut()) {
            danger.strength = remaining;
        }
    }
}

/// Drain every countdown. A point that runs out sends an enemy onto a random
/// neighbour; a unit already standing there is ambushed instead, and the
/// raider only stays if it wins outright.
pub fn process_danger_spawns(world: &mut World, rng: &mut impl Rng) {
    for coord in danger_coords(world) {
        let drain = rng.float(0.5, 1.5);
        let Some(danger) = world.hex_mut(coord).and_then(|h| h.danger_point.as_mut()) else {
            continue;
        };
        danger.turns_until_spawn -= drain;
        if danger.turns_until_spawn > 0.0 {
            continue;
        }
        let strength = danger.strength;
        danger.turns_until_spawn = f64::from(rules::spawn_rate(strength));

        let targets: Vec<Coord> = coord
            .neighbors()
            .into_iter()
            .filter(|n| is_spawn_target(world, *n))
            .collect();
        let Some(&target) = rng.choice(&targets) else {
            continue;
        };
        let kind = rules::enemy_kind_for_strength(strength);
        if world.has_units_at(target) {
            ambush(world, target, kind, rng);
        } else {
            spawn_enemy(world, kind, target, rng);
        }
    }
}

fn is_spawn_target(world: &World, coord: Coord) -> bool {
    let Some(hex) = world.hex(coord) else {
        return false;
    };
    rules::movement_cost(hex.terrain).is_some()
        && hex.installation.is_none()
        && world.enemy_at(coord).is_none()
        && world.settlement_at(coord).is_none()
}

fn ambush(world: &mut World, coord: Coord, kind: EnemyKind, rng: &mut impl Rng) {
    let stats = rules::enemy_stats(kind);
    let Some((unit_kind, unit_killed)) = strike_front_unit(world, coord, stats.attack, rng) else {
        return;
    };
    let counter = calculate_damage(rules::unit_stats(unit_kind).attack, stats.defense, rng);
    world.record_combat(coord, CombatEvent::SpawnAmbush { unit_killed });

    let survived = stats.health - counter > 0;
    if unit_killed && survived && !world.has_units_at(coord) {
        spawn_enemy(world, kind, coord, rng);
    }
}

fn spawn_enemy(world: &mut World, kind: EnemyKind, coord: Coord, rng: &mut impl Rng) -> EntityId {
    let purpose = rng.choice(&PURPOSES).copied().unwrap_or(EnemyPurpose::Random);
    let id = world.insert_enemy(kind, coord, purpose);
    world.events.enemies_spawned += 1;
    debug!(coord = %coord, ?kind, ?purpose, "enemy spawned");
    id
}

/// Each enemy attacks if it can, otherwise takes one step.
pub fn process_enemy_turn(world: &mut World, rng: &mut impl Rng) {
    for id in world.enemy_ids() {
        if world.enemy(id).is_none() {
            continue;
        }
        if try_enemy_attack(world, id, rng) {
            continue;
        }
        move_enemy(world, id, rng);
    }
}

/// Units first (heaviest kind first, random within a kind), then
/// settlements, then undefended installations.
fn try_enemy_attack(world: &mut World, id: EntityId, rng: &mut impl Rng) -> bool {
    let Some(enemy) = world.enemy(id).cloned() else {
        return false;
    };

    for kind in TARGET_PRIORITY {
        let targets: Vec<EntityId> = world
            .units()
            .iter()
            .filter(|u| u.kind == kind && u.coord.is_adjacent(enemy.coord))
            .map(|u| u.id)
            .collect();
        let Some(&target) = rng.choice(&targets) else {
            continue;
        };
        let Some(coord) = world.unit(target).map(|u| u.coord) else {
            continue;
        };
        let unit_killed = strike_unit(world, target, enemy.attack, rng);
        let counter = calculate_damage(rules::unit_stats(kind).attack, enemy.defense, rng);
        let enemy_dead = world.enemy_mut(id).is_some_and(|e| {
            e.health -= counter;
            e.health <= 0
        });
        if enemy_dead {
            world.remove_enemy(id);
        }
        world.record_combat(coord, CombatEvent::EnemyStrike { unit_killed });
        world.refresh_territory();
        return true;
    }

    let raided = world
        .settlements()
        .find(|s| s.coord.is_adjacent(enemy.coord))
        .map(|s| s.id);
    if let Some(settlement_id) = raided {
        raid_settlement(world, settlement_id, rng);
        return true;
    }

    let overrun = enemy.coord.neighbors().into_iter().find(|n| {
        world.hex(*n).is_some_and(|h| h.installation.is_some()) && !world.has_units_at(*n)
    });
    if let Some(coord) = overrun {
        overrun_installation(world, id, coord, rng);
        return true;
    }
    false
}

fn raid_settlement(world: &mut World, settlement_id: EntityId, rng: &mut impl Rng) {
    let Some(settlement) = world.settlement(settlement_id).cloned() else {
        return;
    };
    world
        .society
        .adjust(SocietyParam::Unrest, UNREST_SETTLEMENT_RAIDED);

    let mut destroyed = false;
    if !world.has_units_at(settlement.coord) && rng.chance(RAID_SUCCESS_CHANCE) {
        if settlement.tier > 0 {
            if let Some(s) = world.settlement_mut(settlement_id) {
                s.tier -= 1;
            }
            debug!(coord = %settlement.coord, tier = settlement.tier - 1, "settlement sacked");
        } else if world.settlement_count() > 1 {
            world.remove_settlement(settlement_id);
            world
                .society
                .adjust(SocietyParam::Unrest, UNREST_SETTLEMENT_DESTROYED);
            world.events.lost.push(settlement.coord);
            destroyed = true;
            info!(coord = %settlement.coord, "settlement razed by raiders");
        }
        world.refresh_territory();
    }
    world.record_combat(settlement.coord, CombatEvent::SettlementRaid { destroyed });
}

/// The installation falls and a fresh danger point of random size takes its
/// place. The raider is spent in the process.
fn overrun_installation(world: &mut World, enemy_id: EntityId, coord: Coord, rng: &mut impl Rng) {
    let strength = rng.int(1, i32::from(rules::MAX_DANGER_STRENGTH)) as u8;
    let countdown = rng.int(1, rules::spawn_rate(strength));
    if let Some(hex) = world.hex_mut(coord) {
        hex.installation = None;
        hex.danger_point = Some(DangerPoint {
            strength,
            turns_until_spawn: f64::from(countdown),
        });
    }
    world.remove_enemy(enemy_id);
    world
        .society
        .adjust(SocietyParam::Unrest, UNREST_INSTALLATION_OVERRUN);
    world.record_combat(coord, CombatEvent::InstallationOverrun);
    world.refresh_territory();
    info!(coord = %coord, strength, "installation overrun");
}

fn move_enemy(world: &mut World, id: EntityId, rng: &mut impl Rng) {
    let Some((from, purpose)) = world.enemy(id).map(|e| (e.coord, e.purpose)) else {
        return;
    };
    let moves: Vec<Coord> = from
        .neighbors()
        .into_iter()
        .filter(|n| is_valid_enemy_hex(world, *n, Some(id)))
        .collect();

    let target = match purpose {
        EnemyPurpose::Random => None,
        EnemyPurpose::SeekResource => world.find_nearest(from, |h| h.resource.is_some()),
        EnemyPurpose::SeekSettlement => world.nearest_settlement(from),
    };
    let step = target
        .and_then(|goal| closer_step(&moves, from, goal))
        .or_else(|| rng.choice(&moves).copied());

    if let (Some(step), Some(enemy)) = (step, world.enemy_mut(id)) {
        enemy.coord = step;
    }
}

/// The move that brings us nearest `goal`, provided it actually gains ground.
fn closer_step(moves: &[Coord], from: Coord, goal: Coord) -> Option<Coord> {
    let best = moves.iter().copied().min_by_key(|c| c.distance(goal))?;
    (best.distance(goal) < from.distance(goal)).then_some(best)
}

/// Roll the difficulty's wild-spawn chance and, on success, drop an enemy
/// somewhere outside the realm's reach.
pub fn process_wild_spawn(world: &mut World, rng: &mut impl Rng) -> Option<EntityId> {
    if !rng.chance(world.difficulty.wild_spawn_chance()) {
        return None;
    }
    let candidates: Vec<Coord> = world
        .map
        .hexes()
        .filter(|h| !h.controlled)
        .map(|h| h.coord)
        .filter(|c| is_valid_enemy_hex(world, *c, None))
        .filter(|c| {
            world
                .settlements()
                .all(|s| s.coord.distance(*c) >= WILD_SPAWN_MIN_DISTANCE)
        })
        .collect();
    let coord = *rng.choice(&candidates)?;
    let kind = if rng.chance(world.difficulty.monster_share()) {
        EnemyKind::Monster
    } else if rng.chance(0.5) {
        EnemyKind::Small
    } else {
        EnemyKind::Medium
    };
    Some(spawn_enemy(world, kind, coord, rng))
}
