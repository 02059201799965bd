use rand::Rng;
use serde::Serialize;

use crate::{
    hex::Coord,
    rng::Rando,
    rules::{self, CAVALRY_BRACED_DEFENSE},
    society::SocietyParam,
    world::{EntityId, Goods, UnitKind, World},
};

pub const UNREST_UNIT_LOST_ATTACKING: f64 = 2.0;

/// The single damage roll behind every fight: expected damage is
/// `attack² / (attack + defense)`, jittered by a normal sample whose spread
/// is a quarter of the expectation (at least one point), floored and never
/// negative.
pub fn calculate_damage(attack: i32, defense: i32, rng: &mut impl Rng) -> i32 {
    let attack = f64::from(attack.max(0));
    let defense = f64::from(defense.max(0));
    if attack + defense <= 0.0 {
        return 0;
    }
    let expected = attack * attack / (attack + defense);
    let std_dev = (expected * 0.25).max(1.0);
    (expected + rng.gaussian() * std_dev).floor().max(0.0) as i32
}

/// 2 for a camp rising to 4 for a capital.
pub fn settlement_defense(tier: u8) -> i32 {
    (18 + 2 * i32::from(tier)) / 9
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CombatResult {
    pub damage: i32,
    pub killed: bool,
    pub counter_damage: Option<i32>,
    pub unit_killed: bool,
    pub loot: Option<Goods>,
}

pub fn can_attack(world: &World, unit_id: EntityId, target: Coord) -> bool {
    let Some(unit) = world.unit(unit_id) else {
        return false;
    };
    unit.moves_left > 0 && unit.coord.is_adjacent(target) && world.enemy_at(target).is_some()
}

/// A unit charges the enemy on an adjacent hex. The charge spends all of the
/// unit's moves. A kill pays out two 2d6 loot rolls and the unit advances
/// into the vacated hex; otherwise the enemy strikes back.
pub fn attack(
    world: &mut World,
    unit_id: EntityId,
    target: Coord,
    rng: &mut impl Rng,
) -> Option<CombatResult> {
    if !can_attack(world, unit_id, target) {
        return None;
    }
    let unit = world.unit(unit_id)?.clone();
    let enemy = world.enemy_at(target)?.clone();
    let stats = rules::unit_stats(unit.kind);

    let damage = calculate_damage(
        stats.attack,
        enemy.defense + world.structural_defense(target),
        rng,
    );
    if let Some(u) = world.unit_mut(unit_id) {
        u.moves_left = 0;
    }
    if world.selection.unit == Some(unit_id) {
        world.selection.unit = None;
    }

    let mut result = CombatResult {
        damage,
        killed: false,
        counter_damage: None,
        unit_killed: false,
        loot: None,
    };

    if enemy.health - damage <= 0 {
        world.remove_enemy(enemy.id);
        let loot = Goods::new(
            i64::from(rng.d6() + rng.d6()),
            i64::from(rng.d6() + rng.d6()),
        );
        world.treasury += loot;
        result.killed = true;
        result.loot = Some(loot);
        if world.enemy_at(target).is_none() {
            if let Some(u) = world.unit_mut(unit_id) {
                u.coord = target;
            }
        }
    } else {
        if let Some(e) = world.enemy_mut(enemy.id) {
            e.health -= damage;
        }
        let braced = if unit.kind == UnitKind::Cavalry {
            CAVALRY_BRACED_DEFENSE
        } else {
            stats.defense
        };
        let counter = calculate_damage(
            enemy.attack,
            braced + world.structural_defense(unit.coord),
            rng,
        );
        result.counter_damage = Some(counter);
        if unit.health - counter <= 0 {
            world.remove_unit(unit_id);
            world
                .society
                .adjust(SocietyParam::Unrest, UNREST_UNIT_LOST_ATTACKING);
            result.unit_killed = true;
        } else if let Some(u) = world.unit_mut(unit_id) {
            u.health -= counter;
        }
    }

    world.refresh_territory();
    Some(result)
}
