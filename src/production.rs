use crate::{
    hex::Coord,
    rules,
    society::Society,
    world::{Goods, UnitKind, World},
};

/// Settlement output plus resource output on controlled hexes, before the
/// society takes its cut.
pub fn raw_income(world: &World) -> Goods {
    let mut total = Goods::ZERO;
    for settlement in world.settlements() {
        total += rules::tier(settlement.tier).production;
    }
    for hex in world.map.hexes().filter(|h| h.controlled) {
        if let Some(resource) = hex.resource {
            total += rules::resource_yield(resource).scaled(worker_multiplier(world, hex.coord));
        }
    }
    total
}

fn worker_multiplier(world: &World, coord: Coord) -> i64 {
    let has_worker = world
        .units_at(coord)
        .iter()
        .any(|u| u.kind == UnitKind::Worker);
    if has_worker {
        2
    } else {
        1
    }
}

/// Corruption skims gold, then decadence taxes both goods at half its
/// nominal rate. Each stage floors on its own.
pub fn apply_modifiers(raw: Goods, society: &Society) -> Goods {
    let corruption = 1.0 - society.corruption() / 100.0;
    let decadence = 1.0 - society.decadence() / 200.0;

    let gold = floor_scaled(raw.gold, corruption);
    let gold = floor_scaled(gold, decadence);
    let materials = floor_scaled(raw.materials, decadence);
    Goods::new(gold, materials)
}

fn floor_scaled(value: i64, factor: f64) -> i64 {
    (value as f64 * factor).floor() as i64
}

/// Projected income for the coming turn.
pub fn income(world: &World) -> Goods {
    apply_modifiers(raw_income(world), &world.society)
}

pub fn apply_production(world: &mut World) -> Goods {
    let income = income(world);
    world.treasury += income;
    world.events.income = income;
    income
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use crate::society::SocietyParam;
    use crate::world::{HexMap, ResourceKind, Terrain};

    fn camp_world() -> World {
        let mut world = World::new(HexMap::uniform(6, Terrain::Plains), Difficulty::Normal);
        world.insert_settlement(Coord::ORIGIN, 0);
        world.refresh_territory();
        world
    }

    #[test]
    fn lone_camp_yields_its_table_entry() {
        let world = camp_world();
        assert_eq!(income(&world), Goods::new(1, 1));
    }

    #[test]
    fn resources_count_only_when_controlled_and_double_with_a_worker() {
        let mut world = camp_world();
        world.hex_mut(Coord::new(1, 0)).unwrap().resource = Some(ResourceKind::Quarry);
        world.hex_mut(Coord::new(4, 0)).unwrap().resource = Some(ResourceKind::GoldDeposit);
        assert_eq!(raw_income(&world), Goods::new(1, 3));

        world.insert_unit(UnitKind::Worker, Coord::new(1, 0));
        world.refresh_territory();
        assert_eq!(raw_income(&world), Goods::new(1, 5));

        world.insert_unit(UnitKind::Infantry, Coord::new(4, 0));
        world.refresh_territory();
        assert_eq!(raw_income(&world), Goods::new(3, 5));
    }

    #[test]
    fn modifiers_floor_at_each_stage() {
        let mut society = Society::default();
        society.set(SocietyParam::Corruption, 50.0);
        society.set(SocietyParam::Decadence, 50.0);
        assert_eq!(apply_modifiers(Goods::new(11, 10), &society), Goods::new(3, 7));
    }

    #[test]
    fn applying_credits_the_treasury() {
        let mut world = camp_world();
        let before = world.treasury;
        let paid = apply_production(&mut world);
        assert_eq!(world.treasury, before + paid);
        assert_eq!(world.events.income, paid);
    }
}
