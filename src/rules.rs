use crate::world::{EnemyKind, Era, Goods, InstallationKind, ResourceKind, Terrain, UnitKind};

pub const MAX_TIER: u8 = 9;
pub const MAX_UNITS_PER_HEX: usize = 2;
pub const STARTING_TREASURY: Goods = Goods::new(100, 50);
pub const FOUNDING_COST: Goods = Goods::new(25, 25);
/// Defense Cavalry braces with when taking a counter-attack after a charge.
pub const CAVALRY_BRACED_DEFENSE: i32 = 5;
/// Turns between spawns, indexed by danger-point strength 1..=6.
pub const SPAWN_RATES: [i32; 6] = [4, 3, 3, 2, 2, 1];
pub const MAX_DANGER_STRENGTH: u8 = 6;
/// Danger-point strength dealt over the ruins of a collapsed realm.
pub const COLLAPSE_HAZARD_BUDGET: u32 = 15;
pub const SETTLEMENTS_PER_SUSTAINABLE_HEXES: usize = 20;

#[derive(Debug, Clone, Copy)]
pub struct TierDefinition {
    pub name: &'static str,
    pub production: Goods,
    pub population: u32,
    pub influence_strength: f64,
    pub influence_radius: i32,
    /// Growth needed to leave this tier.
    pub threshold: u32,
    /// Cost of the paid upgrade out of this tier, for gated tiers only.
    pub gate_cost: Option<Goods>,
}

const TIERS: [TierDefinition; 10] = [
    TierDefinition {
        name: "Camp",
        production: Goods::new(1, 1),
        population: 1,
        influence_strength: 1.0,
        influence_radius: 1,
        threshold: 50,
        gate_cost: None,
    },
    TierDefinition {
        name: "Hamlet",
        production: Goods::new(2, 2),
        population: 2,
        influence_strength: 2.0,
        influence_radius: 1,
        threshold: 105,
        gate_cost: None,
    },
    TierDefinition {
        name: "Village",
        production: Goods::new(4, 3),
        population: 3,
        influence_strength: 3.0,
        influence_radius: 2,
        threshold: 220,
        gate_cost: None,
    },
    TierDefinition {
        name: "Town",
        production: Goods::new(7, 5),
        population: 4,
        influence_strength: 4.0,
        influence_radius: 2,
        threshold: 463,
        gate_cost: None,
    },
    TierDefinition {
        name: "Large Town",
        production: Goods::new(12, 8),
        population: 5,
        influence_strength: 5.0,
        influence_radius: 2,
        threshold: 972,
        gate_cost: None,
    },
    TierDefinition {
        name: "Small City",
        production: Goods::new(20, 12),
        population: 6,
        influence_strength: 6.0,
        influence_radius: 3,
        threshold: 2041,
        gate_cost: Some(Goods::new(100, 150)),
    },
    TierDefinition {
        name: "City",
        production: Goods::new(35, 18),
        population: 8,
        influence_strength: 8.0,
        influence_radius: 3,
        threshold: 4286,
        gate_cost: None,
    },
    TierDefinition {
        name: "Large City",
        production: Goods::new(55, 25),
        population: 10,
        influence_strength: 10.0,
        influence_radius: 3,
        threshold: 9001,
        gate_cost: None,
    },
    TierDefinition {
        name: "Metropolis",
        production: Goods::new(80, 35),
        population: 12,
        influence_strength: 12.0,
        influence_radius: 4,
        threshold: 18902,
        gate_cost: Some(Goods::new(300, 400)),
    },
    TierDefinition {
        name: "Capital",
        production: Goods::new(120, 50),
        population: 15,
        influence_strength: 15.0,
        influence_radius: 4,
        threshold: 100,
        gate_cost: None,
    },
];

pub fn tier(tier: u8) -> &'static TierDefinition {
    &TIERS[usize::from(tier.min(MAX_TIER))]
}

pub fn is_gated(tier_index: u8) -> bool {
    tier(tier_index).gate_cost.is_some()
}

/// Growth a settlement of `tier` gains per turn before randomisation.
pub fn base_growth(tier: u8) -> u32 {
    (10.0 * (1.0 + f64::from(tier)).powf(1.5)).floor() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitStats {
    pub attack: i32,
    pub defense: i32,
    pub speed: u32,
    pub health: i32,
    pub cost: Goods,
}

pub fn unit_stats(kind: UnitKind) -> UnitStats {
    match kind {
        UnitKind::Worker => UnitStats {
            attack: 1,
            defense: 1,
            speed: 2,
            health: 10,
            cost: Goods::new(5, 5),
        },
        UnitKind::Infantry => UnitStats {
            attack: 2,
            defense: 2,
            speed: 2,
            health: 10,
            cost: Goods::new(5, 2),
        },
        UnitKind::HeavyInfantry => UnitStats {
            attack: 3,
            defense: 4,
            speed: 1,
            health: 15,
            cost: Goods::new(10, 7),
        },
        UnitKind::Cavalry => UnitStats {
            attack: 4,
            defense: 1,
            speed: 3,
            health: 8,
            cost: Goods::new(15, 5),
        },
    }
}

pub fn installation_defense(kind: InstallationKind) -> i32 {
    match kind {
        InstallationKind::Outpost => 1,
        InstallationKind::Fort => 2,
        InstallationKind::Garrison => 3,
    }
}

pub fn installation_cost(kind: InstallationKind) -> Goods {
    match kind {
        InstallationKind::Outpost => Goods::new(15, 20),
        InstallationKind::Fort => Goods::new(40, 60),
        InstallationKind::Garrison => Goods::new(100, 150),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnemyStats {
    pub attack: i32,
    pub defense: i32,
    pub health: i32,
}

pub fn enemy_stats(kind: EnemyKind) -> EnemyStats {
    match kind {
        EnemyKind::Small => EnemyStats {
            attack: 3,
            defense: 1,
            health: 6,
        },
        EnemyKind::Medium => EnemyStats {
            attack: 5,
            defense: 1,
            health: 8,
        },
        EnemyKind::Large => EnemyStats {
            attack: 7,
            defense: 2,
            health: 12,
        },
        EnemyKind::Monster => EnemyStats {
            attack: 10,
            defense: 4,
            health: 24,
        },
    }
}

pub fn enemy_kind_for_strength(strength: u8) -> EnemyKind {
    match strength {
        0..=2 => EnemyKind::Small,
        3..=4 => EnemyKind::Medium,
        5 => EnemyKind::Large,
        _ => EnemyKind::Monster,
    }
}

pub fn spawn_rate(strength: u8) -> i32 {
    strength
        .checked_sub(1)
        .and_then(|i| SPAWN_RATES.get(usize::from(i)))
        .copied()
        .unwrap_or(1)
}

/// Entry cost in movement points, `None` for impassable terrain.
pub fn movement_cost(terrain: Terrain) -> Option<u32> {
    match terrain {
        Terrain::Plains => Some(1),
        Terrain::Hills => Some(2),
        Terrain::Water | Terrain::Mountain => None,
    }
}

pub fn resource_yield(kind: ResourceKind) -> Goods {
    match kind {
        ResourceKind::Forest => Goods::new(0, 1),
        ResourceKind::Quarry => Goods::new(0, 2),
        ResourceKind::GoldDeposit => Goods::new(2, 0),
    }
}

pub fn era_pressure(era: Era) -> f64 {
    match era {
        Era::Barbarian => 1.0,
        Era::Kingdom => 2.0,
        Era::Empire => 4.0,
    }
}

/// Settlements needed to enter `era`.
pub fn era_threshold(era: Era) -> usize {
    match era {
        Era::Barbarian => 0,
        Era::Kingdom => 4,
        Era::Empire => 7,
    }
}

/// How far new settlements reach away from existing ones.
pub fn era_reach(era: Era) -> f64 {
    match era {
        Era::Barbarian => 2.0,
        Era::Kingdom => 3.5,
        Era::Empire => 5.0,
    }
}
