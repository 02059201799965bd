use anyhow::Result;

use crate::{
    engine::{System, TurnContext},
    rng::SystemRng,
    settlement,
    world::World,
};

/// Growth, tier advances and overflow redistribution.
pub struct GrowthSystem;

impl GrowthSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrowthSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for GrowthSystem {
    fn name(&self) -> &str {
        "growth"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        settlement::grow_settlements(world, rng);
        Ok(())
    }
}

pub struct SettlementSpawnSystem;

impl SettlementSpawnSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SettlementSpawnSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SettlementSpawnSystem {
    fn name(&self) -> &str {
        "settlement_spawn"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if let Some(coord) = settlement::try_spawn_settlement(world, rng) {
            world.events.founded.push(coord);
        }
        Ok(())
    }
}
