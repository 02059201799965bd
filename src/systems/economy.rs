use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, TurnContext},
    production,
    rng::SystemRng,
    world::World,
};

pub struct ProductionSystem;

impl ProductionSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ProductionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ProductionSystem {
    fn name(&self) -> &str {
        "production"
    }

    fn run(
        &mut self,
        ctx: &TurnContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        let income = production::apply_production(world);
        debug!(turn = ctx.turn, income = %income, treasury = %world.treasury, "production");
        Ok(())
    }
}
