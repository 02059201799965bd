use anyhow::Result;

use crate::{
    engine::{System, TurnContext},
    enemy,
    rng::SystemRng,
    world::World,
};

pub struct EnemyTurnSystem;

impl EnemyTurnSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnemyTurnSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for EnemyTurnSystem {
    fn name(&self) -> &str {
        "enemy_turn"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        enemy::process_enemy_turn(world, rng);
        world.refresh_territory();
        Ok(())
    }
}

/// Raiders and monsters wandering in from beyond the frontier.
pub struct WildSpawnSystem;

impl WildSpawnSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WildSpawnSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for WildSpawnSystem {
    fn name(&self) -> &str {
        "wild_spawn"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        enemy::process_wild_spawn(world, rng);
        Ok(())
    }
}
