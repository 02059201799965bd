use anyhow::Result;

use crate::{
    engine::{System, TurnContext},
    enemy,
    rng::SystemRng,
    world::World,
};

/// Danger points fight whoever stands on them.
pub struct DangerOccupationSystem;

impl DangerOccupationSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DangerOccupationSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DangerOccupationSystem {
    fn name(&self) -> &str {
        "danger_occupation"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        enemy::process_danger_occupation(world, rng);
        Ok(())
    }
}

pub struct DangerSpawnSystem;

impl DangerSpawnSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DangerSpawnSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for DangerSpawnSystem {
    fn name(&self) -> &str {
        "danger_spawn"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        enemy::process_danger_spawns(world, rng);
        Ok(())
    }
}
