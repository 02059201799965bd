use anyhow::Result;

use crate::{
    engine::{System, TurnContext},
    rng::SystemRng,
    units,
    world::World,
};

/// Heals units that held back last turn and restores everyone's movement.
pub struct UnitRefreshSystem;

impl UnitRefreshSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnitRefreshSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for UnitRefreshSystem {
    fn name(&self) -> &str {
        "unit_refresh"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        units::refresh_units(world);
        Ok(())
    }
}

pub struct StackSortSystem;

impl StackSortSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StackSortSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for StackSortSystem {
    fn name(&self) -> &str {
        "stack_sort"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        units::sort_stacks(world);
        Ok(())
    }
}
