use anyhow::Result;

use crate::{
    engine::{System, TurnContext},
    rng::SystemRng,
    society,
    world::World,
};

/// Parameter drift followed by any revolts it provokes.
pub struct SocietySystem;

impl SocietySystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SocietySystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for SocietySystem {
    fn name(&self) -> &str {
        "society"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        society::update_society(world, rng);
        let revolts = society::process_revolts(world, rng);
        world.events.revolts.extend(revolts);
        Ok(())
    }
}

pub struct EraSystem;

impl EraSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EraSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for EraSystem {
    fn name(&self) -> &str {
        "era"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        world.events.era_advanced = society::check_era_transition(world);
        Ok(())
    }
}

/// Two parameters at the ceiling bring everything down.
pub struct CollapseSystem;

impl CollapseSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CollapseSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for CollapseSystem {
    fn name(&self) -> &str {
        "collapse"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        if world.society.should_collapse() {
            society::collapse(world, rng);
        }
        Ok(())
    }
}
