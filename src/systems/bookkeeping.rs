use anyhow::Result;
use tracing::debug;

use crate::{
    engine::{System, TurnContext},
    options,
    rng::{Rando, SystemRng},
    units,
    world::{TurnEvents, World},
};

/// Clears last turn's combat log and event tally.
pub struct ReportResetSystem;

impl ReportResetSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ReportResetSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for ReportResetSystem {
    fn name(&self) -> &str {
        "report_reset"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        world.combat_report.clear();
        world.events = TurnEvents::default();
        Ok(())
    }
}

/// Drops ephemeral per-turn state, deals a fresh option list, focuses the
/// largest settlement and moves the counter on.
pub struct TurnCloseSystem;

impl TurnCloseSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TurnCloseSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for TurnCloseSystem {
    fn name(&self) -> &str {
        "turn_close"
    }

    fn run(
        &mut self,
        ctx: &TurnContext,
        world: &mut World,
        rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        world.selection.unit = None;
        world.society_options = options::shuffled_catalog(rng);

        let largest = world.largest_settlements();
        let focus = rng
            .choice(&largest)
            .and_then(|id| world.settlement(*id))
            .map(|s| s.coord);
        match focus {
            Some(coord) => units::select_hex(world, coord),
            None => world.selection.hex = None,
        }
        world.selection.unit = None;

        world.turn += 1;
        debug!(closed = ctx.turn, next = world.turn, "turn closed");
        Ok(())
    }
}
