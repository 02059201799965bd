use std::sync::{Arc, Mutex};

use anyhow::Result;
use realm::{
    rng::SystemRng,
    world::{HexMap, Terrain, World},
    Game, GameSettings, System, TurnContext, TurnPipeline,
};

/// Records the turn and treasury it sees, standing in for a renderer hook.
struct PhaseRecorder {
    seen: Arc<Mutex<Vec<(u32, i64)>>>,
}

impl System for PhaseRecorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn run(
        &mut self,
        ctx: &TurnContext,
        world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        self.seen
            .lock()
            .unwrap()
            .push((ctx.turn, world.treasury.gold));
        Ok(())
    }
}

struct Failing;

impl System for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    fn run(
        &mut self,
        _ctx: &TurnContext,
        _world: &mut World,
        _rng: &mut SystemRng<'_>,
    ) -> Result<()> {
        anyhow::bail!("boom")
    }
}

fn plains_game() -> Game {
    Game::new(GameSettings::default(), HexMap::uniform(8, Terrain::Plains))
}

#[test]
fn extra_phases_run_after_the_standard_fourteen() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let pipeline = TurnPipeline::standard().with_system(PhaseRecorder { seen: seen.clone() });
    let mut game = plains_game().with_pipeline(pipeline);
    assert_eq!(game.phase_names().len(), 15);

    let summaries = game.run(3).unwrap();
    assert_eq!(summaries.len(), 3);
    assert!(summaries.iter().all(|s| s.phase_reports.len() == 15));
    assert_eq!(summaries[2].phase_reports[14].name, "recorder");

    let seen = seen.lock().unwrap();
    let turns: Vec<u32> = seen.iter().map(|(t, _)| *t).collect();
    assert_eq!(turns, vec![1, 2, 3]);
    assert!(seen.windows(2).all(|w| w[1].1 >= w[0].1), "a lone camp only earns");
}

#[test]
fn phase_failures_surface_with_context() {
    let mut game = plains_game().with_pipeline(TurnPipeline::new().with_system(Failing));
    let err = game.end_turn().unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("failing"));
    assert!(message.contains("boom"));
    assert_eq!(game.turn(), 1);
}

#[test]
fn phase_reports_follow_pipeline_order() {
    let mut game = plains_game();
    let summary = game.end_turn().unwrap();
    let names: Vec<&str> = summary.phase_reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "report_reset",
            "unit_refresh",
            "stack_sort",
            "danger_occupation",
            "danger_spawn",
            "enemy_turn",
            "production",
            "growth",
            "settlement_spawn",
            "wild_spawn",
            "society",
            "era",
            "collapse",
            "turn_close",
        ]
    );
    assert!(summary.phase_reports.iter().all(|r| r.duration_ms >= 0.0));
}
