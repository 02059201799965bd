//! Per-phase turn timings on a standard-size map.
//!
//! Run with: cargo bench

use std::collections::BTreeMap;
use std::hint::black_box;

use realm::{Game, GameSettings};

#[cfg(test)]
mod benches {
    use super::*;

    #[test]
    fn benchmark_turn_phases() {
        let settings = GameSettings {
            seed: 2024,
            map_radius: 20,
            ..GameSettings::default()
        };
        let mut game = Game::generate(settings).expect("world generates");
        let turns = 100;
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        game.run_with_hook(turns, |summary, _| {
            for report in &summary.phase_reports {
                *totals.entry(report.name.clone()).or_default() += report.duration_ms;
            }
        })
        .expect("turns run");

        for (phase, total) in &totals {
            println!("{phase:>18}: {:.4} ms/turn", total / f64::from(turns));
        }
        black_box(game.snapshot());
        assert_eq!(totals.len(), 14);
    }
}
