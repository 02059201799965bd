use realm::{world::UnitKind, Game, GameSettings};

fn scripted_run(seed: u64) -> String {
    let settings = GameSettings {
        seed,
        map_radius: 10,
        ..GameSettings::default()
    };
    let mut game = Game::generate(settings).expect("world generates");
    let camp = game.world().settlement_ids()[0];
    game.recruit(camp, UnitKind::Infantry).unwrap();
    game.recruit(camp, UnitKind::Worker).unwrap();
    game.run(25).expect("turns run");
    game.snapshot().to_json().expect("serialises")
}

#[test]
fn same_seed_and_commands_replay_exactly() {
    assert_eq!(scripted_run(42), scripted_run(42));
}

#[test]
fn different_seeds_diverge() {
    assert_ne!(scripted_run(1), scripted_run(2));
}
