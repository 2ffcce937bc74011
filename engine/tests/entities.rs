use palier::entity::{instantiate_monster, Definition};
use palier::parser::parse_bestiary;
use palier::store::{EntityFile, EntityStore};
use palier::{reset_all, Compendium, EntityInstance, EntityKind, InstanceState};
use proptest::prelude::*;

const SLIME: &str = "\
### **Slime** (Lvl 1-5)
**Niveau 1:**
- **HP:** 6/6
- **MP:** 1/1
**Niveau 3:**
- **HP:** 10/10
- **MP:** 2/2
- **STR:** 4
**Niveau 5:**
- **HP:** 16/16
- **MP:** 4/4
";

fn compendium() -> Compendium {
    Compendium {
        monsters: parse_bestiary("Bestiaire.md", SLIME).monsters,
        skills: Default::default(),
    }
}

#[test]
fn slime_level_three_is_fresh_at_full_health() {
    let slime = instantiate_monster(&compendium(), "Slime", 3).unwrap();
    assert_eq!((slime.current_hp, slime.max_hp), (10, 10));
    assert_eq!((slime.current_mp, slime.max_mp), (2, 2));
    assert_eq!(slime.kind, EntityKind::Monster);
    assert_eq!(slime.state, InstanceState::Fresh);
    assert_eq!(slime.definition_ref.as_deref(), Some("Slime"));
    assert_eq!(slime.stat("STR"), 4.0);
}

#[test]
fn levels_between_blocks_are_interpolated_and_outside_clamped() {
    let c = compendium();
    let l2 = instantiate_monster(&c, "slime", 2).unwrap();
    assert_eq!(l2.max_hp, 8);
    let l9 = instantiate_monster(&c, "Slime", 9).unwrap();
    assert_eq!(l9.max_hp, 16);
    assert_eq!(l9.level, Some(9));
}

#[test]
fn absent_monster_is_unknown_definition() {
    let err = instantiate_monster(&compendium(), "Dragon", 1).unwrap_err();
    assert_eq!(err.name, "Dragon");
    assert_eq!(err.to_string(), "unknown monster definition 'Dragon'");
}

#[test]
fn reset_all_restores_current_values_only() {
    let mut players = vec![EntityInstance::player("Aria", 20, 5), EntityInstance::player("Bram", 30, 0)];
    players[0].current_hp = 3;
    players[0].state = InstanceState::Modified;
    reset_all(&mut players);
    assert_eq!(players[0].current_hp, 20);
    assert_eq!(players[0].max_hp, 20);
    assert_eq!(players[1].max_hp, 30);
    assert!(players.iter().all(EntityInstance::is_fresh));
}

#[test]
fn dangling_definition_ref_resolves_to_placeholder() {
    let c = compendium();
    let slime = instantiate_monster(&c, "Slime", 1).unwrap();
    assert!(matches!(slime.definition(&c), Definition::Known(_)));
    match slime.definition(&Compendium::default()) {
        Definition::Unknown(u) => assert_eq!(u.name, "Slime"),
        other => panic!("expected placeholder, got {other:?}"),
    }
    assert_eq!(EntityInstance::player("Aria", 1, 1).definition(&c), Definition::None);
}

#[test]
fn status_line_format() {
    let mut slime = instantiate_monster(&compendium(), "Slime", 3).unwrap();
    slime.current_hp = 4;
    insta::assert_snapshot!(slime.status_line(), @"Slime [monster lvl 3] HP 4/10 MP 2/2");
}

#[test]
fn missing_current_values_load_as_full() {
    let json = r#"{"players":[{"name":"Aria","max_hp":12,"max_mp":3}]}"#;
    let file: EntityFile = serde_json::from_str(json).unwrap();
    let aria = &file.players[0];
    assert_eq!(aria.kind, EntityKind::Player);
    assert_eq!((aria.current_hp, aria.current_mp), (12, 3));
    assert!(aria.is_fresh());
}

#[test]
fn save_players_keeps_kept_monsters() {
    let dir = tempfile::tempdir().unwrap();
    let store = EntityStore::in_dir(dir.path());
    let slime = instantiate_monster(&compendium(), "Slime", 1).unwrap();
    store
        .save(&EntityFile { players: vec![], kept_monsters: vec![slime.clone()] }, false)
        .unwrap();
    store.save_players(&[EntityInstance::player("Aria", 10, 2), slime], false).unwrap();

    let file = store.load().unwrap();
    assert_eq!(file.players.len(), 1);
    assert_eq!(file.kept_monsters.len(), 1);
    assert_eq!(store.load_players().unwrap()[0].name, "Aria");
}

fn player() -> impl Strategy<Value = EntityInstance> {
    (
        "[A-Z][a-z]{2,8}",
        1..200i32,
        0..100i32,
        prop::collection::vec(("[A-Z]{3}", 0..50i32), 0..4),
    )
        .prop_flat_map(|(name, max_hp, max_mp, stats)| {
            (Just(name), 0..=max_hp, Just(max_hp), 0..=max_mp, Just(max_mp), Just(stats))
        })
        .prop_map(|(name, hp, max_hp, mp, max_mp, stats)| {
            let mut p = EntityInstance::player(name, max_hp, max_mp);
            for (k, v) in stats {
                p = p.with_stat(k, v as f64);
            }
            p.current_hp = hp;
            p.current_mp = mp;
            if hp != max_hp || mp != max_mp {
                p.state = InstanceState::Modified;
            }
            p
        })
}

proptest! {
    #[test]
    fn player_store_load_of_save_is_identity(players in prop::collection::vec(player(), 0..6)) {
        let dir = tempfile::tempdir().unwrap();
        let store = EntityStore::in_dir(dir.path());
        store.save_players(&players, false).unwrap();
        prop_assert_eq!(store.load_players().unwrap(), players);
    }
}
