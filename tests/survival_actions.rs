//! Integration tests for explore, mine, fish, use and discard against the
//! deterministic fixture catalog.

mod common;

use std::sync::Arc;

use cobble::survival::{
    inventory, Achievement, Action, Catalog, DiscardTarget, Enchantment, InventoryRecord,
    LootEntry, PlayerFlag, SurvivalEngine, SurvivalError, SurvivalStoreBuilder, MAX_HEALTH,
};
use common::{engine_with, fixed_game, rng, snapshot, started_engine, PLAYER};
use tempfile::TempDir;

fn give(engine: &SurvivalEngine, item: &str, quantity: u32, durability: Option<u32>) {
    inventory::add(engine.store(), PLAYER, item, quantity, durability).expect("give item");
}

fn set_player(engine: &SurvivalEngine, f: impl FnOnce(&mut cobble::survival::PlayerRecord)) {
    let mut player = engine.store().get_player(PLAYER).expect("player");
    f(&mut player);
    engine.store().put_player(&mut player).expect("put player");
}

// ============================================================================
// Explore
// ============================================================================

#[test]
fn explore_rolls_loot_awards_xp_and_discovers_next_biome() {
    let (_dir, engine) = started_engine();
    let outcome = engine.explore(PLAYER, "Forest", &mut rng()).expect("explore");

    assert_eq!(outcome.action, Some(Action::Explore));
    assert_eq!(outcome.loot, vec![LootEntry::new("oak_log", 2, None)]);
    assert_eq!(outcome.xp_gained, 5);
    assert!(!outcome.leveled_up);
    assert_eq!(outcome.discovered_biome_id.as_deref(), Some("desert"));

    let player = engine.store().get_player(PLAYER).expect("player");
    assert_eq!(player.xp, 5);
    assert!(player.achievements.has(Achievement::DiscoveredDesert));
    assert!(!player.achievements.has(Achievement::DiscoveredOcean));
    assert_eq!(engine.store().item_quantity(PLAYER, "oak_log").expect("qty"), 2);
}

#[test]
fn discovery_happens_at_most_once_and_unlocks_the_biome() {
    let (_dir, engine) = started_engine();
    assert!(matches!(
        engine.explore(PLAYER, "desert", &mut rng()),
        Err(SurvivalError::BiomeNotDiscovered(_))
    ));

    engine.explore(PLAYER, "forest", &mut rng()).expect("forest");
    let desert = engine.explore(PLAYER, "desert", &mut rng()).expect("desert");
    assert_eq!(desert.loot, vec![LootEntry::new("sand", 3, None)]);
    // Ocean has zero discovery probability in the fixture.
    assert_eq!(desert.discovered_biome_id, None);
    assert!(matches!(
        engine.explore(PLAYER, "ocean", &mut rng()),
        Err(SurvivalError::BiomeNotDiscovered(_))
    ));
}

#[test]
fn explore_unknown_biome_is_rejected() {
    let (_dir, engine) = started_engine();
    match engine.explore(PLAYER, "moon", &mut rng()) {
        Err(SurvivalError::UnknownBiome(id)) => assert_eq!(id, "moon"),
        other => panic!("Expected UnknownBiome, got {:?}", other),
    }
}

#[test]
fn actions_require_a_profile() {
    let (_dir, engine) = engine_with(fixed_game());
    assert!(matches!(
        engine.explore(PLAYER, "forest", &mut rng()),
        Err(SurvivalError::NoProfile)
    ));
    assert!(matches!(engine.mine(PLAYER, &mut rng()), Err(SurvivalError::NoProfile)));
    assert!(engine.store().list_inventory(PLAYER).expect("list").is_empty());
}

#[test]
fn lethal_explore_forfeits_loot_and_resets_progress() {
    let mut game = fixed_game();
    game.explore_damage_chance = 1.0;
    game.damage_half_hearts = [16, 16];
    let (_dir, engine) = engine_with(game);
    engine.start_profile(PLAYER).expect("start");
    set_player(&engine, |p| p.xp = 420);

    let outcome = engine.explore(PLAYER, "forest", &mut rng()).expect("explore");
    assert!(outcome.died);
    assert!(outcome.first_death);
    assert_eq!(outcome.damage_taken, 8.0);
    assert!(outcome.loot.is_empty());
    assert_eq!(outcome.xp_gained, 0);
    assert_eq!(outcome.discovered_biome_id, None);

    let player = engine.store().get_player(PLAYER).expect("player");
    assert_eq!(player.xp, 0);
    assert_eq!(player.health, MAX_HEALTH);
    assert!(player.flags.has(PlayerFlag::DiedOnce));
    assert!(engine.store().list_inventory(PLAYER).expect("list").is_empty());

    let again = engine.explore(PLAYER, "forest", &mut rng()).expect("explore again");
    assert!(again.died);
    assert!(!again.first_death);
}

#[test]
fn non_lethal_damage_still_pays_out() {
    let mut game = fixed_game();
    game.explore_damage_chance = 1.0;
    let (_dir, engine) = engine_with(game);
    engine.start_profile(PLAYER).expect("start");

    let outcome = engine.explore(PLAYER, "forest", &mut rng()).expect("explore");
    assert!(!outcome.died);
    assert_eq!(outcome.damage_taken, 1.0);
    assert_eq!(outcome.loot.len(), 1);
    assert_eq!(engine.store().get_player(PLAYER).expect("player").health, 7.0);
}

// ============================================================================
// Mine and fish
// ============================================================================

#[test]
fn mining_without_a_pickaxe_lists_every_option() {
    let (_dir, engine) = started_engine();
    match engine.mine(PLAYER, &mut rng()) {
        Err(SurvivalError::MissingTool(tools)) => {
            assert_eq!(tools, vec!["wooden_pickaxe", "stone_pickaxe", "iron_pickaxe"])
        }
        other => panic!("Expected MissingTool, got {:?}", other),
    }
}

#[test]
fn mining_uses_the_best_tier_and_its_most_worn_record() {
    let (_dir, engine) = started_engine();
    give(&engine, "wooden_pickaxe", 1, Some(10));
    give(&engine, "stone_pickaxe", 1, Some(20));
    give(&engine, "stone_pickaxe", 1, Some(7));

    let outcome = engine.mine(PLAYER, &mut rng()).expect("mine");
    assert_eq!(
        outcome.loot,
        vec![LootEntry::new("coal", 1, None), LootEntry::new("raw_iron", 2, None)]
    );
    assert_eq!(outcome.xp_gained, 10);
    assert_eq!(outcome.broke_item_id, None);

    let mut stone: Vec<_> = engine
        .store()
        .filter_inventory(PLAYER, "stone_pickaxe")
        .expect("filter")
        .into_iter()
        .map(|r| r.durability)
        .collect();
    stone.sort();
    assert_eq!(stone, vec![Some(5), Some(20)]);
    assert_eq!(
        engine.store().filter_inventory(PLAYER, "wooden_pickaxe").expect("filter")[0].durability,
        Some(10)
    );
}

#[test]
fn worn_out_pickaxe_breaks_and_is_reported() {
    let (_dir, engine) = started_engine();
    give(&engine, "stone_pickaxe", 1, Some(2));

    let outcome = engine.mine(PLAYER, &mut rng()).expect("mine");
    assert_eq!(outcome.broke_item_id.as_deref(), Some("stone_pickaxe"));
    assert!(engine.store().filter_inventory(PLAYER, "stone_pickaxe").expect("filter").is_empty());
    // Loot is still kept.
    assert_eq!(engine.store().item_quantity(PLAYER, "raw_iron").expect("qty"), 2);
}

#[test]
fn durability_loot_lands_as_separate_records() {
    let (_dir, engine) = started_engine();
    give(&engine, "iron_pickaxe", 1, Some(50));
    give(&engine, "wooden_pickaxe", 1, Some(9));

    let outcome = engine.mine(PLAYER, &mut rng()).expect("mine");
    assert!(outcome.loot.contains(&LootEntry::new("wooden_pickaxe", 1, Some(4))));

    let wooden = engine.store().filter_inventory(PLAYER, "wooden_pickaxe").expect("filter");
    assert_eq!(wooden.len(), 2);
    assert!(wooden.iter().all(|r| r.quantity == 1));
}

#[test]
fn unbreaking_reduces_wear() {
    let (_dir, engine) = started_engine();
    let mut pick = InventoryRecord::new(PLAYER, "iron_pickaxe", 1, Some(50));
    pick.enchantments.insert(Enchantment::Unbreaking3);
    let catalog_item = engine.catalog().item("iron_pickaxe").expect("item");
    assert!(pick.enchantments.supported(catalog_item.supported_enchantments));
    let pick = engine.store().create_inventory_item(pick).expect("create");

    let mut rng = rng();
    for _ in 0..20 {
        engine.mine(PLAYER, &mut rng).expect("mine");
    }
    // Without the enchantment 20 trips with two entries each would cost 40 points.
    let left = engine
        .store()
        .get_inventory_item(PLAYER, &pick.record_id)
        .expect("get")
        .expect("pickaxe survives")
        .durability
        .expect("durability");
    assert!(left > 10, "durability {} suggests no wear was skipped", left);
}

#[test]
fn fishing_needs_a_rod_and_wears_it() {
    let (_dir, engine) = started_engine();
    assert!(matches!(engine.fish(PLAYER, &mut rng()), Err(SurvivalError::MissingTool(_))));

    give(&engine, "fishing_rod", 1, Some(5));
    let outcome = engine.fish(PLAYER, &mut rng()).expect("fish");
    assert_eq!(outcome.loot, vec![LootEntry::new("apple", 1, None)]);
    assert_eq!(outcome.damage_taken, 0.0);
    assert_eq!(
        engine.store().filter_inventory(PLAYER, "fishing_rod").expect("filter")[0].durability,
        Some(4)
    );
}

// ============================================================================
// Use
// ============================================================================

#[test]
fn eating_restores_health_and_consumes_one() {
    let (_dir, engine) = started_engine();
    give(&engine, "apple", 2, None);
    set_player(&engine, |p| p.health = 5.0);

    let outcome = engine.use_item(PLAYER, "apple").expect("eat");
    assert_eq!(outcome.health_restored, 2.0);
    assert_eq!(outcome.consumed, vec![LootEntry::new("apple", 1, None)]);
    assert_eq!(engine.store().get_player(PLAYER).expect("player").health, 7.0);
    assert_eq!(engine.store().item_quantity(PLAYER, "apple").expect("qty"), 1);

    set_player(&engine, |p| p.health = 7.5);
    let capped = engine.use_item(PLAYER, "apple").expect("eat again");
    assert_eq!(capped.health_restored, 0.5);
    assert_eq!(engine.store().get_player(PLAYER).expect("player").health, MAX_HEALTH);
}

#[test]
fn use_rejects_full_health_missing_and_inedible_items() {
    let (_dir, engine) = started_engine();
    assert!(matches!(engine.use_item(PLAYER, "apple"), Err(SurvivalError::ItemNotOwned(_))));

    give(&engine, "apple", 1, None);
    assert!(matches!(engine.use_item(PLAYER, "apple"), Err(SurvivalError::FullHealth)));
    assert_eq!(engine.store().item_quantity(PLAYER, "apple").expect("qty"), 1);

    give(&engine, "stick", 1, None);
    assert!(matches!(engine.use_item(PLAYER, "stick"), Err(SurvivalError::NotUsable(_))));
}

// ============================================================================
// Discard
// ============================================================================

#[test]
fn discard_quantity_and_all() {
    let (_dir, engine) = started_engine();
    give(&engine, "oak_log", 5, None);

    assert!(matches!(
        engine.discard(PLAYER, "oak_log", DiscardTarget::Quantity(0)),
        Err(SurvivalError::InvalidQuantity)
    ));
    match engine.discard(PLAYER, "oak_log", DiscardTarget::Quantity(7)) {
        Err(SurvivalError::InsufficientItem { required, available, .. }) => {
            assert_eq!((required, available), (7, 5))
        }
        other => panic!("Expected InsufficientItem, got {:?}", other),
    }

    engine
        .discard(PLAYER, "Oak Log", DiscardTarget::Quantity(3))
        .expect("discard three");
    assert_eq!(engine.store().item_quantity(PLAYER, "oak_log").expect("qty"), 2);

    let outcome = engine.discard(PLAYER, "oak_log", DiscardTarget::All).expect("discard all");
    assert_eq!(outcome.consumed, vec![LootEntry::new("oak_log", 2, None)]);
    assert!(matches!(
        engine.discard(PLAYER, "oak_log", DiscardTarget::All),
        Err(SurvivalError::ItemNotOwned(_))
    ));
}

#[test]
fn discard_durability_items_lowest_first_or_by_record() {
    let (_dir, engine) = started_engine();
    give(&engine, "wooden_pickaxe", 1, Some(9));
    give(&engine, "wooden_pickaxe", 1, Some(3));
    give(&engine, "wooden_pickaxe", 1, Some(6));

    engine
        .discard(PLAYER, "wooden_pickaxe", DiscardTarget::Quantity(1))
        .expect("discard one");
    let mut left: Vec<_> = engine
        .store()
        .filter_inventory(PLAYER, "wooden_pickaxe")
        .expect("filter");
    left.sort_by_key(|r| r.durability);
    assert_eq!(left.iter().map(|r| r.durability).collect::<Vec<_>>(), vec![Some(6), Some(9)]);

    let best = left[1].record_id.clone();
    let outcome = engine
        .discard(PLAYER, "wooden_pickaxe", DiscardTarget::Record(best))
        .expect("discard record");
    assert_eq!(outcome.consumed, vec![LootEntry::new("wooden_pickaxe", 1, Some(9))]);
    assert_eq!(snapshot(engine.store(), PLAYER), vec![("wooden_pickaxe".to_string(), 1, Some(6))]);
}

#[test]
fn discard_record_of_another_item_is_rejected() {
    let (_dir, engine) = started_engine();
    give(&engine, "coal", 1, None);
    give(&engine, "wooden_pickaxe", 1, Some(9));
    let coal = engine.store().filter_inventory(PLAYER, "coal").expect("filter").remove(0);

    assert!(matches!(
        engine.discard(PLAYER, "wooden_pickaxe", DiscardTarget::Record(coal.record_id)),
        Err(SurvivalError::ItemNotOwned(_))
    ));
    assert_eq!(snapshot(engine.store(), PLAYER).len(), 2);
}

// ============================================================================
// Cooldowns
// ============================================================================

fn engine_with_explore_cooldown(admins: Vec<u64>) -> (TempDir, SurvivalEngine) {
    let dir = TempDir::new().expect("tempdir");
    let store = SurvivalStoreBuilder::new(dir.path()).open().expect("store");
    let catalog = Arc::new(Catalog::load(common::fixture_catalog_dir()).expect("catalog"));
    let mut game = fixed_game();
    game.cooldowns.explore = 60;
    game.admin_ids = admins;
    let engine = SurvivalEngine::new(catalog, store, game).expect("engine");
    engine.start_profile(PLAYER).expect("start");
    (dir, engine)
}

#[test]
fn cooldown_blocks_repeat_but_not_after_failures() {
    let (_dir, engine) = engine_with_explore_cooldown(Vec::new());
    assert!(engine.explore(PLAYER, "ocean", &mut rng()).is_err());
    engine.explore(PLAYER, "forest", &mut rng()).expect("first explore");
    match engine.explore(PLAYER, "forest", &mut rng()) {
        Err(SurvivalError::Cooldown { seconds_remaining }) => {
            assert!((1..=60).contains(&seconds_remaining))
        }
        other => panic!("Expected Cooldown, got {:?}", other),
    }
    // Other actions are unaffected.
    assert!(matches!(engine.mine(PLAYER, &mut rng()), Err(SurvivalError::MissingTool(_))));
}

#[test]
fn admins_bypass_cooldowns() {
    let (_dir, engine) = engine_with_explore_cooldown(vec![PLAYER]);
    engine.explore(PLAYER, "forest", &mut rng()).expect("first");
    engine.explore(PLAYER, "forest", &mut rng()).expect("second");
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn concurrent_crafts_for_one_player_never_lose_updates() {
    let (_dir, engine) = started_engine();
    give(&engine, "stick", 10, None);
    give(&engine, "coal", 10, None);

    std::thread::scope(|scope| {
        for _ in 0..10 {
            scope.spawn(|| {
                engine
                    .craft(PLAYER, "torch", 1, &mut rng())
                    .expect("craft torch");
            });
        }
    });

    assert_eq!(snapshot(engine.store(), PLAYER), vec![("torch".to_string(), 40, None)]);
    assert_eq!(engine.store().get_player(PLAYER).expect("player").xp, 50);
}
