//! End-to-end content loading: the bundled content directory, plus
//! hand-written directories that exercise the skip and error paths.

use junkyard_core::catalog::MachineClass;
use junkyard_core::grid::{Direction, Footprint, GridPos};
use junkyard_core::sim::Simulation;
use junkyard_core::test_utils::fixed;
use junkyard_data::{DataLoadError, load_content_dir};
use std::fs;
use std::path::{Path, PathBuf};

fn bundled_content() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("content")
}

fn make_test_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "junkyard_content_test_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn cleanup(dir: &Path) {
    let _ = fs::remove_dir_all(dir);
}

// ===========================================================================
// Bundled content
// ===========================================================================

#[test]
fn bundled_content_loads_from_mixed_formats() {
    let loaded = load_content_dir(&bundled_content()).unwrap();
    let catalog = &loaded.catalog;

    assert_eq!(catalog.item_count(), 4);
    assert_eq!(catalog.machine_count(), 4);
    assert_eq!(catalog.recipe_count(), 2);
    assert!(loaded.report.missing_files.is_empty());
    assert_eq!(loaded.report.duplicates_dropped, 0);

    let crusher = catalog.machine_id("crusher").unwrap();
    assert_eq!(catalog.machine_footprint(crusher), Footprint::new(2, 2));
    assert_eq!(
        catalog.get_machine(crusher).unwrap().class,
        MachineClass::Processor
    );
    assert_eq!(catalog.recipes_for_machine(crusher).len(), 2);

    let fast = catalog.machine_id("fast_conveyor").unwrap();
    assert!(catalog.is_conveyor(fast));
    assert_eq!(catalog.machine_ticks_per_move(fast), 2);

    assert_eq!(loaded.config.ticks_per_second, 20);
}

#[test]
fn bundled_content_drives_a_simulation() {
    let loaded = load_content_dir(&bundled_content()).unwrap();
    let mut sim = Simulation::new(loaded.config, loaded.catalog).unwrap();
    let belt = sim.catalog().machine_id("conveyor").unwrap();
    let scrap = sim.catalog().item_id("scrap_copper").unwrap();

    sim.place_machine(belt, GridPos::new(3, 3), Direction::South)
        .unwrap();
    sim.place_machine(belt, GridPos::new(3, 2), Direction::South)
        .unwrap();
    let item = sim.spawn_item(scrap, GridPos::new(3, 3)).unwrap();

    sim.step_n(2);
    assert_eq!(sim.yard().item(item.id).unwrap().progress, fixed(0.5));
    sim.step_n(2);
    assert_eq!(sim.yard().item(item.id).unwrap().cell, GridPos::new(3, 2));
}

// ===========================================================================
// Authoring problems
// ===========================================================================

#[test]
fn empty_ids_and_duplicates_are_skipped() {
    let dir = make_test_dir("skips");
    fs::write(
        dir.join("items.json"),
        r#"[{ "id": "scrap", "sellPrice": 1 }, { "id": "" }, { "id": "scrap", "sellPrice": 9 }]"#,
    )
    .unwrap();
    fs::write(
        dir.join("machines.ron"),
        r#"[(id: "belt", category: "conveyor"), (id: "  ")]"#,
    )
    .unwrap();

    let loaded = load_content_dir(&dir).unwrap();
    let catalog = &loaded.catalog;
    assert_eq!(catalog.item_count(), 1);
    assert_eq!(catalog.machine_count(), 1);
    let scrap = catalog.item_id("scrap").unwrap();
    assert_eq!(catalog.get_item(scrap).unwrap().sell_price, 1);
    assert_eq!(loaded.report.skipped_empty_ids, 2);
    assert_eq!(loaded.report.duplicates_dropped, 1);
    assert_eq!(loaded.report.missing_files, vec!["recipes"]);

    // No ticksPerMove: the conveyor runs at the configured default.
    let belt = catalog.machine_id("belt").unwrap();
    assert_eq!(catalog.machine_ticks_per_move(belt), 4);

    cleanup(&dir);
}

#[test]
fn empty_directory_gives_empty_catalog() {
    let dir = make_test_dir("empty");
    let loaded = load_content_dir(&dir).unwrap();
    assert_eq!(loaded.catalog.machine_count(), 0);
    assert_eq!(
        loaded.report.missing_files,
        vec!["items", "machines", "recipes"]
    );
    cleanup(&dir);
}

#[test]
fn recipe_with_unknown_item_is_an_error() {
    let dir = make_test_dir("unresolved_item");
    fs::write(dir.join("items.json"), r#"[{ "id": "scrap" }]"#).unwrap();
    fs::write(
        dir.join("machines.json"),
        r#"[{ "id": "crusher", "category": "processor" }]"#,
    )
    .unwrap();
    fs::write(
        dir.join("recipes.toml"),
        "[[recipes]]\nid = \"crush\"\nmachineType = \"crusher\"\ninputs = [{ itemId = \"scrap\" }]\noutputs = [{ itemId = \"gold\" }]\n",
    )
    .unwrap();

    match load_content_dir(&dir) {
        Err(DataLoadError::UnresolvedRef {
            name,
            expected_kind,
            ..
        }) => {
            assert_eq!(name, "gold");
            assert_eq!(expected_kind, "item");
        }
        other => panic!("expected unresolved item, got {other:?}"),
    }

    cleanup(&dir);
}

#[test]
fn recipe_with_unknown_machine_is_an_error() {
    let dir = make_test_dir("unresolved_machine");
    fs::write(dir.join("items.json"), r#"[{ "id": "scrap" }]"#).unwrap();
    fs::write(
        dir.join("recipes.json"),
        r#"{ "recipes": [{ "id": "melt", "machineType": "furnace" }] }"#,
    )
    .unwrap();

    assert!(matches!(
        load_content_dir(&dir),
        Err(DataLoadError::UnresolvedRef {
            expected_kind: "machine",
            ..
        })
    ));

    cleanup(&dir);
}

#[test]
fn two_formats_for_one_file_is_an_error() {
    let dir = make_test_dir("conflict");
    fs::write(dir.join("machines.json"), "[]").unwrap();
    fs::write(dir.join("machines.toml"), "machines = []\n").unwrap();

    assert!(matches!(
        load_content_dir(&dir),
        Err(DataLoadError::ConflictingFormats { .. })
    ));

    cleanup(&dir);
}
