//! Property-based tests for the junkyard core.
//!
//! Uses proptest to generate random grids, layouts and operation sequences,
//! then verify the geometric, occupancy and conveyor invariants hold.

use junkyard_core::fixed::{Fixed64, HALF};
use junkyard_core::grid::{Direction, Footprint, GridPos, IsoGrid};
use junkyard_core::id::{ItemId, MachineId};
use junkyard_core::occupancy::OccupancyIndex;
use junkyard_core::sim::Simulation;
use junkyard_core::test_utils::*;
use junkyard_core::yard::ItemInstance;
use proptest::prelude::*;
use slotmap::SlotMap;
use std::collections::{BTreeMap, HashMap};

// ===========================================================================
// Generators
// ===========================================================================

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::East),
        Just(Direction::North),
        Just(Direction::West),
        Just(Direction::South),
    ]
}

/// Operations on a 12x12 test simulation.
#[derive(Debug, Clone)]
enum Op {
    PlaceBelt(i32, i32, Direction),
    PlaceCrate(i32, i32),
    Spawn(i32, i32),
    Remove(i32, i32),
    Step(u8),
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    let coord = 0..12i32;
    proptest::collection::vec(
        prop_oneof![
            4 => (coord.clone(), coord.clone(), arb_direction())
                .prop_map(|(x, y, d)| Op::PlaceBelt(x, y, d)),
            1 => (coord.clone(), coord.clone()).prop_map(|(x, y)| Op::PlaceCrate(x, y)),
            3 => (coord.clone(), coord.clone()).prop_map(|(x, y)| Op::Spawn(x, y)),
            1 => (coord.clone(), coord).prop_map(|(x, y)| Op::Remove(x, y)),
            3 => (1..8u8).prop_map(Op::Step),
        ],
        1..=max_ops,
    )
}

fn small_sim() -> Simulation {
    let config = junkyard_core::config::SimConfig {
        grid_width: 12,
        grid_height: 12,
        ..Default::default()
    };
    Simulation::new(config, test_catalog()).unwrap()
}

/// Spawn only onto a free entrance, the way a well-behaved spawner would.
fn apply(sim: &mut Simulation, op: &Op, mut after_tick: impl FnMut(&Simulation, &[ItemInstance])) {
    match *op {
        Op::PlaceBelt(x, y, d) => {
            let _ = sim.place_machine(belt_type(sim), GridPos::new(x, y), d);
        }
        Op::PlaceCrate(x, y) => {
            let _ = sim.place_machine(crate_type(sim), GridPos::new(x, y), Direction::East);
        }
        Op::Spawn(x, y) => {
            let cell = GridPos::new(x, y);
            if sim.yard().items_at(cell).all(|i| i.progress >= HALF) {
                let _ = sim.spawn_item(scrap_type(sim), cell);
            }
        }
        Op::Remove(x, y) => {
            if let Some(id) = sim.yard().machine_at(GridPos::new(x, y)).map(|m| m.id) {
                sim.remove_machine(id).unwrap();
            }
        }
        Op::Step(n) => {
            for _ in 0..n {
                let before: Vec<ItemInstance> = sim.yard().items().copied().collect();
                sim.step();
                after_tick(sim, &before);
            }
        }
    }
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Grid/world round trip holds for every in-bounds cell.
    #[test]
    fn world_grid_round_trip(
        x in 0..200i32,
        y in 0..200i32,
        half_h in 4..64u32,
        wide in proptest::bool::ANY,
    ) {
        let tile_h = half_h as f32 * 2.0;
        let tile_w = if wide { tile_h * 2.0 } else { tile_h * 1.5 };
        let grid = IsoGrid::new(200, 200, tile_w, tile_h);
        let cell = GridPos::new(x, y);
        prop_assert_eq!(grid.world_to_grid(grid.grid_to_world(cell)), cell);
    }

    /// can_place is false iff some footprint cell is occupied or out of bounds.
    #[test]
    fn can_place_matches_brute_force(
        taken in proptest::collection::vec((0..8i32, 0..8i32), 0..20),
        ox in -2..9i32,
        oy in -2..9i32,
        w in 1..4u32,
        h in 1..4u32,
    ) {
        let mut keys = SlotMap::<MachineId, ()>::with_key();
        let mut index = OccupancyIndex::new(8, 8);
        for (x, y) in &taken {
            let _ = index.occupy(GridPos::new(*x, *y), Footprint::single(), keys.insert(()));
        }

        let origin = GridPos::new(ox, oy);
        let fp = Footprint::new(w, h);
        let blocked = fp.cells(origin).any(|c| {
            c.x < 0 || c.y < 0 || c.x >= 8 || c.y >= 8 || index.is_occupied(c)
        });
        prop_assert_eq!(index.can_place(origin, fp), !blocked);
    }

    /// Place then remove leaves occupancy exactly as before.
    #[test]
    fn place_remove_restores_occupancy(
        ox in 0..10i32,
        oy in 0..10i32,
        dir in arb_direction(),
    ) {
        let mut sim = small_sim();
        let before = sim.yard().occupancy().cell_count();
        if let Ok(m) = sim.place_machine(crusher_type(&sim), GridPos::new(ox, oy), dir) {
            for cell in m.cells() {
                prop_assert_eq!(sim.yard().machine_at(cell).map(|x| x.id), Some(m.id));
            }
            prop_assert_eq!(sim.yard().occupancy().cell_count(), before + 4);
            sim.remove_machine(m.id).unwrap();
        }
        prop_assert_eq!(sim.yard().occupancy().cell_count(), before);
    }

    /// Conveyor invariants after every tick of a random session.
    #[test]
    fn conveyor_invariants_hold(ops in arb_ops(60)) {
        let mut sim = small_sim();
        let mut failures: Vec<String> = Vec::new();

        for op in &ops {
            apply(&mut sim, op, |sim, before| {
                let yard = sim.yard();
                let prev: HashMap<ItemId, &ItemInstance> =
                    before.iter().map(|i| (i.id, i)).collect();

                let mut entrances: BTreeMap<GridPos, u32> = BTreeMap::new();
                for item in yard.items() {
                    if item.progress < Fixed64::ZERO || item.progress > Fixed64::ONE {
                        failures.push(format!("progress out of range: {item:?}"));
                    }
                    if item.progress < HALF {
                        *entrances.entry(item.cell).or_default() += 1;
                    }

                    let Some(old) = prev.get(&item.id) else { continue };
                    if old.cell != item.cell {
                        // A transfer: one step along the source conveyor,
                        // progress reset, never into an opposing conveyor.
                        if item.progress != Fixed64::ZERO {
                            failures.push(format!("transfer without reset: {item:?}"));
                        }
                        if let Some(target) = yard.machine_at(item.cell)
                            && target.rotation == item.direction.opposite()
                        {
                            failures.push(format!("moved into opposing belt: {item:?}"));
                        }
                        if old.cell.step(item.direction) != item.cell {
                            failures.push(format!("moved off heading: {old:?} -> {item:?}"));
                        }
                    } else if item.progress == Fixed64::ZERO && old.progress != Fixed64::ZERO {
                        failures.push(format!("reset without transfer: {item:?}"));
                    }

                    // Waiting at the far edge implies something downstream.
                    if item.progress == Fixed64::ONE
                        && yard.machine_at(item.cell.step(item.direction)).is_none()
                    {
                        failures.push(format!("waiting at a dead end: {item:?}"));
                    }
                }
                for (cell, count) in entrances {
                    if count > 1 {
                        failures.push(format!("{count} items in entrance of {cell}"));
                    }
                }
            });
        }

        prop_assert!(failures.is_empty(), "{:#?}", failures);
    }

    /// Identical operation sequences give identical state hashes.
    #[test]
    fn deterministic_replay(ops in arb_ops(40)) {
        let mut a = small_sim();
        let mut b = small_sim();
        for op in &ops {
            apply(&mut a, op, |_, _| {});
            apply(&mut b, op, |_, _| {});
            prop_assert_eq!(a.state_hash(), b.state_hash());
        }
    }
}
