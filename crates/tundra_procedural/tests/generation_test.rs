//! # Generation Tests
//!
//! End-to-end runs through the public task API: template output, metadata,
//! determinism and cancellation at every phase boundary.

use std::sync::Arc;

use tundra_core::Block;
use tundra_procedural::{
    generate, ClassicParams, FlatParams, GenOutcome, GenParams, GenerationTask, GeneratorKind,
    GeneratorRegistry, Progress, RealisticParams, RealisticTemplate, METADATA_GROUP,
};

fn finished(outcome: GenOutcome) -> tundra_core::Map {
    outcome.into_map().expect("run was not canceled")
}

/// Test: the Flat template yields a level plain at half height with no water.
#[test]
fn test_flat_template_64_cubed() {
    let params = RealisticTemplate::Flat.params(64, 64, 64, 1);
    assert_eq!((params.max_height, params.max_depth), (0, 0));
    assert!(!params.add_water);

    let map = finished(generate(GenParams::Realistic(params.clone())).unwrap());
    let theme = params.theme.theme();
    for y in 0..64 {
        for x in 0..64 {
            assert_eq!(map.surface_level(x, y), Some(32), "column ({x}, {y})");
        }
    }
    assert_eq!(map.count(theme.water_surface), 0);
    assert_eq!(map.count(Block::WATER), 0);
    assert_eq!(map.count(Block::STILL_WATER), 0);
}

/// Test: the generator stamps its name, version and a parameter document
/// that reads back to the same parameters.
#[test]
fn test_metadata_round_trip() {
    let params = GenParams::Realistic(RealisticParams {
        seed: 77,
        add_caves: true,
        add_ore: true,
        ..RealisticParams::with_dimensions(48, 48, 48)
    });
    let map = finished(generate(params.clone()).unwrap());

    assert_eq!(map.metadata(METADATA_GROUP, "Generator"), Some("Realistic"));
    assert_eq!(map.metadata(METADATA_GROUP, "Version"), Some(GeneratorKind::Realistic.version()));
    let document = map.metadata(METADATA_GROUP, "Params").unwrap();
    assert_eq!(GenParams::from_document(document).unwrap(), params);
}

/// Test: same parameters, same map; different seed, different map.
#[test]
fn test_generation_is_deterministic() {
    let registry = GeneratorRegistry::with_builtins();
    for name in ["classic", "realistic"] {
        let kind = registry.find(name).unwrap();
        let dims = tundra_core::Dimensions::new(48, 40, 40);
        let a = finished(generate(kind.default_params(dims, 5)).unwrap());
        let b = finished(generate(kind.default_params(dims, 5)).unwrap());
        let c = finished(generate(kind.default_params(dims, 6)).unwrap());
        assert_eq!(a.blocks(), b.blocks(), "{name}");
        assert_ne!(a.blocks(), c.blocks(), "{name}");
    }
}

/// Test: every template generates a full map at a small size.
#[test]
fn test_every_template_generates() {
    for template in RealisticTemplate::ALL {
        let params = GenParams::Realistic(RealisticParams {
            add_caves: true,
            add_cave_lava: true,
            add_cave_water: true,
            add_ore: true,
            add_giant_trees: true,
            ..template.params(40, 40, 48, 3)
        });
        let map = finished(generate(params).unwrap());
        assert!(map.count(Block::AIR) < map.volume(), "{template}");
        assert!(map.blocks().iter().all(|b| b.is_valid()), "{template}");
    }
}

fn phase_percents(params: &GenParams) -> Vec<u8> {
    let (tx, rx) = crossbeam_channel::unbounded::<Progress>();
    let _ = GenerationTask::new(params.clone()).with_channel(tx).run().unwrap();
    rx.try_iter().map(|p| p.percent).collect()
}

/// Test: canceling at any phase boundary ends finished with no result.
#[test]
fn test_cancel_at_every_phase() {
    let cases = [
        GenParams::Flat(FlatParams { width: 32, length: 32, height: 32, ground_level: None }),
        GenParams::Classic(ClassicParams { seed: 2, width: 64, length: 64, height: 32, ..ClassicParams::default() }),
        GenParams::Realistic(RealisticParams {
            add_caves: true,
            add_beaches: true,
            ..RealisticTemplate::Island.params(48, 48, 48, 2)
        }),
    ];
    for params in cases {
        let percents = phase_percents(&params);
        assert!(percents.len() >= 2, "{}", params.generator_name());

        for &stop_at in &percents {
            let task = GenerationTask::new(params.clone());
            let state = task.state();
            let handle = Arc::clone(&state);
            let task = task.with_callback(move |progress| {
                if progress.percent >= stop_at {
                    handle.cancel();
                }
            });
            let outcome = task.run().unwrap();
            assert!(outcome.is_canceled(), "{} at {stop_at}%", params.generator_name());
            assert!(state.is_finished());
            assert!(state.result().is_none());
            assert_eq!(state.status(), "Canceled");
        }
    }
}
