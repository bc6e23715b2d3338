use orbitile_system_terrain::{
    KarstCaveSelector, Selector, TerrainDatabase, TerrainSelectorParameters,
};
use proptest::prelude::*;
use serde_json::{json, Value};

fn build(kind: &str, config: Value, parameters: TerrainSelectorParameters) -> Selector {
    TerrainDatabase::new()
        .create_selector_type(kind, &config, parameters)
        .unwrap_or_else(|error| panic!("{kind} builds: {error}"))
}

fn fingerprint(selector: &Selector) -> Vec<u32> {
    (0..1_000)
        .map(|i: i32| {
            let x = (i * 37) % 409 - 100;
            let y = (i * 53) % 311 - 60;
            selector.get(x, y).to_bits()
        })
        .collect()
}

#[test]
fn max_of_perlin_and_constant_rebuilds_bit_identically() {
    let parameters = TerrainSelectorParameters::new(200, 0.0, 7);
    let config = json!({
        "sources": [
            { "type": "perlin", "config": { "octaves": 3, "frequency": 0.05, "amplitude": 2.0 } },
            { "type": "constant", "config": { "value": -1.0 } }
        ]
    });
    let database = TerrainDatabase::new();
    let selector = build("max", config, parameters);
    let before = fingerprint(&selector);

    let stored = serde_json::to_string(&database.store(&selector)).expect("selector stores");
    drop(selector);
    let reparsed: Value = serde_json::from_str(&stored).expect("stored json parses");
    let rebuilt = database.load(&reparsed).expect("selector loads");

    assert_eq!(before, fingerprint(&rebuilt));
    assert!(before.iter().all(|bits| f32::from_bits(*bits) >= -1.0));
}

#[test]
fn perlin_is_continuous_across_the_seam() {
    let width = 256;
    let selector = build(
        "perlin",
        json!({ "octaves": 2, "frequency": 0.05, "amplitude": 1.0 }),
        TerrainSelectorParameters::new(width, 0.0, 99),
    );
    let mut largest_step = 0.0_f32;
    for y in -20..20 {
        for x in 1..width as i32 {
            largest_step = largest_step.max((selector.get(x, y) - selector.get(x - 1, y)).abs());
        }
    }
    for y in -20..20 {
        let across_seam = (selector.get(0, y) - selector.get(width as i32 - 1, y)).abs();
        assert!(
            across_seam <= largest_step * 1.5 + 1e-4,
            "seam step {across_seam} exceeds interior step {largest_step}"
        );
        assert!((selector.get(width as i32, y) - selector.get(0, y)).abs() < 1e-4);
    }
}

#[test]
fn minmax_preserves_sign() {
    let parameters = TerrainSelectorParameters::new(64, 0.0, 1);
    let mixed = build(
        "minmax",
        json!({ "sources": [
            { "type": "constant", "config": { "value": -3.0 } },
            { "type": "constant", "config": { "value": 0.5 } },
            { "type": "constant", "config": { "value": -7.0 } }
        ]}),
        parameters,
    );
    assert_eq!(mixed.get(0, 0), 0.5);
    let negative = build(
        "minmax",
        json!({ "sources": [
            { "type": "constant", "config": { "value": -3.0 } },
            { "type": "constant", "config": { "value": -7.0 } }
        ]}),
        parameters,
    );
    assert_eq!(negative.get(0, 0), -7.0);
}

#[test]
fn mix_blends_linearly() {
    let selector = build(
        "mix",
        json!({
            "a": { "type": "constant", "config": { "value": 10.0 } },
            "b": { "type": "constant", "config": { "value": 20.0 } },
            "mix": { "type": "constant", "config": { "value": 0.25 } }
        }),
        TerrainSelectorParameters::new(64, 0.0, 1),
    );
    assert_eq!(selector.get(3, 4), 12.5);
}

#[test]
fn displacement_and_rotation_move_the_query() {
    let parameters = TerrainSelectorParameters::new(0, 100.0, 1);
    let shifted = build(
        "displacement",
        json!({
            "source": { "type": "flatSurface", "config": {} },
            "yDisplacement": { "type": "constant", "config": { "value": 10.0 } }
        }),
        parameters,
    );
    assert_eq!(shifted.get(0, 80), 10.0);

    let flipped = build(
        "rotate",
        json!({
            "source": { "type": "flatSurface", "config": {} },
            "rotation": std::f32::consts::PI,
            "rotationCenter": [0.0, 0.0]
        }),
        parameters,
    );
    assert_eq!(flipped.get(0, 30), 130.0);
}

fn flat_karst(parameters: TerrainSelectorParameters, decision: Value) -> KarstCaveSelector {
    let config = json!({
        "layerResolution": 10,
        "layerDensity": 0.1,
        "bufferHeight": 16,
        "caveTaperPoint": 0.5,
        "caveDecision": decision,
        "layerHeightVariation": { "amplitude": 0.0, "bias": 0.0 },
        "caveHeightVariation": { "amplitude": 0.0, "bias": 6.0 },
        "caveFloorVariation": { "amplitude": 0.0, "bias": 3.0 }
    });
    KarstCaveSelector::new(
        serde_json::from_value(config).expect("karst config parses"),
        parameters,
    )
    .expect("karst builds")
}

#[test]
fn karst_reaches_full_height_where_decision_is_saturated() {
    let parameters = TerrainSelectorParameters::new(128, 0.0, 5);
    let karst = flat_karst(parameters, json!({ "amplitude": 0.0, "bias": 1.0 }));
    assert!(karst.layer_exists(0));
    for x in 0..128 {
        let slice = karst.layer_profile(0, x).expect("saturated layer has a cave everywhere");
        assert!((slice.half_height - 4.5).abs() < 1e-5);
        assert!((slice.midpoint - 1.5).abs() < 1e-5);
    }
}

#[test]
fn karst_height_ramps_with_sine_taper_at_cave_entries() {
    let width = 512;
    let parameters = TerrainSelectorParameters::new(width, 0.0, 11);
    let karst = flat_karst(parameters, json!({ "frequency": 0.05, "amplitude": 1.0 }));
    let taper_point = karst.taper_point();
    let full_half_height = 4.5_f32;

    let mut ramps = 0;
    for x in 1..width as i32 {
        if karst.decision(0, x - 1) > 0.0 || karst.decision(0, x) <= 0.0 {
            continue;
        }
        ramps += 1;
        let mut previous = 0.0_f32;
        let mut column = x;
        while column < width as i32 {
            let decision = karst.decision(0, column);
            if decision <= 0.0 || decision >= taper_point {
                break;
            }
            let slice = karst.layer_profile(0, column).expect("positive decision carves");
            let expected = full_half_height
                * (std::f32::consts::FRAC_PI_2 * decision / taper_point).sin();
            assert!((slice.half_height - expected).abs() < 1e-4);
            if column > x && decision > karst.decision(0, column - 1) {
                assert!(slice.half_height > previous, "ramp must rise at x={column}");
            }
            previous = slice.half_height;
            column += 1;
        }
    }
    assert!(ramps > 0, "expected at least one cave entry along the layer");
}

#[test]
fn karst_values_peak_at_cave_midpoint() {
    let parameters = TerrainSelectorParameters::new(128, 0.0, 5);
    let karst = flat_karst(parameters, json!({ "amplitude": 0.0, "bias": 1.0 }));
    let stored = json!({
        "type": "karstcave",
        "config": {
            "layerResolution": 10,
            "layerDensity": 0.1,
            "bufferHeight": 16,
            "caveTaperPoint": 0.5,
            "caveDecision": { "amplitude": 0.0, "bias": 1.0 },
            "layerHeightVariation": { "amplitude": 0.0, "bias": 0.0 },
            "caveHeightVariation": { "amplitude": 0.0, "bias": 6.0 },
            "caveFloorVariation": { "amplitude": 0.0, "bias": 3.0 }
        },
        "parameters": { "worldWidth": 128, "baseHeight": 0.0, "seed": 5, "commonality": 1.0 }
    });
    let selector = TerrainDatabase::new().load(&stored).expect("karst loads");
    let slice = karst.layer_profile(0, 17).expect("cave exists");
    assert!((selector.get(17, 1) - (slice.half_height - 0.5)).abs() < 1e-5);
    assert!((selector.get(17, 2) - (slice.half_height - 0.5)).abs() < 1e-5);
    assert!((selector.get(17, 5) - (slice.half_height - 3.5)).abs() < 1e-5);
}

#[test]
fn worm_caves_are_deterministic_and_wrap() {
    let parameters = TerrainSelectorParameters::new(256, 0.0, 21);
    let config = json!({
        "numberOfWormsPerSectorRange": [2, 3],
        "wormSizeRange": [3.0, 5.0],
        "wormLengthRange": [30.0, 60.0]
    });
    let first = build("wormcave", config.clone(), parameters);
    let second = build("wormcave", config, parameters);
    let mut carved = 0;
    for y in 0..128 {
        for x in -64..64 {
            let value = first.get(x, y);
            assert_eq!(value.to_bits(), second.get(x, y).to_bits());
            assert_eq!(value.to_bits(), first.get(x + 256, y).to_bits());
            if value >= 0.0 {
                carved += 1;
            }
        }
    }
    assert!(carved > 0, "worms should carve some cells");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn store_then_load_preserves_samples(
        seed in any::<u64>(),
        width in 32_u32..1024,
        octaves in 1_u32..4,
        frequency in 0.005_f64..0.2,
        points in prop::collection::vec((-2000_i32..2000, -500_i32..500), 1..32),
    ) {
        let database = TerrainDatabase::new();
        let parameters = TerrainSelectorParameters::new(width, 50.0, seed);
        let selector = database
            .create_selector_type(
                "displacement",
                &json!({
                    "source": { "type": "flatSurface", "config": {} },
                    "yDisplacement": {
                        "type": "perlin",
                        "config": { "octaves": octaves, "frequency": frequency, "amplitude": 12.0 }
                    }
                }),
                parameters,
            )
            .expect("selector builds");
        let loaded = database.load(&database.store(&selector)).expect("selector loads");
        for (x, y) in points {
            prop_assert_eq!(selector.get(x, y).to_bits(), loaded.get(x, y).to_bits());
        }
    }
}
