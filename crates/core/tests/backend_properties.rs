//! Shared behaviour of the CPU ripple backends
//!
//! Every backend must decay to rest, keep disturbances local, survive
//! injections at and beyond the grid edges, reproduce the reference raster
//! at rest and be deterministic for identical input sequences.
//!
//! Run tests with: cargo test --test `backend_properties`

use ripple_core::config::{Backend, RippleConfig};
use ripple_core::solver::{PressureRippleField, ScalarRippleField};
use ripple_core::{create_ripple_field, Disturbance, GridSize, Raster, RippleField, Vec2};
use std::time::Duration;

/// Frame interval used to drive the ambient wave
const FRAME: Duration = Duration::from_millis(16);

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn reference(width: u32, height: u32) -> Raster {
    let size = GridSize::new(width, height).unwrap();
    Raster::from_fn(size, |x, y| {
        [
            (x * 7 % 256) as u8,
            (y * 13 % 256) as u8,
            ((x ^ y) % 256) as u8,
            255,
        ]
    })
}

fn quiet_config() -> RippleConfig {
    let mut config = RippleConfig::default();
    config.parallel.ambient_wave = false;
    config
}

fn cpu_fields(width: u32, height: u32) -> Vec<Box<dyn RippleField>> {
    let config = quiet_config();
    [Backend::Scalar, Backend::PressureReference]
        .into_iter()
        .map(|backend| create_ripple_field(&config.with_backend(backend), reference(width, height)))
        .collect()
}

fn run(field: &mut dyn RippleField, steps: usize) {
    for i in 0..steps {
        field.step(FRAME * i as u32);
    }
}

fn max_abs_scalar(field: &ScalarRippleField) -> i32 {
    let size = field.size();
    let arena = &field.store().arena;
    let mut max = 0;
    for y in 0..size.height() {
        for x in 0..size.width() {
            max = max
                .max(i32::from(arena.latest(x, y)).abs())
                .max(i32::from(arena.pressure(x, y)).abs());
        }
    }
    max
}

fn max_abs_pressure(field: &PressureRippleField) -> f32 {
    field
        .state()
        .iter()
        .fold(0.0_f32, |max, cell| max.max(cell[0].abs()))
}

// ═══════════════════════════════════════════════════════════════════════
// Rest identity
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_rest_reproduces_reference() {
    for mut field in cpu_fields(96, 64) {
        let expected = reference(96, 64);
        let name = field.name();
        assert_eq!(field.composite(), &expected, "{} before any step", name);

        run(field.as_mut(), 10);
        assert_eq!(field.composite(), &expected, "{} after steps at rest", name);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Decay to rest
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_scalar_decays() {
    let config = RippleConfig::default();
    let mut field = ScalarRippleField::new(reference(64, 64), config.scalar);
    field.inject(&Disturbance::isotropic(Vec2::new(32.0, 32.0), 350.0, 10.0));

    run(&mut field, 2);
    let early = max_abs_scalar(&field);
    assert!(early > 0);

    run(&mut field, 1500);
    assert_eq!(max_abs_scalar(&field), 0);
    assert_eq!(field.composite(), &reference(64, 64));
}

#[test]
fn test_pressure_reference_decays() {
    let config = quiet_config();
    let mut field = PressureRippleField::new(reference(32, 32), config.parallel);
    field.inject(&Disturbance::isotropic(Vec2::new(16.0, 16.0), 350.0, 6.0));

    run(&mut field, 1);
    let early = max_abs_pressure(&field);
    assert!(early > 0.0);

    run(&mut field, 3000);
    let late = max_abs_pressure(&field);
    assert!(late < early * 0.1, "early {early}, late {late}");
}

// ═══════════════════════════════════════════════════════════════════════
// Bounded support
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_scalar_support_grows_one_cell_per_step() {
    let config = RippleConfig::default();
    let mut field = ScalarRippleField::new(reference(64, 64), config.scalar);
    let (cx, cy, radius) = (32_i64, 32_i64, 4_i64);
    field.inject(&Disturbance::isotropic(
        Vec2::new(cx as f32, cy as f32),
        300.0,
        radius as f32,
    ));

    let steps = 5;
    run(&mut field, steps);

    let reach = radius + steps as i64;
    let arena = &field.store().arena;
    for y in 0..64_u32 {
        for x in 0..64_u32 {
            let outside =
                (i64::from(x) - cx).abs() > reach || (i64::from(y) - cy).abs() > reach;
            if outside {
                assert_eq!(arena.latest(x, y), 0, "cell ({x}, {y}) moved");
                assert_eq!(arena.pressure(x, y), 0, "cell ({x}, {y}) moved");
            }
        }
    }
}

#[test]
fn test_pressure_support_grows_one_cell_per_step() {
    let config = quiet_config();
    let mut field = PressureRippleField::new(reference(48, 48), config.parallel);
    let (cx, cy, radius) = (24_i64, 24_i64, 3_i64);
    field.inject(&Disturbance::isotropic(
        Vec2::new(cx as f32, cy as f32),
        300.0,
        radius as f32,
    ));

    // The splat lands at the end of the first step
    let steps = 4;
    run(&mut field, steps);

    let reach = radius + steps as i64 - 1;
    for (i, cell) in field.state().iter().enumerate() {
        let (x, y) = ((i % 48) as i64, (i / 48) as i64);
        if (x - cx).abs() > reach || (y - cy).abs() > reach {
            assert_eq!(cell[0], 0.0, "cell ({x}, {y}) moved");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Edge safety
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_edge_and_outside_injections() {
    let disturbances = [
        Disturbance::isotropic(Vec2::new(0.0, 0.0), 400.0, 12.0),
        Disturbance::isotropic(Vec2::new(63.0, 39.0), 400.0, 12.0),
        Disturbance::isotropic(Vec2::new(-5.0, 20.0), 400.0, 8.0),
        Disturbance::isotropic(Vec2::new(500.0, -500.0), 400.0, 8.0),
        Disturbance::isotropic(Vec2::new(32.0, 20.0), 400.0, 200.0),
        Disturbance::anisotropic(Vec2::new(64.0, 0.0), 400.0, 30.0, 4.0, Vec2::new(1.0, 1.0)),
        Disturbance::isotropic(Vec2::new(f32::INFINITY, 3.0), 400.0, 8.0),
        Disturbance::isotropic(Vec2::new(10.0, 10.0), 400.0, -3.0),
    ];

    for mut field in cpu_fields(64, 40) {
        for disturbance in &disturbances {
            field.inject(disturbance);
            run(field.as_mut(), 3);
        }
        run(field.as_mut(), 50);
        let output = field.composite();
        assert_eq!(output.size(), GridSize::new(64, 40).unwrap());
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Determinism
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_identical_inputs_identical_frames() {
    let script = |field: &mut dyn RippleField| {
        for i in 0..40_u32 {
            if i % 7 == 0 {
                let x = (i * 5 % 64) as f32;
                field.inject(&Disturbance::isotropic(Vec2::new(x, 20.0), 300.0, 6.0));
            }
            if i % 11 == 3 {
                field.inject(&Disturbance::anisotropic(
                    Vec2::new(30.0, 10.0),
                    250.0,
                    12.0,
                    5.0,
                    Vec2::new(0.6, 0.8),
                ));
            }
            field.step(FRAME * i);
        }
        field.composite().clone()
    };

    let mut config = RippleConfig::default();
    for backend in [Backend::Scalar, Backend::PressureReference] {
        config = config.with_backend(backend);
        let mut a = create_ripple_field(&config, reference(64, 40));
        let mut b = create_ripple_field(&config, reference(64, 40));
        assert_eq!(script(a.as_mut()), script(b.as_mut()), "{backend:?}");
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 8×8 scenario
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_eight_by_eight_single_injection() {
    let config = RippleConfig::default();
    let mut field = ScalarRippleField::new(reference(8, 8), config.scalar);
    field.inject(&Disturbance::isotropic(Vec2::new(4.0, 4.0), 100.0, 2.0));
    field.step(Duration::ZERO);

    let pressure = field.store().arena.latest(4, 4);
    assert_eq!(pressure, -96);
    assert_eq!(field.display_value(pressure), 1120);
    // Cells outside the injected disk are untouched
    assert_eq!(field.store().arena.latest(7, 0), 0);
}

// ═══════════════════════════════════════════════════════════════════════
// Reinit
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_rebuilt_field_starts_at_rest() {
    let config = RippleConfig::default().with_backend(Backend::Scalar);
    let mut field = create_ripple_field(&config, reference(512, 512));
    field.inject(&Disturbance::isotropic(Vec2::new(256.0, 256.0), 350.0, 18.0));
    run(field.as_mut(), 5);
    assert_ne!(field.composite(), &reference(512, 512));

    let mut field = create_ripple_field(&config, reference(640, 400));
    assert_eq!(field.size(), GridSize::new(640, 400).unwrap());
    field.step(Duration::ZERO);
    assert_eq!(field.composite(), &reference(640, 400));
}
