//! Property tests for disturbance injection on the CPU backends
//!
//! Random centers, forces, radii and ellipse orientations, including ones far
//! outside the grid, must never panic, must only touch cells inside the
//! disturbance footprint, and must produce identical frames when replayed.

use proptest::prelude::*;
use ripple_core::config::{Backend, RippleConfig};
use ripple_core::solver::ScalarRippleField;
use ripple_core::{create_ripple_field, Disturbance, GridSize, Raster, RippleField, Vec2};
use std::time::Duration;

const WIDTH: u32 = 48;
const HEIGHT: u32 = 32;

fn reference() -> Raster {
    let size = GridSize::new(WIDTH, HEIGHT).unwrap();
    Raster::from_fn(size, |x, y| [(x * 5) as u8, (y * 7) as u8, 60, 255])
}

fn disturbance_strategy() -> impl Strategy<Value = Disturbance> {
    let center = (-60.0_f32..110.0, -60.0_f32..90.0);
    let isotropic = (center.clone(), 1.0_f32..500.0, 0.5_f32..40.0).prop_map(
        |((x, y), force, radius)| Disturbance::isotropic(Vec2::new(x, y), force, radius),
    );
    let anisotropic = (
        center,
        1.0_f32..500.0,
        0.5_f32..40.0,
        0.5_f32..20.0,
        -std::f32::consts::PI..std::f32::consts::PI,
    )
        .prop_map(|((x, y), force, major, minor, angle)| {
            Disturbance::anisotropic(
                Vec2::new(x, y),
                force,
                major,
                minor,
                Vec2::new(angle.cos(), angle.sin()),
            )
        });
    prop_oneof![isotropic, anisotropic]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn injection_stays_inside_footprint(disturbance in disturbance_strategy()) {
        let config = RippleConfig::default();
        let mut field = ScalarRippleField::new(reference(), config.scalar);
        field.inject(&disturbance);

        let arena = &field.store().arena;
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let inside = disturbance.normalized_distance(x as f32, y as f32).is_some();
                if !inside {
                    prop_assert_eq!(arena.pressure(x, y), 0);
                }
            }
        }
    }

    #[test]
    fn random_disturbances_never_panic(
        disturbances in prop::collection::vec(disturbance_strategy(), 1..12),
    ) {
        let config = RippleConfig::default();
        for backend in [Backend::Scalar, Backend::PressureReference] {
            let mut field = create_ripple_field(&config.with_backend(backend), reference());
            for (i, disturbance) in disturbances.iter().enumerate() {
                field.inject(disturbance);
                field.step(Duration::from_millis(16 * i as u64));
            }
            prop_assert_eq!(field.composite().size(), GridSize::new(WIDTH, HEIGHT).unwrap());
        }
    }

    #[test]
    fn replay_is_deterministic(
        disturbances in prop::collection::vec(disturbance_strategy(), 1..6),
        steps in 1_usize..20,
    ) {
        let config = RippleConfig::default();
        for backend in [Backend::Scalar, Backend::PressureReference] {
            let config = config.with_backend(backend);
            let replay = || {
                let mut field = create_ripple_field(&config, reference());
                for disturbance in &disturbances {
                    field.inject(disturbance);
                }
                for i in 0..steps {
                    field.step(Duration::from_millis(16 * i as u64));
                }
                field.composite().clone()
            };
            prop_assert_eq!(replay(), replay());
        }
    }
}
