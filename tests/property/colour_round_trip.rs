//! Property tests for the tag colour codec.
//!
//! Uses proptest to verify:
//! 1. Any 8-bit RGB triple survives RGB → OKLCH → RGB within ±1 per channel.
//! 2. The same holds through the persisted `TagColour` form.
//! 3. Any OKLCH input, even out of gamut, converts to RGB without panicking
//!    and normalises its hue into `[0, 360)`.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use planner_proto::colour::{Oklch, Rgb, normalize_hue};
use planner_proto::tag::TagColour;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn arb_rgb() -> impl Strategy<Value = Rgb> {
    (any::<u8>(), any::<u8>(), any::<u8>()).prop_map(|(r, g, b)| Rgb::new(r, g, b))
}

fn within_one(a: Rgb, b: Rgb) -> bool {
    a.r.abs_diff(b.r) <= 1 && a.g.abs_diff(b.g) <= 1 && a.b.abs_diff(b.b) <= 1
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn rgb_round_trips_within_one(rgb in arb_rgb()) {
        let back = rgb.to_oklch().to_rgb();
        prop_assert!(within_one(rgb, back), "{} -> {}", rgb, back);
    }

    #[test]
    fn tag_colour_round_trips_within_one(rgb in arb_rgb()) {
        let colour = TagColour::from(rgb);
        prop_assert!(colour.validate().is_ok(), "{:?}", colour);
        prop_assert!(within_one(rgb, colour.to_rgb()));
    }

    #[test]
    fn any_oklch_converts(l in -0.5f64..1.5, c in 0.0f64..1.0, h in -720.0f64..720.0) {
        let colour = Oklch::new(l, c, h);
        prop_assert!((0.0..360.0).contains(&colour.h));
        let _ = colour.to_rgb();
    }

    #[test]
    fn hue_normalisation_is_idempotent(h in proptest::num::f64::ANY) {
        let once = normalize_hue(h);
        prop_assert!((0.0..360.0).contains(&once));
        prop_assert_eq!(normalize_hue(once), once);
    }
}

// ---------------------------------------------------------------------------
// Exhaustive grid
// ---------------------------------------------------------------------------

#[test]
fn strided_grid_round_trips_within_one() {
    // Every fifth value per channel plus the 255 edge.
    let steps: Vec<u8> = (0..=255u8).step_by(5).chain(std::iter::once(255)).collect();
    for &r in &steps {
        for &g in &steps {
            for &b in &steps {
                let rgb = Rgb::new(r, g, b);
                let back = rgb.to_oklch().to_rgb();
                assert!(within_one(rgb, back), "{rgb} -> {back}");
            }
        }
    }
}

#[test]
fn hex_round_trip_for_picker() {
    let rgb = Rgb::from_hex("#3a7bd5").unwrap();
    assert_eq!(rgb, Rgb::new(0x3a, 0x7b, 0xd5));
    assert_eq!(rgb.to_hex(), "#3a7bd5");
    assert!(Rgb::from_hex("#3a7bd").is_err());
}
