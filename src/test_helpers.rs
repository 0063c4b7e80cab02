//! Shared helpers for the decoder's unit tests.

/// Compares two `f32` values allowing for the small imprecision introduced
/// by the fixed-point-to-float scaling used throughout `messages::parsers`
/// (course, speed, lat/lon). Not a general-purpose float comparison; just
/// enough slack for decoded AIS values.
pub fn f32_equal_naive(a: f32, b: f32) {
    let diff = (a - b).abs();
    assert!(
        diff < 0.01,
        "floats not equal within tolerance: {} vs {} (diff {})",
        a,
        b,
        diff
    );
}
