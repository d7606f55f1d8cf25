//! Score scale normalization.
//!
//! The scoring prompt asks for a 0–100 score, but models regularly answer on
//! the 0–9 IELTS band scale anyway. Anything below 10 is read as a band score
//! and mapped through a fixed half-band table.

/// Band score to percentage, at half-band granularity.
const BAND_TABLE: [(f64, u8); 18] = [
    (9.0, 95),
    (8.5, 90),
    (8.0, 85),
    (7.5, 80),
    (7.0, 75),
    (6.5, 70),
    (6.0, 65),
    (5.5, 55),
    (5.0, 50),
    (4.5, 45),
    (4.0, 40),
    (3.5, 35),
    (3.0, 30),
    (2.5, 25),
    (2.0, 20),
    (1.5, 15),
    (1.0, 10),
    (0.0, 5),
];

/// Scores below this are treated as band scores.
const BAND_SCALE_LIMIT: f64 = 10.0;

/// Linear factor for band scores that miss the table.
const LINEAR_BAND_FACTOR: f64 = 11.11;

fn band_lookup(band: f64) -> Option<u8> {
    BAND_TABLE
        .iter()
        .find(|(b, _)| (*b - band).abs() < f64::EPSILON)
        .map(|(_, pct)| *pct)
}

/// Whether `raw` would be interpreted as a band score.
pub fn is_band_score(raw: f64) -> bool {
    (0.0..BAND_SCALE_LIMIT).contains(&raw)
}

/// Normalize a raw oracle score onto the integer 0–100 scale.
///
/// Band scores are looked up exactly, then at the nearest half band, and
/// finally scaled linearly. Everything is clamped to 0–100 and rounded.
pub fn normalize_score(raw: f64) -> u8 {
    if raw.is_nan() {
        return 0;
    }

    let percent = if is_band_score(raw) {
        let half_band = (raw * 2.0).round() / 2.0;
        band_lookup(raw)
            .or_else(|| band_lookup(half_band))
            .map(f64::from)
            .unwrap_or(raw * LINEAR_BAND_FACTOR)
    } else {
        raw
    };

    percent.clamp(0.0, 100.0).round() as u8
}
