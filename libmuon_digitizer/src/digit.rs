use serde::{Deserialize, Serialize};

use super::electronics::Cathode;

/// One geometry-located, amplitude-valued hit, the unit output record of
/// the digitizer.
///
/// Tracker digits carry the sampled charge as their amplitude; trigger
/// digits carry a fixed hit flag. A digit is immutable once inserted into a
/// store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Digit {
    pub detector_element: u32,
    pub chip: u16,
    pub channel: u16,
    pub cathode: Cathode,
    pub pad_x: i32,
    pub pad_y: i32,
    pub amplitude: f32,
}

impl Digit {
    /// Unique key of this digit within one decode pass.
    ///
    /// Decimal packing; every component stays well below its base.
    pub fn key(&self) -> i64 {
        digit_key(self.detector_element, self.chip, self.channel, self.cathode)
    }
}

/// Generate the unique key for a digit location.
pub fn digit_key(detector_element: u32, chip: u16, channel: u16, cathode: Cathode) -> i64 {
    (channel as i64)
        + (chip as i64) * 1_000
        + (cathode.index() as i64) * 100_000_000
        + (detector_element as i64) * 1_000_000_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_discriminates_every_field() {
        let base = digit_key(103, 12, 5, Cathode::Bend);
        assert_ne!(base, digit_key(104, 12, 5, Cathode::Bend));
        assert_ne!(base, digit_key(103, 13, 5, Cathode::Bend));
        assert_ne!(base, digit_key(103, 12, 6, Cathode::Bend));
        assert_ne!(base, digit_key(103, 12, 5, Cathode::NonBend));
    }
}
