use std::sync::Arc;

use super::constants::{FIRST_TRIGGER_CHAMBER, INVERSION_SWITCH_BIT, INVERTED_STRIP_OFFSET};
use super::electronics::{Cathode, ElectronicsAddress, GeometryAddress};
use super::error::TranslateFailure;
use super::mapping::DetectorMap;
use super::topology::TriggerBoard;

/// Translates electronics addresses into geometry addresses against an
/// immutable detector map.
///
/// Translation failure is an expected per-channel outcome: the stream can
/// reference links, chips or strips the mapping does not know, and the
/// decode must carry on past them. The translator therefore never panics
/// and never returns a fatal error.
#[derive(Debug, Clone)]
pub struct AddressTranslator {
    map: Arc<DetectorMap>,
}

impl AddressTranslator {
    pub fn new(map: Arc<DetectorMap>) -> Self {
        Self { map }
    }

    /// Translate a tracker channel address.
    pub fn translate(
        &self,
        address: &ElectronicsAddress,
    ) -> Result<GeometryAddress, TranslateFailure> {
        let det = self
            .map
            .detector_element_for_link(address.link)
            .ok_or(TranslateFailure::UnknownLink(address.link))?;

        let (plane, seg) = self
            .map
            .segmentation_by_electronics(det, address.chip)
            .ok_or(TranslateFailure::NoSegmentation {
                det,
                chip: address.chip,
            })?;

        let cathode = self
            .map
            .cathode_for(det, plane)
            .ok_or(TranslateFailure::UnknownCathode { det })?;

        let pad = seg
            .pad_by_location(address.chip as i32, address.channel as i32)
            .ok_or(TranslateFailure::NoPad {
                det,
                chip: address.chip,
                channel: address.channel as i32,
            })?;

        Ok(GeometryAddress {
            detector_element: det,
            pad_x: pad.x,
            pad_y: pad.y,
            cathode,
        })
    }

    /// Translate one strip of a trigger board's hit pattern.
    ///
    /// `chamber_slot` is the pattern slot within the local struct (0..4);
    /// the detector element is resolved on the matching trigger chamber.
    /// Boards with the inversion switch set read the non-bending plane with
    /// a shifted strip numbering; the shift applies to the lookup only, not
    /// to the strip's electronics identity.
    pub fn translate_strip(
        &self,
        board: &TriggerBoard,
        chamber_slot: usize,
        cathode: Cathode,
        strip: u8,
    ) -> Result<GeometryAddress, TranslateFailure> {
        let chamber = FIRST_TRIGGER_CHAMBER + chamber_slot as u8;
        let det = self
            .map
            .circuit_element(chamber, board.name())
            .ok_or_else(|| TranslateFailure::UnknownCircuit {
                chamber,
                name: board.name().to_string(),
            })?;

        let seg = self
            .map
            .trigger_segmentation(det, cathode)
            .ok_or(TranslateFailure::NoStripSegmentation { det })?;

        let mut lookup_strip = strip as i32;
        if cathode == Cathode::NonBend && board.switch(INVERSION_SWITCH_BIT) {
            lookup_strip += INVERTED_STRIP_OFFSET;
        }

        let pad = seg
            .pad_by_location(board.number() as i32, lookup_strip)
            .ok_or(TranslateFailure::NoStrip {
                det,
                board: board.number(),
                strip: lookup_strip,
            })?;

        Ok(GeometryAddress {
            detector_element: det,
            pad_x: pad.x,
            pad_y: pad.y,
            cathode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electronics::PlaneType;
    use crate::mapping::Pad;

    fn test_map() -> Arc<DetectorMap> {
        let mut map = DetectorMap::default();
        map.add_link(3, 103);
        map.add_pad(103, PlaneType::Bending, 12, 5, Pad { x: 4, y: 9 });
        map.add_circuit(10, "2R", 1014);
        map.add_strip(1014, PlaneType::Bending, 7, 0, Pad { x: 0, y: 3 });
        map.add_strip(1014, PlaneType::NonBending, 7, 0, Pad { x: 5, y: 0 });
        Arc::new(map)
    }

    #[test]
    fn test_tracker_translation() {
        let translator = AddressTranslator::new(test_map());
        let geometry = translator
            .translate(&ElectronicsAddress::new(3, 12, 5))
            .unwrap();
        assert_eq!(geometry.detector_element, 103);
        assert_eq!((geometry.pad_x, geometry.pad_y), (4, 9));
        assert_eq!(geometry.cathode, Cathode::Bend);
    }

    #[test]
    fn test_tracker_failures_are_values() {
        let translator = AddressTranslator::new(test_map());
        assert_eq!(
            translator.translate(&ElectronicsAddress::new(9, 12, 5)),
            Err(TranslateFailure::UnknownLink(9))
        );
        assert_eq!(
            translator.translate(&ElectronicsAddress::new(3, 99, 5)),
            Err(TranslateFailure::NoSegmentation { det: 103, chip: 99 })
        );
        assert_eq!(
            translator.translate(&ElectronicsAddress::new(3, 12, 6)),
            Err(TranslateFailure::NoPad {
                det: 103,
                chip: 12,
                channel: 6
            })
        );
    }

    #[test]
    fn test_strip_translation_without_inversion() {
        let translator = AddressTranslator::new(test_map());
        let board = TriggerBoard::new(7, "2R", 0);
        let geometry = translator
            .translate_strip(&board, 0, Cathode::Bend, 0)
            .unwrap();
        assert_eq!(geometry.detector_element, 1014);
        assert_eq!((geometry.pad_x, geometry.pad_y), (0, 3));
    }

    #[test]
    fn test_inversion_shifts_nonbend_lookup_only() {
        let translator = AddressTranslator::new(test_map());
        let inverted = TriggerBoard::new(7, "2R", 1 << INVERSION_SWITCH_BIT);

        // Strip 8 lands on lookup strip 0 of the non-bending plane.
        let geometry = translator
            .translate_strip(&inverted, 0, Cathode::NonBend, 8)
            .unwrap();
        assert_eq!((geometry.pad_x, geometry.pad_y), (5, 0));

        // Strip 0 shifts to -8, off the plane.
        assert_eq!(
            translator.translate_strip(&inverted, 0, Cathode::NonBend, 0),
            Err(TranslateFailure::NoStrip {
                det: 1014,
                board: 7,
                strip: -8
            })
        );

        // The bending plane is untouched by the switch.
        let geometry = translator
            .translate_strip(&inverted, 0, Cathode::Bend, 0)
            .unwrap();
        assert_eq!((geometry.pad_x, geometry.pad_y), (0, 3));
    }

    #[test]
    fn test_unknown_circuit() {
        let translator = AddressTranslator::new(test_map());
        let board = TriggerBoard::new(7, "2R", 0);
        assert_eq!(
            translator.translate_strip(&board, 1, Cathode::Bend, 0),
            Err(TranslateFailure::UnknownCircuit {
                chamber: 11,
                name: String::from("2R")
            })
        );
    }
}
