// The detector mapping keeps the flavor of the upstream mapping database:
// every lookup level is its own table, keyed by packed integers where the
// location is two small numbers. Rows are tagged because one file carries
// four different record kinds:
// link,<link>,<det_elem>                          data-link -> detector element
// pad,<det_elem>,<plane>,<chip>,<channel>,<x>,<y> tracker pad geometry
// strip,<det_elem>,<plane>,<board>,<strip>,<x>,<y> trigger strip geometry
// circuit,<chamber>,<name>,<det_elem>             trigger circuit -> detector element
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use fxhash::FxHashMap;

use super::electronics::{location_key, Cathode, PlaneType};
use super::error::MappingError;

const LINK_ENTRIES_PER_LINE: usize = 3;
const PAD_ENTRIES_PER_LINE: usize = 7;
const STRIP_ENTRIES_PER_LINE: usize = 7;
const CIRCUIT_ENTRIES_PER_LINE: usize = 4;

/// Pad indices on a detector element plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pad {
    pub x: i32,
    pub y: i32,
}

/// Pad geometry of one plane of one detector element, addressed by
/// electronics location.
///
/// Tracker planes are addressed by (chip, channel), trigger planes by
/// (board number, strip index). The channel argument is signed so that the
/// inverted-strip offset can run off the edge of the plane and simply find
/// no pad.
#[derive(Debug, Clone, Default)]
pub struct Segmentation {
    pads: FxHashMap<i64, Pad>,
}

impl Segmentation {
    pub fn add_pad(&mut self, chip: i32, channel: i32, pad: Pad) {
        self.pads.insert(location_key(chip, channel), pad);
    }

    /// Look up the pad read out at the given electronics location.
    ///
    /// Returns None if the location is not connected to a pad.
    pub fn pad_by_location(&self, chip: i32, channel: i32) -> Option<Pad> {
        self.pads.get(&location_key(chip, channel)).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.pads.is_empty()
    }
}

/// The static electronics-to-geometry mapping of the detector.
///
/// Built once before decoding and never mutated afterwards; decoders share
/// it read-only. Covers the three translation levels: data-link to detector
/// element, (detector element, chip) to plane segmentation, and trigger
/// circuit naming to detector element.
#[derive(Debug, Clone, Default)]
pub struct DetectorMap {
    link_to_element: FxHashMap<u32, u32>,
    chip_planes: FxHashMap<(u32, u16), PlaneType>,
    segmentations: FxHashMap<(u32, PlaneType), Segmentation>,
    circuits: FxHashMap<(u8, String), u32>,
}

impl DetectorMap {
    /// Load a mapping from a CSV file.
    pub fn from_csv(path: &Path) -> Result<Self, MappingError> {
        if !path.exists() {
            return Err(MappingError::BadFilePath(path.to_path_buf()));
        }
        let mut contents = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
        Self::parse(&contents)
    }

    /// Parse mapping rows from CSV content. The first line is a header and
    /// is skipped.
    pub fn parse(contents: &str) -> Result<Self, MappingError> {
        let mut map = DetectorMap::default();

        let mut lines = contents.lines();
        lines.next(); // Skip the header
        for line in lines {
            let entries: Vec<&str> = line.split_terminator(",").collect();
            if entries.is_empty() {
                continue;
            }
            match entries[0] {
                "link" => {
                    if entries.len() != LINK_ENTRIES_PER_LINE {
                        return Err(MappingError::BadFileFormat);
                    }
                    map.add_link(entries[1].parse()?, entries[2].parse()?);
                }
                "pad" => {
                    if entries.len() != PAD_ENTRIES_PER_LINE {
                        return Err(MappingError::BadFileFormat);
                    }
                    map.add_pad(
                        entries[1].parse()?,
                        PlaneType::from_str(entries[2])?,
                        entries[3].parse()?,
                        entries[4].parse()?,
                        Pad {
                            x: entries[5].parse()?,
                            y: entries[6].parse()?,
                        },
                    );
                }
                "strip" => {
                    if entries.len() != STRIP_ENTRIES_PER_LINE {
                        return Err(MappingError::BadFileFormat);
                    }
                    map.add_strip(
                        entries[1].parse()?,
                        PlaneType::from_str(entries[2])?,
                        entries[3].parse()?,
                        entries[4].parse()?,
                        Pad {
                            x: entries[5].parse()?,
                            y: entries[6].parse()?,
                        },
                    );
                }
                "circuit" => {
                    if entries.len() != CIRCUIT_ENTRIES_PER_LINE {
                        return Err(MappingError::BadFileFormat);
                    }
                    map.add_circuit(entries[1].parse()?, entries[2], entries[3].parse()?);
                }
                _ => return Err(MappingError::BadFileFormat),
            }
        }

        Ok(map)
    }

    /// Map a data-link to its detector element.
    pub fn add_link(&mut self, link: u32, detector_element: u32) {
        self.link_to_element.insert(link, detector_element);
    }

    /// Register one tracker pad and the plane its chip reads out.
    pub fn add_pad(
        &mut self,
        detector_element: u32,
        plane: PlaneType,
        chip: u16,
        channel: u8,
        pad: Pad,
    ) {
        self.chip_planes.insert((detector_element, chip), plane);
        self.segmentations
            .entry((detector_element, plane))
            .or_default()
            .add_pad(chip as i32, channel as i32, pad);
    }

    /// Register one trigger strip, addressed by board number and strip index.
    pub fn add_strip(
        &mut self,
        detector_element: u32,
        plane: PlaneType,
        board: u16,
        strip: u8,
        pad: Pad,
    ) {
        self.segmentations
            .entry((detector_element, plane))
            .or_default()
            .add_pad(board as i32, strip as i32, pad);
    }

    /// Map a (chamber, circuit name) pair to its detector element.
    pub fn add_circuit(&mut self, chamber: u8, name: &str, detector_element: u32) {
        self.circuits
            .insert((chamber, name.to_string()), detector_element);
    }

    /// The detector element read out over the given data-link, if any.
    pub fn detector_element_for_link(&self, link: u32) -> Option<u32> {
        self.link_to_element.get(&link).copied()
    }

    /// The segmentation of whichever plane the given chip reads out.
    pub fn segmentation_by_electronics(
        &self,
        detector_element: u32,
        chip: u16,
    ) -> Option<(PlaneType, &Segmentation)> {
        let plane = *self.chip_planes.get(&(detector_element, chip))?;
        self.segmentations
            .get(&(detector_element, plane))
            .map(|seg| (plane, seg))
    }

    /// The cathode reading out the given plane of the given detector
    /// element, if the element is known.
    pub fn cathode_for(&self, detector_element: u32, plane: PlaneType) -> Option<Cathode> {
        if self.segmentations.contains_key(&(detector_element, plane)) {
            Some(Cathode::from_plane(plane))
        } else {
            None
        }
    }

    /// The detector element of a trigger circuit, addressed by chamber
    /// number and circuit name.
    pub fn circuit_element(&self, chamber: u8, name: &str) -> Option<u32> {
        self.circuits.get(&(chamber, name.to_string())).copied()
    }

    /// The strip segmentation seen by the given cathode of a trigger
    /// detector element.
    pub fn trigger_segmentation(
        &self,
        detector_element: u32,
        cathode: Cathode,
    ) -> Option<&Segmentation> {
        self.segmentations
            .get(&(detector_element, cathode.plane()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP_CSV: &str = "\
kind,fields
link,3,103
pad,103,bend,12,5,4,9
pad,103,nonbend,13,2,1,7
strip,1014,bend,7,0,0,3
circuit,10,2R,1014
";

    #[test]
    fn test_parse_and_lookup() {
        let map = DetectorMap::parse(MAP_CSV).expect("map should parse");
        assert_eq!(map.detector_element_for_link(3), Some(103));
        assert_eq!(map.detector_element_for_link(4), None);

        let (plane, seg) = map
            .segmentation_by_electronics(103, 12)
            .expect("chip 12 should be mapped");
        assert_eq!(plane, PlaneType::Bending);
        assert_eq!(seg.pad_by_location(12, 5), Some(Pad { x: 4, y: 9 }));
        assert_eq!(seg.pad_by_location(12, 6), None);

        assert_eq!(map.cathode_for(103, PlaneType::NonBending), Some(Cathode::NonBend));
        assert_eq!(map.cathode_for(999, PlaneType::Bending), None);

        assert_eq!(map.circuit_element(10, "2R"), Some(1014));
        assert_eq!(map.circuit_element(11, "2R"), None);

        let seg = map
            .trigger_segmentation(1014, Cathode::Bend)
            .expect("trigger plane should be mapped");
        assert_eq!(seg.pad_by_location(7, 0), Some(Pad { x: 0, y: 3 }));
    }

    #[test]
    fn test_bad_tag_is_rejected() {
        let result = DetectorMap::parse("kind\nwire,1,2\n");
        assert!(matches!(result, Err(MappingError::BadFileFormat)));
    }

    #[test]
    fn test_short_row_is_rejected() {
        let result = DetectorMap::parse("kind\npad,103,bend,12,5\n");
        assert!(matches!(result, Err(MappingError::BadFileFormat)));
    }

    #[test]
    fn test_signed_channel_lookup_misses_softly() {
        let map = DetectorMap::parse(MAP_CSV).unwrap();
        let seg = map.trigger_segmentation(1014, Cathode::Bend).unwrap();
        assert_eq!(seg.pad_by_location(7, -8), None);
    }
}
