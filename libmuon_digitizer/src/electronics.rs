use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::MappingError;

/// One of the two independent readout planes of a detector element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaneType {
    Bending,
    NonBending,
}

impl FromStr for PlaneType {
    type Err = MappingError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "bend" {
            Ok(Self::Bending)
        } else if s == "nonbend" {
            Ok(Self::NonBending)
        } else {
            Err(MappingError::BadPlane(s.to_string()))
        }
    }
}

/// The cathode a digit is read out on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cathode {
    Bend,
    NonBend,
}

impl Cathode {
    /// Cathode index as used in digit keys and pattern arrays (0 or 1).
    pub fn index(&self) -> usize {
        match self {
            Cathode::Bend => 0,
            Cathode::NonBend => 1,
        }
    }

    /// The cathode reading out the given plane.
    pub fn from_plane(plane: PlaneType) -> Self {
        match plane {
            PlaneType::Bending => Cathode::Bend,
            PlaneType::NonBending => Cathode::NonBend,
        }
    }

    /// The plane read out by this cathode.
    pub fn plane(&self) -> PlaneType {
        match self {
            Cathode::Bend => PlaneType::Bending,
            Cathode::NonBend => PlaneType::NonBending,
        }
    }
}

/// Electronics address of a single tracker readout channel as it appears
/// on the wire: the data-link it was read from plus the chip/channel pair
/// inside that link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElectronicsAddress {
    pub link: u32,
    pub chip: u16,
    pub channel: u8,
}

impl ElectronicsAddress {
    pub fn new(link: u32, chip: u16, channel: u8) -> Self {
        Self {
            link,
            chip,
            channel,
        }
    }
}

/// Geometry address of a readout pad, produced only by address translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryAddress {
    pub detector_element: u32,
    pub pad_x: i32,
    pub pad_y: i32,
    pub cathode: Cathode,
}

/// Pack a (chip, channel) location into a unique lookup key.
///
/// Channels stay well below the packing base, so signed channels (the
/// inverted-strip offset can push a strip index negative) never collide
/// with a neighbouring chip block.
pub fn location_key(chip: i32, channel: i32) -> i64 {
    (chip as i64) * 10_000 + (channel as i64)
}
