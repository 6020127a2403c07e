// Framed raw event layout, little endian throughout:
// event    := magic:u32 event_id:u32 n_fragments:u32 fragment*
// fragment := link:u32 kind:u8 payload_len:u32 payload
// tracker  := n_samples:u32 (chip:u16 channel:u8 adc:u16)*
// trigger  := global_flag:u8 global_response:u32 n_regions:u8
//             (n_locals:u8 (id:u8 decision:u8 x:u16{4} y:u16{4})*)*
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, Read, Seek, Write};
use std::path::{Path, PathBuf};

use super::constants::*;
use super::error::{RawEventError, RawFileError};

/// Which sub-stream a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    Tracker,
    Trigger,
}

impl FragmentKind {
    fn from_wire(kind: u8) -> Result<Self, RawEventError> {
        match kind {
            FRAGMENT_KIND_TRACKER => Ok(Self::Tracker),
            FRAGMENT_KIND_TRIGGER => Ok(Self::Trigger),
            _ => Err(RawEventError::BadFragmentKind(kind)),
        }
    }

    fn to_wire(self) -> u8 {
        match self {
            Self::Tracker => FRAGMENT_KIND_TRACKER,
            Self::Trigger => FRAGMENT_KIND_TRIGGER,
        }
    }
}

/// One data-link's fragment within an event. The payload stays raw until a
/// stream cursor walks it, so a corrupt fragment surfaces exactly where the
/// decode reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFragment {
    pub link: u32,
    pub kind: FragmentKind,
    pub payload: Vec<u8>,
}

impl RawFragment {
    /// Build a tracker fragment from (chip, channel, adc) samples.
    pub fn tracker(link: u32, samples: &[(u16, u8, u16)]) -> Self {
        // writes into a Vec cannot fail
        let mut payload = Vec::with_capacity(4 + samples.len() * 5);
        payload.write_u32::<LittleEndian>(samples.len() as u32).unwrap();
        for (chip, channel, adc) in samples {
            payload.write_u16::<LittleEndian>(*chip).unwrap();
            payload.write_u8(*channel).unwrap();
            payload.write_u16::<LittleEndian>(*adc).unwrap();
        }
        Self {
            link,
            kind: FragmentKind::Tracker,
            payload,
        }
    }

    /// Build a trigger fragment from a darc header and its regional blocks.
    pub fn trigger(link: u32, darc: &DarcHeader, regions: &[RegionalBlock]) -> Self {
        // writes into a Vec cannot fail
        let mut payload = Vec::new();
        payload.write_u8(darc.global_flag as u8).unwrap();
        payload
            .write_u32::<LittleEndian>(darc.global_response)
            .unwrap();
        payload.write_u8(regions.len() as u8).unwrap();
        for region in regions {
            payload.write_u8(region.locals.len() as u8).unwrap();
            for local in &region.locals {
                payload.write_u8(local.id).unwrap();
                payload.write_u8(local.decision).unwrap();
                for word in local.x_patterns {
                    payload.write_u16::<LittleEndian>(word).unwrap();
                }
                for word in local.y_patterns {
                    payload.write_u16::<LittleEndian>(word).unwrap();
                }
            }
        }
        Self {
            link,
            kind: FragmentKind::Trigger,
            payload,
        }
    }
}

/// One event as delivered by the upstream reader: a set of per-link
/// fragments, already deframed and byte-ordered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawEvent {
    pub event_id: u32,
    pub fragments: Vec<RawFragment>,
}

impl RawEvent {
    pub fn new(event_id: u32) -> Self {
        Self {
            event_id,
            fragments: Vec::new(),
        }
    }

    /// Read one event from a byte source.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, RawEventError> {
        let magic = reader.read_u32::<LittleEndian>()?;
        if magic != EVENT_MAGIC {
            return Err(RawEventError::BadMagic(magic));
        }
        let event_id = reader.read_u32::<LittleEndian>()?;
        let n_fragments = reader.read_u32::<LittleEndian>()?;
        if n_fragments > MAX_FRAGMENTS_PER_EVENT {
            return Err(RawEventError::BadFragmentCount(n_fragments));
        }

        let mut fragments = Vec::with_capacity(n_fragments as usize);
        for _ in 0..n_fragments {
            let link = reader.read_u32::<LittleEndian>()?;
            let kind = FragmentKind::from_wire(reader.read_u8()?)?;
            let payload_len = reader.read_u32::<LittleEndian>()?;
            if payload_len > MAX_FRAGMENT_BYTES {
                return Err(RawEventError::OversizedPayload(payload_len));
            }
            let mut payload = vec![0; payload_len as usize];
            reader.read_exact(&mut payload)?;
            fragments.push(RawFragment {
                link,
                kind,
                payload,
            });
        }

        Ok(Self {
            event_id,
            fragments,
        })
    }

    /// Write this event in the framed layout. Counterpart of
    /// [`read_from`](Self::read_from), used by the upstream writer and by
    /// fixtures.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), std::io::Error> {
        writer.write_u32::<LittleEndian>(EVENT_MAGIC)?;
        writer.write_u32::<LittleEndian>(self.event_id)?;
        writer.write_u32::<LittleEndian>(self.fragments.len() as u32)?;
        for fragment in &self.fragments {
            writer.write_u32::<LittleEndian>(fragment.link)?;
            writer.write_u8(fragment.kind.to_wire())?;
            writer.write_u32::<LittleEndian>(fragment.payload.len() as u32)?;
            writer.write_all(&fragment.payload)?;
        }
        Ok(())
    }
}

/// Event-level header of one trigger fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DarcHeader {
    pub global_flag: bool,
    pub global_response: u32,
}

/// One regional header and the local structs it carries.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionalBlock {
    pub locals: Vec<LocalStruct>,
}

/// Per-board trigger record: four strip patterns per direction plus the
/// board's local decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalStruct {
    pub id: u8,
    pub decision: u8,
    pub x_patterns: [u16; 4],
    pub y_patterns: [u16; 4],
}

/// A fully parsed trigger fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerBlock {
    pub link: u32,
    pub darc: DarcHeader,
    pub regions: Vec<RegionalBlock>,
}

impl TriggerBlock {
    /// Parse a trigger fragment payload.
    pub fn parse(link: u32, payload: &[u8]) -> Result<Self, RawEventError> {
        let mut cursor = payload;
        let reader = &mut cursor;

        let global_flag = reader.read_u8()? != 0;
        let global_response = reader.read_u32::<LittleEndian>()?;
        let n_regions = reader.read_u8()?;
        if n_regions > MAX_REGIONS_PER_BLOCK {
            return Err(RawEventError::BadRegionCount(n_regions));
        }

        let mut regions = Vec::with_capacity(n_regions as usize);
        for _ in 0..n_regions {
            let n_locals = reader.read_u8()?;
            if n_locals > MAX_LOCALS_PER_REGION {
                return Err(RawEventError::BadLocalCount(n_locals));
            }
            let mut locals = Vec::with_capacity(n_locals as usize);
            for _ in 0..n_locals {
                let mut local = LocalStruct {
                    id: reader.read_u8()?,
                    decision: reader.read_u8()?,
                    ..Default::default()
                };
                reader.read_u16_into::<LittleEndian>(&mut local.x_patterns)?;
                reader.read_u16_into::<LittleEndian>(&mut local.y_patterns)?;
                locals.push(local);
            }
            regions.push(RegionalBlock { locals });
        }

        Ok(Self {
            link,
            darc: DarcHeader {
                global_flag,
                global_response,
            },
            regions,
        })
    }
}

/// A run file holding a sequence of framed raw events.
///
/// Pull events out one at a time; `Ok(None)` signals a cleanly exhausted
/// file, any parse failure inside an event is fatal for the file.
#[derive(Debug)]
pub struct RawFile {
    reader: BufReader<File>,
    size_bytes: u64,
    parent_path: PathBuf,
}

impl RawFile {
    pub fn open(path: &Path) -> Result<Self, RawFileError> {
        if !path.exists() {
            return Err(RawFileError::BadFilePath(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let size_bytes = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            size_bytes,
            parent_path: path.to_path_buf(),
        })
    }

    /// Total file size, for progress reporting.
    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// How far into the file the reader has advanced.
    pub fn position(&mut self) -> Result<u64, RawFileError> {
        Ok(self.reader.stream_position()?)
    }

    pub fn path(&self) -> &Path {
        &self.parent_path
    }

    /// Read the next event, or None once the file is exhausted.
    pub fn next_event(&mut self) -> Result<Option<RawEvent>, RawFileError> {
        if self.reader.stream_position()? >= self.size_bytes {
            return Ok(None);
        }
        Ok(Some(RawEvent::read_from(&mut self.reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> RawEvent {
        let mut event = RawEvent::new(42);
        event
            .fragments
            .push(RawFragment::tracker(3, &[(12, 5, 87), (12, 6, 101)]));
        event.fragments.push(RawFragment::trigger(
            20,
            &DarcHeader {
                global_flag: true,
                global_response: 0x5,
            },
            &[RegionalBlock {
                locals: vec![LocalStruct {
                    id: 1,
                    decision: 1,
                    x_patterns: [0x0001, 0, 0, 0],
                    y_patterns: [0, 0, 0, 0],
                }],
            }],
        ));
        event
    }

    #[test]
    fn test_event_round_trip() {
        let event = sample_event();
        let mut bytes = Vec::new();
        event.write_to(&mut bytes).unwrap();
        let read_back = RawEvent::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(read_back, event);
    }

    #[test]
    fn test_bad_magic_is_fatal() {
        let event = sample_event();
        let mut bytes = Vec::new();
        event.write_to(&mut bytes).unwrap();
        bytes[0] ^= 0xFF;
        let result = RawEvent::read_from(&mut bytes.as_slice());
        assert!(matches!(result, Err(RawEventError::BadMagic(_))));
    }

    #[test]
    fn test_truncated_event_is_fatal() {
        let event = sample_event();
        let mut bytes = Vec::new();
        event.write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        let result = RawEvent::read_from(&mut bytes.as_slice());
        assert!(matches!(result, Err(RawEventError::IOError(_))));
    }

    #[test]
    fn test_trigger_payload_parse() {
        let fragment = RawFragment::trigger(
            20,
            &DarcHeader {
                global_flag: false,
                global_response: 0,
            },
            &[
                RegionalBlock::default(),
                RegionalBlock {
                    locals: vec![LocalStruct {
                        id: 2,
                        decision: 0,
                        x_patterns: [0, 0x8001, 0, 0],
                        y_patterns: [0, 0, 0, 0x0010],
                    }],
                },
            ],
        );
        let block = TriggerBlock::parse(fragment.link, &fragment.payload).unwrap();
        assert_eq!(block.link, 20);
        assert!(!block.darc.global_flag);
        assert_eq!(block.regions.len(), 2);
        assert!(block.regions[0].locals.is_empty());
        assert_eq!(block.regions[1].locals[0].x_patterns[1], 0x8001);
        assert_eq!(block.regions[1].locals[0].y_patterns[3], 0x0010);
    }
}
