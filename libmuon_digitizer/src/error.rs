use std::path::PathBuf;
use thiserror::Error;

use super::constants::*;
use super::worker_status::WorkerStatus;

#[derive(Debug, Error)]
pub enum RawEventError {
    #[error("Failed to read raw event data: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Incorrect magic word {0:#010x} found for raw event; expected {exp:#010x}", exp=EVENT_MAGIC)]
    BadMagic(u32),
    #[error("Incorrect fragment kind {0} found in raw event; expected {exp1} or {exp2}", exp1=FRAGMENT_KIND_TRACKER, exp2=FRAGMENT_KIND_TRIGGER)]
    BadFragmentKind(u8),
    #[error("Fragment count {0} in raw event exceeds the limit of {max}", max=MAX_FRAGMENTS_PER_EVENT)]
    BadFragmentCount(u32),
    #[error("Fragment payload of {0} bytes exceeds the limit of {max}", max=MAX_FRAGMENT_BYTES)]
    OversizedPayload(u32),
    #[error("Regional header count {0} exceeds the limit of {max}", max=MAX_REGIONS_PER_BLOCK)]
    BadRegionCount(u8),
    #[error("Local struct count {0} exceeds the limit of {max}", max=MAX_LOCALS_PER_REGION)]
    BadLocalCount(u8),
}

#[derive(Debug, Error)]
pub enum RawFileError {
    #[error("Error when parsing event from raw file: {0}")]
    BadEvent(#[from] RawEventError),
    #[error("Could not open raw file because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Raw file failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("DetectorMap failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("DetectorMap failed to parse an integer: {0}")]
    ParsingError(#[from] std::num::ParseIntError),
    #[error("Found invalid plane keyword: {0}")]
    BadPlane(String),
    #[error("Could not load DetectorMap because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("DetectorMap was given a file with the incorrect format; most likely a row tag or the number of columns is incorrect")]
    BadFileFormat,
}

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("TriggerCrateStore failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("TriggerCrateStore failed to parse an integer: {0}")]
    ParsingError(#[from] std::num::ParseIntError),
    #[error("Could not load TriggerCrateStore because file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("TriggerCrateStore was given a file with the incorrect format; most likely a row tag or the number of columns is incorrect")]
    BadFileFormat,
}

/// A failed address translation. This is a normal per-channel outcome, not
/// a fatal condition; decoders record it and move on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateFailure {
    #[error("No detector element mapped to link {0}")]
    UnknownLink(u32),
    #[error("No segmentation for detector element {det}, chip {chip}")]
    NoSegmentation { det: u32, chip: u16 },
    #[error("No cathode defined for detector element {det}")]
    UnknownCathode { det: u32 },
    #[error("No pad for detector element {det}, chip {chip}, channel {channel}")]
    NoPad { det: u32, chip: u16, channel: i32 },
    #[error("No trigger circuit for chamber {chamber}, board {name}")]
    UnknownCircuit { chamber: u8, name: String },
    #[error("No strip segmentation for detector element {det}")]
    NoStripSegmentation { det: u32 },
    #[error("No strip for detector element {det}, board {board}, strip {strip}")]
    NoStrip { det: u32, board: u16, strip: i32 },
}

/// Soft failures recorded while decoding one event. None of these stop the
/// decode; they are aggregated into the decode report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeWarning {
    #[error("Address translation failed: {0}")]
    Address(#[from] TranslateFailure),
    #[error("Missing trigger crate for link {link}, region {region}")]
    MissingCrate { link: u32, region: u8 },
    #[error("Missing board slot {slot} in trigger crate for link {link}, region {region}")]
    MissingBoard { link: u32, region: u8, slot: u8 },
    #[error("Unknown trigger board number {0}")]
    UnknownBoard(u16),
    #[error("Duplicate digit rejected for detector element {det}, chip {chip}, channel {channel}")]
    DuplicateDigit { det: u32, chip: u16, channel: u16 },
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("No digit or trigger store given, nothing to do")]
    NoOutputStore,
    #[error("Trigger digit synthesis requested but no digit store given")]
    SynthesisWithoutDigitStore,
    #[error("Decode failed due to raw event error: {0}")]
    Stream(#[from] RawEventError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Processor failed due to Config error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Processor failed due to DetectorMap error: {0}")]
    MapError(#[from] MappingError),
    #[error("Processor failed due to TriggerCrateStore error: {0}")]
    TopologyError(#[from] TopologyError),
    #[error("Processor failed due to raw file error: {0}")]
    FileError(#[from] RawFileError),
    #[error("Processor failed due to decode error: {0}")]
    DecodeError(#[from] DecodeError),
    #[error("Processor failed to serialize the run digest: {0}")]
    DigestError(#[from] serde_yaml::Error),
    #[error("Processor failed due to Send error: {0}")]
    SendError(#[from] std::sync::mpsc::SendError<WorkerStatus>),
    #[error("Processor failed due to IO error: {0}")]
    IoError(#[from] std::io::Error),
}
