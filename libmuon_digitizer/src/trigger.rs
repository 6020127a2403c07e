use std::sync::Arc;

use super::constants::{TRIGGER_CHAMBERS_PER_BOARD, TRIGGER_DIGIT_AMPLITUDE};
use super::digit::Digit;
use super::electronics::Cathode;
use super::error::{DecodeWarning, RawEventError};
use super::pattern::StripPattern;
use super::raw_event::LocalStruct;
use super::store::{DigitSink, InsertPolicy, TriggerSink};
use super::stream::TriggerSource;
use super::topology::TriggerCrateStore;
use super::translator::AddressTranslator;

/// Event-level trigger response, derived from the darc header's global
/// response word. At most one exists per event; when several DDL blocks
/// carry the global flag the last one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalTriggerRecord {
    response: u32,
}

impl GlobalTriggerRecord {
    pub fn from_response(response: u32) -> Self {
        Self { response }
    }

    pub fn response(&self) -> u32 {
        self.response
    }

    pub fn single_positive(&self) -> bool {
        self.response & 0x1 != 0
    }

    pub fn single_negative(&self) -> bool {
        self.response & 0x2 != 0
    }

    pub fn unlike_sign_pair(&self) -> bool {
        self.response & 0x4 != 0
    }

    pub fn like_sign_pair(&self) -> bool {
        self.response & 0x8 != 0
    }
}

/// Per-board trigger summary written to the trigger store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalTriggerRecord {
    pub circuit: u16,
    pub decision: u8,
    pub x_patterns: [u16; 4],
    pub y_patterns: [u16; 4],
}

impl LocalTriggerRecord {
    pub fn from_struct(circuit: u16, local: &LocalStruct) -> Self {
        Self {
            circuit,
            decision: local.decision,
            x_patterns: local.x_patterns,
            y_patterns: local.y_patterns,
        }
    }
}

/// Decodes the trigger sub-stream of one event: per-DDL darc headers, the
/// regional headers they carry, and each region's local structs.
///
/// Topology gaps (missing crate, missing board slot) skip the affected
/// region or board with a warning; only a corrupt stream is fatal. When a
/// digit sink is given, each non-copy board's hit patterns are unpacked
/// into trigger digits.
#[derive(Debug, Clone)]
pub struct TriggerDecoder {
    translator: AddressTranslator,
    crates: Arc<TriggerCrateStore>,
}

impl TriggerDecoder {
    pub fn new(translator: AddressTranslator, crates: Arc<TriggerCrateStore>) -> Self {
        Self { translator, crates }
    }

    /// Pull DDL blocks until the stream is exhausted. Returns the number of
    /// trigger digits the sink accepted.
    pub fn decode<S, D, T>(
        &self,
        stream: &mut S,
        mut triggers: Option<&mut T>,
        mut digits: Option<&mut D>,
        warnings: &mut Vec<DecodeWarning>,
    ) -> Result<usize, RawEventError>
    where
        S: TriggerSource,
        D: DigitSink,
        T: TriggerSink,
    {
        let mut inserted = 0;
        while let Some(block) = stream.next_block()? {
            if block.darc.global_flag {
                if let Some(sink) = triggers.as_deref_mut() {
                    sink.set_global(GlobalTriggerRecord::from_response(
                        block.darc.global_response,
                    ));
                }
            }

            for (region_index, region) in block.regions.iter().enumerate() {
                let region_index = region_index as u8;
                let crate_ = match self.crates.crate_for(block.link, region_index) {
                    Some(crate_) => crate_,
                    None => {
                        warnings.push(DecodeWarning::MissingCrate {
                            link: block.link,
                            region: region_index,
                        });
                        continue;
                    }
                };

                for local in &region.locals {
                    let board = match crate_.board(local.id) {
                        Some(board) => board,
                        None => {
                            warnings.push(DecodeWarning::MissingBoard {
                                link: block.link,
                                region: region_index,
                                slot: local.id,
                            });
                            continue;
                        }
                    };
                    // copy cards duplicate a neighbour and carry no geometry
                    if board.is_copy() {
                        continue;
                    }

                    if let Some(sink) = triggers.as_deref_mut() {
                        sink.append(LocalTriggerRecord::from_struct(board.number(), local));
                    }
                    if let Some(sink) = digits.as_deref_mut() {
                        inserted += self.make_strip_digits(board.number(), local, sink, warnings);
                    }
                }
            }
        }
        Ok(inserted)
    }

    /// Unpack one board's hit patterns into digits with a fixed amplitude.
    fn make_strip_digits<D: DigitSink>(
        &self,
        circuit: u16,
        local: &LocalStruct,
        sink: &mut D,
        warnings: &mut Vec<DecodeWarning>,
    ) -> usize {
        let board = match self.crates.board_by_number(circuit) {
            Some(board) => board,
            None => {
                warnings.push(DecodeWarning::UnknownBoard(circuit));
                return 0;
            }
        };

        let patterns = [local.x_patterns, local.y_patterns];
        let mut inserted = 0;
        for chamber_slot in 0..TRIGGER_CHAMBERS_PER_BOARD {
            for cathode in [Cathode::Bend, Cathode::NonBend] {
                let pattern = StripPattern::new(patterns[cathode.index()][chamber_slot]);
                if pattern.is_empty() {
                    continue;
                }

                for strip in pattern.iter() {
                    let geometry =
                        match self
                            .translator
                            .translate_strip(board, chamber_slot, cathode, strip)
                        {
                            Ok(geometry) => geometry,
                            Err(failure) => {
                                warnings.push(DecodeWarning::Address(failure));
                                continue;
                            }
                        };

                    let digit = Digit {
                        detector_element: geometry.detector_element,
                        chip: circuit,
                        channel: strip as u16,
                        cathode,
                        pad_x: geometry.pad_x,
                        pad_y: geometry.pad_y,
                        amplitude: TRIGGER_DIGIT_AMPLITUDE,
                    };
                    if sink.insert(digit, InsertPolicy::Deny) {
                        inserted += 1;
                    } else {
                        warnings.push(DecodeWarning::DuplicateDigit {
                            det: geometry.detector_element,
                            chip: circuit,
                            channel: strip as u16,
                        });
                    }
                }
            }
        }
        inserted
    }
}
