use std::fs::File;
use std::io::Read;
use std::path::Path;

use fxhash::FxHashMap;

use super::error::TopologyError;

const BOARD_ENTRIES_PER_LINE: usize = 7;

/// Static description of one local trigger board.
///
/// The switch word mirrors the board's configuration switches; only a few
/// bits matter to the decode (see [`INVERSION_SWITCH_BIT`]). Board number 0
/// marks a copy card, which duplicates a neighbour's data and carries no
/// geometry of its own.
///
/// [`INVERSION_SWITCH_BIT`]: crate::constants::INVERSION_SWITCH_BIT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerBoard {
    number: u16,
    name: String,
    switches: u16,
}

impl TriggerBoard {
    pub fn new(number: u16, name: &str, switches: u16) -> Self {
        Self {
            number,
            name: name.to_string(),
            switches,
        }
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True if this board is a copy card.
    pub fn is_copy(&self) -> bool {
        self.number == 0
    }

    /// State of one configuration switch.
    pub fn switch(&self, bit: u8) -> bool {
        (self.switches >> bit) & 0x1 == 1
    }
}

/// One trigger crate: the boards served by one (link, region) pair, keyed
/// by their slot inside the crate.
#[derive(Debug, Clone, Default)]
pub struct TriggerCrate {
    boards: FxHashMap<u8, TriggerBoard>,
}

impl TriggerCrate {
    /// The board sitting in the given slot, as referenced by a local
    /// struct's id field.
    pub fn board(&self, slot: u8) -> Option<&TriggerBoard> {
        self.boards.get(&slot)
    }

    fn add_board(&mut self, slot: u8, board: TriggerBoard) {
        self.boards.insert(slot, board);
    }
}

/// The static crate/board topology of the trigger system.
///
/// Loaded once before decoding and shared read-only, like the detector map.
/// Rows are
/// `board,<link>,<region>,<slot>,<number>,<name>,<switches>`.
#[derive(Debug, Clone, Default)]
pub struct TriggerCrateStore {
    crates: FxHashMap<(u32, u8), TriggerCrate>,
    by_number: FxHashMap<u16, TriggerBoard>,
}

impl TriggerCrateStore {
    /// Load a topology from a CSV file.
    pub fn from_csv(path: &Path) -> Result<Self, TopologyError> {
        if !path.exists() {
            return Err(TopologyError::BadFilePath(path.to_path_buf()));
        }
        let mut contents = String::new();
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
        Self::parse(&contents)
    }

    /// Parse topology rows from CSV content. The first line is a header and
    /// is skipped.
    pub fn parse(contents: &str) -> Result<Self, TopologyError> {
        let mut store = TriggerCrateStore::default();

        let mut lines = contents.lines();
        lines.next(); // Skip the header
        for line in lines {
            let entries: Vec<&str> = line.split_terminator(",").collect();
            if entries.is_empty() {
                continue;
            }
            if entries[0] != "board" || entries.len() != BOARD_ENTRIES_PER_LINE {
                return Err(TopologyError::BadFileFormat);
            }
            let link: u32 = entries[1].parse()?;
            let region: u8 = entries[2].parse()?;
            let slot: u8 = entries[3].parse()?;
            let number: u16 = entries[4].parse()?;
            let switches: u16 = entries[6].parse()?;
            store.add_board(link, region, slot, TriggerBoard::new(number, entries[5], switches));
        }

        Ok(store)
    }

    /// Register a board in its crate slot.
    ///
    /// Copy cards (number 0) are reachable through their crate but are not
    /// indexed by number; they have no circuit identity.
    pub fn add_board(&mut self, link: u32, region: u8, slot: u8, board: TriggerBoard) {
        if !board.is_copy() {
            self.by_number.insert(board.number(), board.clone());
        }
        self.crates
            .entry((link, region))
            .or_default()
            .add_board(slot, board);
    }

    /// The crate serving the given region of the given data-link.
    pub fn crate_for(&self, link: u32, region: u8) -> Option<&TriggerCrate> {
        self.crates.get(&(link, region))
    }

    /// Look a board up by its circuit number.
    pub fn board_by_number(&self, number: u16) -> Option<&TriggerBoard> {
        self.by_number.get(&number)
    }
}
