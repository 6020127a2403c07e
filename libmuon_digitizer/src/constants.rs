// Raw event framing
pub const EVENT_MAGIC: u32 = 0x4D554F4E; // "MUON" in ASCII
pub const FRAGMENT_KIND_TRACKER: u8 = 0;
pub const FRAGMENT_KIND_TRIGGER: u8 = 1;
pub const MAX_FRAGMENTS_PER_EVENT: u32 = 64;
pub const MAX_FRAGMENT_BYTES: u32 = 4_194_304;
pub const MAX_REGIONS_PER_BLOCK: u8 = 8;
pub const MAX_LOCALS_PER_REGION: u8 = 16;

// Trigger electronics constants
pub const STRIP_PATTERN_BITS: usize = 16;
pub const TRIGGER_CHAMBERS_PER_BOARD: usize = 4;
pub const TRIGGER_CATHODES: usize = 2;
// Trigger chambers are numbered from 10 upward in the detector element
// scheme; the chamber slot in a local struct is relative to that base.
// Hardware numbering convention, taken as-is.
pub const FIRST_TRIGGER_CHAMBER: u8 = 10;
// Boards with this switch set read the non-bending plane with inverted
// strip numbering, shifting the bit-to-strip lookup by a fixed amount.
// Hardware convention, taken as-is.
pub const INVERSION_SWITCH_BIT: u8 = 6;
pub const INVERTED_STRIP_OFFSET: i32 = -8;

// Trigger digits carry a hit flag, not a measured charge
pub const TRIGGER_DIGIT_AMPLITUDE: f32 = 1.0;
