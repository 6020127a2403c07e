//! # muon_digitizer
//!
//! muon_digitizer converts the raw electronics readout of a segmented muon
//! spectrometer into geometry-located digit records for downstream
//! reconstruction. Each raw event carries one fragment per data-link; a
//! fragment holds either the tracker sub-stream (per-channel charge
//! samples) or the trigger sub-stream (darc/regional/local header
//! hierarchy). The digitizer decodes both, translating electronics
//! addresses (link, chip, channel) into detector geometry (detector
//! element, pad x/y, cathode) against a static detector map, and unpacking
//! trigger strip hit patterns into fixed-amplitude trigger digits.
//!
//! ## Installation
//!
//! muon_digitizer is installed from source. To build and install the CLI
//! use `cargo install --path ./muon_digitizer_cli` from the top level
//! repository. The binary will be installed to your cargo install location
//! (typically something like `~/.cargo/bin/`) and can be uninstalled by
//! running `cargo uninstall muon_digitizer_cli`.
//!
//! ## Configuration
//!
//! The CLI is driven by a YAML configuration file:
//!
//! ```yml
//! raw_path: /data/raw
//! mapping_path: /data/maps/detector_map.csv
//! crate_path: /data/maps/trigger_crates.csv
//! output_path: /data/digits
//! make_trigger_digits: true
//! first_run_number: 0
//! last_run_number: 0
//! n_threads: 1
//! ```
//!
//! - `raw_path`: directory containing raw event files in the `run_####.raw`
//!   naming scheme
//! - `mapping_path`: detector mapping CSV (see below)
//! - `crate_path`: trigger crate topology CSV (see below)
//! - `output_path`: directory the per-run digit digests are written to
//! - `make_trigger_digits`: synthesize digits from trigger hit patterns in
//!   addition to the trigger records
//! - First/Last Run Number: the run range (inclusive on both ends)
//! - `n_threads`: number of parallel workers the run range is divided
//!   amongst. Must be at least 1.
//!
//! A template can be generated with the CLI `new` subcommand.
//!
//! ## Detector mapping format
//!
//! The detector map is a CSV file with *no* whitespace. The first line is a
//! header. Rows are tagged by their first column:
//!
//! ```csv
//! link,<link_id>,<det_elem>
//! pad,<det_elem>,<plane>,<chip>,<channel>,<x>,<y>
//! strip,<det_elem>,<plane>,<board>,<strip>,<x>,<y>
//! circuit,<chamber>,<circuit_name>,<det_elem>
//! ```
//!
//! `link` rows connect a data-link to the detector element it reads out.
//! `pad` rows give the tracker pad geometry of one electronics channel;
//! `strip` rows do the same for trigger strips, addressed by board number
//! and strip index. `circuit` rows connect a (chamber, circuit name) pair
//! to a trigger detector element. The plane keyword is `bend` or `nonbend`.
//!
//! The trigger crate topology is a second CSV with rows
//!
//! ```csv
//! board,<link>,<region>,<slot>,<number>,<name>,<switches>
//! ```
//!
//! placing one board in one crate slot. Board number 0 marks a copy card.
//! The switch word is the board's configuration switches as a decimal
//! integer.
//!
//! ## Output
//!
//! For every run the digitizer writes a YAML digest (`run_####.digits.yaml`)
//! to the output directory: per event, the digit records (detector element,
//! chip, channel, cathode, pad indices, amplitude), the trigger record
//! counts, the global trigger response and the number of soft decode
//! warnings. Warnings themselves go to the log; a digit that cannot be
//! placed never aborts a run.
pub mod config;
pub mod constants;
pub mod digit;
pub mod digit_maker;
pub mod electronics;
pub mod error;
pub mod mapping;
pub mod pattern;
pub mod process;
pub mod raw_event;
pub mod store;
pub mod stream;
pub mod topology;
pub mod tracker;
pub mod translator;
pub mod trigger;
pub mod worker_status;
