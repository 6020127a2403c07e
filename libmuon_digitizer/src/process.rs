use std::sync::mpsc::Sender;
use std::sync::Arc;

use serde::Serialize;

use super::config::Config;
use super::digit::Digit;
use super::digit_maker::DigitMaker;
use super::error::ProcessorError;
use super::mapping::DetectorMap;
use super::raw_event::RawFile;
use super::store::{DigitStore, TriggerStore};
use super::topology::TriggerCrateStore;
use super::worker_status::WorkerStatus;

/// Per-event entry of the run digest.
#[derive(Debug, Clone, Serialize)]
pub struct EventDigest {
    pub event_id: u32,
    pub tracker_digits: usize,
    pub trigger_digits: usize,
    pub local_triggers: usize,
    pub global_response: Option<u32>,
    pub warnings: usize,
    pub digits: Vec<Digit>,
}

/// Everything the digitizer produced for one run, serialized to YAML next
/// to the raw data.
#[derive(Debug, Clone, Serialize)]
pub struct RunDigest {
    pub run_number: i32,
    pub events: Vec<EventDigest>,
}

/// Load the mapping and topology services named by the config.
///
/// Loaded once and shared; the decoders only ever read them, so one copy
/// serves any number of concurrent workers.
pub fn load_services(
    config: &Config,
) -> Result<(Arc<DetectorMap>, Arc<TriggerCrateStore>), ProcessorError> {
    let map = DetectorMap::from_csv(&config.mapping_path)?;
    let crates = TriggerCrateStore::from_csv(&config.crate_path)?;
    Ok((Arc::new(map), Arc::new(crates)))
}

/// The main loop of the digitizer.
///
/// Decodes every event of one run file into fresh stores, logs the soft
/// failures, and writes the run digest.
pub fn process_run(
    config: &Config,
    map: Arc<DetectorMap>,
    crates: Arc<TriggerCrateStore>,
    run_number: i32,
    tx: &Sender<WorkerStatus>,
    worker_id: &usize,
) -> Result<(), ProcessorError> {
    let raw_path = config.get_raw_file_name(run_number);
    let mut raw_file = RawFile::open(&raw_path)?;
    let total_size = raw_file.size_bytes();
    log::info!(
        "Total run size: {}",
        human_bytes::human_bytes(total_size as f64)
    );

    let mut maker = DigitMaker::new(map, crates);
    maker.set_make_trigger_digits(config.make_trigger_digits);

    let mut digits = DigitStore::new();
    let mut triggers = TriggerStore::new();
    let mut digest = RunDigest {
        run_number,
        events: Vec::new(),
    };

    tx.send(WorkerStatus::new(0.0, run_number, *worker_id))?;
    while let Some(event) = raw_file.next_event()? {
        let report = maker.digitize(&event, Some(&mut digits), Some(&mut triggers))?;
        for warning in &report.warnings {
            log::warn!("Run {run_number} event {}: {warning}", event.event_id);
        }

        digest.events.push(EventDigest {
            event_id: event.event_id,
            tracker_digits: report.tracker_digits,
            trigger_digits: report.trigger_digits,
            local_triggers: triggers.locals().len(),
            global_response: triggers.global().map(|global| global.response()),
            warnings: report.warnings.len(),
            digits: digits.sorted(),
        });

        if total_size > 0 {
            let progress = raw_file.position()? as f32 / total_size as f32;
            tx.send(WorkerStatus::new(progress, run_number, *worker_id))?;
        }
    }

    let digest_path = config.get_digest_file_name(run_number)?;
    let yaml_str = serde_yaml::to_string(&digest)?;
    std::fs::write(&digest_path, yaml_str)?;
    log::info!(
        "Wrote digest for {} events to {}",
        digest.events.len(),
        digest_path.to_string_lossy()
    );

    tx.send(WorkerStatus::new(1.0, run_number, *worker_id))?;
    Ok(())
}

/// The function to be called by a separate thread (typically the UI).
/// Loads the services itself and processes the full run range with one
/// worker.
pub fn process(
    config: Config,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
) -> Result<(), ProcessorError> {
    let (map, crates) = load_services(&config)?;
    for run in config.first_run_number..(config.last_run_number + 1) {
        if config.does_run_exist(run) {
            log::info!("Processing run {}...", run);
            process_run(&config, map.clone(), crates.clone(), run, &tx, &worker_id)?;
            log::info!("Finished processing run {}.", run);
        } else {
            log::info!("Run {} does not exist, skipping...", run);
        }
    }
    Ok(())
}

/// Process a subset of runs against already loaded services
pub fn process_subset(
    config: Config,
    map: Arc<DetectorMap>,
    crates: Arc<TriggerCrateStore>,
    tx: Sender<WorkerStatus>,
    worker_id: usize,
    subset: Vec<i32>,
) -> Result<(), ProcessorError> {
    for run in subset {
        if config.does_run_exist(run) {
            log::info!("Processing run {}...", run);
            process_run(&config, map.clone(), crates.clone(), run, &tx, &worker_id)?;
            log::info!("Finished processing run {}.", run);
        } else {
            log::info!("Run {} does not exist, skipping...", run);
        }
    }
    Ok(())
}

/// Divide a run range in to a set of subranges (per thread/worker)
pub fn create_subsets(config: &Config) -> Vec<Vec<i32>> {
    let mut subsets: Vec<Vec<i32>> = vec![Vec::new(); config.n_threads as usize];
    let n_subsets = subsets.len();

    for (idx, run) in (config.first_run_number..(config.last_run_number + 1)).enumerate() {
        subsets[idx % n_subsets].push(run)
    }

    subsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_subsets_round_robin() {
        let config = Config {
            first_run_number: 1,
            last_run_number: 5,
            n_threads: 2,
            ..Default::default()
        };
        let subsets = create_subsets(&config);
        assert_eq!(subsets.len(), 2);
        assert_eq!(subsets[0], vec![1, 3, 5]);
        assert_eq!(subsets[1], vec![2, 4]);
    }
}
