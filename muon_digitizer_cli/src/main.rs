use clap::{Arg, Command};
use indicatif::{MultiProgress, ProgressBar};
use indicatif_log_bridge::LogWrapper;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;

use libmuon_digitizer::config::Config;
use libmuon_digitizer::process::{create_subsets, load_services, process_subset};

fn make_template_config(path: &Path) {
    let config = Config::default();
    let yaml_str = serde_yaml::to_string(&config).unwrap();
    let mut file = File::create(path).expect("Could not create template config file!");
    file.write_all(yaml_str.as_bytes())
        .expect("Failed to write yaml data to file!");
}

fn main() {
    // Create a cli
    let matches = Command::new("muon_digitizer_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the file"),
        )
        .get_matches();

    // Initialize feedback
    let logger = simplelog::TermLogger::new(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );

    let pb_manager = MultiProgress::new();

    LogWrapper::new(pb_manager.clone(), logger)
        .try_init()
        .expect("Could not create logging/progress!");

    // Parse the cli
    let config_path = PathBuf::from(matches.get_one::<String>("path").expect("We require args"));

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );

        make_template_config(&config_path);
        log::info!("Done.");
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match Config::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    log::info!("Config successfully loaded.");
    log::info!("Raw Path: {}", config.raw_path.to_string_lossy());
    log::info!("Mapping Path: {}", config.mapping_path.to_string_lossy());
    log::info!("Crate Path: {}", config.crate_path.to_string_lossy());
    log::info!("Output Path: {}", config.output_path.to_string_lossy());
    log::info!(
        "First Run: {} Last Run: {}",
        config.first_run_number,
        config.last_run_number
    );
    log::info!("Make Trigger Digits: {}", config.make_trigger_digits);

    if !config.is_n_threads_valid() {
        log::error!("Number of threads must be at least 1!");
        return;
    }

    // The mapping services are read-only; load them once and share them
    // across all workers
    let (map, crates) = match load_services(&config) {
        Ok(services) => services,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };

    let subsets = create_subsets(&config);
    let (tx, rx) = channel();
    let mut handles = Vec::new();
    let mut bars: HashMap<usize, ProgressBar> = HashMap::new();

    for (worker_id, subset) in subsets.into_iter().enumerate() {
        // Only spawn workers that have something to do
        if subset.is_empty() {
            continue;
        }
        bars.insert(worker_id, pb_manager.add(ProgressBar::new(100)));

        let worker_config = config.clone();
        let worker_map = map.clone();
        let worker_crates = crates.clone();
        let worker_tx = tx.clone();
        handles.push(std::thread::spawn(move || {
            process_subset(
                worker_config,
                worker_map,
                worker_crates,
                worker_tx,
                worker_id,
                subset,
            )
        }));
    }
    drop(tx);

    // Drain status messages until every worker hangs up its sender
    while let Ok(status) = rx.recv() {
        if let Some(pb) = bars.get(&status.worker_id) {
            pb.set_position((status.progress * 100.0) as u64);
        }
    }

    for handle in handles {
        match handle.join() {
            Ok(Ok(())) => (),
            Ok(Err(e)) => log::error!("Digitizing failed with error: {e}"),
            Err(_) => log::error!("Failed to join a digitizer worker!"),
        }
    }

    for pb in bars.values() {
        pb.finish();
    }

    log::info!("Done.");
}
