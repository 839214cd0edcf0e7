//! Process a KMZ network document into template-shaped CSV files
//!
//! Loads the document, prints its summary, then runs every pipeline that has
//! a template and writes `processed_homepass.csv` / `processed_pole.csv`.
//!
//! Usage:
//!   cargo run --release --bin kmz_process -- --kmz network.kmz --hp-template homepass.csv
//!   cargo run --release --bin kmz_process -- --kmz network.kmz --pole-template pole.csv \
//!       --mapping mapping.json --output-dir out

use kmz_oxide::config::PipelineConfig;
use kmz_oxide::mapping::{FieldMapping, FieldSource, MappingFile};
use kmz_oxide::pipeline::{OutputKind, Session};
use kmz_oxide::spatial::UnmatchedPolicy;
use kmz_oxide::tabular::TabularMode;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

struct ProcessConfig {
    kmz: Option<PathBuf>,
    hp_template: Option<PathBuf>,
    pole_template: Option<PathBuf>,
    mapping: Option<PathBuf>,
    shortcuts: bool,
    output_dir: PathBuf,
    strict_csv: bool,
    unassigned_bucket: bool,
    require_core_columns: bool,
    verbose: bool,
}

impl ProcessConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut config = Self {
            kmz: None,
            hp_template: None,
            pole_template: None,
            mapping: None,
            shortcuts: false,
            output_dir: PathBuf::from("."),
            strict_csv: false,
            unassigned_bucket: false,
            require_core_columns: false,
            verbose: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--kmz" => {
                    i += 1;
                    config.kmz = args.get(i).map(PathBuf::from);
                },
                "--hp-template" => {
                    i += 1;
                    config.hp_template = args.get(i).map(PathBuf::from);
                },
                "--pole-template" => {
                    i += 1;
                    config.pole_template = args.get(i).map(PathBuf::from);
                },
                "--mapping" => {
                    i += 1;
                    config.mapping = args.get(i).map(PathBuf::from);
                },
                "--output-dir" => {
                    i += 1;
                    if i < args.len() {
                        config.output_dir = PathBuf::from(&args[i]);
                    }
                },
                "--shortcuts" => config.shortcuts = true,
                "--strict-csv" => config.strict_csv = true,
                "--unassigned-bucket" => config.unassigned_bucket = true,
                "--require-core-columns" => config.require_core_columns = true,
                "--verbose" | "-v" => config.verbose = true,
                other => eprintln!("Ignoring unknown argument: {}", other),
            }
            i += 1;
        }

        config
    }

    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new().with_require_core_columns(self.require_core_columns);
        if self.strict_csv {
            config = config.with_tabular_mode(TabularMode::Strict);
        }
        if self.unassigned_bucket {
            config = config.with_unmatched(UnmatchedPolicy::Unassigned);
        }
        config
    }
}

fn sources(mapping_file: &MappingFile, kind: OutputKind) -> &BTreeMap<String, FieldSource> {
    match kind {
        OutputKind::Subscriber => &mapping_file.subscriber,
        OutputKind::Pole => &mapping_file.pole,
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn run_pipeline(
    session: &mut Session,
    kind: OutputKind,
    template_path: &Path,
    mapping_file: &MappingFile,
    config: &ProcessConfig,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let bytes = fs::read(template_path)?;
    let template = session.load_template(kind, &file_name(template_path), &bytes)?;

    let mut mapping = FieldMapping::for_schema(&template);
    if config.shortcuts {
        let applied = match kind {
            OutputKind::Subscriber => mapping.apply_subscriber_shortcuts(),
            OutputKind::Pole => mapping.apply_pole_shortcuts(),
        };
        log::debug!("Applied {} {} shortcuts", applied, kind);
    }
    for (header, source) in sources(mapping_file, kind) {
        mapping.set(header, source.clone())?;
    }

    let output = session.process(kind, &mapping)?;
    if config.verbose {
        println!("  {} rows for {}", output.rows().len(), kind);
    }

    let (name, text) = session.export(kind)?;
    let path = config.output_dir.join(name);
    fs::write(&path, text)?;
    Ok(path)
}

fn main() {
    let config = ProcessConfig::from_args();

    let level = if config.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let Some(kmz_path) = config.kmz.clone() else {
        eprintln!("Usage: kmz_process --kmz <file> [--hp-template <csv>] [--pole-template <csv>]");
        eprintln!("       [--mapping <json>] [--shortcuts] [--output-dir <dir>] [--strict-csv]");
        eprintln!("       [--unassigned-bucket] [--require-core-columns] [-v]");
        std::process::exit(2);
    };

    let mapping_file = match &config.mapping {
        Some(path) => match MappingFile::load(path) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("Failed to read mapping {}: {}", path.display(), e);
                std::process::exit(1);
            },
        },
        None => MappingFile::default(),
    };

    if let Err(e) = fs::create_dir_all(&config.output_dir) {
        eprintln!("Failed to create output directory: {}", e);
        std::process::exit(1);
    }

    let mut session = Session::new(config.pipeline_config());
    let bytes = match fs::read(&kmz_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read {}: {}", kmz_path.display(), e);
            std::process::exit(1);
        },
    };
    let run = match session.load_document(&file_name(&kmz_path), &bytes) {
        Ok(run) => run,
        Err(e) => {
            eprintln!("Failed to load {}: {}", kmz_path.display(), e);
            std::process::exit(1);
        },
    };

    let summary = run.summary();
    println!("KMZ Processor");
    println!("=============");
    println!("Document: {}", kmz_path.display());
    println!("Subscribers: {}", summary.subscribers);
    println!("Poles: {}", summary.poles);
    println!("Boundary regions: {}", summary.boundary_regions);
    println!("Distribution points: {}", summary.distribution_points);
    println!();

    let jobs = [
        (OutputKind::Subscriber, config.hp_template.clone()),
        (OutputKind::Pole, config.pole_template.clone()),
    ];

    let mut error_count = 0;
    for (kind, template) in jobs {
        let Some(template) = template else {
            continue;
        };
        match run_pipeline(&mut session, kind, &template, &mapping_file, &config) {
            Ok(path) => println!("✓ {} output written to {}", kind, path.display()),
            Err(e) => {
                println!("✗ {} pipeline failed: {}", kind, e);
                error_count += 1;
            },
        }
    }

    if error_count > 0 {
        std::process::exit(1);
    }
}
