//! Dropview - headless drop zone
//!
//! Collects the given files into a bundle, loads the glTF entry among them,
//! runs the settle window on the headless backend and prints what the viewer
//! would show.
//!
//! Usage:
//!   dropview [--config <file.json>] <files or directories...>

use std::path::PathBuf;
use std::time::{Duration, Instant};

use dropview::assets::{AssetBundle, MetadataSlot};
use dropview::core::{logging, Error, Result, ViewerConfig};
use dropview::render::HeadlessBackend;
use dropview::viewer::{TickDecision, Viewer};

const VIEWPORT: (u32, u32) = (1280, 720);

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let config_path = parse_str_arg(&args, "--config");
    let inputs = parse_inputs(&args);
    if inputs.is_empty() {
        eprintln!("Usage: dropview [--config <file.json>] <files or directories...>");
        std::process::exit(2);
    }

    if let Err(e) = run(config_path, &inputs) {
        log::error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

fn run(config_path: Option<String>, inputs: &[PathBuf]) -> Result<()> {
    let config = match config_path {
        Some(path) => ViewerConfig::from_json_file(path)?,
        None => ViewerConfig::default(),
    };

    let mut bundle = AssetBundle::new();
    for input in inputs {
        let count = bundle.add_path(input)?;
        log::info!("Collected {} files from {}", count, input.display());
    }
    if bundle.is_empty() {
        return Err(Error::Load("No files were dropped.".to_string()));
    }

    let settle = config.settle_window();
    let mut viewer = Viewer::new(HeadlessBackend::new(), config, VIEWPORT.0, VIEWPORT.1);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let loaded = runtime.block_on(viewer.load_bundle(&bundle))?;
    for warning in &loaded.warnings {
        eprintln!("{}", warning.user_message());
    }

    // Synthetic 60 Hz display until the scheduler settles
    let frame = Duration::from_micros(16_667);
    let start = Instant::now();
    let mut now = start;
    loop {
        now += frame;
        let decision = viewer.tick(now);
        if decision == TickDecision::FinalRender || now - start > settle + frame * 2 {
            break;
        }
    }

    let framing = loaded.framing;
    println!("=== Dropview ===");
    println!("Files:   {}", bundle.len());
    println!("Center:  {:.3?}", framing.bounds.center);
    println!("Size:    {:.3}", framing.bounds.size);
    println!("Camera:  {:.3?} -> {:.3?}", framing.camera_position, framing.target);
    println!("Clip:    near {:.4}, far {:.1}", framing.near, framing.far);
    println!("Scene:   {}", loaded.stats);
    if loaded.detail_objects > 0 {
        println!(
            "LOD:     {} detail objects, level {:?}",
            loaded.detail_objects,
            viewer.lod().selected_level()
        );
    }
    if let MetadataSlot::Ready(metadata) = viewer.metadata() {
        println!("Metadata: {} objects", metadata.len());
    }
    let stats = viewer.frame_stats();
    println!("Frames:  {} ticks, {} rendered", stats.frame_count, stats.rendered_frames);
    Ok(())
}

/// Value following `flag`, if any.
fn parse_str_arg(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Positional arguments: everything except the program name and flags with
/// their values.
fn parse_inputs(args: &[String]) -> Vec<PathBuf> {
    let mut inputs = Vec::new();
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            iter.next();
        } else {
            inputs.push(PathBuf::from(arg));
        }
    }
    inputs
}
