use anyhow::{bail, Context};
use clap::Parser;
use pnpkit::rpt;
use pnpkit::{
    config_template, init_logging, open_machine_connection, AckSink, CancelToken, DispenseTiming,
    GcodeMachine, Machine, PnPConfig, PostScriptMachine, WriterSink,
};
use pnpkit_calibrate::terminal_jog_config;
use pnpkit_jobs::{bill_of_materials, run_dispense, run_pick_and_place};
use std::io;
use std::path::PathBuf;
use tracing::info;

/// Drive a pick-and-place machine from a KiCad footprint report.
///
/// Without --machine, G-code is written to stdout; diagnostics always go
/// to stderr, so output redirection stays clean.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// KiCad .rpt footprint report of the board
    #[arg(value_name = "RPT_FILE")]
    rpt_file: PathBuf,

    /// Machine configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run the pick-and-place sequence
    #[arg(long)]
    pnp: bool,

    /// Run solder paste dispensing
    #[arg(long)]
    dispense: bool,

    /// Interactively calibrate the board origin (requires --machine)
    #[arg(long, conflicts_with_all = ["pnp", "dispense", "postscript"])]
    calibrate: bool,

    /// Print a bill of materials and exit
    #[arg(long)]
    bom: bool,

    /// Print a configuration template for this board and exit
    #[arg(long)]
    template: bool,

    /// Connect to the machine, e.g. /dev/ttyUSB0 or /dev/ttyACM0,115200
    #[arg(short, long, value_name = "DEV[,BAUD]")]
    machine: Option<String>,

    /// Render a PostScript preview instead of G-code
    #[arg(short, long, conflicts_with = "machine")]
    postscript: bool,

    /// Dispense base time per pad, milliseconds
    #[arg(long, default_value_t = 50.0)]
    init_ms: f32,

    /// Additional dispense time per mm^2 of pad area, milliseconds
    #[arg(long, default_value_t = 25.0)]
    area_ms: f32,
}

fn main() -> anyhow::Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let board = rpt::load_rpt(&cli.rpt_file)?;

    if cli.bom {
        for entry in bill_of_materials(&board) {
            println!(
                "{:4}x {:<24} {}",
                entry.count(),
                entry.key,
                entry.components.join(" ")
            );
        }
        return Ok(());
    }
    if cli.template {
        print!("{}", config_template(&board));
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Some(
            PnPConfig::load(path)
                .with_context(|| format!("Loading configuration {}", path.display()))?,
        ),
        None => None,
    };

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        ctrlc::set_handler(move || cancel.cancel())
            .context("Installing the interrupt handler")?;
    }

    if cli.calibrate {
        return calibrate(&cli, &board, config.as_mut());
    }

    if !cli.pnp && !cli.dispense {
        bail!("Nothing to do; pass --pnp and/or --dispense (or --bom, --template, --calibrate)");
    }

    let timing = DispenseTiming {
        init_ms: cli.init_ms,
        area_ms: cli.area_ms,
    };
    let mut machine: Box<dyn Machine> = if cli.postscript {
        Box::new(PostScriptMachine::new(io::stdout()))
    } else if let Some(descriptor) = &cli.machine {
        let stream = open_machine_connection(descriptor)?;
        Box::new(GcodeMachine::new(AckSink::connect(stream), timing))
    } else {
        Box::new(GcodeMachine::new(WriterSink::new(io::stdout()), timing))
    };

    let comment = format!(
        "pnpkit --init-ms {:.1} --area-ms {:.1} {}",
        cli.init_ms,
        cli.area_ms,
        cli.rpt_file.display()
    );
    machine.init(config.as_ref(), &comment, board.dimension())?;

    // Paste first, then components on top of it.
    if cli.dispense {
        let stats = run_dispense(&board, machine.as_mut(), &cancel, timing)?;
        info!(
            "Dispensed {} of {} pads ({:.0}ms + {:.0}ms/mm^2); total dispense time {:.1}s",
            stats.pads_dispensed,
            stats.pads_total,
            cli.init_ms,
            cli.area_ms,
            stats.estimated_ms / 1000.0
        );
    }
    if cli.pnp {
        let empty = PnPConfig::default();
        let run_config = config.as_ref().unwrap_or(&empty);
        let stats = run_pick_and_place(&board, run_config, machine.as_mut(), &cancel)?;
        info!("Placed {} parts, skipped {}", stats.placed, stats.skipped);
    }
    machine.finish()?;

    if cancel.is_cancelled() {
        info!("Run cancelled by operator; machine shut down safely");
    }
    Ok(())
}

fn calibrate(cli: &Cli, board: &pnpkit::Board, config: Option<&mut PnPConfig>) -> anyhow::Result<()> {
    let descriptor = cli
        .machine
        .as_deref()
        .context("--calibrate needs a live machine connection (--machine)")?;
    let config = config.context("--calibrate needs a configuration to refine (--config)")?;

    let stream = open_machine_connection(descriptor)?;
    let mut link = AckSink::connect(stream);
    if terminal_jog_config(board, &mut link, config)? {
        // Print the calibrated section for the operator to paste into the
        // configuration file.
        println!("[board]");
        println!(
            "origin = [{:.3}, {:.3}]",
            config.board.origin.x, config.board.origin.y
        );
        println!("top = {:.3}", config.board.top);
        info!("Calibration complete");
    } else {
        info!("Calibration aborted");
    }
    Ok(())
}
