//! Memory transaction simulator CLI.
//!
//! This binary drives the simulator from the command line. It performs:
//! 1. **Run:** Load an ELF into the store, install the reset vector, replay an optional
//!    memory trace, drain outstanding events and report the exit status and statistics.
//! 2. **Devices:** Print the device map a configuration produces.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memsim_core::common::SimTime;
use memsim_core::common::error::SimError;
use memsim_core::config::Config;
use memsim_core::core::{Trace, TraceCore};
use memsim_core::sim::{ExitStatus, Simulator, loader};
use memsim_core::soc::System;

#[derive(Parser, Debug)]
#[command(
    name = "memsim",
    author,
    version,
    about = "Cycle-approximate memory transaction simulator",
    long_about = "Load a RISC-V ELF into a paged store, replay memory traces through the timed memory \
                  and report the finish status.\n\nExamples:\n  memsim run hello.elf\n  memsim run \
                  hello.elf --trace trace.json --debug\n  memsim devices --config soc.json"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a program, replay a trace and report.
    Run {
        /// RISC-V executable to load.
        elf: Option<PathBuf>,

        /// JSON configuration file (defaults are used otherwise).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON memory trace to replay.
        #[arg(short, long)]
        trace: Option<PathBuf>,

        /// Enable per-component debug tracing.
        #[arg(short, long)]
        debug: bool,

        /// Stop draining events at this simulated time, in ns.
        #[arg(long)]
        max_time: Option<u64>,

        /// Statistics sections to print (summary, reads, writes); all when omitted.
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,
    },

    /// List the devices registered on the bus.
    Devices {
        /// JSON configuration file (defaults are used otherwise).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            elf,
            config,
            trace,
            debug,
            max_time,
            stats,
        } => {
            init_tracing(debug);
            load_config(config.as_deref(), debug).and_then(|config| {
                cmd_run(
                    &config,
                    elf.as_deref(),
                    trace.as_deref(),
                    max_time,
                    &stats,
                )
            })
        }
        Commands::Devices { config } => {
            init_tracing(false);
            load_config(config.as_deref(), false).and_then(|config| cmd_devices(&config))
        }
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("\n[!] FATAL: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr subscriber; `RUST_LOG` overrides the default level.
fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, debug: bool) -> Result<Config, SimError> {
    let mut config = match path {
        Some(p) => Config::from_file(p)?,
        None => Config::default(),
    };
    if debug {
        config.general.debug = true;
    }
    tracing::debug!(path = ?path, "configuration loaded");
    Ok(config)
}

/// Runs one simulation and returns the process exit code.
///
/// The code is 0 when the program passed or never wrote a finish code and no trace load
/// mismatched; otherwise it is 1.
fn cmd_run(
    config: &Config,
    elf: Option<&Path>,
    trace: Option<&Path>,
    max_time: Option<u64>,
    sections: &[String],
) -> Result<i32, SimError> {
    let mut sim = Simulator::new(config)?;

    println!(
        "Configuration: {} memory windows, fallback {:?}",
        config.system.memories.len(),
        config.memory.fallback
    );
    println!(
        "  Clock: {} ns  Pages: {} x {} B  Queues: {}  XLEN: {}",
        config.clock.period_ns,
        1u64 << config.memory.page_index_bits,
        1u64 << config.memory.page_bits,
        config.memory.queue_capacity,
        config.general.xlen
    );
    println!();

    let xlen = config.general.xlen;
    let store = &mut sim.system_mut().store;
    let entry = match elf {
        Some(path) => {
            let image = loader::load_elf(path, store, xlen)?;
            println!(
                "[*] Loaded {}: entry {:#x}, {} segments, {} symbols",
                path.display(),
                image.entry,
                image.segments,
                image.symbols.len()
            );
            image.entry
        }
        None => config.system.start_pc,
    };
    loader::install_reset_vector(store, config.system.rom_base, entry, xlen)?;

    let mut mismatches = 0;
    if let Some(path) = trace {
        let mut core = TraceCore::new(Trace::from_file(path)?);
        println!("[*] Replaying {} ({} harts)", path.display(), core.hart_count());
        let report = core.run(&mut sim)?;
        println!(
            "    loads {}  stores {}  mismatches {}  skipped {}",
            report.loads,
            report.stores,
            report.mismatches.len(),
            report.skipped
        );
        mismatches = report.mismatches.len();
    }

    match max_time {
        Some(ns) => sim.run_until(SimTime(ns))?,
        None => sim.run_until_idle()?,
    }

    let system = sim.system_mut();
    let console = system.session.take_console();
    if !console.is_empty() && !config.general.echo_console {
        println!("\n--- console ---");
        print!("{}", String::from_utf8_lossy(&console));
        println!("\n---------------");
    }

    let status = system.exit_status();
    match status {
        Some(ExitStatus::Pass) => println!("\n[*] PASS"),
        Some(ExitStatus::Fail(code)) => println!("\n[*] FAIL (code {code:#x})"),
        None => println!("\n[*] No finish code written"),
    }
    sim.stats().print_sections(sections);

    let failed = matches!(status, Some(ExitStatus::Fail(_))) || mismatches > 0;
    Ok(i32::from(failed))
}

fn cmd_devices(config: &Config) -> Result<i32, SimError> {
    let system = System::new(config)?;
    println!("{:<12} {:>18} {:>18}", "NAME", "BASE", "SIZE");
    for dev in system.list_devices() {
        println!("{:<12} {:>#18x} {:>#18x}", dev.name, dev.base, dev.size);
    }
    println!("fallback: {:?}", system.bus.fallback());
    Ok(0)
}
