//! `svs` – runs a scenario through the spatial filter pipeline.
//!
//! ```text
//! svs <scenario.toml> [--cycles N] [--dump]
//! svs --init-config
//! ```
//!
//! Each cycle applies the scenario's scene edits for that cycle, runs the
//! driver, and prints every command's status and mirrored records.  With
//! relations enabled the atoms that hold at the end are listed too.

mod config;
mod scenario;

use colored::Colorize;
use std::process::ExitCode;
use tracing::info;

use svs_runtime::extract::mirrored_values;
use svs_runtime::{Identifier, Svs, Symbol, WorkingMemory, init_tracing};

use crate::config::Config;
use crate::scenario::Scenario;

struct Args {
    scenario: Option<String>,
    cycles: Option<u32>,
    dump: bool,
    init_config: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        scenario: None,
        cycles: None,
        dump: false,
        init_config: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--cycles" => {
                let n = it.next().ok_or("--cycles needs a value")?;
                args.cycles = Some(n.parse().map_err(|_| format!("bad cycle count '{n}'"))?);
            }
            "--dump" => args.dump = true,
            "--init-config" => args.init_config = true,
            other if other.starts_with("--") => return Err(format!("unknown flag '{other}'")),
            path => args.scenario = Some(path.to_string()),
        }
    }
    Ok(args)
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            eprintln!("  Using default configuration.");
            Config::default()
        }
    };
    init_tracing(cfg.log_format);

    if args.init_config {
        return match config::save(&cfg) {
            Ok(()) => {
                println!(
                    "  {} Config saved to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{}: {}", "Error saving config".red(), e);
                ExitCode::FAILURE
            }
        };
    }

    let Some(path) = args.scenario else {
        print_usage();
        return ExitCode::FAILURE;
    };
    let scenario = match std::fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read {path}: {e}"))
        .and_then(|raw| Scenario::from_toml(&raw))
    {
        Ok(s) => s,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    let cycles = run_length(args.cycles, cfg.cycles, scenario.cycles.len());
    info!(scenario = %path, cycles, relations = cfg.relations, "running scenario");

    match run(&scenario, &cfg, cycles, args.dump) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// An explicit `--cycles` wins; otherwise run at least every scripted cycle.
fn run_length(flag: Option<u32>, configured: u32, scripted: usize) -> u32 {
    flag.unwrap_or_else(|| configured.max(u32::try_from(scripted).unwrap_or(u32::MAX)))
}

fn run(scenario: &Scenario, cfg: &Config, cycles: u32, dump: bool) -> Result<(), String> {
    let mut wm = WorkingMemory::new();
    let mut svs = Svs::new(&mut wm, cfg.svs_config());
    let roots = scenario.install(&mut svs, &mut wm)?;

    for n in 0..cycles as usize {
        for update in scenario.updates_for(n) {
            svs.queue(update.clone());
        }
        svs.cycle(&mut wm);

        println!("{}", format!("── cycle {} ──", svs.time() - 1).bold().cyan());
        for (name, root) in &roots {
            print_command(&wm, name, *root);
        }
    }

    if cfg.relations {
        let atoms = svs.filter_table().all_atoms(&svs.scene().borrow());
        println!("{}", "── relations ──".bold().cyan());
        if atoms.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for atom in atoms {
            println!("  {atom}");
        }
    }

    if dump {
        println!("{}", "── working memory ──".bold().cyan());
        print!("{}", wm.dump(svs.root()));
    }
    Ok(())
}

fn print_command(wm: &WorkingMemory, name: &str, root: Identifier) {
    let status = wm
        .find(root, "status")
        .and_then(Symbol::as_str)
        .unwrap_or("pending");
    let status = if status == "success" {
        status.green()
    } else {
        status.yellow()
    };
    println!("  {} {} [{}]", name.bold(), root.to_string().dimmed(), status);
    for value in mirrored_values(wm, root) {
        println!("    • {value}");
    }
}

fn print_usage() {
    println!();
    println!(
        "  {} {}",
        "svs".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  usage: svs <scenario.toml> [--cycles N] [--dump]");
    println!("         --cycles N  run exactly N cycles (default: every scripted cycle)");
    println!("         svs --init-config");
    println!();
}
