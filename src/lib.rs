// src/lib.rs

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::app::{AppCore, AppEvent, AppOptions, AppRuntime, Renderer};
use crate::catalog::{Catalog, LaunchOverrides, SystemFacts};
use crate::cli::{CliArgs, Command};
use crate::config::{EntryKind, load_and_validate, load_optional, resolve_catalog_path};
use crate::exec::{CommandDescriptor, Engine, EngineOptions};

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code: 0 on success, the script's own exit code
/// on failure, 124 on timeout, 130 on cancellation, 127 when the command
/// could not be started.
pub async fn run(args: CliArgs) -> Result<i32> {
    let catalog_path = resolve_catalog_path(args.catalog.as_deref());
    let color = !args.no_color && std::io::stdout().is_terminal();

    match args.command {
        Command::Facts => {
            print_facts(&SystemFacts::detect());
            Ok(0)
        }
        Command::List => {
            let catalog = load_catalog(&catalog_path)?;
            print_entries(&catalog);
            Ok(0)
        }
        Command::Menu => {
            let catalog = load_catalog(&catalog_path)?;
            let engine_options = catalog.engine_options();
            let front_end = FrontEnd {
                catalog: Some(catalog),
                engine_options,
                app_options: AppOptions::default(),
                initial: None,
                interactive: true,
                color,
            };
            front_end.run().await
        }
        Command::Run {
            name,
            env,
            timeout,
            dry_run,
        } => {
            let catalog = load_catalog(&catalog_path)?;
            let overrides = LaunchOverrides { env, timeout };

            if dry_run {
                let descriptor = catalog.descriptor_for(&name, &overrides)?;
                print_dry_run(&descriptor);
                return Ok(0);
            }

            let engine_options = catalog.engine_options();
            let front_end = FrontEnd {
                catalog: Some(catalog),
                engine_options,
                app_options: AppOptions {
                    exit_when_finished: true,
                    ..AppOptions::default()
                },
                initial: Some(AppEvent::Launch { name, overrides }),
                interactive: false,
                color,
            };
            front_end.run().await
        }
        Command::Exec {
            timeout,
            cwd,
            env,
            label,
            command,
        } => {
            // The catalog only contributes engine tuning here.
            let engine_options = load_optional(&catalog_path)?
                .map(|file| EngineOptions::from(&file.engine))
                .unwrap_or_default();

            let facts = SystemFacts::detect();
            let descriptor = exec_descriptor(command, cwd, env, timeout, label, &facts)?;
            let front_end = FrontEnd {
                catalog: None,
                engine_options,
                app_options: AppOptions {
                    exit_when_finished: true,
                    ..AppOptions::default()
                },
                initial: Some(AppEvent::LaunchDescriptor(descriptor)),
                interactive: false,
                color,
            };
            front_end.run().await
        }
    }
}

fn load_catalog(path: &Path) -> Result<Catalog> {
    let file = load_and_validate(path)
        .with_context(|| format!("loading catalog '{}'", path.display()))?;
    Ok(Catalog::new(file, SystemFacts::detect()))
}

fn exec_descriptor(
    command: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    timeout: Option<Duration>,
    label: Option<String>,
    facts: &SystemFacts,
) -> Result<CommandDescriptor> {
    let label = label.unwrap_or_else(|| command.join(" "));
    let mut parts = command.into_iter();
    let program = parts.next().context("missing program to execute")?;

    let mut builder = CommandDescriptor::builder(program)
        .args(parts)
        .envs(facts.env())
        .envs(env)
        .maybe_timeout(timeout)
        .label(label);
    if let Some(dir) = cwd {
        builder = builder.working_dir(dir);
    }
    Ok(builder.build())
}

/// Everything needed to run the front end once.
struct FrontEnd {
    catalog: Option<Catalog>,
    engine_options: EngineOptions,
    app_options: AppOptions,
    initial: Option<AppEvent>,
    interactive: bool,
    color: bool,
}

impl FrontEnd {
    /// Wire together engine, front-end core and runtime, input and Ctrl-C
    /// handling; run until the core asks to exit.
    async fn run(self) -> Result<i32> {
        let (tx, rx) = mpsc::channel::<AppEvent>(64);
        let engine = Engine::new(self.engine_options);

        // Ctrl-C → Interrupt, for as long as the front end listens.
        {
            let tx = tx.clone();
            tokio::spawn(async move {
                loop {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        eprintln!("failed to listen for Ctrl+C: {e}");
                        return;
                    }
                    if tx.send(AppEvent::Interrupt).await.is_err() {
                        return;
                    }
                }
            });
        }

        if self.interactive {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(tokio::io::stdin()).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if tx.send(AppEvent::Input(line)).await.is_err() {
                        return;
                    }
                }
                debug!("stdin closed");
                let _ = tx.send(AppEvent::Shutdown).await;
            });
        }

        if let Some(event) = self.initial {
            tx.send(event)
                .await
                .context("queueing initial front-end event")?;
        }

        let core = AppCore::new(self.catalog, self.app_options);
        let renderer = Renderer::new(std::io::stdout(), self.color);
        let runtime = AppRuntime::new(core, tx, rx, engine, renderer);

        let (outcome, _) = runtime.run().await?;
        info!(?outcome, "front end finished");

        if self.interactive {
            return Ok(0);
        }
        // No outcome means the launch was refused before anything ran.
        Ok(outcome.map_or(1, |outcome| outcome.process_exit_code()))
    }
}

fn print_facts(facts: &SystemFacts) {
    println!("distribution: {}", facts.distro_id.as_deref().unwrap_or("unknown"));
    println!("version:      {}", facts.distro_version.as_deref().unwrap_or("unknown"));
    println!("root:         {}", if facts.is_root { "yes" } else { "no" });
    println!();
    println!("exported environment:");
    for (key, value) in facts.env() {
        println!("  {key}={value}");
    }
}

fn print_entries(catalog: &Catalog) {
    println!("catalog entries ({}):", catalog.entries().count());
    for entry in catalog.entries() {
        println!("  - {} ({})", entry.name, entry.label);
        match &entry.kind {
            EntryKind::Script { program, args, cwd } => {
                println!("      program: {program}");
                if !args.is_empty() {
                    println!("      args: {args:?}");
                }
                if let Some(cwd) = cwd {
                    println!("      cwd: {cwd}");
                }
            }
            EntryKind::Quick { command } => println!("      command: {command}"),
        }
        if let Some(desc) = &entry.description {
            println!("      description: {desc}");
        }
        if let Some(timeout) = entry.timeout {
            println!("      timeout: {}s", timeout.as_secs());
        }
        if entry.requires_root {
            println!("      requires_root: true");
        }
    }
}

/// Simple dry-run output: the resolved descriptor, nothing executed.
fn print_dry_run(descriptor: &CommandDescriptor) {
    println!("scriptvisor dry-run: {}", descriptor.label());
    println!("  command: {descriptor}");
    if let Some(dir) = descriptor.working_dir() {
        println!("  cwd: {}", dir.display());
    }
    match descriptor.timeout() {
        Some(timeout) => println!("  timeout: {}s", timeout.as_secs()),
        None => println!("  timeout: none"),
    }
    println!("  env:");
    for (key, value) in descriptor.environment() {
        println!("    {key}={value}");
    }

    debug!("dry-run complete (no execution)");
}
