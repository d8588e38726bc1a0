// src/app/core.rs

//! Pure front-end state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`AppEvent`]s and produces:
//! - an updated view stack
//! - a list of [`AppCommand`]s describing what the IO shell should do next
//!
//! The async shell (`app::runtime::AppRuntime`) is responsible for reading
//! events from channels, calling the executor and writing to the terminal.
//! The core has no channels, no Tokio types, and performs no IO.

use std::collections::VecDeque;

use tracing::debug;

use crate::app::render::Tone;
use crate::app::{AppEvent, AppOptions};
use crate::catalog::{Catalog, LaunchOverrides};
use crate::exec::{CommandDescriptor, ExecutionEvent, LineEvent, Outcome};

/// One selectable catalog entry as shown in the menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub index: usize,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
}

/// An execution in flight.
#[derive(Debug, Clone)]
pub struct RunningView {
    /// `None` until the executor confirmed the launch.
    pub exec_id: Option<u64>,
    pub label: String,
    /// Most recent lines, bounded by `AppOptions::history_limit`.
    pub history: VecDeque<LineEvent>,
    pub line_count: usize,
    pub cancel_requested: bool,
}

#[derive(Debug, Clone)]
pub struct FinishedView {
    pub label: String,
    pub outcome: Outcome,
    pub line_count: usize,
}

/// Screens. Exactly one is current: the top of the navigation stack.
#[derive(Debug, Clone)]
pub enum View {
    Menu,
    Running(RunningView),
    Finished(FinishedView),
}

/// Something the renderer should draw.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOp {
    Menu(Vec<MenuItem>),
    Started { label: String, command: String },
    Line(LineEvent),
    Finished { label: String, outcome: Outcome },
    Notice { tone: Tone, text: String },
}

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum AppCommand {
    Execute(CommandDescriptor),
    CancelActive,
    Render(RenderOp),
    Exit,
}

/// Decision returned by the core after handling a single `AppEvent`.
#[derive(Debug, Clone)]
pub struct AppStep {
    pub commands: Vec<AppCommand>,
    pub keep_running: bool,
}

impl AppStep {
    fn cont(commands: Vec<AppCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn exit(mut commands: Vec<AppCommand>) -> Self {
        commands.push(AppCommand::Exit);
        Self {
            commands,
            keep_running: false,
        }
    }
}

fn notice(tone: Tone, text: impl Into<String>) -> AppCommand {
    AppCommand::Render(RenderOp::Notice {
        tone,
        text: text.into(),
    })
}

/// Pure front-end state.
#[derive(Debug)]
pub struct AppCore {
    catalog: Option<Catalog>,
    /// Never empty; the bottom is always `View::Menu`.
    stack: Vec<View>,
    options: AppOptions,
    exit_after_finish: bool,
    last_outcome: Option<Outcome>,
}

impl AppCore {
    pub fn new(catalog: Option<Catalog>, options: AppOptions) -> Self {
        Self {
            catalog,
            stack: vec![View::Menu],
            options,
            exit_after_finish: false,
            last_outcome: None,
        }
    }

    pub fn current_view(&self) -> &View {
        // The stack always holds the menu at the bottom.
        self.stack.last().unwrap_or(&View::Menu)
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_running(&self) -> bool {
        matches!(self.current_view(), View::Running(_))
    }

    /// Outcome of the most recent execution, if any finished.
    pub fn last_outcome(&self) -> Option<&Outcome> {
        self.last_outcome.as_ref()
    }

    /// Commands to run before the first event (draw the menu).
    pub fn start(&self) -> AppStep {
        if self.options.exit_when_finished {
            return AppStep::cont(Vec::new());
        }
        AppStep::cont(vec![self.render_menu()])
    }

    /// Handle a single event, updating state and returning the resulting
    /// commands for the IO shell.
    pub fn step(&mut self, event: AppEvent) -> AppStep {
        match event {
            AppEvent::Launch { name, overrides } => self.handle_launch(&name, &overrides),
            AppEvent::LaunchDescriptor(descriptor) => self.handle_launch_descriptor(descriptor),
            AppEvent::Started { exec_id } => self.handle_started(exec_id),
            AppEvent::Rejected { reason } => self.handle_rejected(reason),
            AppEvent::Execution { exec_id, event } => self.handle_execution(exec_id, event),
            AppEvent::Input(line) => self.handle_input(line.trim()),
            AppEvent::Interrupt => self.handle_interrupt(),
            AppEvent::Shutdown => self.handle_shutdown(),
        }
    }

    fn menu_items(&self) -> Vec<MenuItem> {
        let Some(catalog) = &self.catalog else {
            return Vec::new();
        };
        catalog
            .entries()
            .enumerate()
            .map(|(i, entry)| MenuItem {
                index: i + 1,
                name: entry.name.clone(),
                label: entry.label.clone(),
                description: entry.description.clone(),
            })
            .collect()
    }

    fn render_menu(&self) -> AppCommand {
        AppCommand::Render(RenderOp::Menu(self.menu_items()))
    }

    /// Launch failures before any process exists: report, and stop when
    /// running a single command.
    fn refuse(&self, text: String) -> AppStep {
        let commands = vec![notice(Tone::Error, text)];
        if self.options.exit_when_finished {
            AppStep::exit(commands)
        } else {
            AppStep::cont(commands)
        }
    }

    fn handle_launch(&mut self, name: &str, overrides: &LaunchOverrides) -> AppStep {
        if let View::Running(running) = self.current_view() {
            return AppStep::cont(vec![notice(
                Tone::Warning,
                format!(
                    "'{}' is still running; wait for it or cancel it first",
                    running.label
                ),
            )]);
        }

        let Some(catalog) = &self.catalog else {
            return self.refuse("no catalog loaded".to_string());
        };

        match catalog.descriptor_for(name, overrides) {
            Ok(descriptor) => self.begin(descriptor),
            Err(e) => self.refuse(e.to_string()),
        }
    }

    fn handle_launch_descriptor(&mut self, descriptor: CommandDescriptor) -> AppStep {
        if self.is_running() {
            return AppStep::cont(vec![notice(
                Tone::Warning,
                "an execution is already running",
            )]);
        }
        self.begin(descriptor)
    }

    fn begin(&mut self, descriptor: CommandDescriptor) -> AppStep {
        // A finished screen is replaced rather than stacked.
        if matches!(self.current_view(), View::Finished(_)) {
            self.stack.pop();
        }

        let label = descriptor.label().to_string();
        self.stack.push(View::Running(RunningView {
            exec_id: None,
            label: label.clone(),
            history: VecDeque::new(),
            line_count: 0,
            cancel_requested: false,
        }));

        AppStep::cont(vec![
            AppCommand::Render(RenderOp::Started {
                label,
                command: descriptor.to_string(),
            }),
            AppCommand::Execute(descriptor),
        ])
    }

    fn handle_started(&mut self, exec_id: u64) -> AppStep {
        if let Some(View::Running(running)) = self.stack.last_mut() {
            if running.exec_id.is_none() {
                running.exec_id = Some(exec_id);
            }
        }
        AppStep::cont(Vec::new())
    }

    fn handle_rejected(&mut self, reason: String) -> AppStep {
        if self.is_running() {
            self.stack.pop();
        }
        self.refuse(reason)
    }

    fn handle_execution(&mut self, exec_id: u64, event: ExecutionEvent) -> AppStep {
        let history_limit = self.options.history_limit;
        let Some(View::Running(running)) = self.stack.last_mut() else {
            debug!(exec_id, "execution event with no running view; ignoring");
            return AppStep::cont(Vec::new());
        };
        if running.exec_id != Some(exec_id) {
            debug!(exec_id, current = ?running.exec_id, "stale execution event; ignoring");
            return AppStep::cont(Vec::new());
        }

        match event {
            ExecutionEvent::Line(line) => {
                running.line_count += 1;
                if history_limit > 0 {
                    if running.history.len() == history_limit {
                        running.history.pop_front();
                    }
                    running.history.push_back(line.clone());
                }
                AppStep::cont(vec![AppCommand::Render(RenderOp::Line(line))])
            }
            ExecutionEvent::Finished(outcome) => {
                let label = running.label.clone();
                let line_count = running.line_count;
                self.stack.pop();
                self.stack.push(View::Finished(FinishedView {
                    label: label.clone(),
                    outcome: outcome.clone(),
                    line_count,
                }));
                self.last_outcome = Some(outcome.clone());

                let commands = vec![AppCommand::Render(RenderOp::Finished { label, outcome })];
                if self.options.exit_when_finished || self.exit_after_finish {
                    AppStep::exit(commands)
                } else {
                    let mut commands = commands;
                    commands.push(notice(Tone::Neutral, "press Enter to return to the menu"));
                    AppStep::cont(commands)
                }
            }
        }
    }

    fn handle_input(&mut self, input: &str) -> AppStep {
        match self.current_view() {
            View::Menu => self.menu_input(input),
            View::Running(_) => match input {
                "c" | "cancel" => self.handle_interrupt(),
                _ => AppStep::cont(vec![notice(
                    Tone::Neutral,
                    "running; type 'c' or press Ctrl-C to cancel",
                )]),
            },
            View::Finished(_) => {
                if matches!(input, "q" | "quit") {
                    return AppStep::exit(Vec::new());
                }
                self.stack.pop();
                AppStep::cont(vec![self.render_menu()])
            }
        }
    }

    fn menu_input(&mut self, input: &str) -> AppStep {
        match input {
            "q" | "quit" => AppStep::exit(Vec::new()),
            "" => AppStep::cont(vec![self.render_menu()]),
            _ => {
                let items = self.menu_items();
                let selected = match input.parse::<usize>() {
                    Ok(n) => items.iter().find(|item| item.index == n),
                    Err(_) => items.iter().find(|item| item.name == input),
                };
                match selected {
                    Some(item) => {
                        let name = item.name.clone();
                        self.handle_launch(&name, &LaunchOverrides::default())
                    }
                    None => AppStep::cont(vec![notice(
                        Tone::Error,
                        format!("unknown selection '{input}'"),
                    )]),
                }
            }
        }
    }

    fn handle_interrupt(&mut self) -> AppStep {
        match self.stack.last_mut() {
            Some(View::Running(running)) if !running.cancel_requested => {
                running.cancel_requested = true;
                AppStep::cont(vec![
                    AppCommand::CancelActive,
                    notice(Tone::Warning, format!("cancelling '{}'...", running.label)),
                ])
            }
            Some(View::Running(_)) => AppStep::cont(vec![notice(
                Tone::Neutral,
                "cancellation already requested; waiting for the process to exit",
            )]),
            _ => AppStep::exit(Vec::new()),
        }
    }

    fn handle_shutdown(&mut self) -> AppStep {
        if !self.is_running() {
            return AppStep::exit(Vec::new());
        }
        self.exit_after_finish = true;
        let mut step = self.handle_interrupt();
        step.keep_running = true;
        step
    }
}
