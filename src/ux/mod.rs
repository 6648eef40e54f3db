use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::classify::Detection;
use crate::draft::{ActiveProject, ProjectDraft};
use crate::flow::PreviewTarget;
use crate::simulate::ticker::{Outcome, TickerHandle};
use crate::simulate::{GenerationRun, STEP_LABELS};
use crate::wire::{LogEvent, LogLevel, Project, Run, RunStatus};

pub fn show_detection(d: &Detection) {
    println!("{}  {}", "Language:".bold(), d.language.to_string().cyan());
    println!("{}  {}", "App type:".bold(), d.app_type.to_string().cyan());
}

pub fn show_redirect() {
    println!(
        "{} no project has been described yet; start with {}",
        "→".yellow().bold(),
        "prompt2product describe".bold()
    );
}

pub fn show_submitted(draft: &ProjectDraft, active: ActiveProject) {
    println!(
        "\n{} project {} (run {})  {} · {}",
        "✔".green().bold(),
        active.project_id.to_string().bold(),
        active.run_id,
        draft.language.to_string().cyan(),
        draft.app_type.to_string().cyan()
    );
}

pub fn show_summary(draft: &ProjectDraft, active: ActiveProject) {
    println!(
        "\n{}",
        "┏━━━━━━━━━━━━━━━━━━━━━━━━ Project ━━━━━━━━━━━━━━━━━━━━━━━━━┓".bold()
    );
    println!("  {}: {}   {}: {}", "Project".bold(), active.project_id, "Run".bold(), active.run_id);
    println!(
        "  {}: {}   {}: {}",
        "Language".bold(),
        draft.language.to_string().cyan(),
        "App type".bold(),
        draft.app_type.to_string().cyan()
    );
    println!("{}", "┗━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━┛".bold());
    println!("{}", indent(draft.description.trim(), 2));
    if !draft.additional_instructions.trim().is_empty() {
        println!("\n{}\n{}", "Additional instructions:".bold(), indent(draft.additional_instructions.trim(), 2));
    }
    println!();
}

pub fn show_download(file_name: &str, active: ActiveProject) {
    println!("{} {}", "Mock download:".bold(), file_name.green());
    println!("  project {} · run {} (no archive is written in mock mode)", active.project_id, active.run_id);
}

pub fn show_preview(target: &PreviewTarget) {
    println!(
        "{} run {} would be served at {}",
        "Mock preview:".bold(),
        target.run_id,
        target.url.underline()
    );
}

fn stepper(step: u8) -> String {
    STEP_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let n = (i + 1) as u8;
            if n < step {
                format!("{} {}", "✔".green(), label.dimmed())
            } else if n == step {
                format!("{} {}", format!("[{n}]").cyan().bold(), label.bold())
            } else {
                format!("[{n}] {}", label.dimmed())
            }
        })
        .collect::<Vec<_>>()
        .join("  ─  ")
}

fn bar(run: &GenerationRun) -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::with_template("{prefix}\n{bar:40.cyan/blue} {pos:>3}%")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉░");
    pb.set_style(style);
    pb.set_prefix(stepper(run.step_index));
    pb.set_position(run.progress() as u64);
    pb
}

/// Set while a run is on screen; Ctrl-C then cancels the run instead of exiting.
static WATCHING: AtomicBool = AtomicBool::new(false);

struct Watching;

impl Watching {
    fn enter() -> Self {
        WATCHING.store(true, Ordering::SeqCst);
        Watching
    }
}

impl Drop for Watching {
    fn drop(&mut self) {
        WATCHING.store(false, Ordering::SeqCst);
    }
}

fn interrupt_exits() -> bool {
    !WATCHING.load(Ordering::SeqCst)
}

/// Once tokio owns SIGINT the default handler is gone, so Ctrl-C outside a
/// run has to exit explicitly.
pub fn exit_on_interrupt() {
    tokio::spawn(async {
        while tokio::signal::ctrl_c().await.is_ok() {
            if interrupt_exits() {
                println!();
                std::process::exit(130);
            }
        }
    });
}

/// Draw the run until it finishes. Ctrl-C tears the run down.
pub async fn watch_generation(handle: TickerHandle) -> Outcome {
    let _watching = Watching::enter();
    let mut rx = handle.subscribe();
    let first = rx.borrow_and_update().clone();
    let pb = bar(&first);
    for line in &first.log {
        pb.println(line.dimmed().to_string());
    }
    let mut printed = first.log.len();

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let run = rx.borrow_and_update().clone();
                for line in &run.log[printed..] {
                    pb.println(line.dimmed().to_string());
                }
                printed = run.log.len();
                pb.set_prefix(stepper(run.step_index));
                pb.set_position(run.progress() as u64);
                // the channel closes when the task ends, after the settle delay
                if run.is_completed() {
                    pb.set_message("done");
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                break;
            }
        }
    }

    let outcome = handle.finished().await;
    pb.set_position(outcome.run().progress() as u64);
    match &outcome {
        Outcome::Completed(_) => pb.finish(),
        Outcome::Cancelled(_) => pb.abandon_with_message("cancelled"),
    }
    outcome
}

pub fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("(no projects)");
        return;
    }
    for p in projects {
        let created = p.created_at.map(|t| t.to_rfc3339()).unwrap_or_default();
        println!("{:>5}  {}  {}", p.id.to_string().bold(), p.name, created.dimmed());
    }
}

fn status_label(s: RunStatus) -> String {
    match s {
        RunStatus::Queued => "queued".normal().to_string(),
        RunStatus::Running => "running".cyan().to_string(),
        RunStatus::Success => "success".green().bold().to_string(),
        RunStatus::Failed => "failed".red().bold().to_string(),
    }
}

pub fn print_run(run: &Run) {
    println!(
        "run {} · project {} · {} · attempts {} · entrypoint {}",
        run.id.to_string().bold(),
        run.project_id,
        status_label(run.status),
        run.attempts,
        run.entrypoint
    );
}

pub fn print_run_started(run_id: u32, status: RunStatus, attempts: u32) {
    println!("run {} {} (attempts {})", run_id.to_string().bold(), status_label(status), attempts);
}

pub fn print_logs(events: &[LogEvent]) {
    for e in events {
        let level = match e.level {
            LogLevel::Info => "INFO".normal(),
            LogLevel::Error => "ERROR".red().bold(),
        };
        println!("[{}] {:<10} {}", level, e.stage.dimmed(), e.message);
    }
}

pub fn confirm(prompt: &str) -> bool {
    print!("{} [y/N]: ", prompt);
    let _ = io::stdout().flush();
    let mut s = String::new();
    if io::stdin().read_line(&mut s).is_ok() {
        let ans = s.trim().to_lowercase();
        ans == "y" || ans == "yes"
    } else {
        false
    }
}

/// Read one line from stdin. `None` on EOF.
pub fn ask(prompt: &str) -> Option<String> {
    print!("{} ", prompt.bold());
    let _ = io::stdout().flush();
    let mut s = String::new();
    match io::stdin().read_line(&mut s) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(s.trim_end_matches(['\r', '\n']).to_string()),
    }
}

fn indent(s: &str, n: usize) -> String {
    let pad = " ".repeat(n);
    s.lines()
        .map(|l| format!("{}{}", pad, l))
        .collect::<Vec<_>>()
        .join("\n")
}
