use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

mod api;
mod backend;
mod change;
mod classify;
mod cli;
mod config;
mod draft;
mod errors;
mod flow;
mod log;
mod session;
mod simulate;
mod ux;
mod wire;

use cli::{ApiCommand, Command, ProjectsCommand, RunsCommand};
use draft::ProjectDraft;
use errors::P2pError;
use flow::{Flow, Route};
use session::{FileSession, MemorySession, SessionStore};
use simulate::ticker::Outcome;
use simulate::Pace;

fn default_filter(debug: bool) -> &'static str {
    if debug {
        "prompt2product=debug"
    } else {
        "prompt2product=info"
    }
}

fn init_tracing(debug: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter(debug)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_session(args: &cli::Args, cfg: &config::Config, in_memory: bool) -> anyhow::Result<Arc<dyn SessionStore>> {
    match (&args.session, in_memory) {
        (None, true) => Ok(Arc::new(MemorySession::new())),
        (Some(p), _) => Ok(Arc::new(FileSession::open(p)?)),
        (None, false) => {
            let p = Path::new(&cfg.root).join(&cfg.session_path);
            Ok(Arc::new(FileSession::open(p)?))
        }
    }
}

/// True when `err` is a blank-input rejection; those are reported quietly.
fn is_empty_input(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<P2pError>(), Some(P2pError::EmptyInput))
}

async fn run_generation(
    flow: &Flow,
    cfg: &config::Config,
    session: &dyn SessionStore,
    pace: Pace,
    save: bool,
) -> anyhow::Result<Route> {
    let handle = match flow.start_generation(pace) {
        Ok(h) => h,
        Err(e) if e.is_redirect() => {
            ux::show_redirect();
            return Ok(Route::Describe);
        }
        Err(e) => return Err(e.into()),
    };
    println!("\n{}", "Generating your project".bold());

    match ux::watch_generation(handle).await {
        Outcome::Completed(run) => {
            if save || cfg.save_transcript {
                if let Some((draft, _)) = flow::active_draft(flow) {
                    let p = log::save_transcript(Path::new(&cfg.root), session.id(), &draft, &run)?;
                    println!("transcript saved at {}", p.display());
                }
            }
            Ok(Route::Summary)
        }
        Outcome::Cancelled(run) => {
            println!("generation stopped at {}%", run.progress());
            Ok(Route::Describe)
        }
    }
}

fn show_summary(flow: &Flow, download: bool, preview: bool) -> Route {
    let Some((draft, active)) = flow::active_draft(flow) else {
        ux::show_redirect();
        return Route::Describe;
    };
    if download {
        ux::show_download(&flow::download_file_name(active, Utc::now()), active);
    }
    if preview {
        ux::show_preview(&flow::preview_target(active));
    }
    if !download && !preview {
        ux::show_summary(&draft, active);
    }
    Route::Summary
}

async fn wizard(
    flow: &Flow,
    cfg: &config::Config,
    session: &dyn SessionStore,
    backend: &backend::DynBackend,
    pace: Pace,
) -> anyhow::Result<()> {
    let mut route = Route::Describe;
    loop {
        route = flow.guard(route);
        match route {
            Route::Describe => {
                let Some(text) = ux::ask("What do you want to build?") else { return Ok(()) };
                let mut d = ProjectDraft::new(String::new());
                d.set_description(text, cfg.profile);
                if let Some(extra) = ux::ask("Additional instructions (optional):") {
                    d.additional_instructions = extra;
                }
                match draft::submit(d, cfg.profile, backend, &flow.drafts).await {
                    Ok(submitted) => {
                        if let Some(active) = submitted.active() {
                            ux::show_submitted(&submitted, active);
                        }
                        route = Route::Generating;
                    }
                    Err(e) if is_empty_input(&e) => println!("{}", "Please describe your project first.".dimmed()),
                    Err(e) => return Err(e),
                }
            }
            Route::Generating => {
                route = run_generation(flow, cfg, session, pace, false).await?;
            }
            Route::Summary => {
                show_summary(flow, false, false);
                let Some(choice) = ux::ask("[c]hange, [d]ownload, [p]review, [n]ew project, [q]uit:") else {
                    return Ok(());
                };
                match choice.trim().to_lowercase().as_str() {
                    "c" | "change" => {
                        let Some(text) = ux::ask("Describe the changes you want:") else { return Ok(()) };
                        match flow.request_change(&text) {
                            Ok(next) => route = next,
                            Err(e) if is_empty_input(&e) => println!("{}", "Nothing to change.".dimmed()),
                            Err(e) => return Err(e),
                        }
                    }
                    "d" | "download" => {
                        show_summary(flow, true, false);
                    }
                    "p" | "preview" => {
                        show_summary(flow, false, true);
                    }
                    "n" | "new" => {
                        if ux::confirm("Discard the current project?") {
                            flow.drafts.clear()?;
                            route = Route::Describe;
                        }
                    }
                    "q" | "quit" => return Ok(()),
                    _ => {}
                }
            }
        }
    }
}

async fn follow_run(client: &api::ApiClient, run_id: u32) -> anyhow::Result<()> {
    let mut seen = 0usize;
    let mut clock = tokio::time::interval(Duration::from_secs(2));
    loop {
        clock.tick().await;
        let events = client.run_logs(run_id).await?;
        if events.len() > seen {
            ux::print_logs(&events[seen..]);
            seen = events.len();
        }
        let run = client.get_run(run_id).await?;
        if run.status.is_terminal() {
            ux::print_run(&run);
            return Ok(());
        }
    }
}

async fn api_command(cmd: ApiCommand, cfg: &config::Config) -> anyhow::Result<()> {
    let client = api::ApiClient::new(&cfg.api_base_url, cfg.timeout_secs)?;
    match cmd {
        ApiCommand::Projects(ProjectsCommand::Create { name }) => {
            let p = client.create_project(&name).await?;
            ux::print_projects(std::slice::from_ref(&p));
        }
        ApiCommand::Projects(ProjectsCommand::List) => {
            ux::print_projects(&client.list_projects().await?);
        }
        ApiCommand::Runs(RunsCommand::Start { project_id, prompt, entrypoint }) => {
            let r = client.start_run(project_id, &prompt, &entrypoint).await?;
            ux::print_run_started(r.run_id, r.status, r.attempts);
        }
        ApiCommand::Runs(RunsCommand::Get { run_id, follow }) => {
            let run = client.get_run(run_id).await?;
            ux::print_run(&run);
            if follow && !run.status.is_terminal() {
                follow_run(&client, run_id).await?;
            }
        }
        ApiCommand::Runs(RunsCommand::Logs { run_id }) => {
            ux::print_logs(&client.run_logs(run_id).await?);
        }
        ApiCommand::Runs(RunsCommand::Download { project_id, run_id, out }) => {
            let dest = out
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(format!("project-{project_id}-run-{run_id}.zip")));
            let bytes = client
                .download(project_id, run_id, &dest)
                .await
                .with_context(|| format!("downloading {}", client.download_url(project_id, run_id)))?;
            println!(
                "saved {} ({})",
                dest.display(),
                humansize::format_size(bytes, humansize::DECIMAL)
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_tracing(args.debug);

    let mut cfg = config::Config::load(args.config.as_deref().map(Path::new))?;
    if let Some(url) = &args.api_url {
        cfg.api_base_url = url.clone();
    }
    if let Some(profile) = args.profile {
        cfg.profile = profile;
    }
    cfg.validate()?;

    let in_memory = matches!(args.command, Command::Wizard { .. } | Command::Detect { .. } | Command::Api(_));
    let session = open_session(&args, &cfg, in_memory)?;
    let flow = Flow::new(session.clone(), &cfg);
    tracing::debug!(session = %session.id(), api = %cfg.api_base_url, "starting");

    match args.command {
        Command::Detect { text } => {
            ux::show_detection(&classify::classify(&text, cfg.profile));
        }
        Command::Describe(d) => {
            let mut draft = ProjectDraft::new(d.description);
            draft.additional_instructions = d.instructions;
            draft.set_auto_detect(!d.no_auto_detect, cfg.profile);
            let picked = d.language.is_some() || d.app_type.is_some();
            if !draft.choose(d.language, d.app_type) && picked {
                println!(
                    "{} --language/--app-type are ignored while auto-detect is on (pass --no-auto-detect)",
                    "note:".yellow()
                );
            }
            if !cfg.profile.app_types().contains(&draft.app_type) {
                println!(
                    "{} {} is not one of the {:?} profile's app types",
                    "note:".yellow(),
                    draft.app_type,
                    cfg.profile
                );
            }

            let backend = backend::make_backend(d.backend, &cfg)?;
            match draft::submit(draft, cfg.profile, &backend, &flow.drafts).await {
                Ok(submitted) => {
                    if let Some(active) = submitted.active() {
                        ux::show_submitted(&submitted, active);
                    }
                }
                Err(e) if is_empty_input(&e) => {
                    println!("{}", "Description is empty; nothing submitted.".dimmed());
                }
                Err(e) => return Err(e),
            }
        }
        Command::Generate(g) => {
            if let Some(text) = &g.change {
                if let Err(e) = flow.request_change(text) {
                    if !is_empty_input(&e) {
                        return Err(e);
                    }
                    println!("{}", "Change request is empty; generating without one.".dimmed());
                }
            }
            let pace = g.pace.unwrap_or(cfg.pace);
            if run_generation(&flow, &cfg, session.as_ref(), pace, g.save).await? == Route::Summary {
                show_summary(&flow, false, false);
            }
        }
        Command::Summary { download, preview } => {
            show_summary(&flow, download, preview);
        }
        Command::Change { text, pace } => match flow.request_change(&text) {
            Ok(Route::Generating) => {
                let pace = pace.unwrap_or(cfg.pace);
                if run_generation(&flow, &cfg, session.as_ref(), pace, false).await? == Route::Summary {
                    show_summary(&flow, false, false);
                }
            }
            Ok(_) => ux::show_redirect(),
            Err(e) if is_empty_input(&e) => {
                println!("{}", "Change request is empty; nothing to do.".dimmed());
            }
            Err(e) => return Err(e),
        },
        Command::Wizard { backend, pace } => {
            let backend = backend::make_backend(backend, &cfg)?;
            ux::exit_on_interrupt();
            println!("{}", "Ctrl-C stops a running generation; [q] or Ctrl-D quits.".dimmed());
            wizard(&flow, &cfg, session.as_ref(), &backend, pace.unwrap_or(cfg.pace)).await?;
        }
        Command::Api(cmd) => api_command(cmd, &cfg).await?,
    }

    Ok(())
}
