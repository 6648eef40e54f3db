use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::classify::{AppType, ClassifierProfile, Language};
use crate::simulate::Pace;

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Random identifiers, no network.
    #[default]
    Mock,
    /// The project/run HTTP backend.
    Http,
}

#[derive(Parser, Debug)]
#[command(name = "prompt2product", version, about = "Turn a project description into a (simulated) generated project")]
pub struct Args {
    /// TOML config file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Session file shared between one-shot commands.
    #[arg(long, global = true)]
    pub session: Option<String>,

    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[arg(long, global = true, value_enum)]
    pub profile: Option<ClassifierProfile>,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the language and app type inferred from a description.
    Detect {
        text: String,
    },
    /// Submit a project description.
    Describe(DescribeArgs),
    /// Play back generation for the submitted project.
    Generate(GenerateArgs),
    /// Show the submitted project, or run one of its actions.
    Summary {
        #[arg(long, default_value_t = false)]
        download: bool,
        #[arg(long, default_value_t = false)]
        preview: bool,
    },
    /// Ask for a change and regenerate.
    Change {
        text: String,
        #[arg(long, value_enum)]
        pace: Option<Pace>,
    },
    /// Interactive describe → generate → summary loop.
    Wizard {
        #[arg(long, value_enum, default_value_t = BackendKind::Mock)]
        backend: BackendKind,
        #[arg(long, value_enum)]
        pace: Option<Pace>,
    },
    /// Call the project/run backend directly.
    #[command(subcommand)]
    Api(ApiCommand),
}

#[derive(ClapArgs, Debug)]
pub struct DescribeArgs {
    #[arg(long, short = 'd')]
    pub description: String,

    #[arg(long, value_enum)]
    pub language: Option<Language>,

    #[arg(long, value_enum)]
    pub app_type: Option<AppType>,

    #[arg(long, default_value = "")]
    pub instructions: String,

    /// Keep the given language/app type instead of detecting them.
    #[arg(long, default_value_t = false)]
    pub no_auto_detect: bool,

    #[arg(long, value_enum, default_value_t = BackendKind::Mock)]
    pub backend: BackendKind,
}

#[derive(ClapArgs, Debug)]
pub struct GenerateArgs {
    /// Record a change request before generating.
    #[arg(long)]
    pub change: Option<String>,

    #[arg(long, value_enum)]
    pub pace: Option<Pace>,

    /// Save the finished run as JSON under .p2p/runs/.
    #[arg(long, default_value_t = false)]
    pub save: bool,
}

#[derive(Subcommand, Debug)]
pub enum ApiCommand {
    #[command(subcommand)]
    Projects(ProjectsCommand),
    #[command(subcommand)]
    Runs(RunsCommand),
}

#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// Create a project.
    Create { name: String },
    /// List projects.
    List,
}

#[derive(Subcommand, Debug)]
pub enum RunsCommand {
    /// Start a run for a project.
    Start {
        project_id: u32,
        prompt: String,
        #[arg(long, default_value = crate::api::DEFAULT_ENTRYPOINT)]
        entrypoint: String,
    },
    /// Show a run's status.
    Get {
        run_id: u32,
        /// Keep polling until the run succeeds or fails, printing new log events.
        #[arg(long, default_value_t = false)]
        follow: bool,
    },
    /// Print a run's log events.
    Logs { run_id: u32 },
    /// Download a run's archive.
    Download {
        project_id: u32,
        run_id: u32,
        #[arg(long)]
        out: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_describe() {
        let a = Args::parse_from([
            "prompt2product",
            "--profile",
            "platform",
            "describe",
            "-d",
            "iOS habit tracker",
            "--no-auto-detect",
            "--app-type",
            "mobile-app",
        ]);
        assert_eq!(a.profile, Some(ClassifierProfile::Platform));
        match a.command {
            Command::Describe(d) => {
                assert!(d.no_auto_detect);
                assert_eq!(d.app_type, Some(AppType::MobileApp));
                assert_eq!(d.backend, BackendKind::Mock);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn generate_takes_a_change_request() {
        let a = Args::parse_from(["prompt2product", "generate", "--change", "add auth", "--pace", "fast"]);
        match a.command {
            Command::Generate(g) => {
                assert_eq!(g.change.as_deref(), Some("add auth"));
                assert_eq!(g.pace, Some(Pace::Fast));
            }
            other => panic!("unexpected {other:?}"),
        }
        let a = Args::parse_from(["prompt2product", "generate"]);
        assert!(matches!(a.command, Command::Generate(GenerateArgs { change: None, .. })));
    }

    #[test]
    fn api_commands_are_grouped() {
        let a = Args::parse_from(["prompt2product", "api", "projects", "create", "x"]);
        assert!(matches!(
            a.command,
            Command::Api(ApiCommand::Projects(ProjectsCommand::Create { ref name })) if name == "x"
        ));

        let a = Args::parse_from(["prompt2product", "api", "runs", "get", "3", "--follow"]);
        assert!(matches!(
            a.command,
            Command::Api(ApiCommand::Runs(RunsCommand::Get { run_id: 3, follow: true }))
        ));

        let a = Args::parse_from(["prompt2product", "api", "runs", "start", "7", "build it"]);
        match a.command {
            Command::Api(ApiCommand::Runs(RunsCommand::Start { project_id, entrypoint, .. })) => {
                assert_eq!(project_id, 7);
                assert_eq!(entrypoint, "app.main:app");
            }
            other => panic!("unexpected {other:?}"),
        }

        assert!(Args::try_parse_from(["prompt2product", "api", "create-project", "x"]).is_err());
    }
}
