//! Command-line interface.
//!
//! Every command runs one workflow against a freshly spawned worker and
//! exits. The project root defaults to the current directory.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "icie", version, about = "Build, test and submit competitive programming solutions")]
pub struct Cli {
    /// Worker executable. Overrides `worker` in icie.toml.
    #[arg(long, global = true)]
    pub worker: Option<PathBuf>,

    /// Project root. Defaults to the current directory.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file. Defaults to `<config dir>/icie/icie.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Compile main.cpp into main.e.
    Build,

    /// Run the tests, compiling first if the executable is stale.
    ///
    /// Exits with status 1 when any test fails.
    Test,

    /// Run the tests and submit the solution if they all pass.
    Submit,

    /// Create a new project for a task URL under the home directory.
    Init,

    /// Hand the task to the judge's own submission page.
    ManualSubmit,

    /// Copy the configured template into the project.
    Template,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Test => "test",
            Self::Submit => "submit",
            Self::Init => "init",
            Self::ManualSubmit => "manual-submit",
            Self::Template => "template",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "icie",
            "submit",
            "--worker",
            "/opt/icie/worker",
            "--root",
            "/home/u/cool-app",
        ])
        .unwrap();
        assert_eq!(cli.command, Command::Submit);
        assert_eq!(cli.worker, Some(PathBuf::from("/opt/icie/worker")));
        assert_eq!(cli.root, Some(PathBuf::from("/home/u/cool-app")));
        assert_eq!(cli.config, None);
    }

    #[test]
    fn kebab_case_subcommands() {
        let cli = Cli::try_parse_from(["icie", "manual-submit"]).unwrap();
        assert_eq!(cli.command, Command::ManualSubmit);
        assert_eq!(cli.command.name(), "manual-submit");
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["icie"]).is_err());
    }
}
