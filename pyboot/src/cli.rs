use clap::{Parser, Subcommand};

/// pyboot - provision the bundled Python environment and run the application
///
/// Without a subcommand, pyboot resolves its install directory, creates or
/// reuses the virtual environment there, installs requirements.txt and runs
/// the application.
#[derive(Parser, Debug)]
#[command(name = "pyboot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the install root, interpreter, environment and requirements state
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove the virtual environment (recreated on the next launch)
    Clean {
        /// Only show what would be removed
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_launches() {
        let cli = Cli::try_parse_from(["pyboot"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_clean_flags() {
        let cli = Cli::try_parse_from(["pyboot", "clean", "--dry-run", "-f"]).unwrap();
        match cli.command {
            Some(Commands::Clean { dry_run, force }) => assert!(dry_run && force),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_positional_arguments() {
        assert!(Cli::try_parse_from(["pyboot", "extra.py"]).is_err());
    }
}
