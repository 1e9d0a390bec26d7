use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use hunk_select::{
    Config, Diff, HunkSelectError, PatchAction, StackId, Uncommitted, Worktree, check_file_lines,
    format_line_ids, line_ids_to_hunk_headers,
    parse::{parse_file_refs, parse_line_ids},
};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hunk-select")]
#[command(about = "Line-level hunk selection for uncommitted changes")]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every changed line with the reference that selects it
    Lines {
        #[command(flatten)]
        source: DiffSource,
        /// Limit to these files (with --repo)
        files: Vec<String>,
    },
    /// Print the hunk headers covering selected lines of one hunk
    Headers {
        /// Line references (e.g. "-4,6..7")
        refs: String,
        /// commit or discard (defaults to the configured action)
        #[arg(long)]
        action: Option<PatchAction>,
        /// File holding the hunk header and body (stdin when omitted)
        #[arg(long)]
        diff: Option<PathBuf>,
    },
    /// Print the assignments and tree changes of a diff as JSON
    Snapshot {
        #[command(flatten)]
        source: DiffSource,
        /// Stack to assign every hunk to (unassigned when omitted)
        #[arg(long)]
        stack: Option<String>,
    },
    /// Select lines and print the resulting commit request as JSON
    Select {
        #[command(flatten)]
        source: DiffSource,
        /// Stack to assign every hunk to (unassigned when omitted)
        #[arg(long)]
        stack: Option<String>,
        /// Path and line references (e.g. "src/a.ts:-10,12")
        file_refs: Vec<String>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
    /// Generate a man page
    Man,
}

/// Where to read `git diff` output from. Stdin when neither is given.
#[derive(Args)]
struct DiffSource {
    /// File holding `git diff` output
    #[arg(long, conflicts_with = "repo")]
    diff: Option<PathBuf>,
    /// Repository to run `git diff` in
    #[arg(long)]
    repo: Option<String>,
}

impl DiffSource {
    fn load(&self, files: &[String]) -> Result<Diff, HunkSelectError> {
        match &self.repo {
            Some(repo) => Worktree::new(repo).diff(files),
            None => Ok(Diff::parse(&read_input(self.diff.as_deref())?)?),
        }
    }
}

fn read_input(path: Option<&Path>) -> Result<String, HunkSelectError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|e| HunkSelectError::ReadInput {
            source_name: path.display().to_string(),
            message: e.to_string(),
        }),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|e| HunkSelectError::ReadInput {
                    source_name: "stdin".to_string(),
                    message: e.to_string(),
                })?;
            Ok(text)
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Lines { source, files } => {
            println!("{}", format_line_ids(&source.load(&files)?));
        }
        Commands::Headers { refs, action, diff } => {
            let lines = parse_line_ids(&refs)?;
            let hunk = read_input(diff.as_deref())?;
            let action = action.unwrap_or(config.default_action);
            for header in line_ids_to_hunk_headers(&lines, &hunk, action)? {
                println!("{header}");
            }
        }
        Commands::Snapshot { source, stack } => {
            let stack = stack.map(StackId::new);
            let snapshot = source.load(&[])?.snapshot(stack.as_ref());
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Select {
            source,
            stack,
            file_refs,
        } => {
            let stack = stack.map(StackId::new);
            let refs = file_refs
                .iter()
                .map(|r| parse_file_refs(r))
                .collect::<Result<Vec<_>, _>>()?;
            let files: Vec<String> = refs.iter().map(|r| r.path.clone()).collect();
            let diff = source.load(&files)?;
            let snapshot = diff.snapshot(stack.as_ref());

            let mut uncommitted = Uncommitted::with_config(config);
            uncommitted.update(snapshot.assignments, snapshot.changes);
            for file in &refs {
                check_file_lines(&mut uncommitted, stack.as_ref(), &file.path, &file.lines)?;
            }

            let specs = uncommitted.worktree_changes(stack.as_ref(), &diff)?;
            println!("{}", serde_json::to_string_pretty(&specs)?);
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "hunk-select",
                &mut std::io::stdout(),
            );
        }
        Commands::Man => {
            clap_mangen::Man::new(Cli::command()).render(&mut std::io::stdout())?;
        }
    }

    Ok(())
}
