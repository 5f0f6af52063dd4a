use anyhow::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use diffty::cli::{self, BranchArgs, Commands, CompareArgs, DecideArgs, FileArgs, RepoAction};
use diffty::config::{Config, default_storage_root};
use diffty::highlight::DiffHighlighter;
use diffty::ledger::Comparison;
use diffty::review::ReviewService;
use diffty::tui::{App, run_tui};
use diffty::vcs::GitCli;

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_env("DIFFTY_LOG")
        .unwrap_or_else(|_| EnvFilter::new("diffty=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = cli::parse_args();
    let root = args.root.unwrap_or_else(default_storage_root);
    let config = Config::load(&root)?;

    let store = config.open_store()?;
    let service = ReviewService::new(store, GitCli)
        .with_exclude_patterns(&config.review.exclude_patterns)
        .context("Invalid review.exclude_patterns in config")?;

    match args.command {
        Commands::Repo { action } => match action {
            RepoAction::Add { path } => {
                let id = service.add_repository(&path)?;
                println!("✓ Registered {}", id);
            }
            RepoAction::List => {
                let repos = service.repositories()?;
                if repos.is_empty() {
                    println!("No repositories registered");
                }
                for repo in repos {
                    println!("{}", repo);
                }
            }
        },
        Commands::Branches { repo } => handle_branches(&service, &repo)?,
        Commands::Status(args) => handle_status(&service, &args)?,
        Commands::Diff(args) => handle_diff(&service, &args)?,
        Commands::Decide(args) => handle_decide(&service, &args)?,
        Commands::Review(args) => {
            let comparison = compare(&service, &args.repo, &args.branches)?;
            let highlighter = DiffHighlighter::new(&config.ui.theme, config.ui.tab_width);
            let app = App::new(&service, &comparison, highlighter)?;
            run_tui(app)?;
        }
    }

    Ok(())
}

/// Resolve the registered repository and pin its comparison.
fn compare(
    service: &ReviewService<GitCli>,
    repo: &str,
    branches: &BranchArgs,
) -> Result<Comparison> {
    let repo = service.repository(repo)?;
    let comparison = service
        .comparison(
            &repo,
            branches.source.as_deref(),
            branches.target.as_deref(),
        )
        .with_context(|| format!("Failed to resolve branches in {}", repo))?;
    Ok(comparison)
}

fn handle_branches(service: &ReviewService<GitCli>, repo: &str) -> Result<()> {
    let repo = service.repository(repo)?;
    let choice = service.branches(&repo)?;

    for branch in &choice.branches {
        let mut marks = Vec::new();
        if *branch == choice.source {
            marks.push("source");
        }
        if *branch == choice.target {
            marks.push("target");
        }
        if marks.is_empty() {
            println!("  {}", branch);
        } else {
            println!("  {} ({})", branch, marks.join(", "));
        }
    }
    Ok(())
}

fn handle_status(service: &ReviewService<GitCli>, args: &CompareArgs) -> Result<()> {
    let comparison = compare(service, &args.repo, &args.branches)?;
    let view = service.open_comparison(&comparison)?;

    println!(
        "Review of {} → {} ({}..{})",
        comparison.source_branch,
        comparison.target_branch,
        short(&comparison.target_commit),
        short(&comparison.source_commit)
    );
    println!("─────────────────────────────────────");

    if view.no_diff {
        println!("No differences");
        return Ok(());
    }

    for file in &view.files {
        println!("  {:<10} {}", file.status.as_str(), file.path);
    }

    let progress = &view.progress;
    println!();
    println!(
        "  Reviewed:   {}/{} files ({:.0}%)",
        progress.reviewed(),
        progress.total_files,
        if progress.total_files > 0 {
            (progress.reviewed() as f64 / progress.total_files as f64) * 100.0
        } else {
            0.0
        }
    );
    println!(
        "  Approved {}, rejected {}, skipped {}, mixed {}",
        progress.approved, progress.rejected, progress.skipped, progress.mixed
    );

    if progress.unreviewed == 0 && progress.total_files > 0 {
        println!("\n✓ All files reviewed!");
    }
    Ok(())
}

fn handle_diff(service: &ReviewService<GitCli>, args: &FileArgs) -> Result<()> {
    let comparison = compare(service, &args.repo, &args.branches)?;
    let view = service.open_comparison(&comparison)?;
    let file = service.open_file(&view, &args.file)?;

    if file.diff.is_empty() {
        println!("No changes to {}", args.file);
        return Ok(());
    }

    print!("{}", file.diff);
    Ok(())
}

fn handle_decide(service: &ReviewService<GitCli>, args: &DecideArgs) -> Result<()> {
    let comparison = compare(service, &args.repo, &args.branches)?;
    let view = service.open_comparison(&comparison)?;

    if view.navigation.position(&args.file).is_none() {
        bail!(
            "{} is not changed between {} and {}",
            args.file,
            comparison.source_branch,
            comparison.target_branch
        );
    }

    let next = match args.lines {
        Some(token) => service.record_range(&view, &args.file, token, args.decision)?,
        None => service.record_decision(&view, &args.file, args.decision)?,
    };

    println!("✓ {} {}", args.decision, args.file);
    if next != args.file {
        println!("Next: {}", next);
    }
    Ok(())
}

fn short(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}
