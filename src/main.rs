use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framecount::analyzer::{Analyzer, FileResult, Verdict};
use framecount::config::Config;
use framecount::report::{self, Summary};
use framecount::serve::HttpService;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "framecount", author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count frames in local MP3 files
    Count {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Write a report (.json, anything else is CSV)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print bitrate and duration per file
        #[arg(long)]
        stats: bool,
    },
    /// Serve the analyse and ping endpoints over HTTP
    Serve {
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Address to listen on, e.g. 0.0.0.0:8080
        #[arg(short, long)]
        bind: Option<String>,

        /// Worker threads
        #[arg(short, long)]
        workers: Option<usize>,
    },
    /// Print a shell completion script
    Completions { shell: Shell },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Count {
            files,
            output,
            stats,
        } => count(&files, output, stats),
        Command::Serve {
            config,
            bind,
            workers,
        } => serve(config, bind, workers),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "framecount", &mut std::io::stdout());
            ExitCode::SUCCESS
        }
    }
}

fn count(files: &[PathBuf], output: Option<PathBuf>, stats: bool) -> ExitCode {
    let analyzer = Analyzer::new().with_stats(stats || output.is_some());
    let results: Vec<FileResult> = files.iter().map(|f| analyzer.analyse_file(f)).collect();

    for r in &results {
        print_result(r, stats);
    }

    let summary = Summary::from_results(&results);
    println!(
        "\n{} files, {} frames ({} ok, {} without frames, {} errors)",
        summary.total,
        summary.frames,
        summary.ok.to_string().green(),
        (summary.no_frames + summary.empty).to_string().yellow(),
        summary.error.to_string().red(),
    );

    if let Some(path) = output {
        if let Err(e) = report::generate(&path, &results) {
            error!(path = %path.display(), error = %e, "failed to write report");
            return ExitCode::FAILURE;
        }
        println!("Report written to {}", path.display());
    }

    if summary.all_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn print_result(r: &FileResult, stats: bool) {
    let verdict = match r.verdict {
        Verdict::Ok => r.verdict.to_string().green().bold(),
        Verdict::Empty | Verdict::NoFrames => r.verdict.to_string().yellow().bold(),
        Verdict::Error => r.verdict.to_string().red().bold(),
    };

    print!("{:<10} {:>8} frames  {}", verdict, r.frame_count, r.file_path);

    if let Some(err) = &r.error {
        print!("  ({})", err.dimmed());
    } else if let Some(s) = r.stats.as_ref().filter(|_| stats) {
        if s.frame_count > 0 {
            let kind = if s.is_vbr { "VBR" } else { "CBR" };
            print!(
                "  [{} kbps {}, {:.1}s, size cv {:.2}]",
                s.avg_bitrate,
                kind,
                s.duration_secs,
                s.frame_size_cv()
            );
        }
    }
    println!();
}

fn serve(config: Option<PathBuf>, bind: Option<String>, workers: Option<usize>) -> ExitCode {
    let result = Config::load(config.as_deref())
        .map(|c| c.with_bind(bind).with_workers(workers))
        .and_then(HttpService::bind)
        .and_then(HttpService::run);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "server failed");
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
