use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, instrument};
use treekit_io_fs::{
    EnumCopyPatternMode, EnumCopySymlinkStrategy, IgnorePatterns, IgnoreSpec, SpecCopyOptions,
    copy_tree_with_options,
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "treekit-copy",
    version,
    about = "Replicate a directory tree into another location",
    long_about = "`treekit-copy` copies every file, directory and symlink below SRC into DST.

Existing entries in DST that have no counterpart in SRC are left alone; files
with the same name are overwritten.

EXAMPLE:
    # Keep symlinks as links and leave build output behind
    treekit-copy -s --ignore target --ignore '*.o' ./project /backup/project --summary"
)]
struct Args {
    // Copy options
    /// Recreate symlinks as links instead of copying what they point to
    #[arg(short = 's', long = "symlinks", help_heading = "Copy options")]
    preserve_symlinks: bool,

    // Filtering options
    /// Entry name to leave out at every level (can be specified multiple times)
    #[arg(long, value_name = "PATTERN", action = clap::ArgAction::Append, help_heading = "Filtering")]
    ignore: Vec<String>,

    /// How --ignore patterns are matched against entry names
    #[arg(long, value_name = "MODE", default_value = "glob", help_heading = "Filtering")]
    pattern_mode: PatternMode,

    // Output options
    /// Print a summary line on success
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: WARN)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Quiet mode, only errors are logged
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // ARGUMENTS
    /// Source directory
    #[arg()]
    src: PathBuf,

    /// Destination directory (created if missing)
    #[arg()]
    dst: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PatternMode {
    Glob,
    Regex,
    Literal,
}

impl From<PatternMode> for EnumCopyPatternMode {
    fn from(value: PatternMode) -> Self {
        match value {
            PatternMode::Glob => EnumCopyPatternMode::Glob,
            PatternMode::Regex => EnumCopyPatternMode::Regex,
            PatternMode::Literal => EnumCopyPatternMode::Literal,
        }
    }
}

fn build_options(args: &Args) -> Result<SpecCopyOptions> {
    let ignore: Option<Arc<dyn IgnoreSpec>> = if args.ignore.is_empty() {
        None
    } else {
        let patterns = IgnorePatterns::new(args.ignore.as_slice(), args.pattern_mode.into())
            .context("failed to compile --ignore patterns")?;
        Some(Arc::new(patterns))
    };
    Ok(SpecCopyOptions {
        rule_symlink: EnumCopySymlinkStrategy::from_preserve(args.preserve_symlinks),
        ignore,
        ..SpecCopyOptions::default()
    })
}

#[instrument(skip_all)]
fn run(args: &Args) -> Result<()> {
    let spec_cp_options = build_options(args)?;
    let report = copy_tree_with_options(&args.src, &args.dst, &spec_cp_options).with_context(
        || {
            format!(
                "failed to copy {} to {}",
                args.src.display(),
                args.dst.display()
            )
        },
    )?;
    info!("{report}");
    if args.summary || args.verbose > 0 {
        println!("{report}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    treekit_log::init_tracing(args.verbose, args.quiet)
        .context("failed to initialize logging")?;
    run(&args)
}
