use std::{
    fs::{read, write},
    io,
    path::PathBuf,
    process::ExitCode,
    result::Result,
};

use clap::Parser;
use font_feature_decompiler::{DecompileOptions, FeaWriter, TableTag, decompile};
use log::info;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Message(String),
    #[error("read: {0}")]
    Read(#[source] io::Error),
    #[error("write: {0}")]
    Write(#[source] io::Error),
    #[error("{0}")]
    Font(#[from] font_feature_decompiler::Error),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "font-feature-decompiler", version)]
#[command(about = "Decompile an OpenType GSUB table into feature file syntax")]
#[command(long_about = "Decompile an OpenType GSUB table into feature file syntax.\n\n\
    Lookups and glyph classes shared between features are promoted to named \
    definitions, and features are grouped by script and language.")]
#[command(after_help = "Examples:\n  \
    font-feature-decompiler OpenSans.ttf OpenSans.fea\n  \
    font-feature-decompiler -r 'a.sc,b.sc' -R 'uni0041/A' OpenSans.ttf")]
struct Cli {
    /// Layout table to decompile
    #[arg(short, long, default_value = "GSUB")]
    table: TableTag,
    /// Keep every lookup inline and every class unnamed
    #[arg(long)]
    no_compress: bool,
    /// Comma-separated glyph names to remove from all rules
    #[arg(short, long)]
    remove: Option<String>,
    /// Rename glyphs: 'old/new,old2/new2,...'
    #[arg(short = 'R', long)]
    rename: Option<String>,
    /// Keep rules, classes and lookups left empty by --remove
    #[arg(long)]
    no_cleanup: bool,
    /// Print decompilation statistics to stderr
    #[arg(short, long)]
    stats: bool,
    /// Verbose output (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Suppress output except errors
    #[arg(short, long)]
    quiet: bool,
    /// Input .otf or .ttf font file
    #[arg(value_name = "INPUT", required = true)]
    input: PathBuf,
    /// Output feature file (default: stdout)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,
}

impl Cli {
    fn run(&self) -> ExitCode {
        self.init_logger();
        self.execute().map_or_else(
            |e| {
                if !e.to_string().is_empty() {
                    eprintln!("{e}");
                }
                ExitCode::FAILURE
            },
            |_| ExitCode::SUCCESS,
        )
    }

    fn init_logger(&self) {
        let level = match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    }

    fn execute(&self) -> CliResult<()> {
        let data = read(&self.input).map_err(CliError::Read)?;
        let result = decompile(&data, &self.decompile_options()?)?;

        let mut writer = FeaWriter::new();
        result.table.write(&mut writer);
        let fea = writer.finish();

        match &self.output {
            Some(output) => {
                write(output, fea).map_err(CliError::Write)?;
                info!("Saved: {}", output.display());
            }
            None => print!("{fea}"),
        }

        if self.stats && !self.quiet {
            eprintln!(
                "{}: {}",
                self.input.file_name().unwrap_or_default().to_string_lossy(),
                result.stats
            );
        }
        Ok(())
    }

    fn decompile_options(&self) -> CliResult<DecompileOptions> {
        let removed: Vec<&str> = self
            .remove
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if self.remove.is_some() && removed.is_empty() {
            return Err(CliError::Message(
                "--remove must include at least one glyph name".into(),
            ));
        }

        let options = DecompileOptions::new()
            .with_table(self.table)
            .with_compression_if(!self.no_compress)
            .with_cleanup_if(!self.no_cleanup)
            .with_removed_glyphs(removed)
            .with_renames_opt(self.rename.as_deref())?;
        if self.rename.is_some() && options.rename_glyphs.is_empty() {
            return Err(CliError::Message(
                "--rename expects 'old/new' pairs separated by commas".into(),
            ));
        }
        Ok(options)
    }
}

fn main() -> ExitCode {
    Cli::parse().run()
}
