//! sheetstream CLI - stream rows out of XLSX workbooks
//!
//! A command-line tool for listing the sheets of a workbook and printing
//! worksheet rows as JSON lines or TSV.

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use sheetstream::{CellValue, ReadOptions, SheetSelector, XlsxReader};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Streaming row reader for XLSX spreadsheets
#[derive(Parser)]
#[command(
    name = "sheetstream",
    author = "iyulab",
    version,
    about = "Stream rows out of XLSX workbooks",
    long_about = "sheetstream - forward-only streaming row reader for XLSX workbooks.\n\n\
                  Lists sheets and prints worksheet rows as JSON lines or TSV."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the sheets of a workbook
    Sheets {
        /// Input file path
        input: PathBuf,
    },

    /// Print worksheet rows
    Rows {
        /// Input file path
        input: PathBuf,

        #[command(flatten)]
        sheet: SheetArgs,

        /// First row to print (0-based)
        #[arg(long, default_value = "0")]
        start: usize,

        /// Last row to print, inclusive (default: end of sheet)
        #[arg(long)]
        end: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Insert empty values for skipped columns
        #[arg(long)]
        fill_gaps: bool,

        /// strftime layout for date cells
        #[arg(long)]
        date_format: Option<String>,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

/// Worksheet selection; the first sheet is used when none is given
#[derive(Args)]
#[group(multiple = false)]
struct SheetArgs {
    /// Sheet name
    #[arg(long)]
    sheet: Option<String>,

    /// Sheet id (sheetId attribute)
    #[arg(long)]
    sheet_id: Option<u32>,

    /// Sheet position (0-based)
    #[arg(long)]
    sheet_index: Option<usize>,
}

impl SheetArgs {
    fn selector(&self) -> Option<SheetSelector> {
        if let Some(ref name) = self.sheet {
            Some(SheetSelector::Name(name.clone()))
        } else if let Some(id) = self.sheet_id {
            Some(SheetSelector::Id(id))
        } else {
            self.sheet_index.map(SheetSelector::Index)
        }
    }
}

/// Row output format
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One JSON array per line: [index, [values...]]
    Json,
    /// Tab separated values, row index first
    Tsv,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Sheets { input } => {
            let reader = load(&input)?;

            println!("{}", "Workbook Sheets".cyan().bold());
            println!("{}", "─".repeat(40));
            println!(
                "{}: {}",
                "File".bold(),
                input.file_name().unwrap_or_default().to_string_lossy()
            );
            println!(
                "{}: {}",
                "Date system".bold(),
                if reader.date1904() { "1904" } else { "1900" }
            );
            println!("{}: {}", "Shared strings".bold(), reader.shared_strings().len());
            println!();

            for (index, sheet) in reader.sheets().iter().enumerate() {
                println!(
                    "{:>3}  {} {}  {}",
                    index,
                    "id".dimmed(),
                    sheet.id,
                    sheet.name.green()
                );
            }
        }

        Commands::Rows {
            input,
            sheet,
            start,
            end,
            format,
            fill_gaps,
            date_format,
            output,
        } => {
            let mut options = ReadOptions::new().with_fill_gaps(fill_gaps);
            if let Some(layout) = date_format {
                options = options.with_date_format(layout);
            }

            let mut reader = load(&input)?.with_options(options);
            let sheet = match sheet.selector() {
                Some(selector) => reader.select(&selector)?,
                None => reader.first_sheet()?.clone(),
            };

            let mut out: Box<dyn Write> = match output {
                Some(ref path) => Box::new(BufWriter::new(File::create(path)?)),
                None => Box::new(BufWriter::new(io::stdout().lock())),
            };

            let mut count = 0usize;
            for row in reader.read(&sheet, start, end)? {
                let (index, values) = row?;
                write_row(&mut out, format, index, &values)?;
                count += 1;
            }
            out.flush()?;

            if let Some(path) = output {
                println!(
                    "{} Wrote {} rows of {} to {}",
                    "✓".green().bold(),
                    count,
                    sheet.name,
                    path.display()
                );
            }
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

fn load(input: &Path) -> Result<XlsxReader, Box<dyn std::error::Error>> {
    let pb = create_spinner("Loading workbook...");
    let reader = XlsxReader::open(input);
    pb.finish_and_clear();
    Ok(reader?)
}

fn write_row(
    out: &mut dyn Write,
    format: OutputFormat,
    index: usize,
    values: &[CellValue],
) -> Result<(), Box<dyn std::error::Error>> {
    match format {
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &(index, values))?;
            writeln!(out)?;
        }
        OutputFormat::Tsv => {
            write!(out, "{}", index)?;
            for value in values {
                write!(out, "\t{}", escape_tsv(&value.to_string()))?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

fn escape_tsv(field: &str) -> String {
    field
        .replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\n', "\\n")
        .replace('\r', "\\r")
}

fn print_version() {
    println!("{} {}", "sheetstream".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Forward-only streaming row reader for XLSX spreadsheets");
    println!();
    println!("Repository: https://github.com/iyulab/sheetstream");
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.blue} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
