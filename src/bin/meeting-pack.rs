//! Meeting Pack CLI tool
//!
//! A command-line tool for listing a meeting agenda and building its pack.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use meeting_pack::config::{self, FileLocator, AGENDA_FINAL_KEY, MEETING_PACK_KEY};
use meeting_pack::pack::PackAssembler;
use meeting_pack::pdf::{extract_metadata, load_pdf};

/// Meeting Pack - Build an agenda and its stamped meeting pack
#[derive(Parser)]
#[command(name = "meeting-pack")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Show the numbered agenda
    meeting-pack agenda meeting.yaml

    # Combine the agenda and all attachments into a meeting pack
    meeting-pack pack meeting.yaml

    # Check the pages and bookmarks of a finished pack
    meeting-pack info meeting-pack.pdf

The 'meeting.yaml' file names the agenda PDF and the output pack in its
metadata, along with the details and attachments of each agenda item.")]
struct Cli {
    /// Log more detail (repeat for debug output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the numbered agenda listing
    Agenda {
        /// Meeting configuration file
        #[arg(value_name = "meeting.yaml")]
        config: PathBuf,
    },

    /// Build the meeting pack from the PDF documents
    Pack {
        /// Meeting configuration file
        #[arg(value_name = "meeting.yaml")]
        config: PathBuf,

        /// Output PDF file path (defaults to the meeting_pack metadata entry)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show page count and bookmarks of a PDF file
    Info {
        /// PDF file to inspect
        input: PathBuf,
    },
}

impl Cli {
    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();

    let result = match cli.command {
        Commands::Agenda { config } => cmd_agenda(config),
        Commands::Pack { config, output } => cmd_pack(config, output),
        Commands::Info { input } => cmd_info(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Print the numbered agenda
fn cmd_agenda(config_path: PathBuf) -> Result<()> {
    let agenda = config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;

    println!("{}", agenda);
    if let Some(location) = agenda.metadata.get("location") {
        println!();
        println!("Location: {}", location);
    }

    Ok(())
}

/// Stamp and merge the agenda and all enclosures into the pack
fn cmd_pack(config_path: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let agenda = config::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let locator = FileLocator::new(&config_path);

    let agenda_final = config::require(&agenda, AGENDA_FINAL_KEY)?;
    let output = match output {
        Some(path) => path,
        None => locator.find(config::require(&agenda, MEETING_PACK_KEY)?),
    };

    eprintln!("Building meeting pack ({} enclosures)...", agenda.enclosures().count());

    let pack = PackAssembler::new(&agenda, agenda_final, locator).build()?;
    pack.save(&output)?;

    eprintln!("Output: {} ({} pages)", output.display(), pack.page_count());

    Ok(())
}

/// Show information about a PDF
fn cmd_info(input: PathBuf) -> Result<()> {
    let doc = load_pdf(&input)?;
    let metadata = extract_metadata(&doc)?;

    println!("File: {}", input.display());
    println!("Pages: {}", metadata.page_count);

    if let Some(title) = metadata.title {
        println!("Title: {}", title);
    }
    if !metadata.bookmarks.is_empty() {
        println!("Bookmarks:");
        for bookmark in &metadata.bookmarks {
            println!("  {:>4}  {}", bookmark.page_index + 1, bookmark.title);
        }
    }

    Ok(())
}
