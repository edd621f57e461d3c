use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

use profit_report::report::TableRow;
use profit_report::{Dataset, Report, ReportError, SourceConfig, Variant, downloader, graph};

#[derive(Parser)]
#[command(name = "profit-report", version, about = "Net profit change analysis per carrier and class")]
struct Cli {
    /// Claims table to analyse (.csv, .xlsx, .xls, .ods)
    #[arg(long)]
    file: PathBuf,

    /// Column set the file must provide
    #[arg(long, value_enum, default_value_t = Variant::Minimal)]
    variant: Variant,

    /// Worksheet to read instead of the first one
    #[arg(long)]
    sheet: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the web dashboard
    #[cfg(feature = "web")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:3000")]
        bind: std::net::SocketAddr,
        #[arg(long, default_value_t = 800)]
        chart_width: u32,
        #[arg(long, default_value_t = 600)]
        chart_height: u32,
    },
    /// Print the report for one carrier and class
    Report {
        #[arg(long)]
        ins: Option<String>,
        #[arg(long)]
        class: Option<String>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Write every applicable chart as a PNG file
    Charts {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        ins: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
    },
    /// Export the filtered table (.csv or .xlsx)
    Export {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        ins: Option<String>,
        #[arg(long)]
        class: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.is_fatal() {
                eprintln!("Error: {err}");
            } else {
                error!("{err}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), ReportError> {
    let mut config = SourceConfig::new(&cli.file, cli.variant);
    if let Some(sheet) = cli.sheet {
        config = config.with_sheet(sheet);
    }
    let dataset = Dataset::load(&config)?;
    if dataset.is_empty() {
        warn!("{} has no rows with an insurance carrier", dataset.source().display());
    }

    match cli.command {
        #[cfg(feature = "web")]
        Command::Serve {
            bind,
            chart_width,
            chart_height,
        } => {
            let state = profit_report::app::AppState::new(dataset)?
                .with_chart_size(chart_width, chart_height);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(profit_report::app::run(state, bind))
        }
        Command::Report { ins, class, json } => {
            let selection = dataset.select(ins.as_deref(), class.as_deref());
            let report = Report::build(&dataset, selection.as_ref());
            if json {
                let text = serde_json::to_string_pretty(&report)
                    .map_err(|e| ReportError::Export(e.to_string()))?;
                println!("{text}");
            } else {
                print!("{report}");
            }
            Ok(())
        }
        Command::Charts {
            out,
            ins,
            class,
            width,
            height,
        } => {
            let selection = dataset.select(ins.as_deref(), class.as_deref());
            for (kind, path) in graph::save_all(&dataset, selection.as_ref(), &out, width, height)? {
                info!("Wrote {} to {}", kind.title(), path.display());
            }
            Ok(())
        }
        Command::Export { out, ins, class } => {
            let rows: Vec<TableRow> = dataset
                .select(ins.as_deref(), class.as_deref())
                .map(|s| dataset.filter(&s).into_iter().map(TableRow::from).collect())
                .unwrap_or_default();
            let format = downloader::export_to_file(&rows, dataset.variant(), &out)?;
            info!(
                "Exported {} rows as {} to {}",
                rows.len(),
                format.extension(),
                out.display()
            );
            Ok(())
        }
    }
}
