//! # Factura Print CLI
//!
//! Operator tool for the printing subsystem: list and pair printers, print a
//! test page or an invoice, and preview print jobs without a printer.
//!
//! ## Usage
//!
//! ```bash
//! # List paired printers
//! factura-print paired
//!
//! # Scan for new printers for 15 seconds
//! factura-print scan --timeout-ms 15000
//!
//! # Connect to the first printer whose name contains "woosim"
//! factura-print connect woosim
//!
//! # Print an invoice exported from the API
//! factura-print invoice factura-1234.json
//!
//! # Show the test page stream with escape bytes spelled out
//! factura-print preview test-page
//!
//! # Try everything against the in-memory printers
//! factura-print --mock test-page
//! ```
//!
//! Print commands connect to the preferred printer (`printer_match` in the
//! config, or `--printer`) before sending the job.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use factura_print::{
    Invoice, PdfPrintOutcome, PrinterDevice, PrinterError, PrinterModel, PrinterService,
    ServiceConfig,
    config::TransportKind,
    platform::StaticPermissions,
    printer::model::name_contains,
    receipt::ReceiptFormatter,
};

/// Factura Print - Bluetooth receipt printer utility
#[derive(Parser, Debug)]
#[command(name = "factura-print")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use the in-memory mock printers instead of Bluetooth
    #[arg(long, global = true)]
    mock: bool,

    /// Name fragment of the printer to print on (overrides printer_match)
    #[arg(long, global = true, value_name = "NAME")]
    printer: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List paired printers
    Paired,

    /// Scan for unpaired printers
    Scan {
        /// Discovery window in milliseconds (defaults to scan_timeout_ms)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Connect to a printer by model or name fragment
    Connect {
        /// Model name ("woosim", "star") or any part of the device name
        name: String,
    },

    /// Print the capability test page
    TestPage,

    /// Print raw text
    Text {
        text: String,
    },

    /// Print an invoice from a JSON file
    Invoice {
        file: PathBuf,
    },

    /// Print the PDF placeholder notice for a document URL
    Pdf {
        url: String,
    },

    /// Write a formatted job to stdout instead of printing it
    Preview {
        #[command(subcommand)]
        job: PreviewJob,
    },
}

#[derive(Subcommand, Debug)]
enum PreviewJob {
    /// Test page for a placeholder printer name
    TestPage,
    /// Invoice receipt from a JSON file
    Invoice { file: PathBuf },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,factura_print=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[tokio::main]
async fn run() -> Result<(), PrinterError> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    if cli.mock {
        config.transport.kind = TransportKind::Mock;
    }
    if let Some(name) = &cli.printer {
        config.printer_match = name.clone();
    }
    config.validate()?;

    // Previews never touch Bluetooth
    if let Commands::Preview { job } = &cli.command {
        let formatter = ReceiptFormatter::new(config.receipt.clone());
        let stream = match job {
            PreviewJob::TestPage => formatter.test_page("Woosim WSP-i450"),
            PreviewJob::Invoice { file } => {
                let invoice = read_invoice(file)?;
                formatter
                    .invoice_receipt(Some(&invoice))
                    .unwrap_or_default()
            }
        };
        print!("{}", visible(&stream));
        return Ok(());
    }

    // Desktop Bluetooth has no runtime permission prompt
    let service = PrinterService::from_config(&config, Arc::new(StaticPermissions::granted()));
    if !service.is_available() {
        return Err(PrinterError::Unavailable);
    }

    match cli.command {
        Commands::Paired => {
            let devices = service.list_paired().await?;
            print_devices("Paired printers", &devices);
        }
        Commands::Scan { timeout_ms } => {
            let timeout = timeout_ms.map(std::time::Duration::from_millis);
            println!("Scanning...");
            let devices = service.scan(timeout).await?;
            print_devices("Found printers", &devices);
        }
        Commands::Connect { name } => {
            let connected = match PrinterModel::by_name(&name) {
                Some(model) => service.connect_to_named_printer(|n| model.matches(n)).await,
                None => {
                    service
                        .connect_to_named_printer(|n| name_contains(n, &name))
                        .await
                }
            };
            match service.current_printer() {
                Some(printer) if connected => {
                    println!("Connected to {} ({})", printer.name, printer.id)
                }
                _ => {
                    return Err(PrinterError::Transport(format!(
                        "no printer matching '{}'",
                        name
                    )));
                }
            }
        }
        Commands::TestPage => {
            connect_preferred(&service, &config).await?;
            require(service.print_test_page().await, "test page")?;
            println!("Printed successfully!");
        }
        Commands::Text { text } => {
            connect_preferred(&service, &config).await?;
            require(service.print_text(&text).await, "text")?;
            println!("Printed successfully!");
        }
        Commands::Invoice { file } => {
            let invoice = read_invoice(&file)?;
            connect_preferred(&service, &config).await?;
            require(service.print_invoice(Some(&invoice)).await, "invoice")?;
            println!("Printed successfully!");
        }
        Commands::Pdf { url } => {
            connect_preferred(&service, &config).await?;
            match service.print_pdf(&url).await {
                PdfPrintOutcome::PlaceholderPrinted => {
                    println!("PDF printing is not implemented; printed a notice instead.")
                }
                PdfPrintOutcome::NotPrinted => require(false, "PDF notice")?,
            }
        }
        Commands::Preview { .. } => {}
    }

    service.disconnect().await;
    Ok(())
}

async fn connect_preferred(
    service: &PrinterService,
    config: &ServiceConfig,
) -> Result<(), PrinterError> {
    if service.connect_to_preferred_printer().await {
        Ok(())
    } else {
        Err(PrinterError::Transport(format!(
            "could not connect to a printer matching '{}'",
            config.printer_match
        )))
    }
}

fn require(ok: bool, what: &str) -> Result<(), PrinterError> {
    if ok {
        Ok(())
    } else {
        Err(PrinterError::Transport(format!("printing {} failed", what)))
    }
}

fn read_invoice(path: &PathBuf) -> Result<Invoice, PrinterError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn print_devices(title: &str, devices: &[PrinterDevice]) {
    if devices.is_empty() {
        println!("{}: none", title);
        return;
    }
    println!("{}:", title);
    for device in devices {
        let address = device.address.as_deref().unwrap_or("-");
        match device.signal_strength {
            Some(rssi) => println!("  {:<24} {:<20} {} ({} dBm)", device.name, device.id, address, rssi),
            None => println!("  {:<24} {:<20} {}", device.name, device.id, address),
        }
    }
}

/// Spell out control bytes so a job can be read on a terminal.
fn visible(stream: &str) -> String {
    let mut out = String::with_capacity(stream.len() * 2);
    let mut chars = stream.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\x1B' => {
                out.push_str("<ESC>");
                // the command letter and its argument byte
                if let Some(cmd) = chars.next() {
                    out.push(cmd);
                    if cmd != '@' {
                        if let Some(arg) = chars.next() {
                            out.push_str(&format!("<{:02X}>", arg as u32));
                        }
                    }
                }
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => out.push_str("<CRLF>\n"),
            c if c.is_control() => out.push_str(&format!("<{:02X}>", c as u32)),
            c => out.push(c),
        }
    }
    out
}
