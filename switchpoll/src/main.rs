//! switchpoll command line.
//!
//! # Usage
//!
//! ```bash
//! switchpoll --inventory inventory/hostnames.txt --username admin
//! switchpoll --config switchpoll.toml --workers 10 --run-deadline 600
//! ```

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use log::{error, info};

use switchpoll::{
    Credentials, CsvReportSink, FileConfig, FleetDispatcher, HostKeyVerification, Inventory,
    RunConfig, SshClient, SshSettings, aggregate,
};

const DEFAULT_INVENTORY: &str = "inventory/hostnames.txt";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_COMMAND: &str = "show port-profile usage";
const DEFAULT_WORKERS: usize = 5;
const DEFAULT_HOST_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "switchpoll")]
#[command(version, about = "Collect port-profile assignments from NX-OS switches into a CSV report")]
struct Args {
    /// Inventory file, one host per line [default: inventory/hostnames.txt]
    #[arg(short, long)]
    inventory: Option<PathBuf>,

    /// TOML settings file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Command to run on every switch [default: "show port-profile usage"]
    #[arg(long)]
    command: Option<String>,

    /// Number of switches polled at once [default: 5]
    #[arg(short, long)]
    workers: Option<usize>,

    /// Seconds allowed for connect plus command on one switch [default: 30]
    #[arg(long, value_name = "SECS")]
    host_timeout: Option<u64>,

    /// Seconds allowed for the whole run
    #[arg(long, value_name = "SECS")]
    run_deadline: Option<u64>,

    /// Directory for the CSV report [default: output]
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// SSH username (prompted for when omitted)
    #[arg(short, long)]
    username: Option<String>,

    /// SSH port [default: 22]
    #[arg(short, long)]
    port: Option<u16>,

    /// Host key checking: strict, accept-new or disabled [default: accept-new]
    #[arg(long, value_name = "MODE")]
    host_key: Option<HostKeyVerification>,

    /// known_hosts file [default: ~/.ssh/known_hosts]
    #[arg(long)]
    known_hosts: Option<PathBuf>,

    /// Log in with this private key instead of a password
    #[arg(long)]
    private_key: Option<PathBuf>,

    /// Also write the log to this file (stderr logging continues)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log_file.as_deref()) {
        eprintln!("Error: cannot open log file: {}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(log_file: Option<&Path>) -> io::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    if let Some(path) = log_file {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(env_logger::Target::Pipe(Box::new(Tee(io::stderr(), file))));
    }

    builder.init();
    Ok(())
}

/// Writes every log line to both sinks.
struct Tee<A, B>(A, B);

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write_all(buf)?;
        self.1.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()?;
        self.1.flush()
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let file = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };

    let config = RunConfig {
        command: args
            .command
            .or(file.command)
            .unwrap_or_else(|| DEFAULT_COMMAND.to_string()),
        concurrency: args.workers.or(file.workers).unwrap_or(DEFAULT_WORKERS),
        host_timeout: Duration::from_secs(
            args.host_timeout
                .or(file.host_timeout_secs)
                .unwrap_or(DEFAULT_HOST_TIMEOUT_SECS),
        ),
        run_deadline: args
            .run_deadline
            .or(file.run_deadline_secs)
            .map(Duration::from_secs),
    };
    config.validate()?;

    let inventory_path = args
        .inventory
        .or(file.inventory)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_INVENTORY));
    let inventory = Inventory::load(&inventory_path)?;
    info!(
        "Loaded {} host(s) from {}",
        inventory.len(),
        inventory_path.display()
    );

    let mut settings = SshSettings::new(config.host_timeout)
        .with_port(args.port.or(file.ssh.port).unwrap_or(22))
        .with_host_key_verification(args.host_key.or(file.ssh.host_key).unwrap_or_default());
    if let Some(path) = args.known_hosts.or(file.ssh.known_hosts) {
        settings = settings.with_known_hosts(path);
    }

    let username = args.username.or(file.ssh.username);
    let private_key = args.private_key.or(file.ssh.private_key);
    let credentials = tokio::task::spawn_blocking(move || prompt_credentials(username, private_key))
        .await??;

    let output_dir = args
        .output_dir
        .or(file.output_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

    info!(
        "Running '{}' on {} host(s) with {} worker(s)",
        config.command,
        inventory.len(),
        config.concurrency
    );

    let dispatcher = FleetDispatcher::new(SshClient::new(settings), credentials, config);
    let results = dispatcher.run(inventory.hosts()).await;
    let report = aggregate(inventory.hosts(), &results);

    let path = CsvReportSink::new(output_dir)
        .write(&report, &Local::now())
        .map_err(switchpoll::Error::from)?;

    let summary = report.summary();
    println!(
        "{} successful, {} failed",
        summary.successful, summary.failed
    );
    for (kind, count) in &summary.failures {
        println!("  {}: {}", kind, count);
    }
    println!("Report written to {}", path.display());

    Ok(())
}

/// Ask for whatever login material the flags and settings file left out.
fn prompt_credentials(
    username: Option<String>,
    private_key: Option<PathBuf>,
) -> io::Result<Credentials> {
    let username = match username {
        Some(name) => name,
        None => {
            print!("Username: ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().read_line(&mut line)?;
            line.trim().to_string()
        }
    };
    if username.is_empty() {
        return Err(empty_credentials("username"));
    }

    if let Some(path) = private_key {
        let passphrase = rpassword::prompt_password("Key passphrase (empty for none): ")?;
        let passphrase = (!passphrase.is_empty()).then_some(passphrase);
        return Ok(Credentials::private_key(username, path, passphrase));
    }

    let password = rpassword::prompt_password("Password: ")?;
    if password.is_empty() {
        return Err(empty_credentials("password"));
    }
    Ok(Credentials::password(username, password))
}

fn empty_credentials(what: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{} must not be empty", what),
    )
}
