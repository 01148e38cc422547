use std::{
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use config::{default_backup_dir, load_config, load_default_config, Overrides, Settings};
use console::{Command, HELP};
use filemonitor::logger::{log, verbose_log, LogLevel};
use filemonitor::BackupMonitor;

mod config;
mod console;
mod report;

#[derive(Parser, Debug)]
#[command(
    name = "filemonitor",
    version,
    about = "Keeps a timestamped backup of a file every time it changes"
)]
struct Cli {
    /// File to monitor
    file: Option<PathBuf>,

    /// Directory receiving the backups [default: "<file dir>/Backup - <file name>"]
    #[arg(short, long)]
    backup_dir: Option<PathBuf>,

    /// Config file to read
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start backing up right away instead of waiting for `start`
    #[arg(short, long)]
    start: bool,

    /// Print debug output
    #[arg(short, long)]
    verbose: bool,

    /// Print one JSON object per backup outcome
    #[arg(long)]
    json: bool,
}

struct App {
    monitor: BackupMonitor,
    backup_dir_explicit: bool,
    verbose: Option<bool>,
}

impl App {
    /// Switches to `path`; on failure the current file and backup dir stay.
    fn load(&mut self, path: &Path) -> Result<()> {
        let file = self
            .monitor
            .arm(path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        if !self.backup_dir_explicit {
            self.monitor.set_backup_dir(default_backup_dir(&file.path));
        }
        report::describe_file(&file);
        log(
            LogLevel::Info,
            &format!(
                "Backups go to {}",
                self.monitor.settings().backup_dir.display()
            ),
        );
        Ok(())
    }

    fn set_enabled(&self, enabled: bool) {
        if enabled {
            self.monitor.enable();
        } else {
            self.monitor.disable();
        }
        log_enabled(enabled);
    }

    fn status(&self) {
        let settings = self.monitor.settings();
        let state = if settings.enabled { "enabled" } else { "disabled" };
        log(LogLevel::Info, &format!("Status: {}", state));
        match self.monitor.current_file() {
            Some(file) => report::describe_file(&file),
            None => log(LogLevel::Warn, "No file loaded"),
        }
        println!("  backups:   {}", settings.backup_dir.display());
    }

    /// Runs one command; returns `false` when the user asked to quit.
    fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Start => self.set_enabled(true),
            Command::Stop => self.set_enabled(false),
            Command::Toggle => log_enabled(self.monitor.toggle()),
            Command::Status => self.status(),
            Command::Load(path) => {
                if let Err(e) = self.load(&path) {
                    log(LogLevel::Error, &format!("{:#}", e));
                }
            }
            Command::Dir(path) => {
                self.backup_dir_explicit = true;
                log(LogLevel::Info, &format!("Backups go to {}", path.display()));
                self.monitor.set_backup_dir(path);
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return false,
        }
        true
    }

    fn run_console(&mut self) -> Result<()> {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        loop {
            print!("> ");
            io::stdout().flush().context("Failed to write prompt")?;

            let Some(line) = lines.next() else {
                break;
            };
            let line = line.context("Failed to read command")?;
            if line.trim().is_empty() {
                continue;
            }

            match line.parse::<Command>() {
                Ok(command) => {
                    if !self.handle(command) {
                        break;
                    }
                }
                Err(e) => verbose_log(LogLevel::Error, &e.to_string(), self.verbose),
            }
        }
        Ok(())
    }
}

fn log_enabled(enabled: bool) {
    if enabled {
        log(LogLevel::Info, "File monitoring enabled.");
    } else {
        log(LogLevel::Info, "File monitoring disabled.");
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_default_config(Path::new(config::DEFAULT_CONFIG_FILE))?,
    };
    let settings = Settings::resolve(
        config,
        Overrides {
            path: cli.file,
            backup_dir: cli.backup_dir,
            start: cli.start,
            verbose: cli.verbose,
            json: cli.json,
        },
    )?;

    let verbose = Some(settings.verbose);
    if settings.verbose {
        log(LogLevel::Info, "Configuration loaded.");
    }

    let monitor = BackupMonitor::new(settings.backup_dir.clone(), verbose)
        .context("Failed to start backup worker")?;
    let json = settings.json;
    monitor.set_outcome_handler(move |file, outcome| {
        if json {
            report::print_json(file, outcome);
        } else {
            report::print_outcome(file, outcome, verbose);
        }
    });

    let mut app = App {
        monitor,
        backup_dir_explicit: settings.backup_dir_explicit,
        verbose,
    };
    app.load(&settings.path)?;

    if settings.enabled {
        app.set_enabled(true);
    } else {
        log(
            LogLevel::Info,
            "File monitoring disabled. Type `start` to begin, `help` for commands.",
        );
    }

    app.run_console()?;

    app.monitor.disarm();
    log(LogLevel::Info, "Stopped monitoring.");
    Ok(())
}
