use chrono::Local;
use colored::*;

/// Enum representing the log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
    Debug,
}

pub fn verbose_log(level: LogLevel, message: &str, verbose: Option<bool>) {
    match verbose {
        Some(true) => {
            log(level, message);
        }
        _ => {
            match level {
                LogLevel::Info | LogLevel::Warn | LogLevel::Error => log(level, message),
                _ => {} // Skip Debug level logs if not verbose
            }
        }
    }
}

/// Logs messages to the console, prefixed with the local time
pub fn log(level: LogLevel, message: &str) {
    let line = format_line(level, message);
    match level {
        LogLevel::Info => println!("{}", line.green()),
        LogLevel::Warn => eprintln!("{}", line.yellow()),
        LogLevel::Error => eprintln!("{}", line.red()),
        LogLevel::Debug => println!("{}", line.dimmed()),
    }
}

fn format_line(level: LogLevel, message: &str) -> String {
    let tag = match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
        LogLevel::Debug => "DEBUG",
    };
    format!("[{}] [{}] {}", Local::now().format("%H:%M:%S"), tag, message)
}
