use anyhow::{bail, Result};
use std::path::PathBuf;
use std::str::FromStr;

pub const HELP: &str = "\
Commands:
  start          start backing up on every change
  stop           stop backing up (the file stays loaded)
  toggle         switch between start and stop
  status         show the loaded file and backup settings
  load <path>    monitor a different file
  dir <path>     back up into a different directory
  help           show this list
  quit           stop and exit";

/// A line typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    Status,
    Load(PathBuf),
    Dir(PathBuf),
    Help,
    Quit,
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "toggle" => Command::Toggle,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "load" | "dir" if rest.is_empty() => bail!("`{}` needs a path", word),
            "load" => Command::Load(PathBuf::from(unquote(rest))),
            "dir" => Command::Dir(PathBuf::from(unquote(rest))),
            "" => bail!("empty command"),
            other => bail!("unknown command `{}` (try `help`)", other),
        };
        Ok(command)
    }
}

// Paths with spaces are common ("Backup - map"), so allow them quoted.
fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
}
