//! Line-oriented command shell over a string cache.
//!
//! # Commands
//! - `put <key> <value>` - Store a value (the value may contain spaces)
//! - `get <key>` - Look a key up in both tiers
//! - `del <key>` - Invalidate a key
//! - `clear` - Invalidate everything
//! - `size` - Entries across both tiers
//! - `stats` - Counters as JSON
//! - `quit` - Leave the shell

use crate::error::Result;
use crate::two_level::TwoLevelCache;

/// Cache type driven by the shell.
pub type StringCache = TwoLevelCache<String, String>;

/// One parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Put { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Clear,
    Size,
    Stats,
    Quit,
}

impl Command {
    /// Parses one input line.
    ///
    /// Returns `Ok(None)` for blank lines and an error message for anything
    /// unrecognized.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let command = match (verb.to_ascii_lowercase().as_str(), rest) {
            ("put" | "set", rest) => match rest.split_once(char::is_whitespace) {
                Some((key, value)) => Self::Put {
                    key: key.to_string(),
                    value: value.trim().to_string(),
                },
                None => return Err("usage: put <key> <value>".to_string()),
            },
            ("get", key) if is_single_word(key) => Self::Get {
                key: key.to_string(),
            },
            ("del" | "delete", key) if is_single_word(key) => Self::Delete {
                key: key.to_string(),
            },
            ("clear", "") => Self::Clear,
            ("size", "") => Self::Size,
            ("stats", "") => Self::Stats,
            ("quit" | "exit", "") => Self::Quit,
            _ => return Err(format!("unrecognized command: {}", line)),
        };
        Ok(Some(command))
    }
}

fn is_single_word(s: &str) -> bool {
    !s.is_empty() && !s.contains(char::is_whitespace)
}

/// Runs a command against the cache and renders the reply.
///
/// Blocks on disk I/O; async callers should run it on a blocking thread.
pub fn execute(cache: &StringCache, command: Command) -> Result<String> {
    let reply = match command {
        Command::Put { key, value } => {
            cache.put(key.clone(), value)?;
            format!("OK {}", key)
        }
        Command::Get { key } => match cache.get(&key)? {
            Some(value) => value,
            None => "(nil)".to_string(),
        },
        Command::Delete { key } => {
            cache.invalidate(&key)?;
            format!("OK {}", key)
        }
        Command::Clear => {
            cache.invalidate_all()?;
            "OK".to_string()
        }
        Command::Size => cache.size()?.to_string(),
        Command::Stats => serde_json::to_string_pretty(&cache.stats())?,
        Command::Quit => "bye".to_string(),
    };
    Ok(reply)
}
