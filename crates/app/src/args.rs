use std::fmt;
use std::path::PathBuf;

use practice_core::model::{SubjectId, TopicId};
use storage::http::{DEFAULT_API_URL, HttpConfig};

#[derive(Debug, PartialEq, Eq)]
pub enum ArgsError {
    MissingValue { flag: &'static str },
    MissingArg { name: &'static str },
    UnknownArg(String),
    UnknownCommand(String),
    InvalidId { flag: &'static str, raw: String },
    InvalidLevel { raw: String },
    InvalidApiUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingArg { name } => write!(f, "missing required {name}"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::UnknownCommand(cmd) => write!(f, "unknown subcommand: {cmd}"),
            ArgsError::InvalidId { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidLevel { raw } => write!(f, "invalid --level value: {raw}"),
            ArgsError::InvalidApiUrl { raw } => write!(f, "invalid --api value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_id<T: std::str::FromStr>(raw: String, flag: &'static str) -> Result<T, ArgsError> {
    raw.parse().map_err(|_| ArgsError::InvalidId { flag, raw })
}

fn env_id<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|value| value.parse().ok())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive practice on a topic.
    Practice,
    /// Print a subject's levels and their unlock state.
    Overview,
    /// Print review lines for a bulk-import file.
    Preview { file: PathBuf },
    /// Create the valid lines of a bulk-import file on a topic.
    Import { file: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Args {
    pub command: Command,
    pub http: HttpConfig,
    pub topic_id: Option<TopicId>,
    pub subject_id: Option<SubjectId>,
    pub title: Option<String>,
    pub level: u32,
}

impl Args {
    /// Parse the command line, with `PRACTICE_*` environment variables as defaults.
    ///
    /// # Errors
    ///
    /// Returns `ArgsError` for unknown flags, missing values or unparseable ids.
    pub fn parse(argv: impl IntoIterator<Item = String>) -> Result<Self, ArgsError> {
        let mut args = argv.into_iter().peekable();

        // Flags without a subcommand mean `practice`.
        let explicit = args.peek().is_some_and(|first| !first.starts_with('-'));
        let command = match args.next_if(|_| explicit) {
            Some(command) => command,
            None => "practice".to_string(),
        };
        let command = match command.as_str() {
            "practice" => Command::Practice,
            "overview" => Command::Overview,
            "preview" | "import" => {
                let file = args
                    .next_if(|arg| !arg.starts_with('-'))
                    .map(PathBuf::from)
                    .ok_or(ArgsError::MissingArg { name: "<file>" })?;
                if command == "preview" {
                    Command::Preview { file }
                } else {
                    Command::Import { file }
                }
            }
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        let mut parsed = Self {
            command,
            http: HttpConfig::from_env(),
            topic_id: env_id("PRACTICE_TOPIC_ID"),
            subject_id: env_id("PRACTICE_SUBJECT_ID"),
            title: None,
            level: 1,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--api" => {
                    let value = require_value(&mut args, "--api")?;
                    if !value.starts_with("http://") && !value.starts_with("https://") {
                        return Err(ArgsError::InvalidApiUrl { raw: value });
                    }
                    parsed.http.base_url = value;
                }
                "--token" => {
                    let value = require_value(&mut args, "--token")?;
                    parsed.http = parsed.http.with_token(Some(value));
                }
                "--topic-id" => {
                    let value = require_value(&mut args, "--topic-id")?;
                    parsed.topic_id = Some(parse_id(value, "--topic-id")?);
                }
                "--subject-id" => {
                    let value = require_value(&mut args, "--subject-id")?;
                    parsed.subject_id = Some(parse_id(value, "--subject-id")?);
                }
                "--title" => parsed.title = Some(require_value(&mut args, "--title")?),
                "--level" => {
                    let value = require_value(&mut args, "--level")?;
                    parsed.level = value
                        .parse()
                        .ok()
                        .filter(|level| *level >= 1)
                        .ok_or(ArgsError::InvalidLevel { raw: value })?;
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    /// # Errors
    ///
    /// Returns `ArgsError::MissingArg` when no topic was given.
    pub fn require_topic(&self) -> Result<TopicId, ArgsError> {
        self.topic_id.ok_or(ArgsError::MissingArg { name: "--topic-id" })
    }

    /// # Errors
    ///
    /// Returns `ArgsError::MissingArg` when no subject was given.
    pub fn require_subject(&self) -> Result<SubjectId, ArgsError> {
        self.subject_id.ok_or(ArgsError::MissingArg { name: "--subject-id" })
    }
}

pub fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- practice --topic-id <id> [--subject-id <id>]");
    eprintln!("  cargo run -p app -- overview --subject-id <id>");
    eprintln!("  cargo run -p app -- preview <file> [--title <text>]");
    eprintln!("  cargo run -p app -- import <file> --topic-id <id> [--level <n>] [--title <text>]");
    eprintln!();
    eprintln!("Common flags:");
    eprintln!("  --api <url>      (default {DEFAULT_API_URL})");
    eprintln!("  --token <token>");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PRACTICE_API_URL, PRACTICE_API_TOKEN, PRACTICE_TOPIC_ID, PRACTICE_SUBJECT_ID");
    eprintln!("  RUST_LOG (default info)");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, ArgsError> {
        Args::parse(args.iter().map(ToString::to_string))
    }

    #[test]
    fn defaults_to_practice() {
        let args = parse(&["--topic-id", "5"]).unwrap();
        assert_eq!(args.command, Command::Practice);
        assert_eq!(args.require_topic(), Ok(TopicId::new(5)));
        assert_eq!(args.level, 1);
    }

    #[test]
    fn import_takes_file_and_level() {
        let args = parse(&["import", "preguntas.txt", "--topic-id", "2", "--level", "3"]).unwrap();
        assert_eq!(
            args.command,
            Command::Import {
                file: PathBuf::from("preguntas.txt")
            }
        );
        assert_eq!(args.level, 3);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!(
            parse(&["preview"]).unwrap_err(),
            ArgsError::MissingArg { name: "<file>" }
        );
        assert_eq!(
            parse(&["--topic-id", "x"]).unwrap_err(),
            ArgsError::InvalidId {
                flag: "--topic-id",
                raw: "x".into()
            }
        );
        assert_eq!(
            parse(&["import", "f", "--level", "0"]).unwrap_err(),
            ArgsError::InvalidLevel { raw: "0".into() }
        );
        assert_eq!(
            parse(&["--api", "localhost"]).unwrap_err(),
            ArgsError::InvalidApiUrl {
                raw: "localhost".into()
            }
        );
        assert_eq!(
            parse(&["serve"]).unwrap_err(),
            ArgsError::UnknownCommand("serve".into())
        );
    }

    #[test]
    fn token_flag_sets_bearer_token() {
        let args = parse(&["overview", "--token", "abc"]).unwrap();
        assert_eq!(args.http.token.as_deref(), Some("abc"));
    }
}
