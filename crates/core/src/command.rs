//! Command handlers and their parsed arguments.

use crate::error::{Error, Result};
use crate::session::Session;
use async_trait::async_trait;
use clap::{Arg, ArgAction, ArgMatches};

/// Id of the implicit positional list every command accepts.
pub const TARGETS: &str = "targets";

/// A named command that runs against a fresh workspace session.
///
/// # Example
///
/// ```ignore
/// struct Hello;
///
/// #[async_trait]
/// impl CommandHandler for Hello {
///     fn name(&self) -> &str { "hello" }
///     async fn run(&self, session: &mut Session<'_>) -> Result<()> {
///         tracing::info!(targets = ?session.argv.targets, "hello");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Command name as typed on the command line.
    fn name(&self) -> &str;

    /// Option schema. A trailing `targets` positional list is always added.
    fn args(&self) -> Vec<Arg> {
        Vec::new()
    }

    /// Whether positional targets are interpreted by the command itself
    /// rather than as workspace names.
    fn manual(&self) -> bool {
        false
    }

    /// Whether options are kept as raw tokens instead of being checked
    /// against [`CommandHandler::args`]. Commands that hand their
    /// arguments on to other commands set this.
    fn forwards_options(&self) -> bool {
        false
    }

    /// Run the command.
    async fn run(&self, session: &mut Session<'_>) -> Result<()>;
}

/// Arguments of one command invocation.
#[derive(Debug, Clone)]
pub struct Arguments {
    /// The command name.
    pub command: String,
    /// Positional arguments before `--`.
    pub targets: Vec<String>,
    /// Every token before the first `--`, verbatim.
    pub options: Vec<String>,
    /// Every token after the first `--`, verbatim.
    pub passthrough: Vec<String>,
    /// Parsed options.
    pub matches: ArgMatches,
}

impl Arguments {
    /// Parse `tokens` against a command's option schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Arguments`] when an option is unknown or malformed.
    pub fn parse(command: &str, schema: Vec<Arg>, tokens: Vec<String>) -> Result<Self> {
        let (options, passthrough) = split_passthrough(tokens);

        let cmd = clap::Command::new(command.to_string())
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .args(schema)
            .arg(
                Arg::new(TARGETS)
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .value_name("TARGETS"),
            );

        let matches = cmd
            .try_get_matches_from(&options)
            .map_err(|e| Error::Arguments {
                command: command.to_string(),
                message: e
                    .to_string()
                    .lines()
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches("error: ")
                    .to_string(),
            })?;

        let targets = matches
            .get_many::<String>(TARGETS)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            command: command.to_string(),
            targets,
            options,
            passthrough,
            matches,
        })
    }

    /// Keep `tokens` unparsed. Tokens not starting with `-` count as
    /// targets; no option is recognised.
    #[must_use]
    pub fn forwarding(command: &str, tokens: Vec<String>) -> Self {
        let (options, passthrough) = split_passthrough(tokens);
        let targets = options
            .iter()
            .filter(|token| !token.starts_with('-'))
            .cloned()
            .collect();
        Self {
            command: command.to_string(),
            targets,
            options,
            passthrough,
            matches: ArgMatches::default(),
        }
    }

    /// The invocation as tokens again: options, then `--` and the
    /// passthrough when there is any.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        join_passthrough(self.options.clone(), self.passthrough.clone())
    }

    /// Whether a boolean flag was set.
    #[must_use]
    pub fn flag(&self, id: &str) -> bool {
        self.matches
            .try_get_one::<bool>(id)
            .ok()
            .flatten()
            .copied()
            .unwrap_or(false)
    }

    /// The value of a string option.
    #[must_use]
    pub fn value(&self, id: &str) -> Option<&str> {
        self.matches
            .try_get_one::<String>(id)
            .ok()
            .flatten()
            .map(String::as_str)
    }

    /// The value of a typed option.
    #[must_use]
    pub fn get<T: Clone + Send + Sync + 'static>(&self, id: &str) -> Option<T> {
        self.matches.try_get_one::<T>(id).ok().flatten().cloned()
    }
}

/// Split tokens at the first literal `--`.
#[must_use]
pub fn split_passthrough(mut tokens: Vec<String>) -> (Vec<String>, Vec<String>) {
    match tokens.iter().position(|t| t == "--") {
        Some(index) => {
            let passthrough = tokens.split_off(index + 1);
            tokens.pop();
            (tokens, passthrough)
        }
        None => (tokens, Vec::new()),
    }
}

/// Inverse of [`split_passthrough`]. The separator is only added when
/// `passthrough` is non-empty.
#[must_use]
pub fn join_passthrough(mut options: Vec<String>, passthrough: Vec<String>) -> Vec<String> {
    if !passthrough.is_empty() {
        options.push("--".to_string());
        options.extend(passthrough);
    }
    options
}

/// A boolean flag with an optional single-character alias.
#[must_use]
pub fn flag(id: &'static str, short: Option<char>) -> Arg {
    let arg = Arg::new(id).long(id).action(ArgAction::SetTrue);
    match short {
        Some(c) => arg.short(c),
        None => arg,
    }
}

/// A string-valued option with an optional single-character alias.
#[must_use]
pub fn option(id: &'static str, short: Option<char>) -> Arg {
    let arg = Arg::new(id).long(id).num_args(1).action(ArgAction::Set);
    match short {
        Some(c) => arg.short(c),
        None => arg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_split_passthrough() {
        let (options, rest) = split_passthrough(tokens("a -x -- b -- c"));
        assert_eq!(options, ["a", "-x"]);
        assert_eq!(rest, ["b", "--", "c"]);

        let (options, rest) = split_passthrough(tokens("a b"));
        assert_eq!(options, ["a", "b"]);
        assert!(rest.is_empty());
    }

    #[test]
    fn test_parse_targets_flags_and_values() {
        let schema = vec![flag("major", Some('1')), flag("recursive", Some('r')), option("version", Some('v'))];
        let argv = Arguments::parse("version", schema, tokens("core -1 -r cli -- extra")).unwrap();
        assert_eq!(argv.targets, ["core", "cli"]);
        assert!(argv.flag("major"));
        assert!(argv.flag("recursive"));
        assert_eq!(argv.value("version"), None);
        assert_eq!(argv.passthrough, ["extra"]);
    }

    #[test]
    fn test_parse_value_option() {
        let schema = vec![option("version", Some('v'))];
        let argv = Arguments::parse("version", schema, tokens("-v 2.0.0 a")).unwrap();
        assert_eq!(argv.value("version"), Some("2.0.0"));
        assert_eq!(argv.targets, ["a"]);
    }

    #[test]
    fn test_forwarding_keeps_raw_tokens() {
        let argv = Arguments::forwarding("ci", tokens("core -p --tag next -- --watch"));
        assert_eq!(argv.targets, ["core", "next"]);
        assert_eq!(argv.options, ["core", "-p", "--tag", "next"]);
        assert_eq!(argv.passthrough, ["--watch"]);
        assert!(!argv.flag("p"));
        assert_eq!(argv.tokens(), tokens("core -p --tag next -- --watch"));
    }

    #[test]
    fn test_parse_keeps_option_tokens() {
        let schema = vec![flag("major", Some('1'))];
        let argv = Arguments::parse("version", schema, tokens("-1 core -- x")).unwrap();
        assert_eq!(argv.options, ["-1", "core"]);
        assert_eq!(argv.tokens(), tokens("-1 core -- x"));
    }

    #[test]
    fn test_unknown_flag_is_an_error() {
        let err = Arguments::parse("list", Vec::new(), tokens("--nope")).unwrap_err();
        assert!(matches!(err, Error::Arguments { .. }));
    }

    #[test]
    fn test_unknown_id_reads_as_unset() {
        let argv = Arguments::parse("list", Vec::new(), Vec::new()).unwrap();
        assert!(!argv.flag("anything"));
        assert!(argv.value("anything").is_none());
        assert!(argv.targets.is_empty());
    }
}
