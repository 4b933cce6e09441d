//! Configured command sequences.

use crate::command::{CommandHandler, join_passthrough, split_passthrough};
use crate::error::Result;
use crate::session::Session;
use async_trait::async_trait;

/// A command that runs a fixed list of other commands in order.
///
/// Each step is a command line split on whitespace: the first token names
/// the command, the rest are its arguments. The arguments given to the
/// pipeline itself are appended to every step, so `yakumo release core`
/// runs each step against `core`. Execution stops at the first failing
/// step.
#[derive(Debug, Clone)]
pub struct Pipeline {
    name: String,
    steps: Vec<String>,
}

impl Pipeline {
    /// Create a pipeline command.
    #[must_use]
    pub const fn new(name: String, steps: Vec<String>) -> Self {
        Self { name, steps }
    }

    /// The steps, as configured.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

/// Split a step into its command name and arguments.
#[must_use]
pub fn parse_step(step: &str) -> Option<(String, Vec<String>)> {
    let mut tokens = step.split_whitespace().map(str::to_string);
    let name = tokens.next()?;
    Some((name, tokens.collect()))
}

/// Step tokens followed by the pipeline's own, with both passthrough
/// lists merged behind a single `--`.
fn step_args(step: Vec<String>, options: &[String], passthrough: &[String]) -> Vec<String> {
    let (mut step_options, mut step_passthrough) = split_passthrough(step);
    step_options.extend_from_slice(options);
    step_passthrough.extend_from_slice(passthrough);
    join_passthrough(step_options, step_passthrough)
}

#[async_trait]
impl CommandHandler for Pipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn manual(&self) -> bool {
        true
    }

    fn forwards_options(&self) -> bool {
        true
    }

    async fn run(&self, session: &mut Session<'_>) -> Result<()> {
        for step in &self.steps {
            let Some((name, args)) = parse_step(step) else {
                continue;
            };
            let args = step_args(args, &session.argv.options, &session.argv.passthrough);
            tracing::info!(pipeline = %self.name, step = %step, "Running pipeline step");
            session.execute(&name, args).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_step() {
        assert_eq!(
            parse_step("  version   --patch core "),
            Some(("version".to_string(), vec!["--patch".to_string(), "core".to_string()]))
        );
        assert_eq!(parse_step("publish"), Some(("publish".to_string(), Vec::new())));
        assert_eq!(parse_step("   "), None);
    }

    fn tokens(s: &str) -> Vec<String> {
        s.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn test_step_args_append_pipeline_arguments() {
        assert_eq!(
            step_args(tokens("--patch"), &tokens("core -y"), &[]),
            tokens("--patch core -y")
        );
        assert_eq!(
            step_args(tokens("-- build"), &tokens("a"), &tokens("--watch")),
            tokens("a -- build --watch")
        );
        assert_eq!(step_args(Vec::new(), &[], &[]), Vec::<String>::new());
    }
}
