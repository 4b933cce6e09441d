//! Yes/no confirmation on the terminal.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use yakumo_core::{Error, Result};

/// Ask a yes/no question on stdin. `assume_yes` skips the prompt.
///
/// Anything other than `y`/`yes` (including end of input) is a no.
///
/// # Errors
///
/// Fails when stdin cannot be read.
pub async fn confirm(message: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }

    print!("{message} [y/N] ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .map_err(|e| Error::io(e, "reading confirmation"))?;
    Ok(is_yes(&line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
