//! Shows a prompt and reads one line from stdin, the same shape as
//! `utils::prompt::prompt` in the original `mutils` command mains. furgfs
//! never hides input (there are no passwords in this domain), so the
//! termios dance that function does is dropped.

use std::fmt;
use std::io::{self, BufRead, Write};

/// Shows `prompt`, then returns the next line read from stdin, or `None` on
/// EOF.
pub fn prompt<P: fmt::Display>(prompt: P) -> Option<String> {
    print!("{prompt}");
    let _ = io::stdout().flush();

    let line = io::stdin().lock().lines().next()?.unwrap_or_default();
    Some(line)
}
