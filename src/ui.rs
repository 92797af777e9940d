//! Terminal output and command formatting

use std::sync::atomic::{AtomicBool, Ordering};

use colored::Colorize;

use crate::syntax::{peek_end, SHELL_BREAK, SHELL_CONTINUE, SHELL_TERMINATORS};

/// Indent for wrapped continuation lines.
const WRAP_INDENT: usize = 2;

static DEBUG: AtomicBool = AtomicBool::new(false);

/// Enable or disable debug output for the whole process.
pub fn set_debug(enabled: bool) {
    DEBUG.store(enabled, Ordering::Relaxed);
}

/// Whether debug output is enabled.
pub fn debug_enabled() -> bool {
    DEBUG.load(Ordering::Relaxed)
}

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!("{} {}", "ERROR:".red().bold(), message);
}

/// Print a warning message to stderr.
pub fn warn(message: &str) {
    eprintln!("{} {}", "WARNING:".yellow().bold(), message);
}

/// Print an informational message to stderr (debug mode only).
pub fn info(message: &str) {
    if debug_enabled() {
        eprintln!("{} {}", "INFO:".cyan(), message);
    }
}

/// Print a debug message to stderr (debug mode only).
pub fn debug(message: &str) {
    if debug_enabled() {
        eprintln!("{} {}", "DEBUG:".dimmed(), message);
    }
}

/// Target width for wrapped commands.
///
/// Tracks the terminal, clamped to 80..=100 columns.
pub fn default_width() -> usize {
    match crossterm::terminal::size() {
        Ok((columns, _)) => (columns as usize).saturating_sub(2).clamp(80, 100),
        Err(_) => 80,
    }
}

/// Return a nicely wrapped version of a shell command.
pub fn wrap_cmd(cmd: &str) -> String {
    wrap_cmd_width(cmd, default_width(), WRAP_INDENT)
}

/// Wrap a shell command to `width` columns.
///
/// Breaks preferentially after `;` and `&&`, adds a line continuation
/// when a break lands mid-expression, and indents continuation lines.
/// Quoted substrings are never split. Purely presentational.
pub fn wrap_cmd_width(cmd: &str, width: usize, indent: usize) -> String {
    let space = " ".repeat(indent);
    let mut result = String::new();
    let mut line = String::new();

    let flat = cmd.replace(SHELL_CONTINUE, "");
    for item in split_outside_quotes(flat.trim()) {
        let check = if line.is_empty() {
            item.clone()
        } else {
            format!("{line} {item}")
        };
        if check.len() <= width {
            line = check;
            if peek_end(&line, SHELL_BREAK).is_some() {
                result.push_str(&line);
                result.push('\n');
                line.clear();
            }
            continue;
        }

        result.push_str(&line);
        line = item;

        // No continuation is needed after a terminator.
        if peek_end(&line, SHELL_TERMINATORS).is_some() {
            result.push('\n');
        } else {
            result.push(' ');
            result.push_str(SHELL_CONTINUE);
        }

        if !space.is_empty() && peek_end(&line, SHELL_BREAK).is_none() {
            line = format!("{space}{line}");
        }
    }
    if !line.is_empty() {
        result.push_str(&line);
    }

    result
        .replace('\n', &format!("\n{space}"))
        .trim()
        .to_string()
}

/// Split on whitespace, keeping quoted substrings intact.
fn split_outside_quotes(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut buf = String::new();
    let mut quote: Option<char> = None;
    for ch in text.chars() {
        match quote {
            Some(q) => {
                buf.push(ch);
                if ch == q {
                    quote = None;
                }
            }
            None if ch == '\'' || ch == '"' => {
                quote = Some(ch);
                buf.push(ch);
            }
            None if ch.is_whitespace() => {
                if !buf.is_empty() {
                    items.push(std::mem::take(&mut buf));
                }
            }
            None => buf.push(ch),
        }
    }
    if !buf.is_empty() {
        items.push(buf);
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_command_unchanged() {
        assert_eq!(wrap_cmd_width("ls -la", 80, 2), "ls -la");
    }

    #[test]
    fn test_break_after_semicolon() {
        assert_eq!(wrap_cmd_width("cd /tmp; ls", 80, 2), "cd /tmp;\n  ls");
    }

    #[test]
    fn test_continuation_and_indent() {
        assert_eq!(
            wrap_cmd_width("echo aaaa && echo bbbb", 10, 2),
            "echo aaaa\n  && echo \\\n    bbbb"
        );
    }

    #[test]
    fn test_quoted_text_stays_together() {
        assert_eq!(
            wrap_cmd_width("echo 'hello world of quotes'", 10, 2),
            "echo \\\n    'hello world of quotes'"
        );
    }

    #[test]
    fn test_existing_continuations_removed() {
        assert_eq!(wrap_cmd_width("ls \\\n-la", 80, 2), "ls -la");
    }

    #[test]
    fn test_split_outside_quotes() {
        assert_eq!(
            split_outside_quotes(r#"a "b c" d"#),
            vec!["a", "\"b c\"", "d"]
        );
        assert_eq!(split_outside_quotes("  a   b "), vec!["a", "b"]);
    }
}
