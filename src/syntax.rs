//! Special markers in task definitions and command lines

/// Implicit start of task arguments on the command line.
pub const ARG_OPTION: &str = "-";

/// Explicit start of task arguments.
pub const ARG_BEG: &str = ":";

/// Explicit end of task arguments.
pub const ARG_END: &str = "--";

/// Match all current values.
pub const GLOB_ALL: &str = "*";

/// Prefix that excludes a glob match.
pub const GLOB_EXCLUDE: &str = "!";

/// Separator between glob patterns.
pub const GLOB_DELIMITER: &str = ";";

/// Separator between parts of a dotted key.
pub const KEY_DELIMITER: &str = ".";

/// Shell line continuation.
pub const SHELL_CONTINUE: &str = "\\\n";

/// No line continuation is needed after these.
pub const SHELL_TERMINATORS: &[&str] = &[";;", "&&", "|&", "||", ";", "&", "|"];

/// Prefer line breaks after these.
pub const SHELL_BREAK: &[&str] = &[";", "&&"];

/// Name given to composite steps; never looked up directly.
pub const TASK_COMPOSITE: &str = "#composite";

/// Prefix of a disabled task.
pub const TASK_DISABLED: &str = "#";

/// Name of the shared-options entry in a task section.
pub const TASK_SHARED: &str = "_";

/// Prefix of an error-suppressed task.
pub const TASK_KEEP_GOING: &str = "+";

/// Environment variable that carries the config path to child invocations.
pub const ENV_FILE_MARKER: &str = "DS_INTERNAL_FILE";

/// Return the first needle that ends `haystack`, if any.
pub fn peek_end<'a>(haystack: &str, needles: &[&'a str]) -> Option<&'a str> {
    needles.iter().copied().find(|n| haystack.ends_with(n))
}
