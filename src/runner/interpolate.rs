//! Argument interpolation for task commands
//!
//! Replaces `$1`, `$@`, and `${n:-default}` placeholders in a command
//! with arguments supplied on the command line or by a composite step.

use crate::error::{InterpolationError, InterpolationResult};

/// One placeholder found in a command.
///
/// Covers `$@`, `$1`, `${@}`, `${1}`, and `${1:-default}`. The default
/// ends at the first closing brace and cannot span lines.
#[derive(Debug, PartialEq)]
struct Placeholder<'a> {
    start: usize,
    end: usize,
    target: Target,
    default: Option<&'a str>,
}

/// What a placeholder refers to.
#[derive(Debug, PartialEq)]
enum Target {
    /// A single argument, 1-based.
    Index(usize),
    /// All arguments not yet consumed (`@`).
    Rest,
}

/// Whether a string contains any argument placeholders.
pub fn has_arg_placeholder(s: &str) -> bool {
    next_placeholder(s, 0).is_some()
}

/// Find the first placeholder at or after `from`.
fn next_placeholder(cmd: &str, from: usize) -> Option<Placeholder<'_>> {
    let bytes = cmd.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        // a `$` that does not start a placeholder stays literal
        if bytes[i] == b'$' {
            if let Some(found) = placeholder_at(cmd, i) {
                return Some(found);
            }
        }
        i += 1;
    }
    None
}

/// Parse the placeholder whose `$` sits at `start`, if there is one.
fn placeholder_at(cmd: &str, start: usize) -> Option<Placeholder<'_>> {
    let bytes = cmd.as_bytes();
    let mut i = start + 1;

    match bytes.get(i) {
        Some(b'@') => {
            return Some(Placeholder {
                start,
                end: i + 1,
                target: Target::Rest,
                default: None,
            })
        }
        Some(b'0'..=b'9') => {
            let (number, end) = scan_number(cmd, i);
            return Some(Placeholder {
                start,
                end,
                target: Target::Index(number),
                default: None,
            });
        }
        Some(b'{') => i += 1,
        _ => return None,
    }

    let target = match bytes.get(i) {
        Some(b'@') => {
            i += 1;
            Target::Rest
        }
        Some(b'0'..=b'9') => {
            let (number, end) = scan_number(cmd, i);
            i = end;
            Target::Index(number)
        }
        _ => return None,
    };

    match bytes.get(i) {
        Some(b'}') => Some(Placeholder {
            start,
            end: i + 1,
            target,
            default: None,
        }),
        Some(b':') if bytes.get(i + 1) == Some(&b'-') => {
            let value = i + 2;
            let mut j = value;
            while j < bytes.len() && bytes[j] != b'}' && bytes[j] != b'\n' {
                j += 1;
            }
            if bytes.get(j) != Some(&b'}') {
                return None;
            }
            Some(Placeholder {
                start,
                end: j + 1,
                target,
                default: Some(&cmd[value..j]),
            })
        }
        _ => None,
    }
}

/// Read a run of digits starting at `from`; out-of-range numbers
/// collapse to 0, which no argument can satisfy.
fn scan_number(cmd: &str, from: usize) -> (usize, usize) {
    let bytes = cmd.as_bytes();
    let mut end = from;
    while matches!(bytes.get(end), Some(b'0'..=b'9')) {
        end += 1;
    }
    (cmd[from..end].parse().unwrap_or(0), end)
}

/// Interpolate `args` into `cmd`.
///
/// `$n` takes the nth argument (1-based) and marks it consumed; `$@`
/// takes all unconsumed arguments. If `cmd` has no placeholders, all
/// arguments are appended to the end. A numbered placeholder without
/// a default fails when there are not enough arguments.
pub fn interpolate_args(cmd: &str, args: &[String]) -> InterpolationResult<String> {
    let mut not_done: Vec<Option<&str>> = args.iter().map(|arg| Some(arg.as_str())).collect();

    // `pdm`-style placeholders.
    let cmd = cmd.replace("{args}", "${@}").replace("{args:", "${@:-");

    let cmd = if has_arg_placeholder(&cmd) {
        cmd
    } else {
        format!("{cmd} $@")
    };

    let mut result = String::with_capacity(cmd.len());
    let mut last = 0;
    while let Some(found) = next_placeholder(&cmd, last) {
        result.push_str(&cmd[last..found.start]);
        last = found.end;

        match found.target {
            Target::Rest => {
                let unused: Vec<&str> = not_done.iter().filter_map(|arg| *arg).collect();
                if unused.is_empty() {
                    result.push_str(found.default.unwrap_or(""));
                } else {
                    result.push_str(&unused.join(" "));
                }
            }
            Target::Index(number) => match number.checked_sub(1) {
                Some(idx) if idx < args.len() => {
                    not_done[idx] = None;
                    result.push_str(&args[idx]);
                }
                _ => match found.default {
                    Some(default) => result.push_str(default),
                    None => return Err(InterpolationError::MissingArgument(number)),
                },
            },
        }
    }
    result.push_str(&cmd[last..]);

    Ok(result.trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numbered_placeholder() {
        let result = interpolate_args("a ${1} c", &args(&["b"])).unwrap();
        assert_eq!(result, "a b c");
    }

    #[test]
    fn test_rest_takes_unconsumed() {
        let result = interpolate_args("a $1 ${@} $3 $@", &args(&["b", "c", "d"])).unwrap();
        assert_eq!(result, "a b c d d c");
    }

    #[test]
    fn test_missing_argument() {
        let result = interpolate_args("ls $1", &[]);
        assert!(matches!(
            result,
            Err(InterpolationError::MissingArgument(1))
        ));
    }

    #[test]
    fn test_zero_is_missing() {
        let result = interpolate_args("ls $0", &args(&["a"]));
        assert!(matches!(
            result,
            Err(InterpolationError::MissingArgument(0))
        ));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(interpolate_args("ls ${1:-foo}", &[]).unwrap(), "ls foo");
        assert_eq!(
            interpolate_args("ls ${1:-foo}", &args(&["bar"])).unwrap(),
            "ls bar"
        );
        assert_eq!(interpolate_args("ls ${1:-foo}", &args(&[""])).unwrap(), "ls");
    }

    #[test]
    fn test_default_ends_at_first_brace() {
        let result = interpolate_args("ls ${1:-a}b}", &[]).unwrap();
        assert_eq!(result, "ls ab}");
    }

    #[test]
    fn test_invalid_braces_stay_literal() {
        let result = interpolate_args("echo ${foo} $1", &args(&["a"])).unwrap();
        assert_eq!(result, "echo ${foo} a");
        assert_eq!(interpolate_args("echo $VAR $1", &args(&["a"])).unwrap(), "echo $VAR a");
    }

    #[test]
    fn test_implicit_append() {
        let result = interpolate_args("echo hi", &args(&["a", "b"])).unwrap();
        assert_eq!(result, "echo hi a b");
        assert_eq!(interpolate_args("echo hi", &[]).unwrap(), "echo hi");
    }

    #[test]
    fn test_pdm_style() {
        let result = interpolate_args("echo {args}", &args(&["x"])).unwrap();
        assert_eq!(result, "echo x");
        let result = interpolate_args("echo {args:-m all}", &[]).unwrap();
        assert_eq!(result, "echo -m all");
    }

    #[test]
    fn test_has_arg_placeholder() {
        assert!(has_arg_placeholder("echo $1"));
        assert!(has_arg_placeholder("echo ${@:-x}"));
        assert!(!has_arg_placeholder("echo $VAR"));
    }
}
