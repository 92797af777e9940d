//! Task dependency cycle detection

use std::collections::HashSet;

use crate::error::{ConfigError, ConfigResult};
use crate::runner::task::Tasks;

/// Check the task graph for cycles.
///
/// Dependencies are matched by the first token of each step command;
/// names with no matching task are leaves. Returns the names in
/// dependency order.
pub fn check_cycles(tasks: &Tasks) -> ConfigResult<Vec<String>> {
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    for name in tasks.names() {
        let mut stack = Vec::new();
        visit(tasks, name, &mut visited, &mut stack, &mut order)?;
    }
    Ok(order)
}

/// Recursively check one task for cycles.
fn visit(
    tasks: &Tasks,
    name: &str,
    visited: &mut HashSet<String>,
    stack: &mut Vec<String>,
    order: &mut Vec<String>,
) -> ConfigResult<()> {
    if let Some(pos) = stack.iter().position(|n| n == name) {
        let mut cycle = stack[pos..].to_vec();
        cycle.push(name.to_string());
        return Err(ConfigError::Cycle(cycle));
    }
    if visited.contains(name) {
        return Ok(());
    }

    stack.push(name.to_string());
    if let Some(task) = tasks.get(name) {
        for dep in &task.depends {
            let first = shell_words::split(&dep.cmd)
                .ok()
                .and_then(|words| words.into_iter().next())
                .or_else(|| dep.cmd.split_whitespace().next().map(String::from));
            // Self-references are allowed; they refer to the shell.
            if let Some(other) = first.filter(|other| other != name) {
                visit(tasks, &other, visited, stack, order)?;
            }
        }
    }
    stack.pop();

    visited.insert(name.to_string());
    order.push(name.to_string());
    Ok(())
}
