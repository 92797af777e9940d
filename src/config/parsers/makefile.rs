//! Simplified Makefile parser
//!
//! Handles enough of GNU make to map rules onto tasks: targets with
//! prerequisites, recipe lines with continuations and `.RECIPEPREFIX`,
//! `-` error suppression, and the common automatic variables. Rules
//! load under a `recipes` key and reuse the ds.toml task grammar.

use std::collections::VecDeque;

use serde_json::{json, Map, Value};

use crate::config::parsers::{ds_toml, FormatParser};
use crate::config::Config;
use crate::error::{ConfigError, ConfigResult};
use crate::runner::Tasks;
use crate::search::GlobMatches;
use crate::ui;

#[derive(Default)]
struct Recipe {
    help: Option<String>,
    keep_going: bool,
    composite: Vec<String>,
    shell: String,
}

pub struct Makefile;

impl FormatParser for Makefile {
    fn loads(&self, text: &str) -> ConfigResult<Value> {
        Ok(loads(text))
    }

    fn parse_workspace(&self, _config: &Config) -> ConfigResult<GlobMatches> {
        Err(ConfigError::Unsupported(
            "`Makefile` does not support workspaces.".to_string(),
        ))
    }

    fn parse_tasks(&self, config: &Config) -> ConfigResult<Tasks> {
        ds_toml::parse_tasks_at(config, "recipes")
    }
}

fn loads(text: &str) -> Value {
    ui::warn("EXPERIMENTAL: Parsing simplified `Makefile` format.");

    let mut recipes: Vec<(String, Recipe)> = Vec::new();
    let mut prefix = '\t';
    let mut targets: Vec<String> = Vec::new();
    let mut in_recipe = false;

    let mut lines: VecDeque<&str> = text.split('\n').collect();
    while let Some(next) = lines.pop_front() {
        let mut line = next.to_string();

        if in_recipe {
            if let Some(rest) = line.strip_prefix(prefix) {
                let mut rest = rest.to_string();
                // backslash/newline pairs are preserved inside recipes
                while rest.ends_with('\\') {
                    let Some(next) = lines.pop_front() else { break };
                    rest.push('\n');
                    rest.push_str(next.strip_prefix(prefix).unwrap_or(next));
                }

                let rest = match rest.strip_prefix('-') {
                    Some(stripped) => {
                        for target in &targets {
                            if let Some(recipe) = entry(&mut recipes, target) {
                                recipe.keep_going = true;
                            }
                        }
                        stripped.to_string()
                    }
                    None => rest,
                };
                for target in &targets {
                    if let Some(recipe) = entry(&mut recipes, target) {
                        recipe.shell.push_str(&rest);
                        recipe.shell.push('\n');
                    }
                }
                continue;
            }
            // an unprefixed line ends the recipe and is reparsed below
            targets.clear();
            in_recipe = false;
        }

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // outside recipes, continuations collapse into single spaces
        while line.ends_with('\\') {
            let Some(next) = lines.pop_front() else { break };
            line.pop();
            line = format!("{} {}", line.trim_end(), next.trim_start());
        }

        if line.starts_with(".PHONY") {
            // every target is treated as phony
            continue;
        }
        if line.starts_with(".RECIPEPREFIX") {
            let (_, value) = key_val(&line);
            prefix = value.chars().next().unwrap_or('\t');
            continue;
        }

        if let Some((names, rest)) = line.split_once(':') {
            // {target1} {target2} : {dep1} {dep2} ; {cmd} # {help}
            in_recipe = true;
            targets = names.split_whitespace().map(str::to_string).collect();
            for target in &targets {
                start_rule(&mut recipes, target);
            }

            // non-standard: a comment on the rule line is its description
            let rest = match rest.split_once('#') {
                Some((before, comment)) => {
                    for target in &targets {
                        if let Some(recipe) = entry(&mut recipes, target) {
                            recipe.help = Some(comment.trim().to_string());
                        }
                    }
                    before.to_string()
                }
                None => rest.to_string(),
            };

            // the first recipe line may follow a semicolon
            let rest = match rest.split_once(';') {
                Some((before, cmd)) => {
                    for target in &targets {
                        if let Some(recipe) = entry(&mut recipes, target) {
                            recipe.shell.push_str(cmd);
                            recipe.shell.push('\n');
                        }
                    }
                    before.to_string()
                }
                None => rest,
            };

            for dep in rest.split_whitespace() {
                let dep = match dep.strip_prefix('-') {
                    Some(stripped) => format!("+{stripped}"),
                    None => dep.to_string(),
                };
                for target in &targets {
                    if let Some(recipe) = entry(&mut recipes, target) {
                        recipe.composite.push(dep.clone());
                    }
                }
            }
        }
    }

    // substitute the common automatic variables
    for (name, recipe) in recipes.iter_mut() {
        let mut cmd = recipe.shell.replace("$@", name);
        if let Some(first) = recipe.composite.first() {
            cmd = cmd.replace("$<", first);
        }
        cmd = cmd.replace("$?", &recipe.composite.join(" "));
        let mut unique: Vec<&str> = Vec::new();
        for dep in &recipe.composite {
            if !unique.contains(&dep.as_str()) {
                unique.push(dep);
            }
        }
        cmd = cmd.replace("$^", &unique.join(" "));
        recipe.shell = cmd;
    }

    let mut doc = Map::new();
    for (name, recipe) in recipes {
        let mut rule = Map::new();
        rule.insert("composite".to_string(), json!(recipe.composite));
        rule.insert("shell".to_string(), json!(recipe.shell));
        rule.insert("verbatim".to_string(), json!(true));
        if let Some(help) = recipe.help {
            rule.insert("help".to_string(), json!(help));
        }
        if recipe.keep_going {
            rule.insert("keep_going".to_string(), json!(true));
        }
        doc.insert(name, Value::Object(rule));
    }
    json!({ "recipes": doc })
}

fn start_rule(recipes: &mut Vec<(String, Recipe)>, target: &str) {
    // a redefinition replaces the rule but keeps its position
    match recipes.iter_mut().find(|(name, _)| name == target) {
        Some((_, recipe)) => *recipe = Recipe::default(),
        None => recipes.push((target.to_string(), Recipe::default())),
    }
}

fn entry<'a>(recipes: &'a mut [(String, Recipe)], target: &str) -> Option<&'a mut Recipe> {
    recipes
        .iter_mut()
        .find(|(name, _)| name == target)
        .map(|(_, recipe)| recipe)
}

fn key_val(line: &str) -> (String, String) {
    let line = match line.split_once('#') {
        Some((before, _)) => before,
        None => line,
    };
    if let Some((key, value)) = line.split_once(" = ") {
        (key.to_string(), value.to_string())
    } else if let Some((key, value)) = line.split_once('=') {
        (key.to_string(), value.to_string())
    } else {
        (line.to_string(), String::new())
    }
}
