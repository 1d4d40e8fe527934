//! Token cost heuristic for generated code
//!
//! A deterministic score over the shape of a script, used only to debit a
//! user's usage balance.

use serde::Serialize;

const BASE_COST: u64 = 10;
const PER_LINE: u64 = 1;
const PER_DEPTH_LEVEL: u64 = 5;
const PER_FUNCTION: u64 = 3;
const PER_CLASS: u64 = 8;
const PER_LISTENER: u64 = 4;
const PER_ASYNC: u64 = 2;
const ERROR_HANDLING: u64 = 5;

/// Measurements the cost is computed from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeShape {
    pub lines: u64,
    pub max_depth: u64,
    pub functions: u64,
    pub classes: u64,
    pub listeners: u64,
    pub async_usages: u64,
    pub has_error_handling: bool,
}

/// Measure a script line by line
pub fn measure(code: &str) -> CodeShape {
    let mut shape = CodeShape::default();
    let mut depth: i64 = 0;

    for line in code.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        shape.lines += 1;

        shape.functions += count_occurrences(line, "function ")
            + count_occurrences(line, "function(")
            + count_occurrences(line, "=>");
        shape.classes += count_words(line, "class");
        shape.listeners += count_occurrences(line, ".on(") + count_occurrences(line, ".once(");
        shape.async_usages += count_words(line, "async") + count_words(line, "await");
        if line.contains("try {") || line.starts_with("try{") || line.contains(".catch(") {
            shape.has_error_handling = true;
        }

        for c in line.chars() {
            match c {
                '{' => {
                    depth += 1;
                    shape.max_depth = shape.max_depth.max(depth as u64);
                }
                '}' => depth = (depth - 1).max(0),
                _ => {}
            }
        }
    }

    shape
}

/// Cost of a script; identical input always yields the identical cost
pub fn estimate_cost(code: &str) -> u64 {
    cost_of(&measure(code))
}

pub fn cost_of(shape: &CodeShape) -> u64 {
    if shape.lines == 0 {
        return 0;
    }
    BASE_COST
        + shape.lines * PER_LINE
        + shape.max_depth * PER_DEPTH_LEVEL
        + shape.functions * PER_FUNCTION
        + shape.classes * PER_CLASS
        + shape.listeners * PER_LISTENER
        + shape.async_usages * PER_ASYNC
        + if shape.has_error_handling { ERROR_HANDLING } else { 0 }
}

fn count_occurrences(haystack: &str, needle: &str) -> u64 {
    haystack.matches(needle).count() as u64
}

fn count_words(line: &str, word: &str) -> u64 {
    line.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|token| *token == word)
        .count() as u64
}
