//! System instructions and preservation checks for generated bots

use std::collections::HashSet;

/// Fixed instructions prepended to every conversation
pub const SYSTEM_PROMPT: &str = r#"You are an assistant that writes Discord bots in JavaScript using discord.js v14.

Rules:
1. Never delete or rewrite existing code. Only append new commands and handlers.
2. Always answer with the complete bot script in a single ```javascript code block.
3. Read the bot token from process.env.TOKEN; never hard-code secrets.
4. Keep explanations short and place them before the code block.
5. If the request is not about the bot, answer without a code block."#;

/// Whether every non-blank line of `previous` still appears in `candidate`
///
/// The model is asked to only append, but nothing enforces it; callers use
/// this to spot replies that dropped existing code.
pub fn code_preserves(previous: &str, candidate: &str) -> bool {
    let kept: HashSet<&str> = candidate
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    previous
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .all(|line| kept.contains(line))
}

/// Lines of `previous` that `candidate` no longer contains
pub fn removed_lines<'a>(previous: &'a str, candidate: &str) -> Vec<&'a str> {
    let kept: HashSet<&str> = candidate.lines().map(str::trim).collect();
    previous
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !kept.contains(line))
        .collect()
}
