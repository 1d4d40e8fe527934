//! The fixed file set written into a bot's server

use serde_json::json;

use crate::errors::ForgeError;
use crate::models::upload::FileUploadJob;

pub const SCRIPT_PATH: &str = "index.js";
pub const MANIFEST_PATH: &str = "package.json";
const DISCORD_JS_VERSION: &str = "^14.14.1";

/// Bot script plus its `package.json`
pub fn bot_bundle(bot_name: &str, description: &str, code: &str) -> Result<Vec<FileUploadJob>, ForgeError> {
    if code.trim().is_empty() {
        return Err(ForgeError::Validation("bot code is empty".to_string()));
    }

    let manifest = json!({
        "name": package_name(bot_name),
        "version": "1.0.0",
        "description": description,
        "main": SCRIPT_PATH,
        "scripts": { "start": format!("node {}", SCRIPT_PATH) },
        "dependencies": { "discord.js": DISCORD_JS_VERSION },
        "engines": { "node": ">=18" }
    });

    Ok(vec![
        FileUploadJob::new(SCRIPT_PATH, code),
        FileUploadJob::new(MANIFEST_PATH, serde_json::to_string_pretty(&manifest)?),
    ])
}

/// npm-compatible package name: lowercase, `-` separated, at most 214 chars
pub fn package_name(bot_name: &str) -> String {
    let mut name = String::with_capacity(bot_name.len());
    for c in bot_name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            name.push(c.to_ascii_lowercase());
        } else if !name.ends_with('-') && !name.is_empty() {
            name.push('-');
        }
    }
    let name = name.trim_end_matches('-');
    if name.is_empty() {
        return "discord-bot".to_string();
    }
    name.chars().take(214).collect()
}
