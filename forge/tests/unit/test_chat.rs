//! Chat client unit tests

use std::sync::Arc;

use botforge::chat::client::ChatClient;
use botforge::chat::cost::estimate_cost;
use botforge::chat::extract::extract_code_block;
use botforge::chat::prompt::SYSTEM_PROMPT;
use botforge::errors::ForgeError;
use botforge::http::retry::RetryPolicy;
use relay_models::{ChatMessage, ChatRole};
use serde_json::json;

use crate::mocks::{ctx, respond, Script, ScriptedChat};

fn user(content: &str) -> ChatMessage {
    ChatMessage {
        role: ChatRole::User,
        content: content.to_string(),
    }
}

fn client(chat: &Arc<ScriptedChat>) -> ChatClient {
    ChatClient::new(chat.clone(), RetryPolicy::chat(), "gpt-4o-mini".to_string())
}

#[test]
fn test_extracts_exact_code() {
    let code = extract_code_block("explanation ```javascript\nconsole.log(1)\n```");
    assert_eq!(code.as_deref(), Some("console.log(1)"));
    assert_eq!(extract_code_block("no code here, just words"), None);
    assert_eq!(extract_code_block("```\n\n```"), Some(String::new()));
}

#[test]
fn test_cost_is_deterministic() {
    let code = "client.on('messageCreate', async (msg) => {\n  try {\n    await msg.reply('pong');\n  } catch (e) {}\n});";
    assert_eq!(estimate_cost(code), estimate_cost(code));
    assert!(estimate_cost(code) > 0);
    assert_eq!(estimate_cost(""), 0);
}

#[tokio::test(start_paused = true)]
async fn test_completion_extracts_code_and_cost() {
    let reply = "Added a ping command.\n```javascript\nclient.on('ready', () => {});\n```";
    let chat = Arc::new(ScriptedChat::replying(reply));

    let completion = client(&chat)
        .get_completion(&ctx(), &[user("add a ping command")], None)
        .await
        .unwrap();

    assert_eq!(completion.content, reply);
    assert_eq!(completion.code.as_deref(), Some("client.on('ready', () => {});"));
    assert_eq!(
        completion.estimated_cost,
        estimate_cost("client.on('ready', () => {});")
    );

    let requests = chat.requests.lock().unwrap();
    assert_eq!(requests[0].model, "gpt-4o-mini");
    assert_eq!(requests[0].messages[0].role, ChatRole::System);
    assert_eq!(requests[0].messages[0].content, SYSTEM_PROMPT);
}

#[tokio::test(start_paused = true)]
async fn test_explanation_only_reply_costs_nothing() {
    let chat = Arc::new(ScriptedChat::replying("Discord bots need a token first."));
    let completion = client(&chat)
        .get_completion(&ctx(), &[user("how do I start?")], Some("gpt-4o"))
        .await
        .unwrap();
    assert_eq!(completion.code, None);
    assert_eq!(completion.estimated_cost, 0);
    assert_eq!(chat.requests.lock().unwrap()[0].model, "gpt-4o");
}

#[tokio::test(start_paused = true)]
async fn test_vendor_errors_are_classified() {
    let chat = Arc::new(ScriptedChat::with(Script::new(respond(
        400,
        json!({ "error": { "code": "context_length_exceeded", "message": "too long", "type": "invalid_request_error" } }),
    ))));
    let err = client(&chat)
        .get_completion(&ctx(), &[user("hi")], None)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::ContextTooLong));
    assert_eq!(chat.completions.calls(), 1);

    let chat = Arc::new(ScriptedChat::with(Script::new(respond(
        429,
        json!({ "error": { "code": "rate_limit_exceeded", "message": "slow down" } }),
    ))));
    let err = client(&chat)
        .get_completion(&ctx(), &[user("hi")], None)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::RateLimited));
}

#[tokio::test(start_paused = true)]
async fn test_secrets_never_reach_error_messages() {
    let chat = Arc::new(ScriptedChat::with(Script::new(respond(
        401,
        json!({ "error": { "message": "Incorrect API key provided: chat-secret" } }),
    ))));
    let ctx = ctx();
    let err = client(&chat)
        .get_completion(&ctx, &[user("hi")], None)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Authentication(_)));
    assert!(!err.to_string().contains("chat-secret"));
    assert!(ctx.entries().iter().all(|e| !e.message.contains("chat-secret")));
}

#[tokio::test(start_paused = true)]
async fn test_history_needs_a_user_message() {
    let chat = Arc::new(ScriptedChat::replying("unused"));
    let history = vec![ChatMessage {
        role: ChatRole::Assistant,
        content: "hello".to_string(),
    }];
    let err = client(&chat)
        .get_completion(&ctx(), &history, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ForgeError::Validation(_)));
    assert_eq!(chat.completions.calls(), 0);
}
