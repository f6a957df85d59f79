// ABOUTME: Chat-completions request encoding: messages, tool specs, and reasoning fields.
// ABOUTME: Command messages expand into an assistant tool_calls entry plus its tool result.

use serde_json::{Value, json};

use super::provider::ReasoningPolicy;
use crate::message::{Message, Role};
use crate::tools::ToolSpec;

/// Build the streaming request body for `<base_url>/chat/completions`.
pub fn build_request_body(
    model: &str,
    messages: &[Message],
    tools: &[ToolSpec],
    policy: ReasoningPolicy,
) -> Value {
    let mut body = json!({
        "model": model,
        "messages": messages_to_wire(messages, policy),
        "stream": true,
    });
    if !tools.is_empty() {
        body["tools"] = Value::Array(tools.iter().map(tool_to_wire).collect());
    }
    body
}

/// Encode a tool spec as a JSON-schema function definition.
pub fn tool_to_wire(tool: &ToolSpec) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}

/// Encode the conversation, skipping placeholder entries.
pub fn messages_to_wire(messages: &[Message], policy: ReasoningPolicy) -> Vec<Value> {
    let mut wire = Vec::with_capacity(messages.len());
    for msg in messages.iter().filter(|m| !m.pending) {
        match msg.role {
            Role::System => wire.push(json!({ "role": "system", "content": msg.content })),
            Role::User => wire.push(json!({ "role": "user", "content": msg.content })),
            Role::Assistant => {
                let mut entry = json!({ "role": "assistant", "content": msg.content });
                if policy == ReasoningPolicy::AllAssistant {
                    entry["reasoning_content"] = json!(msg.reasoning.clone().unwrap_or_default());
                }
                wire.push(entry);
            }
            Role::Command => {
                let Some(call) = &msg.tool_call else {
                    continue;
                };
                let mut entry = json!({
                    "role": "assistant",
                    "content": Value::Null,
                    "tool_calls": [{
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments,
                        }
                    }]
                });
                if policy != ReasoningPolicy::Omit {
                    entry["reasoning_content"] = json!(msg.reasoning.clone().unwrap_or_default());
                }
                wire.push(entry);
                wire.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": msg.tool_output.clone().unwrap_or_default(),
                }));
            }
        }
    }
    wire
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;

    fn conversation() -> Vec<Message> {
        let call = ToolCall::new("call-1", "get_system_info", r#"{"category":"disk"}"#);
        vec![
            Message::system("You manage servers."),
            Message::user("disk usage?"),
            Message::command(call, "/dev/sda1 40%", Some("check df".to_string())),
            Message::assistant_with_reasoning("Disk is 40% full.", Some("summarize".to_string())),
            Message::placeholder(),
        ]
    }

    #[test]
    fn body_has_required_fields() {
        let tools = vec![ToolSpec {
            name: "get_system_info".to_string(),
            description: "info".to_string(),
            parameters: json!({"type": "object"}),
        }];
        let body = build_request_body("gpt-4o", &conversation(), &tools, ReasoningPolicy::Omit);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["stream"], true);
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "get_system_info");
    }

    #[test]
    fn tools_omitted_when_empty() {
        let body = build_request_body("m", &conversation(), &[], ReasoningPolicy::Omit);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn command_expands_to_tool_call_and_result() {
        let wire = messages_to_wire(&conversation(), ReasoningPolicy::Omit);
        // system, user, assistant(tool_calls), tool, assistant; placeholder skipped
        assert_eq!(wire.len(), 5);
        assert_eq!(wire[2]["role"], "assistant");
        assert_eq!(wire[2]["tool_calls"][0]["id"], "call-1");
        assert_eq!(
            wire[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"category":"disk"}"#
        );
        assert_eq!(wire[3]["role"], "tool");
        assert_eq!(wire[3]["tool_call_id"], "call-1");
        assert_eq!(wire[3]["content"], "/dev/sda1 40%");
    }

    #[test]
    fn omit_policy_strips_reasoning() {
        let wire = messages_to_wire(&conversation(), ReasoningPolicy::Omit);
        assert!(wire.iter().all(|m| m.get("reasoning_content").is_none()));
    }

    #[test]
    fn tool_calls_only_policy() {
        let wire = messages_to_wire(&conversation(), ReasoningPolicy::ToolCallsOnly);
        assert_eq!(wire[2]["reasoning_content"], "check df");
        assert!(wire[4].get("reasoning_content").is_none());
    }

    #[test]
    fn all_assistant_policy_fills_every_assistant_message() {
        let mut messages = conversation();
        messages.push(Message::assistant("no reasoning here"));
        let wire = messages_to_wire(&messages, ReasoningPolicy::AllAssistant);
        assert_eq!(wire[2]["reasoning_content"], "check df");
        assert_eq!(wire[4]["reasoning_content"], "summarize");
        assert_eq!(wire[5]["reasoning_content"], "");
        assert!(wire[1].get("reasoning_content").is_none());
    }
}
