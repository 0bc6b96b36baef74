use serde::{Deserialize, Serialize};

// One turn of the conversation
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

// What the browser posts to /api/chat
#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub model: Option<String>,
}

// Body sent to the chat completion API
#[derive(Serialize, Clone, Debug)]
pub struct UpstreamRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

impl UpstreamRequest {
    pub fn from_chat(request: ChatRequest, default_model: &str, system_prompt: Option<&str>) -> Self {
        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        if let Some(prompt) = system_prompt {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: prompt.to_string(),
            });
        }
        messages.extend(request.messages);

        Self {
            model: request
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_model.to_string()),
            messages,
            stream: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(content: &str) -> ChatMessage {
        ChatMessage {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn system_prompt_goes_first_and_stream_is_forced() {
        let request = ChatRequest {
            messages: vec![user("hi")],
            model: None,
        };
        let upstream = UpstreamRequest::from_chat(request, "gpt-4o-mini", Some("be brief"));

        assert_eq!(upstream.model, "gpt-4o-mini");
        assert!(upstream.stream);
        assert_eq!(upstream.messages.len(), 2);
        assert_eq!(upstream.messages[0].role, "system");
        assert_eq!(upstream.messages[1], user("hi"));
    }

    #[test]
    fn client_model_overrides_default() {
        let request: ChatRequest = serde_json::from_str(
            r#"{"messages":[{"role":"user","content":"hi"}],"model":"other-model"}"#,
        )
        .unwrap();
        let upstream = UpstreamRequest::from_chat(request, "gpt-4o-mini", None);

        assert_eq!(upstream.model, "other-model");
        assert_eq!(upstream.messages, vec![user("hi")]);
    }
}
