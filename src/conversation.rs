use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Shown when a response carries no usable output.
pub const NO_RESPONSE: &str = "No response received";

/// Shown when dispatching a message failed.
pub const DISPATCH_FAILED: &str = "Sorry, there was an error processing your message.";

/// A named endpoint messages can be sent to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub id: String,
    pub name: String,
    pub url: String,
}

/// The body posted to a webhook.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub chat_input: String,
    pub session_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub message: String,
    pub is_user: bool,
    pub timestamp: SystemTime,
}

/// Extract the reply text from a webhook response body.
///
/// Takes a truthy `output` from `[{"output": ..}, ..]` or `{"output": ..}`, or a bare JSON string. A body that
/// is not JSON at all counts as a failed exchange.
pub fn decode_response(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        log::warn!("response body is not JSON: {body:?}");
        return DISPATCH_FAILED.to_string();
    };
    let output = match &value {
        Value::Array(items) => items.first().and_then(|item| item.get("output")),
        Value::Object(_) => value.get("output"),
        Value::String(_) => Some(&value),
        _ => None,
    };
    match output {
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        Some(other) if is_truthy(other) => other.to_string(),
        _ => NO_RESPONSE.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Generate an id of the form `<prefix>_<unix millis>_<9 base36 chars>`.
pub fn generate_id(prefix: &str, rng: &mut fastrand::Rng) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let millis = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or_default();
    let suffix: String = (0..9).map(|_| ALPHABET[rng.usize(..ALPHABET.len())] as char).collect();
    format!("{prefix}_{millis}_{suffix}")
}

/// Conversation state owned by the host around the input widget.
#[derive(Debug)]
pub struct Conversation {
    session_id: String,
    messages: Vec<ChatMessage>,
    webhooks: Vec<Webhook>,
    default_webhook: Option<Webhook>,
    webhook_override: Option<Webhook>,
    rng: fastrand::Rng,
}

impl Conversation {
    pub fn new(webhooks: Vec<Webhook>, mut rng: fastrand::Rng) -> Self {
        let session_id = generate_id("session", &mut rng);
        let default_webhook = webhooks.first().cloned();
        Self { session_id, messages: Vec::new(), webhooks, default_webhook, webhook_override: None, rng }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Start over with a fresh session and no messages.
    pub fn reset(&mut self) {
        self.session_id = generate_id("session", &mut self.rng);
        self.messages.clear();
        log::info!("new conversation started with session {}", self.session_id);
    }

    pub fn push_message(&mut self, message: &str, is_user: bool) {
        let id = generate_id("msg", &mut self.rng);
        self.messages.push(ChatMessage { id, message: message.to_string(), is_user, timestamp: SystemTime::now() });
    }

    /// Webhooks offered by the command palette for input starting with `/`.
    pub fn palette_matches(&self, input: &str) -> Vec<&Webhook> {
        if self.webhook_override.is_some() {
            return Vec::new();
        }
        let Some(query) = input.strip_prefix('/') else {
            return Vec::new();
        };
        let query = query.to_lowercase();
        self.webhooks.iter().filter(|webhook| webhook.name.to_lowercase().contains(&query)).collect()
    }

    /// Route the next message to the named webhook. Returns whether it exists.
    pub fn select_webhook(&mut self, name: &str) -> bool {
        let selected = self.webhooks.iter().find(|webhook| webhook.name == name).cloned();
        let found = selected.is_some();
        if found {
            self.webhook_override = selected;
        }
        found
    }

    pub fn clear_override(&mut self) {
        self.webhook_override = None;
    }

    pub fn active_override(&self) -> Option<&Webhook> {
        self.webhook_override.as_ref()
    }

    /// Record a user message and build the request for it. The override only applies to one message.
    pub fn dispatch(&mut self, message: &str) -> (Option<Webhook>, ChatRequest) {
        self.push_message(message, true);
        let target = self.webhook_override.take().or_else(|| self.default_webhook.clone());
        let request = ChatRequest { chat_input: message.to_string(), session_id: self.session_id.clone() };
        (target, request)
    }
}
