use serde_json::{Map, Value};

/// Opaque key-value facts supplied by the chat provider.
pub type Attributes = Map<String, Value>;

/// A client-originated message as handed over by the ingress.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub conversation_id: String,
    pub client_id: String,
    pub text: String,
    pub client_profile: Attributes,
    pub client_integration_data: Attributes,
}

/// Per-invocation context. Built fresh for every inbound message and never
/// mutated while the pipeline runs.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    client_text: String,
    client_profile: String,
    client_integration_data: String,
    domain_knowledge: String,
}

impl ConversationContext {
    pub fn new(message: &InboundMessage, domain_knowledge: &str) -> Self {
        Self {
            client_text: message.text.trim().to_string(),
            client_profile: render_attributes(&message.client_profile),
            client_integration_data: render_attributes(&message.client_integration_data),
            domain_knowledge: domain_knowledge.to_string(),
        }
    }

    pub fn client_text(&self) -> &str {
        &self.client_text
    }

    /// Client profile rendered as sorted `key: value` lines.
    pub fn client_profile(&self) -> &str {
        &self.client_profile
    }

    pub fn client_integration_data(&self) -> &str {
        &self.client_integration_data
    }

    pub fn domain_knowledge(&self) -> &str {
        &self.domain_knowledge
    }

    /// Fact sources in priority order: profile, integration data, domain knowledge.
    pub fn fact_sources(&self) -> [&str; 3] {
        [
            &self.client_profile,
            &self.client_integration_data,
            &self.domain_knowledge,
        ]
    }

    /// Whether `fact` appears verbatim in one of the fact sources.
    ///
    /// Matching ignores case and collapses runs of whitespace, so a fact quoted
    /// across a line break in the domain knowledge still counts.
    pub fn is_grounded(&self, fact: &str) -> bool {
        let needle = normalize(fact);
        if needle.is_empty() {
            return false;
        }
        self.fact_sources()
            .iter()
            .any(|source| normalize(source).contains(&needle))
    }
}

/// Render attributes as `key: value` lines, sorted by key.
///
/// String values are written bare; everything else as compact JSON.
pub fn render_attributes(attributes: &Attributes) -> String {
    let mut keys: Vec<&String> = attributes.keys().collect();
    keys.sort();
    keys.into_iter()
        .map(|key| {
            let value = match &attributes[key.as_str()] {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{key}: {value}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Lowercase with whitespace runs collapsed to single spaces.
pub(crate) fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn attributes(value: Value) -> Attributes {
        value.as_object().cloned().unwrap_or_default()
    }

    fn message(profile: Value, integration: Value) -> InboundMessage {
        InboundMessage {
            conversation_id: "chat-1".to_string(),
            client_id: "client-1".to_string(),
            text: "  my VPN won't connect  ".to_string(),
            client_profile: attributes(profile),
            client_integration_data: attributes(integration),
        }
    }

    #[test]
    fn render_attributes_sorts_keys_and_keeps_strings_bare() {
        let rendered = render_attributes(&attributes(json!({
            "vpn_status": "disconnected",
            "devices": 2,
            "plan": {"name": "pro"}
        })));
        assert_eq!(
            rendered,
            "devices: 2\nplan: {\"name\":\"pro\"}\nvpn_status: disconnected"
        );
    }

    #[test]
    fn context_trims_client_text() {
        let ctx = ConversationContext::new(&message(json!({}), json!({})), "");
        assert_eq!(ctx.client_text(), "my VPN won't connect");
    }

    #[test]
    fn profile_fact_is_grounded() {
        let ctx = ConversationContext::new(
            &message(json!({"vpn_status": "disconnected"}), json!({})),
            "",
        );
        assert!(ctx.is_grounded("vpn_status: disconnected"));
        assert!(ctx.is_grounded("VPN_STATUS:   disconnected"));
    }

    #[test]
    fn domain_knowledge_fact_spanning_lines_is_grounded() {
        let ctx = ConversationContext::new(
            &message(json!({}), json!({})),
            "Refunds are processed\nwithin 14 days.",
        );
        assert!(ctx.is_grounded("Refunds are processed within 14 days."));
    }

    #[test]
    fn paraphrased_or_empty_fact_is_not_grounded() {
        let ctx = ConversationContext::new(
            &message(json!({"vpn_status": "disconnected"}), json!({"tariff": "basic"})),
            "",
        );
        assert!(!ctx.is_grounded("the VPN is offline"));
        assert!(!ctx.is_grounded("   "));
        assert!(ctx.is_grounded("tariff: basic"));
    }
}
