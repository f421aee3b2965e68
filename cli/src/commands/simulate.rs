use clap::Args;
use serde_json::{Value, json};

use crate::util::{api_request, exit_error, parse_json_object};

#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Chatra chat id the message belongs to
    #[arg(long)]
    pub conversation: String,
    /// Chatra client id
    #[arg(long, default_value = "cli-client")]
    pub client_id: String,
    /// Message text
    #[arg(long)]
    pub text: String,
    /// Client card attributes as a JSON object
    #[arg(long)]
    pub profile: Option<String>,
    /// Integration data as a JSON object
    #[arg(long)]
    pub integration: Option<String>,
    /// Send as an operator message (recorded only, no pipeline run)
    #[arg(long)]
    pub agent: bool,
}

/// Posts a synthetic `chatFragment` webhook. The bridge acknowledges before
/// processing, so the outcome shows up in `bridge history`.
pub async fn run(api_url: &str, secret: Option<&str>, args: SimulateArgs) -> i32 {
    let payload = match build_payload(&args) {
        Ok(payload) => payload,
        Err(message) => exit_error(
            &message,
            Some(r#"Pass attributes as a JSON object, e.g. --profile '{"plan": "pro"}'"#),
        ),
    };
    api_request(
        api_url,
        reqwest::Method::POST,
        "/chatra/webhook",
        secret,
        Some(payload),
    )
    .await
}

fn build_payload(args: &SimulateArgs) -> Result<Value, String> {
    let info = args
        .profile
        .as_deref()
        .map(|raw| parse_json_object("profile", raw))
        .transpose()?
        .unwrap_or_else(|| json!({}));
    let integration = args
        .integration
        .as_deref()
        .map(|raw| parse_json_object("integration", raw))
        .transpose()?
        .unwrap_or_else(|| json!({}));

    Ok(json!({
        "eventName": "chatFragment",
        "messages": [{
            "type": if args.agent { "agent" } else { "client" },
            "text": args.text,
        }],
        "client": {
            "chatId": args.conversation,
            "id": args.client_id,
            "info": info,
            "integrationData": integration,
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SimulateArgs {
        SimulateArgs {
            conversation: "chat-1".to_string(),
            client_id: "client-9".to_string(),
            text: "VPN keeps dropping".to_string(),
            profile: Some(r#"{"vpn_status": "disconnected"}"#.to_string()),
            integration: None,
            agent: false,
        }
    }

    #[test]
    fn payload_matches_chatra_fragment_shape() {
        let payload = build_payload(&args()).expect("payload should build");

        assert_eq!(payload["eventName"], "chatFragment");
        assert_eq!(payload["messages"][0]["type"], "client");
        assert_eq!(payload["messages"][0]["text"], "VPN keeps dropping");
        assert_eq!(payload["client"]["chatId"], "chat-1");
        assert_eq!(payload["client"]["id"], "client-9");
        assert_eq!(payload["client"]["info"]["vpn_status"], "disconnected");
        assert_eq!(payload["client"]["integrationData"], json!({}));
    }

    #[test]
    fn agent_flag_sends_operator_message() {
        let mut args = args();
        args.agent = true;
        let payload = build_payload(&args).expect("payload should build");
        assert_eq!(payload["messages"][0]["type"], "agent");
    }

    #[test]
    fn non_object_profile_is_rejected() {
        let mut args = args();
        args.profile = Some(r#""pro""#.to_string());
        assert!(build_payload(&args).is_err());
    }
}
