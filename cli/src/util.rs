use serde_json::{Value, json};

pub const SECRET_HEADER: &str = "x-webhook-secret";

pub fn client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Print a structured CLI error and exit with the usage code.
pub fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", pretty(&err));
    std::process::exit(4);
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// 0=success (2xx), 1=client error (4xx), 2=server error (5xx)
pub fn exit_code_for(status: u16) -> i32 {
    match status {
        200..=299 => 0,
        400..=499 => 1,
        _ => 2,
    }
}

/// Parse a `--profile`-style argument that must be a JSON object.
pub fn parse_json_object(flag: &str, raw: &str) -> Result<Value, String> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| format!("Invalid JSON in --{flag}: {e}"))?;
    if !value.is_object() {
        return Err(format!("--{flag} must be a JSON object"));
    }
    Ok(value)
}

/// Execute an API request, print the response, return the exit code.
///
/// Exit codes: 0=success (2xx), 1=client error (4xx), 2=server error (5xx),
///             3=connection error, 4=usage error
pub async fn api_request(
    api_url: &str,
    method: reqwest::Method,
    path: &str,
    secret: Option<&str>,
    body: Option<Value>,
) -> i32 {
    let url = match reqwest::Url::parse(&format!("{}{path}", api_url.trim_end_matches('/'))) {
        Ok(url) => url,
        Err(e) => {
            let err = json!({
                "error": "cli_error",
                "message": format!("Invalid URL: {api_url}{path}: {e}")
            });
            eprintln!("{}", pretty(&err));
            return 4;
        }
    };

    let mut req = client().request(method, url);
    if let Some(secret) = secret {
        req = req.header(SECRET_HEADER, secret);
    }
    if let Some(body) = body {
        req = req.json(&body);
    }

    let resp = match req.send().await {
        Ok(r) => r,
        Err(e) => {
            let err = json!({
                "error": "connection_error",
                "message": format!("{e}"),
                "docs_hint": "Is the bridge running? Check BRIDGE_API_URL."
            });
            eprintln!("{}", pretty(&err));
            return 3;
        }
    };

    let exit_code = exit_code_for(resp.status().as_u16());

    // The webhook acknowledges with plain text; everything else is JSON.
    let text = resp.text().await.unwrap_or_default();
    let output = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

    if exit_code == 0 {
        println!("{}", pretty(&output));
    } else {
        eprintln!("{}", pretty(&output));
    }

    exit_code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classes_map_to_exit_codes() {
        assert_eq!(exit_code_for(200), 0);
        assert_eq!(exit_code_for(204), 0);
        assert_eq!(exit_code_for(401), 1);
        assert_eq!(exit_code_for(404), 1);
        assert_eq!(exit_code_for(503), 2);
    }

    #[test]
    fn json_object_arguments_are_validated() {
        assert_eq!(
            parse_json_object("profile", r#"{"plan": "pro"}"#).unwrap(),
            json!({"plan": "pro"})
        );
        assert!(parse_json_object("profile", "[1, 2]").is_err());
        assert!(parse_json_object("profile", "{plan").is_err());
    }

    #[tokio::test]
    async fn api_request_sends_secret_and_maps_status() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("GET", "/v1/conversations/chat-1/turns")
            .match_header("x-webhook-secret", "hook-secret")
            .with_status(200)
            .with_body(r#"{"conversation_id": "chat-1", "turns": []}"#)
            .create_async()
            .await;
        let _missing = server
            .mock("GET", "/v1/conversations/missing/turns")
            .with_status(404)
            .with_body(r#"{"error": "not_found"}"#)
            .create_async()
            .await;

        let code = api_request(
            &server.url(),
            reqwest::Method::GET,
            "/v1/conversations/chat-1/turns",
            Some("hook-secret"),
            None,
        )
        .await;
        assert_eq!(code, 0);
        ok.assert_async().await;

        let code = api_request(
            &server.url(),
            reqwest::Method::GET,
            "/v1/conversations/missing/turns",
            None,
            None,
        )
        .await;
        assert_eq!(code, 1);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connection_error() {
        let code =
            api_request("http://127.0.0.1:1", reqwest::Method::GET, "/health", None, None).await;
        assert_eq!(code, 3);
    }

    #[tokio::test]
    async fn malformed_base_url_is_a_usage_error() {
        let code = api_request("not a url", reqwest::Method::GET, "/health", None, None).await;
        assert_eq!(code, 4);
    }
}
