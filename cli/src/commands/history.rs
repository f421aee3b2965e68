use crate::util::{api_request, exit_error};

pub async fn run(api_url: &str, secret: Option<&str>, conversation_id: &str) -> i32 {
    let Some(path) = turns_path(conversation_id) else {
        exit_error("Could not build the history URL", None);
    };
    api_request(api_url, reqwest::Method::GET, &path, secret, None).await
}

/// `/v1/conversations/{id}/turns` with the id percent-encoded as one segment.
fn turns_path(conversation_id: &str) -> Option<String> {
    let mut url = reqwest::Url::parse("http://bridge.invalid/").ok()?;
    url.path_segments_mut()
        .ok()?
        .clear()
        .extend(["v1", "conversations", conversation_id, "turns"]);
    Some(url.path().to_string())
}
