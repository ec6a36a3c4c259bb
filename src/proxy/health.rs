use reqwest::Client;
use std::time::Duration;

use crate::constants::PROXY_HEALTH_TIMEOUT_MS;

/// Check if a LiteLLM proxy answers at `proxy_url`
pub async fn is_proxy_running(proxy_url: &str, master_key: Option<&str>) -> bool {
    let client = Client::builder()
        .timeout(Duration::from_millis(PROXY_HEALTH_TIMEOUT_MS))
        .build();

    let Ok(client) = client else {
        return false;
    };

    // The models endpoint answers faster than /health
    let mut request = client.get(format!("{}/v1/models", proxy_url.trim_end_matches('/')));
    if let Some(key) = master_key {
        request = request.header("Authorization", format!("Bearer {}", key));
    }

    match request.send().await {
        Ok(resp) => resp.status().is_success(),
        Err(e) => {
            tracing::debug!("Proxy health check failed: {}", e);
            false
        }
    }
}
