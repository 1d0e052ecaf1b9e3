// HTTP client for the nekobot image-generation endpoint.
// One cosmetic capability: render(text) -> image URL.

use reqwest::Client;
use std::error::Error;

const IMAGEGEN_URL: &str = "https://nekobot.xyz/api/imagegen";

pub struct NekobotClient {
    client: Client,
}

impl NekobotClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// Render a "Clyde says ..." image and return its URL.
    pub async fn clyde(&self, text: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
        let response = self
            .client
            .get(IMAGEGEN_URL)
            .query(&[("type", "clyde"), ("text", text)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(format!("Imagegen API error: {} - {}", status, text).into());
        }

        let response_json: serde_json::Value = response.json().await?;

        let url = response_json["message"]
            .as_str()
            .ok_or("Failed to parse imagegen response")?
            .to_string();

        Ok(url)
    }
}

impl Default for NekobotClient {
    fn default() -> Self {
        Self::new()
    }
}
