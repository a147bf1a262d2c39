/// Runtime settings, read once at startup. There is no live reload; saving
/// new credentials means restarting the process.
#[derive(Clone, Debug)]
pub struct Settings {
    pub bind_addr: String,
    pub session_secret: Vec<u8>,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub backend_url: Option<String>,
    pub backend_key: Option<String>,
    pub demo_mode_forced: bool,
    pub ocr_api_url: Option<String>,
    pub ocr_api_key: Option<String>,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
            format!("0.0.0.0:{}", port)
        });

        let session_secret = match std::env::var("SESSION_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret.into_bytes(),
            _ => {
                tracing::warn!(
                    "SESSION_SECRET not set; using an ephemeral key, sessions will not survive a restart"
                );
                (0..32).map(|_| rand::random::<u8>()).collect()
            }
        };

        let openai_api_key = non_empty(std::env::var("OPENAI_API_KEY").ok());

        Self {
            bind_addr,
            session_secret,
            openai_api_key: openai_api_key.clone(),
            openai_model: std::env::var("OPENAI_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            backend_url: non_empty(std::env::var("BACKEND_URL").ok()),
            backend_key: non_empty(std::env::var("BACKEND_KEY").ok()),
            demo_mode_forced: std::env::var("DEMO_MODE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            ocr_api_url: non_empty(std::env::var("OCR_API_URL").ok()),
            ocr_api_key: non_empty(std::env::var("OCR_API_KEY").ok()).or(openai_api_key),
            mail_api_url: non_empty(std::env::var("MAIL_API_URL").ok()),
            mail_api_key: non_empty(std::env::var("MAIL_API_KEY").ok()),
        }
    }

    /// Placeholder credentials from sample env files count as absent.
    pub fn backend_configured(&self) -> bool {
        if self.demo_mode_forced {
            return false;
        }
        match (&self.backend_url, &self.backend_key) {
            (Some(url), Some(_key)) => {
                url != "https://xyz.supabase.co" && !url.contains("placeholder")
            }
            _ => false,
        }
    }

}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
