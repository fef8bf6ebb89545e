//! Server-side captcha token verification.
//!
//! Works with any provider that exposes the common `siteverify` contract
//! (form-encoded `secret` + `response`, JSON `{ "success": bool }` back),
//! which covers hCaptcha, reCAPTCHA and Turnstile.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CaptchaConfig;
use crate::core::shared::error::ApiError;

#[derive(Debug, Deserialize)]
struct SiteVerifyResponse {
    success: bool,
    #[serde(default, rename = "error-codes")]
    error_codes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CaptchaVerifier {
    config: CaptchaConfig,
    client: reqwest::Client,
}

impl CaptchaVerifier {
    pub fn new(config: CaptchaConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled && !self.config.secret_key.is_empty()
    }

    /// Checks a client token. When captcha is disabled every request passes.
    pub async fn verify(&self, token: Option<&str>) -> Result<(), ApiError> {
        if !self.is_enabled() {
            return Ok(());
        }

        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(ApiError::BadRequest("Captcha verification is required".into())),
        };

        let response = self
            .client
            .post(&self.config.verify_url)
            .form(&[
                ("secret", self.config.secret_key.as_str()),
                ("response", token),
            ])
            .send()
            .await
            .map_err(|e| ApiError::internal(format!("Captcha provider unreachable: {e}")))?;

        let body: SiteVerifyResponse = response
            .json()
            .await
            .map_err(|e| ApiError::internal(format!("Captcha provider sent bad JSON: {e}")))?;

        if body.success {
            debug!("Captcha token accepted");
            Ok(())
        } else {
            warn!("Captcha token rejected: {:?}", body.error_codes);
            Err(ApiError::BadRequest("Captcha verification failed".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: String) -> CaptchaConfig {
        CaptchaConfig {
            enabled: true,
            site_key: "site".into(),
            secret_key: "secret".into(),
            verify_url: url,
        }
    }

    #[tokio::test]
    async fn test_disabled_captcha_passes_without_token() {
        let verifier = CaptchaVerifier::new(CaptchaConfig::default());
        assert!(verifier.verify(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_token_is_bad_request() {
        let verifier = CaptchaVerifier::new(config("http://127.0.0.1:9/verify".into()));
        let err = verifier.verify(Some("  ")).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_provider_accepts_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/siteverify")
            .match_body(mockito::Matcher::UrlEncoded("response".into(), "tok-1".into()))
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let verifier = CaptchaVerifier::new(config(format!("{}/siteverify", server.url())));
        assert!(verifier.verify(Some("tok-1")).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_provider_rejection_is_bad_request() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/siteverify")
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": false, "error-codes": ["invalid-input-response"]}"#)
            .create_async()
            .await;

        let verifier = CaptchaVerifier::new(config(format!("{}/siteverify", server.url())));
        let err = verifier.verify(Some("stale")).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
