#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub bearer_prefix: String,
    pub session_cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bearer_prefix: "Bearer ".to_string(),
            session_cookie_name: "zelene_session".to_string(),
        }
    }
}
