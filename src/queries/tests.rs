#[cfg(test)]
mod tests {
    use crate::core::shared::enums::UserRole;
    use crate::core::shared::state::AppStateBuilder;
    use crate::core::shared::test_utils::{
        bearer_for, json_request, read_json, registered_bearer, state_from, test_config,
        test_state, test_state_with_accounts,
    };
    use crate::drive::{MAX_ATTACHMENTS, MAX_ATTACHMENT_BYTES, MAX_ISSUE_BODY_BYTES};
    use crate::main_module::build_router;
    use axum::http::{Method, StatusCode};
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_invalid_contact_is_rejected_before_storage() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/queries/contact",
                None,
                Some(json!({
                    "name": "A",
                    "email": "not-an-email",
                    "subject": "Hi",
                    "message": "short"
                })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"], "BAD_REQUEST");
        assert_eq!(body["fields"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/queries/feedback",
                None,
                Some(json!({ "name": "Ana", "satisfaction": "very" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_feedback_out_of_range_satisfaction() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/queries/feedback",
                None,
                Some(json!({
                    "name": "Ana",
                    "email": "ana@example.com",
                    "satisfaction": 6,
                    "message": "Everything works as expected."
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_captcha_token_when_enabled() {
        let mut config = test_config();
        config.captcha.enabled = true;
        config.captcha.secret_key = "secret".into();
        config.captcha.verify_url = "http://127.0.0.1:9/siteverify".into();
        let app = build_router(state_from(AppStateBuilder::new(config)));

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/queries/support",
                None,
                Some(json!({
                    "name": "Ana",
                    "email": "ana@example.com",
                    "subject": "Login loop",
                    "message": "I keep getting redirected to the login page.",
                    "priority": "HIGH"
                })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert!(body["message"].as_str().unwrap_or_default().contains("Captcha"));
    }

    #[tokio::test]
    async fn test_disallowed_attachment_type_is_rejected() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/queries/technical-issue",
                None,
                Some(json!({
                    "name": "Ivo",
                    "email": "ivo@example.com",
                    "title": "Upload fails",
                    "description": "Uploading any file shows a spinner forever.",
                    "severity": "HIGH",
                    "attachments": [
                        { "name": "run.sh", "type": "application/x-sh", "data": "ZWNobyBoaQ==" }
                    ]
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_large_attachment_reaches_validation() {
        let jpeg = BASE64.encode(vec![0xD8u8; 3 * 1024 * 1024]);
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/queries/technical-issue",
                None,
                Some(json!({
                    "name": "Ivo",
                    "email": "not-an-email",
                    "title": "Screenshot of the broken chart",
                    "description": "The weekly chart renders empty on Mondays.",
                    "severity": "MEDIUM",
                    "attachments": [
                        { "name": "chart.jpg", "type": "image/jpeg", "data": jpeg }
                    ]
                })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        let fields = body["fields"].as_array().cloned().unwrap_or_default();
        assert_eq!(fields.len(), 1, "{body}");
        assert!(fields[0].as_str().unwrap_or_default().contains("email"));
    }

    #[test]
    fn test_issue_body_limit_fits_full_attachment_set() {
        let encoded = MAX_ATTACHMENTS * MAX_ATTACHMENT_BYTES.div_ceil(3) * 4;
        assert!(MAX_ISSUE_BODY_BYTES > encoded);
    }

    #[tokio::test]
    async fn test_admin_views_require_session() {
        let app = build_router(test_state());
        let response = app
            .oneshot(json_request(Method::GET, "/api/admin/queries/counts", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_views_reject_members() {
        let state = test_state();
        let (_, token) = bearer_for(&state, UserRole::Member);
        let app = build_router(state);

        for path in [
            "/api/admin/queries/contact",
            "/api/admin/queries/feedback",
            "/api/admin/queries/support",
            "/api/admin/queries/technical-issues",
            "/api/admin/queries/counts",
        ] {
            let response = app
                .clone()
                .oneshot(json_request(Method::GET, path, Some(&token), None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{path}");
        }
    }

    #[tokio::test]
    async fn test_member_cannot_update_status() {
        let state = test_state();
        let (_, token) = bearer_for(&state, UserRole::Member);
        let app = build_router(state);

        let response = app
            .oneshot(json_request(
                Method::PATCH,
                &format!("/api/admin/queries/contact/{}", Uuid::new_v4()),
                Some(&token),
                Some(json!({ "status": "RESOLVED" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_kind_is_not_found() {
        let (state, accounts) = test_state_with_accounts();
        let (_, token) = registered_bearer(&state, &accounts, UserRole::Admin);
        let app = build_router(state);

        let response = app
            .oneshot(json_request(
                Method::GET,
                &format!("/api/admin/queries/billing/{}", Uuid::new_v4()),
                Some(&token),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
