use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::info;
use tradedesk_core::*;

use crate::client::HttpBackend;
use crate::routes;

#[async_trait]
impl AuthApi for HttpBackend {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, ApiError> {
        info!(email, "Logging in");
        let request = self
            .request(Method::POST, routes::LOGIN)
            .json(&json!({ "email": email, "password": password }));
        self.send(request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<TokenResponse, ApiError> {
        info!(email = %request.email, "Registering user");
        let builder = self.request(Method::POST, routes::REGISTER).json(request);
        self.send(builder).await
    }

    async fn google_login(&self, id_token: &str) -> Result<TokenResponse, ApiError> {
        let request = self
            .request(Method::POST, routes::GOOGLE_LOGIN)
            .json(&json!({ "idToken": id_token }));
        self.send(request).await
    }

    async fn facebook_login(&self, access_token: &str) -> Result<TokenResponse, ApiError> {
        let request = self
            .request(Method::POST, routes::FACEBOOK_LOGIN)
            .json(&json!({ "accessToken": access_token }));
        self.send(request).await
    }

    async fn send_otp(&self, email: &str, name: &str) -> Result<MessageResponse, ApiError> {
        let request = self
            .request(Method::POST, routes::SEND_OTP)
            .json(&json!({ "email": email, "name": name }));
        self.send(request).await
    }

    async fn verify_otp(&self, email: &str, otp: &str) -> Result<MessageResponse, ApiError> {
        let request = self
            .request(Method::POST, routes::VERIFY_OTP)
            .json(&json!({ "email": email, "otp": otp }));
        self.send(request).await
    }

    async fn forgot_password(&self, email: &str) -> Result<MessageResponse, ApiError> {
        let request = self
            .request(Method::POST, routes::FORGOT_PASSWORD)
            .json(&json!({ "email": email }));
        self.send(request).await
    }

    async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        let request = self.request(Method::POST, routes::RESET_PASSWORD).json(&json!({
            "email": email,
            "otp": otp,
            "newPassword": new_password,
        }));
        self.send(request).await
    }

    async fn update_profile(
        &self,
        token: &str,
        update: &ProfileUpdate,
    ) -> Result<UserRecord, ApiError> {
        let request = self.authed(Method::PUT, routes::PROFILE, token).json(update);
        self.send(request).await
    }

    async fn change_password(
        &self,
        token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<MessageResponse, ApiError> {
        // The backend reads both passwords from the query string.
        let request = self
            .authed(Method::PUT, routes::CHANGE_PASSWORD, token)
            .query(&[
                ("current_password", current_password),
                ("new_password", new_password),
            ]);
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ApiClientConfig;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend_for(server: &MockServer) -> HttpBackend {
        HttpBackend::new(ApiClientConfig::default().with_base_url(server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_login_returns_token_and_user() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .and(body_json(serde_json::json!({"email": "a@b.co", "password": "pw"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "jwt",
                "token_type": "bearer",
                "user": {"UserID": 5, "UserName": "Ana", "UserEmail": "a@b.co", "UserStatus": true}
            })))
            .mount(&server)
            .await;

        let token = backend_for(&server).await.login("a@b.co", "pw").await.unwrap();
        let session = token.into_session();
        assert_eq!(session.user_id, "5");
        assert_eq!(session.token(), Some("jwt"));
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Invalid email or password"})),
            )
            .mount(&server)
            .await;

        let err = backend_for(&server).await.login("a@b.co", "nope").await.unwrap_err();
        assert_eq!(err.backend_message(), Some("Invalid email or password"));
    }

    #[tokio::test]
    async fn test_register_uses_camel_case_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .and(body_json(serde_json::json!({
                "name": "Ana",
                "email": "a@b.co",
                "password": "longpassword",
                "otp": "123456",
                "phoneNumber": "0100"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "jwt",
                "user": {"UserID": 6}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = RegisterRequest {
            name: "Ana".to_string(),
            email: "a@b.co".to_string(),
            password: "longpassword".to_string(),
            otp: "123456".to_string(),
            phone_number: Some("0100".to_string()),
            ..Default::default()
        };
        let token = backend_for(&server).await.register(&request).await.unwrap();
        assert_eq!(token.user.user_id.as_deref(), Some("6"));
    }

    #[tokio::test]
    async fn test_update_profile_sends_only_changed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/auth/profile"))
            .and(header("authorization", "Bearer jwt"))
            .and(body_json(serde_json::json!({"PhoneNumber": "0199"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "UserID": 5,
                "Email": "a@b.co",
                "UserIDCardName": "Ana",
                "PhoneNumber": "0199",
                "UserStatus": true
            })))
            .mount(&server)
            .await;

        let update = ProfileUpdate {
            phone: Some("0199".to_string()),
            ..Default::default()
        };
        let user = backend_for(&server)
            .await
            .update_profile("jwt", &update)
            .await
            .unwrap();
        assert_eq!(user.phone.as_deref(), Some("0199"));
        assert_eq!(user.name.as_deref(), Some("Ana"));
        assert_eq!(user.email.as_deref(), Some("a@b.co"));
    }

    #[tokio::test]
    async fn test_change_password_uses_query() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/auth/change-password"))
            .and(query_param("current_password", "old"))
            .and(query_param("new_password", "newpassword"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "Password changed successfully"
            })))
            .mount(&server)
            .await;

        let response = backend_for(&server)
            .await
            .change_password("jwt", "old", "newpassword")
            .await
            .unwrap();
        assert_eq!(response.message.as_deref(), Some("Password changed successfully"));
    }

    #[tokio::test]
    async fn test_otp_round() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/send-otp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": "OTP sent to your email"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/verify-otp"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "detail": "Invalid or expired OTP"
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let sent = backend.send_otp("a@b.co", "Ana").await.unwrap();
        assert_eq!(sent.message.as_deref(), Some("OTP sent to your email"));

        let err = backend.verify_otp("a@b.co", "000000").await.unwrap_err();
        assert_eq!(err.backend_message(), Some("Invalid or expired OTP"));
    }
}
