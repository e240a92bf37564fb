use async_trait::async_trait;
use reqwest::Method;
use tracing::info;
use tradedesk_core::*;

use crate::client::HttpBackend;
use crate::routes;

#[async_trait]
impl Backend for HttpBackend {
    async fn list_accounts(
        &self,
        token: &str,
        user_id: &str,
    ) -> Result<Vec<AccountRecord>, ApiError> {
        let request = self
            .authed(Method::GET, routes::ACCOUNTS, token)
            .query(&[("userID", user_id)]);
        self.send(request).await
    }

    async fn list_trades(&self, token: &str, account_id: i64) -> Result<Vec<TradeRecord>, ApiError> {
        let request = self
            .authed(Method::GET, routes::TRADES, token)
            .query(&[("accountID", account_id)]);
        self.send(request).await
    }

    async fn create_account(
        &self,
        token: &str,
        request: &CreateAccountRequest,
    ) -> Result<CreateAccountResponse, ApiError> {
        info!(
            login = ?request.login_number,
            server_id = ?request.server_id,
            "Submitting new account"
        );
        let builder = self
            .authed(Method::POST, routes::ACCOUNTS, token)
            .json(request);
        self.send(builder).await
    }

    async fn delete_account(&self, token: &str, account_id: i64) -> Result<MessageResponse, ApiError> {
        info!(account_id, "Deleting account");
        let request = self.authed(Method::DELETE, &routes::account(account_id), token);
        self.send(request).await
    }

    async fn close_trade(&self, token: &str, ticket: i64) -> Result<CloseTradeResponse, ApiError> {
        info!(ticket, "Closing trade");
        let request = self.authed(Method::POST, &routes::close_trade(ticket), token);
        self.send(request).await
    }
}
