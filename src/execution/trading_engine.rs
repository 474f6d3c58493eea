use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::UpstreamError;
use crate::models::{OrderType, Side};

/// A derived follower order handed to the trading engine.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    #[serde(rename = "user_id")]
    pub account_id: Uuid,
    #[serde(rename = "trading_pair_id")]
    pub trading_pair: String,
    pub side: Side,
    pub order_type: OrderType,
    pub quantity: Decimal,
    pub price: Decimal,
    pub is_copy_trade: bool,
    pub copy_trade_id: Uuid,
}

/// Engine acceptance of a submitted order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderAck {
    pub order_ref: String,
}

/// Order-matching collaborator. Fill is its concern, not ours.
#[async_trait]
pub trait TradingEngine: Send + Sync {
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, UpstreamError>;

    /// Close positions opened by copied trades of one subscription.
    async fn close_copied_positions(
        &self,
        account_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<(), UpstreamError>;
}

// ---------------------------------------------------------------------------
// HTTP engine
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct EngineResponse {
    success: bool,
    order_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ClosePositionsRequest {
    user_id: Uuid,
    subscription_id: Uuid,
}

pub struct HttpTradingEngine {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpTradingEngine {
    pub fn new(base_url: String, token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<EngineResponse, UpstreamError> {
        let url = format!("{}{path}", self.base_url);
        let mut req = self.http.post(&url).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        resp.json::<EngineResponse>()
            .await
            .map_err(|e| UpstreamError::Unexpected(format!("{path} returned {status}: {e}")))
    }
}

#[async_trait]
impl TradingEngine for HttpTradingEngine {
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, UpstreamError> {
        let resp = self.post("/api/v1/orders", order).await?;
        if !resp.success {
            return Err(UpstreamError::Rejected(
                resp.error.unwrap_or_else(|| "Trade execution failed".into()),
            ));
        }
        let order_ref = resp
            .order_id
            .ok_or_else(|| UpstreamError::Unexpected("accepted order without order_id".into()))?;

        tracing::info!(
            copy_trade_id = %order.copy_trade_id,
            order_ref = %order_ref,
            "Trading engine accepted copied order"
        );
        Ok(OrderAck { order_ref })
    }

    async fn close_copied_positions(
        &self,
        account_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<(), UpstreamError> {
        let body = ClosePositionsRequest {
            user_id: account_id,
            subscription_id,
        };
        let resp = self.post("/api/v1/positions/close-copied", &body).await?;
        if !resp.success {
            return Err(UpstreamError::Rejected(
                resp.error.unwrap_or_else(|| "position closure refused".into()),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Dry-run engine
// ---------------------------------------------------------------------------

/// Accepts every order without sending it anywhere.
#[derive(Debug, Clone, Default)]
pub struct DryRunEngine;

#[async_trait]
impl TradingEngine for DryRunEngine {
    async fn submit_order(&self, order: &OrderRequest) -> Result<OrderAck, UpstreamError> {
        tracing::info!(
            account_id = %order.account_id,
            pair = %order.trading_pair,
            side = %order.side,
            quantity = %order.quantity,
            price = %order.price,
            "[DRY-RUN] Would submit copied order"
        );
        Ok(OrderAck {
            order_ref: format!("dry-run-{}", order.copy_trade_id),
        })
    }

    async fn close_copied_positions(
        &self,
        account_id: Uuid,
        subscription_id: Uuid,
    ) -> Result<(), UpstreamError> {
        tracing::info!(
            account_id = %account_id,
            subscription_id = %subscription_id,
            "[DRY-RUN] Would close copied positions"
        );
        Ok(())
    }
}
