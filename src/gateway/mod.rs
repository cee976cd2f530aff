//! Remote order gateway client
//!
//! Translates a confirmed two-leg intent into a single basket request and
//! POSTs it to the order-routing endpoint. Success is exactly HTTP 200; any
//! other status, or a transport failure, comes back as a structured error.
//! There is no retry and no idempotency key — callers must treat a
//! resubmission as potentially duplicating the order.

use crate::core::InstrumentId;
use crate::infrastructure::config::GatewayConfig;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Gateway submission errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to build gateway client: {0}")]
    Client(String),

    #[error("gateway transport error: {0}")]
    Network(String),

    #[error("gateway rejected order: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// One leg of a confirmed spread entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderIntent {
    pub instrument_id: InstrumentId,
    pub quantity: u32,
    pub limit_price: f64,
}

/// Order side tag on a basket leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// One leg of the basket request payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketLeg {
    pub exchange_segment: String,
    pub exchange_instrument_id: String,
    pub order_type: String,
    pub order_side: OrderSide,
    pub order_validity: String,
    pub quantity: u32,
    pub price: f64,
    pub client_id: String,
    pub strategy_id: String,
}

/// Full basket request: both legs under shared client/strategy identifiers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketRequest {
    pub orders: Vec<BasketLeg>,
    pub client_id: String,
    pub strategy_id: String,
}

/// Client for the remote order-routing service.
pub struct OrderGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl OrderGateway {
    /// Build a gateway client with the configured request deadline.
    /// The timeout bounds the whole submission; dropping the returned future
    /// cancels an in-flight request.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent("spread-core/0.1")
            .build()
            .map_err(|e| GatewayError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Submit a two-leg basket: the buy intent is tagged BUY and the sell
    /// intent SELL, always by role.
    pub async fn submit_basket(
        &self,
        buy: &OrderIntent,
        sell: &OrderIntent,
    ) -> Result<(), GatewayError> {
        let request = self.build_request(buy, sell);

        tracing::info!(
            url = %self.config.url,
            buy_leg = %buy.instrument_id,
            sell_leg = %sell.instrument_id,
            "submitting basket order"
        );

        let response = self
            .client
            .post(&self.config.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::OK {
            tracing::info!("basket order accepted");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "basket order rejected");
            Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn build_request(&self, buy: &OrderIntent, sell: &OrderIntent) -> BasketRequest {
        let leg = |intent: &OrderIntent, side: OrderSide| BasketLeg {
            exchange_segment: self.config.exchange_segment.clone(),
            exchange_instrument_id: intent.instrument_id.to_string(),
            order_type: self.config.order_type.clone(),
            order_side: side,
            order_validity: self.config.order_validity.clone(),
            quantity: intent.quantity,
            price: intent.limit_price,
            client_id: self.config.client_id.clone(),
            strategy_id: self.config.strategy_id.clone(),
        };

        BasketRequest {
            orders: vec![leg(buy, OrderSide::Buy), leg(sell, OrderSide::Sell)],
            client_id: self.config.client_id.clone(),
            strategy_id: self.config.strategy_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway() -> OrderGateway {
        OrderGateway::new(GatewayConfig::default()).unwrap()
    }

    fn intents() -> (OrderIntent, OrderIntent) {
        (
            OrderIntent {
                instrument_id: "11".into(),
                quantity: 175,
                limit_price: 50.0,
            },
            OrderIntent {
                instrument_id: "22".into(),
                quantity: 175,
                limit_price: 40.0,
            },
        )
    }

    #[test]
    fn test_sides_derive_from_role() {
        let (buy, sell) = intents();
        let request = gateway().build_request(&buy, &sell);

        assert_eq!(request.orders.len(), 2);
        assert_eq!(request.orders[0].order_side, OrderSide::Buy);
        assert_eq!(request.orders[0].exchange_instrument_id, "11");
        assert_eq!(request.orders[1].order_side, OrderSide::Sell);
        assert_eq!(request.orders[1].exchange_instrument_id, "22");
    }

    #[test]
    fn test_request_wire_shape() {
        let (buy, sell) = intents();
        let request = gateway().build_request(&buy, &sell);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["clientId"], "SampleClient");
        assert_eq!(json["strategyId"], "SpreadStrategy");
        let first = &json["orders"][0];
        assert_eq!(first["exchangeSegment"], "NSEFO");
        assert_eq!(first["exchangeInstrumentId"], "11");
        assert_eq!(first["orderType"], "LIMIT");
        assert_eq!(first["orderSide"], "BUY");
        assert_eq!(first["orderValidity"], "1");
        assert_eq!(first["quantity"], 175);
        assert_eq!(first["price"], 50.0);
        assert_eq!(json["orders"][1]["orderSide"], "SELL");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_structured_failure() {
        let config = GatewayConfig {
            // Reserved TEST-NET-1 address, nothing listens there.
            url: "http://192.0.2.1:1/api/v1/orders/basket".to_string(),
            timeout_ms: 50,
            ..GatewayConfig::default()
        };
        let gateway = OrderGateway::new(config).unwrap();
        let (buy, sell) = intents();

        let err = gateway.submit_basket(&buy, &sell).await.unwrap_err();
        assert!(matches!(err, GatewayError::Network(_)));
    }
}
