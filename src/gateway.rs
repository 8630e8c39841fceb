//! Token metadata and price gateway collaborator.
//!
//! The runtime never fabricates a price: when the gateway fails, PnL and
//! analysis paths degrade to an explicit "unavailable" reply. `NotFound`
//! (unknown asset) is kept distinct from transient gateway faults.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::GatewayError;

/// Metadata snapshot for a traded token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenMetadata {
    pub symbol: String,
    pub decimals: u32,
    pub price_usd: Decimal,
    #[serde(default)]
    pub liquidity_usd: Decimal,
    #[serde(default)]
    pub volume_24h_usd: Decimal,
    #[serde(default)]
    pub market_cap_usd: Option<Decimal>,
    #[serde(default)]
    pub fdv_usd: Option<Decimal>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub mint_authority_disabled: bool,
    #[serde(default)]
    pub freeze_authority_disabled: bool,
    #[serde(default)]
    pub holder_count: Option<u64>,
}

impl TokenMetadata {
    /// Token price in the settlement asset, given the current SOL/USD rate.
    ///
    /// `None` when the rate is non-positive (a division by it would be
    /// meaningless, not merely imprecise).
    pub fn price_in_sol(&self, sol_usd: Decimal) -> Option<Decimal> {
        if sol_usd <= Decimal::ZERO {
            return None;
        }
        Some(self.price_usd / sol_usd)
    }
}

/// Price/metadata source. Implemented over HTTP in production and by fakes
/// in tests.
#[async_trait]
pub trait PriceGateway: Send + Sync {
    async fn token_metadata(&self, address: &str) -> Result<TokenMetadata, GatewayError>;

    async fn sol_usd_price(&self) -> Result<Decimal, GatewayError>;
}

/// HTTP gateway against a token-metadata API.
///
/// Endpoints: `GET {base}/token/{address}` returning a [`TokenMetadata`]
/// JSON body, and `GET {base}/price/sol` returning `{"price_usd": ...}`.
pub struct HttpPriceGateway {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SolPriceResponse {
    price_usd: Decimal,
}

impl HttpPriceGateway {
    pub fn new(base_url: String, timeout: std::time::Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PriceGateway for HttpPriceGateway {
    async fn token_metadata(&self, address: &str) -> Result<TokenMetadata, GatewayError> {
        let url = format!("{}/token/{}", self.base_url, address);
        let response = self.client.get(&url).send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound {
                address: address.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(GatewayError::Gateway(format!(
                "metadata lookup returned {}",
                response.status()
            )));
        }

        Ok(response.json::<TokenMetadata>().await?)
    }

    async fn sol_usd_price(&self) -> Result<Decimal, GatewayError> {
        let url = format!("{}/price/sol", self.base_url);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(GatewayError::Gateway(format!(
                "SOL price lookup returned {}",
                response.status()
            )));
        }

        let body = response.json::<SolPriceResponse>().await?;
        if body.price_usd <= Decimal::ZERO {
            return Err(GatewayError::Gateway(format!(
                "non-positive SOL price {}",
                body.price_usd
            )));
        }
        Ok(body.price_usd)
    }
}
