use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

#[derive(Debug)]
pub enum HederaError {
    EnvironmentError(String),
    RequestError(String),
    BridgeError(String),
    AccountNotFound,
}

impl std::fmt::Display for HederaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HederaError::EnvironmentError(err) => write!(f, "Environment error: {}", err),
            HederaError::RequestError(err) => write!(f, "Request error: {}", err),
            HederaError::BridgeError(err) => write!(f, "Bridge error: {}", err),
            HederaError::AccountNotFound => write!(f, "Account has no balance for this token"),
        }
    }
}

impl std::error::Error for HederaError {}

#[derive(Debug, Serialize)]
struct AssociateRequest<'a> {
    account_id: &'a str,
    token_id: &'a str,
}

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    token_id: &'a str,
    from_account: &'a str,
    to_account: &'a str,
    amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct BridgeReceipt {
    pub transaction_id: String,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct TokenBalancesResponse {
    balances: Vec<TokenBalanceEntry>,
}

#[derive(Debug, Deserialize)]
struct TokenBalanceEntry {
    account: String,
    balance: i64,
}

/// Client for the signing bridge and the public mirror node. The bridge
/// holds the custodial operator key; this service only ever sends account
/// and token ids over HTTPS.
pub struct HederaService {
    bridge_url: Url,
    mirror_url: Url,
    client: reqwest::Client,
}

impl HederaService {
    pub fn new() -> Result<Self, HederaError> {
        let mut bridge = env::var("HEDERA_BRIDGE_URL")
            .map_err(|_| HederaError::EnvironmentError("HEDERA_BRIDGE_URL not set".to_string()))?;
        let mut mirror = env::var("HEDERA_MIRROR_URL")
            .unwrap_or_else(|_| "https://testnet.mirrornode.hedera.com".to_string());

        // Url::join treats a missing trailing slash as a file segment.
        if !bridge.ends_with('/') {
            bridge.push('/');
        }
        if !mirror.ends_with('/') {
            mirror.push('/');
        }

        let bridge_url = Url::parse(&bridge)
            .map_err(|e| HederaError::EnvironmentError(format!("Invalid bridge URL: {}", e)))?;
        let mirror_url = Url::parse(&mirror)
            .map_err(|e| HederaError::EnvironmentError(format!("Invalid mirror URL: {}", e)))?;

        Ok(Self {
            bridge_url,
            mirror_url,
            client: reqwest::Client::new(),
        })
    }

    /// Associate an account with a fungible property token.
    pub async fn associate_token(
        &self,
        account_id: &str,
        token_id: &str,
    ) -> Result<BridgeReceipt, HederaError> {
        let body = AssociateRequest {
            account_id,
            token_id,
        };
        self.post_bridge("token/associate", &body).await
    }

    /// Move share tokens between two associated accounts via the custodial
    /// operator.
    pub async fn transfer_token(
        &self,
        token_id: &str,
        from_account: &str,
        to_account: &str,
        amount: i64,
    ) -> Result<BridgeReceipt, HederaError> {
        let body = TransferRequest {
            token_id,
            from_account,
            to_account,
            amount,
        };
        self.post_bridge("token/transfer", &body).await
    }

    /// On-ledger balance of `account_id` for a token, from the mirror node.
    pub async fn token_balance(
        &self,
        token_id: &str,
        account_id: &str,
    ) -> Result<i64, HederaError> {
        let mut url = self
            .mirror_url
            .join(&format!("api/v1/tokens/{}/balances", token_id))
            .map_err(|e| HederaError::RequestError(e.to_string()))?;
        url.query_pairs_mut().append_pair("account.id", account_id);

        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HederaError::RequestError(e.to_string()))?;

        if !res.status().is_success() {
            return Err(HederaError::BridgeError(format!(
                "Mirror node returned {}",
                res.status()
            )));
        }

        let parsed: TokenBalancesResponse = res
            .json()
            .await
            .map_err(|e| HederaError::RequestError(e.to_string()))?;

        parsed
            .balances
            .iter()
            .find(|entry| entry.account == account_id)
            .map(|entry| entry.balance)
            .ok_or(HederaError::AccountNotFound)
    }

    async fn post_bridge<T: Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<BridgeReceipt, HederaError> {
        let url = self
            .bridge_url
            .join(path)
            .map_err(|e| HederaError::RequestError(e.to_string()))?;

        let res = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| HederaError::RequestError(e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| HederaError::RequestError(e.to_string()))?;

        if !status.is_success() {
            eprintln!("Bridge call {} failed: {} {}", path, status, text);
            return Err(HederaError::BridgeError(text));
        }

        serde_json::from_str::<BridgeReceipt>(&text)
            .map_err(|e| HederaError::BridgeError(format!("Unexpected bridge response: {}", e)))
    }
}
