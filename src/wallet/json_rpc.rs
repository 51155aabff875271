use super::{AccountsCallback, TxReceipt, TxStatus, WalletError, WalletProvider};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// JSON-RPC error code a provider returns when the user declines a prompt
const USER_REJECTED_CODE: i64 = 4001;

const ACCOUNT_POLL_INTERVAL: Duration = Duration::from_secs(3);

type SubscriptionMap = Arc<Mutex<HashMap<u64, AccountsCallback>>>;

/// Wallet provider speaking JSON-RPC 2.0 over HTTP (eth_accounts,
/// eth_requestAccounts, eth_sendTransaction, eth_getTransactionReceipt).
///
/// HTTP providers cannot push account changes, so subscriptions are served by
/// a background task diffing eth_accounts on an interval.
pub struct JsonRpcWallet {
    http: reqwest::Client,
    endpoint: Url,
    next_request_id: AtomicU64,
    subscriptions: SubscriptionMap,
    next_subscription: AtomicU64,
    watcher: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    status: Option<String>,
    block_number: Option<String>,
}

fn map_rpc_error(error: RpcError) -> WalletError {
    if error.code == USER_REJECTED_CODE {
        return WalletError::UserRejected;
    }
    if error.message.to_lowercase().contains("insufficient funds") {
        return WalletError::InsufficientFunds;
    }
    WalletError::Provider(format!("{} (code {})", error.message, error.code))
}

async fn rpc_call(
    http: &reqwest::Client,
    endpoint: &Url,
    id: u64,
    method: &str,
    params: Value,
) -> Result<Value, WalletError> {
    let body = json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    });

    let response = http
        .post(endpoint.clone())
        .json(&body)
        .send()
        .await
        .map_err(|e| WalletError::Transport(e.to_string()))?;

    let rpc: RpcResponse = response
        .json()
        .await
        .map_err(|e| WalletError::Transport(e.to_string()))?;

    if let Some(error) = rpc.error {
        return Err(map_rpc_error(error));
    }
    rpc.result
        .ok_or_else(|| WalletError::Provider("empty JSON-RPC response".to_string()))
}

fn parse_accounts(result: Value) -> Vec<String> {
    result
        .as_array()
        .map(|accounts| {
            accounts
                .iter()
                .filter_map(|a| a.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

impl JsonRpcWallet {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
            next_request_id: AtomicU64::new(1),
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            next_subscription: AtomicU64::new(1),
            watcher: Mutex::new(None),
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        rpc_call(&self.http, &self.endpoint, id, method, params).await
    }

    /// Starts the account watcher if it is not already running. Holds the
    /// watcher lock only briefly; the task itself owns clones of what it
    /// needs.
    fn ensure_watcher(&self) {
        let mut watcher = self.watcher.lock().unwrap();
        if watcher.is_some() {
            return;
        }

        let http = self.http.clone();
        let endpoint = self.endpoint.clone();
        let subscriptions = self.subscriptions.clone();

        *watcher = Some(tokio::spawn(async move {
            let mut last: Option<Vec<String>> = None;
            loop {
                tokio::time::sleep(ACCOUNT_POLL_INTERVAL).await;

                let accounts =
                    match rpc_call(&http, &endpoint, 0, "eth_accounts", json!([])).await {
                        Ok(result) => parse_accounts(result),
                        Err(e) => {
                            tracing::debug!("account watcher poll failed: {}", e);
                            continue;
                        }
                    };

                if last.as_deref() != Some(accounts.as_slice()) {
                    // Skip the initial observation; only changes notify
                    if last.is_some() {
                        let callbacks: Vec<AccountsCallback> =
                            subscriptions.lock().unwrap().values().cloned().collect();
                        for callback in callbacks {
                            callback(&accounts);
                        }
                    }
                    last = Some(accounts);
                }
            }
        }));
    }
}

impl Drop for JsonRpcWallet {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.lock().unwrap().take() {
            handle.abort();
        }
    }
}

#[async_trait::async_trait]
impl WalletProvider for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        let result = self.call("eth_requestAccounts", json!([])).await?;
        Ok(parse_accounts(result))
    }

    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        let result = self.call("eth_accounts", json!([])).await?;
        Ok(parse_accounts(result))
    }

    async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        data: &[u8],
    ) -> Result<String, WalletError> {
        let params = json!([{
            "from": from,
            "to": to,
            "data": format!("0x{}", hex::encode(data)),
        }]);
        let result = self.call("eth_sendTransaction", params).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| WalletError::Provider("transaction hash missing".to_string()))
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TxReceipt>, WalletError> {
        let result = self
            .call("eth_getTransactionReceipt", json!([hash]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let raw: RawReceipt = serde_json::from_value(result)
            .map_err(|e| WalletError::Provider(format!("malformed receipt: {}", e)))?;

        let status = match raw.status.as_deref() {
            Some("0x1") => TxStatus::Success,
            _ => TxStatus::Failed,
        };
        let block_number = raw
            .block_number
            .as_deref()
            .and_then(|n| u64::from_str_radix(n.trim_start_matches("0x"), 16).ok());

        Ok(Some(TxReceipt {
            transaction_hash: raw.transaction_hash,
            status,
            block_number,
        }))
    }

    fn subscribe_accounts_changed(&self, callback: AccountsCallback) -> u64 {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.subscriptions.lock().unwrap().insert(id, callback);
        self.ensure_watcher();
        id
    }

    fn unsubscribe_accounts_changed(&self, id: u64) {
        self.subscriptions.lock().unwrap().remove(&id);
    }
}
