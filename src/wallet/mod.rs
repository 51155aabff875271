pub mod json_rpc;
pub mod mock;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

pub use json_rpc::JsonRpcWallet;
pub use mock::MockWalletProvider;

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("no wallet provider is available")]
    ProviderMissing,

    #[error("wallet connection request was rejected")]
    ConnectionRejected,

    #[error("transaction was rejected by the user")]
    UserRejected,

    #[error("insufficient funds for transaction")]
    InsufficientFunds,

    #[error("wallet provider error: {0}")]
    Provider(String),

    #[error("wallet transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Success,
    Failed,
}

/// Confirmation record for a mined transaction
#[derive(Debug, Clone)]
pub struct TxReceipt {
    pub transaction_hash: String,
    pub status: TxStatus,
    pub block_number: Option<u64>,
}

pub type AccountsCallback = Arc<dyn Fn(&[String]) + Send + Sync>;

/// The wallet capability. Implementations decide how accounts are managed
/// and transactions signed; callers never reach for ambient global state.
#[async_trait::async_trait]
pub trait WalletProvider: Send + Sync {
    /// Asks the user for account access; may prompt
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Accounts already authorized, without prompting
    async fn accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Submits a transaction carrying `data`, returning its hash
    async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        data: &[u8],
    ) -> Result<String, WalletError>;

    /// Receipt for a submitted transaction once it is mined
    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TxReceipt>, WalletError>;

    /// Registers an account-change callback; the returned id revokes it
    fn subscribe_accounts_changed(&self, callback: AccountsCallback) -> u64;

    fn unsubscribe_accounts_changed(&self, id: u64);
}

/// Entry point for wallet interaction, holding the injected provider
pub struct WalletConnector {
    provider: Option<Arc<dyn WalletProvider>>,
}

impl WalletConnector {
    pub fn new(provider: Option<Arc<dyn WalletProvider>>) -> Self {
        Self { provider }
    }

    /// A connector with no provider installed; connect() fails ProviderMissing
    pub fn disconnected() -> Self {
        Self::new(None)
    }

    /// Requests account access and returns a signer bound to the active
    /// account
    pub async fn connect(&self) -> Result<Signer, WalletError> {
        let provider = self
            .provider
            .clone()
            .ok_or(WalletError::ProviderMissing)?;

        let accounts = provider.request_accounts().await.map_err(|e| match e {
            WalletError::UserRejected => WalletError::ConnectionRejected,
            other => other,
        })?;

        let address = accounts
            .into_iter()
            .next()
            .ok_or(WalletError::ConnectionRejected)?;

        Ok(Signer { provider, address })
    }

    /// Whether an account is already authorized. Never prompts, never fails.
    pub async fn is_connected(&self) -> bool {
        match &self.provider {
            Some(provider) => provider
                .accounts()
                .await
                .map(|accounts| !accounts.is_empty())
                .unwrap_or(false),
            None => false,
        }
    }

    /// Subscribes to account changes. Dropping (or revoking) the returned
    /// handle removes the callback.
    pub fn on_accounts_changed(
        &self,
        callback: AccountsCallback,
    ) -> Result<AccountSubscription, WalletError> {
        let provider = self
            .provider
            .clone()
            .ok_or(WalletError::ProviderMissing)?;
        let id = provider.subscribe_accounts_changed(callback);
        Ok(AccountSubscription {
            provider,
            id: Some(id),
        })
    }
}

/// A provider bound to one authorized account
pub struct Signer {
    provider: Arc<dyn WalletProvider>,
    address: String,
}

impl Signer {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn send_transaction(
        &self,
        to: &str,
        data: Vec<u8>,
    ) -> Result<PendingTransaction, WalletError> {
        let hash = self
            .provider
            .send_transaction(&self.address, to, &data)
            .await?;
        Ok(PendingTransaction {
            provider: self.provider.clone(),
            hash,
        })
    }
}

/// A submitted transaction awaiting inclusion
pub struct PendingTransaction {
    provider: Arc<dyn WalletProvider>,
    pub hash: String,
}

impl PendingTransaction {
    /// Polls until the transaction is mined, then returns its receipt
    pub async fn wait(&self) -> Result<TxReceipt, WalletError> {
        let deadline = Instant::now() + RECEIPT_TIMEOUT;
        loop {
            if let Some(receipt) = self.provider.transaction_receipt(&self.hash).await? {
                return Ok(receipt);
            }
            if Instant::now() >= deadline {
                return Err(WalletError::Provider(format!(
                    "timed out waiting for receipt of {}",
                    self.hash
                )));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}

/// Revocable account-change subscription. Drop removes the callback, so a UI
/// teardown cannot leak it.
pub struct AccountSubscription {
    provider: Arc<dyn WalletProvider>,
    id: Option<u64>,
}

impl AccountSubscription {
    pub fn revoke(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            self.provider.unsubscribe_accounts_changed(id);
        }
    }
}

impl Drop for AccountSubscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_connect_without_provider_fails() {
        let connector = WalletConnector::disconnected();
        assert!(matches!(
            connector.connect().await,
            Err(WalletError::ProviderMissing)
        ));
        assert!(!connector.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_binds_first_account() {
        let provider = Arc::new(MockWalletProvider::with_accounts(vec![
            "0xAbC0000000000000000000000000000000000001".to_string(),
            "0xAbC0000000000000000000000000000000000002".to_string(),
        ]));
        let connector = WalletConnector::new(Some(provider));

        let signer = connector.connect().await.unwrap();
        assert_eq!(
            signer.address(),
            "0xAbC0000000000000000000000000000000000001"
        );
        assert!(connector.is_connected().await);
    }

    #[tokio::test]
    async fn test_connect_rejection_maps_to_connection_rejected() {
        let provider = Arc::new(MockWalletProvider::with_accounts(vec![
            "0xAbC0000000000000000000000000000000000001".to_string(),
        ]));
        provider.reject_connect(true);
        let connector = WalletConnector::new(Some(provider));

        assert!(matches!(
            connector.connect().await,
            Err(WalletError::ConnectionRejected)
        ));
    }

    #[tokio::test]
    async fn test_is_connected_never_errors() {
        let provider = Arc::new(MockWalletProvider::with_accounts(vec![]));
        provider.fail_accounts(true);
        let connector = WalletConnector::new(Some(provider));
        assert!(!connector.is_connected().await);
    }

    #[tokio::test]
    async fn test_send_transaction_yields_receipt() {
        let provider = Arc::new(MockWalletProvider::with_accounts(vec![
            "0xAbC0000000000000000000000000000000000001".to_string(),
        ]));
        let connector = WalletConnector::new(Some(provider.clone()));

        let signer = connector.connect().await.unwrap();
        let to = signer.address().to_string();
        let pending = signer
            .send_transaction(&to, b"QmPayload".to_vec())
            .await
            .unwrap();
        let receipt = pending.wait().await.unwrap();

        assert_eq!(receipt.status, TxStatus::Success);
        assert_eq!(receipt.transaction_hash, pending.hash);
        assert_eq!(provider.sent_transactions().len(), 1);
        assert_eq!(provider.sent_transactions()[0].data, b"QmPayload");
    }

    #[tokio::test]
    async fn test_subscription_revocation_removes_callback() {
        let provider = Arc::new(MockWalletProvider::with_accounts(vec![
            "0xAbC0000000000000000000000000000000000001".to_string(),
        ]));
        let connector = WalletConnector::new(Some(provider.clone()));

        let calls = Arc::new(AtomicUsize::new(0));
        let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let subscription = {
            let calls = calls.clone();
            let seen = seen.clone();
            connector
                .on_accounts_changed(Arc::new(move |accounts| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    seen.lock().unwrap().extend(accounts.iter().cloned());
                }))
                .unwrap()
        };

        provider.emit_accounts_changed(&["0xDeF0000000000000000000000000000000000003".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(seen.lock().unwrap().len(), 1);

        subscription.revoke();
        provider.emit_accounts_changed(&[]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscription_drop_also_revokes() {
        let provider = Arc::new(MockWalletProvider::with_accounts(vec![]));
        let connector = WalletConnector::new(Some(provider.clone()));

        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            let _subscription = connector
                .on_accounts_changed(Arc::new(move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }

        provider.emit_accounts_changed(&[]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
