use super::{AccountsCallback, TxReceipt, TxStatus, WalletError, WalletProvider};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Scripted wallet provider for tests and dry runs. Transactions confirm
/// immediately with a configurable receipt status.
#[derive(Default)]
pub struct MockWalletProvider {
    accounts: Mutex<Vec<String>>,
    reject_connect: AtomicBool,
    reject_transaction: AtomicBool,
    insufficient_funds: AtomicBool,
    fail_accounts: AtomicBool,
    fail_receipt: AtomicBool,
    sent: Mutex<Vec<SentTransaction>>,
    callbacks: Mutex<HashMap<u64, AccountsCallback>>,
    next_subscription: AtomicU64,
    next_nonce: AtomicU64,
}

#[derive(Debug, Clone)]
pub struct SentTransaction {
    pub from: String,
    pub to: String,
    pub data: Vec<u8>,
    pub hash: String,
}

impl MockWalletProvider {
    pub fn with_accounts(accounts: Vec<String>) -> Self {
        let provider = Self::default();
        *provider.accounts.lock().unwrap() = accounts;
        provider
    }

    pub fn reject_connect(&self, reject: bool) {
        self.reject_connect.store(reject, Ordering::SeqCst);
    }

    pub fn reject_transaction(&self, reject: bool) {
        self.reject_transaction.store(reject, Ordering::SeqCst);
    }

    pub fn insufficient_funds(&self, broke: bool) {
        self.insufficient_funds.store(broke, Ordering::SeqCst);
    }

    pub fn fail_accounts(&self, fail: bool) {
        self.fail_accounts.store(fail, Ordering::SeqCst);
    }

    /// Makes every receipt report on-chain failure
    pub fn fail_receipt(&self, fail: bool) {
        self.fail_receipt.store(fail, Ordering::SeqCst);
    }

    pub fn sent_transactions(&self) -> Vec<SentTransaction> {
        self.sent.lock().unwrap().clone()
    }

    /// Simulates the wallet switching accounts, invoking every subscriber
    pub fn emit_accounts_changed(&self, accounts: &[String]) {
        *self.accounts.lock().unwrap() = accounts.to_vec();
        let callbacks: Vec<AccountsCallback> =
            self.callbacks.lock().unwrap().values().cloned().collect();
        for callback in callbacks {
            callback(accounts);
        }
    }
}

#[async_trait::async_trait]
impl WalletProvider for MockWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        if self.reject_connect.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn accounts(&self) -> Result<Vec<String>, WalletError> {
        if self.fail_accounts.load(Ordering::SeqCst) {
            return Err(WalletError::Provider("provider unavailable".to_string()));
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        data: &[u8],
    ) -> Result<String, WalletError> {
        if self.reject_transaction.load(Ordering::SeqCst) {
            return Err(WalletError::UserRejected);
        }
        if self.insufficient_funds.load(Ordering::SeqCst) {
            return Err(WalletError::InsufficientFunds);
        }

        let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
        let hash = format!("0x{:064x}", nonce + 1);
        self.sent.lock().unwrap().push(SentTransaction {
            from: from.to_string(),
            to: to.to_string(),
            data: data.to_vec(),
            hash: hash.clone(),
        });
        Ok(hash)
    }

    async fn transaction_receipt(&self, hash: &str) -> Result<Option<TxReceipt>, WalletError> {
        let known = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .any(|tx| tx.hash == hash);
        if !known {
            return Ok(None);
        }

        let status = if self.fail_receipt.load(Ordering::SeqCst) {
            TxStatus::Failed
        } else {
            TxStatus::Success
        };
        Ok(Some(TxReceipt {
            transaction_hash: hash.to_string(),
            status,
            block_number: Some(1),
        }))
    }

    fn subscribe_accounts_changed(&self, callback: AccountsCallback) -> u64 {
        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        self.callbacks.lock().unwrap().insert(id, callback);
        id
    }

    fn unsubscribe_accounts_changed(&self, id: u64) {
        self.callbacks.lock().unwrap().remove(&id);
    }
}
