use super::{ContentPinner, FileHandle, NewUploadRecord, PinClientError, ProgressFn, RecordSink, status};
use crate::utils::encoding::decode_hex_utf8;
use crate::utils::validation::{MAX_FILE_SIZE, is_accepted_mime};
use crate::wallet::{TxStatus, WalletConnector, WalletError};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Where the upload pipeline currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadStage {
    #[default]
    Idle,
    FileSelected,
    Uploading,
    AwaitingSignature,
    Confirming,
    Persisting,
    Done,
}

/// Everything the UI needs to render the workflow. Rebuilt per session,
/// never persisted.
#[derive(Debug, Clone, Default)]
pub struct UploadState {
    pub stage: UploadStage,
    pub file: Option<FileHandle>,
    pub progress: u8,
    pub status: String,
    pub loading: bool,
    pub wallet_connected: bool,
    pub account: Option<String>,
    pub transaction_hash: Option<String>,
    pub decoded_payload: Option<String>,
}

/// Drives the full pipeline: validate file, pin, sign, confirm, persist.
///
/// Each stage runs only after the previous one succeeded; a failure routes
/// back to FileSelected (or Idle when no file survives) with a user-facing
/// status. A persistence failure after a confirmed transaction is a degraded
/// success: the chain write is durable, the index write is not.
pub struct UploadWorkflow {
    connector: WalletConnector,
    pinner: Arc<dyn ContentPinner>,
    sink: Arc<dyn RecordSink>,
    max_file_size: usize,
    state: UploadState,
}

impl UploadWorkflow {
    pub fn new(
        connector: WalletConnector,
        pinner: Arc<dyn ContentPinner>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            connector,
            pinner,
            sink,
            max_file_size: MAX_FILE_SIZE,
            state: UploadState::default(),
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: usize) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn connector(&self) -> &WalletConnector {
        &self.connector
    }

    /// Requests wallet access and records the connected account
    pub async fn connect_wallet(&mut self) -> Result<String, WalletError> {
        let connected = self.connector.connect().await;
        match connected {
            Ok(signer) => {
                let address = signer.address().to_string();
                self.state.wallet_connected = true;
                self.state.account = Some(address.clone());
                self.state.status.clear();
                Ok(address)
            }
            Err(err) => {
                self.state.status = match err {
                    WalletError::ProviderMissing => status::INSTALL_WALLET,
                    _ => status::CONNECT_FAILED,
                }
                .to_string();
                Err(err)
            }
        }
    }

    /// Reconnects silently when the wallet already authorized an account
    pub async fn restore_connection(&mut self) -> bool {
        if !self.connector.is_connected().await {
            return false;
        }
        self.connect_wallet().await.is_ok()
    }

    /// Reacts to the wallet switching accounts; an empty list is a forced
    /// logout
    pub fn handle_accounts_changed(&mut self, accounts: &[String]) {
        match accounts.first() {
            Some(account) => self.state.account = Some(account.clone()),
            None => self.disconnect(),
        }
    }

    /// Drops the session state; the provider itself has no disconnect
    pub fn disconnect(&mut self) {
        self.state = UploadState::default();
    }

    /// Validates and stages a file. Rejected files leave the stage untouched
    /// and set a status instead.
    pub fn select_file(&mut self, file: FileHandle) {
        if self.state.loading {
            return;
        }

        if !is_accepted_mime(&file.mime) {
            self.state.status = status::INVALID_FILE_TYPE.to_string();
            return;
        }
        if file.size() > self.max_file_size {
            self.state.status = status::FILE_TOO_LARGE.to_string();
            return;
        }

        self.state.file = Some(file);
        self.state.status.clear();
        self.state.transaction_hash = None;
        self.state.decoded_payload = None;
        self.state.progress = 0;
        self.state.stage = UploadStage::FileSelected;
    }

    fn fail(&mut self, message: &str) {
        self.state.loading = false;
        self.state.stage = if self.state.file.is_some() {
            UploadStage::FileSelected
        } else {
            UploadStage::Idle
        };
        self.state.status = message.to_string();
    }

    /// Runs the pipeline for the staged file
    pub async fn upload_and_record(&mut self) {
        if !self.state.wallet_connected {
            self.state.status = status::CONNECT_WALLET.to_string();
            return;
        }
        let Some(file) = self.state.file.clone() else {
            self.state.status = status::UPLOAD_FILE.to_string();
            return;
        };

        self.state.loading = true;
        self.state.stage = UploadStage::Uploading;
        self.state.status = status::UPLOADING_IPFS.to_string();

        let progress = Arc::new(AtomicU8::new(0));
        let on_progress: ProgressFn = {
            let progress = progress.clone();
            Arc::new(move |percent| progress.store(percent, Ordering::Relaxed))
        };

        let pin_result = self.pinner.pin(&file, Some(on_progress)).await;
        let pinned = match pin_result {
            Ok(pinned) => pinned,
            Err(PinClientError::Cancelled) => {
                self.fail(status::UPLOAD_CANCELLED);
                return;
            }
            Err(err) => {
                tracing::warn!("pinning failed: {}", err);
                self.fail(status::IPFS_FAILED);
                return;
            }
        };
        self.state.progress = progress.load(Ordering::Relaxed);

        self.state.stage = UploadStage::AwaitingSignature;
        self.state.status = status::SAVING_BLOCKCHAIN.to_string();

        // Fresh signer per run; the active account may have changed since
        // the wallet was first connected
        let connected = self.connector.connect().await;
        let signer = match connected {
            Ok(signer) => signer,
            Err(err) => {
                tracing::warn!("wallet connection failed: {}", err);
                self.fail(status::CONNECT_FAILED);
                return;
            }
        };
        let account = signer.address().to_string();
        self.state.account = Some(account.clone());

        // The CID rides in the transaction data as plain UTF-8 bytes,
        // addressed to the sender's own account
        let payload = pinned.cid.as_bytes().to_vec();
        let sent = signer.send_transaction(&account, payload.clone()).await;
        let pending = match sent {
            Ok(pending) => pending,
            Err(WalletError::UserRejected) => {
                self.fail(status::TX_CANCELLED);
                return;
            }
            Err(WalletError::InsufficientFunds) => {
                self.fail(status::INSUFFICIENT_FUNDS);
                return;
            }
            Err(err) => {
                tracing::warn!("transaction submission failed: {}", err);
                self.fail(status::ERROR);
                return;
            }
        };

        self.state.stage = UploadStage::Confirming;

        let waited = pending.wait().await;
        let receipt = match waited {
            Ok(receipt) => receipt,
            Err(err) => {
                tracing::warn!("waiting for receipt failed: {}", err);
                self.fail(status::ERROR);
                return;
            }
        };
        if receipt.status != TxStatus::Success {
            // Retryable: the pinned CID is abandoned, the user restarts
            self.fail(status::TX_FAILED);
            return;
        }

        self.state.stage = UploadStage::Persisting;
        self.state.status = status::CONFIRMING_TX.to_string();
        self.state.transaction_hash = Some(receipt.transaction_hash.clone());

        let data_hex = format!("0x{}", hex::encode(&payload));
        self.state.decoded_payload = decode_hex_utf8(&data_hex)
            .ok()
            .map(|s| s.replace('\0', ""));

        let record = NewUploadRecord {
            cid: pinned.cid.clone(),
            file_name: Some(file.name.clone()),
            file_size: Some(file.size() as i64),
            file_type: Some(file.mime.clone()),
            wallet_address: Some(account.to_lowercase()),
            transaction_hash: Some(receipt.transaction_hash),
        };

        let saved = self.sink.save(&record).await;
        match saved {
            Ok(()) => {
                self.state.status = status::SUCCESS.to_string();
            }
            Err(err) => {
                // The chain write survived; report degraded success rather
                // than error
                tracing::error!("database save failed: {}", err);
                self.state.status = status::TX_SUCCESS_DB_FAILED.to_string();
            }
        }

        self.state.stage = UploadStage::Done;
        self.state.file = None;
        self.state.loading = false;
    }
}
