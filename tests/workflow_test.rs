use bytes::Bytes;
use docpin::client::status;
use docpin::client::workflow::{UploadStage, UploadWorkflow};
use docpin::client::{
    ContentPinner, FileHandle, NewUploadRecord, PinClientError, ProgressFn, RecordSink,
    RecordSinkError,
};
use docpin::services::pinning::PinnedContent;
use docpin::wallet::{MockWalletProvider, WalletConnector};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

const CID_V0: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";
const ACCOUNT: &str = "0x742d35Cc6634C0532925a3b844Bc454e4438f44e";

#[derive(Default)]
struct MockPinner {
    fail: AtomicBool,
    cancelled: AtomicBool,
    calls: AtomicU32,
}

#[async_trait::async_trait]
impl ContentPinner for MockPinner {
    async fn pin(
        &self,
        file: &FileHandle,
        on_progress: Option<ProgressFn>,
    ) -> Result<PinnedContent, PinClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.cancelled.load(Ordering::SeqCst) {
            return Err(PinClientError::Cancelled);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(PinClientError::ServerRejected {
                status: 502,
                message: "Failed to upload file to IPFS".to_string(),
            });
        }
        if let Some(callback) = on_progress {
            callback(50);
            callback(100);
        }
        Ok(PinnedContent {
            cid: CID_V0.to_string(),
            pin_size_bytes: file.size() as i64,
            pinned_at: "2026-08-06T12:00:00.000Z".to_string(),
        })
    }
}

#[derive(Default)]
struct MockSink {
    fail: AtomicBool,
    saved: Mutex<Vec<NewUploadRecord>>,
}

#[async_trait::async_trait]
impl RecordSink for MockSink {
    async fn save(&self, record: &NewUploadRecord) -> Result<(), RecordSinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RecordSinkError::Transport("connection refused".to_string()));
        }
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct Harness {
    provider: Arc<MockWalletProvider>,
    pinner: Arc<MockPinner>,
    sink: Arc<MockSink>,
    workflow: UploadWorkflow,
}

fn harness() -> Harness {
    let provider = Arc::new(MockWalletProvider::with_accounts(vec![ACCOUNT.to_string()]));
    let pinner = Arc::new(MockPinner::default());
    let sink = Arc::new(MockSink::default());
    let workflow = UploadWorkflow::new(
        WalletConnector::new(Some(provider.clone())),
        pinner.clone(),
        sink.clone(),
    );
    Harness {
        provider,
        pinner,
        sink,
        workflow,
    }
}

fn png_file() -> FileHandle {
    FileHandle::new(
        "photo.png",
        "image/png",
        Bytes::from(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3]),
    )
}

#[tokio::test]
async fn test_full_success_path() {
    let mut h = harness();

    h.workflow.connect_wallet().await.unwrap();
    assert!(h.workflow.state().wallet_connected);
    assert_eq!(h.workflow.state().account.as_deref(), Some(ACCOUNT));

    h.workflow.select_file(png_file());
    assert_eq!(h.workflow.state().stage, UploadStage::FileSelected);

    h.workflow.upload_and_record().await;

    let state = h.workflow.state();
    assert_eq!(state.stage, UploadStage::Done);
    assert_eq!(state.status, status::SUCCESS);
    assert_eq!(state.progress, 100);
    assert!(state.file.is_none());
    assert!(!state.loading);
    assert_eq!(state.decoded_payload.as_deref(), Some(CID_V0));

    // The transaction carried the CID as UTF-8 bytes, sent to self
    let sent = h.provider.sent_transactions();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].data, CID_V0.as_bytes());
    assert_eq!(sent[0].to, ACCOUNT);
    assert_eq!(state.transaction_hash.as_deref(), Some(sent[0].hash.as_str()));

    // Stored record carries the lowercased account
    let saved = h.sink.saved.lock().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].cid, CID_V0);
    assert_eq!(
        saved[0].wallet_address.as_deref(),
        Some(ACCOUNT.to_lowercase().as_str())
    );
    assert_eq!(saved[0].file_name.as_deref(), Some("photo.png"));
    assert_eq!(saved[0].file_type.as_deref(), Some("image/png"));
}

#[tokio::test]
async fn test_invalid_mime_never_reaches_uploading() {
    let mut h = harness();
    h.workflow.connect_wallet().await.unwrap();

    h.workflow
        .select_file(FileHandle::new("notes.txt", "text/plain", &b"hello"[..]));
    assert_eq!(h.workflow.state().stage, UploadStage::Idle);
    assert_eq!(h.workflow.state().status, status::INVALID_FILE_TYPE);

    h.workflow.upload_and_record().await;
    assert_eq!(h.workflow.state().status, status::UPLOAD_FILE);
    assert_eq!(h.pinner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_oversize_file_never_reaches_uploading() {
    let provider = Arc::new(MockWalletProvider::with_accounts(vec![ACCOUNT.to_string()]));
    let pinner = Arc::new(MockPinner::default());
    let mut workflow = UploadWorkflow::new(
        WalletConnector::new(Some(provider)),
        pinner.clone(),
        Arc::new(MockSink::default()),
    )
    .with_max_file_size(4);
    workflow.connect_wallet().await.unwrap();

    workflow.select_file(png_file());
    assert_eq!(workflow.state().stage, UploadStage::Idle);
    assert_eq!(workflow.state().status, status::FILE_TOO_LARGE);
    assert_eq!(pinner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_blocked_without_wallet() {
    let mut h = harness();

    h.workflow.select_file(png_file());
    h.workflow.upload_and_record().await;

    assert_eq!(h.workflow.state().status, status::CONNECT_WALLET);
    assert_eq!(h.pinner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_upload_blocked_without_file() {
    let mut h = harness();
    h.workflow.connect_wallet().await.unwrap();

    h.workflow.upload_and_record().await;

    assert_eq!(h.workflow.state().status, status::UPLOAD_FILE);
    assert_eq!(h.pinner.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pin_failure_returns_to_file_selected() {
    let mut h = harness();
    h.workflow.connect_wallet().await.unwrap();
    h.workflow.select_file(png_file());
    h.pinner.fail.store(true, Ordering::SeqCst);

    h.workflow.upload_and_record().await;

    let state = h.workflow.state();
    assert_eq!(state.stage, UploadStage::FileSelected);
    assert_eq!(state.status, status::IPFS_FAILED);
    assert!(state.file.is_some());
    assert!(h.provider.sent_transactions().is_empty());
}

#[tokio::test]
async fn test_cancelled_upload_has_its_own_status() {
    let mut h = harness();
    h.workflow.connect_wallet().await.unwrap();
    h.workflow.select_file(png_file());
    h.pinner.cancelled.store(true, Ordering::SeqCst);

    h.workflow.upload_and_record().await;

    assert_eq!(h.workflow.state().status, status::UPLOAD_CANCELLED);
    assert_eq!(h.workflow.state().stage, UploadStage::FileSelected);
}

#[tokio::test]
async fn test_rejected_signature_is_distinct_from_insufficient_funds() {
    let mut h = harness();
    h.workflow.connect_wallet().await.unwrap();
    h.workflow.select_file(png_file());
    h.provider.reject_transaction(true);

    h.workflow.upload_and_record().await;
    assert_eq!(h.workflow.state().status, status::TX_CANCELLED);
    assert_eq!(h.workflow.state().stage, UploadStage::FileSelected);

    h.provider.reject_transaction(false);
    h.provider.insufficient_funds(true);

    h.workflow.upload_and_record().await;
    assert_eq!(h.workflow.state().status, status::INSUFFICIENT_FUNDS);
    assert!(h.sink.saved.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_receipt_is_retryable() {
    let mut h = harness();
    h.workflow.connect_wallet().await.unwrap();
    h.workflow.select_file(png_file());
    h.provider.fail_receipt(true);

    h.workflow.upload_and_record().await;

    let state = h.workflow.state();
    assert_eq!(state.stage, UploadStage::FileSelected);
    assert_eq!(state.status, status::TX_FAILED);
    // Nothing was persisted; the user restarts the whole flow
    assert!(h.sink.saved.lock().unwrap().is_empty());
    assert!(state.transaction_hash.is_none());
}

#[tokio::test]
async fn test_database_failure_is_degraded_success() {
    let mut h = harness();
    h.workflow.connect_wallet().await.unwrap();
    h.workflow.select_file(png_file());
    h.sink.fail.store(true, Ordering::SeqCst);

    h.workflow.upload_and_record().await;

    let state = h.workflow.state();
    assert_eq!(state.stage, UploadStage::Done);
    assert_eq!(state.status, status::TX_SUCCESS_DB_FAILED);
    // The chain write is still surfaced
    assert!(state.transaction_hash.is_some());
    assert_eq!(state.decoded_payload.as_deref(), Some(CID_V0));
}

#[tokio::test]
async fn test_account_switch_rebinds_account() {
    let mut h = harness();
    h.workflow.connect_wallet().await.unwrap();

    let other = "0x000000000000000000000000000000000000dEaD".to_string();
    h.workflow.handle_accounts_changed(std::slice::from_ref(&other));

    assert_eq!(h.workflow.state().account.as_deref(), Some(other.as_str()));
    assert!(h.workflow.state().wallet_connected);
}

#[tokio::test]
async fn test_empty_account_list_forces_logout() {
    let mut h = harness();
    h.workflow.connect_wallet().await.unwrap();
    h.workflow.select_file(png_file());

    h.workflow.handle_accounts_changed(&[]);

    let state = h.workflow.state();
    assert!(!state.wallet_connected);
    assert!(state.account.is_none());
    assert!(state.file.is_none());
    assert_eq!(state.stage, UploadStage::Idle);
}

#[tokio::test]
async fn test_restore_connection_without_authorization() {
    let provider = Arc::new(MockWalletProvider::with_accounts(vec![]));
    let mut workflow = UploadWorkflow::new(
        WalletConnector::new(Some(provider)),
        Arc::new(MockPinner::default()),
        Arc::new(MockSink::default()),
    );

    assert!(!workflow.restore_connection().await);
    assert!(!workflow.state().wallet_connected);
}

#[tokio::test]
async fn test_restore_connection_with_existing_authorization() {
    let mut h = harness();
    assert!(h.workflow.restore_connection().await);
    assert!(h.workflow.state().wallet_connected);
    assert_eq!(h.workflow.state().account.as_deref(), Some(ACCOUNT));
}
