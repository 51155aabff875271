//! User-facing status messages for the upload workflow

pub const CONNECT_WALLET: &str = "Please connect your wallet.";
pub const UPLOAD_FILE: &str = "Please upload a file.";
pub const UPLOADING_IPFS: &str = "Uploading to IPFS...";
pub const SAVING_BLOCKCHAIN: &str = "File pinned to IPFS. Saving transaction to blockchain...";
pub const CONFIRMING_TX: &str = "Transaction confirmed. Saving to database...";
pub const SUCCESS: &str = "Transaction and database save successful!";
pub const TX_SUCCESS_DB_FAILED: &str = "Transaction successful, but failed to save to database.";
pub const TX_FAILED: &str = "Transaction failed. Please try again.";
pub const IPFS_FAILED: &str = "IPFS upload failed. Please try again.";
pub const UPLOAD_CANCELLED: &str = "Upload cancelled.";
pub const TX_CANCELLED: &str = "Transaction cancelled by user.";
pub const INSUFFICIENT_FUNDS: &str = "Insufficient funds for transaction. Please fund your wallet.";
pub const ERROR: &str = "An error occurred. Please try again.";
pub const INVALID_FILE_TYPE: &str = "Invalid file type. Please upload a PDF, PNG, or JPEG file.";
pub const FILE_TOO_LARGE: &str = "File size exceeds the 100 MB limit.";
pub const INSTALL_WALLET: &str = "Please install a browser wallet.";
pub const CONNECT_FAILED: &str = "Connection failed. Please try again.";
