use clap::Parser;
use docpin::client::{ApiRecordClient, FileHandle, PinClient, UploadStage, UploadWorkflow};
use docpin::utils::encoding::mask_address;
use docpin::wallet::{JsonRpcWallet, WalletConnector};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pin a document to IPFS and anchor its CID on chain
#[derive(Parser)]
#[command(name = "docpin-upload")]
struct Args {
    /// PDF, PNG or JPEG file to upload
    file: PathBuf,

    /// Base URL of the docpin backend
    #[arg(long, default_value = "http://localhost:5001")]
    server_url: String,

    /// JSON-RPC endpoint of the wallet or node
    #[arg(long, default_value = "http://localhost:8545")]
    rpc_url: String,
}

fn mime_for(path: &PathBuf) -> anyhow::Result<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    match extension.as_str() {
        "pdf" => Ok("application/pdf"),
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        other => anyhow::bail!("unsupported file extension '.{}'", other),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docpin=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mime = mime_for(&args.file)?;
    let bytes = tokio::fs::read(&args.file).await?;
    let name = args
        .file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();
    let file = FileHandle::new(name.clone(), mime, bytes);

    let provider = Arc::new(JsonRpcWallet::new(args.rpc_url.parse()?));
    let connector = WalletConnector::new(Some(provider));
    let pinner = Arc::new(PinClient::new(&args.server_url)?);
    let sink = Arc::new(ApiRecordClient::new(&args.server_url)?);

    let mut workflow = UploadWorkflow::new(connector, pinner, sink);

    let account = workflow.connect_wallet().await?;
    info!("🔗 Connected account: {}", mask_address(&account));

    workflow.select_file(file);
    if workflow.state().stage != UploadStage::FileSelected {
        anyhow::bail!("{}", workflow.state().status);
    }
    info!("📄 Selected {} ({} bytes)", name, workflow.state().file.as_ref().map(|f| f.size()).unwrap_or(0));

    workflow.upload_and_record().await;

    let state = workflow.state();
    info!("🏁 {}", state.status);
    if let Some(hash) = &state.transaction_hash {
        info!("🧾 Transaction: {}", hash);
    }
    if let Some(payload) = &state.decoded_payload {
        info!("📦 On-chain payload: {}", payload);
    }

    if state.stage == UploadStage::Done {
        Ok(())
    } else {
        anyhow::bail!("upload did not complete: {}", state.status)
    }
}
