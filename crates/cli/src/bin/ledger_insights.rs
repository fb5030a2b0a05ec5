use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ledger_cli::main_entry().await
}
