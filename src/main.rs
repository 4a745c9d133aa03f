use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    saopay::cli::run().await
}
