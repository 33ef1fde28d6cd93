use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    mistral_chat::run().await
}
