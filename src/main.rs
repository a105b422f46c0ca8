#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    melodeck_lib::run().await
}
