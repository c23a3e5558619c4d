#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = markpad::run().await {
        eprintln!("markpad fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
