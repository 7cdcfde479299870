/*
 * Responsibility
 * - tokio runtime entry point
 * - calls app::run() (no logic here)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    session_gate::app::run().await
}
