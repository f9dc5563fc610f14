//! dnsguard - DNS resolution tracing and posture reports.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    dnsguard_cli::run().await
}
