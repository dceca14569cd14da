use tumorscope::smoke::{run, SmokeConfig};
use tumorscope::util::init_tracing;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SmokeConfig::from_env();
    match run(&config).await {
        Ok(report) => {
            tracing::info!("smoke test passed");
            println!("{report}");
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, api_url = %config.api_url, "smoke test failed");
            Err(e.into())
        }
    }
}
