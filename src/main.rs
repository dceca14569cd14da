use std::env;

use tumorscope::dev_server::serve;
use tumorscope::proxy::{DevServerConfig, ServerMode};
use tumorscope::util::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("tumorscope");

    let mode = match ServerMode::from_args(&args) {
        Ok(mode) => mode,
        Err(bad) => {
            tracing::error!(
                "Usage: {} [dev|preview]  (proxy target from VITE_API_PROXY_TARGET, static root from STATIC_DIR)",
                program
            );
            anyhow::bail!("unknown mode: {bad}");
        }
    };

    let config = DevServerConfig::from_env(mode);
    serve(config).await?;
    Ok(())
}
