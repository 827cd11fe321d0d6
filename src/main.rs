use clap::Parser;
use php_intelligence_service::Backend;
use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

/// PHP language intelligence service — speaks LSP over stdio.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Serve over stdio (the only transport currently supported).
    #[arg(long, default_value_t = true)]
    stdio: bool,

    /// Log level, e.g. `info`, `debug`, `php_intelligence_service=trace`.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let _ = cli.stdio; // stdio is the only transport; flag kept for CLI parity with editors that always pass it

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(tokio::io::stdin(), tokio::io::stdout(), socket).serve(service).await;
}
