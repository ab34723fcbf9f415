use anyhow::Result;
use drivelink::{
    auth::{Authenticator, PrintOnly, SystemBrowser, TcpRedirectListener, TokenStore, UrlOpener},
    config::Config,
    graph::DriveClient,
    providers::{CloudProvider, MicrosoftGraph},
    TokenSource,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("drivelink v{}", drivelink::VERSION);

    // Load configuration
    let config = Config::load()?;
    info!("✓ Configuration loaded");
    info!("  Redirect: {}", config.redirect_uri);
    info!("  Token file: {}", config.token_file.display());

    let provider: Arc<dyn CloudProvider> = Arc::new(MicrosoftGraph::new(&config)?);
    let opener: Box<dyn UrlOpener> = if config.open_browser {
        Box::new(SystemBrowser)
    } else {
        Box::new(PrintOnly)
    };

    let authenticator = Authenticator::new(
        provider.clone(),
        Box::new(TcpRedirectListener::from_config(&config)?),
        opener,
        TokenStore::new(config.token_file.clone()),
        config.redirect_timeout(),
    );

    let session = authenticator.authenticate().await?;
    if session.source == TokenSource::Interactive {
        info!("✓ Signed in interactively");
    }

    let drive = DriveClient::new(provider, &session.token);

    // Basic info about the account
    let me = drive.me().await?;
    println!("{}", serde_json::to_string_pretty(&me)?);

    // Folders and files at the root of the drive
    for item in drive.root_children().await? {
        println!("{} {}", item.name, item.size);
    }

    Ok(())
}
