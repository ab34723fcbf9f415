/// Hands the authorization URL to the user's environment
pub trait UrlOpener: Send + Sync {
    fn open(&self, url: &str) -> std::io::Result<()>;
}

/// Default browser via `opener`
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        opener::open(url).map_err(std::io::Error::other)
    }
}

/// Leaves opening the URL to the user (`open_browser = false`, headless hosts)
pub struct PrintOnly;

impl UrlOpener for PrintOnly {
    fn open(&self, _url: &str) -> std::io::Result<()> {
        Ok(())
    }
}
