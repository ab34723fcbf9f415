// Sign-in: token cache, redirect catcher, browser hand-off and the flow tying them together

pub mod browser;
pub mod flow;
pub mod redirect;
pub mod token_store;

pub use browser::{PrintOnly, SystemBrowser, UrlOpener};
pub use flow::{Authenticator, Session};
pub use redirect::{extract_code, parse_redirect, RedirectListener, RedirectParams, TcpRedirectListener};
pub use token_store::TokenStore;
