use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = "ArcendLauncher/0.1.0";

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound for small JSON requests such as the remote manifest.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Maximum silence between two chunks of a streamed download.
pub const CHUNK_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
}
