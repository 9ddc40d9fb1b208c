use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("Browserless request failed: {0}")]
    Network(String),

    #[error("Browserless timed out rendering {0}")]
    Timeout(String),

    #[error("Browserless returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Rendered page was empty: {0}")]
    EmptyPage(String),
}

impl From<reqwest::Error> for BrowserlessError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            BrowserlessError::Timeout(url)
        } else {
            BrowserlessError::Network(err.to_string())
        }
    }
}
