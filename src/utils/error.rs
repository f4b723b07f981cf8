use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Provider fetch failed for {symbol}: {message}")]
    ProviderFetch {
        symbol: String,
        message: String,
        retryable: bool,
    },

    #[error("Malformed provider response for {symbol}: {message}")]
    MalformedResponse { symbol: String, message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid value for '{field}' ({value}): {reason}")]
    InvalidConfigValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfig { field: String },

    #[error("Data processing error: {message}")]
    Processing { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Provider,
    Storage,
    Configuration,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn provider(symbol: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self::ProviderFetch {
            symbol: symbol.into(),
            message: message.into(),
            retryable,
        }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        Self::Processing {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ProviderFetch { .. } | Self::MalformedResponse { .. } | Self::Http(_) => {
                ErrorCategory::Provider
            }
            Self::Csv(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                ErrorCategory::Configuration
            }
            Self::Processing { .. } => ErrorCategory::Data,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Provider if self.is_retryable() => ErrorSeverity::Medium,
            ErrorCategory::Provider | ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Storage | ErrorCategory::Configuration => ErrorSeverity::Critical,
        }
    }

    /// Transport failures, timeouts, 429 and 5xx responses are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ProviderFetch { retryable, .. } => *retryable,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ProviderFetch { retryable: true, .. } | Self::Http(_) => {
                "Check network connectivity or wait before re-running; the provider may be rate limiting"
            }
            Self::ProviderFetch { .. } => {
                "Verify the ticker symbol exists and the period covers trading days"
            }
            Self::MalformedResponse { .. } => {
                "The provider response format may have changed; re-run with --verbose to inspect it"
            }
            Self::Csv(_) | Self::Io(_) => {
                "Check that the output directory is writable and the disk is not full"
            }
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                "Fix the configuration file or command-line arguments"
            }
            Self::Processing { .. } => "Inspect the provider data for this ticker and period",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ProviderFetch { symbol, message, .. } => {
                format!("Could not download prices for {}: {}", symbol, message)
            }
            Self::MalformedResponse { symbol, .. } => {
                format!("The price data received for {} could not be read", symbol)
            }
            Self::Http(_) => "The price provider could not be reached".to_string(),
            Self::Csv(_) | Self::Io(_) => format!("Failed to write output: {}", self),
            Self::Config { .. } | Self::InvalidConfigValue { .. } | Self::MissingConfig { .. } => {
                format!("Invalid configuration: {}", self)
            }
            Self::Processing { .. } => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
