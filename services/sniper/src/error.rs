//! Error types for the sniper service

/// Failure of one purchase pipeline step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PurchaseError {
    #[error("Cart creation failed: {0}")]
    CartCreationFailed(String),

    #[error("Adding item to cart failed: {0}")]
    AddToCartFailed(String),

    #[error("Configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("Checkout failed: {0}")]
    CheckoutFailed(String),
}

/// Errors that can occur in the sniper service
#[derive(Debug, thiserror::Error)]
pub enum SniperError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Monitoring is already running")]
    AlreadyRunning,

    #[error("Server is not available for purchase")]
    NotAvailable,

    #[error("A purchase is already in progress")]
    PurchaseAlreadyInProgress,

    #[error(transparent)]
    Purchase(#[from] PurchaseError),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Provider returned status {status}: {message}")]
    Provider { status: u16, message: String },

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for sniper operations
pub type Result<T> = std::result::Result<T, SniperError>;
