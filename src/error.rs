// Crate-level error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] crate::gateway::GatewayError),

    /// The routing decision names an expert missing from the catalog. Only
    /// reachable when the configured fallback itself is unresolvable -
    /// overrides and rule matches are validated against the snapshot first.
    #[error("Expert '{0}' not present in the catalog")]
    UnknownTarget(String),
}

pub type Result<T> = std::result::Result<T, RouterError>;
