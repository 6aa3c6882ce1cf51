use std::collections::BTreeMap;

/// One message per invalid field, keyed by the payload field name.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error("validation failed")]
    Validation(FieldErrors),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors surfaced by store implementations. `Conflict` is reserved for
/// uniqueness violations (one active booking per user/car pair) so the
/// engine can map it onto the domain taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("uniqueness conflict")]
    Conflict,

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => DomainError::Conflict("request already exists".to_string()),
            StoreError::Backend(msg) => DomainError::Internal(msg),
        }
    }
}
