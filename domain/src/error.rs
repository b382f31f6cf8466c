//! Error types for the `domain` layer.
use entity_api::error::{EntityApiErrorKind, Error as EntityApiError};
use std::error::Error as StdError;
use std::fmt;

/// Top-level domain error type.
/// Errors in the Domain layer are modeled as a tree structure
/// with `domain::error::Error` as the root type holding a tree of `error_kind`
/// enums that represent the kinds of errors that can occur in the domain layer or
/// in lower layers. The `source` field is used to hold the original error that caused
/// the domain error. The intent is to translate errors between layers while maintaining
/// layer boundaries: callers of `domain` never need to depend on `entity_api` or on the
/// HTTP client directly, and map an error to a response through [`Error::category`].
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: DomainErrorKind,
}

/// Enum representing the major categories of errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum DomainErrorKind {
    Internal(InternalErrorKind),
    External(ExternalErrorKind),
}

/// Enum representing the various kinds of internal errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum InternalErrorKind {
    Entity(EntityErrorKind),
    /// The caller is not allowed to perform the operation on this meeting
    Forbidden(String),
    /// The meeting is not in a state that permits the operation
    Conflict(String),
    Validation(ValidationErrorKind),
    /// Required configuration is missing or unusable
    Config(String),
    Other(String),
}

/// Enum representing the various kinds of entity errors that can bubble up from the "Entity" layer (`entity_api` and `entity`).
/// These errors are translated from the `entity_api` layer to the `domain` layer and reduced to a subset of error kinds
/// that are relevant to the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum EntityErrorKind {
    NotFound,
    Invalid,
    DbTransaction,
    Other(String),
}

/// Input that cannot be turned into a summary.
#[derive(Debug, PartialEq)]
pub enum ValidationErrorKind {
    /// The note content is an empty or blank string
    EmptyDocument,
    /// The note renders to blank Markdown, so there is nothing to summarize
    BlankContent,
    MalformedDocument(String),
    MalformedSnapshot(String),
    MalformedAiResponse(String),
}

/// Enum representing the various kinds of external errors that can occur in the `domain` layer.
#[derive(Debug, PartialEq)]
pub enum ExternalErrorKind {
    Network,
    Timeout,
    /// A provider answered with a non-success status. `body` is kept verbatim.
    Upstream {
        status: u16,
        body: String,
    },
    Other(String),
}

/// The coarse categories an inbound adapter maps onto responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    NotFound,
    Forbidden,
    Conflict,
    Validation,
    UpstreamFailure,
    Internal,
}

impl Error {
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::internal(InternalErrorKind::Forbidden(message.into()))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::internal(InternalErrorKind::Conflict(message.into()))
    }

    pub fn not_found() -> Self {
        Self::internal(InternalErrorKind::Entity(EntityErrorKind::NotFound))
    }

    pub fn validation(kind: ValidationErrorKind) -> Self {
        Self::internal(InternalErrorKind::Validation(kind))
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::internal(InternalErrorKind::Config(message.into()))
    }

    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::External(ExternalErrorKind::Upstream {
                status,
                body: body.into(),
            }),
        }
    }

    fn internal(kind: InternalErrorKind) -> Self {
        Error {
            source: None,
            error_kind: DomainErrorKind::Internal(kind),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match &self.error_kind {
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::NotFound)) => {
                ErrorCategory::NotFound
            }
            DomainErrorKind::Internal(InternalErrorKind::Entity(EntityErrorKind::Invalid)) => {
                ErrorCategory::Validation
            }
            DomainErrorKind::Internal(InternalErrorKind::Entity(_)) => ErrorCategory::Internal,
            DomainErrorKind::Internal(InternalErrorKind::Forbidden(_)) => ErrorCategory::Forbidden,
            DomainErrorKind::Internal(InternalErrorKind::Conflict(_)) => ErrorCategory::Conflict,
            DomainErrorKind::Internal(InternalErrorKind::Validation(_))
            | DomainErrorKind::Internal(InternalErrorKind::Config(_)) => ErrorCategory::Validation,
            DomainErrorKind::Internal(InternalErrorKind::Other(_)) => ErrorCategory::Internal,
            DomainErrorKind::External(_) => ErrorCategory::UpstreamFailure,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Domain Error: {self:?}")
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

// This is where we translate errors from the `entity_api` layer to the `domain` layer.
impl From<EntityApiError> for Error {
    fn from(err: EntityApiError) -> Self {
        let entity_error_kind = match err.error_kind {
            EntityApiErrorKind::RecordNotFound => EntityErrorKind::NotFound,
            EntityApiErrorKind::InvalidQueryTerm => EntityErrorKind::Invalid,
            EntityApiErrorKind::SystemError => EntityErrorKind::DbTransaction,
            _ => EntityErrorKind::Other("EntityErrorKind".to_string()),
        };

        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(entity_error_kind)),
        }
    }
}

// Transaction begin/commit failures surface directly as `DbErr`.
impl From<sea_orm::DbErr> for Error {
    fn from(err: sea_orm::DbErr) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: DomainErrorKind::Internal(InternalErrorKind::Entity(
                EntityErrorKind::DbTransaction,
            )),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Errors that result from issues building the reqwest::Client instance. This
        // type of error will occur prior to any network calls being made.
        if err.is_builder() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::Internal(InternalErrorKind::Other(
                    "Failed to build reqwest client".to_string(),
                )),
            }
        } else if err.is_decode() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Other(
                    "Failed to decode provider response".to_string(),
                )),
            }
        } else if err.is_timeout() {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Timeout),
            }
        // Errors that result from issues with the network call itself.
        } else {
            Error {
                source: Some(Box::new(err)),
                error_kind: DomainErrorKind::External(ExternalErrorKind::Network),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_not_found_maps_to_not_found_category() {
        let err: Error = EntityApiError {
            source: None,
            error_kind: EntityApiErrorKind::RecordNotFound,
        }
        .into();

        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert!(err.source.is_some());
    }

    #[test]
    fn config_errors_are_reported_as_validation() {
        assert_eq!(
            Error::config("AI_MODEL is not set").category(),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn every_external_kind_is_an_upstream_failure() {
        for kind in [
            ExternalErrorKind::Network,
            ExternalErrorKind::Timeout,
            ExternalErrorKind::Upstream {
                status: 500,
                body: "boom".to_string(),
            },
            ExternalErrorKind::Other("tls".to_string()),
        ] {
            let err = Error {
                source: None,
                error_kind: DomainErrorKind::External(kind),
            };
            assert_eq!(err.category(), ErrorCategory::UpstreamFailure);
        }
    }

    #[test]
    fn forbidden_and_conflict_keep_their_categories() {
        assert_eq!(
            Error::forbidden("not the host").category(),
            ErrorCategory::Forbidden
        );
        assert_eq!(
            Error::conflict("already ended").category(),
            ErrorCategory::Conflict
        );
    }

    #[test]
    fn upstream_keeps_the_body_verbatim() {
        let err = Error::upstream(502, "{\"error\":\"bad gateway\"}");

        assert_eq!(
            err.error_kind,
            DomainErrorKind::External(ExternalErrorKind::Upstream {
                status: 502,
                body: "{\"error\":\"bad gateway\"}".to_string(),
            })
        );
    }
}
