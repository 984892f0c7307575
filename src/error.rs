use record_types::ValueKind;
use thiserror::Error;

/// Failure reported by a record stream while advancing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("record stream failure: {0}")]
pub struct StreamError(pub String);

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors surfaced by a mapping call. Every variant is fatal for the call;
/// unreadable columns are skipped and never reach this type.
#[derive(Debug, Error)]
pub enum MapError {
    #[error("configuration: {0}")]
    Configuration(String),

    #[error("cannot construct {type_name}: {reason}")]
    Construction { type_name: String, reason: String },

    #[error("cannot convert {from} to {to}: {reason}")]
    Conversion {
        from: ValueKind,
        to: String,
        reason: String,
    },

    #[error("cannot assign member {member} on {type_name}")]
    MemberWrite { type_name: String, member: String },

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("orchestrator: {0}")]
    Orchestrator(#[from] anyhow::Error),
}

impl MapError {
    pub fn construction(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Construction {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    pub fn conversion(from: ValueKind, to: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conversion {
            from,
            to: to.into(),
            reason: reason.into(),
        }
    }

    /// Raised because the destination type or registry is set up wrongly,
    /// not because of the data being mapped
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Raised by the data or by a collaborator while mapping
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Self::Construction { .. } | Self::Conversion { .. } | Self::Orchestrator(_)
        )
    }
}
