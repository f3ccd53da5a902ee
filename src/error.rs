use thiserror::Error;

use crate::api::ApiError;

/// Failure while pulling one entity.
///
/// Only transport failures stop the run; everything else is logged against the
/// current record and the batch moves on.
#[derive(Debug, Error)]
pub enum PullError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
    #[error("{entity} {id}: {reason}")]
    Unresolved {
        entity: &'static str,
        id: i64,
        reason: &'static str,
    },
    #[error("{entity} has no {field}")]
    MissingField {
        entity: &'static str,
        field: &'static str,
    },
}

impl PullError {
    pub fn is_fatal(&self) -> bool {
        match self {
            PullError::Api(err) => err.is_fatal(),
            _ => false,
        }
    }
}

/// Maps a failed entity lookup: payload problems mean the entity is unresolvable,
/// transport problems stay fatal.
pub fn unresolved(entity: &'static str, id: i64) -> impl FnOnce(ApiError) -> PullError {
    move |err| {
        if err.is_fatal() {
            PullError::Api(err)
        } else {
            PullError::Unresolved {
                entity,
                id,
                reason: "not found upstream",
            }
        }
    }
}
