use crate::storage::StoreError;
use crate::types::WellId;

/// Failures of a ratios / production request.
///
/// Missing physical data is not an error here; it is defaulted and audited.
#[derive(Debug, thiserror::Error)]
pub enum CrmError {
    #[error("producer {0} not found")]
    ProducerNotFound(WellId),

    #[error("well {0} is not a producer")]
    NotAProducer(WellId),

    #[error("well {0} has no open or partially open horizon")]
    NoEligibleHorizon(WellId),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CrmError {
    /// Errors caused by the request rather than by the service.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CrmError::Store(_))
    }
}
