//! # Stage Contract
//!
//! Every stage runs the same routine: record its own contribution (with a
//! sentinel if its capability fails), then, unless it is the last stage,
//! call the next one and fold the answer in. Faults never abort the routine;
//! they are recorded in the envelope and the stage still answers its caller.

use async_trait::async_trait;
use error_handling_rs::ErrorInfo;
use shared_types_rs::{Envelope, StageName};
use tracing::{debug, info, Instrument};

#[async_trait]
pub trait Stage: Send + Sync {
    /// Validated input for one request
    type Input: Send + Sync;

    fn name(&self) -> StageName;

    /// Invoke the capability and record this stage's contribution.
    ///
    /// On capability failure the implementation records its sentinel values
    /// and returns the fault.
    async fn contribute(&self, input: &Self::Input, envelope: &mut Envelope) -> Option<ErrorInfo>;

    /// Call the next stage with the current envelope.
    ///
    /// `None` means there is no next stage.
    async fn forward(&self, _input: &Self::Input, _envelope: &Envelope) -> Option<Result<Envelope, ErrorInfo>> {
        None
    }
}

/// Run one stage for one request and return the merged envelope.
pub async fn execute<S>(stage: &S, request_id: &str, input: S::Input) -> Envelope
where
    S: Stage + ?Sized,
{
    let span = tracing::info_span!("stage", stage = %stage.name(), request_id = %request_id);

    async move {
        let mut envelope = Envelope::new(request_id);

        if let Some(fault) = stage.contribute(&input, &mut envelope).await {
            fault.log();
            envelope.record_fault(fault);
        }

        match stage.forward(&input, &envelope).await {
            None => debug!("Terminal stage, nothing to forward"),
            Some(Ok(downstream)) => envelope.absorb(downstream),
            Some(Err(fault)) => {
                fault.log();
                envelope.record_hop_fault(fault);
            }
        }

        info!(
            reached = ?envelope.reached_stages(),
            downstream_error = ?envelope.downstream_error().map(|e| e.kind),
            "Stage completed"
        );
        envelope
    }
    .instrument(span)
    .await
}
