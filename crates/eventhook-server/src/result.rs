//! Shaping of dispatch outcomes into the protocol result envelope.

use eventhook_api::RemoteEventResult;

use crate::dispatcher::ReconciliationOutcome;

/// Success maps to `OK` plus any item field assignments; failure maps to
/// `CancelWithError` carrying the error's full diagnostic text.
pub fn build_result(outcome: ReconciliationOutcome) -> RemoteEventResult {
    match outcome {
        Ok(outcome) => outcome
            .changed_item_properties
            .into_iter()
            .fold(RemoteEventResult::ok(), |result, (field, value)| {
                result.with_changed_property(field, value)
            }),
        Err(err) => RemoteEventResult::cancel_with_error(err.to_string()),
    }
}
