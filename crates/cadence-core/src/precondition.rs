//! Precondition gate
//!
//! Independent precondition checks each report either success or a failure.
//! [`summarize`] reduces one batch of outcomes into a single block decision
//! plus a combined, operator-facing error. The batch is never short-circuited:
//! every failure appears in the combined message, in the order given.
//!
//! Failures that are [`UpdateError`]s with a name and reason are rendered as
//! `Precondition "<name>" failed because of "<reason>": <message>`. Any other
//! error is passed through with its own message.

use crate::error::{BoxError, UpdateError};

/// Reason attached to the combined gate error
pub const GATE_REASON: &str = "UpgradePreconditionCheckFailed";

/// Name attached to the combined gate error
pub const GATE_NAME: &str = "PreconditionChecks";

const FORCED_PREFIX: &str = "Forced through blocking failures: ";
const MULTIPLE_HEADER: &str = "Multiple precondition checks failed:";

/// Reduce a batch of precondition outcomes to `(block, combined_error)`
///
/// `None` entries are passed checks. With no failures the result is
/// `(false, None)`. Otherwise `block` is `!force` and the combined error is
/// always returned, forced or not.
///
/// Only a lone failure gets the forced prefix; with several failures the
/// "Multiple precondition checks failed:" header is used whether or not
/// `force` is set.
pub fn summarize<I>(errors: I, force: bool) -> (bool, Option<UpdateError>)
where
    I: IntoIterator<Item = Option<BoxError>>,
{
    let mut failures: Vec<BoxError> = errors.into_iter().flatten().collect();

    match failures.len() {
        0 => (false, None),
        1 => {
            let failure = failures.remove(0);
            let line = render(&failure);
            let message = if force {
                format!("{FORCED_PREFIX}{line}")
            } else {
                line
            };
            (
                !force,
                Some(UpdateError::new(GATE_REASON, GATE_NAME, message).with_nested(failure)),
            )
        }
        _ => {
            let lines: Vec<String> = failures.iter().map(render).collect();
            let message = format!("{MULTIPLE_HEADER}\n* {}", lines.join("\n* "));
            (!force, Some(UpdateError::new(GATE_REASON, GATE_NAME, message)))
        }
    }
}

/// Render one failure as a single line of the combined message
fn render(failure: &BoxError) -> String {
    match failure.downcast_ref::<UpdateError>() {
        Some(err) if err.is_identified() => err.precondition_message(),
        _ => failure.to_string(),
    }
}
