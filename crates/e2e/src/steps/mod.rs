//! Scenario step library
//!
//! Every step is a plain async function over `&mut ExecutionContext` plus
//! the literal arguments of the scenario line, and takes its wait budget as
//! an explicit [`std::time::Duration`]. Failures propagate as
//! [`crate::E2eError`]; the only local recovery is the documented fallback in
//! [`assert_logged_in`] and the audit failure policy in [`run_audit`].

mod audit;
mod console;
mod login;
pub mod selectors;

pub use audit::{assert_metric_below, assert_score_above, run_audit};
pub use console::{assert_text_visible, logout, navigate_to_console};
pub use login::{
    assert_error_shown, assert_logged_in, enter_credential, navigate_to_login, resolve_credential,
    submit_login, Credential,
};
