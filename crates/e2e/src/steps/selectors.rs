//! Selector chains for the login pages and the admin console
//!
//! Ordered most to least specific. Append new strategies at the end.

use crate::locator::SelectorChain;

pub fn login_form() -> SelectorChain {
    SelectorChain::new(
        "login form",
        ["#kc-form-login", "form[action*='login-actions']", "#kc-login"],
    )
}

pub fn username_field() -> SelectorChain {
    SelectorChain::new(
        "username field",
        ["#username", "input[name='username']", "input[autocomplete='username']"],
    )
}

pub fn password_field() -> SelectorChain {
    SelectorChain::new(
        "password field",
        ["#password", "input[name='password']", "input[type='password']"],
    )
}

pub fn submit_button() -> SelectorChain {
    SelectorChain::new(
        "submit button",
        ["#kc-login", "button[type='submit']", "input[type='submit']"],
    )
}

pub fn login_error() -> SelectorChain {
    SelectorChain::new(
        "login error",
        [
            "#input-error",
            "#input-error-username",
            ".kc-feedback-text",
            ".alert-error",
            "[class*='alert-error']",
        ],
    )
}

/// Elements only the authenticated console renders
pub fn admin_indicator() -> SelectorChain {
    SelectorChain::new(
        "admin console indicator",
        [
            "[data-testid='options-toggle']",
            "#nav-toggle",
            "[data-testid='realmSelector']",
            ".pf-c-page__sidebar",
            ".pf-v5-c-page__sidebar",
        ],
    )
}

pub fn logout_confirm() -> SelectorChain {
    SelectorChain::new("logout confirmation", ["#kc-logout", "input[name='confirmLogout']"])
}
