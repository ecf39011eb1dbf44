use cucumber::{given, then, when};

use console_e2e::steps::{self, selectors, Credential};
use console_e2e::E2eResult;

use super::budget;
use crate::world::ConsoleWorld;

#[given(regex = r"^I am on the login page(.*)$")]
async fn on_login_page(world: &mut ConsoleWorld, tail: String) -> E2eResult<()> {
    let timeout = budget(&tail, world.timeouts().navigation);
    steps::navigate_to_login(&mut world.ctx, timeout).await?;
    Ok(())
}

#[when(regex = r#"^I enter username "([^"]*)"$"#)]
async fn enter_username(world: &mut ConsoleWorld, value: String) -> E2eResult<()> {
    let timeout = world.timeouts().element;
    steps::enter_credential(&mut world.ctx, Credential::Username, &value, timeout).await
}

#[when(regex = r#"^I enter password "([^"]*)"$"#)]
async fn enter_password(world: &mut ConsoleWorld, value: String) -> E2eResult<()> {
    let timeout = world.timeouts().element;
    steps::enter_credential(&mut world.ctx, Credential::Password, &value, timeout).await
}

#[when("I click the login button")]
async fn click_login(world: &mut ConsoleWorld) -> E2eResult<()> {
    let timeout = world.timeouts().element;
    steps::submit_login(&mut world.ctx, timeout).await
}

#[given(regex = r#"^I am logged in as "([^"]*)" with password "([^"]*)"$"#)]
async fn logged_in_as(world: &mut ConsoleWorld, username: String, password: String) -> E2eResult<()> {
    let timeouts = world.timeouts();
    let ctx = &mut world.ctx;
    steps::navigate_to_login(ctx, timeouts.navigation).await?;
    steps::enter_credential(ctx, Credential::Username, &username, timeouts.element).await?;
    steps::enter_credential(ctx, Credential::Password, &password, timeouts.element).await?;
    steps::submit_login(ctx, timeouts.element).await?;
    steps::assert_logged_in(ctx, timeouts.url_change).await
}

#[then(regex = r"^I should be logged in(.*)$")]
async fn should_be_logged_in(world: &mut ConsoleWorld, tail: String) -> E2eResult<()> {
    let timeout = budget(&tail, world.timeouts().url_change);
    steps::assert_logged_in(&mut world.ctx, timeout).await
}

#[then(regex = r"^I should see a login error(.*)$")]
async fn should_see_error(world: &mut ConsoleWorld, tail: String) -> E2eResult<()> {
    let timeout = budget(&tail, world.timeouts().element);
    steps::assert_error_shown(&mut world.ctx, timeout).await
}

#[then(regex = r"^I should see the login form(.*)$")]
async fn should_see_login_form(world: &mut ConsoleWorld, tail: String) -> E2eResult<()> {
    let timeout = budget(&tail, world.timeouts().element);
    selectors::login_form()
        .first_visible(world.ctx.page()?, timeout)
        .await?;
    Ok(())
}
