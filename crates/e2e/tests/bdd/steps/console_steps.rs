use cucumber::{then, when};

use console_e2e::steps;
use console_e2e::E2eResult;

use super::budget;
use crate::world::ConsoleWorld;

#[when("I open the admin console")]
async fn open_console(world: &mut ConsoleWorld) -> E2eResult<()> {
    let timeout = world.timeouts().navigation;
    steps::navigate_to_console(&mut world.ctx, timeout).await
}

#[then(regex = r#"^I should see the text "([^"]*)"(.*)$"#)]
async fn should_see_text(world: &mut ConsoleWorld, text: String, tail: String) -> E2eResult<()> {
    let timeout = budget(&tail, world.timeouts().element);
    steps::assert_text_visible(&mut world.ctx, &text, timeout).await
}

#[when("I log out")]
async fn log_out(world: &mut ConsoleWorld) -> E2eResult<()> {
    let timeout = world.timeouts().navigation;
    steps::logout(&mut world.ctx, timeout).await
}
