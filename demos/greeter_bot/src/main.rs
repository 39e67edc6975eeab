//! Greeter Bot Example
//!
//! A console bot: every line typed on stdin becomes a text message from one
//! user in one chat, and bot output is printed. Type `!press <data>` to press
//! an inline button on the last message the bot sent.
//!
//! Components are registered at link time with `#[update_component]` and
//! `#[scene]`; the runtime collects them during bring-up.
//!
//! ```text
//! > /start
//! bot #1> Hi! What's your name?
//! > Ada
//! bot #2> Nice to meet you, Ada! Favourite colour?  [red] [green] [blue]
//! > !press color:green
//! bot #2 (edited)> Ada likes green.
//! bot #3> Type /start to go again.
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package greeter-bot
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::Result;
use stagehand::core::{ApiResult, CallbackQuery, CommandArgs, Message, TriggerMatch, Triggers, User};
use stagehand::prelude::*;
use stagehand::runtime::ConfigLoader;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};

const CHAT_ID: i64 = 1;

const HELP: &str = "/start - introduce yourself\n/echo <text> - repeat text\n/help - this help";

// ============================================================================
// Console transport
// ============================================================================

/// Prints outgoing messages instead of calling a platform.
#[derive(Debug, Default)]
struct ConsoleApi {
    last_message_id: AtomicI64,
}

impl ConsoleApi {
    fn last_message_id(&self) -> i64 {
        self.last_message_id.load(Ordering::SeqCst)
    }
}

fn render_markup(markup: Option<&ReplyMarkup>) -> String {
    let Some(ReplyMarkup::InlineKeyboard(rows)) = markup else {
        return String::new();
    };
    rows.iter()
        .flatten()
        .map(|b| format!(" [{}]", b.text))
        .collect()
}

#[async_trait]
impl BotApi for ConsoleApi {
    async fn send_message(
        &self,
        _chat_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> ApiResult<i64> {
        let id = self.last_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        println!("bot #{id}> {text}{}", render_markup(markup));
        Ok(id)
    }

    async fn edit_message_text(
        &self,
        _chat_id: i64,
        message_id: i64,
        text: &str,
        markup: Option<&ReplyMarkup>,
    ) -> ApiResult<()> {
        println!("bot #{message_id} (edited)> {text}{}", render_markup(markup));
        Ok(())
    }

    async fn answer_callback_query(&self, _query_id: &str, _text: Option<&str>) -> ApiResult<()> {
        Ok(())
    }
}

/// Turns stdin lines into updates.
struct StdinSource {
    lines: Lines<BufReader<Stdin>>,
    api: Arc<ConsoleApi>,
    update_id: i64,
}

impl StdinSource {
    fn new(api: Arc<ConsoleApi>) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            api,
            update_id: 0,
        }
    }

    fn user() -> User {
        User {
            id: 42,
            username: Some("console".into()),
            first_name: "Console".into(),
        }
    }

    fn to_update(&self, line: &str) -> Update {
        match line.strip_prefix("!press ") {
            Some(data) => {
                let shown = self.api.last_message_id();
                Update::callback_query(
                    self.update_id,
                    CallbackQuery {
                        id: format!("press-{}", self.update_id),
                        from: Self::user(),
                        message: Some(Message::text(shown, CHAT_ID, None, "")),
                        data: Some(data.trim().to_string()),
                    },
                )
            }
            None => Update::message(
                self.update_id,
                Message::text(self.update_id, CHAT_ID, Some(Self::user()), line),
            ),
        }
    }
}

#[async_trait]
impl UpdateSource for StdinSource {
    async fn start(&mut self, options: stagehand::core::LaunchOptions) -> ApiResult<()> {
        info!(?options, "Reading updates from stdin");
        Ok(())
    }

    async fn next_update(&mut self) -> Option<Update> {
        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => {
                    warn!(error = %e, "Failed to read stdin");
                    return None;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            self.update_id += 1;
            return Some(self.to_update(line));
        }
    }
}

// ============================================================================
// Components
// ============================================================================

#[update_component]
fn basics() -> HandlerInstance {
    HandlerInstance::new("basics")
        .middleware(
            "trace",
            middleware_fn(|ctx, next: Next| {
                if let Some(text) = ctx.text() {
                    info!(text, "Incoming message");
                }
                next.run(ctx)
            }),
        )
        .on_command(
            "start",
            "start",
            handler_fn(|ctx| async move { ctx.enter_scene("greeting").await }),
        )
        .on_command(
            "help",
            "help",
            handler_fn(|ctx| async move {
                ctx.reply(HELP, None).await?;
                Ok(())
            }),
        )
        .on_command(
            "echo",
            "echo",
            handler_fn(|ctx| async move {
                let payload = ctx.get::<CommandArgs>().map(|a| a.payload).unwrap_or_default();
                ctx.reply(&payload, None).await?;
                Ok(())
            }),
        )
        .guard(
            "echo",
            guard_if(|ctx| ctx.get::<CommandArgs>().is_some_and(|a| !a.payload.is_empty())),
        )
}

struct Greeting {
    colors: Vec<&'static str>,
}

impl Greeting {
    async fn ask_name(self: Arc<Self>, ctx: Arc<Context>) -> HandlerResult {
        ctx.reply("Hi! What's your name?", None).await?;
        Ok(())
    }

    async fn take_name(self: Arc<Self>, ctx: Arc<Context>) -> HandlerResult {
        let name = ctx.text().unwrap_or_default().to_string();
        ctx.set_scene_state("name", &name)?;

        let buttons: Vec<InlineButton> = self
            .colors
            .iter()
            .map(|c| InlineButton::callback(*c, format!("color:{c}")))
            .collect();
        let keyboard = ReplyMarkup::inline([buttons]);
        ctx.reply(&format!("Nice to meet you, {name}! Favourite colour?"), Some(&keyboard))
            .await?;
        Ok(())
    }

    async fn pick_color(self: Arc<Self>, ctx: Arc<Context>) -> HandlerResult {
        let picked = ctx.get::<TriggerMatch>().map(|m| m.matched).unwrap_or_default();
        let color = picked.trim_start_matches("color:");
        let name: String = ctx.scene_state("name")?.unwrap_or_else(|| "Stranger".into());

        ctx.edit_reply(&format!("{name} likes {color}."), None).await?;
        ctx.leave_scene().await
    }

    async fn say_bye(self: Arc<Self>, ctx: Arc<Context>) -> HandlerResult {
        ctx.reply("Type /start to go again.", None).await?;
        Ok(())
    }
}

#[scene("greeting")]
fn greeting() -> HandlerInstance {
    let this = Arc::new(Greeting {
        colors: vec!["red", "green", "blue"],
    });
    let colors: Triggers = this.colors.iter().map(|c| format!("color:{c}")).collect();

    HandlerInstance::new("greeting")
        .on_enter("ask_name", bind(&this, Greeting::ask_name))
        .on_leave("say_bye", bind(&this, Greeting::say_bye))
        .on_action("pick_color", colors, bind(&this, Greeting::pick_color))
        .on_event("take_name", [MessageField::Text], bind(&this, Greeting::take_name))
        .guard(
            "take_name",
            guard_if(|ctx| ctx.text().is_some_and(|t| !t.starts_with('/'))),
        )
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // The console needs no token; a config file or STAGEHAND_BOT__TOKEN still wins.
    let mut defaults = StagehandConfig::default();
    defaults.bot.token = "console".to_string();
    let config = ConfigLoader::new().merge(defaults).load()?;

    let api = Arc::new(ConsoleApi::default());
    let source = StdinSource::new(Arc::clone(&api));

    let bot = Bootstrap::new(config, api)
        .on_scene_registered(|id| async move {
            info!(scene = %id, "Scene registered");
            Ok(())
        })
        .catch(|err, ctx| async move {
            warn!(error = %err, "Handler failed");
            ctx.reply("Something went wrong.", None).await?;
            Ok(())
        })
        .bring_up()
        .await?;

    println!("{HELP}\nUse `!press <data>` to press a button. Ctrl+D quits.");
    let summary = bot.launch(source).await?;
    info!(received = summary.received, failed = summary.failed, "Bye");

    Ok(())
}
