use anyhow::Context;
use clap::Parser;
use emoji_like_core::{config_handle, EmojiLike, EmojiLikeConfig, PluginSettings};
use emoji_like_onebot::OneBotClient;
use emoji_like_reasoning::{create_client, CompletionParams, LlmSentimentClassifier};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emoji-like", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, env = "EMOJI_LIKE_CONFIG", default_value = "emoji_like.toml")]
    config: PathBuf,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenv::dotenv().ok();
    init_tracing(args.log_json);

    info!("Loading config from {}...", args.config.display());
    let cfg = EmojiLikeConfig::load_or_default(&args.config)
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;
    if cfg.admins.is_empty() {
        warn!("No admins configured, admin-only commands are unavailable");
    }
    let onebot = cfg
        .onebot
        .clone()
        .context("Missing [onebot] section (or ONEBOT_WS_URL)")?;

    info!("Starting LLM provider {} with model {}...", cfg.llm.provider, cfg.llm.model);
    let llm = create_client(&cfg.llm)?;
    let classifier = Arc::new(LlmSentimentClassifier::new(
        llm,
        CompletionParams::from(&cfg.llm),
    ));

    let (client, mut events) = OneBotClient::connect(&onebot.ws_url, onebot.access_token.clone())?;

    let bot = Arc::new(EmojiLike::new(
        PluginSettings::from(&cfg),
        config_handle(cfg.reaction.clone()),
        Arc::new(client),
        classifier,
    ));
    info!(
        "emoji-like online, {} ids in the reaction list",
        bot.allow_list().len()
    );

    loop {
        tokio::select! {
            next = events.recv() => {
                let Some(event) = next else {
                    warn!("OneBot event stream ended");
                    break;
                };
                let bot = bot.clone();
                tokio::spawn(async move {
                    let outcome = bot.handle(&event).await;
                    debug!(message_id = %event.message_id, ?outcome, "Event handled");
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
