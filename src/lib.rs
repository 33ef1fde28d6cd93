pub mod config;
pub mod facade;
pub mod image;
pub mod logging;
pub mod model;
pub mod providers;
pub mod repl;
pub mod response;

use anyhow::{Context, Result};
use reqwest::Client;
use std::env;
use std::time::Duration;
use tracing::info;

use config::Config;
use facade::ChatFacade;
use model::Mode;
use repl::{Console, print_response, run_repl};

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cfg = Config::from_env();
    info!(
        model_base_url = %cfg.model_base_url,
        model_timeout_secs = cfg.model_timeout_secs,
        text_models = cfg.catalog.models(Mode::Text).len(),
        image_models = cfg.catalog.models(Mode::Image).len(),
        "loaded runtime configuration"
    );

    let client = Client::builder()
        .timeout(Duration::from_secs(cfg.model_timeout_secs))
        .build()
        .context("Failed to initialize HTTP client")?;
    let mut facade = ChatFacade::new(client, &cfg);
    let mut console = Console::stdio();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        run_repl(&mut facade, &mut console).await
    } else {
        let model = facade
            .catalog()
            .models(Mode::Text)
            .first()
            .cloned()
            .unwrap_or_default();
        let question = args.join(" ");
        match facade.ask_question(&question, &model, None).await {
            Ok(response) => print_response(&mut console, &response),
            Err(err) => console.say(format!("Error: {err}")),
        }
    }
}
