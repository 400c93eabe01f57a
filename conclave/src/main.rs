use args::Args;
use clap::Parser;

mod args;
mod logger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::Config::from_env();

    logger::init(args.log_level.as_deref().unwrap_or(&config.log_level));

    if !config.providers.any_enabled() {
        log::error!(
            "No provider API keys configured. Set at least one of GEMINI_API_KEY, OPENAI_API_KEY, \
             XAI_API_KEY, OPENROUTER_API_KEY, DIAL_API_KEY (+DIAL_API_HOST) or CUSTOM_API_URL."
        );
        anyhow::bail!("no providers configured");
    }

    let registry = llm::ProviderRegistry::from_settings(&config.providers);

    let enabled = config
        .providers
        .enabled_kinds()
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    log::info!("Providers enabled: {enabled}");
    log::info!("Default model: {}", config.default_model);

    let env = tools::ToolEnv::new(config, registry);

    server::serve_stdio(env, tools::ToolRegistry::with_default_tools()).await
}
