use crate::config::ConsoleConfig;
use tracing::debug;

pub fn init(config: &ConsoleConfig) {
    tracing_subscriber::fmt()
        .with_level(true)
        .with_thread_ids(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    debug!("Loaded Config: {:?}", config);
}

pub fn http_client(config: &ConsoleConfig) -> reqwest::Result<reqwest::Client> {
    debug!("Creating GraphQL HTTP client for {}", config.graphql_url());
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .build()
}
