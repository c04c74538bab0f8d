use std::num::NonZeroU32;
use std::time::Duration;

use clap::Parser;

use crate::config::{
    DEFAULT_BATCH_DELAY, DEFAULT_CALL_DELAY, DEFAULT_MAX_AUTH_RESTARTS, DEFAULT_REQUEST_TIMEOUT,
    RawConfig, parse_iteration_count,
};
use crate::error::{Error, Result};

/// Prompt shown when the iteration count is not given on the command line.
pub const ITERATION_PROMPT: &str = "Input Grow Amount:";

#[derive(Parser, Debug, Clone)]
#[command(name = "hanagrow", author, version, about, long_about = None)]
pub struct Args {
    /// Refresh token used to obtain access tokens
    #[arg(long, env = "REFRESH_TOKEN", hide_env_values = true)]
    pub refresh_token: Option<String>,

    /// Identity provider API key
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Proxy for all requests (http://, https:// or socks5://)
    #[arg(long, env = "PROXY_URL")]
    pub proxy: Option<String>,

    /// Iterations per batch; prompted for when omitted
    #[arg(short = 'n', long, env = "HANAGROW_ITERATIONS")]
    pub iterations: Option<String>,

    /// Seconds to wait after each iteration
    #[arg(long, default_value_t = DEFAULT_CALL_DELAY.as_secs())]
    pub call_delay: u64,

    /// Seconds to wait between batches
    #[arg(long, default_value_t = DEFAULT_BATCH_DELAY.as_secs())]
    pub batch_delay: u64,

    /// Request timeout in seconds (0 disables it)
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT.as_secs())]
    pub timeout: u64,

    /// Token refreshes allowed within one iteration before the run is restarted
    #[arg(long, default_value_t = DEFAULT_MAX_AUTH_RESTARTS)]
    pub max_auth_restarts: u32,

    /// GraphQL endpoint
    #[arg(long, default_value = hanafuda_api::graphql::GRAPHQL_URL)]
    pub graphql_url: String,

    /// Token refresh endpoint
    #[arg(long, default_value = hanafuda_api::auth::TOKEN_URL)]
    pub token_url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl Args {
    pub fn raw_config(&self) -> RawConfig {
        RawConfig {
            refresh_token: self.refresh_token.clone(),
            api_key: self.api_key.clone(),
            proxy: self.proxy.clone(),
            graphql_url: self.graphql_url.clone(),
            token_url: self.token_url.clone(),
            request_timeout: Duration::from_secs(self.timeout),
            call_delay: Duration::from_secs(self.call_delay),
            batch_delay: Duration::from_secs(self.batch_delay),
            max_auth_restarts: self.max_auth_restarts,
        }
    }

    /// Iteration count from the arguments, or from the operator.
    pub fn iteration_count(&self) -> Result<NonZeroU32> {
        match self.iterations.as_deref() {
            Some(value) => parse_iteration_count(value),
            None => parse_iteration_count(&prompt_iteration_count()?),
        }
    }
}

#[cfg(feature = "interactive")]
fn prompt_iteration_count() -> Result<String> {
    inquire::Text::new(ITERATION_PROMPT)
        .prompt()
        .map_err(|e| Error::validation(format!("No iteration count given: {e}")))
}

#[cfg(not(feature = "interactive"))]
fn prompt_iteration_count() -> Result<String> {
    use std::io::{BufRead, Write};

    print!("{ITERATION_PROMPT} ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(Error::validation("No iteration count given"));
    }
    Ok(line)
}
