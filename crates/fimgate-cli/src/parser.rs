//! Command-line arguments.
//!
//! Every flag can also be set through the environment; explicit flags win.

use std::time::Duration;

use clap::Parser;
use fimgate_core::ModelRouting;
use fimgate_proxy::ProxyConfig;

/// Ollama-compatible code-completion gateway for a remote chat backend.
#[derive(Debug, Parser)]
#[command(name = "fimgate")]
#[command(about = "Serve Ollama and OpenAI completion APIs backed by a remote chat model")]
#[command(version)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "FIMGATE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind (Ollama's default port)
    #[arg(short, long, env = "FIMGATE_PORT", default_value_t = 11434)]
    pub port: u16,

    /// Upstream chat-completions URL
    #[arg(long = "upstream-url")]
    pub upstream_url: Option<String>,

    /// Reject unknown chat model names instead of using the default model
    #[arg(long = "strict-models")]
    pub strict_models: bool,

    /// Seconds allowed for connecting to the upstream
    #[arg(long = "connect-timeout-secs", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Seconds allowed for a buffered upstream call or one streaming read
    #[arg(long = "request-timeout-secs", default_value_t = 60)]
    pub request_timeout_secs: u64,
}

impl Cli {
    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Layer the flags over a configuration read from the environment.
    pub fn apply(&self, mut config: ProxyConfig) -> ProxyConfig {
        if let Some(url) = &self.upstream_url {
            config = config.with_upstream_url(url.clone());
        }
        if self.strict_models {
            config = config.with_routing(ModelRouting::Strict);
        }
        config
            .with_connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}
