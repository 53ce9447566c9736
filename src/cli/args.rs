//! Command line argument parsing

use crate::core::Cooldown;
use crate::platform::client::DEFAULT_USER_AGENT;
use crate::platform::Endpoints;
use clap::Parser;
use std::time::Duration;

/// gatekey - resolve an access key through link-shortener gates
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Link that triggered the request (recorded, routing uses the discovered keyUrl)
    pub url: Option<String>,

    /// Landing page carrying the bootstrap headers
    #[arg(long, env = "TARGET_URL", value_name = "URL")]
    pub landing_url: Option<String>,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Wait before the lksfy form submission
    #[arg(long, value_name = "DURATION", default_value = "5s")]
    pub cooldown: humantime::Duration,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Proxy URL (http/https/socks)
    #[arg(long, value_name = "URL")]
    pub proxy: Option<String>,

    /// Disable TLS certificate verification
    #[arg(long)]
    pub ssl_bypass: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Debug logging
    #[arg(long)]
    pub debug: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// Get submission cooldown
    pub fn cooldown(&self) -> Cooldown {
        Cooldown::new(self.cooldown.into())
    }

    /// User agent to send, falling back to the one the gate expects
    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    /// Upstream hosts with the landing override applied
    pub fn endpoints(&self) -> Endpoints {
        let mut endpoints = Endpoints::default();
        if let Some(landing_url) = &self.landing_url {
            endpoints.landing_url = landing_url.clone();
        }
        endpoints
    }

    /// Log filter directive for tracing
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "info"
        }
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose || self.debug {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            url: None,
            landing_url: None,
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            cooldown: humantime::Duration::from(Duration::from_secs(5)),
            user_agent: None,
            proxy: None,
            ssl_bypass: false,
            json: false,
            debug: false,
            verbose: false,
            quiet: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "gatekey",
            "https://example.com/share",
            "--timeout",
            "1m",
            "--cooldown",
            "0s",
            "--ssl-bypass",
            "--json",
        ])
        .unwrap();

        assert_eq!(args.url.as_deref(), Some("https://example.com/share"));
        assert_eq!(args.timeout_duration(), Duration::from_secs(60));
        assert_eq!(args.cooldown(), Cooldown::none());
        assert!(args.ssl_bypass);
        assert!(args.json);
    }

    #[test]
    fn test_url_is_optional() {
        let args = Args::try_parse_from(["gatekey"]).unwrap();
        assert_eq!(args.url, None);
        assert_eq!(args.cooldown(), Cooldown::default());
    }

    #[test]
    fn test_args_verbosity_level() {
        let args = Args::default();
        assert_eq!(args.verbosity_level(), VerbosityLevel::Normal);

        let args = Args {
            quiet: true,
            ..Default::default()
        };
        assert_eq!(args.verbosity_level(), VerbosityLevel::Quiet);

        let args = Args {
            verbose: true,
            ..Default::default()
        };
        assert_eq!(args.verbosity_level(), VerbosityLevel::Verbose);

        let args = Args {
            debug: true,
            ..Default::default()
        };
        assert_eq!(args.verbosity_level(), VerbosityLevel::Verbose);
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(Args::default().log_filter(), "info");
        let args = Args {
            debug: true,
            quiet: true,
            ..Default::default()
        };
        assert_eq!(args.log_filter(), "debug");
        let args = Args {
            quiet: true,
            ..Default::default()
        };
        assert_eq!(args.log_filter(), "error");
    }

    #[test]
    fn test_endpoints_override() {
        assert_eq!(Args::default().endpoints(), Endpoints::default());

        let args = Args {
            landing_url: Some("http://localhost:8080".to_string()),
            ..Default::default()
        };
        let endpoints = args.endpoints();
        assert_eq!(endpoints.landing_url, "http://localhost:8080");
        assert_eq!(endpoints.lksfy_host, "https://lksfy.com");
    }

    #[test]
    fn test_user_agent_fallback() {
        assert_eq!(Args::default().user_agent(), "Dart/3.8 (dart:io)");
        let args = Args {
            user_agent: Some("Custom Agent".to_string()),
            ..Default::default()
        };
        assert_eq!(args.user_agent(), "Custom Agent");
    }
}
