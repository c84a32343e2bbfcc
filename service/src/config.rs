use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use std::time::Duration;

/// Default Coze Open API base URL used when `COZE_BASE_URL` is not set.
pub const DEFAULT_COZE_BASE_URL: &str = "https://api.coze.cn";

/// Local development origins that are always accepted by the CORS policy.
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:3001,\
http://127.0.0.1:3000,http://127.0.0.1:3001,http://localhost:5173,http://127.0.0.1:5173";

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = DEFAULT_ALLOWED_ORIGINS
    )]
    pub allowed_origins: Vec<String>,

    /// The base URL of the Coze Open API.
    /// Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_COZE_BASE_URL)]
    coze_base_url: String,

    /// The personal access token sent as a bearer credential to the Coze Open API.
    #[arg(long, env)]
    coze_token: Option<String>,

    /// The workflow run by the `run-workflow` stream endpoint.
    #[arg(long, env)]
    coze_workflow_id: Option<String>,

    /// The default workflow run by the `home` stream endpoint when the caller
    /// does not name one.
    #[arg(long, env)]
    coze_workflow_id_home: Option<String>,

    /// Bot binding applied to workflow runs when the caller does not supply one.
    #[arg(long, env)]
    default_bot_id: Option<String>,

    /// App binding applied to workflow runs when the caller does not supply one.
    #[arg(long, env)]
    default_app_id: Option<String>,

    /// Workflow version applied to workflow runs when the caller does not supply one.
    #[arg(long, env)]
    default_workflow_version: Option<String>,

    /// Milliseconds between `: ping` comment frames written to an open event stream
    #[arg(long, env, default_value_t = 1000)]
    pub keep_alive_interval_ms: u64,

    /// Number of upstream chunks that may be queued for a slow client before
    /// upstream reads are paused
    #[arg(long, env, default_value_t = 16)]
    pub relay_buffer_chunks: usize,

    /// Timeout in seconds for establishing the upstream TCP/TLS connection
    #[arg(long, env, default_value_t = 10)]
    pub upstream_connect_timeout_secs: u64,

    /// Largest accepted inbound request body, in bytes
    #[arg(long, env, default_value_t = 20 * 1024 * 1024)]
    pub max_request_body_bytes: usize,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "0.0.0.0")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 3000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    /// Returns the Coze Open API base URL without a trailing slash.
    pub fn coze_base_url(&self) -> &str {
        self.coze_base_url.trim_end_matches('/')
    }

    pub fn set_coze_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.coze_base_url = base_url.into();
        self
    }

    /// Returns the Coze access token, if configured.
    pub fn coze_token(&self) -> Option<String> {
        non_empty(&self.coze_token)
    }

    pub fn set_coze_token(mut self, token: Option<&str>) -> Self {
        self.coze_token = token.map(str::to_string);
        self
    }

    /// Returns the workflow ID for the `run-workflow` endpoint, if configured.
    pub fn coze_workflow_id(&self) -> Option<String> {
        non_empty(&self.coze_workflow_id)
    }

    pub fn set_coze_workflow_id(mut self, workflow_id: Option<&str>) -> Self {
        self.coze_workflow_id = workflow_id.map(str::to_string);
        self
    }

    /// Returns the default workflow ID for the `home` endpoint, if configured.
    pub fn coze_workflow_id_home(&self) -> Option<String> {
        non_empty(&self.coze_workflow_id_home)
    }

    pub fn set_coze_workflow_id_home(mut self, workflow_id: Option<&str>) -> Self {
        self.coze_workflow_id_home = workflow_id.map(str::to_string);
        self
    }

    pub fn default_bot_id(&self) -> Option<String> {
        non_empty(&self.default_bot_id)
    }

    pub fn default_app_id(&self) -> Option<String> {
        non_empty(&self.default_app_id)
    }

    pub fn default_workflow_version(&self) -> Option<String> {
        non_empty(&self.default_workflow_version)
    }

    /// Sets the default bot, app and workflow version bindings in one call.
    pub fn set_default_bindings(
        mut self,
        bot_id: Option<&str>,
        app_id: Option<&str>,
        workflow_version: Option<&str>,
    ) -> Self {
        self.default_bot_id = bot_id.map(str::to_string);
        self.default_app_id = app_id.map(str::to_string);
        self.default_workflow_version = workflow_version.map(str::to_string);
        self
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_millis(self.keep_alive_interval_ms)
    }

    pub fn upstream_connect_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_connect_timeout_secs)
    }

    pub fn interface(&self) -> &str {
        self.interface.as_deref().unwrap_or("0.0.0.0")
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn bare_config() -> Config {
        Config::parse_from(["coze_relay"])
            .set_coze_token(None)
            .set_coze_workflow_id(None)
            .set_coze_workflow_id_home(None)
            .set_default_bindings(None, None, None)
    }

    #[test]
    fn test_empty_strings_are_treated_as_unset() {
        let config = bare_config()
            .set_coze_token(Some(""))
            .set_coze_workflow_id(Some(""))
            .set_default_bindings(Some(""), Some("app_1"), None);

        assert_eq!(config.coze_token(), None);
        assert_eq!(config.coze_workflow_id(), None);
        assert_eq!(config.default_bot_id(), None);
        assert_eq!(config.default_app_id(), Some("app_1".to_string()));
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let config = bare_config().set_coze_base_url("http://127.0.0.1:1234/");
        assert_eq!(config.coze_base_url(), "http://127.0.0.1:1234");
    }

    #[test]
    fn test_flag_overrides_are_parsed() {
        let config = Config::parse_from([
            "coze_relay",
            "--port",
            "8080",
            "--keep-alive-interval-ms",
            "250",
            "--allowed-origins",
            "https://a.example,https://b.example",
        ]);

        assert_eq!(config.port, 8080);
        assert_eq!(config.keep_alive_interval(), Duration::from_millis(250));
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    /// Declared default and environment variable of a flag, read from the
    /// command definition so the process environment cannot leak in.
    fn declared(id: &str) -> (String, Option<String>) {
        let command = Config::command();
        let arg = command
            .get_arguments()
            .find(|arg| arg.get_id().as_str() == id)
            .unwrap_or_else(|| panic!("no argument {id}"));
        let default = arg
            .get_default_values()
            .iter()
            .map(|v| v.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(",");
        let env = arg.get_env().map(|v| v.to_string_lossy().into_owned());
        (default, env)
    }

    #[test]
    fn test_relay_tuning_defaults() {
        for (id, default, env) in [
            ("keep_alive_interval_ms", "1000", "KEEP_ALIVE_INTERVAL_MS"),
            ("relay_buffer_chunks", "16", "RELAY_BUFFER_CHUNKS"),
            ("upstream_connect_timeout_secs", "10", "UPSTREAM_CONNECT_TIMEOUT_SECS"),
            ("max_request_body_bytes", "20971520", "MAX_REQUEST_BODY_BYTES"),
            ("coze_base_url", DEFAULT_COZE_BASE_URL, "COZE_BASE_URL"),
            ("port", "3000", "PORT"),
        ] {
            assert_eq!(
                declared(id),
                (default.to_string(), Some(env.to_string())),
                "{id}"
            );
        }
    }

    #[test]
    fn test_secrets_and_targets_have_no_default() {
        for (id, env) in [
            ("coze_token", "COZE_TOKEN"),
            ("coze_workflow_id", "COZE_WORKFLOW_ID"),
            ("coze_workflow_id_home", "COZE_WORKFLOW_ID_HOME"),
        ] {
            assert_eq!(declared(id), (String::new(), Some(env.to_string())), "{id}");
        }
    }
}
