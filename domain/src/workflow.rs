//! Builds the upstream `stream_run` call for each inbound workflow route.
//!
//! Nothing here touches the network: inbound payloads and configuration go in,
//! an immutable [`UpstreamRequest`] (or the error to report) comes out.

use log::*;
use relay::{Error, UpstreamRequest};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use service::config::Config;
use service::logging::mask;
use utoipa::ToSchema;

/// Path of the Coze streaming workflow endpoint, relative to the base URL.
pub const STREAM_RUN_PATH: &str = "/v1/workflow/stream_run";

pub const RUN_WORKFLOW_TAG: &str = "COZE STREAM";
pub const HOME_WORKFLOW_TAG: &str = "COZE STREAM HOME";

const MISSING_PAYLOAD: &str = "missing input or parameters: provide at least one";
const MISSING_TOKEN: &str = "server is not configured with COZE_TOKEN";
const MISSING_WORKFLOW_ID: &str = "server is not configured with COZE_WORKFLOW_ID";
const MISSING_HOME_WORKFLOW_ID: &str =
    "no workflow_id supplied and COZE_WORKFLOW_ID_HOME is not configured";

/// Body of `POST /api/coze/run-workflow/stream`.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(default)]
pub struct RunWorkflowParams {
    /// Primary workflow input, passed to the workflow as `parameters.input`.
    #[schema(value_type = Option<String>)]
    pub input: Option<Value>,
    /// Additional workflow parameters. Keys here win over `input`.
    #[schema(value_type = Option<Object>)]
    pub parameters: Option<Map<String, Value>>,
    pub bot_id: Option<String>,
    pub app_id: Option<String>,
    pub workflow_version: Option<String>,
}

/// Body of `POST /api/coze/home/stream`.
#[derive(Debug, Default, Clone, Deserialize, ToSchema)]
#[serde(default)]
pub struct HomeWorkflowParams {
    /// Overrides the configured home-page workflow.
    pub workflow_id: Option<String>,
    /// Home page to crawl, passed to the workflow as `parameters.home_url`.
    #[schema(value_type = Option<String>)]
    pub home_url: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub parameters: Option<Map<String, Value>>,
    pub bot_id: Option<String>,
    pub app_id: Option<String>,
    pub workflow_version: Option<String>,
}

/// JSON body sent to the upstream `stream_run` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamRunPayload {
    pub workflow_id: String,
    pub parameters: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_version: Option<String>,
}

/// A validated workflow run, ready to be turned into an upstream request.
#[derive(Debug)]
pub struct WorkflowRun {
    pub tag: &'static str,
    pub payload: StreamRunPayload,
    token: SecretString,
}

impl WorkflowRun {
    /// Describes the upstream `stream_run` call for this run.
    pub fn upstream_request(&self, base_url: &str) -> Result<UpstreamRequest, Error> {
        UpstreamRequest::post_json(
            format!("{}{STREAM_RUN_PATH}", base_url.trim_end_matches('/')),
            self.token.expose_secret(),
            &self.payload,
        )
    }
}

/// Validates a run-workflow request. Checks run in order: payload, credential,
/// configured workflow.
pub fn run_workflow(params: &RunWorkflowParams, config: &Config) -> Result<WorkflowRun, Error> {
    let has_input = params.input.as_ref().is_some_and(is_truthy);
    let has_parameters = params.parameters.as_ref().is_some_and(|p| !p.is_empty());
    if !has_input && !has_parameters {
        warn!("Rejecting workflow run without input or parameters");
        return Err(Error::Validation(MISSING_PAYLOAD.to_string()));
    }

    let token = require_token(config)?;
    let workflow_id = config.coze_workflow_id().ok_or_else(|| {
        warn!("COZE_WORKFLOW_ID is not configured");
        Error::Configuration(MISSING_WORKFLOW_ID.to_string())
    })?;

    let payload = StreamRunPayload {
        workflow_id,
        parameters: merge_parameters("input", params.input.as_ref(), params.parameters.as_ref()),
        bot_id: binding(params.bot_id.as_deref(), config.default_bot_id()),
        app_id: binding(params.app_id.as_deref(), config.default_app_id()),
        workflow_version: binding(
            params.workflow_version.as_deref(),
            config.default_workflow_version(),
        ),
    };

    info!(
        "[{RUN_WORKFLOW_TAG}] -> base={}, workflow_id={}, token={}, with_bot={}, with_app={}",
        config.coze_base_url(),
        mask(&payload.workflow_id),
        mask(token.expose_secret()),
        payload.bot_id.is_some(),
        payload.app_id.is_some(),
    );

    Ok(WorkflowRun {
        tag: RUN_WORKFLOW_TAG,
        payload,
        token,
    })
}

/// Validates a home-page workflow request. The caller's `workflow_id` wins
/// over the configured default.
pub fn home_workflow(params: &HomeWorkflowParams, config: &Config) -> Result<WorkflowRun, Error> {
    let token = require_token(config)?;
    let workflow_id = params
        .workflow_id
        .clone()
        .filter(|id| !id.is_empty())
        .or_else(|| config.coze_workflow_id_home())
        .ok_or_else(|| {
            warn!("No workflow_id supplied and COZE_WORKFLOW_ID_HOME is not configured");
            Error::Configuration(MISSING_HOME_WORKFLOW_ID.to_string())
        })?;

    let payload = StreamRunPayload {
        workflow_id,
        parameters: merge_parameters(
            "home_url",
            params.home_url.as_ref(),
            params.parameters.as_ref(),
        ),
        bot_id: binding(params.bot_id.as_deref(), config.default_bot_id()),
        app_id: binding(params.app_id.as_deref(), config.default_app_id()),
        workflow_version: binding(
            params.workflow_version.as_deref(),
            config.default_workflow_version(),
        ),
    };

    info!(
        "[{HOME_WORKFLOW_TAG}] -> base={}, workflow_id={}, token={}, has_home_url={}",
        config.coze_base_url(),
        mask(&payload.workflow_id),
        mask(token.expose_secret()),
        payload.parameters.contains_key("home_url"),
    );

    Ok(WorkflowRun {
        tag: HOME_WORKFLOW_TAG,
        payload,
        token,
    })
}

fn require_token(config: &Config) -> Result<SecretString, Error> {
    config.coze_token().map(SecretString::new).ok_or_else(|| {
        warn!("COZE_TOKEN is not configured");
        Error::Configuration(MISSING_TOKEN.to_string())
    })
}

/// `{ <key>: value, ...parameters }`: caller parameters override the named field.
fn merge_parameters(
    key: &str,
    value: Option<&Value>,
    parameters: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut merged = Map::new();
    if let Some(value) = value.filter(|v| !v.is_null()) {
        merged.insert(key.to_string(), value.clone());
    }
    if let Some(parameters) = parameters {
        merged.extend(parameters.clone());
    }
    merged
}

/// The caller's binding if non-empty, else the configured default.
fn binding(requested: Option<&str>, default: Option<String>) -> Option<String> {
    requested
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or(default)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
