//! CLI command implementations.

use crate::output::{self, ItemSummary, OutputFormat};
use anyhow::{Context, Result};
use itemstore_core::{
    ItemService, JSON_PATCH_MEDIA_TYPE, MERGE_PATCH_MEDIA_TYPE, MemoryRepository,
};
use itemstore_fs::{ServerSettings, Workspace, WorkspaceConfig};
use itemstore_server::ServerConfig;
use serde_json::{Value, json};
use std::path::Path;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::info;

/// Patch document given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchArg {
    /// JSON merge patch.
    Merge(String),
    /// JSON patch.
    Json(String),
}

impl PatchArg {
    const fn content_type(&self) -> &'static str {
        match self {
            Self::Merge(_) => MERGE_PATCH_MEDIA_TYPE,
            Self::Json(_) => JSON_PATCH_MEDIA_TYPE,
        }
    }

    fn body(&self) -> &str {
        match self {
            Self::Merge(body) | Self::Json(body) => body,
        }
    }
}

/// Initialize a new workspace.
pub fn init(path: &Path, name: Option<String>, format: OutputFormat) -> Result<()> {
    let config = name.map_or_else(WorkspaceConfig::default, WorkspaceConfig::new);
    Workspace::init(path, config).context("Failed to initialize workspace")?;
    output::print_success(
        &format!("Initialized workspace at {}", path.display()),
        format,
    )
}

/// Serve the workspace (or an in-memory store) over HTTP.
pub fn serve(path: &Path, host: Option<String>, port: Option<u16>, memory: bool) -> Result<()> {
    let rt = Runtime::new()?;

    if memory {
        let settings = Workspace::open(path)
            .map(|ws| ws.config().server.clone())
            .unwrap_or_default();
        let config = server_config(&settings, host, port);
        info!("Serving an in-memory store");
        rt.block_on(itemstore_server::serve(
            ItemService::new(MemoryRepository::new()),
            &config,
        ))
    } else {
        let ws = Workspace::open(path).context("Failed to open workspace")?;
        let config = server_config(&ws.config().server, host, port);
        info!(path = %ws.root().display(), "Serving workspace");
        rt.block_on(itemstore_server::serve(ItemService::new(ws), &config))
    }
}

/// List items of a type.
pub fn list(path: &Path, type_plural: &str, format: OutputFormat) -> Result<()> {
    let (rt, svc) = open_service(path)?;
    let items = rt.block_on(svc.list(type_plural))?;
    let summaries: Vec<ItemSummary> = items.iter().map(ItemSummary::from).collect();
    output::print_item_list(&summaries, format)
}

/// Show a single item.
pub fn get(path: &Path, type_plural: &str, name: &str, format: OutputFormat) -> Result<()> {
    let (rt, svc) = open_service(path)?;
    let item = rt.block_on(svc.read(type_plural, name))?;
    output::print(&item, format)
}

/// Create an item.
pub fn create(
    path: &Path,
    type_plural: &str,
    name: &str,
    data: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let data = data.map(parse_data).transpose()?.unwrap_or(Value::Null);
    let body = serde_json::to_vec(&json!({ "name": name, "data": data }))?;

    let (rt, svc) = open_service(path)?;
    let item = rt.block_on(svc.create(type_plural, &body))?;
    output::print(&item, format)
}

/// Replace the data of an item.
pub fn put(
    path: &Path,
    type_plural: &str,
    name: &str,
    data: &str,
    format: OutputFormat,
) -> Result<()> {
    let body = serde_json::to_vec(&json!({ "data": parse_data(data)? }))?;

    let (rt, svc) = open_service(path)?;
    let item = rt.block_on(svc.replace(type_plural, name, &body))?;
    output::print(&item, format)
}

/// Apply a patch to an item.
pub fn patch(
    path: &Path,
    type_plural: &str,
    name: &str,
    patch: &PatchArg,
    format: OutputFormat,
) -> Result<()> {
    let (rt, svc) = open_service(path)?;
    let item = rt.block_on(svc.patch(
        type_plural,
        name,
        patch.content_type(),
        patch.body().as_bytes(),
    ))?;
    output::print(&item, format)
}

/// Delete an item.
pub fn delete(path: &Path, type_plural: &str, name: &str, format: OutputFormat) -> Result<()> {
    let (rt, svc) = open_service(path)?;
    rt.block_on(svc.delete(type_plural, name))?;
    output::print_success(&format!("Deleted {type_plural}/{name}"), format)
}

/// Open the workspace as a service, with a runtime to drive it.
fn open_service(path: &Path) -> Result<(Runtime, ItemService<Workspace>)> {
    let ws = Workspace::open(path).context("Failed to open workspace")?;
    let service = match repository_timeout(&ws.config().server) {
        Some(timeout) => ItemService::new(ws).with_call_timeout(timeout),
        None => ItemService::new(ws),
    };
    Ok((Runtime::new()?, service))
}

fn parse_data(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("Invalid JSON for --data")
}

fn repository_timeout(settings: &ServerSettings) -> Option<Duration> {
    (settings.repository_timeout_ms > 0)
        .then(|| Duration::from_millis(settings.repository_timeout_ms))
}

/// Merge file settings with command line overrides.
fn server_config(settings: &ServerSettings, host: Option<String>, port: Option<u16>) -> ServerConfig {
    ServerConfig {
        host: host.unwrap_or_else(|| settings.host.clone()),
        port: port.unwrap_or(settings.port),
        repository_timeout: repository_timeout(settings),
        expose_internal_errors: settings.expose_internal_errors,
        cors: settings.cors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_server_config_overrides() {
        let settings = ServerSettings {
            repository_timeout_ms: 0,
            cors: true,
            ..ServerSettings::default()
        };

        let config = server_config(&settings, None, Some(9000));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.repository_timeout, None);
        assert!(config.cors);

        let config = server_config(&ServerSettings::default(), Some("0.0.0.0".into()), None);
        assert_eq!(config.address(), "0.0.0.0:17380");
        assert_eq!(config.repository_timeout, Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_patch_arg_content_type() {
        let merge = PatchArg::Merge(r#"{"data":{}}"#.into());
        assert_eq!(merge.content_type(), MERGE_PATCH_MEDIA_TYPE);
        assert_eq!(merge.body(), r#"{"data":{}}"#);
        assert_eq!(PatchArg::Json("[]".into()).content_type(), JSON_PATCH_MEDIA_TYPE);
    }

    #[test]
    fn test_parse_data_rejects_garbage() {
        assert_eq!(parse_data(r#"{"x":1}"#).unwrap(), json!({"x": 1}));
        assert!(parse_data("{x").is_err());
    }
}
