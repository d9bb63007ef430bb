//! Redis-backed module host
//!
//! Maps the [`ModuleHost`] operations onto RedisAI / RedisGears commands.
//! The connection is opened by the first probe and held for the lifetime of
//! the host.

use super::{InstallReceipt, ModuleDescriptor, ModuleHost};
use crate::artifacts::{ArtifactKind, ModelArtifact, ScriptArtifact};
use crate::errors::{BootstrapError, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, Value};

/// Module host backed by a Redis server
pub struct RedisHost {
    client: Client,
    url: String,
    conn: Option<MultiplexedConnection>,
}

impl RedisHost {
    /// Create a host for `url`. No connection is made until [`ModuleHost::probe`].
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| BootstrapError::Config(format!("invalid service URL: {}", e)))?;

        Ok(Self {
            client,
            url: redact(url),
            conn: None,
        })
    }

    /// URL with any credentials masked
    pub fn url(&self) -> &str {
        &self.url
    }

    fn connection(&mut self) -> Result<&mut MultiplexedConnection> {
        self.conn.as_mut().ok_or_else(|| BootstrapError::Connectivity {
            url: self.url.clone(),
            reason: "not connected; probe first".to_string(),
        })
    }

    fn unreachable(&self, reason: impl ToString) -> BootstrapError {
        BootstrapError::Connectivity {
            url: self.url.clone(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl ModuleHost for RedisHost {
    async fn probe(&mut self) -> Result<()> {
        if self.conn.is_none() {
            tracing::debug!(url = %self.url, "connecting");
            let conn = self
                .client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| self.unreachable(e))?;
            self.conn = Some(conn);
        }

        let conn = self.connection()?;
        let reply: std::result::Result<String, _> = redis::cmd("PING").query_async(conn).await;
        match reply {
            Ok(pong) if pong == "PONG" => Ok(()),
            Ok(other) => Err(self.unreachable(format!("unexpected PING reply '{}'", other))),
            Err(e) => Err(self.unreachable(e)),
        }
    }

    async fn list_modules(&mut self) -> Result<Vec<ModuleDescriptor>> {
        let conn = self.connection()?;
        let reply: Value = redis::cmd("MODULE").arg("LIST").query_async(conn).await?;
        parse_module_list(&reply)
    }

    async fn flag_exists(&mut self, key: &str) -> Result<bool> {
        let conn = self.connection()?;
        let count: i64 = redis::cmd("EXISTS")
            .arg(key)
            .query_async(conn)
            .await
            .map_err(|e| BootstrapError::Store(format!("EXISTS {}: {}", key, e)))?;
        Ok(count > 0)
    }

    async fn set_flag(&mut self, key: &str, value: &str) -> Result<bool> {
        let conn = self.connection()?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .query_async(conn)
            .await
            .map_err(|e| BootstrapError::Store(format!("SET {}: {}", key, e)))?;
        Ok(reply.is_some())
    }

    async fn install_model(&mut self, model: &ModelArtifact) -> Result<InstallReceipt> {
        let conn = self.connection()?;
        let mut cmd = redis::cmd("AI.MODELSET");
        cmd.arg(&model.key)
            .arg(&model.backend)
            .arg(&model.device)
            .arg("INPUTS")
            .arg(&model.inputs)
            .arg("OUTPUTS")
            .arg(&model.outputs)
            .arg("BLOB")
            .arg(&model.blob[..]);

        let reply: Value = cmd.query_async(conn).await.map_err(|e| BootstrapError::Install {
            artifact: ArtifactKind::Model,
            reason: e.to_string(),
        })?;
        Ok(InstallReceipt(describe(&reply)))
    }

    async fn install_script(&mut self, script: &ScriptArtifact) -> Result<InstallReceipt> {
        let conn = self.connection()?;
        let mut cmd = redis::cmd("RG.PYEXECUTE");
        cmd.arg(&script.source[..]);
        if !script.requirements.is_empty() {
            cmd.arg("REQUIREMENTS").arg(&script.requirements);
        }

        let reply: Value = cmd.query_async(conn).await.map_err(|e| BootstrapError::Install {
            artifact: ArtifactKind::Script,
            reason: e.to_string(),
        })?;
        Ok(InstallReceipt(describe(&reply)))
    }
}

/// Parse a `MODULE LIST` reply
fn parse_module_list(reply: &Value) -> Result<Vec<ModuleDescriptor>> {
    match reply {
        Value::Bulk(entries) => entries.iter().map(parse_module_entry).collect(),
        Value::Nil => Ok(Vec::new()),
        other => Err(BootstrapError::Protocol(format!(
            "unexpected MODULE LIST reply: {:?}",
            other
        ))),
    }
}

/// One module entry is a flat field/value list: `name <n> ver <v> ...`
fn parse_module_entry(entry: &Value) -> Result<ModuleDescriptor> {
    let Value::Bulk(fields) = entry else {
        return Err(BootstrapError::Protocol(format!(
            "module entry is not a list: {:?}",
            entry
        )));
    };

    let mut name = None;
    let mut version = None;
    for pair in fields.chunks(2) {
        let [key, value] = pair else {
            return Err(BootstrapError::Protocol(
                "module entry has an odd number of fields".to_string(),
            ));
        };
        match text(key).as_deref() {
            Some("name") => name = text(value),
            Some("ver") => version = Some(parse_version(value)?),
            _ => {}
        }
    }

    match (name, version) {
        (Some(name), Some(raw_version)) => Ok(ModuleDescriptor { name, raw_version }),
        (None, _) => Err(BootstrapError::Protocol(
            "module entry is missing 'name'".to_string(),
        )),
        (Some(name), None) => Err(BootstrapError::Protocol(format!(
            "module '{}' is missing 'ver'",
            name
        ))),
    }
}

fn parse_version(value: &Value) -> Result<u32> {
    let parsed = match value {
        Value::Int(n) => u32::try_from(*n).ok(),
        other => text(other).and_then(|s| s.parse().ok()),
    };
    parsed.ok_or_else(|| BootstrapError::Protocol(format!("invalid module version: {:?}", value)))
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Data(bytes) => String::from_utf8(bytes.clone()).ok(),
        Value::Status(s) => Some(s.clone()),
        _ => None,
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Nil => "(nil)".to_string(),
        Value::Okay => "OK".to_string(),
        Value::Int(n) => n.to_string(),
        Value::Status(s) => s.clone(),
        Value::Data(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Bulk(items) => {
            let parts: Vec<String> = items.iter().map(describe).collect();
            format!("[{}]", parts.join(", "))
        }
    }
}

/// Mask the userinfo part of a URL
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
