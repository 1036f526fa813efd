//! Blocking HTTP implementation of [`Ledger`]
//!
//! Every request is a form POST carrying the API key; the handshake is the
//! only GET. Fetch endpoints answer with the record itself, mutations with
//! `{"result": true}` or `{"result": [...]}`.

use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use osprey_meta::LedgerConfig;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::types::{FileRecord, FolderInfo, NewFile, NewFolder, ProjectInfo};
use crate::{Error, Ledger, LedgerConnector, Result, Update};

/// Longest the startup handshake keeps retrying an unreachable server
const HANDSHAKE_MAX_ELAPSED: Duration = Duration::from_secs(120);

pub struct HttpLedger {
    client: Client,
    base: String,
    alias: String,
    api_key: String,
}

impl HttpLedger {
    pub fn new(config: &LedgerConfig, alias: &str) -> Result<Self> {
        let base = config.url.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| Error::Http {
                endpoint: base.clone(),
                source,
            })?;
        Ok(Self {
            client,
            base,
            alias: alias.to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.base, path)
    }

    fn post(&self, path: &str, fields: Vec<(&'static str, String)>) -> Result<Value> {
        let endpoint = self.endpoint(path);
        let mut form = Vec::with_capacity(fields.len() + 1);
        form.push(("api_key", self.api_key.clone()));
        form.extend(fields);

        tracing::trace!(endpoint = %endpoint, "POST");
        let response = self
            .client
            .post(&endpoint)
            .form(&form)
            .send()
            .map_err(|source| Error::Http {
                endpoint: endpoint.clone(),
                source,
            })?;
        read_json(&endpoint, response)
    }

    fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let endpoint = self.endpoint(path);
        let body = self.post(path, Vec::new())?;
        serde_json::from_value(body).map_err(|e| Error::Malformed {
            endpoint,
            message: e.to_string(),
        })
    }

    fn mutate(&self, path: &str, fields: Vec<(&'static str, String)>) -> Result<Value> {
        let endpoint = self.endpoint(path);
        let body = self.post(path, fields)?;
        mutation_result(&endpoint, body)
    }
}

fn read_json(endpoint: &str, response: Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().map_err(|source| Error::Http {
        endpoint: endpoint.to_string(),
        source,
    })?;
    if status.as_u16() != 200 {
        return Err(Error::Status {
            endpoint: endpoint.to_string(),
            code: status.as_u16(),
            body,
        });
    }
    serde_json::from_str(&body).map_err(|e| Error::Malformed {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

/// Extract `result` from a mutation response, accepting `true` or an array.
pub(crate) fn mutation_result(endpoint: &str, body: Value) -> Result<Value> {
    match body.get("result") {
        Some(Value::Bool(true)) | Some(Value::Array(_)) => Ok(body["result"].clone()),
        Some(_) => Err(Error::Rejected {
            endpoint: endpoint.to_string(),
            body: body.to_string(),
        }),
        None => Err(Error::Malformed {
            endpoint: endpoint.to_string(),
            message: "missing `result` field".into(),
        }),
    }
}

/// Read `result[0].<key>` as an id.
pub(crate) fn first_id(endpoint: &str, result: &Value, key: &str) -> Result<i64> {
    result
        .get(0)
        .and_then(|row| row.get(key))
        .and_then(|id| id.as_i64().or_else(|| id.as_str().and_then(|s| s.parse().ok())))
        .ok_or_else(|| Error::Malformed {
            endpoint: endpoint.to_string(),
            message: format!("expected result[0].{key}"),
        })
}

impl Ledger for HttpLedger {
    fn server_version(&self) -> Result<String> {
        let endpoint = self.endpoint("");
        let policy = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(HANDSHAKE_MAX_ELAPSED))
            .build();

        let attempt = || {
            let response = self.client.get(&endpoint).send().map_err(|source| {
                tracing::warn!(endpoint = %endpoint, error = %source, "ledger unreachable, retrying");
                backoff::Error::transient(Error::Http {
                    endpoint: endpoint.clone(),
                    source,
                })
            })?;
            read_json(&endpoint, response).map_err(backoff::Error::permanent)
        };

        let body = backoff::retry(policy, attempt).map_err(|e| match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        })?;

        body.get("sys_ver")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| Error::Malformed {
                endpoint,
                message: "missing `sys_ver`".into(),
            })
    }

    fn startup_reset(&self) -> Result<()> {
        self.update(&Update::Startup)
    }

    fn fetch_project(&self) -> Result<ProjectInfo> {
        self.fetch(&format!("projects/{}", self.alias))
    }

    fn create_folder(&self, folder: &NewFolder) -> Result<i64> {
        let path = format!("new/{}", self.alias);
        let result = self.mutate(
            &path,
            vec![
                ("type", "folder".into()),
                ("folder", folder.folder.clone()),
                ("folder_path", folder.folder_path.clone()),
                ("folder_date", folder.folder_date.clone().unwrap_or_default()),
                ("project_id", folder.project_id.to_string()),
            ],
        )?;
        first_id(&self.endpoint(&path), &result, "folder_id")
    }

    fn fetch_folder(&self, folder_id: i64) -> Result<FolderInfo> {
        self.fetch(&format!("folders/{folder_id}"))
    }

    fn create_file(&self, file: &NewFile) -> Result<i64> {
        let path = format!("new/{}", self.alias);
        let result = self.mutate(
            &path,
            vec![
                ("type", "file".into()),
                ("folder_id", file.folder_id.to_string()),
                ("filename", file.stem.clone()),
                ("timestamp", file.timestamp.clone()),
                ("filetype", file.filetype.clone()),
            ],
        )?;
        first_id(&self.endpoint(&path), &result, "file_id")
    }

    fn create_filesize(&self, file_id: i64, filetype: &str, size: u64) -> Result<()> {
        self.mutate(
            &format!("new/{}", self.alias),
            vec![
                ("type", "filesize".into()),
                ("file_id", file_id.to_string()),
                ("filetype", filetype.to_lowercase()),
                ("filesize", size.to_string()),
            ],
        )?;
        Ok(())
    }

    fn update(&self, update: &Update) -> Result<()> {
        self.mutate(&format!("update/{}", self.alias), update.form())?;
        Ok(())
    }

    fn fetch_project_files(&self) -> Result<Vec<FileRecord>> {
        self.fetch(&format!("projects/{}/files", self.alias))
    }
}

/// Creates one [`HttpLedger`] per worker.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    config: LedgerConfig,
    alias: String,
}

impl HttpConnector {
    pub fn new(config: &LedgerConfig, alias: &str) -> Self {
        Self {
            config: config.clone(),
            alias: alias.to_string(),
        }
    }
}

impl LedgerConnector for HttpConnector {
    fn connect(&self) -> Result<Box<dyn Ledger>> {
        Ok(Box::new(HttpLedger::new(&self.config, &self.alias)?))
    }
}
