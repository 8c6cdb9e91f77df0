mod ansible;

pub use ansible::AnsibleRunner;

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::AnsibleCredentials;
use crate::models::*;
use crate::schema::DeviceClassSchema;

/// Environment variable disabling interactive host key prompts
pub const HOST_KEY_CHECKING_ENV: &str = "ANSIBLE_HOST_KEY_CHECKING";

/// Everything one device job needs besides its identity
#[derive(Debug, Clone, PartialEq)]
pub struct JobParameters {
    /// Variables passed to the playbook with `-e`
    pub extra_vars: Map<String, Value>,
    /// Environment applied to the job process only
    pub env: BTreeMap<String, String>,
}

/// JobRunner runs the external configuration action for a single device.
///
/// `Err` means the action could not be started at all; a started action that
/// fails is reported through the exit code of the returned outcome.
#[async_trait::async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(
        &self,
        schema: &DeviceClassSchema,
        identity: &str,
        params: &JobParameters,
    ) -> Result<JobOutcome>;
}

/// Merge the class connection defaults with one record's fields and groups
pub fn build_parameters(
    record: &DeviceRecord,
    schema: &DeviceClassSchema,
    credentials: &AnsibleCredentials,
) -> JobParameters {
    let profile = &schema.connection;
    let mut vars = Map::new();
    vars.insert("ansible_connection".into(), json!(profile.connection));
    vars.insert("ansible_network_os".into(), json!(profile.network_os));
    vars.insert("ansible_user".into(), json!(credentials.user));
    vars.insert("ansible_password".into(), json!(credentials.password));
    vars.insert("ansible_become".into(), json!(true));
    vars.insert("ansible_become_method".into(), json!(profile.become_method));
    vars.insert("ansible_become_password".into(), json!(credentials.become_password));

    for &name in schema.scalars {
        vars.insert(name.to_string(), json!(record.scalar(name)));
    }
    for group in schema.groups {
        vars.insert(group.name.to_string(), json!(record.group(group.name)));
    }

    let mut env = BTreeMap::new();
    env.insert(HOST_KEY_CHECKING_ENV.to_string(), "False".to_string());

    JobParameters {
        extra_vars: vars,
        env,
    }
}

/// BatchExecutor runs one job per device record and folds the outcomes
/// into a single BatchResult
pub struct BatchExecutor {
    runner: Arc<dyn JobRunner>,
    credentials: AnsibleCredentials,
    concurrency: usize,
}

impl BatchExecutor {
    pub fn new(runner: Arc<dyn JobRunner>, credentials: AnsibleCredentials, concurrency: usize) -> Self {
        Self {
            runner,
            credentials,
            concurrency: concurrency.max(1),
        }
    }

    /// Run every record of a batch.
    ///
    /// Up to `concurrency` jobs are in flight at once, but outcomes are always
    /// folded in record order. A failing device never stops the others.
    pub async fn execute(&self, schema: &DeviceClassSchema, records: &[DeviceRecord]) -> BatchResult {
        let mut result = BatchResult::new(uuid::Uuid::new_v4().to_string());
        tracing::info!(
            "Batch {} started: {} {} device(s), concurrency={}",
            result.batch_id,
            records.len(),
            schema.prefix,
            self.concurrency
        );

        let jobs: Vec<_> = records
            .iter()
            .map(|record| self.run_device(schema, record))
            .collect();
        let outcomes: Vec<Result<JobOutcome>> = stream::iter(jobs)
            .buffered(self.concurrency)
            .collect()
            .await;

        for (record, outcome) in records.iter().zip(outcomes) {
            let identity = record.identity.clone();
            let stdout = outcome.as_ref().map(|job| job.stdout.as_str()).unwrap_or("");
            result.reports.push(DeviceReport {
                identity: identity.clone(),
                text: format!("===== {} {} =====\n{}", schema.label, identity, stdout),
            });

            match outcome {
                Ok(job) => {
                    if job.succeeded() {
                        tracing::info!("Batch {}: {} {} configured", result.batch_id, schema.label, identity);
                    } else {
                        tracing::warn!(
                            "Batch {}: {} {} failed (exit code {:?})",
                            result.batch_id,
                            schema.label,
                            identity,
                            job.exit_code
                        );
                        result.failures.push(DeviceFailure {
                            identity,
                            text: job.diagnostic(),
                        });
                    }
                }
                Err(e) => {
                    tracing::error!("Batch {}: could not start job for {}: {:#}", result.batch_id, identity, e);
                    result.failures.push(DeviceFailure {
                        identity,
                        text: format!("Error while running playbook: {:#}", e),
                    });
                }
            }
        }

        result.completed_at = Utc::now();
        tracing::info!(
            "Batch {} finished: {} report(s), {} failure(s)",
            result.batch_id,
            result.reports.len(),
            result.failures.len()
        );
        result
    }

    async fn run_device(&self, schema: &DeviceClassSchema, record: &DeviceRecord) -> Result<JobOutcome> {
        let params = build_parameters(record, schema, &self.credentials);
        self.runner.run(schema, &record.identity, &params).await
    }
}
