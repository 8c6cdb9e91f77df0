use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use super::{JobParameters, JobRunner};
use crate::models::JobOutcome;
use crate::schema::DeviceClassSchema;

/// AnsibleRunner applies a device configuration by running the class playbook
/// against a single-host inline inventory
pub struct AnsibleRunner {
    binary: String,
    base_dir: PathBuf,
}

impl AnsibleRunner {
    pub fn new(binary: impl Into<String>, base_dir: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.into(),
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Build the `ansible-playbook` invocation for one device
    fn command(&self, schema: &DeviceClassSchema, identity: &str, params: &JobParameters) -> Result<Command> {
        let project_dir = self.base_dir.join(schema.project_dir);
        let playbook = project_dir.join(schema.playbook);
        let extra_vars = serde_json::to_string(&params.extra_vars).context("Failed to encode extra vars")?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(&playbook)
            .arg("-i")
            // Trailing comma makes ansible read the value as a host list
            .arg(format!("{},", identity))
            .arg("-e")
            .arg(extra_vars)
            .current_dir(&project_dir)
            .envs(&params.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(cmd)
    }
}

#[async_trait::async_trait]
impl JobRunner for AnsibleRunner {
    async fn run(&self, schema: &DeviceClassSchema, identity: &str, params: &JobParameters) -> Result<JobOutcome> {
        let mut cmd = self.command(schema, identity, params)?;
        tracing::debug!("Running {} {} for {}", self.binary, schema.playbook, identity);

        let output = cmd
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.binary))?;

        Ok(JobOutcome {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, Submission};
    use crate::jobs::{build_parameters, HOST_KEY_CHECKING_ENV};
    use crate::schema::{ROUTER, SWITCH};
    use std::ffi::OsStr;

    fn params_for(ip: &str) -> JobParameters {
        let submission = Submission::from_pairs([("switch_0_ip", ip)]);
        let record = &aggregate(&submission, &SWITCH).unwrap()[0];
        build_parameters(record, &SWITCH, &crate::config::Config::default().credentials)
    }

    #[test]
    fn test_command_line() {
        let runner = AnsibleRunner::new("ansible-playbook", "/srv/ansible");
        let params = params_for("10.0.0.1");
        let cmd = runner.command(&SWITCH, "10.0.0.1", &params).unwrap();
        let std_cmd = cmd.as_std();

        assert_eq!(std_cmd.get_program(), "ansible-playbook");
        let args: Vec<&OsStr> = std_cmd.get_args().collect();
        assert_eq!(args[0], OsStr::new("/srv/ansible/switches/playbooks/switches_config.yml"));
        assert_eq!(&args[1..4], &[OsStr::new("-i"), OsStr::new("10.0.0.1,"), OsStr::new("-e")]);

        let vars: serde_json::Value = serde_json::from_str(args[4].to_str().unwrap()).unwrap();
        assert_eq!(vars["ansible_connection"], "network_cli");
        assert_eq!(std_cmd.get_current_dir(), Some(Path::new("/srv/ansible/switches")));
    }

    #[test]
    fn test_host_key_override_set_on_command() {
        let runner = AnsibleRunner::new("ansible-playbook", ".");
        let cmd = runner.command(&ROUTER, "10.0.0.1", &params_for("10.0.0.1")).unwrap();
        let envs: Vec<(&OsStr, Option<&OsStr>)> = cmd.as_std().get_envs().collect();
        assert!(envs.contains(&(OsStr::new(HOST_KEY_CHECKING_ENV), Some(OsStr::new("False")))));
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_invocation_error() {
        let runner = AnsibleRunner::new("/nonexistent/ansible-playbook", ".");
        let err = runner
            .run(&SWITCH, "10.0.0.1", &params_for("10.0.0.1"))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).starts_with("Failed to run /nonexistent/ansible-playbook"));
    }
}
