use std::env;

/// Credentials handed to every playbook run as connection variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsibleCredentials {
    pub user: String,
    pub password: String,
    pub become_password: String,
}

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    /// Directory holding the `switches/` and `routers/` Ansible projects
    pub ansible_base_dir: String,
    pub ansible_playbook_bin: String,
    pub credentials: AnsibleCredentials,
    /// How many device jobs of one batch may run at once
    pub job_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            ansible_base_dir: ".".to_string(),
            ansible_playbook_bin: "ansible-playbook".to_string(),
            credentials: AnsibleCredentials {
                user: "ansible".to_string(),
                password: "ansible".to_string(),
                become_password: "cisco".to_string(),
            },
            job_concurrency: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: get_env("LISTEN_ADDR", &defaults.listen_addr),
            ansible_base_dir: get_env("ANSIBLE_BASE_DIR", &defaults.ansible_base_dir),
            ansible_playbook_bin: get_env("ANSIBLE_PLAYBOOK_BIN", &defaults.ansible_playbook_bin),
            credentials: AnsibleCredentials {
                user: get_env("ANSIBLE_USER", &defaults.credentials.user),
                password: get_env("ANSIBLE_PASSWORD", &defaults.credentials.password),
                become_password: get_env(
                    "ANSIBLE_BECOME_PASSWORD",
                    &defaults.credentials.become_password,
                ),
            },
            job_concurrency: parse_concurrency(&get_env("JOB_CONCURRENCY", "1")),
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse a concurrency setting; anything unusable means sequential
fn parse_concurrency(raw: &str) -> usize {
    raw.trim().parse::<usize>().unwrap_or(1).max(1)
}
