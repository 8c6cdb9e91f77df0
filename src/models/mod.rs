mod jobs;

pub use jobs::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One admitted row of a repeated group, keyed by component key
pub type Row = BTreeMap<String, String>;

/// DeviceRecord is the aggregated configuration intent for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Position of the device card in the submission
    pub index: usize,
    pub identity: String,
    /// Scalar fields; blank submissions are stored as `None`
    pub scalars: BTreeMap<String, Option<String>>,
    pub groups: BTreeMap<String, Vec<Row>>,
}

impl DeviceRecord {
    pub fn new(index: usize, identity: impl Into<String>) -> Self {
        Self {
            index,
            identity: identity.into(),
            scalars: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }

    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars.get(name).and_then(|v| v.as_deref())
    }

    /// Rows of a group; unknown groups read as empty
    pub fn group(&self, name: &str) -> &[Row] {
        self.groups.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}
