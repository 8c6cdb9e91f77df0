//! Field aggregation: rebuilds per-device records out of a flat submission
//! whose keys follow the `<class>_<index>_<field>` convention.

use regex_lite::Regex;
use std::collections::{BTreeSet, HashMap};

use crate::models::{DeviceRecord, Row};
use crate::schema::{ComponentRule, ComponentSpec, DeviceClassSchema, GroupSpec};

/// Typed error for submissions that configure no device at all, so callers
/// can tell a validation failure from an internal one without string matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// No key carries a device index for the class
    NoDevices { message: &'static str },
    /// Indices were found but every card had a blank identity
    NoIdentities { message: &'static str },
}

impl AggregateError {
    pub fn message(&self) -> &'static str {
        match self {
            AggregateError::NoDevices { message } | AggregateError::NoIdentities { message } => *message,
        }
    }
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for AggregateError {}

/// Submission is the decoded field name → values mapping of one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    fields: HashMap<String, Vec<String>>,
}

impl Submission {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from ordered name/value pairs; repeated names accumulate in order
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut submission = Self::new();
        for (name, value) in pairs {
            submission.push(name, value);
        }
        submission
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_default().push(value.into());
    }

    /// Replace the values of a field
    pub fn set<V: Into<String>>(&mut self, name: impl Into<String>, values: impl IntoIterator<Item = V>) {
        self.fields
            .insert(name.into(), values.into_iter().map(Into::into).collect());
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// First value of a field
    pub fn first(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.first()).map(String::as_str)
    }

    /// All values of a field; missing fields read as empty
    pub fn list(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl From<HashMap<String, Vec<String>>> for Submission {
    fn from(fields: HashMap<String, Vec<String>>) -> Self {
        Self { fields }
    }
}

/// Trim a raw value; blank becomes `None`
fn non_blank(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Collect the device indices present in the submission, ascending.
///
/// A key counts when it starts with `<prefix>_<digits>_`. Digits that do not
/// fit a `usize` are ignored like any other non-numeric suffix.
pub fn discover_indices(submission: &Submission, prefix: &str) -> Vec<usize> {
    let Some(pattern) = Regex::new(&format!(r"^{}_(\d+)_", regex_lite::escape(prefix))).ok() else {
        tracing::error!("Invalid device prefix pattern: {}", prefix);
        return Vec::new();
    };

    let indices: BTreeSet<usize> = submission
        .keys()
        .filter_map(|key| pattern.captures(key))
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse::<usize>().ok()))
        .collect();

    indices.into_iter().collect()
}

/// Decide whether a trimmed row is kept, filling declared defaults.
///
/// Rows with a blank required component are dropped without any error. Blank
/// optional components take their rule's value, computed from the other
/// components of this row only.
pub fn admit_or_drop(values: &[(&ComponentSpec, &str)]) -> Option<Row> {
    if values
        .iter()
        .any(|(spec, value)| spec.rule.is_required() && value.is_empty())
    {
        return None;
    }

    let sibling = |key: &str| {
        values
            .iter()
            .find(|(spec, _)| spec.key == key)
            .map(|(_, value)| *value)
            .unwrap_or("")
    };

    let mut row = Row::new();
    for (spec, value) in values {
        let value = if !value.is_empty() {
            value.to_string()
        } else {
            match spec.rule {
                ComponentRule::Required | ComponentRule::Optional => String::new(),
                ComponentRule::Fixed(default) => default.to_string(),
                ComponentRule::Derived { prefix, from } => format!("{}{}", prefix, sibling(from)),
            }
        };
        row.insert(spec.key.to_string(), value);
    }
    Some(row)
}

/// Zip the component lists of one group into admitted rows.
///
/// Pairing stops at the shortest list. A component that is not required and
/// was not submitted at all does not shorten the group; it reads as blank.
fn read_group(submission: &Submission, card_prefix: &str, group: &GroupSpec) -> Vec<Row> {
    let columns: Vec<(&ComponentSpec, &[String])> = group
        .components
        .iter()
        .map(|spec| (spec, submission.list(&format!("{}{}", card_prefix, spec.field))))
        .collect();

    let len = columns
        .iter()
        .filter(|(spec, values)| spec.rule.is_required() || !values.is_empty())
        .map(|(_, values)| values.len())
        .min()
        .unwrap_or(0);

    (0..len)
        .filter_map(|i| {
            let values: Vec<(&ComponentSpec, &str)> = columns
                .iter()
                .map(|(spec, values)| (*spec, values.get(i).map(|v| v.trim()).unwrap_or("")))
                .collect();
            admit_or_drop(&values)
        })
        .collect()
}

/// Build the record of one device card, or `None` when its identity is blank
fn read_card(submission: &Submission, schema: &DeviceClassSchema, index: usize) -> Option<DeviceRecord> {
    let card_prefix = schema.card_prefix(index);
    let field = |name: &str| {
        submission
            .first(&format!("{}{}", card_prefix, name))
            .and_then(non_blank)
    };

    let identity = field(schema.identity_field)?;
    let mut record = DeviceRecord::new(index, identity);

    for &name in schema.scalars {
        record.scalars.insert(name.to_string(), field(name));
    }
    for group in schema.groups {
        record
            .groups
            .insert(group.name.to_string(), read_group(submission, &card_prefix, group));
    }

    Some(record)
}

/// Reconstruct the ordered device records of one class from a submission.
///
/// Records come out in ascending index order. Cards with a blank identity are
/// skipped; a submission that yields no record at all is a validation error.
pub fn aggregate(
    submission: &Submission,
    schema: &DeviceClassSchema,
) -> Result<Vec<DeviceRecord>, AggregateError> {
    let indices = discover_indices(submission, schema.prefix);
    if indices.is_empty() {
        return Err(AggregateError::NoDevices {
            message: schema.no_devices_message,
        });
    }

    let mut records = Vec::with_capacity(indices.len());
    for index in indices {
        match read_card(submission, schema, index) {
            Some(record) => records.push(record),
            None => tracing::debug!("Skipping {} card {}: blank {}", schema.prefix, index, schema.identity_field),
        }
    }

    if records.is_empty() {
        return Err(AggregateError::NoIdentities {
            message: schema.no_identity_message,
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ROUTER, SWITCH};

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_no_indices_reports_no_devices() {
        let submission = Submission::from_pairs([("router_0_ip", "10.0.0.1"), ("csrf", "x")]);
        let err = aggregate(&submission, &SWITCH).unwrap_err();
        assert_eq!(err, AggregateError::NoDevices { message: SWITCH.no_devices_message });
    }

    #[test]
    fn test_blank_identities_report_no_devices() {
        let submission = Submission::from_pairs([
            ("switch_0_ip", "  "),
            ("switch_0_enable_secret", "s"),
            ("switch_1_ip", ""),
        ]);
        let err = aggregate(&submission, &SWITCH).unwrap_err();
        assert_eq!(err, AggregateError::NoIdentities { message: SWITCH.no_identity_message });
        assert_eq!(err.to_string(), SWITCH.no_identity_message);
    }

    #[test]
    fn test_indices_sorted_numerically() {
        let submission = Submission::from_pairs([
            ("switch_5_ip", "10.0.0.5"),
            ("switch_1_ip", "10.0.0.1"),
            ("switch_3_ip", "10.0.0.3"),
            ("switch_10_ip", "10.0.0.10"),
        ]);
        let records = aggregate(&submission, &SWITCH).unwrap();
        let order: Vec<usize> = records.iter().map(|r| r.index).collect();
        assert_eq!(order, vec![1, 3, 5, 10]);
        assert_eq!(records[0].identity, "10.0.0.1");
    }

    #[test]
    fn test_sparse_indices_are_not_synthesized() {
        let submission = Submission::from_pairs([("switch_0_ip", "a"), ("switch_2_ip", "b")]);
        assert_eq!(discover_indices(&submission, "switch"), vec![0, 2]);
        assert_eq!(aggregate(&submission, &SWITCH).unwrap().len(), 2);
    }

    #[test]
    fn test_index_parsing_rejects_non_numeric() {
        let submission = Submission::from_pairs([
            ("switch_x_ip", "a"),
            ("switch_-1_ip", "b"),
            ("switch_1a_ip", "c"),
            ("switch_99999999999999999999999_ip", "d"),
            ("switch_7", "e"),
            ("myswitch_4_ip", "f"),
            ("switch_4_ip", "g"),
        ]);
        assert_eq!(discover_indices(&submission, "switch"), vec![4]);
    }

    #[test]
    fn test_blank_identity_card_is_skipped() {
        let submission = Submission::from_pairs([
            ("switch_0_ip", ""),
            ("switch_0_vlan_id", "10"),
            ("switch_1_ip", " 10.0.0.2 "),
        ]);
        let records = aggregate(&submission, &SWITCH).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identity, "10.0.0.2");
        assert_eq!(records[0].index, 1);
    }

    #[test]
    fn test_scalars_trimmed_and_blank_is_absent() {
        let submission = Submission::from_pairs([
            ("switch_0_ip", "10.0.0.1"),
            ("switch_0_enable_secret", "  cisco  "),
            ("switch_0_banner_login", "   "),
        ]);
        let record = &aggregate(&submission, &SWITCH).unwrap()[0];
        assert_eq!(record.scalar("enable_secret"), Some("cisco"));
        assert_eq!(record.scalars.get("banner_login"), Some(&None));
        assert_eq!(record.scalars.get("console_password"), Some(&None));
        assert_eq!(record.scalars.len(), SWITCH.scalars.len());
    }

    #[test]
    fn test_identity_only_record_is_valid() {
        let submission = Submission::from_pairs([("router_3_ip", "192.0.2.1")]);
        let record = &aggregate(&submission, &ROUTER).unwrap()[0];
        assert_eq!(record.groups.len(), ROUTER.groups.len());
        assert!(record.groups.values().all(|rows| rows.is_empty()));
    }

    #[test]
    fn test_group_truncates_to_shortest_list() {
        for (ifs, vlans) in [(3, 2), (2, 3)] {
            let mut submission = Submission::from_pairs([("switch_0_ip", "10.0.0.1")]);
            submission.set("switch_0_access_if", (0..ifs).map(|i| format!("Gi0/{}", i)));
            submission.set("switch_0_access_vlan", (0..vlans).map(|i| format!("{}", 10 + i)));
            let record = &aggregate(&submission, &SWITCH).unwrap()[0];
            assert_eq!(record.group("access_ports").len(), 2);
            assert_eq!(record.group("access_ports")[1], row(&[("interface", "Gi0/1"), ("vlan", "11")]));
        }
    }

    #[test]
    fn test_short_optional_list_still_truncates() {
        let mut submission = Submission::from_pairs([("switch_0_ip", "10.0.0.1")]);
        submission.set("switch_0_vlan_id", ["10", "20", "30"]);
        submission.set("switch_0_vlan_name", ["ten", ""]);
        let record = &aggregate(&submission, &SWITCH).unwrap()[0];
        assert_eq!(
            record.group("vlans"),
            &[row(&[("id", "10"), ("name", "ten")]), row(&[("id", "20"), ("name", "VLAN_20")])]
        );
    }

    #[test]
    fn test_blank_required_component_drops_row() {
        let mut submission = Submission::from_pairs([("switch_0_ip", "10.0.0.1")]);
        submission.set("switch_0_trunk_if", ["Gi0/1", " ", "Gi0/3"]);
        submission.set("switch_0_trunk_vlans", ["10,20", "30", ""]);
        let record = &aggregate(&submission, &SWITCH).unwrap()[0];
        assert_eq!(record.group("trunk_ports"), &[row(&[("interface", "Gi0/1"), ("vlans", "10,20")])]);
    }

    #[test]
    fn test_user_privilege_default() {
        let mut submission = Submission::from_pairs([("router_0_ip", "10.0.0.1")]);
        submission.set("router_0_user_name", ["admin", "ops", "nosecret"]);
        submission.set("router_0_user_privilege", ["", "5", "1"]);
        submission.set("router_0_user_secret", ["x", "y", ""]);
        let record = &aggregate(&submission, &ROUTER).unwrap()[0];
        assert_eq!(
            record.group("users"),
            &[
                row(&[("username", "admin"), ("privilege", "15"), ("secret", "x")]),
                row(&[("username", "ops"), ("privilege", "5"), ("secret", "y")]),
            ]
        );
    }

    #[test]
    fn test_dhcp_dns_defaults_to_gateway() {
        let mut submission = Submission::from_pairs([("router_0_ip", "10.0.0.254")]);
        submission.set("router_0_dhcp_name", ["LAN", "GUEST"]);
        submission.set("router_0_dhcp_network", ["10.0.0.0", "10.0.1.0"]);
        submission.set("router_0_dhcp_mask", ["255.255.255.0", "255.255.255.0"]);
        submission.set("router_0_dhcp_gateway", ["10.0.0.1", "10.0.1.1"]);
        submission.set("router_0_dhcp_dns", ["", "8.8.8.8"]);
        let record = &aggregate(&submission, &ROUTER).unwrap()[0];
        let pools = record.group("dhcp_pools");
        assert_eq!(pools[0]["dns_server"], "10.0.0.1");
        assert_eq!(pools[1]["dns_server"], "8.8.8.8");
    }

    #[test]
    fn test_dynamic_area_kept_blank() {
        let mut submission = Submission::from_pairs([("router_0_ip", "10.0.0.1")]);
        submission.set("router_0_dyn_net", ["10.0.0.0", "", "172.16.0.0"]);
        submission.set("router_0_dyn_wildcard", ["0.0.0.255", "0.0.0.255", "0.0.255.255"]);
        submission.set("router_0_dyn_area", ["0", "1", ""]);
        let record = &aggregate(&submission, &ROUTER).unwrap()[0];
        assert_eq!(
            record.group("dynamic_networks"),
            &[
                row(&[("network", "10.0.0.0"), ("wildcard", "0.0.0.255"), ("area", "0")]),
                row(&[("network", "172.16.0.0"), ("wildcard", "0.0.255.255"), ("area", "")]),
            ]
        );
    }

    #[test]
    fn test_admit_or_drop_directly() {
        let users = SWITCH.group("users").unwrap();
        let [name, privilege, secret] = [&users.components[0], &users.components[1], &users.components[2]];

        assert_eq!(admit_or_drop(&[(name, "admin"), (privilege, ""), (secret, "")]), None);
        assert_eq!(
            admit_or_drop(&[(name, "admin"), (privilege, ""), (secret, "pw")]),
            Some(row(&[("username", "admin"), ("privilege", "15"), ("secret", "pw")]))
        );
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let mut submission = Submission::from_pairs([
            ("switch_2_ip", "10.0.0.2"),
            ("switch_0_ip", "10.0.0.1"),
            ("switch_0_remote_access", "ssh"),
        ]);
        submission.set("switch_0_vlan_id", ["10", "20"]);
        submission.set("switch_0_vlan_name", ["", "users"]);
        let first = aggregate(&submission, &SWITCH).unwrap();
        let second = aggregate(&submission, &SWITCH).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_end_to_end_switch_scenario() {
        let mut submission = Submission::new();
        submission.set("switch_0_ip", ["10.0.0.1"]);
        submission.set("switch_0_vlan_id", ["10"]);
        submission.set("switch_0_vlan_name", Vec::<String>::new());
        submission.set("switch_0_user_name", ["admin"]);
        submission.set("switch_0_user_secret", ["x"]);
        submission.set("switch_0_user_privilege", Vec::<String>::new());

        let records = aggregate(&submission, &SWITCH).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.identity, "10.0.0.1");
        assert_eq!(record.group("vlans"), &[row(&[("id", "10"), ("name", "VLAN_10")])]);
        assert_eq!(
            record.group("users"),
            &[row(&[("username", "admin"), ("privilege", "15"), ("secret", "x")])]
        );
        assert!(record.group("access_ports").is_empty());
        assert!(record.group("trunk_ports").is_empty());
    }

    #[test]
    fn test_classes_do_not_mix() {
        let submission = Submission::from_pairs([("switch_0_ip", "10.0.0.1"), ("router_1_ip", "10.0.0.2")]);
        assert_eq!(aggregate(&submission, &SWITCH).unwrap()[0].identity, "10.0.0.1");
        assert_eq!(aggregate(&submission, &ROUTER).unwrap()[0].identity, "10.0.0.2");
    }
}
