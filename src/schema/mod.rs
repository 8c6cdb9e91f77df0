//! Device-class schemas.
//!
//! Every field a device card can submit is declared here as data. The
//! aggregator and the batch executor are generic over these tables, so a new
//! field or group only needs a new entry below.

use serde::Serialize;

/// How a blank component is treated when a group row is admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRule {
    /// A blank value drops the whole row
    Required,
    /// A blank value is kept as an empty string
    Optional,
    /// A blank value is replaced by a fixed value
    Fixed(&'static str),
    /// A blank value becomes `prefix` followed by another component of the same row
    Derived {
        prefix: &'static str,
        from: &'static str,
    },
}

impl ComponentRule {
    pub fn is_required(&self) -> bool {
        matches!(self, ComponentRule::Required)
    }
}

/// One column of a repeated group
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ComponentSpec {
    /// Form field suffix, e.g. `vlan_id` in `switch_0_vlan_id`
    pub field: &'static str,
    /// Key of the value inside the row handed to the playbook
    pub key: &'static str,
    pub rule: ComponentRule,
}

/// A named set of parallel list fields zipped into rows
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GroupSpec {
    /// Playbook variable receiving the rows
    pub name: &'static str,
    pub components: &'static [ComponentSpec],
}

impl GroupSpec {
    pub fn component(&self, key: &str) -> Option<&ComponentSpec> {
        self.components.iter().find(|c| c.key == key)
    }
}

/// Fixed connection variables shared by every device of a class
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ConnectionProfile {
    pub connection: &'static str,
    pub network_os: &'static str,
    pub become_method: &'static str,
}

pub const CISCO_IOS: ConnectionProfile = ConnectionProfile {
    connection: "network_cli",
    network_os: "cisco.ios.ios",
    become_method: "enable",
};

/// Everything that differs between device classes
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DeviceClassSchema {
    pub class: DeviceClass,
    /// Key prefix, e.g. `switch` for `switch_<index>_<field>`
    pub prefix: &'static str,
    /// URL segment of the class pages
    pub slug: &'static str,
    /// Label used in the per-device report header
    pub label: &'static str,
    pub title: &'static str,
    /// Field carrying the device identity (inventory target)
    pub identity_field: &'static str,
    /// Scalar fields; the form suffix is also the playbook variable name
    pub scalars: &'static [&'static str],
    pub groups: &'static [GroupSpec],
    pub connection: ConnectionProfile,
    /// Ansible project directory, relative to the configured base dir
    pub project_dir: &'static str,
    /// Playbook path, relative to the project directory
    pub playbook: &'static str,
    pub no_devices_message: &'static str,
    pub no_identity_message: &'static str,
}

impl DeviceClassSchema {
    /// Key prefix of one device card, e.g. `switch_3_`
    pub fn card_prefix(&self, index: usize) -> String {
        format!("{}_{}_", self.prefix, index)
    }

    pub fn group(&self, name: &str) -> Option<&GroupSpec> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Supported device classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Switch,
    Router,
}

impl DeviceClass {
    pub const ALL: [DeviceClass; 2] = [DeviceClass::Switch, DeviceClass::Router];

    pub fn schema(self) -> &'static DeviceClassSchema {
        match self {
            DeviceClass::Switch => &SWITCH,
            DeviceClass::Router => &ROUTER,
        }
    }

    /// Resolve a URL segment (`switches`, `routers`, or the singular prefix)
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.schema().slug == slug || c.schema().prefix == slug)
    }
}

const fn required(field: &'static str, key: &'static str) -> ComponentSpec {
    ComponentSpec {
        field,
        key,
        rule: ComponentRule::Required,
    }
}

const USERS: GroupSpec = GroupSpec {
    name: "users",
    components: &[
        required("user_name", "username"),
        ComponentSpec {
            field: "user_privilege",
            key: "privilege",
            rule: ComponentRule::Fixed("15"),
        },
        required("user_secret", "secret"),
    ],
};

const ACCESS_SCALARS: [&str; 4] = [
    "enable_secret",
    "console_password",
    "banner_login",
    "remote_access",
];

pub static SWITCH: DeviceClassSchema = DeviceClassSchema {
    class: DeviceClass::Switch,
    prefix: "switch",
    slug: "switches",
    label: "SWITCH",
    title: "Switches",
    identity_field: "ip",
    scalars: &ACCESS_SCALARS,
    groups: &[
        GroupSpec {
            name: "vlans",
            components: &[
                required("vlan_id", "id"),
                ComponentSpec {
                    field: "vlan_name",
                    key: "name",
                    rule: ComponentRule::Derived {
                        prefix: "VLAN_",
                        from: "id",
                    },
                },
            ],
        },
        GroupSpec {
            name: "access_ports",
            components: &[
                required("access_if", "interface"),
                required("access_vlan", "vlan"),
            ],
        },
        GroupSpec {
            name: "trunk_ports",
            components: &[
                required("trunk_if", "interface"),
                required("trunk_vlans", "vlans"),
            ],
        },
        USERS,
    ],
    connection: CISCO_IOS,
    project_dir: "switches",
    playbook: "playbooks/switches_config.yml",
    no_devices_message: "Add at least one switch.",
    no_identity_message: "Every switch card has an empty IP address.",
};

pub static ROUTER: DeviceClassSchema = DeviceClassSchema {
    class: DeviceClass::Router,
    prefix: "router",
    slug: "routers",
    label: "ROUTER",
    title: "Routers",
    identity_field: "ip",
    scalars: &[
        "enable_secret",
        "console_password",
        "banner_login",
        "remote_access",
        "dynamic_protocol",
        "ospf_process_id",
        "ospf_router_id",
        "eigrp_as",
        "bgp_as",
        "bgp_neighbor_ip",
        "bgp_neighbor_remote_as",
    ],
    groups: &[
        GroupSpec {
            name: "interfaces",
            components: &[
                required("if_name", "name"),
                required("if_ip", "ip"),
                required("if_mask", "netmask"),
            ],
        },
        GroupSpec {
            name: "dhcp_pools",
            components: &[
                required("dhcp_name", "name"),
                required("dhcp_network", "network"),
                required("dhcp_mask", "mask"),
                required("dhcp_gateway", "gateway"),
                ComponentSpec {
                    field: "dhcp_dns",
                    key: "dns_server",
                    rule: ComponentRule::Derived {
                        prefix: "",
                        from: "gateway",
                    },
                },
            ],
        },
        GroupSpec {
            name: "static_routes",
            components: &[
                required("static_dest", "dest"),
                required("static_mask", "mask"),
                required("static_next_hop", "next_hop"),
            ],
        },
        GroupSpec {
            name: "dynamic_networks",
            components: &[
                required("dyn_net", "network"),
                required("dyn_wildcard", "wildcard"),
                ComponentSpec {
                    field: "dyn_area",
                    key: "area",
                    rule: ComponentRule::Optional,
                },
            ],
        },
        USERS,
    ],
    connection: CISCO_IOS,
    project_dir: "routers",
    playbook: "playbooks/routers_config.yml",
    no_devices_message: "Add at least one router.",
    no_identity_message: "Every router card has an empty IP address.",
};
