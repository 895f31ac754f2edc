//! Per-side label computation for links.
//!
//! A link attribute is declared once, either as one shared value or as
//! `a_value,b_value`. Each side renders with its own value under the attribute
//! name and, for two-valued attributes, the peer's value under `<name>_far`.

use std::collections::BTreeMap;
use std::fmt;

use crate::ipam::LinkIp;
use crate::models::{labels, LabelMap, Link};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    A,
    B,
}

/// Values of one attribute as declared on the link
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerValues {
    /// Same value on both sides
    Shared(String),
    PerSide { a: String, b: String },
}

/// One side's view of an attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideValue {
    pub near: String,
    pub far: Option<String>,
}

impl PeerValues {
    pub fn side(&self, side: Side) -> SideValue {
        match (self, side) {
            (PeerValues::Shared(v), _) => SideValue {
                near: v.clone(),
                far: None,
            },
            (PeerValues::PerSide { a, b }, Side::A) => SideValue {
                near: a.clone(),
                far: Some(b.clone()),
            },
            (PeerValues::PerSide { a, b }, Side::B) => SideValue {
                near: b.clone(),
                far: Some(a.clone()),
            },
        }
    }
}

/// A link attribute that did not split into one or two values; it is dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitWarning {
    pub link: String,
    pub key: String,
    pub count: usize,
    pub value: String,
}

impl fmt::Display for SplitWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} contains {} elements: {}",
            self.link, self.key, self.count, self.value
        )
    }
}

/// Attribute values of both sides of a link
#[derive(Debug, Clone, Default)]
pub struct LinkLabels {
    pub values: BTreeMap<String, PeerValues>,
    pub warnings: Vec<SplitWarning>,
}

impl LinkLabels {
    /// Gather attribute values for both sides of `link`.
    ///
    /// `ip` and `systemip` always come per side (from the assigned addresses and
    /// the nodes' system IPs); every other link label is split on commas. A
    /// missing `name` defaults to `to_<peer>[_<linkNr>]`.
    pub fn gather(link: &Link, ip_a: &LinkIp, ip_b: &LinkIp) -> Self {
        let mut values = BTreeMap::new();
        let mut warnings = Vec::new();

        values.insert(
            labels::LINK_IP.to_string(),
            PeerValues::PerSide {
                a: ip_a.to_string(),
                b: ip_b.to_string(),
            },
        );
        values.insert(
            labels::SYSTEM_IP.to_string(),
            PeerValues::PerSide {
                a: link.a.node.label(labels::SYSTEM_IP).to_string(),
                b: link.b.node.label(labels::SYSTEM_IP).to_string(),
            },
        );

        for (key, value) in &link.labels {
            if key == labels::LINK_IP || key == labels::SYSTEM_IP {
                continue;
            }
            let parts: Vec<&str> = value.split(',').collect();
            match parts.as_slice() {
                [shared] => {
                    values.insert(key.clone(), PeerValues::Shared(shared.to_string()));
                }
                [a, b] => {
                    values.insert(
                        key.clone(),
                        PeerValues::PerSide {
                            a: a.to_string(),
                            b: b.to_string(),
                        },
                    );
                }
                _ => {
                    let warning = SplitWarning {
                        link: link.to_string(),
                        key: key.clone(),
                        count: parts.len(),
                        value: value.clone(),
                    };
                    tracing::warn!("{}", warning);
                    warnings.push(warning);
                }
            }
        }

        if !values.contains_key(labels::LINK_NAME) {
            let link_nr = link.label(labels::LINK_NR);
            let suffix = if link_nr.is_empty() {
                String::new()
            } else {
                format!("_{}", link_nr)
            };
            values.insert(
                labels::LINK_NAME.to_string(),
                PeerValues::PerSide {
                    a: format!("to_{}{}", link.b.node.short_name, suffix),
                    b: format!("to_{}{}", link.a.node.short_name, suffix),
                },
            );
        }

        tracing::debug!("{}: {:?}", link, values);
        Self { values, warnings }
    }

    /// Label map one side renders with.
    ///
    /// An explicit `<name>_far` link label takes precedence over a generated one.
    pub fn side(&self, side: Side) -> LabelMap {
        let mut out = LabelMap::new();
        for (key, pair) in &self.values {
            let value = pair.side(side);
            if let Some(far) = value.far {
                out.insert(format!("{}{}", key, labels::FAR_SUFFIX), far);
            }
            out.insert(key.clone(), value.near);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, Node};
    use std::sync::Arc;

    fn node(name: &str, systemip: &str) -> Arc<Node> {
        let labels = [("systemip".to_string(), systemip.to_string())].into_iter().collect();
        Arc::new(Node::new(format!("clab-t-{}", name), name, labels))
    }

    fn link(labels: &[(&str, &str)]) -> Link {
        Link::new(
            Endpoint { node: node("r1", "10.0.0.1/32"), iface: "eth1".into() },
            Endpoint { node: node("r2", "10.0.0.2/32"), iface: "eth2".into() },
            labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        )
    }

    fn gather(l: &Link) -> LinkLabels {
        LinkLabels::gather(l, &"1.1.2.0/31".parse().unwrap(), &"1.1.2.1/31".parse().unwrap())
    }

    #[test]
    fn test_shared_value_has_no_far_key() {
        let labels = gather(&link(&[("mtu", "9000")]));
        let a = labels.side(Side::A);
        let b = labels.side(Side::B);
        assert_eq!(a["mtu"], "9000");
        assert_eq!(b["mtu"], "9000");
        assert!(!a.contains_key("mtu_far"));
        assert!(!b.contains_key("mtu_far"));
    }

    #[test]
    fn test_two_values_split_near_and_far() {
        let labels = gather(&link(&[("port", "1/1/1,ethernet-1/1")]));
        let a = labels.side(Side::A);
        let b = labels.side(Side::B);
        assert_eq!(a["port"], "1/1/1");
        assert_eq!(a["port_far"], "ethernet-1/1");
        assert_eq!(b["port"], "ethernet-1/1");
        assert_eq!(b["port_far"], "1/1/1");
    }

    #[test]
    fn test_unsupported_arity_is_dropped_with_warning() {
        let labels = gather(&link(&[("vlan", "1,2,3"), ("mtu", "1500")]));
        for side in [Side::A, Side::B] {
            let map = labels.side(side);
            assert!(!map.contains_key("vlan"));
            assert!(!map.contains_key("vlan_far"));
            assert_eq!(map["mtu"], "1500");
        }
        assert_eq!(labels.warnings.len(), 1);
        assert_eq!(
            labels.warnings[0].to_string(),
            "link [r1:eth1, r2:eth2]: vlan contains 3 elements: 1,2,3"
        );
    }

    #[test]
    fn test_default_names() {
        let labels = gather(&link(&[]));
        assert_eq!(labels.side(Side::A)["name"], "to_r2");
        assert_eq!(labels.side(Side::A)["name_far"], "to_r1");
        assert_eq!(labels.side(Side::B)["name"], "to_r1");
        assert_eq!(labels.side(Side::B)["name_far"], "to_r2");

        let labels = gather(&link(&[("linkNr", "3")]));
        assert_eq!(labels.side(Side::A)["name"], "to_r2_3");
        assert_eq!(labels.side(Side::B)["name"], "to_r1_3");
        assert_eq!(labels.side(Side::B)["linkNr"], "3");

        let labels = gather(&link(&[("linkNr", "")]));
        assert_eq!(labels.side(Side::A)["name"], "to_r2");
    }

    #[test]
    fn test_explicit_name_wins() {
        let labels = gather(&link(&[("name", "core")]));
        assert_eq!(labels.side(Side::A)["name"], "core");
        assert_eq!(labels.side(Side::B)["name"], "core");
        assert!(!labels.side(Side::A).contains_key("name_far"));
    }

    #[test]
    fn test_name_with_bad_arity_falls_back_to_default() {
        let labels = gather(&link(&[("name", "x,y,z")]));
        assert_eq!(labels.side(Side::A)["name"], "to_r2");
        assert_eq!(labels.warnings.len(), 1);
    }

    #[test]
    fn test_ip_and_systemip_per_side() {
        let labels = gather(&link(&[("ip", "9.9.9.9/31"), ("systemip", "x")]));
        let a = labels.side(Side::A);
        let b = labels.side(Side::B);
        assert_eq!(a["ip"], "1.1.2.0/31");
        assert_eq!(a["ip_far"], "1.1.2.1/31");
        assert_eq!(b["ip"], "1.1.2.1/31");
        assert_eq!(b["ip_far"], "1.1.2.0/31");
        assert_eq!(a["systemip"], "10.0.0.1/32");
        assert_eq!(a["systemip_far"], "10.0.0.2/32");
        assert_eq!(b["systemip"], "10.0.0.2/32");
    }

    #[test]
    fn test_explicit_far_label_wins() {
        let labels = gather(&link(&[("port", "a,b"), ("port_far", "override")]));
        assert_eq!(labels.side(Side::A)["port_far"], "override");
        assert_eq!(labels.side(Side::B)["port_far"], "override");
    }

    #[test]
    fn test_peer_values() {
        let pair = PeerValues::PerSide { a: "x".into(), b: "y".into() };
        assert_eq!(pair.side(Side::A), SideValue { near: "x".into(), far: Some("y".into()) });
        assert_eq!(pair.side(Side::B), SideValue { near: "y".into(), far: Some("x".into()) });
        let shared = PeerValues::Shared("z".into());
        assert_eq!(shared.side(Side::B), SideValue { near: "z".into(), far: None });
    }
}
