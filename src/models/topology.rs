use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::{labels, LabelMap};

/// Node is one network-device instance of a topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub long_name: String,
    pub short_name: String,
    pub labels: LabelMap,
}

impl Node {
    pub fn new(long_name: impl Into<String>, short_name: impl Into<String>, labels: LabelMap) -> Self {
        Self {
            long_name: long_name.into(),
            short_name: short_name.into(),
            labels,
        }
    }

    /// Device kind, empty if the kind label is missing
    pub fn kind(&self) -> &str {
        self.label(labels::NODE_KIND)
    }

    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map(String::as_str).unwrap_or("")
    }
}

/// Endpoint binds one end of a link to a node interface
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub node: Arc<Node>,
    pub iface: String,
}

/// Link is a point-to-point connection between two node interfaces
#[derive(Debug, Clone)]
pub struct Link {
    pub a: Endpoint,
    pub b: Endpoint,
    /// Labels shared by both sides; values may be `shared` or `a_value,b_value`
    pub labels: LabelMap,
}

impl Link {
    pub fn new(a: Endpoint, b: Endpoint, labels: LabelMap) -> Self {
        Self { a, b, labels }
    }

    pub fn label(&self, key: &str) -> &str {
        self.labels.get(key).map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "link [{}:{}, {}:{}]",
            self.a.node.short_name, self.a.iface, self.b.node.short_name, self.b.iface
        )
    }
}

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("could not read topology file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid topology file {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("link {index}: endpoint {endpoint:?} is not in node:interface form")]
    BadEndpoint { index: usize, endpoint: String },

    #[error("link {index}: unknown node {node}")]
    UnknownNode { index: usize, node: String },
}

/// Topology file layout (YAML or JSON)
#[derive(Debug, Clone, Deserialize)]
pub struct TopologyDefinition {
    pub name: String,
    #[serde(default)]
    pub nodes: BTreeMap<String, NodeDefinition>,
    #[serde(default)]
    pub links: Vec<LinkDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeDefinition {
    pub kind: String,
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub labels: LabelMap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkDefinition {
    /// `["node:iface", "node:iface"]`, A side first
    pub endpoints: [String; 2],
    #[serde(default, deserialize_with = "deserialize_labels")]
    pub labels: LabelMap,
}

/// Label values may be written as plain YAML/JSON scalars
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

fn deserialize_labels<'de, D: Deserializer<'de>>(deserializer: D) -> Result<LabelMap, D::Error> {
    let raw: BTreeMap<String, Scalar> = BTreeMap::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Scalar::Str(s) => s,
                Scalar::Int(n) => n.to_string(),
                Scalar::Float(n) => n.to_string(),
                Scalar::Bool(b) => b.to_string(),
            };
            (k, v)
        })
        .collect())
}

/// Topology is the resolved graph: nodes in name order, links in file order
#[derive(Debug, Clone)]
pub struct Topology {
    pub name: String,
    pub nodes: Vec<Arc<Node>>,
    pub links: Vec<Link>,
}

impl Topology {
    /// Load a topology from a `.json` file, or YAML for any other extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| TopologyError::Io {
            path: display.clone(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let definition: TopologyDefinition = if is_json {
            serde_json::from_str(&content).map_err(|e| TopologyError::Parse {
                path: display.clone(),
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&content).map_err(|e| TopologyError::Parse {
                path: display.clone(),
                reason: e.to_string(),
            })?
        };

        Self::build(definition)
    }

    /// Resolve node names and link endpoints, injecting the reserved node labels
    pub fn build(definition: TopologyDefinition) -> Result<Self, TopologyError> {
        let mut by_name: BTreeMap<String, Arc<Node>> = BTreeMap::new();
        for (short_name, def) in definition.nodes {
            let long_name = format!("clab-{}-{}", definition.name, short_name);
            let mut node_labels = def.labels;
            node_labels.insert(labels::NODE_KIND.to_string(), def.kind);
            node_labels.insert(labels::NODE_NAME.to_string(), short_name.clone());
            node_labels.insert(labels::NODE_LONG_NAME.to_string(), long_name.clone());
            node_labels.insert(labels::TOPOLOGY.to_string(), definition.name.clone());
            let node = Arc::new(Node::new(long_name, short_name.clone(), node_labels));
            by_name.insert(short_name, node);
        }

        let mut links = Vec::with_capacity(definition.links.len());
        for (index, def) in definition.links.into_iter().enumerate() {
            let [a, b] = def.endpoints;
            let a = resolve_endpoint(index, &a, &by_name)?;
            let b = resolve_endpoint(index, &b, &by_name)?;
            links.push(Link::new(a, b, def.labels));
        }

        Ok(Self {
            name: definition.name,
            nodes: by_name.into_values().collect(),
            links,
        })
    }

    /// Distinct kinds used by the topology's nodes
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.nodes.iter().map(|n| n.kind().to_string()).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }
}

fn resolve_endpoint(
    index: usize,
    endpoint: &str,
    nodes: &BTreeMap<String, Arc<Node>>,
) -> Result<Endpoint, TopologyError> {
    let (node, iface) = endpoint
        .split_once(':')
        .filter(|(n, i)| !n.is_empty() && !i.is_empty())
        .ok_or_else(|| TopologyError::BadEndpoint {
            index,
            endpoint: endpoint.to_string(),
        })?;
    let node = nodes.get(node).ok_or_else(|| TopologyError::UnknownNode {
        index,
        node: node.to_string(),
    })?;
    Ok(Endpoint {
        node: node.clone(),
        iface: iface.to_string(),
    })
}
