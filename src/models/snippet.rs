use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

use super::{LabelMap, Node};

/// Where a snippet came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnippetSource {
    /// Plain template render, not yet bound to a node or link
    Template,
    Node,
    /// One side of a link, tagged with the link's display string
    Link(String),
}

impl fmt::Display for SnippetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnippetSource::Template => f.write_str("template"),
            SnippetSource::Node => f.write_str("node"),
            SnippetSource::Link(link) => f.write_str(link),
        }
    }
}

impl Serialize for SnippetSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// ConfigSnippet is the rendered configuration for one node, or one side of a link
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnippet {
    #[serde(serialize_with = "serialize_target")]
    pub target: Option<Arc<Node>>,
    pub source: SnippetSource,
    pub template_name: String,
    /// All the labels used to render the template
    pub labels: LabelMap,
    /// Lines of config, in document order
    pub lines: Vec<String>,
}

impl ConfigSnippet {
    pub fn new(template_name: impl Into<String>, labels: LabelMap, lines: Vec<String>) -> Self {
        Self {
            target: None,
            source: SnippetSource::Template,
            template_name: template_name.into(),
            labels,
            lines,
        }
    }

    /// Bind the snippet to the node it configures
    pub fn bind(mut self, target: Arc<Node>, source: SnippetSource) -> Self {
        self.target = Some(target);
        self.source = source;
        self
    }

    /// Human-readable summary: target, source and line count
    pub fn describe(&self) -> String {
        self.to_string()
    }

    /// The rendered configuration as a single newline-terminated document
    pub fn text(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl fmt::Display for ConfigSnippet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self
            .target
            .as_ref()
            .map(|n| n.long_name.as_str())
            .unwrap_or("<unbound>");
        write!(
            f,
            "{}: {} {} lines of config",
            target,
            self.source,
            self.lines.len()
        )
    }
}

fn serialize_target<S: Serializer>(
    target: &Option<Arc<Node>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match target {
        Some(node) => serializer.serialize_str(&node.long_name),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> Arc<Node> {
        Arc::new(Node::new("clab-lab-r1", "r1", LabelMap::new()))
    }

    #[test]
    fn test_describe() {
        let snippet = ConfigSnippet::new("base-node.tmpl", LabelMap::new(), vec!["a".into(), "b".into()])
            .bind(node(), SnippetSource::Node);
        assert_eq!(snippet.describe(), "clab-lab-r1: node 2 lines of config");

        let link = SnippetSource::Link("link [r1:eth1, r2:eth1]".into());
        let snippet = ConfigSnippet::new("base-link.tmpl", LabelMap::new(), vec![]).bind(node(), link);
        assert_eq!(
            snippet.to_string(),
            "clab-lab-r1: link [r1:eth1, r2:eth1] 0 lines of config"
        );
    }

    #[test]
    fn test_unbound_snippet() {
        let snippet = ConfigSnippet::new("base-node.tmpl", LabelMap::new(), vec!["x".into()]);
        assert_eq!(snippet.describe(), "<unbound>: template 1 lines of config");
        assert_eq!(snippet.text(), "x\n");
    }

    #[test]
    fn test_serialize() {
        let snippet = ConfigSnippet::new("base-node.tmpl", LabelMap::new(), vec!["hostname r1".into()])
            .bind(node(), SnippetSource::Node);
        let json = serde_json::to_value(&snippet).unwrap();
        assert_eq!(json["target"], "clab-lab-r1");
        assert_eq!(json["source"], "node");
        assert_eq!(json["lines"][0], "hostname r1");
    }
}
