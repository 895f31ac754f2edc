pub mod batch;
pub mod link;

use std::path::Path;
use std::sync::Arc;

use crate::error::{RenderError, Result};
use crate::ipam::{LinkAddressing, SystemIpAddressing};
use crate::models::{ConfigSnippet, Endpoint, Link, Node, SnippetSource};
use crate::templates::TemplateStore;

pub use link::{LinkLabels, PeerValues, Side, SideValue, SplitWarning};

/// Template rendering a node's base configuration
pub const BASE_NODE_TEMPLATE: &str = "base-node.tmpl";
/// Template rendering one side of a link
pub const BASE_LINK_TEMPLATE: &str = "base-link.tmpl";

/// Renderer produces node and link configuration snippets from a shared template store
#[derive(Clone)]
pub struct Renderer {
    store: Arc<TemplateStore>,
    addressing: Arc<dyn LinkAddressing>,
}

impl Renderer {
    pub fn new(store: Arc<TemplateStore>, addressing: Arc<dyn LinkAddressing>) -> Self {
        Self { store, addressing }
    }

    /// Renderer assigning link addresses from the nodes' system IPs
    pub fn with_system_ip(store: Arc<TemplateStore>) -> Self {
        Self::new(store, Arc::new(SystemIpAddressing))
    }

    pub fn store(&self) -> &Arc<TemplateStore> {
        &self.store
    }

    /// Load the template set for `kind`; see [`TemplateStore::load`]
    pub fn load_templates(&self, kind: &str, base_path: impl AsRef<Path>) -> Result<()> {
        self.store.load(kind, base_path).map(|_| ())
    }

    /// Render the base configuration of `node` with its own labels
    pub fn render_node(&self, node: &Arc<Node>) -> Result<ConfigSnippet> {
        let kind = node.kind();
        tracing::debug!("render node {} [{}]", node.long_name, kind);

        let snippet = self
            .store
            .render(kind, BASE_NODE_TEMPLATE, &node.labels)
            .map_err(|e| RenderError::Node {
                node: node.long_name.clone(),
                kind: kind.to_string(),
                source: Box::new(e),
            })?;
        Ok(snippet.bind(Arc::clone(node), SnippetSource::Node))
    }

    /// Render both sides of `link`; the first snippet is always endpoint A
    pub fn render_link(&self, link: &Link) -> Result<(ConfigSnippet, ConfigSnippet)> {
        let (ip_a, ip_b) =
            self.addressing
                .link_ips(link)
                .map_err(|reason| RenderError::AddressResolution {
                    link: link.to_string(),
                    reason,
                })?;

        let values = LinkLabels::gather(link, &ip_a, &ip_b);
        let a = self.render_side(link, &link.a, &values, Side::A)?;
        let b = self.render_side(link, &link.b, &values, Side::B)?;
        Ok((a, b))
    }

    fn render_side(
        &self,
        link: &Link,
        endpoint: &Endpoint,
        values: &LinkLabels,
        side: Side,
    ) -> Result<ConfigSnippet> {
        let node = &endpoint.node;
        let kind = node.kind();
        let labels = values.side(side);
        tracing::debug!("render {} on {} ({}) - {:?}", link, node.long_name, kind, labels);

        let snippet = self
            .store
            .render(kind, BASE_LINK_TEMPLATE, &labels)
            .map_err(|e| RenderError::Link {
                link: link.to_string(),
                node: node.long_name.clone(),
                kind: kind.to_string(),
                source: Box::new(e),
            })?;
        Ok(snippet.bind(Arc::clone(node), SnippetSource::Link(link.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipam::LinkIp;
    use crate::models::LabelMap;
    use std::fs;

    const NODE_TMPL: &str = "hostname {{ clab_name }}\nsystem {{ systemip | ip }}\n";
    const LINK_TMPL: &str = concat!(
        "interface {{ name }}\n",
        " address {{ ip }}\n",
        " peer {{ ip_far | ip }}\n",
        "{% if port %} port {{ port }}{% if port_far %} -> {{ port_far }}{% endif %}\n{% endif %}",
    );

    struct Fixture {
        _dir: tempfile::TempDir,
        renderer: Renderer,
    }

    fn fixture(kinds: &[(&str, &str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        for (kind, node_tmpl, link_tmpl) in kinds {
            let kind_dir = dir.path().join(kind);
            fs::create_dir_all(&kind_dir).unwrap();
            fs::write(kind_dir.join(BASE_NODE_TEMPLATE), node_tmpl).unwrap();
            fs::write(kind_dir.join(BASE_LINK_TEMPLATE), link_tmpl).unwrap();
        }
        let renderer = Renderer::with_system_ip(Arc::new(TemplateStore::new()));
        for (kind, _, _) in kinds {
            renderer.load_templates(kind, dir.path()).unwrap();
        }
        Fixture { _dir: dir, renderer }
    }

    fn node(name: &str, kind: &str, systemip: &str) -> Arc<Node> {
        let labels: LabelMap = [
            ("clab-node-kind", kind),
            ("systemip", systemip),
            ("clab_name", name),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Arc::new(Node::new(format!("clab-t-{}", name), name, labels))
    }

    fn link(a: Arc<Node>, b: Arc<Node>, labels: &[(&str, &str)]) -> Link {
        Link::new(
            Endpoint { node: a, iface: "eth1".into() },
            Endpoint { node: b, iface: "eth1".into() },
            labels.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        )
    }

    #[test]
    fn test_render_node() {
        let f = fixture(&[("srl", NODE_TMPL, LINK_TMPL)]);
        let r1 = node("r1", "srl", "10.0.0.1/32");
        let snippet = f.renderer.render_node(&r1).unwrap();
        assert_eq!(snippet.lines, vec!["hostname r1", "system 10.0.0.1"]);
        assert_eq!(snippet.source, SnippetSource::Node);
        assert!(Arc::ptr_eq(snippet.target.as_ref().unwrap(), &r1));
        assert_eq!(snippet.describe(), "clab-t-r1: node 2 lines of config");
    }

    #[test]
    fn test_render_node_unknown_kind() {
        let f = fixture(&[("srl", NODE_TMPL, LINK_TMPL)]);
        let err = f.renderer.render_node(&node("r1", "ceos", "10.0.0.1/32")).unwrap_err();
        assert!(matches!(err.root(), RenderError::TemplateLookup { kind } if kind == "ceos"));
        assert_eq!(
            err.to_string(),
            "render node clab-t-r1 [ceos]: no templates loaded for kind ceos"
        );
    }

    #[test]
    fn test_render_link_sides() {
        let f = fixture(&[("srl", NODE_TMPL, LINK_TMPL), ("sros", NODE_TMPL, LINK_TMPL)]);
        let r1 = node("r1", "srl", "10.0.0.1/32");
        let r2 = node("r2", "sros", "10.0.0.2/32");
        let l = link(r1.clone(), r2.clone(), &[("port", "1/1/1,ethernet-1/1")]);

        let (a, b) = f.renderer.render_link(&l).unwrap();
        assert!(Arc::ptr_eq(a.target.as_ref().unwrap(), &r1));
        assert!(Arc::ptr_eq(b.target.as_ref().unwrap(), &r2));
        assert_eq!(a.source, SnippetSource::Link("link [r1:eth1, r2:eth1]".into()));
        assert_eq!(
            a.lines,
            vec!["interface to_r2", " address 1.1.2.0/31", " peer 1.1.2.1", " port 1/1/1 -> ethernet-1/1"]
        );
        assert_eq!(
            b.lines,
            vec!["interface to_r1", " address 1.1.2.1/31", " peer 1.1.2.0", " port ethernet-1/1 -> 1/1/1"]
        );
        assert_eq!(a.labels["port_far"], "ethernet-1/1");
        assert_eq!(b.labels["port_far"], "1/1/1");
    }

    #[test]
    fn test_render_link_shared_and_dropped_attributes() {
        let f = fixture(&[("srl", NODE_TMPL, LINK_TMPL)]);
        let l = link(
            node("r1", "srl", "10.0.0.1/32"),
            node("r2", "srl", "10.0.0.2/32"),
            &[("port", "1/1/1"), ("vlan", "1,2,3"), ("linkNr", "3")],
        );
        let (a, b) = f.renderer.render_link(&l).unwrap();
        assert_eq!(a.lines[0], "interface to_r2_3");
        assert_eq!(b.lines[0], "interface to_r1_3");
        assert_eq!(a.lines[3], " port 1/1/1");
        assert_eq!(b.lines[3], " port 1/1/1");
        assert!(!a.labels.contains_key("vlan"));
        assert!(!b.labels.contains_key("vlan"));
    }

    #[test]
    fn test_render_link_address_failure() {
        let f = fixture(&[("srl", NODE_TMPL, LINK_TMPL)]);
        let l = link(node("r1", "srl", ""), node("r2", "srl", "10.0.0.2/32"), &[]);
        let err = f.renderer.render_link(&l).unwrap_err();
        match err {
            RenderError::AddressResolution { link, reason } => {
                assert_eq!(link, "link [r1:eth1, r2:eth1]");
                assert!(reason.contains("r1"), "{}", reason);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_render_link_side_b_failure() {
        let failing = "{{ missing | require }}";
        let f = fixture(&[("srl", NODE_TMPL, LINK_TMPL), ("bad", NODE_TMPL, failing)]);
        let l = link(node("r1", "srl", "10.0.0.1/32"), node("r2", "bad", "10.0.0.2/32"), &[]);
        let err = f.renderer.render_link(&l).unwrap_err();
        match &err {
            RenderError::Link { node, kind, .. } => {
                assert_eq!(node, "clab-t-r2");
                assert_eq!(kind, "bad");
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(matches!(err.root(), RenderError::TemplateExecution { template, .. } if template == BASE_LINK_TEMPLATE));
    }

    struct FixedAddressing;

    impl LinkAddressing for FixedAddressing {
        fn link_ips(&self, _link: &Link) -> std::result::Result<(LinkIp, LinkIp), String> {
            Ok(("192.168.0.1/30".parse()?, "192.168.0.2/30".parse()?))
        }
    }

    #[test]
    fn test_custom_addressing() {
        let f = fixture(&[("srl", NODE_TMPL, LINK_TMPL)]);
        let renderer = Renderer::new(Arc::clone(f.renderer.store()), Arc::new(FixedAddressing));
        let l = link(node("r1", "srl", ""), node("r2", "srl", ""), &[]);
        let (a, b) = renderer.render_link(&l).unwrap();
        assert_eq!(a.lines[1], " address 192.168.0.1/30");
        assert_eq!(b.lines[1], " address 192.168.0.2/30");
    }
}
