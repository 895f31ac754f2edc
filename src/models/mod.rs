use std::collections::BTreeMap;

mod snippet;
mod topology;

pub use snippet::*;
pub use topology::*;

/// Attribute name to attribute value, as attached during topology construction
pub type LabelMap = BTreeMap<String, String>;

/// Canonical label names the renderer reads or injects
pub mod labels {
    /// Device kind of a node; selects the template set
    pub const NODE_KIND: &str = "clab-node-kind";
    pub const NODE_NAME: &str = "clab-node-name";
    pub const NODE_LONG_NAME: &str = "clab-node-longname";
    pub const TOPOLOGY: &str = "clab-topo";

    /// System (loopback) address of a node, `address/prefix`
    pub const SYSTEM_IP: &str = "systemip";

    /// Explicit link address for endpoint A, `address/prefix`
    pub const LINK_IP: &str = "ip";
    pub const LINK_NAME: &str = "name";
    pub const LINK_NR: &str = "linkNr";

    /// Suffix of the key carrying the peer's value of a link attribute
    pub const FAR_SUFFIX: &str = "_far";
}
