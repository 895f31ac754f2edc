//! Startup configuration rendering for lab network topologies.
//!
//! Each device kind has a directory of templates. A node renders its
//! `base-node.tmpl` with its own labels; each link renders `base-link.tmpl`
//! once per endpoint, with per-side (near/far) attribute values.

pub mod config;
pub mod error;
pub mod ipam;
pub mod models;
pub mod render;
pub mod templates;

pub use error::{FuncError, RenderError};
pub use ipam::{LinkAddressing, LinkIp, SystemIpAddressing};
pub use models::{ConfigSnippet, LabelMap, Link, Node, SnippetSource, Topology};
pub use render::{Renderer, BASE_LINK_TEMPLATE, BASE_NODE_TEMPLATE};
pub use templates::{TemplateSet, TemplateStore};
