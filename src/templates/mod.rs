//! Per-kind template sets and the template renderer.
//!
//! Templates for kind `K` are all files matching `<base>/K/*.tmpl`. Each kind
//! is compiled at most once per [`TemplateStore`]; concurrent loads of the same
//! kind wait for the first one and share its result.

pub mod funcs;

use minijinja::value::Value;
use minijinja::{context, AutoEscape, Environment};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{RenderError, Result};
use crate::models::{ConfigSnippet, LabelMap};

/// File extension of template files
pub const TEMPLATE_EXT: &str = "tmpl";

/// TemplateSet holds the compiled templates of one device kind
pub struct TemplateSet {
    kind: String,
    env: Environment<'static>,
    names: Vec<String>,
}

impl TemplateSet {
    /// Compile every template file under `<base_path>/<kind>/`
    pub fn compile(kind: &str, base_path: &Path) -> Result<Self> {
        let pattern = base_path.join(kind).join(format!("*.{}", TEMPLATE_EXT));
        let pattern = pattern.to_string_lossy().into_owned();
        tracing::debug!("Load templates from: {}", pattern);

        let paths = glob::glob(&pattern).map_err(|e| RenderError::TemplateDir {
            kind: kind.to_string(),
            reason: e.to_string(),
        })?;

        let mut env = Environment::new();
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_keep_trailing_newline(true);
        funcs::register(&mut env);

        let mut names = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| RenderError::TemplateDir {
                kind: kind.to_string(),
                reason: e.to_string(),
            })?;
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().into_owned(),
                None => continue,
            };
            let source = std::fs::read_to_string(&path).map_err(|e| RenderError::TemplateDir {
                kind: kind.to_string(),
                reason: format!("{}: {}", path.display(), e),
            })?;
            env.add_template_owned(name.clone(), source).map_err(|source| {
                tracing::error!("could not load template {}: {}", path.display(), source);
                RenderError::TemplateLoad {
                    kind: kind.to_string(),
                    path: path.display().to_string(),
                    source,
                }
            })?;
            names.push(name);
        }

        if names.is_empty() {
            tracing::error!("no templates found for kind {} ({})", kind, pattern);
            return Err(RenderError::NoTemplates {
                kind: kind.to_string(),
                path: pattern,
            });
        }

        tracing::debug!("Loaded {} templates for kind {}: {:?}", names.len(), kind, names);
        Ok(Self {
            kind: kind.to_string(),
            env,
            names,
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Template names (file names), sorted
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Execute template `name` against `labels`, capturing the output as lines.
    ///
    /// Labels are top-level variables. The whole map is also available as
    /// `labels`, for keys that are not identifiers (`labels["clab-node-kind"]`).
    pub fn render(&self, name: &str, labels: &LabelMap) -> Result<ConfigSnippet> {
        let ctx = context! {
            labels => labels,
            ..Value::from_serialize(labels)
        };
        let output = self
            .env
            .get_template(name)
            .and_then(|tmpl| tmpl.render(ctx))
            .map_err(|source| {
                let dump = serde_json::to_string_pretty(labels).unwrap_or_default();
                tracing::error!("could not render template {}: {}", name, source);
                tracing::debug!("{}", dump);
                RenderError::TemplateExecution {
                    template: name.to_string(),
                    labels: dump,
                    source,
                }
            })?;

        Ok(ConfigSnippet::new(name, labels.clone(), split_lines(&output)))
    }
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("kind", &self.kind)
            .field("names", &self.names)
            .finish()
    }
}

/// Split rendered output on line boundaries; a final newline adds no empty line
pub fn split_lines(output: &str) -> Vec<String> {
    output.lines().map(str::to_string).collect()
}

type Slot = Arc<OnceCell<Arc<TemplateSet>>>;

/// TemplateStore caches compiled template sets by kind
#[derive(Default)]
pub struct TemplateStore {
    sets: RwLock<HashMap<String, Slot>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure the template set for `kind` exists, compiling it from
    /// `<base_path>/<kind>/*.tmpl` on first use.
    ///
    /// A failed load leaves the kind unpopulated so it can be retried.
    pub fn load(&self, kind: &str, base_path: impl AsRef<Path>) -> Result<Arc<TemplateSet>> {
        let slot = self.slot(kind);
        let set = slot.get_or_try_init(|| {
            TemplateSet::compile(kind, base_path.as_ref()).map(Arc::new)
        })?;
        Ok(Arc::clone(set))
    }

    fn slot(&self, kind: &str) -> Slot {
        if let Some(slot) = self.sets.read().get(kind) {
            return Arc::clone(slot);
        }
        let mut sets = self.sets.write();
        Arc::clone(sets.entry(kind.to_string()).or_default())
    }

    /// The loaded template set for `kind`, if any
    pub fn get(&self, kind: &str) -> Option<Arc<TemplateSet>> {
        self.sets
            .read()
            .get(kind)
            .and_then(|slot| slot.get().cloned())
    }

    pub fn is_loaded(&self, kind: &str) -> bool {
        self.get(kind).is_some()
    }

    /// Kinds with a loaded template set, sorted
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self
            .sets
            .read()
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(kind, _)| kind.clone())
            .collect();
        kinds.sort();
        kinds
    }

    /// Render template `name` of an already loaded `kind`
    pub fn render(&self, kind: &str, name: &str, labels: &LabelMap) -> Result<ConfigSnippet> {
        let set = self.get(kind).ok_or_else(|| RenderError::TemplateLookup {
            kind: kind.to_string(),
        })?;
        set.render(name, labels)
    }
}
