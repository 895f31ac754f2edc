use thiserror::Error;

use crate::templates::funcs::LabelValue;

pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Errors raised while loading templates or rendering node/link configuration
#[derive(Debug, Error)]
pub enum RenderError {
    /// A template file under the kind directory failed to load or parse
    #[error("could not load templates for kind {kind} from {path}: {source}")]
    TemplateLoad {
        kind: String,
        path: String,
        #[source]
        source: minijinja::Error,
    },

    /// The kind directory exists but holds no template files
    #[error("could not load templates for kind {kind}: no files match {path}")]
    NoTemplates { kind: String, path: String },

    #[error("could not load templates for kind {kind}: {reason}")]
    TemplateDir { kind: String, reason: String },

    /// Render requested for a kind whose templates were never loaded
    #[error("no templates loaded for kind {kind}")]
    TemplateLookup { kind: String },

    /// Template evaluation failed, either in a library function or the template itself
    #[error("could not render template {template}: {source}")]
    TemplateExecution {
        template: String,
        /// JSON dump of the labels the template was rendered with
        labels: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("{link}: {reason}")]
    AddressResolution { link: String, reason: String },

    #[error("render node {node} [{kind}]: {source}")]
    Node {
        node: String,
        kind: String,
        #[source]
        source: Box<RenderError>,
    },

    #[error("render {link} on {node} ({kind}): {source}")]
    Link {
        link: String,
        node: String,
        kind: String,
        #[source]
        source: Box<RenderError>,
    },
}

impl RenderError {
    /// Innermost error, skipping the node/link context wrappers
    pub fn root(&self) -> &RenderError {
        match self {
            RenderError::Node { source, .. } | RenderError::Link { source, .. } => source.root(),
            other => other,
        }
    }

    /// Library function failure behind a template execution error, if any
    pub fn func_error(&self) -> Option<&FuncError> {
        let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = cur {
            if let Some(func) = err.downcast_ref::<FuncError>() {
                return Some(func);
            }
            cur = err.source();
        }
        None
    }
}

/// Errors produced by the template function library
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FuncError {
    #[error("required value not set")]
    RequiredValueNotSet,

    #[error("default value expected")]
    DefaultValueExpected,

    /// The present value does not match the type of its default
    #[error("expected type {expected}, got {got} (value={value})")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
        value: LabelValue,
    },

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("int expected for {position} parameter, got {value}")]
    ExpectedInteger {
        position: &'static str,
        value: LabelValue,
    },

    #[error("expected array [], got {0}")]
    ExpectedSequence(LabelValue),

    #[error("{func}: unsupported value {value}")]
    Unsupported {
        func: &'static str,
        value: LabelValue,
    },

    #[error("{func}: index out of range [{start}:{end}] with length {len}")]
    OutOfRange {
        func: &'static str,
        start: i64,
        end: i64,
        len: usize,
    },

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}
