//! Route tree node types

use serde::Serialize;

use crate::context::{RouteModule, STATIC_PARAMS_EXPORT};
use crate::pattern::DynamicDescriptor;

/// What a node is, and for rule nodes where it points
///
/// Redirects and rewrites reference their destination by context key;
/// look it up with [`RouteTree::resolve_destination`](crate::RouteTree::resolve_destination).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Route,
    Layout,
    Api,
    #[serde(rename_all = "camelCase")]
    Redirect {
        destination_context_key: String,
        permanent: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        methods: Option<Vec<String>>,
    },
    #[serde(rename_all = "camelCase")]
    Rewrite {
        destination_context_key: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        methods: Option<Vec<String>>,
    },
}

impl NodeKind {
    pub fn is_rule(&self) -> bool {
        matches!(self, NodeKind::Redirect { .. } | NodeKind::Rewrite { .. })
    }
}

/// One entry of the compiled route tree
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteNode {
    #[serde(flatten)]
    pub kind: NodeKind,
    /// Route path relative to the parent layout
    pub route: String,
    pub context_key: String,
    pub dynamic: Option<Vec<DynamicDescriptor>>,
    /// Synthesized by the compiler rather than authored
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub generated: bool,
    /// Resolved exports, only present in sync import mode
    #[serde(skip)]
    pub module: Option<RouteModule>,
    pub children: Vec<RouteNode>,
}

impl RouteNode {
    pub fn new(kind: NodeKind, route: impl Into<String>, context_key: impl Into<String>) -> Self {
        Self {
            kind,
            route: route.into(),
            context_key: context_key.into(),
            dynamic: None,
            generated: false,
            module: None,
            children: Vec::new(),
        }
    }

    pub fn with_dynamic(mut self, dynamic: Option<Vec<DynamicDescriptor>>) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    pub fn with_module(mut self, module: Option<RouteModule>) -> Self {
        self.module = module;
        self
    }

    pub fn with_children(mut self, children: Vec<RouteNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_layout(&self) -> bool {
        matches!(self.kind, NodeKind::Layout)
    }

    /// Whether this is the reserved not-found leaf
    pub fn is_not_found(&self) -> bool {
        self.dynamic
            .as_ref()
            .and_then(|dynamic| dynamic.last())
            .is_some_and(|descriptor| descriptor.not_found)
    }

    /// Destination key of a redirect or rewrite
    pub fn destination_key(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Redirect {
                destination_context_key,
                ..
            }
            | NodeKind::Rewrite {
                destination_context_key,
                ..
            } => Some(destination_context_key),
            NodeKind::Route | NodeKind::Layout | NodeKind::Api => None,
        }
    }

    /// Module whose `generateStaticParams` the export stage should enumerate
    pub fn static_params_module(&self) -> Option<&RouteModule> {
        self.module
            .as_ref()
            .filter(|module| module.export(STATIC_PARAMS_EXPORT).is_some())
    }
}
