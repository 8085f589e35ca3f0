use crate::config::EndpointConfig;
use crate::protocol::Dialect;

/// The compat protocol's catalog path.
pub const OPENAI_MODELS_PATH: &str = "/v1/models";
/// The compat protocol's chat path.
pub const OPENAI_CHAT_PATH: &str = "/v1/chat/completions";
/// The native protocol's chat path.
pub const ANTHROPIC_MESSAGES_PATH: &str = "/v1/messages";

/// Per-request routing hints derived from the inbound path. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHint {
    pub preferred_endpoint: Option<usize>,
    pub target_path: String,
    pub dialect: Dialect,
    pub is_models_request: bool,
}

/// Parses inbound paths into [`RouteHint`]s against the fixed endpoint
/// prefix list.
///
/// Prefixes are matched in declaration order; overlapping prefixes resolve
/// to whichever is declared first, not to the most specific one.
pub struct PathResolver {
    prefixes: Vec<String>,
}

impl PathResolver {
    #[must_use]
    pub fn new(endpoints: &[EndpointConfig]) -> Self {
        Self {
            prefixes: endpoints
                .iter()
                .map(|endpoint| endpoint.path_prefix.clone())
                .collect(),
        }
    }

    #[must_use]
    pub fn resolve(&self, path: &str) -> RouteHint {
        if path == OPENAI_MODELS_PATH || path.ends_with(OPENAI_MODELS_PATH) {
            return RouteHint {
                preferred_endpoint: None,
                target_path: OPENAI_MODELS_PATH.to_string(),
                dialect: Dialect::OpenAi,
                is_models_request: true,
            };
        }

        if path == OPENAI_CHAT_PATH || path.ends_with(OPENAI_CHAT_PATH) {
            return RouteHint {
                preferred_endpoint: self.match_prefix(path).map(|(index, _)| index),
                target_path: ANTHROPIC_MESSAGES_PATH.to_string(),
                dialect: Dialect::OpenAi,
                is_models_request: false,
            };
        }

        if let Some((index, remainder)) = self.match_prefix(path) {
            let target_path = if remainder.is_empty() {
                "/".to_string()
            } else {
                remainder.to_string()
            };
            return RouteHint {
                preferred_endpoint: Some(index),
                target_path,
                dialect: Dialect::Anthropic,
                is_models_request: false,
            };
        }

        RouteHint {
            preferred_endpoint: None,
            target_path: path.to_string(),
            dialect: Dialect::Anthropic,
            is_models_request: false,
        }
    }

    /// First declared prefix the path starts with, plus the rest of the path.
    fn match_prefix<'a>(&self, path: &'a str) -> Option<(usize, &'a str)> {
        for (index, prefix) in self.prefixes.iter().enumerate() {
            if let Some(remainder) = path.strip_prefix(prefix.as_str()) {
                if remainder.is_empty() || remainder.starts_with('/') {
                    return Some((index, remainder));
                }
            }
        }
        None
    }
}
