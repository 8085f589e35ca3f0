use crate::config::SourceConfig;

/// Startup-precomputed source metadata used by the request path.
#[derive(Debug, Clone)]
pub struct PreparedSource {
    name: String,
    base_url: String,
}

impl PreparedSource {
    #[must_use]
    pub fn new(source: &SourceConfig) -> Self {
        Self {
            name: source.name.clone(),
            base_url: source.base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Build the URL for one failover attempt:
/// `base_url + endpoint_prefix + target_path + original query string`.
#[must_use]
pub fn build_attempt_url(
    source: &PreparedSource,
    endpoint_prefix: &str,
    target_path: &str,
    query: Option<&str>,
) -> String {
    let mut url = String::with_capacity(
        source.base_url.len()
            + endpoint_prefix.len()
            + target_path.len()
            + query.map_or(0, |q| q.len() + 1),
    );
    url.push_str(&source.base_url);
    url.push_str(endpoint_prefix);
    url.push_str(target_path);
    if let Some(query) = query {
        url.push('?');
        url.push_str(query);
    }
    url
}
