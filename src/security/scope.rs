//! Scope filter: decides which requests the gate applies to.

/// Path prefix matcher for gated routes.
#[derive(Debug, Clone)]
pub struct ApiScope {
    prefix: String,
}

impl ApiScope {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// True when the path begins with the API prefix. Case-sensitive.
    pub fn in_scope(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

impl Default for ApiScope {
    fn default() -> Self {
        Self::new("/api")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_paths_in_scope() {
        let scope = ApiScope::default();
        assert!(scope.in_scope("/api"));
        assert!(scope.in_scope("/api/github/fetch"));
        assert!(scope.in_scope("/api/shorten"));
    }

    #[test]
    fn test_other_paths_out_of_scope() {
        let scope = ApiScope::default();
        assert!(!scope.in_scope("/"));
        assert!(!scope.in_scope("/blog"));
        assert!(!scope.in_scope("/_next/static/chunks/main.js"));
        assert!(!scope.in_scope("/favicon.ico"));
        assert!(!scope.in_scope("/s/abc123"));
        assert!(!scope.in_scope("/API/openai"));
    }
}
