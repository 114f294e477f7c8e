use std::collections::BTreeMap;

use crate::domain::types::OtpMethod;
use crate::error::AuthServiceError;

/// Registered second-factor methods, keyed by wire name.
///
/// Built once at startup from configuration and shared immutably; the flow
/// controller never re-derives it per request. An empty or missing
/// configuration yields an empty registry — startup still succeeds, the
/// service just cannot issue challenges.
#[derive(Debug, Clone, Default)]
pub struct OtpRegistry {
    methods: BTreeMap<String, OtpMethod>,
}

impl OtpRegistry {
    /// Parse a comma-separated method list, e.g. `"email,sms,totp"`.
    /// Unknown names are skipped with a warning rather than failing startup.
    pub fn from_config(spec: &str) -> Self {
        let mut methods = BTreeMap::new();
        for name in spec.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match OtpMethod::parse(name) {
                Some(method) => {
                    methods.insert(name.to_owned(), method);
                }
                None => {
                    tracing::warn!(method = name, "unknown OTP method in config, skipping");
                }
            }
        }
        Self { methods }
    }

    /// Resolve a wire name to its method.
    pub fn get(&self, name: &str) -> Result<OtpMethod, AuthServiceError> {
        self.methods
            .get(name)
            .copied()
            .ok_or(AuthServiceError::UnsupportedMethod)
    }

    /// Registered (name, method) pairs in stable order.
    pub fn methods(&self) -> impl Iterator<Item = (&str, OtpMethod)> {
        self.methods.iter().map(|(name, m)| (name.as_str(), *m))
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
