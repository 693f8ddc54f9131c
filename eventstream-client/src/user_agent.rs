//! User-Agent header assembly.
//!
//! The header is a chain of `name/version (details)` entries: the
//! application's entry first, then this library's own entry, so operators
//! can tell which scheduler *and* which client build opened a subscription.

use http::HeaderValue;

/// One `name/version` entry of the User-Agent chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserAgentEntry {
    name: String,
    version: String,
    details: Option<String>,
}

impl UserAgentEntry {
    /// Create an entry with a name and version.
    pub fn new<N: Into<String>, V: Into<String>>(name: N, version: V) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            details: None,
        }
    }

    /// Attach a parenthesized details segment.
    pub fn with_details<D: Into<String>>(mut self, details: D) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl std::fmt::Display for UserAgentEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

/// A full User-Agent chain.
#[derive(Clone, Debug)]
pub struct UserAgent {
    entries: Vec<UserAgentEntry>,
}

impl UserAgent {
    /// The library's own entry.
    fn library_entry() -> UserAgentEntry {
        UserAgentEntry::new("eventstream", env!("CARGO_PKG_VERSION"))
    }

    /// Build the chain for an application: its entry (when provided)
    /// followed by the library entry.
    pub(crate) fn for_application(application: Option<UserAgentEntry>) -> Self {
        let mut entries = Vec::with_capacity(2);
        if let Some(entry) = application {
            entries.push(entry);
        }
        entries.push(Self::library_entry());
        Self { entries }
    }

    /// Render the chain as a header value.
    ///
    /// Entries always render as valid ASCII header content, so this cannot
    /// fail for values built through [`UserAgentEntry`]; a pathological
    /// entry falls back to the library entry alone.
    pub(crate) fn header_value(&self) -> HeaderValue {
        HeaderValue::from_str(&self.to_string()).unwrap_or_else(|_| {
            HeaderValue::from_str(&Self::library_entry().to_string())
                .unwrap_or(HeaderValue::from_static("eventstream"))
        })
    }
}

impl std::fmt::Display for UserAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for entry in &self.entries {
            if !first {
                write!(f, " ")?;
            }
            write!(f, "{entry}")?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_rendering() {
        let entry = UserAgentEntry::new("scheduler", "2.1.0");
        assert_eq!(entry.to_string(), "scheduler/2.1.0");

        let entry = UserAgentEntry::new("scheduler", "2.1.0").with_details("build 4242");
        assert_eq!(entry.to_string(), "scheduler/2.1.0 (build 4242)");
    }

    #[test]
    fn test_chain_application_first() {
        let agent = UserAgent::for_application(Some(UserAgentEntry::new("scheduler", "1.0")));
        let rendered = agent.to_string();
        assert!(rendered.starts_with("scheduler/1.0 eventstream/"));
    }

    #[test]
    fn test_chain_library_only() {
        let agent = UserAgent::for_application(None);
        assert!(agent.to_string().starts_with("eventstream/"));
    }

    #[test]
    fn test_header_value() {
        let agent = UserAgent::for_application(Some(UserAgentEntry::new("app", "0.3")));
        let value = agent.header_value();
        assert_eq!(value.to_str().unwrap(), agent.to_string());
    }
}
