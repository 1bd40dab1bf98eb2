//! Identifier → type-name resolution.
//!
//! ```text
//! "gallery"          + Widget  →  GalleryWidget
//! "foo/bar-baz"      + Widget  →  Foo::BarBazWidget
//! "blog/post_list"   + Widget  →  app::Blog::PostListWidget   (namespace "app")
//! ```

/// Maps short identifiers to catalog type names using a naming suffix and
/// an optional namespace prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionRule {
    namespace: Option<String>,
    suffix: String,
}

impl ResolutionRule {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self { namespace: None, suffix: suffix.into() }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        self.namespace = (!namespace.is_empty()).then_some(namespace);
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Resolves `identifier` to a type name. Pure: no catalog access.
    pub fn resolve(&self, identifier: &str) -> String {
        let mut segments: Vec<String> = identifier
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .map(camelize)
            .filter(|s| !s.is_empty())
            .collect();

        match segments.last_mut() {
            Some(last) => last.push_str(&self.suffix),
            None => segments.push(self.suffix.clone()),
        }

        let path = segments.join("::");
        match &self.namespace {
            Some(ns) => format!("{ns}::{path}"),
            None => path,
        }
    }

    /// Whether a type name satisfies the naming suffix.
    ///
    /// Only the last path segment is checked.
    pub fn conforms(&self, type_name: &str) -> bool {
        let last = type_name.rsplit("::").next().unwrap_or(type_name);
        !last.is_empty() && last.ends_with(&self.suffix)
    }
}

/// `bar-baz_qux.v2` → `BarBazQuxV2`
fn camelize(segment: &str) -> String {
    segment
        .split(['-', '_', '.', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_segment_gets_suffix() {
        assert_eq!(ResolutionRule::new("Widget").resolve("gallery"), "GalleryWidget");
    }

    #[test]
    fn path_segments_become_namespaces() {
        let rule = ResolutionRule::new("Widget");
        assert_eq!(rule.resolve("foo/bar-baz"), "Foo::BarBazWidget");
        assert_eq!(rule.resolve("my/widget"), "My::WidgetWidget");
        assert_eq!(rule.resolve("admin\\user_list"), "Admin::UserListWidget");
    }

    #[test]
    fn namespace_is_prefixed() {
        let rule = ResolutionRule::new("Action").with_namespace("app");
        assert_eq!(rule.resolve("auth/login"), "app::Auth::LoginAction");
    }

    #[test]
    fn empty_namespace_is_ignored() {
        let rule = ResolutionRule::new("Action").with_namespace("");
        assert_eq!(rule.namespace(), None);
        assert_eq!(rule.resolve("login"), "LoginAction");
    }

    #[test]
    fn conformance_checks_last_segment() {
        let rule = ResolutionRule::new("Template");
        assert!(rule.conforms("HomeTemplate"));
        assert!(rule.conforms("app::Blog::PostTemplate"));
        assert!(!rule.conforms("app::TemplateHelpers::Home"));
        assert!(!rule.conforms(""));
    }
}
