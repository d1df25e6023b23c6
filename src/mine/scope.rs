use crate::model::MethodKey;
use std::collections::HashSet;

/// Restricts mining to a set of methods and/or files.
///
/// A restriction that is `None` does not filter. Admission is decided the first
/// time a method is seen; once admitted, its history follows it across renames.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    methods: Option<HashSet<MethodKey>>,
    files: Option<HashSet<String>>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = MethodKey>) -> Self {
        self.methods = Some(methods.into_iter().collect());
        self
    }

    pub fn with_files(mut self, files: impl IntoIterator<Item = String>) -> Self {
        self.files = Some(files.into_iter().collect());
        self
    }

    pub fn is_unrestricted(&self) -> bool {
        self.methods.is_none() && self.files.is_none()
    }

    /// Whether any method of `path` could be admitted.
    pub fn admits_file(&self, path: &str) -> bool {
        let file_ok = self.files.as_ref().map_or(true, |files| files.contains(path));
        let method_ok = self
            .methods
            .as_ref()
            .map_or(true, |methods| methods.iter().any(|k| k.path() == path));
        file_ok && method_ok
    }

    pub fn admits(&self, path: &str, method: &str) -> bool {
        let file_ok = self.files.as_ref().map_or(true, |files| files.contains(path));
        let method_ok = self
            .methods
            .as_ref()
            .map_or(true, |methods| methods.contains(&MethodKey::new(path, method)));
        file_ok && method_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scope_admits_everything() {
        let scope = Scope::new();
        assert!(scope.is_unrestricted());
        assert!(scope.admits("any.cpp", "m"));
        assert!(scope.admits_file("any.cpp"));
    }

    #[test]
    fn method_filter() {
        let scope = Scope::new().with_methods([MethodKey::new("a.cpp", "foo")]);
        assert!(scope.admits("a.cpp", "foo"));
        assert!(!scope.admits("a.cpp", "bar"));
        assert!(scope.admits_file("a.cpp"));
        assert!(!scope.admits_file("b.cpp"));
    }

    #[test]
    fn file_and_method_filters_combine() {
        let scope = Scope::new()
            .with_files(["a.cpp".to_string()])
            .with_methods([MethodKey::new("a.cpp", "foo"), MethodKey::new("b.cpp", "foo")]);
        assert!(scope.admits("a.cpp", "foo"));
        assert!(!scope.admits("b.cpp", "foo"));
    }
}
