//! Policy document text generation.

use std::fmt;

/// Rule emitted before the caller's allow block.
pub const DEFAULT_RULE: &str = "default allow = false";

/// A policy document assembled from a package name, data imports and a rule body.
///
/// The rule body is inserted verbatim; its syntax is the server's concern.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyDocument {
    package: String,
    imports: Vec<String>,
    rule_body: String,
}

impl PolicyDocument {
    /// Creates a document for the policy `name` with the supplied rule body.
    ///
    /// Path separators in `name` become dots in the package declaration, so
    /// `authz/http` is declared as `package authz.http`.
    #[must_use]
    pub fn new(name: &str, rule_body: impl Into<String>) -> Self {
        Self {
            package: name.replace('/', "."),
            imports: Vec::new(),
            rule_body: rule_body.into(),
        }
    }

    /// Declares the data packages imported by the policy, in order.
    #[must_use]
    pub fn with_imports<I, S>(mut self, imports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.imports = imports.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the dotted package name.
    #[must_use]
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Returns the imported data packages.
    #[must_use]
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    /// Returns the caller-supplied rule body.
    #[must_use]
    pub fn rule_body(&self) -> &str {
        &self.rule_body
    }

    /// Renders the document text.
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PolicyDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "package {}", self.package)?;
        for import in &self.imports {
            writeln!(f, "import data.{import}")?;
        }
        writeln!(f, "{DEFAULT_RULE}")?;
        writeln!(f, "allow {{")?;
        writeln!(f, "{}", self.rule_body)?;
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_full_document_in_order() {
        let document = PolicyDocument::new("authz/http", "input.user == data.users[_].name")
            .with_imports(["users", "roles"]);

        assert_eq!(
            document.render(),
            "package authz.http\n\
             import data.users\n\
             import data.roles\n\
             default allow = false\n\
             allow {\n\
             input.user == data.users[_].name\n\
             }\n"
        );
    }

    #[test]
    fn line_counts_hold_for_any_import_list() {
        let body = "input.method == \"GET\"\ninput.path == [\"public\"]";
        for imports in [vec![], vec!["a"], vec!["a", "b.c", "d"]] {
            let text = PolicyDocument::new("example", body)
                .with_imports(imports.clone())
                .render();
            let lines: Vec<&str> = text.lines().collect();

            assert_eq!(lines.iter().filter(|l| l.starts_with("package ")).count(), 1);
            assert_eq!(lines.iter().filter(|l| **l == DEFAULT_RULE).count(), 1);

            let declared: Vec<&str> = lines
                .iter()
                .filter_map(|l| l.strip_prefix("import data."))
                .collect();
            assert_eq!(declared, imports);

            let open = text.find("allow {\n").expect("allow block");
            let block = &text[open..];
            assert!(block.contains(body));
        }
    }

    #[test]
    fn rule_body_is_not_validated() {
        let text = PolicyDocument::new("p", "this is { not rego").render();
        assert!(text.contains("\nthis is { not rego\n"));
    }
}
