//! Declarations discovered inside a component definition.
//!
//! A definition's direct children may declare instance members using the
//! tag-per-member micro-grammar:
//!
//! ```html
//! <count>0</count>
//! <print-two-numbers (num1, num2)>console.log(num1, num2)</print-two-numbers>
//! ```
//!
//! The first is a property (its text is evaluated), the second a method
//! (its text is kept as a function body).

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::value::Value;

/// Tag names that may not be used as declarations, compared after canonicalization.
pub const RESERVED_NAMES: &[&str] = &[
    "constructor",
    "connected-callback",
    "disconnected-callback",
    "attribute-changed-callback",
    "adopted-callback",
    "observed-attributes",
    "shadow-root",
];

/// The four lifecycle declarations. They are attached to the synthesized
/// type as hooks rather than becoming instance members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Lifecycle {
    Connected,
    Disconnected,
    Adopted,
    Attribute,
}

impl Lifecycle {
    pub const ALL: [Lifecycle; 4] = [
        Lifecycle::Connected,
        Lifecycle::Disconnected,
        Lifecycle::Adopted,
        Lifecycle::Attribute,
    ];

    /// The declaration name that selects this hook.
    pub fn name(self) -> &'static str {
        match self {
            Lifecycle::Connected => "connected",
            Lifecycle::Disconnected => "disconnected",
            Lifecycle::Adopted => "adopted",
            Lifecycle::Attribute => "attribute",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.name() == name)
    }

    /// Positional parameters the host passes when invoking the hook.
    pub fn default_parameters(self) -> &'static [&'static str] {
        match self {
            Lifecycle::Attribute => &["name", "oldValue", "newValue"],
            _ => &[],
        }
    }
}

/// Ordered method parameter names.
pub type Parameters = SmallVec<[String; 4]>;

/// Property or method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    Property,
    Method,
}

/// What a declaration contributes to the synthesized type.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Member {
    /// A writable field holding a precomputed value.
    Property(Value),
    /// A function body compiled later, with its parameter list.
    Method { parameters: Parameters, body: String },
}

/// One discovered property or method.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeclarationRecord {
    /// Canonical (camel-case) member name.
    pub name: String,
    pub member: Member,
}

impl DeclarationRecord {
    pub fn property(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            member: Member::Property(value),
        }
    }

    pub fn method(
        name: impl Into<String>,
        parameters: impl IntoIterator<Item = String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            member: Member::Method {
                parameters: parameters.into_iter().collect(),
                body: body.into(),
            },
        }
    }

    pub fn kind(&self) -> DeclarationKind {
        match self.member {
            Member::Property(_) => DeclarationKind::Property,
            Member::Method { .. } => DeclarationKind::Method,
        }
    }

    /// Parameter list; `None` marks a property.
    pub fn parameters(&self) -> Option<&[String]> {
        match &self.member {
            Member::Property(_) => None,
            Member::Method { parameters, .. } => Some(parameters),
        }
    }
}

/// Canonical name → declaration for one parsed definition.
pub type DeclarationMap = IndexMap<String, DeclarationRecord>;

/// Derive the camel-case member name from a hyphenated tag name.
///
/// `print-two-numbers` becomes `printTwoNumbers`. Empty segments are dropped.
pub fn canonical_name(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    for segment in tag.split('-').filter(|s| !s.is_empty()) {
        let segment = segment.to_ascii_lowercase();
        if out.is_empty() {
            out.push_str(&segment);
        } else {
            out.push_str(&capitalize(&segment));
        }
    }
    out
}

/// Derive the PascalCase class name from a tag name (`my-widget` → `MyWidget`).
pub fn class_name(tag: &str) -> String {
    tag.split('-')
        .filter(|s| !s.is_empty())
        .map(|s| capitalize(&s.to_ascii_lowercase()))
        .collect()
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether a name collides with a reserved name, ignoring hyphens and ASCII case.
pub fn is_reserved_name(name: &str) -> bool {
    let folded = fold_name(name);
    RESERVED_NAMES
        .iter()
        .any(|reserved| fold_name(reserved) == folded)
}

fn fold_name(name: &str) -> String {
    name.chars()
        .filter(|&c| c != '-')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name("print-two-numbers"), "printTwoNumbers");
        assert_eq!(canonical_name("count"), "count");
        assert_eq!(canonical_name("ON-CLICK"), "onClick");
        assert_eq!(canonical_name("a--b"), "aB");
    }

    #[test]
    fn test_class_name() {
        assert_eq!(class_name("my-widget"), "MyWidget");
        assert_eq!(class_name("MY-CUSTOM-ELEMENT"), "MyCustomElement");
    }

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved_name("constructor"));
        assert!(is_reserved_name(&canonical_name("connected-callback")));
        assert!(is_reserved_name(&canonical_name("shadow-root")));
        assert!(!is_reserved_name("connected"));
        assert!(!is_reserved_name("count"));
    }

    #[test]
    fn test_reserved_names_ignore_hyphens_and_case() {
        assert!(is_reserved_name("connectedcallback"));
        assert!(is_reserved_name("shadowroot"));
        assert!(is_reserved_name("observedAttributes"));
        assert!(is_reserved_name("Constructor"));
        assert!(is_reserved_name("attribute-changed-callback"));
        assert!(!is_reserved_name("shadow"));
    }

    #[test]
    fn test_lifecycle_lookup() {
        assert_eq!(Lifecycle::from_name("attribute"), Some(Lifecycle::Attribute));
        assert_eq!(Lifecycle::from_name("connectedCallback"), None);
        assert_eq!(
            Lifecycle::Attribute.default_parameters(),
            &["name", "oldValue", "newValue"]
        );
    }

    #[test]
    fn test_record_kind() {
        let prop = DeclarationRecord::property("count", Value::Number(0.0));
        assert_eq!(prop.kind(), DeclarationKind::Property);
        assert!(prop.parameters().is_none());

        let method = DeclarationRecord::method("reset", Vec::new(), "this.count = 0");
        assert_eq!(method.kind(), DeclarationKind::Method);
        assert_eq!(method.parameters(), Some(&[][..]));
    }

    fn split_camel(name: &str) -> String {
        let mut out = String::new();
        for c in name.chars() {
            if c.is_ascii_uppercase() {
                out.push('-');
                out.push(c.to_ascii_lowercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    proptest! {
        #[test]
        fn canonical_name_round_trips(tag in "[a-z]{1,6}(-[a-z]{1,6}){0,4}") {
            let canonical = canonical_name(&tag);
            prop_assert!(!canonical.contains('-'));
            prop_assert_eq!(split_camel(&canonical), tag);
        }
    }
}
