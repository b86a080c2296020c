//! Error types for the sprig component loader.

use thiserror::Error;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum SprigError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Errors raised while parsing a component definition.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed argument list on <{marker}>: {reason}")]
    MalformedArgumentList {
        marker: String,
        #[source]
        reason: ArgumentListError,
    },

    #[error("Declaration '{name}' collides with a reserved name")]
    ReservedNameCollision { name: String },

    #[error("Declaration '{name}' cannot be classified from {markers} marker(s)")]
    AmbiguousDeclarationShape { name: String, markers: usize },

    #[error("Failed to evaluate property '{name}'")]
    PropertyEvaluation {
        name: String,
        #[source]
        source: ScriptError,
    },

    #[error("Declaration block opened as '{opening}' but closed as '{closing}'")]
    MismatchedDeclarationBlock { opening: String, closing: String },
}

/// Errors in the `(a, b, c)` argument-list grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentListError {
    #[error("nested opening parenthesis")]
    NestedOpening,

    #[error("empty argument")]
    EmptyArgument,

    #[error("unbalanced parentheses")]
    Unbalanced,

    #[error("missing opening parenthesis")]
    MissingOpening,

    #[error("unexpected input after closing parenthesis")]
    TrailingInput,

    #[error("invalid parameter name '{0}'")]
    InvalidIdentifier(String),
}

/// Errors raised by a script engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("Syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("{name} is not defined")]
    UndefinedVariable { name: String },

    #[error("{callee} is not a function")]
    NotCallable { callee: String },

    #[error("Cannot read '{member}' of {target}")]
    InvalidMember { member: String, target: String },

    #[error("'this' is not available in this context")]
    MissingReceiver,

    #[error("Invalid assignment target")]
    InvalidAssignment,

    #[error("Assignment to constant '{name}'")]
    ConstAssignment { name: String },

    #[error("Unsupported construct: {construct}")]
    Unsupported { construct: String },

    #[error("Maximum call depth ({limit}) exceeded")]
    CallDepthExceeded { limit: usize },
}

/// Errors raised while synthesizing an element type.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Failed to compile method '{name}'")]
    MethodCompilation {
        name: String,
        #[source]
        source: ScriptError,
    },

    #[error("Failed to compile {hook} lifecycle hook")]
    LifecycleCompilation {
        hook: String,
        #[source]
        source: ScriptError,
    },
}

/// Errors raised by the element registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Element <{tag}> is already defined")]
    AlreadyDefined { tag: String },

    #[error("Element <{tag}> is not defined")]
    NotDefined { tag: String },
}

/// Errors raised while loading a definition.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Cross-origin load of {url} blocked")]
    CrossOriginBlocked { url: String },

    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Invalid source URL '{src}': {reason}")]
    InvalidSourceUrl { src: String, reason: String },

    #[error("Invalid definition: {reason}")]
    InvalidDefinitionShape { reason: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Result type alias using SprigError.
pub type Result<T> = std::result::Result<T, SprigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_error_is_source() {
        let err = ParseError::MalformedArgumentList {
            marker: "on-click".into(),
            reason: ArgumentListError::EmptyArgument,
        };
        assert_eq!(
            err.to_string(),
            "Malformed argument list on <on-click>: empty argument"
        );
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("empty argument"));
    }

    #[test]
    fn test_load_error_wraps_stage_errors() {
        let err: LoadError = RegistryError::AlreadyDefined {
            tag: "my-widget".into(),
        }
        .into();
        assert_eq!(err.to_string(), "Element <my-widget> is already defined");

        let top: SprigError = err.into();
        assert!(matches!(top, SprigError::Load(LoadError::Registry(_))));
    }
}
