//! Element type synthesis.
//!
//! Turns a parsed definition into a [`SynthesizedType`]:
//! 1. Pops the four lifecycle declarations and compiles their bodies
//! 2. Keeps remaining properties as field initializers
//! 3. Compiles remaining methods once per type

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use sprig_core::{
    class_name, CompiledFunction, Element, Lifecycle, Member, ScriptEngine, SynthesisError, Value,
};
use sprig_parser::ParsedDefinition;
use tracing::{debug, info};

/// One instance member of a synthesized type.
#[derive(Clone)]
pub enum TypeMember {
    /// Writable field with its initial value.
    Field(Value),
    /// Compiled method, bound to each instance when called.
    Method(Arc<dyn CompiledFunction>),
}

impl fmt::Debug for TypeMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeMember::Field(value) => f.debug_tuple("Field").field(value).finish(),
            TypeMember::Method(func) => f
                .debug_tuple("Method")
                .field(&func.parameters())
                .finish(),
        }
    }
}

/// A lifecycle hook attached to the type rather than to instances.
#[derive(Debug, Clone, Default)]
pub struct LifecycleHook {
    /// Raw source of the hook body; empty when the definition declares none.
    pub body: String,
    /// Compiled body, absent for empty bodies.
    pub function: Option<Arc<dyn CompiledFunction>>,
}

/// A registered element type.
#[derive(Debug)]
pub struct SynthesizedType {
    tag_name: String,
    class_name: String,
    template: Element,
    members: IndexMap<String, TypeMember>,
    hooks: HashMap<Lifecycle, LifecycleHook>,
}

impl SynthesizedType {
    /// Lowercase tag name the type is registered under.
    pub fn tag_name(&self) -> &str {
        &self.tag_name
    }

    /// PascalCase class name derived from the tag.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The cleaned definition. Its children become each instance's shadow content.
    pub fn template(&self) -> &Element {
        &self.template
    }

    pub fn members(&self) -> &IndexMap<String, TypeMember> {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&TypeMember> {
        self.members.get(name)
    }

    /// The hook for `lifecycle`. Every type has all four, possibly empty.
    pub fn hook(&self, lifecycle: Lifecycle) -> Option<&LifecycleHook> {
        self.hooks.get(&lifecycle)
    }

    /// Raw body of a lifecycle hook; empty when none was declared.
    pub fn hook_body(&self, lifecycle: Lifecycle) -> &str {
        self.hook(lifecycle).map_or("", |h| h.body.as_str())
    }

    pub(crate) fn hook_function(&self, lifecycle: Lifecycle) -> Option<Arc<dyn CompiledFunction>> {
        self.hook(lifecycle).and_then(|h| h.function.clone())
    }
}

/// Synthesize an element type from a parsed definition.
pub fn synthesize(
    parsed: ParsedDefinition,
    engine: &dyn ScriptEngine,
) -> Result<SynthesizedType, SynthesisError> {
    let ParsedDefinition {
        element,
        mut declarations,
    } = parsed;
    let tag_name = element.tag.to_ascii_lowercase();

    let mut hooks = HashMap::new();
    for lifecycle in Lifecycle::ALL {
        let hook = match declarations.shift_remove(lifecycle.name()) {
            Some(record) => compile_hook(lifecycle, record.member, engine)?,
            None => LifecycleHook::default(),
        };
        hooks.insert(lifecycle, hook);
    }

    let mut members = IndexMap::with_capacity(declarations.len());
    for (name, record) in declarations {
        let member = match record.member {
            Member::Property(value) => TypeMember::Field(value),
            Member::Method { parameters, body } => {
                let function = engine.compile(&parameters, &body).map_err(|source| {
                    SynthesisError::MethodCompilation {
                        name: name.clone(),
                        source,
                    }
                })?;
                TypeMember::Method(function)
            }
        };
        debug!(tag = %tag_name, member = %name, "member synthesized");
        members.insert(name, member);
    }

    let ty = SynthesizedType {
        class_name: class_name(&tag_name),
        tag_name,
        template: element,
        members,
        hooks,
    };
    info!(
        tag = %ty.tag_name,
        class = %ty.class_name,
        members = ty.members.len(),
        "synthesized element type"
    );
    Ok(ty)
}

fn compile_hook(
    lifecycle: Lifecycle,
    member: Member,
    engine: &dyn ScriptEngine,
) -> Result<LifecycleHook, SynthesisError> {
    let (parameters, body) = match member {
        Member::Method { parameters, body } => (parameters.into_vec(), body),
        // Hand-built records may carry a value; its text is the body.
        Member::Property(value) => (
            lifecycle
                .default_parameters()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            value.to_string(),
        ),
    };

    if body.trim().is_empty() {
        return Ok(LifecycleHook::default());
    }

    let function = engine.compile(&parameters, &body).map_err(|source| {
        SynthesisError::LifecycleCompilation {
            hook: lifecycle.name().to_string(),
            source,
        }
    })?;
    Ok(LifecycleHook {
        body,
        function: Some(function),
    })
}
