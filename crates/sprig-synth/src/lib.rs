//! Element synthesis for sprig.
//!
//! A [`ParsedDefinition`](sprig_parser::ParsedDefinition) becomes a
//! [`SynthesizedType`] with compiled methods and lifecycle hooks. Each
//! [`ElementInstance`] created from it carries its own fields, attributes and
//! an open shadow root holding a copy of the template.

pub mod instance;
pub mod synthesizer;

pub use instance::{ElementInstance, ShadowRoot, ShadowRootMode};
pub use synthesizer::{synthesize, LifecycleHook, SynthesizedType, TypeMember};
