//! Live instances of a synthesized element type.

use std::sync::Arc;

use indexmap::IndexMap;
use sprig_core::{CompiledFunction, Element, Lifecycle, Node, ScriptError, ScriptReceiver, Value};
use tracing::{debug, trace};

use crate::synthesizer::{SynthesizedType, TypeMember};

/// Shadow root attachment mode. Instances always attach an open root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowRootMode {
    Open,
    Closed,
}

/// Shadow content of an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowRoot {
    pub mode: ShadowRootMode,
    pub children: Vec<Node>,
}

impl ShadowRoot {
    pub fn inner_html(&self) -> String {
        self.children.iter().map(Node::to_html).collect()
    }

    /// First element in tree order with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        fn walk<'a>(nodes: &'a [Node], tag: &str) -> Option<&'a Element> {
            nodes.iter().filter_map(Node::as_element).find_map(|el| {
                if el.tag.eq_ignore_ascii_case(tag) {
                    Some(el)
                } else {
                    walk(&el.children, tag)
                }
            })
        }
        walk(&self.children, tag)
    }
}

/// One element created from a [`SynthesizedType`].
///
/// The instance is the `this` receiver for every method and hook call.
#[derive(Debug)]
pub struct ElementInstance {
    ty: Arc<SynthesizedType>,
    fields: IndexMap<String, Value>,
    attributes: IndexMap<String, String>,
    shadow_root: ShadowRoot,
    children: Vec<Node>,
    hidden: bool,
    connected: bool,
}

impl ElementInstance {
    /// Create an instance: initialise fields and attach the shadow copy of the template.
    pub fn new(ty: Arc<SynthesizedType>) -> Self {
        let mut fields = IndexMap::new();
        fields.insert("name".to_string(), Value::String(ty.class_name().to_string()));
        for (name, member) in ty.members() {
            if let TypeMember::Field(value) = member {
                fields.insert(name.clone(), value.clone());
            }
        }

        let shadow_root = ShadowRoot {
            mode: ShadowRootMode::Open,
            children: ty.template().children.clone(),
        };

        trace!(tag = %ty.tag_name(), "instance created");
        Self {
            ty,
            fields,
            attributes: IndexMap::new(),
            shadow_root,
            children: Vec::new(),
            hidden: false,
            connected: false,
        }
    }

    pub fn element_type(&self) -> &Arc<SynthesizedType> {
        &self.ty
    }

    pub fn tag_name(&self) -> &str {
        self.ty.tag_name()
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn shadow_root(&self) -> &ShadowRoot {
        &self.shadow_root
    }

    /// Light-DOM children, separate from the shadow content.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    pub fn append_child(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Call a member method with this instance bound as `this`.
    pub fn call(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
        self.call_member(name, args)
    }

    /// Insert into a document: visible, connected, then the `connected` hook.
    pub fn connect(&mut self) -> Result<(), ScriptError> {
        self.connected = true;
        self.hidden = false;
        self.run_hook(Lifecycle::Connected, Vec::new())
    }

    pub fn disconnect(&mut self) -> Result<(), ScriptError> {
        self.connected = false;
        self.run_hook(Lifecycle::Disconnected, Vec::new())
    }

    pub fn adopt(&mut self) -> Result<(), ScriptError> {
        self.run_hook(Lifecycle::Adopted, Vec::new())
    }

    /// Set an attribute and run the `attribute` hook with `(name, old, new)`.
    pub fn set_attribute(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ScriptError> {
        let name = name.into();
        let value = value.into();
        let old = self.attributes.insert(name.clone(), value.clone());
        self.run_hook(
            Lifecycle::Attribute,
            vec![Value::String(name), old.into(), Value::String(value)],
        )
    }

    /// Remove an attribute. The hook runs only when the attribute was present.
    pub fn remove_attribute(&mut self, name: &str) -> Result<(), ScriptError> {
        match self.attributes.shift_remove(name) {
            Some(old) => self.run_hook(
                Lifecycle::Attribute,
                vec![Value::String(name.to_string()), Value::String(old), Value::Null],
            ),
            None => Ok(()),
        }
    }

    fn run_hook(&mut self, lifecycle: Lifecycle, args: Vec<Value>) -> Result<(), ScriptError> {
        let Some(function) = self.ty.hook_function(lifecycle) else {
            return Ok(());
        };
        debug!(tag = %self.ty.tag_name(), hook = lifecycle.name(), "running lifecycle hook");
        function.call(self, args).map(|_| ())
    }

    fn method(&self, name: &str) -> Option<Arc<dyn CompiledFunction>> {
        match self.ty.member(name) {
            Some(TypeMember::Method(function)) => Some(Arc::clone(function)),
            _ => None,
        }
    }
}

impl ScriptReceiver for ElementInstance {
    fn get_member(&self, name: &str) -> Option<Value> {
        match name {
            "hidden" => Some(Value::Bool(self.hidden)),
            "isConnected" => Some(Value::Bool(self.connected)),
            "tagName" => Some(Value::String(self.ty.tag_name().to_ascii_uppercase())),
            _ => self.fields.get(name).cloned(),
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), ScriptError> {
        match name {
            "hidden" => self.hidden = value.truthy(),
            "isConnected" | "tagName" => return Err(ScriptError::InvalidAssignment),
            _ => {
                self.fields.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    fn call_member(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ScriptError> {
        if self.fields.contains_key(name) {
            return Err(ScriptError::NotCallable {
                callee: format!("this.{name}"),
            });
        }
        if let Some(function) = self.method(name) {
            return function.call(self, args);
        }

        let arg = |i: usize| args.get(i).map(Value::to_string).unwrap_or_default();
        match name {
            "getAttribute" => Ok(self.attributes.get(&arg(0)).cloned().into()),
            "hasAttribute" => Ok(Value::Bool(self.attributes.contains_key(&arg(0)))),
            "setAttribute" => {
                let (key, value) = (arg(0), arg(1));
                self.set_attribute(key, value).map(|_| Value::Undefined)
            }
            "removeAttribute" => {
                let key = arg(0);
                self.remove_attribute(&key).map(|_| Value::Undefined)
            }
            _ => Err(ScriptError::NotCallable {
                callee: format!("this.{name}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesize;
    use sprig_core::ScriptEngine;
    use sprig_parser::{parse_definition, parse_first_element, NoCustomElements};
    use sprig_script::{Console, MiniScript};

    fn instance_with(engine: &MiniScript, markup: &str) -> ElementInstance {
        let element = parse_first_element(markup).unwrap();
        let parsed = parse_definition(element, &NoCustomElements, engine).unwrap();
        ElementInstance::new(Arc::new(synthesize(parsed, engine).unwrap()))
    }

    #[test]
    fn test_connected_hook_reveals_instance() {
        let engine = MiniScript::new();
        let mut el = instance_with(
            &engine,
            r#"<my-widget>
                <h1>Counter</h1>
                <count>0</count>
                <connected ()>this.hidden = false</connected>
            </my-widget>"#,
        );
        el.set_hidden(true);
        assert!(!el.is_connected());

        el.connect().unwrap();
        assert!(el.is_connected());
        assert!(!el.is_hidden());
        assert_eq!(el.field("count"), Some(&Value::Number(0.0)));
        assert_eq!(el.get_member("count"), Some(Value::Number(0.0)));
    }

    #[test]
    fn test_name_field_defaults_to_class_name() {
        let engine = MiniScript::new();
        let el = instance_with(&engine, "<fancy-button></fancy-button>");
        assert_eq!(el.field("name"), Some(&Value::String("FancyButton".into())));

        let el = instance_with(&engine, "<fancy-button><name>'custom'</name></fancy-button>");
        assert_eq!(el.field("name"), Some(&Value::String("custom".into())));
    }

    #[test]
    fn test_methods_bind_to_instance() {
        let engine = MiniScript::new();
        let markup = r#"<click-counter>
            <clicks>0</clicks>
            <add-clicks (n)>this.clicks += n; return this.clicks</add-clicks>
            <bump ()>return this.addClicks(1)</bump>
        </click-counter>"#;
        let mut a = instance_with(&engine, markup);
        let mut b = instance_with(&engine, markup);

        assert_eq!(a.call("bump", vec![]).unwrap(), Value::Number(1.0));
        assert_eq!(a.call("addClicks", vec![Value::Number(5.0)]).unwrap(), Value::Number(6.0));
        assert_eq!(b.call("bump", vec![]).unwrap(), Value::Number(1.0));
        assert_eq!(a.field("clicks"), Some(&Value::Number(6.0)));

        match a.call("clicks", vec![]) {
            Err(ScriptError::NotCallable { callee }) => assert_eq!(callee, "this.clicks"),
            other => panic!("Expected NotCallable, got {other:?}"),
        }
    }

    #[test]
    fn test_shadow_content_is_isolated() {
        let engine = MiniScript::new();
        let mut el = instance_with(
            &engine,
            "<user-card><p>template</p><greet ()>return 1</greet></user-card>",
        );
        el.append_child(Element::new("span").with_text("light"));

        assert_eq!(el.shadow_root().mode, ShadowRootMode::Open);
        assert_eq!(el.shadow_root().inner_html(), "<p>template</p>");
        assert!(el.shadow_root().find("span").is_none());
        assert!(el.shadow_root().find("greet").is_none());
        assert_eq!(el.children().len(), 1);
        assert_eq!(el.element_type().template().children.len(), 1);
    }

    #[test]
    fn test_attribute_hook_receives_old_and_new() {
        let engine = MiniScript::with_console(Console::capturing());
        let mut el = instance_with(
            &engine,
            r#"<status-dot>
                <attribute>console.log(name, oldValue, newValue)</attribute>
            </status-dot>"#,
        );
        el.set_attribute("color", "red").unwrap();
        el.set_attribute("color", "blue").unwrap();
        el.remove_attribute("color").unwrap();
        el.remove_attribute("color").unwrap();

        assert_eq!(
            engine.console().lines(),
            vec!["color null red", "color red blue", "color blue null"]
        );
        assert_eq!(el.attribute("color"), None);
    }

    #[test]
    fn test_attribute_builtins_from_script() {
        let engine = MiniScript::new();
        let mut el = instance_with(
            &engine,
            r#"<theme-box>
                <apply (mode)>this.setAttribute('mode', mode); return this.getAttribute('mode')</apply>
            </theme-box>"#,
        );
        let result = el.call("apply", vec![Value::String("dark".into())]).unwrap();
        assert_eq!(result, Value::String("dark".into()));
        assert_eq!(el.attribute("mode"), Some("dark"));
        assert_eq!(
            el.call("missing", vec![]),
            Err(ScriptError::NotCallable {
                callee: "this.missing".into()
            })
        );
    }

    #[test]
    fn test_disconnect_and_adopt_hooks() {
        let engine = MiniScript::new();
        let mut el = instance_with(
            &engine,
            r#"<life-cycle>
                <log>''</log>
                <disconnected ()>this.log += 'd'</disconnected>
                <adopted ()>this.log += 'a'</adopted>
            </life-cycle>"#,
        );
        el.connect().unwrap();
        el.adopt().unwrap();
        el.disconnect().unwrap();
        assert!(!el.is_connected());
        assert_eq!(el.field("log"), Some(&Value::String("ad".into())));
    }

    #[test]
    fn test_read_only_members() {
        let engine = MiniScript::new();
        let mut el = instance_with(&engine, "<x-ro></x-ro>");
        assert_eq!(el.get_member("tagName"), Some(Value::String("X-RO".into())));
        assert_eq!(
            el.set_member("isConnected", Value::Bool(true)),
            Err(ScriptError::InvalidAssignment)
        );
        let func = engine.compile(&[], "this.hidden = 1").unwrap();
        func.call(&mut el, vec![]).unwrap();
        assert!(el.is_hidden());
    }
}
