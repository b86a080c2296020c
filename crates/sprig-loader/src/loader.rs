//! The definition pipeline.
//!
//! Every discovered `<component>` moves through
//! `Discovered -> Loading -> Parsed -> Registered`, or ends in `Failed`.
//! Inline definitions are processed as they are discovered. External ones are
//! queued on the loader as in-flight fetches and processed in completion
//! order, so a slow or hung fetch only delays its own definition. Discovery
//! never waits on a fetch; [`Loader::complete_next`] and
//! [`Loader::finish_pending`] drive the queue.

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use indexmap::IndexMap;
use sprig_core::{Element, LoadError, Node, ScriptEngine};
use sprig_parser::{parse_definition, parse_fragment};
use sprig_script::MiniScript;
use sprig_synth::{synthesize, SynthesizedType};
use tracing::{debug, info};

use crate::config::LoaderConfig;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::fetch::Fetcher;
use crate::observer::MutationRecord;
use crate::registry::Registry;
use crate::source::{resolve_definition_root, resolve_source, source_attribute, DefinitionSource};

/// Where a definition is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Discovered,
    Loading,
    Parsed,
    Registered,
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Discovered => "discovered",
            LoadState::Loading => "loading",
            LoadState::Parsed => "parsed",
            LoadState::Registered => "registered",
            LoadState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of one batch of definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Tags registered, in registration order.
    pub registered: Vec<String>,
    /// Source keys that failed.
    pub failed: Vec<String>,
}

impl BatchSummary {
    pub fn is_empty(&self) -> bool {
        self.registered.is_empty() && self.failed.is_empty()
    }

    /// Add the outcomes of `other` after this summary's.
    pub fn append(&mut self, other: BatchSummary) {
        self.registered.extend(other.registered);
        self.failed.extend(other.failed);
    }
}

type PendingFetch = BoxFuture<'static, (String, Result<String, LoadError>)>;

/// Discovers, loads and registers component definitions for one document.
pub struct Loader {
    config: LoaderConfig,
    registry: Registry,
    fetcher: Arc<dyn Fetcher>,
    engine: Arc<dyn ScriptEngine>,
    sink: Arc<dyn DiagnosticSink>,
    states: IndexMap<String, LoadState>,
    inline_count: usize,
    pending: FuturesUnordered<PendingFetch>,
}

impl fmt::Debug for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Loader")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("states", &self.states)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl Loader {
    /// Create a loader with the built-in script engine and tracing diagnostics.
    pub fn new(config: LoaderConfig, fetcher: impl Fetcher + 'static) -> Self {
        Self {
            config,
            registry: Registry::new(),
            fetcher: Arc::new(fetcher),
            engine: Arc::new(MiniScript::new()),
            sink: Arc::new(TracingSink),
            states: IndexMap::new(),
            inline_count: 0,
            pending: FuturesUnordered::new(),
        }
    }

    pub fn with_engine(mut self, engine: impl ScriptEngine + 'static) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    pub fn with_sink(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Current state of the definition with the given source key.
    pub fn state(&self, source_key: &str) -> Option<LoadState> {
        self.states.get(source_key).copied()
    }

    pub fn states(&self) -> impl Iterator<Item = (&str, LoadState)> {
        self.states.iter().map(|(key, state)| (key.as_str(), *state))
    }

    /// Whether any external fetch is still in flight.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear the registry and all pipeline state. In-flight fetches are dropped.
    pub fn reset(&mut self) {
        self.registry.reset();
        self.states.clear();
        self.inline_count = 0;
        self.pending = FuturesUnordered::new();
    }

    /// Load every definition found under a container element in `nodes`.
    pub async fn scan_document(&mut self, nodes: &[Node]) -> BatchSummary {
        let mut components = Vec::new();
        collect_definitions(nodes, &self.config, &mut components);
        debug!(count = components.len(), "scanned document for definitions");
        self.load_batch(components).await
    }

    /// Parse `markup` and load the definitions it contains.
    pub async fn scan_markup(&mut self, markup: &str) -> BatchSummary {
        self.scan_document(&parse_fragment(markup)).await
    }

    /// Handle one mutation without waiting on the network.
    ///
    /// Returns `None` when the target is not a container. Otherwise the summary
    /// covers inline definitions and sources that failed to resolve; external
    /// definitions are queued and reported by [`complete_next`](Self::complete_next).
    pub fn handle_mutation(&mut self, record: MutationRecord) -> Option<BatchSummary> {
        if !record.target.eq_ignore_ascii_case(&self.config.container_tag) {
            return None;
        }
        let components: Vec<Element> = record
            .added_nodes
            .into_iter()
            .filter_map(|node| match node {
                Node::Element(el) if el.tag.eq_ignore_ascii_case(&self.config.definition_tag) => {
                    Some(el)
                }
                _ => None,
            })
            .collect();
        Some(self.discover(components))
    }

    /// Load a batch of `<component>` elements and wait for all of their
    /// fetches, along with any still pending from earlier batches.
    pub async fn load_batch(
        &mut self,
        components: impl IntoIterator<Item = Element>,
    ) -> BatchSummary {
        let mut summary = self.discover(components);
        summary.append(self.finish_pending().await);
        summary
    }

    /// Start loading a batch of `<component>` elements. Each gets exactly one
    /// attempt.
    ///
    /// Inline definitions are registered before this returns. External ones
    /// move to `Loading` and join the in-flight fetches.
    pub fn discover(&mut self, components: impl IntoIterator<Item = Element>) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for component in components {
            match resolve_source(&component, self.config.base_url.as_ref()) {
                Ok(DefinitionSource::Inline) => {
                    let key = format!("inline#{}", self.inline_count);
                    self.inline_count += 1;
                    self.transition(&key, LoadState::Discovered);
                    self.transition(&key, LoadState::Loading);
                    let result = resolve_definition_root(&component.children)
                        .and_then(|root| self.define(&key, root));
                    self.finish(key, result, &mut summary);
                }
                Ok(DefinitionSource::External(url)) => {
                    let key = self.unique_key(url.to_string());
                    self.transition(&key, LoadState::Discovered);
                    self.transition(&key, LoadState::Loading);
                    let fetcher = Arc::clone(&self.fetcher);
                    self.pending.push(
                        async move {
                            let result = fetcher.fetch(&url).await;
                            (key, result)
                        }
                        .boxed(),
                    );
                }
                Err(err) => {
                    let key = match &err {
                        LoadError::CrossOriginBlocked { url } => url.clone(),
                        _ => source_attribute(&component).unwrap_or_default().to_string(),
                    };
                    let key = self.unique_key(key);
                    self.transition(&key, LoadState::Discovered);
                    self.finish(key, Err(err), &mut summary);
                }
            }
        }
        summary
    }

    /// Wait for the next in-flight fetch and load its definition.
    ///
    /// Returns `None` at once when nothing is pending. Cancel-safe: dropping
    /// the future before it resolves leaves every fetch queued.
    pub async fn complete_next(&mut self) -> Option<BatchSummary> {
        let (key, fetched) = self.pending.next().await?;
        let result = fetched.and_then(|text| {
            let root = resolve_definition_root(&parse_fragment(&text))?;
            self.define(&key, root)
        });
        let mut summary = BatchSummary::default();
        self.finish(key, result, &mut summary);
        Some(summary)
    }

    /// Load every definition whose fetch has already resolved, without waiting.
    pub fn complete_ready(&mut self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        while let Some(Some(done)) = self.complete_next().now_or_never() {
            summary.append(done);
        }
        summary
    }

    /// Wait for every in-flight fetch. Does not return while one is hung.
    pub async fn finish_pending(&mut self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        while let Some(done) = self.complete_next().await {
            summary.append(done);
        }
        summary
    }

    /// Source keys name one discovery each; a repeated source gets a ` [n]` suffix.
    fn unique_key(&self, key: String) -> String {
        if !self.states.contains_key(&key) {
            return key;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{key} [{n}]");
            if !self.states.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    fn define(&mut self, key: &str, root: Element) -> Result<Arc<SynthesizedType>, LoadError> {
        let definition = root.clone();
        let parsed = parse_definition(root, &self.registry, self.engine.as_ref())?;
        self.transition(key, LoadState::Parsed);
        let ty = synthesize(parsed, self.engine.as_ref())?;
        let ty = self.registry.define(ty)?;
        self.registry.record_import(ty.tag_name(), definition);
        Ok(ty)
    }

    fn finish(
        &mut self,
        key: String,
        result: Result<Arc<SynthesizedType>, LoadError>,
        summary: &mut BatchSummary,
    ) {
        match result {
            Ok(ty) => {
                self.transition(&key, LoadState::Registered);
                summary.registered.push(ty.tag_name().to_string());
            }
            Err(err) => {
                self.transition(&key, LoadState::Failed);
                self.sink.report(&key, &err);
                self.registry.record_failure(key.clone(), err);
                summary.failed.push(key);
            }
        }
    }

    fn transition(&mut self, key: &str, state: LoadState) {
        match state {
            LoadState::Loading | LoadState::Registered => {
                info!(source = %key, state = %state, "definition state changed");
            }
            _ => debug!(source = %key, state = %state, "definition state changed"),
        }
        self.states.insert(key.to_string(), state);
    }
}

fn collect_definitions(nodes: &[Node], config: &LoaderConfig, out: &mut Vec<Element>) {
    for el in nodes.iter().filter_map(Node::as_element) {
        if el.tag.eq_ignore_ascii_case(&config.container_tag) {
            out.extend(
                el.child_elements()
                    .filter(|child| child.tag.eq_ignore_ascii_case(&config.definition_tag))
                    .cloned(),
            );
        } else {
            collect_definitions(&el.children, config, out);
        }
    }
}
