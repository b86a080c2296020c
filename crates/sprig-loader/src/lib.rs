//! Component loading for sprig.
//!
//! Finds `<component>` definitions inside `<imports>` containers, resolves
//! their markup (inline or fetched), parses the declaration syntax,
//! synthesizes an element type and registers it.
//!
//! ```no_run
//! # async fn run() {
//! use sprig_loader::{Loader, LoaderConfig, StaticFetcher};
//!
//! let mut loader = Loader::new(LoaderConfig::new(), StaticFetcher::new());
//! loader
//!     .scan_markup("<imports><component><my-widget><count>0</count></my-widget></component></imports>")
//!     .await;
//! let mut widget = loader.registry().create_element("my-widget").unwrap();
//! widget.connect().unwrap();
//! # }
//! ```

pub mod config;
pub mod diagnostics;
pub mod fetch;
pub mod loader;
pub mod observer;
pub mod registry;
pub mod source;
pub mod tracing_config;

pub use config::LoaderConfig;
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, TracingSink};
#[cfg(feature = "http")]
pub use fetch::ReqwestFetcher;
pub use fetch::{Fetcher, StaticFetcher};
pub use loader::{BatchSummary, LoadState, Loader};
pub use observer::{observe, MutationRecord, Observer, ObserverHandle};
pub use registry::Registry;
pub use source::{resolve_definition_root, resolve_source, DefinitionSource};
pub use tracing_config::init_tracing;
