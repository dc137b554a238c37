//! Index of the stage types available for planning.

use super::policy::ConvertPolicy;
use crate::element::{StageFactory, StageKlass};
use crate::error::{Error, Result};
use crate::format::Caps;
use std::sync::Arc;

/// One usable stage type.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    /// Factory that instantiates the stage.
    pub factory: Arc<StageFactory>,
    /// Caps of the single sink pad template.
    pub sink_caps: Caps,
    /// Caps of the single src pad template.
    pub src_caps: Caps,
    /// Classification bits from the factory's klass string.
    pub klass: StageKlass,
}

impl CatalogEntry {
    /// Factory name.
    pub fn name(&self) -> &str {
        self.factory.name()
    }
}

/// Immutable set of catalog entries and the union of their caps.
#[derive(Debug, Clone)]
pub struct StageCatalog {
    entries: Vec<CatalogEntry>,
    sink_caps: Caps,
    src_caps: Caps,
}

impl StageCatalog {
    /// Index `factories`, skipping those without exactly one sink and one src
    /// pad template.
    pub fn index(factories: impl IntoIterator<Item = Arc<StageFactory>>) -> Self {
        let mut entries = Vec::new();
        let mut sink_caps = Caps::empty();
        let mut src_caps = Caps::empty();

        for factory in factories {
            let Some((sink, src)) = factory.single_templates() else {
                tracing::trace!(factory = %factory.name(), "skipping stage without single sink/src pads");
                continue;
            };
            let entry = CatalogEntry {
                sink_caps: sink.caps.clone(),
                src_caps: src.caps.clone(),
                klass: StageKlass::from_klass(factory.klass()),
                factory: factory.clone(),
            };
            sink_caps.merge(entry.sink_caps.clone());
            src_caps.merge(entry.src_caps.clone());
            entries.push(entry);
        }

        tracing::debug!(entries = entries.len(), "indexed stage catalog");
        Self {
            entries,
            sink_caps,
            src_caps,
        }
    }

    /// Index the catalog a policy supplies.
    pub fn from_policy(policy: &dyn ConvertPolicy) -> Result<Self> {
        policy
            .stage_factories()
            .map(Self::index)
            .ok_or(Error::MissingCatalog)
    }

    /// All entries.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no stage type is usable.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Union of every entry's sink caps.
    pub fn sink_caps(&self) -> &Caps {
        &self.sink_caps
    }

    /// Union of every entry's src caps.
    pub fn src_caps(&self) -> &Caps {
        &self.src_caps
    }
}
