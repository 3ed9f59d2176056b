//! Composition root: the store and capability handles every command shares.

use std::sync::Arc;

use crate::config::Config;
use crate::embedding::{create_embedder, TextEmbedder};
use crate::error::Result;
use crate::generation::{create_generator, TextGenerator};
use crate::rank::RankParams;
use crate::store::{SqliteStore, Store};
use crate::validate::Validator;

#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub embedder: Arc<dyn TextEmbedder>,
    pub generator: Arc<dyn TextGenerator>,
}

impl AppContext {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        embedder: Arc<dyn TextEmbedder>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            config,
            store,
            embedder,
            generator,
        }
    }

    /// Open the configured SQLite database and build providers from config.
    pub async fn from_config(config: Config) -> Result<Self> {
        let store = SqliteStore::open(&config.db.path).await?;
        let embedder = create_embedder(&config.embedding)?;
        let generator = create_generator(&config.generation)?;
        Ok(Self::new(config, Arc::new(store), embedder, generator))
    }

    pub fn rank_params(&self) -> RankParams {
        RankParams::from_config(&self.config.retrieval)
    }

    pub fn validator(&self) -> Validator {
        Validator::new(
            self.embedder.clone(),
            self.generator.clone(),
            self.config.validation.clone(),
        )
    }
}
