//! High-level builder wiring store, parser, statistics and analysis together

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::ingest::{IngestionService, DEFAULT_MAX_UPLOAD_BYTES};
use crate::llm::{ClientFactory, OpenAIConfig, ProviderConfig};
use crate::{
    AnalysisConfig, AnalysisCoordinator, ChatClient, ContextConfig, DefaultContextStrategy, LogParser,
    MemoryRoomStore, ParserConfig, RoomStore, SnapshotCache, StatisticsEngine, StatisticsSnapshot,
    StatsConfig, StoreError,
};

/// Builder for a [`Chatlens`] instance
///
/// # Example
///
/// ```rust,no_run
/// use chatlens::prelude::*;
///
/// # #[tokio::main]
/// # async fn main() -> Result<()> {
/// let chatlens = ChatlensBuilder::new()
///     .openai_key("sk-...")
///     .model("gpt-4o-mini")
///     .build()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct ChatlensBuilder {
    // Store
    store: Option<Arc<dyn RoomStore>>,
    #[cfg(feature = "mongodb")]
    mongodb: Option<(String, String)>,

    // LLM
    openai_key: Option<String>,
    base_url: Option<String>,
    provider: Option<ProviderConfig>,
    chat_client: Option<Arc<dyn ChatClient>>,

    parser_config: ParserConfig,
    stats_config: StatsConfig,
    context_config: ContextConfig,
    analysis_config: AnalysisConfig,
    max_upload_bytes: usize,
}

impl Default for ChatlensBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatlensBuilder {
    pub fn new() -> Self {
        Self {
            store: None,
            #[cfg(feature = "mongodb")]
            mongodb: None,
            openai_key: None,
            base_url: None,
            provider: None,
            chat_client: None,
            parser_config: ParserConfig::default(),
            stats_config: StatsConfig::default(),
            context_config: ContextConfig::default(),
            analysis_config: AnalysisConfig::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Use MongoDB instead of the in-memory store
    #[cfg(feature = "mongodb")]
    pub fn mongodb(mut self, uri: impl Into<String>, database: impl Into<String>) -> Self {
        self.mongodb = Some((uri.into(), database.into()));
        self
    }

    /// Use an already constructed store
    pub fn store(mut self, store: Arc<dyn RoomStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// OpenAI API key (required unless a chat client is supplied)
    pub fn openai_key(mut self, key: impl Into<String>) -> Self {
        self.openai_key = Some(key.into());
        self
    }

    /// Override the OpenAI API base URL
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Provider settings, taking precedence over `openai_key` and `base_url`
    pub fn provider(mut self, config: ProviderConfig) -> Self {
        self.provider = Some(config);
        self
    }

    /// Use a custom provider client
    pub fn chat_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.chat_client = Some(client);
        self
    }

    /// Set LLM model (default: gpt-4o-mini)
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.analysis_config.model = model.into();
        self
    }

    /// Set temperature (default: 0.7)
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.analysis_config.temperature = temperature;
        self
    }

    /// Provider call timeout (default: 60s)
    pub fn analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_config.timeout = timeout;
        self
    }

    pub fn analysis_config(mut self, config: AnalysisConfig) -> Self {
        self.analysis_config = config;
        self
    }

    pub fn parser_config(mut self, config: ParserConfig) -> Self {
        self.parser_config = config;
        self
    }

    pub fn stats_config(mut self, config: StatsConfig) -> Self {
        self.stats_config = config;
        self
    }

    pub fn context_config(mut self, config: ContextConfig) -> Self {
        self.context_config = config;
        self
    }

    /// Largest accepted upload in bytes (default: 50 MiB)
    pub fn max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    /// Build the instance
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - no OpenAI key, provider config or chat client is set
    /// - the MongoDB connection fails
    /// - the tokenizer cannot be loaded
    pub async fn build(self) -> Result<Chatlens> {
        let client: Arc<dyn ChatClient> = match self.chat_client {
            Some(client) => client,
            None => {
                let provider = match self.provider {
                    Some(provider) => provider,
                    None => {
                        let key = self
                            .openai_key
                            .context("OpenAI API key is required. Call .openai_key(key)")?;
                        let timeout_secs = self.analysis_config.timeout.as_secs().max(1);
                        let mut openai = OpenAIConfig::new(key).with_timeout_secs(timeout_secs);
                        if let Some(base_url) = self.base_url {
                            openai = openai.with_base_url(base_url);
                        }
                        ProviderConfig::OpenAI(openai)
                    }
                };
                ClientFactory::create_chat_client(provider).context("Failed to create chat client")?
            }
        };

        let store: Arc<dyn RoomStore> = match self.store {
            Some(store) => store,
            #[cfg(feature = "mongodb")]
            None if self.mongodb.is_some() => {
                let (uri, database) = self.mongodb.unwrap_or_default();
                Arc::new(
                    crate::persist::MongoRoomStore::connect(&uri, &database)
                        .await
                        .context("Failed to connect to MongoDB")?,
                )
            }
            None => Arc::new(MemoryRoomStore::new()),
        };

        let engine = Arc::new(StatisticsEngine::new(self.stats_config));
        let cache = Arc::new(SnapshotCache::new());
        let context = DefaultContextStrategy::new(self.context_config).context("Failed to load tokenizer")?;

        let ingestion = IngestionService::new(LogParser::new(self.parser_config), Arc::clone(&store), Arc::clone(&cache))
            .with_max_upload_bytes(self.max_upload_bytes);
        let coordinator = AnalysisCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&client),
            Arc::new(context),
            Arc::clone(&engine),
            Arc::clone(&cache),
            self.analysis_config,
        );

        tracing::info!(backend = store.backend(), "Chatlens ready");

        Ok(Chatlens {
            store,
            client,
            ingestion,
            coordinator: Arc::new(coordinator),
            engine,
            cache,
        })
    }
}

/// A wired chat analysis pipeline.
#[derive(Clone)]
pub struct Chatlens {
    store: Arc<dyn RoomStore>,
    client: Arc<dyn ChatClient>,
    ingestion: IngestionService,
    coordinator: Arc<AnalysisCoordinator>,
    engine: Arc<StatisticsEngine>,
    cache: Arc<SnapshotCache>,
}

impl Chatlens {
    pub fn builder() -> ChatlensBuilder {
        ChatlensBuilder::new()
    }

    pub fn store(&self) -> &Arc<dyn RoomStore> {
        &self.store
    }

    pub fn client(&self) -> &Arc<dyn ChatClient> {
        &self.client
    }

    pub fn ingestion(&self) -> &IngestionService {
        &self.ingestion
    }

    pub fn coordinator(&self) -> &Arc<AnalysisCoordinator> {
        &self.coordinator
    }

    pub fn engine(&self) -> &StatisticsEngine {
        &self.engine
    }

    /// Statistics for the room's current contents, served from the cache
    /// while the room watermark is unchanged.
    pub async fn snapshot(&self, room_id: &str) -> std::result::Result<Arc<StatisticsSnapshot>, StoreError> {
        let room = self.store.get(room_id).await?;
        Ok(self.cache.get_or_compute(&self.engine, &room).await)
    }

    /// Delete a room, stop its running analyses and drop its cached snapshot.
    pub async fn delete_room(&self, room_id: &str) -> std::result::Result<(), StoreError> {
        let mut stopped = self.coordinator.cancel_room(room_id).await;
        self.store.delete(room_id).await?;
        // Catches submits that read the room before the delete.
        stopped += self.coordinator.cancel_room(room_id).await;
        self.cache.invalidate(room_id).await;
        if stopped > 0 {
            tracing::info!(room_id = %room_id, stopped, "Cancelled analyses of deleted room");
        }
        Ok(())
    }
}
