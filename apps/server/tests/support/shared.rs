use polydesk::Config;
use std::sync::Arc;
use tokio::sync::OnceCell;

static SHARED: OnceCell<Arc<SharedTestResources>> = OnceCell::const_new();

pub struct SharedTestResources {
    pub base_config: Config,
}

impl SharedTestResources {
    /// Postgres URL for integration tests, if one is configured.
    pub fn database_url(&self) -> Option<&str> {
        self.base_config.database.test_database_url.as_deref()
    }
}

pub async fn shared() -> anyhow::Result<Arc<SharedTestResources>> {
    SHARED
        .get_or_try_init(|| async {
            polydesk::logging::init_simple_logging();

            let mut config = Config::load()?;
            if let Some(url) = &config.database.test_database_url {
                config.database.url = url.clone();
            }
            config.database.run_migrations = true;

            Ok(Arc::new(SharedTestResources {
                base_config: config,
            }))
        })
        .await
        .cloned()
}
