use crate::config::StaticConfig;
use crate::services::{
    BookingService, CatalogService, CheckoutService, PaymentGateway, ProfileService,
    ScheduleImporter, StatsService, StripeGateway, WebhookService,
};
use crate::storage::{SeaOrmStorage, StorageFactory};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 服务器和 CLI 共享的依赖
#[derive(Clone)]
pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub bookings: Arc<BookingService>,
    pub catalog: Arc<CatalogService>,
    pub profiles: Arc<ProfileService>,
    pub stats: Arc<StatsService>,
    pub checkout: Arc<CheckoutService>,
    pub webhooks: Arc<WebhookService>,
    pub importer: Arc<ScheduleImporter>,
}

impl StartupContext {
    /// 基于已有存储组装全部服务
    pub fn from_storage(
        storage: Arc<SeaOrmStorage>,
        config: &StaticConfig,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self> {
        let bookings = BookingService::from_config(storage.clone(), &config.booking)
            .context("Invalid booking configuration")?;
        let rules = bookings.rules();

        Ok(Self {
            catalog: Arc::new(CatalogService::new(storage.clone(), rules, &config.booking)),
            profiles: Arc::new(ProfileService::new(storage.clone())),
            stats: Arc::new(StatsService::new(storage.clone(), rules)),
            checkout: Arc::new(CheckoutService::new(
                storage.clone(),
                gateway,
                &config.stripe,
            )),
            webhooks: Arc::new(WebhookService::new(storage.clone(), &config.stripe)),
            importer: Arc::new(ScheduleImporter::new(storage.clone(), &config.import)),
            bookings: Arc::new(bookings),
            storage,
        })
    }
}

/// 准备启动上下文：连接数据库、执行迁移、组装服务
pub async fn prepare_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let config = crate::config::get_config();

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!(
        "Using storage backend: {}",
        storage.get_backend_config().storage_type
    );

    if config.stripe.secret_key.is_empty() {
        warn!("Stripe secret key not configured, checkout will be unavailable");
    }
    if config.stripe.webhook_secret.is_empty() {
        warn!("Stripe webhook secret not configured, webhooks will be rejected");
    }
    if config.auth.admin_token.is_empty() {
        info!("Admin API is disabled (auth.admin_token is empty)");
    }

    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(&config.stripe));
    let context = StartupContext::from_storage(storage, &config, gateway)?;

    debug!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );
    Ok(context)
}
