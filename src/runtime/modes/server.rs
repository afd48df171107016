//! Server mode
//!
//! Configures and starts the HTTP server with all routes.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders},
    web,
};
use anyhow::{Context, Result};
use tracing::warn;

use crate::api::constants::{ADMIN_API_PREFIX, JSON_PAYLOAD_LIMIT, USER_API_PREFIX};
use crate::api::middleware::AdminAuth;
use crate::api::services::{
    AppStartTime, admin::admin_v1_routes, error_from_studio, health_routes, user::user_v1_routes,
    webhook_routes,
};
use crate::config::CorsConfig;
use crate::errors::StudioError;
use crate::runtime::lifetime::{self, StartupContext};

/// Build CORS middleware from configuration
fn build_cors_middleware(cors_config: &CorsConfig) -> Cors {
    // 关闭时使用浏览器默认同源策略
    if !cors_config.enabled {
        return Cors::default();
    }

    let mut cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allowed_header("Content-Type")
        .allowed_header("Authorization")
        .allowed_header("Accept")
        .max_age(cors_config.max_age);

    if cors_config.allowed_origins.iter().any(|o| o == "*") {
        cors = cors.allow_any_origin();
    } else {
        for origin in &cors_config.allowed_origins {
            cors = cors.allowed_origin(origin);
        }
    }
    cors
}

/// JSON 请求体解析失败时返回统一信封
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_PAYLOAD_LIMIT)
        .error_handler(|err, _req| {
            let resp = error_from_studio(&StudioError::validation(format!(
                "Invalid request body: {}",
                err
            )));
            actix_web::error::InternalError::from_response(err, resp).into()
        })
}

/// 注册全部路由和共享状态（测试中也直接使用）
pub fn configure_app(cfg: &mut web::ServiceConfig, ctx: &StartupContext) {
    cfg.app_data(web::Data::new(ctx.storage.clone()))
        .app_data(web::Data::new(ctx.bookings.clone()))
        .app_data(web::Data::new(ctx.catalog.clone()))
        .app_data(web::Data::new(ctx.profiles.clone()))
        .app_data(web::Data::new(ctx.stats.clone()))
        .app_data(web::Data::new(ctx.checkout.clone()))
        .app_data(web::Data::new(ctx.webhooks.clone()))
        .app_data(web::Data::new(ctx.importer.clone()))
        .app_data(json_config())
        .service(webhook_routes())
        .service(
            web::scope(ADMIN_API_PREFIX)
                .wrap(AdminAuth)
                .service(admin_v1_routes()),
        )
        .service(web::scope(USER_API_PREFIX).service(user_v1_routes()))
        .service(health_routes());
}

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server() -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let startup = lifetime::prepare_startup().await.map_err(|e| {
        tracing::error!("Server startup failed: {}", e);
        e
    })?;

    let config = crate::config::get_config();
    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let cors_config = config.cors.clone();
    if cors_config.enabled && cors_config.allowed_origins.is_empty() {
        warn!("CORS enabled but allowed_origins is empty, no cross-origin requests will be allowed");
    }

    let db_for_shutdown = startup.storage.get_db().clone();
    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(build_cors_middleware(&cors_config))
            .wrap(Compress::default())
            .wrap(DefaultHeaders::new().add(("Cache-Control", "no-store")))
            .app_data(web::Data::new(app_start_time.clone()))
            .configure(|cfg| configure_app(cfg, &startup))
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .workers(cpu_count);

    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Failed to bind {}", bind_address))?
        .run();

    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&db_for_shutdown) => {
            warn!("Graceful shutdown completed");
        }
    }

    Ok(())
}
