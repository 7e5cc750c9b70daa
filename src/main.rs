use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter
use std::sync::Arc;

use vibra_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    gateways::{CardGateway, GatewayAdapter, PixGateway},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration file");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(
        &config.auth.jwt_secret,
        config.auth.access_token_expires_in,
    );

    let pix_gateway: Arc<dyn GatewayAdapter> = Arc::new(PixGateway::new(config.pix_gateway.clone()));
    let card_gateway: Arc<dyn GatewayAdapter> =
        Arc::new(CardGateway::new(config.card_gateway.clone()));

    let session_service = SessionService::new(pool.clone());
    let payment_service = PaymentService::new(pool.clone(), pix_gateway, card_gateway);
    let marketplace_service =
        MarketplaceService::new(pool.clone(), config.platform.account_username.clone());
    let vip_service = VipService::new(pool.clone(), config.platform.account_username.clone());
    let credit_service = CreditService::new(pool.clone());

    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors())
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(session_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(marketplace_service.clone()))
            .app_data(web::Data::new(vip_service.clone()))
            .app_data(web::Data::new(credit_service.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::session_config)
                    .configure(handlers::payment_config)
                    .configure(handlers::marketplace_config)
                    .configure(handlers::vip_config)
                    .configure(handlers::credits_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
