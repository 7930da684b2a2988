use actix_web::{App, HttpServer, middleware, web};

use tijara::db;
use tijara::handlers::{notification_handlers, workflow_handlers};
use tijara::models::sequence;
use tijara::workflow::scheduler;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    std::fs::create_dir_all("data").expect("Failed to create data directory");

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "data/tijara.db".to_string());
    let pool = db::init_pool(&database_url);
    db::run_migrations(&pool);
    db::seed_defaults(&pool);

    // Surface sequence misconfiguration at startup instead of at the first
    // transition
    {
        let conn = pool.get().expect("Failed to get connection for validation");
        match sequence::validate_all(&conn) {
            Ok(findings) if findings.is_empty() => {
                log::info!("Workflow configuration valid");
            }
            Ok(findings) => {
                for finding in findings {
                    log::warn!("Workflow configuration: {finding}");
                }
            }
            Err(e) => log::error!("Workflow validation failed: {e}"),
        }
    }

    scheduler::spawn_scheduler(pool.clone());

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
    log::info!("Starting server at http://{bind_addr}");

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(web::Data::new(pool.clone()))
            .service(
                web::scope("/api/orders/{order_type}/{order_id}/workflow")
                    .route("", web::post().to(workflow_handlers::create_status))
                    .route("", web::get().to(workflow_handlers::get_status))
                    .route("/advance", web::post().to(workflow_handlers::advance))
                    .route("/reject", web::post().to(workflow_handlers::reject))
                    .route("/history", web::get().to(workflow_handlers::history)),
            )
            .service(
                web::scope("/api/workflow")
                    .route("/stages", web::get().to(workflow_handlers::list_stages))
                    .route("/sequences", web::get().to(workflow_handlers::list_sequences))
                    .route(
                        "/stages/{stage_id}/orders",
                        web::get().to(workflow_handlers::orders_by_stage),
                    )
                    .route("/statistics", web::get().to(workflow_handlers::statistics))
                    .route("/sweep", web::post().to(workflow_handlers::sweep_overdue))
                    .route("/validate", web::get().to(workflow_handlers::validate)),
            )
            .service(
                web::scope("/api/notifications")
                    .route("", web::get().to(notification_handlers::list))
                    .route(
                        "/unread-count",
                        web::get().to(notification_handlers::unread_count),
                    )
                    .route("/read-all", web::post().to(notification_handlers::mark_all_read))
                    .route("/{id}/read", web::post().to(notification_handlers::mark_read)),
            )
    })
    .bind(bind_addr)?
    .run()
    .await
}
