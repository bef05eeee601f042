// SPDX-FileCopyrightText: 2024 Fondazione LINKS
//
// SPDX-License-Identifier: GPL-3.0-or-later

use std::sync::Arc;

use std::path::PathBuf;

use actix_web::{middleware::Logger, web, App, HttpServer};
use clap::Parser;
#[cfg(debug_assertions)]
use dotenv::dotenv;
use wellknown_issuer::handlers::{events_handler, images_handler, metadata_handler, well_known_handler};
use wellknown_issuer::importers::broadcast_importer::{BroadcastImporter, EventSender};
use wellknown_issuer::importers::git_importer::GitImporter;
use wellknown_issuer::importers::Importer;
use wellknown_issuer::repository::postgres_repo::{init, migrate, PostgresStore};
use wellknown_issuer::services::issuer_service::IssuerService;
use wellknown_issuer::utils::configs::{
    DatabaseConfig, HttpServerConfig, ImporterConfig, ImporterKind, ReconcilerConfig,
};

/// Well-known issuer metadata service command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Database configuration args
    #[command(flatten)]
    database_config: DatabaseConfig,

    /// HTTP Server configuration
    #[command(flatten)]
    http_server_config: HttpServerConfig,

    /// Reconciliation parameters
    #[command(flatten)]
    reconciler_config: ReconcilerConfig,

    /// Update source configuration
    #[command(flatten)]
    importer_config: ImporterConfig,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    #[cfg(debug_assertions)]
    dotenv().ok();
    env_logger::init();

    // Parse command line arguments
    let args = Args::parse();

    let expiry = args.reconciler_config.expiry()?;
    args.importer_config.check_git_interval(expiry)?;

    // Initialize database connection pool and schema
    let db_pool = init(args.database_config).await?;
    migrate(&db_pool).await?;

    let service = IssuerService::new(Arc::new(PostgresStore::new(db_pool)), expiry);

    let mut images = None;
    let (importer, event_sender): (Arc<dyn Importer>, Option<EventSender>) = match args.importer_config.importer {
        ImporterKind::Git => {
            if let Some(mount_path) = args.importer_config.git_image_path.clone() {
                // must exist before the file service resolves it
                let folder = args.importer_config.git_cache_dir();
                tokio::fs::create_dir_all(&folder).await?;
                log::info!("serving {} under {}", folder.display(), mount_path);
                images = Some((mount_path, folder));
            }
            (Arc::new(GitImporter::new(service.clone(), &args.importer_config)?), None)
        }
        ImporterKind::Broadcast => {
            let importer = BroadcastImporter::new(service.clone(), args.importer_config.event_queue_capacity);
            let sender = importer.sender();
            (Arc::new(importer), Some(sender))
        }
    };

    importer.start().await?;
    let served = start_server(service, importer.clone(), event_sender, images, args.http_server_config).await;
    importer.stop().await?;
    served
}

async fn start_server(
    service: IssuerService,
    importer: Arc<dyn Importer>,
    event_sender: Option<EventSender>,
    images: Option<(String, PathBuf)>,
    http_config: HttpServerConfig,
) -> Result<(), anyhow::Error> {
    log::info!("Starting up on {}:{}", http_config.host_address, http_config.host_port);

    let service = web::Data::new(service);
    let importer = web::Data::from(importer);
    let event_sender = event_sender.map(web::Data::new);

    HttpServer::new(move || {
        let mut app = App::new()
            .app_data(service.clone())
            .app_data(importer.clone())
            .configure(well_known_handler::scoped_config)
            .configure(metadata_handler::scoped_config);
        if let Some(sender) = &event_sender {
            app = app
                .app_data(sender.clone())
                .configure(events_handler::scoped_config);
        }
        if let Some((mount_path, folder)) = &images {
            app = app.configure(|cfg| images_handler::scoped_config(cfg, mount_path, folder));
        }

        app.wrap(well_known_handler::cors()).wrap(Logger::default())
    })
    .bind((http_config.host_address, http_config.host_port))?
    .run()
    .await
    .map_err(anyhow::Error::from)
}
