use futures_util::StreamExt;
use gatehouse::admin::GateService;
use gatehouse::config::{bind_addr_from_env, StorageConfig};
use gatehouse::rpc::{GatehouseRpc, GatehouseServer};
use gatehouse::storage::etcd::EtcdDriver;
use gatehouse::storage::file::FileDriver;
use gatehouse::storage::StorageDriver;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info")).unwrap();
    fmt().with_env_filter(filter).init();

    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let gatestorage = std::env::var("GATESTORAGE").unwrap_or_else(|_| "<unset>".to_string());
    let bind_addr = bind_addr_from_env();
    info!(target: "gatehouse", "Gatehouse starting: RUST_LOG='{}', GATESTORAGE='{}', bind='{}'", rust_log, gatestorage, bind_addr);

    let storage_config = match StorageConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(target: "gatehouse", "invalid GATESTORAGE: {e}");
            std::process::exit(1);
        }
    };

    let storage: Arc<dyn StorageDriver> = match storage_config {
        StorageConfig::File(path) => match FileDriver::new(&path) {
            Ok(d) => Arc::new(d),
            Err(e) => {
                error!(target: "gatehouse", "cannot open storage root {}: {e}", path.display());
                std::process::exit(1);
            }
        },
        StorageConfig::Etcd(url) => Arc::new(EtcdDriver::new(url)),
    };

    let service = match GateService::bootstrap(storage.clone()).await {
        Ok(s) => s,
        Err(e) => {
            error!(target: "gatehouse", "failed to load Registry from storage: {e}");
            std::process::exit(1);
        }
    };

    // Apply remote changes observed via the storage driver's watch stream without
    // re-persisting them (spec §4.6): file driver's stream never yields, etcd's
    // dispatches a ChangeNotice per put. We reload the full snapshot on each notice
    // rather than tracking the diff, since the Registry is one small document.
    let watch_service = service.clone();
    let watch_storage = storage.clone();
    tokio::spawn(async move {
        let mut changes = watch_storage.watch();
        while let Some(notice) = changes.next().await {
            match watch_storage.load().await {
                Ok(snapshot) => {
                    watch_service.apply_remote_snapshot(snapshot).await;
                    info!(target: "gatehouse", "applied remote change at revision {}", notice.revision);
                }
                Err(e) => error!(target: "gatehouse", "failed to reload after remote change: {e}"),
            }
        }
    });

    let addr = bind_addr.parse()?;
    let rpc = GatehouseRpc::new(service);

    info!(target: "gatehouse", "listening on {addr}");
    tonic::transport::Server::builder()
        .add_service(GatehouseServer::new(rpc))
        .serve_with_shutdown(addr, async {
            let _ = tokio::signal::ctrl_c().await;
            info!(target: "gatehouse", "shutdown signal received, draining");
        })
        .await?;

    Ok(())
}
