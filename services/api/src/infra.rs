use candidate_flagging::candidates::{
    CandidateStore, FlaggingService, JsonFileSink, StoreOptions,
};
use candidate_flagging::config::StorageConfig;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type FileBackedService = FlaggingService<JsonFileSink>;

/// Open the JSON-file store and wrap it in the flagging service.
pub(crate) async fn file_backed_service(storage: &StorageConfig) -> Arc<FileBackedService> {
    open_service(&storage.data_file, storage.store_options()).await
}

pub(crate) async fn open_service(
    data_file: &Path,
    options: StoreOptions,
) -> Arc<FileBackedService> {
    let sink = Arc::new(JsonFileSink::new(data_file));
    let store = Arc::new(CandidateStore::open(sink, options).await);
    Arc::new(FlaggingService::new(store))
}
