pub mod common;
pub mod entrada_insumos;
pub mod equipo;
pub mod status;
pub mod stock_insumos;

use crate::record_store::RecordStoreClient;

/// State giving handlers access to the record store
pub trait RecordStoreState: Clone + Send + Sync + 'static {
    fn record_store(&self) -> &RecordStoreClient;
}
