pub mod entrada;
pub mod equipo;
pub mod insumo;

pub use entrada::{CreateEntriesRequest, EntryValidationError, StockEntryFields};
pub use equipo::Responsable;
pub use insumo::{Category, CategoryFilter, StockState, StockSummary, UnitOfMeasure};
