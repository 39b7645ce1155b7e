pub mod defs;
pub mod memory;
pub mod state;

pub use defs::{FragmentStream, LedgerStore, RawFragment, StoreError, Transport, TransportError};
pub use memory::MemoryLedgerStore;
pub use state::SqliteLedgerStore;
