pub mod api_server;
pub mod memory;
pub mod postgres;
pub mod store;

pub use api_server::{build_state, shutdown_signal, start_api_server};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use store::{ActivityStore, ProfileStore, StoreHealth};
