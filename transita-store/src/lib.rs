pub mod app_config;
pub mod database;
pub mod ledger_repo;
pub mod memory;
pub mod redis_repo;

pub use database::DbClient;
pub use ledger_repo::PgReservationLedger;
pub use memory::{MemoryLeaseStore, MemoryLedger};
pub use redis_repo::RedisClient;
