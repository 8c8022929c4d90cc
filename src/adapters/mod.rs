pub mod memory;
pub mod postgres_acquirer_repository;
pub mod postgres_journal_repository;
pub mod postgres_order_service;
pub mod postgres_transaction_repository;

pub use memory::InMemoryStore;
pub use postgres_acquirer_repository::PostgresAcquirerRepository;
pub use postgres_journal_repository::PostgresJournalRepository;
pub use postgres_order_service::PostgresOrderService;
pub use postgres_transaction_repository::PostgresTransactionRepository;
