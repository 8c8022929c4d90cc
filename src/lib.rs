pub mod adapters;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod health;
pub mod liqpay;
pub mod middleware;
pub mod ports;
pub mod use_cases;
pub mod utils;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;

use crate::adapters::{
    InMemoryStore, PostgresAcquirerRepository, PostgresJournalRepository, PostgresOrderService,
    PostgresTransactionRepository,
};
use crate::health::{DependencyChecker, PostgresChecker};
use crate::ports::{AcquirerRepository, JournalRepository, OrderService, TransactionRepository};
use crate::use_cases::{BuildCheckout, ProcessCallback};

#[derive(Clone)]
pub struct AppState {
    pub callbacks: Arc<ProcessCallback>,
    pub checkout: Arc<BuildCheckout>,
    pub journal: Arc<dyn JournalRepository>,
    pub health_checkers: Vec<Arc<dyn DependencyChecker>>,
    pub start_time: Instant,
    pub log_request_body: bool,
}

impl AppState {
    fn from_ports(
        acquirers: Arc<dyn AcquirerRepository>,
        transactions: Arc<dyn TransactionRepository>,
        journal: Arc<dyn JournalRepository>,
        orders: Arc<dyn OrderService>,
        health_checkers: Vec<Arc<dyn DependencyChecker>>,
    ) -> Self {
        let callbacks = ProcessCallback::new(
            acquirers.clone(),
            transactions.clone(),
            journal.clone(),
            orders.clone(),
        );
        let checkout = BuildCheckout::new(acquirers, transactions, orders);

        Self {
            callbacks: Arc::new(callbacks),
            checkout: Arc::new(checkout),
            journal,
            health_checkers,
            start_time: Instant::now(),
            log_request_body: false,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let checker: Arc<dyn DependencyChecker> = Arc::new(PostgresChecker::new(pool.clone()));
        Self::from_ports(
            Arc::new(PostgresAcquirerRepository::new(pool.clone())),
            Arc::new(PostgresTransactionRepository::new(pool.clone())),
            Arc::new(PostgresJournalRepository::new(pool.clone())),
            Arc::new(PostgresOrderService::new(pool)),
            vec![checker],
        )
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        let checker: Arc<dyn DependencyChecker> = store.clone();
        Self::from_ports(
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            vec![checker],
        )
    }

    pub fn with_request_body_logging(mut self, enabled: bool) -> Self {
        self.log_request_body = enabled;
        self
    }
}

pub fn create_app(state: AppState) -> Router {
    let log_request_body = state.log_request_body;

    Router::new()
        .route("/health", get(handlers::health))
        .route("/liqpay/callback", post(handlers::callback::callback))
        .route("/liqpay/checkout/:reference", get(handlers::checkout::get_checkout))
        .route("/liqpay/journal", get(handlers::journal::list_journal))
        .layer(axum::middleware::from_fn_with_state(
            log_request_body,
            middleware::request_logger::request_logger_middleware,
        ))
        .with_state(state)
}
