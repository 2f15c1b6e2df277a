pub mod config;
pub mod crawler;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod orchestrator;
pub mod query;
pub mod reducer;
pub mod resolver;
pub mod testing;
pub mod ticket;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use crawler::{
    operational_now, operational_today, Collaborators, CrawlerError, DataCrawler,
};
pub use ingest::{IngestionFilter, IngestionReport};
pub use notify::{EmailNotifier, Notification, NotificationRoute, Notifier, NotifyError};
pub use orchestrator::{
    validate_completeness, Completeness, DispatchConfig, DispatchOrchestrator, JobCandidate,
    Outcome, QueryJob,
};
pub use query::{
    JobHandle, JobStatus, QueryResult, QueryRunner, QueryService, QueryServiceError,
    QuboleClient, TransactionSummary,
};
pub use reducer::{Disposition, OutcomeReducer, RunSummary};
pub use resolver::{HttpProviderResolver, ProviderResolver, ResolverError};
pub use ticket::{JiraClient, SearchPredicate, TicketError, TicketFields, TicketRef, TicketSink, TicketSource};
