//! Poll/alert pipeline core: settings, SSRF guard, schema mapper, health
//! parser, fetcher, transition detector, poll executor, alert dispatcher,
//! scheduler, and retention sweeper.

pub mod alerts;
pub mod error;
pub mod fetcher;
pub mod health_parser;
pub mod poll_executor;
pub mod retention;
pub mod scheduler;
pub mod schema_mapper;
pub mod settings;
pub mod ssrf;
pub mod transitions;

pub use error::PipelineError;
pub use fetcher::HttpFetcher;
pub use poll_executor::{PollExecutor, PollResult};
pub use retention::RetentionSweeper;
pub use scheduler::Scheduler;
pub use schema_mapper::{map_body, MappedResult, SchemaMapping};
pub use settings::SettingsProvider;
pub use ssrf::{HostResolver, SsrfDecision};
pub use transitions::Transition;
