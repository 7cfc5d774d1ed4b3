pub mod aggregation;
pub mod ingestion;
pub mod message_domain_service;

pub use ingestion::AUTO_REPLIES;
pub use message_domain_service::{DEFAULT_PAGE_SIZE, MessageDomainService, StoreSummary};
