pub mod coretax;
pub mod invoice;
pub mod relation;
pub mod stats;

pub use coretax::{CoretaxStatus, ExternalRecord};
pub use invoice::{FakturStatus, InvoiceUpdate, StoredInvoice};
pub use relation::{ChainEntry, InvoiceChain, InvoiceRelation};
pub use stats::MatchStats;
