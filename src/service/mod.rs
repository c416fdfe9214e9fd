pub mod chain;
pub mod matcher;

pub use chain::build_chains;
pub use matcher::Matcher;
