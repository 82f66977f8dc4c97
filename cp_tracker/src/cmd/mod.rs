pub mod server;
pub mod sync;

use clap::ValueEnum;
use std::fmt;

#[derive(Debug, ValueEnum, Clone)]
pub enum SyncDomain {
    Problems,
    Contests,
}

impl fmt::Display for SyncDomain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SyncDomain::Problems => write!(f, "problems"),
            SyncDomain::Contests => write!(f, "contests"),
        }
    }
}
