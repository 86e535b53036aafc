pub mod error;
pub mod params;
pub mod session;
pub mod verdict;

pub use crate::params::ParamSet;
pub use crate::session::{Session, Verifier};
pub use crate::verdict::{Decision, Diagnostic, LogLevel, Mutation, Verdict};

pub type Map<K, V> = std::collections::BTreeMap<K, V>;

pub type Error = error::JsvError;
pub type Result<T> = std::result::Result<T, Error>;
