pub mod common;
pub mod config;
pub mod globalsettings;
pub mod output;
pub mod policy;

pub type Error = crate::common::error::ApolloError;
pub type Result<T> = std::result::Result<T, Error>;

pub const APOLLO_JSV_VERSION: &str = {
    match option_env!("APOLLO_JSV_BUILD_VERSION") {
        Some(version) => version,
        None => const_format::concatcp!(env!("CARGO_PKG_VERSION"), "-dev"),
    }
};
