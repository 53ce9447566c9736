//! Upstream hosts: HTTP plumbing, decoders, bootstrap and provider resolvers

pub mod arolinks;
pub mod bootstrap;
pub mod cipher;
pub mod client;
pub mod dispatch;
pub mod lksfy;
pub mod nanolinks;

pub use arolinks::ArolinksResolver;
pub use bootstrap::Bootstrapper;
pub use cipher::*;
pub use client::*;
pub use dispatch::*;
pub use lksfy::LksfyResolver;
pub use nanolinks::NanolinksResolver;
