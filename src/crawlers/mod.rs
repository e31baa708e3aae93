pub mod crawler;
pub mod discover;

#[cfg(test)]
mod tests;

pub use crawler::{DiscoveryError, SiteDiscoverer};
pub use discover::LinkDiscoverer;
