//! Exchange-side market data: the incremental multicast publisher and the
//! periodic snapshot synthesizer.

mod publisher;
mod synthesizer;

pub use publisher::MarketDataPublisher;
pub use synthesizer::SnapshotSynthesizer;
