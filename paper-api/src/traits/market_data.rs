//! Defines the `MarketDataSource` trait for order-book streaming.
//!
//! A source streams full order-book snapshots for the instruments it has been
//! asked to follow. It abstracts over live exchange connections, replayed
//! recordings and synthetic generators.

use crate::model::instrument::Instrument;
use crate::model::market_data::BookUpdate;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Where a source pushes snapshots for subscribed instruments.
pub type SnapshotSink = mpsc::UnboundedSender<BookUpdate>;

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Start streaming snapshots of `instrument` into `sink`.
    ///
    /// Each pushed snapshot replaces the previous one wholesale; levels must
    /// be sorted best price first.
    async fn subscribe(&self, instrument: &Instrument, sink: SnapshotSink) -> Result<()>;

    /// Stop streaming snapshots of `instrument`.
    async fn unsubscribe(&self, instrument: &Instrument) -> Result<()>;
}
