use async_trait::async_trait;
use chrono::{DateTime, Utc};
use eyre::Result;
use std::sync::Arc;
use tracing::trace;

use crate::api::ChainApi;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDate {
    pub block: u64,
    pub date: String,
}

/// Resolves a wall-clock time to a historical block.
#[async_trait]
pub trait BlockDater: Send + Sync {
    async fn block_by_timestamp(&self, timestamp_ms: u64) -> Result<BlockDate>;
}

/// Finds the latest block mined at or before a timestamp by binary search
/// over block headers. Times past the head resolve to the head, times before
/// genesis to block 0.
pub struct ChainBlockDater<A: ?Sized> {
    api: Arc<A>,
}

impl<A: ChainApi + ?Sized> ChainBlockDater<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl<A: ChainApi + ?Sized> BlockDater for ChainBlockDater<A> {
    async fn block_by_timestamp(&self, timestamp_ms: u64) -> Result<BlockDate> {
        let target = timestamp_ms / 1000;

        let head = self.api.block_number().await?;
        let head_time = self.api.block_timestamp(head).await?;
        if target >= head_time {
            return Ok(block_date(head, head_time));
        }

        let genesis_time = self.api.block_timestamp(0).await?;
        if target <= genesis_time {
            return Ok(block_date(0, genesis_time));
        }

        // time(low) <= target < time(high)
        let (mut low, mut low_time, mut high) = (0u64, genesis_time, head);
        while high - low > 1 {
            let mid = low + (high - low) / 2;
            let mid_time = self.api.block_timestamp(mid).await?;
            trace!("Block {} mined at {}", mid, mid_time);
            if mid_time <= target {
                low = mid;
                low_time = mid_time;
            } else {
                high = mid;
            }
        }
        Ok(block_date(low, low_time))
    }
}

fn block_date(block: u64, timestamp: u64) -> BlockDate {
    let date = i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string());
    BlockDate { block, date }
}
