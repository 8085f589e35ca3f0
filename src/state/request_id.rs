use std::sync::atomic::{AtomicU64, Ordering};

use crate::util::{mix_u64, next_generated_id, unix_now_nanos};

pub(crate) struct RequestIdGenerator {
    seed: u128,
    requests: AtomicU64,
    completions: AtomicU64,
}

impl RequestIdGenerator {
    #[must_use]
    pub(crate) fn new() -> Self {
        let seed_hi = u128::from(mix_u64(unix_now_nanos()));
        let seed_lo = u128::from(mix_u64(unix_now_nanos() ^ 0x5851_f42d_4c95_7f2d));
        Self {
            seed: (seed_hi << 64) | seed_lo,
            requests: AtomicU64::new(1),
            completions: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub(crate) fn next_request_uuid(&self) -> uuid::Uuid {
        let seq = self.requests.fetch_add(1, Ordering::Relaxed);
        uuid::Uuid::from_u128(self.seed ^ u128::from(mix_u64(seq)))
    }

    #[must_use]
    pub(crate) fn next_chat_id(&self) -> String {
        next_generated_id("chatcmpl", &self.completions)
    }
}
