use crc32fast::Hasher;

use crate::block::BlockId;

/// Derive a short, stable seed from a post identifier
pub fn get_post_seed(post_id: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(b"post://");
    hasher.update(post_id.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential block id generator scoped to one post.
///
/// The counter only moves forward, so an id is never handed out twice
/// within a session, even after the block that held it is deleted.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(post_id: &str) -> Self {
        Self {
            seed: get_post_seed(post_id),
            count: 0,
        }
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            count: 0,
        }
    }

    pub fn new_id(&mut self) -> BlockId {
        self.count += 1;
        BlockId::new(format!("{}-{}", self.seed, self.count))
    }

    /// Advance the counter past an id that already exists (e.g. one loaded
    /// from storage), so later ids cannot collide with it.
    pub fn observe(&mut self, id: &BlockId) {
        let Some(rest) = id.as_str().strip_prefix(&self.seed) else {
            return;
        };
        let Some(number) = rest.strip_prefix('-') else {
            return;
        };
        if let Ok(n) = number.parse::<u64>() {
            self.count = self.count.max(n);
        }
    }

    /// Never hand out a number at or below `count`
    pub fn advance_to(&mut self, count: u64) {
        self.count = self.count.max(count);
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}
