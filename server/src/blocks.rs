//! Block policy gate consulted before any send.

use anyhow::Result;
use std::sync::Arc;

use crate::directory::UserDirectory;

/// Yes/no predicate over a user pair, delegating to the directory
/// collaborator. With no directory configured the gate fails open: absence
/// of the dependency must not deadlock messaging in test or bootstrap runs.
#[derive(Clone, Default)]
pub struct BlockGate {
    directory: Option<Arc<dyn UserDirectory>>,
}

impl BlockGate {
    pub fn new(directory: Option<Arc<dyn UserDirectory>>) -> Self {
        Self { directory }
    }

    pub async fn is_blocked(&self, a: i64, b: i64) -> Result<bool> {
        match &self.directory {
            Some(directory) => directory.is_blocked(a, b).await,
            None => Ok(false),
        }
    }

    /// Directional block lookup for the presentation layer. The delivery
    /// engine never consults this.
    pub async fn who_blocked(&self, a: i64, b: i64) -> Result<Option<(i64, i64)>> {
        match &self.directory {
            Some(directory) => directory.who_blocked(a, b).await,
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;

    #[tokio::test]
    async fn gate_fails_open_without_directory() {
        let gate = BlockGate::new(None);
        assert!(!gate.is_blocked(1, 2).await.unwrap());
        assert_eq!(gate.who_blocked(1, 2).await.unwrap(), None);
    }

    #[tokio::test]
    async fn gate_delegates_to_directory() {
        let directory = Arc::new(MemoryDirectory::new());
        directory.block(5, 6);
        let gate = BlockGate::new(Some(directory));

        assert!(gate.is_blocked(6, 5).await.unwrap());
        assert_eq!(gate.who_blocked(6, 5).await.unwrap(), Some((5, 6)));
    }
}
