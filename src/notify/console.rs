//! Stdout notifier for dry runs

use super::{Notifier, NotifyError};
use async_trait::async_trait;

/// Prints each message to stdout instead of delivering it
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        println!("{text}\n");
        Ok(())
    }
}
