use std::io::Write;

use async_trait::async_trait;

use super::{Notifier, NotifyError};

/// Prints each delivery to stdout, framed with its destination.
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    fn name(&self) -> &'static str { "stdout" }

    async fn deliver(&self, destination: &str, text: &str) -> Result<(), NotifyError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "--- to {destination} ---\n{text}\n---").map_err(NotifyError::Io)?;
        out.flush().map_err(NotifyError::Io)
    }
}
