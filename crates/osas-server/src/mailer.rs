//! Background mail queue.
//!
//! Handlers push rendered-on-demand [`Mail`] values onto an unbounded
//! channel and return immediately. A single task drains the channel and
//! hands each message to the log transport.

use osas_core::notification::{Mail, MailError, Mailer};
use tokio::{sync::mpsc, task::JoinHandle};

#[derive(Debug, Clone)]
pub struct ChannelMailer {
  tx: mpsc::UnboundedSender<Mail>,
}

impl ChannelMailer {
  /// Create the queue and spawn its delivery task.
  pub fn spawn() -> (Self, JoinHandle<usize>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, tokio::spawn(deliver(rx)))
  }
}

impl Mailer for ChannelMailer {
  fn send(&self, mail: Mail) -> Result<(), MailError> {
    self.tx.send(mail).map_err(|_| MailError::QueueClosed)
  }
}

/// Drain the queue until every sender is gone. Returns how many messages
/// were delivered.
async fn deliver(mut rx: mpsc::UnboundedReceiver<Mail>) -> usize {
  let mut delivered = 0;
  while let Some(mail) = rx.recv().await {
    let to = mail.recipient();
    tracing::info!(
      kind = mail.kind(),
      to = %to.email,
      subject = %mail.subject(),
      "mail delivered"
    );
    tracing::debug!(kind = mail.kind(), body = %mail.html_body(), "mail body");
    delivered += 1;
  }
  tracing::debug!(delivered, "mail queue closed");
  delivered
}
