use clock::Tick;
use futures::channel::mpsc::UnboundedSender;
use tracing::debug;

#[derive(Clone, Copy, Debug)]
pub enum PoolMessage {
    Tick(Tick),
    Stop,
}

impl PoolMessage {
    pub fn send(self, tx: &UnboundedSender<Self>) {
        if let Err(message) = tx.unbounded_send(self) {
            debug!("send to operation pools failed because the receiver was dropped: {message:?}");
        }
    }
}
