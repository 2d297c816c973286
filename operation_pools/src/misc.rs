use core::future::Future;

use anyhow::Result;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PoolAdditionOutcome {
    Accept,
    Ignore,
}

impl PoolAdditionOutcome {
    #[must_use]
    pub const fn is_publishable(self) -> bool {
        matches!(self, Self::Accept)
    }
}

pub trait PoolTask: Send + 'static {
    type Output: Send;

    fn run(self) -> impl Future<Output = Result<Self::Output>> + Send;
}
