use actors::actor::{ActorError as RawActorError, Actor};
use actors::mailbox::BoundedMailbox;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("store error: {0}")]
    Store(#[from] store::error::StoreError),

    #[error("the scheduler actor is no longer reachable")]
    ActorUnreachable,
}

impl<A: Actor> From<RawActorError<A, BoundedMailbox<A>>> for SchedulerError {
    fn from(_: RawActorError<A, BoundedMailbox<A>>) -> Self {
        SchedulerError::ActorUnreachable
    }
}
