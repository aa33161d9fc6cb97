//! Pipelined command issue and reply draining
//!
//! Commands go out in groups (one item's hash rounds, or one synchronous
//! command). Every issued group is queued in order; a drain always consumes
//! exactly the group at the head of the queue, so a reply is attributed to
//! the group whose command produced it and never to a neighbour.
//!
//! Store error replies do not stop a drain: the rest of the group is read
//! so the connection stays aligned for the next call, and the first error
//! is returned afterwards. A transport failure ends the drain at once.

use std::collections::VecDeque;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::ports::{BitStore, StoreCommand, StoreReply};

/// What kind of commands a pending group holds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupKind {
    /// `SETBIT` per hash round of one item
    SetBits,
    /// `GETBIT` per hash round of one item
    GetBits,
    /// One synchronous command
    Single,
}

#[derive(Clone, Copy, Debug)]
struct PendingGroup {
    kind: GroupKind,
    replies: usize,
}

/// Integer replies of one drained group, plus the first failure in it
#[derive(Debug)]
pub struct GroupReplies {
    values: Vec<i64>,
    failure: Option<StoreError>,
}

impl GroupReplies {
    /// Sum of the integer replies
    pub fn sum(&self) -> i64 {
        self.values.iter().sum()
    }

    /// True if every reply was a non-zero integer
    pub fn all_set(&self) -> bool {
        self.failure.is_none() && self.values.iter().all(|&value| value != 0)
    }

    /// The group's values, or its first failure
    pub fn into_result(self) -> Result<Vec<i64>, StoreError> {
        match self.failure {
            Some(err) => Err(err),
            None => Ok(self.values),
        }
    }

    /// Take the first failure out, leaving the values
    pub fn take_failure(&mut self) -> Option<StoreError> {
        self.failure.take()
    }
}

/// Two-phase command pipeline over a [`BitStore`]
pub struct Pipeline<S> {
    store: S,
    pending: VecDeque<PendingGroup>,
}

impl<S: BitStore> Pipeline<S> {
    /// Wrap an established store connection
    pub fn new(store: S) -> Self {
        Self {
            store,
            pending: VecDeque::new(),
        }
    }

    /// True when every issued command has been drained
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of replies issued but not yet drained
    pub fn pending_replies(&self) -> usize {
        self.pending.iter().map(|group| group.replies).sum()
    }

    /// Number of leading pending groups of `kind`
    pub fn leading_groups(&self, kind: GroupKind) -> usize {
        self.pending
            .iter()
            .take_while(|group| group.kind == kind)
            .count()
    }

    /// Fail with `Busy` unless nothing is pending
    pub fn ensure_idle(&self) -> Result<(), StoreError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(StoreError::Busy {
                pending: self.pending_replies(),
            })
        }
    }

    /// Send one group of commands without reading any reply
    pub fn issue(&mut self, kind: GroupKind, commands: &[StoreCommand]) -> Result<(), StoreError> {
        if commands.is_empty() {
            return Ok(());
        }

        match self.store.send(commands) {
            Ok(()) => {
                self.pending.push_back(PendingGroup {
                    kind,
                    replies: commands.len(),
                });
                Ok(())
            }
            Err(err) => {
                // How much of the group reached the store is unknown, so the
                // stream cannot be realigned.
                self.abandon();
                Err(err)
            }
        }
    }

    /// Drain the group at the head of the stream, which must be of `kind`
    pub fn drain_group(&mut self, kind: GroupKind) -> Result<GroupReplies, StoreError> {
        let group = match self.pending.front() {
            Some(group) if group.kind == kind => *group,
            Some(group) => {
                return Err(StoreError::OutOfSequence {
                    expected: kind,
                    found: group.kind,
                })
            }
            None => {
                return Err(StoreError::NoPendingReplies {
                    requested: 1,
                    pending: 0,
                })
            }
        };
        self.pending.pop_front();

        let mut values = Vec::with_capacity(group.replies);
        let mut failure = None;

        for position in 0..group.replies {
            let reply = match self.store.receive() {
                Ok(reply) => reply,
                Err(err) => {
                    warn!(position, error = %err, "Reply stream failed while draining");
                    self.abandon();
                    return Err(err);
                }
            };

            match reply {
                StoreReply::Integer(value) => values.push(value),
                StoreReply::Error(message) => {
                    debug!(position, %message, "Store error reply");
                    failure.get_or_insert(StoreError::Reply { position, message });
                }
                other => {
                    failure.get_or_insert(StoreError::UnexpectedReply {
                        position,
                        reply: other.to_string(),
                    });
                }
            }
        }

        Ok(GroupReplies { values, failure })
    }

    /// Send one command and wait for its reply
    ///
    /// Only valid while no deferred replies are pending.
    pub fn execute(&mut self, command: StoreCommand) -> Result<StoreReply, StoreError> {
        self.ensure_idle()?;
        self.store.send(std::slice::from_ref(&command))?;
        self.store.receive()
    }

    /// Forget pending groups after the connection broke
    fn abandon(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                pending = self.pending_replies(),
                "Dropping pending replies of a failed connection"
            );
        }
        self.pending.clear();
    }

    /// Release the pipeline, returning the store connection
    pub fn into_inner(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Store that answers from a script, recording what was sent
    #[derive(Default)]
    struct ScriptedStore {
        sent: Vec<StoreCommand>,
        replies: VecDeque<Result<StoreReply, StoreError>>,
        fail_send: bool,
    }

    impl ScriptedStore {
        fn with_replies(replies: Vec<StoreReply>) -> Self {
            Self {
                replies: replies.into_iter().map(Ok).collect(),
                ..Default::default()
            }
        }
    }

    impl BitStore for ScriptedStore {
        fn send(&mut self, commands: &[StoreCommand]) -> Result<(), StoreError> {
            if self.fail_send {
                return Err(StoreError::Transport("broken pipe".to_string()));
            }
            self.sent.extend_from_slice(commands);
            Ok(())
        }

        fn receive(&mut self) -> Result<StoreReply, StoreError> {
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(StoreError::Transport("connection closed".to_string())))
        }
    }

    fn get_bits(n: u64) -> Vec<StoreCommand> {
        (0..n)
            .map(|offset| StoreCommand::GetBit {
                key: "f.0".to_string(),
                offset,
            })
            .collect()
    }

    #[test]
    fn test_issue_then_drain_in_order() {
        let store = ScriptedStore::with_replies(vec![
            StoreReply::Integer(1),
            StoreReply::Integer(0),
            StoreReply::Integer(1),
        ]);
        let mut pipeline = Pipeline::new(store);

        pipeline.issue(GroupKind::GetBits, &get_bits(3)).unwrap();
        assert_eq!(pipeline.pending_replies(), 3);

        let replies = pipeline.drain_group(GroupKind::GetBits).unwrap();
        assert_eq!(replies.values, vec![1, 0, 1]);
        assert_eq!(replies.sum(), 2);
        assert!(!replies.all_set());
        assert!(pipeline.is_idle());
        assert_eq!(pipeline.store.sent.len(), 3);
    }

    #[test]
    fn test_error_reply_still_drains_whole_group() {
        let store = ScriptedStore::with_replies(vec![
            StoreReply::Integer(1),
            StoreReply::Error("WRONGTYPE".to_string()),
            StoreReply::Integer(1),
            // next group
            StoreReply::Integer(0),
        ]);
        let mut pipeline = Pipeline::new(store);
        pipeline.issue(GroupKind::GetBits, &get_bits(3)).unwrap();
        pipeline.issue(GroupKind::GetBits, &get_bits(1)).unwrap();

        let first = pipeline.drain_group(GroupKind::GetBits).unwrap();
        assert!(matches!(
            first.failure,
            Some(StoreError::Reply { position: 1, .. })
        ));
        assert!(!first.all_set());

        // The second group reads its own reply, not a leftover
        let second = pipeline.drain_group(GroupKind::GetBits).unwrap();
        assert_eq!(second.into_result().unwrap(), vec![0]);
        assert!(pipeline.is_idle());
    }

    #[test]
    fn test_unexpected_reply_is_a_failure() {
        let store = ScriptedStore::with_replies(vec![StoreReply::Status("OK".to_string())]);
        let mut pipeline = Pipeline::new(store);
        pipeline.issue(GroupKind::GetBits, &get_bits(1)).unwrap();

        let replies = pipeline.drain_group(GroupKind::GetBits).unwrap();
        assert!(matches!(
            replies.into_result(),
            Err(StoreError::UnexpectedReply { position: 0, .. })
        ));
    }

    #[test]
    fn test_drain_with_nothing_pending() {
        let mut pipeline = Pipeline::new(ScriptedStore::default());
        let result = pipeline.drain_group(GroupKind::SetBits);
        assert!(matches!(result, Err(StoreError::NoPendingReplies { .. })));
    }

    #[test]
    fn test_drain_wrong_kind_is_out_of_sequence() {
        let store = ScriptedStore::with_replies(vec![StoreReply::Integer(0)]);
        let mut pipeline = Pipeline::new(store);
        pipeline.issue(GroupKind::GetBits, &get_bits(1)).unwrap();

        let result = pipeline.drain_group(GroupKind::SetBits);
        assert!(matches!(
            result,
            Err(StoreError::OutOfSequence {
                expected: GroupKind::SetBits,
                found: GroupKind::GetBits
            })
        ));
        // Nothing was consumed
        assert_eq!(pipeline.pending_replies(), 1);
    }

    #[test]
    fn test_transport_failure_abandons_stream() {
        // Only one reply arrives for two issued commands
        let store = ScriptedStore::with_replies(vec![StoreReply::Integer(1)]);
        let mut pipeline = Pipeline::new(store);
        pipeline.issue(GroupKind::GetBits, &get_bits(2)).unwrap();
        pipeline.issue(GroupKind::GetBits, &get_bits(2)).unwrap();

        let result = pipeline.drain_group(GroupKind::GetBits);
        assert!(matches!(result, Err(StoreError::Transport(_))));
        assert!(pipeline.is_idle());
    }

    #[test]
    fn test_send_failure_abandons_stream() {
        let store = ScriptedStore {
            fail_send: true,
            ..Default::default()
        };
        let mut pipeline = Pipeline::new(store);
        let result = pipeline.issue(GroupKind::SetBits, &get_bits(2));
        assert!(matches!(result, Err(StoreError::Transport(_))));
        assert!(pipeline.is_idle());
    }

    #[test]
    fn test_execute_requires_idle_pipeline() {
        let store = ScriptedStore::with_replies(vec![StoreReply::Integer(0)]);
        let mut pipeline = Pipeline::new(store);
        pipeline.issue(GroupKind::GetBits, &get_bits(1)).unwrap();

        let result = pipeline.execute(StoreCommand::Ping);
        assert!(matches!(result, Err(StoreError::Busy { pending: 1 })));
    }

    #[test]
    fn test_execute_round_trip() {
        let store = ScriptedStore::with_replies(vec![StoreReply::Status("PONG".to_string())]);
        let mut pipeline = Pipeline::new(store);
        let reply = pipeline.execute(StoreCommand::Ping).unwrap();
        assert_eq!(reply, StoreReply::Status("PONG".to_string()));
    }

    #[test]
    fn test_leading_groups_counts_only_head_run() {
        let store = ScriptedStore::default();
        let mut pipeline = Pipeline::new(store);
        pipeline.issue(GroupKind::SetBits, &get_bits(2)).unwrap();
        pipeline.issue(GroupKind::SetBits, &get_bits(2)).unwrap();
        pipeline.issue(GroupKind::GetBits, &get_bits(2)).unwrap();
        pipeline.issue(GroupKind::SetBits, &get_bits(2)).unwrap();

        assert_eq!(pipeline.leading_groups(GroupKind::SetBits), 2);
        assert_eq!(pipeline.leading_groups(GroupKind::GetBits), 0);
        assert_eq!(pipeline.pending_replies(), 8);
    }

    #[test]
    fn test_empty_issue_is_noop() {
        let mut pipeline = Pipeline::new(ScriptedStore::default());
        pipeline.issue(GroupKind::SetBits, &[]).unwrap();
        assert!(pipeline.is_idle());
    }
}
