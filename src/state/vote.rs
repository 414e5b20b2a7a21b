//! Meetings, ballots and vote resolution

use super::{stale_ok, AppState, Outcome};
use crate::broadcast::broadcast_room_state;
use crate::config::ServerConfig;
use crate::error::GameError;
use crate::rules::{self, quorum_reached, Verdict};
use crate::store::{ParticipantPatch, RoomPatch};
use crate::types::*;
use chrono::{DateTime, Duration, Utc};

impl AppState {
    /// Open a voting phase. Used for both emergency meetings and body reports.
    pub async fn call_meeting(
        &self,
        room_id: &str,
        caller_id: &str,
        kind: MeetingKind,
        location: Option<Position>,
    ) -> Result<Outcome, GameError> {
        let _guard = self.room_locks.lock(room_id).await;

        let Some(room) = self.store.get_room(room_id).await? else {
            return Ok(Outcome::Ignored);
        };
        if room.state != RoomState::Playing {
            return Ok(Outcome::Ignored);
        }
        let Some(caller) = self.member(room_id, caller_id).await? else {
            return Ok(Outcome::Ignored);
        };
        if !caller.is_alive {
            tracing::info!("Ignoring meeting from {}: not alive", caller.username);
            return Ok(Outcome::Ignored);
        }

        let deadline = self.config.enforce_phase_timers.then(|| {
            Utc::now() + Duration::seconds(ServerConfig::meeting_seconds(&room.settings))
        });

        // Fresh phase: no ballots, nobody has voted
        self.store.delete_ballots_for_room(room_id).await?;
        for participant in self.store.list_participants(room_id).await? {
            stale_ok(
                self.store
                    .update_participant(&participant.id, ParticipantPatch::reset_vote())
                    .await,
            )?;
        }

        self.store
            .update_room(
                room_id,
                RoomPatch {
                    state: Some(RoomState::Voting),
                    phase_deadline: Some(deadline),
                    meeting: Some(Some(Meeting {
                        caller_id: caller.id.clone(),
                        kind,
                        location,
                    })),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(
            "{} called a {:?} meeting in room {}",
            caller.username,
            kind,
            room.room_code
        );

        broadcast_room_state(self, room_id).await?;
        Ok(Outcome::Updated)
    }

    /// Record one ballot; a `None` target is a skip. The last ballot of the
    /// phase resolves the vote.
    pub async fn cast_vote(
        &self,
        room_id: &str,
        voter_id: &str,
        target_id: Option<ParticipantId>,
    ) -> Result<Outcome, GameError> {
        let _guard = self.room_locks.lock(room_id).await;

        if !self.room_in(room_id, RoomState::Voting).await? {
            return Ok(Outcome::Ignored);
        }
        let Some(voter) = self.member(room_id, voter_id).await? else {
            return Ok(Outcome::Ignored);
        };
        if !voter.is_alive || voter.has_voted {
            tracing::debug!("Ignoring ballot from {}", voter.username);
            return Ok(Outcome::Ignored);
        }
        if let Some(target_id) = &target_id {
            let target = self.member(room_id, target_id).await?;
            if !target.is_some_and(|t| t.is_alive) {
                return Ok(Outcome::Ignored);
            }
        }

        let ballot = self
            .store
            .create_ballot(room_id, voter_id, target_id.clone())
            .await?;
        let marked = self
            .store
            .update_participant(
                voter_id,
                ParticipantPatch {
                    has_voted: Some(true),
                    voted_for: Some(target_id),
                    ..Default::default()
                },
            )
            .await;
        if let Err(e) = marked {
            // A ballot without a marked voter would let them vote twice
            if let Err(undo) = self.store.delete_ballot(&ballot.id).await {
                tracing::error!("Failed to withdraw ballot {}: {}", ballot.id, undo);
            }
            if e.is_not_found() {
                tracing::debug!("Voter {} left while voting", voter.username);
                return Ok(Outcome::Ignored);
            }
            return Err(e.into());
        }

        tracing::info!("{} voted", voter.username);

        let participants = self.store.list_participants(room_id).await?;
        if quorum_reached(&participants) {
            self.resolve_voting(room_id).await?;
        }

        broadcast_room_state(self, room_id).await?;
        Ok(Outcome::Updated)
    }

    /// Tally the phase's ballots, apply the verdict and return to play.
    /// Caller holds the room lock.
    pub(super) async fn resolve_voting(&self, room_id: &str) -> Result<Verdict, GameError> {
        let ballots = self.store.list_ballots(room_id).await?;
        let verdict = rules::tally(&ballots);

        match &verdict {
            Verdict::Eliminate(target) => {
                let ejected = stale_ok(
                    self.store
                        .update_participant(
                            target,
                            ParticipantPatch {
                                is_alive: Some(false),
                                ..Default::default()
                            },
                        )
                        .await,
                )?;
                match ejected {
                    Some(p) => tracing::info!("{} was voted out", p.username),
                    None => tracing::debug!("Voted-out participant {} already left", target),
                }
            }
            Verdict::Tie => tracing::info!("Vote tied in room {}, nobody ejected", room_id),
            Verdict::NoVotes => tracing::info!("Everyone skipped in room {}", room_id),
        }

        stale_ok(
            self.store
                .update_room(
                    room_id,
                    RoomPatch {
                        state: Some(RoomState::Playing),
                        meeting: Some(None),
                        phase_deadline: Some(None),
                        ..Default::default()
                    },
                )
                .await,
        )?;

        self.check_win(room_id).await?;
        Ok(verdict)
    }

    /// Close every voting phase whose deadline has passed, tallying what
    /// was cast. Returns the rooms that were resolved.
    pub async fn expire_overdue_votes(&self, now: DateTime<Utc>) -> Result<Vec<RoomId>, GameError> {
        let overdue: Vec<RoomId> = self
            .store
            .list_rooms()
            .await?
            .into_iter()
            .filter(|room| is_overdue(room, now))
            .map(|room| room.id)
            .collect();

        let mut resolved = Vec::new();
        for room_id in overdue {
            match self.expire_room(&room_id, now).await {
                Ok(true) => resolved.push(room_id),
                Ok(false) => {}
                Err(e) if e.is_stale() => {
                    tracing::debug!("Room {} went away during expiry: {}", room_id, e);
                }
                Err(e) => {
                    tracing::error!("Failed to close voting in room {}: {}", room_id, e);
                }
            }
        }
        Ok(resolved)
    }

    async fn expire_room(&self, room_id: &str, now: DateTime<Utc>) -> Result<bool, GameError> {
        let _guard = self.room_locks.lock(room_id).await;

        // Re-check under the lock; quorum may have beaten the clock
        let still_overdue = self
            .store
            .get_room(room_id)
            .await?
            .is_some_and(|room| is_overdue(&room, now));
        if !still_overdue {
            return Ok(false);
        }

        tracing::info!("Voting time is up in room {}", room_id);
        self.resolve_voting(room_id).await?;
        broadcast_room_state(self, room_id).await?;
        Ok(true)
    }
}

fn is_overdue(room: &Room, now: DateTime<Utc>) -> bool {
    room.state == RoomState::Voting && room.phase_deadline.is_some_and(|deadline| deadline <= now)
}
