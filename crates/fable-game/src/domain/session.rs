//! The session aggregate and its phase engine.
//!
//! `GameSession` owns the participants and the current round and is the
//! only place their state changes. Every operation checks the session's
//! status and phase first and returns without mutating anything when the
//! check fails.
//!
//! Work that has to happen later (simulated participants "thinking",
//! generated morals) is handed back to the caller as [`FollowUp`]s tagged
//! with the [`PhaseTicket`] they were scheduled against. The matching
//! `commit_*` method turns into a no-op once the session has moved on.

use chrono::{DateTime, Utc};
use fable_core::clock::Clock;
use fable_core::deck::{CUSTOM_CARD_ID_BASE, DeckProvider};
use fable_core::error::DomainError;
use fable_core::rng::DeterministicRng;
use fable_core::role::RoleType;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::card::CardId;
use super::dealer::{self, DealRules};
use super::morals::fallback_moral;
use super::narrative;
use super::participant::Participant;
use super::random::{choose_weighted, index_in};
use super::roles::assign_roles;
use super::round::{Phase, PhaseTicket, Round, Submission};
use super::scoring;
use super::text::{MAX_CUSTOM_CARD_CHARS, MAX_MORAL_CHARS, MAX_NAME_CHARS, clean_text};
use super::voting::vote_weight;

/// Lifecycle status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Accepting participants; no round has started.
    Lobby,
    /// Rounds are being played.
    Active,
    /// All rounds played, or every human left.
    Completed,
}

/// Per-session game settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSettings {
    /// Seats per session; empty seats are filled with simulated participants.
    pub max_participants: usize,
    /// Number of rounds before the session completes.
    pub rounds_to_play: u32,
    /// Cards per hand.
    pub hand_size: usize,
    /// Probability that a human's hand includes a blank custom card.
    pub custom_card_chance: f64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_participants: 5,
            rounds_to_play: 3,
            hand_size: 3,
            custom_card_chance: 0.2,
        }
    }
}

impl SessionSettings {
    const fn deal_rules(&self) -> DealRules {
        DealRules {
            hand_size: self.hand_size,
            custom_card_chance: self.custom_card_chance,
        }
    }
}

/// Deferred work for a simulated participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    /// Pick a card after a thinking delay.
    SimulatedSelection {
        /// The simulated participant.
        participant_id: Uuid,
        /// Round and phase the pick is valid for.
        ticket: PhaseTicket,
    },
    /// Ask the text generator for a moral.
    SimulatedMoral {
        /// The simulated participant.
        participant_id: Uuid,
        /// Round and phase the moral is valid for.
        ticket: PhaseTicket,
        /// The narrative to write a moral for.
        narrative: String,
    },
    /// Cast a weighted vote after a short delay.
    SimulatedVote {
        /// The simulated participant.
        participant_id: Uuid,
        /// Round and phase the vote is valid for.
        ticket: PhaseTicket,
    },
}

/// Result of committing deferred work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuationOutcome {
    /// The work was applied; the follow-ups it triggered are attached.
    Applied(Vec<FollowUp>),
    /// The session moved past the ticket's round or phase; nothing changed.
    Stale,
}

/// The aggregate root for one game match.
#[derive(Debug)]
pub struct GameSession {
    /// Join code.
    pub(crate) id: String,
    pub(crate) status: SessionStatus,
    pub(crate) participants: Vec<Participant>,
    pub(crate) round: Round,
    pub(crate) settings: SessionSettings,
    pub(crate) created_at: DateTime<Utc>,
    next_custom_card_id: u32,
    simulated_seats_filled: usize,
}

impl GameSession {
    /// Opens a session in the lobby with a single human host.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the host name is empty or too long.
    pub fn create(
        id: String,
        host_name: &str,
        settings: SessionSettings,
        clock: &dyn Clock,
    ) -> Result<(Self, Uuid), DomainError> {
        let name = clean_text("name", host_name, MAX_NAME_CHARS)?;
        let host_id = Uuid::new_v4();
        let mut host = Participant::human(host_id, name);
        host.is_host = true;

        let now = clock.now();
        let session = Self {
            id,
            status: SessionStatus::Lobby,
            participants: vec![host],
            round: Round::waiting(now),
            settings,
            created_at: now,
            next_custom_card_id: CUSTOM_CARD_ID_BASE,
            simulated_seats_filled: 0,
        };
        Ok((session, host_id))
    }

    /// The join code.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SessionStatus {
        self.status
    }

    /// Participants in seat order.
    #[must_use]
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// The current round.
    #[must_use]
    pub const fn round(&self) -> &Round {
        &self.round
    }

    /// The session's settings.
    #[must_use]
    pub const fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// When the session was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Looks up a participant.
    #[must_use]
    pub fn participant(&self, participant_id: Uuid) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == participant_id)
    }

    /// The current host, if any human is left.
    #[must_use]
    pub fn host_id(&self) -> Option<Uuid> {
        self.participants.iter().find(|p| p.is_host).map(|p| p.id)
    }

    /// Number of human participants.
    #[must_use]
    pub fn human_count(&self) -> usize {
        self.humans().count()
    }

    fn humans(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_human())
    }

    fn index_of(&self, participant_id: Uuid) -> Result<usize, DomainError> {
        self.participants
            .iter()
            .position(|p| p.id == participant_id)
            .ok_or(DomainError::ParticipantNotFound(participant_id))
    }

    /// Resolves an acting human participant.
    fn human_index(&self, participant_id: Uuid) -> Result<usize, DomainError> {
        let index = self.index_of(participant_id)?;
        if !self.participants[index].is_human() {
            return Err(DomainError::validation(
                "simulated participants act on their own",
            ));
        }
        Ok(index)
    }

    fn require_host(&self, participant_id: Uuid) -> Result<(), DomainError> {
        let index = self.index_of(participant_id)?;
        if !self.participants[index].is_host {
            return Err(DomainError::validation("only the host can do that"));
        }
        Ok(())
    }

    fn require_phase(&self, phase: Phase, action: &str) -> Result<(), DomainError> {
        if self.status != SessionStatus::Active || self.round.phase != phase {
            return Err(DomainError::Validation(format!(
                "{action} is only allowed during the {phase} phase"
            )));
        }
        Ok(())
    }

    /// Whether a continuation scheduled against `ticket` may still commit.
    fn accepts(&self, ticket: PhaseTicket) -> bool {
        self.status == SessionStatus::Active && self.round.ticket() == ticket
    }

    // --- lobby ---

    /// Adds a human participant to the lobby.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the session has started, is full,
    /// or the name is invalid or already taken.
    pub fn join(&mut self, name: &str) -> Result<Uuid, DomainError> {
        if self.status != SessionStatus::Lobby {
            return Err(DomainError::validation("the session has already started"));
        }
        if self.participants.len() >= self.settings.max_participants {
            return Err(DomainError::validation("the session is full"));
        }
        let name = clean_text("name", name, MAX_NAME_CHARS)?;
        if self
            .participants
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case(&name))
        {
            return Err(DomainError::validation("that name is already taken"));
        }

        let id = Uuid::new_v4();
        let mut participant = Participant::human(id, name);
        participant.is_host = self.host_id().is_none();
        self.participants.push(participant);
        info!(session = %self.id, participant = %id, "participant joined");
        Ok(id)
    }

    /// Fills empty seats with simulated participants and deals round one.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ParticipantNotFound` for an unknown requester and
    /// `DomainError::Validation` if the requester is not the host or the
    /// session is not in the lobby.
    pub fn start(
        &mut self,
        requester: Uuid,
        deck: &dyn DeckProvider,
        rng: &mut dyn DeterministicRng,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_host(requester)?;
        if self.status != SessionStatus::Lobby {
            return Err(DomainError::validation("the session has already started"));
        }

        while self.participants.len() < self.settings.max_participants {
            let seat = self.simulated_seats_filled;
            self.simulated_seats_filled += 1;
            self.participants
                .push(Participant::simulated(Uuid::new_v4(), seat));
        }

        self.status = SessionStatus::Active;
        self.begin_round(1, deck, rng, clock.now());
        Ok(())
    }

    /// Moves from results to the next round.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the requester is not the host,
    /// the session is completed, or the round is not in results.
    pub fn next_round(
        &mut self,
        requester: Uuid,
        deck: &dyn DeckProvider,
        rng: &mut dyn DeterministicRng,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        self.require_host(requester)?;
        if self.status == SessionStatus::Completed {
            return Err(DomainError::validation("the session is completed"));
        }
        self.require_phase(Phase::Results, "starting the next round")?;

        self.begin_round(self.round.number + 1, deck, rng, clock.now());
        Ok(())
    }

    fn begin_round(
        &mut self,
        number: u32,
        deck: &dyn DeckProvider,
        rng: &mut dyn DeterministicRng,
        now: DateTime<Utc>,
    ) {
        let previous: Vec<(Uuid, RoleType)> = self
            .participants
            .iter()
            .filter_map(|p| p.role.map(|role| (p.id, role)))
            .collect();
        for participant in &mut self.participants {
            participant.reset_for_round();
        }

        let ids: Vec<Uuid> = self.participants.iter().map(|p| p.id).collect();
        let rules = self.settings.deal_rules();
        for (id, role) in assign_roles(&ids, number, &previous, rng) {
            if let Some(participant) = self.participants.iter_mut().find(|p| p.id == id) {
                participant.role = Some(role);
                participant.hand = dealer::deal_hand(
                    deck,
                    role,
                    participant.kind,
                    rules,
                    &mut self.next_custom_card_id,
                    rng,
                );
            }
        }

        self.round = Round::starting(number, Phase::Selection, now);
        info!(session = %self.id, round = number, "round started");
    }

    // --- selection ---

    /// Records a participant's card pick.
    ///
    /// Picking the card that is already selected changes nothing. Supplying
    /// `custom_text` for a custom card writes it onto the card first.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside the selection phase, for a
    /// card that is not in the hand, or for a blank custom card without text.
    pub fn select_card(
        &mut self,
        participant_id: Uuid,
        card_id: CardId,
        custom_text: Option<&str>,
        clock: &dyn Clock,
    ) -> Result<Vec<FollowUp>, DomainError> {
        self.require_phase(Phase::Selection, "selecting a card")?;
        let index = self.human_index(participant_id)?;
        let participant = &self.participants[index];

        let Some(card) = participant.card(card_id) else {
            return Err(DomainError::Validation(format!(
                "card {card_id} is not in your hand"
            )));
        };
        if participant.selected_card_id == Some(card_id) {
            return Ok(Vec::new());
        }

        let written = match (card.is_custom, custom_text) {
            (true, Some(raw)) => Some(clean_text(
                "custom card text",
                raw,
                MAX_CUSTOM_CARD_CHARS,
            )?),
            (true, None) if card.text.trim().is_empty() => {
                return Err(DomainError::validation(
                    "write something on the custom card before selecting it",
                ));
            }
            _ => None,
        };

        let participant = &mut self.participants[index];
        if let (Some(text), Some(card)) = (written, participant.card_mut(card_id)) {
            card.text = text;
        }
        participant.selected_card_id = Some(card_id);
        debug!(session = %self.id, participant = %participant_id, card = %card_id, "card selected");

        Ok(self.after_selection_change(clock.now()))
    }

    /// Rewrites the text of a custom card that has not been selected.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside the selection phase, for a
    /// card that is not a custom card in the hand, or once it is selected.
    pub fn update_custom_card_text(
        &mut self,
        participant_id: Uuid,
        card_id: CardId,
        text: &str,
    ) -> Result<(), DomainError> {
        self.require_phase(Phase::Selection, "editing a card")?;
        let index = self.human_index(participant_id)?;
        let participant = &self.participants[index];

        let Some(card) = participant.card(card_id) else {
            return Err(DomainError::Validation(format!(
                "card {card_id} is not in your hand"
            )));
        };
        if !card.is_custom {
            return Err(DomainError::validation("only custom cards can be edited"));
        }
        if participant.selected_card_id == Some(card_id) {
            return Err(DomainError::validation(
                "a selected card can no longer be edited",
            ));
        }
        let text = clean_text("custom card text", text, MAX_CUSTOM_CARD_CHARS)?;

        if let Some(card) = self.participants[index].card_mut(card_id) {
            card.text = text;
        }
        Ok(())
    }

    /// Commits a simulated participant's card pick.
    pub fn commit_simulated_selection(
        &mut self,
        ticket: PhaseTicket,
        participant_id: Uuid,
        rng: &mut dyn DeterministicRng,
        clock: &dyn Clock,
    ) -> ContinuationOutcome {
        if !self.accepts(ticket) {
            return ContinuationOutcome::Stale;
        }
        self.round.pending.remove(&participant_id);

        if let Some(participant) = self
            .participants
            .iter_mut()
            .find(|p| p.id == participant_id && !p.is_human() && p.selected_card_id.is_none())
        {
            // A stand-in may hold a blank custom card; never pick it.
            let usable: Vec<CardId> = participant
                .hand
                .iter()
                .filter(|card| !card.text.trim().is_empty())
                .map(|card| card.id)
                .collect();
            if usable.is_empty() {
                warn!(session = %self.id, participant = %participant_id, "no usable card to select");
            } else {
                participant.selected_card_id = Some(usable[index_in(rng, 0, usable.len() - 1)]);
            }
        }

        ContinuationOutcome::Applied(self.after_selection_change(clock.now()))
    }

    fn after_selection_change(&mut self, now: DateTime<Utc>) -> Vec<FollowUp> {
        if self.participants.iter().all(|p| p.selected_card_id.is_some()) {
            self.finish_selection(now);
            return Vec::new();
        }
        if !self.humans().all(|p| p.selected_card_id.is_some()) {
            return Vec::new();
        }

        let ticket = self.round.ticket();
        self.claim_simulated(|p, _| p.selected_card_id.is_none())
            .into_iter()
            .map(|participant_id| FollowUp::SimulatedSelection {
                participant_id,
                ticket,
            })
            .collect()
    }

    fn finish_selection(&mut self, now: DateTime<Utc>) {
        self.round.narrative = narrative::assemble(&self.participants);
        self.round.submissions = narrative::seed_submissions(&self.participants);
        self.round.enter(Phase::Storytelling, now);
        info!(session = %self.id, round = self.round.number, "narrative assembled");
    }

    // --- storytelling ---

    /// Records a participant's moral.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside the storytelling phase or
    /// for an empty or overlong moral.
    pub fn submit_moral(
        &mut self,
        participant_id: Uuid,
        text: &str,
        clock: &dyn Clock,
    ) -> Result<Vec<FollowUp>, DomainError> {
        self.require_phase(Phase::Storytelling, "submitting a moral")?;
        let index = self.human_index(participant_id)?;
        let moral = clean_text("moral", text, MAX_MORAL_CHARS)?;

        let Some(submission) = self.round.submission_mut(participant_id) else {
            return Err(DomainError::validation("you have no submission this round"));
        };
        submission.moral = Some(moral.clone());
        self.participants[index].submitted_text = Some(moral);
        debug!(session = %self.id, participant = %participant_id, "moral submitted");

        Ok(self.after_moral_change(clock.now()))
    }

    /// Commits a moral produced for a simulated participant.
    pub fn commit_simulated_moral(
        &mut self,
        ticket: PhaseTicket,
        participant_id: Uuid,
        moral: String,
        clock: &dyn Clock,
    ) -> ContinuationOutcome {
        if !self.accepts(ticket) {
            return ContinuationOutcome::Stale;
        }
        self.round.pending.remove(&participant_id);

        if let Some(participant) = self
            .participants
            .iter_mut()
            .find(|p| p.id == participant_id && !p.is_human() && p.submitted_text.is_none())
        {
            if let Some(submission) = self.round.submission_mut(participant_id) {
                submission.moral = Some(moral.clone());
            }
            participant.submitted_text = Some(moral);
        }

        ContinuationOutcome::Applied(self.after_moral_change(clock.now()))
    }

    fn after_moral_change(&mut self, now: DateTime<Utc>) -> Vec<FollowUp> {
        if !self.humans().all(|p| p.submitted_text.is_some()) {
            return Vec::new();
        }

        let ticket = self.round.ticket();
        let claimed = self.claim_simulated(|p, _| p.submitted_text.is_none());
        if claimed.is_empty() && self.round.pending.is_empty() {
            self.finish_storytelling(now);
            return Vec::new();
        }

        claimed
            .into_iter()
            .map(|participant_id| FollowUp::SimulatedMoral {
                participant_id,
                ticket,
                narrative: self.round.narrative.clone(),
            })
            .collect()
    }

    fn finish_storytelling(&mut self, now: DateTime<Utc>) {
        let corrections = self.reconcile_morals();
        if corrections > 0 {
            warn!(session = %self.id, round = self.round.number, corrections, "morals reconciled before voting");
        }
        self.round.enter(Phase::Voting, now);
        info!(session = %self.id, round = self.round.number, "voting opened");
    }

    /// Makes every participant and every submission carry the same non-empty
    /// moral. Returns the number of corrections made.
    fn reconcile_morals(&mut self) -> usize {
        let fallback = fallback_moral(&self.round.narrative);
        let mut corrections = 0;

        for participant in &mut self.participants {
            let id = participant.id;
            if self.round.submission(id).is_none() {
                let Some(card_id) = participant.selected_card_id else {
                    warn!(session = %self.id, participant = %id, "participant has no selection to vote on");
                    continue;
                };
                warn!(session = %self.id, participant = %id, "missing submission recreated");
                self.round.submissions.push(Submission::new(id, card_id));
                corrections += 1;
            }
            let Some(submission) = self.round.submission_mut(id) else {
                continue;
            };

            match (participant.submitted_text.clone(), submission.moral.clone()) {
                (Some(text), Some(moral)) if text == moral => {}
                (Some(text), _) => {
                    warn!(session = %self.id, participant = %id, "submission moral out of sync");
                    submission.moral = Some(text);
                    corrections += 1;
                }
                (None, Some(moral)) => {
                    warn!(session = %self.id, participant = %id, "participant moral out of sync");
                    participant.submitted_text = Some(moral);
                    corrections += 1;
                }
                (None, None) => {
                    warn!(session = %self.id, participant = %id, "no moral, using fallback");
                    participant.submitted_text = Some(fallback.to_owned());
                    submission.moral = Some(fallback.to_owned());
                    corrections += 1;
                }
            }
        }

        corrections
    }

    // --- voting ---

    /// Records a vote from `voter_id` for `votee_id`'s moral.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` outside the voting phase, for a
    /// self-vote, a second vote, or a votee without a moral, and
    /// `DomainError::ParticipantNotFound` for an unknown voter or votee.
    pub fn cast_vote(
        &mut self,
        voter_id: Uuid,
        votee_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Vec<FollowUp>, DomainError> {
        self.require_phase(Phase::Voting, "voting")?;
        self.human_index(voter_id)?;
        if voter_id == votee_id {
            return Err(DomainError::validation("you cannot vote for your own moral"));
        }
        let votee = self
            .round
            .submission(votee_id)
            .ok_or(DomainError::ParticipantNotFound(votee_id))?;
        if votee.moral.is_none() {
            return Err(DomainError::validation(
                "that participant has no moral to vote for",
            ));
        }
        let voter = self
            .round
            .submission(voter_id)
            .ok_or_else(|| DomainError::validation("you have no submission this round"))?;
        if voter.has_voted {
            return Err(DomainError::validation("you have already voted this round"));
        }

        self.record_vote(voter_id, votee_id);
        Ok(self.after_vote_change(clock.now()))
    }

    /// Commits a weighted vote for a simulated participant.
    pub fn commit_simulated_vote(
        &mut self,
        ticket: PhaseTicket,
        participant_id: Uuid,
        rng: &mut dyn DeterministicRng,
        clock: &dyn Clock,
    ) -> ContinuationOutcome {
        if !self.accepts(ticket) {
            return ContinuationOutcome::Stale;
        }
        self.round.pending.remove(&participant_id);

        let may_vote = self
            .participant(participant_id)
            .is_some_and(|p| !p.is_human())
            && !self.round.has_voted(participant_id);
        if may_vote {
            let candidates: Vec<(Uuid, f64)> = self
                .round
                .submissions
                .iter()
                .filter(|s| s.participant_id != participant_id)
                .filter_map(|s| {
                    let moral = s.moral.as_ref()?;
                    let is_human = self
                        .participant(s.participant_id)
                        .is_some_and(Participant::is_human);
                    Some((
                        s.participant_id,
                        vote_weight(is_human, moral.chars().count(), s.votes),
                    ))
                })
                .collect();
            let weights: Vec<f64> = candidates.iter().map(|(_, weight)| *weight).collect();

            match choose_weighted(&weights, rng) {
                Some(choice) => {
                    let votee_id = candidates[choice].0;
                    self.record_vote(participant_id, votee_id);
                    debug!(session = %self.id, voter = %participant_id, votee = %votee_id, "simulated vote cast");
                }
                None => {
                    warn!(session = %self.id, participant = %participant_id, "no moral to vote for");
                }
            }
        }

        ContinuationOutcome::Applied(self.after_vote_change(clock.now()))
    }

    fn record_vote(&mut self, voter_id: Uuid, votee_id: Uuid) {
        if let Some(votee) = self.round.submission_mut(votee_id) {
            votee.votes += 1;
        }
        if let Some(voter) = self.round.submission_mut(voter_id) {
            voter.has_voted = true;
        }
    }

    /// Whether a participant has nothing left to do this voting phase.
    fn done_voting(round: &Round, participant: &Participant) -> bool {
        round.has_voted(participant.id) || !round.has_eligible_votee(participant.id)
    }

    fn after_vote_change(&mut self, now: DateTime<Utc>) -> Vec<FollowUp> {
        if self
            .participants
            .iter()
            .all(|p| Self::done_voting(&self.round, p))
        {
            self.resolve(now);
            return Vec::new();
        }
        if !self.humans().all(|p| Self::done_voting(&self.round, p)) {
            return Vec::new();
        }

        let ticket = self.round.ticket();
        self.claim_simulated(|p, round| !Self::done_voting(round, p))
            .into_iter()
            .map(|participant_id| FollowUp::SimulatedVote {
                participant_id,
                ticket,
            })
            .collect()
    }

    fn resolve(&mut self, now: DateTime<Utc>) {
        scoring::tally(&mut self.participants, &self.round.submissions);
        self.round.enter(Phase::Results, now);
        info!(
            session = %self.id,
            round = self.round.number,
            votes = self.round.total_votes(),
            "round resolved"
        );

        if scoring::is_final_round(self.round.number, self.settings.rounds_to_play) {
            self.status = SessionStatus::Completed;
            info!(session = %self.id, "session completed");
        }
    }

    /// Marks simulated participants that still need to act (and have no
    /// continuation in flight) as pending, returning their ids.
    fn claim_simulated(&mut self, needs_action: impl Fn(&Participant, &Round) -> bool) -> Vec<Uuid> {
        let claimed: Vec<Uuid> = self
            .participants
            .iter()
            .filter(|p| {
                !p.is_human() && !self.round.pending.contains(&p.id) && needs_action(p, &self.round)
            })
            .map(|p| p.id)
            .collect();
        self.round.pending.extend(claimed.iter().copied());
        claimed
    }

    // --- departures ---

    /// Handles a participant leaving or disconnecting.
    ///
    /// In the lobby the participant is removed. Once the game has started
    /// they are replaced by a simulated stand-in that keeps their score, role
    /// and round progress; if no human is left the session completes.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::ParticipantNotFound` for an unknown participant.
    pub fn leave(
        &mut self,
        participant_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Vec<FollowUp>, DomainError> {
        let index = self.index_of(participant_id)?;
        if !self.participants[index].is_human() {
            return Ok(Vec::new());
        }
        let was_host = self.participants[index].is_host;

        if self.status == SessionStatus::Lobby {
            self.participants.remove(index);
            info!(session = %self.id, participant = %participant_id, "participant left the lobby");
        } else {
            self.participants[index].convert_to_stand_in();
            info!(session = %self.id, participant = %participant_id, "participant replaced by stand-in");
        }
        if was_host {
            if let Some(next) = self.participants.iter_mut().find(|p| p.is_human()) {
                next.is_host = true;
                info!(session = %self.id, participant = %next.id, "host handed over");
            }
        }

        if self.status != SessionStatus::Active {
            return Ok(Vec::new());
        }
        let now = clock.now();
        if self.human_count() == 0 {
            self.status = SessionStatus::Completed;
            self.round.enter(Phase::Completed, now);
            info!(session = %self.id, "no humans left, session completed");
            return Ok(Vec::new());
        }

        Ok(match self.round.phase {
            Phase::Selection => self.after_selection_change(now),
            Phase::Storytelling => self.after_moral_change(now),
            Phase::Voting => self.after_vote_change(now),
            Phase::Waiting | Phase::Results | Phase::Completed => Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use fable_test_support::{FixedClock, InMemoryDeck, MockRng, SequenceRng};

    fn clock() -> FixedClock {
        FixedClock::standard()
    }

    fn settings(rounds_to_play: u32) -> SessionSettings {
        SessionSettings {
            rounds_to_play,
            ..SessionSettings::default()
        }
    }

    /// A started session with the given number of humans; the first is host.
    /// `SequenceRng` never rolls a custom card.
    fn started(humans: usize, rounds_to_play: u32) -> (GameSession, Vec<Uuid>) {
        let (mut session, host) =
            GameSession::create("ABCDEF".to_owned(), "Host", settings(rounds_to_play), &clock())
                .unwrap();
        let mut ids = vec![host];
        for n in 1..humans {
            ids.push(session.join(&format!("Player {n}")).unwrap());
        }
        session
            .start(host, &InMemoryDeck::default(), &mut SequenceRng::new(vec![]), &clock())
            .unwrap();
        (session, ids)
    }

    /// Commits deferred work immediately until none is left.
    fn settle(session: &mut GameSession, mut queue: Vec<FollowUp>) {
        while let Some(follow_up) = queue.pop() {
            let outcome = match follow_up {
                FollowUp::SimulatedSelection {
                    participant_id,
                    ticket,
                } => session.commit_simulated_selection(ticket, participant_id, &mut MockRng, &clock()),
                FollowUp::SimulatedMoral {
                    participant_id,
                    ticket,
                    ..
                } => session.commit_simulated_moral(
                    ticket,
                    participant_id,
                    "A simulated moral.".to_owned(),
                    &clock(),
                ),
                FollowUp::SimulatedVote {
                    participant_id,
                    ticket,
                } => session.commit_simulated_vote(ticket, participant_id, &mut MockRng, &clock()),
            };
            if let ContinuationOutcome::Applied(more) = outcome {
                queue.extend(more);
            }
        }
    }

    fn first_card(session: &GameSession, participant_id: Uuid) -> CardId {
        session.participant(participant_id).unwrap().hand[0].id
    }

    fn select_all(session: &mut GameSession, humans: &[Uuid]) {
        for id in humans {
            let card = first_card(session, *id);
            let follow_ups = session.select_card(*id, card, None, &clock()).unwrap();
            settle(session, follow_ups);
        }
    }

    fn submit_all(session: &mut GameSession, humans: &[Uuid]) {
        for id in humans {
            let follow_ups = session
                .submit_moral(*id, "Never trust a talking oven.", &clock())
                .unwrap();
            settle(session, follow_ups);
        }
    }

    // --- lobby ---

    #[test]
    fn test_create_puts_host_in_lobby() {
        let (session, host) =
            GameSession::create("ABCDEF".to_owned(), "  Ada ", settings(3), &clock()).unwrap();

        assert_eq!(session.status(), SessionStatus::Lobby);
        assert_eq!(session.round().phase, Phase::Waiting);
        assert_eq!(session.round().number, 0);
        assert_eq!(session.host_id(), Some(host));
        assert_eq!(session.participant(host).unwrap().name, "Ada");
        assert_eq!(session.created_at(), clock().0);
    }

    #[test]
    fn test_join_rejects_duplicate_names_and_full_sessions() {
        let (mut session, _) =
            GameSession::create("ABCDEF".to_owned(), "Ada", settings(3), &clock()).unwrap();

        assert!(matches!(
            session.join("ada"),
            Err(DomainError::Validation(_))
        ));
        for n in 0..4 {
            session.join(&format!("P{n}")).unwrap();
        }
        match session.join("Late").unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "the session is full"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_start_requires_host() {
        let (mut session, _) =
            GameSession::create("ABCDEF".to_owned(), "Ada", settings(3), &clock()).unwrap();
        let guest = session.join("Bob").unwrap();

        let result = session.start(guest, &InMemoryDeck::default(), &mut MockRng, &clock());

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "only the host can do that"),
            other => panic!("expected Validation, got {other:?}"),
        }
        assert_eq!(session.status(), SessionStatus::Lobby);
        assert_eq!(session.participants().len(), 2);
    }

    #[test]
    fn test_start_fills_seats_and_deals_every_role_once() {
        let (session, humans) = started(2, 3);

        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.round().number, 1);
        assert_eq!(session.round().phase, Phase::Selection);
        assert_eq!(session.participants().len(), 5);
        assert_eq!(session.human_count(), humans.len());

        let roles: BTreeSet<RoleType> =
            session.participants().iter().filter_map(|p| p.role).collect();
        assert_eq!(roles.len(), RoleType::COUNT);
        for participant in session.participants() {
            assert_eq!(participant.hand.len(), 3);
            assert!(participant.hand.iter().all(|c| Some(c.role) == participant.role));
        }
    }

    #[test]
    fn test_join_after_start_is_rejected() {
        let (mut session, _) = started(1, 3);
        assert!(matches!(
            session.join("Late"),
            Err(DomainError::Validation(_))
        ));
    }

    // --- selection ---

    #[test]
    fn test_select_card_not_in_hand_changes_nothing() {
        let (mut session, humans) = started(2, 3);

        let result = session.select_card(humans[0], CardId(9999), None, &clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(session.participant(humans[0]).unwrap().selected_card_id.is_none());
        assert!(session.round().pending.is_empty());
    }

    #[test]
    fn test_reselecting_the_same_card_is_a_no_op() {
        let (mut session, humans) = started(2, 3);
        let card = first_card(&session, humans[0]);

        session.select_card(humans[0], card, None, &clock()).unwrap();
        let follow_ups = session.select_card(humans[0], card, None, &clock()).unwrap();

        assert!(follow_ups.is_empty());
        assert_eq!(
            session.participant(humans[0]).unwrap().selected_card_id,
            Some(card)
        );
        assert_eq!(session.round().phase, Phase::Selection);
    }

    #[test]
    fn test_simulated_selection_waits_for_all_humans() {
        let (mut session, humans) = started(2, 3);

        let card = first_card(&session, humans[0]);
        let first = session.select_card(humans[0], card, None, &clock()).unwrap();
        assert!(first.is_empty());

        let card = first_card(&session, humans[1]);
        let second = session.select_card(humans[1], card, None, &clock()).unwrap();
        assert_eq!(second.len(), 3);
        assert!(second.iter().all(|f| matches!(
            f,
            FollowUp::SimulatedSelection { ticket, .. }
                if *ticket == PhaseTicket { round: 1, phase: Phase::Selection }
        )));

        settle(&mut session, second);

        assert_eq!(session.round().phase, Phase::Storytelling);
        assert_eq!(session.round().submissions.len(), 5);
        for participant in session.participants() {
            let text = &participant.selected_card().unwrap().text;
            assert!(session.round().narrative.contains(text.as_str()));
        }
    }

    #[test]
    fn test_changing_selection_does_not_reschedule_pending_work() {
        let (mut session, humans) = started(1, 3);
        let hand: Vec<CardId> = session.participant(humans[0]).unwrap().hand.iter().map(|c| c.id).collect();

        let scheduled = session.select_card(humans[0], hand[0], None, &clock()).unwrap();
        let rescheduled = session.select_card(humans[0], hand[1], None, &clock()).unwrap();

        assert_eq!(scheduled.len(), 4);
        assert!(rescheduled.is_empty());
    }

    #[test]
    fn test_stale_selection_commit_is_ignored() {
        let (mut session, humans) = started(1, 3);
        let card = first_card(&session, humans[0]);
        let follow_ups = session.select_card(humans[0], card, None, &clock()).unwrap();
        let stale = follow_ups.clone();
        settle(&mut session, follow_ups);
        assert_eq!(session.round().phase, Phase::Storytelling);

        let FollowUp::SimulatedSelection {
            participant_id,
            ticket,
        } = stale[0].clone()
        else {
            panic!("expected a simulated selection");
        };
        let outcome =
            session.commit_simulated_selection(ticket, participant_id, &mut MockRng, &clock());

        assert_eq!(outcome, ContinuationOutcome::Stale);
        assert_eq!(session.round().phase, Phase::Storytelling);
    }

    #[test]
    fn test_custom_card_needs_text_and_locks_once_selected() {
        let (mut session, host) =
            GameSession::create("ABCDEF".to_owned(), "Ada", settings(1), &clock()).unwrap();
        // MockRng rolls 0.0, so the human is always dealt a blank in slot 0.
        session
            .start(host, &InMemoryDeck::default(), &mut MockRng, &clock())
            .unwrap();
        let custom = session.participant(host).unwrap().hand[0].clone();
        assert!(custom.is_custom);

        let blank = session.select_card(host, custom.id, None, &clock());
        assert!(matches!(blank, Err(DomainError::Validation(_))));

        session
            .update_custom_card_text(host, custom.id, "a haunted laundromat")
            .unwrap();
        session.select_card(host, custom.id, None, &clock()).unwrap();

        let locked = session.update_custom_card_text(host, custom.id, "changed my mind");
        assert!(matches!(locked, Err(DomainError::Validation(_))));
        assert_eq!(
            session.participant(host).unwrap().selected_card().unwrap().text,
            "a haunted laundromat"
        );
    }

    #[test]
    fn test_select_custom_card_with_text_overwrites_it() {
        let (mut session, host) =
            GameSession::create("ABCDEF".to_owned(), "Ada", settings(1), &clock()).unwrap();
        session
            .start(host, &InMemoryDeck::default(), &mut MockRng, &clock())
            .unwrap();
        let custom_id = session.participant(host).unwrap().hand[0].id;

        let follow_ups = session
            .select_card(host, custom_id, Some("  a moon base "), &clock())
            .unwrap();
        settle(&mut session, follow_ups);

        assert_eq!(session.round().phase, Phase::Storytelling);
        assert!(session.round().narrative.contains("a moon base"));
    }

    #[test]
    fn test_update_rejects_regular_cards() {
        let (mut session, humans) = started(1, 3);
        let card = first_card(&session, humans[0]);

        let result = session.update_custom_card_text(humans[0], card, "new text");

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "only custom cards can be edited"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    // --- storytelling ---

    #[test]
    fn test_submit_moral_outside_storytelling_is_rejected() {
        let (mut session, humans) = started(1, 3);

        let result = session.submit_moral(humans[0], "Too early.", &clock());

        match result.unwrap_err() {
            DomainError::Validation(msg) => {
                assert_eq!(msg, "submitting a moral is only allowed during the storytelling phase");
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn test_morals_requested_for_simulated_participants_after_humans() {
        let (mut session, humans) = started(2, 3);
        select_all(&mut session, &humans);

        let first = session.submit_moral(humans[0], "One.", &clock()).unwrap();
        let second = session.submit_moral(humans[1], "Two.", &clock()).unwrap();

        assert!(first.is_empty());
        assert_eq!(second.len(), 3);
        for follow_up in &second {
            match follow_up {
                FollowUp::SimulatedMoral { narrative, .. } => {
                    assert_eq!(narrative, &session.round().narrative);
                }
                other => panic!("expected SimulatedMoral, got {other:?}"),
            }
        }

        settle(&mut session, second);

        assert_eq!(session.round().phase, Phase::Voting);
        assert!(session.round().submissions.iter().all(|s| s.moral.is_some()));
        assert!(session.participants().iter().all(|p| p.submitted_text.is_some()));
    }

    #[test]
    fn test_reconcile_fills_gaps_and_resyncs() {
        let (mut session, humans) = started(1, 3);
        select_all(&mut session, &humans);
        let ids: Vec<Uuid> = session.participants().iter().map(|p| p.id).collect();

        session.participants[0].submitted_text = Some("Kept.".to_owned());
        session.round.submission_mut(ids[1]).unwrap().moral = Some("Restored.".to_owned());

        let corrections = session.reconcile_morals();

        let fallback = fallback_moral(&session.round().narrative);
        assert_eq!(corrections, 5);
        assert_eq!(
            session.round().submission(ids[0]).unwrap().moral.as_deref(),
            Some("Kept.")
        );
        assert_eq!(
            session.participants[1].submitted_text.as_deref(),
            Some("Restored.")
        );
        for id in &ids[2..] {
            assert_eq!(session.round().submission(*id).unwrap().moral.as_deref(), Some(fallback));
        }
    }

    // --- voting ---

    fn at_voting(humans: usize, rounds_to_play: u32) -> (GameSession, Vec<Uuid>) {
        let (mut session, ids) = started(humans, rounds_to_play);
        select_all(&mut session, &ids);
        submit_all(&mut session, &ids);
        assert_eq!(session.round().phase, Phase::Voting);
        (session, ids)
    }

    #[test]
    fn test_self_vote_is_rejected_without_mutation() {
        let (mut session, humans) = at_voting(2, 3);

        let result = session.cast_vote(humans[0], humans[0], &clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(session.round().total_votes(), 0);
        assert!(!session.round().has_voted(humans[0]));
    }

    #[test]
    fn test_duplicate_vote_is_rejected_without_mutation() {
        let (mut session, humans) = at_voting(2, 3);
        session.cast_vote(humans[0], humans[1], &clock()).unwrap();

        let result = session.cast_vote(humans[0], humans[1], &clock());

        match result.unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "you have already voted this round"),
            other => panic!("expected Validation, got {other:?}"),
        }
        assert_eq!(session.round().submission(humans[1]).unwrap().votes, 1);
    }

    #[test]
    fn test_vote_for_unknown_participant_is_not_found() {
        let (mut session, humans) = at_voting(1, 3);
        let stranger = Uuid::new_v4();

        let result = session.cast_vote(humans[0], stranger, &clock());

        match result.unwrap_err() {
            DomainError::ParticipantNotFound(id) => assert_eq!(id, stranger),
            other => panic!("expected ParticipantNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_vote_for_participant_without_moral_is_rejected() {
        let (mut session, humans) = at_voting(2, 3);
        session.round.submission_mut(humans[1]).unwrap().moral = None;

        let result = session.cast_vote(humans[0], humans[1], &clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(session.round().total_votes(), 0);
    }

    #[test]
    fn test_vote_status_lives_on_the_voters_submission() {
        let (mut session, humans) = at_voting(2, 3);

        session.cast_vote(humans[0], humans[1], &clock()).unwrap();

        let voter = session.round().submission(humans[0]).unwrap();
        let votee = session.round().submission(humans[1]).unwrap();
        assert!(voter.has_voted);
        assert_eq!(voter.votes, 0);
        assert!(!votee.has_voted);
        assert_eq!(votee.votes, 1);
    }

    #[test]
    fn test_round_resolves_once_every_vote_lands() {
        let (mut session, humans) = at_voting(2, 3);

        let first = session.cast_vote(humans[0], humans[1], &clock()).unwrap();
        assert!(first.is_empty());
        let second = session.cast_vote(humans[1], humans[0], &clock()).unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(session.round().phase, Phase::Voting);

        settle(&mut session, second);

        assert_eq!(session.round().phase, Phase::Results);
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.round().total_votes(), 5);
        assert_eq!(session.round().voters(), 5);
        let scores: u32 = session.participants().iter().map(|p| p.score).sum();
        assert_eq!(scores, 5);
    }

    #[test]
    fn test_every_simulated_participant_votes_once() {
        let (mut session, humans) = at_voting(1, 3);
        let votee = session.participants()[1].id;
        let follow_ups = session.cast_vote(humans[0], votee, &clock()).unwrap();

        settle(&mut session, follow_ups);

        for submission in &session.round().submissions {
            if submission.participant_id != humans[0] {
                assert!(submission.has_voted);
            }
        }
        assert_eq!(session.round().total_votes(), 5);
    }

    // --- rounds ---

    fn play_round(session: &mut GameSession, humans: &[Uuid]) {
        select_all(session, humans);
        submit_all(session, humans);
        for (index, voter) in humans.iter().enumerate() {
            let votee = session
                .participants()
                .iter()
                .map(|p| p.id)
                .find(|id| id != voter)
                .unwrap();
            let follow_ups = session.cast_vote(*voter, votee, &clock()).unwrap();
            if index + 1 == humans.len() {
                settle(session, follow_ups);
            }
        }
        assert_eq!(session.round().phase, Phase::Results);
    }

    #[test]
    fn test_next_round_rotates_roles_and_redeals() {
        let (mut session, humans) = started(2, 3);
        let first_roles: Vec<Option<RoleType>> =
            session.participants().iter().map(|p| p.role).collect();
        play_round(&mut session, &humans);

        session
            .next_round(humans[0], &InMemoryDeck::default(), &mut SequenceRng::new(vec![]), &clock())
            .unwrap();

        assert_eq!(session.round().number, 2);
        assert_eq!(session.round().phase, Phase::Selection);
        assert!(session.round().submissions.is_empty());
        assert!(session.round().narrative.is_empty());
        let second_roles: Vec<Option<RoleType>> =
            session.participants().iter().map(|p| p.role).collect();
        assert_ne!(first_roles, second_roles);
        for participant in session.participants() {
            assert_eq!(participant.hand.len(), 3);
            assert!(participant.selected_card_id.is_none());
            assert!(participant.submitted_text.is_none());
        }
    }

    #[test]
    fn test_next_round_outside_results_is_rejected() {
        let (mut session, humans) = started(1, 3);

        let result = session.next_round(humans[0], &InMemoryDeck::default(), &mut MockRng, &clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(session.round().number, 1);
    }

    #[test]
    fn test_final_round_completes_session_and_blocks_next_round() {
        let (mut session, humans) = started(1, 1);
        play_round(&mut session, &humans);

        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.round().phase, Phase::Results);

        let result = session.next_round(humans[0], &InMemoryDeck::default(), &mut MockRng, &clock());
        match result.unwrap_err() {
            DomainError::Validation(msg) => assert_eq!(msg, "the session is completed"),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    // --- departures ---

    #[test]
    fn test_leaving_the_lobby_removes_and_hands_over_host() {
        let (mut session, host) =
            GameSession::create("ABCDEF".to_owned(), "Ada", settings(3), &clock()).unwrap();
        let guest = session.join("Bob").unwrap();

        session.leave(host, &clock()).unwrap();

        assert_eq!(session.participants().len(), 1);
        assert_eq!(session.host_id(), Some(guest));
    }

    #[test]
    fn test_disconnect_after_selecting_keeps_selection_on_stand_in() {
        let (mut session, humans) = started(3, 3);
        let leaver = humans[2];
        let card = first_card(&session, leaver);
        session.select_card(leaver, card, None, &clock()).unwrap();
        let role = session.participant(leaver).unwrap().role;

        let follow_ups = session.leave(leaver, &clock()).unwrap();

        assert!(follow_ups.is_empty());
        let stand_in = session.participant(leaver).unwrap();
        assert!(!stand_in.is_human());
        assert_eq!(stand_in.role, role);
        assert_eq!(stand_in.selected_card_id, Some(card));
        assert_eq!(session.round().phase, Phase::Selection);
        assert_eq!(session.status(), SessionStatus::Active);

        select_all(&mut session, &humans[..2]);
        assert_eq!(session.round().phase, Phase::Storytelling);
        assert_eq!(
            session.round().submission(leaver).unwrap().card_id,
            card
        );
    }

    #[test]
    fn test_last_missing_human_leaving_triggers_simulated_work() {
        let (mut session, humans) = started(2, 3);
        let card = first_card(&session, humans[0]);
        session.select_card(humans[0], card, None, &clock()).unwrap();

        let follow_ups = session.leave(humans[1], &clock()).unwrap();

        assert_eq!(follow_ups.len(), 4);
        assert!(follow_ups.iter().any(|f| matches!(
            f,
            FollowUp::SimulatedSelection { participant_id, .. } if *participant_id == humans[1]
        )));
    }

    #[test]
    fn test_host_leaving_mid_game_hands_over_host() {
        let (mut session, humans) = started(2, 3);

        session.leave(humans[0], &clock()).unwrap();

        assert_eq!(session.host_id(), Some(humans[1]));
    }

    #[test]
    fn test_last_human_leaving_completes_session() {
        let (mut session, humans) = started(1, 3);

        session.leave(humans[0], &clock()).unwrap();

        assert_eq!(session.status(), SessionStatus::Completed);
        assert_eq!(session.round().phase, Phase::Completed);
        assert_eq!(session.human_count(), 0);
    }

    #[test]
    fn test_actions_for_stand_ins_are_rejected() {
        let (mut session, humans) = started(2, 3);
        session.leave(humans[1], &clock()).unwrap();
        let card = first_card(&session, humans[1]);

        let result = session.select_card(humans[1], card, None, &clock());

        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
