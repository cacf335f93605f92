//! Room state machine and the per-room actor that owns it.
//!
//! A room moves `Waiting -> Countdown -> Active -> Finished` and back to
//! `Waiting` on an explicit host reset. Each room runs as its own task that
//! drains a mailbox of `RoomCommand`s alongside the events of its
//! `MatchClock`, so all mutations of one room happen in sequence while
//! different rooms proceed independently.

use crate::aggregator;
use crate::clock::{ClockEvent, MatchClock};
use crate::config::RoomConfig;
use crate::dispatcher::{fan_out, Outbox};
use crate::error::{CoordinatorError, Result};
use crate::passage::PassageProvider;
use crate::registry::RoomRegistry;
use crate::store::{CompetitionRecord, RoomStore};
use log::{debug, info, warn};
use shared::{
    now_millis, ConnectionId, GameState, ParticipantView, RoomSettings, RoomView, ServerEvent,
    SettingsPatch, SubmittedResult, User,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// Collaborators and timing shared by every room.
#[derive(Clone)]
pub struct RoomContext {
    pub config: RoomConfig,
    pub store: Arc<dyn RoomStore>,
    pub passages: Arc<dyn PassageProvider>,
}

/// A connection's seat in a room.
#[derive(Debug)]
pub struct Participant {
    pub user: User,
    pub connection_id: ConnectionId,
    pub outbox: Outbox,
    pub is_ready: bool,
    pub progress: f64,
    pub current_wpm: u32,
    pub current_accuracy: f64,
    /// Order of arrival in the room.
    pub joined_seq: u64,
    /// Present when the current race started; late joiners only watch.
    pub entrant: bool,
}

impl Participant {
    pub fn new(user: User, connection_id: ConnectionId, outbox: Outbox, joined_seq: u64) -> Self {
        Self {
            user,
            connection_id,
            outbox,
            is_ready: false,
            progress: 0.0,
            current_wpm: 0,
            current_accuracy: 0.0,
            joined_seq,
            entrant: false,
        }
    }

    fn reset_live_stats(&mut self) {
        self.progress = 0.0;
        self.current_wpm = 0;
        self.current_accuracy = 0.0;
    }

    pub fn view(&self) -> ParticipantView {
        ParticipantView {
            user: self.user.clone(),
            connection_id: self.connection_id,
            is_ready: self.is_ready,
            progress: self.progress,
            current_wpm: self.current_wpm,
            current_accuracy: self.current_accuracy,
        }
    }
}

/// What a departure left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    Remaining(usize),
    Empty,
}

pub struct Room {
    code: String,
    host: User,
    participants: HashMap<ConnectionId, Participant>,
    settings: RoomSettings,
    game_state: GameState,
    passage: String,
    results: HashMap<ConnectionId, SubmittedResult>,
    start_time: Option<u64>,
    next_join_seq: u64,
    clock: MatchClock,
    store: Arc<dyn RoomStore>,
    passages: Arc<dyn PassageProvider>,
}

impl Room {
    /// Creates an empty room hosted by `host`. The receiver yields the
    /// room's clock events and must be fed back through `on_clock`.
    pub fn new(
        code: impl Into<String>,
        host: User,
        ctx: RoomContext,
    ) -> (Self, mpsc::UnboundedReceiver<ClockEvent>) {
        let (clock, clock_events) = MatchClock::new(ctx.config);
        let room = Self {
            code: code.into(),
            host,
            participants: HashMap::new(),
            settings: RoomSettings::default(),
            game_state: GameState::Waiting,
            passage: String::new(),
            results: HashMap::new(),
            start_time: None,
            next_join_seq: 0,
            clock,
            store: ctx.store,
            passages: ctx.passages,
        };
        (room, clock_events)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn host(&self) -> &User {
        &self.host
    }

    pub fn settings(&self) -> RoomSettings {
        self.settings
    }

    pub fn game_state(&self) -> GameState {
        self.game_state
    }

    pub fn passage(&self) -> &str {
        &self.passage
    }

    pub fn participant(&self, connection_id: ConnectionId) -> Option<&Participant> {
        self.participants.get(&connection_id)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn result_count(&self) -> usize {
        self.results.len()
    }

    /// Participants in join order.
    fn roster(&self) -> Vec<&Participant> {
        let mut roster: Vec<&Participant> = self.participants.values().collect();
        roster.sort_by_key(|p| p.joined_seq);
        roster
    }

    fn roster_views(&self) -> Vec<ParticipantView> {
        self.roster().into_iter().map(Participant::view).collect()
    }

    pub fn view(&self) -> RoomView {
        RoomView {
            code: self.code.clone(),
            host: self.host.clone(),
            participants: self.roster_views(),
            settings: self.settings,
            game_state: self.game_state,
            passage: self.passage.clone(),
            start_time: self.start_time,
        }
    }

    fn is_host(&self, connection_id: ConnectionId) -> bool {
        self.participants
            .get(&connection_id)
            .map_or(false, |p| p.user.id == self.host.id)
    }

    fn is_racing(&self, connection_id: ConnectionId) -> bool {
        self.game_state == GameState::Active
            && self
                .participants
                .get(&connection_id)
                .map_or(false, |p| p.entrant)
    }

    fn broadcast(&self, event: ServerEvent) {
        fan_out(self.participants.values().map(|p| &p.outbox), &event);
    }

    fn broadcast_roster(&self) {
        self.broadcast(ServerEvent::RoomUpdated {
            participants: self.roster_views(),
            settings: self.settings,
            game_state: self.game_state,
            host: self.host.clone(),
        });
    }

    /// Seats a connection, sends it `joined-room` and then tells the room.
    ///
    /// The snapshot is queued ahead of anything the room broadcasts later.
    /// Joining mid-race is allowed; the newcomer watches until the next race.
    pub fn join(&mut self, connection_id: ConnectionId, user: User, outbox: Outbox) -> RoomView {
        if !self.participants.contains_key(&connection_id) {
            info!("{} ({}) joined room {}", user.name, connection_id, self.code);
            let seq = self.next_join_seq;
            self.next_join_seq += 1;
            self.participants
                .insert(connection_id, Participant::new(user, connection_id, outbox, seq));
        }

        let view = self.view();
        if let Some(joiner) = self.participants.get(&connection_id) {
            joiner.outbox.deliver(ServerEvent::JoinedRoom {
                room_code: self.code.clone(),
                room: view.clone(),
            });
        }
        self.broadcast_roster();
        view
    }

    pub fn leave(&mut self, connection_id: ConnectionId) -> Departure {
        let Some(departed) = self.participants.remove(&connection_id) else {
            return if self.is_empty() {
                Departure::Empty
            } else {
                Departure::Remaining(self.len())
            };
        };
        self.results.remove(&connection_id);
        info!("{} ({}) left room {}", departed.user.name, connection_id, self.code);

        if self.participants.is_empty() {
            return Departure::Empty;
        }

        let host_still_present = self
            .participants
            .values()
            .any(|p| p.user.id == self.host.id);
        if departed.user.id == self.host.id && !host_still_present {
            let next_host = self.roster().first().map(|p| p.user.clone());
            if let Some(next_host) = next_host {
                info!("New host for room {}: {}", self.code, next_host.name);
                self.host = next_host;
            }
        }

        self.broadcast_roster();

        if self.game_state == GameState::Active && self.race_complete() {
            self.finalize();
        }

        Departure::Remaining(self.len())
    }

    pub fn toggle_ready(&mut self, connection_id: ConnectionId) {
        let Some(participant) = self.participants.get_mut(&connection_id) else {
            return;
        };
        participant.is_ready = !participant.is_ready;
        self.broadcast_roster();
    }

    pub fn update_settings(&mut self, connection_id: ConnectionId, patch: &SettingsPatch) {
        if !self.is_host(connection_id) {
            debug!("Ignoring settings change from non-host {} in {}", connection_id, self.code);
            return;
        }
        if self.game_state != GameState::Waiting {
            debug!("Ignoring settings change in {} while {:?}", self.code, self.game_state);
            return;
        }

        self.settings.apply(patch);
        self.broadcast(ServerEvent::SettingsUpdated {
            settings: self.settings,
        });
    }

    /// Begins a race. A blank passage is replaced by one from the provider.
    pub fn start_game(&mut self, connection_id: ConnectionId, passage: Option<String>) {
        if !self.is_host(connection_id) {
            debug!("Ignoring start from non-host {} in {}", connection_id, self.code);
            return;
        }
        if !matches!(self.game_state, GameState::Waiting | GameState::Finished) {
            debug!("Ignoring start in {} while {:?}", self.code, self.game_state);
            return;
        }

        let passage = match passage {
            Some(text) if !text.trim().is_empty() => text,
            _ => self.passages.passage(self.settings.passage_type),
        };

        self.game_state = GameState::Countdown;
        self.passage = passage;
        self.results.clear();
        self.start_time = None;
        for participant in self.participants.values_mut() {
            participant.entrant = true;
            participant.reset_live_stats();
        }

        info!(
            "Room {} starting a {}s race with {} entrants",
            self.code,
            self.settings.time_limit.as_secs(),
            self.participants.len()
        );
        self.broadcast(ServerEvent::GameStarting {
            passage: self.passage.clone(),
        });
        self.clock.start_countdown();
    }

    pub fn on_clock(&mut self, event: ClockEvent) {
        if !self.clock.is_current(&event) {
            debug!("Dropping stale clock event {:?} in {}", event, self.code);
            return;
        }

        match event {
            ClockEvent::Countdown { n, .. } => {
                if self.game_state != GameState::Countdown {
                    return;
                }
                self.broadcast(ServerEvent::Countdown { n });
                if n == 0 {
                    self.activate();
                }
            }
            ClockEvent::Deadline { .. } => {
                if self.game_state == GameState::Active {
                    info!("Time is up in room {}, forcing finish", self.code);
                    self.finalize();
                }
            }
        }
    }

    fn activate(&mut self) {
        let start_time = now_millis();
        self.game_state = GameState::Active;
        self.start_time = Some(start_time);

        self.broadcast(ServerEvent::GameStarted {
            start_time,
            time_limit: self.settings.time_limit,
        });
        self.clock.schedule_deadline(self.settings.time_limit.duration());

        // Every entrant may have left during the countdown.
        if self.race_complete() {
            self.finalize();
        }
    }

    pub fn progress_update(
        &mut self,
        connection_id: ConnectionId,
        progress: f64,
        wpm: u32,
        accuracy: f64,
    ) {
        if !self.is_racing(connection_id) {
            return;
        }
        let Some(participant) = self.participants.get_mut(&connection_id) else {
            return;
        };
        participant.progress = progress;
        participant.current_wpm = wpm;
        participant.current_accuracy = accuracy;

        let user_id = participant.user.id.clone();
        self.broadcast(ServerEvent::LiveUpdate {
            user_id,
            progress,
            wpm,
            accuracy,
        });
    }

    pub fn submit_result(&mut self, connection_id: ConnectionId, result: SubmittedResult) {
        if !self.is_racing(connection_id) {
            debug!("Ignoring result from {} in {}", connection_id, self.code);
            return;
        }
        self.results.insert(connection_id, result);

        if self.race_complete() {
            self.finalize();
        }
    }

    fn entrants(&self) -> Vec<&Participant> {
        self.roster().into_iter().filter(|p| p.entrant).collect()
    }

    fn race_complete(&self) -> bool {
        aggregator::all_submitted(self.entrants(), &self.results)
    }

    /// Ranks the race and announces the standings.
    ///
    /// Only acts on an active race, so a second trigger for the same race
    /// does nothing. Returns whether standings were published.
    pub fn finalize(&mut self) -> bool {
        if self.game_state != GameState::Active {
            return false;
        }

        let completed_at = now_millis();
        let results = aggregator::standings(self.entrants(), &self.results, completed_at);
        let winner = results.first().cloned();

        self.game_state = GameState::Finished;
        self.clock.cancel();

        match &winner {
            Some(w) => info!("Room {} finished, winner {} at {} wpm", self.code, w.name, w.wpm),
            None => info!("Room {} finished with no entrants left", self.code),
        }

        let record = CompetitionRecord {
            room_code: self.code.clone(),
            passage: self.passage.clone(),
            time_limit: self.settings.time_limit,
            passage_type: self.settings.passage_type,
            started_at: self.start_time,
            completed_at,
            winner_id: winner.as_ref().map(|w| w.user_id.clone()),
            results: results.clone(),
        };

        self.broadcast(ServerEvent::GameFinished { results, winner });
        self.persist(record);
        true
    }

    fn persist(&self, record: CompetitionRecord) {
        if record.results.is_empty() {
            debug!("Nothing to save for room {}", self.code);
            return;
        }

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let room_code = record.room_code.clone();
            if let Err(e) = store.save_competition(record).await {
                warn!("Failed to save results for room {}: {}", room_code, e);
            }
        });
    }

    pub fn reset(&mut self, connection_id: ConnectionId) {
        if !self.is_host(connection_id) {
            debug!("Ignoring reset from non-host {} in {}", connection_id, self.code);
            return;
        }

        self.clock.cancel();
        self.game_state = GameState::Waiting;
        self.passage.clear();
        self.results.clear();
        self.start_time = None;
        for participant in self.participants.values_mut() {
            participant.is_ready = false;
            participant.entrant = false;
            participant.reset_live_stats();
        }

        info!("Room {} reset", self.code);
        self.broadcast(ServerEvent::RoomReset {
            participants: self.roster_views(),
            settings: self.settings,
            game_state: self.game_state,
        });
    }

    /// Stops every timer. Called when the room is torn down.
    pub fn shutdown(&mut self) {
        self.clock.cancel();
    }
}

/// Work queued for a room actor.
pub enum RoomCommand {
    Join {
        connection_id: ConnectionId,
        user: User,
        outbox: Outbox,
        reply: oneshot::Sender<RoomView>,
    },
    Leave {
        connection_id: ConnectionId,
    },
    ToggleReady {
        connection_id: ConnectionId,
    },
    UpdateSettings {
        connection_id: ConnectionId,
        patch: SettingsPatch,
    },
    StartGame {
        connection_id: ConnectionId,
        passage: Option<String>,
    },
    Progress {
        connection_id: ConnectionId,
        progress: f64,
        wpm: u32,
        accuracy: f64,
    },
    SubmitResult {
        connection_id: ConnectionId,
        result: SubmittedResult,
    },
    Reset {
        connection_id: ConnectionId,
    },
}

/// Cloneable address of a running room.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    id: u64,
    code: String,
    mailbox: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    /// Instance id, distinct for every room ever spawned by a registry.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn send(&self, command: RoomCommand) -> Result<()> {
        self.mailbox
            .send(command)
            .map_err(|_| CoordinatorError::RoomClosed(self.code.clone()))
    }

    /// Seats a connection and waits for the room to acknowledge it. The
    /// room itself sends the `joined-room` snapshot; the returned view is a
    /// copy of it.
    ///
    /// Fails with `RoomClosed` when the room shut down first; callers should
    /// look the code up again.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        user: User,
        outbox: Outbox,
    ) -> Result<RoomView> {
        let (reply, response) = oneshot::channel();
        self.send(RoomCommand::Join {
            connection_id,
            user,
            outbox,
            reply,
        })?;
        response
            .await
            .map_err(|_| CoordinatorError::RoomClosed(self.code.clone()))
    }
}

/// Starts the actor for a new room and returns its handle.
pub(crate) fn spawn(
    id: u64,
    code: String,
    host: User,
    ctx: RoomContext,
    registry: RoomRegistry,
) -> RoomHandle {
    let (mailbox, commands) = mpsc::unbounded_channel();
    let (room, clock_events) = Room::new(code.clone(), host, ctx);

    tokio::spawn(run_room(id, room, commands, clock_events, registry));

    RoomHandle { id, code, mailbox }
}

async fn run_room(
    id: u64,
    mut room: Room,
    mut commands: mpsc::UnboundedReceiver<RoomCommand>,
    mut clock_events: mpsc::UnboundedReceiver<ClockEvent>,
    registry: RoomRegistry,
) {
    debug!("Room {} (#{}) started", room.code(), id);

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                if apply(&mut room, command) == Some(Departure::Empty) {
                    break;
                }
            }
            Some(event) = clock_events.recv() => {
                room.on_clock(event);
            }
        }
    }

    registry.remove(room.code(), id);
    room.shutdown();

    // Anything queued before removal is refused; joiners retry elsewhere.
    commands.close();
    while let Some(command) = commands.recv().await {
        if let RoomCommand::Join { connection_id, .. } = command {
            debug!("Turning away {} from closed room {}", connection_id, room.code());
        }
    }

    info!("Room {} closed", room.code());
}

fn apply(room: &mut Room, command: RoomCommand) -> Option<Departure> {
    match command {
        RoomCommand::Join {
            connection_id,
            user,
            outbox,
            reply,
        } => {
            let view = room.join(connection_id, user, outbox);
            if reply.send(view).is_err() {
                // The joiner went away while queued.
                return Some(room.leave(connection_id));
            }
        }
        RoomCommand::Leave { connection_id } => return Some(room.leave(connection_id)),
        RoomCommand::ToggleReady { connection_id } => room.toggle_ready(connection_id),
        RoomCommand::UpdateSettings {
            connection_id,
            patch,
        } => room.update_settings(connection_id, &patch),
        RoomCommand::StartGame {
            connection_id,
            passage,
        } => room.start_game(connection_id, passage),
        RoomCommand::Progress {
            connection_id,
            progress,
            wpm,
            accuracy,
        } => room.progress_update(connection_id, progress, wpm, accuracy),
        RoomCommand::SubmitResult {
            connection_id,
            result,
        } => room.submit_result(connection_id, result),
        RoomCommand::Reset { connection_id } => room.reset(connection_id),
    }
    None
}
