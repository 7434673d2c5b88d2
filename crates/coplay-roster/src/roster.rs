//! The player roster as plain data.
//!
//! [`Roster`] holds no channels and spawns nothing; the actor in
//! [`crate::actor`] owns one and feeds it commands one at a time, which is
//! what keeps concurrent player messages and membership snapshots from
//! interleaving.

use coplay_protocol::messages::Player;
use coplay_transport::ParticipantId;

use crate::{MembershipSnapshot, RosterConfig, SeatAssignment, assign_seats};

/// A read-only copy of the roster, published after every change.
#[derive(Debug, Clone, Default)]
pub struct RosterView {
    /// Players in first-seen order, at most one per id.
    pub players: Vec<Player>,
    /// The record describing this device, if known.
    pub local_player: Option<Player>,
    /// Seats from the latest membership snapshot.
    pub seats: SeatAssignment,
}

impl RosterView {
    /// Looks up a player by id.
    pub fn player(&self, id: ParticipantId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }
}

/// The mutable roster state.
#[derive(Debug, Default)]
pub struct Roster {
    players: Vec<Player>,
    local_player: Option<Player>,
    seats: SeatAssignment,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Players in first-seen order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// The record describing this device.
    pub fn local_player(&self) -> Option<&Player> {
        self.local_player.as_ref()
    }

    /// Seats from the latest snapshot.
    pub fn seats(&self) -> &SeatAssignment {
        &self.seats
    }

    /// Upserts `player` by id.
    ///
    /// An existing record is replaced where it stands; a new one is
    /// appended. If it describes the local player, the local record is
    /// replaced too.
    pub fn apply_player(&mut self, player: Player) {
        let is_local = self
            .local_player
            .as_ref()
            .is_some_and(|local| local.id == player.id);
        if is_local {
            self.local_player = Some(player.clone());
        }

        match self.players.iter_mut().find(|p| p.id == player.id) {
            Some(existing) => *existing = player,
            None => self.players.push(player),
        }
    }

    /// Re-seats everyone from a membership snapshot.
    ///
    /// The local record gets the local seat. If the roster has no local
    /// record yet, one is adopted from the player list (when a record for
    /// the local id exists) or created as `Player{seat}`. A local record
    /// made before joining keeps its name and flags and moves to the
    /// session's local id. Remote records
    /// are never created here; they arrive as player messages.
    pub fn apply_snapshot(&mut self, snapshot: &MembershipSnapshot, config: &RosterConfig) {
        self.seats = assign_seats(snapshot, config);
        let seat = self.seats.local_seat;

        let listed = self.players.iter().position(|p| p.id == snapshot.local);
        let local = match (listed, self.local_player.take()) {
            (Some(index), _) => {
                let listed = &mut self.players[index];
                listed.player_seat = seat;
                listed.is_local_device = true;
                listed.clone()
            }
            (None, Some(mut current)) if current.id == snapshot.local => {
                current.player_seat = seat;
                current
            }
            (None, Some(current))
                if current.is_local_device && !snapshot.participants.contains(&current.id) =>
            {
                self.rekey_local(current, snapshot.local, seat)
            }
            (None, _) => {
                let mut created = Player::new(format!("Player{seat}"), snapshot.local);
                created.is_active = true;
                created.player_seat = seat;
                created.is_local_device = true;
                created
            }
        };
        self.local_player = Some(local);

        if config.prune_departed {
            let before = self.players.len();
            self.players
                .retain(|p| p.id == snapshot.local || snapshot.participants.contains(&p.id));
            let pruned = before - self.players.len();
            if pruned > 0 {
                tracing::debug!(pruned, "removed departed players");
            }
        }
    }

    // A local record created before joining carries a provisional id.
    // Move it, and its list entry if echoed, onto the session identity.
    fn rekey_local(&mut self, mut player: Player, id: ParticipantId, seat: u32) -> Player {
        let provisional = player.id;
        tracing::debug!(from = %provisional, to = %id, name = %player.name, "local player joined session");
        player.id = id;
        player.player_seat = seat;
        if let Some(entry) = self.players.iter_mut().find(|p| p.id == provisional) {
            *entry = player.clone();
        }
        player
    }

    /// Makes `player` the local record without touching the list.
    pub fn set_local(&mut self, player: Player) {
        self.local_player = Some(player);
    }

    /// Empties the roster.
    pub fn clear(&mut self) {
        self.players.clear();
        self.local_player = None;
        self.seats = SeatAssignment::default();
    }

    /// A snapshot of the current state.
    pub fn view(&self) -> RosterView {
        RosterView {
            players: self.players.clone(),
            local_player: self.local_player.clone(),
            seats: self.seats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(n: u64) -> ParticipantId {
        ParticipantId::new(n)
    }

    fn player(id: u64, name: &str, score: i64) -> Player {
        let mut p = Player::new(name, pid(id));
        p.score = score;
        p
    }

    fn snapshot(local: u64, participants: &[u64]) -> MembershipSnapshot {
        MembershipSnapshot {
            local: pid(local),
            participants: participants.iter().copied().map(pid).collect(),
        }
    }

    #[test]
    fn test_apply_player_new_id_appends() {
        let mut roster = Roster::new();
        roster.apply_player(player(1, "Ada", 0));
        assert_eq!(roster.players().len(), 1);
        assert_eq!(roster.players()[0].id, pid(1));
    }

    #[test]
    fn test_apply_player_same_id_replaces_in_place() {
        let mut roster = Roster::new();
        roster.apply_player(player(1, "Ada", 0));
        roster.apply_player(player(2, "Grace", 0));

        roster.apply_player(player(1, "Ada", 10));

        assert_eq!(roster.players().len(), 2);
        assert_eq!(roster.players()[0].id, pid(1));
        assert_eq!(roster.players()[0].score, 10);
        assert_eq!(roster.players()[1].id, pid(2));
    }

    #[test]
    fn test_apply_player_refreshes_local_record() {
        let mut roster = Roster::new();
        roster.set_local(player(1, "Ada", 0));

        roster.apply_player(player(1, "Ada", 5));

        assert_eq!(roster.local_player().unwrap().score, 5);
    }

    #[test]
    fn test_apply_player_other_id_leaves_local_record() {
        let mut roster = Roster::new();
        roster.set_local(player(1, "Ada", 0));

        roster.apply_player(player(2, "Grace", 5));

        assert_eq!(roster.local_player().unwrap().id, pid(1));
        assert_eq!(roster.local_player().unwrap().score, 0);
    }

    #[test]
    fn test_apply_snapshot_creates_local_player() {
        let mut roster = Roster::new();

        roster.apply_snapshot(&snapshot(1, &[1]), &RosterConfig::default());

        let local = roster.local_player().unwrap();
        assert_eq!(local.name, "Player1");
        assert_eq!(local.id, pid(1));
        assert_eq!(local.player_seat, 1);
        assert!(local.is_local_device);
        assert!(local.is_active);
        assert!(!local.is_ready);
        assert!(roster.players().is_empty());
        assert_eq!(roster.seats().total_seats, 2);
    }

    #[test]
    fn test_apply_snapshot_adopts_listed_local_record() {
        let mut roster = Roster::new();
        roster.apply_player(player(1, "Ada", 3));

        roster.apply_snapshot(&snapshot(1, &[1, 2]), &RosterConfig::default());

        let local = roster.local_player().unwrap();
        assert_eq!(local.name, "Ada");
        assert_eq!(local.score, 3);
        assert_eq!(local.player_seat, 1);
        assert_eq!(roster.players()[0].player_seat, 1);
    }

    #[test]
    fn test_apply_snapshot_keeps_renamed_local_record() {
        let mut roster = Roster::new();
        roster.set_local(player(1, "Ada", 0));

        roster.apply_snapshot(&snapshot(1, &[1, 2, 3]), &RosterConfig::default());

        assert_eq!(roster.local_player().unwrap().name, "Ada");
    }

    #[test]
    fn test_apply_snapshot_moves_provisional_local_record_to_session_id() {
        let mut roster = Roster::new();
        let mut ada = player(900, "Ada", 0);
        ada.is_local_device = true;
        ada.is_ready = true;
        roster.set_local(ada.clone());
        roster.apply_player(ada);
        roster.apply_player(player(2, "Grace", 0));

        roster.apply_snapshot(&snapshot(1, &[1, 2]), &RosterConfig::default());

        let local = roster.local_player().unwrap();
        assert_eq!(local.id, pid(1));
        assert_eq!(local.name, "Ada");
        assert!(local.is_ready);
        assert_eq!(local.player_seat, 1);
        let ids: Vec<_> = roster.players().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![pid(1), pid(2)]);
        assert_eq!(roster.players()[0].name, "Ada");
    }

    #[test]
    fn test_apply_snapshot_does_not_rekey_remote_record() {
        let mut roster = Roster::new();
        roster.set_local(player(2, "Grace", 0));

        roster.apply_snapshot(&snapshot(1, &[1, 2]), &RosterConfig::default());

        assert_eq!(roster.local_player().unwrap().name, "Player1");
    }

    #[test]
    fn test_apply_snapshot_never_removes_players_by_default() {
        let mut roster = Roster::new();
        roster.apply_player(player(2, "Grace", 0));
        roster.apply_player(player(3, "Linus", 0));

        roster.apply_snapshot(&snapshot(1, &[1, 3]), &RosterConfig::default());

        assert_eq!(roster.players().len(), 2);
    }

    #[test]
    fn test_apply_snapshot_prunes_departed_when_enabled() {
        let config = RosterConfig {
            prune_departed: true,
            ..RosterConfig::default()
        };
        let mut roster = Roster::new();
        roster.apply_player(player(1, "Me", 0));
        roster.apply_player(player(2, "Grace", 0));
        roster.apply_player(player(3, "Linus", 0));

        roster.apply_snapshot(&snapshot(1, &[3]), &config);

        let ids: Vec<_> = roster.players().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![pid(1), pid(3)]);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut roster = Roster::new();
        roster.apply_player(player(1, "Ada", 0));
        roster.apply_snapshot(&snapshot(1, &[1]), &RosterConfig::default());

        roster.clear();

        assert!(roster.players().is_empty());
        assert!(roster.local_player().is_none());
        assert_eq!(roster.seats(), &SeatAssignment::default());
    }
}
