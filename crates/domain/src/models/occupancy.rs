//! Per-table occupancy for one game night, and the reconciled cache built
//! on top of it.

use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::game_mode::GameMode;
use super::reservation::OccupantRow;
use super::schedule::GameNight;
use super::table::TableId;

/// Display name for occupants whose profile is missing.
pub const UNKNOWN_OCCUPANT: &str = "Unknown";

/// Who sits at one table and which mode the table is locked to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TableOccupancy {
    pub count: usize,
    pub mode: Option<GameMode>,
    pub occupant_ids: Vec<Uuid>,
    pub occupant_names: Vec<String>,
}

impl TableOccupancy {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The mode set by the first occupant, if anyone is seated.
    pub fn locked_mode(&self) -> Option<GameMode> {
        if self.is_empty() {
            None
        } else {
            self.mode
        }
    }

    /// Capacity of the table if `requested` were picked: the locked mode
    /// wins once someone is seated.
    pub fn effective_capacity(&self, requested: GameMode) -> usize {
        self.locked_mode().unwrap_or(requested).capacity()
    }

    pub fn free_seats(&self, requested: GameMode) -> usize {
        self.effective_capacity(requested).saturating_sub(self.count)
    }

    fn seat(&mut self, user_id: Uuid, username: Option<String>, mode: GameMode) {
        if self.is_empty() {
            self.mode = Some(mode);
        }
        self.count += 1;
        self.occupant_ids.push(user_id);
        self.occupant_names
            .push(username.unwrap_or_else(|| UNKNOWN_OCCUPANT.to_string()));
    }

    fn unseat(&mut self, user_id: Uuid) -> bool {
        let Some(pos) = self.occupant_ids.iter().position(|id| *id == user_id) else {
            return false;
        };
        self.occupant_ids.remove(pos);
        self.occupant_names.remove(pos);
        self.count -= 1;
        if self.count == 0 {
            self.mode = None;
        }
        true
    }
}

/// Occupancy of every table for one game night.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct OccupancySnapshot {
    pub game_night: GameNight,
    pub tables: BTreeMap<TableId, TableOccupancy>,
}

impl OccupancySnapshot {
    pub fn empty(game_night: GameNight) -> Self {
        Self {
            game_night,
            tables: BTreeMap::new(),
        }
    }

    /// Folds reservation rows into per-table occupancy. Rows are applied
    /// oldest first so the earliest occupant decides the locked mode.
    pub fn from_rows(game_night: GameNight, mut rows: Vec<OccupantRow>) -> Self {
        rows.sort_by_key(|row| row.created_at);

        let mut snapshot = Self::empty(game_night);
        for row in rows {
            snapshot
                .tables
                .entry(row.table_id)
                .or_default()
                .seat(row.user_id, row.username, row.game_mode);
        }
        snapshot
    }

    /// Occupancy of one table (empty if nobody is seated).
    pub fn table(&self, table_id: TableId) -> TableOccupancy {
        self.tables.get(&table_id).cloned().unwrap_or_default()
    }

    /// The table a user sits at tonight, if any.
    pub fn seat_of(&self, user_id: Uuid) -> Option<TableId> {
        self.tables
            .iter()
            .find(|(_, t)| t.occupant_ids.contains(&user_id))
            .map(|(id, _)| *id)
    }

    pub fn total_occupants(&self) -> usize {
        self.tables.values().map(|t| t.count).sum()
    }
}

/// Occupancy as shown to a client: the last authoritative snapshot with
/// optimistic local changes layered on top.
///
/// Local changes are never merged back; the next authoritative read
/// replaces the view wholesale.
#[derive(Debug, Clone)]
pub struct OccupancyCache {
    authoritative: OccupancySnapshot,
    view: OccupancySnapshot,
}

impl OccupancyCache {
    pub fn new(snapshot: OccupancySnapshot) -> Self {
        Self {
            view: snapshot.clone(),
            authoritative: snapshot,
        }
    }

    pub fn view(&self) -> &OccupancySnapshot {
        &self.view
    }

    pub fn authoritative(&self) -> &OccupancySnapshot {
        &self.authoritative
    }

    /// True while optimistic changes have not been confirmed by a read.
    pub fn has_pending_changes(&self) -> bool {
        self.view != self.authoritative
    }

    pub fn apply_reserved(
        &mut self,
        table_id: TableId,
        user_id: Uuid,
        username: Option<String>,
        mode: GameMode,
    ) {
        self.view
            .tables
            .entry(table_id)
            .or_default()
            .seat(user_id, username, mode);
    }

    pub fn apply_cancelled(&mut self, table_id: TableId, user_id: Uuid) {
        let emptied = match self.view.tables.get_mut(&table_id) {
            Some(table) => table.unseat(user_id) && table.is_empty(),
            None => false,
        };
        if emptied {
            self.view.tables.remove(&table_id);
        }
    }

    /// Replaces both the view and the authoritative state.
    pub fn reconcile(&mut self, snapshot: OccupancySnapshot) {
        self.view = snapshot.clone();
        self.authoritative = snapshot;
    }
}
