//! Club table identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of tables in the club room.
pub const TABLE_COUNT: i16 = 6;

/// Identifier of one of the club's tables (`1..=TABLE_COUNT`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i16", into = "i16")]
pub struct TableId(i16);

impl TableId {
    pub fn new(number: i16) -> Result<Self, String> {
        shared::validation::validate_table_number(number, TABLE_COUNT)
            .map(|_| TableId(number))
            .map_err(|_| format!("Invalid table: {} (expected 1-{})", number, TABLE_COUNT))
    }

    pub fn get(self) -> i16 {
        self.0
    }

    /// All tables in ascending order.
    pub fn all() -> impl Iterator<Item = TableId> {
        (1..=TABLE_COUNT).map(TableId)
    }
}

impl TryFrom<i16> for TableId {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        TableId::new(value)
    }
}

impl From<TableId> for i16 {
    fn from(id: TableId) -> Self {
        id.0
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_range() {
        assert_eq!(TableId::new(1).unwrap().get(), 1);
        assert_eq!(TableId::new(6).unwrap().get(), 6);
        assert!(TableId::new(0).is_err());
        assert!(TableId::new(7).is_err());
    }

    #[test]
    fn test_all_tables() {
        let tables: Vec<i16> = TableId::all().map(TableId::get).collect();
        assert_eq!(tables, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<TableId>("3").is_ok());
        assert!(serde_json::from_str::<TableId>("9").is_err());
    }
}
