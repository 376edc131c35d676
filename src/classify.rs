use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::synonyms;

/// Semantic role of a route-table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ColumnRole {
    Cable,
    Capacity,
    Length,
    Tube,
    Fiber,
    Box,
    State,
    Cassette,
    Drawer,
    Position,
    Unclassified,
}

impl ColumnRole {
    /// Evaluation order; a column takes the first role that matches.
    pub const PRIORITY: [ColumnRole; 10] = [
        ColumnRole::Cable,
        ColumnRole::Capacity,
        ColumnRole::Length,
        ColumnRole::Tube,
        ColumnRole::Fiber,
        ColumnRole::Box,
        ColumnRole::State,
        ColumnRole::Cassette,
        ColumnRole::Drawer,
        ColumnRole::Position,
    ];

    /// Roles that contribute a field to a route segment.
    pub const SEGMENT_ROLES: [ColumnRole; 8] = [
        ColumnRole::Cable,
        ColumnRole::Capacity,
        ColumnRole::Length,
        ColumnRole::Tube,
        ColumnRole::Fiber,
        ColumnRole::Box,
        ColumnRole::State,
        ColumnRole::Cassette,
    ];

    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            Self::Cable => synonyms::CABLE,
            Self::Capacity => synonyms::CAPACITY,
            Self::Length => synonyms::LENGTH,
            Self::Tube => synonyms::TUBE,
            Self::Fiber => synonyms::FIBER,
            Self::Box => synonyms::BOX,
            Self::State => synonyms::STATE,
            Self::Cassette => synonyms::CASSETTE,
            Self::Drawer => synonyms::DRAWER,
            Self::Position => synonyms::POSITION,
            Self::Unclassified => &[],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cable => "cable",
            Self::Capacity => "capacity",
            Self::Length => "length",
            Self::Tube => "tube",
            Self::Fiber => "fiber",
            Self::Box => "box",
            Self::State => "state",
            Self::Cassette => "cassette",
            Self::Drawer => "drawer",
            Self::Position => "position",
            Self::Unclassified => "unclassified",
        }
    }

    /// Role of a single column name.
    pub fn of(column: &str) -> Self {
        let name = column.trim().to_lowercase();
        Self::PRIORITY
            .into_iter()
            .find(|role| {
                if *role == ColumnRole::Length && name.contains(synonyms::LENGTH_EXCLUDED) {
                    return false;
                }
                role.synonyms().iter().any(|s| name.contains(s))
            })
            .unwrap_or(ColumnRole::Unclassified)
    }
}

/// Column roles of one table, computed once and referenced by column index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleAssignment {
    names: Vec<String>,
    roles: Vec<ColumnRole>,
    by_role: BTreeMap<ColumnRole, Vec<usize>>,
}

impl RoleAssignment {
    pub fn classify<S: AsRef<str>>(columns: &[S]) -> Self {
        let names: Vec<String> = columns
            .iter()
            .map(|c| AsRef::<str>::as_ref(c).to_string())
            .collect();
        let roles: Vec<ColumnRole> = names.iter().map(|n| ColumnRole::of(n)).collect();

        let mut by_role: BTreeMap<ColumnRole, Vec<usize>> = BTreeMap::new();
        for (index, role) in roles.iter().enumerate() {
            if *role != ColumnRole::Unclassified {
                by_role.entry(*role).or_default().push(index);
            }
        }

        Self {
            names,
            roles,
            by_role,
        }
    }

    pub fn role_of(&self, column: usize) -> ColumnRole {
        self.roles
            .get(column)
            .copied()
            .unwrap_or(ColumnRole::Unclassified)
    }

    /// Column indices holding `role`, in table order.
    pub fn columns(&self, role: ColumnRole) -> &[usize] {
        self.by_role.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn column_names(&self, role: ColumnRole) -> Vec<&str> {
        self.columns(role)
            .iter()
            .map(|&i| self.names[i].as_str())
            .collect()
    }

    pub fn column_name(&self, column: usize) -> Option<&str> {
        self.names.get(column).map(String::as_str)
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Number of positional segment slots: the longest segment-role list.
    pub fn segment_slots(&self) -> usize {
        ColumnRole::SEGMENT_ROLES
            .iter()
            .map(|role| self.columns(*role).len())
            .max()
            .unwrap_or(0)
    }

    pub fn has_segment_columns(&self) -> bool {
        self.segment_slots() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_synonyms_anywhere_case_insensitive() {
        assert_eq!(ColumnRole::of("CÂBLE 1"), ColumnRole::Cable);
        assert_eq!(ColumnRole::of("Nom cable"), ColumnRole::Cable);
        assert_eq!(ColumnRole::of(" Capacité "), ColumnRole::Capacity);
        assert_eq!(ColumnRole::of("N° Tube"), ColumnRole::Tube);
        assert_eq!(ColumnRole::of("Fibre 2"), ColumnRole::Fiber);
        assert_eq!(ColumnRole::of("BOITE"), ColumnRole::Box);
        assert_eq!(ColumnRole::of("Etat"), ColumnRole::State);
        assert_eq!(ColumnRole::of("K7"), ColumnRole::Cassette);
        assert_eq!(ColumnRole::of("Tiroir"), ColumnRole::Drawer);
        assert_eq!(ColumnRole::of("Position"), ColumnRole::Position);
        assert_eq!(ColumnRole::of("Commentaire"), ColumnRole::Unclassified);
    }

    #[test]
    fn total_length_column_is_not_a_hop_length() {
        assert_eq!(ColumnRole::of("Longueur Totale"), ColumnRole::Unclassified);
        assert_eq!(ColumnRole::of("Longueur Segment 1"), ColumnRole::Length);
    }

    #[test]
    fn first_matching_role_wins() {
        // "câble" is evaluated before "capacité"
        assert_eq!(ColumnRole::of("Capacité câble"), ColumnRole::Cable);
        // "nb fibre" is a capacity synonym and capacity precedes fiber
        assert_eq!(ColumnRole::of("Nb fibres"), ColumnRole::Capacity);
    }

    #[test]
    fn columns_are_grouped_in_table_order() {
        let roles = RoleAssignment::classify(&[
            "Câble 1",
            "Capacité 1",
            "Boîte 1",
            "Câble 2",
            "Commentaire",
            "Capacité 2",
            "Longueur totale",
        ]);

        assert_eq!(roles.columns(ColumnRole::Cable), &[0, 3]);
        assert_eq!(roles.columns(ColumnRole::Capacity), &[1, 5]);
        assert_eq!(roles.columns(ColumnRole::Box), &[2]);
        assert!(roles.columns(ColumnRole::Length).is_empty());
        assert_eq!(roles.column_names(ColumnRole::Cable), vec!["Câble 1", "Câble 2"]);
        assert_eq!(roles.role_of(4), ColumnRole::Unclassified);
        assert_eq!(roles.segment_slots(), 2);
    }

    #[test]
    fn no_column_is_assigned_twice() {
        let columns = [
            "Câble", "Capacité", "Longueur", "Tube", "Fibre", "Boîte", "Etat", "K7", "Tiroir",
            "Position", "Câble tube", "Boîte fibre", "état K7",
        ];
        let roles = RoleAssignment::classify(&columns);

        let mut seen = vec![0usize; columns.len()];
        for role in ColumnRole::PRIORITY {
            for &index in roles.columns(role) {
                seen[index] += 1;
            }
        }
        assert!(seen.iter().all(|&n| n == 1));
    }

    #[test]
    fn empty_header_has_no_slots() {
        let roles = RoleAssignment::classify::<&str>(&[]);
        assert_eq!(roles.segment_slots(), 0);
        assert!(!roles.has_segment_columns());
    }
}
