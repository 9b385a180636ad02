//! In-memory policy model.
//!
//! # Purpose
//! Holds the loaded permission and grouping rules, partitioned by kind and in
//! load order. The enforcer compiles a model; the adapter builds one from
//! stored rows and persists one on save.
//!
//! # Key invariants
//! - A model is built fresh on every load; nothing is merged from a previous
//!   model.
//! - Duplicates are kept as loaded so the model mirrors the store row for row.
use crate::{GroupingRule, PermissionRule, PolicyResult, RuleRow, parse_policy_line};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyModel {
    permissions: Vec<PermissionRule>,
    groupings: Vec<GroupingRule>,
}

impl PolicyModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a model from policy lines, in order.
    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> PolicyResult<Self> {
        let mut model = Self::new();
        for line in lines {
            model.load_policy_line(line)?;
        }
        Ok(model)
    }

    pub fn from_rows(rows: impl IntoIterator<Item = RuleRow>) -> Self {
        let mut model = Self::new();
        for row in rows {
            model.add_rule(row);
        }
        model
    }

    /// Parse one policy line and append the rule it describes.
    ///
    /// Blank and comment lines are accepted and ignored.
    pub fn load_policy_line(&mut self, line: &str) -> PolicyResult<()> {
        if let Some(row) = parse_policy_line(line)? {
            self.add_rule(row);
        }
        Ok(())
    }

    pub fn add_rule(&mut self, row: RuleRow) {
        match row {
            RuleRow::Permission(rule) => self.permissions.push(rule),
            RuleRow::Grouping(rule) => self.groupings.push(rule),
        }
    }

    /// Remove every rule equal to `row`; returns how many were removed.
    pub fn remove_rule(&mut self, row: &RuleRow) -> usize {
        match row {
            RuleRow::Permission(rule) => {
                let before = self.permissions.len();
                self.permissions.retain(|existing| existing != rule);
                before - self.permissions.len()
            }
            RuleRow::Grouping(rule) => {
                let before = self.groupings.len();
                self.groupings.retain(|existing| existing != rule);
                before - self.groupings.len()
            }
        }
    }

    pub fn contains(&self, row: &RuleRow) -> bool {
        match row {
            RuleRow::Permission(rule) => self.permissions.contains(rule),
            RuleRow::Grouping(rule) => self.groupings.contains(rule),
        }
    }

    pub fn permissions(&self) -> &[PermissionRule] {
        &self.permissions
    }

    pub fn groupings(&self) -> &[GroupingRule] {
        &self.groupings
    }

    /// All rules, permissions first, each partition in load order.
    pub fn rows(&self) -> impl Iterator<Item = RuleRow> + '_ {
        self.permissions
            .iter()
            .cloned()
            .map(RuleRow::Permission)
            .chain(self.groupings.iter().cloned().map(RuleRow::Grouping))
    }

    pub fn to_lines(&self) -> Vec<String> {
        self.rows().map(|row| row.to_line()).collect()
    }

    pub fn len(&self) -> usize {
        self.permissions.len() + self.groupings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.groupings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Effect, PolicyError};

    #[test]
    fn lines_partition_by_rule_kind_in_order() {
        let model = PolicyModel::from_lines([
            "g, u3, admins",
            "p, admins, admin_text, read, allow",
            "p, u3, report_text, read, allow",
            "g, u4, staff",
        ])
        .expect("model");

        assert_eq!(model.len(), 4);
        assert_eq!(model.permissions()[0].subject(), "admins");
        assert_eq!(model.permissions()[1].subject(), "u3");
        assert_eq!(model.groupings()[0].member(), "u3");
        assert_eq!(model.groupings()[1].member(), "u4");
    }

    #[test]
    fn bad_line_aborts_build() {
        let err = PolicyModel::from_lines(["p, u3, report_text, read, sometimes"]).unwrap_err();
        assert_eq!(err, PolicyError::InvalidEffect("sometimes".to_string()));
    }

    #[test]
    fn remove_rule_drops_all_duplicates_only() {
        let keep = RuleRow::Permission(
            PermissionRule::new("u3", "admin_text", "read", Effect::Deny).unwrap(),
        );
        let target = RuleRow::Permission(
            PermissionRule::new("u3", "admin_text", "read", Effect::Allow).unwrap(),
        );
        let mut model = PolicyModel::from_rows([target.clone(), keep.clone(), target.clone()]);

        assert_eq!(model.remove_rule(&target), 2);
        assert_eq!(model.remove_rule(&target), 0);
        assert!(model.contains(&keep));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn to_lines_round_trips_through_from_lines() {
        let model = PolicyModel::from_lines([
            "p, admins, admin_text, read, allow",
            "g, u3, admins",
        ])
        .expect("model");
        let lines = model.to_lines();
        assert_eq!(
            lines,
            vec![
                "p, admins, admin_text, read, allow".to_string(),
                "g, u3, admins".to_string()
            ]
        );
        let rebuilt = PolicyModel::from_lines(lines.iter().map(String::as_str)).expect("rebuilt");
        assert_eq!(rebuilt, model);
    }
}
