//! Structural verification of an assembled population.
//!
//! Re-checks every invariant the generators promise, against the
//! configuration the population was built from.
//!
//! # Check Categories
//!
//! - **Family Totality**: every family-covered node is in exactly one family
//! - **Family Composition**: per-cohort member counts follow the parity rule
//! - **Community Bounds**: community sizes and leftover deficit respect the bracket
//! - **Community Disjointness**: no node works in two communities
//! - **Friend Group Bounds**: group sizes stay within `[1, max_group_size]`
//! - **Friend Group Exclusion**: no group contains a paired couple
//! - **Membership Consistency**: person records and group collections agree
//! - **Target Convergence**: people reached their friend-group target (soft)

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use rayon::prelude::*;

use super::assembler::bracket_coverage;
use super::cohorts::{CohortIndex, Dimension};
use super::config::PopulationConfig;
use super::network::Population;
use super::{Layer, NodeId};

/// Severity of a verification issue
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Soft target missed
    Low,
    /// Output usable but a configured bound is off
    Medium,
    /// A structural bound is violated
    High,
    /// A partition invariant is broken
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "LOW"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::High => write!(f, "HIGH"),
            Severity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Category of verification check
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CheckCategory {
    FamilyTotality,
    FamilyComposition,
    CommunityBounds,
    CommunityDisjointness,
    FriendGroupBounds,
    FriendGroupExclusion,
    MembershipConsistency,
    TargetConvergence,
}

impl CheckCategory {
    pub fn all() -> &'static [CheckCategory] {
        &[
            CheckCategory::FamilyTotality,
            CheckCategory::FamilyComposition,
            CheckCategory::CommunityBounds,
            CheckCategory::CommunityDisjointness,
            CheckCategory::FriendGroupBounds,
            CheckCategory::FriendGroupExclusion,
            CheckCategory::MembershipConsistency,
            CheckCategory::TargetConvergence,
        ]
    }
}

impl fmt::Display for CheckCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckCategory::FamilyTotality => write!(f, "Family Totality"),
            CheckCategory::FamilyComposition => write!(f, "Family Composition"),
            CheckCategory::CommunityBounds => write!(f, "Community Bounds"),
            CheckCategory::CommunityDisjointness => write!(f, "Community Disjointness"),
            CheckCategory::FriendGroupBounds => write!(f, "Friend Group Bounds"),
            CheckCategory::FriendGroupExclusion => write!(f, "Friend Group Exclusion"),
            CheckCategory::MembershipConsistency => write!(f, "Membership Consistency"),
            CheckCategory::TargetConvergence => write!(f, "Target Convergence"),
        }
    }
}

/// A failed check
#[derive(Clone, Debug)]
pub struct Issue {
    pub category: CheckCategory,
    pub message: String,
    pub severity: Severity,
    /// Node the issue is anchored to, if any
    pub node: Option<NodeId>,
}

impl Issue {
    pub fn new(category: CheckCategory, message: impl Into<String>, severity: Severity) -> Self {
        Self { category, message: message.into(), severity, node: None }
    }

    pub fn at(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }
}

/// Overall verification status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationStatus {
    /// All checks passed
    Passed,
    /// Only low/medium severity issues
    PartialPass,
    /// High or critical severity issues found
    Failed,
}

/// Statistics for a check category
#[derive(Clone, Debug, Default)]
pub struct CategoryStats {
    pub checks: usize,
    pub failed: usize,
}

impl CategoryStats {
    pub fn passed(&self) -> usize {
        self.checks.saturating_sub(self.failed)
    }
}

/// Complete verification report
#[derive(Clone, Debug)]
pub struct ValidationReport {
    pub seed: u64,
    pub population_size: usize,
    pub status: ValidationStatus,
    pub issues: Vec<Issue>,
    pub category_stats: BTreeMap<CheckCategory, CategoryStats>,
    /// Fraction of friend-group people whose group count equals their target
    pub target_convergence: f64,
}

impl ValidationReport {
    pub fn new(seed: u64, population_size: usize) -> Self {
        let category_stats = CheckCategory::all()
            .iter()
            .map(|&c| (c, CategoryStats::default()))
            .collect();
        Self {
            seed,
            population_size,
            status: ValidationStatus::Passed,
            issues: Vec::new(),
            category_stats,
            target_convergence: 1.0,
        }
    }

    /// Record `checks` checks of one category and the issues they raised.
    pub fn record(&mut self, category: CheckCategory, checks: usize, issues: Vec<Issue>) {
        let stats = self.category_stats.entry(category).or_default();
        stats.checks += checks;
        stats.failed += issues.len();
        for issue in issues {
            self.add_issue(issue);
        }
    }

    fn add_issue(&mut self, issue: Issue) {
        match issue.severity {
            Severity::High | Severity::Critical => {
                self.status = ValidationStatus::Failed;
            }
            Severity::Medium | Severity::Low => {
                if self.status == ValidationStatus::Passed {
                    self.status = ValidationStatus::PartialPass;
                }
            }
        }
        self.issues.push(issue);
    }

    /// No high or critical issues.
    pub fn is_valid(&self) -> bool {
        self.status != ValidationStatus::Failed
    }

    pub fn issues_by_severity(&self, min_severity: Severity) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.severity >= min_severity).collect()
    }

    pub fn issues_in(&self, category: CheckCategory) -> Vec<&Issue> {
        self.issues.iter().filter(|i| i.category == category).collect()
    }

    /// Format report as a string for display
    pub fn format(&self) -> String {
        let mut output = String::new();

        output.push_str("═══════════════════════════════════════════\n");
        output.push_str("       POPULATION VERIFICATION REPORT\n");
        output.push_str("═══════════════════════════════════════════\n\n");

        output.push_str(&format!("Seed: {}\n", self.seed));
        output.push_str(&format!("Population: {}\n", self.population_size));
        output.push_str(&format!(
            "Target convergence: {:.2}%\n\n",
            self.target_convergence * 100.0
        ));

        output.push_str("SUMMARY:\n");
        for (category, stats) in &self.category_stats {
            let status = if stats.failed == 0 { "✓" } else { "✗" };
            output.push_str(&format!(
                "  {} {}: {}/{} passed\n",
                status,
                category,
                stats.passed(),
                stats.checks
            ));
        }
        output.push('\n');

        if !self.issues.is_empty() {
            output.push_str(&format!("ISSUES ({}):\n", self.issues.len()));
            for issue in self.issues.iter().take(50) {
                let node = issue.node.map(|n| format!(" at node {}", n)).unwrap_or_default();
                output.push_str(&format!("  [{}] {}{}\n", issue.severity, issue.message, node));
            }
            if self.issues.len() > 50 {
                output.push_str(&format!("  ... {} more\n", self.issues.len() - 50));
            }
            output.push('\n');
        }

        let status_str = match self.status {
            ValidationStatus::Passed => "PASSED",
            ValidationStatus::PartialPass => "PARTIAL PASS (minor issues only)",
            ValidationStatus::Failed => "FAILED",
        };
        output.push_str(&format!("STATUS: {}\n", status_str));
        output.push_str("═══════════════════════════════════════════\n");

        output
    }
}

/// Run every check against `population`, built from `config`.
pub fn validate_population(population: &Population, config: &PopulationConfig) -> ValidationReport {
    let mut report = ValidationReport::new(population.seed(), population.len());
    let index = population.cohorts();

    check_family_totality(population, config, index, &mut report);
    check_family_composition(population, config, index, &mut report);
    check_communities(population, config, index, &mut report);
    check_friend_groups(population, config, index, &mut report);
    check_memberships(population, config, index, &mut report);
    check_target_convergence(population, &mut report);

    report
}

fn check_family_totality(
    population: &Population,
    config: &PopulationConfig,
    index: &CohortIndex,
    report: &mut ValidationReport,
) {
    let covered: HashSet<NodeId> = bracket_coverage(config, index, Layer::Family).into_iter().collect();
    let mut issues = Vec::new();
    let mut seen = HashSet::new();

    for family in population.families() {
        for &node in &family.members {
            if !seen.insert(node) {
                issues.push(
                    Issue::new(CheckCategory::FamilyTotality, "node in two families", Severity::Critical)
                        .at(node),
                );
            }
            let recorded = population.person(node).and_then(|p| p.family_id);
            if recorded != Some(family.id) {
                issues.push(
                    Issue::new(
                        CheckCategory::FamilyTotality,
                        format!("record points to {:?} instead of {}", recorded, family.id),
                        Severity::Critical,
                    )
                    .at(node),
                );
            }
        }
    }

    for (node, person) in population.people() {
        let should_have = covered.contains(&node);
        if should_have != person.family_id.is_some() {
            let message = if should_have { "covered node has no family" } else { "uncovered node has a family" };
            issues.push(Issue::new(CheckCategory::FamilyTotality, message, Severity::Critical).at(node));
        }
    }

    if seen.len() != covered.len() {
        issues.push(Issue::new(
            CheckCategory::FamilyTotality,
            format!("families hold {} nodes but {} are covered", seen.len(), covered.len()),
            Severity::Critical,
        ));
    }

    report.record(CheckCategory::FamilyTotality, population.len(), issues);
}

fn check_family_composition(
    population: &Population,
    config: &PopulationConfig,
    index: &CohortIndex,
    report: &mut ValidationReport,
) {
    let issues: Vec<Issue> = population
        .families()
        .par_iter()
        .flat_map_iter(|family| {
            config.family.slots.iter().filter_map(move |slot| {
                let range = index.range(Dimension::Age, &slot.cohort)?;
                let count = family.members.iter().filter(|&&n| range.contains(n)).count();
                let expected = slot.count_for(family.id.index()) as usize;
                (count != expected).then(|| {
                    Issue::new(
                        CheckCategory::FamilyComposition,
                        format!(
                            "{} has {} '{}' members, expected {}",
                            family.id, count, slot.cohort, expected
                        ),
                        Severity::High,
                    )
                })
            })
        })
        .collect();

    report.record(CheckCategory::FamilyComposition, population.families().len(), issues);
}

fn check_communities(
    population: &Population,
    config: &PopulationConfig,
    index: &CohortIndex,
    report: &mut ValidationReport,
) {
    let mut bound_issues = Vec::new();
    for bracket in &config.work {
        let Some(range) = index.range(Dimension::Profession, &bracket.cohort) else {
            continue;
        };
        let mut assigned = 0;
        for community in population.communities().iter().filter(|c| c.cohort == bracket.cohort) {
            assigned += community.len();
            if community.len() < bracket.min_size || community.len() > bracket.max_size {
                bound_issues.push(Issue::new(
                    CheckCategory::CommunityBounds,
                    format!(
                        "{} has {} members, outside [{}, {}]",
                        community.id,
                        community.len(),
                        bracket.min_size,
                        bracket.max_size
                    ),
                    Severity::High,
                ));
            }
            if let Some(&outside) = community.members.iter().find(|&&n| !range.contains(n)) {
                bound_issues.push(
                    Issue::new(
                        CheckCategory::CommunityBounds,
                        format!("{} member outside cohort '{}'", community.id, bracket.cohort),
                        Severity::Critical,
                    )
                    .at(outside),
                );
            }
        }
        let deficit = range.len().saturating_sub(assigned);
        if deficit >= bracket.min_size.max(1) {
            bound_issues.push(Issue::new(
                CheckCategory::CommunityBounds,
                format!(
                    "cohort '{}' leaves {} unassigned, not below min_size {}",
                    bracket.cohort, deficit, bracket.min_size
                ),
                Severity::Medium,
            ));
        }
    }
    report.record(CheckCategory::CommunityBounds, population.communities().len(), bound_issues);

    let mut disjoint_issues = Vec::new();
    let mut seen = HashSet::new();
    for community in population.communities() {
        for &node in &community.members {
            if !seen.insert(node) {
                disjoint_issues.push(
                    Issue::new(
                        CheckCategory::CommunityDisjointness,
                        "node in two communities",
                        Severity::Critical,
                    )
                    .at(node),
                );
            } else if population.person(node).and_then(|p| p.community_id) != Some(community.id) {
                disjoint_issues.push(
                    Issue::new(
                        CheckCategory::CommunityDisjointness,
                        format!("record does not point to {}", community.id),
                        Severity::Critical,
                    )
                    .at(node),
                );
            }
        }
    }
    let recorded = population.people().filter(|(_, p)| p.community_id.is_some()).count();
    if recorded != seen.len() {
        disjoint_issues.push(Issue::new(
            CheckCategory::CommunityDisjointness,
            format!("{} records name a community but communities hold {}", recorded, seen.len()),
            Severity::Critical,
        ));
    }
    report.record(CheckCategory::CommunityDisjointness, seen.len(), disjoint_issues);
}

fn check_friend_groups(
    population: &Population,
    config: &PopulationConfig,
    index: &CohortIndex,
    report: &mut ValidationReport,
) {
    let brackets: BTreeMap<&str, _> = config
        .friend_groups
        .iter()
        .map(|b| (b.cohort.as_str(), &b.params))
        .collect();

    let (bounds, exclusion): (Vec<Issue>, Vec<Issue>) = population
        .friend_groups()
        .par_iter()
        .flat_map_iter(|group| {
            let mut issues = Vec::new();
            let Some(params) = brackets.get(group.cohort.as_str()) else {
                issues.push(Issue::new(
                    CheckCategory::FriendGroupBounds,
                    format!("{} belongs to unconfigured cohort '{}'", group.id, group.cohort),
                    Severity::High,
                ));
                return issues;
            };

            if group.is_empty() || group.len() > params.max_group_size {
                issues.push(Issue::new(
                    CheckCategory::FriendGroupBounds,
                    format!(
                        "{} has {} members, outside [1, {}]",
                        group.id,
                        group.len(),
                        params.max_group_size
                    ),
                    Severity::High,
                ));
            }
            if let Some(range) = index.range(Dimension::Age, &group.cohort) {
                if let Some(&outside) = group.members.iter().find(|&&n| !range.contains(n)) {
                    issues.push(
                        Issue::new(
                            CheckCategory::FriendGroupBounds,
                            format!("{} member outside cohort '{}'", group.id, group.cohort),
                            Severity::Critical,
                        )
                        .at(outside),
                    );
                }
            }

            for (i, &a) in group.members.iter().enumerate() {
                for &b in &group.members[i + 1..] {
                    if a == b {
                        issues.push(
                            Issue::new(
                                CheckCategory::FriendGroupBounds,
                                format!("{} lists a member twice", group.id),
                                Severity::High,
                            )
                            .at(a),
                        );
                    } else if params.pairing.are_paired(a, b) {
                        issues.push(
                            Issue::new(
                                CheckCategory::FriendGroupExclusion,
                                format!("{} contains paired nodes {} and {}", group.id, a, b),
                                Severity::Critical,
                            )
                            .at(a),
                        );
                    }
                }
            }
            issues
        })
        .partition(|issue| issue.category == CheckCategory::FriendGroupBounds);

    let groups = population.friend_groups().len();
    report.record(CheckCategory::FriendGroupBounds, groups, bounds);
    report.record(CheckCategory::FriendGroupExclusion, groups, exclusion);
}

fn check_memberships(
    population: &Population,
    config: &PopulationConfig,
    index: &CohortIndex,
    report: &mut ValidationReport,
) {
    let covered: HashSet<NodeId> =
        bracket_coverage(config, index, Layer::FriendGroup).into_iter().collect();
    let mut issues = Vec::new();
    let mut memberships = 0;

    for (node, person) in population.people() {
        if covered.contains(&node) != person.friend_group_ids.is_some() {
            issues.push(
                Issue::new(
                    CheckCategory::MembershipConsistency,
                    "friend-group list presence does not match cohort coverage",
                    Severity::High,
                )
                .at(node),
            );
        }
        for &id in person.friend_groups() {
            memberships += 1;
            let listed = population
                .friend_group(id)
                .map(|g| g.members.contains(&node))
                .unwrap_or(false);
            if !listed {
                issues.push(
                    Issue::new(
                        CheckCategory::MembershipConsistency,
                        format!("record lists {} which does not contain the node", id),
                        Severity::High,
                    )
                    .at(node),
                );
            }
        }
    }

    let slots: usize = population.friend_groups().iter().map(|g| g.len()).sum();
    if slots != memberships {
        issues.push(Issue::new(
            CheckCategory::MembershipConsistency,
            format!("groups hold {} slots but records list {} memberships", slots, memberships),
            Severity::High,
        ));
    }

    report.record(CheckCategory::MembershipConsistency, population.len(), issues);
}

fn check_target_convergence(population: &Population, report: &mut ValidationReport) {
    let mut people = 0;
    let mut converged = 0;
    for (_, person) in population.people() {
        if let (Some(groups), Some(target)) = (&person.friend_group_ids, person.friend_group_target) {
            people += 1;
            if groups.len() == target as usize {
                converged += 1;
            }
        }
    }

    report.target_convergence = if people == 0 { 1.0 } else { converged as f64 / people as f64 };

    let mut issues = Vec::new();
    if converged < people {
        issues.push(Issue::new(
            CheckCategory::TargetConvergence,
            format!("{} of {} people missed their friend-group target", people - converged, people),
            Severity::Low,
        ));
    }
    report.record(CheckCategory::TargetConvergence, 1, issues);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::population::assembler::assemble_with_seed;
    use crate::population::cohorts::CohortRange;
    use crate::population::config::{
        FamilyRule, FamilySlot, FriendGroupBracketConfig, FriendGroupConfig, WorkBracketConfig,
    };
    use crate::population::friend_groups::PairingRule;

    fn config() -> PopulationConfig {
        PopulationConfig {
            population_size: 200,
            age_cohorts: vec![
                CohortRange::new("kid", 0, 79),
                CohortRange::new("adult", 80, 199),
            ],
            profession_cohorts: vec![CohortRange::new("A", 80, 159)],
            family: FamilyRule {
                slots: vec![FamilySlot::new("kid", 2, 2), FamilySlot::new("adult", 3, 3)],
            },
            work: vec![WorkBracketConfig::new("A", 5, 9)],
            friend_groups: vec![FriendGroupBracketConfig::new("kid", FriendGroupConfig::default())],
        }
    }

    #[test]
    fn test_generated_population_passes() {
        let config = config();
        let pop = assemble_with_seed(&config, 17).unwrap();
        let report = validate_population(&pop, &config);

        assert!(report.is_valid(), "{}", report.format());
        assert!(report.issues_by_severity(Severity::Medium).is_empty());
        assert!((report.target_convergence - 1.0).abs() < 1e-9);
        assert!(report.category_stats[&CheckCategory::FamilyTotality].checks > 0);
    }

    #[test]
    fn test_tighter_bounds_are_flagged() {
        let config = config();
        let pop = assemble_with_seed(&config, 17).unwrap();

        let mut stricter = config.clone();
        stricter.work[0].max_size = 4;
        stricter.work[0].min_size = 4;
        stricter.friend_groups[0].params.max_group_size = 1;
        let report = validate_population(&pop, &stricter);

        assert_eq!(report.status, ValidationStatus::Failed);
        assert!(!report.issues_in(CheckCategory::CommunityBounds).is_empty());
        assert!(!report.issues_in(CheckCategory::FriendGroupBounds).is_empty());
    }

    #[test]
    fn test_pairing_violation_detected() {
        let config = config();
        let pop = assemble_with_seed(&config, 17).unwrap();

        // Regenerate under the narrow rule, then check against the broad one.
        let mut narrow = config.clone();
        narrow.friend_groups[0].params.pairing = PairingRule::EvenOddPair;
        let narrow_pop = assemble_with_seed(&narrow, 17).unwrap();
        let report = validate_population(&narrow_pop, &config);
        let adjacent_pairs = narrow_pop
            .friend_groups()
            .iter()
            .filter(|g| g.members.iter().any(|&a| g.members.contains(&(a + 1))))
            .count();
        assert_eq!(!report.issues_in(CheckCategory::FriendGroupExclusion).is_empty(), adjacent_pairs > 0);

        assert!(validate_population(&pop, &config).issues_in(CheckCategory::FriendGroupExclusion).is_empty());
    }

    #[test]
    fn test_report_format() {
        let config = config();
        let pop = assemble_with_seed(&config, 1).unwrap();
        let text = validate_population(&pop, &config).format();
        assert!(text.contains("POPULATION VERIFICATION REPORT"));
        assert!(text.contains("Family Totality"));
        assert!(text.contains("STATUS: PASSED"));
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }
}
