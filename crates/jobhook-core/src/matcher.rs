//! Rule matching.
//!
//! [`get_matches`] walks the rule set in declaration order and applies each
//! filter as a small predicate, short-circuiting on the first one that
//! fails. Names of matched rules are collected in a scheduled set that lives
//! only for one call and drives `ifnot` suppression.

use std::collections::HashSet;

use crate::event::{EventMetadata, EventType};
use crate::rules::{BranchFilter, CompiledRule, Rule, RuleSet};

/// Rules that apply to the event, in declaration order.
pub fn get_matches<'r>(
    event_type: EventType,
    meta: &EventMetadata,
    rules: &'r RuleSet,
) -> Vec<&'r CompiledRule> {
    let mut scheduled: HashSet<&'r str> = HashSet::new();
    let mut matches = Vec::new();

    for compiled in rules.iter() {
        if !passes_filters(compiled, event_type, meta, &scheduled) {
            continue;
        }
        if let Some(name) = compiled.rule().name.as_deref() {
            scheduled.insert(name);
        }
        matches.push(compiled);
    }

    matches
}

fn passes_filters(
    compiled: &CompiledRule,
    event_type: EventType,
    meta: &EventMetadata,
    scheduled: &HashSet<&str>,
) -> bool {
    let rule = compiled.rule();
    repo_matches(rule, meta)
        && event_matches(rule, event_type)
        && mentions_match(rule, meta)
        && labels_match(rule, meta)
        && action_matches(rule, meta)
        && branch_allowed(compiled.branch_filter(), &meta.branch)
        && branch_allowed(compiled.target_branch_filter(), &meta.target_branch)
        && not_suppressed(rule, scheduled)
}

fn repo_matches(rule: &Rule, meta: &EventMetadata) -> bool {
    rule.repo == meta.repo
}

fn event_matches(rule: &Rule, event_type: EventType) -> bool {
    match &rule.events {
        Some(events) => events.iter().any(|e| e == event_type.as_str()),
        None => true,
    }
}

fn mentions_match(rule: &Rule, meta: &EventMetadata) -> bool {
    match (&rule.mentions, &meta.comment) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(mentions), Some(comment)) => mentions.iter().any(|m| comment.contains(m.as_str())),
    }
}

fn labels_match(rule: &Rule, meta: &EventMetadata) -> bool {
    match &rule.labels {
        Some(labels) => labels.iter().any(|l| meta.labels.contains(l)),
        None => true,
    }
}

fn action_matches(rule: &Rule, meta: &EventMetadata) -> bool {
    match (&rule.actions, &meta.action) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(actions), Some(action)) => actions.iter().any(|a| a == action),
    }
}

fn branch_allowed(filter: Option<&BranchFilter>, value: &str) -> bool {
    filter.map_or(true, |f| f.allows(value))
}

fn not_suppressed(rule: &Rule, scheduled: &HashSet<&str>) -> bool {
    match rule.ifnot.as_deref() {
        Some(name) => !scheduled.contains(name),
        None => true,
    }
}
