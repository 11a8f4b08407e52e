//! Flow-set transformation for traffic mirroring.
//!
//! Pure functions, no I/O: given the raw flow set of one switch, a
//! selection policy and a target output port, derive the
//! `(original, mirror)` flow-set pair. The original subset is the
//! restorable pre-mirror state with transient runtime fields stripped;
//! the mirror subset is identical except for exactly one extra trailing
//! output action per rule, pointing at the monitoring port. Matches are
//! never rewritten. Relative rule order is preserved, and a selection
//! with zero matches yields two empty sets.

use crate::error::{MirrorError, MirrorResult};
use crate::tables::{CIRCUIT_COOKIE_PREFIX, CIRCUIT_ID_LEN};
use crate::types::{FlowAction, FlowRule, FlowSet};

/// Derives the cookie value correlating flow rules with a circuit: the
/// hexadecimal integer `0xaa{circuit_id}`.
pub fn circuit_cookie(circuit_id: &str) -> MirrorResult<u64> {
    if circuit_id.len() != CIRCUIT_ID_LEN {
        return Err(MirrorError::validation(format!(
            "circuit_id must be a {CIRCUIT_ID_LEN}-character token: {circuit_id}"
        )));
    }
    u64::from_str_radix(&format!("{CIRCUIT_COOKIE_PREFIX}{circuit_id}"), 16).map_err(|_| {
        MirrorError::validation(format!("circuit_id is not a hex token: {circuit_id}"))
    })
}

/// Runtime fields stripped from every selected rule before it is stored.
fn strip_runtime_fields(rule: &mut FlowRule) {
    rule.stats = None;
    rule.hard_timeout = None;
    rule.id = None;
    rule.idle_timeout = None;
    rule.switch = None;
}

/// By-circuit policy: selects rules whose cookie equals the circuit's
/// derived cookie and appends the output action to the first
/// instruction's action list.
///
/// The original copy additionally drops `cookie_mask`.
pub fn mirror_by_circuit(
    flows: &FlowSet,
    cookie: u64,
    target_port: u32,
) -> MirrorResult<(FlowSet, FlowSet)> {
    let mut original = FlowSet::new();
    let mut mirror = FlowSet::new();

    for rule in flows.flows.iter().filter(|r| r.cookie == Some(cookie)) {
        let mut stripped = rule.clone();
        strip_runtime_fields(&mut stripped);
        stripped.cookie_mask = None;

        let mut mirrored = stripped.clone();
        let first = mirrored
            .instructions
            .as_mut()
            .and_then(|instructions| instructions.first_mut())
            .ok_or_else(|| {
                MirrorError::MalformedFlow(format!(
                    "rule with cookie {cookie:#x} has no instructions"
                ))
            })?;
        first.actions.push(FlowAction::output(target_port));

        original.flows.push(stripped);
        mirror.flows.push(mirrored);
    }

    Ok((original, mirror))
}

/// By-interface policy: selects rules whose match `in_port` equals the
/// interface port or whose flat action list egresses on it, and appends
/// the output action directly to that flat action list.
///
/// The original copy additionally drops `priority`.
pub fn mirror_by_interface(
    flows: &FlowSet,
    interface_port: u32,
    target_port: u32,
) -> MirrorResult<(FlowSet, FlowSet)> {
    let mut original = FlowSet::new();
    let mut mirror = FlowSet::new();

    for rule in flows.flows.iter().filter(|r| selects(r, interface_port)) {
        let mut stripped = rule.clone();
        strip_runtime_fields(&mut stripped);
        stripped.priority = None;

        let mut mirrored = stripped.clone();
        let actions = mirrored.actions.as_mut().ok_or_else(|| {
            MirrorError::MalformedFlow(format!(
                "rule matching port {interface_port} has no action list"
            ))
        })?;
        actions.push(FlowAction::output(target_port));

        original.flows.push(stripped);
        mirror.flows.push(mirrored);
    }

    Ok((original, mirror))
}

/// Selection predicate of the by-interface policy: traffic enters or
/// leaves the switch on `port`.
fn selects(rule: &FlowRule, port: u32) -> bool {
    if rule.r#match.as_ref().and_then(|m| m.in_port) == Some(port) {
        return true;
    }
    rule.actions
        .as_ref()
        .is_some_and(|actions| actions.iter().any(|a| a.targets_port(port)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{circuit_rule, interface_rule};
    use pretty_assertions::assert_eq;

    const COOKIE: u64 = 0xaa1234567890abcd;

    #[test]
    fn test_circuit_cookie_derivation() {
        assert_eq!(circuit_cookie("1234567890abcd").unwrap(), COOKIE);
    }

    #[test]
    fn test_circuit_cookie_rejects_bad_tokens() {
        assert!(circuit_cookie("short").is_err());
        assert!(circuit_cookie("zzzzzzzzzzzzzz").is_err());
        assert!(circuit_cookie("1234567890abcd0").is_err());
    }

    #[test]
    fn test_by_circuit_selects_only_matching_cookie() {
        let flows = FlowSet {
            flows: vec![
                circuit_rule(COOKIE, 1),
                circuit_rule(0xdead, 1),
                circuit_rule(COOKIE, 3),
            ],
        };

        let (original, mirror) = mirror_by_circuit(&flows, COOKIE, 2).unwrap();
        assert_eq!(original.len(), 2);
        assert_eq!(mirror.len(), 2);
        // Relative order preserved: out ports 1 then 3.
        assert_eq!(
            original.flows[0].instructions.as_ref().unwrap()[0].actions[0].port,
            Some(1)
        );
        assert_eq!(
            original.flows[1].instructions.as_ref().unwrap()[0].actions[0].port,
            Some(3)
        );
    }

    #[test]
    fn test_by_circuit_alignment_and_appended_action() {
        let flows = FlowSet {
            flows: vec![circuit_rule(COOKIE, 1)],
        };

        let (original, mirror) = mirror_by_circuit(&flows, COOKIE, 2).unwrap();
        assert_eq!(original.len(), mirror.len());

        let orig_actions = &original.flows[0].instructions.as_ref().unwrap()[0].actions;
        let mirr_actions = &mirror.flows[0].instructions.as_ref().unwrap()[0].actions;
        assert_eq!(mirr_actions.len(), orig_actions.len() + 1);
        assert_eq!(&mirr_actions[..orig_actions.len()], &orig_actions[..]);
        assert_eq!(*mirr_actions.last().unwrap(), FlowAction::output(2));
    }

    #[test]
    fn test_by_circuit_strips_runtime_fields() {
        let flows = FlowSet {
            flows: vec![circuit_rule(COOKIE, 1)],
        };

        let (original, mirror) = mirror_by_circuit(&flows, COOKIE, 2).unwrap();
        for rule in original.flows.iter().chain(mirror.flows.iter()) {
            assert_eq!(rule.stats, None);
            assert_eq!(rule.hard_timeout, None);
            assert_eq!(rule.idle_timeout, None);
            assert_eq!(rule.id, None);
            assert_eq!(rule.switch, None);
            assert_eq!(rule.cookie_mask, None);
            // The cookie itself is kept so the rules stay correlated.
            assert_eq!(rule.cookie, Some(COOKIE));
            // Priority is kept on the circuit path.
            assert!(rule.priority.is_some());
        }
    }

    #[test]
    fn test_by_circuit_match_never_rewritten() {
        let flows = FlowSet {
            flows: vec![circuit_rule(COOKIE, 1)],
        };

        let (original, mirror) = mirror_by_circuit(&flows, COOKIE, 2).unwrap();
        assert_eq!(original.flows[0].r#match, flows.flows[0].r#match);
        assert_eq!(mirror.flows[0].r#match, flows.flows[0].r#match);
    }

    #[test]
    fn test_by_circuit_zero_matches_is_empty_not_error() {
        let flows = FlowSet {
            flows: vec![circuit_rule(0xdead, 1)],
        };

        let (original, mirror) = mirror_by_circuit(&flows, COOKIE, 2).unwrap();
        assert!(original.is_empty());
        assert!(mirror.is_empty());
    }

    #[test]
    fn test_by_circuit_rule_without_instructions_is_malformed() {
        let mut rule = circuit_rule(COOKIE, 1);
        rule.instructions = None;
        let flows = FlowSet { flows: vec![rule] };

        let err = mirror_by_circuit(&flows, COOKIE, 2).unwrap_err();
        assert!(matches!(err, MirrorError::MalformedFlow(_)));
    }

    #[test]
    fn test_by_interface_selects_on_in_port_or_out_port() {
        let flows = FlowSet {
            flows: vec![
                interface_rule(Some(3), 1),  // in_port match
                interface_rule(Some(9), 3),  // output match
                interface_rule(Some(9), 10), // no match
                interface_rule(None, 3),     // output match, no in_port
            ],
        };

        let (original, mirror) = mirror_by_interface(&flows, 3, 5).unwrap();
        assert_eq!(original.len(), 3);
        assert_eq!(mirror.len(), 3);
    }

    #[test]
    fn test_by_interface_appends_to_flat_action_list() {
        let flows = FlowSet {
            flows: vec![interface_rule(Some(3), 1)],
        };

        let (original, mirror) = mirror_by_interface(&flows, 3, 5).unwrap();
        let orig_actions = original.flows[0].actions.as_ref().unwrap();
        let mirr_actions = mirror.flows[0].actions.as_ref().unwrap();
        assert_eq!(mirr_actions.len(), orig_actions.len() + 1);
        assert_eq!(*mirr_actions.last().unwrap(), FlowAction::output(5));
        // No instruction wrapper appears on the interface path.
        assert_eq!(mirror.flows[0].instructions, None);
    }

    #[test]
    fn test_by_interface_strips_priority_too() {
        let flows = FlowSet {
            flows: vec![interface_rule(Some(3), 1)],
        };

        let (original, mirror) = mirror_by_interface(&flows, 3, 5).unwrap();
        for rule in original.flows.iter().chain(mirror.flows.iter()) {
            assert_eq!(rule.priority, None);
            assert_eq!(rule.stats, None);
            assert_eq!(rule.id, None);
            assert_eq!(rule.switch, None);
            // cookie_mask is kept on the interface path.
        }
    }

    #[test]
    fn test_by_interface_zero_matches_is_empty() {
        let flows = FlowSet {
            flows: vec![interface_rule(Some(9), 10)],
        };

        let (original, mirror) = mirror_by_interface(&flows, 3, 5).unwrap();
        assert!(original.is_empty());
        assert!(mirror.is_empty());
    }

    #[test]
    fn test_by_interface_rule_without_actions_is_malformed() {
        let mut rule = interface_rule(Some(3), 1);
        rule.actions = None;
        let flows = FlowSet { flows: vec![rule] };

        let err = mirror_by_interface(&flows, 3, 5).unwrap_err();
        assert!(matches!(err, MirrorError::MalformedFlow(_)));
    }
}
