//! Structural checks over a whole callback set.
//!
//! Every problem is collected; nothing stops at the first failure. A
//! non-empty result means the set must not be scheduled.

use std::collections::{BTreeSet, HashSet};
use switchyard_core::{
    CallbackDefinition, CallbackProperty, ComponentId, DepRole, DictId, PatternValue,
    ValidationIssue, Wildcard,
};
use tracing::warn;

const INVALID_ID_CHARS: [char; 2] = ['.', '{'];

/// Validate every callback, accumulating all issues found.
pub fn validate(definitions: &[CallbackDefinition]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut outputs = OutputRegistry::default();

    for def in definitions {
        let has_outputs = def.has_outputs();
        if !has_outputs {
            warn!(callback = %describe(def), "callback has no outputs, it will never be dispatched");
        }

        let head = def.head();
        if def.inputs().is_empty() {
            issues.push(ValidationIssue::new(
                "A callback is missing Inputs",
                [
                    head.clone(),
                    "there are no `Input` elements.".to_string(),
                    "Without `Input` elements, it will never get called.".to_string(),
                    String::new(),
                    "Subscribing to `Input` components will cause the".to_string(),
                    "callback to be called whenever their values change.".to_string(),
                ],
            ));
        }

        for role in [DepRole::Output, DepRole::Input, DepRole::State] {
            if role == DepRole::Output && !has_outputs {
                continue;
            }
            for (i, arg) in def.args(role).iter().enumerate() {
                validate_arg(arg, &head, role, i, &mut issues);
            }
        }

        if has_outputs {
            outputs.check(def, &head, &mut issues);
            find_in_out_overlap(def, &head, &mut issues);
            find_mismatched_wildcards(def, &head, &mut issues);
        }
    }

    issues
}

fn describe(def: &CallbackDefinition) -> String {
    let list = |props: &[CallbackProperty]| {
        props
            .iter()
            .map(CallbackProperty::combined)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "output: {:?}, inputs: [{}], state: [{}]",
        def.output(),
        list(def.inputs()),
        list(def.state())
    )
}

fn validate_arg(
    arg: &CallbackProperty,
    head: &str,
    role: DepRole,
    index: usize,
    issues: &mut Vec<ValidationIssue>,
) {
    if arg.property.is_empty() {
        issues.push(ValidationIssue::new(
            "Callback property error",
            [
                head.to_string(),
                format!("{role}[{index}].property = \"\""),
                "but we expected `property` to be a non-empty string.".to_string(),
            ],
        ));
    }

    match &arg.id {
        ComponentId::Dict(dict) => {
            if dict.is_empty() {
                issues.push(ValidationIssue::new(
                    "Callback item missing ID",
                    [
                        head.to_string(),
                        format!("{role}[{index}].id = {{}}"),
                        "Every item linked to a callback needs an ID".to_string(),
                    ],
                ));
            }
            for (key, value) in dict.iter() {
                if key.is_empty() {
                    issues.push(ValidationIssue::new(
                        "Callback wildcard ID error",
                        [
                            head.to_string(),
                            format!("{role}[{index}].id has key \"\""),
                            "Keys must be non-empty strings.".to_string(),
                        ],
                    ));
                }
                let Some(w) = value.wildcard() else {
                    continue;
                };
                if !role.allows(w) {
                    let allowed: Vec<&str> =
                        role.allowed_wildcards().iter().map(|w| w.name()).collect();
                    issues.push(ValidationIssue::new(
                        "Callback wildcard ID error",
                        [
                            head.to_string(),
                            format!("{role}[{index}].id[\"{key}\"] = {w}"),
                            format!("Allowed wildcards for {role}s are:"),
                            allowed.join(", "),
                        ],
                    ));
                }
            }
        }
        ComponentId::Plain(id) => {
            if id.is_empty() {
                issues.push(ValidationIssue::new(
                    "Callback item missing ID",
                    [
                        head.to_string(),
                        format!("{role}[{index}].id = \"\""),
                        "Every item linked to a callback needs an ID".to_string(),
                    ],
                ));
            }
            let invalid: Vec<String> = INVALID_ID_CHARS
                .iter()
                .filter(|c| id.contains(**c))
                .map(char::to_string)
                .collect();
            if !invalid.is_empty() {
                issues.push(ValidationIssue::new(
                    "Callback invalid ID string",
                    [
                        head.to_string(),
                        format!("{role}[{index}].id = '{id}'"),
                        format!("characters '{}' are not allowed.", invalid.join("', '")),
                    ],
                ));
            }
        }
    }
}

/// Outputs registered by callbacks seen so far.
#[derive(Default)]
struct OutputRegistry {
    exact: HashSet<String>,
    patterns: Vec<CallbackProperty>,
}

impl OutputRegistry {
    fn check(&mut self, def: &CallbackDefinition, head: &str, issues: &mut Vec<ValidationIssue>) {
        let mut own_exact: Vec<(usize, String)> = Vec::new();
        let mut own_patterns: Vec<(usize, &CallbackProperty)> = Vec::new();

        for (i, out) in def.outputs().iter().enumerate() {
            let combined = out.combined();
            match &out.id {
                ComponentId::Dict(_) => {
                    if let Some((j, prior)) = own_patterns.iter().find(|(_, p)| wildcard_overlap(out, p)) {
                        issues.push(duplicate_within(head, i, &combined, *j, &prior.combined()));
                    } else if let Some(other) = self.patterns.iter().find(|p| wildcard_overlap(out, p)) {
                        issues.push(ValidationIssue::new(
                            "Overlapping wildcard callback outputs",
                            [
                                head.to_string(),
                                format!("Output {i} ({combined})"),
                                format!("overlaps another output ({})", other.combined()),
                                "used in a different callback.".to_string(),
                            ],
                        ));
                    }
                    own_patterns.push((i, out));
                }
                ComponentId::Plain(_) => {
                    if let Some((j, prior)) = own_exact.iter().find(|(_, c)| *c == combined) {
                        issues.push(duplicate_within(head, i, &combined, *j, prior));
                    } else if self.exact.contains(&combined) {
                        issues.push(ValidationIssue::new(
                            "Duplicate callback outputs",
                            [
                                head.to_string(),
                                format!("Output {i} ({combined}) is already in use."),
                                "To resolve this, combine these into one callback function,".to_string(),
                                "distinguishing the trigger by using the changed prop ids.".to_string(),
                            ],
                        ));
                    }
                    own_exact.push((i, combined));
                }
            }
        }

        self.exact.extend(own_exact.into_iter().map(|(_, c)| c));
        self.patterns.extend(own_patterns.into_iter().map(|(_, p)| p.clone()));
    }
}

fn duplicate_within(head: &str, i: usize, combined: &str, j: usize, other: &str) -> ValidationIssue {
    ValidationIssue::new(
        "Duplicate callback Outputs",
        [
            head.to_string(),
            format!("Output {i} ({combined}) is already used by this callback."),
            format!("Output {j} ({other}) overlaps it."),
        ],
    )
}

/// Whether two wildcard properties can reach a common component.
fn wildcard_overlap(a: &CallbackProperty, b: &CallbackProperty) -> bool {
    if a.property != b.property {
        return false;
    }
    match (&a.id, &b.id) {
        (ComponentId::Dict(x), ComponentId::Dict(y)) => dicts_overlap(x, y),
        _ => false,
    }
}

fn dicts_overlap(a: &DictId, b: &DictId) -> bool {
    a.key_string() == b.key_string()
        && a.iter().all(|(key, av)| b.get(key).is_some_and(|bv| values_overlap(av, bv)))
}

fn values_overlap(a: &PatternValue, b: &PatternValue) -> bool {
    match (a, b) {
        (PatternValue::Wild(x), PatternValue::Wild(y)) => !matches!(
            (x, y),
            (Wildcard::Match, Wildcard::AllSmaller) | (Wildcard::AllSmaller, Wildcard::Match)
        ),
        (PatternValue::Wild(_), _) | (_, PatternValue::Wild(_)) => true,
        (PatternValue::Exact(x), PatternValue::Exact(y)) => x == y,
    }
}

fn find_in_out_overlap(def: &CallbackDefinition, head: &str, issues: &mut Vec<ValidationIssue>) {
    for out in def.outputs() {
        for input in def.inputs() {
            if out.property != input.property {
                continue;
            }
            let same = match (&out.id, &input.id) {
                (ComponentId::Plain(a), ComponentId::Plain(b)) => a == b,
                (ComponentId::Dict(_), ComponentId::Dict(_)) => wildcard_overlap(out, input),
                _ => false,
            };
            if same {
                issues.push(ValidationIssue::new(
                    "Same `Input` and `Output`",
                    [
                        head.to_string(),
                        format!("Input {} ({})", input.id.stringify(), input.property),
                        "can match the same component(s) as".to_string(),
                        format!("Output {} ({})", out.id.stringify(), out.property),
                    ],
                ));
            }
        }
    }
}

fn match_keys(prop: &CallbackProperty) -> BTreeSet<String> {
    prop.id
        .as_dict()
        .map(|d| d.wildcard_keys(Wildcard::Match).into_iter().collect())
        .unwrap_or_default()
}

fn find_mismatched_wildcards(
    def: &CallbackDefinition,
    head: &str,
    issues: &mut Vec<ValidationIssue>,
) {
    let Some(first) = def.outputs().first() else {
        return;
    };
    let out0_keys = match_keys(first);

    for (i, out) in def.outputs().iter().enumerate().skip(1) {
        if match_keys(out) != out0_keys {
            issues.push(ValidationIssue::new(
                "Mismatched `MATCH` wildcards across `Output`s",
                [
                    head.to_string(),
                    format!("Output {i} ({})", out.combined()),
                    format!(
                        "does not have MATCH wildcards on the same keys as Output 0 ({}).",
                        first.combined()
                    ),
                    "MATCH wildcards must be on the same keys for all Outputs.".to_string(),
                    "ALL wildcards need not match, only MATCH.".to_string(),
                ],
            ));
        }
    }

    for role in [DepRole::Input, DepRole::State] {
        for (i, arg) in def.args(role).iter().enumerate() {
            let Some(dict) = arg.id.as_dict() else {
                continue;
            };
            let extra: Vec<String> = dict
                .iter()
                .filter(|(key, v)| {
                    (v.is(Wildcard::Match) || v.is(Wildcard::AllSmaller)) && !out0_keys.contains(*key)
                })
                .map(|(key, _)| key.to_string())
                .collect();
            if !extra.is_empty() {
                issues.push(ValidationIssue::new(
                    "`Input` / `State` wildcards not in `Output`s",
                    [
                        head.to_string(),
                        format!("{role} {i} ({})", arg.combined()),
                        format!("has MATCH or ALLSMALLER on key(s) {}", extra.join(", ")),
                        format!("where Output 0 ({}) does not have a MATCH wildcard.", first.combined()),
                        "Inputs and State do not need every MATCH from the Output(s),".to_string(),
                        "but they cannot have extras beyond the Output(s).".to_string(),
                    ],
                ));
            }
        }
    }
}
