//! # Menu Resolution Engine
//!
//! Selects exactly one active menu for a requesting session out of several
//! candidates, by priority and attached rules, falling back to the
//! designated fallback menu.
//!
//! ## Resolution Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve(menus, context)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Sort active menus: priority asc, created_at asc, id asc               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  For each non-fallback menu:                                           │
//! │       ├── every active rule passes?  ──► return it                     │
//! │       └── any rule fails?            ──► next candidate                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  No candidate qualified ──► fallback menu                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  No fallback either ──► ConfigurationError                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism
//! Two active non-fallback menus sharing a priority is an operator mistake
//! the engine *warns* about but still resolves deterministically: ties break
//! by creation time, then id. Calling resolve twice with the same inputs
//! always yields the same menu.
//!
//! ## Time Ranges
//! `time_range` rules are half-open `[from, to)`. A range whose `from` is
//! later than its `to` wraps midnight: `22:00 → 04:00` covers late evening
//! and early morning. `from == to` denotes the empty range and never
//! matches.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{Menu, MenuRule, RuleConfig, RuleType, SessionType};
use crate::validation::{parse_time_of_day, validate_weekday};

// =============================================================================
// Resolution Context
// =============================================================================

/// Everything about the requesting session the rules can see.
///
/// Time is an input, never read from a clock in here - resolution is a pure
/// function of (menus, context).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionContext {
    pub session_type: SessionType,

    /// Identity of the requesting table, if the session sits at one.
    pub table_id: Option<String>,

    /// Identity of the requesting bar terminal, if any.
    pub bar_id: Option<String>,

    /// Venue-local date and time of the resolution.
    #[ts(as = "String")]
    pub local_time: NaiveDateTime,
}

impl ResolutionContext {
    fn minutes_of_day(&self) -> u32 {
        self.local_time.hour() * 60 + self.local_time.minute()
    }

    fn weekday(&self) -> u8 {
        // 0 = Sunday .. 6 = Saturday, matching rule payloads.
        self.local_time.weekday().num_days_from_sunday() as u8
    }
}

// =============================================================================
// Override Strategy
// =============================================================================

/// How a `manual_override` rule interacts with other rules on the same menu.
///
/// The product question "does an operator override beat the schedule?" is
/// genuinely open, so the engine takes the answer as a parameter instead of
/// hard-coding one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OverrideStrategy {
    /// The override is one more ANDed rule: enabled passes, disabled fails,
    /// everything else must still hold.
    #[default]
    Conjunctive,

    /// An override decides alone: enabled forces the menu eligible,
    /// disabled forces it ineligible, other rules are not consulted.
    ShortCircuit,
}

// =============================================================================
// Resolution Result
// =============================================================================

/// Advisory findings surfaced to operators alongside a resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ResolutionWarning {
    /// Two or more active non-fallback menus share a priority; ties broke
    /// by creation time.
    PriorityConflict { priority: i64, menu_ids: Vec<String> },

    /// More than one fallback menu exists; the oldest one is used.
    MultipleFallbacks { menu_ids: Vec<String> },
}

/// The selected menu plus advisory warnings.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub menu_id: String,
    pub menu_name: String,
    pub used_fallback: bool,
    pub warnings: Vec<ResolutionWarning>,
}

// =============================================================================
// Resolution
// =============================================================================

/// Resolves the active menu for a context.
///
/// `menus` is the full set of the store's **active** menus with their rules
/// attached; order does not matter (sorted internally).
pub fn resolve(
    menus: &[Menu],
    ctx: &ResolutionContext,
    strategy: OverrideStrategy,
) -> CoreResult<Resolution> {
    let mut sorted: Vec<&Menu> = menus.iter().filter(|m| m.is_active).collect();
    sorted.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });

    let warnings = collect_warnings(&sorted);

    for menu in sorted.iter().filter(|m| !m.is_fallback) {
        if menu_eligible(menu, ctx, strategy)? {
            return Ok(Resolution {
                menu_id: menu.id.clone(),
                menu_name: menu.name.clone(),
                used_fallback: false,
                warnings,
            });
        }
    }

    // Nothing qualified: serve the fallback (oldest one if misconfigured
    // with several).
    if let Some(fallback) = sorted.iter().find(|m| m.is_fallback) {
        return Ok(Resolution {
            menu_id: fallback.id.clone(),
            menu_name: fallback.name.clone(),
            used_fallback: true,
            warnings,
        });
    }

    Err(CoreError::ConfigurationError(
        "no eligible menu and no fallback menu configured".to_string(),
    ))
}

/// Whether every active rule of `menu` admits the context.
///
/// A menu with no active rules is always eligible (vacuous truth): it
/// competes purely on priority.
fn menu_eligible(
    menu: &Menu,
    ctx: &ResolutionContext,
    strategy: OverrideStrategy,
) -> CoreResult<bool> {
    let active: Vec<&MenuRule> = menu.rules.iter().filter(|r| r.is_active).collect();

    if strategy == OverrideStrategy::ShortCircuit {
        if let Some(rule) = active
            .iter()
            .find(|r| r.rule_type == RuleType::ManualOverride)
        {
            return match &rule.config {
                RuleConfig::ManualOverride { enabled } => Ok(*enabled),
                other => Err(mismatched_config(menu, rule, other)),
            };
        }
    }

    for rule in active {
        if !rule_passes(menu, rule, ctx)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Evaluates one rule against the context.
fn rule_passes(menu: &Menu, rule: &MenuRule, ctx: &ResolutionContext) -> CoreResult<bool> {
    match (&rule.rule_type, &rule.config) {
        (RuleType::SessionType, RuleConfig::SessionType { values }) => {
            Ok(values.contains(&ctx.session_type))
        }

        (RuleType::Tables, RuleConfig::Tables { table_ids }) => {
            let table_match = ctx
                .table_id
                .as_ref()
                .map_or(false, |id| table_ids.contains(id));
            let bar_match = ctx
                .bar_id
                .as_ref()
                .map_or(false, |id| table_ids.contains(id));
            Ok(table_match || bar_match)
        }

        (RuleType::TimeRange, RuleConfig::TimeRange { from, to }) => {
            let from = parse_time_of_day(from)?;
            let to = parse_time_of_day(to)?;
            let now = ctx.minutes_of_day();
            Ok(if from < to {
                now >= from && now < to
            } else if from > to {
                // Wraps midnight
                now >= from || now < to
            } else {
                // [x, x) is empty
                false
            })
        }

        (RuleType::Weekdays, RuleConfig::Weekdays { days }) => {
            for day in days {
                validate_weekday(*day)?;
            }
            Ok(days.contains(&ctx.weekday()))
        }

        (RuleType::ManualOverride, RuleConfig::ManualOverride { enabled }) => Ok(*enabled),

        (_, other) => Err(mismatched_config(menu, rule, other)),
    }
}

fn mismatched_config(menu: &Menu, rule: &MenuRule, config: &RuleConfig) -> CoreError {
    CoreError::ConfigurationError(format!(
        "menu {} rule {} has {:?} payload for rule type {:?}",
        menu.id, rule.id, config, rule.rule_type
    ))
}

fn collect_warnings(sorted: &[&Menu]) -> Vec<ResolutionWarning> {
    let mut warnings = Vec::new();

    // Duplicate priorities among active non-fallback menus.
    let mut by_priority: Vec<(i64, Vec<String>)> = Vec::new();
    for menu in sorted.iter().filter(|m| !m.is_fallback) {
        match by_priority.iter_mut().find(|(p, _)| *p == menu.priority) {
            Some((_, ids)) => ids.push(menu.id.clone()),
            None => by_priority.push((menu.priority, vec![menu.id.clone()])),
        }
    }
    for (priority, menu_ids) in by_priority {
        if menu_ids.len() > 1 {
            warnings.push(ResolutionWarning::PriorityConflict { priority, menu_ids });
        }
    }

    let fallbacks: Vec<String> = sorted
        .iter()
        .filter(|m| m.is_fallback)
        .map(|m| m.id.clone())
        .collect();
    if fallbacks.len() > 1 {
        warnings.push(ResolutionWarning::MultipleFallbacks {
            menu_ids: fallbacks,
        });
    }

    warnings
}

// =============================================================================
// Rule Config Parsing
// =============================================================================

/// Parses a persisted JSON rule payload according to its declared type.
///
/// Parsing is strict: an unknown shape is a configuration error, not a
/// silently-skipped rule.
pub fn parse_rule_config(
    rule_type: RuleType,
    value: &serde_json::Value,
) -> CoreResult<RuleConfig> {
    #[derive(Deserialize)]
    struct SessionTypeCfg {
        values: Vec<SessionType>,
    }
    #[derive(Deserialize)]
    struct TablesCfg {
        table_ids: Vec<String>,
    }
    #[derive(Deserialize)]
    struct TimeRangeCfg {
        from: String,
        to: String,
    }
    #[derive(Deserialize)]
    struct WeekdaysCfg {
        days: Vec<u8>,
    }
    #[derive(Deserialize)]
    struct ManualOverrideCfg {
        enabled: bool,
    }

    let parse_error = |e: serde_json::Error| {
        CoreError::ConfigurationError(format!("malformed {rule_type:?} rule payload: {e}"))
    };

    Ok(match rule_type {
        RuleType::SessionType => {
            let cfg: SessionTypeCfg =
                serde_json::from_value(value.clone()).map_err(parse_error)?;
            RuleConfig::SessionType { values: cfg.values }
        }
        RuleType::Tables => {
            let cfg: TablesCfg = serde_json::from_value(value.clone()).map_err(parse_error)?;
            RuleConfig::Tables {
                table_ids: cfg.table_ids,
            }
        }
        RuleType::TimeRange => {
            let cfg: TimeRangeCfg = serde_json::from_value(value.clone()).map_err(parse_error)?;
            parse_time_of_day(&cfg.from)?;
            parse_time_of_day(&cfg.to)?;
            RuleConfig::TimeRange {
                from: cfg.from,
                to: cfg.to,
            }
        }
        RuleType::Weekdays => {
            let cfg: WeekdaysCfg = serde_json::from_value(value.clone()).map_err(parse_error)?;
            for day in &cfg.days {
                validate_weekday(*day)?;
            }
            RuleConfig::Weekdays { days: cfg.days }
        }
        RuleType::ManualOverride => {
            let cfg: ManualOverrideCfg =
                serde_json::from_value(value.clone()).map_err(parse_error)?;
            RuleConfig::ManualOverride {
                enabled: cfg.enabled,
            }
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
