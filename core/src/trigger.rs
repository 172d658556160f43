//! Scenario triggers as a small serializable expression tree.
//!
//! Triggers are pure over the `EvalContext` except `Chance`, which
//! consumes one draw from the caller's `SelectionRng` when (and only when)
//! evaluation reaches it. `All`/`Any` short-circuit left to right.

use crate::{context::EvalContext, flags::FlagValue, rng::SelectionRng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Cmp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Cmp {
    pub fn test(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            Self::Eq => lhs == rhs,
            Self::Ne => lhs != rhs,
            Self::Lt => lhs < rhs,
            Self::Le => lhs <= rhs,
            Self::Gt => lhs > rhs,
            Self::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Trigger {
    Always,
    Never,
    Month { cmp: Cmp, value: u32 },
    MonthIn { months: Vec<u32> },
    /// Compare the month against a numeric flag plus `offset`. When the flag
    /// is missing, `default` is used; with no default the trigger is false.
    MonthVsFlag {
        cmp: Cmp,
        key: String,
        #[serde(default)]
        offset: i64,
        #[serde(default)]
        default: Option<i64>,
    },
    FlagTrue { key: String },
    FlagNotTrue { key: String },
    FlagEquals { key: String, value: FlagValue },
    FlagNumber { key: String, cmp: Cmp, value: f64 },
    Balance { cmp: Cmp, value: f64 },
    BalanceAfterBills { cmp: Cmp, value: f64 },
    Lifestyle { contains: String },
    Chance { p: f64 },
    All { of: Vec<Trigger> },
    Any { of: Vec<Trigger> },
    Not { of: Box<Trigger> },
}

impl Default for Trigger {
    fn default() -> Self { Self::Always }
}

impl Trigger {
    pub fn eval(&self, ctx: &EvalContext<'_>, rng: &mut SelectionRng) -> bool {
        match self {
            Self::Always => true,
            Self::Never  => false,
            Self::Month { cmp, value } => cmp.test(ctx.month as f64, *value as f64),
            Self::MonthIn { months } => months.contains(&ctx.month),
            Self::MonthVsFlag { cmp, key, offset, default } => {
                match ctx.flags.as_i64(key).or(*default) {
                    Some(base) => cmp.test(ctx.month as f64, base.saturating_add(*offset) as f64),
                    None => false,
                }
            }
            Self::FlagTrue { key }    => ctx.flags.is_true(key),
            Self::FlagNotTrue { key } => !ctx.flags.is_true(key),
            Self::FlagEquals { key, value } => ctx.flags.get(key) == Some(value),
            Self::FlagNumber { key, cmp, value } => ctx
                .flags
                .as_f64(key)
                .map(|v| cmp.test(v, *value))
                .unwrap_or(false),
            Self::Balance { cmp, value } => cmp.test(ctx.balance_now, *value),
            Self::BalanceAfterBills { cmp, value } => cmp.test(ctx.balance_after_bills, *value),
            Self::Lifestyle { contains } => ctx
                .lifestyle_label()
                .contains(contains.to_lowercase().as_str()),
            Self::Chance { p } => rng.chance(*p),
            Self::All { of } => of.iter().all(|t| t.eval(ctx, rng)),
            Self::Any { of } => of.iter().any(|t| t.eval(ctx, rng)),
            Self::Not { of } => !of.eval(ctx, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{flags::FlagStore, types::Lifestyle};

    fn ctx(month: u32, flags: &FlagStore, balance: f64) -> EvalContext<'_> {
        EvalContext {
            month,
            lifestyle: Some(Lifestyle::Benefits),
            flags,
            balance_now: balance,
            balance_after_bills: balance,
        }
    }

    #[test]
    fn boiler_breakdown_predicate() {
        let t: Trigger = serde_json::from_str(
            r#"{"op":"all","of":[
                {"op":"month","cmp":"ge","value":2},
                {"op":"flag_true","key":"boilerBreakdownPlanned"},
                {"op":"flag_not_true","key":"boilerReplaced"}
            ]}"#,
        )
        .unwrap();
        let mut rng = SelectionRng::seeded(1);
        let mut flags = FlagStore::new();
        flags.set("boilerBreakdownPlanned", true);

        assert!(!t.eval(&ctx(1, &flags, 0.0), &mut rng));
        assert!(t.eval(&ctx(2, &flags, 0.0), &mut rng));
        flags.set("boilerReplaced", true);
        assert!(!t.eval(&ctx(3, &flags, 0.0), &mut rng));
    }

    #[test]
    fn month_vs_flag_falls_back_to_default() {
        let t = Trigger::MonthVsFlag {
            cmp: Cmp::Eq,
            key: "storeCardNextOfferMonth".into(),
            offset: 0,
            default: Some(2),
        };
        let mut rng = SelectionRng::seeded(1);
        let mut flags = FlagStore::new();
        assert!(t.eval(&ctx(2, &flags, 0.0), &mut rng));
        flags.set("storeCardNextOfferMonth", 8u32);
        assert!(!t.eval(&ctx(2, &flags, 0.0), &mut rng));
        assert!(t.eval(&ctx(8, &flags, 0.0), &mut rng));
    }

    #[test]
    fn month_vs_flag_saturates_at_the_extremes() {
        let later = Trigger::MonthVsFlag { cmp: Cmp::Lt, key: "storeCardNextOfferMonth".into(), offset: 1, default: None };
        let earlier = Trigger::MonthVsFlag { cmp: Cmp::Gt, key: "storeCardNextOfferMonth".into(), offset: -1, default: None };
        let mut rng = SelectionRng::seeded(1);
        let mut flags = FlagStore::new();
        flags.set("storeCardNextOfferMonth", i64::MAX);
        assert!(later.eval(&ctx(11, &flags, 0.0), &mut rng));
        flags.set("storeCardNextOfferMonth", i64::MIN);
        assert!(earlier.eval(&ctx(0, &flags, 0.0), &mut rng));
    }

    #[test]
    fn chance_short_circuits_behind_false_guard() {
        let t = Trigger::All { of: vec![Trigger::Never, Trigger::Chance { p: 1.0 }] };
        let flags = FlagStore::new();
        let mut a = SelectionRng::seeded(9);
        let mut b = SelectionRng::seeded(9);
        assert!(!t.eval(&ctx(1, &flags, 0.0), &mut a));
        // No draw was consumed, so both streams are still aligned.
        assert_eq!(a.next_u64_below(1_000_000), b.next_u64_below(1_000_000));
    }

    #[test]
    fn overdraft_reads_balance_after_bills() {
        let t = Trigger::BalanceAfterBills { cmp: Cmp::Lt, value: 0.0 };
        let flags = FlagStore::new();
        let mut rng = SelectionRng::seeded(1);
        assert!(t.eval(&ctx(4, &flags, -0.01), &mut rng));
        assert!(!t.eval(&ctx(4, &flags, 0.0), &mut rng));
    }
}
