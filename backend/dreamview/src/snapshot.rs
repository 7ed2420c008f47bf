//! The merged remote state of one dream and the view derived from it.
//!
//! [`RemoteSnapshot`] holds eight independently loaded slots. Each slot is
//! `Pending`, `Loaded` or `Failed` on its own; there is no "ready" flag for the
//! whole record and [`RemoteSnapshot::derive`] never needs one.

use alloy_primitives::{Address, U256};
use serde::Serialize;

use crate::errors::Result;
use crate::format::{
    display_percent, format_days, minor_to_major, percent, percent_label, truncate_middle,
    ADDRESS_DISPLAY_LEN, DECIMALS,
};
use crate::source::FieldValue;

/// The eight getters read for every dream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Creator,
    Wallet,
    IsActive,
    Description,
    TotalGathered,
    Goal,
    TimeLeft,
    IsPromoted,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::Creator,
        Field::Wallet,
        Field::IsActive,
        Field::Description,
        Field::TotalGathered,
        Field::Goal,
        Field::TimeLeft,
        Field::IsPromoted,
    ];

    /// Solidity signature of the contract getter backing this field.
    pub fn getter(&self) -> &'static str {
        match self {
            Self::Creator => "getCreator(uint256)",
            Self::Wallet => "getWithdrawWallet(uint256)",
            Self::IsActive => "getStatus(uint256)",
            Self::Description => "getDescription(uint256)",
            Self::TotalGathered => "getTotalGathered(uint256)",
            Self::Goal => "getGoal(uint256)",
            Self::TimeLeft => "getTimeLeft(uint256)",
            Self::IsPromoted => "getPromoted(uint256)",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Creator => "creator",
            Self::Wallet => "wallet",
            Self::IsActive => "is_active",
            Self::Description => "description",
            Self::TotalGathered => "total_gathered",
            Self::Goal => "goal",
            Self::TimeLeft => "time_left",
            Self::IsPromoted => "is_promoted",
        }
    }
}

/// Load state of a single slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum FieldState<T> {
    #[default]
    Pending,
    Loaded(T),
    Failed(String),
}

impl<T> FieldState<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Self::Loaded(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct RemoteSnapshot {
    pub creator: FieldState<Address>,
    pub wallet: FieldState<Address>,
    pub is_active: FieldState<bool>,
    pub description: FieldState<String>,
    pub total_gathered: FieldState<U256>,
    pub goal: FieldState<U256>,
    pub time_left_days: FieldState<u64>,
    pub is_promoted: FieldState<bool>,
}

impl RemoteSnapshot {
    /// Record the outcome of one field read. A value of the wrong shape for
    /// `field` is recorded as a failure of that field only.
    pub fn commit(&mut self, field: Field, result: Result<FieldValue>) {
        let value = match result {
            Ok(value) => value,
            Err(e) => return self.fail(field, e.to_string()),
        };
        match (field, value) {
            (Field::Creator, FieldValue::Address(a)) => self.creator = FieldState::Loaded(a),
            (Field::Wallet, FieldValue::Address(a)) => self.wallet = FieldState::Loaded(a),
            (Field::IsActive, FieldValue::Flag(b)) => self.is_active = FieldState::Loaded(b),
            (Field::Description, FieldValue::Text(s)) => {
                self.description = FieldState::Loaded(s)
            }
            (Field::TotalGathered, FieldValue::Amount(v)) => {
                self.total_gathered = FieldState::Loaded(v)
            }
            (Field::Goal, FieldValue::Amount(v)) => self.goal = FieldState::Loaded(v),
            (Field::TimeLeft, FieldValue::Days(d)) => self.time_left_days = FieldState::Loaded(d),
            (Field::IsPromoted, FieldValue::Flag(b)) => self.is_promoted = FieldState::Loaded(b),
            (field, other) => self.fail(field, format!("unexpected value {other:?}")),
        }
    }

    fn fail(&mut self, field: Field, reason: String) {
        match field {
            Field::Creator => self.creator = FieldState::Failed(reason),
            Field::Wallet => self.wallet = FieldState::Failed(reason),
            Field::IsActive => self.is_active = FieldState::Failed(reason),
            Field::Description => self.description = FieldState::Failed(reason),
            Field::TotalGathered => self.total_gathered = FieldState::Failed(reason),
            Field::Goal => self.goal = FieldState::Failed(reason),
            Field::TimeLeft => self.time_left_days = FieldState::Failed(reason),
            Field::IsPromoted => self.is_promoted = FieldState::Failed(reason),
        }
    }

    /// Number of slots still waiting on their read.
    pub fn pending_count(&self) -> usize {
        [
            self.creator.is_pending(),
            self.wallet.is_pending(),
            self.is_active.is_pending(),
            self.description.is_pending(),
            self.total_gathered.is_pending(),
            self.goal.is_pending(),
            self.time_left_days.is_pending(),
            self.is_promoted.is_pending(),
        ]
        .into_iter()
        .filter(|p| *p)
        .count()
    }

    /// Compute the display view. Unloaded slots fall back to the zero address,
    /// zero amounts, `false` and an empty description.
    pub fn derive(&self) -> DerivedView {
        let address = |slot: &FieldState<Address>| {
            let addr = slot.loaded().copied().unwrap_or(Address::ZERO);
            truncate_middle(&addr.to_string(), ADDRESS_DISPLAY_LEN)
        };
        let amount = |slot: &FieldState<U256>| {
            minor_to_major(slot.loaded().copied().unwrap_or_default(), DECIMALS)
        };

        let gathered = amount(&self.total_gathered);
        let goal = amount(&self.goal);
        // Same lossy step the card has always shown: exact decimal, then float.
        let gathered_f: f64 = gathered.parse().unwrap_or(0.0);
        let goal_f: f64 = goal.parse().unwrap_or(0.0);
        let progress_percent = percent(gathered_f, goal_f);

        DerivedView {
            creator_display: address(&self.creator),
            wallet_display: address(&self.wallet),
            is_active: self.is_active.loaded().copied().unwrap_or(false),
            description: self.description.loaded().cloned().unwrap_or_default(),
            progress: ProgressBar::new(gathered_f, goal_f, progress_percent),
            gathered,
            goal,
            progress_percent,
            time_left: format_days(self.time_left_days.loaded().copied().unwrap_or(0)),
            is_promoted: self.is_promoted.loaded().copied().unwrap_or(false),
        }
    }
}

/// Display fields computed from a [`RemoteSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedView {
    pub creator_display: String,
    pub wallet_display: String,
    pub is_active: bool,
    pub description: String,
    /// Total gathered in major units.
    pub gathered: String,
    /// Goal in major units.
    pub goal: String,
    /// Uncapped; NaN (serialized as `null`) while the goal is zero or unknown.
    pub progress_percent: f64,
    pub progress: ProgressBar,
    pub time_left: String,
    pub is_promoted: bool,
}

/// A bounded-width progress indicator.
///
/// The fill is clamped to 100 once the dream is overfunded; the label keeps
/// the real figure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressBar {
    pub fill_width: f64,
    pub label: String,
}

impl ProgressBar {
    pub fn new(gathered: f64, goal: f64, progress_percent: f64) -> Self {
        let fill_width = if gathered > goal {
            100.0
        } else {
            display_percent(progress_percent)
        };
        Self {
            fill_width,
            label: percent_label(progress_percent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DreamError;

    fn eth(n: u128) -> U256 {
        U256::from(n * 1_000_000_000_000_000_000)
    }

    #[test]
    fn empty_snapshot_derives_placeholders() {
        let snapshot = RemoteSnapshot::default();
        assert_eq!(snapshot.pending_count(), 8);

        let view = snapshot.derive();
        assert_eq!(view.creator_display, "0x0000...000000");
        assert_eq!(view.wallet_display, "0x0000...000000");
        assert_eq!(view.gathered, "0");
        assert_eq!(view.goal, "0");
        assert!(view.progress_percent.is_nan());
        assert_eq!(view.progress.fill_width, 0.0);
        assert_eq!(view.progress.label, "0%");
        assert_eq!(view.time_left, "0 days left");
        assert!(!view.is_active);
        assert!(!view.is_promoted);
    }

    #[test]
    fn overfunded_dream_clamps_fill_but_not_label() {
        let mut snapshot = RemoteSnapshot::default();
        snapshot.commit(Field::Goal, Ok(FieldValue::Amount(eth(10))));
        snapshot.commit(Field::TotalGathered, Ok(FieldValue::Amount(eth(15))));

        let view = snapshot.derive();
        assert_eq!(view.progress_percent, 150.0);
        assert_eq!(view.progress.fill_width, 100.0);
        assert_eq!(view.progress.label, "150%");
        assert_eq!(view.gathered, "15");
        assert_eq!(view.goal, "10");
    }

    #[test]
    fn partial_funding() {
        let mut snapshot = RemoteSnapshot::default();
        snapshot.commit(Field::Goal, Ok(FieldValue::Amount(eth(4))));
        snapshot.commit(
            Field::TotalGathered,
            Ok(FieldValue::Amount(U256::from(1_000_000_000_000_000_000u128))),
        );
        let view = snapshot.derive();
        assert_eq!(view.progress.fill_width, 25.0);
        assert_eq!(view.progress.label, "25%");
    }

    #[test]
    fn failed_field_stays_local() {
        let mut snapshot = RemoteSnapshot::default();
        snapshot.commit(Field::Creator, Err(DreamError::Decode("bad word".into())));
        snapshot.commit(Field::Description, Ok(FieldValue::Text("A trip".into())));

        assert!(snapshot.creator.is_failed());
        assert_eq!(snapshot.description.loaded().map(String::as_str), Some("A trip"));
        assert_eq!(snapshot.pending_count(), 6);
        assert_eq!(snapshot.derive().creator_display, "0x0000...000000");
    }

    #[test]
    fn mismatched_value_is_a_field_failure() {
        let mut snapshot = RemoteSnapshot::default();
        snapshot.commit(Field::Goal, Ok(FieldValue::Flag(true)));
        assert!(snapshot.goal.is_failed());
        assert!(snapshot.derive().progress_percent.is_nan());
    }

    #[test]
    fn loaded_addresses_are_truncated() {
        let mut snapshot = RemoteSnapshot::default();
        let creator: Address = "0x5b38da6a701c568545dcfcb03fcb875f56beddc4".parse().unwrap();
        snapshot.commit(Field::Creator, Ok(FieldValue::Address(creator)));
        assert_eq!(snapshot.derive().creator_display, "0x5B38...beddC4");
    }

    #[test]
    fn slot_states_serialize_with_status_tag() {
        let mut snapshot = RemoteSnapshot::default();
        snapshot.commit(Field::IsActive, Ok(FieldValue::Flag(true)));
        snapshot.commit(Field::TimeLeft, Err(DreamError::Decode("short".into())));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["is_active"], serde_json::json!({"status": "loaded", "value": true}));
        assert_eq!(json["creator"], serde_json::json!({"status": "pending"}));
        assert_eq!(json["time_left_days"]["status"], "failed");
    }
}
