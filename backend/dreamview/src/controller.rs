//! Pending-amount input, in-flight guard and the permission gate for the
//! fund / withdraw actions.
//!
//! ```text
//!          submit (gate allows, amount parses)
//!   Idle ─────────────────────────────────────► Submitting
//!    ▲                                              │
//!    └──────── settle (success or failure) ─────────┘
//! ```
//!
//! There is no cancel edge. A write that never settles leaves the controller
//! in `Submitting`.

use alloy_primitives::Address;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::{DreamError, Result};
use crate::format::{major_to_minor, DECIMALS};
use crate::snapshot::RemoteSnapshot;
use crate::source::{Action, WriteRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Idle,
    Submitting,
}

/// How a single action button is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Enabled,
    /// Rendered but not clickable.
    Disabled,
    /// Not rendered at all.
    Hidden,
}

/// Which actions the current caller may take on the current snapshot.
///
/// Fund is always rendered and is enabled only while the dream is active.
/// Withdraw is rendered only for the creator, whether or not the dream is
/// active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionGate {
    Disabled,
    FundOnly,
    FundOrWithdraw,
    WithdrawOnly,
}

impl ActionGate {
    pub fn evaluate(snapshot: &RemoteSnapshot, caller: Option<Address>) -> Self {
        let active = snapshot.is_active.loaded().copied().unwrap_or(false);
        match (active, is_creator(snapshot, caller)) {
            (false, false) => Self::Disabled,
            (false, true) => Self::WithdrawOnly,
            (true, false) => Self::FundOnly,
            (true, true) => Self::FundOrWithdraw,
        }
    }

    pub fn fund(self) -> Control {
        match self {
            Self::FundOnly | Self::FundOrWithdraw => Control::Enabled,
            Self::Disabled | Self::WithdrawOnly => Control::Disabled,
        }
    }

    pub fn withdraw(self) -> Control {
        match self {
            Self::FundOrWithdraw | Self::WithdrawOnly => Control::Enabled,
            Self::Disabled | Self::FundOnly => Control::Hidden,
        }
    }

    pub fn allows(self, action: Action) -> bool {
        let control = match action {
            Action::Fund => self.fund(),
            Action::Withdraw => self.withdraw(),
        };
        control == Control::Enabled
    }
}

/// Whether the caller is the loaded creator. Addresses compare by value, so
/// checksum casing never matters. An unknown caller or an unloaded creator
/// never matches.
pub fn is_creator(snapshot: &RemoteSnapshot, caller: Option<Address>) -> bool {
    match (caller, snapshot.creator.loaded()) {
        (Some(caller), Some(creator)) => caller == *creator,
        _ => false,
    }
}

/// One-shot outcome of a write, for whoever presents notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Notice {
    Sent {
        dream_id: u64,
        action: Action,
        tx_hash: String,
    },
    Failed {
        dream_id: u64,
        action: Action,
        reason: String,
    },
}

#[derive(Debug)]
pub struct ActionController {
    amount_input: String,
    state: ActionState,
}

impl Default for ActionController {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionController {
    pub fn new() -> Self {
        Self {
            amount_input: String::new(),
            state: ActionState::Idle,
        }
    }

    pub fn amount_input(&self) -> &str {
        &self.amount_input
    }

    pub fn set_amount_input(&mut self, text: impl Into<String>) {
        self.amount_input = text.into();
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    /// Start over for a different dream. An outstanding write is left to
    /// settle on its own.
    pub fn remount(&mut self) {
        self.amount_input.clear();
    }

    /// Button states for `gate`, with enabled buttons greyed out while a write
    /// is in flight.
    pub fn controls(&self, gate: ActionGate) -> (Control, Control) {
        let busy = |c: Control| match (self.state, c) {
            (ActionState::Submitting, Control::Enabled) => Control::Disabled,
            (_, c) => c,
        };
        (busy(gate.fund()), busy(gate.withdraw()))
    }

    /// Validate a submit and move to `Submitting`.
    ///
    /// Rejections while busy or not permitted leave the input untouched; an
    /// amount that does not parse is cleared like any other attempt.
    pub fn submit(
        &mut self,
        action: Action,
        gate: ActionGate,
        dream_id: u64,
        caller: Option<Address>,
    ) -> Result<WriteRequest> {
        if self.state == ActionState::Submitting {
            return Err(DreamError::Busy);
        }
        if !gate.allows(action) {
            return Err(DreamError::NotPermitted(action));
        }
        let caller = caller.ok_or(DreamError::NoCaller)?;

        let amount = match major_to_minor(&self.amount_input, DECIMALS) {
            Ok(amount) => amount,
            Err(e) => {
                self.amount_input.clear();
                return Err(e);
            }
        };

        self.state = ActionState::Submitting;
        info!("Submitting {action} of {amount} wei on dream {dream_id} from {caller}");
        Ok(WriteRequest {
            dream_id,
            action,
            caller,
            amount,
        })
    }

    /// Return to `Idle` whatever the outcome and hand back the notice to
    /// publish.
    pub fn settle(&mut self, request: &WriteRequest, result: Result<String>) -> Notice {
        self.state = ActionState::Idle;
        self.amount_input.clear();

        let WriteRequest {
            dream_id, action, ..
        } = *request;
        match result {
            Ok(tx_hash) => {
                info!("{action} on dream {dream_id} sent: {tx_hash}");
                Notice::Sent {
                    dream_id,
                    action,
                    tx_hash,
                }
            }
            Err(e) => {
                warn!("{action} on dream {dream_id} failed: {e}");
                Notice::Failed {
                    dream_id,
                    action,
                    reason: e.to_string(),
                }
            }
        }
    }
}
