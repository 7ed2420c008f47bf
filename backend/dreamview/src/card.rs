//! The dream card: one task that owns the aggregator and the action
//! controller and reacts to inputs, read results and write settlements.
//!
//! ```text
//!  CardHandle ──Command──►┐
//!  read tasks ─SlotUpdate─►├─► Card (single task) ──► watch<CardView>
//!  write task ─settlement─►┘                      └──► broadcast<Notice>
//! ```
//!
//! Only this task mutates card state, so nothing is locked. The handle is
//! cheap to clone and can be shared with request handlers.
//!
//! Connectivity has two independent inputs: RPC reachability and the wallet
//! session. The aggregator sees their conjunction, so a reachability tick
//! cannot reopen a session the frontend closed.

use std::sync::Arc;

use alloy_primitives::Address;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::debug;

use crate::aggregator::{dispatch_reads, DreamAggregator, SlotUpdate};
use crate::controller::{ActionController, ActionGate, ActionState, Control, Notice};
use crate::errors::{DreamError, Result};
use crate::snapshot::{DerivedView, RemoteSnapshot};
use crate::source::{Action, DreamSource, WriteRequest};

const NOTICE_CAPACITY: usize = 16;

/// Everything the presentation layer needs to draw the card.
#[derive(Debug, Clone, Serialize)]
pub struct CardView {
    pub dream_id: u64,
    /// Reachable and in a session: reads are flowing.
    pub connected: bool,
    pub reachable: bool,
    pub session_connected: bool,
    pub caller: Option<Address>,
    /// Per-field load state.
    pub fields: RemoteSnapshot,
    pub view: DerivedView,
    pub state: ActionState,
    pub amount_input: String,
    pub gate: ActionGate,
    pub fund: Control,
    pub withdraw: Control,
}

#[derive(Debug)]
enum Command {
    SetReachable(bool),
    SetSession {
        connected: bool,
        caller: Option<Address>,
    },
    SetDreamId(u64),
    SetAmount(String),
    Submit {
        action: Action,
        reply: oneshot::Sender<Result<()>>,
    },
}

type Settlement = (WriteRequest, Result<String>);

#[derive(Debug, Clone)]
pub struct CardHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<CardView>,
    notices: broadcast::Sender<Notice>,
}

impl CardHandle {
    pub fn current(&self) -> CardView {
        self.view.borrow().clone()
    }

    /// A receiver that observes every published view.
    pub fn watch(&self) -> watch::Receiver<CardView> {
        self.view.clone()
    }

    /// One notice per settled write.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| DreamError::CardClosed)
    }

    /// Whether the RPC node answers.
    pub fn set_reachable(&self, reachable: bool) -> Result<()> {
        self.send(Command::SetReachable(reachable))
    }

    /// Wallet session state and the identity it connects as.
    pub fn set_session(&self, connected: bool, caller: Option<Address>) -> Result<()> {
        self.send(Command::SetSession { connected, caller })
    }

    pub fn set_dream_id(&self, dream_id: u64) -> Result<()> {
        self.send(Command::SetDreamId(dream_id))
    }

    pub fn set_amount(&self, amount: impl Into<String>) -> Result<()> {
        self.send(Command::SetAmount(amount.into()))
    }

    /// Ask the card to submit `action`. Resolves once the write has been
    /// handed to the source, not when it settles.
    pub async fn submit(&self, action: Action) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Submit { action, reply })?;
        rx.await.map_err(|_| DreamError::CardClosed)?
    }
}

/// Inputs pushed from outside the card.
#[derive(Debug, Clone, Copy, Default)]
struct Inputs {
    reachable: bool,
    session_connected: bool,
    caller: Option<Address>,
}

impl Inputs {
    fn connected(&self) -> bool {
        self.reachable && self.session_connected
    }
}

struct Card<S> {
    source: Arc<S>,
    aggregator: DreamAggregator,
    controller: ActionController,
    inputs: Inputs,
    reads: mpsc::UnboundedSender<SlotUpdate>,
    writes: mpsc::UnboundedSender<Settlement>,
    view: watch::Sender<CardView>,
    notices: broadcast::Sender<Notice>,
}

/// Start a card for `dream_id`. It stays idle until the RPC is reachable and
/// a session is connected.
pub fn spawn<S: DreamSource>(source: Arc<S>, dream_id: u64) -> CardHandle {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (reads_tx, reads_rx) = mpsc::unbounded_channel();
    let (writes_tx, writes_rx) = mpsc::unbounded_channel();
    let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

    let aggregator = DreamAggregator::new(dream_id);
    let controller = ActionController::new();
    let initial = render(&aggregator, &controller, &Inputs::default());
    let (view_tx, view_rx) = watch::channel(initial);

    let card = Card {
        source,
        aggregator,
        controller,
        inputs: Inputs::default(),
        reads: reads_tx,
        writes: writes_tx,
        view: view_tx,
        notices: notices.clone(),
    };
    tokio::spawn(card.run(commands_rx, reads_rx, writes_rx));

    CardHandle {
        commands: commands_tx,
        view: view_rx,
        notices,
    }
}

fn render(aggregator: &DreamAggregator, controller: &ActionController, inputs: &Inputs) -> CardView {
    let gate = ActionGate::evaluate(aggregator.snapshot(), inputs.caller);
    let (fund, withdraw) = controller.controls(gate);
    CardView {
        dream_id: aggregator.dream_id(),
        connected: aggregator.connected(),
        reachable: inputs.reachable,
        session_connected: inputs.session_connected,
        caller: inputs.caller,
        fields: aggregator.snapshot().clone(),
        view: aggregator.view(),
        state: controller.state(),
        amount_input: controller.amount_input().to_string(),
        gate,
        fund,
        withdraw,
    }
}

impl<S: DreamSource> Card<S> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut reads: mpsc::UnboundedReceiver<SlotUpdate>,
        mut writes: mpsc::UnboundedReceiver<Settlement>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                Some(update) = reads.recv() => {
                    if !self.aggregator.apply(update) {
                        continue;
                    }
                }
                Some((request, result)) = writes.recv() => {
                    let notice = self.controller.settle(&request, result);
                    // No subscribers is fine: the notice is one-shot.
                    let _ = self.notices.send(notice);
                }
            }
            self.publish();
        }
        debug!("Card for dream {} stopped", self.aggregator.dream_id());
    }

    fn publish(&self) {
        self.view
            .send_replace(render(&self.aggregator, &self.controller, &self.inputs));
    }

    /// Feed the combined connectivity to the aggregator. Only a false → true
    /// edge of the combination starts an activation.
    fn sync_connected(&mut self) {
        if let Some(activation) = self.aggregator.set_connected(self.inputs.connected()) {
            dispatch_reads(&self.source, activation, &self.reads);
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SetReachable(reachable) => {
                self.inputs.reachable = reachable;
                self.sync_connected();
            }
            Command::SetSession { connected, caller } => {
                self.inputs.session_connected = connected;
                self.inputs.caller = caller;
                self.sync_connected();
            }
            Command::SetDreamId(dream_id) => {
                if dream_id != self.aggregator.dream_id() {
                    self.controller.remount();
                }
                if let Some(activation) = self.aggregator.set_dream_id(dream_id) {
                    dispatch_reads(&self.source, activation, &self.reads);
                }
            }
            Command::SetAmount(amount) => self.controller.set_amount_input(amount),
            Command::Submit { action, reply } => {
                let _ = reply.send(self.submit(action));
            }
        }
    }

    fn submit(&mut self, action: Action) -> Result<()> {
        let caller = self.inputs.caller;
        let gate = ActionGate::evaluate(self.aggregator.snapshot(), caller);
        let request = self
            .controller
            .submit(action, gate, self.aggregator.dream_id(), caller)?;

        let source = Arc::clone(&self.source);
        let writes = self.writes.clone();
        tokio::spawn(async move {
            let result = source.write(&request).await;
            let _ = writes.send((request, result));
        });
        Ok(())
    }
}
