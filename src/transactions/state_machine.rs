use statig::prelude::*;

/// Milestones reported by a serial chain while it drives its children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    Launch { child: String },
    Drained,
    ChildFailed { child: String },
    ChildTimedOut { child: String },
    Settled { succeeded: bool },
    WatchdogFired,
}

/// Externally visible progress of a serial chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialProgress {
    Idle,
    /// 1-based position of the child currently in flight
    RunningChild(usize),
    Finalizing,
    Aborted,
    Succeeded,
    Failed,
}

impl SerialProgress {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SerialProgress::Succeeded | SerialProgress::Failed)
    }
}

#[derive(Debug, Default)]
pub struct ChainTracker {
    chain: String,
}

impl ChainTracker {
    pub fn new(chain: String) -> Self {
        Self { chain }
    }
}

#[state_machine(initial = "State::idle()", state(derive(Debug, Clone, PartialEq, Eq)))]
impl ChainTracker {
    #[state]
    fn idle(&mut self, event: &ChainEvent) -> Outcome<State> {
        match event {
            ChainEvent::Launch { child } => {
                tracing::debug!(chain = %self.chain, child = %child, position = 1, "Launching first sub transaction");
                Transition(State::running_child(1))
            }
            ChainEvent::Drained => Transition(State::finalizing()),
            ChainEvent::WatchdogFired => Transition(State::failed()),
            _ => Handled,
        }
    }

    #[state]
    fn running_child(&mut self, position: &mut usize, event: &ChainEvent) -> Outcome<State> {
        match event {
            ChainEvent::Launch { child } => {
                let next = *position + 1;
                tracing::debug!(chain = %self.chain, child = %child, position = next, "Launching next sub transaction");
                Transition(State::running_child(next))
            }
            ChainEvent::Drained => Transition(State::finalizing()),
            ChainEvent::ChildFailed { child } | ChainEvent::ChildTimedOut { child } => {
                tracing::debug!(chain = %self.chain, child = %child, position = *position, "Chain aborted");
                Transition(State::aborted())
            }
            ChainEvent::WatchdogFired => Transition(State::failed()),
            ChainEvent::Settled { .. } => Handled,
        }
    }

    #[state]
    fn finalizing(&mut self, event: &ChainEvent) -> Outcome<State> {
        match event {
            ChainEvent::Settled { succeeded: true } => Transition(State::succeeded()),
            ChainEvent::Settled { succeeded: false } | ChainEvent::WatchdogFired => {
                Transition(State::failed())
            }
            _ => Handled,
        }
    }

    #[state]
    fn aborted(&mut self, event: &ChainEvent) -> Outcome<State> {
        match event {
            ChainEvent::Settled { .. } | ChainEvent::WatchdogFired => Transition(State::failed()),
            _ => Handled,
        }
    }

    #[state]
    fn succeeded(&mut self, event: &ChainEvent) -> Outcome<State> {
        tracing::trace!(chain = %self.chain, event = ?event, "Chain already succeeded");
        Handled
    }

    #[state]
    fn failed(&mut self, event: &ChainEvent) -> Outcome<State> {
        tracing::trace!(chain = %self.chain, event = ?event, "Chain already failed");
        Handled
    }
}

impl From<&State> for SerialProgress {
    fn from(state: &State) -> Self {
        match state {
            State::Idle { .. } => SerialProgress::Idle,
            State::RunningChild { position } => SerialProgress::RunningChild(*position),
            State::Finalizing { .. } => SerialProgress::Finalizing,
            State::Aborted { .. } => SerialProgress::Aborted,
            State::Succeeded { .. } => SerialProgress::Succeeded,
            State::Failed { .. } => SerialProgress::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn launch(child: &str) -> ChainEvent {
        ChainEvent::Launch {
            child: child.to_string(),
        }
    }

    #[test]
    fn test_successful_chain_walks_every_child() {
        let mut sm = ChainTracker::new("answer-call".to_string()).state_machine();
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::Idle);

        sm.handle(&launch("A"));
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::RunningChild(1));

        sm.handle(&launch("B"));
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::RunningChild(2));

        sm.handle(&ChainEvent::Drained);
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::Finalizing);

        sm.handle(&ChainEvent::Settled { succeeded: true });
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::Succeeded);
    }

    #[test]
    fn test_child_failure_aborts_then_fails() {
        let mut sm = ChainTracker::new("hold-call".to_string()).state_machine();
        sm.handle(&launch("A"));
        sm.handle(&ChainEvent::ChildFailed {
            child: "A".to_string(),
        });
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::Aborted);

        // an abort cannot be resumed by a stray launch
        sm.handle(&launch("B"));
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::Aborted);

        sm.handle(&ChainEvent::Settled { succeeded: false });
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::Failed);
    }

    #[test]
    fn test_terminal_states_ignore_everything() {
        let mut sm = ChainTracker::new("end-call".to_string()).state_machine();
        sm.handle(&ChainEvent::WatchdogFired);
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::Failed);

        sm.handle(&ChainEvent::Drained);
        sm.handle(&ChainEvent::Settled { succeeded: true });
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::Failed);
        assert!(SerialProgress::from(sm.state()).is_terminal());
    }

    #[test]
    fn test_empty_chain_goes_straight_to_finalizing() {
        let mut sm = ChainTracker::new("noop".to_string()).state_machine();
        sm.handle(&ChainEvent::Drained);
        assert_eq!(SerialProgress::from(sm.state()), SerialProgress::Finalizing);
    }
}
