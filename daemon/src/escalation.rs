//! Escalation state machine: consecutive alerts lead to protective hibernation

use crate::sampler::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscalationState {
    Stable,
    Alerting(u32),
    Hibernating,
    Stopped,
}

impl EscalationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EscalationState::Hibernating | EscalationState::Stopped)
    }
}

/// What the session has to do for the sample just consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Non-alert sample; counter is zero.
    Stable,
    /// Alert sample below the limit: report and mitigate.
    Alert { count: u32 },
    /// Alert sample that reached the limit: report, mitigate, then hibernate.
    Hibernate { count: u32 },
    /// Already terminal; the sample was ignored.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct EscalationMachine {
    state: EscalationState,
    max_consecutive: u32,
}

impl EscalationMachine {
    pub fn new(max_consecutive: u32) -> Self {
        Self {
            state: EscalationState::Stable,
            max_consecutive: max_consecutive.max(1),
        }
    }

    pub fn state(&self) -> EscalationState {
        self.state
    }

    /// Consecutive alert samples ending at the latest tick.
    pub fn counter(&self) -> u32 {
        match self.state {
            EscalationState::Alerting(n) => n,
            EscalationState::Hibernating => self.max_consecutive,
            EscalationState::Stable | EscalationState::Stopped => 0,
        }
    }

    pub fn observe(&mut self, sample: &Sample) -> Transition {
        self.advance(sample.is_alert)
    }

    pub fn advance(&mut self, is_alert: bool) -> Transition {
        if self.state.is_terminal() {
            return Transition::Ignored;
        }
        if !is_alert {
            self.state = EscalationState::Stable;
            return Transition::Stable;
        }
        let count = self.counter() + 1;
        if count >= self.max_consecutive {
            self.state = EscalationState::Hibernating;
            Transition::Hibernate { count }
        } else {
            self.state = EscalationState::Alerting(count);
            Transition::Alert { count }
        }
    }

    /// External interrupt. Hibernating stays hibernating.
    pub fn stop(&mut self) {
        if !self.state.is_terminal() {
            self.state = EscalationState::Stopped;
        }
    }
}
