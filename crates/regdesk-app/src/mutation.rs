// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Serialize;
use std::collections::BTreeMap;

use crate::{
    CONCERT_SUCCESSFUL, EventSlot, FieldKind, ParticipantId, PassType, PaymentChoice,
    REGISTERED_FLAG, columns,
};

/// Column-to-value map sent as one partial update. Keys are always backend
/// column constants, never operator input.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct FieldPatch(BTreeMap<&'static str, String>);

impl FieldPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(column, value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.0.iter().map(|(column, value)| (*column, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Payment {
        id: ParticipantId,
        status: PaymentChoice,
    },
    Pass {
        id: ParticipantId,
        pass: PassType,
    },
    ConcertPayment {
        id: ParticipantId,
    },
    EventSlot {
        id: ParticipantId,
        slot: EventSlot,
        event: String,
    },
}

impl Mutation {
    pub fn participant_id(&self) -> ParticipantId {
        match self {
            Self::Payment { id, .. }
            | Self::Pass { id, .. }
            | Self::ConcertPayment { id }
            | Self::EventSlot { id, .. } => *id,
        }
    }

    pub fn field(&self) -> FieldKind {
        match self {
            Self::Payment { .. } => FieldKind::Payment,
            Self::Pass { .. } => FieldKind::Pass,
            Self::ConcertPayment { .. } => FieldKind::Concert,
            Self::EventSlot { slot, .. } => FieldKind::Event(*slot),
        }
    }

    /// A General pass also marks the participant registered, in the same
    /// update.
    pub fn patch(&self) -> FieldPatch {
        match self {
            Self::Payment { status, .. } => {
                FieldPatch::new().set(columns::PAYMENT, status.as_str())
            }
            Self::Pass { pass, .. } => {
                let patch = FieldPatch::new().set(columns::PASS, pass.as_str());
                if *pass == PassType::General {
                    patch.set(columns::REGISTERED, REGISTERED_FLAG)
                } else {
                    patch
                }
            }
            Self::ConcertPayment { .. } => {
                FieldPatch::new().set(columns::CONCERT_PAYMENT, CONCERT_SUCCESSFUL)
            }
            Self::EventSlot { slot, event, .. } => {
                FieldPatch::new().set(slot.column(), event.clone())
            }
        }
    }

    pub const fn success_message(&self) -> &'static str {
        match self {
            Self::Payment { .. } => "Payment status updated successfully",
            Self::Pass { .. } => "Pass updated successfully",
            Self::ConcertPayment { .. } => "Concert payment updated successfully",
            Self::EventSlot { .. } => "Event updated successfully",
        }
    }

    pub const fn failure_message(&self) -> &'static str {
        match self {
            Self::Payment { .. } => "Failed to update payment status",
            Self::Pass { .. } => "Failed to update pass",
            Self::ConcertPayment { .. } => "Failed to update concert payment",
            Self::EventSlot { .. } => "Failed to update event",
        }
    }
}
