// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::*;

/// Column names exactly as the backend spells them.
pub mod columns {
    pub const ID: &str = "id";
    pub const NAME: &str = "Name";
    pub const EMAIL: &str = "Email";
    pub const PAYMENT: &str = "Payment";
    pub const REGISTERED: &str = "EW";
    pub const PASS: &str = "Pass";
    pub const CONCERT_PAYMENT: &str = "Concert_Payment";
    pub const EVENT_1_DAY3: &str = "Event_1_Day3";
    pub const EVENT_2_DAY3: &str = "Event_2_Day3";
    pub const EVENT_3_DAY3: &str = "Event_3_Day3";
    pub const EVENT_4_DAY3: &str = "Event_4_Day3";
    pub const EVENT_1_DAY4: &str = "Event_1_Day4";

    pub const EVENT_PASS: &str = "pass";
    pub const EVENT_NAME: &str = "events";
    pub const EVENT_DAY: &str = "Day";
}

pub const PAYMENT_SUCCESSFUL: &str = "Successful";
pub const PAYMENT_CANCELLED: &str = "payment cancelled";
pub const CONCERT_SUCCESSFUL: &str = "Successful";
pub const REGISTERED_FLAG: &str = "Registered";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassType {
    General,
    Hackathon,
    Signature,
}

impl PassType {
    pub const ALL: [Self; 3] = [Self::General, Self::Hackathon, Self::Signature];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Hackathon => "Hackathon",
            Self::Signature => "Signature",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "General" => Some(Self::General),
            "Hackathon" => Some(Self::Hackathon),
            "Signature" => Some(Self::Signature),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "General Pass",
            Self::Hackathon => "Hackathon Pass",
            Self::Signature => "Signature Pass",
        }
    }

    /// Only these passes may pick per-day events.
    pub const fn allows_event_choice(self) -> bool {
        matches!(self, Self::General | Self::Signature)
    }
}

/// Values an operator can write to the payment column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentChoice {
    Successful,
    Cancelled,
}

impl PaymentChoice {
    pub const ALL: [Self; 2] = [Self::Successful, Self::Cancelled];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Successful => PAYMENT_SUCCESSFUL,
            Self::Cancelled => PAYMENT_CANCELLED,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Successful => "Mark Successful",
            Self::Cancelled => "Mark Cancelled",
        }
    }
}

/// Read view over the payment column, which also holds legacy free-form
/// values written by older tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus<'a> {
    Unset,
    Successful,
    Cancelled,
    Legacy(&'a str),
}

impl<'a> PaymentStatus<'a> {
    pub fn from_column(value: Option<&'a str>) -> Self {
        match value {
            None | Some("") => Self::Unset,
            Some(PAYMENT_SUCCESSFUL) => Self::Successful,
            Some(PAYMENT_CANCELLED) => Self::Cancelled,
            Some(other) => Self::Legacy(other),
        }
    }

    pub fn label(self) -> &'a str {
        match self {
            Self::Unset => "null",
            Self::Successful => PAYMENT_SUCCESSFUL,
            Self::Cancelled => PAYMENT_CANCELLED,
            Self::Legacy(value) => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventDay {
    Day3,
    Day4,
}

impl EventDay {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day3 => "day3",
            Self::Day4 => "day4",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Day3 => "Day 3",
            Self::Day4 => "Day 4",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventSlot {
    Day3First,
    Day3Second,
    Day3Third,
    Day3Fourth,
    Day4First,
}

impl EventSlot {
    pub const ALL: [Self; 5] = [
        Self::Day3First,
        Self::Day3Second,
        Self::Day3Third,
        Self::Day3Fourth,
        Self::Day4First,
    ];

    pub const fn column(self) -> &'static str {
        match self {
            Self::Day3First => columns::EVENT_1_DAY3,
            Self::Day3Second => columns::EVENT_2_DAY3,
            Self::Day3Third => columns::EVENT_3_DAY3,
            Self::Day3Fourth => columns::EVENT_4_DAY3,
            Self::Day4First => columns::EVENT_1_DAY4,
        }
    }

    pub fn parse(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.column() == column)
    }

    pub const fn day(self) -> EventDay {
        match self {
            Self::Day3First | Self::Day3Second | Self::Day3Third | Self::Day3Fourth => {
                EventDay::Day3
            }
            Self::Day4First => EventDay::Day4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Day3First => "d3 #1",
            Self::Day3Second => "d3 #2",
            Self::Day3Third => "d3 #3",
            Self::Day3Fourth => "d3 #4",
            Self::Day4First => "d4 #1",
        }
    }
}

/// The editable cells of a row. A dropdown is always keyed by one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Payment,
    Pass,
    Concert,
    Event(EventSlot),
}

impl FieldKind {
    pub const EDITABLE: [Self; 8] = [
        Self::Payment,
        Self::Pass,
        Self::Concert,
        Self::Event(EventSlot::Day3First),
        Self::Event(EventSlot::Day3Second),
        Self::Event(EventSlot::Day3Third),
        Self::Event(EventSlot::Day3Fourth),
        Self::Event(EventSlot::Day4First),
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Pass => "pass",
            Self::Concert => "concert",
            Self::Event(slot) => slot.label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(rename = "ID_no", default)]
    pub id_no: Option<String>,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "DOB", default)]
    pub dob: Option<String>,
    #[serde(rename = "Degree", default)]
    pub degree: Option<String>,
    #[serde(rename = "Course", default)]
    pub course: Option<String>,
    #[serde(rename = "Year", default)]
    pub year: Option<String>,
    #[serde(rename = "Phone", default)]
    pub phone: Option<String>,
    #[serde(rename = "Gender", default)]
    pub gender: Option<String>,
    #[serde(rename = "College", default)]
    pub college: Option<String>,
    #[serde(rename = "Event_1", default)]
    pub event_1: Option<String>,
    #[serde(rename = "Event_2", default)]
    pub event_2: Option<String>,
    #[serde(rename = "WorkShop", default)]
    pub workshop: Option<String>,
    #[serde(rename = "Payment", default)]
    pub payment: Option<String>,
    #[serde(rename = "EW", default)]
    pub registered: Option<String>,
    #[serde(rename = "Pass", default)]
    pub pass: Option<String>,
    #[serde(rename = "Concert", default)]
    pub concert: Option<String>,
    #[serde(rename = "Accommodation", default)]
    pub accommodation: Option<String>,
    #[serde(rename = "AccommodationDays", default)]
    pub accommodation_days: Option<String>,
    #[serde(rename = "AccommodationCost", default)]
    pub accommodation_cost: Option<String>,
    #[serde(rename = "Reference", default)]
    pub reference: Option<String>,
    #[serde(rename = "Transaction_ID", default)]
    pub transaction_id: Option<String>,
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
    #[serde(rename = "Time", default)]
    pub time: Option<String>,
    #[serde(rename = "Team_Members", default)]
    pub team_members: Option<String>,
    #[serde(rename = "Concert_transaction", default)]
    pub concert_transaction: Option<String>,
    #[serde(rename = "Concert_Payment", default)]
    pub concert_payment: Option<String>,
    #[serde(rename = "Event_1_Day3", default)]
    pub event_1_day3: Option<String>,
    #[serde(rename = "Event_2_Day3", default)]
    pub event_2_day3: Option<String>,
    #[serde(rename = "Event_3_Day3", default)]
    pub event_3_day3: Option<String>,
    #[serde(rename = "Event_4_Day3", default)]
    pub event_4_day3: Option<String>,
    #[serde(rename = "Event_1_Day4", default)]
    pub event_1_day4: Option<String>,
}

impl Participant {
    pub fn payment_status(&self) -> PaymentStatus<'_> {
        PaymentStatus::from_column(self.payment.as_deref())
    }

    pub fn pass_type(&self) -> Option<PassType> {
        self.pass.as_deref().and_then(PassType::parse)
    }

    pub fn concert_paid(&self) -> bool {
        self.concert_payment.as_deref() == Some(CONCERT_SUCCESSFUL)
    }

    pub fn event_slot(&self, slot: EventSlot) -> Option<&str> {
        let value = match slot {
            EventSlot::Day3First => &self.event_1_day3,
            EventSlot::Day3Second => &self.event_2_day3,
            EventSlot::Day3Third => &self.event_3_day3,
            EventSlot::Day3Fourth => &self.event_4_day3,
            EventSlot::Day4First => &self.event_1_day4,
        };
        value.as_deref().filter(|value| !value.is_empty())
    }

    /// Current value of an editable cell, `None` when unset.
    pub fn field_value(&self, field: FieldKind) -> Option<&str> {
        let value = match field {
            FieldKind::Payment => self.payment.as_deref(),
            FieldKind::Pass => self.pass.as_deref(),
            FieldKind::Concert => self.concert_payment.as_deref(),
            FieldKind::Event(slot) => return self.event_slot(slot),
        };
        value.filter(|value| !value.is_empty())
    }

    /// Every column as `(label, value)` pairs for the read-only detail view.
    pub fn detail_rows(&self) -> Vec<(&'static str, String)> {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        vec![
            (columns::ID, self.id.to_string()),
            ("ID_no", text(&self.id_no)),
            (columns::NAME, text(&self.name)),
            (columns::EMAIL, self.email.clone()),
            ("DOB", text(&self.dob)),
            ("Degree", text(&self.degree)),
            ("Course", text(&self.course)),
            ("Year", text(&self.year)),
            ("Phone", text(&self.phone)),
            ("Gender", text(&self.gender)),
            ("College", text(&self.college)),
            ("Event_1", text(&self.event_1)),
            ("Event_2", text(&self.event_2)),
            ("WorkShop", text(&self.workshop)),
            (columns::PAYMENT, text(&self.payment)),
            (columns::REGISTERED, text(&self.registered)),
            (columns::PASS, text(&self.pass)),
            ("Concert", text(&self.concert)),
            ("Accommodation", text(&self.accommodation)),
            ("AccommodationDays", text(&self.accommodation_days)),
            ("AccommodationCost", text(&self.accommodation_cost)),
            ("Reference", text(&self.reference)),
            ("Transaction_ID", text(&self.transaction_id)),
            ("Date", text(&self.date)),
            ("Time", text(&self.time)),
            ("Team_Members", text(&self.team_members)),
            ("Concert_transaction", text(&self.concert_transaction)),
            (columns::CONCERT_PAYMENT, text(&self.concert_payment)),
            (columns::EVENT_1_DAY3, text(&self.event_1_day3)),
            (columns::EVENT_2_DAY3, text(&self.event_2_day3)),
            (columns::EVENT_3_DAY3, text(&self.event_3_day3)),
            (columns::EVENT_4_DAY3, text(&self.event_4_day3)),
            (columns::EVENT_1_DAY4, text(&self.event_1_day4)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceEvent {
    pub pass: String,
    #[serde(rename = "events")]
    pub name: String,
    #[serde(rename = "Day")]
    pub day: String,
}
