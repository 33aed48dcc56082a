// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            Default,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            Serialize,
            Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }

            /// Interprets operator input as an identifier. Surrounding
            /// whitespace is ignored; anything else that is not a base-10
            /// integer yields `None`.
            pub fn parse(raw: &str) -> Option<Self> {
                raw.trim().parse::<i64>().ok().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(ParticipantId);

#[cfg(test)]
mod tests {
    use super::ParticipantId;

    #[test]
    fn parse_accepts_trimmed_integers_only() {
        assert_eq!(ParticipantId::parse("42"), Some(ParticipantId::new(42)));
        assert_eq!(ParticipantId::parse(" 7 "), Some(ParticipantId::new(7)));
        assert_eq!(ParticipantId::parse("alice"), None);
        assert_eq!(ParticipantId::parse("4 2"), None);
        assert_eq!(ParticipantId::parse(""), None);
    }

    #[test]
    fn display_renders_bare_number() {
        assert_eq!(ParticipantId::new(105).to_string(), "105");
    }
}
