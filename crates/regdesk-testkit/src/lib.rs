// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use regdesk_app::{
    CONCERT_SUCCESSFUL, EventSlot, PAYMENT_CANCELLED, PAYMENT_SUCCESSFUL, Participant, PassType,
    REGISTERED_FLAG, ReferenceEvent,
};
use std::path::PathBuf;
use time::macros::format_description;
use time::{Date, Duration, Month, OffsetDateTime, Time};

const FIRST_NAMES: [&str; 16] = [
    "Aarav", "Diya", "Ishaan", "Meera", "Kabir", "Ananya", "Rohan", "Saanvi", "Arjun", "Priya",
    "Vihaan", "Nisha", "Aditya", "Kavya", "Dev", "Tara",
];
const LAST_NAMES: [&str; 14] = [
    "Sharma", "Iyer", "Reddy", "Nair", "Patel", "Menon", "Gupta", "Rao", "Das", "Kulkarni",
    "Joshi", "Bose", "Pillai", "Singh",
];

const COLLEGES: [&str; 8] = [
    "National Institute of Technology",
    "Government Engineering College",
    "St. Xavier's College",
    "Institute of Science",
    "City Polytechnic",
    "School of Architecture",
    "College of Commerce",
    "Institute of Design",
];

const DEGREES: [&str; 5] = ["B.Tech", "B.Sc", "B.Com", "M.Tech", "BBA"];
const COURSES: [&str; 7] = [
    "Computer Science",
    "Electronics",
    "Mechanical",
    "Civil",
    "Physics",
    "Economics",
    "Design",
];
const GENDERS: [&str; 3] = ["Male", "Female", "Other"];
const MAIL_DOMAINS: [&str; 4] = ["gmail.com", "outlook.com", "campus.edu", "yahoo.in"];

const GENERAL_EVENTS: [&str; 8] = [
    "Robo Race",
    "Code Relay",
    "Quiz Bowl",
    "Treasure Hunt",
    "Battle of Bands",
    "Debate",
    "Line Follower",
    "Photography Walk",
];
const SIGNATURE_EVENTS: [&str; 5] = [
    "Startup Pitch",
    "Design Sprint",
    "Gala Dinner",
    "Fashion Show",
    "Hack Night",
];
const HACKATHON_EVENTS: [&str; 2] = ["Hackathon Finals", "Demo Day"];

const REFERENCE_YEAR: i32 = 2026;

struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    /// True roughly `percent` times out of a hundred.
    fn chance(&mut self, percent: usize) -> bool {
        self.int_n(100) < percent
    }
}

/// Seeded generator of plausible festival registrations.
pub struct RegistrationFaker {
    rng: DeterministicRng,
    seed: u64,
    issued: u64,
}

impl RegistrationFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            seed: normalized,
            issued: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// One row per catalogued event, spread across both festival days.
    pub fn reference_events(&mut self) -> Vec<ReferenceEvent> {
        let catalogue = [
            (PassType::General, &GENERAL_EVENTS[..]),
            (PassType::Signature, &SIGNATURE_EVENTS[..]),
            (PassType::Hackathon, &HACKATHON_EVENTS[..]),
        ];
        let mut events = Vec::new();
        for (pass, names) in catalogue {
            for name in names {
                let day = if self.rng.chance(70) { "day3" } else { "day4" };
                events.push(ReferenceEvent {
                    pass: pass.as_str().to_owned(),
                    name: (*name).to_owned(),
                    day: day.to_owned(),
                });
            }
        }
        events
    }

    /// A registration without event selections. The id is left at zero for
    /// the store to assign.
    pub fn participant(&mut self) -> Participant {
        self.issued += 1;
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let email = format!(
            "{}.{}{}@{}",
            first.to_ascii_lowercase(),
            last.to_ascii_lowercase(),
            self.int_range(1, 99),
            self.pick(&MAIL_DOMAINS),
        );

        let registered_at = self.datetime_in_window();
        let pass = self.pass();
        let payment = self.payment();
        let paid = payment.as_deref() == Some(PAYMENT_SUCCESSFUL);
        let transaction_id =
            paid.then(|| format!("TXN{:012}", self.rng.next_u64() % 1_000_000_000_000));

        Participant {
            id_no: Some(format!("RD{}{:05}", REFERENCE_YEAR, self.issued)),
            name: Some(format!("{first} {last}")),
            email,
            dob: Some(self.birth_date()),
            degree: Some(self.pick(&DEGREES).to_owned()),
            course: Some(self.pick(&COURSES).to_owned()),
            year: Some(self.int_range(1, 4).to_string()),
            phone: Some(format!("9{:09}", self.int_range(0, 999_999_999))),
            gender: Some(self.pick(&GENDERS).to_owned()),
            college: Some(self.pick(&COLLEGES).to_owned()),
            workshop: self.rng.chance(20).then(|| "Drone Building".to_owned()),
            registered: (pass == Some(PassType::General)).then(|| REGISTERED_FLAG.to_owned()),
            pass: pass.map(|pass| pass.as_str().to_owned()),
            concert: self.rng.chance(40).then(|| "Yes".to_owned()),
            concert_payment: (paid && self.rng.chance(50)).then(|| CONCERT_SUCCESSFUL.to_owned()),
            accommodation: self.rng.chance(30).then(|| "Yes".to_owned()),
            transaction_id,
            payment,
            date: Some(format_date(registered_at)),
            time: Some(format_clock(registered_at)),
            ..Participant::default()
        }
    }

    /// A registration whose event slots are filled from `events` matching
    /// its pass, when that pass allows event choice.
    pub fn participant_with_events(&mut self, events: &[ReferenceEvent]) -> Participant {
        let mut participant = self.participant();
        let allowed = participant
            .pass_type()
            .is_some_and(PassType::allows_event_choice);
        if !allowed {
            return participant;
        }
        let pass = participant.pass.clone().unwrap_or_default();
        let offered: Vec<&ReferenceEvent> =
            events.iter().filter(|event| event.pass == pass).collect();
        if offered.is_empty() {
            return participant;
        }
        for slot in EventSlot::ALL {
            if !self.rng.chance(60) {
                continue;
            }
            let name = offered[self.rng.int_n(offered.len())].name.clone();
            let field = match slot {
                EventSlot::Day3First => &mut participant.event_1_day3,
                EventSlot::Day3Second => &mut participant.event_2_day3,
                EventSlot::Day3Third => &mut participant.event_3_day3,
                EventSlot::Day3Fourth => &mut participant.event_4_day3,
                EventSlot::Day4First => &mut participant.event_1_day4,
            };
            *field = Some(name);
        }
        participant
    }

    fn pass(&mut self) -> Option<PassType> {
        if self.rng.chance(15) {
            return None;
        }
        Some(PassType::ALL[self.rng.int_n(PassType::ALL.len())])
    }

    fn payment(&mut self) -> Option<String> {
        match self.rng.int_n(10) {
            0 => None,
            1 => Some(PAYMENT_CANCELLED.to_owned()),
            2 => Some("Pending".to_owned()),
            _ => Some(PAYMENT_SUCCESSFUL.to_owned()),
        }
    }

    fn birth_date(&mut self) -> String {
        let year = self.int_range(1998, 2007) as i32;
        let month = Month::try_from(self.int_range(1, 12) as u8).unwrap_or(Month::January);
        let day = self.int_range(1, 28) as u8;
        Date::from_calendar_date(year, month, day)
            .map(|date| date.to_string())
            .unwrap_or_default()
    }

    fn datetime_in_window(&mut self) -> OffsetDateTime {
        let start = midnight_utc(REFERENCE_YEAR, Month::January, 5);
        let span = Duration::days(60).whole_seconds() as u64;
        start + Duration::seconds((self.rng.next_u64() % span) as i64)
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        min + self.rng.next_u64() % (max - min + 1)
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("regdesk.db");
    Ok((dir, db_path))
}

fn midnight_utc(year: i32, month: Month, day: u8) -> OffsetDateTime {
    let date = Date::from_calendar_date(year, month, day).unwrap_or(Date::MIN);
    date.with_time(Time::MIDNIGHT).assume_utc()
}

fn format_date(at: OffsetDateTime) -> String {
    at.format(format_description!("[day]/[month]/[year]"))
        .unwrap_or_default()
}

fn format_clock(at: OffsetDateTime) -> String {
    at.format(format_description!("[hour]:[minute]:[second]"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{GENERAL_EVENTS, RegistrationFaker, temp_db_path};
    use regdesk_app::{EventSlot, PassType, event_slots_editable};
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_same_registrations() {
        let mut left = RegistrationFaker::new(42);
        let mut right = RegistrationFaker::new(42);
        for _ in 0..5 {
            assert_eq!(left.participant(), right.participant());
        }
    }

    #[test]
    fn zero_seed_is_normalized() {
        assert_eq!(RegistrationFaker::new(0).seed(), 1);
    }

    #[test]
    fn participant_has_contact_details() {
        let mut faker = RegistrationFaker::new(3);
        let participant = faker.participant();
        assert!(participant.name.as_deref().is_some_and(|name| name.contains(' ')));
        assert!(participant.email.contains('@'));
        assert_eq!(participant.phone.as_deref().map(str::len), Some(10));
        assert_eq!(participant.id.get(), 0);
    }

    #[test]
    fn general_pass_is_registered() {
        let mut faker = RegistrationFaker::new(11);
        for _ in 0..50 {
            let participant = faker.participant();
            if participant.pass_type() == Some(PassType::General) {
                assert_eq!(participant.registered.as_deref(), Some("Registered"));
            } else {
                assert_eq!(participant.registered, None);
            }
        }
    }

    #[test]
    fn reference_events_cover_every_pass() {
        let mut faker = RegistrationFaker::new(5);
        let events = faker.reference_events();
        let passes: BTreeSet<&str> = events.iter().map(|event| event.pass.as_str()).collect();
        assert_eq!(passes.len(), 3);
        assert!(events.iter().all(|event| event.day == "day3" || event.day == "day4"));
        assert_eq!(
            events.iter().filter(|event| event.pass == "General").count(),
            GENERAL_EVENTS.len()
        );
    }

    #[test]
    fn event_slots_only_for_choosing_passes() {
        let mut faker = RegistrationFaker::new(9);
        let events = faker.reference_events();
        for _ in 0..60 {
            let participant = faker.participant_with_events(&events);
            let chosen: Vec<&str> = EventSlot::ALL
                .into_iter()
                .filter_map(|slot| participant.event_slot(slot))
                .collect();
            if !event_slots_editable(participant.pass.as_deref()) {
                assert!(chosen.is_empty());
                continue;
            }
            let pass = participant.pass.as_deref().unwrap_or_default();
            for name in chosen {
                assert!(events.iter().any(|event| event.name == name && event.pass == pass));
            }
        }
    }

    #[test]
    fn variety_across_seeds() {
        let mut names = BTreeSet::new();
        for seed in 0_u64..20_u64 {
            let mut faker = RegistrationFaker::new(seed);
            names.insert(faker.participant().name);
        }
        assert!(names.len() >= 10, "got {}", names.len());
    }

    #[test]
    fn int_n_stays_below_bound() {
        let mut faker = RegistrationFaker::new(42);
        for _ in 0..100 {
            assert!(faker.rng.int_n(5) < 5);
        }
    }

    #[test]
    fn temp_db_path_lives_in_temp_dir() {
        let (dir, path) = temp_db_path().expect("temp path");
        assert!(path.starts_with(dir.path()));
        assert!(!path.exists());
    }
}
