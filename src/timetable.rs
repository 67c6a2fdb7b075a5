//! Daily study timetable.
//!
//! Maps an instant to the study block active at that moment in Madrid local
//! time. Tables are static; every call recomputes from its input, so calling
//! it once per frame for a countdown cannot drift.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Weekday};
use chrono_tz::{Europe::Madrid, Tz};
use serde::{Deserialize, Serialize};

pub const STUDY_TZ: Tz = Madrid;

const MON_FRI: &[Weekday] = &[
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];
const MON_THU: &[Weekday] = &[Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu];
const SATURDAY: &[Weekday] = &[Weekday::Sat];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    School,
    Science,
    Memory,
    Review,
    Gym,
    Sleep,
    Mock,
    Free,
}

impl BlockKind {
    pub fn is_free(self) -> bool {
        self == BlockKind::Free
    }
}

/// Minutes since local midnight. `24:00` is a valid block end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ClockTime(u16);

impl ClockTime {
    pub const fn hm(hour: u16, minute: u16) -> Self {
        Self(hour * 60 + minute)
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    pub fn hour(&self) -> u16 {
        self.0 / 60
    }

    pub fn minute(&self) -> u16 {
        self.0 % 60
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl Serialize for ClockTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockRule {
    pub days: &'static [Weekday],
    pub start: ClockTime,
    pub end: ClockTime,
    pub label: &'static str,
    pub kind: BlockKind,
    pub focus: &'static str,
}

impl BlockRule {
    fn matches(&self, weekday: Weekday, at: ClockTime) -> bool {
        self.days.contains(&weekday) && self.start <= at && at < self.end
    }
}

pub static CLASSIC: &[BlockRule] = &[
    BlockRule {
        days: MON_FRI,
        start: ClockTime::hm(8, 0),
        end: ClockTime::hm(14, 0),
        label: "School Morning",
        kind: BlockKind::School,
        focus: "Classes",
    },
    BlockRule {
        days: MON_FRI,
        start: ClockTime::hm(16, 0),
        end: ClockTime::hm(18, 0),
        label: "Intensive Block",
        kind: BlockKind::Science,
        focus: "Science / Practice",
    },
    BlockRule {
        days: MON_FRI,
        start: ClockTime::hm(18, 0),
        end: ClockTime::hm(20, 0),
        label: "Memory Block",
        kind: BlockKind::Memory,
        focus: "History / Language",
    },
    BlockRule {
        days: MON_FRI,
        start: ClockTime::hm(20, 0),
        end: ClockTime::hm(21, 0),
        label: "Review & Wrap-up",
        kind: BlockKind::Review,
        focus: "English / Review",
    },
];

pub static ELITE: &[BlockRule] = &[
    BlockRule {
        days: MON_THU,
        start: ClockTime::hm(16, 0),
        end: ClockTime::hm(17, 30),
        label: "Homework / Study",
        kind: BlockKind::Science,
        focus: "Homework",
    },
    BlockRule {
        days: MON_THU,
        start: ClockTime::hm(17, 30),
        end: ClockTime::hm(19, 0),
        label: "Gym",
        kind: BlockKind::Gym,
        focus: "Training",
    },
    BlockRule {
        days: MON_THU,
        start: ClockTime::hm(19, 0),
        end: ClockTime::hm(20, 30),
        label: "Science Block",
        kind: BlockKind::Science,
        focus: "Maths / Physics / Chemistry",
    },
    BlockRule {
        days: MON_THU,
        start: ClockTime::hm(21, 30),
        end: ClockTime::hm(23, 0),
        label: "Memory Block",
        kind: BlockKind::Memory,
        focus: "History / Language",
    },
    BlockRule {
        days: MON_THU,
        start: ClockTime::hm(23, 0),
        end: ClockTime::hm(24, 0),
        label: "Sleep",
        kind: BlockKind::Sleep,
        focus: "Rest",
    },
    BlockRule {
        days: SATURDAY,
        start: ClockTime::hm(9, 30),
        end: ClockTime::hm(13, 30),
        label: "Mock Exam",
        kind: BlockKind::Mock,
        focus: "Full timed exam",
    },
];

pub const FREE_LABEL: &str = "Free Time";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timetable {
    #[default]
    Classic,
    Elite,
}

impl Timetable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timetable::Classic => "classic",
            Timetable::Elite => "elite",
        }
    }

    pub fn rules(&self) -> &'static [BlockRule] {
        match self {
            Timetable::Classic => CLASSIC,
            Timetable::Elite => ELITE,
        }
    }

    pub fn classify<Z: TimeZone>(&self, now: &DateTime<Z>) -> CurrentBlock {
        classify(now, self.rules())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurrentBlock {
    pub label: &'static str,
    pub kind: BlockKind,
    pub focus: Option<&'static str>,
    pub end_time: Option<ClockTime>,
}

impl CurrentBlock {
    fn free() -> Self {
        Self {
            label: FREE_LABEL,
            kind: BlockKind::Free,
            focus: None,
            end_time: None,
        }
    }
}

fn local_clock<Z: TimeZone>(now: &DateTime<Z>) -> (Weekday, ClockTime, u32) {
    let local = now.with_timezone(&STUDY_TZ);
    let at = ClockTime::hm(local.hour() as u16, local.minute() as u16);
    (local.weekday(), at, local.num_seconds_from_midnight())
}

/// First rule whose `[start, end)` window contains `now` in Madrid time.
pub fn classify<Z: TimeZone>(now: &DateTime<Z>, rules: &[BlockRule]) -> CurrentBlock {
    let (weekday, at, _) = local_clock(now);

    rules
        .iter()
        .find(|rule| rule.matches(weekday, at))
        .map(|rule| CurrentBlock {
            label: rule.label,
            kind: rule.kind,
            focus: Some(rule.focus),
            end_time: Some(rule.end),
        })
        .unwrap_or_else(CurrentBlock::free)
}

/// Time left until `end` on the same Madrid day, never negative.
pub fn time_remaining<Z: TimeZone>(now: &DateTime<Z>, end: ClockTime) -> Duration {
    let (_, _, seconds) = local_clock(now);
    let left = i64::from(end.minutes()) * 60 - i64::from(seconds);
    Duration::seconds(left.max(0))
}

pub fn format_countdown(remaining: Option<Duration>) -> String {
    match remaining {
        Some(d) => {
            let secs = d.num_seconds().max(0);
            format!(
                "{:02}:{:02}:{:02}",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60
            )
        }
        None => "--:--".to_string(),
    }
}

/// Countdown string for the block active at `now`.
pub fn countdown<Z: TimeZone>(now: &DateTime<Z>, block: &CurrentBlock) -> String {
    format_countdown(block.end_time.map(|end| time_remaining(now, end)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    // 2025-01-15 is a Wednesday; Madrid is UTC+1 in January
    fn madrid(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Tz> {
        STUDY_TZ.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    mod boundary_tests {
        use super::*;

        #[test]
        fn end_of_block_is_exclusive() {
            let a = Timetable::Classic.classify(&madrid(2025, 1, 15, 17, 59, 59));
            assert_eq!(a.label, "Intensive Block");

            let b = Timetable::Classic.classify(&madrid(2025, 1, 15, 18, 0, 0));
            assert_eq!(b.label, "Memory Block");
        }

        #[test]
        fn start_of_block_is_inclusive() {
            let block = Timetable::Classic.classify(&madrid(2025, 1, 15, 16, 0, 0));
            assert_eq!(block.kind, BlockKind::Science);
            assert_eq!(block.end_time, Some(ClockTime::hm(18, 0)));
        }

        #[test]
        fn gap_between_blocks_is_free() {
            let block = Timetable::Classic.classify(&madrid(2025, 1, 15, 15, 0, 0));
            assert!(block.kind.is_free());
            assert_eq!(block.label, FREE_LABEL);
            assert_eq!(block.end_time, None);
            assert_eq!(block.focus, None);
        }

        #[test]
        fn last_block_of_the_day_ends_at_midnight() {
            // Thursday
            let block = Timetable::Elite.classify(&madrid(2025, 1, 16, 23, 30, 0));
            assert_eq!(block.kind, BlockKind::Sleep);
            assert_eq!(block.end_time.unwrap().to_string(), "24:00");
            assert_eq!(block.end_time.unwrap().minutes(), 24 * 60);
        }
    }

    mod weekday_tests {
        use super::*;

        #[test]
        fn classic_is_off_at_weekends() {
            // Saturday and Sunday
            let saturday = Timetable::Classic.classify(&madrid(2025, 1, 18, 10, 0, 0));
            let sunday = Timetable::Classic.classify(&madrid(2025, 1, 19, 17, 0, 0));
            assert!(saturday.kind.is_free());
            assert!(sunday.kind.is_free());
        }

        #[test]
        fn elite_weeknight_blocks_skip_friday() {
            let thursday = Timetable::Elite.classify(&madrid(2025, 1, 16, 18, 0, 0));
            assert_eq!(thursday.kind, BlockKind::Gym);

            let friday = Timetable::Elite.classify(&madrid(2025, 1, 17, 18, 0, 0));
            assert!(friday.kind.is_free());
        }

        #[test]
        fn elite_saturday_mock_exam() {
            let block = Timetable::Elite.classify(&madrid(2025, 1, 18, 9, 30, 0));
            assert_eq!(block.kind, BlockKind::Mock);
            assert_eq!(block.end_time, Some(ClockTime::hm(13, 30)));

            let after = Timetable::Elite.classify(&madrid(2025, 1, 18, 13, 30, 0));
            assert!(after.kind.is_free());
        }

        #[test]
        fn elite_half_hour_boundaries() {
            let study = Timetable::Elite.classify(&madrid(2025, 1, 13, 17, 29, 0));
            assert_eq!(study.label, "Homework / Study");
            let gym = Timetable::Elite.classify(&madrid(2025, 1, 13, 17, 30, 0));
            assert_eq!(gym.label, "Gym");
            let gap = Timetable::Elite.classify(&madrid(2025, 1, 13, 21, 0, 0));
            assert!(gap.kind.is_free());
        }
    }

    mod timezone_tests {
        use super::*;

        #[test]
        fn converts_utc_into_madrid_winter() {
            // 16:59:59Z is 17:59:59 in Madrid (CET)
            let a = Timetable::Classic.classify(&utc(2025, 1, 15, 16, 59, 59));
            assert_eq!(a.label, "Intensive Block");
            let b = Timetable::Classic.classify(&utc(2025, 1, 15, 17, 0, 0));
            assert_eq!(b.label, "Memory Block");
        }

        #[test]
        fn converts_utc_into_madrid_summer() {
            // CEST is UTC+2: 14:00Z is 16:00 local
            let block = Timetable::Classic.classify(&utc(2025, 7, 16, 14, 0, 0));
            assert_eq!(block.label, "Intensive Block");
            let before = Timetable::Classic.classify(&utc(2025, 7, 16, 13, 59, 0));
            assert!(before.kind.is_free());
        }

        #[test]
        fn caller_offset_is_irrelevant() {
            let ny = FixedOffset::west_opt(5 * 3600).unwrap();
            let instant = ny.with_ymd_and_hms(2025, 1, 15, 12, 30, 0).unwrap();
            let block = Timetable::Classic.classify(&instant);
            assert_eq!(block.label, "Memory Block");
        }

        #[test]
        fn weekday_is_taken_in_madrid() {
            // Friday 22:30 in Honolulu is already Saturday 09:30 in Madrid
            let honolulu = FixedOffset::west_opt(10 * 3600).unwrap();
            let instant = honolulu.with_ymd_and_hms(2025, 1, 17, 22, 30, 0).unwrap();
            let block = Timetable::Elite.classify(&instant);
            assert_eq!(block.kind, BlockKind::Mock);
        }
    }

    mod countdown_tests {
        use super::*;

        #[test]
        fn remaining_until_block_end() {
            let now = madrid(2025, 1, 15, 17, 59, 0);
            let block = Timetable::Classic.classify(&now);
            let left = time_remaining(&now, block.end_time.unwrap());
            assert_eq!(left, Duration::seconds(60));
            assert_eq!(countdown(&now, &block), "00:01:00");
        }

        #[test]
        fn remaining_until_midnight() {
            let now = madrid(2025, 1, 16, 23, 59, 59);
            let block = Timetable::Elite.classify(&now);
            assert_eq!(countdown(&now, &block), "00:00:01");
        }

        #[test]
        fn remaining_spans_hours() {
            let now = madrid(2025, 1, 15, 8, 0, 0);
            let block = Timetable::Classic.classify(&now);
            assert_eq!(countdown(&now, &block), "06:00:00");
        }

        #[test]
        fn free_time_has_no_countdown() {
            let now = madrid(2025, 1, 15, 22, 0, 0);
            let block = Timetable::Classic.classify(&now);
            assert_eq!(countdown(&now, &block), "--:--");
        }

        #[test]
        fn remaining_is_never_negative() {
            let now = madrid(2025, 1, 15, 19, 0, 0);
            assert_eq!(time_remaining(&now, ClockTime::hm(18, 0)), Duration::zero());
        }
    }

    #[test]
    fn classify_is_idempotent() {
        let now = utc(2025, 3, 12, 18, 15, 42);
        let first = Timetable::Elite.classify(&now);
        let second = Timetable::Elite.classify(&now);
        assert_eq!(first, second);
    }

    #[test]
    fn tables_are_disjoint_per_day() {
        for table in [Timetable::Classic, Timetable::Elite] {
            let rules = table.rules();
            for (i, a) in rules.iter().enumerate() {
                assert!(a.start < a.end, "{} is empty", a.label);
                for b in &rules[i + 1..] {
                    let shared_day = a.days.iter().any(|d| b.days.contains(d));
                    let overlap = a.start < b.end && b.start < a.end;
                    assert!(!(shared_day && overlap), "{} overlaps {}", a.label, b.label);
                }
            }
        }
    }

    #[test]
    fn current_block_serializes_end_time_as_text() {
        let block = Timetable::Classic.classify(&madrid(2025, 1, 15, 20, 10, 0));
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"end_time\":\"21:00\""));
        assert!(json.contains("\"kind\":\"review\""));
    }

    #[test]
    fn clock_time_formatting() {
        assert_eq!(ClockTime::hm(9, 30).to_string(), "09:30");
        assert_eq!(ClockTime::hm(17, 30).minutes(), 1050);
        assert_eq!(format_countdown(None), "--:--");
    }
}
