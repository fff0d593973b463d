//! Weekly game night schedule and the time windows derived from it.
//!
//! All calendar arithmetic happens in the club's local time zone, daylight
//! saving included; every value handed back to callers is in UTC.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Default weekday of the game night.
pub const DEFAULT_WEEKDAY: Weekday = Weekday::Thu;

/// Default start hour of the game night (local time).
pub const DEFAULT_START_HOUR: u32 = 18;

/// Days before the game night at which booking opens (at local midnight).
pub const DEFAULT_BOOKING_WINDOW_DAYS: i64 = 6;

/// Hours either side of the slot start that still count as the same night.
pub const DEFAULT_OCCUPANCY_SLACK_HOURS: i64 = 12;

/// Closed-open or closed interval of UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self { from, to }
    }

    /// `from <= instant <= to`
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant <= self.to
    }

    /// `from <= instant < to`
    pub fn contains_half_open(&self, instant: DateTime<Utc>) -> bool {
        self.from <= instant && instant < self.to
    }
}

/// One occurrence of the weekly game night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GameNight {
    /// Local calendar date of the night.
    pub date: NaiveDate,
    pub starts_at: DateTime<Utc>,
    /// 23:59 local on the same day.
    pub ends_at: DateTime<Utc>,
}

/// When the club meets and how booking is scoped around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameNightSchedule {
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub booking_window_days: i64,
    pub occupancy_slack_hours: i64,
    pub timezone: Tz,
}

impl Default for GameNightSchedule {
    fn default() -> Self {
        Self {
            weekday: DEFAULT_WEEKDAY,
            start_time: NaiveTime::MIN + Duration::hours(DEFAULT_START_HOUR as i64),
            booking_window_days: DEFAULT_BOOKING_WINDOW_DAYS,
            occupancy_slack_hours: DEFAULT_OCCUPANCY_SLACK_HOURS,
            timezone: Tz::UTC,
        }
    }
}

impl GameNightSchedule {
    /// Builds a schedule, rejecting nonsensical windows and start times.
    ///
    /// The night must start before 23:59 local, which is when it ends.
    pub fn new(
        weekday: Weekday,
        start_time: NaiveTime,
        booking_window_days: i64,
        timezone: Tz,
    ) -> Result<Self, String> {
        if booking_window_days < 1 {
            return Err("booking_window_days must be at least 1".to_string());
        }
        if start_time >= end_of_night() {
            return Err(format!(
                "start_time must be before {}",
                end_of_night().format("%H:%M")
            ));
        }

        Ok(Self {
            weekday,
            start_time,
            booking_window_days,
            occupancy_slack_hours: DEFAULT_OCCUPANCY_SLACK_HOURS,
            timezone,
        })
    }

    /// The next game night as seen at `now`.
    ///
    /// On the game night's weekday at or after the start time, this rolls
    /// over to the following week.
    pub fn next_game_night(&self, now: DateTime<Utc>) -> GameNight {
        let local = self.to_local(now);
        let today = local.date();

        let target = self.weekday.num_days_from_monday() as i64;
        let current = today.weekday().num_days_from_monday() as i64;
        let mut days_until = (target - current + 7) % 7;
        if days_until == 0 && local.time() >= self.start_time {
            days_until = 7;
        }

        self.game_night_on(today + Duration::days(days_until))
    }

    /// The game night held on a given local date.
    pub fn game_night_on(&self, date: NaiveDate) -> GameNight {
        GameNight {
            date,
            starts_at: self.to_utc(date.and_time(self.start_time)),
            ends_at: self.to_utc(date.and_time(end_of_night())),
        }
    }

    /// Booking window: opens at local midnight `booking_window_days` before
    /// the night, closes when the night starts.
    pub fn booking_window(&self, night: &GameNight) -> TimeRange {
        let opens_on = night.date - Duration::days(self.booking_window_days);
        TimeRange::new(self.to_utc(opens_on.and_time(NaiveTime::MIN)), night.starts_at)
    }

    pub fn is_booking_open(&self, now: DateTime<Utc>, night: &GameNight) -> bool {
        self.booking_window(night).contains_half_open(now)
    }

    /// Instants that count as "this night" when querying reservations.
    pub fn occupancy_range(&self, night: &GameNight) -> TimeRange {
        self.range_around(night.starts_at)
    }

    /// `instant ± occupancy_slack_hours`.
    pub fn range_around(&self, instant: DateTime<Utc>) -> TimeRange {
        let slack = Duration::hours(self.occupancy_slack_hours);
        TimeRange::new(instant - slack, instant + slack)
    }

    /// Latest moment an invitation for `game_date` can still be accepted:
    /// the start time on the game date's local day.
    pub fn invitation_cutoff(&self, game_date: DateTime<Utc>) -> DateTime<Utc> {
        self.to_utc(self.local_date(game_date).and_time(self.start_time))
    }

    /// The local calendar day containing `instant`.
    pub fn day_range(&self, instant: DateTime<Utc>) -> TimeRange {
        let date = self.local_date(instant);
        let start = self.to_utc(date.and_time(NaiveTime::MIN));
        let end = self.to_utc((date + Duration::days(1)).and_time(NaiveTime::MIN))
            - Duration::milliseconds(1);
        TimeRange::new(start, end)
    }

    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.to_local(instant).date()
    }

    fn to_local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.timezone).naive_local()
    }

    /// Ambiguous local times (autumn fold) resolve to the earlier instant.
    /// Times skipped by a spring-forward gap move one hour later.
    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(local + Duration::hours(1)))
                    .earliest()
            })
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local))
    }
}

fn end_of_night() -> NaiveTime {
    NaiveTime::MIN + Duration::minutes(23 * 60 + 59)
}
