//! Rule-based and manual session planning.
//!
//! A [`SessionPlan`] is what clients POST to `/sessions`. Expanding it yields
//! a [`SessionBatch`] of concrete start times; nothing here touches storage.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, session::SessionBatch};

/// Longest date range a weekly rule may span, in days.
pub const MAX_SCHEDULE_DAYS: i64 = 366;

/// One explicit session in manual mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualSlot {
  pub date: NaiveDate,
  /// Clock time, `HH:MM`.
  pub hour: String,
}

/// How to produce sessions for one theater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SessionPlan {
  /// Every day in `start_date..=end_date` whose weekday (0 = Monday) is a
  /// key of `rules` gets one session per listed time.
  Rule {
    start_date:     NaiveDate,
    end_date:       NaiveDate,
    rules:          BTreeMap<u8, Vec<String>>,
    theater_id:     i64,
    performance_id: Option<i64>,
  },
  Manual {
    sessions:       Vec<ManualSlot>,
    theater_id:     i64,
    performance_id: Option<i64>,
  },
}

impl SessionPlan {
  pub fn mode(&self) -> &'static str {
    match self {
      Self::Rule { .. } => "rule",
      Self::Manual { .. } => "manual",
    }
  }

  /// Resolve the plan into concrete start times (interpreted as UTC).
  pub fn expand(&self) -> Result<SessionBatch> {
    let (theater_id, performance_id, starts) = match self {
      Self::Rule { start_date, end_date, rules, theater_id, performance_id } => {
        let rules = parse_rules(rules)?;
        let starts = expand_weekly(*start_date, *end_date, &rules)?;
        (*theater_id, *performance_id, starts)
      }
      Self::Manual { sessions, theater_id, performance_id } => {
        let starts = sessions
          .iter()
          .map(|slot| Ok(slot.date.and_time(parse_clock(&slot.hour)?)))
          .collect::<Result<Vec<_>>>()?;
        (*theater_id, *performance_id, starts)
      }
    };

    Ok(SessionBatch {
      theater_id,
      performance_id,
      starts: starts.into_iter().map(|dt| dt.and_utc()).collect(),
    })
  }
}

/// Parse a `HH:MM` clock time.
pub fn parse_clock(raw: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|_| {
    Error::validation(format!("invalid time {raw:?}: expected HH:MM"))
  })
}

/// Validate weekday keys (0..=6) and parse every clock time.
pub fn parse_rules(
  raw: &BTreeMap<u8, Vec<String>>,
) -> Result<BTreeMap<u8, Vec<NaiveTime>>> {
  raw
    .iter()
    .map(|(&weekday, times)| {
      if weekday > 6 {
        return Err(Error::validation(format!(
          "invalid weekday {weekday}: expected 0 (Monday) to 6 (Sunday)"
        )));
      }
      let times = times
        .iter()
        .map(|t| parse_clock(t))
        .collect::<Result<Vec<_>>>()?;
      Ok((weekday, times))
    })
    .collect()
}

/// Enumerate every (date, time) in `start..=end` whose weekday has times in
/// `rules`, in date order then listed-time order.
pub fn expand_weekly(
  start: NaiveDate,
  end: NaiveDate,
  rules: &BTreeMap<u8, Vec<NaiveTime>>,
) -> Result<Vec<NaiveDateTime>> {
  if end < start {
    return Err(Error::validation(format!(
      "end_date {end} is before start_date {start}"
    )));
  }
  let days = (end - start).num_days() + 1;
  if days > MAX_SCHEDULE_DAYS {
    return Err(Error::validation(format!(
      "date range spans {days} days; at most {MAX_SCHEDULE_DAYS} are allowed"
    )));
  }

  let mut out = Vec::new();
  for date in start.iter_days().take_while(|d| *d <= end) {
    let weekday = date.weekday().num_days_from_monday() as u8;
    if let Some(times) = rules.get(&weekday) {
      out.extend(times.iter().map(|t| date.and_time(*t)));
    }
  }
  Ok(out)
}
