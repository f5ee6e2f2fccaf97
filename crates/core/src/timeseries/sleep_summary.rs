//! Chart-ready sleep summaries for a week or a calendar month.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use super::timeseries_model::SleepSession;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklySleepSummary {
    /// Hours per weekday, Monday first.
    pub daily_sleep_durations: Vec<f64>,
    pub nights: usize,
    pub total_duration_hours: f64,
    pub avg_duration_hours: f64,
    pub avg_sleep_time: String,
    pub avg_wake_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySleepSummary {
    /// Hours per week of the month; days 29-31 fold into the fourth week.
    pub weekly_sleep_durations: Vec<f64>,
    /// Hours per day of the month, index 0 = the 1st.
    pub daily_sleep_durations: Vec<f64>,
    pub nights: usize,
    pub total_duration_hours: f64,
    pub avg_duration_hours: f64,
    pub avg_sleep_time: String,
    pub avg_wake_time: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Keeps the latest session per calendar night.
fn latest_per_night(sessions: &[SleepSession]) -> Vec<&SleepSession> {
    let mut by_night: BTreeMap<NaiveDate, &SleepSession> = BTreeMap::new();
    for session in sessions {
        let night = session.sleep_time.date();
        match by_night.get(&night) {
            Some(existing) if existing.sleep_time >= session.sleep_time => {}
            _ => {
                by_night.insert(night, session);
            }
        }
    }
    by_night.into_values().collect()
}

fn hours(session: &SleepSession) -> f64 {
    (session.wake_time - session.sleep_time).num_seconds().max(0) as f64 / 3600.0
}

/// Average clock time; times before noon count as after midnight.
fn average_clock(times: impl Iterator<Item = NaiveDateTime>, roll_morning: bool) -> String {
    let minutes: Vec<u32> = times
        .map(|t| {
            let mut hour = t.hour();
            if roll_morning && hour < 12 {
                hour += 24;
            }
            hour * 60 + t.minute()
        })
        .collect();
    if minutes.is_empty() {
        return "00:00".to_string();
    }
    let avg = minutes.iter().sum::<u32>() / minutes.len() as u32;
    format!("{:02}:{:02}", (avg / 60) % 24, avg % 60)
}

pub fn summarize_week(sessions: &[SleepSession]) -> Option<WeeklySleepSummary> {
    let nights = latest_per_night(sessions);
    if nights.is_empty() {
        return None;
    }

    let mut per_weekday = vec![0.0_f64; 7];
    for session in &nights {
        let weekday = session.sleep_time.weekday().num_days_from_monday() as usize;
        per_weekday[weekday] += hours(session);
    }
    let daily: Vec<f64> = per_weekday.into_iter().map(round2).collect();
    let total: f64 = daily.iter().sum();

    Some(WeeklySleepSummary {
        daily_sleep_durations: daily,
        nights: nights.len(),
        total_duration_hours: round2(total),
        avg_duration_hours: round2(total / nights.len() as f64),
        avg_sleep_time: average_clock(nights.iter().map(|s| s.sleep_time), true),
        avg_wake_time: average_clock(nights.iter().map(|s| s.wake_time), false),
    })
}

pub fn summarize_month(
    sessions: &[SleepSession],
    year: i32,
    month: u32,
) -> Option<MonthlySleepSummary> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let days_in_month = (next_first - first).num_days() as usize;

    let nights: Vec<&SleepSession> = latest_per_night(sessions)
        .into_iter()
        .filter(|s| s.sleep_time.date() >= first && s.sleep_time.date() < next_first)
        .collect();
    if nights.is_empty() {
        return None;
    }

    let mut daily = vec![0.0_f64; days_in_month];
    let mut weekly = vec![0.0_f64; 4];
    for session in &nights {
        let day_index = (session.sleep_time.date() - first).num_days() as usize;
        let duration = hours(session);
        daily[day_index] = round2(duration);
        weekly[(day_index / 7).min(3)] += duration;
    }
    let weekly: Vec<f64> = weekly.into_iter().map(round2).collect();
    let total: f64 = weekly.iter().sum();

    Some(MonthlySleepSummary {
        weekly_sleep_durations: weekly,
        daily_sleep_durations: daily,
        nights: nights.len(),
        total_duration_hours: round2(total),
        avg_duration_hours: round2(total / nights.len() as f64),
        avg_sleep_time: average_clock(nights.iter().map(|s| s.sleep_time), true),
        avg_wake_time: average_clock(nights.iter().map(|s| s.wake_time), false),
    })
}
