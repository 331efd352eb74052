//! Owner contact preferences and contact bookkeeping.

use core::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A notification medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactChannel {
    /// Plain text message.
    Sms,
    /// Picture message. Accepted as a preference, never dispatched.
    Mms,
    /// Voice call reading out call instructions.
    Voice,
}

impl ContactChannel {
    /// Returns the channel name used in logs and configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Mms => "mms",
            Self::Voice => "voice",
        }
    }
}

impl fmt::Display for ContactChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which channels an owner agreed to be contacted on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ContactPreferences {
    /// Text messages.
    pub allow_sms: bool,
    /// Picture messages.
    pub allow_mms: bool,
    /// Voice calls.
    pub allow_voice: bool,
}

impl ContactPreferences {
    /// Whether the owner opted in to `channel`.
    #[must_use]
    pub const fn allows(&self, channel: ContactChannel) -> bool {
        match channel {
            ContactChannel::Sms => self.allow_sms,
            ContactChannel::Mms => self.allow_mms,
            ContactChannel::Voice => self.allow_voice,
        }
    }
}

/// When an owner was last contacted on each channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactTimestamps {
    /// Last text message.
    pub last_sms: DateTime<Utc>,
    /// Last picture message.
    pub last_mms: DateTime<Utc>,
    /// Last voice call.
    pub last_call: DateTime<Utc>,
}

impl ContactTimestamps {
    /// All three channels stamped with the same instant (used at sign-up).
    #[must_use]
    pub const fn all_at(at: DateTime<Utc>) -> Self {
        Self {
            last_sms: at,
            last_mms: at,
            last_call: at,
        }
    }

    /// The most recent contact on any channel.
    #[must_use]
    pub fn latest(&self) -> DateTime<Utc> {
        self.last_sms.max(self.last_mms).max(self.last_call)
    }

    /// Pick the instant for the next stamp.
    ///
    /// Truncated to microseconds (the storage precision) and always strictly
    /// after [`latest`](Self::latest), even when the clock has not moved on.
    #[must_use]
    pub fn next_instant(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(6);
        let latest = self.latest();
        if now > latest {
            now
        } else {
            latest + TimeDelta::microseconds(1)
        }
    }

    /// Apply a stamp at `at` according to `policy`.
    ///
    /// `attempted` lists the channels that had a dispatch action; it is only
    /// consulted by [`StampPolicy::Attempted`].
    #[must_use]
    pub fn stamped(
        &self,
        at: DateTime<Utc>,
        policy: StampPolicy,
        attempted: &[ContactChannel],
    ) -> Self {
        match policy {
            StampPolicy::All => Self::all_at(at),
            StampPolicy::Attempted => {
                let mut next = *self;
                for channel in attempted {
                    match channel {
                        ContactChannel::Sms => next.last_sms = at,
                        ContactChannel::Mms => next.last_mms = at,
                        ContactChannel::Voice => next.last_call = at,
                    }
                }
                next
            }
        }
    }
}

/// Error parsing a [`StampPolicy`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown contact stamp policy '{0}' (expected 'all' or 'attempted')")]
pub struct StampPolicyError(String);

/// Which contact timestamps a dispatch updates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StampPolicy {
    /// Every timestamp is set after any dispatch, whichever channels fired.
    #[default]
    All,
    /// Only channels that had an action are stamped.
    Attempted,
}

impl FromStr for StampPolicy {
    type Err = StampPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "attempted" => Ok(Self::Attempted),
            other => Err(StampPolicyError(other.to_owned())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_preferences_allow_per_channel() {
        let prefs = ContactPreferences {
            allow_sms: true,
            allow_mms: false,
            allow_voice: true,
        };
        assert!(prefs.allows(ContactChannel::Sms));
        assert!(!prefs.allows(ContactChannel::Mms));
        assert!(prefs.allows(ContactChannel::Voice));
    }

    #[test]
    fn test_next_instant_uses_clock_when_ahead() {
        let stamps = ContactTimestamps::all_at(at(100));
        assert_eq!(stamps.next_instant(at(200)), at(200));
    }

    #[test]
    fn test_next_instant_strictly_after_latest_when_clock_lags() {
        let stamps = ContactTimestamps {
            last_sms: at(100),
            last_mms: at(300),
            last_call: at(200),
        };
        let next = stamps.next_instant(at(300));
        assert!(next > at(300));
        assert_eq!(next - at(300), TimeDelta::microseconds(1));
    }

    #[test]
    fn test_next_instant_truncates_to_micros() {
        let stamps = ContactTimestamps::all_at(at(0));
        let now = at(10) + TimeDelta::nanoseconds(1_500);
        assert_eq!(stamps.next_instant(now), at(10) + TimeDelta::microseconds(1));
    }

    #[test]
    fn test_stamp_all_sets_every_channel() {
        let stamps = ContactTimestamps {
            last_sms: at(1),
            last_mms: at(2),
            last_call: at(3),
        };
        let next = stamps.stamped(at(50), StampPolicy::All, &[ContactChannel::Sms]);
        assert_eq!(next, ContactTimestamps::all_at(at(50)));
    }

    #[test]
    fn test_stamp_attempted_only_touches_used_channels() {
        let stamps = ContactTimestamps::all_at(at(1));
        let next = stamps.stamped(at(50), StampPolicy::Attempted, &[ContactChannel::Voice]);
        assert_eq!(next.last_call, at(50));
        assert_eq!(next.last_sms, at(1));
        assert_eq!(next.last_mms, at(1));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("ALL".parse::<StampPolicy>().unwrap(), StampPolicy::All);
        assert_eq!(
            " attempted ".parse::<StampPolicy>().unwrap(),
            StampPolicy::Attempted
        );
        assert!("used".parse::<StampPolicy>().is_err());
    }
}
