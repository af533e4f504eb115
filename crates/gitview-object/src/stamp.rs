use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

use bstr::{BStr, BString, ByteSlice};
use chrono::{DateTime, FixedOffset};

use crate::ObjectError;

/// Process-wide cache of parsed timezone offsets, keyed by textual form.
///
/// Read-mostly; parse failures are never inserted, so a malformed offset
/// cannot poison the cache.
static TZ_CACHE: LazyLock<RwLock<HashMap<BString, i32>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// A fixed offset from UTC, preserving the textual `±HHMM` form it was
/// parsed from so rendering round-trips exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    minutes: i32,
    text: BString,
}

impl Zone {
    /// UTC (`+0000`).
    pub fn utc() -> Self {
        Self {
            minutes: 0,
            text: BString::from("+0000"),
        }
    }

    /// Parse a `±HHMM` offset, consulting the process-wide cache.
    pub fn parse(text: &BStr) -> Result<Self, ObjectError> {
        if let Ok(cache) = TZ_CACHE.read() {
            if let Some(&minutes) = cache.get(text) {
                return Ok(Self {
                    minutes,
                    text: BString::from(text),
                });
            }
        }

        let minutes = parse_offset_minutes(text)?;

        if let Ok(mut cache) = TZ_CACHE.write() {
            cache.insert(BString::from(text), minutes);
        }
        Ok(Self {
            minutes,
            text: BString::from(text),
        })
    }

    /// Offset from UTC in minutes (e.g. -360 for `-0600`).
    pub fn minutes(&self) -> i32 {
        self.minutes
    }

    /// The textual form as parsed (e.g. `-0600`).
    pub fn text(&self) -> &BStr {
        self.text.as_bstr()
    }

    /// Convert to a chrono fixed offset.
    pub fn fixed_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.minutes * 60)
    }
}

/// Parse `±HHMM` (the sign is optional, as some writers omit it) into an
/// offset in minutes. The last two digits are minutes, everything before
/// them the signed hour count.
fn parse_offset_minutes(text: &BStr) -> Result<i32, ObjectError> {
    let s = std::str::from_utf8(text.as_bytes())
        .map_err(|_| ObjectError::InvalidTimezone(text.to_string()))?;
    if s.len() < 3 {
        return Err(ObjectError::InvalidTimezone(s.into()));
    }
    let (hour_part, min_part) = s.split_at(s.len() - 2);
    let hours: i32 = hour_part
        .parse()
        .map_err(|_| ObjectError::InvalidTimezone(s.into()))?;
    let mins: i32 = min_part
        .parse()
        .map_err(|_| ObjectError::InvalidTimezone(s.into()))?;

    if !(-24..=24).contains(&hours) || !(0..60).contains(&mins) {
        return Err(ObjectError::InvalidTimezone(s.into()));
    }

    let signed_mins = if hours < 0 || hour_part.starts_with('-') {
        -mins
    } else {
        mins
    };
    Ok(hours * 60 + signed_mins)
}

/// Author/committer identity with timestamp: the parsed form of
/// `Name <email> seconds ±HHMM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    pub name: BString,
    pub email: BString,
    /// Seconds since the Unix epoch. Negative values (pre-1970) are legal.
    pub seconds: i64,
    pub zone: Zone,
}

impl Stamp {
    /// Parse from git's signature line format.
    ///
    /// The name may contain spaces: the split points are the *last* `<`
    /// and `>` on the line.
    pub fn parse(input: &BStr) -> Result<Self, ObjectError> {
        let bytes = input.as_bytes();

        let gt_pos = bytes
            .iter()
            .rposition(|&b| b == b'>')
            .ok_or_else(|| ObjectError::InvalidStamp("missing '>'".into()))?;
        let lt_pos = bytes[..gt_pos]
            .iter()
            .rposition(|&b| b == b'<')
            .ok_or_else(|| ObjectError::InvalidStamp("missing '<'".into()))?;

        let name = bytes[..lt_pos].trim();
        let email = &bytes[lt_pos + 1..gt_pos];

        let rest = bytes[gt_pos + 1..].trim();
        let rest_str = std::str::from_utf8(rest)
            .map_err(|_| ObjectError::InvalidStamp("non-UTF-8 date".into()))?;
        let mut parts = rest_str.splitn(2, ' ');

        let seconds_str = parts
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ObjectError::InvalidStamp("missing timestamp".into()))?;
        let seconds: i64 = seconds_str
            .parse()
            .map_err(|_| ObjectError::InvalidStamp(format!("bad timestamp '{seconds_str}'")))?;

        let zone = match parts.next() {
            Some(tz) => Zone::parse(BStr::new(tz.trim()))?,
            None => Zone::utc(),
        };

        Ok(Self {
            name: BString::from(name),
            email: BString::from(email),
            seconds,
            zone,
        })
    }

    /// Render in git's canonical format: `Name <email> seconds ±HHMM`.
    pub fn to_bytes(&self) -> BString {
        let mut out = BString::from(Vec::new());
        out.extend_from_slice(&self.name);
        out.extend_from_slice(b" <");
        out.extend_from_slice(&self.email);
        out.extend_from_slice(b"> ");
        out.extend_from_slice(self.seconds.to_string().as_bytes());
        out.push(b' ');
        out.extend_from_slice(self.zone.text().as_bytes());
        out
    }

    /// The instant in the stamp's own zone, if representable.
    pub fn datetime(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.zone.fixed_offset()?;
        DateTime::from_timestamp(self.seconds, 0).map(|dt| dt.with_timezone(&offset))
    }
}
