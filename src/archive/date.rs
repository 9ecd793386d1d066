// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Best-effort envelope date extraction. Nothing here ever fails loudly:
//! a date that cannot be read is simply absent.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use mail_parser::MessageParser;

/// Reads the `Date:` header of a raw message, keeping its UTC offset.
pub fn header_date(raw: &[u8]) -> Option<DateTime<FixedOffset>> {
    let headers = header_block(raw);
    let message = MessageParser::default().parse(headers)?;
    message.date().and_then(to_chrono)
}

/// Converts the epoch seconds found on an mbox `From ` line. Zero means the
/// separator carried no usable timestamp.
pub fn separator_date(epoch_secs: u64) -> Option<DateTime<FixedOffset>> {
    if epoch_secs == 0 {
        return None;
    }
    let secs = i64::try_from(epoch_secs).ok()?;
    Utc.timestamp_opt(secs, 0).single().map(|d| d.fixed_offset())
}

/// Header date first, then the separator timestamp.
pub fn envelope_date(raw: &[u8], separator_epoch_secs: u64) -> Option<DateTime<FixedOffset>> {
    header_date(raw).or_else(|| separator_date(separator_epoch_secs))
}

// Only the header section is handed to the MIME parser; bodies can be large.
fn header_block(raw: &[u8]) -> &[u8] {
    let crlf = find(raw, b"\r\n\r\n").map(|i| i + 4);
    let lf = find(raw, b"\n\n").map(|i| i + 2);
    let end = match (crlf, lf) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => raw.len(),
    };
    &raw[..end]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn to_chrono(date: &mail_parser::DateTime) -> Option<DateTime<FixedOffset>> {
    let offset_secs = i32::from(date.tz_hour) * 3600 + i32::from(date.tz_minute) * 60;
    let offset = if date.tz_before_gmt {
        FixedOffset::west_opt(offset_secs)?
    } else {
        FixedOffset::east_opt(offset_secs)?
    };
    let naive = NaiveDate::from_ymd_opt(
        i32::from(date.year),
        u32::from(date.month),
        u32::from(date.day),
    )?
    .and_hms_opt(
        u32::from(date.hour),
        u32::from(date.minute),
        u32::from(date.second),
    )?;
    offset.from_local_datetime(&naive).single()
}
