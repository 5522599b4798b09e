//! iCalendar RRULE (Recurrence Rule) value type (RFC 5545 §3.3.10, §3.8.5.3).

use std::fmt;

use super::error::{RecurrenceError, RecurrenceResult};
use super::Temporal;

/// Recurrence frequency (RFC 5545 §3.3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Secondly => "SECONDLY",
            Self::Minutely => "MINUTELY",
            Self::Hourly => "HOURLY",
            Self::Daily => "DAILY",
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
            Self::Yearly => "YEARLY",
        }
    }

    /// Parses a frequency from a string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SECONDLY" => Self::Secondly,
            "MINUTELY" => Self::Minutely,
            "HOURLY" => Self::Hourly,
            "DAILY" => Self::Daily,
            "WEEKLY" => Self::Weekly,
            "MONTHLY" => Self::Monthly,
            "YEARLY" => Self::Yearly,
            _ => return None,
        })
    }

    /// Returns whether the frequency steps in units smaller than a day.
    #[must_use]
    pub const fn is_sub_daily(self) -> bool {
        matches!(self, Self::Secondly | Self::Minutely | Self::Hourly)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Day of the week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Returns the two-letter abbreviation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sunday => "SU",
            Self::Monday => "MO",
            Self::Tuesday => "TU",
            Self::Wednesday => "WE",
            Self::Thursday => "TH",
            Self::Friday => "FR",
            Self::Saturday => "SA",
        }
    }

    /// Parses a weekday from a two-letter abbreviation (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "SU" => Self::Sunday,
            "MO" => Self::Monday,
            "TU" => Self::Tuesday,
            "WE" => Self::Wednesday,
            "TH" => Self::Thursday,
            "FR" => Self::Friday,
            "SA" => Self::Saturday,
            _ => return None,
        })
    }

    /// Returns all weekdays in order (Sunday through Saturday).
    #[must_use]
    pub const fn all() -> [Self; 7] {
        [
            Self::Sunday,
            Self::Monday,
            Self::Tuesday,
            Self::Wednesday,
            Self::Thursday,
            Self::Friday,
            Self::Saturday,
        ]
    }

    /// Converts to the `chrono` weekday.
    #[must_use]
    pub const fn to_chrono(self) -> chrono::Weekday {
        match self {
            Self::Sunday => chrono::Weekday::Sun,
            Self::Monday => chrono::Weekday::Mon,
            Self::Tuesday => chrono::Weekday::Tue,
            Self::Wednesday => chrono::Weekday::Wed,
            Self::Thursday => chrono::Weekday::Thu,
            Self::Friday => chrono::Weekday::Fri,
            Self::Saturday => chrono::Weekday::Sat,
        }
    }

    /// Converts from the `chrono` weekday.
    #[must_use]
    pub const fn from_chrono(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weekday with optional occurrence number.
///
/// Used in BYDAY rule part. Examples:
/// - `MO` - every Monday
/// - `1MO` - first Monday of the month/year
/// - `-1FR` - last Friday of the month/year
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayNum {
    /// Optional occurrence number (-53 to 53, excluding 0).
    pub ordinal: Option<i8>,
    /// The day of the week.
    pub weekday: Weekday,
}

impl WeekdayNum {
    /// Creates a weekday occurrence without an ordinal.
    #[must_use]
    pub const fn every(weekday: Weekday) -> Self {
        Self {
            ordinal: None,
            weekday,
        }
    }

    /// Creates a weekday occurrence with an ordinal.
    ///
    /// The ordinal is range-checked when the rule is built.
    #[must_use]
    pub const fn nth(ordinal: i8, weekday: Weekday) -> Self {
        Self {
            ordinal: Some(ordinal),
            weekday,
        }
    }
}

impl fmt::Display for WeekdayNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(n) = self.ordinal {
            write!(f, "{n}")?;
        }
        write!(f, "{}", self.weekday)
    }
}

/// Kind of a BYxxx rule part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByRuleKind {
    Month,
    WeekNo,
    YearDay,
    MonthDay,
    Day,
    Hour,
    Minute,
    Second,
    SetPos,
}

impl ByRuleKind {
    /// Order in which rule parts are applied during expansion
    /// (RFC 5545 §3.3.10). BYSETPOS is always last.
    pub const EXPANSION_ORDER: [Self; 9] = [
        Self::Month,
        Self::WeekNo,
        Self::YearDay,
        Self::MonthDay,
        Self::Day,
        Self::Hour,
        Self::Minute,
        Self::Second,
        Self::SetPos,
    ];

    /// Order in which rule parts are written back to RRULE text.
    pub const TEXT_ORDER: [Self; 9] = [
        Self::Second,
        Self::Minute,
        Self::Hour,
        Self::Day,
        Self::MonthDay,
        Self::YearDay,
        Self::WeekNo,
        Self::Month,
        Self::SetPos,
    ];

    /// Returns the rule part name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Month => "BYMONTH",
            Self::WeekNo => "BYWEEKNO",
            Self::YearDay => "BYYEARDAY",
            Self::MonthDay => "BYMONTHDAY",
            Self::Day => "BYDAY",
            Self::Hour => "BYHOUR",
            Self::Minute => "BYMINUTE",
            Self::Second => "BYSECOND",
            Self::SetPos => "BYSETPOS",
        }
    }

    /// Position of this kind in [`Self::EXPANSION_ORDER`].
    #[must_use]
    pub fn expansion_rank(self) -> usize {
        Self::EXPANSION_ORDER
            .iter()
            .position(|kind| *kind == self)
            .unwrap_or(Self::EXPANSION_ORDER.len())
    }

    /// Returns whether the part constrains time of day.
    #[must_use]
    pub const fn is_time_part(self) -> bool {
        matches!(self, Self::Hour | Self::Minute | Self::Second)
    }
}

impl fmt::Display for ByRuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One BYxxx rule part and its selectors, in the order they were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ByRule {
    /// Months (1-12).
    Month(Vec<u8>),
    /// ISO 8601 week numbers (-53 to 53, excluding 0).
    WeekNo(Vec<i8>),
    /// Days of the year (-366 to 366, excluding 0).
    YearDay(Vec<i16>),
    /// Days of the month (-31 to 31, excluding 0).
    MonthDay(Vec<i8>),
    /// Weekdays with optional occurrence numbers.
    Day(Vec<WeekdayNum>),
    /// Hours (0-23).
    Hour(Vec<u8>),
    /// Minutes (0-59).
    Minute(Vec<u8>),
    /// Seconds (0-60, 60 for leap second).
    Second(Vec<u8>),
    /// Positions within the frequency period (-366 to 366, excluding 0).
    SetPos(Vec<i16>),
}

impl ByRule {
    /// Returns the kind of this rule part.
    #[must_use]
    pub const fn kind(&self) -> ByRuleKind {
        match self {
            Self::Month(_) => ByRuleKind::Month,
            Self::WeekNo(_) => ByRuleKind::WeekNo,
            Self::YearDay(_) => ByRuleKind::YearDay,
            Self::MonthDay(_) => ByRuleKind::MonthDay,
            Self::Day(_) => ByRuleKind::Day,
            Self::Hour(_) => ByRuleKind::Hour,
            Self::Minute(_) => ByRuleKind::Minute,
            Self::Second(_) => ByRuleKind::Second,
            Self::SetPos(_) => ByRuleKind::SetPos,
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Month(v) | Self::Hour(v) | Self::Minute(v) | Self::Second(v) => v.len(),
            Self::WeekNo(v) | Self::MonthDay(v) => v.len(),
            Self::YearDay(v) | Self::SetPos(v) => v.len(),
            Self::Day(v) => v.len(),
        }
    }

    /// Checks every selector against the legal domain of its kind.
    fn validate_domain(&self) -> RecurrenceResult<()> {
        let element = self.kind().as_str();
        if self.len() == 0 {
            return Err(RecurrenceError::malformed(
                element,
                "must list at least one value",
            ));
        }

        let out_of_range = |value: String, domain: &str| {
            RecurrenceError::malformed(element, format!("{value} is outside {domain}"))
        };

        match self {
            Self::Month(months) => check_unsigned(months, 1, 12, "1..=12", out_of_range),
            Self::Hour(hours) => check_unsigned(hours, 0, 23, "0..=23", out_of_range),
            Self::Minute(minutes) => check_unsigned(minutes, 0, 59, "0..=59", out_of_range),
            Self::Second(seconds) => check_unsigned(seconds, 0, 60, "0..=60", out_of_range),
            Self::WeekNo(weeks) => check_signed(
                weeks.iter().map(|w| i16::from(*w)),
                53,
                "-53..=-1 or 1..=53",
                out_of_range,
            ),
            Self::MonthDay(days) => check_signed(
                days.iter().map(|d| i16::from(*d)),
                31,
                "-31..=-1 or 1..=31",
                out_of_range,
            ),
            Self::YearDay(days) => {
                check_signed(days.iter().copied(), 366, "-366..=-1 or 1..=366", out_of_range)
            }
            Self::SetPos(positions) => check_signed(
                positions.iter().copied(),
                366,
                "-366..=-1 or 1..=366",
                out_of_range,
            ),
            Self::Day(days) => check_signed(
                days.iter().filter_map(|d| d.ordinal).map(i16::from),
                53,
                "-53..=-1 or 1..=53",
                out_of_range,
            ),
        }
    }

    fn values_text(&self) -> String {
        fn join<T: ToString>(values: &[T]) -> String {
            values
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        }
        match self {
            Self::Month(v) | Self::Hour(v) | Self::Minute(v) | Self::Second(v) => join(v),
            Self::WeekNo(v) | Self::MonthDay(v) => join(v),
            Self::YearDay(v) | Self::SetPos(v) => join(v),
            Self::Day(v) => join(v),
        }
    }
}

impl fmt::Display for ByRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind(), self.values_text())
    }
}

fn check_unsigned(
    values: &[u8],
    min: u8,
    max: u8,
    domain: &str,
    out_of_range: impl Fn(String, &str) -> RecurrenceError,
) -> RecurrenceResult<()> {
    match values.iter().find(|v| !(min..=max).contains(*v)) {
        Some(bad) => Err(out_of_range(bad.to_string(), domain)),
        None => Ok(()),
    }
}

fn check_signed(
    mut values: impl Iterator<Item = i16>,
    max: i16,
    domain: &str,
    out_of_range: impl Fn(String, &str) -> RecurrenceError,
) -> RecurrenceResult<()> {
    match values.find(|v| *v == 0 || v.abs() > max) {
        Some(bad) => Err(out_of_range(bad.to_string(), domain)),
        None => Ok(()),
    }
}

/// Recurrence rule (RFC 5545 §3.3.10, §3.8.5.3).
///
/// Only obtainable through [`RuleBuilder::build`], so every value of this
/// type is valid. Editing a rule means building a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    freq: Frequency,
    interval: u32,
    count: Option<u32>,
    until: Option<Temporal>,
    wkst: Option<Weekday>,
    /// Sorted by [`ByRuleKind::expansion_rank`], at most one per kind.
    by_rules: Vec<ByRule>,
}

impl RecurrenceRule {
    /// Starts a rule with no frequency; `build` fails until one is set.
    #[must_use]
    pub fn builder() -> RuleBuilder {
        RuleBuilder::default()
    }

    /// Starts a rule with the given frequency.
    #[must_use]
    pub fn with_frequency(freq: Frequency) -> RuleBuilder {
        RuleBuilder::default().frequency(freq)
    }

    /// Starts a daily rule.
    #[must_use]
    pub fn daily() -> RuleBuilder {
        Self::with_frequency(Frequency::Daily)
    }

    /// Starts a weekly rule.
    #[must_use]
    pub fn weekly() -> RuleBuilder {
        Self::with_frequency(Frequency::Weekly)
    }

    /// Starts a monthly rule.
    #[must_use]
    pub fn monthly() -> RuleBuilder {
        Self::with_frequency(Frequency::Monthly)
    }

    /// Starts a yearly rule.
    #[must_use]
    pub fn yearly() -> RuleBuilder {
        Self::with_frequency(Frequency::Yearly)
    }

    #[must_use]
    pub const fn frequency(&self) -> Frequency {
        self.freq
    }

    #[must_use]
    pub const fn interval(&self) -> u32 {
        self.interval
    }

    #[must_use]
    pub const fn count(&self) -> Option<u32> {
        self.count
    }

    #[must_use]
    pub const fn until(&self) -> Option<&Temporal> {
        self.until.as_ref()
    }

    /// Week start day (default: Monday).
    #[must_use]
    pub fn week_start(&self) -> Weekday {
        self.wkst.unwrap_or(Weekday::Monday)
    }

    /// Rule parts in expansion order.
    #[must_use]
    pub fn by_rules(&self) -> &[ByRule] {
        &self.by_rules
    }

    #[must_use]
    pub fn by_rule(&self, kind: ByRuleKind) -> Option<&ByRule> {
        self.by_rules.iter().find(|rule| rule.kind() == kind)
    }

    #[must_use]
    pub fn has(&self, kind: ByRuleKind) -> bool {
        self.by_rule(kind).is_some()
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = vec![format!("FREQ={}", self.freq)];

        if self.interval != 1 {
            parts.push(format!("INTERVAL={}", self.interval));
        }

        if let Some(ref until) = self.until {
            parts.push(format!("UNTIL={until}"));
        }

        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }

        if let Some(wkst) = self.wkst {
            parts.push(format!("WKST={wkst}"));
        }

        for kind in ByRuleKind::TEXT_ORDER {
            if let Some(rule) = self.by_rule(kind) {
                parts.push(rule.to_string());
            }
        }

        write!(f, "{}", parts.join(";"))
    }
}

/// Collects rule parts and validates them into a [`RecurrenceRule`].
#[derive(Debug, Clone, Default)]
pub struct RuleBuilder {
    freq: Option<Frequency>,
    interval: Option<u32>,
    count: Option<u32>,
    until: Option<Temporal>,
    wkst: Option<Weekday>,
    by_rules: Vec<ByRule>,
}

impl RuleBuilder {
    /// Sets the frequency.
    #[must_use]
    pub fn frequency(mut self, freq: Frequency) -> Self {
        self.freq = Some(freq);
        self
    }

    /// Sets the interval.
    #[must_use]
    pub fn with_interval(mut self, interval: u32) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Sets the count.
    #[must_use]
    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }

    /// Sets the inclusive UNTIL bound.
    #[must_use]
    pub fn with_until(mut self, until: Temporal) -> Self {
        self.until = Some(until);
        self
    }

    /// Sets the week start day.
    #[must_use]
    pub fn with_wkst(mut self, wkst: Weekday) -> Self {
        self.wkst = Some(wkst);
        self
    }

    /// Adds a BYxxx rule part.
    #[must_use]
    pub fn with_by_rule(mut self, rule: ByRule) -> Self {
        self.by_rules.push(rule);
        self
    }

    /// Sets the by-day list.
    #[must_use]
    pub fn with_by_day(self, days: Vec<WeekdayNum>) -> Self {
        self.with_by_rule(ByRule::Day(days))
    }

    /// Sets the by-month list.
    #[must_use]
    pub fn with_by_month(self, months: Vec<u8>) -> Self {
        self.with_by_rule(ByRule::Month(months))
    }

    /// Sets the by-monthday list.
    #[must_use]
    pub fn with_by_monthday(self, days: Vec<i8>) -> Self {
        self.with_by_rule(ByRule::MonthDay(days))
    }

    /// Sets the by-setpos list.
    #[must_use]
    pub fn with_by_setpos(self, positions: Vec<i16>) -> Self {
        self.with_by_rule(ByRule::SetPos(positions))
    }

    /// ## Summary
    /// Validates the collected parts and builds the rule.
    ///
    /// ## Errors
    /// Returns `RecurrenceError::MalformedRule` naming the offending part if
    /// the frequency is missing, INTERVAL or COUNT is zero, COUNT and UNTIL
    /// are both set, a BYxxx kind repeats, a selector is outside its domain,
    /// or a BYxxx part is not allowed with the frequency.
    pub fn build(self) -> RecurrenceResult<RecurrenceRule> {
        let freq = self
            .freq
            .ok_or_else(|| RecurrenceError::malformed("FREQ", "is required"))?;

        let interval = self.interval.unwrap_or(1);
        if interval == 0 {
            return Err(RecurrenceError::malformed("INTERVAL", "must be at least 1"));
        }

        if self.count == Some(0) {
            return Err(RecurrenceError::malformed("COUNT", "must be at least 1"));
        }

        if self.count.is_some() && self.until.is_some() {
            return Err(RecurrenceError::malformed(
                "UNTIL",
                "COUNT and UNTIL are mutually exclusive",
            ));
        }

        let mut by_rules = self.by_rules;
        by_rules.sort_by_key(|rule| rule.kind().expansion_rank());
        if let Some(pair) = by_rules.windows(2).find(|w| w[0].kind() == w[1].kind()) {
            return Err(RecurrenceError::malformed(
                pair[0].kind().as_str(),
                "appears more than once",
            ));
        }

        for rule in &by_rules {
            rule.validate_domain()?;
        }

        let rule = RecurrenceRule {
            freq,
            interval,
            count: self.count,
            until: self.until,
            wkst: self.wkst,
            by_rules,
        };
        validate_frequency_combinations(&rule)?;

        tracing::trace!(rule = %rule, "Built recurrence rule");
        Ok(rule)
    }
}

/// Applies the RFC 5545 restrictions on which parts may accompany a frequency.
fn validate_frequency_combinations(rule: &RecurrenceRule) -> RecurrenceResult<()> {
    let freq = rule.frequency();

    if rule.has(ByRuleKind::WeekNo) && freq != Frequency::Yearly {
        return Err(RecurrenceError::malformed(
            "BYWEEKNO",
            format!("is only valid with YEARLY, not {freq}"),
        ));
    }

    if rule.has(ByRuleKind::YearDay)
        && matches!(
            freq,
            Frequency::Daily | Frequency::Weekly | Frequency::Monthly
        )
    {
        return Err(RecurrenceError::malformed(
            "BYYEARDAY",
            format!("is not valid with {freq}"),
        ));
    }

    if rule.has(ByRuleKind::MonthDay) && freq == Frequency::Weekly {
        return Err(RecurrenceError::malformed(
            "BYMONTHDAY",
            "is not valid with WEEKLY",
        ));
    }

    if let Some(ByRule::Day(days)) = rule.by_rule(ByRuleKind::Day)
        && days.iter().any(|day| day.ordinal.is_some())
    {
        if !matches!(freq, Frequency::Monthly | Frequency::Yearly) {
            return Err(RecurrenceError::malformed(
                "BYDAY",
                format!("ordinal weekdays are not valid with {freq}"),
            ));
        }
        if freq == Frequency::Yearly && rule.has(ByRuleKind::WeekNo) {
            return Err(RecurrenceError::malformed(
                "BYDAY",
                "ordinal weekdays are not valid together with BYWEEKNO",
            ));
        }
    }

    if rule.has(ByRuleKind::SetPos) && rule.by_rules().len() == 1 {
        return Err(RecurrenceError::malformed(
            "BYSETPOS",
            "requires another BYxxx rule part",
        ));
    }

    Ok(())
}
