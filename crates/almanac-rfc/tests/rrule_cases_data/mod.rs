use almanac_rfc::rfc::ical::core::{ByRule, Frequency, RecurrenceRule, RuleBuilder, Temporal, Weekday, WeekdayNum};

use Weekday::{Friday, Monday, Saturday, Sunday, Thursday, Tuesday, Wednesday};

pub struct RRuleCase {
    pub name: &'static str,
    /// UTC anchor, `YYYYMMDDTHHMMSSZ`.
    pub dtstart: &'static str,
    pub rule: fn() -> RuleBuilder,
    pub expected: Option<&'static [&'static str]>,
    pub limit: u16,
}

fn utc(y: i32, m: u32, d: u32, h: u32) -> Temporal {
    Temporal::utc_ymd_hms(y, m, d, h, 0, 0).expect("valid UTC value")
}

fn days(days: &[Weekday]) -> Vec<WeekdayNum> {
    days.iter().copied().map(WeekdayNum::every).collect()
}

#[expect(clippy::too_many_lines)]
pub fn rrule_cases() -> Vec<RRuleCase> {
    vec![
        RRuleCase {
            name: "daily_count",
            dtstart: "19970902T090000Z",
            rule: || RecurrenceRule::daily().with_count(10),
            expected: None,
            limit: 100,
        },
        RRuleCase {
            name: "every_tenth_day",
            dtstart: "19970902T090000Z",
            rule: || RecurrenceRule::daily().with_interval(10).with_count(5),
            expected: Some(&[
                "1997-09-02T09:00:00+00:00",
                "1997-09-12T09:00:00+00:00",
                "1997-09-22T09:00:00+00:00",
                "1997-10-02T09:00:00+00:00",
                "1997-10-12T09:00:00+00:00",
            ]),
            limit: 100,
        },
        RRuleCase {
            name: "every_day_in_january",
            dtstart: "19980101T090000Z",
            rule: || {
                RecurrenceRule::yearly()
                    .with_until(utc(2000, 1, 31, 14))
                    .with_by_month(vec![1])
                    .with_by_day(days(&[
                        Sunday, Monday, Tuesday, Wednesday, Thursday, Friday, Saturday,
                    ]))
            },
            expected: None,
            limit: 200,
        },
        RRuleCase {
            name: "weekly_count",
            dtstart: "19970902T090000Z",
            rule: || RecurrenceRule::weekly().with_count(10),
            expected: None,
            limit: 100,
        },
        RRuleCase {
            name: "weekly_tuesday_thursday_until",
            dtstart: "19970902T090000Z",
            rule: || {
                RecurrenceRule::weekly()
                    .with_until(utc(1997, 10, 7, 0))
                    .with_wkst(Sunday)
                    .with_by_day(days(&[Tuesday, Thursday]))
            },
            expected: Some(&[
                "1997-09-02T09:00:00+00:00",
                "1997-09-04T09:00:00+00:00",
                "1997-09-09T09:00:00+00:00",
                "1997-09-11T09:00:00+00:00",
                "1997-09-16T09:00:00+00:00",
                "1997-09-18T09:00:00+00:00",
                "1997-09-23T09:00:00+00:00",
                "1997-09-25T09:00:00+00:00",
                "1997-09-30T09:00:00+00:00",
                "1997-10-02T09:00:00+00:00",
            ]),
            limit: 100,
        },
        RRuleCase {
            name: "biweekly_mon_wed_fri_until",
            dtstart: "19970901T090000Z",
            rule: || {
                RecurrenceRule::weekly()
                    .with_interval(2)
                    .with_until(utc(1997, 12, 24, 0))
                    .with_wkst(Sunday)
                    .with_by_day(days(&[Monday, Wednesday, Friday]))
            },
            expected: None,
            limit: 100,
        },
        RRuleCase {
            name: "monthly_first_friday",
            dtstart: "19970905T090000Z",
            rule: || {
                RecurrenceRule::monthly()
                    .with_count(10)
                    .with_by_day(vec![WeekdayNum::nth(1, Friday)])
            },
            expected: Some(&[
                "1997-09-05T09:00:00+00:00",
                "1997-10-03T09:00:00+00:00",
                "1997-11-07T09:00:00+00:00",
                "1997-12-05T09:00:00+00:00",
                "1998-01-02T09:00:00+00:00",
                "1998-02-06T09:00:00+00:00",
                "1998-03-06T09:00:00+00:00",
                "1998-04-03T09:00:00+00:00",
                "1998-05-01T09:00:00+00:00",
                "1998-06-05T09:00:00+00:00",
            ]),
            limit: 100,
        },
        RRuleCase {
            name: "bimonthly_first_and_last_sunday",
            dtstart: "19970907T090000Z",
            rule: || {
                RecurrenceRule::monthly()
                    .with_interval(2)
                    .with_count(10)
                    .with_by_day(vec![WeekdayNum::nth(1, Sunday), WeekdayNum::nth(-1, Sunday)])
            },
            expected: None,
            limit: 100,
        },
        RRuleCase {
            name: "monthly_second_to_last_monday",
            dtstart: "19970922T090000Z",
            rule: || {
                RecurrenceRule::monthly()
                    .with_count(6)
                    .with_by_day(vec![WeekdayNum::nth(-2, Monday)])
            },
            expected: None,
            limit: 100,
        },
        RRuleCase {
            name: "monthly_third_to_last_day",
            dtstart: "19970928T090000Z",
            rule: || RecurrenceRule::monthly().with_by_monthday(vec![-3]),
            expected: None,
            limit: 12,
        },
        RRuleCase {
            name: "monthly_second_and_fifteenth",
            dtstart: "19970902T090000Z",
            rule: || RecurrenceRule::monthly().with_count(10).with_by_monthday(vec![2, 15]),
            expected: None,
            limit: 100,
        },
        RRuleCase {
            name: "yearly_june_and_july",
            dtstart: "19970610T090000Z",
            rule: || RecurrenceRule::yearly().with_count(10).with_by_month(vec![6, 7]),
            expected: None,
            limit: 100,
        },
        RRuleCase {
            name: "every_third_year_by_yearday",
            dtstart: "19970101T090000Z",
            rule: || {
                RecurrenceRule::yearly()
                    .with_interval(3)
                    .with_count(10)
                    .with_by_rule(ByRule::YearDay(vec![1, 100, 200]))
            },
            expected: None,
            limit: 100,
        },
        RRuleCase {
            name: "twentieth_monday_of_year",
            dtstart: "19970519T090000Z",
            rule: || RecurrenceRule::yearly().with_by_day(vec![WeekdayNum::nth(20, Monday)]),
            expected: Some(&[
                "1997-05-19T09:00:00+00:00",
                "1998-05-18T09:00:00+00:00",
                "1999-05-17T09:00:00+00:00",
            ]),
            limit: 3,
        },
        RRuleCase {
            name: "monday_of_week_twenty",
            dtstart: "19970512T090000Z",
            rule: || {
                RecurrenceRule::yearly()
                    .with_by_rule(ByRule::WeekNo(vec![20]))
                    .with_by_day(days(&[Monday]))
            },
            expected: Some(&[
                "1997-05-12T09:00:00+00:00",
                "1998-05-11T09:00:00+00:00",
                "1999-05-17T09:00:00+00:00",
            ]),
            limit: 3,
        },
        RRuleCase {
            name: "thursdays_in_march",
            dtstart: "19970313T090000Z",
            rule: || RecurrenceRule::yearly().with_by_month(vec![3]).with_by_day(days(&[Thursday])),
            expected: None,
            limit: 11,
        },
        RRuleCase {
            name: "friday_the_thirteenth",
            dtstart: "19970902T090000Z",
            rule: || RecurrenceRule::monthly().with_by_day(days(&[Friday])).with_by_monthday(vec![13]),
            expected: Some(&[
                "1998-02-13T09:00:00+00:00",
                "1998-03-13T09:00:00+00:00",
                "1998-11-13T09:00:00+00:00",
                "1999-08-13T09:00:00+00:00",
                "2000-10-13T09:00:00+00:00",
            ]),
            limit: 5,
        },
        RRuleCase {
            name: "saturday_after_first_sunday",
            dtstart: "19970913T090000Z",
            rule: || {
                RecurrenceRule::monthly()
                    .with_by_day(days(&[Saturday]))
                    .with_by_monthday(vec![7, 8, 9, 10, 11, 12, 13])
            },
            expected: None,
            limit: 10,
        },
        RRuleCase {
            name: "us_presidential_election_day",
            dtstart: "19961105T090000Z",
            rule: || {
                RecurrenceRule::yearly()
                    .with_interval(4)
                    .with_by_month(vec![11])
                    .with_by_day(days(&[Tuesday]))
                    .with_by_monthday(vec![2, 3, 4, 5, 6, 7, 8])
            },
            expected: Some(&[
                "1996-11-05T09:00:00+00:00",
                "2000-11-07T09:00:00+00:00",
                "2004-11-02T09:00:00+00:00",
            ]),
            limit: 3,
        },
        RRuleCase {
            name: "third_tuesday_wednesday_or_thursday",
            dtstart: "19970904T090000Z",
            rule: || {
                RecurrenceRule::monthly()
                    .with_count(3)
                    .with_by_day(days(&[Tuesday, Wednesday, Thursday]))
                    .with_by_setpos(vec![3])
            },
            expected: Some(&[
                "1997-09-04T09:00:00+00:00",
                "1997-10-07T09:00:00+00:00",
                "1997-11-06T09:00:00+00:00",
            ]),
            limit: 100,
        },
        RRuleCase {
            name: "second_to_last_weekday",
            dtstart: "19970929T090000Z",
            rule: || {
                RecurrenceRule::monthly()
                    .with_by_day(days(&[Monday, Tuesday, Wednesday, Thursday, Friday]))
                    .with_by_setpos(vec![-2])
            },
            expected: None,
            limit: 7,
        },
        RRuleCase {
            name: "every_three_hours_until",
            dtstart: "19970902T090000Z",
            rule: || {
                RecurrenceRule::with_frequency(Frequency::Hourly)
                    .with_interval(3)
                    .with_until(utc(1997, 9, 2, 17))
            },
            expected: Some(&[
                "1997-09-02T09:00:00+00:00",
                "1997-09-02T12:00:00+00:00",
                "1997-09-02T15:00:00+00:00",
            ]),
            limit: 100,
        },
        RRuleCase {
            name: "every_fifteen_minutes",
            dtstart: "19970902T090000Z",
            rule: || {
                RecurrenceRule::with_frequency(Frequency::Minutely)
                    .with_interval(15)
                    .with_count(6)
            },
            expected: None,
            limit: 100,
        },
        RRuleCase {
            name: "every_twenty_minutes_in_office_hours",
            dtstart: "19970902T090000Z",
            rule: || {
                RecurrenceRule::daily()
                    .with_by_rule(ByRule::Hour(vec![9, 10, 11, 12, 13, 14, 15, 16]))
                    .with_by_rule(ByRule::Minute(vec![0, 20, 40]))
            },
            expected: None,
            limit: 48,
        },
        RRuleCase {
            name: "week_start_monday",
            dtstart: "19970805T090000Z",
            rule: || {
                RecurrenceRule::weekly()
                    .with_interval(2)
                    .with_count(4)
                    .with_wkst(Monday)
                    .with_by_day(days(&[Tuesday, Sunday]))
            },
            expected: Some(&[
                "1997-08-05T09:00:00+00:00",
                "1997-08-10T09:00:00+00:00",
                "1997-08-19T09:00:00+00:00",
                "1997-08-24T09:00:00+00:00",
            ]),
            limit: 100,
        },
        RRuleCase {
            name: "week_start_sunday",
            dtstart: "19970805T090000Z",
            rule: || {
                RecurrenceRule::weekly()
                    .with_interval(2)
                    .with_count(4)
                    .with_wkst(Sunday)
                    .with_by_day(days(&[Tuesday, Sunday]))
            },
            expected: Some(&[
                "1997-08-05T09:00:00+00:00",
                "1997-08-17T09:00:00+00:00",
                "1997-08-19T09:00:00+00:00",
                "1997-08-31T09:00:00+00:00",
            ]),
            limit: 100,
        },
        RRuleCase {
            name: "invalid_month_days_are_skipped",
            dtstart: "20070115T090000Z",
            rule: || RecurrenceRule::monthly().with_count(5).with_by_monthday(vec![15, 30]),
            expected: Some(&[
                "2007-01-15T09:00:00+00:00",
                "2007-01-30T09:00:00+00:00",
                "2007-02-15T09:00:00+00:00",
                "2007-03-15T09:00:00+00:00",
                "2007-03-30T09:00:00+00:00",
            ]),
            limit: 100,
        },
        RRuleCase {
            name: "monthly_on_the_thirty_first",
            dtstart: "20200131T090000Z",
            rule: || RecurrenceRule::monthly().with_count(4),
            expected: Some(&[
                "2020-01-31T09:00:00+00:00",
                "2020-03-31T09:00:00+00:00",
                "2020-05-31T09:00:00+00:00",
                "2020-07-31T09:00:00+00:00",
            ]),
            limit: 100,
        },
        RRuleCase {
            name: "yearly_on_leap_day",
            dtstart: "20200229T120000Z",
            rule: || RecurrenceRule::yearly().with_count(3),
            expected: Some(&[
                "2020-02-29T12:00:00+00:00",
                "2024-02-29T12:00:00+00:00",
                "2028-02-29T12:00:00+00:00",
            ]),
            limit: 100,
        },
    ]
}
