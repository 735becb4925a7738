// Reporting-week arithmetic.
//
// A reporting week runs Friday through Thursday. "This week" is the
// Friday..Thursday span that contains today, except that Sunday still
// belongs to the span ending the preceding Thursday.
use crate::util::format_date;
use chrono::{Datelike, Days, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub current_start: NaiveDate,
    pub current_end: NaiveDate,
    pub previous_start: NaiveDate,
    pub previous_end: NaiveDate,
}

impl WeekWindow {
    /// Window as of `today`. Always computed fresh; never cache it across
    /// days.
    pub fn containing(today: NaiveDate) -> WeekWindow {
        // 0 = Sunday .. 6 = Saturday
        let dow = today.weekday().num_days_from_sunday() as u64;
        let current_end = match dow {
            1..=4 => today + Days::new(4 - dow),
            0 => today - Days::new(3),
            _ => today + Days::new(11 - dow),
        };
        let current_start = current_end - Days::new(6);
        WeekWindow {
            current_start,
            current_end,
            previous_start: current_start - Days::new(7),
            previous_end: current_start - Days::new(1),
        }
    }

    pub fn in_current(&self, date: NaiveDate) -> bool {
        date >= self.current_start && date <= self.current_end
    }

    pub fn in_previous(&self, date: NaiveDate) -> bool {
        date >= self.previous_start && date <= self.previous_end
    }

    /// `(current_start, current_end, previous_start, previous_end)` as
    /// `YYYY-MM-DD` strings.
    pub fn formatted(&self) -> (String, String, String, String) {
        (
            format_date(self.current_start),
            format_date(self.current_end),
            format_date(self.previous_start),
            format_date(self.previous_end),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn wednesday() {
        // 2025-10-29 is a Wednesday.
        let today = d(2025, 10, 29);
        assert_eq!(today.weekday(), Weekday::Wed);
        let w = WeekWindow::containing(today);
        assert_eq!(w.current_start, d(2025, 10, 24));
        assert_eq!(w.current_start.weekday(), Weekday::Fri);
        assert_eq!(w.current_end, d(2025, 10, 30));
        assert_eq!(w.previous_start, d(2025, 10, 17));
        assert_eq!(w.previous_end, d(2025, 10, 23));
    }

    #[test]
    fn friday_and_saturday_open_a_new_week() {
        for today in [d(2025, 10, 31), d(2025, 11, 1)] {
            let w = WeekWindow::containing(today);
            assert_eq!(w.current_start, d(2025, 10, 31));
            assert_eq!(w.current_end, d(2025, 11, 6));
        }
    }

    #[test]
    fn sunday_belongs_to_the_week_ending_last_thursday() {
        // 2025-11-02 is a Sunday; the span is Fri 10-24 .. Thu 10-30 and
        // Friday/Saturday right before it are *not* covered.
        let w = WeekWindow::containing(d(2025, 11, 2));
        assert_eq!(w.current_start, d(2025, 10, 24));
        assert_eq!(w.current_end, d(2025, 10, 30));
        assert!(!w.in_current(d(2025, 11, 2)));
    }

    #[test]
    fn monday_and_thursday() {
        let mon = WeekWindow::containing(d(2025, 10, 27));
        let thu = WeekWindow::containing(d(2025, 10, 30));
        assert_eq!(mon, thu);
        assert_eq!(thu.current_end, d(2025, 10, 30));
    }

    #[test]
    fn boundaries_are_inclusive() {
        let w = WeekWindow::containing(d(2025, 10, 29));
        assert!(w.in_current(w.current_start));
        assert!(w.in_current(w.current_end));
        assert!(w.in_previous(w.previous_start));
        assert!(w.in_previous(w.previous_end));
        assert!(!w.in_previous(w.current_start));
        assert_eq!(
            w.formatted(),
            (
                "2025-10-24".to_string(),
                "2025-10-30".to_string(),
                "2025-10-17".to_string(),
                "2025-10-23".to_string()
            )
        );
    }
}
