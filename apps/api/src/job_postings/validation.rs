use chrono::NaiveDate;

use crate::errors::AppError;

pub const MAX_TITLE_CHARS: usize = 50;
pub const MAX_WORK_PLACE_CHARS: usize = 25;

/// Recruitment dates of a posting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub is_always_recruiting: bool,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub deadline: NaiveDate,
}

pub fn validate_fields(
    title: &str,
    work_place_name: &str,
    salary: i32,
    recruit_number: i32,
) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_CHARS} characters"
        )));
    }
    if work_place_name.chars().count() > MAX_WORK_PLACE_CHARS {
        return Err(AppError::Validation(format!(
            "work_place_name must be at most {MAX_WORK_PLACE_CHARS} characters"
        )));
    }
    if salary < 0 {
        return Err(AppError::Validation("salary must be 0 or more".to_string()));
    }
    if recruit_number < 0 {
        return Err(AppError::Validation(
            "recruit_number must be 0 or more".to_string(),
        ));
    }
    Ok(())
}

/// Date ordering rules. Always-recruiting postings skip them entirely.
/// `check_start_not_past` is false when an update keeps the stored start date.
pub fn validate_schedule(
    schedule: &Schedule,
    check_start_not_past: bool,
    today: NaiveDate,
) -> Result<(), AppError> {
    if schedule.is_always_recruiting {
        return Ok(());
    }

    let (Some(start), Some(end)) = (schedule.start, schedule.end) else {
        return Err(AppError::Validation(
            "recruit_period_start and recruit_period_end are required unless always recruiting"
                .to_string(),
        ));
    };

    if start > end {
        return Err(AppError::Validation(
            "recruit_period_start must not be after recruit_period_end".to_string(),
        ));
    }
    if schedule.deadline < start {
        return Err(AppError::Validation(
            "deadline_at must not be before recruit_period_start".to_string(),
        ));
    }
    if schedule.deadline > end {
        return Err(AppError::Validation(
            "deadline_at must not be after recruit_period_end".to_string(),
        ));
    }
    if check_start_not_past && start < today {
        return Err(AppError::Validation(
            "recruit_period_start must not be in the past".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn schedule(start: &str, end: &str, deadline: &str) -> Schedule {
        Schedule {
            is_always_recruiting: false,
            start: Some(d(start)),
            end: Some(d(end)),
            deadline: d(deadline),
        }
    }

    #[test]
    fn test_valid_schedule() {
        let s = schedule("2030-01-01", "2030-02-01", "2030-01-20");
        assert!(validate_schedule(&s, true, d("2029-12-31")).is_ok());
    }

    #[test]
    fn test_start_after_end_rejected() {
        let s = schedule("2030-03-01", "2030-02-01", "2030-02-01");
        assert!(validate_schedule(&s, true, d("2029-01-01")).is_err());
    }

    #[test]
    fn test_deadline_outside_period_rejected() {
        let early = schedule("2030-01-10", "2030-02-01", "2030-01-01");
        let late = schedule("2030-01-10", "2030-02-01", "2030-03-01");
        assert!(validate_schedule(&early, true, d("2029-01-01")).is_err());
        assert!(validate_schedule(&late, true, d("2029-01-01")).is_err());
    }

    #[test]
    fn test_past_start_only_checked_when_requested() {
        let s = schedule("2024-01-01", "2030-02-01", "2030-01-01");
        let today = d("2025-06-01");
        assert!(validate_schedule(&s, true, today).is_err());
        assert!(validate_schedule(&s, false, today).is_ok());
    }

    #[test]
    fn test_always_recruiting_skips_dates() {
        let s = Schedule {
            is_always_recruiting: true,
            start: None,
            end: None,
            deadline: d("2020-01-01"),
        };
        assert!(validate_schedule(&s, true, d("2025-01-01")).is_ok());
    }

    #[test]
    fn test_missing_period_rejected() {
        let s = Schedule {
            is_always_recruiting: false,
            start: None,
            end: Some(d("2030-01-01")),
            deadline: d("2030-01-01"),
        };
        assert!(validate_schedule(&s, true, d("2025-01-01")).is_err());
    }

    #[test]
    fn test_field_limits() {
        assert!(validate_fields("Barista", "Cafe", 10_000, 2).is_ok());
        assert!(validate_fields(&"가".repeat(50), "Cafe", 0, 0).is_ok());
        assert!(validate_fields(&"가".repeat(51), "Cafe", 0, 0).is_err());
        assert!(validate_fields("Barista", &"x".repeat(26), 0, 0).is_err());
        assert!(validate_fields("Barista", "Cafe", -1, 0).is_err());
        assert!(validate_fields("Barista", "Cafe", 0, -3).is_err());
        assert!(validate_fields("  ", "Cafe", 0, 0).is_err());
    }
}
