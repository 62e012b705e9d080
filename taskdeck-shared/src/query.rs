/// Search parameter compiler
///
/// Translates the public sort-string grammar and filter object into a
/// [`SearchPlan`] consumed by the task repository. Malformed sorts and
/// conflicting filters are rejected here, before any SQL is built.
///
/// # Sort grammar
///
/// Comma-separated signed column names, each `[+-]<column>`; the sign is
/// mandatory, whitespace around commas is tolerated:
///
/// ```text
/// +deadline,-id
/// ```
///
/// Every token must name a known column of the task entity. If the caller
/// omits `id`, `+id` is appended as the final tiebreaker so the order is
/// total and pagination is deterministic.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{DomainError, DomainResult};
use crate::models::task::TaskStatus;

/// Default page size when `limit` is absent
pub const DEFAULT_LIMIT: i64 = 10;

/// Hard cap on page size
pub const MAX_LIMIT: i64 = 1000;

/// A sortable column of the task entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Title,
    Description,
    RegistrantId,
    AsaigneeId,
    Status,
    IsSignificant,
    Deadline,
    CreatedAt,
    UpdatedAt,
}

impl SortColumn {
    /// Maps a wire column name onto a column, `None` for unknown names.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(SortColumn::Id),
            "title" => Some(SortColumn::Title),
            "description" => Some(SortColumn::Description),
            "registrant_id" => Some(SortColumn::RegistrantId),
            "asaignee_id" => Some(SortColumn::AsaigneeId),
            "status" => Some(SortColumn::Status),
            "is_significant" => Some(SortColumn::IsSignificant),
            "deadline" => Some(SortColumn::Deadline),
            "created_at" => Some(SortColumn::CreatedAt),
            "updated_at" => Some(SortColumn::UpdatedAt),
            _ => None,
        }
    }

    /// The schema identifier for this column. Only values produced by
    /// [`SortColumn::parse`] reach SQL, so interpolation is safe.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::Id => "id",
            SortColumn::Title => "title",
            SortColumn::Description => "description",
            SortColumn::RegistrantId => "registrant_id",
            SortColumn::AsaigneeId => "asaignee_id",
            SortColumn::Status => "status",
            SortColumn::IsSignificant => "is_significant",
            SortColumn::Deadline => "deadline",
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
        }
    }
}

/// Sort direction, from the leading sign of a sort token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One `(column, direction)` pair of a compiled sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: SortColumn,
    pub direction: SortDirection,
}

/// Parses a sort string into ordered sort keys, appending the `+id`
/// tiebreaker when the caller did not mention `id`.
pub fn parse_sort(spec: &str) -> DomainResult<Vec<SortKey>> {
    let mut keys = Vec::new();

    for raw in spec.split(',') {
        let token = raw.trim();
        if token.is_empty() {
            return Err(DomainError::validation("sort", "empty sort token"));
        }

        // strip_prefix, not byte slicing: tokens are attacker-controlled
        // and may start with a multi-byte character
        let (direction, name) = if let Some(rest) = token.strip_prefix('+') {
            (SortDirection::Asc, rest)
        } else if let Some(rest) = token.strip_prefix('-') {
            (SortDirection::Desc, rest)
        } else {
            return Err(DomainError::validation(
                "sort",
                format!("sort token must be signed [+-]<column>: {}", token),
            ));
        };

        let column = SortColumn::parse(name).ok_or_else(|| {
            DomainError::validation("sort", format!("unknown column: {}", token))
        })?;

        keys.push(SortKey { column, direction });
    }

    append_id_tiebreaker(&mut keys);
    Ok(keys)
}

/// The default ordering when no sort is given
pub fn default_sort() -> Vec<SortKey> {
    vec![SortKey {
        column: SortColumn::Id,
        direction: SortDirection::Asc,
    }]
}

fn append_id_tiebreaker(keys: &mut Vec<SortKey>) {
    if !keys.iter().any(|k| k.column == SortColumn::Id) {
        keys.push(SortKey {
            column: SortColumn::Id,
            direction: SortDirection::Asc,
        });
    }
}

/// The recognized filter object of `/tasks/search`.
///
/// Unrecognized keys are rejected at parse time (`extra=forbid` semantics);
/// cross-field constraints are checked by [`TaskFilter::validate`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskFilter {
    /// Title contains substring
    pub title_cn: Option<String>,

    /// Description contains substring
    pub description_cn: Option<String>,

    /// Assignee in the given set (1..3 elements, each 5 chars)
    pub asaignee_id_in: Option<Vec<String>>,

    /// Assignee IS (NOT) NULL
    pub asaignee_id_ex: Option<bool>,

    /// Status in the given set (at least one)
    pub status_in: Option<Vec<TaskStatus>>,

    /// Significance equals
    pub is_significant_eq: Option<bool>,

    /// Deadline on or after
    pub deadline_from: Option<NaiveDate>,

    /// Deadline on or before
    pub deadline_to: Option<NaiveDate>,
}

impl TaskFilter {
    /// Checks field ranges and cross-field constraints.
    pub fn validate(&self) -> DomainResult<()> {
        if self.asaignee_id_in.is_some() && self.asaignee_id_ex.is_some() {
            return Err(DomainError::validation(
                "asaignee_id_in",
                "asaignee_id_in and asaignee_id_ex are mutually exclusive",
            ));
        }

        if let Some(ids) = &self.asaignee_id_in {
            if ids.is_empty() || ids.len() > 3 {
                return Err(DomainError::validation(
                    "asaignee_id_in",
                    "must contain between 1 and 3 elements",
                ));
            }
            if ids.iter().any(|id| id.chars().count() != 5) {
                return Err(DomainError::validation(
                    "asaignee_id_in",
                    "each element must be exactly 5 characters",
                ));
            }
        }

        if let Some(statuses) = &self.status_in {
            if statuses.is_empty() {
                return Err(DomainError::validation(
                    "status_in",
                    "must contain at least one status",
                ));
            }
        }

        if let (Some(from), Some(to)) = (self.deadline_from, self.deadline_to) {
            if from > to {
                return Err(DomainError::validation(
                    "deadline_from",
                    "deadline_from must not be later than deadline_to",
                ));
            }
        }

        Ok(())
    }
}

/// A validated, executable search plan
#[derive(Debug, Clone)]
pub struct SearchPlan {
    pub filter: TaskFilter,
    pub sort: Vec<SortKey>,
    pub offset: i64,
    pub limit: i64,
}

/// Compiles raw request parameters into a [`SearchPlan`].
///
/// `offset` defaults to 0 and must be non-negative; `limit` defaults to 10,
/// must be positive, and is capped at [`MAX_LIMIT`]. An absent sort string
/// compiles to ascending id.
pub fn compile(
    filter: TaskFilter,
    sort: Option<&str>,
    offset: Option<i64>,
    limit: Option<i64>,
) -> DomainResult<SearchPlan> {
    filter.validate()?;

    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(DomainError::validation("offset", "must be non-negative"));
    }

    let limit = limit.unwrap_or(DEFAULT_LIMIT);
    if limit < 1 {
        return Err(DomainError::validation("limit", "must be positive"));
    }
    let limit = limit.min(MAX_LIMIT);

    let sort = match sort {
        Some(spec) => parse_sort(spec)?,
        None => default_sort(),
    };

    Ok(SearchPlan {
        filter,
        sort,
        offset,
        limit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sort_left_to_right() {
        let keys = parse_sort("+deadline,-status").unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0].column, SortColumn::Deadline);
        assert_eq!(keys[0].direction, SortDirection::Asc);
        assert_eq!(keys[1].column, SortColumn::Status);
        assert_eq!(keys[1].direction, SortDirection::Desc);
        // Implicit tiebreaker
        assert_eq!(keys[2].column, SortColumn::Id);
        assert_eq!(keys[2].direction, SortDirection::Asc);
    }

    #[test]
    fn test_explicit_id_suppresses_tiebreaker() {
        let keys = parse_sort("+deadline,-id").unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[1].column, SortColumn::Id);
        assert_eq!(keys[1].direction, SortDirection::Desc);
    }

    #[test]
    fn test_whitespace_around_commas_tolerated() {
        let keys = parse_sort("+deadline , -title").unwrap();
        assert_eq!(keys[0].column, SortColumn::Deadline);
        assert_eq!(keys[1].column, SortColumn::Title);
    }

    #[test]
    fn test_unsigned_token_rejected() {
        let err = parse_sort("deadline").unwrap_err();
        assert!(err.to_string().contains("deadline"));
    }

    #[test]
    fn test_multibyte_leading_character_rejected_not_panicking() {
        // En dash instead of a minus sign; must be a validation error
        assert!(parse_sort("\u{2013}id").is_err());
        assert!(parse_sort("±deadline").is_err());
        assert!(parse_sort("+deadline,\u{2013}id").is_err());
    }

    #[test]
    fn test_unknown_column_named_in_error() {
        let err = parse_sort("+deadline,+frobnicate").unwrap_err();
        assert!(err.to_string().contains("+frobnicate"));
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(parse_sort("+deadline,,+id").is_err());
        assert!(parse_sort("").is_err());
    }

    #[test]
    fn test_filter_mutual_exclusion() {
        let filter = TaskFilter {
            asaignee_id_in: Some(vec!["T-901".to_string()]),
            asaignee_id_ex: Some(true),
            ..Default::default()
        };
        let err = filter.validate().unwrap_err();
        assert!(err.to_string().contains("asaignee_id"));
    }

    #[test]
    fn test_filter_asaignee_set_bounds() {
        let too_many = TaskFilter {
            asaignee_id_in: Some(vec![
                "A-001".into(),
                "A-002".into(),
                "A-003".into(),
                "A-004".into(),
            ]),
            ..Default::default()
        };
        assert!(too_many.validate().is_err());

        let wrong_width = TaskFilter {
            asaignee_id_in: Some(vec!["toolong".into()]),
            ..Default::default()
        };
        assert!(wrong_width.validate().is_err());

        let ok = TaskFilter {
            asaignee_id_in: Some(vec!["T-901".into(), "T-902".into()]),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_filter_deadline_window_ordering() {
        let inverted = TaskFilter {
            deadline_from: NaiveDate::from_ymd_opt(2024, 6, 2),
            deadline_to: NaiveDate::from_ymd_opt(2024, 6, 1),
            ..Default::default()
        };
        let err = inverted.validate().unwrap_err();
        assert!(err.to_string().contains("deadline_from"));

        let same_day = TaskFilter {
            deadline_from: NaiveDate::from_ymd_opt(2024, 6, 1),
            deadline_to: NaiveDate::from_ymd_opt(2024, 6, 1),
            ..Default::default()
        };
        assert!(same_day.validate().is_ok());
    }

    #[test]
    fn test_filter_empty_status_set_rejected() {
        let filter = TaskFilter {
            status_in: Some(vec![]),
            ..Default::default()
        };
        assert!(filter.validate().is_err());
    }

    #[test]
    fn test_compile_defaults() {
        let plan = compile(TaskFilter::default(), None, None, None).unwrap();
        assert_eq!(plan.offset, 0);
        assert_eq!(plan.limit, DEFAULT_LIMIT);
        assert_eq!(plan.sort, default_sort());
    }

    #[test]
    fn test_compile_limit_capped() {
        let plan = compile(TaskFilter::default(), None, None, Some(5000)).unwrap();
        assert_eq!(plan.limit, MAX_LIMIT);
    }

    #[test]
    fn test_compile_rejects_bad_paging() {
        assert!(compile(TaskFilter::default(), None, Some(-1), None).is_err());
        assert!(compile(TaskFilter::default(), None, None, Some(0)).is_err());
    }

    #[test]
    fn test_filter_rejects_unknown_keys() {
        let err = serde_json::from_value::<TaskFilter>(serde_json::json!({
            "title_cn": "x",
            "not_a_key": true
        }));
        assert!(err.is_err());
    }
}
