use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::snapshot::{BOOKING_PREFIX, RESULT_PREFIX};

/// One row of the results table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub paper: String,
    pub kind: String,
    pub date: String,
    pub status: String,
}

impl Display for ResultRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {} — {}",
            self.paper, self.kind, self.date, self.status
        )
    }
}

/// One row of the booking list table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub paper: String,
    pub status: String,
    pub date: String,
    pub remarks: String,
}

impl BookingRecord {
    /// The date when one is assigned, otherwise the remarks column.
    pub fn display_date(&self) -> &str {
        if self.date == "-" {
            &self.remarks
        } else {
            &self.date
        }
    }
}

impl Display for BookingRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} — {} | {}",
            self.paper,
            self.status,
            self.display_date()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeLabel {
    Result,
    Booking,
}

impl ChangeLabel {
    pub fn from_key(key: &str) -> Self {
        if key.starts_with(RESULT_PREFIX) {
            ChangeLabel::Result
        } else {
            ChangeLabel::Booking
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ChangeLabel::Result => "📊",
            ChangeLabel::Booking => "📅",
        }
    }
}

impl Display for ChangeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeLabel::Result => write!(f, "Result"),
            ChangeLabel::Booking => write!(f, "Booking"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeFlag {
    /// A booking left the "under process" state, so an exam date was assigned.
    NewDateAssigned,
}

impl Display for ChangeFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeFlag::NewDateAssigned => write!(f, "new-date-assigned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub key: String,
    pub label: ChangeLabel,
    pub old_value: Option<String>,
    pub new_value: String,
    pub flag: Option<ChangeFlag>,
}

impl ChangeRecord {
    /// Paper name, i.e. the key without its namespace tag.
    pub fn paper(&self) -> &str {
        self.key
            .strip_prefix(RESULT_PREFIX)
            .or_else(|| self.key.strip_prefix(BOOKING_PREFIX))
            .unwrap_or(&self.key)
    }

    pub fn is_urgent(&self) -> bool {
        self.flag.is_some()
    }
}

impl Display for ChangeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: ", self.label, self.paper())?;
        match &self.old_value {
            Some(old) => write!(f, "{} → {}", old, self.new_value)?,
            None => write!(f, "{} (new)", self.new_value)?,
        }
        if let Some(flag) = self.flag {
            write!(f, " ({})", flag)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_date_falls_back_to_remarks() {
        let pending = BookingRecord {
            paper: "Paper2".into(),
            status: "Under Process".into(),
            date: "-".into(),
            remarks: "Awaiting allocation".into(),
        };
        assert_eq!(pending.display_date(), "Awaiting allocation");

        let scheduled = BookingRecord {
            date: "2025-01-01".into(),
            ..pending
        };
        assert_eq!(scheduled.display_date(), "2025-01-01");
    }

    #[test]
    fn test_change_record_paper_strips_namespace() {
        let change = ChangeRecord {
            key: "BOOK_Financial Reporting".into(),
            label: ChangeLabel::Booking,
            old_value: None,
            new_value: "Scheduled | 2025-01-01".into(),
            flag: None,
        };
        assert_eq!(change.paper(), "Financial Reporting");
        assert_eq!(ChangeLabel::from_key("RES_Audit"), ChangeLabel::Result);
        assert_eq!(ChangeLabel::from_key("BOOK_Audit"), ChangeLabel::Booking);
    }

    #[test]
    fn test_change_flag_serializes_kebab_case() {
        let json = serde_json::to_string(&ChangeFlag::NewDateAssigned).unwrap();
        assert_eq!(json, "\"new-date-assigned\"");
    }
}
