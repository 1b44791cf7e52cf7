#![allow(missing_docs)]

//! Shared domain models returned by the remote service.

use serde::{Deserialize, Serialize};

use crate::error::{SyncError, SyncResult};

/// School year and semester scoping schedule and fee queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchoolYear {
    /// Two-digit start year, `23` meaning 2023-2024.
    pub year: u8,
    /// Semester number, `3` being the summer term.
    pub semester: u8,
}

impl SchoolYear {
    /// Build a selector, rejecting semesters outside `1..=3`.
    pub fn new(year: u8, semester: u8) -> SyncResult<Self> {
        if !(1..=3).contains(&semester) {
            return Err(SyncError::InvalidSchoolYear(semester));
        }
        Ok(Self { year, semester })
    }

    /// Whether this is the summer term.
    pub fn is_summer(&self) -> bool {
        self.semester == 3
    }

    /// Returns a user-facing label such as `2023-2024, semester 3 (summer)`.
    pub fn label(&self) -> String {
        let start = 2000 + u32::from(self.year);
        let suffix = if self.is_summer() { " (summer)" } else { "" };
        format!("{}-{}, semester {}{}", start, start + 1, self.semester, suffix)
    }
}

/// One weekly slot of a subject: day and lesson range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonSlot {
    /// Day of week, `0` being Monday.
    pub day_of_week: u8,
    /// First lesson number.
    pub lesson_start: u8,
    /// Last lesson number, inclusive.
    pub lesson_end: u8,
    /// Room code.
    pub room: String,
}

/// A subject the student is enrolled in for the selected school year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScheduleItem {
    /// Subject class identifier.
    pub id: String,
    /// Subject name.
    pub name: String,
    /// Credit count.
    pub credit: f32,
    /// Lecturer name.
    pub lecturer: String,
    /// Weekly study slots.
    #[serde(default)]
    pub schedule: Vec<LessonSlot>,
}

impl SubjectScheduleItem {
    /// Whether any study slot falls on the given day.
    pub fn studies_on(&self, day_of_week: u8) -> bool {
        self.schedule
            .iter()
            .any(|slot| slot.day_of_week == day_of_week)
    }
}

/// Tuition fee line for one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectFeeItem {
    pub id: String,
    pub name: String,
    pub credit: f32,
    pub is_high_quality: bool,
    pub price: f64,
    pub debt: bool,
    pub is_restudy: bool,
    pub verified_payment_at: Option<String>,
}

/// Personal and enrolment details of the logged-in student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AccountInformation {
    pub student_id: String,
    pub name: String,
    pub date_of_birth: Option<String>,
    pub class_name: Option<String>,
    pub faculty: Option<String>,
    pub training_program: Option<String>,
    pub school_email: Option<String>,
    pub personal_email: Option<String>,
    pub phone_number: Option<String>,
}

/// Aggregated training scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TrainingSummary {
    pub school_year_start: Option<String>,
    pub school_year_current: Option<String>,
    pub credit_collected: f32,
    pub avg_training_score_4: f32,
    pub avg_social: f32,
}

/// Graduation requirement checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GraduateStatus {
    pub has_sig_physical_education: bool,
    pub has_sig_national_defense_education: bool,
    pub has_sig_english: bool,
    pub has_sig_it: bool,
    pub has_qualified_graduate: bool,
    pub info1: Option<String>,
    pub info2: Option<String>,
    pub info3: Option<String>,
    pub approve_graduate_process_info: Option<String>,
}

impl GraduateStatus {
    /// Number of the four certificate requirements still missing.
    pub fn missing_certificates(&self) -> usize {
        [
            self.has_sig_physical_education,
            self.has_sig_national_defense_education,
            self.has_sig_english,
            self.has_sig_it,
        ]
        .iter()
        .filter(|done| !**done)
        .count()
    }
}

/// Training status: score summary plus graduation checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AccountTrainingStatus {
    pub training_summary: Option<TrainingSummary>,
    pub graduate_status: Option<GraduateStatus>,
}
