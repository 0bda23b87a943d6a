//! Entity records held by the store, their creation payloads, and the
//! per-collection query filters. Records are plain data: the store never
//! mutates a field in place, collaborators write whole records back.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub password: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub class_id: String,
    pub parent_id: String,
    pub enrollment_date: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Teacher {
    pub teacher_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub department: String,
    pub hire_date: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parent {
    pub parent_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub occupation: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub class_id: String,
    pub class_name: String,
    pub grade_level: String,
    pub teacher_id: String,
    pub capacity: i64,
    pub academic_year: String,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub grade_id: String,
    pub student_id: String,
    pub subject: String,
    pub grade_value: f64,
    pub max_grade: f64,
    pub term: String,
    pub academic_year: String,
    pub teacher_id: String,
    pub created_at: String,
}

/// Registration payload. A caller-supplied `user_id` is honored; every other
/// entity gets a generated id regardless of input.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub user_id: Option<String>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewStudent {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub class_id: String,
    pub parent_id: String,
    pub enrollment_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewTeacher {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub department: String,
    pub hire_date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewParent {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub occupation: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewClass {
    pub class_name: String,
    pub grade_level: String,
    pub teacher_id: String,
    pub capacity: Option<i64>,
    pub academic_year: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewGrade {
    pub student_id: String,
    pub subject: String,
    pub grade_value: f64,
    pub max_grade: Option<f64>,
    pub term: Option<String>,
    pub academic_year: Option<String>,
    pub teacher_id: String,
}

/// Equality filters, AND-composed. A `None` field matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentFilter {
    pub class_id: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeacherFilter {
    pub department: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GradeFilter {
    pub student_id: Option<String>,
    pub subject: Option<String>,
    pub term: Option<String>,
    pub academic_year: Option<String>,
}
