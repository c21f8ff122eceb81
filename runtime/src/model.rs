//! Core data types: institutions, courses, and the per-course transfer map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A sending institution from the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Institution {
    /// Display name (first name variant the directory lists).
    pub name: String,
    /// Numeric institution id used in agreement keys.
    pub id: u32,
}

/// A configured target department.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub name: String,
    pub id: u32,
}

/// A sending-side course that articulates to a target course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    /// Sending department prefix, e.g. `MATH`.
    pub dept_code: String,
    /// Sending course number, e.g. `19A`.
    pub course_number: String,
    /// Course title when the agreement carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Name of the institution offering the course.
    #[serde(rename = "institution")]
    pub institution_name: String,
}

/// Target course id (`"CSE 101"`) -> discovered equivalents, in discovery order.
///
/// Duplicates are preserved. Merging appends per key and never overwrites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferMap {
    courses: BTreeMap<String, Vec<Course>>,
}

impl TransferMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one equivalent to a target course's list.
    pub fn push(&mut self, target_course: impl Into<String>, course: Course) {
        self.courses
            .entry(target_course.into())
            .or_default()
            .push(course);
    }

    /// Fold another partial map into this one with key-wise append.
    pub fn merge(&mut self, other: TransferMap) {
        for (target, mut equivalents) in other.courses {
            self.courses.entry(target).or_default().append(&mut equivalents);
        }
    }

    /// Equivalents recorded for a target course.
    pub fn get(&self, target_course: &str) -> Option<&[Course]> {
        self.courses.get(target_course).map(Vec::as_slice)
    }

    /// Number of distinct target courses.
    pub fn len(&self) -> usize {
        self.courses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.courses.is_empty()
    }

    /// Total number of equivalent course records across all targets.
    pub fn equivalent_count(&self) -> usize {
        self.courses.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Course>)> {
        self.courses.iter()
    }
}
